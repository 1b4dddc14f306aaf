//! Repository-relative path helpers.
//!
//! Paths are slash-separated, case-sensitive and never carry a leading or
//! trailing separator. They are plain `str`s; these helpers only encode the
//! joining and normalization rules shared by the parsers and the resolver.

/// The directory part of `path`, or `""` for a top-level entry.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// The final component of `path`.
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Collapse `.` and `..` components and repeated separators.
///
/// `..` that would climb above the repository root is kept, mirroring the way
/// POSIX `normpath` treats relative paths. An empty result becomes `"."`.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Join a relative path onto a directory and normalize the result.
pub fn join(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        normalize(relative)
    } else {
        normalize(&format!("{dir}/{relative}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_and_file_name() {
        assert_eq!(parent("dom/tests/mochitest.ini"), "dom/tests");
        assert_eq!(file_name("dom/tests/mochitest.ini"), "mochitest.ini");
        assert_eq!(parent("moz.build"), "");
        assert_eq!(file_name("moz.build"), "moz.build");
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(normalize("layout/./reftests/../base/a.html"), "layout/base/a.html");
        assert_eq!(normalize("a//b/"), "a/b");
        assert_eq!(normalize("a/.."), ".");
    }

    #[test]
    fn normalize_keeps_leading_parent_refs() {
        assert_eq!(normalize("../x"), "../x");
        assert_eq!(normalize("a/../../x"), "../x");
    }

    #[test]
    fn join_top_level_dir() {
        assert_eq!(join("", "a/mochitest.ini"), "a/mochitest.ini");
        assert_eq!(join("dir", "a/mochitest.ini"), "dir/a/mochitest.ini");
        assert_eq!(join("dir/sub", "../other.list"), "dir/other.list");
    }

    proptest::proptest! {
        #[test]
        fn normalize_is_idempotent(path in "[a-c./]{0,24}") {
            let once = normalize(&path);
            proptest::prop_assert_eq!(normalize(&once), once);
        }
    }
}
