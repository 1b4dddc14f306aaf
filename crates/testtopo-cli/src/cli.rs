use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "testtopo",
    about = "Resolve which test suites a source tree defines and which a change touches",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with `[resolver]` and `[history]` tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve every suite in a source tree
    Suites(SuitesArgs),
    /// Classify the change between two source trees
    Classify(ClassifyArgs),
}

#[derive(Args)]
pub struct SuitesArgs {
    /// Root of the source tree
    pub dir: PathBuf,
    /// List every relevant path, not only the counts
    #[arg(long)]
    pub paths: bool,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Tree before the change
    pub before: PathBuf,
    /// Tree after the change
    pub after: PathBuf,
}
