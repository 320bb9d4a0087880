//! CLI definition and dispatch.

mod mirror;

use clap::Parser;

pub use mirror::MirrorArgs;

/// Copy ACM images into a disconnected registry and generate
/// the matching ImageContentSourcePolicy.
#[derive(Parser, Debug)]
#[command(name = "acm-mirror", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub mirror: MirrorArgs,

    /// Show info-level logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Run the parsed CLI. Returns the exit code for a completed run.
pub async fn dispatch(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    mirror::execute(cli.mirror).await
}
