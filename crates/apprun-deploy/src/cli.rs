use std::path::PathBuf;

use apprun_client::DEFAULT_BASE_URL;
use clap::Parser;

/// Step inputs are read from `INPUT_*` variables; these flags only tune how
/// the step runs.
#[derive(Parser, Debug)]
#[command(name = "apprun-deploy")]
#[command(about = "Create or update a Sakura Cloud AppRun application")]
#[command(version)]
pub struct Cli {
    /// AppRun API base URL
    #[arg(long, env = "APPRUN_API_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "APPRUN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Load INPUT_* variables from a dotenv file before reading inputs
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}
