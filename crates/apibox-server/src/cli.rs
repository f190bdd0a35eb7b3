use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "apibox", version, about = "PoW-dispatching API front-end for a tangle node")]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, env = "APIBOX_CONFIG", default_value = "./apibox.json")]
    pub config: PathBuf,
}
