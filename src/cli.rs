use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "onionwallet",
    version,
    about = "Keeps a Tor client and a wallet backend connected through it"
)]
pub struct Cli {
    /// TOML config file; system defaults are used when omitted.
    #[arg(long, env = "OW_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}
