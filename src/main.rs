use clap::Parser;

use onionwallet_lib::bootstrap::{self, tracing::init_tracing_subscriber};
use onionwallet_lib::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_dirs = bootstrap::resolve_app_dirs()?;
    init_tracing_subscriber(&app_dirs.logs_dir())?;

    let config = bootstrap::load_config(cli.config.as_deref(), &app_dirs)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(bootstrap::run_daemon(config))
}
