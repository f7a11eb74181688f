use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use log::info;

use bruteguard::config::Config;
use bruteguard::monitor::journal::JournalSource;
use bruteguard::prevention::firewall::IpsetClient;
use bruteguard::supervisor::Supervisor;
use bruteguard::utils::{logger, shutdown};

#[derive(Parser, Debug)]
#[command(name = "bruteguard")]
#[command(about = "Blocks addresses with repeated failed SSH logins via ipset/iptables")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(&args.log_level)?;

    let config = Config::load(args.config.as_deref())?;
    if args.validate {
        info!("configuration is valid");
        return Ok(());
    }

    let source = JournalSource::new(&config.journal_unit);
    let filter = IpsetClient::new(&config.set_name);
    let supervisor = Supervisor::new(config, source, filter);

    // the supervisor logs the fatal error before returning it
    if supervisor.run(shutdown::shutdown_token()).await.is_err() {
        process::exit(1);
    }
    Ok(())
}
