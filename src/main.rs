use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::config::LinkConfig;

pub mod app;
pub mod config;
pub mod link;
pub mod tail;

#[derive(Parser, Debug)]
#[command(about)]
struct Cli {
    #[arg(short, long, value_name = "FILE", default_value = config::DEFAULT_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the monitor log and stream samples to the display
    Run,
    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    match &cli.command {
        Some(Commands::Validate) => {
            let config = LinkConfig::load(cli.config)?;
            println!("{config:#?}");
            Ok(())
        }
        Some(Commands::Run) | None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
            let config = LinkConfig::load(cli.config)?;
            info!(
                "Bridging {:?} to {} at {} baud",
                config.log_file, config.serial.device, config.serial.baud
            );

            let cancel = CancellationToken::new();
            let ctrl = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Ctrl-C, shutting down");
                    ctrl.cancel();
                }
            });

            let mut app = App::new(config);
            app.run(cancel).await
        }
    }
}
