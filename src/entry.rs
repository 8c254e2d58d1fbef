use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::{debug, warn};

use h2scope::args::{Cli, Command};
use h2scope::config::{apply_config, load_config};
use h2scope::error::AppResult;
use h2scope::shutdown::shutdown_channel;

use crate::app;
use crate::shutdown_handlers::setup_signal_shutdown_handler;

pub(crate) fn run() -> AppResult<()> {
    let (mut cli, matches) = parse_args()?;

    if let Some(config) = load_config(cli.config.as_deref())? {
        apply_config(&mut cli, &matches, &config)?;
    }

    crate::logger::init_logging(cli.verbose, cli.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(cli))
}

fn parse_args() -> AppResult<(Cli, ArgMatches)> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    Ok((cli, matches))
}

async fn run_async(cli: Cli) -> AppResult<()> {
    let (shutdown_tx, _) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let result = match &cli.command {
        Command::Live(live) => app::run_live(&cli, live, &shutdown_tx).await,
        Command::History(history) => {
            let mut shutdown_rx = shutdown_tx.subscribe();
            tokio::select! {
                result = app::run_history(&cli, history) => result,
                _ = shutdown_rx.recv() => {
                    warn!("Historical query interrupted.");
                    Ok(())
                }
            }
        }
    };

    drop(shutdown_tx.send(()));
    if let Err(err) = signal_handle.await {
        debug!("Signal handler task failed: {}", err);
    }
    result
}
