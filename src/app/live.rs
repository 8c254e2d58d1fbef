use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use h2scope::args::{Cli, LiveArgs, OutputFormat};
use h2scope::catalog::MetricKind;
use h2scope::error::AppResult;
use h2scope::model::Sample;
use h2scope::shutdown::ShutdownSender;
use h2scope::store::WindowStore;
use h2scope::stream::{self, Subscription};

use super::format::{live_report, live_text};

/// Follows the live stream, printing window summaries every interval until
/// shutdown, the optional duration elapses, or reconnects run out.
pub(crate) async fn run_live(
    cli: &Cli,
    live: &LiveArgs,
    shutdown_tx: &ShutdownSender,
) -> AppResult<()> {
    let kinds = selected_kinds(&live.kinds);
    let store = Arc::new(WindowStore::new(live.window.as_non_zero()));
    let events_url = cli.events_url()?;

    let sink = Arc::clone(&store);
    let subscription = stream::open(
        events_url.as_str(),
        move |sample: Sample| sink.append(sample),
        &cli.stream_options(),
    )?;
    info!(
        "Following {} with a window of {} samples per metric",
        events_url,
        live.window.get()
    );

    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut ticker = interval(live.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it so the first report has data.
    ticker.tick().await;
    let stop = tokio::time::sleep(live.duration.unwrap_or(Duration::MAX));
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            () = &mut stop => break,
            _ = ticker.tick() => print_report(&subscription, &store, &kinds, live.format)?,
        }
        if subscription.is_finished() {
            warn!("Stream stopped reconnecting; exiting.");
            break;
        }
    }

    print_report(&subscription, &store, &kinds, live.format)?;
    subscription.close().await;
    Ok(())
}

fn selected_kinds(requested: &[MetricKind]) -> Vec<MetricKind> {
    if requested.is_empty() {
        return MetricKind::ALL.to_vec();
    }
    let mut kinds = Vec::with_capacity(requested.len());
    for kind in requested {
        if !kinds.contains(kind) {
            kinds.push(*kind);
        }
    }
    kinds
}

fn print_report(
    subscription: &Subscription,
    store: &WindowStore,
    kinds: &[MetricKind],
    format: OutputFormat,
) -> AppResult<()> {
    let report = live_report(
        Utc::now(),
        subscription.state(),
        subscription.stats(),
        &store.snapshot_all(),
        kinds,
    );
    match format {
        OutputFormat::Text => {
            for line in live_text(&report) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
    }
    Ok(())
}
