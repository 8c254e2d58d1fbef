use chrono::Utc;
use tracing::info;

use h2scope::args::{Cli, HistoryArgs, OutputFormat};
use h2scope::error::AppResult;
use h2scope::history::HistoryClient;

use super::format::{range_json, range_text};

/// Fetches one range and prints its summary. Errors are returned before
/// anything is printed.
pub(crate) async fn run_history(cli: &Cli, args: &HistoryArgs) -> AppResult<()> {
    let (start, end) = args.resolve_range(Utc::now())?;
    let client = HistoryClient::new(&cli.server_url, &cli.history_options())?;
    info!("Querying {} from {} to {}", args.kind, start, end);

    let report = client.summarize_range(args.kind, start, end).await?;
    match args.format {
        OutputFormat::Text => {
            for line in range_text(&report, args.raw) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&range_json(&report, args.raw))?
            );
        }
    }
    Ok(())
}
