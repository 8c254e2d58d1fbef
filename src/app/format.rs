use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use h2scope::catalog::MetricKind;
use h2scope::history::RangeReport;
use h2scope::model::Sample;
use h2scope::stats::{Statistics, summarize};
use h2scope::store::WindowSet;
use h2scope::stream::{ConnectionState, StreamStats};

/// Width of the metric label column in text output.
const LABEL_WIDTH: usize = 34;

/// One metric's window at a point in time.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct WindowSummary {
    pub(crate) kind: MetricKind,
    pub(crate) label: String,
    pub(crate) samples: usize,
    pub(crate) latest: Option<f64>,
    pub(crate) statistics: Option<Statistics>,
}

/// Everything printed on one live tick.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LiveReport {
    pub(crate) at: DateTime<Utc>,
    pub(crate) state: &'static str,
    pub(crate) frames_received: u64,
    pub(crate) frames_rejected: u64,
    pub(crate) samples_delivered: u64,
    pub(crate) metrics: Vec<WindowSummary>,
}

pub(crate) const fn state_name(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
    }
}

pub(crate) fn summarize_windows(windows: &WindowSet, kinds: &[MetricKind]) -> Vec<WindowSummary> {
    kinds
        .iter()
        .map(|kind| {
            let samples = windows.samples(*kind);
            WindowSummary {
                kind: *kind,
                label: kind.display_label(),
                samples: samples.len(),
                latest: samples.last().map(Sample::value),
                statistics: summarize(&samples),
            }
        })
        .collect()
}

pub(crate) fn live_report(
    at: DateTime<Utc>,
    state: ConnectionState,
    stats: StreamStats,
    windows: &WindowSet,
    kinds: &[MetricKind],
) -> LiveReport {
    LiveReport {
        at,
        state: state_name(state),
        frames_received: stats.frames_received,
        frames_rejected: stats.frames_rejected,
        samples_delivered: stats.samples_delivered,
        metrics: summarize_windows(windows, kinds),
    }
}

pub(crate) fn live_text(report: &LiveReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.metrics.len().saturating_add(1));
    lines.push(format!(
        "[{}] {} frames={} rejected={} samples={}",
        report.at.to_rfc3339_opts(SecondsFormat::Secs, true),
        report.state,
        report.frames_received,
        report.frames_rejected,
        report.samples_delivered
    ));
    for metric in &report.metrics {
        lines.push(format!("  {}", window_line(metric)));
    }
    lines
}

fn window_line(metric: &WindowSummary) -> String {
    let (Some(latest), Some(statistics)) = (metric.latest, metric.statistics) else {
        return format!("{:<width$} no data", metric.label, width = LABEL_WIDTH);
    };
    let hint = metric.kind.hint();
    format!(
        "{:<width$} n={:<4} latest={} {}",
        metric.label,
        metric.samples,
        hint.format(latest),
        statistics.format(hint),
        width = LABEL_WIDTH
    )
}

pub(crate) fn range_text(report: &RangeReport, raw: bool) -> Vec<String> {
    let hint = report.kind.hint();
    let mut lines = vec![format!(
        "{} from {} to {}",
        report.kind.display_label(),
        report.start.to_rfc3339_opts(SecondsFormat::Secs, true),
        report.end.to_rfc3339_opts(SecondsFormat::Secs, true)
    )];
    if raw {
        for sample in &report.samples {
            lines.push(format!(
                "  {} {}",
                sample.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true),
                hint.format(sample.value())
            ));
        }
    }
    match report.statistics {
        Some(statistics) => lines.push(format!(
            "samples={} {}",
            statistics.count,
            statistics.format(hint)
        )),
        None => lines.push("No data in range.".to_owned()),
    }
    lines
}

/// JSON view of a range report; samples only when requested.
#[derive(Debug, Serialize)]
pub(crate) struct RangeJson<'report> {
    kind: MetricKind,
    label: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    count: usize,
    statistics: Option<Statistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<&'report [Sample]>,
}

pub(crate) fn range_json(report: &RangeReport, raw: bool) -> RangeJson<'_> {
    RangeJson {
        kind: report.kind,
        label: report.kind.display_label(),
        start: report.start,
        end: report.end,
        count: report.samples.len(),
        statistics: report.statistics,
        samples: raw.then_some(report.samples.as_slice()),
    }
}
