use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{DecodeError, StreamError};
use crate::model::{Frame, Sample};
use crate::shutdown::{ShutdownReceiver, ShutdownSender, shutdown_channel};

use super::backoff::{Backoff, ReconnectPolicy};
use super::sse::{EventParser, SseEvent};

const EVENT_STREAM: &str = "text/event-stream";
const LAST_EVENT_ID: &str = "Last-Event-ID";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Receives every decoded sample, in stream order, on the ingestion task.
pub trait SampleHandler: Send + 'static {
    fn on_sample(&mut self, sample: Sample);
}

impl<F> SampleHandler for F
where
    F: FnMut(Sample) + Send + 'static,
{
    fn on_sample(&mut self, sample: Sample) {
        self(sample);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    frames_received: AtomicU64,
    frames_rejected: AtomicU64,
    samples_delivered: AtomicU64,
    connects: AtomicU64,
}

impl StreamCounters {
    fn snapshot(&self) -> StreamStats {
        StreamStats {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            samples_delivered: self.samples_delivered.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time ingestion counters of a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_received: u64,
    pub frames_rejected: u64,
    pub samples_delivered: u64,
    pub connects: u64,
}

/// Handle to a running stream subscription.
///
/// Dropping the handle stops the ingestion task; [`Subscription::close`]
/// additionally waits for it, after which the handler is never called again.
pub struct Subscription {
    endpoint: Url,
    shutdown_tx: ShutdownSender,
    state_rx: watch::Receiver<ConnectionState>,
    counters: Arc<StreamCounters>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("endpoint", &self.endpoint.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Receiver for connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    /// True once the ingestion task has stopped, e.g. after reconnects ran out.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits until the connection reaches `target`, up to `limit`.
    pub async fn wait_for_state(&self, target: ConnectionState, limit: Duration) -> bool {
        let mut state_rx = self.state_rx.clone();
        tokio::time::timeout(limit, state_rx.wait_for(|state| *state == target))
            .await
            .is_ok_and(|result| result.is_ok())
    }

    /// Stops the subscription and waits for the ingestion task to exit.
    pub async fn close(mut self) {
        drop(self.shutdown_tx.send(()));
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            debug!("Stream task ended abnormally: {}", err);
        }
        info!("Closed telemetry stream {}", self.endpoint);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.shutdown_tx.send(()));
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Opens a subscription to a server-sent-events endpoint.
///
/// Returns immediately in the `Connecting` state; connection and reconnects
/// happen on a background task of the current Tokio runtime.
///
/// # Errors
///
/// Returns an error when the endpoint is not a valid URL, the HTTP client
/// cannot be built, or no Tokio runtime is running.
pub fn open<H>(endpoint: &str, handler: H, options: &StreamOptions) -> Result<Subscription, StreamError>
where
    H: SampleHandler,
{
    let url = Url::parse(endpoint).map_err(|source| StreamError::InvalidUrl {
        url: endpoint.to_owned(),
        source,
    })?;
    let runtime = tokio::runtime::Handle::try_current().map_err(|_err| StreamError::NoRuntime)?;
    let client = reqwest::Client::builder()
        .connect_timeout(options.connect_timeout)
        .tcp_nodelay(true)
        .build()
        .map_err(|source| StreamError::BuildClient { source })?;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
    let counters = Arc::new(StreamCounters::default());
    let worker = StreamWorker {
        client,
        url: url.clone(),
        handler,
        counters: Arc::clone(&counters),
        state_tx,
        parser: EventParser::new(),
        backoff: Backoff::new(options.reconnect.clone()),
    };
    let task = runtime.spawn(worker.run(shutdown_rx));

    Ok(Subscription {
        endpoint: url,
        shutdown_tx,
        state_rx,
        counters,
        task: Some(task),
    })
}

enum SessionEnd {
    Shutdown,
    Closed { messages: u64 },
    Failed { error: StreamError, messages: u64 },
}

struct StreamWorker<H> {
    client: reqwest::Client,
    url: Url,
    handler: H,
    counters: Arc<StreamCounters>,
    state_tx: watch::Sender<ConnectionState>,
    parser: EventParser,
    backoff: Backoff,
}

impl<H: SampleHandler> StreamWorker<H> {
    async fn run(mut self, mut shutdown_rx: ShutdownReceiver) {
        loop {
            self.state_tx.send_replace(ConnectionState::Connecting);
            let connected = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                result = connect(
                    self.client.clone(),
                    self.url.clone(),
                    self.parser.last_event_id().map(str::to_owned),
                ) => result,
            };

            let productive = match connected {
                Ok(response) => {
                    self.counters.connects.fetch_add(1, Ordering::Relaxed);
                    self.state_tx.send_replace(ConnectionState::Connected);
                    info!("Connected to telemetry stream {}", self.url);
                    match self.pump(response, &mut shutdown_rx).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Closed { messages } => {
                            warn!("Telemetry stream closed by server after {} messages", messages);
                            messages > 0
                        }
                        SessionEnd::Failed { error, messages } => {
                            warn!("Telemetry stream interrupted: {}", error);
                            messages > 0
                        }
                    }
                }
                Err(err) => {
                    warn!("Telemetry stream connect failed: {}", err);
                    false
                }
            };

            self.parser.reset();
            self.state_tx.send_replace(ConnectionState::Disconnected);
            if productive {
                self.backoff.reset();
            }
            if let Some(retry) = self.parser.take_retry() {
                self.backoff.set_initial_delay(retry);
            }
            if self.backoff.exhausted() {
                warn!(
                    "Giving up on telemetry stream after {} reconnect attempts",
                    self.backoff.failures()
                );
                break;
            }

            let delay = self.backoff.next_delay();
            debug!("Reconnecting to {} in {}ms", self.url, delay.as_millis());
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    async fn pump(
        &mut self,
        response: reqwest::Response,
        shutdown_rx: &mut ShutdownReceiver,
    ) -> SessionEnd {
        let mut body = response.bytes_stream();
        let mut messages: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => return SessionEnd::Shutdown,
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for item in self.parser.feed(&bytes) {
                            messages = messages.saturating_add(1);
                            dispatch_event(item, &mut self.handler, &self.counters);
                        }
                    }
                    Some(Err(source)) => {
                        return SessionEnd::Failed {
                            error: StreamError::Body { source },
                            messages,
                        };
                    }
                    None => return SessionEnd::Closed { messages },
                },
            }
        }
    }
}

/// Sends the stream request. Takes owned inputs so the spawned worker future
/// never holds a borrow of the handler across the await.
async fn connect(
    client: reqwest::Client,
    url: Url,
    last_event_id: Option<String>,
) -> Result<reqwest::Response, StreamError> {
    let mut request = client
        .get(url)
        .header(ACCEPT, EVENT_STREAM)
        .header(CACHE_CONTROL, "no-cache");
    if let Some(id) = last_event_id {
        request = request.header(LAST_EVENT_ID, id);
    }
    let response = request
        .send()
        .await
        .map_err(|source| StreamError::Connect { source })?;
    let status = response.status();
    if !status.is_success() {
        return Err(StreamError::UnexpectedStatus { status });
    }
    Ok(response)
}

/// Decodes one event and hands its samples to `handler` in payload order.
/// Malformed frames are logged and dropped.
pub(crate) fn dispatch_event<H: SampleHandler>(
    item: Result<SseEvent, DecodeError>,
    handler: &mut H,
    counters: &StreamCounters,
) {
    counters.frames_received.fetch_add(1, Ordering::Relaxed);
    match item.and_then(|event| Frame::decode(&event.data)) {
        Ok(frame) => {
            debug!(
                "Frame {} with {} samples",
                frame.kind.as_str(),
                frame.payload.len()
            );
            for sample in frame.payload {
                handler.on_sample(sample);
                counters.samples_delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
        Err(err) => {
            counters.frames_rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Dropping malformed telemetry frame: {}", err);
        }
    }
}

#[cfg(test)]
pub(crate) fn counters_snapshot(counters: &StreamCounters) -> StreamStats {
    counters.snapshot()
}
