use std::collections::VecDeque;
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const ACCEPT_POLL: Duration = Duration::from_millis(10);
const CHUNK_PAUSE: Duration = Duration::from_millis(20);
const MAX_REQUEST_HEAD: usize = 16 * 1024;

/// One `/events` connection: chunks written in order, then the connection is
/// closed or held open until the server shuts down.
#[derive(Debug, Clone)]
pub struct EventSession {
    pub chunks: Vec<String>,
    pub hold_open: bool,
}

/// Canned `/historical` response.
#[derive(Debug, Clone)]
pub struct HistoricalResponse {
    pub status: u16,
    pub body: String,
    /// Announce a longer body than is sent, then close the connection.
    pub cut_short: bool,
}

impl HistoricalResponse {
    #[must_use]
    pub fn ok(body: &str) -> Self {
        Self::error(200, body)
    }

    #[must_use]
    pub fn error(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            cut_short: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Backend {
    pub events: Vec<EventSession>,
    pub historical: Option<HistoricalResponse>,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct Shared {
    sessions: Mutex<VecDeque<EventSession>>,
    historical: Option<HistoricalResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
    stopping: AtomicBool,
}

pub struct ServerHandle {
    shared: Arc<Shared>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Requests seen so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a fake telemetry backend serving `/events` and `/historical`.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_backend(backend: Backend) -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let shared = Arc::new(Shared {
        sessions: Mutex::new(backend.events.into_iter().collect()),
        historical: backend.historical,
        requests: Mutex::new(Vec::new()),
        stopping: AtomicBool::new(false),
    });

    let accept_shared = Arc::clone(&shared);
    let handle = thread::spawn(move || {
        loop {
            if accept_shared.stopping.load(Ordering::SeqCst) {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    let client_shared = Arc::clone(&accept_shared);
                    thread::spawn(move || handle_client(stream, &client_shared));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shared,
            thread: Some(handle),
        },
    ))
}

fn handle_client(mut stream: TcpStream, shared: &Shared) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let path = request
        .target
        .split_once('?')
        .map_or(request.target.as_str(), |(path, _)| path)
        .to_owned();
    if let Ok(mut requests) = shared.requests.lock() {
        requests.push(request);
    }

    match path.as_str() {
        "/events" => serve_events(&mut stream, shared),
        "/historical" => serve_historical(&mut stream, shared.historical.as_ref()),
        _ => write_response(&mut stream, 404, "{\"error\":\"not found\"}"),
    }
    drop(stream.shutdown(Shutdown::Both));
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut head = Vec::new();
    let mut buffer = [0u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        let read = stream.read(&mut buffer).ok()?;
        if read == 0 || head.len() > MAX_REQUEST_HEAD {
            return None;
        }
        head.extend_from_slice(buffer.get(..read)?);
    }
    let text = String::from_utf8_lossy(&head).into_owned();
    let mut lines = text.split("\r\n");
    let target = lines.next()?.split_whitespace().nth(1)?.to_owned();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect();
    Some(RecordedRequest { target, headers })
}

fn serve_events(stream: &mut TcpStream, shared: &Shared) {
    let session = shared
        .sessions
        .lock()
        .ok()
        .and_then(|mut sessions| sessions.pop_front());
    let Some(session) = session else {
        write_response(stream, 503, "{\"error\":\"no more sessions\"}");
        return;
    };
    let head = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n";
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    for chunk in &session.chunks {
        if stream.write_all(chunk.as_bytes()).is_err() || stream.flush().is_err() {
            return;
        }
        thread::sleep(CHUNK_PAUSE);
    }
    if session.hold_open {
        while !shared.stopping.load(Ordering::SeqCst) {
            thread::sleep(ACCEPT_POLL);
        }
    }
}

fn serve_historical(stream: &mut TcpStream, response: Option<&HistoricalResponse>) {
    match response {
        Some(response) if response.cut_short => {
            let declared = response.body.len().saturating_add(64);
            write_raw_response(stream, response.status, declared, &response.body);
        }
        Some(response) => write_response(stream, response.status, &response.body),
        None => write_response(stream, 404, "{\"error\":\"not found\"}"),
    }
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) {
    write_raw_response(stream, status, body.len(), body);
}

fn write_raw_response(stream: &mut TcpStream, status: u16, content_length: usize, body: &str) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        content_length,
        body
    );
    if stream.write_all(response.as_bytes()).is_ok() {
        drop(stream.flush());
    }
}

/// Formats one SSE message carrying a frame.
#[must_use]
pub fn sse_frame(kind: &str, samples: &[(&str, f64, &str)]) -> String {
    format!("data: {}\n\n", frame_json(kind, samples))
}

#[must_use]
pub fn frame_json(kind: &str, samples: &[(&str, f64, &str)]) -> String {
    format!("{{\"kind\":\"{}\",\"payload\":{}}}", kind, samples_json(samples))
}

#[must_use]
pub fn samples_json(samples: &[(&str, f64, &str)]) -> String {
    let items: Vec<String> = samples
        .iter()
        .map(|(timestamp, value, kind)| {
            format!(
                "{{\"timestamp\":\"{}\",\"value\":{},\"type\":\"{}\"}}",
                timestamp, value, kind
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

/// Polls `check` until it holds or `limit` passes.
pub fn wait_until<F>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let started = Instant::now();
    while started.elapsed() < limit {
        if check() {
            return true;
        }
        thread::sleep(ACCEPT_POLL);
    }
    check()
}

/// Run the `h2scope` binary and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_h2scope<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = h2scope_bin()?;
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "error")
        .env_remove("H2SCOPE_LOG")
        .env_remove("NO_COLOR")
        .output()
        .map_err(|err| format!("run h2scope failed: {}", err))
}

fn h2scope_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_h2scope").map_or_else(
        || Err("CARGO_BIN_EXE_h2scope missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
