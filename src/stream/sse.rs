use std::time::Duration;

use crate::error::DecodeError;

const FIELD_DATA: &str = "data";
const FIELD_EVENT: &str = "event";
const FIELD_ID: &str = "id";
const FIELD_RETRY: &str = "retry";

/// Longest line kept in the buffer while waiting for its terminator.
pub const MAX_LINE_BYTES: usize = 256 * 1024;
/// Largest `data` payload accumulated for one event.
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` parser.
///
/// Bytes may arrive split anywhere, including inside a line or between a
/// `\r` and its `\n`. Memory is bounded by [`MAX_LINE_BYTES`] for the
/// pending line and [`MAX_EVENT_BYTES`] for event data; an event that
/// outgrows either is reported as [`DecodeError::EventTooLarge`].
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: Vec<u8>,
    // Prefix of `buffer` already known to hold no line terminator.
    scanned: usize,
    // Dropping the rest of an oversized line up to its terminator.
    discarding: bool,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_event_id: Option<String>,
    retry: Option<Duration>,
    poisoned: Option<DecodeError>,
}

impl EventParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event completed by it, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<SseEvent, DecodeError>> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(line) = self.next_line() {
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            match std::str::from_utf8(&line) {
                Ok(text) => {
                    if let Some(item) = self.process_line(text) {
                        out.push(item);
                    }
                }
                Err(source) => self.poison(DecodeError::InvalidUtf8 { source }),
            }
        }
        self.enforce_line_limit();
        out
    }

    /// Server-requested reconnect delay, consumed once.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Discards any partial event. Called when a connection ends; the last
    /// event id is kept for the next request.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.discarding = false;
        self.clear_event();
    }

    fn next_line(&mut self) -> Option<Vec<u8>> {
        let unscanned = self.buffer.get(self.scanned..)?;
        let Some(offset) = unscanned
            .iter()
            .position(|byte| *byte == b'\n' || *byte == b'\r')
        else {
            self.scanned = self.buffer.len();
            return None;
        };
        let pos = self.scanned.saturating_add(offset);
        let terminator = *self.buffer.get(pos)?;
        let consumed = if terminator == b'\r' {
            match self.buffer.get(pos.saturating_add(1)) {
                Some(b'\n') => pos.saturating_add(2),
                Some(_) => pos.saturating_add(1),
                None => {
                    // Wait for the next chunk to see whether `\n` follows.
                    self.scanned = pos;
                    return None;
                }
            }
        } else {
            pos.saturating_add(1)
        };
        let mut line: Vec<u8> = self.buffer.drain(..consumed).collect();
        line.truncate(pos);
        self.scanned = 0;
        Some(line)
    }

    /// Drops a pending line that grew past [`MAX_LINE_BYTES`] without a
    /// terminator and skips its remainder.
    fn enforce_line_limit(&mut self) {
        if self.buffer.len() <= MAX_LINE_BYTES {
            return;
        }
        if !self.discarding {
            self.poison(DecodeError::EventTooLarge {
                limit: MAX_LINE_BYTES,
            });
        }
        // A trailing `\r` may still pair with the next chunk's `\n`.
        let keep_cr = self.buffer.last() == Some(&b'\r');
        self.buffer.clear();
        if keep_cr {
            self.buffer.push(b'\r');
        }
        self.scanned = 0;
        self.discarding = true;
    }

    fn process_line(&mut self, line: &str) -> Option<Result<SseEvent, DecodeError>> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            FIELD_DATA => self.push_data(value),
            FIELD_EVENT => self.event = Some(value.to_owned()),
            FIELD_ID => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_owned());
                }
            }
            FIELD_RETRY => {
                if !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(ms));
                    }
                }
            }
            _ => {}
        }
        None
    }

    fn push_data(&mut self, value: &str) {
        let separator = usize::from(self.has_data);
        self.has_data = true;
        if self.poisoned.is_some() {
            return;
        }
        let grown = self
            .data
            .len()
            .saturating_add(separator)
            .saturating_add(value.len());
        if grown > MAX_EVENT_BYTES {
            self.data.clear();
            self.poison(DecodeError::EventTooLarge {
                limit: MAX_EVENT_BYTES,
            });
            return;
        }
        if separator > 0 {
            self.data.push('\n');
        }
        self.data.push_str(value);
    }

    fn poison(&mut self, error: DecodeError) {
        self.poisoned.get_or_insert(error);
    }

    fn dispatch(&mut self) -> Option<Result<SseEvent, DecodeError>> {
        if let Some(error) = self.poisoned.take() {
            self.clear_event();
            return Some(Err(error));
        }
        if !self.has_data {
            self.event = None;
            return None;
        }
        let event = SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data),
            id: self.last_event_id.clone(),
        };
        self.has_data = false;
        Some(Ok(event))
    }

    fn clear_event(&mut self) {
        self.data.clear();
        self.has_data = false;
        self.event = None;
        self.poisoned = None;
    }
}
