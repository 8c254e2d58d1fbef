//! Telemetry samples and stream frames, validated at the wire boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::MetricKind;
use crate::error::DecodeError;

/// Frame tag sent with the backfill right after a client connects.
const FRAME_INITIAL_DATA: &str = "initial_data";
/// Frame tag sent with each live sample.
const FRAME_UPDATE_DATA: &str = "update_data";

/// One telemetry reading. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    value: f64,
    #[serde(rename = "type")]
    kind: MetricKind,
}

impl Sample {
    /// Builds a sample, rejecting NaN and infinite values.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NonFiniteValue`] when `value` is not finite.
    pub fn new(kind: MetricKind, timestamp: DateTime<Utc>, value: f64) -> Result<Self, DecodeError> {
        if !value.is_finite() {
            return Err(DecodeError::NonFiniteValue { value });
        }
        Ok(Self {
            timestamp,
            value,
            kind,
        })
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }
}

/// Tag carried by a stream frame. It never changes how the payload is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    InitialData,
    UpdateData,
    Other(String),
}

impl FrameKind {
    fn from_tag(tag: String) -> Self {
        match tag.as_str() {
            FRAME_INITIAL_DATA => FrameKind::InitialData,
            FRAME_UPDATE_DATA => FrameKind::UpdateData,
            _ => FrameKind::Other(tag),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FrameKind::InitialData => FRAME_INITIAL_DATA,
            FrameKind::UpdateData => FRAME_UPDATE_DATA,
            FrameKind::Other(tag) => tag,
        }
    }
}

/// One decoded stream message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<Sample>,
}

impl Frame {
    /// Decodes a frame from the JSON body of a stream message.
    ///
    /// A `null` payload is treated as empty. Any sample that fails validation
    /// rejects the whole frame.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the JSON is malformed or a sample is invalid.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let payload = validate_samples(raw.payload.unwrap_or_default())?;
        Ok(Self {
            kind: FrameKind::from_tag(raw.kind),
            payload,
        })
    }
}

/// Decodes a historical response body: a JSON array of samples or `null`.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the body is not an array of valid samples.
pub fn decode_samples(body: &[u8]) -> Result<Vec<Sample>, DecodeError> {
    let raw: Option<Vec<RawSample>> = serde_json::from_slice(body)?;
    validate_samples(raw.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    kind: String,
    // Must be present, but may be null.
    #[serde(deserialize_with = "deserialize_nullable")]
    payload: Option<Vec<RawSample>>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    timestamp: String,
    value: f64,
    #[serde(rename = "type")]
    kind: String,
}

fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

impl TryFrom<RawSample> for Sample {
    type Error = DecodeError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        let kind = MetricKind::from_wire_id(&raw.kind)
            .ok_or(DecodeError::UnknownMetricKind { value: raw.kind })?;
        let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
            .map_err(|source| DecodeError::InvalidTimestamp {
                value: raw.timestamp,
                source,
            })?
            .with_timezone(&Utc);
        Sample::new(kind, timestamp, raw.value)
    }
}

fn validate_samples(raw: Vec<RawSample>) -> Result<Vec<Sample>, DecodeError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, sample)| {
            Sample::try_from(sample).map_err(|source| DecodeError::InvalidSample {
                index,
                source: Box::new(source),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_update_frame() -> Result<(), String> {
        let frame = Frame::decode(
            r#"{"kind":"update_data","payload":[{"timestamp":"2025-01-02T03:04:05Z","value":1012.5,"type":"PowerInput"}]}"#,
        )
        .map_err(|err| format!("decode failed: {}", err))?;
        if frame.kind != FrameKind::UpdateData {
            return Err(format!("Unexpected frame kind: {:?}", frame.kind));
        }
        let sample = frame.payload.first().ok_or("Missing sample")?;
        if sample.kind() != MetricKind::PowerInput {
            return Err("Unexpected metric kind".to_owned());
        }
        if sample.timestamp().to_rfc3339() != "2025-01-02T03:04:05+00:00" {
            return Err(format!("Unexpected timestamp: {}", sample.timestamp()));
        }
        Ok(())
    }

    #[test]
    fn decode_keeps_mixed_kinds_in_payload_order() -> Result<(), String> {
        let frame = Frame::decode(
            r#"{"kind":"initial_data","payload":[
                {"timestamp":"2025-01-02T03:04:05.123456789Z","value":51.2,"type":"WaterFlowRate"},
                {"timestamp":"2025-01-02T03:04:06+02:00","value":92,"type":"Efficiency"}
            ]}"#,
        )
        .map_err(|err| format!("decode failed: {}", err))?;
        let kinds: Vec<MetricKind> = frame.payload.iter().map(Sample::kind).collect();
        if kinds != vec![MetricKind::WaterFlowRate, MetricKind::Efficiency] {
            return Err(format!("Unexpected kinds: {:?}", kinds));
        }
        if frame.kind != FrameKind::InitialData {
            return Err("Unexpected frame kind".to_owned());
        }
        Ok(())
    }

    #[test]
    fn unknown_frame_tag_is_kept() -> Result<(), String> {
        let frame = Frame::decode(r#"{"kind":"heartbeat","payload":[]}"#)
            .map_err(|err| format!("decode failed: {}", err))?;
        if frame.kind.as_str() != "heartbeat" || !frame.payload.is_empty() {
            return Err(format!("Unexpected frame: {:?}", frame));
        }
        Ok(())
    }

    #[test]
    fn null_payload_decodes_as_empty() -> Result<(), String> {
        let frame = Frame::decode(r#"{"kind":"update_data","payload":null}"#)
            .map_err(|err| format!("decode failed: {}", err))?;
        if !frame.payload.is_empty() {
            return Err("Expected empty payload".to_owned());
        }
        Ok(())
    }

    #[test]
    fn missing_payload_is_rejected() -> Result<(), String> {
        match Frame::decode(r#"{"kind":"update_data"}"#) {
            Err(DecodeError::Json { .. }) => Ok(()),
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    }

    #[test]
    fn unknown_metric_kind_rejects_frame() -> Result<(), String> {
        let result = Frame::decode(
            r#"{"kind":"update_data","payload":[
                {"timestamp":"2025-01-02T03:04:05Z","value":1.0,"type":"PowerInput"},
                {"timestamp":"2025-01-02T03:04:05Z","value":1.0,"type":"Pressure"}
            ]}"#,
        );
        match result {
            Err(DecodeError::InvalidSample { index: 1, source }) => match *source {
                DecodeError::UnknownMetricKind { value } if value == "Pressure" => Ok(()),
                other => Err(format!("Unexpected source: {:?}", other)),
            },
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    }

    #[test]
    fn bad_timestamp_is_rejected() -> Result<(), String> {
        let result = decode_samples(br#"[{"timestamp":"yesterday","value":1.0,"type":"Temperature"}]"#);
        match result {
            Err(DecodeError::InvalidSample { index: 0, source }) => match *source {
                DecodeError::InvalidTimestamp { .. } => Ok(()),
                other => Err(format!("Unexpected source: {:?}", other)),
            },
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    }

    #[test]
    fn string_value_is_rejected() -> Result<(), String> {
        match decode_samples(br#"[{"timestamp":"2025-01-02T03:04:05Z","value":"12","type":"Temperature"}]"#) {
            Err(DecodeError::Json { .. }) => Ok(()),
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    }

    #[test]
    fn null_history_body_is_empty() -> Result<(), String> {
        let samples = decode_samples(b"null\n").map_err(|err| format!("decode failed: {}", err))?;
        if !samples.is_empty() {
            return Err("Expected no samples".to_owned());
        }
        Ok(())
    }

    #[test]
    fn sample_rejects_non_finite_value() -> Result<(), String> {
        match Sample::new(MetricKind::Temperature, Utc::now(), f64::NAN) {
            Err(DecodeError::NonFiniteValue { .. }) => Ok(()),
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    }

    #[test]
    fn sample_serializes_with_wire_field_names() -> Result<(), String> {
        let timestamp = DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .map_err(|err| format!("timestamp parse failed: {}", err))?
            .with_timezone(&Utc);
        let sample = Sample::new(MetricKind::Efficiency, timestamp, 93.5)
            .map_err(|err| format!("sample failed: {}", err))?;
        let json = serde_json::to_string(&sample).map_err(|err| format!("json failed: {}", err))?;
        if json != r#"{"timestamp":"2025-01-02T03:04:05Z","value":93.5,"type":"Efficiency"}"# {
            return Err(format!("Unexpected json: {}", json));
        }
        Ok(())
    }
}
