//! Wire schema of the degradation-detection stream
//!
//! Every text (or binary) frame carries one JSON object. Sample frames hold a
//! point of the kurtosis series plus the detector's current SoD index and
//! threshold, both sentinel-encoded. A frame with `"status": "Finished"` marks
//! the end of the stream.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Wire value of `sod_index` meaning "no degradation detected yet"
pub const SOD_NOT_DETECTED: i64 = -1;

/// Wire value of `threshold` meaning "threshold not established yet"
pub const THRESHOLD_UNSET: f64 = 0.0;

/// `status` value of the end-of-stream frame
pub const STATUS_FINISHED: &str = "Finished";

/// Raw JSON frame as sent by the detection service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,

    #[serde(default)]
    pub below_threshold: Option<f64>,

    #[serde(default)]
    pub above_threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sod_index: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Frames the way the detection service emits them, for feeding clients in tests
#[cfg(test)]
impl WireFrame {
    pub(crate) fn sample(index: i64, raw: f64, sod_index: i64, threshold: f64) -> Self {
        let (below_threshold, above_threshold) = if threshold > THRESHOLD_UNSET && raw > threshold
        {
            (None, Some(raw))
        } else {
            (Some(raw), None)
        };

        Self {
            index: Some(index),
            raw: Some(raw),
            below_threshold,
            above_threshold,
            sod_index: Some(sod_index),
            threshold: Some(threshold),
            status: None,
        }
    }

    /// The end-of-stream frame
    pub(crate) fn finished() -> Self {
        Self {
            status: Some(STATUS_FINISHED.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

/// One point of a channel's time series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSample {
    /// x-axis position
    pub index: u64,

    /// Raw kurtosis magnitude
    pub raw: f64,

    /// Smoothed value while at or below the threshold
    pub below_threshold: Option<f64>,

    /// Smoothed value while above the threshold
    pub above_threshold: Option<f64>,
}

/// A sample frame with its sentinels already resolved
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFrame {
    pub sample: StreamSample,

    /// `None` when the wire carried the -1 sentinel
    pub sod_index: Option<u64>,

    /// `None` unless the wire value was strictly positive
    pub threshold: Option<f64>,
}

/// A decoded, schema-conforming frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamMessage {
    Sample(SampleFrame),
    Finished,
}

impl StreamMessage {
    /// Decode a text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let frame: WireFrame = serde_json::from_str(text)?;
        Self::try_from(frame)
    }

    /// Decode a binary frame holding UTF-8 JSON
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::decode(std::str::from_utf8(bytes)?)
    }
}

impl TryFrom<WireFrame> for StreamMessage {
    type Error = ProtocolError;

    fn try_from(frame: WireFrame) -> Result<Self, Self::Error> {
        if frame.status.as_deref() == Some(STATUS_FINISHED) {
            return Ok(StreamMessage::Finished);
        }

        let index = frame.index.ok_or(ProtocolError::MissingField("index"))?;
        let index = u64::try_from(index).map_err(|_| ProtocolError::InvalidValue {
            field: "index",
            value: index.to_string(),
        })?;

        let raw = frame.raw.ok_or(ProtocolError::MissingField("raw"))?;

        if frame.below_threshold.is_some() && frame.above_threshold.is_some() {
            return Err(ProtocolError::InvalidValue {
                field: "above_threshold",
                value: "set together with below_threshold".to_string(),
            });
        }

        let sod_index = match frame.sod_index.unwrap_or(SOD_NOT_DETECTED) {
            SOD_NOT_DETECTED => None,
            value if value >= 0 => Some(value as u64),
            value => {
                return Err(ProtocolError::InvalidValue {
                    field: "sod_index",
                    value: value.to_string(),
                });
            }
        };

        let threshold = frame
            .threshold
            .filter(|threshold| *threshold > THRESHOLD_UNSET);

        Ok(StreamMessage::Sample(SampleFrame {
            sample: StreamSample {
                index,
                raw,
                below_threshold: frame.below_threshold,
                above_threshold: frame.above_threshold,
            },
            sod_index,
            threshold,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_sample_frame() {
        let text = r#"{"index": 3, "raw": 3.25, "below_threshold": 3.1, "above_threshold": null, "sod_index": -1, "threshold": 0}"#;

        let message = StreamMessage::decode(text).unwrap();

        assert_eq!(
            message,
            StreamMessage::Sample(SampleFrame {
                sample: StreamSample {
                    index: 3,
                    raw: 3.25,
                    below_threshold: Some(3.1),
                    above_threshold: None,
                },
                sod_index: None,
                threshold: None,
            })
        );
    }

    #[test]
    fn test_decode_detected_frame() {
        let text = r#"{"index": 120, "raw": 9.0, "below_threshold": null, "above_threshold": 8.7, "sod_index": 117, "threshold": 5.2}"#;

        assert_matches!(
            StreamMessage::decode(text),
            Ok(StreamMessage::Sample(SampleFrame {
                sod_index: Some(117),
                threshold: Some(t),
                ..
            })) if t == 5.2
        );
    }

    #[test]
    fn test_decode_finished_frame() {
        assert_matches!(
            StreamMessage::decode(r#"{"status": "Finished"}"#),
            Ok(StreamMessage::Finished)
        );
    }

    #[test]
    fn test_finished_status_wins_over_sample_fields() {
        let text = r#"{"index": 1, "raw": 1.0, "sod_index": 1, "threshold": 2.0, "status": "Finished"}"#;
        assert_matches!(StreamMessage::decode(text), Ok(StreamMessage::Finished));
    }

    #[test]
    fn test_absent_sentinels_default_to_unset() {
        let message = StreamMessage::decode(r#"{"index": 0, "raw": 1.5}"#).unwrap();

        assert_matches!(
            message,
            StreamMessage::Sample(SampleFrame {
                sod_index: None,
                threshold: None,
                ..
            })
        );
    }

    #[test]
    fn test_non_positive_threshold_is_unset() {
        let message =
            StreamMessage::decode(r#"{"index": 0, "raw": 1.5, "threshold": -4.0}"#).unwrap();
        assert_matches!(message, StreamMessage::Sample(SampleFrame { threshold: None, .. }));
    }

    #[test]
    fn test_missing_index_is_rejected() {
        assert_matches!(
            StreamMessage::decode(r#"{"raw": 1.0, "sod_index": -1, "threshold": 0}"#),
            Err(ProtocolError::MissingField("index"))
        );
    }

    #[test]
    fn test_missing_raw_is_rejected() {
        assert_matches!(
            StreamMessage::decode(r#"{"index": 1}"#),
            Err(ProtocolError::MissingField("raw"))
        );
    }

    #[test]
    fn test_unknown_status_without_sample_is_rejected() {
        assert_matches!(
            StreamMessage::decode(r#"{"status": "Paused"}"#),
            Err(ProtocolError::MissingField("index"))
        );
    }

    #[test]
    fn test_negative_index_is_rejected() {
        assert_matches!(
            StreamMessage::decode(r#"{"index": -5, "raw": 1.0}"#),
            Err(ProtocolError::InvalidValue { field: "index", .. })
        );
    }

    #[test]
    fn test_negative_sod_other_than_sentinel_is_rejected() {
        assert_matches!(
            StreamMessage::decode(r#"{"index": 5, "raw": 1.0, "sod_index": -2}"#),
            Err(ProtocolError::InvalidValue {
                field: "sod_index",
                ..
            })
        );
    }

    #[test]
    fn test_both_split_values_are_rejected() {
        let text = r#"{"index": 5, "raw": 1.0, "below_threshold": 1.0, "above_threshold": 1.0}"#;
        assert_matches!(StreamMessage::decode(text), Err(ProtocolError::InvalidValue { .. }));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_matches!(
            StreamMessage::decode("{not json"),
            Err(ProtocolError::Malformed(_))
        );
        assert_matches!(
            StreamMessage::decode(r#"{"index": "seven", "raw": 1.0}"#),
            Err(ProtocolError::Malformed(_))
        );
    }

    #[test]
    fn test_decode_bytes_rejects_invalid_utf8() {
        assert_matches!(
            StreamMessage::decode_bytes(&[0xff, 0xfe, 0x00]),
            Err(ProtocolError::Encoding(_))
        );
    }

    #[test]
    fn test_wire_frame_sample_splits_at_threshold() {
        let below = WireFrame::sample(0, 3.0, -1, 5.0);
        assert_eq!(below.below_threshold, Some(3.0));
        assert_eq!(below.above_threshold, None);

        let above = WireFrame::sample(1, 6.0, -1, 5.0);
        assert_eq!(above.below_threshold, None);
        assert_eq!(above.above_threshold, Some(6.0));
    }

    #[test]
    fn test_wire_frame_json_decodes() {
        let json = WireFrame::sample(7, 4.5, 3, 4.0).to_json();
        assert_matches!(
            StreamMessage::decode(&json),
            Ok(StreamMessage::Sample(SampleFrame {
                sod_index: Some(3),
                ..
            }))
        );

        assert_matches!(
            StreamMessage::decode(&WireFrame::finished().to_json()),
            Ok(StreamMessage::Finished)
        );
    }
}
