//! Wire messages for the progress channel.
//!
//! The weaving service exchanges untyped JSON records over the socket.
//! This module serializes the single outbound handshake and classifies
//! inbound records into [`ServerMessage`] variants by shape: an `error`
//! field wins over `resultUrl`, which wins over a progress record, and
//! anything else is ignorable rather than fatal.

use serde::{Deserialize, Serialize};
use weft_core::config::WeaveConfig;
use weft_core::job::{JobHandle, ProgressEvent};

/// The one message the client sends, immediately after connect.
///
/// The channel is receive-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Handshake {
    #[serde(rename = "jobId")]
    job_id: String,
    #[serde(rename = "remoteFilename")]
    remote_filename: String,
    config: HandshakeConfig,
}

/// Nested configuration record inside the handshake.
#[derive(Debug, Clone, Serialize)]
struct HandshakeConfig {
    layering: Layering,
    #[serde(rename = "primarySoundName")]
    primary_sound_name: String,
    #[serde(rename = "ticksPerSecond")]
    ticks_per_second: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Layering {
    max_layers: u32,
}

impl Handshake {
    /// Assemble the handshake for a job.
    ///
    /// `primary_sound_name` is the filename of the bundle's primary
    /// palette entry.
    pub fn new(
        handle: &JobHandle,
        config: &WeaveConfig,
        primary_sound_name: impl Into<String>,
    ) -> Self {
        Self {
            job_id: handle.job_id.clone(),
            remote_filename: handle.remote_filename.clone(),
            config: HandshakeConfig {
                layering: Layering {
                    max_layers: config.max_layers(),
                },
                primary_sound_name: primary_sound_name.into(),
                ticks_per_second: config.tick_rate_hz(),
            },
        }
    }

    /// Serialize to the JSON text frame sent on the socket.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An inbound record, classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// The service reported the job as failed. Terminal.
    Failed { message: String },
    /// The job completed; `result_url` is a service-relative path. Terminal.
    Completed { result_url: String },
    /// Non-terminal progress.
    Progress(ProgressEvent),
    /// Unknown shape; must be skipped, never treated as fatal.
    Unrecognized,
}

/// Shapes the service is known to send. Declaration order encodes the
/// classification priority: `Failed` is tried before `Completed`, so a
/// record carrying both `error` and `resultUrl` classifies as a failure.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMessage {
    Failed {
        error: String,
    },
    Completed {
        #[serde(rename = "resultUrl")]
        result_url: String,
    },
    Progress {
        status: String,
        percent: u8,
    },
}

/// Classify one text frame from the socket.
///
/// Never fails: frames that are not JSON records of a known shape come
/// back as [`ServerMessage::Unrecognized`].
pub fn classify(text: &str) -> ServerMessage {
    match serde_json::from_str::<RawMessage>(text) {
        Ok(RawMessage::Failed { error }) => ServerMessage::Failed { message: error },
        Ok(RawMessage::Completed { result_url }) => ServerMessage::Completed { result_url },
        Ok(RawMessage::Progress { status, percent }) => {
            ServerMessage::Progress(ProgressEvent { status, percent })
        }
        Err(_) => ServerMessage::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> JobHandle {
        JobHandle {
            job_id: "job-42".to_string(),
            remote_filename: "song.mid".to_string(),
        }
    }

    #[test]
    fn classify_progress_record() {
        let msg = classify(r#"{"status":"rendering","percent":40}"#);
        assert_eq!(
            msg,
            ServerMessage::Progress(ProgressEvent {
                status: "rendering".to_string(),
                percent: 40,
            })
        );
    }

    #[test]
    fn classify_result_record() {
        let msg = classify(r#"{"resultUrl":"/jobs/42/out.wav"}"#);
        assert_eq!(
            msg,
            ServerMessage::Completed {
                result_url: "/jobs/42/out.wav".to_string(),
            }
        );
    }

    #[test]
    fn classify_error_record() {
        let msg = classify(r#"{"error":"invalid midi"}"#);
        assert_eq!(
            msg,
            ServerMessage::Failed {
                message: "invalid midi".to_string(),
            }
        );
    }

    #[test]
    fn error_takes_priority_over_result_url() {
        let msg = classify(r#"{"error":"boom","resultUrl":"/jobs/42/out.wav"}"#);
        assert_eq!(
            msg,
            ServerMessage::Failed {
                message: "boom".to_string(),
            }
        );
    }

    #[test]
    fn unknown_record_is_unrecognized() {
        assert_eq!(classify(r#"{"queue_position":3}"#), ServerMessage::Unrecognized);
    }

    #[test]
    fn non_json_is_unrecognized() {
        assert_eq!(classify("not json at all"), ServerMessage::Unrecognized);
    }

    #[test]
    fn progress_with_missing_percent_is_unrecognized() {
        assert_eq!(classify(r#"{"status":"rendering"}"#), ServerMessage::Unrecognized);
    }

    #[test]
    fn handshake_matches_wire_shape() {
        let config = WeaveConfig::new(2, 20).unwrap();
        let handshake = Handshake::new(&handle(), &config, "harp_pling.wav");

        let value: serde_json::Value =
            serde_json::from_str(&handshake.to_text().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "jobId": "job-42",
                "remoteFilename": "song.mid",
                "config": {
                    "layering": { "max_layers": 2 },
                    "primarySoundName": "harp_pling.wav",
                    "ticksPerSecond": 20,
                },
            })
        );
    }
}
