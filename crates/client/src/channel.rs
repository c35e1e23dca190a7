//! Progress channel: one WebSocket connection per job.
//!
//! [`ProgressChannel::open`] connects to the service's process socket and
//! sends the job handshake before returning, so no inbound message can be
//! handled ahead of it. [`ProgressChannel::run`] then drives the receive
//! loop until a terminal message, a transport failure, or cancellation,
//! and tears the socket down on every exit path.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use weft_core::config::WeaveConfig;
use weft_core::job::{FailureKind, JobHandle, Outcome, ProgressEvent};

use crate::endpoints::ServiceEndpoints;
use crate::messages::{classify, Handshake, ServerMessage};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Generic text for transport-level failures. Kept apart from remote
/// protocol failures via [`FailureKind::Connection`].
const CONNECTION_FAILURE_TEXT: &str = "Connection to the weaving service was lost";

/// Errors raised while establishing the channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to connect, or to write the handshake.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The handshake could not be encoded.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// A live streaming connection for one job.
///
/// Exactly one terminal [`Outcome`] is produced per channel (or none,
/// when cancelled before a terminal message), and the underlying socket
/// is released exactly once: [`run`](Self::run) consumes the channel.
pub struct ProgressChannel {
    stream: WsStream,
    cancel: CancellationToken,
    job_id: String,
}

impl ProgressChannel {
    /// Connect to the process socket and send the job handshake.
    ///
    /// The handshake write completes before this function returns.
    /// Cancelling `cancel` later closes the connection from [`run`].
    pub async fn open(
        endpoints: &ServiceEndpoints,
        handle: &JobHandle,
        config: &WeaveConfig,
        primary_sound_name: &str,
        cancel: CancellationToken,
    ) -> Result<Self, ChannelError> {
        let url = endpoints.process_socket_url();

        let (mut stream, _response) = connect_async(&url).await.map_err(|e| {
            ChannelError::Connection(format!("Failed to connect to {url}: {e}"))
        })?;

        let handshake = Handshake::new(handle, config, primary_sound_name);
        let text = handshake
            .to_text()
            .map_err(|e| ChannelError::Protocol(format!("Failed to encode handshake: {e}")))?;
        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::Connection(format!("Failed to send handshake: {e}")))?;

        tracing::info!(job_id = %handle.job_id, "Progress channel open, handshake sent");

        Ok(Self {
            stream,
            cancel,
            job_id: handle.job_id.clone(),
        })
    }

    /// Drive the receive loop to completion.
    ///
    /// Progress records are forwarded through `progress_tx` in arrival
    /// order. Returns `Some(outcome)` when a terminal message or a
    /// transport failure ends the job, or `None` when cancelled before
    /// any terminal message arrived (no outcome is emitted in that
    /// case). The socket is closed before returning, on every path.
    pub async fn run(mut self, progress_tx: mpsc::UnboundedSender<ProgressEvent>) -> Option<Outcome> {
        let outcome = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(job_id = %self.job_id, "Progress channel cancelled");
                    break None;
                }
                frame = self.stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match classify(&text) {
                            ServerMessage::Progress(event) => {
                                tracing::debug!(
                                    job_id = %self.job_id,
                                    status = %event.status,
                                    percent = event.percent,
                                    "Job progress",
                                );
                                let _ = progress_tx.send(event);
                            }
                            ServerMessage::Completed { result_url } => {
                                tracing::info!(
                                    job_id = %self.job_id,
                                    result_url = %result_url,
                                    "Job completed",
                                );
                                break Some(Outcome::Success {
                                    result_location: result_url,
                                });
                            }
                            ServerMessage::Failed { message } => {
                                tracing::warn!(
                                    job_id = %self.job_id,
                                    error = %message,
                                    "Service reported job failure",
                                );
                                break Some(Outcome::Failure {
                                    kind: FailureKind::Remote,
                                    message,
                                });
                            }
                            ServerMessage::Unrecognized => {
                                tracing::warn!(
                                    job_id = %self.job_id,
                                    raw_message = %text,
                                    "Ignoring unrecognized message",
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::trace!(job_id = %self.job_id, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::error!(
                            job_id = %self.job_id,
                            ?frame,
                            "Connection closed before terminal message",
                        );
                        break Some(connection_failure());
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        tracing::error!(
                            job_id = %self.job_id,
                            error = %e,
                            "Socket receive error",
                        );
                        break Some(connection_failure());
                    }
                    None => {
                        tracing::error!(
                            job_id = %self.job_id,
                            "Socket ended before terminal message",
                        );
                        break Some(connection_failure());
                    }
                }
            }
        };

        // Single teardown point for every exit path. A close error just
        // means the peer is already gone.
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(job_id = %self.job_id, error = %e, "Socket already closed");
        }

        outcome
    }
}

fn connection_failure() -> Outcome {
    Outcome::Failure {
        kind: FailureKind::Connection,
        message: CONNECTION_FAILURE_TEXT.to_string(),
    }
}
