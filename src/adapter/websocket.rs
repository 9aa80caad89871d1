//! WebSocket transport.
//!
//! Implements the `port::Connector` trait on top of `tokio-tungstenite`.
//! Each link runs two tasks: a writer draining [`TransportCommand`]s into
//! the socket and a reader turning frames into [`TransportEvent`]s.
//!
//! Ping frames from the server are answered by tungstenite itself; the
//! application-level `{"action":"ping"}` heartbeat is the manager's job.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, trace};

use crate::domain::CLOSE_ABNORMAL;
use crate::error::TransportError;
use crate::port::{Connector, Transport, TransportCommand, TransportEvent};

/// Close code reported when the server sent a close frame without a status.
const CLOSE_NO_STATUS: u16 = 1005;

/// Production [`Connector`] opening `ws://` and `wss://` links.
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

fn classify(err: WsError) -> TransportError {
    match err {
        WsError::Io(e) if e.kind() == ErrorKind::ConnectionRefused => {
            TransportError::Refused(e.to_string())
        }
        WsError::Io(e) => TransportError::Reset(e.to_string()),
        WsError::Http(response) => {
            TransportError::Handshake(format!("HTTP status {}", response.status()))
        }
        other => TransportError::Handshake(other.to_string()),
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Transport, TransportError> {
        info!(url, "Connecting to WebSocket");

        let (ws, response) = match timeout(self.connect_timeout, connect_async(url)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(classify(e)),
            Err(_) => {
                return Err(TransportError::Timeout(
                    self.connect_timeout.as_millis() as u64,
                ))
            }
        };
        info!(status = %response.status(), "WebSocket connected");

        let (mut write, mut read) = ws.split();
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(command) = commands_rx.recv().await {
                match command {
                    TransportCommand::Send(text) => {
                        trace!(bytes = text.len(), "Sending WebSocket text frame");
                        if let Err(e) = write.send(Message::Text(text)).await {
                            debug!(error = %e, "WebSocket send failed");
                            break;
                        }
                    }
                    TransportCommand::Close(code) => {
                        let frame = CloseFrame {
                            code: CloseCode::from(code),
                            reason: "".into(),
                        };
                        let _ = write.send(Message::Close(Some(frame))).await;
                        break;
                    }
                }
            }
            let _ = write.close().await;
            debug!("WebSocket writer finished");
        });

        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let event = match frame {
                    Ok(Message::Text(text)) => {
                        trace!(bytes = text.len(), "Received WebSocket text frame");
                        TransportEvent::Text(text)
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame.map_or((CLOSE_NO_STATUS, String::new()), |f| {
                            (u16::from(f.code), f.reason.into_owned())
                        });
                        let _ = events_tx.send(TransportEvent::Closed { code, reason });
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = events_tx.send(TransportEvent::Error(TransportError::Reset(
                            e.to_string(),
                        )));
                        return;
                    }
                };
                if events_tx.send(event).is_err() {
                    return;
                }
            }
            let _ = events_tx.send(TransportEvent::Closed {
                code: CLOSE_ABNORMAL,
                reason: "stream ended".into(),
            });
        });

        Ok(Transport {
            commands: commands_tx,
            events: events_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_io_error_is_classified() {
        let err = WsError::Io(std::io::Error::new(ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(classify(err).kind(), "connection_refused");
    }

    #[test]
    fn test_other_io_error_is_reset() {
        let err = WsError::Io(std::io::Error::new(ErrorKind::BrokenPipe, "pipe"));
        assert_eq!(classify(err).kind(), "connection_reset");
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WebSocketConnector::new(Duration::from_secs(2));
        let result = connector.connect(&format!("ws://{addr}/ws")).await;
        assert!(result.is_err());
    }
}
