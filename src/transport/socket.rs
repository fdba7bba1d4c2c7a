//! Transport seam and the WebSocket implementation.
//!
//! The event loop only sees a [`Transport`]: a text sink and a text
//! stream, split so it can read and write from one `select!`. Each
//! reconnect asks the [`Connector`] for a fresh one.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::future;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// WebSocket sub-protocols offered to the broker.
const STOMP_SUBPROTOCOLS: &str = "v12.stomp, v11.stomp, v10.stomp";

// ============================================================================
// Types
// ============================================================================

/// Outbound half: accepts encoded frames.
pub type TextSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half: yields raw payloads. `None` or `Err` means the transport
/// is gone.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Transport
// ============================================================================

/// An open, split byte-stream carrying text frames.
pub struct Transport {
    /// Outbound half.
    pub sink: TextSink,
    /// Inbound half.
    pub stream: TextStream,
}

impl Transport {
    /// Creates a transport from its halves.
    #[inline]
    #[must_use]
    pub fn new(sink: TextSink, stream: TextStream) -> Self {
        Self { sink, stream }
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a new transport.
    ///
    /// # Errors
    ///
    /// Any error is treated as a transport failure and retried.
    async fn connect(&self, endpoint: &str) -> Result<Transport>;
}

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Connects over WebSocket (`ws://`, or `wss://` with a TLS feature).
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<Transport> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| connect_error(endpoint, e))?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(STOMP_SUBPROTOCOLS),
        );

        let (ws_stream, response) = connect_async(request)
            .await
            .map_err(|e| connect_error(endpoint, e))?;

        debug!(
            endpoint,
            status = %response.status(),
            protocol = ?response.headers().get("Sec-WebSocket-Protocol"),
            "WebSocket connected"
        );

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write.with(|text: String| {
            future::ready(Ok::<_, Error>(Message::Text(text.into())))
        });

        let stream = ws_read.filter_map(|message| future::ready(into_payload(message)));

        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Classifies a failed open.
///
/// URL problems (including `wss://` without TLS support) fail the same way
/// on every attempt and are reported as configuration errors.
fn connect_error(endpoint: &str, error: WsError) -> Error {
    match error {
        WsError::Url(e) => Error::config(format!("Unusable endpoint {endpoint}: {e}")),
        e => Error::connection(format!("WebSocket connect to {endpoint} failed: {e}")),
    }
}

/// Maps a WebSocket message to a frame payload.
///
/// Ping/Pong are answered by tungstenite and skipped here. Binary messages
/// that are not UTF-8 are dropped.
fn into_payload(message: std::result::Result<Message, WsError>) -> Option<Result<String>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(Ok(text)),
            Err(e) => {
                warn!(len = bytes.len(), error = %e, "Dropped binary message that is not UTF-8");
                None
            }
        },
        Ok(Message::Close(frame)) => {
            debug!(?frame, "WebSocket closed by remote");
            Some(Err(Error::ConnectionClosed))
        }
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(e) => Some(Err(Error::WebSocket(e))),
    }
}

// ============================================================================
// Tests
// ============================================================================
