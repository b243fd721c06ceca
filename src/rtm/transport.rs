use std::net::TcpStream;
use std::str::FromStr;
use tungstenite::handshake::client::Response;
use tungstenite::http::Uri;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{ClientRequestBuilder, Error, Message as WsMessage, WebSocket};
use crate::error::{RtmResult, RtmError};
use super::options::RtmOptions;

// ============================================================================
// Transport seam
// ============================================================================

/// The outcome of one read cycle on a transport.
#[derive(Debug)]
pub enum Frame {
    /// A complete text frame payload.
    Text(String),
    /// The peer reported the connection closed, with an optional reason.
    Closed(Option<String>),
    /// Nothing to deliver right now: no data was available, or a control
    /// frame arrived that the bridge does not route.
    Idle,
}

/// A bidirectional frame transport.
///
/// [`WsTransport`] is the production implementation; tests substitute
/// scripted mocks behind the same trait.
pub trait Transport: Send {
    fn read_frame(&mut self) -> RtmResult<Frame>;

    /// Writes one complete, final text frame.
    fn write_frame(&mut self, payload: &str) -> RtmResult<()>;

    /// Best-effort close; errors are logged, not returned.
    fn close(&mut self);
}

/// Dials a transport for a given URL. Shared with the receive loop for
/// reconnects, hence `Send + Sync`.
pub trait Connector: Send + Sync {
    fn dial(&self, url: &str) -> RtmResult<Box<dyn Transport>>;
}

// ============================================================================
// WsTransport - tungstenite-backed transport
// ============================================================================

/// WebSocket transport in non-blocking mode: reads that would block report
/// [`Frame::Idle`] instead of suspending, so the receive loop stays
/// responsive to shutdown and the send loop is never starved of the socket.
pub struct WsTransport {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl Transport for WsTransport {
    fn read_frame(&mut self) -> RtmResult<Frame> {
        match self.socket.read() {
            Ok(WsMessage::Text(message)) => {
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!("Received text frame: {}", message);
                }
                Ok(Frame::Text(message.to_string()))
            }
            Ok(WsMessage::Close(close_frame)) => {
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!("Received close frame: {:?}", close_frame);
                }
                Ok(Frame::Closed(close_frame.map(|cf| cf.to_string())))
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // tungstenite queues the pong reply itself
                Ok(Frame::Idle)
            }
            Ok(WsMessage::Binary(_)) | Ok(WsMessage::Frame(_)) => {
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!("Ignoring non-text frame");
                }
                Ok(Frame::Idle)
            }
            Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(Frame::Idle),
            // No data available (e.g. Windows), expected in non-blocking mode
            Err(Error::Io(err)) if err.kind() == std::io::ErrorKind::TimedOut => Ok(Frame::Idle),
            Err(Error::ConnectionClosed) | Err(Error::AlreadyClosed) => {
                Ok(Frame::Closed(Some("connection closed".to_string())))
            }
            Err(e) => {
                tracing::error!("Failed to read from socket: {:?}", e);
                Err(RtmError::TransportRead(e.to_string()))
            }
        }
    }

    fn write_frame(&mut self, payload: &str) -> RtmResult<()> {
        self.socket
            .send(WsMessage::text(payload))
            .map(|_| {
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!("Sent text frame: {}", payload);
                }
            })
            .map_err(|e| {
                tracing::error!("Error sending text frame: {}", e);
                RtmError::TransportWrite(e.to_string())
            })
    }

    fn close(&mut self) {
        if self.socket.can_write() {
            self.socket
                .close(None)
                .map(|_| {
                    tracing::trace!("Connection close successfully requested");
                })
                .unwrap_or_else(|e| {
                    tracing::error!("Error on connection close request: {}", e);
                });
        }
    }
}

// ============================================================================
// WsConnector
// ============================================================================

/// Connector backed by tungstenite. Connects blocking, then switches the
/// socket to non-blocking operation with the configured TCP options.
pub struct WsConnector {
    options: RtmOptions,
}

impl WsConnector {
    pub fn new(options: RtmOptions) -> WsConnector {
        WsConnector { options }
    }
}

impl Connector for WsConnector {
    fn dial(&self, url: &str) -> RtmResult<Box<dyn Transport>> {
        let uri = Uri::from_str(url).map_err(|e| {
            tracing::error!("Error connecting to invalid URI: {}", url);
            RtmError::InvalidUri(e.to_string())
        })?;

        let builder = ClientRequestBuilder::new(uri);
        let (mut socket, response) = tungstenite::connect(builder).map_err(|e| match e {
            Error::Url(err) => RtmError::InvalidUri(err.to_string()),
            err => RtmError::Connection(err.to_string()),
        })?;
        trace_on_connected(&response);

        configure_non_blocking(&mut socket, &self.options)?;

        Ok(Box::new(WsTransport { socket }))
    }
}

/// Configures socket for non-blocking operation with TCP_NODELAY
fn configure_non_blocking(socket: &mut WebSocket<MaybeTlsStream<TcpStream>>, options: &RtmOptions) -> RtmResult<()> {
    let stream = match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream,
        MaybeTlsStream::NativeTls(stream) => stream.get_mut(),
        _ => return Ok(()),
    };

    stream.set_nonblocking(true)?;

    if let Some(nodelay) = options.nodelay {
        stream.set_nodelay(nodelay)?;
    }
    if let Some(ttl) = options.ttl {
        stream.set_ttl(ttl)?;
    }

    Ok(())
}

/// Traces connection establishment
fn trace_on_connected(response: &Response) {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!("Connected to the server");
        tracing::trace!("Response HTTP code: {}", response.status());
        tracing::trace!("Response contains the following headers:");
        for (header, _value) in response.headers() {
            tracing::trace!("* {header}");
        }
    }
}
