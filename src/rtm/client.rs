use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crate::error::{RtmResult, RtmError};
use super::connection::ConnectionManager;
use super::message::{Message, TYPE_MESSAGE, TYPE_RECONNECT_URL};
use super::options::RtmOptions;
use super::queue::MessageQueue;
use super::session::{HttpSessionNegotiator, SessionNegotiator};
use super::transport::{Connector, Frame, WsConnector};

// ============================================================================
// RtmClient - the facade
// ============================================================================

/// Handle to a running RTM bridge.
///
/// [`RtmClient::start`] negotiates a session, connects, verifies the
/// handshake and spawns the receive and send loops. The handle is the only
/// entry point application code needs: poll [`read_message`](Self::read_message)
/// for inbound events, push outbound events with
/// [`send_message`](Self::send_message). Each call returns immediately.
///
/// The caller owns the handle and its lifetime; dropping it signals both
/// loops to stop and closes the connection.
pub struct RtmClient {
    queue: MessageQueue,
    connection: Arc<ConnectionManager>,
    /// Runtime failures the loops cannot return to a caller: decode failures
    /// of received frames, dropped outbound writes, and the error that made
    /// a loop exit. Receiving is optional; the channel is unbounded and
    /// never blocks the loops.
    pub error_rx: Receiver<RtmError>,
    shutdown: Arc<AtomicBool>,
    receive_handle: Option<JoinHandle<()>>,
    send_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for RtmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtmClient").finish_non_exhaustive()
    }
}

impl RtmClient {
    /// Starts the bridge with the default HTTP session negotiator and
    /// WebSocket connector.
    ///
    /// Any failure during negotiation, connect or handshake verification is
    /// returned before either loop is spawned; the process is never taken
    /// down.
    pub fn start(token: &str, options: RtmOptions) -> RtmResult<RtmClient> {
        let connector = WsConnector::new(options.clone());
        Self::start_with(&HttpSessionNegotiator::new(), Box::new(connector), token, options)
    }

    /// Like [`RtmClient::start`], with explicit session negotiation and
    /// transport dialing.
    pub fn start_with(
        negotiator: &dyn SessionNegotiator,
        connector: Box<dyn Connector>,
        token: &str,
        options: RtmOptions,
    ) -> RtmResult<RtmClient> {
        let url = negotiator.open_session(token)?;
        let connection = Arc::new(ConnectionManager::establish(connector, &url, &options)?);

        let queue = MessageQueue::new();
        let (error_tx, error_rx) = unbounded::<RtmError>();
        let shutdown = Arc::new(AtomicBool::new(false));

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Starting receive and send loops...");
        }

        let receive_handle = thread::Builder::new().name("rtm-recv".to_string()).spawn({
            let connection = Arc::clone(&connection);
            let queue = queue.clone();
            let error_tx = error_tx.clone();
            let shutdown = Arc::clone(&shutdown);
            let spin_wait_duration = options.spin_wait_duration;
            move || receive_loop(&connection, &queue, &error_tx, &shutdown, spin_wait_duration)
        })?;

        let send_handle = thread::Builder::new().name("rtm-send".to_string()).spawn({
            let connection = Arc::clone(&connection);
            let queue = queue.clone();
            let shutdown = Arc::clone(&shutdown);
            let send_interval = options.send_interval;
            move || send_loop(&connection, &queue, &error_tx, &shutdown, send_interval)
        });
        let send_handle = match send_handle {
            Ok(handle) => handle,
            Err(e) => {
                // Wind the receive loop back down before reporting.
                shutdown.store(true, Ordering::Relaxed);
                return Err(RtmError::Io(e));
            }
        };

        Ok(RtmClient {
            queue,
            connection,
            error_rx,
            shutdown,
            receive_handle: Some(receive_handle),
            send_handle: Some(send_handle),
        })
    }

    /// Removes and returns the oldest received message, or the
    /// [`Message::none`] sentinel if none is waiting. Never blocks.
    pub fn read_message(&self) -> Message {
        self.queue.read_inbound()
    }

    /// Queues a message for transmission. Never blocks; delivery is
    /// fire-and-forget, and a failed write is surfaced on
    /// [`error_rx`](Self::error_rx) rather than returned here.
    pub fn send_message(&self, message: Message) {
        self.queue.enqueue_outbound(message);
    }

    /// The connection manager, for endpoint inspection.
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Tears down the current connection and dials the preferred endpoint,
    /// for callers that learn about a better endpoint out of band.
    pub fn reconnect(&self) -> RtmResult<()> {
        self.connection.reconnect()
    }

    /// Signals both loops to stop, closes the connection and waits for the
    /// loops to wind down.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.connection.close();
        for handle in [self.receive_handle.take(), self.send_handle.take()].into_iter().flatten() {
            if handle.join().is_err() {
                tracing::error!("Loop thread panicked before shutdown");
            }
        }
    }
}

impl Drop for RtmClient {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.connection.close();
    }
}

// ============================================================================
// Receive loop
// ============================================================================

/// Reads frames from the active transport and routes them until shutdown or
/// an irrecoverable connection failure. A close frame triggers one reconnect
/// attempt through the connection manager; if that fails, the loop reports
/// the error and exits, and inbound delivery stops.
fn receive_loop(
    connection: &ConnectionManager,
    queue: &MessageQueue,
    error_tx: &Sender<RtmError>,
    shutdown: &AtomicBool,
    spin_wait_duration: Duration,
) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!("Receive loop started");
    }

    while !shutdown.load(Ordering::Relaxed) {
        match connection.read_frame() {
            Ok(Frame::Text(payload)) => match Message::from_json(&payload) {
                Ok(message) => route_message(message, connection, queue),
                Err(e) => {
                    tracing::warn!("Dropping undecodable frame: {}", e);
                    let _ = error_tx.send(e);
                }
            },
            Ok(Frame::Idle) => thread::sleep(spin_wait_duration),
            Ok(Frame::Closed(reason)) => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                tracing::info!("Connection closed by peer: {:?}", reason);
                if let Err(e) = connection.reconnect() {
                    tracing::error!("Reconnect failed, receive loop exiting: {}", e);
                    let _ = error_tx.send(e);
                    break;
                }
            }
            Err(e) => {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                tracing::error!("Receive loop exiting on read failure: {}", e);
                let _ = error_tx.send(e);
                break;
            }
        }
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!("Receive loop stopped");
    }
}

/// Routes one decoded message: reconnect URLs update connection state, chat
/// messages land in the inbound queue, everything else is discarded.
fn route_message(message: Message, connection: &ConnectionManager, queue: &MessageQueue) {
    match message.event_type() {
        Some(TYPE_RECONNECT_URL) => match message.get_str("url") {
            Some(url) => connection.note_reconnect_url(url.to_string()),
            None => tracing::warn!("reconnect_url event without a url field"),
        },
        Some(TYPE_MESSAGE) => queue.enqueue_inbound(message),
        other => {
            if tracing::enabled!(tracing::Level::TRACE) {
                tracing::trace!("Discarding frame of type {:?}", other);
            }
        }
    }
}

// ============================================================================
// Send loop
// ============================================================================

/// Drains the outbound queue onto the active transport until shutdown.
/// An enqueue wakes the loop immediately; otherwise it sleeps for the send
/// interval between checks, which bounds worst-case latency at one interval.
fn send_loop(
    connection: &ConnectionManager,
    queue: &MessageQueue,
    error_tx: &Sender<RtmError>,
    shutdown: &AtomicBool,
    send_interval: Duration,
) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!("Send loop started");
    }

    while !shutdown.load(Ordering::Relaxed) {
        let message = match queue.recv_outbound(send_interval) {
            Some(message) => message,
            None => continue,
        };

        // The sentinel marks "nothing to send"; it never goes on the wire.
        if message.is_none() {
            continue;
        }

        if let Err(e) = connection.write_message(&message) {
            tracing::error!("Dropping outbound message on write failure: {}", e);
            let _ = error_tx.send(e);
        }
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        tracing::debug!("Send loop stopped");
    }
}
