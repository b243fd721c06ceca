use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use crate::error::{RtmResult, RtmError};
use super::message::{Message, TYPE_HELLO};
use super::options::RtmOptions;
use super::transport::{Connector, Frame, Transport};

// ============================================================================
// ConnectionManager - owns the live socket handle
// ============================================================================

/// The live connection state: the active transport, the endpoint it is
/// connected to, and the last alternate URL learned from the peer.
struct Connection {
    transport: Box<dyn Transport>,
    url: String,
    reconnect_url: Option<String>,
}

/// Owns the active socket handle and performs connect, handshake
/// verification and reconnect.
///
/// Both loops go through this single object, and the handle swap during
/// reconnect happens under one lock: at most one transport is active at any
/// time, and neither loop can observe a half-replaced handle.
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    spin_wait_duration: Duration,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager").finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Dials `url` and verifies the handshake: the first frame must decode
    /// to a message of type `"hello"`. Anything else aborts the attempt, and
    /// the caller must not start the loops.
    pub fn establish(
        connector: Box<dyn Connector>,
        url: &str,
        options: &RtmOptions,
    ) -> RtmResult<ConnectionManager> {
        let transport = dial_verified(connector.as_ref(), url, options.spin_wait_duration)?;
        Ok(ConnectionManager {
            connector,
            spin_wait_duration: options.spin_wait_duration,
            conn: Mutex::new(Connection {
                transport,
                url: url.to_string(),
                reconnect_url: None,
            }),
        })
    }

    // A poisoned lock only means a loop thread panicked; the state is
    // still coherent.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn read_frame(&self) -> RtmResult<Frame> {
        self.lock().transport.read_frame()
    }

    pub(crate) fn write_message(&self, message: &Message) -> RtmResult<()> {
        let payload = message.to_json();
        self.lock().transport.write_frame(&payload)
    }

    /// Records the alternate endpoint the peer asked us to use on the next
    /// reconnect.
    pub(crate) fn note_reconnect_url(&self, url: String) {
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("Learned alternate reconnect URL");
        }
        self.lock().reconnect_url = Some(url);
    }

    /// The last alternate URL learned from the peer, if any.
    pub fn reconnect_url(&self) -> Option<String> {
        self.lock().reconnect_url.clone()
    }

    /// The endpoint URL of the active connection.
    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    /// Tears down the active handle and dials the alternate URL if one was
    /// learned, else the current endpoint, re-running the same handshake
    /// verification as the initial connect. A single immediate attempt, no
    /// backoff: a failure propagates and leaves the old (closed) handle in
    /// place.
    pub(crate) fn reconnect(&self) -> RtmResult<()> {
        let mut conn = self.lock();

        // Old handle goes away first; close errors are ignored.
        conn.transport.close();

        let target = conn.reconnect_url.take().unwrap_or_else(|| conn.url.clone());
        tracing::info!("Reconnecting to alternate endpoint");

        let transport = dial_verified(self.connector.as_ref(), &target, self.spin_wait_duration)?;
        conn.transport = transport;
        conn.url = target;
        Ok(())
    }

    /// Best-effort close of the active handle.
    pub(crate) fn close(&self) {
        self.lock().transport.close();
    }
}

/// Dials and verifies: waits for the first non-idle frame, which must decode
/// to a `"hello"` message.
fn dial_verified(
    connector: &dyn Connector,
    url: &str,
    spin_wait_duration: Duration,
) -> RtmResult<Box<dyn Transport>> {
    let mut transport = connector.dial(url)?;

    loop {
        match transport.read_frame()? {
            Frame::Idle => thread::sleep(spin_wait_duration),
            Frame::Closed(reason) => {
                return Err(RtmError::Connection(match reason {
                    Some(r) => format!("closed during handshake: {}", r),
                    None => "closed during handshake".to_string(),
                }));
            }
            Frame::Text(payload) => {
                let message = Message::from_json(&payload)
                    .map_err(|e| RtmError::Handshake(format!("first frame was not decodable: {}", e)))?;
                if message.event_type() != Some(TYPE_HELLO) {
                    return Err(RtmError::Handshake(format!(
                        "expected \"{}\" as the first frame, got type {:?}",
                        TYPE_HELLO,
                        message.event_type()
                    )));
                }
                if tracing::enabled!(tracing::Level::DEBUG) {
                    tracing::debug!("Handshake verified");
                }
                return Ok(transport);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtm::testutil::{hello_frame, text_frame, MockConnector, MockTransport};
    use serde_json::json;

    fn options() -> RtmOptions {
        RtmOptions::new()
            .spin_wait_duration(Duration::from_millis(1))
            .unwrap()
    }

    #[test]
    fn establish_verifies_hello() {
        let (transport, _probe) = MockTransport::new(vec![hello_frame()]);
        let (connector, dialed) = MockConnector::new(vec![Box::new(transport)]);

        let manager =
            ConnectionManager::establish(Box::new(connector), "wss://primary", &options()).unwrap();
        assert_eq!(manager.url(), "wss://primary");
        assert_eq!(manager.reconnect_url(), None);
        assert_eq!(dialed.lock().unwrap().as_slice(), ["wss://primary"]);
    }

    #[test]
    fn establish_skips_idle_frames_before_hello() {
        let (transport, _probe) = MockTransport::new(vec![Frame::Idle, Frame::Idle, hello_frame()]);
        let (connector, _dialed) = MockConnector::new(vec![Box::new(transport)]);

        assert!(ConnectionManager::establish(Box::new(connector), "wss://primary", &options()).is_ok());
    }

    #[test]
    fn wrong_first_frame_is_a_handshake_error() {
        let (transport, _probe) =
            MockTransport::new(vec![text_frame(json!({"type": "message", "text": "hi"}))]);
        let (connector, _dialed) = MockConnector::new(vec![Box::new(transport)]);

        let err = ConnectionManager::establish(Box::new(connector), "wss://primary", &options())
            .unwrap_err();
        assert!(matches!(err, RtmError::Handshake(_)), "got {:?}", err);
    }

    #[test]
    fn undecodable_first_frame_is_a_handshake_error() {
        let (transport, _probe) = MockTransport::new(vec![Frame::Text("not json".to_string())]);
        let (connector, _dialed) = MockConnector::new(vec![Box::new(transport)]);

        let err = ConnectionManager::establish(Box::new(connector), "wss://primary", &options())
            .unwrap_err();
        assert!(matches!(err, RtmError::Handshake(_)), "got {:?}", err);
    }

    #[test]
    fn close_during_handshake_is_a_connection_error() {
        let (transport, _probe) = MockTransport::new(vec![Frame::Closed(None)]);
        let (connector, _dialed) = MockConnector::new(vec![Box::new(transport)]);

        let err = ConnectionManager::establish(Box::new(connector), "wss://primary", &options())
            .unwrap_err();
        assert!(matches!(err, RtmError::Connection(_)), "got {:?}", err);
    }

    #[test]
    fn reconnect_dials_learned_alternate_and_closes_old_handle() {
        let (first, first_probe) = MockTransport::new(vec![hello_frame()]);
        let (second, _second_probe) = MockTransport::new(vec![hello_frame()]);
        let (connector, dialed) = MockConnector::new(vec![Box::new(first), Box::new(second)]);

        let manager =
            ConnectionManager::establish(Box::new(connector), "wss://primary", &options()).unwrap();
        manager.note_reconnect_url("wss://alternate".to_string());

        manager.reconnect().unwrap();

        assert!(first_probe.was_closed());
        assert_eq!(manager.url(), "wss://alternate");
        assert_eq!(
            dialed.lock().unwrap().as_slice(),
            ["wss://primary", "wss://alternate"]
        );
        // The alternate was consumed; a further reconnect would reuse it as
        // the current endpoint instead.
        assert_eq!(manager.reconnect_url(), None);
    }

    #[test]
    fn reconnect_without_alternate_redials_current_endpoint() {
        let (first, _first_probe) = MockTransport::new(vec![hello_frame()]);
        let (second, _second_probe) = MockTransport::new(vec![hello_frame()]);
        let (connector, dialed) = MockConnector::new(vec![Box::new(first), Box::new(second)]);

        let manager =
            ConnectionManager::establish(Box::new(connector), "wss://primary", &options()).unwrap();
        manager.reconnect().unwrap();

        assert_eq!(
            dialed.lock().unwrap().as_slice(),
            ["wss://primary", "wss://primary"]
        );
    }

    #[test]
    fn failed_reconnect_propagates_handshake_error() {
        let (first, _first_probe) = MockTransport::new(vec![hello_frame()]);
        let (second, _second_probe) =
            MockTransport::new(vec![text_frame(json!({"type": "goodbye"}))]);
        let (connector, _dialed) = MockConnector::new(vec![Box::new(first), Box::new(second)]);

        let manager =
            ConnectionManager::establish(Box::new(connector), "wss://primary", &options()).unwrap();
        let err = manager.reconnect().unwrap_err();
        assert!(matches!(err, RtmError::Handshake(_)), "got {:?}", err);
    }
}
