//! Scripted transport, connector and negotiator mocks shared by the unit
//! tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use crate::error::{RtmResult, RtmError};
use super::session::SessionNegotiator;
use super::transport::{Connector, Frame, Transport};

/// Builds a text frame from a JSON value.
pub(crate) fn text_frame(value: serde_json::Value) -> Frame {
    Frame::Text(value.to_string())
}

/// The handshake acknowledgment every well-behaved script starts with.
pub(crate) fn hello_frame() -> Frame {
    text_frame(serde_json::json!({"type": "hello"}))
}

/// Inspection handle for a [`MockTransport`] that has been moved into a
/// connection.
#[derive(Clone, Default)]
pub(crate) struct TransportProbe {
    written: Arc<Mutex<Vec<String>>>,
    write_attempts: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl TransportProbe {
    /// Payloads successfully written to the transport, in order.
    pub(crate) fn written_frames(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    /// Write calls made, successful or not.
    pub(crate) fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

/// Transport that replays a scripted frame sequence and records writes.
/// Once the script is exhausted every read reports [`Frame::Idle`].
pub(crate) struct MockTransport {
    frames: Mutex<VecDeque<Frame>>,
    fail_writes: bool,
    probe: TransportProbe,
}

impl MockTransport {
    pub(crate) fn new(frames: Vec<Frame>) -> (MockTransport, TransportProbe) {
        Self::build(frames, false)
    }

    /// A transport whose writes all fail, for surfacing-of-write-errors
    /// tests.
    pub(crate) fn failing_writes(frames: Vec<Frame>) -> (MockTransport, TransportProbe) {
        Self::build(frames, true)
    }

    fn build(frames: Vec<Frame>, fail_writes: bool) -> (MockTransport, TransportProbe) {
        let probe = TransportProbe::default();
        let transport = MockTransport {
            frames: Mutex::new(frames.into()),
            fail_writes,
            probe: probe.clone(),
        };
        (transport, probe)
    }
}

impl Transport for MockTransport {
    fn read_frame(&mut self) -> RtmResult<Frame> {
        Ok(self.frames.lock().unwrap().pop_front().unwrap_or(Frame::Idle))
    }

    fn write_frame(&mut self, payload: &str) -> RtmResult<()> {
        self.probe.write_attempts.fetch_add(1, Ordering::Relaxed);
        if self.fail_writes {
            return Err(RtmError::TransportWrite("scripted write failure".to_string()));
        }
        self.probe.written.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::Relaxed);
    }
}

/// Connector handing out pre-scripted transports in dial order. Dialing past
/// the script fails with a connection error.
pub(crate) struct MockConnector {
    transports: Mutex<VecDeque<Box<dyn Transport>>>,
    dialed: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    /// Returns the connector and a shared handle listing the URLs dialed.
    pub(crate) fn new(
        transports: Vec<Box<dyn Transport>>,
    ) -> (MockConnector, Arc<Mutex<Vec<String>>>) {
        let dialed = Arc::new(Mutex::new(Vec::new()));
        let connector = MockConnector {
            transports: Mutex::new(transports.into()),
            dialed: Arc::clone(&dialed),
        };
        (connector, dialed)
    }
}

impl Connector for MockConnector {
    fn dial(&self, url: &str) -> RtmResult<Box<dyn Transport>> {
        self.dialed.lock().unwrap().push(url.to_string());
        self.transports
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RtmError::Connection(format!("refused dial to {}", url)))
    }
}

/// Session negotiator with a fixed outcome.
pub(crate) enum MockNegotiator {
    Ok(String),
    Fail(String),
}

impl MockNegotiator {
    pub(crate) fn ok(url: &str) -> MockNegotiator {
        MockNegotiator::Ok(url.to_string())
    }

    pub(crate) fn fail(reason: &str) -> MockNegotiator {
        MockNegotiator::Fail(reason.to_string())
    }
}

impl SessionNegotiator for MockNegotiator {
    fn open_session(&self, _token: &str) -> RtmResult<String> {
        match self {
            MockNegotiator::Ok(url) => Ok(url.clone()),
            MockNegotiator::Fail(reason) => Err(RtmError::Session(reason.clone())),
        }
    }
}
