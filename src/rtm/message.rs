use serde_json::{Map, Value};
use crate::error::RtmResult;

// ============================================================================
// Event type vocabulary
// ============================================================================

/// Acknowledgment sent by the server as the first frame after connect.
pub const TYPE_HELLO: &str = "hello";

/// A chat message event. The only received type delivered to the inbound queue.
pub const TYPE_MESSAGE: &str = "message";

/// The server advertises an alternate endpoint to use on the next reconnect.
pub const TYPE_RECONNECT_URL: &str = "reconnect_url";

/// Reserved type carried by the empty-queue sentinel. A message of this type
/// is returned by queue reads when nothing is available and is never
/// transmitted on the wire.
pub const TYPE_NONE: &str = "none";

// ============================================================================
// Message
// ============================================================================

/// One wire event: a mapping from string keys to loosely-typed JSON values.
///
/// Every message carries a `type` field used for routing; the remaining
/// fields vary by type and are opaque to the bridge. Messages are ephemeral:
/// constructed on decode, consumed on route or send, never persisted.
///
/// # Examples
///
/// ```
/// use rtm_bridge::{Message, TYPE_MESSAGE};
///
/// let msg = Message::new(TYPE_MESSAGE)
///     .with("channel", "C123")
///     .with("text", "hi");
///
/// assert_eq!(msg.event_type(), Some(TYPE_MESSAGE));
/// assert_eq!(msg.get_str("text"), Some("hi"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    fields: Map<String, Value>,
}

impl Message {
    /// Creates a message carrying only the given `type` field.
    pub fn new(event_type: &str) -> Message {
        let mut fields = Map::new();
        fields.insert("type".to_string(), Value::String(event_type.to_string()));
        Message { fields }
    }

    /// The sentinel returned by queue reads when no message is available.
    pub fn none() -> Message {
        Message::new(TYPE_NONE)
    }

    /// Whether this is the empty-queue sentinel.
    pub fn is_none(&self) -> bool {
        self.event_type() == Some(TYPE_NONE)
    }

    /// The `type` field, if present and a string.
    pub fn event_type(&self) -> Option<&str> {
        self.fields.get("type").and_then(Value::as_str)
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Message {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Inserts or replaces a field.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a field as a string slice, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Decodes one frame payload. The top-level JSON value must be an object;
    /// anything else is a [`Decode`](crate::RtmError::Decode) error.
    pub fn from_json(payload: &str) -> RtmResult<Message> {
        let fields: Map<String, Value> = serde_json::from_str(payload)?;
        Ok(Message { fields })
    }

    /// Encodes this message as one frame payload.
    pub fn to_json(&self) -> String {
        Value::Object(self.fields.clone()).to_string()
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Message { fields }
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        Value::Object(message.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_on_type_field() {
        let msg = Message::from_json(r#"{"type":"message","text":"hi"}"#).unwrap();
        assert_eq!(msg.event_type(), Some(TYPE_MESSAGE));
        assert_eq!(msg.get_str("text"), Some("hi"));
        assert_eq!(msg.get("ts"), None);
    }

    #[test]
    fn missing_type_is_not_routable() {
        let msg = Message::from_json(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(msg.event_type(), None);
    }

    #[test]
    fn non_object_payload_is_a_decode_error() {
        assert!(Message::from_json("[1,2,3]").is_err());
        assert!(Message::from_json("\"hello\"").is_err());
        assert!(Message::from_json("not json at all").is_err());
    }

    #[test]
    fn sentinel_carries_reserved_type() {
        let sentinel = Message::none();
        assert!(sentinel.is_none());
        assert_eq!(sentinel.event_type(), Some(TYPE_NONE));
        assert!(!Message::new(TYPE_MESSAGE).is_none());
    }

    #[test]
    fn encodes_as_single_object() {
        let msg = Message::new(TYPE_MESSAGE)
            .with("channel", "C123")
            .with("text", "hi");
        let value: Value = serde_json::from_str(&msg.to_json()).unwrap();
        assert_eq!(value, json!({"type": "message", "channel": "C123", "text": "hi"}));
    }
}
