//! Message payload type
//!
//! `Message` is the unit the client moves between the application and the
//! transport. The client never looks inside it: inbound payloads are handed
//! to `data` handlers exactly as received, and decoding is left to the
//! application.
//!
//! # Examples
//!
//! ```rust
//! use hookup_core::Message;
//!
//! let text: Message = "hello".into();
//! assert_eq!(text.as_text(), Some("hello"));
//!
//! let json = Message::json(&vec!["subscribe", "me"]).unwrap();
//! assert_eq!(json.as_text(), Some(r#"["subscribe","me"]"#));
//! ```

use crate::error::Result;
use serde::Serialize;
use std::fmt;

/// A WebSocket data message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Message {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
}

impl Message {
    /// Create a text message
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }

    /// Create a binary message
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Message::Binary(data.into())
    }

    /// Encode a value as JSON into a text message
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Message::Text(serde_json::to_string(value)?))
    }

    /// The text content, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Binary(_) => None,
        }
    }

    /// The raw bytes of the payload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Message::Binary(data)
    }
}

impl From<&[u8]> for Message {
    fn from(data: &[u8]) -> Self {
        Message::Binary(data.to_vec())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Text(text) => write!(f, "{}", text),
            Message::Binary(data) => write!(f, "<{} bytes>", data.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message() {
        let message = Message::text("I expect this to be echoed");
        assert!(message.is_text());
        assert!(!message.is_binary());
        assert_eq!(message.as_text(), Some("I expect this to be echoed"));
        assert_eq!(message.len(), 26);
    }

    #[test]
    fn test_binary_message() {
        let message: Message = vec![1u8, 2, 3].into();
        assert!(message.is_binary());
        assert_eq!(message.as_text(), None);
        assert_eq!(message.as_bytes(), &[1, 2, 3]);
        assert_eq!(message.to_string(), "<3 bytes>");
    }

    #[test]
    fn test_json_message() {
        let message = Message::json(&json!({"action": "subscribe", "topic": "me"})).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(message.as_text().unwrap()).unwrap();
        assert_eq!(decoded["action"], "subscribe");
        assert_eq!(decoded["topic"], "me");
    }

    #[test]
    fn test_json_array_matches_to_json() {
        let message = Message::json(&["subscribe", "me"]).unwrap();
        assert_eq!(message, Message::text(r#"["subscribe","me"]"#));
    }

    #[test]
    fn test_empty_message() {
        assert!(Message::text("").is_empty());
        assert!(Message::binary(Vec::new()).is_empty());
    }
}
