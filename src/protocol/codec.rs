//! Envelope encoding and decoding.
//!
//! The manager never touches JSON directly; it hands envelopes to a
//! [`Codec`]. [`JsonCodec`] is the default and matches the text-frame
//! wire format `{"type": <string>, "data": <any>}`.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::Envelope;

// ============================================================================
// Codec
// ============================================================================

/// Converts envelopes to and from text frames.
pub trait Codec: Send + Sync + 'static {
    /// Dynamic payload representation handed to subscribers.
    type Payload: Send + Sync + 'static;

    /// Encodes `{kind, data}` into a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` cannot be serialized.
    fn encode<T>(&self, kind: &str, data: &T) -> Result<String>
    where
        T: Serialize + ?Sized;

    /// Decodes a text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPayload`] if the frame is not an envelope
    /// or its `type` tag is empty.
    fn decode(&self, frame: &str) -> Result<Envelope<Self::Payload>>;

    /// Converts a decoded payload into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match `T`.
    fn payload_as<T>(&self, payload: &Self::Payload) -> Result<T>
    where
        T: DeserializeOwned;
}

// ============================================================================
// JsonCodec
// ============================================================================

/// JSON text-frame codec.
///
/// A missing or `null` `data` field decodes to an empty object, so
/// subscribers always receive a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Payload = Value;

    fn encode<T>(&self, kind: &str, data: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        Ok(serde_json::to_string(&Envelope::new(kind, data))?)
    }

    fn decode(&self, frame: &str) -> Result<Envelope<Value>> {
        let mut envelope: Envelope<Value> = match serde_json::from_str(frame) {
            Ok(envelope) => envelope,
            Err(e) => return Err(Error::malformed_payload(e.to_string())),
        };

        if envelope.kind.is_empty() {
            return Err(Error::malformed_payload("empty type tag"));
        }

        if envelope.data.is_null() {
            envelope.data = Value::Object(Map::new());
        }

        Ok(envelope)
    }

    fn payload_as<T>(&self, payload: &Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        Ok(T::deserialize(payload)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_encode_wire_shape() {
        let frame = JsonCodec.encode("ping", &json!({ "n": 1 })).unwrap();
        assert_eq!(frame, r#"{"type":"ping","data":{"n":1}}"#);
    }

    #[test]
    fn test_encode_unsized_str() {
        let frame = JsonCodec.encode("say", "hi").unwrap();
        assert_eq!(frame, r#"{"type":"say","data":"hi"}"#);
    }

    #[test]
    fn test_decode_missing_data_is_empty_object() {
        let envelope = JsonCodec.decode(r#"{"type":"x"}"#).unwrap();
        assert_eq!(envelope.kind, "x");
        assert_eq!(envelope.data, json!({}));

        let envelope = JsonCodec.decode(r#"{"type":"x","data":null}"#).unwrap();
        assert_eq!(envelope.data, json!({}));
    }

    #[test]
    fn test_decode_keeps_falsy_values() {
        let envelope = JsonCodec.decode(r#"{"type":"x","data":0}"#).unwrap();
        assert_eq!(envelope.data, json!(0));
    }

    #[test]
    fn test_decode_rejects_non_envelopes() {
        for frame in [
            "not json",
            r#""just a string""#,
            r#"{"data":1}"#,
            r#"{"type":""}"#,
            r#"{"type":42}"#,
        ] {
            let err = JsonCodec.decode(frame).unwrap_err();
            assert!(err.is_malformed_payload(), "frame {frame:?} gave {err}");
        }
    }

    #[test]
    fn test_payload_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Point {
            x: i32,
            y: i32,
        }

        let point: Point = JsonCodec.payload_as(&json!({ "x": 1, "y": 2 })).unwrap();
        assert_eq!(point, Point { x: 1, y: 2 });

        let err = JsonCodec.payload_as::<Point>(&json!("nope")).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
