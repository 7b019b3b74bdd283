//! # Hub Protocol Messages
//!
//! One JSON object per text frame, discriminated by a `type` field.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Hub Protocol Messages                              │
//! │                                                                         │
//! │  PAGE ───► HUB                                                         │
//! │  ─────────────                                                         │
//! │  set_article             { ean, name, image_path? }   → broadcast      │
//! │  request_current_article {}                           → reply          │
//! │  upload_image            { ean, image_base64 }        → broadcast      │
//! │  image_uploaded          { ean }                      → broadcast      │
//! │  save_name               { ean, name }                → broadcast      │
//! │                                                                         │
//! │  HUB ───► PAGES                                                        │
//! │  ──────────────                                                        │
//! │  user_login      { user_id, user_name }                                │
//! │  user_logout     { prev_user_id, prev_user_name }                      │
//! │  current_article { ean, name, image_path? }                            │
//! │  image_updated   { ean, image_path?, timestamp }                       │
//! │  error           { message }                       (reply only)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Internally tagged: `{ "type": "user_login", "user_id": 7, "user_name": "Alex" }`.
//! No version field, no acknowledgements, no sequence numbers.
//!
//! Inbound frames are read leniently: fields are fetched one by one from a
//! JSON object, so `null`, numbers or missing keys all degrade to empty
//! strings instead of rejecting the frame.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tagger_core::{CurrentArticle, SessionEvent};

// =============================================================================
// Outbound Messages
// =============================================================================

/// Everything the hub sends to pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubMessage {
    /// A user logged in by RFID tag.
    UserLogin { user_id: i64, user_name: String },

    /// The session was cleared by logout or expiry.
    UserLogout {
        prev_user_id: Option<i64>,
        prev_user_name: String,
    },

    /// The article the desktop is showing.
    CurrentArticle(CurrentArticle),

    /// A new photo exists for a barcode.
    ImageUpdated {
        ean: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_path: Option<String>,
        /// Unix seconds.
        timestamp: i64,
    },

    /// Reply to a malformed or incomplete request.
    Error { message: String },
}

impl HubMessage {
    pub fn image_updated(ean: impl Into<String>, image_path: Option<String>) -> Self {
        HubMessage::ImageUpdated {
            ean: ean.into(),
            image_path,
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HubMessage::Error {
            message: message.into(),
        }
    }

    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            HubMessage::UserLogin { .. } => "user_login",
            HubMessage::UserLogout { .. } => "user_logout",
            HubMessage::CurrentArticle(_) => "current_article",
            HubMessage::ImageUpdated { .. } => "image_updated",
            HubMessage::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<SessionEvent> for HubMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Login { user_id, user_name } => HubMessage::UserLogin { user_id, user_name },
            SessionEvent::Logout {
                prev_user_id,
                prev_user_name,
            } => HubMessage::UserLogout {
                prev_user_id,
                prev_user_name,
            },
        }
    }
}

// =============================================================================
// Inbound Messages
// =============================================================================

/// Requests a page can send. String fields are trimmed; absent means empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    SetArticle {
        ean: String,
        name: String,
        image_path: Option<String>,
    },
    RequestCurrentArticle,
    UploadImage {
        ean: String,
        image_base64: String,
    },
    ImageUploaded {
        ean: String,
    },
    SaveName {
        ean: String,
        name: String,
    },
}

/// Result of reading one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Message(InboundMessage),
    /// Valid JSON object with a `type` nobody handles (or none at all).
    Unknown(Option<String>),
    /// Not a JSON object.
    Malformed,
}

impl InboundMessage {
    /// Reads one frame.
    pub fn decode(text: &str) -> Decoded {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(_) => return Decoded::Malformed,
        };
        let Some(obj) = value.as_object() else {
            return Decoded::Malformed;
        };

        let field = |key: &str| -> String {
            match obj.get(key) {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            }
        };

        let kind = obj.get("type").and_then(Value::as_str).map(str::to_string);
        let message = match kind.as_deref() {
            Some("set_article") => InboundMessage::SetArticle {
                ean: field("ean"),
                name: field("name"),
                image_path: Some(field("image_path")).filter(|p| !p.is_empty()),
            },
            Some("request_current_article") => InboundMessage::RequestCurrentArticle,
            Some("upload_image") => InboundMessage::UploadImage {
                ean: field("ean"),
                image_base64: field("image_base64"),
            },
            Some("image_uploaded") => InboundMessage::ImageUploaded { ean: field("ean") },
            Some("save_name") => InboundMessage::SaveName {
                ean: field("ean"),
                name: field("name"),
            },
            _ => return Decoded::Unknown(kind),
        };

        Decoded::Message(message)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_wire_format() {
        let login = HubMessage::UserLogin {
            user_id: 7,
            user_name: "Alex".into(),
        };
        assert_eq!(
            serde_json::to_value(&login).unwrap(),
            json!({"type": "user_login", "user_id": 7, "user_name": "Alex"})
        );

        let logout: HubMessage = SessionEvent::Logout {
            prev_user_id: None,
            prev_user_name: String::new(),
        }
        .into();
        assert_eq!(
            serde_json::to_value(&logout).unwrap(),
            json!({"type": "user_logout", "prev_user_id": null, "prev_user_name": ""})
        );

        let article = HubMessage::CurrentArticle(CurrentArticle::new("123", "Tea"));
        assert_eq!(
            serde_json::to_value(&article).unwrap(),
            json!({"type": "current_article", "ean": "123", "name": "Tea"})
        );
    }

    #[test]
    fn test_image_updated_without_path() {
        let msg = HubMessage::image_updated("123", None);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "image_updated");
        assert!(value.get("image_path").is_none());
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_decode_known_types() {
        assert_eq!(
            InboundMessage::decode(r#"{"type":"set_article","ean":" 123 ","name":"Tea"}"#),
            Decoded::Message(InboundMessage::SetArticle {
                ean: "123".into(),
                name: "Tea".into(),
                image_path: None,
            })
        );
        assert_eq!(
            InboundMessage::decode(r#"{"type":"request_current_article"}"#),
            Decoded::Message(InboundMessage::RequestCurrentArticle)
        );
        assert_eq!(
            InboundMessage::decode(r#"{"type":"save_name","ean":4006381333931,"name":null}"#),
            Decoded::Message(InboundMessage::SaveName {
                ean: "4006381333931".into(),
                name: String::new(),
            })
        );
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        assert_eq!(
            InboundMessage::decode(r#"{"type":"print_label"}"#),
            Decoded::Unknown(Some("print_label".into()))
        );
        assert_eq!(InboundMessage::decode(r#"{"ean":"1"}"#), Decoded::Unknown(None));
        assert_eq!(InboundMessage::decode(r#"{"type":"set_art"#), Decoded::Malformed);
        assert_eq!(InboundMessage::decode("[1,2]"), Decoded::Malformed);
    }
}
