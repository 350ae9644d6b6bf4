use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Customer(id={}, firstName={}, lastName={})",
            self.id, self.first_name, self.last_name
        )
    }
}

/// Document stored in the reservations collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reservation_name: String,
}

impl Reservation {
    pub fn named(reservation_name: impl Into<String>) -> Self {
        Self {
            id: None,
            reservation_name: reservation_name.into(),
        }
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reservation(id={}, reservationName={})",
            self.id.as_deref().unwrap_or("null"),
            self.reservation_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub message_id: String,
    pub body: Vec<u8>,
    /// Present for peek-locked messages; needed to complete or abandon them.
    pub lock_token: Option<String>,
    pub sequence_number: Option<i64>,
    pub delivery_count: Option<u32>,
}

impl BusMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            body: body.into().into_bytes(),
            lock_token: None,
            sequence_number: None,
            delivery_count: None,
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedBlob {
    pub container: String,
    pub name: String,
    pub url: String,
    pub size: usize,
}

/// Stage of message processing where a subscription error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionPhase {
    Receive,
    UserCallback,
    Complete,
    Abandon,
}

impl fmt::Display for ExceptionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Receive => "receive",
            Self::UserCallback => "user-callback",
            Self::Complete => "complete",
            Self::Abandon => "abandon",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_serializes_camel_case_without_null_id() {
        let json = serde_json::to_value(Reservation::named("A")).unwrap();
        assert_eq!(json, serde_json::json!({ "reservationName": "A" }));
    }

    #[test]
    fn test_reservation_ignores_system_properties() {
        let doc = serde_json::json!({
            "id": "r-1",
            "reservationName": "B",
            "_rid": "abc==",
            "_etag": "\"0000\"",
            "_ts": 1700000000
        });
        let reservation: Reservation = serde_json::from_value(doc).unwrap();
        assert_eq!(reservation.id.as_deref(), Some("r-1"));
        assert_eq!(reservation.reservation_name, "B");
    }

    #[test]
    fn test_text_message_gets_unique_id() {
        let a = BusMessage::text("one");
        let b = BusMessage::text("one");
        assert_ne!(a.message_id, b.message_id);
        assert_eq!(a.body_text(), "one");
    }
}
