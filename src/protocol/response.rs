//! Response definitions
//!
//! Represents responses to clients.

use crate::error::TwtError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NoContent = 0x01,
    BadRequest = 0x02,
    Unauthorized = 0x03,
    UnsupportedMediaType = 0x04,
    Error = 0x05,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::NoContent),
            0x02 => Some(Status::BadRequest),
            0x03 => Some(Status::Unauthorized),
            0x04 => Some(Status::UnsupportedMediaType),
            0x05 => Some(Status::Error),
            _ => None,
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (feed for FETCH, message for failures)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NO_CONTENT response
    pub fn no_content() -> Self {
        Self {
            status: Status::NoContent,
            payload: None,
        }
    }

    /// Create a response carrying a message
    pub fn with_message(status: Status, message: &str) -> Self {
        Self {
            status,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self::with_message(Status::Error, message)
    }

    /// Map a failed request onto the status the client sees
    ///
    /// Store failures are not described to the client.
    pub fn from_error(err: &TwtError) -> Self {
        match err {
            TwtError::Unauthorized => Self::with_message(Status::Unauthorized, "Unauthorized"),
            TwtError::UnsupportedMediaType(_) => {
                Self::with_message(Status::UnsupportedMediaType, &err.to_string())
            }
            TwtError::InvalidMediaType(_) | TwtError::Protocol(_) => {
                Self::with_message(Status::BadRequest, &err.to_string())
            }
            _ => Self::error("Internal server error"),
        }
    }

    /// Payload interpreted as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
