//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - FETCH: user agent (UTF-8, may be empty)
//! - POST:  3 × (field_len (4) + field) for username, password and
//!          content type, followed by the raw status body
//! - PING:  empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};
use crate::error::{TwtError, Result};
use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    let payload = match command {
        Command::Fetch { user_agent } => user_agent.as_bytes().to_vec(),
        Command::Post {
            username,
            password,
            content_type,
            body,
        } => {
            let mut payload = Vec::with_capacity(
                12 + username.len() + password.len() + content_type.len() + body.len(),
            );
            put_field(&mut payload, username.as_bytes());
            put_field(&mut payload, password.as_bytes());
            put_field(&mut payload, content_type.as_bytes());
            payload.extend_from_slice(body);
            payload
        }
        Command::Ping => Vec::new(),
    };

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "request")?;

    match cmd_type {
        0x01 => decode_fetch_command(payload),
        0x02 => decode_post_command(payload),
        0x03 => decode_ping_command(payload),
        _ => Err(TwtError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode FETCH command payload
fn decode_fetch_command(payload: &[u8]) -> Result<Command> {
    let user_agent = utf8(payload, "FETCH command: user agent")?;
    Ok(Command::Fetch { user_agent })
}

/// Decode POST command payload
fn decode_post_command(payload: &[u8]) -> Result<Command> {
    let mut rest = payload;
    let username = utf8(take_field(&mut rest, "POST command: username")?, "POST command: username")?;
    let password = utf8(take_field(&mut rest, "POST command: password")?, "POST command: password")?;
    let content_type = utf8(
        take_field(&mut rest, "POST command: content type")?,
        "POST command: content type",
    )?;

    Ok(Command::Post {
        username,
        password,
        content_type,
        body: rest.to_vec(),
    })
}

/// Decode PING command payload
fn decode_ping_command(payload: &[u8]) -> Result<Command> {
    if !payload.is_empty() {
        return Err(TwtError::Protocol(format!(
            "PING command: unexpected payload of {} bytes",
            payload.len()
        )));
    }
    Ok(Command::Ping)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::from_byte(status_byte).ok_or_else(|| {
        TwtError::Protocol(format!("Unknown response status: 0x{:02x}", status_byte))
    })?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
///
/// Nothing is written if the payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let message = encode_command(command);
    check_payload_len(message.len() - HEADER_SIZE, "command")?;
    writer.write_all(&message)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
///
/// Nothing is written if the payload exceeds [`MAX_PAYLOAD_SIZE`].
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let payload_len = response.payload.as_ref().map_or(0, Vec::len);
    check_payload_len(payload_len, "response")?;
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Framing helpers
// =============================================================================

/// Lengths past `u32::MAX` saturate so the frame is rejected on decode
fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let payload_len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&payload_len.to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Validate header and length, returning the kind byte and exact payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(TwtError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    check_payload_len(payload_len as usize, what)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(TwtError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Read header + payload off a stream without decoding
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    check_payload_len(payload_len as usize, "frame")?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

fn check_payload_len(payload_len: usize, what: &str) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(TwtError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn put_field(payload: &mut Vec<u8>, field: &[u8]) {
    payload.extend_from_slice(&(field.len() as u32).to_be_bytes());
    payload.extend_from_slice(field);
}

fn take_field<'a>(rest: &mut &'a [u8], what: &str) -> Result<&'a [u8]> {
    if rest.len() < 4 {
        return Err(TwtError::Protocol(format!("{}: missing length", what)));
    }
    let len = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
    if rest.len() < 4 + len {
        return Err(TwtError::Protocol(format!(
            "{}: incomplete field (expected {}, got {})",
            what,
            len,
            rest.len() - 4
        )));
    }
    let field = &rest[4..4 + len];
    *rest = &rest[4 + len..];
    Ok(field)
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| TwtError::Protocol(format!("{}: invalid UTF-8", what)))
}
