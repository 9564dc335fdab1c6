//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Fetch = 0x01,
    Post = 0x02,
    Ping = 0x03,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch the feed, announcing the client's user agent
    Fetch { user_agent: String },

    /// Append a status to the feed
    Post {
        username: String,
        password: String,
        content_type: String,
        body: Vec<u8>,
    },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Fetch { .. } => CommandType::Fetch,
            Command::Post { .. } => CommandType::Post,
            Command::Ping => CommandType::Ping,
        }
    }
}
