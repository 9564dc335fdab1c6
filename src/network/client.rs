//! Client
//!
//! Blocking client for the twtstore wire protocol.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use crate::error::Result;
use crate::protocol::{read_response, write_command, Command, Response};

/// A connection to a twtstore server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to `addr` (host:port)
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for its response
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Fetch the feed, identifying as `user_agent`
    pub fn fetch(&mut self, user_agent: &str) -> Result<Response> {
        self.request(&Command::Fetch {
            user_agent: user_agent.to_string(),
        })
    }

    /// Post a status body
    pub fn post(
        &mut self,
        username: &str,
        password: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<Response> {
        self.request(&Command::Post {
            username: username.to_string(),
            password: password.to_string(),
            content_type: content_type.to_string(),
            body: body.to_vec(),
        })
    }

    pub fn ping(&mut self) -> Result<Response> {
        self.request(&Command::Ping)
    }
}
