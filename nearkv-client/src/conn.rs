//! Single TCP connection to the index server and the blocking
//! request/response cycle that runs over it.

use std::io::{BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use nearkv_common::{decode_response, encode_request, read_frame, Request, Response};
use tracing::debug;

use crate::client::{ClientConfig, ClientError, ClientResult};

/// One connection with a reusable request buffer.
///
/// The buffer is stored on the connection to avoid per-call allocations.
#[derive(Debug)]
pub(crate) struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    write_buf: Vec<u8>,
}

impl Connection {
    pub(crate) fn open(config: &ClientConfig) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        if let Some(timeout) = config.read_timeout {
            stream.set_read_timeout(Some(timeout))?;
        }
        if let Some(timeout) = config.write_timeout {
            stream.set_write_timeout(Some(timeout))?;
        }
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        Ok(Connection {
            reader: BufReader::new(stream),
            write_buf: Vec::with_capacity(256),
        })
    }

    /// Sends one request and reads the matching response.
    ///
    /// Server error replies are surfaced here so callers only match the
    /// response shapes their request can produce.
    pub(crate) fn exec(&mut self, request: &Request) -> ClientResult<Response> {
        self.write_buf.clear();
        encode_request(request, &mut self.write_buf);
        debug!(frame_len = self.write_buf.len(), "sending request");

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        let body = read_frame(&mut self.reader)?;
        match decode_response(&body)? {
            Response::Error(message) => Err(ClientError::Server(message)),
            response => Ok(response),
        }
    }
}

fn connect_stream(config: &ClientConfig) -> ClientResult<TcpStream> {
    let addr = (config.host.as_str(), config.port)
        .to_socket_addrs()?
        .next()
        .ok_or(ClientError::InvalidAddress)?;
    let stream = match config.connect_timeout {
        Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
        None => TcpStream::connect(addr)?,
    };
    Ok(stream)
}
