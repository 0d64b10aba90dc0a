//! # Index Client API
//!
//! Purpose: Expose a compact, blocking API for the index server's operation
//! surface: value get/set, batched writes, fuzzy and near lookup, flush, and
//! force-merge.
//!
//! ## Design Principles
//! 1. **Probe On Construction**: One `Info` call verifies reachability before
//!    a client is handed out.
//! 2. **Two Miss Shapes**: `get` returns a sentinel, `fetch` raises; both
//!    access paths are part of the contract.
//! 3. **No Hidden Policy**: No retries, no caching, no client-side ranking.

use std::collections::BTreeMap;
use std::time::Duration;

use nearkv_common::{IndexValue, Match, Request, Response, WireError, DEFAULT_PORT};
use thiserror::Error;
use tracing::info;

use crate::conn::Connection;

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the index client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The endpoint could not be reached or failed the liveness probe.
    /// Raised only at construction; no client is returned.
    #[error("failed to connect to {addr}")]
    Connection {
        addr: String,
        #[source]
        source: Box<ClientError>,
    },

    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be parsed.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Server returned an error reply.
    #[error("server error: {0}")]
    Server(String),

    /// Response type did not match the issued request.
    #[error("unexpected response")]
    UnexpectedResponse,

    /// `fetch` found no value under the key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Host name did not resolve to a usable address.
    #[error("invalid address")]
    InvalidAddress,

    /// `force_merge` requires at least one target segment.
    #[error("max_segments must be at least 1")]
    InvalidMaxSegments,
}

/// Configuration for the index client.
///
/// The host is required; everything else has a documented default.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server TCP port, `DEFAULT_PORT` unless overridden.
    pub port: u16,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a configuration for `host` with the well-known port and no
    /// socket timeouts.
    pub fn new(host: impl Into<String>) -> Self {
        ClientConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
        }
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Synchronous client for one index-server endpoint.
///
/// Owns a single TCP connection for its lifetime and issues one blocking
/// request per operation. All index state lives server-side; callers needing
/// timeouts beyond the socket timeouts, cancellation, or retries wrap calls
/// externally.
#[derive(Debug)]
pub struct IndexClient {
    conn: Connection,
}

impl IndexClient {
    /// Connects to `host` on the default port and probes the server.
    pub fn connect(host: impl Into<String>) -> ClientResult<Self> {
        Self::with_config(ClientConfig::new(host))
    }

    /// Connects with an explicit configuration and probes the server.
    ///
    /// The probe is one `Info` call; any failure while connecting or probing
    /// is reported as [`ClientError::Connection`] and no client is returned.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let addr = config.addr();
        let conn = match Connection::open(&config) {
            Ok(conn) => conn,
            Err(err) => return Err(connection_error(addr, err)),
        };

        let mut client = IndexClient { conn };
        if let Err(err) = client.info() {
            return Err(connection_error(addr, err));
        }
        info!(%addr, "connected to index server");
        Ok(client)
    }

    /// Queries server metadata.
    pub fn info(&mut self) -> ClientResult<BTreeMap<String, String>> {
        match self.conn.exec(&Request::Info)? {
            Response::Info(info) => Ok(info),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent; the server signals a miss
    /// with an empty value.
    pub fn get(&mut self, key: &str) -> ClientResult<Option<IndexValue>> {
        match self.conn.exec(&Request::Get {
            key: key.to_string(),
        })? {
            Response::Value(raw) if raw.is_empty() => Ok(None),
            Response::Value(raw) => Ok(Some(IndexValue::decode(&raw))),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches the value stored under `key`, treating a miss as an error.
    ///
    /// Same request as [`get`](Self::get), but an absent key raises
    /// [`ClientError::KeyNotFound`] instead of returning the sentinel.
    pub fn fetch(&mut self, key: &str) -> ClientResult<IndexValue> {
        match self.get(key)? {
            Some(value) => Ok(value),
            None => Err(ClientError::KeyNotFound(key.to_string())),
        }
    }

    /// Stores a value under `key`.
    ///
    /// Text and byte values travel verbatim, anything structured is
    /// JSON-serialized first.
    pub fn set(&mut self, key: &str, value: impl Into<IndexValue>) -> ClientResult<()> {
        let request = Request::Set {
            key: key.to_string(),
            value: value.into().encode(),
        };
        match self.conn.exec(&request)? {
            Response::Ack => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Stores several values in one batched request.
    ///
    /// Each value is encoded independently with the same rule as `set`.
    /// Whether the batch applies atomically is decided by the server.
    pub fn mset(&mut self, pairs: &BTreeMap<String, IndexValue>) -> ClientResult<()> {
        let pairs = pairs
            .iter()
            .map(|(key, value)| (key.clone(), value.encode()))
            .collect();
        match self.conn.exec(&Request::MSet { pairs })? {
            Response::Ack => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Looks up keys within `max_edit_distance` of `key` that share its
    /// first `min_exact_prefix` characters exactly.
    ///
    /// The prefix constraint prunes the candidate space before distance
    /// scoring. Result order is the server's ranking, preserved as is.
    pub fn get_fuzzy(
        &mut self,
        key: &str,
        max_edit_distance: u32,
        min_exact_prefix: u32,
    ) -> ClientResult<Vec<Match>> {
        let request = Request::GetFuzzy {
            key: key.to_string(),
            max_edit_distance,
            min_exact_prefix,
        };
        match self.conn.exec(&request)? {
            Response::Matches(matches) => Ok(matches),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Looks up keys sharing the exact prefix that are near `key` under the
    /// server's proximity measure.
    ///
    /// `greedy` selects the broader, slower match strategy.
    pub fn get_near(
        &mut self,
        key: &str,
        min_exact_prefix: u32,
        greedy: bool,
    ) -> ClientResult<Vec<Match>> {
        let request = Request::GetNear {
            key: key.to_string(),
            min_exact_prefix,
            greedy,
        };
        match self.conn.exec(&request)? {
            Response::Matches(matches) => Ok(matches),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Requests a durability checkpoint of pending writes.
    ///
    /// The synchronous form returns only once the checkpoint is complete;
    /// the asynchronous form returns as soon as the server accepts it.
    pub fn flush(&mut self, asynchronous: bool) -> ClientResult<()> {
        match self.conn.exec(&Request::Flush { asynchronous })? {
            Response::Ack => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Requests compaction of the index down to at most `max_segments`
    /// segments. Merging never changes which keys are retrievable.
    pub fn force_merge(&mut self, max_segments: u32) -> ClientResult<()> {
        if max_segments == 0 {
            return Err(ClientError::InvalidMaxSegments);
        }
        match self.conn.exec(&Request::ForceMerge { max_segments })? {
            Response::Ack => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

fn connection_error(addr: String, source: ClientError) -> ClientError {
    ClientError::Connection {
        addr,
        source: Box::new(source),
    }
}
