//! # Wire Protocol
//!
//! Purpose: Encode and parse the length-prefixed binary frames exchanged
//! with the index server, keeping allocations under control.
//!
//! ## Design Principles
//! 1. **One Frame, One Message**: A u32 length prefix delimits every body.
//! 2. **Fail Fast**: Unknown opcodes, truncation, or trailing bytes abort.
//! 3. **Binary-Safe**: Values are length-prefixed raw bytes end to end.
//! 4. **Both Directions**: Client and server share one codec.

use std::collections::BTreeMap;
use std::io::Read;

use bytes::{Buf, BufMut};

use crate::error::{WireError, WireResult};
use crate::types::Match;

/// Upper bound on a frame body, guarding against corrupt length prefixes.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const OP_INFO: u8 = 0x01;
const OP_GET: u8 = 0x02;
const OP_SET: u8 = 0x03;
const OP_MSET: u8 = 0x04;
const OP_GET_FUZZY: u8 = 0x05;
const OP_GET_NEAR: u8 = 0x06;
const OP_FLUSH: u8 = 0x07;
const OP_FORCE_MERGE: u8 = 0x08;

const TAG_ACK: u8 = 0x01;
const TAG_VALUE: u8 = 0x02;
const TAG_INFO: u8 = 0x03;
const TAG_MATCHES: u8 = 0x04;
const TAG_ERROR: u8 = 0xFF;

/// Request messages accepted by the index server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Server metadata query, also used as the connect-time liveness probe.
    Info,
    /// Value lookup for one key.
    Get { key: String },
    /// Single write of an already-encoded value.
    Set { key: String, value: Vec<u8> },
    /// Batched write; each value was encoded independently.
    MSet { pairs: Vec<(String, Vec<u8>)> },
    /// Edit-distance lookup constrained to an exact leading prefix.
    GetFuzzy {
        key: String,
        max_edit_distance: u32,
        min_exact_prefix: u32,
    },
    /// Prefix-constrained proximity lookup.
    GetNear {
        key: String,
        min_exact_prefix: u32,
        greedy: bool,
    },
    /// Durability checkpoint of pending writes.
    Flush { asynchronous: bool },
    /// Compaction of the index down to at most `max_segments` segments.
    ForceMerge { max_segments: u32 },
}

/// Response messages produced by the index server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Operation accepted, nothing to return.
    Ack,
    /// Raw wire value for a key; empty bytes mean the key is absent.
    Value(Vec<u8>),
    /// Server metadata as key/value strings.
    Info(BTreeMap<String, String>),
    /// Lookup results, in server order.
    Matches(Vec<Match>),
    /// Server-side failure description.
    Error(String),
}

/// Encodes a request as one length-prefixed frame appended to `out`.
pub fn encode_request(request: &Request, out: &mut Vec<u8>) {
    let start = begin_frame(out);
    match request {
        Request::Info => out.put_u8(OP_INFO),
        Request::Get { key } => {
            out.put_u8(OP_GET);
            put_str(out, key);
        }
        Request::Set { key, value } => {
            out.put_u8(OP_SET);
            put_str(out, key);
            put_bytes(out, value);
        }
        Request::MSet { pairs } => {
            out.put_u8(OP_MSET);
            out.put_u32(pairs.len() as u32);
            for (key, value) in pairs {
                put_str(out, key);
                put_bytes(out, value);
            }
        }
        Request::GetFuzzy {
            key,
            max_edit_distance,
            min_exact_prefix,
        } => {
            out.put_u8(OP_GET_FUZZY);
            put_str(out, key);
            out.put_u32(*max_edit_distance);
            out.put_u32(*min_exact_prefix);
        }
        Request::GetNear {
            key,
            min_exact_prefix,
            greedy,
        } => {
            out.put_u8(OP_GET_NEAR);
            put_str(out, key);
            out.put_u32(*min_exact_prefix);
            out.put_u8(*greedy as u8);
        }
        Request::Flush { asynchronous } => {
            out.put_u8(OP_FLUSH);
            out.put_u8(*asynchronous as u8);
        }
        Request::ForceMerge { max_segments } => {
            out.put_u8(OP_FORCE_MERGE);
            out.put_u32(*max_segments);
        }
    }
    end_frame(out, start);
}

/// Parses a request from one frame body.
pub fn decode_request(body: &[u8]) -> WireResult<Request> {
    let mut buf = body;
    let opcode = get_u8(&mut buf)?;
    let request = match opcode {
        OP_INFO => Request::Info,
        OP_GET => Request::Get {
            key: get_str(&mut buf)?,
        },
        OP_SET => Request::Set {
            key: get_str(&mut buf)?,
            value: get_bytes(&mut buf)?,
        },
        OP_MSET => {
            let count = get_u32(&mut buf)? as usize;
            let mut pairs = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let key = get_str(&mut buf)?;
                let value = get_bytes(&mut buf)?;
                pairs.push((key, value));
            }
            Request::MSet { pairs }
        }
        OP_GET_FUZZY => Request::GetFuzzy {
            key: get_str(&mut buf)?,
            max_edit_distance: get_u32(&mut buf)?,
            min_exact_prefix: get_u32(&mut buf)?,
        },
        OP_GET_NEAR => Request::GetNear {
            key: get_str(&mut buf)?,
            min_exact_prefix: get_u32(&mut buf)?,
            greedy: get_bool(&mut buf)?,
        },
        OP_FLUSH => Request::Flush {
            asynchronous: get_bool(&mut buf)?,
        },
        OP_FORCE_MERGE => Request::ForceMerge {
            max_segments: get_u32(&mut buf)?,
        },
        other => return Err(WireError::UnknownOpcode(other)),
    };
    expect_empty(buf)?;
    Ok(request)
}

/// Encodes a response as one length-prefixed frame appended to `out`.
pub fn encode_response(response: &Response, out: &mut Vec<u8>) {
    let start = begin_frame(out);
    match response {
        Response::Ack => out.put_u8(TAG_ACK),
        Response::Value(raw) => {
            out.put_u8(TAG_VALUE);
            put_bytes(out, raw);
        }
        Response::Info(info) => {
            out.put_u8(TAG_INFO);
            out.put_u32(info.len() as u32);
            for (key, value) in info {
                put_str(out, key);
                put_str(out, value);
            }
        }
        Response::Matches(matches) => {
            out.put_u8(TAG_MATCHES);
            out.put_u32(matches.len() as u32);
            for entry in matches {
                put_str(out, &entry.key);
                out.put_u32(entry.distance);
                put_bytes(out, &entry.raw_value);
            }
        }
        Response::Error(message) => {
            out.put_u8(TAG_ERROR);
            put_str(out, message);
        }
    }
    end_frame(out, start);
}

/// Parses a response from one frame body.
pub fn decode_response(body: &[u8]) -> WireResult<Response> {
    let mut buf = body;
    let tag = get_u8(&mut buf)?;
    let response = match tag {
        TAG_ACK => Response::Ack,
        TAG_VALUE => Response::Value(get_bytes(&mut buf)?),
        TAG_INFO => {
            let count = get_u32(&mut buf)? as usize;
            let mut info = BTreeMap::new();
            for _ in 0..count {
                let key = get_str(&mut buf)?;
                let value = get_str(&mut buf)?;
                info.insert(key, value);
            }
            Response::Info(info)
        }
        TAG_MATCHES => {
            let count = get_u32(&mut buf)? as usize;
            let mut matches = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let key = get_str(&mut buf)?;
                let distance = get_u32(&mut buf)?;
                let raw_value = get_bytes(&mut buf)?;
                matches.push(Match {
                    key,
                    distance,
                    raw_value,
                });
            }
            Response::Matches(matches)
        }
        TAG_ERROR => Response::Error(get_str(&mut buf)?),
        other => return Err(WireError::UnknownTag(other)),
    };
    expect_empty(buf)?;
    Ok(response)
}

/// Reads one frame body from the stream, stripping the length prefix.
pub fn read_frame<R: Read>(reader: &mut R) -> WireResult<Vec<u8>> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(body)
}

fn begin_frame(out: &mut Vec<u8>) -> usize {
    let start = out.len();
    // Placeholder length, patched once the body is written.
    out.put_u32(0);
    start
}

fn end_frame(out: &mut Vec<u8>, start: usize) {
    let len = (out.len() - start - 4) as u32;
    out[start..start + 4].copy_from_slice(&len.to_be_bytes());
}

fn put_bytes(out: &mut Vec<u8>, data: &[u8]) {
    out.put_u32(data.len() as u32);
    out.put_slice(data);
}

fn put_str(out: &mut Vec<u8>, text: &str) {
    put_bytes(out, text.as_bytes());
}

fn get_u8(buf: &mut &[u8]) -> WireResult<u8> {
    if buf.remaining() < 1 {
        return Err(WireError::Truncated);
    }
    Ok(buf.get_u8())
}

fn get_u32(buf: &mut &[u8]) -> WireResult<u32> {
    if buf.remaining() < 4 {
        return Err(WireError::Truncated);
    }
    Ok(buf.get_u32())
}

fn get_bool(buf: &mut &[u8]) -> WireResult<bool> {
    Ok(get_u8(buf)? != 0)
}

fn get_bytes(buf: &mut &[u8]) -> WireResult<Vec<u8>> {
    let len = get_u32(buf)? as usize;
    if buf.remaining() < len {
        return Err(WireError::Truncated);
    }
    let mut data = vec![0u8; len];
    buf.copy_to_slice(&mut data);
    Ok(data)
}

fn get_str(buf: &mut &[u8]) -> WireResult<String> {
    String::from_utf8(get_bytes(buf)?).map_err(|_| WireError::InvalidUtf8)
}

fn expect_empty(buf: &[u8]) -> WireResult<()> {
    if buf.is_empty() {
        Ok(())
    } else {
        Err(WireError::TrailingBytes)
    }
}
