//! # NearKV Index Client
//!
//! Purpose: Provide a thin, synchronous client for the NearKV index server,
//! covering value access, fuzzy and near lookup, and index maintenance.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `IndexClient` hides framing and connection details.
//! 2. **Fail Fast**: An `Info` probe at construction rejects dead endpoints.
//! 3. **Stateless Calls**: Every operation is one request, one response.
//! 4. **Minimal Allocation**: The request buffer is reused across calls.

mod client;
mod conn;

pub use client::{ClientConfig, ClientError, ClientResult, IndexClient};
pub use nearkv_common::{
    IndexValue, Match, DEFAULT_MAX_EDIT_DISTANCE, DEFAULT_MIN_EXACT_PREFIX, DEFAULT_PORT,
};
