//! Framed RPC bridge between the front door and the worker.
//!
//! One request/response pair per TCP connection, each message a 4-byte
//! big-endian length prefix followed by a UTF-8 JSON body. The transport
//! may be a direct local socket or an SSH tunnel; neither role cares.

pub mod client;
pub mod protocol;
pub mod server;
