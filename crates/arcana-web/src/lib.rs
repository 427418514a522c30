//! Front-door library surface, shared by the binary and integration tests.

pub mod handlers;
pub mod server;
