//! Arcana Core - job dispatch and RPC bridge for the reading service.
//!
//! This crate holds everything the two Arcana processes share: the framed
//! wire protocol and its client/server roles, the in-memory job table the
//! front door polls against, the serialization gate the worker wraps its
//! expensive backend in, and the common error/config types.
//!
//! The domain itself (cards, prompts, generation) lives in `arcana-worker`;
//! this crate only sees it through the [`Infer`] trait.

pub mod config;
pub mod error;
pub mod gate;
pub mod jobs;
pub mod rpc;

// Re-export commonly used types
pub use config::{JobConfig, Mode, RpcConfig, WebConfig};
pub use error::{ArcanaError, Result};
pub use gate::InferenceGate;
pub use jobs::{Job, JobStatus, JobStore, JobView};
pub use rpc::client::RpcClient;
pub use rpc::protocol::{ReadingRequest, RpcResponse};
pub use rpc::server::{Infer, RpcServer, RpcServerHandle};
