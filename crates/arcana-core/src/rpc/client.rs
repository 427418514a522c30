//! RPC client used by the front door's background job tasks.
//!
//! One TCP connection per call: connect, send one frame, wait for one
//! frame, close. No reuse, no pipelining. A single timeout spans the whole
//! sequence so a wedged worker cannot strand a job task forever.

use super::protocol::{read_message, write_message, ReadingRequest, RpcResponse};
use crate::{ArcanaError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Client for the worker's reading RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcClient {
    addr: String,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            timeout,
        }
    }

    /// Address this client dials.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send one reading request and wait for the response.
    ///
    /// The returned response may itself carry `ok:false`; an `Err` here
    /// means the call never completed (connect failure, timeout, broken or
    /// undecodable frame). Callers in job tasks convert either outcome into
    /// a terminal job result - nothing propagates past them.
    pub async fn call(&self, request: &ReadingRequest) -> Result<RpcResponse> {
        match tokio::time::timeout(self.timeout, self.call_inner(request)).await {
            Ok(result) => result,
            Err(_) => Err(ArcanaError::Timeout(self.timeout)),
        }
    }

    async fn call_inner(&self, request: &ReadingRequest) -> Result<RpcResponse> {
        let mut stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            // Keep the io kind visible: failed jobs surface this text to
            // pollers, and "ConnectionRefused" is the one they grep for.
            ArcanaError::rpc(format!("{:?} connecting to {}: {}", e.kind(), self.addr, e))
        })?;

        debug!("RPC connected to {}", self.addr);

        let (mut reader, mut writer) = stream.split();
        write_message(&mut writer, request).await?;

        let response = read_message::<_, RpcResponse>(&mut reader)
            .await?
            .ok_or_else(|| {
                ArcanaError::rpc(format!(
                    "worker at {} closed the connection before replying",
                    self.addr
                ))
            })?;

        // Stream drops here; the connection is closed whether the call
        // succeeded or not.
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::server::{Infer, RpcServer};
    use std::sync::Arc;

    struct EchoDispatch;

    #[async_trait::async_trait]
    impl Infer for EchoDispatch {
        async fn infer(&self, request: &ReadingRequest) -> Result<RpcResponse> {
            let mut body = serde_json::Map::new();
            body.insert("question".into(), serde_json::json!(request.question));
            Ok(RpcResponse::success(body))
        }
    }

    struct SlowDispatch;

    #[async_trait::async_trait]
    impl Infer for SlowDispatch {
        async fn infer(&self, _request: &ReadingRequest) -> Result<RpcResponse> {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(RpcResponse::failure("too late"))
        }
    }

    #[tokio::test]
    async fn test_client_call_roundtrip() {
        let mut handle = RpcServer::start("127.0.0.1", 0, Arc::new(EchoDispatch))
            .await
            .unwrap();

        let client = RpcClient::new("127.0.0.1", handle.port, Duration::from_secs(5));
        let request = ReadingRequest::new("love", "will it work out?", "");
        let response = client.call(&request).await.unwrap();

        assert!(response.ok);
        assert_eq!(
            response.body.get("question"),
            Some(&serde_json::json!("will it work out?"))
        );

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_client_connect_refused_names_the_kind() {
        // Grab a port the OS just released so nothing is listening on it.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let client = RpcClient::new("127.0.0.1", port, Duration::from_secs(5));
        let request = ReadingRequest::new("general", "anyone there?", "");
        let err = client.call(&request).await.unwrap_err();

        let text = err.to_string();
        assert!(
            text.contains("ConnectionRefused"),
            "error should name the io kind, got: {}",
            text
        );
    }

    #[tokio::test]
    async fn test_client_times_out_on_slow_worker() {
        let mut handle = RpcServer::start("127.0.0.1", 0, Arc::new(SlowDispatch))
            .await
            .unwrap();

        let client = RpcClient::new("127.0.0.1", handle.port, Duration::from_millis(100));
        let request = ReadingRequest::new("money", "quick answer?", "");
        let err = client.call(&request).await.unwrap_err();

        assert!(matches!(err, ArcanaError::Timeout(_)));

        handle.shutdown();
    }
}
