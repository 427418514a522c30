//! TCP RPC server hosted by the worker process.
//!
//! Accepts connections from the front door and serves exactly one
//! request/response pair per connection. Each accepted connection runs in
//! its own spawned task; a semaphore caps how many handlers are in flight
//! so a burst of submissions cannot pile up unbounded tasks.
//!
//! The server validates the request envelope itself (mode, minimum question
//! length) and only hands well-formed requests to the [`Infer`]
//! collaborator. Collaborator failures are converted to `{ok:false, error}`
//! at the connection boundary; nothing escapes a handler.

use super::protocol::{read_message, write_message, ReadingRequest, RpcResponse};
use crate::config::{Mode, RpcConfig};
use crate::Result;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, error, info, warn};

/// The inference collaborator, as the core sees it.
///
/// One opaque operation: the core calls it exactly once per valid request
/// and tolerates whatever latency it has. Implementations are responsible
/// for their own resource discipline (see `InferenceGate`).
#[async_trait::async_trait]
pub trait Infer: Send + Sync + 'static {
    /// Perform one reading and return the wire response verbatim.
    async fn infer(&self, request: &ReadingRequest) -> Result<RpcResponse>;
}

/// Handle to a running RPC server. Dropping shuts down the server.
pub struct RpcServerHandle {
    pub addr: std::net::SocketAddr,
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RpcServerHandle {
    pub fn addr(&self) -> std::net::SocketAddr {
        self.addr
    }

    /// Stop accepting new connections. In-flight handlers finish their one
    /// request on their own.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// RPC server that listens for front-door connections.
pub struct RpcServer;

impl RpcServer {
    /// Bind and start serving. Port 0 asks the OS for a free port; the
    /// actual address is on the returned handle.
    pub async fn start<D: Infer>(
        host: &str,
        port: u16,
        dispatch: Arc<D>,
    ) -> Result<RpcServerHandle> {
        let listener = TcpListener::bind(format!("{}:{}", host, port)).await?;
        let addr = listener.local_addr()?;

        info!("Reading RPC server listening on {}", addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task_handle = tokio::spawn(Self::accept_loop(listener, dispatch, shutdown_rx));

        Ok(RpcServerHandle {
            addr,
            port: addr.port(),
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        })
    }

    async fn accept_loop<D: Infer>(
        listener: TcpListener,
        dispatch: Arc<D>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let limiter = Arc::new(Semaphore::new(RpcConfig::MAX_CONNECTIONS));

        loop {
            // Hold off on accepting until a handler slot is free; the
            // backlog queues in the kernel instead of as spawned tasks.
            let permit = tokio::select! {
                _ = &mut shutdown_rx => break,
                permit = limiter.clone().acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            tokio::select! {
                _ = &mut shutdown_rx => break,
                accept_result = listener.accept() => match accept_result {
                    Ok((stream, peer_addr)) => {
                        let dispatch = dispatch.clone();
                        tokio::spawn(async move {
                            debug!("Connection from {}", peer_addr);
                            let started = std::time::Instant::now();
                            if let Err(e) = Self::handle_connection(stream, &*dispatch).await {
                                debug!("Connection {} ended: {}", peer_addr, e);
                            }
                            debug!(
                                "Disconnect {} after {:.2}s",
                                peer_addr,
                                started.elapsed().as_secs_f64()
                            );
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                        drop(permit);
                    }
                },
            }
        }

        info!("Reading RPC server shutting down");
    }

    /// Serve one connection: one frame in, one frame out. The stream drops
    /// at every exit path, so the connection always closes.
    async fn handle_connection<D: Infer>(mut stream: TcpStream, dispatch: &D) -> Result<()> {
        let (mut reader, mut writer) = stream.split();

        let request: ReadingRequest = match read_message(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()), // peer connected and left
            Err(e) => {
                // Best effort: tell the peer what went wrong before closing.
                let _ = write_message(&mut writer, &RpcResponse::failure(e.to_string())).await;
                return Err(e);
            }
        };

        let response = Self::process(request.trimmed(), dispatch).await;
        write_message(&mut writer, &response).await
    }

    async fn process<D: Infer>(request: ReadingRequest, dispatch: &D) -> RpcResponse {
        if Mode::from_str(&request.mode).is_none() {
            warn!("Rejecting request: bad mode {:?}", request.mode);
            return RpcResponse::failure("bad mode");
        }

        if request.question.chars().count() < RpcConfig::MIN_QUESTION_CHARS {
            warn!("Rejecting request: question too short");
            return RpcResponse::failure("question too short");
        }

        info!(
            "Reading start: mode={} qlen={} ilen={}",
            request.mode,
            request.question.chars().count(),
            request.information.chars().count()
        );

        match dispatch.infer(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Reading failed: {}", e);
                RpcResponse::failure(e.to_string())
            }
        }
    }
}
