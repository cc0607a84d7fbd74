//! Newline-delimited JSON-RPC over TCP.

use crate::auth::Authorizer;
use crate::rpc::{self, Incoming, Request, Response};
use config::SharedConfig;
use errors::ServiceError;
use plugin::Dispatcher;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

/// Answers `rpc.methods` with the composed surface.
pub const METHODS: &str = "rpc.methods";

/// The RPC front end.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Reads one JSON-RPC message per line, authorizes it, dispatches it under
/// the configured request timeout and writes the response as one line.
/// Calls on a connection run concurrently, so responses may come back out of
/// order; callers match them by `id`. Notifications get no response.
///
/// ## Usage
/// ```rust,no_run
/// use noteserver::{Server, TokenAuthorizer};
/// use std::sync::Arc;
///
/// # async fn demo(dispatcher: plugin::Dispatcher, config: config::SharedConfig) -> std::io::Result<()> {
/// let authorizer = Arc::new(TokenAuthorizer::new(config.clone()));
/// let server = Arc::new(Server::new(dispatcher, config, authorizer));
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
/// server.serve(listener, std::future::pending()).await
/// # }
/// ```
pub struct Server {
    dispatcher: Dispatcher,
    config: SharedConfig,
    authorizer: Arc<dyn Authorizer>,
}

impl Server {
    pub fn new(dispatcher: Dispatcher, config: SharedConfig, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            dispatcher,
            config,
            authorizer,
        }
    }

    /// Handles one line. Returns the response to write, if any.
    pub async fn handle_line(&self, line: &str) -> Option<Response> {
        match rpc::decode(line) {
            Incoming::Call(request) => self.handle(request).await,
            Incoming::Reject(response) => {
                debug!(code = ?response.error.as_ref().map(|e| e.code), "Rejected message");
                Some(response)
            }
        }
    }

    /// Handles one decoded request. Notifications are run but not answered.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        let Request {
            id,
            method,
            params,
            auth,
            ..
        } = request;
        let span = info_span!("rpc", method = %method, id = ?id);
        let result = self
            .call(&method, params, auth.as_deref())
            .instrument(span)
            .await;
        if let Err(e) = &result {
            if e.is_caller_error() {
                debug!(method = %method, error = %e, "Call rejected");
            } else {
                warn!(method = %method, error = %e, "Call failed");
            }
        }
        id.map(|id| Response::from_result(id, result))
    }

    async fn call(&self, method: &str, params: Value, token: Option<&str>) -> Result<Value, ServiceError> {
        self.authorizer.authorize(method, token)?;
        if method == METHODS {
            let mut names = self.dispatcher.methods();
            names.push(METHODS.to_string());
            names.sort();
            return Ok(Value::from(names));
        }

        let timeout_secs = self.config.current().request_timeout_seconds;
        if timeout_secs == 0 {
            return self.dispatcher.dispatch(method, params).await;
        }
        let limit = Duration::from_secs(timeout_secs);
        match tokio::time::timeout(limit, self.dispatcher.dispatch(method, params)).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout {
                timeout_ms: timeout_secs.saturating_mul(1000),
            }),
        }
    }

    /// Accepts connections until `shutdown` completes.
    pub async fn serve<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %listener.local_addr()?, "Listening");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Server stopping");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(
                                server
                                    .connection(stream, peer)
                                    .instrument(info_span!("conn", %peer)),
                            );
                        }
                        Err(e) => warn!(error = %e, "Accept failed"),
                    }
                }
            }
        }
    }

    async fn connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        debug!(%peer, "Connection opened");
        let (read, mut write) = stream.into_split();
        let (tx, mut rx) = mpsc::channel::<String>(64);

        let writer = tokio::spawn(
            async move {
                while let Some(mut line) = rx.recv().await {
                    line.push('\n');
                    if let Err(e) = write.write_all(line.as_bytes()).await {
                        debug!(error = %e, "Write failed, closing connection");
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let mut lines = BufReader::new(read).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let server = Arc::clone(&self);
                    let tx = tx.clone();
                    tokio::spawn(
                        async move {
                            let Some(response) = server.handle_line(&line).await else {
                                return;
                            };
                            match serde_json::to_string(&response) {
                                Ok(text) => {
                                    let _ = tx.send(text).await;
                                }
                                Err(e) => warn!(error = %e, "Encoding response failed"),
                            }
                        }
                        .in_current_span(),
                    );
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "Read failed");
                    break;
                }
            }
        }

        // In-flight calls hold senders; the writer drains them before exiting.
        drop(tx);
        let _ = writer.await;
        debug!(%peer, "Connection closed");
    }
}
