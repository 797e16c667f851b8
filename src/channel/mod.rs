//! Context-server channel
//!
//! Owns the subprocess lifecycle: spawn, initialization handshake,
//! request/response framing, and teardown. Capability discovery and
//! invocation both travel over the child's standard input/output.

pub mod protocol;

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::channel::protocol::{
    initialize_params, CallToolParams, CallToolResult, IncomingFrame, JsonRpcNotification,
    JsonRpcRequest, ListToolsResult,
};
use crate::core::config::ChannelConfig;
use crate::core::{DatalystError, Result, ToolDescriptor, ToolPayload};

/// Capability channel as seen by the bridge and the service
///
/// A trait seam so tests can stand in a double for the subprocess-backed
/// implementation.
#[async_trait]
pub trait ToolChannel: Send + Sync {
    /// Capabilities advertised by the server, fetched once per connection
    async fn list_capabilities(&self) -> Result<Vec<ToolDescriptor>>;

    /// Send one call frame and await the matching response frame
    async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolPayload>;

    /// Close the channel and terminate the subprocess; idempotent
    async fn cleanup(&self) -> Result<()>;
}

type PendingMap = Arc<StdMutex<HashMap<i64, oneshot::Sender<Result<Value>>>>>;

/// Channel to a context server spoken to over stdio
pub struct StdioChannel {
    config: ChannelConfig,
    database_url: Option<String>,
    session: Mutex<Option<Session>>,
    /// One call in flight per session; the server's framing assumes it
    call_permit: Mutex<()>,
}

/// Live connection state, created by `connect()` and destroyed by `cleanup()`
struct Session {
    child: Child,
    handles: SessionHandles,
    capabilities: Option<Vec<ToolDescriptor>>,
}

#[derive(Clone)]
struct SessionHandles {
    write_tx: mpsc::Sender<String>,
    pending: PendingMap,
    alive: Arc<AtomicBool>,
    next_id: Arc<AtomicI64>,
    timeout: Duration,
}

impl StdioChannel {
    /// Create an unconnected channel
    pub fn new(config: ChannelConfig, database_url: Option<String>) -> Self {
        Self {
            config,
            database_url,
            session: Mutex::new(None),
            call_permit: Mutex::new(()),
        }
    }

    /// Create a channel from the application configuration
    pub fn from_config(config: &crate::core::Config) -> Self {
        Self::new(config.channel.clone(), config.database.url.clone())
    }

    /// Start the context-server subprocess and perform the handshake
    ///
    /// Fails fatally when the connection string is absent, the runtime or
    /// server script is missing, or the handshake does not complete within
    /// the configured timeout.
    pub async fn connect(&self) -> Result<()> {
        if self.session.lock().await.is_some() {
            return Err(DatalystError::channel("channel already connected"));
        }

        let database_url = self
            .database_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| DatalystError::config("DATABASE_URL must be set"))?;

        if !Path::new(&self.config.script).exists() {
            return Err(DatalystError::ScriptNotFound(self.config.script.clone()));
        }

        let mut command = Command::new(&self.config.command);
        command
            .arg(&self.config.script)
            .env("DATABASE_URL", database_url)
            .env("NODE_TLS_REJECT_UNAUTHORIZED", "0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DatalystError::RuntimeNotFound(self.config.command.clone())
            } else {
                DatalystError::channel(format!("Failed to spawn context server: {}", e))
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DatalystError::channel("Failed to open subprocess stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DatalystError::channel("Failed to open subprocess stdout"))?;

        let alive = Arc::new(AtomicBool::new(true));
        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let (write_tx, write_rx) = mpsc::channel::<String>(64);

        spawn_writer(stdin, write_rx, Arc::clone(&alive));
        spawn_reader(stdout, Arc::clone(&pending), Arc::clone(&alive));

        let handles = SessionHandles {
            write_tx,
            pending,
            alive,
            next_id: Arc::new(AtomicI64::new(1)),
            timeout: Duration::from_secs(self.config.timeout_secs),
        };

        // Handshake before the session is published
        if let Err(e) = handshake(&handles).await {
            let _ = child.kill().await;
            return Err(DatalystError::Handshake(e.to_string()));
        }

        let mut guard = self.session.lock().await;
        if guard.is_some() {
            let _ = child.kill().await;
            return Err(DatalystError::channel("channel already connected"));
        }
        *guard = Some(Session {
            child,
            handles,
            capabilities: None,
        });

        tracing::info!(command = %self.config.command, "connected to context server");
        Ok(())
    }

    async fn handles(&self) -> Result<SessionHandles> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.handles.clone())
            .ok_or(DatalystError::NotConnected)
    }
}

#[async_trait]
impl ToolChannel for StdioChannel {
    async fn list_capabilities(&self) -> Result<Vec<ToolDescriptor>> {
        {
            let guard = self.session.lock().await;
            match guard.as_ref() {
                None => return Err(DatalystError::NotConnected),
                Some(session) => {
                    if let Some(cached) = &session.capabilities {
                        return Ok(cached.clone());
                    }
                }
            }
        }

        let handles = self.handles().await?;
        let result = request(&handles, "tools/list", Some(json!({}))).await?;
        let listed: ListToolsResult = serde_json::from_value(result)?;

        if let Some(session) = self.session.lock().await.as_mut() {
            session.capabilities = Some(listed.tools.clone());
        }
        Ok(listed.tools)
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<ToolPayload> {
        let handles = self.handles().await?;
        let _permit = self.call_permit.lock().await;

        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        let result = request(&handles, "tools/call", Some(serde_json::to_value(&params)?)).await?;
        decode_call_result(result)
    }

    async fn cleanup(&self) -> Result<()> {
        let session = self.session.lock().await.take();
        let Some(mut session) = session else {
            // Not connected, nothing to release
            return Ok(());
        };

        session.handles.alive.store(false, Ordering::SeqCst);
        fail_pending(&session.handles.pending, "channel closed");

        if let Err(e) = session.child.kill().await {
            tracing::warn!("failed to terminate context server: {}", e);
        }
        tracing::info!("context server disconnected");
        Ok(())
    }
}

/// Send `initialize` and confirm with `notifications/initialized`
async fn handshake(handles: &SessionHandles) -> Result<()> {
    request(handles, "initialize", Some(initialize_params())).await?;
    notify(handles, "notifications/initialized", Some(json!({}))).await
}

/// Send one request frame and await its response
async fn request(handles: &SessionHandles, method: &str, params: Option<Value>) -> Result<Value> {
    if !handles.alive.load(Ordering::SeqCst) {
        return Err(DatalystError::connection_lost("context server is not running"));
    }

    let id = handles.next_id.fetch_add(1, Ordering::SeqCst);
    let line = JsonRpcRequest::new(id, method, params).into_line()?;

    let (tx, rx) = oneshot::channel();
    handles.pending.lock().unwrap().insert(id, tx);

    if handles.write_tx.send(line).await.is_err() {
        handles.pending.lock().unwrap().remove(&id);
        return Err(DatalystError::connection_lost("write channel closed"));
    }

    match tokio::time::timeout(handles.timeout, rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(DatalystError::connection_lost(
            "context server closed the connection",
        )),
        Err(_) => {
            handles.pending.lock().unwrap().remove(&id);
            Err(DatalystError::Timeout(handles.timeout))
        }
    }
}

/// Send a notification frame; no response expected
async fn notify(handles: &SessionHandles, method: &str, params: Option<Value>) -> Result<()> {
    let line = JsonRpcNotification::new(method, params).into_line()?;
    handles
        .write_tx
        .send(line)
        .await
        .map_err(|_| DatalystError::connection_lost("write channel closed"))
}

/// Normalize a `tools/call` response into a payload
///
/// A single text segment is returned verbatim; anything else is returned as
/// the raw structured content. An error result becomes a server error.
fn decode_call_result(result: Value) -> Result<ToolPayload> {
    let call: CallToolResult = serde_json::from_value(result)?;

    if call.is_error {
        let text = call
            .content
            .iter()
            .find_map(|segment| segment.as_text())
            .unwrap_or("unknown error");
        return Err(DatalystError::server(text));
    }

    if call.content.len() == 1 {
        if let Some(text) = call.content[0].as_text() {
            return Ok(ToolPayload::Text(text.to_string()));
        }
    }
    Ok(ToolPayload::Data(serde_json::to_value(call.content)?))
}

fn spawn_writer(mut stdin: ChildStdin, mut write_rx: mpsc::Receiver<String>, alive: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while let Some(line) = write_rx.recv().await {
            if !alive.load(Ordering::SeqCst) {
                break;
            }
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                tracing::warn!("context server write error: {}", e);
                alive.store(false, Ordering::SeqCst);
                break;
            }
            if let Err(e) = stdin.flush().await {
                tracing::warn!("context server flush error: {}", e);
                alive.store(false, Ordering::SeqCst);
                break;
            }
        }
    });
}

fn spawn_reader(stdout: ChildStdout, pending: PendingMap, alive: Arc<AtomicBool>) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<IncomingFrame>(trimmed) {
                        Ok(frame) if frame.is_response() => {
                            let Some(id) = frame.id else { continue };
                            let sender = pending.lock().unwrap().remove(&id);
                            if let Some(sender) = sender {
                                let outcome = match frame.error {
                                    Some(err) => Err(DatalystError::server(err.message)),
                                    None => Ok(frame.result.unwrap_or(Value::Null)),
                                };
                                let _ = sender.send(outcome);
                            }
                        }
                        // Server-initiated requests and notifications are ignored
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!("unparseable frame from context server: {}", e);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("context server read error: {}", e);
                    break;
                }
            }
        }

        // Child exited or the pipe broke; wake every waiting caller
        alive.store(false, Ordering::SeqCst);
        fail_pending(&pending, "context server exited");
    });
}

/// Fail every outstanding request so waiting invokes return promptly
fn fail_pending(pending: &PendingMap, reason: &str) {
    let senders: Vec<_> = pending.lock().unwrap().drain().collect();
    for (_, sender) in senders {
        let _ = sender.send(Err(DatalystError::connection_lost(reason)));
    }
}
