//! IPC interface for the Muse daemon

use crate::engine::{EngineStatus, SharedEngine};
use crate::store::PersistenceStore;
use crate::weather::ContextUpdate;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};

/// IPC request types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IpcRequest {
    /// Get engine status
    GetStatus,

    /// Advance the rotation and return the new item
    Next,

    /// Current weather changed
    SetWeather { icon: String },

    /// Current-weather payload as published by a weather provider
    WeatherUpdate { payload: serde_json::Value },

    /// Set the category directly
    SetCategory { category: String },

    /// Drop the current category
    ClearCategory,

    /// Forget the stored rotation cursor
    ResetRotation,
}

/// IPC response types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum IpcResponse {
    /// Successful response with data
    Success { data: serde_json::Value },

    /// Error response
    Error { message: String },
}

impl IpcResponse {
    /// Create success response
    pub fn success<T: Serialize>(data: T) -> Self {
        Self::Success {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Create error response
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Full daemon status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub version: String,
    pub engine: EngineStatus,
}

/// Handler for processing IPC requests
pub trait IpcHandler: Send + Sync {
    /// Handle an IPC request
    fn handle(&self, request: IpcRequest) -> impl std::future::Future<Output = IpcResponse> + Send;
}

/// Handler backed by a shared engine
pub struct MuseHandler<S> {
    engine: SharedEngine<S>,
}

impl<S> MuseHandler<S> {
    pub fn new(engine: SharedEngine<S>) -> Self {
        Self { engine }
    }
}

impl<S: PersistenceStore + 'static> IpcHandler for MuseHandler<S> {
    async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::GetStatus => {
                let engine = self.engine.read().await;
                IpcResponse::success(DaemonStatus {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    engine: engine.status(),
                })
            }

            IpcRequest::Next => {
                let mut engine = self.engine.write().await;
                IpcResponse::success(engine.next_item())
            }

            IpcRequest::SetWeather { icon } => {
                let mut engine = self.engine.write().await;
                engine.apply(&ContextUpdate::CurrentWeather { icon });
                IpcResponse::success(engine.category())
            }

            IpcRequest::WeatherUpdate { payload } => {
                let Some(update) = ContextUpdate::from_weather_payload(&payload) else {
                    return IpcResponse::error("Weather payload has no icon");
                };
                let mut engine = self.engine.write().await;
                engine.apply(&update);
                IpcResponse::success(engine.category())
            }

            IpcRequest::SetCategory { category } => {
                let mut engine = self.engine.write().await;
                engine.set_category(Some(category));
                IpcResponse::success(engine.category())
            }

            IpcRequest::ClearCategory => {
                let mut engine = self.engine.write().await;
                engine.set_category(None);
                IpcResponse::success(serde_json::Value::Null)
            }

            IpcRequest::ResetRotation => {
                let mut engine = self.engine.write().await;
                match engine.reset_rotation() {
                    Ok(()) => IpcResponse::success(engine.rotation_state()),
                    Err(e) => IpcResponse::error(e.to_string()),
                }
            }
        }
    }
}

/// IPC server
pub struct IpcServer<H: IpcHandler> {
    socket_path: String,
    handler: Arc<H>,
}

impl<H: IpcHandler + 'static> IpcServer<H> {
    /// Create new IPC server
    pub fn new(socket_path: impl Into<String>, handler: H) -> Self {
        Self {
            socket_path: socket_path.into(),
            handler: Arc::new(handler),
        }
    }

    /// Start the IPC server
    pub async fn run(&self) -> Result<()> {
        let path = Path::new(&self.socket_path);

        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Remove existing socket
        let _ = std::fs::remove_file(path);

        let listener = UnixListener::bind(path)?;
        info!("Muse IPC listening on {}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            error!("Client error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

async fn handle_client<H: IpcHandler>(stream: UnixStream, handler: Arc<H>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<IpcRequest>(&line) {
            Ok(request) => {
                debug!("IPC request: {:?}", request);
                handler.handle(request).await
            }
            Err(e) => IpcResponse::error(format!("Invalid request: {}", e)),
        };

        let response_json = serde_json::to_string(&response)?;
        writer.write_all(response_json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        line.clear();
    }

    Ok(())
}

/// IPC client for connecting to mused
pub struct IpcClient {
    socket_path: String,
}

impl IpcClient {
    /// Create new IPC client
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Send request and receive response
    pub async fn send(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.socket_path).await?;

        let request_json = serde_json::to_string(&request)?;
        stream.write_all(request_json.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await?;

        Ok(serde_json::from_str(&line)?)
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, request: IpcRequest) -> Result<T> {
        match self.send(request).await? {
            IpcResponse::Success { data } => Ok(serde_json::from_value(data)?),
            IpcResponse::Error { message } => Err(anyhow::anyhow!(message)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus> {
        self.call(IpcRequest::GetStatus).await
    }

    /// Advance the rotation
    pub async fn next(&self) -> Result<String> {
        self.call(IpcRequest::Next).await
    }

    /// Report the current weather icon; returns the resolved category
    pub async fn set_weather(&self, icon: &str) -> Result<Option<String>> {
        self.call(IpcRequest::SetWeather {
            icon: icon.to_string(),
        })
        .await
    }

    /// Forward a current-weather payload; returns the resolved category
    pub async fn weather_update(&self, payload: serde_json::Value) -> Result<Option<String>> {
        self.call(IpcRequest::WeatherUpdate { payload }).await
    }

    pub async fn set_category(&self, category: &str) -> Result<Option<String>> {
        self.call(IpcRequest::SetCategory {
            category: category.to_string(),
        })
        .await
    }

    pub async fn clear_category(&self) -> Result<()> {
        match self.send(IpcRequest::ClearCategory).await? {
            IpcResponse::Success { .. } => Ok(()),
            IpcResponse::Error { message } => Err(anyhow::anyhow!(message)),
        }
    }

    pub async fn reset_rotation(&self) -> Result<()> {
        match self.send(IpcRequest::ResetRotation).await? {
            IpcResponse::Success { .. } => Ok(()),
            IpcResponse::Error { message } => Err(anyhow::anyhow!(message)),
        }
    }
}
