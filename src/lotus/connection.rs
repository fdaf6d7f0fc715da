//! WebSocket Session Management
//!
//! One [`RpcSession`] is one authenticated WebSocket connection to a Lotus process
//! speaking JSON-RPC 2.0. Sessions are opened at the start of a collection pass and
//! closed at its end; calls on one session are serialized.

use crate::error::{ExporterError, Result};
use crate::lotus::api_info::ApiEndpoint;
use crate::lotus::types::{JsonRpcRequest, JsonRpcResponse};
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lotus exposes every method under this namespace
const METHOD_NAMESPACE: &str = "Filecoin";

/// Options shared by every session a connector opens
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Deadline applied to every individual call
    pub request_timeout: Duration,
    /// Verify TLS certificates on `wss` endpoints
    pub verify_tls: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            verify_tls: true,
        }
    }
}

/// An open JSON-RPC session to one Lotus process
pub struct RpcSession {
    label: &'static str,
    stream: Mutex<Option<WsStream>>,
    request_id: AtomicU64,
    request_timeout: Duration,
}

impl RpcSession {
    /// Connect and authenticate against `endpoint`.
    ///
    /// Authentication happens during the WebSocket upgrade: the bearer token rides
    /// on the handshake request, and Lotus answers 401 when it is rejected.
    pub async fn open(
        label: &'static str,
        endpoint: &ApiEndpoint,
        options: SessionOptions,
    ) -> Result<Self> {
        debug!("Connecting to {} at {}", label, endpoint.url);

        let mut request = endpoint.url.as_str().into_client_request()?;
        if let Some(token) = &endpoint.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| ExporterError::Config(format!("Invalid API token: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let connecting = async {
            if endpoint.is_tls() && !options.verify_tls {
                // Custom TLS connector for self-signed certs
                let connector = native_tls::TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()
                    .map_err(|e| ExporterError::Config(e.to_string()))?;

                let connector = tokio_tungstenite::Connector::NativeTls(connector);
                tokio_tungstenite::connect_async_tls_with_config(
                    request,
                    None,
                    false,
                    Some(connector),
                )
                .await
                .map_err(|e| handshake_error(label, e))
            } else {
                connect_async(request)
                    .await
                    .map_err(|e| handshake_error(label, e))
            }
        };

        let (stream, _) = tokio::time::timeout(options.request_timeout, connecting)
            .await
            .map_err(|_| ExporterError::Timeout {
                method: format!("{} connect", label),
                after: options.request_timeout,
            })??;

        info!("Connected to {}", label);

        Ok(Self {
            label,
            stream: Mutex::new(Some(stream)),
            request_id: AtomicU64::new(0),
            request_timeout: options.request_timeout,
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Invoke `Filecoin.<method>` and deserialize its result.
    ///
    /// A JSON `null` result is handed to the deserializer as-is, so callers can
    /// ask for `Option<T>` where Lotus legitimately answers `null`.
    pub async fn call<T>(&self, method: &str, params: serde_json::Value) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let full_method = format!("{}.{}", METHOD_NAMESPACE, method);
        let id = self.next_id();

        let result = tokio::time::timeout(
            self.request_timeout,
            self.round_trip(&full_method, id, params),
        )
        .await
        .map_err(|_| ExporterError::Timeout {
            method: full_method.clone(),
            after: self.request_timeout,
        })??;

        serde_json::from_value(result).map_err(ExporterError::Json)
    }

    async fn round_trip(
        &self,
        method: &str,
        id: u64,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or_else(|| {
            ExporterError::LotusApi(format!("{} session already closed", self.label))
        })?;

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let request_json = serde_json::to_string(&request)?;
        debug!("Sending request {} to {}", method, self.label);

        if let Err(e) = stream.send(Message::Text(request_json.into())).await {
            // A failed send leaves the stream unusable
            *guard = None;
            return Err(ExporterError::WebSocket(e));
        }

        loop {
            let text = match stream.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    *guard = None;
                    return Err(ExporterError::LotusApi(format!(
                        "Connection closed by {}",
                        self.label
                    )));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    *guard = None;
                    return Err(ExporterError::WebSocket(e));
                }
            };

            let response: JsonRpcResponse = serde_json::from_str(&text)?;
            if !response_matches(&response, id) {
                debug!("Skipping unrelated frame from {}", self.label);
                continue;
            }

            debug!("{} response received", method);
            if let Some(error) = response.error {
                return Err(ExporterError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }
            return Ok(response.result.unwrap_or(serde_json::Value::Null));
        }
    }

    /// Close the connection
    pub async fn close(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.close(None).await;
            debug!("{} session closed", self.label);
        }
    }
}

fn response_matches(response: &JsonRpcResponse, id: u64) -> bool {
    match &response.id {
        Some(serde_json::Value::Number(n)) => n.as_u64() == Some(id),
        Some(serde_json::Value::String(s)) => s.parse::<u64>().ok() == Some(id),
        _ => false,
    }
}

fn handshake_error(label: &str, error: tungstenite::Error) -> ExporterError {
    if let tungstenite::Error::Http(response) = &error {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return ExporterError::Auth(format!("{} rejected the API token ({})", label, status));
        }
    }
    ExporterError::WebSocket(error)
}
