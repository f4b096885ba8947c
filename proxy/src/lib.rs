//! Credential-forwarding proxy for the record store.
//!
//! Browsers and local clients talk to this proxy instead of the platform:
//! it injects the server-held access token, strips any client-supplied
//! credential fields from outgoing bodies, and answers every request with
//! permissive cross-origin headers. The credential-exchange path never
//! reaches the platform from here as a passthrough; it short-circuits to the
//! process-wide token cache.

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode, header};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use stylus::archive::{AUTH_PATH, Credentials, TokenCache};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Nominal lifetime reported back to clients from the synthesized exchange
/// envelope. The cache refreshes well before this runs out.
const NOMINAL_LIFETIME_SECS: i64 = 7200;

/// Failures at the proxy boundary. Every variant degrades to a structured
/// 500 envelope; none of them take the process down.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Auth(#[from] stylus::AuthError),

    #[error("upstream call failed: {0}")]
    Upstream(String),

    #[error("unreadable request body: {0}")]
    Body(String),
}

pub struct ProxyState {
    token: TokenCache,
    upstream_url: String,
    route_prefix: String,
    http: reqwest::Client,
}

impl ProxyState {
    /// Build proxy state from settings. Fails fast when the server-held
    /// credential pair is missing.
    pub fn new(settings: &config::ProxySettings) -> Result<Self, stylus::AuthError> {
        let credentials = Credentials::from_settings(settings)?;
        let upstream_url = settings.upstream_url.trim_end_matches('/').to_string();
        let auth_url = format!("{}/{}", upstream_url, AUTH_PATH);

        Ok(ProxyState {
            token: TokenCache::with_credentials(auth_url, credentials),
            upstream_url,
            route_prefix: settings.route_prefix.clone(),
            http: reqwest::Client::new(),
        })
    }

    async fn forward(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, ProxyError> {
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(String::from);
        let target = resolve_target_path(&path, &self.route_prefix).to_string();

        // The exchange endpoint answers from the cache; clients never hold
        // the real credential pair.
        if target.contains("auth/v3/tenant_access_token") {
            let token = self.token.get_token().await?;
            let body = serde_json::json!({
                "code": 0,
                "tenant_access_token": token,
                "expire": NOMINAL_LIFETIME_SECS,
            });
            return Ok(json_response(StatusCode::OK, &body));
        }

        // A caller-supplied bearer is forwarded verbatim; otherwise the
        // cached token is attached.
        let authorization = match req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            Some(supplied) => supplied.to_string(),
            None => format!("Bearer {}", self.token.get_token().await?),
        };

        let method = req.method().clone();
        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| ProxyError::Body(e.to_string()))?
            .to_bytes();
        let body = strip_secret_fields(&body);

        let mut url = format!("{}/{}", self.upstream_url, target);
        if let Some(query) = query {
            url.push('?');
            url.push_str(&query);
        }

        let method = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;
        let mut builder = self
            .http
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("Authorization", authorization);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let upstream = builder
            .send()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        // Status and body pass through unchanged
        let status = StatusCode::from_u16(upstream.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| ProxyError::Upstream(e.to_string()))?;

        let response = with_cors(Response::builder().status(status))
            .body(Full::new(bytes))
            .expect("static response headers");
        Ok(response)
    }
}

/// Strip the fixed routing prefix from an incoming path.
fn resolve_target_path<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix)
        .unwrap_or_else(|| path.trim_start_matches('/'))
}

/// Remove client-supplied credential fields from a JSON body before it
/// leaves the proxy. Non-JSON bodies are forwarded untouched.
fn strip_secret_fields(body: &[u8]) -> Vec<u8> {
    if body.is_empty() {
        return Vec::new();
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(mut value) => {
            if let Some(map) = value.as_object_mut() {
                map.remove("app_id");
                map.remove("app_secret");
            }
            serde_json::to_vec(&value).unwrap_or_else(|_| body.to_vec())
        }
        Err(_) => body.to_vec(),
    }
}

fn with_cors(builder: hyper::http::response::Builder) -> hyper::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    with_cors(Response::builder().status(status))
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response headers")
}

fn error_response(err: &ProxyError) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({
            "error": "proxy failed",
            "message": err.to_string(),
        }),
    )
}

async fn handle(state: Arc<ProxyState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    // Preflight terminates immediately with no body
    if req.method() == Method::OPTIONS {
        return with_cors(Response::builder().status(StatusCode::OK))
            .body(Full::new(Bytes::new()))
            .expect("static response headers");
    }

    match state.forward(req).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "proxy request failed");
            error_response(&e)
        }
    }
}

/// Handle to a running server that can be used to stop it
pub struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    port: u16,
}

impl ServerHandle {
    /// Get the port the server is running on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL clients should point their record-store calls at
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the server
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start the proxy on the specified host and port (0 picks a free one).
pub async fn start_server_on(
    host: &str,
    port: u16,
    state: ProxyState,
) -> anyhow::Result<ServerHandle> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let actual_port = local_addr.port();

    info!("Starting credential proxy on {}", local_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let state = Arc::new(state);

    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_rx;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutting down credential proxy");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let io = TokioIo::new(stream);
                            let state = Arc::clone(&state);

                            tokio::spawn(async move {
                                if let Err(err) = http1::Builder::new()
                                    .serve_connection(
                                        io,
                                        hyper::service::service_fn(move |req| {
                                            let state = Arc::clone(&state);
                                            async move {
                                                Ok::<_, std::convert::Infallible>(
                                                    handle(state, req).await,
                                                )
                                            }
                                        }),
                                    )
                                    .await
                                {
                                    error!("Error serving connection: {:?}", err);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    });

    Ok(ServerHandle {
        shutdown_tx,
        port: actual_port,
    })
}
