use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::routing::any;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::error::MzutilError;

/// How long the listener may take to drain in-flight requests on shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

const SUCCESS_BODY: &str = "You may close this page";

/// Code and state carried by an authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    #[serde(default)]
    code: String,
    #[serde(default)]
    state: String,
}

impl CallbackParams {
    fn or(self, fallback: CallbackParams) -> CallbackParams {
        CallbackParams {
            code: if self.code.is_empty() { fallback.code } else { self.code },
            state: if self.state.is_empty() { fallback.state } else { self.state },
        }
    }
}

/// Single-slot hand-off from the request handler to the waiter.
type Slot = Arc<Mutex<Option<oneshot::Sender<CallbackPayload>>>>;

/// A bound listener waiting for exactly one OAuth2 redirect on `path`.
///
/// Binding is separate from waiting so callers can show the authorization
/// URL only once the port is actually accepting connections.
pub struct CallbackReceiver {
    listener: TcpListener,
    path: String,
}

impl CallbackReceiver {
    pub async fn bind(addr: SocketAddr, path: &str) -> Result<Self, MzutilError> {
        let path = normalize_path(path)?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, path })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, MzutilError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn wait(self, timeout: Duration) -> Result<CallbackPayload, MzutilError> {
        self.wait_until(timeout, std::future::pending()).await
    }

    /// Wait for a well-formed callback, the timeout, or `cancel`, whichever
    /// comes first. The listener is always shut down before returning.
    pub async fn wait_until<F>(self, timeout: Duration, cancel: F) -> Result<CallbackPayload, MzutilError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        let Self { listener, path } = self;
        let (payload_tx, payload_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let slot: Slot = Arc::new(Mutex::new(Some(payload_tx)));

        let app = Router::new()
            .route(&path, any(handle_callback))
            .with_state(slot);

        tracing::info!(%addr, path = %path, "Listening for OAuth callback");
        let mut server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = tokio::select! {
            payload = payload_rx => payload.map_err(|_| {
                MzutilError::Callback("listener stopped before a callback arrived".into())
            }),
            _ = tokio::time::sleep(timeout) => Err(MzutilError::Timeout(timeout)),
            _ = cancel => Err(MzutilError::Cancelled),
        };

        tracing::debug!(%addr, "Shutting down OAuth callback listener");
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!(%addr, "OAuth callback server error: {e}"),
            Ok(Err(e)) => tracing::warn!(%addr, "OAuth callback server task failed: {e}"),
            Err(_) => {
                tracing::warn!(%addr, "OAuth callback server did not stop in time; aborting");
                server.abort();
                let _ = server.await;
            }
        }

        outcome
    }
}

/// Bind `addr`, wait for one callback on `path`, and shut down.
pub async fn wait_for_callback(
    addr: SocketAddr,
    path: &str,
    timeout: Duration,
) -> Result<CallbackPayload, MzutilError> {
    CallbackReceiver::bind(addr, path).await?.wait(timeout).await
}

async fn handle_callback(
    State(slot): State<Slot>,
    query: Result<Query<CallbackParams>, QueryRejection>,
    form: Result<Form<CallbackParams>, FormRejection>,
) -> (StatusCode, &'static str) {
    let query = match query {
        Ok(Query(q)) => q,
        Err(e) => {
            tracing::warn!("Could not parse callback query: {e}");
            return (StatusCode::BAD_REQUEST, "Bad payload");
        }
    };
    // POST bodies win over the query string, field by field.
    let form = match form {
        Ok(Form(f)) => f,
        Err(e) => {
            tracing::debug!("No callback form body: {e}");
            CallbackParams::default()
        }
    };
    let params = form.or(query);

    if params.code.is_empty() || params.state.is_empty() {
        tracing::warn!("Callback missing params code & state");
        return (StatusCode::BAD_REQUEST, "Bad request");
    }

    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    let Some(tx) = sender else {
        return (StatusCode::GONE, "Callback already received");
    };
    let payload = CallbackPayload {
        code: params.code,
        state: params.state,
    };
    match tx.send(payload) {
        Ok(()) => (StatusCode::OK, SUCCESS_BODY),
        Err(_) => {
            tracing::warn!("Callback arrived after login stopped waiting");
            (StatusCode::GONE, "Login is no longer waiting")
        }
    }
}

fn normalize_path(path: &str) -> Result<String, MzutilError> {
    let path = if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let routable = path
        .split('/')
        .all(|seg| !seg.starts_with(':') && !seg.contains(['{', '}', '*']));
    if !routable {
        return Err(MzutilError::BadConfig(format!(
            "Callback path '{path}' cannot be served"
        )));
    }
    Ok(path)
}
