//! HTTP ingress.
//!
//! Providers post to `/{token}/{listener}`. The token picks the project and
//! the listener segment picks which of its endpoints parses the request.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Form, FromRequest, Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Router, async_trait};
use ::http::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use crate::error::IngressError;
use crate::listeners::{InboundRequest, Reply, RequestBody};
use crate::state::Relay;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[async_trait]
impl<S> FromRequest<S> for InboundRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let is_form = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(FORM_CONTENT_TYPE));

        let body = if is_form {
            match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(fields)) => RequestBody::Form(fields),
                Err(rejection) => RequestBody::MalformedForm(rejection.body_text()),
            }
        } else {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            RequestBody::Raw(bytes)
        };
        Ok(InboundRequest::new(headers, body))
    }
}

async fn index(State(relay): State<Arc<Relay>>) -> String {
    let kinds: Vec<_> = relay.registry().names().collect();
    format!(
        "trompet {}\nlisteners: {}\n",
        env!("CARGO_PKG_VERSION"),
        kinds.join(", ")
    )
}

async fn ingest(
    State(relay): State<Arc<Relay>>,
    Path((token, listener)): Path<(String, String)>,
    request: InboundRequest,
) -> Result<Reply, IngressError> {
    let projects = relay.projects();
    let Some(project) = projects.resolve(&token) else {
        debug!(listener = %listener, "request for unknown token");
        return Err(IngressError::UnknownToken);
    };
    let Some(endpoint) = project.listener(&listener) else {
        return Err(IngressError::UnknownListener {
            project: project.name().to_string(),
            listener,
        });
    };

    endpoint
        .handle(&request, relay.dispatcher())
        .inspect_err(|e| {
            warn!(
                project = %project.name(),
                listener = %listener,
                code = e.error_code(),
                error = %e,
                "rejected request"
            );
        })
}

/// Routes served by the ingress.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/:token/:listener", post(ingest))
        .with_state(relay)
}

/// Serve the ingress on `addr` until the task is dropped.
pub async fn run_http_server(addr: SocketAddr, relay: Arc<Relay>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP ingress listening");
    axum::serve(listener, router(relay)).await
}
