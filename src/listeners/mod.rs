//! Listener kinds and the registry that names them.
//!
//! A listener kind knows how to check one project's configuration block for
//! it and how to build the [`Endpoint`] that serves `POST /{token}/{kind}`.
//! The registry is assembled once at startup and shared read-only.

pub mod travis;
pub mod webhook;
pub mod xmlrpc;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use crate::commit::PayloadFormat;
use crate::error::{IngressError, RegistryError};

/// Receives rendered messages for a project.
pub trait Notifier: Send + Sync {
    fn notify(&self, project: &str, message: &str);
}

/// Serves one listener of one project.
pub trait Endpoint: Send + Sync + fmt::Debug {
    fn handle(
        &self,
        request: &InboundRequest,
        notifier: &dyn Notifier,
    ) -> Result<Reply, IngressError>;
}

/// A pluggable listener kind.
pub trait ListenerKind: Send + Sync {
    /// Key under which projects configure this kind, and the URL segment.
    fn name(&self) -> &'static str;

    /// Check a configuration block without building anything.
    fn validate(&self, config: &Value) -> Result<(), String>;

    /// Build the endpoint serving `project`.
    fn attach(&self, project: &str, config: &Value) -> Result<Arc<dyn Endpoint>, String>;
}

/// Listener kinds by name.
#[derive(Default)]
pub struct Registry {
    kinds: BTreeMap<&'static str, Arc<dyn ListenerKind>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The kinds trompet ships with: `bitbucket`, `github`, `travisci` and `xmlrpc`.
    pub fn builtin() -> Self {
        let kinds: [Arc<dyn ListenerKind>; 4] = [
            Arc::new(webhook::PushKind::new("bitbucket", PayloadFormat::Bitbucket)),
            Arc::new(webhook::PushKind::new("github", PayloadFormat::GitHub)),
            Arc::new(travis::TravisKind),
            Arc::new(xmlrpc::XmlRpcKind),
        ];
        Self {
            kinds: kinds.into_iter().map(|kind| (kind.name(), kind)).collect(),
        }
    }

    /// Add a kind. Fails, leaving the registry unchanged, if the name is taken.
    pub fn register<K>(&mut self, kind: K) -> Result<&mut Self, RegistryError>
    where
        K: ListenerKind + 'static,
    {
        let name = kind.name();
        if self.kinds.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.kinds.insert(name, Arc::new(kind));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<&dyn ListenerKind, RegistryError> {
        self.kinds
            .get(name)
            .map(|kind| kind.as_ref())
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds.keys()).finish()
    }
}

/// Body of an inbound request, decoded according to its content type.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` fields.
    Form(HashMap<String, String>),
    /// A form body that failed to decode.
    MalformedForm(String),
    /// Anything else, verbatim.
    Raw(Bytes),
}

/// What an [`Endpoint`] sees of an HTTP request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl InboundRequest {
    pub fn new(headers: HeaderMap, body: RequestBody) -> Self {
        Self { headers, body }
    }

    /// Header value, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The JSON document a provider posted: the `payload` form field, or the
    /// whole body when it was not form encoded.
    pub fn payload(&self) -> Result<Cow<'_, str>, IngressError> {
        match &self.body {
            RequestBody::Form(fields) => fields
                .get("payload")
                .map(|p| Cow::Borrowed(p.as_str()))
                .ok_or(IngressError::MissingPayload),
            RequestBody::MalformedForm(reason) => Err(IngressError::BadRequest(reason.clone())),
            RequestBody::Raw(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                Err(IngressError::MissingPayload)
            }
            RequestBody::Raw(bytes) => std::str::from_utf8(bytes)
                .map(Cow::Borrowed)
                .map_err(|_| IngressError::BadRequest("body is not UTF-8".to_string())),
        }
    }
}

/// Successful answer to a provider. Always `200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn empty() -> Self {
        Self {
            content_type: "text/plain; charset=utf-8",
            body: String::new(),
        }
    }

    pub fn xml(body: String) -> Self {
        Self {
            content_type: "text/xml",
            body,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Deserialize a listener block into its typed form.
fn parse_config<T: serde::de::DeserializeOwned>(config: &Value) -> Result<T, String> {
    T::deserialize(config).map_err(|e| e.to_string())
}
