//! XML-RPC `notify(message)` for self-hosted hooks.
//!
//! A git post-receive hook renders its own messages and posts them with a
//! single call; several messages may be joined with newlines. Errors are
//! reported as XML-RPC faults inside a `200 OK`, the way XML-RPC clients
//! expect them.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{Endpoint, InboundRequest, ListenerKind, Notifier, Reply, RequestBody};
use crate::error::IngressError;

static METHOD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<methodCall>.*?<methodName>\s*([^<]*?)\s*</methodName>")
        .expect("method name pattern is valid")
});

static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<param>\s*<value>(.*?)</value>\s*</param>").expect("param pattern is valid")
});

static STRING_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(?:<string>(.*)</string>|<string\s*/>)\s*$")
        .expect("string pattern is valid")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#x([0-9a-fA-F]+)|#([0-9]+)|(lt|gt|amp|quot|apos));")
        .expect("entity pattern is valid")
});

/// Interoperable XML-RPC fault codes.
const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlRpcError {
    #[error("not an XML-RPC method call")]
    NotAMethodCall,
    #[error("parameter {0} is not a string")]
    UnsupportedParam(usize),
}

/// A decoded `<methodCall>` whose parameters are all strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub params: Vec<String>,
}

/// Decode a method call. Only string parameters are understood; a bare
/// `<value>` without a type element is a string too.
pub fn parse_method_call(body: &str) -> Result<MethodCall, XmlRpcError> {
    let method = METHOD_NAME
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|m| !m.is_empty())
        .ok_or(XmlRpcError::NotAMethodCall)?;

    let params = PARAM
        .captures_iter(body)
        .enumerate()
        .map(|(i, caps)| {
            let value = caps.get(1).map_or("", |m| m.as_str());
            if let Some(string) = STRING_VALUE.captures(value) {
                Ok(unescape(string.get(1).map_or("", |m| m.as_str())).into_owned())
            } else if !value.contains('<') {
                Ok(unescape(value).into_owned())
            } else {
                Err(XmlRpcError::UnsupportedParam(i))
            }
        })
        .collect::<Result<_, _>>()?;

    Ok(MethodCall { method, params })
}

/// A `<methodResponse>` carrying one boolean.
pub fn method_response(value: bool) -> String {
    format!(
        "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
         <value><boolean>{}</boolean></value>\n</param>\n</params>\n</methodResponse>\n",
        u8::from(value)
    )
}

/// A `<methodResponse>` carrying a fault.
pub fn fault_response(code: i32, message: &str) -> String {
    format!(
        "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n\
         <member>\n<name>faultCode</name>\n<value><int>{code}</int></value>\n</member>\n\
         <member>\n<name>faultString</name>\n<value><string>{}</string></value>\n</member>\n\
         </struct></value>\n</fault>\n</methodResponse>\n",
        escape(message)
    )
}

fn unescape(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures<'_>| {
        let code = if let Some(hex) = caps.get(1) {
            u32::from_str_radix(hex.as_str(), 16).ok()
        } else if let Some(dec) = caps.get(2) {
            dec.as_str().parse().ok()
        } else {
            return match caps.get(3).map(|m| m.as_str()) {
                Some("lt") => "<",
                Some("gt") => ">",
                Some("amp") => "&",
                Some("quot") => "\"",
                _ => "'",
            }
            .to_string();
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    })
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Listener kind `xmlrpc`. Takes no settings; an empty table enables it.
#[derive(Debug, Clone, Copy)]
pub struct XmlRpcKind;

impl ListenerKind for XmlRpcKind {
    fn name(&self) -> &'static str {
        "xmlrpc"
    }

    fn validate(&self, config: &Value) -> Result<(), String> {
        match config {
            Value::Object(_) | Value::Bool(true) => Ok(()),
            other => Err(format!("expected a table or `true`, found {other}")),
        }
    }

    fn attach(&self, project: &str, config: &Value) -> Result<Arc<dyn Endpoint>, String> {
        self.validate(config)?;
        Ok(Arc::new(NotifyEndpoint {
            project: project.to_string(),
        }))
    }
}

/// Relays pre-rendered messages.
#[derive(Debug)]
pub struct NotifyEndpoint {
    project: String,
}

impl Endpoint for NotifyEndpoint {
    fn handle(
        &self,
        request: &InboundRequest,
        notifier: &dyn Notifier,
    ) -> Result<Reply, IngressError> {
        let body = match &request.body {
            RequestBody::Raw(bytes) => String::from_utf8_lossy(bytes),
            _ => {
                return Ok(Reply::xml(fault_response(
                    PARSE_ERROR,
                    "expected a text/xml body",
                )));
            }
        };

        let call = match parse_method_call(&body) {
            Ok(call) => call,
            Err(e) => {
                let code = match e {
                    XmlRpcError::NotAMethodCall => PARSE_ERROR,
                    XmlRpcError::UnsupportedParam(_) => INVALID_PARAMS,
                };
                return Ok(Reply::xml(fault_response(code, &e.to_string())));
            }
        };

        if call.method != "notify" {
            return Ok(Reply::xml(fault_response(
                METHOD_NOT_FOUND,
                &format!("procedure {} not found", call.method),
            )));
        }
        let [message] = call.params.as_slice() else {
            return Ok(Reply::xml(fault_response(
                INVALID_PARAMS,
                "notify takes exactly one string",
            )));
        };

        let mut sent = 0usize;
        for line in message.lines().filter(|l| !l.trim().is_empty()) {
            notifier.notify(&self.project, line);
            sent += 1;
        }
        debug!(project = %self.project, lines = sent, "xmlrpc notify");
        Ok(Reply::xml(method_response(true)))
    }
}
