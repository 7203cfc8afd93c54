//! # Outbound HTTP Transport
//!
//! Every call the relay makes to the storage provider or the token endpoint goes
//! through [`HttpTransport`]. The Worker uses [`FetchTransport`], backed by the
//! Workers `fetch` API; tests substitute a recording transport.
//!
//! Requests and replies are plain values built on the `http` crate types so the
//! handler logic never touches JS-backed objects.

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use worker::wasm_bindgen::JsValue;
use worker::{js_sys, Fetch, Headers, Request, RequestInit, RequestRedirect};

use crate::errors::{AppError, AppResult};

/// A fully buffered outbound request.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header, rejecting values that cannot travel in an HTTP header.
    pub fn header(mut self, name: &'static str, value: &str) -> AppResult<Self> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| AppError::BadRequest(format!("Invalid value for header {name}")))?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

/// A fully buffered upstream reply.
#[derive(Clone, Debug, Default)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// One outbound HTTP exchange.
///
/// Futures are not `Send`: the Workers runtime is single threaded and its
/// fetch handles are JS objects.
#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: OutboundRequest) -> AppResult<UpstreamResponse>;
}

/// Transport backed by the Workers `fetch` API.
///
/// Redirects are returned rather than followed so that a `308 Resume Incomplete`
/// from the provider reaches the caller.
#[derive(Default)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn send(&self, request: OutboundRequest) -> AppResult<UpstreamResponse> {
        let headers = Headers::new();
        for (name, value) in request.headers.iter() {
            let value = value
                .to_str()
                .map_err(|e| AppError::Internal(format!("Invalid header {name}: {e}")))?;
            headers.set(name.as_str(), value)?;
        }

        let mut init = RequestInit::new();
        init.with_method(to_worker_method(&request.method))
            .with_headers(headers)
            .with_redirect(RequestRedirect::Manual);
        if !request.body.is_empty() {
            let body: JsValue = js_sys::Uint8Array::from(request.body.as_slice()).into();
            init.with_body(Some(body));
        }

        let outbound = Request::new_with_init(&request.url, &init)?;
        let mut response = Fetch::Request(outbound).send().await?;

        let mut reply_headers = HeaderMap::new();
        for (name, value) in response.headers().entries() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                reply_headers.append(name, value);
            }
        }

        let status = response.status_code();
        let body = response.text().await.unwrap_or_default();

        Ok(UpstreamResponse {
            status,
            headers: reply_headers,
            body,
        })
    }
}

fn to_worker_method(method: &Method) -> worker::Method {
    worker::Method::from(method.as_str().to_string())
}
