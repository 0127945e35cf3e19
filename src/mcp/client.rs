//! HTTP client for a single MCP server

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::value::RawValue;

use super::envelope::{self, MAX_LINE_BYTES};
use super::error::{BODY_SNIPPET_LIMIT, Error, FramingError, Result, TransportError};
use super::protocol::{InitializeResult, ListToolsResult, McpRequest, McpResponse, McpTool};
use super::redirect::{DEFAULT_MAX_REDIRECTS, PreparedRequest, RedirectPolicy};
use crate::build_info;

/// Name sent as `clientInfo.name` during the handshake.
pub const CLIENT_NAME: &str = "mcpli";

/// Default bound on a whole operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ACCEPT_VALUE: &str = "application/json, text/event-stream";

/// Immutable address of one MCP server: URL plus static headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
    headers: HeaderMap,
}

impl Endpoint {
    /// Validate `url` and `headers` into an endpoint.
    ///
    /// Header values are used as given; placeholder expansion is the
    /// caller's job.
    pub fn new<I, K, V>(url: &str, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = Url::parse(url).map_err(|e| Error::Construction(format!("invalid URL {url:?}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Construction(format!(
                "unsupported URL scheme {:?}",
                url.scheme()
            )));
        }

        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let (name, value) = (name.as_ref(), value.as_ref());
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Construction(format!("invalid header name {name:?}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::Construction(format!("invalid value for header {name:?}: {e}")))?;
            map.insert(header_name, header_value);
        }

        Ok(Self { url, headers: map })
    }

    /// Target URL
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Static headers
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Protocol headers overlaid with the static headers.
    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }
}

/// Client tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Default bound on each operation, redirects and body read included.
    pub timeout: Duration,
    /// Maximum redirect hops per request.
    pub max_redirects: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// MCP client over HTTP.
///
/// Holds no mutable state; every operation is one POST round trip. Each
/// operation takes an optional timeout overriding [`ClientOptions::timeout`].
/// Dropping an operation's future cancels the request.
#[derive(Debug, Clone)]
pub struct McpClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    redirects: RedirectPolicy,
    timeout: Duration,
}

impl McpClient {
    /// Create a client for `endpoint`.
    pub fn new(endpoint: Endpoint, options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(build_info::user_agent())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Construction(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            redirects: RedirectPolicy::limited(options.max_redirects),
            timeout: options.timeout,
        })
    }

    /// The server this client talks to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&self, timeout: Option<Duration>) -> Result<InitializeResult> {
        let request = McpRequest::initialize(CLIENT_NAME, build_info::VERSION);
        let response = self.send(&request, timeout).await?;
        let raw = response.into_result().map_err(|e| Error::Protocol {
            code: e.code,
            message: e.message,
        })?;
        decode("initialize", &raw)
    }

    /// Fetch every tool the server advertises, in server order.
    pub async fn list_tools(&self, timeout: Option<Duration>) -> Result<Vec<McpTool>> {
        let response = self.send(&McpRequest::list_tools(), timeout).await?;
        let raw = response.into_result().map_err(|e| Error::Protocol {
            code: e.code,
            message: e.message,
        })?;
        let result: ListToolsResult = decode("tools/list", &raw)?;

        if let Some(cursor) = result.next_cursor {
            tracing::warn!(
                cursor = %cursor,
                tools = result.tools.len(),
                "server paginates tools/list; only the first page is used"
            );
        }

        Ok(result.tools)
    }

    /// Invoke a tool and return its result verbatim.
    ///
    /// `arguments` must be JSON text when given. A JSON-RPC error object in
    /// the response is part of the tool's answer and is returned as-is rather
    /// than raised.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Box<RawValue>> {
        let arguments = match arguments.filter(|a| !a.is_empty()) {
            Some(text) => Some(
                serde_json::from_str::<Value>(text)
                    .map_err(|e| Error::Construction(format!("invalid arguments JSON: {e}")))?,
            ),
            None => None,
        };

        let response = self
            .send(&McpRequest::call_tool(name, arguments), timeout)
            .await?;
        Ok(response.into_raw())
    }

    async fn send(&self, request: &McpRequest, timeout: Option<Duration>) -> Result<McpResponse> {
        let timeout = timeout.unwrap_or(self.timeout);
        match tokio::time::timeout(timeout, self.round_trip(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout).into()),
        }
    }

    async fn round_trip(&self, request: &McpRequest) -> Result<McpResponse> {
        let body = serde_json::to_vec(request)
            .map_err(|e| Error::Construction(format!("failed to serialize request: {e}")))?;
        let prepared = PreparedRequest {
            method: Method::POST,
            url: self.endpoint.url.clone(),
            headers: self.endpoint.request_headers(),
            body,
        };

        tracing::debug!(method = %request.method, id = request.id, url = %prepared.url, "sending MCP request");

        let response = self.redirects.send(&self.http, &prepared).await?;
        let status = response.status();
        if !status.is_success() {
            let body = read_snippet(response).await;
            return Err(TransportError::status(status, &body).into());
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let decoded = if is_json {
            read_json_body(response, request.id).await?
        } else {
            envelope::read_envelope(response.bytes_stream(), Some(request.id)).await?
        };

        tracing::debug!(id = ?decoded.id, ok = decoded.is_ok(), "received MCP response");
        Ok(decoded)
    }
}

/// Read an `application/json` body as a single envelope.
///
/// Bodies that are not one envelope fall back to line decoding, since some
/// servers label event streams as JSON.
async fn read_json_body(response: reqwest::Response, id: u64) -> Result<McpResponse> {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FramingError::NoResponse {
            source: Some(e.into()),
        })?;
        if body.len() + chunk.len() > MAX_LINE_BYTES {
            return Err(FramingError::LineTooLong {
                limit: MAX_LINE_BYTES,
            }
            .into());
        }
        body.extend_from_slice(&chunk);
    }

    match serde_json::from_slice::<McpResponse>(&body) {
        Ok(response) if envelope::is_reply_to(&response, Some(id)) => Ok(response),
        _ => Ok(envelope::decode_body(&body, Some(id))?),
    }
}

/// Read the start of an error body for diagnostics.
///
/// Stops after [`BODY_SNIPPET_LIMIT`] bytes; a read error ends the snippet.
async fn read_snippet(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    while body.len() < BODY_SNIPPET_LIMIT {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(BODY_SNIPPET_LIMIT - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Some(Err(e)) => {
                tracing::debug!(error = %e, "error body read failed");
                break;
            }
            None => break,
        }
    }

    String::from_utf8_lossy(&body).into_owned()
}

fn decode<T: DeserializeOwned>(operation: &'static str, raw: &RawValue) -> Result<T> {
    serde_json::from_str(raw.get()).map_err(|source| Error::Decode { operation, source })
}
