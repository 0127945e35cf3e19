//! Redirect following that keeps the original request intact.
//!
//! HTTP clients usually turn a redirected POST into a body-less GET, which
//! would silently drop a tool call. The HTTP client is built with redirects
//! disabled and every hop is re-issued here with the original method, headers
//! and body.

use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::{Method, StatusCode, Url};

use super::error::TransportError;

/// Default cap on followed redirects.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// A fully materialised request that can be sent any number of times.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Decides whether and where to follow a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    max_redirects: usize,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::limited(DEFAULT_MAX_REDIRECTS)
    }
}

impl RedirectPolicy {
    /// Follow at most `max_redirects` hops.
    #[must_use]
    pub const fn limited(max_redirects: usize) -> Self {
        Self { max_redirects }
    }

    /// Maximum number of hops followed.
    #[must_use]
    pub const fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Target of the next hop, or `None` if `status` is not a redirect.
    ///
    /// `followed` is the number of hops already taken.
    pub fn next_hop(
        &self,
        status: StatusCode,
        location: Option<&HeaderValue>,
        current: &Url,
        followed: usize,
    ) -> Result<Option<Url>, TransportError> {
        if !is_followable(status) {
            return Ok(None);
        }

        if followed >= self.max_redirects {
            return Err(TransportError::TooManyRedirects {
                max: self.max_redirects,
            });
        }

        let Some(location) = location else {
            return Err(TransportError::InvalidRedirect {
                location: String::new(),
            });
        };
        let location = location
            .to_str()
            .map_err(|_| TransportError::InvalidRedirect {
                location: String::from_utf8_lossy(location.as_bytes()).into_owned(),
            })?;

        current
            .join(location)
            .map(Some)
            .map_err(|_| TransportError::InvalidRedirect {
                location: location.to_string(),
            })
    }

    /// Send `request`, re-issuing it unchanged to every redirect target.
    ///
    /// `http` must have automatic redirects disabled.
    pub async fn send(
        &self,
        http: &reqwest::Client,
        request: &PreparedRequest,
    ) -> Result<reqwest::Response, TransportError> {
        let mut url = request.url.clone();
        let mut followed = 0;

        loop {
            let response = http
                .request(request.method.clone(), url.clone())
                .headers(request.headers.clone())
                .body(request.body.clone())
                .send()
                .await?;

            let status = response.status();
            let Some(next) =
                self.next_hop(status, response.headers().get(LOCATION), &url, followed)?
            else {
                return Ok(response);
            };

            tracing::debug!(%status, from = %url, to = %next, hop = followed + 1, "following redirect");
            url = next;
            followed += 1;
        }
    }
}

const fn is_followable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn non_redirects_are_not_followed() {
        let policy = RedirectPolicy::default();
        let current = url("https://a.example/mcp");
        for status in [StatusCode::OK, StatusCode::NOT_MODIFIED, StatusCode::BAD_REQUEST] {
            assert_eq!(policy.next_hop(status, None, &current, 0).unwrap(), None);
        }
    }

    #[test]
    fn resolves_relative_and_absolute_locations() {
        let policy = RedirectPolicy::default();
        let current = url("https://a.example/mcp/");

        let relative = HeaderValue::from_static("../v2/mcp");
        let next = policy
            .next_hop(StatusCode::FOUND, Some(&relative), &current, 0)
            .unwrap();
        assert_eq!(next, Some(url("https://a.example/v2/mcp")));

        let absolute = HeaderValue::from_static("https://b.example/mcp");
        let next = policy
            .next_hop(StatusCode::SEE_OTHER, Some(&absolute), &current, 3)
            .unwrap();
        assert_eq!(next, Some(url("https://b.example/mcp")));
    }

    #[test]
    fn caps_the_number_of_hops() {
        let policy = RedirectPolicy::default();
        let current = url("https://a.example/mcp");
        let location = HeaderValue::from_static("/next");

        assert!(
            policy
                .next_hop(StatusCode::TEMPORARY_REDIRECT, Some(&location), &current, 9)
                .unwrap()
                .is_some()
        );

        let err = policy
            .next_hop(StatusCode::TEMPORARY_REDIRECT, Some(&location), &current, 10)
            .unwrap_err();
        assert!(matches!(err, TransportError::TooManyRedirects { max: 10 }));
    }

    #[test]
    fn zero_limit_refuses_every_redirect() {
        let policy = RedirectPolicy::limited(0);
        let location = HeaderValue::from_static("/next");
        let err = policy
            .next_hop(
                StatusCode::MOVED_PERMANENTLY,
                Some(&location),
                &url("http://a.example/"),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, TransportError::TooManyRedirects { max: 0 }));
    }

    #[test]
    fn missing_location_is_an_error() {
        let err = RedirectPolicy::default()
            .next_hop(StatusCode::FOUND, None, &url("http://a.example/"), 0)
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidRedirect { .. }));
    }
}
