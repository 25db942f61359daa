use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode, header::LOCATION, redirect::Policy};
use url::Url;

use crate::{ConsentError, QueryParams};

/// Path the accept decision is posted to, relative to the consent page.
pub const ACCEPT_PATH: &str = "/accepted";

const MAX_REDIRECTS: usize = 10;

/// What the consent page can observe about the accept response.
///
/// Mirrors an opaque cross-origin fetch: only whether redirects were followed
/// and where the request ended up are visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub redirected: bool,
    pub url: String,
}

pub trait ConsentTransport: Send + Sync {
    /// POSTs `body` as JSON to `endpoint`, following redirects.
    fn submit(
        &self,
        endpoint: &Url,
        body: &QueryParams,
    ) -> impl Future<Output = Result<SubmitOutcome, ConsentError>> + Send;
}

/// Resolves [`ACCEPT_PATH`] against the consent page URL.
pub fn accept_endpoint(page_url: &str) -> Result<Url, ConsentError> {
    Ok(Url::parse(page_url)?.join(ACCEPT_PATH)?)
}

/// Transport backed by reqwest.
///
/// Redirects are followed here rather than by the client so the final URL
/// keeps the fragment of the last `Location`. Implicit grants deliver their
/// token in that fragment.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ConsentError> {
        Ok(Self {
            http: Client::builder().redirect(Policy::none()).build()?,
        })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ConsentError> {
        Ok(Self {
            http: Client::builder()
                .redirect(Policy::none())
                .timeout(timeout)
                .build()?,
        })
    }

    /// Uses a caller-built client. It should be built with
    /// `redirect::Policy::none()`, otherwise fragments set by redirects are lost.
    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        body: &QueryParams,
    ) -> Result<Response, ConsentError> {
        let mut target = url.clone();
        target.set_fragment(None);
        let request = self.http.request(method.clone(), target);
        let request = if *method == Method::POST {
            request.json(body)
        } else {
            request
        };
        Ok(request.send().await?)
    }
}

impl ConsentTransport for HttpTransport {
    async fn submit(
        &self,
        endpoint: &Url,
        body: &QueryParams,
    ) -> Result<SubmitOutcome, ConsentError> {
        let mut method = Method::POST;
        let mut url = endpoint.clone();

        for _ in 0..=MAX_REDIRECTS {
            let response = self.send(&method, &url, body).await?;
            // A client that follows redirects itself only reports where it landed.
            if !same_document(response.url(), &url) {
                url = response.url().clone();
            }

            let status = response.status();
            let location = response
                .headers()
                .get(LOCATION)
                .filter(|_| status.is_redirection())
                .and_then(|value| value.to_str().ok());
            let Some(location) = location else {
                tracing::debug!(%status, final_url = %url, "accept request finished");
                return Ok(SubmitOutcome {
                    redirected: url != *endpoint,
                    url: url.to_string(),
                });
            };

            let next = url.join(location)?;
            tracing::debug!(%status, from = %url, to = %next, "following redirect");
            if !matches!(
                status,
                StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
            ) {
                method = Method::GET;
            }
            url = next;
        }

        Err(ConsentError::TooManyRedirects {
            url: url.to_string(),
        })
    }
}

fn same_document(left: &Url, right: &Url) -> bool {
    left.as_str().split('#').next() == right.as_str().split('#').next()
}
