//! Accept and cancel handling for the consent screen.

use crate::redirect::{REDIRECT_URI_PARAM, access_denied_url, resolve_redirect_uri};
use crate::transport::accept_endpoint;
use crate::{
    ConsentError, ConsentTransport, QueryParams, RedirectField, parse_query,
    prefill_redirect_field,
};

/// Browser navigation used once a decision is made.
pub trait Navigator {
    /// Navigates to `url`, replacing the current history entry.
    fn replace(&mut self, url: &str);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    pub history: Vec<String>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&mut self, url: &str) {
        self.history.push(url.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    Accept,
    Cancel,
}

/// Posts the page's query parameters to the accept endpoint and follows the
/// server's redirect.
///
/// Returns the URL navigated to, or `None` when the server did not redirect.
pub async fn accept<T, N>(
    page_url: &str,
    transport: &T,
    navigator: &mut N,
) -> Result<Option<String>, ConsentError>
where
    T: ConsentTransport,
    N: Navigator,
{
    let params = parse_query(page_url)?;
    submit_decision(page_url, &params, transport, navigator).await
}

/// Sends the user back to `redirect_uri` with `error=access_denied`.
pub fn cancel<N: Navigator>(page_url: &str, navigator: &mut N) -> Result<String, ConsentError> {
    let params = parse_query(page_url)?;
    cancel_decision(&params, navigator)
}

async fn submit_decision<T, N>(
    page_url: &str,
    params: &QueryParams,
    transport: &T,
    navigator: &mut N,
) -> Result<Option<String>, ConsentError>
where
    T: ConsentTransport,
    N: Navigator,
{
    // The body keeps the raw value; the server resolves it the same way.
    resolve_redirect_uri(params.require(REDIRECT_URI_PARAM)?)?;
    let endpoint = accept_endpoint(page_url)?;

    tracing::debug!(%endpoint, params = params.len(), "submitting consent");
    let outcome = transport.submit(&endpoint, params).await?;

    if outcome.redirected {
        tracing::info!(target_url = %outcome.url, "consent accepted, following redirect");
        navigator.replace(&outcome.url);
        Ok(Some(outcome.url))
    } else {
        tracing::debug!(final_url = %outcome.url, "accept response was not redirected");
        Ok(None)
    }
}

fn cancel_decision<N: Navigator>(
    params: &QueryParams,
    navigator: &mut N,
) -> Result<String, ConsentError> {
    let redirect_uri = resolve_redirect_uri(params.require(REDIRECT_URI_PARAM)?)?;
    let target = access_denied_url(&redirect_uri)?;
    tracing::info!(target_url = %target, "consent cancelled");
    navigator.replace(&target);
    Ok(target)
}

/// State of one loaded consent page.
#[derive(Debug, Clone)]
pub struct ConsentScreen {
    page_url: String,
    params: QueryParams,
    redirect_field: RedirectField,
    error: Option<String>,
}

impl ConsentScreen {
    /// Loads the page at `page_url` and prefills the redirect field.
    ///
    /// A page without a query string loads as the implicit flow.
    pub fn load(page_url: impl Into<String>) -> Self {
        let page_url = page_url.into();
        let params = parse_query(&page_url).unwrap_or_else(|err| {
            tracing::debug!(%err, "consent page loaded without parameters");
            QueryParams::new()
        });
        let redirect_field = prefill_redirect_field(&params);
        tracing::debug!(flow = ?redirect_field.flow(), "consent page loaded");

        Self {
            page_url,
            params,
            redirect_field,
            error: None,
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    pub fn redirect_field(&self) -> &RedirectField {
        &self.redirect_field
    }

    /// Error shown to the user after a failed decision.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_redirect_uri(&mut self, value: impl Into<String>) {
        self.redirect_field.value = value.into();
    }

    pub async fn accept<T, N>(
        &mut self,
        transport: &T,
        navigator: &mut N,
    ) -> Result<Option<String>, ConsentError>
    where
        T: ConsentTransport,
        N: Navigator,
    {
        self.error = None;
        let params = self.decision_params();
        let result = submit_decision(&self.page_url, &params, transport, navigator).await;
        self.record(result)
    }

    pub fn cancel<N: Navigator>(&mut self, navigator: &mut N) -> Result<String, ConsentError> {
        self.error = None;
        let params = self.decision_params();
        let result = cancel_decision(&params, navigator);
        self.record(result)
    }

    pub async fn decide<T, N>(
        &mut self,
        decision: ConsentDecision,
        transport: &T,
        navigator: &mut N,
    ) -> Result<Option<String>, ConsentError>
    where
        T: ConsentTransport,
        N: Navigator,
    {
        match decision {
            ConsentDecision::Accept => self.accept(transport, navigator).await,
            ConsentDecision::Cancel => self.cancel(navigator).map(Some),
        }
    }

    // A revealed field takes precedence over whatever the URL carried.
    fn decision_params(&self) -> QueryParams {
        let mut params = self.params.clone();
        if let Some(uri) = self.redirect_field.entered_uri() {
            params.insert(REDIRECT_URI_PARAM, Some(uri.to_string()));
        }
        params
    }

    fn record<V>(&mut self, result: Result<V, ConsentError>) -> Result<V, ConsentError> {
        if let Err(err) = &result {
            tracing::warn!(%err, "consent decision failed");
            self.error = Some(err.to_string());
        }
        result
    }
}
