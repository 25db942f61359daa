use url::Url;

use crate::{ConsentError, QueryParams};

pub const REDIRECT_URI_PARAM: &str = "redirect_uri";
pub const ACCESS_DENIED: &str = "access_denied";

/// How the consent page learned where to send the user afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectFlow {
    /// `redirect_uri` came with the page URL; the field stays hidden.
    Explicit,
    /// No `redirect_uri` was supplied; the field is revealed for manual entry.
    Implicit,
}

/// State of the `redirectURI` form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectField {
    pub value: String,
    pub hidden: bool,
}

impl RedirectField {
    pub fn flow(&self) -> RedirectFlow {
        if self.hidden {
            RedirectFlow::Explicit
        } else {
            RedirectFlow::Implicit
        }
    }

    /// Value typed into a revealed field, if any.
    pub fn entered_uri(&self) -> Option<&str> {
        match self.flow() {
            RedirectFlow::Implicit if !self.value.is_empty() => Some(self.value.as_str()),
            _ => None,
        }
    }
}

/// An empty `redirect_uri` is treated as absent so the field is revealed.
pub fn prefill_redirect_field(params: &QueryParams) -> RedirectField {
    match params.get(REDIRECT_URI_PARAM).filter(|uri| !uri.is_empty()) {
        Some(uri) => RedirectField {
            value: uri.to_string(),
            hidden: true,
        },
        None => RedirectField {
            value: String::new(),
            hidden: false,
        },
    }
}

/// Checks that `uri` is an absolute http(s) URL with a host and no fragment.
pub fn validate_redirect_uri(uri: &str) -> Result<Url, ConsentError> {
    let url = Url::parse(uri)
        .map_err(|err| ConsentError::InvalidRedirectUri(format!("{uri}: {err}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConsentError::InvalidRedirectUri(format!(
            "{uri}: scheme must be http or https"
        )));
    }
    if url.host_str().is_none() {
        return Err(ConsentError::InvalidRedirectUri(format!(
            "{uri}: missing host"
        )));
    }
    if url.fragment().is_some() {
        return Err(ConsentError::InvalidRedirectUri(format!(
            "{uri}: must not contain a fragment"
        )));
    }

    Ok(url)
}

/// Decodes a `redirect_uri` taken verbatim from a query string.
pub fn decode_redirect_uri(raw: &str) -> Result<String, ConsentError> {
    urlencoding::decode(raw)
        .map(|uri| uri.into_owned())
        .map_err(|err| ConsentError::InvalidRedirectUri(format!("{raw}: {err}")))
}

/// Returns the redirect URI to use for `raw`.
///
/// A value that is already a valid redirect URI is kept literally, escapes
/// included. Anything else is percent-decoded once and must then validate.
pub fn resolve_redirect_uri(raw: &str) -> Result<String, ConsentError> {
    if validate_redirect_uri(raw).is_ok() {
        return Ok(raw.to_string());
    }
    let decoded = decode_redirect_uri(raw)?;
    validate_redirect_uri(&decoded)?;
    Ok(decoded)
}

/// Appends `key=value` to `uri` as given, without re-encoding it.
pub fn append_query_param(uri: &str, key: &str, value: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{uri}{separator}{key}={value}")
}

/// Where a cancelled consent sends the user.
pub fn access_denied_url(redirect_uri: &str) -> Result<String, ConsentError> {
    validate_redirect_uri(redirect_uri)?;
    Ok(append_query_param(redirect_uri, "error", ACCESS_DENIED))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefill_explicit_flow() {
        let params = QueryParams::parse("redirect_uri=https://example.com/cb&state=xyz");
        let field = prefill_redirect_field(&params);
        assert_eq!(field.value, "https://example.com/cb");
        assert!(field.hidden);
        assert_eq!(field.flow(), RedirectFlow::Explicit);
        assert_eq!(field.entered_uri(), None);
    }

    #[test]
    fn prefill_implicit_flow_reveals_empty_field() {
        let params = QueryParams::parse("response_type=token&client_id=abc");
        let field = prefill_redirect_field(&params);
        assert_eq!(field.value, "");
        assert!(!field.hidden);
        assert_eq!(field.flow(), RedirectFlow::Implicit);
    }

    #[test]
    fn prefill_treats_empty_redirect_uri_as_absent() {
        let params = QueryParams::parse("redirect_uri=&state=xyz");
        let field = prefill_redirect_field(&params);
        assert!(!field.hidden);
        assert_eq!(field.flow(), RedirectFlow::Implicit);
    }

    #[test]
    fn resolve_keeps_literal_escapes() {
        assert_eq!(
            resolve_redirect_uri("https://example.com/cb?next=a%26b").unwrap(),
            "https://example.com/cb?next=a%26b"
        );
        assert_eq!(
            resolve_redirect_uri("https%3A%2F%2Fexample.com%2Fcb").unwrap(),
            "https://example.com/cb"
        );
        assert!(matches!(
            resolve_redirect_uri("javascript%3Aalert(1)"),
            Err(ConsentError::InvalidRedirectUri(_))
        ));
    }

    #[test]
    fn access_denied_url_appends_error() {
        assert_eq!(
            access_denied_url("https://example.com/cb").unwrap(),
            "https://example.com/cb?error=access_denied"
        );
        assert_eq!(
            access_denied_url("https://example.com/cb?tenant=1").unwrap(),
            "https://example.com/cb?tenant=1&error=access_denied"
        );
    }

    #[test]
    fn decodes_percent_encoded_redirect_uri() {
        let uri = decode_redirect_uri("https%3A%2F%2Fexample.com%2Fcb").unwrap();
        assert_eq!(uri, "https://example.com/cb");
        assert_eq!(
            decode_redirect_uri("https://example.com/cb").unwrap(),
            "https://example.com/cb"
        );
    }

    #[test]
    fn rejects_relative_and_non_http_uris() {
        for uri in [
            "undefined",
            "/cb",
            "javascript:alert(1)",
            "https%3A%2F%2Fexample.com%2Fcb",
            "https://example.com/cb#frag",
        ] {
            assert!(
                matches!(
                    validate_redirect_uri(uri),
                    Err(ConsentError::InvalidRedirectUri(_))
                ),
                "{uri} should be rejected"
            );
        }
    }
}
