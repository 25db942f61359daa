use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};

use crate::redirect::{REDIRECT_URI_PARAM, resolve_redirect_uri};
use crate::{ConsentError, ServerConfig};

use super::grant::{ResponseType, accepted_location};

pub(super) const CONSENT_HTML: &str = include_str!("html/consent.html");
pub(super) const HOME_HTML: &str = include_str!("html/home.html");
pub(super) const ERROR_HTML: &str = include_str!("html/error.html");

#[derive(Clone)]
pub(super) struct ServerState {
    pub(super) config: Arc<ServerConfig>,
}

/// Home page listing the registered clients as copyable values.
pub(super) async fn home_handler(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.config.addr());
    Html(render_home(&state.config, &format!("http://{host}/authorize")))
}

/// Validates the authorization request and presents the consent page.
pub(super) async fn authorize_handler(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (Some(response_type), Some(client_id)) = (
        non_empty(&params, "response_type"),
        non_empty(&params, "client_id"),
    ) else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            "response_type and client_id are required.",
        );
    };

    let Some(flow) = ResponseType::parse(response_type) else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "Bad Request",
            &format!("Unsupported response_type: {response_type}"),
        );
    };

    let expected_client_id = match flow {
        ResponseType::Code => state.config.auth_code.client_id.as_str(),
        ResponseType::Token => state.config.implicit.client_id.as_str(),
    };
    if client_id != expected_client_id {
        tracing::warn!(client_id, flow = flow.label(), "unknown client_id");
        return error_page(StatusCode::UNAUTHORIZED, "Unauthorized", "Invalid client_id");
    }

    tracing::debug!(client_id, flow = flow.label(), "presenting consent screen");
    Html(render_consent(&state.config, flow)).into_response()
}

/// Called by the consent page when the user accepts.
///
/// The page posts its query parameters verbatim, so values are decoded here.
pub(super) async fn accepted_handler(State(state): State<ServerState>, body: Bytes) -> Response {
    let raw: HashMap<String, String> = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(%err, "invalid accept body");
            return error_page(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                "Invalid JSON found in request body.",
            );
        }
    };

    let params = match decode_params(raw) {
        Ok(params) => params,
        Err(err) => {
            return error_page(StatusCode::BAD_REQUEST, "Bad Request", &err.to_string());
        }
    };

    match accepted_location(&state.config, &params) {
        Ok(location) => {
            tracing::info!(redirect_uri = ?params.get("redirect_uri"), "consent accepted");
            Redirect::to(&location).into_response()
        }
        Err(
            err @ (ConsentError::MissingParameter(_)
            | ConsentError::InvalidRedirectUri(_)
            | ConsentError::UnsupportedResponseType(_)),
        ) => error_page(StatusCode::BAD_REQUEST, "Bad Request", &err.to_string()),
        Err(err) => {
            tracing::error!(%err, "failed to complete consent");
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "Token generation failed. Please try again.",
            )
        }
    }
}

pub(super) async fn fallback_handler() -> Response {
    error_page(
        StatusCode::NOT_FOUND,
        "Not Found",
        "The page you requested does not exist.",
    )
}

fn non_empty<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn decode_params(raw: HashMap<String, String>) -> Result<HashMap<String, String>, ConsentError> {
    raw.into_iter()
        .map(|(key, value)| -> Result<(String, String), ConsentError> {
            if key == REDIRECT_URI_PARAM && !value.is_empty() {
                let redirect_uri = resolve_redirect_uri(&value)?;
                return Ok((key, redirect_uri));
            }
            let decoded = urlencoding::decode(&value).map_err(|err| {
                ConsentError::InvalidRedirectUri(format!("{key} is not valid utf-8: {err}"))
            })?;
            Ok((key, decoded.into_owned()))
        })
        .collect()
}

fn error_page(status: StatusCode, title: &str, description: &str) -> Response {
    let html = ERROR_HTML
        .replace("{{title}}", &escape_html(title))
        .replace("{{description}}", &escape_html(description));
    (status, Html(html)).into_response()
}

fn render_consent(config: &ServerConfig, flow: ResponseType) -> String {
    let scopes = config
        .scopes
        .iter()
        .map(|scope| format!("        <li>{}</li>", escape_html(scope)))
        .collect::<Vec<_>>()
        .join("\n");
    CONSENT_HTML
        .replace("{{flow}}", flow.label())
        .replace("{{scopes}}", &scopes)
        .replace("{{script}}", &script_tag(config))
}

fn render_home(config: &ServerConfig, authorize_url: &str) -> String {
    HOME_HTML
        .replace("{{authorize_url}}", &escape_html(authorize_url))
        .replace(
            "{{auth_code_client_id}}",
            &escape_html(&config.auth_code.client_id),
        )
        .replace(
            "{{auth_code_client_secret}}",
            &escape_html(&config.auth_code.client_secret),
        )
        .replace(
            "{{auth_code_grant}}",
            &escape_html(&config.auth_code.auth_grant),
        )
        .replace(
            "{{implicit_client_id}}",
            &escape_html(&config.implicit.client_id),
        )
        .replace("{{script}}", &script_tag(config))
}

fn script_tag(config: &ServerConfig) -> String {
    match &config.script_src {
        Some(src) => format!(
            r#"    <script type="module" src="{}"></script>"#,
            escape_html(src)
        ),
        None => String::new(),
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_page_lists_scopes_and_dom_contract() {
        let config = ServerConfig::default().with_scopes(vec!["Read <mail>".to_string()]);
        let html = render_consent(&config, ResponseType::Code);
        assert!(html.contains("<li>Read &lt;mail&gt;</li>"));
        for id in [r#"id="acceptBtn""#, r#"id="cancelBtn""#, r#"id="redirectURI""#] {
            assert!(html.contains(id), "missing {id}");
        }
        assert!(html.contains(r#"class="alert""#));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn home_page_marks_values_copyable() {
        let config = ServerConfig::default().with_script_src("/static/consent.js");
        let html = render_home(&config, "http://localhost:8080/authorize");
        assert!(html.contains(
            r#"<code class="copy" id="authCodeClientID">consent-code-client</code>"#
        ));
        assert!(html.contains(r#"<script type="module" src="/static/consent.js"></script>"#));
    }

    #[test]
    fn decodes_posted_values() {
        let raw = HashMap::from([(
            "redirect_uri".to_string(),
            "https%3A%2F%2Fexample.com%2Fcb".to_string(),
        )]);
        let params = decode_params(raw).unwrap();
        assert_eq!(params["redirect_uri"], "https://example.com/cb");
    }

    #[test]
    fn literal_redirect_uri_is_not_decoded_again() {
        let raw = HashMap::from([
            (
                "redirect_uri".to_string(),
                "https://example.com/cb?next=a%26b".to_string(),
            ),
            ("state".to_string(), "a%20b".to_string()),
        ]);
        let params = decode_params(raw).unwrap();
        assert_eq!(params["redirect_uri"], "https://example.com/cb?next=a%26b");
        assert_eq!(params["state"], "a b");
    }
}
