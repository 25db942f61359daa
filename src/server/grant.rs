use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::redirect::{REDIRECT_URI_PARAM, append_query_param, validate_redirect_uri};
use crate::{ConsentError, ServerConfig};

const NONCE_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ResponseType {
    Code,
    Token,
}

impl ResponseType {
    pub(super) fn parse(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "token" => Some(Self::Token),
            _ => None,
        }
    }

    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Code => "Authorization Code",
            Self::Token => "Implicit",
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct ImplicitToken {
    pub(super) access_token: String,
    pub(super) expires_in: u64,
}

impl ImplicitToken {
    /// Hash of a random nonce and the creation time. Tokens are not stored.
    pub(super) fn generate(expires_in: u64) -> Result<Self, ConsentError> {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|err| ConsentError::OsRng {
                message: err.to_string(),
            })?;
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(created.to_be_bytes());
        Ok(Self {
            access_token: URL_SAFE_NO_PAD.encode(hasher.finalize()),
            expires_in,
        })
    }
}

/// Builds the `Location` an accepted consent is redirected to.
///
/// `params` holds the decoded consent page parameters. A missing
/// `response_type` is treated as the authorization code flow.
pub(super) fn accepted_location(
    config: &ServerConfig,
    params: &HashMap<String, String>,
) -> Result<String, ConsentError> {
    let redirect_uri = params
        .get(REDIRECT_URI_PARAM)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| ConsentError::MissingParameter(REDIRECT_URI_PARAM.to_string()))?;
    validate_redirect_uri(redirect_uri)?;

    let response_type = match params.get("response_type").map(String::as_str) {
        None | Some("") => ResponseType::Code,
        Some(value) => ResponseType::parse(value)
            .ok_or_else(|| ConsentError::UnsupportedResponseType(value.to_string()))?,
    };
    let state = params.get("state").filter(|state| !state.is_empty());

    let location = match response_type {
        ResponseType::Code => {
            let location = append_query_param(redirect_uri, "code", &config.auth_code.auth_grant);
            match state {
                Some(state) => append_query_param(&location, "state", &urlencoding::encode(state)),
                None => location,
            }
        }
        ResponseType::Token => {
            let token = ImplicitToken::generate(config.token_lifetime_secs)?;
            let mut location = format!(
                "{redirect_uri}#access_token={}&token_type=bearer&expires_in={}",
                token.access_token, token.expires_in
            );
            if let Some(state) = state {
                location.push_str("&state=");
                location.push_str(&urlencoding::encode(state));
            }
            location
        }
    };

    Ok(location)
}
