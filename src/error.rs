use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("too many redirects, last at {url}")]
    TooManyRedirects { url: String },

    #[error("page url has no query string: {url}")]
    MissingQuery { url: String },

    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("invalid redirect uri: {0}")]
    InvalidRedirectUri(String),

    #[error("unsupported response_type: {0}")]
    UnsupportedResponseType(String),

    #[error("copy to clipboard failed (clipboard={primary:?}, fallback={fallback})")]
    Clipboard {
        primary: Option<String>,
        fallback: String,
    },

    #[error("confirmation timer unavailable: {0}")]
    Timer(String),

    #[error("invalid config: {message}")]
    Config { message: String },
}
