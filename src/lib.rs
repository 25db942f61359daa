//! OAuth 2.0 consent screen flow.
//!
//! Covers what happens on an "authorize this app" page: reading the page's
//! query parameters, submitting or cancelling the consent decision, prefilling
//! the redirect URI field, and copy-to-clipboard affordances. Browser
//! collaborators (navigation, network, clipboard, document) are traits so the
//! flow runs the same against a real page or a headless harness.
//!
//! The `server` feature adds the consent server those pages talk to.

mod clipboard;
mod confirmation;
mod consent;
mod error;
mod params;
mod redirect;
#[cfg(feature = "server")]
mod server;
mod transport;

pub use clipboard::{
    COPY_CLASS, ClipboardWriter, CopyMethod, CopyTarget, SelectionHost, copy_target, copy_text,
};
pub use confirmation::{
    CONFIRMATION_DELAY, COPIED_MESSAGE, COPY_FAILED_MESSAGE, Confirmation, Confirmations,
};
pub use consent::{
    ConsentDecision, ConsentScreen, Navigator, RecordingNavigator, accept, cancel,
};
pub use error::ConsentError;
pub use params::{QueryParams, parse_query};
pub use redirect::{
    ACCESS_DENIED, REDIRECT_URI_PARAM, RedirectField, RedirectFlow, access_denied_url,
    append_query_param, decode_redirect_uri, prefill_redirect_field, resolve_redirect_uri,
    validate_redirect_uri,
};
#[cfg(feature = "server")]
pub use server::{
    AuthCodeConfig, ConsentServer, DEFAULT_CONFIG_PATH, ImplicitConfig, PORT_ENV, ServerConfig,
};
pub use transport::{ACCEPT_PATH, ConsentTransport, HttpTransport, SubmitOutcome, accept_endpoint};
