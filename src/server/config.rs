use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConsentError;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const PORT_ENV: &str = "PORT";

/// Client registered for the authorization code flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCodeConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Grant appended as `code` when the user accepts.
    pub auth_grant: String,
}

impl Default for AuthCodeConfig {
    fn default() -> Self {
        Self {
            client_id: "consent-code-client".to_string(),
            client_secret: "consent-code-secret".to_string(),
            auth_grant: "consent-code-grant".to_string(),
        }
    }
}

/// Client registered for the implicit flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitConfig {
    pub client_id: String,
}

impl Default for ImplicitConfig {
    fn default() -> Self {
        Self {
            client_id: "consent-implicit-client".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub auth_code: AuthCodeConfig,

    #[serde(default)]
    pub implicit: ImplicitConfig,

    /// Permissions listed on the consent page
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// `expires_in` of implicit-flow access tokens, in seconds
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,

    /// Script loaded by the consent and home pages to drive the DOM contract
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_src: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_scopes() -> Vec<String> {
    ["Fly to Mars", "Travel back in time", "Ride a dragon"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_token_lifetime() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth_code: AuthCodeConfig::default(),
            implicit: ImplicitConfig::default(),
            scopes: default_scopes(),
            token_lifetime_secs: default_token_lifetime(),
            script_src: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConsentError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`ServerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConsentError> {
        match Self::load(path.as_ref()) {
            Err(ConsentError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.as_ref().display(),
                    "config file not found, using defaults"
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Applies the `PORT` environment variable, if set.
    pub fn with_port_from_env(self) -> Result<Self, ConsentError> {
        match std::env::var(PORT_ENV) {
            Ok(port) => self.with_port_str(&port),
            Err(_) => Ok(self),
        }
    }

    fn with_port_str(mut self, port: &str) -> Result<Self, ConsentError> {
        self.port = port.trim().parse().map_err(|_| ConsentError::Config {
            message: format!("{PORT_ENV} is not a valid port: {port}"),
        })?;
        Ok(self)
    }

    pub fn with_auth_code(mut self, auth_code: AuthCodeConfig) -> Self {
        self.auth_code = auth_code;
        self
    }

    pub fn with_implicit(mut self, implicit: ImplicitConfig) -> Self {
        self.implicit = implicit;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_script_src(mut self, script_src: impl Into<String>) -> Self {
        self.script_src = Some(script_src.into());
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn home_url(&self) -> String {
        format!("http://{}/", self.addr())
    }

    fn validate(&self) -> Result<(), ConsentError> {
        if self.auth_code.client_id.trim().is_empty() || self.implicit.client_id.trim().is_empty() {
            return Err(ConsentError::Config {
                message: "client ids must not be empty".to_string(),
            });
        }
        if self.auth_code.auth_grant.trim().is_empty() {
            return Err(ConsentError::Config {
                message: "authGrant must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;
    use crate::ConsentError;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"port": 9000, "authCode": {"clientId": "app", "authGrant": "grant"}}"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.auth_code.client_id, "app");
        assert_eq!(config.auth_code.client_secret, "");
        assert_eq!(config.implicit.client_id, "consent-implicit-client");
        assert_eq!(config.scopes.len(), 3);
        assert_eq!(config.token_lifetime_secs, 3600);
        assert_eq!(config.addr(), "127.0.0.1:9000");
    }

    #[test]
    fn port_override_must_be_numeric() {
        let config = ServerConfig::default().with_port_str("5000").unwrap();
        assert_eq!(config.port, 5000);

        let result = ServerConfig::default().with_port_str("http");
        assert!(matches!(result, Err(ConsentError::Config { .. })));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = ServerConfig::load_or_default("/nonexistent/consent-screen.json").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn rejects_empty_grant() {
        let config = ServerConfig::default().with_auth_code(super::AuthCodeConfig {
            client_id: "app".to_string(),
            client_secret: String::new(),
            auth_grant: " ".to_string(),
        });
        assert!(matches!(config.validate(), Err(ConsentError::Config { .. })));
    }
}
