use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use edms_service::ServiceConfig;

use crate::error::{ServerError, ServerResult};

/// Server settings, usually read from a TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Serve reads without a bearer token.
    pub allow_anonymous_read: bool,
    /// Name of the site directory created at startup.
    pub site_name: String,
    /// Short name of the site administrator created at startup.
    pub admin: String,
    /// Bearer token to person short name.
    pub tokens: BTreeMap<String, String>,
    /// Model created at startup, if any.
    pub seed: Option<SeedConfig>,
    pub service: ServiceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            allow_anonymous_read: false,
            site_name: "EDMS".into(),
            admin: "admin".into(),
            tokens: BTreeMap::new(),
            seed: None,
            service: ServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Person short name a token authenticates as.
    pub fn person_for_token(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }
}

/// A model and owning domain created with the site, with the administrator
/// as its only participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SeedConfig {
    pub model_name: String,
    pub model_short_name: String,
    pub domain_name: String,
    pub domain_short_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use edms_types::AccessRight;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:5000".parse::<SocketAddr>().unwrap());
        assert!(!c.allow_anonymous_read);
        assert_eq!(c.admin, "admin");
        assert!(c.tokens.is_empty());
        assert!(c.seed.is_none());
    }

    #[test]
    fn parses_toml() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"
            allow_anonymous_read = true
            admin = "root"

            [tokens]
            "s3cret" = "root"

            [seed]
            model_name = "Satellite"
            model_short_name = "SAT"
            domain_name = "Power"
            domain_short_name = "PWR"

            [service.gate]
            default_access_right = "READ_ONLY"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert!(c.allow_anonymous_read);
        assert_eq!(c.person_for_token("s3cret"), Some("root"));
        assert_eq!(c.person_for_token("other"), None);
        assert_eq!(c.seed.unwrap().model_short_name, "SAT");
        assert_eq!(c.service.gate.default_access_right, AccessRight::ReadOnly);
        assert_eq!(c.site_name, "EDMS");
    }

    #[test]
    fn rejects_bad_toml() {
        let err = ServerConfig::from_toml_str("bind_addr = 12").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edms.toml");
        std::fs::write(&path, "site_name = \"Lab\"\n").unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap().site_name, "Lab");
        assert!(ServerConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
