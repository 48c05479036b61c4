use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use edms_service::EdmsService;
use edms_types::Iid;

use crate::error::{ServerError, ServerResult};

/// Who a request acts as. Anonymous identities carry no person.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub person: Option<Iid>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".into(),
            person: None,
        }
    }

    pub fn person(name: impl Into<String>, person: Iid) -> Self {
        Self {
            name: name.into(),
            person: Some(person),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.person.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read an `Authorization: Bearer ...` header.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ServerError::AuthFailed("malformed authorization header".into()))?;
        match value.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(Self::Bearer(token.trim().to_string())),
            _ => Err(ServerError::AuthFailed("expected a bearer token".into())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Read { partition: Iid },
    Write { partition: Iid },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { partition } => write!(f, "read:{partition}"),
            Self::Write { partition } => write!(f, "write:{partition}"),
        }
    }
}

/// Transport-level authentication. Object-level access is decided by the
/// service's access gate.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Static bearer tokens mapped to person short names.
///
/// Names are resolved against the site directory on every request, so
/// persons created or deactivated after startup are picked up.
pub struct TokenAuth {
    tokens: BTreeMap<String, String>,
    service: Arc<EdmsService>,
    allow_anonymous_read: bool,
}

impl TokenAuth {
    pub fn new(
        tokens: BTreeMap<String, String>,
        service: Arc<EdmsService>,
        allow_anonymous_read: bool,
    ) -> Self {
        Self {
            tokens,
            service,
            allow_anonymous_read,
        }
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Anonymous => Ok(Identity::anonymous()),
            Credentials::Bearer(token) => {
                let name = self
                    .tokens
                    .get(token)
                    .ok_or_else(|| ServerError::AuthFailed("unknown token".into()))?;
                let person = self
                    .service
                    .person_by_short_name(name)?
                    .ok_or_else(|| ServerError::AuthFailed(format!("no active person {name}")))?;
                Ok(Identity::person(name.clone(), person))
            }
        }
    }

    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool> {
        Ok(match action {
            Action::Read { .. } => !identity.is_anonymous() || self.allow_anonymous_read,
            Action::Write { .. } => !identity.is_anonymous(),
        })
    }
}
