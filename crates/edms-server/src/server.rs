use std::sync::Arc;

use tokio::net::TcpListener;

use edms_model::{DomainOfExpertise, Thing};
use edms_service::{Bootstrap, EdmsService, ModelHandle, WriteRequest};
use edms_types::{Iid, RevisionNumber};

use crate::auth::TokenAuth;
use crate::config::{SeedConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// The model created from [`SeedConfig`] and its owning domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeededModel {
    pub handle: ModelHandle,
    pub domain: Iid,
}

/// EDMS HTTP server: one in-process store behind the REST API.
pub struct EdmsServer {
    config: ServerConfig,
    site: Bootstrap,
    seeded: Option<SeededModel>,
    state: AppState,
}

impl EdmsServer {
    /// Create the store, its site directory and the optional seed model.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let service = Arc::new(EdmsService::new(config.service.clone())?);
        let site = service.bootstrap(&config.site_name, &config.admin)?;
        let seeded = match &config.seed {
            Some(seed) => Some(seed_model(&service, &site, seed)?),
            None => None,
        };
        tracing::info!(
            site_directory = %site.site_directory,
            admin = %config.admin,
            seeded = seeded.is_some(),
            "store initialized"
        );
        let auth = Arc::new(TokenAuth::new(
            config.tokens.clone(),
            Arc::clone(&service),
            config.allow_anonymous_read,
        ));
        Ok(Self {
            config,
            site,
            seeded,
            state: AppState { service, auth },
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn site(&self) -> &Bootstrap {
        &self.site
    }

    pub fn seeded(&self) -> Option<&SeededModel> {
        self.seeded.as_ref()
    }

    pub fn service(&self) -> &Arc<EdmsService> {
        &self.state.service
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("EDMS server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

fn seed_model(service: &EdmsService, site: &Bootstrap, seed: &SeedConfig) -> ServerResult<SeededModel> {
    let domain = Iid::new();
    let request = WriteRequest::new().create(
        site.site_directory,
        Thing::DomainOfExpertise(DomainOfExpertise {
            iid: domain,
            revision_number: RevisionNumber::ZERO,
            excluded_domain: Vec::new(),
            excluded_person: Vec::new(),
            name: seed.domain_name.clone(),
            short_name: seed.domain_short_name.clone(),
        }),
    );
    service.write(&site.admin, &site.site_directory, request)?;
    let handle = service.create_model(
        &site.admin,
        &seed.model_name,
        &seed.model_short_name,
        vec![domain],
    )?;
    Ok(SeededModel { handle, domain })
}
