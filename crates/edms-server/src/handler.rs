use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use edms_service::{
    EdmsService, Extent, ReadOptions, ReadResponse, RevisionSelector, ServiceError, WriteRequest,
    WriteResponse,
};
use edms_types::Iid;

use crate::auth::{Action, AuthProvider, Credentials, Identity};
use crate::error::{ServerError, ServerResult};

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EdmsService>,
    pub auth: Arc<dyn AuthProvider>,
}

/// Query parameters of a read.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadQuery {
    #[serde(default)]
    pub include_all_containers: bool,
    #[serde(default)]
    pub extent: Extent,
    #[serde(default)]
    pub include_file_data: bool,
    pub revision_from: Option<String>,
    pub revision_to: Option<String>,
}

impl ReadQuery {
    pub fn options(&self) -> ServerResult<ReadOptions> {
        let selector = |raw: &Option<String>| {
            raw.as_deref().map(RevisionSelector::from_str).transpose()
        };
        Ok(ReadOptions {
            include_all_containers: self.include_all_containers,
            extent: self.extent,
            include_file_data: self.include_file_data,
            revision_from: selector(&self.revision_from)?,
            revision_to: selector(&self.revision_to)?,
        })
    }
}

fn parse_iid(raw: &str) -> ServerResult<Iid> {
    raw.parse::<Iid>()
        .map_err(|_| ServerError::from(ServiceError::Validation(format!("invalid iid '{raw}'"))))
}

async fn identify(state: &AppState, headers: &HeaderMap, action: Action) -> ServerResult<Identity> {
    let credentials = Credentials::from_headers(headers)?;
    let identity = state.auth.authenticate(&credentials).await?;
    if !state.auth.authorize(&identity, &action).await? {
        return Err(ServerError::AuthorizationDenied(action.to_string()));
    }
    Ok(identity)
}

/// Run a service call off the async executor; it holds partition locks.
async fn blocking<T, F>(service: &Arc<EdmsService>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&EdmsService) -> Result<T, ServiceError> + Send + 'static,
{
    let service = Arc::clone(service);
    let result = tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(result?)
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler: server version and the partitions it hosts.
pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    Ok(Json(json!({
        "name": "edms-server",
        "version": env!("CARGO_PKG_VERSION"),
        "siteDirectory": state.service.site_directory_iid()?,
        "models": state.service.model_ids()?,
    })))
}

/// `POST /v1/{partition}`: apply one write request.
pub async fn write_handler(
    State(state): State<AppState>,
    Path(partition): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<WriteResponse>> {
    let partition = parse_iid(&partition)?;
    let identity = identify(&state, &headers, Action::Write { partition }).await?;
    let person = identity
        .person
        .ok_or_else(|| ServerError::AuthorizationDenied(format!("write:{partition}")))?;
    let request: WriteRequest = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::Validation(format!("malformed write request: {e}")))?;
    let response = blocking(&state.service, move |service| {
        service.write(&person, &partition, request)
    })
    .await?;
    Ok(Json(response))
}

/// `GET /v1/{partition}/{iid}`: read a Thing, its history or its file data.
pub async fn read_handler(
    State(state): State<AppState>,
    Path((partition, iid)): Path<(String, String)>,
    query: Result<Query<ReadQuery>, QueryRejection>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let partition = parse_iid(&partition)?;
    let iid = parse_iid(&iid)?;
    let Query(query) = query.map_err(|e| ServiceError::Validation(e.body_text()))?;
    let options = query.options()?;
    let identity = identify(&state, &headers, Action::Read { partition }).await?;

    let response = blocking(&state.service, move |service| {
        service.read(identity.person.as_ref(), &partition, &iid, &options)
    })
    .await?;
    Ok(match response {
        ReadResponse::Things(things) => Json(things).into_response(),
        ReadResponse::FileData(data) => {
            ([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response()
        }
        ReadResponse::Archive(data) => {
            ([(header::CONTENT_TYPE, "application/zip")], data).into_response()
        }
    })
}
