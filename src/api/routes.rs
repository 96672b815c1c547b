use crate::api::api_error::APIError;
use crate::api::model::{
    GenerateRequest, GenerateResult, HostnameList, HostnameQuery, NextSequence, ReserveRequest,
    TemplateList,
};
use crate::api::server::AppState;
use crate::dns::scanner::{ScanReport, ScanRequest};
use crate::dns::DnsCheck;
use crate::error::Error;
use crate::reservation::{self, Reservation};
use crate::template::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/api/templates", get(list_templates))
        .route("/api/templates/:id", get(get_template))
        .route("/api/hostnames", get(list_hostnames))
        .route("/api/hostnames/generate", post(generate))
        .route("/api/hostnames/reserve", post(reserve))
        .route("/api/hostnames/:id", get(get_hostname))
        .route("/api/sequences/next/:template_id", get(next_sequence))
        .route("/api/dns/check/:hostname", get(check_hostname))
        .route("/api/dns/scan", post(scan))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

#[allow(clippy::unused_async)]
async fn list_templates(State(state): State<AppState>) -> Json<TemplateList> {
    let templates = state.templates.list();
    Json(TemplateList {
        total: templates.len(),
        templates,
    })
}

#[allow(clippy::unused_async)]
async fn get_template(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<u64>, APIError>,
) -> Result<Json<Arc<Template>>, APIError> {
    Ok(Json(state.templates.get(id)?))
}

async fn generate(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<GenerateRequest>, APIError>,
) -> Result<Json<GenerateResult>, APIError> {
    let candidate = state
        .assembler
        .assemble(payload.template_id, &payload.params)?;

    let dns_check = if payload.check_dns {
        match state.checker.check(&candidate.hostname).await {
            Ok(check) => Some(check),
            Err(err) => {
                tracing::warn!("DNS check for \"{}\" failed: {err}", candidate.hostname);
                None
            }
        }
    } else {
        None
    };

    Ok(Json(GenerateResult {
        hostname: candidate.hostname,
        sequence_num: candidate.sequence_num,
        template_id: candidate.template_id,
        dns_check,
    }))
}

async fn reserve(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ReserveRequest>, APIError>,
) -> Result<(StatusCode, Json<Reservation>), APIError> {
    let reservation = reservation::reserve_hostname(
        &state.assembler,
        &state.reservations,
        payload.template_id,
        &payload.params,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn get_hostname(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<u64>, APIError>,
) -> Result<Json<Reservation>, APIError> {
    match state.reservations.read().await.get(id).await {
        Some(reservation) => Ok(Json(reservation)),
        None => Err(Error::NotFound(format!("hostname {id}")).into()),
    }
}

async fn list_hostnames(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<HostnameQuery>, APIError>,
) -> Json<HostnameList> {
    let hostnames = state.reservations.read().await.list(query.template_id).await;
    Json(HostnameList {
        total: hostnames.len(),
        hostnames,
    })
}

#[allow(clippy::unused_async)]
async fn next_sequence(
    State(state): State<AppState>,
    WithRejection(Path(template_id), _): WithRejection<Path<u64>, APIError>,
) -> Result<Json<NextSequence>, APIError> {
    let template = state.templates.get(template_id)?;
    if template.sequence_group().is_none() {
        return Err(Error::NotReservable(template_id).into());
    }
    Ok(Json(NextSequence {
        template_id,
        sequence_num: state.allocator.peek(template_id),
    }))
}

async fn check_hostname(
    State(state): State<AppState>,
    WithRejection(Path(hostname), _): WithRejection<Path<String>, APIError>,
) -> Result<Json<DnsCheck>, APIError> {
    Ok(Json(state.checker.check(&hostname).await?))
}

async fn scan(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<ScanRequest>, APIError>,
) -> Result<Json<ScanReport>, APIError> {
    // Dropping the handler (client gone, API timeout) cancels the scan's outstanding lookups.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    Ok(Json(state.scanner.scan(&payload, cancel).await?))
}
