// src/handlers/opportunities.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::opportunity::{
        Observation, OpportunityDetail, OpportunityDraft, OpportunityFilter, OpportunityListing,
        OpportunityPatch,
    },
};

// =============================================================================
//  CONSULTAS
// =============================================================================

// GET /api/opportunities
#[utoipa::path(
    get,
    path = "/api/opportunities",
    tag = "Oportunidades",
    params(
        ("category" = Option<String>, Query, description = "intragroup | incoming-external | outgoing-external"),
        ("statusId" = Option<Uuid>, Query, description = "Filtra pelo status"),
        ("year" = Option<i32>, Query, description = "Ano da data de envio")
    ),
    responses(
        (status = 200, description = "Oportunidades classificadas e registros inconsistentes; `error` preenchido se a leitura falhou", body = OpportunityListing)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_opportunities(
    State(app_state): State<AppState>,
    Query(filter): Query<OpportunityFilter>,
) -> impl IntoResponse {
    let listing = app_state.opportunity_service.list_opportunities(&filter).await;
    (StatusCode::OK, Json(listing))
}

// GET /api/opportunities/{id}
#[utoipa::path(
    get,
    path = "/api/opportunities/{id}",
    tag = "Oportunidades",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 200, description = "Detalhe com lead, classificação e observações", body = OpportunityDetail),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_opportunity(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.opportunity_service.get_opportunity(id).await?;
    Ok((StatusCode::OK, Json(detail)))
}

// =============================================================================
//  MUTAÇÕES
// =============================================================================

// POST /api/opportunities
#[utoipa::path(
    post,
    path = "/api/opportunities",
    tag = "Oportunidades",
    request_body = OpportunityDraft,
    responses(
        (status = 201, description = "Oportunidade criada"),
        (status = 400, description = "Dados inválidos"),
        (status = 422, description = "Roteamento inconsistente com o catálogo"),
        (status = 500, description = "Criação interrompida no meio (ver etapas e compensação)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_opportunity(
    State(app_state): State<AppState>,
    Json(payload): Json<OpportunityDraft>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = app_state.opportunity_service.create_opportunity(&payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

// PUT /api/opportunities/{id}
#[utoipa::path(
    put,
    path = "/api/opportunities/{id}",
    tag = "Oportunidades",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = OpportunityPatch,
    responses(
        (status = 200, description = "Oportunidade atualizada", body = OpportunityDetail),
        (status = 404, description = "Oportunidade não encontrada"),
        (status = 422, description = "Roteamento inconsistente com o catálogo"),
        (status = 500, description = "Atualização interrompida no meio")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_opportunity(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OpportunityPatch>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state.opportunity_service.update_opportunity(id, &payload).await?;
    let detail = app_state.opportunity_service.get_opportunity(id).await?;
    Ok((StatusCode::OK, Json(detail)))
}

// DELETE /api/opportunities/{id}
#[utoipa::path(
    delete,
    path = "/api/opportunities/{id}",
    tag = "Oportunidades",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 204, description = "Oportunidade removida (o lead é mantido)"),
        (status = 404, description = "Oportunidade não encontrada"),
        (status = 500, description = "Exclusão interrompida; repetir a chamada conclui")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_opportunity(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.opportunity_service.delete_opportunity(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  OBSERVAÇÕES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateObservationPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Cliente pediu nova proposta para o T3")]
    pub body: String,
}

// GET /api/opportunities/{id}/observations
#[utoipa::path(
    get,
    path = "/api/opportunities/{id}/observations",
    tag = "Oportunidades",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 200, description = "Observações em ordem de criação", body = Vec<Observation>),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_observations(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let observations = app_state.opportunity_service.list_observations(id).await?;
    Ok((StatusCode::OK, Json(observations)))
}

// POST /api/opportunities/{id}/observations
#[utoipa::path(
    post,
    path = "/api/opportunities/{id}/observations",
    tag = "Oportunidades",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = CreateObservationPayload,
    responses(
        (status = 201, description = "Observação registrada", body = Observation),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_observation(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateObservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let observation = app_state
        .opportunity_service
        .add_observation(id, user.0.id, &payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(observation)))
}
