// src/handlers/catalog.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::catalog::{ExternalPartner, GroupCompany, NewPartner, StatusLabel, User},
};

// =============================================================================
//  EMPRESAS DO GRUPO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Alpha Tecnologia")]
    pub name: String,
}

// GET /api/catalog/companies
#[utoipa::path(
    get,
    path = "/api/catalog/companies",
    tag = "Catálogo",
    responses(
        (status = 200, description = "Empresas do grupo, na ordem do cadastro", body = Vec<GroupCompany>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_companies(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let catalog = app_state.catalog.get().await?;
    Ok((StatusCode::OK, Json(catalog.companies().to_vec())))
}

// POST /api/catalog/companies
#[utoipa::path(
    post,
    path = "/api/catalog/companies",
    tag = "Catálogo",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Empresa criada", body = GroupCompany),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let company = app_state.catalog.create_company(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

// =============================================================================
//  PARCEIROS EXTERNOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Parceiro Consultoria")]
    pub name: String,
    pub contact_name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

// GET /api/catalog/partners
#[utoipa::path(
    get,
    path = "/api/catalog/partners",
    tag = "Catálogo",
    responses((status = 200, description = "Parceiros externos", body = Vec<ExternalPartner>)),
    security(("api_jwt" = []))
)]
pub async fn list_partners(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let catalog = app_state.catalog.get().await?;
    Ok((StatusCode::OK, Json(catalog.partners().to_vec())))
}

// POST /api/catalog/partners
#[utoipa::path(
    post,
    path = "/api/catalog/partners",
    tag = "Catálogo",
    request_body = CreatePartnerPayload,
    responses(
        (status = 201, description = "Parceiro criado", body = ExternalPartner),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_partner(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePartnerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let partner = app_state
        .catalog
        .create_partner(&NewPartner {
            name: payload.name,
            contact_name: payload.contact_name,
            email: payload.email,
            phone: payload.phone,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

// =============================================================================
//  STATUS E USUÁRIOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Em negociação")]
    pub name: String,
    #[serde(default)]
    pub position: i32,
}

// GET /api/catalog/statuses
#[utoipa::path(
    get,
    path = "/api/catalog/statuses",
    tag = "Catálogo",
    responses((status = 200, description = "Status ordenados por posição", body = Vec<StatusLabel>)),
    security(("api_jwt" = []))
)]
pub async fn list_statuses(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let catalog = app_state.catalog.get().await?;
    Ok((StatusCode::OK, Json(catalog.statuses().to_vec())))
}

// POST /api/catalog/statuses
#[utoipa::path(
    post,
    path = "/api/catalog/statuses",
    tag = "Catálogo",
    request_body = CreateStatusPayload,
    responses(
        (status = 201, description = "Status criado", body = StatusLabel),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_status(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let status = app_state
        .catalog
        .create_status(&payload.name, payload.position)
        .await?;
    Ok((StatusCode::CREATED, Json(status)))
}

// GET /api/catalog/users
#[utoipa::path(
    get,
    path = "/api/catalog/users",
    tag = "Catálogo",
    responses((status = 200, description = "Usuários que podem ser responsáveis", body = Vec<User>)),
    security(("api_jwt" = []))
)]
pub async fn list_users(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let catalog = app_state.catalog.get().await?;
    Ok((StatusCode::OK, Json(catalog.users().to_vec())))
}

// POST /api/catalog/refresh
#[utoipa::path(
    post,
    path = "/api/catalog/refresh",
    tag = "Catálogo",
    responses(
        (status = 200, description = "Catálogo recarregado do banco"),
        (status = 502, description = "Falha ao ler o banco")
    ),
    security(("api_jwt" = []))
)]
pub async fn refresh_catalog(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let catalog = app_state.catalog.refresh().await?;

    Ok(Json(json!({
        "companies": catalog.companies().len(),
        "partners": catalog.partners().len(),
        "statuses": catalog.statuses().len(),
        "users": catalog.users().len(),
    })))
}
