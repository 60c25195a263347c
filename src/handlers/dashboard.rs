// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    config::AppState,
    models::stats::{Aggregation, DashboardResponse, EntityStats},
    services::dashboard_service::DashboardService,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OverviewQuery {
    /// Ano usado nos agrupamentos por mês e trimestre (padrão: ano atual)
    pub year: Option<i32>,
}

// As rotas do dashboard sempre respondem 200: falha de leitura vem em `error`

// GET /api/dashboard/overview
#[utoipa::path(
    get,
    path = "/api/dashboard/overview",
    tag = "Dashboard",
    params(OverviewQuery),
    responses(
        (status = 200, description = "Agregação completa; `error` preenchido se a leitura falhou", body = DashboardResponse<Aggregation>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_overview(
    State(app_state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> impl IntoResponse {
    let year = query.year.unwrap_or_else(DashboardService::current_year);
    Json(app_state.dashboard_service.overview(year).await)
}

// GET /api/dashboard/companies
#[utoipa::path(
    get,
    path = "/api/dashboard/companies",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Enviadas, recebidas e saldo por empresa do grupo", body = DashboardResponse<Vec<EntityStats>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company_stats(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.dashboard_service.company_stats().await)
}

// GET /api/dashboard/partners
#[utoipa::path(
    get,
    path = "/api/dashboard/partners",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Enviadas, recebidas e saldo por parceiro externo", body = DashboardResponse<Vec<EntityStats>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_partner_stats(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(app_state.dashboard_service.partner_stats().await)
}
