// src/services/dashboard_service.rs

use std::sync::Arc;

use chrono::{Datelike, Utc};

use crate::{
    common::error::AppError,
    db::{self, OpportunityStore},
    models::stats::{Aggregation, DashboardResponse, EntityStats},
    services::{
        aggregation,
        catalog::{CatalogCache, EntityCatalog},
    },
};

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn OpportunityStore>,
    catalog: CatalogCache,
}

impl DashboardService {
    pub fn new(store: Arc<dyn OpportunityStore>, catalog: CatalogCache) -> Self {
        Self { store, catalog }
    }

    pub fn current_year() -> i32 {
        Utc::now().year()
    }

    // =========================================================================
    //  VISÃO GERAL
    // =========================================================================

    /// Agregação completa do ano. Falha de leitura não derruba o painel:
    /// devolve a agregação vazia com o erro ao lado.
    pub async fn overview(&self, year: i32) -> DashboardResponse<Aggregation> {
        match self.compute_overview(year).await {
            Ok(result) => DashboardResponse::ok(result),
            Err(e) => {
                tracing::error!("Falha ao montar o dashboard de {}: {}", year, e);
                let empty = aggregation::aggregate(&[], &EntityCatalog::default(), year);
                DashboardResponse::degraded(empty, e)
            }
        }
    }

    async fn compute_overview(&self, year: i32) -> Result<Aggregation, AppError> {
        let catalog = self.catalog.get().await?;
        let records = db::fetch_records(self.store.as_ref()).await?;
        Ok(aggregation::aggregate(&records, &catalog, year))
    }

    // =========================================================================
    //  ESTATÍSTICAS POR ENTIDADE
    // =========================================================================

    pub async fn company_stats(&self) -> DashboardResponse<Vec<EntityStats>> {
        match self.compute_company_stats().await {
            Ok(stats) => DashboardResponse::ok(stats),
            Err(e) => {
                tracing::error!("Falha ao carregar estatísticas por empresa: {}", e);
                DashboardResponse::degraded(Vec::new(), e)
            }
        }
    }

    pub async fn partner_stats(&self) -> DashboardResponse<Vec<EntityStats>> {
        match self.compute_partner_stats().await {
            Ok(stats) => DashboardResponse::ok(stats),
            Err(e) => {
                tracing::error!("Falha ao carregar estatísticas por parceiro: {}", e);
                DashboardResponse::degraded(Vec::new(), e)
            }
        }
    }

    async fn compute_company_stats(&self) -> Result<Vec<EntityStats>, AppError> {
        let catalog = self.catalog.get().await?;
        if let Some(rows) = self.store.stats_by_company().await? {
            return Ok(aggregation::company_stats_from_rows(&rows, &catalog));
        }

        tracing::warn!("Estatísticas por empresa indisponíveis no servidor; calculando localmente");
        Ok(self.aggregate_all(&catalog).await?.per_company)
    }

    async fn compute_partner_stats(&self) -> Result<Vec<EntityStats>, AppError> {
        let catalog = self.catalog.get().await?;
        if let Some(rows) = self.store.stats_by_partner().await? {
            return Ok(aggregation::partner_stats_from_rows(&rows, &catalog));
        }

        tracing::warn!("Estatísticas por parceiro indisponíveis no servidor; calculando localmente");
        Ok(self.aggregate_all(&catalog).await?.per_partner)
    }

    // Contagens por entidade não dependem do ano
    async fn aggregate_all(&self, catalog: &EntityCatalog) -> Result<Aggregation, AppError> {
        let records = db::fetch_records(self.store.as_ref()).await?;
        Ok(aggregation::aggregate(&records, catalog, Self::current_year()))
    }
}
