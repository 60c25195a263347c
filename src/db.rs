use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::{ExternalPartner, GroupCompany, NewPartner, StatusLabel, User},
        opportunity::{
            Lead, LeadDraft, LeadPatch, NewOpportunity, Observation, OpportunityChanges,
            OpportunityRecord, OpportunityRow, OutgoingPartnerLink,
        },
        stats::{CompanyStatsRow, PartnerStatsRow},
    },
};

pub mod pg_store;
pub use pg_store::PgStore;

#[cfg(test)]
pub mod memory_store;
#[cfg(test)]
pub use memory_store::MemoryStore;

/// O banco remoto visto como coleções nomeadas com leitura e escrita simples.
/// Cada chamada é uma ida-e-volta independente: não há transação entre elas.
#[async_trait]
pub trait OpportunityStore: Send + Sync {
    // --- Dados de referência ---
    async fn list_companies(&self) -> Result<Vec<GroupCompany>, AppError>;
    async fn insert_company(&self, name: &str) -> Result<GroupCompany, AppError>;
    async fn list_partners(&self) -> Result<Vec<ExternalPartner>, AppError>;
    async fn insert_partner(&self, partner: &NewPartner) -> Result<ExternalPartner, AppError>;
    async fn list_statuses(&self) -> Result<Vec<StatusLabel>, AppError>;
    async fn insert_status(&self, name: &str, position: i32) -> Result<StatusLabel, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    // --- Leads ---
    async fn find_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;
    /// Primeiro lead com exatamente este nome de empresa.
    async fn find_lead_by_company(&self, company_name: &str) -> Result<Option<Lead>, AppError>;
    async fn list_leads(&self) -> Result<Vec<Lead>, AppError>;
    async fn insert_lead(&self, lead: &LeadDraft) -> Result<Lead, AppError>;
    async fn update_lead(&self, id: Uuid, patch: &LeadPatch) -> Result<(), AppError>;
    async fn delete_lead(&self, id: Uuid) -> Result<(), AppError>;

    // --- Oportunidades ---
    async fn list_opportunities(&self) -> Result<Vec<OpportunityRow>, AppError>;
    async fn find_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRow>, AppError>;
    async fn insert_opportunity(&self, opportunity: &NewOpportunity) -> Result<OpportunityRow, AppError>;
    async fn update_opportunity(&self, id: Uuid, changes: &OpportunityChanges) -> Result<(), AppError>;
    async fn delete_opportunity(&self, id: Uuid) -> Result<(), AppError>;

    // --- Parceiros de destino (junção) ---
    async fn list_partner_links(&self) -> Result<Vec<OutgoingPartnerLink>, AppError>;
    async fn partner_links_for(&self, opportunity_id: Uuid) -> Result<Vec<Uuid>, AppError>;
    async fn insert_partner_links(&self, opportunity_id: Uuid, partner_ids: &[Uuid]) -> Result<(), AppError>;
    async fn delete_partner_links(&self, opportunity_id: Uuid) -> Result<(), AppError>;

    // --- Observações ---
    async fn list_observations(&self, opportunity_id: Uuid) -> Result<Vec<Observation>, AppError>;
    async fn insert_observation(
        &self,
        opportunity_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Observation, AppError>;
    async fn delete_observations(&self, opportunity_id: Uuid) -> Result<(), AppError>;

    // --- Endpoints pré-agregados (Ok(None) quando não existem no servidor) ---
    async fn stats_by_company(&self) -> Result<Option<Vec<CompanyStatsRow>>, AppError>;
    async fn stats_by_partner(&self) -> Result<Option<Vec<PartnerStatsRow>>, AppError>;
}

/// Busca todas as oportunidades junto com os parceiros vinculados a cada uma.
pub async fn fetch_records(store: &dyn OpportunityStore) -> Result<Vec<OpportunityRecord>, AppError> {
    let rows = store.list_opportunities().await?;
    let links = store.list_partner_links().await?;

    let mut partners_by_opportunity: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in links {
        partners_by_opportunity
            .entry(link.opportunity_id)
            .or_default()
            .push(link.partner_id);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let partner_ids = partners_by_opportunity.remove(&row.id).unwrap_or_default();
            OpportunityRecord { row, partner_ids }
        })
        .collect())
}
