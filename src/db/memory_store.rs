// src/db/memory_store.rs

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::{AppError, StoreError},
    db::OpportunityStore,
    models::{
        catalog::{ExternalPartner, GroupCompany, NewPartner, StatusLabel, User},
        opportunity::{
            Lead, LeadDraft, LeadPatch, NewOpportunity, Observation, OpportunityChanges,
            OpportunityRow, OutgoingPartnerLink,
        },
        stats::{CompanyStatsRow, PartnerStatsRow},
    },
};

// Mesma semântica do COALESCE do PgStore: None mantém o valor atual
fn patch_lead(lead: &mut Lead, patch: &LeadPatch) {
    if let Some(name) = &patch.company_name {
        lead.company_name = name.clone();
    }
    if let Some(contact) = &patch.contact_name {
        lead.contact_name = Some(contact.clone());
    }
    if let Some(email) = &patch.email {
        lead.email = Some(email.clone());
    }
    if let Some(phone) = &patch.phone {
        lead.phone = Some(phone.clone());
    }
}

fn patch_opportunity(row: &mut OpportunityRow, changes: &OpportunityChanges) {
    if let Some(routing) = changes.routing {
        row.category = routing.category;
        row.origin_company_id = routing.origin_company_id;
        row.destination_company_id = routing.destination_company_id;
        row.origin_partner_id = routing.origin_partner_id;
    }
    if let Some(sent_at) = changes.sent_at {
        row.sent_at = sent_at;
    }
    if let Some(user_id) = changes.responsible_user_id {
        row.responsible_user_id = user_id;
    }
    if let Some(status_id) = changes.status_id {
        row.status_id = status_id;
    }
    if let Some(details) = &changes.details {
        row.details = details.clone();
    }
}

#[derive(Default)]
struct Tables {
    companies: Vec<GroupCompany>,
    partners: Vec<ExternalPartner>,
    statuses: Vec<StatusLabel>,
    users: Vec<User>,
    leads: Vec<Lead>,
    opportunities: Vec<OpportunityRow>,
    links: Vec<OutgoingPartnerLink>,
    observations: Vec<Observation>,
    // Linhas das views de estatística; None = o servidor não as expõe
    company_stats: Option<Vec<CompanyStatsRow>>,
    partner_stats: Option<Vec<PartnerStatsRow>>,
}

/// Armazenamento em memória para os testes. Os endpoints pré-agregados só
/// existem depois de `publish_stats`; antes disso o dashboard calcula localmente.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    // Operações (nome do método do trait) que devem falhar como se o servidor caísse
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation);
        }
    }

    pub fn recover(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(operation);
        }
    }

    fn check(&self, operation: &'static str) -> Result<(), AppError> {
        let failing = self
            .failing
            .lock()
            .map(|f| f.contains(operation))
            .unwrap_or(false);
        if failing {
            return Err(StoreError::Unavailable(operation.to_string()).into());
        }
        Ok(())
    }

    pub async fn insert_user(&self, name: &str, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.tables.write().await.users.push(user.clone());
        user
    }

    pub async fn publish_stats(&self, companies: Vec<CompanyStatsRow>, partners: Vec<PartnerStatsRow>) {
        let mut tables = self.tables.write().await;
        tables.company_stats = Some(companies);
        tables.partner_stats = Some(partners);
    }

    pub async fn leads_named(&self, company_name: &str) -> usize {
        self.tables
            .read()
            .await
            .leads
            .iter()
            .filter(|l| l.company_name == company_name)
            .count()
    }

    pub async fn opportunity_count(&self) -> usize {
        self.tables.read().await.opportunities.len()
    }

    pub async fn lead_count(&self) -> usize {
        self.tables.read().await.leads.len()
    }
}

#[async_trait]
impl OpportunityStore for MemoryStore {
    async fn list_companies(&self) -> Result<Vec<GroupCompany>, AppError> {
        self.check("list_companies")?;
        Ok(self.tables.read().await.companies.clone())
    }

    async fn insert_company(&self, name: &str) -> Result<GroupCompany, AppError> {
        self.check("insert_company")?;
        let company = GroupCompany { id: Uuid::new_v4(), name: name.to_string() };
        self.tables.write().await.companies.push(company.clone());
        Ok(company)
    }

    async fn list_partners(&self) -> Result<Vec<ExternalPartner>, AppError> {
        self.check("list_partners")?;
        Ok(self.tables.read().await.partners.clone())
    }

    async fn insert_partner(&self, partner: &NewPartner) -> Result<ExternalPartner, AppError> {
        self.check("insert_partner")?;
        let partner = ExternalPartner {
            id: Uuid::new_v4(),
            name: partner.name.clone(),
            contact_name: partner.contact_name.clone(),
            email: partner.email.clone(),
            phone: partner.phone.clone(),
        };
        self.tables.write().await.partners.push(partner.clone());
        Ok(partner)
    }

    async fn list_statuses(&self) -> Result<Vec<StatusLabel>, AppError> {
        self.check("list_statuses")?;
        let mut statuses = self.tables.read().await.statuses.clone();
        statuses.sort_by_key(|s| s.position);
        Ok(statuses)
    }

    async fn insert_status(&self, name: &str, position: i32) -> Result<StatusLabel, AppError> {
        self.check("insert_status")?;
        let status = StatusLabel { id: Uuid::new_v4(), name: name.to_string(), position };
        self.tables.write().await.statuses.push(status.clone());
        Ok(status)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.check("list_users")?;
        Ok(self.tables.read().await.users.clone())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        self.check("find_user")?;
        Ok(self.tables.read().await.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        self.check("find_lead")?;
        Ok(self.tables.read().await.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn find_lead_by_company(&self, company_name: &str) -> Result<Option<Lead>, AppError> {
        self.check("find_lead_by_company")?;
        Ok(self
            .tables
            .read()
            .await
            .leads
            .iter()
            .find(|l| l.company_name == company_name)
            .cloned())
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        self.check("list_leads")?;
        Ok(self.tables.read().await.leads.clone())
    }

    async fn insert_lead(&self, lead: &LeadDraft) -> Result<Lead, AppError> {
        self.check("insert_lead")?;
        let lead = Lead {
            id: Uuid::new_v4(),
            company_name: lead.company_name.clone(),
            contact_name: lead.contact_name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().await.leads.push(lead.clone());
        Ok(lead)
    }

    async fn update_lead(&self, id: Uuid, patch: &LeadPatch) -> Result<(), AppError> {
        self.check("update_lead")?;
        let mut tables = self.tables.write().await;
        if let Some(lead) = tables.leads.iter_mut().find(|l| l.id == id) {
            patch_lead(lead, patch);
        }
        Ok(())
    }

    async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        self.check("delete_lead")?;
        self.tables.write().await.leads.retain(|l| l.id != id);
        Ok(())
    }

    async fn list_opportunities(&self) -> Result<Vec<OpportunityRow>, AppError> {
        self.check("list_opportunities")?;
        Ok(self.tables.read().await.opportunities.clone())
    }

    async fn find_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRow>, AppError> {
        self.check("find_opportunity")?;
        Ok(self
            .tables
            .read()
            .await
            .opportunities
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn insert_opportunity(&self, opportunity: &NewOpportunity) -> Result<OpportunityRow, AppError> {
        self.check("insert_opportunity")?;
        let now = Utc::now();
        let row = OpportunityRow {
            id: Uuid::new_v4(),
            category: opportunity.routing.category,
            lead_id: opportunity.lead_id,
            sent_at: opportunity.sent_at,
            responsible_user_id: opportunity.responsible_user_id,
            status_id: opportunity.status_id,
            origin_company_id: opportunity.routing.origin_company_id,
            destination_company_id: opportunity.routing.destination_company_id,
            origin_partner_id: opportunity.routing.origin_partner_id,
            details: opportunity.details.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.opportunities.push(row.clone());
        Ok(row)
    }

    async fn update_opportunity(&self, id: Uuid, changes: &OpportunityChanges) -> Result<(), AppError> {
        self.check("update_opportunity")?;
        let mut tables = self.tables.write().await;
        if let Some(row) = tables.opportunities.iter_mut().find(|o| o.id == id) {
            patch_opportunity(row, changes);
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_opportunity(&self, id: Uuid) -> Result<(), AppError> {
        self.check("delete_opportunity")?;
        self.tables.write().await.opportunities.retain(|o| o.id != id);
        Ok(())
    }

    async fn list_partner_links(&self) -> Result<Vec<OutgoingPartnerLink>, AppError> {
        self.check("list_partner_links")?;
        Ok(self.tables.read().await.links.clone())
    }

    async fn partner_links_for(&self, opportunity_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.check("partner_links_for")?;
        Ok(self
            .tables
            .read()
            .await
            .links
            .iter()
            .filter(|l| l.opportunity_id == opportunity_id)
            .map(|l| l.partner_id)
            .collect())
    }

    async fn insert_partner_links(&self, opportunity_id: Uuid, partner_ids: &[Uuid]) -> Result<(), AppError> {
        self.check("insert_partner_links")?;
        let mut tables = self.tables.write().await;
        tables.links.extend(partner_ids.iter().map(|&partner_id| OutgoingPartnerLink {
            opportunity_id,
            partner_id,
        }));
        Ok(())
    }

    async fn delete_partner_links(&self, opportunity_id: Uuid) -> Result<(), AppError> {
        self.check("delete_partner_links")?;
        self.tables
            .write()
            .await
            .links
            .retain(|l| l.opportunity_id != opportunity_id);
        Ok(())
    }

    async fn list_observations(&self, opportunity_id: Uuid) -> Result<Vec<Observation>, AppError> {
        self.check("list_observations")?;
        Ok(self
            .tables
            .read()
            .await
            .observations
            .iter()
            .filter(|o| o.opportunity_id == opportunity_id)
            .cloned()
            .collect())
    }

    async fn insert_observation(
        &self,
        opportunity_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Observation, AppError> {
        self.check("insert_observation")?;
        let observation = Observation {
            id: Uuid::new_v4(),
            opportunity_id,
            author_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.observations.push(observation.clone());
        Ok(observation)
    }

    async fn delete_observations(&self, opportunity_id: Uuid) -> Result<(), AppError> {
        self.check("delete_observations")?;
        self.tables
            .write()
            .await
            .observations
            .retain(|o| o.opportunity_id != opportunity_id);
        Ok(())
    }

    async fn stats_by_company(&self) -> Result<Option<Vec<CompanyStatsRow>>, AppError> {
        self.check("stats_by_company")?;
        Ok(self.tables.read().await.company_stats.clone())
    }

    async fn stats_by_partner(&self) -> Result<Option<Vec<PartnerStatsRow>>, AppError> {
        self.check("stats_by_partner")?;
        Ok(self.tables.read().await.partner_stats.clone())
    }
}
