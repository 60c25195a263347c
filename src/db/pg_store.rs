// src/db/pg_store.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OpportunityStore,
    models::{
        catalog::{ExternalPartner, GroupCompany, NewPartner, StatusLabel, User},
        opportunity::{
            Lead, LeadDraft, LeadPatch, NewOpportunity, Observation, OpportunityCategory,
            OpportunityChanges, OpportunityRow, OutgoingPartnerLink,
        },
        stats::{CompanyStatsRow, PartnerStatsRow},
    },
};

// Colunas explícitas para o FromRow de OpportunityRow (inclui os campos "flatten")
const OPPORTUNITY_COLUMNS: &str = r#"
    id, category, lead_id, sent_at, responsible_user_id, status_id,
    origin_company_id, destination_company_id, origin_partner_id,
    service_description, project_name, monthly_value, installments, total_value,
    fiscal_quarter, fiscal_month, fiscal_year,
    created_at, updated_at
"#;

// Armazenamento no Postgres, responsável por todas as coleções do sistema
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Verifica se uma view de estatísticas existe no servidor
    async fn relation_exists(&self, name: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.views WHERE table_name = $1)",
        )
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl OpportunityStore for PgStore {
    // =========================================================================
    //  DADOS DE REFERÊNCIA
    // =========================================================================

    async fn list_companies(&self) -> Result<Vec<GroupCompany>, AppError> {
        let companies = sqlx::query_as::<_, GroupCompany>(
            "SELECT id, name FROM group_companies ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    async fn insert_company(&self, name: &str) -> Result<GroupCompany, AppError> {
        let company = sqlx::query_as::<_, GroupCompany>(
            "INSERT INTO group_companies (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(company)
    }

    async fn list_partners(&self) -> Result<Vec<ExternalPartner>, AppError> {
        let partners = sqlx::query_as::<_, ExternalPartner>(
            r#"
            SELECT id, name, contact_name, email, phone
            FROM external_partners
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(partners)
    }

    async fn insert_partner(&self, partner: &NewPartner) -> Result<ExternalPartner, AppError> {
        let partner = sqlx::query_as::<_, ExternalPartner>(
            r#"
            INSERT INTO external_partners (name, contact_name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, contact_name, email, phone
            "#,
        )
        .bind(&partner.name)
        .bind(partner.contact_name.as_deref())
        .bind(partner.email.as_deref())
        .bind(partner.phone.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(partner)
    }

    async fn list_statuses(&self) -> Result<Vec<StatusLabel>, AppError> {
        let statuses = sqlx::query_as::<_, StatusLabel>(
            "SELECT id, name, position FROM status_labels ORDER BY position ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(statuses)
    }

    async fn insert_status(&self, name: &str, position: i32) -> Result<StatusLabel, AppError> {
        let status = sqlx::query_as::<_, StatusLabel>(
            "INSERT INTO status_labels (name, position) VALUES ($1, $2) RETURNING id, name, position",
        )
        .bind(name)
        .bind(position)
        .fetch_one(&self.pool)
        .await?;
        Ok(status)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>("SELECT id, name, email FROM users ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    // =========================================================================
    //  LEADS
    // =========================================================================

    async fn find_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT id, company_name, contact_name, email, phone, created_at FROM leads WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    async fn find_lead_by_company(&self, company_name: &str) -> Result<Option<Lead>, AppError> {
        // Igualdade exata; o mais antigo vence
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            SELECT id, company_name, contact_name, email, phone, created_at
            FROM leads
            WHERE company_name = $1
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(company_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT id, company_name, contact_name, email, phone, created_at FROM leads ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    async fn insert_lead(&self, lead: &LeadDraft) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (company_name, contact_name, email, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, company_name, contact_name, email, phone, created_at
            "#,
        )
        .bind(&lead.company_name)
        .bind(lead.contact_name.as_deref())
        .bind(lead.email.as_deref())
        .bind(lead.phone.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(lead)
    }

    async fn update_lead(&self, id: Uuid, patch: &LeadPatch) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE leads SET
                company_name = COALESCE($2, company_name),
                contact_name = COALESCE($3, contact_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.company_name.as_deref())
        .bind(patch.contact_name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.phone.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  OPORTUNIDADES
    // =========================================================================

    async fn list_opportunities(&self) -> Result<Vec<OpportunityRow>, AppError> {
        let sql = format!(
            "SELECT {} FROM opportunities ORDER BY sent_at DESC, created_at DESC",
            OPPORTUNITY_COLUMNS
        );
        let rows = sqlx::query_as::<_, OpportunityRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRow>, AppError> {
        let sql = format!("SELECT {} FROM opportunities WHERE id = $1", OPPORTUNITY_COLUMNS);
        let row = sqlx::query_as::<_, OpportunityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_opportunity(&self, opportunity: &NewOpportunity) -> Result<OpportunityRow, AppError> {
        let sql = format!(
            r#"
            INSERT INTO opportunities (
                category, lead_id, sent_at, responsible_user_id, status_id,
                origin_company_id, destination_company_id, origin_partner_id,
                service_description, project_name, monthly_value, installments, total_value,
                fiscal_quarter, fiscal_month, fiscal_year
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {}
            "#,
            OPPORTUNITY_COLUMNS
        );
        let details = &opportunity.details;
        let row = sqlx::query_as::<_, OpportunityRow>(&sql)
            .bind(opportunity.routing.category)
            .bind(opportunity.lead_id)
            .bind(opportunity.sent_at)
            .bind(opportunity.responsible_user_id)
            .bind(opportunity.status_id)
            .bind(opportunity.routing.origin_company_id)
            .bind(opportunity.routing.destination_company_id)
            .bind(opportunity.routing.origin_partner_id)
            .bind(details.service_description.as_deref())
            .bind(details.project_name.as_deref())
            .bind(details.monthly_value.as_deref())
            .bind(details.installments.as_deref())
            .bind(details.total_value.as_deref())
            .bind(details.fiscal_quarter.as_deref())
            .bind(details.fiscal_month.as_deref())
            .bind(details.fiscal_year.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_opportunity(&self, id: Uuid, changes: &OpportunityChanges) -> Result<(), AppError> {
        // $2 e $13 dizem se o bloco (roteamento / campos livres) deve ser regravado,
        // inclusive com NULL. O resto usa COALESCE.
        let routing = changes.routing;
        let details = changes.details.clone().unwrap_or_default();

        sqlx::query(
            r#"
            UPDATE opportunities SET
                category = CASE WHEN $2 THEN $3 ELSE category END,
                origin_company_id = CASE WHEN $2 THEN $4 ELSE origin_company_id END,
                destination_company_id = CASE WHEN $2 THEN $5 ELSE destination_company_id END,
                origin_partner_id = CASE WHEN $2 THEN $6 ELSE origin_partner_id END,
                sent_at = COALESCE($7, sent_at),
                responsible_user_id = COALESCE($8, responsible_user_id),
                status_id = COALESCE($9, status_id),
                service_description = CASE WHEN $13 THEN $10 ELSE service_description END,
                project_name = CASE WHEN $13 THEN $11 ELSE project_name END,
                monthly_value = CASE WHEN $13 THEN $12 ELSE monthly_value END,
                installments = CASE WHEN $13 THEN $14 ELSE installments END,
                total_value = CASE WHEN $13 THEN $15 ELSE total_value END,
                fiscal_quarter = CASE WHEN $13 THEN $16 ELSE fiscal_quarter END,
                fiscal_month = CASE WHEN $13 THEN $17 ELSE fiscal_month END,
                fiscal_year = CASE WHEN $13 THEN $18 ELSE fiscal_year END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(routing.is_some())
        .bind(routing.map(|r| r.category).unwrap_or(OpportunityCategory::Intragroup))
        .bind(routing.and_then(|r| r.origin_company_id))
        .bind(routing.and_then(|r| r.destination_company_id))
        .bind(routing.and_then(|r| r.origin_partner_id))
        .bind(changes.sent_at)
        .bind(changes.responsible_user_id)
        .bind(changes.status_id)
        .bind(details.service_description)
        .bind(details.project_name)
        .bind(details.monthly_value)
        .bind(changes.details.is_some())
        .bind(details.installments)
        .bind(details.total_value)
        .bind(details.fiscal_quarter)
        .bind(details.fiscal_month)
        .bind(details.fiscal_year)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_opportunity(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM opportunities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  PARCEIROS DE DESTINO
    // =========================================================================

    async fn list_partner_links(&self) -> Result<Vec<OutgoingPartnerLink>, AppError> {
        let links = sqlx::query_as::<_, OutgoingPartnerLink>(
            "SELECT opportunity_id, partner_id FROM outgoing_partner_links",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn partner_links_for(&self, opportunity_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT partner_id FROM outgoing_partner_links WHERE opportunity_id = $1",
        )
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_partner_links(&self, opportunity_id: Uuid, partner_ids: &[Uuid]) -> Result<(), AppError> {
        if partner_ids.is_empty() {
            return Ok(());
        }

        // Inserção em massa usando UNNEST
        sqlx::query(
            r#"
            INSERT INTO outgoing_partner_links (opportunity_id, partner_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(opportunity_id)
        .bind(partner_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_partner_links(&self, opportunity_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM outgoing_partner_links WHERE opportunity_id = $1")
            .bind(opportunity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  OBSERVAÇÕES
    // =========================================================================

    async fn list_observations(&self, opportunity_id: Uuid) -> Result<Vec<Observation>, AppError> {
        let observations = sqlx::query_as::<_, Observation>(
            r#"
            SELECT id, opportunity_id, author_id, body, created_at
            FROM observations
            WHERE opportunity_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(opportunity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(observations)
    }

    async fn insert_observation(
        &self,
        opportunity_id: Uuid,
        author_id: Uuid,
        body: &str,
    ) -> Result<Observation, AppError> {
        let observation = sqlx::query_as::<_, Observation>(
            r#"
            INSERT INTO observations (opportunity_id, author_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, opportunity_id, author_id, body, created_at
            "#,
        )
        .bind(opportunity_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(observation)
    }

    async fn delete_observations(&self, opportunity_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM observations WHERE opportunity_id = $1")
            .bind(opportunity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  ESTATÍSTICAS PRÉ-AGREGADAS
    // =========================================================================

    async fn stats_by_company(&self) -> Result<Option<Vec<CompanyStatsRow>>, AppError> {
        if !self.relation_exists("opportunity_stats_by_company").await? {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, CompanyStatsRow>(
            "SELECT company_id, sent, received FROM opportunity_stats_by_company",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(rows))
    }

    async fn stats_by_partner(&self) -> Result<Option<Vec<PartnerStatsRow>>, AppError> {
        if !self.relation_exists("opportunity_stats_by_partner").await? {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, PartnerStatsRow>(
            "SELECT partner_id, sent, received FROM opportunity_stats_by_partner",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(rows))
    }
}
