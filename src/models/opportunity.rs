// src/models/opportunity.rs

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::IntegrityViolation;

// --- ENUMS ---

// Mapeia o CREATE TYPE opportunity_category do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "opportunity_category", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityCategory {
    Intragroup,
    IncomingExternal,
    OutgoingExternal,
}

impl OpportunityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityCategory::Intragroup => "intragroup",
            OpportunityCategory::IncomingExternal => "incoming-external",
            OpportunityCategory::OutgoingExternal => "outgoing-external",
        }
    }
}

impl std::fmt::Display for OpportunityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- LEAD (o cliente por trás da oportunidade) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    #[schema(example = "Cliente Final S.A.")]
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Cliente Final S.A.")]
    pub company_name: String,
    pub contact_name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

// Campos ausentes (None) são mantidos como estão.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[validate(length(min = 1, message = "required"))]
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl LeadPatch {
    /// Patch que devolve o lead exatamente ao estado informado.
    pub fn restore(lead: &Lead) -> Self {
        Self {
            company_name: Some(lead.company_name.clone()),
            contact_name: lead.contact_name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
        }
    }
}

// --- ROTEAMENTO (origem/destino por categoria) ---

/// A forma de cada categoria, com os campos obrigatórios dela.
/// Drafts e patches só carregam esta forma, então um estado "categoria x campos"
/// inconsistente não chega ao armazenamento pelo caminho de escrita.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum Routing {
    #[serde(rename_all = "camelCase")]
    Intragroup {
        origin_company_id: Uuid,
        destination_company_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    IncomingExternal {
        origin_partner_id: Uuid,
        destination_company_id: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    OutgoingExternal {
        origin_company_id: Uuid,
        #[serde(default)]
        destination_partner_ids: Vec<Uuid>,
    },
}

/// As colunas anuláveis que o banco usa para guardar um `Routing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingColumns {
    pub category: OpportunityCategory,
    pub origin_company_id: Option<Uuid>,
    pub destination_company_id: Option<Uuid>,
    pub origin_partner_id: Option<Uuid>,
}

impl Routing {
    pub fn category(&self) -> OpportunityCategory {
        match self {
            Routing::Intragroup { .. } => OpportunityCategory::Intragroup,
            Routing::IncomingExternal { .. } => OpportunityCategory::IncomingExternal,
            Routing::OutgoingExternal { .. } => OpportunityCategory::OutgoingExternal,
        }
    }

    pub fn partner_ids(&self) -> &[Uuid] {
        match self {
            Routing::OutgoingExternal { destination_partner_ids, .. } => destination_partner_ids,
            _ => &[],
        }
    }

    pub fn columns(&self) -> RoutingColumns {
        match *self {
            Routing::Intragroup { origin_company_id, destination_company_id } => RoutingColumns {
                category: OpportunityCategory::Intragroup,
                origin_company_id: Some(origin_company_id),
                destination_company_id: Some(destination_company_id),
                origin_partner_id: None,
            },
            Routing::IncomingExternal { origin_partner_id, destination_company_id } => RoutingColumns {
                category: OpportunityCategory::IncomingExternal,
                origin_company_id: None,
                destination_company_id: Some(destination_company_id),
                origin_partner_id: Some(origin_partner_id),
            },
            Routing::OutgoingExternal { origin_company_id, .. } => RoutingColumns {
                category: OpportunityCategory::OutgoingExternal,
                origin_company_id: Some(origin_company_id),
                destination_company_id: None,
                origin_partner_id: None,
            },
        }
    }

    /// Reconstrói o roteamento a partir do layout anulável do banco.
    pub fn from_columns(
        columns: RoutingColumns,
        partner_ids: &[Uuid],
    ) -> Result<Self, IntegrityViolation> {
        let category = columns.category;
        let required = |value: Option<Uuid>, field: &'static str| {
            value.ok_or(IntegrityViolation::MissingRoleField { category, field })
        };
        let forbidden = |value: Option<Uuid>, field: &'static str| match value {
            Some(_) => Err(IntegrityViolation::UnexpectedRoleField { category, field }),
            None => Ok(()),
        };

        match category {
            OpportunityCategory::Intragroup => {
                let origin = required(columns.origin_company_id, "origin_company_id")?;
                let destination = required(columns.destination_company_id, "destination_company_id")?;
                forbidden(columns.origin_partner_id, "origin_partner_id")?;
                if !partner_ids.is_empty() {
                    return Err(IntegrityViolation::UnexpectedPartnerLinks(category));
                }
                Ok(Routing::Intragroup {
                    origin_company_id: origin,
                    destination_company_id: destination,
                })
            }
            OpportunityCategory::IncomingExternal => {
                let origin = required(columns.origin_partner_id, "origin_partner_id")?;
                let destination = required(columns.destination_company_id, "destination_company_id")?;
                forbidden(columns.origin_company_id, "origin_company_id")?;
                if !partner_ids.is_empty() {
                    return Err(IntegrityViolation::UnexpectedPartnerLinks(category));
                }
                Ok(Routing::IncomingExternal {
                    origin_partner_id: origin,
                    destination_company_id: destination,
                })
            }
            OpportunityCategory::OutgoingExternal => {
                let origin = required(columns.origin_company_id, "origin_company_id")?;
                forbidden(columns.destination_company_id, "destination_company_id")?;
                forbidden(columns.origin_partner_id, "origin_partner_id")?;
                Ok(Routing::OutgoingExternal {
                    origin_company_id: origin,
                    destination_partner_ids: partner_ids.to_vec(),
                })
            }
        }
    }
}

// --- OPORTUNIDADE ---

// Campos livres do formulário. O banco guarda tudo como texto.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDetails {
    #[schema(example = "Implantação de ERP")]
    pub service_description: Option<String>,
    pub project_name: Option<String>,
    #[schema(example = "1500,00")]
    pub monthly_value: Option<String>,
    #[schema(example = "12")]
    pub installments: Option<String>,
    pub total_value: Option<String>,
    #[schema(example = "T2")]
    pub fiscal_quarter: Option<String>,
    pub fiscal_month: Option<String>,
    #[schema(example = "2025")]
    pub fiscal_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRow {
    pub id: Uuid,
    pub category: OpportunityCategory,
    pub lead_id: Uuid,
    // Data de envio/recebimento
    #[schema(value_type = String, format = Date, example = "2025-03-14")]
    pub sent_at: NaiveDate,
    pub responsible_user_id: Uuid,
    pub status_id: Uuid,

    pub origin_company_id: Option<Uuid>,
    pub destination_company_id: Option<Uuid>,
    pub origin_partner_id: Option<Uuid>,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub details: OpportunityDetails,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OpportunityRow {
    pub fn routing_columns(&self) -> RoutingColumns {
        RoutingColumns {
            category: self.category,
            origin_company_id: self.origin_company_id,
            destination_company_id: self.destination_company_id,
            origin_partner_id: self.origin_partner_id,
        }
    }
}

/// Um registro "cru" como vem do armazenamento: a linha + os vínculos de parceiros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpportunityRecord {
    pub row: OpportunityRow,
    pub partner_ids: Vec<Uuid>,
}

impl OpportunityRecord {
    pub fn routing(&self) -> Result<Routing, IntegrityViolation> {
        Routing::from_columns(self.row.routing_columns(), &self.partner_ids)
    }

    pub fn year(&self) -> i32 {
        self.row.sent_at.year()
    }

    /// Mês calendário, 0..=11.
    pub fn month0(&self) -> u32 {
        self.row.sent_at.month0()
    }
}

// Dados gravados na inserção da linha
#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub lead_id: Uuid,
    pub routing: RoutingColumns,
    pub sent_at: NaiveDate,
    pub responsible_user_id: Uuid,
    pub status_id: Uuid,
    pub details: OpportunityDetails,
}

// Atualização parcial no nível do armazenamento
#[derive(Debug, Clone, Default)]
pub struct OpportunityChanges {
    pub routing: Option<RoutingColumns>,
    pub sent_at: Option<NaiveDate>,
    pub responsible_user_id: Option<Uuid>,
    pub status_id: Option<Uuid>,
    pub details: Option<OpportunityDetails>,
}

impl OpportunityChanges {
    /// Mudanças que devolvem a linha ao estado informado.
    pub fn restore(row: &OpportunityRow) -> Self {
        Self {
            routing: Some(row.routing_columns()),
            sent_at: Some(row.sent_at),
            responsible_user_id: Some(row.responsible_user_id),
            status_id: Some(row.status_id),
            details: Some(row.details.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.routing.is_none()
            && self.sent_at.is_none()
            && self.responsible_user_id.is_none()
            && self.status_id.is_none()
            && self.details.is_none()
    }
}

// --- TABELA DE JUNÇÃO (destinos de uma oportunidade de saída) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingPartnerLink {
    pub opportunity_id: Uuid,
    pub partner_id: Uuid,
}

// --- OBSERVAÇÕES (somente inserção) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: Uuid,
    pub opportunity_id: Uuid,
    pub author_id: Uuid,
    #[schema(example = "Cliente pediu proposta revisada.")]
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// --- ENTRADAS DO PIPELINE DE MUTAÇÃO ---

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDraft {
    #[validate(nested)]
    pub lead: LeadDraft,

    // { "category": "outgoing-external", "originCompanyId": ..., "destinationPartnerIds": [...] }
    #[schema(value_type = Object)]
    pub routing: Routing,

    #[schema(value_type = String, format = Date, example = "2025-03-14")]
    pub sent_at: NaiveDate,
    pub responsible_user_id: Uuid,
    pub status_id: Uuid,

    #[serde(default)]
    pub details: OpportunityDetails,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    #[validate(nested)]
    pub lead: Option<LeadPatch>,

    #[schema(value_type = Option<Object>)]
    pub routing: Option<Routing>,

    #[schema(value_type = Option<String>, format = Date)]
    pub sent_at: Option<NaiveDate>,
    pub responsible_user_id: Option<Uuid>,
    pub status_id: Option<Uuid>,
    pub details: Option<OpportunityDetails>,
}

// --- SAÍDAS ---

/// Resultado da classificação: categoria + rótulos de exibição.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub opportunity_id: Uuid,
    pub category: OpportunityCategory,
    #[schema(example = "Alpha Tecnologia")]
    pub origin_label: String,
    #[schema(example = "Parceiro A, Parceiro B")]
    pub destination_label: String,
    // Oportunidade de saída sem nenhum parceiro vinculado
    pub missing_partners: bool,
}

/// Registro ignorado por estar inconsistente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    pub opportunity_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityFilter {
    pub category: Option<OpportunityCategory>,
    pub status_id: Option<Uuid>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunitySummary {
    #[serde(flatten)]
    pub classification: Classification,
    #[schema(value_type = String, format = Date)]
    pub sent_at: NaiveDate,
    pub lead_company: Option<String>,
    pub status_name: Option<String>,
    pub responsible_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityListing {
    pub items: Vec<OpportunitySummary>,
    pub rejected: Vec<RejectedRecord>,
    // Falha de leitura: listas vazias e a mensagem aqui
    pub error: Option<String>,
}

impl OpportunityListing {
    pub fn degraded(error: impl ToString) -> Self {
        Self { items: Vec::new(), rejected: Vec::new(), error: Some(error.to_string()) }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityDetail {
    #[serde(flatten)]
    pub row: OpportunityRow,
    pub partner_ids: Vec<Uuid>,
    pub lead: Option<Lead>,
    pub classification: Option<Classification>,
    pub integrity_error: Option<String>,
    pub status_name: Option<String>,
    pub responsible_name: Option<String>,
    pub observations: Vec<Observation>,
}
