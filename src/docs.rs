// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,

        // --- Catálogo ---
        handlers::catalog::list_companies,
        handlers::catalog::create_company,
        handlers::catalog::list_partners,
        handlers::catalog::create_partner,
        handlers::catalog::list_statuses,
        handlers::catalog::create_status,
        handlers::catalog::list_users,
        handlers::catalog::refresh_catalog,

        // --- Oportunidades ---
        handlers::opportunities::list_opportunities,
        handlers::opportunities::get_opportunity,
        handlers::opportunities::create_opportunity,
        handlers::opportunities::update_opportunity,
        handlers::opportunities::delete_opportunity,
        handlers::opportunities::list_observations,
        handlers::opportunities::add_observation,

        // --- Dashboard ---
        handlers::dashboard::get_overview,
        handlers::dashboard::get_company_stats,
        handlers::dashboard::get_partner_stats,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::GroupCompany,
            models::catalog::ExternalPartner,
            models::catalog::StatusLabel,
            models::catalog::User,
            handlers::catalog::CreateCompanyPayload,
            handlers::catalog::CreatePartnerPayload,
            handlers::catalog::CreateStatusPayload,

            // --- Oportunidades ---
            models::opportunity::OpportunityCategory,
            models::opportunity::Lead,
            models::opportunity::LeadDraft,
            models::opportunity::LeadPatch,
            models::opportunity::OpportunityDetails,
            models::opportunity::OpportunityRow,
            models::opportunity::OpportunityDraft,
            models::opportunity::OpportunityPatch,
            models::opportunity::Observation,
            models::opportunity::Classification,
            models::opportunity::RejectedRecord,
            models::opportunity::OpportunitySummary,
            models::opportunity::OpportunityListing,
            models::opportunity::OpportunityDetail,
            handlers::opportunities::CreateObservationPayload,

            // --- Dashboard ---
            models::stats::EntityStats,
            models::stats::ExchangeMatrix,
            models::stats::GroupBalance,
            models::stats::BucketRow,
            models::stats::TimeBuckets,
            models::stats::Aggregation,
        )
    ),
    tags(
        (name = "Saúde", description = "Verificação de disponibilidade"),
        (name = "Catálogo", description = "Empresas do grupo, parceiros, status e usuários"),
        (name = "Oportunidades", description = "Cadastro, edição e classificação de oportunidades"),
        (name = "Dashboard", description = "Balanço de indicações entre empresas e parceiros")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
