// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::opportunity::OpportunityCategory;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Registro inconsistente com a sua categoria (DataIntegrityError)
    #[error("Inconsistência de dados: {0}")]
    DataIntegrity(#[from] IntegrityViolation),

    // Falha numa ida-e-volta ao armazenamento remoto (RemoteOperationError)
    #[error("Falha na operação remota: {0}")]
    RemoteOperation(#[from] StoreError),

    // Mutação de várias etapas interrompida no meio do caminho
    #[error(transparent)]
    PartialMutation(#[from] PartialMutationError),

    #[error("{0} não encontrado(a)")]
    NotFound(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O '?' dentro do PgStore converte sqlx::Error direto para RemoteOperation.
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::RemoteOperation(StoreError::Database(e))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("erro de banco de dados: {0}")]
    Database(#[from] sqlx::Error),

    // Falha simulada pelo armazenamento em memória dos testes
    #[cfg(test)]
    #[error("operação '{0}' falhou no armazenamento")]
    Unavailable(String),
}

/// Violação da regra "categoria x campos de origem/destino".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("o campo '{field}' é obrigatório para a categoria {category}")]
    MissingRoleField {
        category: OpportunityCategory,
        field: &'static str,
    },

    #[error("o campo '{field}' não pode ser preenchido na categoria {category}")]
    UnexpectedRoleField {
        category: OpportunityCategory,
        field: &'static str,
    },

    #[error("parceiros vinculados a uma oportunidade da categoria {0}")]
    UnexpectedPartnerLinks(OpportunityCategory),

    #[error("o parceiro {0} aparece mais de uma vez no destino")]
    DuplicatePartner(Uuid),

    #[error("origem e destino são a mesma empresa ({0})")]
    SameOriginAndDestination(Uuid),

    #[error("empresa do grupo {0} não existe no catálogo")]
    UnknownCompany(Uuid),

    #[error("parceiro externo {0} não existe no catálogo")]
    UnknownPartner(Uuid),

    #[error("status {0} não existe no catálogo")]
    UnknownStatus(Uuid),

    #[error("usuário responsável {0} não existe no catálogo")]
    UnknownUser(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationOperation {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for MutationOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MutationOperation::Create => "criação",
            MutationOperation::Update => "atualização",
            MutationOperation::Delete => "exclusão",
        };
        f.write_str(name)
    }
}

/// Cada ida-e-volta ao armazenamento dentro de uma mutação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationStep {
    ResolveLead,
    InsertLead,
    InsertOpportunity,
    InsertPartnerLinks,
    FetchCurrent,
    PatchLead,
    PatchOpportunity,
    DeletePartnerLinks,
    DeleteObservations,
    DeleteOpportunity,
}

impl std::fmt::Display for MutationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MutationStep::ResolveLead => "buscar lead",
            MutationStep::InsertLead => "inserir lead",
            MutationStep::InsertOpportunity => "inserir oportunidade",
            MutationStep::InsertPartnerLinks => "inserir parceiros",
            MutationStep::FetchCurrent => "buscar oportunidade atual",
            MutationStep::PatchLead => "atualizar lead",
            MutationStep::PatchOpportunity => "atualizar oportunidade",
            MutationStep::DeletePartnerLinks => "remover parceiros",
            MutationStep::DeleteObservations => "remover observações",
            MutationStep::DeleteOpportunity => "remover oportunidade",
        };
        f.write_str(name)
    }
}

/// Resultado das ações de compensação de uma mutação interrompida.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum Compensation {
    NotAttempted,
    Completed,
    Failed(String),
}

#[derive(Debug, Error)]
#[error("{operation} interrompida na etapa '{failed}' após {} etapa(s) concluída(s)", .completed.len())]
pub struct PartialMutationError {
    pub operation: MutationOperation,
    pub opportunity_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub completed: Vec<MutationStep>,
    pub failed: MutationStep,
    pub compensation: Compensation,
    #[source]
    pub source: Box<AppError>,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::DataIntegrity(violation) => {
                (StatusCode::UNPROCESSABLE_ENTITY, violation.to_string())
            }
            AppError::PartialMutation(err) => {
                tracing::error!("Mutação parcial: {} (causa: {})", err, err.source);
                let body = Json(json!({
                    "error": "A operação foi concluída apenas parcialmente.",
                    "operation": err.operation,
                    "opportunityId": err.opportunity_id,
                    "leadId": err.lead_id,
                    "completedSteps": err.completed,
                    "failedStep": err.failed,
                    "compensation": err.compensation,
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
            AppError::RemoteOperation(ref e) => {
                tracing::error!("Falha no armazenamento remoto: {}", e);
                (StatusCode::BAD_GATEWAY, "Falha ao comunicar com o banco de dados.".to_string())
            }
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} não encontrado(a).", what)),
            AppError::InvalidToken | AppError::JwtError(_) => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::UserNotFound => (StatusCode::UNAUTHORIZED, "Usuário não encontrado.".to_string()),

            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
