// src/models/catalog.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- DADOS DE REFERÊNCIA (criados uma vez, raramente alterados) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupCompany {
    pub id: Uuid,
    #[schema(example = "Alpha Tecnologia")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPartner {
    pub id: Uuid,
    #[schema(example = "Parceiro Consultoria")]
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// Não existe ordem de transição obrigatória entre status.
// A posição serve apenas para exibição do fluxo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusLabel {
    pub id: Uuid,
    #[schema(example = "Em Andamento")]
    pub name: String,
    #[schema(example = 2)]
    pub position: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Ana Souza")]
    pub name: String,
    #[schema(example = "ana@grupo.com")]
    pub email: String,
}

// Dados para cadastrar uma nova entidade de referência
#[derive(Debug, Clone)]
pub struct NewPartner {
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
