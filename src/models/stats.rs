// src/models/stats.rs

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::opportunity::RejectedRecord;

// 1. Enviadas / recebidas por entidade (empresa do grupo ou parceiro)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    pub id: Uuid,
    pub name: String,
    pub sent: u32,
    pub received: u32,
    // received - sent
    pub balance: i64,
}

impl EntityStats {
    pub fn new(id: Uuid, name: &str, sent: u32, received: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            sent,
            received,
            balance: i64::from(received) - i64::from(sent),
        }
    }
}

// 2. Matriz de troca entre empresas (apenas intragrupo)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeMatrix {
    // Nomes das empresas, na ordem do catálogo (linhas = origem, colunas = destino)
    pub labels: Vec<String>,
    pub cells: Vec<Vec<u32>>,
}

#[cfg(test)]
impl ExchangeMatrix {
    pub fn count(&self, source: &str, target: &str) -> Option<u32> {
        let row = self.labels.iter().position(|l| l == source)?;
        let col = self.labels.iter().position(|l| l == target)?;
        Some(self.cells[row][col])
    }
}

// 3. Saldo externo do grupo inteiro
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupBalance {
    pub total_received: u32,
    pub total_sent: u32,
    pub balance: i64,
    // Razão recebidas/enviadas em %, sem limite (pode passar de 100)
    pub percent_balance: f64,
    // Mesmo valor limitado a [0, 100], pronto para barras de progresso
    pub clamped_percent: f64,
}

impl GroupBalance {
    pub fn from_totals(total_received: u32, total_sent: u32) -> Self {
        let percent_balance = match (total_received, total_sent) {
            (0, 0) => 0.0,
            (_, 0) => 100.0,
            (received, sent) => f64::from(received) / f64::from(sent) * 100.0,
        };

        Self {
            total_received,
            total_sent,
            balance: i64::from(total_received) - i64::from(total_sent),
            percent_balance,
            clamped_percent: percent_balance.clamp(0.0, 100.0),
        }
    }
}

// 4. Contagens por mês / trimestre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BucketRow {
    pub index: u32,
    #[schema(example = "Mar")]
    pub label: String,
    pub intragroup: u32,
    pub incoming: u32,
    pub outgoing: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeBuckets {
    pub year: i32,
    pub months: Vec<BucketRow>,
    pub quarters: Vec<BucketRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub per_company: Vec<EntityStats>,
    pub per_partner: Vec<EntityStats>,
    pub exchange_matrix: ExchangeMatrix,
    pub group_balance: GroupBalance,
    pub time_buckets: TimeBuckets,
    pub rejected: Vec<RejectedRecord>,
}

// Linhas pré-agregadas pelo servidor (views opportunity_stats_by_*)
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CompanyStatsRow {
    pub company_id: Uuid,
    pub sent: i64,
    pub received: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PartnerStatsRow {
    pub partner_id: Uuid,
    pub sent: i64,
    pub received: i64,
}

// Resposta do dashboard: falha de leitura vira lista vazia + indicador de erro
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse<T> {
    pub data: T,
    pub error: Option<String>,
}

impl<T> DashboardResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { data, error: None }
    }

    pub fn degraded(data: T, error: impl ToString) -> Self {
        Self { data, error: Some(error.to_string()) }
    }
}
