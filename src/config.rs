// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{OpportunityStore, PgStore},
    services::{
        auth::AuthService, catalog::CatalogCache, dashboard_service::DashboardService,
        opportunity_service::OpportunityService,
    },
};

/// Configuração lida do ambiente (e do .env, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub catalog_ttl: Duration,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            catalog_ttl: Duration::from_secs(var_or("CATALOG_TTL_SECS", 300)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogCache,
    pub auth_service: AuthService,
    pub opportunity_service: OpportunityService,
    pub dashboard_service: DashboardService,
}

pub async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    let db_pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&settings.database_url)
        .await?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(db_pool)
}

impl AppState {
    pub async fn new(settings: &Settings, db_pool: PgPool) -> anyhow::Result<Self> {
        let store: Arc<dyn OpportunityStore> = Arc::new(PgStore::new(db_pool));
        Self::from_store(store, settings).await
    }

    // --- Monta o gráfico de dependências ---
    pub async fn from_store(store: Arc<dyn OpportunityStore>, settings: &Settings) -> anyhow::Result<Self> {
        let catalog = CatalogCache::new(store.clone(), settings.catalog_ttl)
            .await
            .context("Falha ao carregar o catálogo inicial")?;

        Ok(Self {
            auth_service: AuthService::new(store.clone(), settings.jwt_secret.clone()),
            opportunity_service: OpportunityService::new(store.clone(), catalog.clone()),
            dashboard_service: DashboardService::new(store, catalog.clone()),
            catalog,
        })
    }
}
