// src/services/catalog.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OpportunityStore,
    models::catalog::{ExternalPartner, GroupCompany, NewPartner, StatusLabel, User},
};

/// Fotografia imutável dos dados de referência.
/// As listas mantêm a ordem do armazenamento; os índices servem às buscas por id.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    companies: Vec<GroupCompany>,
    partners: Vec<ExternalPartner>,
    statuses: Vec<StatusLabel>,
    users: Vec<User>,
    company_index: HashMap<Uuid, usize>,
    partner_index: HashMap<Uuid, usize>,
    status_index: HashMap<Uuid, usize>,
    user_index: HashMap<Uuid, usize>,
}

fn index_by<T>(items: &[T], id: impl Fn(&T) -> Uuid) -> HashMap<Uuid, usize> {
    items.iter().enumerate().map(|(i, item)| (id(item), i)).collect()
}

impl EntityCatalog {
    pub fn new(
        companies: Vec<GroupCompany>,
        partners: Vec<ExternalPartner>,
        statuses: Vec<StatusLabel>,
        users: Vec<User>,
    ) -> Self {
        Self {
            company_index: index_by(&companies, |c| c.id),
            partner_index: index_by(&partners, |p| p.id),
            status_index: index_by(&statuses, |s| s.id),
            user_index: index_by(&users, |u| u.id),
            companies,
            partners,
            statuses,
            users,
        }
    }

    pub async fn load(store: &dyn OpportunityStore) -> Result<Self, AppError> {
        let companies = store.list_companies().await?;
        let partners = store.list_partners().await?;
        let statuses = store.list_statuses().await?;
        let users = store.list_users().await?;
        Ok(Self::new(companies, partners, statuses, users))
    }

    pub fn companies(&self) -> &[GroupCompany] {
        &self.companies
    }

    pub fn partners(&self) -> &[ExternalPartner] {
        &self.partners
    }

    pub fn statuses(&self) -> &[StatusLabel] {
        &self.statuses
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn company(&self, id: Uuid) -> Option<&GroupCompany> {
        self.company_index.get(&id).map(|&i| &self.companies[i])
    }

    pub fn partner(&self, id: Uuid) -> Option<&ExternalPartner> {
        self.partner_index.get(&id).map(|&i| &self.partners[i])
    }

    pub fn status(&self, id: Uuid) -> Option<&StatusLabel> {
        self.status_index.get(&id).map(|&i| &self.statuses[i])
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.user_index.get(&id).map(|&i| &self.users[i])
    }

    /// Posição da empresa na ordem do catálogo (linha/coluna da matriz).
    pub fn company_position(&self, id: Uuid) -> Option<usize> {
        self.company_index.get(&id).copied()
    }

    pub fn partner_position(&self, id: Uuid) -> Option<usize> {
        self.partner_index.get(&id).copied()
    }
}

struct CachedCatalog {
    catalog: Arc<EntityCatalog>,
    loaded_at: Instant,
    stale: bool,
}

/// Cache explícito do catálogo, criado no startup e compartilhado pelo AppState.
/// Recarrega quando passa do TTL, quando foi invalidado ou sob `refresh()`.
#[derive(Clone)]
pub struct CatalogCache {
    store: Arc<dyn OpportunityStore>,
    ttl: Duration,
    inner: Arc<RwLock<CachedCatalog>>,
}

impl CatalogCache {
    pub async fn new(store: Arc<dyn OpportunityStore>, ttl: Duration) -> Result<Self, AppError> {
        let catalog = EntityCatalog::load(store.as_ref()).await?;
        tracing::info!(
            "📚 Catálogo carregado: {} empresas, {} parceiros, {} status, {} usuários",
            catalog.companies().len(),
            catalog.partners().len(),
            catalog.statuses().len(),
            catalog.users().len()
        );

        Ok(Self {
            store,
            ttl,
            inner: Arc::new(RwLock::new(CachedCatalog {
                catalog: Arc::new(catalog),
                loaded_at: Instant::now(),
                stale: false,
            })),
        })
    }

    pub async fn get(&self) -> Result<Arc<EntityCatalog>, AppError> {
        {
            let cached = self.inner.read().await;
            if !cached.stale && cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.catalog.clone());
            }
        }
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<Arc<EntityCatalog>, AppError> {
        let catalog = Arc::new(EntityCatalog::load(self.store.as_ref()).await?);
        let mut cached = self.inner.write().await;
        cached.catalog = catalog.clone();
        cached.loaded_at = Instant::now();
        cached.stale = false;
        tracing::debug!("Catálogo recarregado");
        Ok(catalog)
    }

    pub async fn invalidate(&self) {
        self.inner.write().await.stale = true;
    }

    // --- Escrita de dados de referência (sempre invalida o cache) ---

    pub async fn create_company(&self, name: &str) -> Result<GroupCompany, AppError> {
        let company = self.store.insert_company(name).await?;
        self.invalidate().await;
        Ok(company)
    }

    pub async fn create_partner(&self, partner: &NewPartner) -> Result<ExternalPartner, AppError> {
        let partner = self.store.insert_partner(partner).await?;
        self.invalidate().await;
        Ok(partner)
    }

    pub async fn create_status(&self, name: &str, position: i32) -> Result<StatusLabel, AppError> {
        let status = self.store.insert_status(name, position).await?;
        self.invalidate().await;
        Ok(status)
    }
}
