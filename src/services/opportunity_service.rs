// src/services/opportunity_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::{
        AppError, Compensation, IntegrityViolation, MutationOperation, MutationStep,
        PartialMutationError,
    },
    db::{self, OpportunityStore},
    models::opportunity::{
        Lead, LeadPatch, NewOpportunity, Observation, OpportunityCategory, OpportunityChanges,
        OpportunityDetail, OpportunityDraft, OpportunityFilter, OpportunityListing,
        OpportunityPatch, OpportunityRow, OpportunitySummary, RejectedRecord,
    },
    services::{
        catalog::{CatalogCache, EntityCatalog},
        classifier,
    },
};

/// Registro das etapas já concluídas de uma mutação.
struct Saga {
    operation: MutationOperation,
    opportunity_id: Option<Uuid>,
    lead_id: Option<Uuid>,
    completed: Vec<MutationStep>,
}

impl Saga {
    fn new(operation: MutationOperation) -> Self {
        Self { operation, opportunity_id: None, lead_id: None, completed: Vec::new() }
    }

    fn done(&mut self, step: MutationStep) {
        self.completed.push(step);
    }

    fn did(&self, step: MutationStep) -> bool {
        self.completed.contains(&step)
    }

    // Leituras não deixam nada para desfazer
    fn has_writes(&self) -> bool {
        self.completed
            .iter()
            .any(|s| !matches!(s, MutationStep::ResolveLead | MutationStep::FetchCurrent))
    }

    fn into_error(self, failed: MutationStep, source: AppError, compensation: Compensation) -> AppError {
        AppError::PartialMutation(PartialMutationError {
            operation: self.operation,
            opportunity_id: self.opportunity_id,
            lead_id: self.lead_id,
            completed: self.completed,
            failed,
            compensation,
            source: Box::new(source),
        })
    }
}

// Estado anterior usado para desfazer uma atualização
struct UpdateUndo {
    row: OpportunityRow,
    lead: Option<Lead>,
    links: Vec<Uuid>,
}

fn compensation_outcome(failures: Vec<String>) -> Compensation {
    if failures.is_empty() {
        Compensation::Completed
    } else {
        Compensation::Failed(failures.join("; "))
    }
}

#[derive(Clone)]
pub struct OpportunityService {
    store: Arc<dyn OpportunityStore>,
    catalog: CatalogCache,
}

impl OpportunityService {
    pub fn new(store: Arc<dyn OpportunityStore>, catalog: CatalogCache) -> Self {
        Self { store, catalog }
    }

    fn check_assignment(
        catalog: &EntityCatalog,
        status_id: Option<Uuid>,
        responsible_user_id: Option<Uuid>,
    ) -> Result<(), IntegrityViolation> {
        if let Some(id) = status_id {
            catalog.status(id).ok_or(IntegrityViolation::UnknownStatus(id))?;
        }
        if let Some(id) = responsible_user_id {
            catalog.user(id).ok_or(IntegrityViolation::UnknownUser(id))?;
        }
        Ok(())
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    /// Cria a oportunidade: (1) reaproveita ou insere o lead pelo nome da empresa,
    /// (2) insere a linha, (3) vincula os parceiros de destino quando for de saída.
    pub async fn create_opportunity(&self, draft: &OpportunityDraft) -> Result<Uuid, AppError> {
        let catalog = self.catalog.get().await?;
        classifier::check_routing(&draft.routing, &catalog)?;
        Self::check_assignment(&catalog, Some(draft.status_id), Some(draft.responsible_user_id))?;

        let mut saga = Saga::new(MutationOperation::Create);

        // 1. Lead: primeiro com o mesmo nome de empresa, senão um novo
        let existing = match self.store.find_lead_by_company(&draft.lead.company_name).await {
            Ok(lead) => lead,
            Err(e) => return Err(self.abort_create(saga, MutationStep::ResolveLead, e).await),
        };
        saga.done(MutationStep::ResolveLead);

        let lead_id = match existing {
            Some(lead) => {
                tracing::debug!("Lead '{}' reaproveitado ({})", lead.company_name, lead.id);
                lead.id
            }
            None => {
                let lead = match self.store.insert_lead(&draft.lead).await {
                    Ok(lead) => lead,
                    Err(e) => return Err(self.abort_create(saga, MutationStep::InsertLead, e).await),
                };
                saga.lead_id = Some(lead.id);
                saga.done(MutationStep::InsertLead);
                lead.id
            }
        };

        // 2. Oportunidade
        let new_opportunity = NewOpportunity {
            lead_id,
            routing: draft.routing.columns(),
            sent_at: draft.sent_at,
            responsible_user_id: draft.responsible_user_id,
            status_id: draft.status_id,
            details: draft.details.clone(),
        };
        let row = match self.store.insert_opportunity(&new_opportunity).await {
            Ok(row) => row,
            Err(e) => return Err(self.abort_create(saga, MutationStep::InsertOpportunity, e).await),
        };
        saga.opportunity_id = Some(row.id);
        saga.done(MutationStep::InsertOpportunity);

        // 3. Parceiros de destino
        let partner_ids = draft.routing.partner_ids();
        if !partner_ids.is_empty() {
            if let Err(e) = self.store.insert_partner_links(row.id, partner_ids).await {
                return Err(self.abort_create(saga, MutationStep::InsertPartnerLinks, e).await);
            }
            saga.done(MutationStep::InsertPartnerLinks);
        }

        tracing::info!(
            "✅ Oportunidade {} criada ({}, lead {})",
            row.id,
            row.category,
            lead_id
        );
        Ok(row.id)
    }

    // Desfaz o que a criação já gravou: vínculos, linha e o lead criado agora
    async fn abort_create(&self, saga: Saga, failed: MutationStep, source: AppError) -> AppError {
        if !saga.has_writes() {
            return source;
        }

        let mut failures = Vec::new();
        if let Some(opportunity_id) = saga.opportunity_id {
            if let Err(e) = self.store.delete_partner_links(opportunity_id).await {
                failures.push(format!("remover parceiros: {}", e));
            }
            if let Err(e) = self.store.delete_opportunity(opportunity_id).await {
                failures.push(format!("remover oportunidade: {}", e));
            }
        }
        if let Some(lead_id) = saga.lead_id {
            if let Err(e) = self.store.delete_lead(lead_id).await {
                failures.push(format!("remover lead: {}", e));
            }
        }

        let compensation = compensation_outcome(failures);
        tracing::warn!(
            "Criação interrompida em '{}' ({}); compensação: {:?}",
            failed,
            source,
            compensation
        );
        saga.into_error(failed, source, compensation)
    }

    // =========================================================================
    //  ATUALIZAÇÃO
    // =========================================================================

    /// Atualiza lead, linha e, se a categoria antiga ou nova for de saída,
    /// substitui por completo o conjunto de parceiros vinculados.
    pub async fn update_opportunity(&self, id: Uuid, patch: &OpportunityPatch) -> Result<(), AppError> {
        let catalog = self.catalog.get().await?;
        if let Some(routing) = &patch.routing {
            classifier::check_routing(routing, &catalog)?;
        }
        Self::check_assignment(&catalog, patch.status_id, patch.responsible_user_id)?;

        let mut saga = Saga::new(MutationOperation::Update);
        saga.opportunity_id = Some(id);

        // 1. Estado atual
        let current = self
            .store
            .find_opportunity(id)
            .await?
            .ok_or_else(|| AppError::not_found("Oportunidade"))?;
        saga.lead_id = Some(current.lead_id);

        let replace_links = patch.routing.as_ref().is_some_and(|routing| {
            current.category == OpportunityCategory::OutgoingExternal
                || routing.category() == OpportunityCategory::OutgoingExternal
        });
        let links = if replace_links {
            self.store.partner_links_for(id).await?
        } else {
            Vec::new()
        };
        let mut undo = UpdateUndo { row: current.clone(), lead: None, links };
        saga.done(MutationStep::FetchCurrent);

        // 2. Lead
        if let Some(lead_patch) = &patch.lead {
            let previous = match self.store.find_lead(current.lead_id).await {
                Ok(lead) => lead,
                Err(e) => return Err(self.abort_update(saga, undo, MutationStep::PatchLead, e).await),
            };
            undo.lead = previous;
            if let Err(e) = self.store.update_lead(current.lead_id, lead_patch).await {
                return Err(self.abort_update(saga, undo, MutationStep::PatchLead, e).await);
            }
            saga.done(MutationStep::PatchLead);
        }

        // 3. Linha da oportunidade
        let changes = OpportunityChanges {
            routing: patch.routing.as_ref().map(|r| r.columns()),
            sent_at: patch.sent_at,
            responsible_user_id: patch.responsible_user_id,
            status_id: patch.status_id,
            details: patch.details.clone(),
        };
        if !changes.is_empty() {
            if let Err(e) = self.store.update_opportunity(id, &changes).await {
                return Err(self.abort_update(saga, undo, MutationStep::PatchOpportunity, e).await);
            }
            saga.done(MutationStep::PatchOpportunity);
        }

        // 4. Parceiros: apaga tudo e reinsere (sem diff incremental)
        if let (true, Some(routing)) = (replace_links, &patch.routing) {
            if let Err(e) = self.store.delete_partner_links(id).await {
                return Err(self.abort_update(saga, undo, MutationStep::DeletePartnerLinks, e).await);
            }
            saga.done(MutationStep::DeletePartnerLinks);

            if let Err(e) = self.store.insert_partner_links(id, routing.partner_ids()).await {
                return Err(self.abort_update(saga, undo, MutationStep::InsertPartnerLinks, e).await);
            }
            saga.done(MutationStep::InsertPartnerLinks);
        }

        tracing::info!("✅ Oportunidade {} atualizada", id);
        Ok(())
    }

    // Restaura, em ordem inversa, o que a atualização já tinha gravado
    async fn abort_update(
        &self,
        saga: Saga,
        undo: UpdateUndo,
        failed: MutationStep,
        source: AppError,
    ) -> AppError {
        if !saga.has_writes() {
            return source;
        }

        let id = undo.row.id;
        let mut failures = Vec::new();

        if saga.did(MutationStep::DeletePartnerLinks) {
            let restored = async {
                self.store.delete_partner_links(id).await?;
                self.store.insert_partner_links(id, &undo.links).await
            };
            if let Err(e) = restored.await {
                failures.push(format!("restaurar parceiros: {}", e));
            }
        }
        if saga.did(MutationStep::PatchOpportunity) {
            let changes = OpportunityChanges::restore(&undo.row);
            if let Err(e) = self.store.update_opportunity(id, &changes).await {
                failures.push(format!("restaurar oportunidade: {}", e));
            }
        }
        if saga.did(MutationStep::PatchLead) {
            if let Some(lead) = &undo.lead {
                if let Err(e) = self.store.update_lead(lead.id, &LeadPatch::restore(lead)).await {
                    failures.push(format!("restaurar lead: {}", e));
                }
            }
        }

        let compensation = compensation_outcome(failures);
        tracing::warn!(
            "Atualização de {} interrompida em '{}' ({}); compensação: {:?}",
            id,
            failed,
            source,
            compensation
        );
        saga.into_error(failed, source, compensation)
    }

    // =========================================================================
    //  EXCLUSÃO
    // =========================================================================

    /// Remove observações, vínculos e a linha. O lead é mantido para histórico.
    pub async fn delete_opportunity(&self, id: Uuid) -> Result<(), AppError> {
        let mut saga = Saga::new(MutationOperation::Delete);
        saga.opportunity_id = Some(id);

        let current = self
            .store
            .find_opportunity(id)
            .await?
            .ok_or_else(|| AppError::not_found("Oportunidade"))?;
        saga.lead_id = Some(current.lead_id);
        saga.done(MutationStep::FetchCurrent);

        let steps = [
            MutationStep::DeleteObservations,
            MutationStep::DeletePartnerLinks,
            MutationStep::DeleteOpportunity,
        ];
        for step in steps {
            let result = match step {
                MutationStep::DeleteObservations => self.store.delete_observations(id).await,
                MutationStep::DeletePartnerLinks => self.store.delete_partner_links(id).await,
                _ => self.store.delete_opportunity(id).await,
            };
            if let Err(e) = result {
                // Repetir a exclusão converge; nada é recriado
                if !saga.has_writes() {
                    return Err(e);
                }
                tracing::warn!("Exclusão de {} interrompida em '{}': {}", id, step, e);
                return Err(saga.into_error(step, e, Compensation::NotAttempted));
            }
            saga.done(step);
        }

        tracing::info!("🗑️ Oportunidade {} removida (lead {} mantido)", id, current.lead_id);
        Ok(())
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    /// Linhas da tabela: classificadas, filtradas e com nomes resolvidos.
    /// Falha de leitura não vira erro HTTP: a listagem volta vazia com `error`.
    pub async fn list_opportunities(&self, filter: &OpportunityFilter) -> OpportunityListing {
        match self.compute_listing(filter).await {
            Ok(listing) => listing,
            Err(e) => {
                tracing::error!("Falha ao listar oportunidades: {}", e);
                OpportunityListing::degraded(e)
            }
        }
    }

    async fn compute_listing(&self, filter: &OpportunityFilter) -> Result<OpportunityListing, AppError> {
        let catalog = self.catalog.get().await?;
        let records = db::fetch_records(self.store.as_ref()).await?;
        let leads: HashMap<Uuid, String> = self
            .store
            .list_leads()
            .await?
            .into_iter()
            .map(|l| (l.id, l.company_name))
            .collect();

        let mut items = Vec::new();
        let mut rejected = Vec::new();

        let selected = records.iter().filter(|r| {
            filter.category.is_none_or(|c| r.row.category == c)
                && filter.status_id.is_none_or(|s| r.row.status_id == s)
                && filter.year.is_none_or(|y| r.year() == y)
        });

        for record in selected {
            match classifier::classify(record, &catalog) {
                Ok(classification) => items.push(OpportunitySummary {
                    classification,
                    sent_at: record.row.sent_at,
                    lead_company: leads.get(&record.row.lead_id).cloned(),
                    status_name: catalog.status(record.row.status_id).map(|s| s.name.clone()),
                    responsible_name: catalog
                        .user(record.row.responsible_user_id)
                        .map(|u| u.name.clone()),
                }),
                Err(violation) => {
                    tracing::warn!("Oportunidade {} inconsistente: {}", record.row.id, violation);
                    rejected.push(RejectedRecord {
                        opportunity_id: record.row.id,
                        reason: violation.to_string(),
                    });
                }
            }
        }

        Ok(OpportunityListing { items, rejected, error: None })
    }

    pub async fn get_opportunity(&self, id: Uuid) -> Result<OpportunityDetail, AppError> {
        let catalog = self.catalog.get().await?;
        let row = self
            .store
            .find_opportunity(id)
            .await?
            .ok_or_else(|| AppError::not_found("Oportunidade"))?;
        let partner_ids = self.store.partner_links_for(id).await?;
        let lead = self.store.find_lead(row.lead_id).await?;
        let observations = self.store.list_observations(id).await?;

        let record = crate::models::opportunity::OpportunityRecord {
            row: row.clone(),
            partner_ids: partner_ids.clone(),
        };
        // Registro inconsistente ainda é exibido, com o erro ao lado
        let (classification, integrity_error) = match classifier::classify(&record, &catalog) {
            Ok(c) => (Some(c), None),
            Err(violation) => (None, Some(violation.to_string())),
        };

        Ok(OpportunityDetail {
            status_name: catalog.status(row.status_id).map(|s| s.name.clone()),
            responsible_name: catalog.user(row.responsible_user_id).map(|u| u.name.clone()),
            row,
            partner_ids,
            lead,
            classification,
            integrity_error,
            observations,
        })
    }

    // =========================================================================
    //  OBSERVAÇÕES
    // =========================================================================

    pub async fn add_observation(&self, opportunity_id: Uuid, author_id: Uuid, body: &str) -> Result<Observation, AppError> {
        self.store
            .find_opportunity(opportunity_id)
            .await?
            .ok_or_else(|| AppError::not_found("Oportunidade"))?;

        self.store.insert_observation(opportunity_id, author_id, body).await
    }

    pub async fn list_observations(&self, opportunity_id: Uuid) -> Result<Vec<Observation>, AppError> {
        self.store
            .find_opportunity(opportunity_id)
            .await?
            .ok_or_else(|| AppError::not_found("Oportunidade"))?;

        self.store.list_observations(opportunity_id).await
    }
}
