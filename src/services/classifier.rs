// src/services/classifier.rs

use std::collections::HashSet;

use crate::{
    common::error::IntegrityViolation,
    models::opportunity::{Classification, OpportunityRecord, Routing},
    services::catalog::EntityCatalog,
};

/// Confere um roteamento contra o catálogo: referências existentes,
/// origem != destino no intragrupo e parceiros sem repetição.
pub fn check_routing(routing: &Routing, catalog: &EntityCatalog) -> Result<(), IntegrityViolation> {
    let company = |id| {
        catalog
            .company(id)
            .map(|_| ())
            .ok_or(IntegrityViolation::UnknownCompany(id))
    };

    match routing {
        Routing::Intragroup { origin_company_id, destination_company_id } => {
            if origin_company_id == destination_company_id {
                return Err(IntegrityViolation::SameOriginAndDestination(*origin_company_id));
            }
            company(*origin_company_id)?;
            company(*destination_company_id)
        }
        Routing::IncomingExternal { origin_partner_id, destination_company_id } => {
            if catalog.partner(*origin_partner_id).is_none() {
                return Err(IntegrityViolation::UnknownPartner(*origin_partner_id));
            }
            company(*destination_company_id)
        }
        Routing::OutgoingExternal { origin_company_id, destination_partner_ids } => {
            company(*origin_company_id)?;
            let mut seen = HashSet::new();
            for &partner_id in destination_partner_ids {
                if !seen.insert(partner_id) {
                    return Err(IntegrityViolation::DuplicatePartner(partner_id));
                }
                if catalog.partner(partner_id).is_none() {
                    return Err(IntegrityViolation::UnknownPartner(partner_id));
                }
            }
            Ok(())
        }
    }
}

/// Classifica um registro cru: categoria + rótulos de origem e destino.
/// Função pura sobre o catálogo já carregado.
pub fn classify(
    record: &OpportunityRecord,
    catalog: &EntityCatalog,
) -> Result<Classification, IntegrityViolation> {
    let routing = record.routing()?;
    check_routing(&routing, catalog)?;

    // Depois do check_routing todas as referências existem
    let company_name = |id| catalog.company(id).map(|c| c.name.clone()).unwrap_or_default();
    let partner_name = |id| catalog.partner(id).map(|p| p.name.clone()).unwrap_or_default();

    let (origin_label, destination_label, missing_partners) = match &routing {
        Routing::Intragroup { origin_company_id, destination_company_id } => (
            company_name(*origin_company_id),
            company_name(*destination_company_id),
            false,
        ),
        Routing::IncomingExternal { origin_partner_id, destination_company_id } => (
            partner_name(*origin_partner_id),
            company_name(*destination_company_id),
            false,
        ),
        Routing::OutgoingExternal { origin_company_id, destination_partner_ids } => {
            let names: Vec<String> = destination_partner_ids
                .iter()
                .map(|&id| partner_name(id))
                .collect();
            (
                company_name(*origin_company_id),
                names.join(", "),
                destination_partner_ids.is_empty(),
            )
        }
    };

    Ok(Classification {
        opportunity_id: record.row.id,
        category: routing.category(),
        origin_label,
        destination_label,
        missing_partners,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::models::opportunity::OpportunityCategory;

    fn catalog_with(
        companies: &[&crate::models::catalog::GroupCompany],
        partners: &[&crate::models::catalog::ExternalPartner],
    ) -> EntityCatalog {
        EntityCatalog::new(
            companies.iter().map(|c| (*c).clone()).collect(),
            partners.iter().map(|p| (*p).clone()).collect(),
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_intragroup_labels_are_company_names() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let catalog = catalog_with(&[&alpha, &beta], &[]);

        let result = classify(&intragroup(alpha.id, beta.id), &catalog).unwrap();

        assert_eq!(result.category, OpportunityCategory::Intragroup);
        assert_eq!(result.origin_label, "Alpha");
        assert_eq!(result.destination_label, "Beta");
        assert!(!result.missing_partners);
    }

    #[test]
    fn test_incoming_labels_partner_to_company() {
        let alpha = company("Alpha");
        let p1 = partner("P1");
        let catalog = catalog_with(&[&alpha], &[&p1]);

        let result = classify(&incoming(p1.id, alpha.id), &catalog).unwrap();

        assert_eq!(result.category, OpportunityCategory::IncomingExternal);
        assert_eq!(result.origin_label, "P1");
        assert_eq!(result.destination_label, "Alpha");
    }

    #[test]
    fn test_outgoing_joins_partner_names() {
        let alpha = company("Alpha");
        let p1 = partner("P1");
        let p2 = partner("P2");
        let catalog = catalog_with(&[&alpha], &[&p1, &p2]);

        let result = classify(&outgoing(alpha.id, vec![p1.id, p2.id]), &catalog).unwrap();

        assert_eq!(result.origin_label, "Alpha");
        assert_eq!(result.destination_label, "P1, P2");
        assert!(!result.missing_partners);
    }

    #[test]
    fn test_outgoing_without_partners_is_flagged_not_rejected() {
        let alpha = company("Alpha");
        let catalog = catalog_with(&[&alpha], &[]);

        let result = classify(&outgoing(alpha.id, vec![]), &catalog).unwrap();

        assert_eq!(result.destination_label, "");
        assert!(result.missing_partners);
    }

    #[test]
    fn test_role_field_mismatch_is_integrity_error() {
        let alpha = company("Alpha");
        let p1 = partner("P1");
        let catalog = catalog_with(&[&alpha], &[&p1]);

        // Intragrupo sem destino
        let missing = record(
            OpportunityCategory::Intragroup,
            Some(alpha.id),
            None,
            None,
            vec![],
            date(2025, 1, 1),
        );
        assert_eq!(
            classify(&missing, &catalog),
            Err(IntegrityViolation::MissingRoleField {
                category: OpportunityCategory::Intragroup,
                field: "destination_company_id",
            })
        );

        // Entrada com empresa de origem preenchida
        let mut extra = incoming(p1.id, alpha.id);
        extra.row.origin_company_id = Some(alpha.id);
        assert_eq!(
            classify(&extra, &catalog),
            Err(IntegrityViolation::UnexpectedRoleField {
                category: OpportunityCategory::IncomingExternal,
                field: "origin_company_id",
            })
        );

        // Parceiros vinculados numa oportunidade intragrupo
        let mut linked = intragroup(alpha.id, alpha.id);
        linked.partner_ids.push(p1.id);
        assert_eq!(
            classify(&linked, &catalog),
            Err(IntegrityViolation::UnexpectedPartnerLinks(OpportunityCategory::Intragroup))
        );
    }

    #[test]
    fn test_same_origin_and_destination_is_rejected() {
        let alpha = company("Alpha");
        let catalog = catalog_with(&[&alpha], &[]);

        assert_eq!(
            classify(&intragroup(alpha.id, alpha.id), &catalog),
            Err(IntegrityViolation::SameOriginAndDestination(alpha.id))
        );
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let alpha = company("Alpha");
        let ghost = company("Ghost");
        let p1 = partner("P1");
        let catalog = catalog_with(&[&alpha], &[]);

        assert_eq!(
            classify(&intragroup(alpha.id, ghost.id), &catalog),
            Err(IntegrityViolation::UnknownCompany(ghost.id))
        );
        assert_eq!(
            classify(&outgoing(alpha.id, vec![p1.id]), &catalog),
            Err(IntegrityViolation::UnknownPartner(p1.id))
        );
    }

    #[test]
    fn test_check_routing_rejects_duplicate_partners() {
        let alpha = company("Alpha");
        let p1 = partner("P1");
        let catalog = catalog_with(&[&alpha], &[&p1]);

        let routing = Routing::OutgoingExternal {
            origin_company_id: alpha.id,
            destination_partner_ids: vec![p1.id, p1.id],
        };
        assert_eq!(
            check_routing(&routing, &catalog),
            Err(IntegrityViolation::DuplicatePartner(p1.id))
        );
    }

    #[test]
    fn test_exactly_one_label_pair_per_category() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let p1 = partner("P1");
        let catalog = catalog_with(&[&alpha, &beta], &[&p1]);

        let records = [
            intragroup(alpha.id, beta.id),
            incoming(p1.id, beta.id),
            outgoing(alpha.id, vec![p1.id]),
        ];
        for record in &records {
            let result = classify(record, &catalog).unwrap();
            assert_eq!(result.category, record.row.category);
            assert!(!result.origin_label.is_empty());
            assert!(!result.destination_label.is_empty());
        }
    }
}
