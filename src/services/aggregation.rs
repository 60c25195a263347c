// src/services/aggregation.rs

use crate::{
    models::{
        opportunity::{OpportunityCategory, OpportunityRecord, RejectedRecord, Routing},
        stats::{
            Aggregation, BucketRow, CompanyStatsRow, EntityStats, ExchangeMatrix, GroupBalance,
            PartnerStatsRow, TimeBuckets,
        },
    },
    services::{catalog::EntityCatalog, classifier},
};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];
const QUARTER_LABELS: [&str; 4] = ["T1", "T2", "T3", "T4"];

#[derive(Debug, Clone, Copy, Default)]
struct Counter {
    sent: u32,
    received: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    intragroup: u32,
    incoming: u32,
    outgoing: u32,
}

impl Bucket {
    fn add(&mut self, category: OpportunityCategory) {
        match category {
            OpportunityCategory::Intragroup => self.intragroup += 1,
            OpportunityCategory::IncomingExternal => self.incoming += 1,
            OpportunityCategory::OutgoingExternal => self.outgoing += 1,
        }
    }

    fn into_row(self, index: usize, label: &str) -> BucketRow {
        BucketRow {
            index: index as u32,
            label: label.to_string(),
            intragroup: self.intragroup,
            incoming: self.incoming,
            outgoing: self.outgoing,
            total: self.intragroup + self.incoming + self.outgoing,
        }
    }
}

/// Agrega as oportunidades em estatísticas por entidade, matriz de troca,
/// saldo externo do grupo e contagens por mês/trimestre de `year`.
///
/// Registros inconsistentes são pulados e devolvidos em `rejected`; entidades
/// do catálogo sem nenhuma oportunidade aparecem com contagem zero.
pub fn aggregate(records: &[OpportunityRecord], catalog: &EntityCatalog, year: i32) -> Aggregation {
    let company_count = catalog.companies().len();
    let mut companies = vec![Counter::default(); company_count];
    let mut partners = vec![Counter::default(); catalog.partners().len()];
    let mut cells = vec![vec![0u32; company_count]; company_count];
    let mut months = [Bucket::default(); 12];
    let mut quarters = [Bucket::default(); 4];
    let mut total_received = 0u32;
    let mut total_sent = 0u32;
    let mut rejected = Vec::new();

    for record in records {
        // A classificação valida a forma do registro e as referências
        if let Err(violation) = classifier::classify(record, catalog) {
            tracing::warn!("Oportunidade {} ignorada na agregação: {}", record.row.id, violation);
            rejected.push(RejectedRecord {
                opportunity_id: record.row.id,
                reason: violation.to_string(),
            });
            continue;
        }
        let Ok(routing) = record.routing() else {
            continue;
        };

        // Após classify, todas as posições existem no catálogo
        let company = |id| catalog.company_position(id);
        let partner = |id| catalog.partner_position(id);

        match &routing {
            Routing::Intragroup { origin_company_id, destination_company_id } => {
                if let (Some(origin), Some(destination)) =
                    (company(*origin_company_id), company(*destination_company_id))
                {
                    companies[origin].sent += 1;
                    companies[destination].received += 1;
                    cells[origin][destination] += 1;
                }
            }
            Routing::IncomingExternal { origin_partner_id, destination_company_id } => {
                total_received += 1;
                if let Some(origin) = partner(*origin_partner_id) {
                    partners[origin].sent += 1;
                }
                if let Some(destination) = company(*destination_company_id) {
                    companies[destination].received += 1;
                }
            }
            Routing::OutgoingExternal { origin_company_id, destination_partner_ids } => {
                total_sent += 1;
                if let Some(origin) = company(*origin_company_id) {
                    companies[origin].sent += 1;
                }
                for &partner_id in destination_partner_ids {
                    if let Some(destination) = partner(partner_id) {
                        partners[destination].received += 1;
                    }
                }
            }
        }

        if record.year() == year {
            let month = record.month0() as usize;
            months[month].add(routing.category());
            quarters[month / 3].add(routing.category());
        }
    }

    let per_company = catalog
        .companies()
        .iter()
        .zip(&companies)
        .map(|(c, counter)| EntityStats::new(c.id, &c.name, counter.sent, counter.received))
        .collect();

    let per_partner = catalog
        .partners()
        .iter()
        .zip(&partners)
        .map(|(p, counter)| EntityStats::new(p.id, &p.name, counter.sent, counter.received))
        .collect();

    Aggregation {
        per_company,
        per_partner,
        exchange_matrix: ExchangeMatrix {
            labels: catalog.companies().iter().map(|c| c.name.clone()).collect(),
            cells,
        },
        group_balance: GroupBalance::from_totals(total_received, total_sent),
        time_buckets: TimeBuckets {
            year,
            months: months
                .iter()
                .enumerate()
                .map(|(i, b)| b.into_row(i, MONTH_LABELS[i]))
                .collect(),
            quarters: quarters
                .iter()
                .enumerate()
                .map(|(i, b)| b.into_row(i, QUARTER_LABELS[i]))
                .collect(),
        },
        rejected,
    }
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Adaptador das linhas pré-agregadas do servidor para `EntityStats`.
/// Segue a ordem do catálogo, completa com zero e ignora ids desconhecidos.
pub fn company_stats_from_rows(rows: &[CompanyStatsRow], catalog: &EntityCatalog) -> Vec<EntityStats> {
    catalog
        .companies()
        .iter()
        .map(|c| {
            let (sent, received) = rows
                .iter()
                .find(|r| r.company_id == c.id)
                .map(|r| (count(r.sent), count(r.received)))
                .unwrap_or_default();
            EntityStats::new(c.id, &c.name, sent, received)
        })
        .collect()
}

pub fn partner_stats_from_rows(rows: &[PartnerStatsRow], catalog: &EntityCatalog) -> Vec<EntityStats> {
    catalog
        .partners()
        .iter()
        .map(|p| {
            let (sent, received) = rows
                .iter()
                .find(|r| r.partner_id == p.id)
                .map(|r| (count(r.sent), count(r.received)))
                .unwrap_or_default();
            EntityStats::new(p.id, &p.name, sent, received)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::fixtures::*;
    use uuid::Uuid;

    fn catalog(
        companies: Vec<crate::models::catalog::GroupCompany>,
        partners: Vec<crate::models::catalog::ExternalPartner>,
    ) -> EntityCatalog {
        EntityCatalog::new(companies, partners, vec![], vec![])
    }

    #[test]
    fn test_two_way_intragroup_exchange() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let records = vec![intragroup(alpha.id, beta.id), intragroup(beta.id, alpha.id)];
        let catalog = catalog(vec![alpha.clone(), beta.clone()], vec![]);

        let result = aggregate(&records, &catalog, 2025);

        let matrix = &result.exchange_matrix;
        assert_eq!(matrix.count("Alpha", "Alpha"), Some(0));
        assert_eq!(matrix.count("Alpha", "Beta"), Some(1));
        assert_eq!(matrix.count("Beta", "Alpha"), Some(1));
        assert_eq!(matrix.count("Beta", "Beta"), Some(0));

        assert_eq!(
            result.per_company,
            vec![
                EntityStats::new(alpha.id, "Alpha", 1, 1),
                EntityStats::new(beta.id, "Beta", 1, 1),
            ]
        );
        assert_eq!(result.per_company[0].balance, 0);
    }

    #[test]
    fn test_partner_sending_to_group_has_negative_balance() {
        let alpha = company("Alpha");
        let p1 = partner("P1");
        let records = vec![incoming(p1.id, alpha.id), incoming(p1.id, alpha.id)];
        let catalog = catalog(vec![alpha], vec![p1.clone()]);

        let result = aggregate(&records, &catalog, 2025);

        assert_eq!(result.per_partner, vec![EntityStats::new(p1.id, "P1", 2, 0)]);
        assert_eq!(result.per_partner[0].balance, -2);
    }

    #[test]
    fn test_outgoing_credits_every_linked_partner() {
        let alpha = company("Alpha");
        let p1 = partner("P1");
        let p2 = partner("P2");
        let records = vec![outgoing(alpha.id, vec![p1.id, p2.id])];
        let catalog = catalog(vec![alpha.clone()], vec![p1, p2]);

        let result = aggregate(&records, &catalog, 2025);

        assert_eq!(result.per_company[0].sent, 1);
        assert!(result.per_partner.iter().all(|p| p.received == 1 && p.sent == 0));
        assert_eq!(result.group_balance.total_sent, 1);
    }

    #[test]
    fn test_company_sent_sum_matches_origin_bearing_count() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let gamma = company("Gamma");
        let p1 = partner("P1");
        let records = vec![
            intragroup(alpha.id, beta.id),
            intragroup(gamma.id, alpha.id),
            outgoing(beta.id, vec![p1.id]),
            outgoing(beta.id, vec![]),
            incoming(p1.id, gamma.id),
        ];
        let catalog = catalog(vec![alpha, beta, gamma], vec![p1]);

        let result = aggregate(&records, &catalog, 2025);

        let sent: u32 = result.per_company.iter().map(|c| c.sent).sum();
        let origin_bearing = records
            .iter()
            .filter(|r| r.row.category != OpportunityCategory::IncomingExternal)
            .count() as u32;
        assert_eq!(sent, origin_bearing);
    }

    #[test]
    fn test_unused_entities_yield_zero_rows() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let p1 = partner("P1");
        let catalog = catalog(vec![alpha, beta], vec![p1]);

        let result = aggregate(&[], &catalog, 2025);

        assert_eq!(result.per_company.len(), 2);
        assert_eq!(result.per_partner.len(), 1);
        assert!(result.per_company.iter().all(|c| c.sent == 0 && c.received == 0));
        assert_eq!(result.exchange_matrix.cells, vec![vec![0, 0], vec![0, 0]]);
        assert_eq!(result.time_buckets.months.len(), 12);
        assert_eq!(result.time_buckets.quarters.len(), 4);
        assert_eq!(result.group_balance, GroupBalance::from_totals(0, 0));
    }

    #[test]
    fn test_invalid_records_are_skipped_and_reported() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let broken = record(
            OpportunityCategory::IncomingExternal,
            None,
            Some(alpha.id),
            None,
            vec![],
            date(2025, 2, 1),
        );
        let broken_id = broken.row.id;
        let records = vec![broken, intragroup(alpha.id, beta.id)];
        let catalog = catalog(vec![alpha, beta], vec![]);

        let result = aggregate(&records, &catalog, 2025);

        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].opportunity_id, broken_id);
        assert_eq!(result.per_company[1].received, 1);
        assert_eq!(result.group_balance.total_received, 0);
    }

    #[test]
    fn test_time_buckets_by_month_and_quarter_for_one_year() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let p1 = partner("P1");

        let mut jan = intragroup(alpha.id, beta.id);
        jan.row.sent_at = date(2025, 1, 15);
        let mut mar = incoming(p1.id, alpha.id);
        mar.row.sent_at = date(2025, 3, 31);
        let mut dec = outgoing(beta.id, vec![p1.id]);
        dec.row.sent_at = date(2025, 12, 1);
        let mut last_year = intragroup(beta.id, alpha.id);
        last_year.row.sent_at = date(2024, 1, 15);

        let catalog = catalog(vec![alpha, beta], vec![p1]);
        let result = aggregate(&[jan, mar, dec, last_year], &catalog, 2025);
        let buckets = &result.time_buckets;

        assert_eq!(buckets.year, 2025);
        assert_eq!(buckets.months[0].label, "Jan");
        assert_eq!(buckets.months[0].intragroup, 1);
        assert_eq!(buckets.months[0].total, 1);
        assert_eq!(buckets.months[2].incoming, 1);
        assert_eq!(buckets.months[11].outgoing, 1);
        assert_eq!(buckets.months[5].total, 0);

        assert_eq!(buckets.quarters[0].label, "T1");
        assert_eq!(buckets.quarters[0].total, 2);
        assert_eq!(buckets.quarters[3].total, 1);
        assert_eq!(buckets.quarters[1].total, 0);

        // Fora do ano, mas continua nas estatísticas por entidade
        assert_eq!(result.per_company[1].sent, 2);
    }

    #[test]
    fn test_percent_balance_rules() {
        assert_eq!(GroupBalance::from_totals(0, 0).percent_balance, 0.0);
        assert_eq!(GroupBalance::from_totals(3, 0).percent_balance, 100.0);
        assert_eq!(GroupBalance::from_totals(1, 4).percent_balance, 25.0);

        // Razão, não porcentagem do total: não há limite interno
        let over = GroupBalance::from_totals(6, 2);
        assert_eq!(over.percent_balance, 300.0);
        assert_eq!(over.balance, 4);
        assert_eq!(over.clamped_percent, 100.0);
        assert_eq!(GroupBalance::from_totals(1, 4).clamped_percent, 25.0);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let p1 = partner("P1");
        let records = vec![
            intragroup(alpha.id, beta.id),
            incoming(p1.id, beta.id),
            outgoing(alpha.id, vec![p1.id]),
        ];
        let catalog = catalog(vec![alpha, beta], vec![p1]);

        let first = aggregate(&records, &catalog, 2025);
        let second = aggregate(&records, &catalog, 2025);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_server_rows_adapter_zero_fills_and_ignores_unknown_ids() {
        let alpha = company("Alpha");
        let beta = company("Beta");
        let catalog = catalog(vec![alpha.clone(), beta.clone()], vec![]);
        let rows = vec![
            CompanyStatsRow { company_id: beta.id, sent: 3, received: 1 },
            CompanyStatsRow { company_id: Uuid::new_v4(), sent: 9, received: 9 },
        ];

        let stats = company_stats_from_rows(&rows, &catalog);

        assert_eq!(
            stats,
            vec![
                EntityStats::new(alpha.id, "Alpha", 0, 0),
                EntityStats::new(beta.id, "Beta", 3, 1),
            ]
        );
        assert_eq!(stats[1].balance, -2);
    }
}
