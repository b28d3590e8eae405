//! Storage collaborators.
//!
//! The engine never talks to a database directly.  It reads agents
//! through an [`AgentDirectory`] and reads/writes commission records
//! through a [`CommissionLedger`]; the document store behind them is
//! supplied by the host.  [`InMemoryStore`] implements both for the
//! standalone server and for tests.

use crate::error::{StoreError, StoreResult};
use crate::models::{Agent, Commission};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Inclusive bounds on `calculatedAt`.  Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// `Ok(None)` when no agent with this id exists.
    async fn get_agent(&self, agent_id: &str) -> StoreResult<Option<Agent>>;
}

#[async_trait]
pub trait CommissionLedger: Send + Sync {
    async fn agent_commissions(
        &self,
        agent_id: &str,
        range: Option<DateRange>,
    ) -> StoreResult<Vec<Commission>>;

    async fn commissions_between(&self, range: Option<DateRange>) -> StoreResult<Vec<Commission>>;

    async fn find_by_key(&self, idempotency_key: &str) -> StoreResult<Option<Commission>>;

    /// Persists a record and returns its generated id.  Implementations
    /// must refuse a second record with the same idempotency key.
    async fn save_commission(&self, commission: &Commission) -> StoreResult<String>;
}

#[derive(Default)]
struct Ledger {
    records: Vec<Commission>,
    by_key: HashMap<String, usize>,
}

/// Process-local store backing both collaborator traits.
#[derive(Default)]
pub struct InMemoryStore {
    agents: RwLock<HashMap<String, Agent>>,
    ledger: RwLock<Ledger>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        let map = agents.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            agents: RwLock::new(map),
            ledger: RwLock::default(),
        }
    }

    pub async fn insert_agent(&self, agent: Agent) {
        self.agents.write().await.insert(agent.id.clone(), agent);
    }

    pub async fn commission_count(&self) -> usize {
        self.ledger.read().await.records.len()
    }
}

#[async_trait]
impl AgentDirectory for InMemoryStore {
    async fn get_agent(&self, agent_id: &str) -> StoreResult<Option<Agent>> {
        Ok(self.agents.read().await.get(agent_id).cloned())
    }
}

#[async_trait]
impl CommissionLedger for InMemoryStore {
    async fn agent_commissions(
        &self,
        agent_id: &str,
        range: Option<DateRange>,
    ) -> StoreResult<Vec<Commission>> {
        let range = range.unwrap_or_default();
        let ledger = self.ledger.read().await;
        Ok(ledger
            .records
            .iter()
            .filter(|c| c.agent_id == agent_id && range.contains(c.calculated_at))
            .cloned()
            .collect())
    }

    async fn commissions_between(&self, range: Option<DateRange>) -> StoreResult<Vec<Commission>> {
        let range = range.unwrap_or_default();
        let ledger = self.ledger.read().await;
        Ok(ledger
            .records
            .iter()
            .filter(|c| range.contains(c.calculated_at))
            .cloned()
            .collect())
    }

    async fn find_by_key(&self, idempotency_key: &str) -> StoreResult<Option<Commission>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .by_key
            .get(idempotency_key)
            .map(|&index| ledger.records[index].clone()))
    }

    async fn save_commission(&self, commission: &Commission) -> StoreResult<String> {
        let mut ledger = self.ledger.write().await;
        if let Some(&index) = ledger.by_key.get(&commission.idempotency_key) {
            return Err(StoreError::Duplicate {
                key: commission.idempotency_key.clone(),
                existing_id: ledger.records[index].id.clone().unwrap_or_default(),
            });
        }
        let id = Uuid::new_v4().to_string();
        let mut record = commission.clone();
        record.id = Some(id.clone());
        let index = ledger.records.len();
        ledger.by_key.insert(record.idempotency_key.clone(), index);
        ledger.records.push(record);
        Ok(id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        idempotency_key, CommissionBreakdown, CommissionStatus, CustomerTier, OrderDetails,
    };
    use chrono::{NaiveDate, TimeZone};

    fn record(order_id: &str, agent_id: &str, day: u32) -> Commission {
        Commission {
            id: None,
            idempotency_key: idempotency_key(order_id, agent_id),
            order_id: order_id.into(),
            order_number: format!("#{order_id}"),
            agent_id: agent_id.into(),
            order_total: 100.0,
            commission_breakdown: CommissionBreakdown {
                base_rate: 0.05,
                base_commission: 5.0,
                volume_bonus: 0.0,
                product_bonus: 0.0,
                customer_bonus: 0.0,
                monthly_total: 0.0,
                volume_rate: 0.0,
                product_lines: Vec::new(),
                customer_tier: CustomerTier::Unknown,
            },
            total_commission: 5.0,
            currency: "MYR".into(),
            status: CommissionStatus::Pending,
            calculated_at: Utc.with_ymd_and_hms(2026, 5, day, 12, 0, 0).unwrap(),
            payout_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            order_details: OrderDetails::default(),
        }
    }

    #[tokio::test]
    async fn save_assigns_id_and_rejects_duplicate_keys() {
        let store = InMemoryStore::new();
        let id = store.save_commission(&record("1", "a-1", 3)).await.unwrap();
        assert!(!id.is_empty());

        let err = store.save_commission(&record("1", "a-1", 4)).await.unwrap_err();
        match err {
            StoreError::Duplicate { key, existing_id } => {
                assert_eq!(key, "1:a-1");
                assert_eq!(existing_id, id);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Same order for a different agent is a separate record.
        store.save_commission(&record("1", "a-2", 4)).await.unwrap();
        assert_eq!(store.commission_count().await, 2);

        let found = store.find_by_key("1:a-1").await.unwrap().unwrap();
        assert_eq!(found.id.as_deref(), Some(id.as_str()));
    }

    #[tokio::test]
    async fn agent_commissions_filter_by_inclusive_range() {
        let store = InMemoryStore::new();
        for (order, day) in [("1", 1), ("2", 15), ("3", 31)] {
            store.save_commission(&record(order, "a-1", day)).await.unwrap();
        }
        store.save_commission(&record("4", "a-2", 15)).await.unwrap();

        let range = DateRange::between(
            Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 15, 12, 0, 0).unwrap(),
        );
        let hits = store.agent_commissions("a-1", Some(range)).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|c| c.order_id.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);

        assert_eq!(store.agent_commissions("a-1", None).await.unwrap().len(), 3);
        assert_eq!(store.commissions_between(Some(range)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn agents_are_looked_up_by_id() {
        let store = InMemoryStore::with_agents([Agent::synthetic("a-1", 0.07)]);
        assert_eq!(
            store.get_agent("a-1").await.unwrap().unwrap().commission_rate,
            Some(0.07)
        );
        assert!(store.get_agent("missing").await.unwrap().is_none());
    }
}
