//! Commission computation engine.
//!
//! The `engine` module turns an [`Order`] and an agent id into a
//! [`Commission`].  It resolves the agent's base rate, looks up the
//! agent's monthly volume, classifies the line items and checks the
//! customer's history, then records the result through the injected
//! [`CommissionLedger`].
//!
//! Only a malformed order or agent id fails a calculation.  Every
//! lookup or sub-calculation that goes wrong is logged and replaced by
//! its neutral value (synthetic agent, zero bonus, unsaved record) via
//! [`or_default`].
//!
//! The volume bonus reads commissions that are already persisted, so
//! the order being processed is not part of its own monthly total, and
//! two concurrent calculations for the same agent read the same total.
//! Callers that know the month's running total can pass it in through
//! [`CalculationOptions::monthly_total_override`].

use crate::bonus::{self, first_of_next_month, month_window, round2};
use crate::error::{CommissionError, CommissionResult};
use crate::models::{idempotency_key, Agent, Commission, CommissionBreakdown, CommissionStatus, Order, OrderDetails};
use crate::report::{self, AgentStanding, CommissionSummary};
use crate::rules::CommissionRules;
use crate::store::{AgentDirectory, CommissionLedger, DateRange};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call knobs for [`CommissionEngine::calculate_with`].
#[derive(Debug, Clone, Copy)]
pub struct CalculationOptions {
    /// Calculation time; defaults to the current time.  Drives
    /// `calculatedAt` and the payout date.
    pub now: Option<DateTime<Utc>>,
    /// Monthly total to pick the volume tier from instead of querying
    /// the ledger.
    pub monthly_total_override: Option<f64>,
    /// Whether to record the result in the ledger.
    pub persist: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            now: None,
            monthly_total_override: None,
            persist: true,
        }
    }
}

impl CalculationOptions {
    /// Options for estimates that must not leave a record behind.
    pub fn simulation() -> Self {
        Self {
            persist: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeBonus {
    pub monthly_total: f64,
    pub rate: f64,
    pub amount: f64,
}

/// Awaits `fut`, logging and substituting `default` on error.
pub async fn or_default<T, F>(component: &'static str, default: T, fut: F) -> T
where
    F: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(err) => {
            warn!(component, error = %err, "falling back to default");
            default
        }
    }
}

pub struct CommissionEngine {
    rules: Arc<CommissionRules>,
    agents: Arc<dyn AgentDirectory>,
    ledger: Arc<dyn CommissionLedger>,
}

impl CommissionEngine {
    pub fn new(
        rules: Arc<CommissionRules>,
        agents: Arc<dyn AgentDirectory>,
        ledger: Arc<dyn CommissionLedger>,
    ) -> Self {
        Self { rules, agents, ledger }
    }

    pub fn rules(&self) -> &CommissionRules {
        &self.rules
    }

    /// Loads the agent, or a synthetic profile at the default rate when
    /// the agent is unknown or the directory cannot be reached.
    pub async fn resolve_agent(&self, agent_id: &str) -> Agent {
        let fallback = Agent::synthetic(agent_id, self.rules.default_rate);
        or_default("rate_resolver", fallback, async {
            match self.agents.get_agent(agent_id).await? {
                Some(agent) => Ok(agent),
                None => {
                    info!(agent_id, "agent not found, using default rate");
                    Ok(Agent::synthetic(agent_id, self.rules.default_rate))
                }
            }
        })
        .await
    }

    pub fn base_rate(&self, agent: &Agent) -> f64 {
        agent
            .commission_rate
            .filter(|rate| rate.is_finite())
            .unwrap_or(self.rules.default_rate)
    }

    /// Sum of `orderTotal` over the agent's persisted commissions in the
    /// calendar month containing `at`.
    pub async fn monthly_total(&self, agent_id: &str, at: DateTime<Utc>) -> Result<f64> {
        let (start, end) = month_window(at);
        let records = self
            .ledger
            .agent_commissions(agent_id, Some(DateRange::between(start, end)))
            .await?;
        Ok(records.iter().map(|c| c.order_total).sum())
    }

    pub async fn volume_bonus(
        &self,
        agent_id: &str,
        order_date: DateTime<Utc>,
        monthly_total_override: Option<f64>,
    ) -> VolumeBonus {
        or_default("volume_bonus", VolumeBonus::default(), async {
            let monthly_total = match monthly_total_override {
                Some(total) => total,
                None => self.monthly_total(agent_id, order_date).await?,
            };
            let rate = bonus::volume_rate(&self.rules.volume_tiers, monthly_total);
            Ok(VolumeBonus {
                monthly_total,
                rate,
                amount: monthly_total * rate,
            })
        })
        .await
    }

    /// Calculates and records the commission for `order`.
    pub async fn calculate_order_commission(
        &self,
        order: &Order,
        agent_id: &str,
    ) -> CommissionResult<Commission> {
        self.calculate_with(order, agent_id, CalculationOptions::default())
            .await
    }

    pub async fn calculate_with(
        &self,
        order: &Order,
        agent_id: &str,
        options: CalculationOptions,
    ) -> CommissionResult<Commission> {
        validate(order, agent_id, &options)?;
        let now = options.now.unwrap_or_else(Utc::now);

        // Base commission from the agent's own or the default rate
        let agent = self.resolve_agent(agent_id).await;
        let base_rate = self.base_rate(&agent);
        let base_commission = order.total * base_rate;

        // Bonuses; each one degrades to zero on its own
        let volume = self
            .volume_bonus(agent_id, order.created_at, options.monthly_total_override)
            .await;
        let (product_bonus, product_lines) = or_default("product_bonus", (0.0, Vec::new()), async {
            bonus::product_bonus(&self.rules, &agent, &order.line_items)
        })
        .await;
        let (customer_bonus, customer_tier) =
            bonus::customer_bonus(&self.rules.customer_bonus, order.customer.as_ref());

        // Assemble the record; only the total is rounded
        let breakdown = CommissionBreakdown {
            base_rate,
            base_commission,
            volume_bonus: volume.amount,
            product_bonus,
            customer_bonus,
            monthly_total: volume.monthly_total,
            volume_rate: volume.rate,
            product_lines,
            customer_tier,
        };

        let mut commission = Commission {
            id: None,
            idempotency_key: idempotency_key(&order.id, agent_id),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            agent_id: agent_id.to_string(),
            order_total: order.total,
            total_commission: round2(breakdown.component_sum()),
            commission_breakdown: breakdown,
            currency: order.currency.clone(),
            status: CommissionStatus::Pending,
            calculated_at: now,
            payout_date: first_of_next_month(now.date_naive()),
            order_details: OrderDetails::from_order(order),
        };

        // Best-effort save; the caller gets the commission either way
        if options.persist {
            match self.ledger.save_commission(&commission).await {
                Ok(id) => commission.id = Some(id),
                Err(err) => warn!(
                    order_id = %order.id,
                    agent_id,
                    error = %err,
                    "commission calculated but not saved"
                ),
            }
        }

        info!(
            order_id = %order.id,
            agent_id,
            total = commission.total_commission,
            persisted = commission.id.is_some(),
            "commission calculated"
        );
        Ok(commission)
    }

    /// Returns the recorded commission for this (order, agent) pair if
    /// there is one, otherwise calculates and records it.
    pub async fn calculate_for_existing_order(
        &self,
        order: &Order,
        agent_id: &str,
    ) -> CommissionResult<Commission> {
        validate(order, agent_id, &CalculationOptions::default())?;
        let key = idempotency_key(&order.id, agent_id);
        match self.ledger.find_by_key(&key).await {
            Ok(Some(existing)) => {
                debug!(key = %key, "commission already recorded");
                return Ok(existing);
            }
            Ok(None) if order.commission_calculated => {
                warn!(key = %key, "order flagged as calculated but no record found, recalculating");
            }
            Ok(None) => {}
            Err(err) => warn!(key = %key, error = %err, "existing commission lookup failed"),
        }
        self.calculate_order_commission(order, agent_id).await
    }

    pub async fn agent_commissions(
        &self,
        agent_id: &str,
        range: Option<DateRange>,
    ) -> CommissionResult<Vec<Commission>> {
        Ok(self.ledger.agent_commissions(agent_id, range).await?)
    }

    pub async fn agent_summary(
        &self,
        agent_id: &str,
        range: Option<DateRange>,
    ) -> CommissionResult<CommissionSummary> {
        let records = self.ledger.agent_commissions(agent_id, range).await?;
        Ok(report::summarize(agent_id, &records))
    }

    pub async fn leaderboard(&self, range: Option<DateRange>) -> CommissionResult<Vec<AgentStanding>> {
        let records = self.ledger.commissions_between(range).await?;
        Ok(report::leaderboard(&records))
    }
}

fn validate(order: &Order, agent_id: &str, options: &CalculationOptions) -> CommissionResult<()> {
    if agent_id.trim().is_empty() {
        return Err(CommissionError::InvalidInput("agent id is required".into()));
    }
    if order.id.trim().is_empty() {
        return Err(CommissionError::InvalidOrder("order id is required".into()));
    }
    if !order.total.is_finite() || order.total < 0.0 {
        return Err(CommissionError::InvalidOrder(format!(
            "order {} has an invalid total {}",
            order.id, order.total
        )));
    }
    if let Some(total) = options.monthly_total_override {
        if !total.is_finite() || total < 0.0 {
            return Err(CommissionError::InvalidInput(format!("invalid monthly total {total}")));
        }
    }
    Ok(())
}
