//! Commission reporting.
//!
//! Summaries are computed from already-loaded commission records.  The
//! leaderboard summarises every agent in parallel with [`rayon`].

use crate::bonus::round2;
use crate::models::{Commission, CommissionStatus};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSummary {
    pub agent_id: String,
    pub commission_count: usize,
    pub total_sales: f64,
    pub total_commission: f64,
    pub pending_amount: f64,
    pub approved_amount: f64,
    pub paid_amount: f64,
    pub average_commission: f64,
    /// Commission per calendar month of calculation, keyed `YYYY-MM`.
    pub by_month: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentStanding {
    pub rank: usize,
    pub agent_id: String,
    pub summary: CommissionSummary,
}

/// Summarises `records` for one agent.  Records belonging to other
/// agents are ignored.
pub fn summarize(agent_id: &str, records: &[Commission]) -> CommissionSummary {
    let mut summary = CommissionSummary {
        agent_id: agent_id.to_string(),
        ..CommissionSummary::default()
    };
    for record in records.iter().filter(|c| c.agent_id == agent_id) {
        summary.commission_count += 1;
        summary.total_sales += record.order_total;
        summary.total_commission += record.total_commission;
        match record.status {
            CommissionStatus::Pending => summary.pending_amount += record.total_commission,
            CommissionStatus::Approved => summary.approved_amount += record.total_commission,
            CommissionStatus::Paid => summary.paid_amount += record.total_commission,
        }
        *summary
            .by_month
            .entry(record.calculated_at.format("%Y-%m").to_string())
            .or_insert(0.0) += record.total_commission;
    }

    if summary.commission_count > 0 {
        summary.average_commission = round2(summary.total_commission / summary.commission_count as f64);
    }
    summary.total_sales = round2(summary.total_sales);
    summary.total_commission = round2(summary.total_commission);
    summary.pending_amount = round2(summary.pending_amount);
    summary.approved_amount = round2(summary.approved_amount);
    summary.paid_amount = round2(summary.paid_amount);
    for amount in summary.by_month.values_mut() {
        *amount = round2(*amount);
    }
    summary
}

/// Agents ranked by total commission, highest first; ties go to the
/// lexicographically smaller agent id.
pub fn leaderboard(records: &[Commission]) -> Vec<AgentStanding> {
    let mut by_agent: HashMap<&str, Vec<Commission>> = HashMap::new();
    for record in records {
        by_agent
            .entry(record.agent_id.as_str())
            .or_default()
            .push(record.clone());
    }

    let mut summaries: Vec<CommissionSummary> = by_agent
        .into_par_iter()
        .map(|(agent_id, records)| summarize(agent_id, &records))
        .collect();
    summaries.sort_by(|a, b| {
        b.total_commission
            .total_cmp(&a.total_commission)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });

    summaries
        .into_iter()
        .enumerate()
        .map(|(i, summary)| AgentStanding {
            rank: i + 1,
            agent_id: summary.agent_id.clone(),
            summary,
        })
        .collect()
}
