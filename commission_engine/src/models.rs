//! Data models for the Commission Engine.
//!
//! The `models` module defines the serialisable structs and enums
//! exchanged with the surrounding order-sync and storage layers:
//! orders, agents and the commission records this crate produces.
//! Field names are camelCase on the wire so the types line up with the
//! JSON documents the rest of the system reads and writes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An order as synchronised from the shop.  Read-only to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Store-assigned order identifier.
    pub id: String,
    /// Human-facing order number, e.g. `"#1042"`.
    #[serde(default)]
    pub order_number: String,
    /// Total amount charged for the order.
    pub total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    /// Set by the order-sync layer once a commission has been recorded
    /// for this order.
    #[serde(default)]
    pub commission_calculated: bool,
}

fn default_currency() -> String {
    "MYR".to_string()
}

/// A single product line on an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    pub quantity: u32,
    /// Unit price.
    pub price: f64,
    #[serde(default)]
    pub sku: Option<String>,
}

/// Customer snapshot embedded in an [`Order`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Lifetime order count, including the order being processed.
    #[serde(default)]
    pub orders_count: Option<u32>,
    #[serde(default)]
    pub total_spent: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Inactive,
}

/// A sales agent entitled to commission on assigned orders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Commission rate as a fraction (0.05 = 5%).  When absent the
    /// engine's default rate applies.
    #[serde(default)]
    pub commission_rate: Option<f64>,
    #[serde(default = "unknown_territory")]
    pub territory: String,
    /// Per-category rate overrides keyed by category label
    /// (e.g. `"Batik Fabric"`).
    #[serde(default)]
    pub product_bonuses: HashMap<String, f64>,
    #[serde(default)]
    pub status: AgentStatus,
}

fn unknown_territory() -> String {
    "Unknown".to_string()
}

impl Agent {
    /// Profile used when no agent record can be loaded.
    pub fn synthetic(id: impl Into<String>, default_rate: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            commission_rate: Some(default_rate),
            territory: unknown_territory(),
            product_bonuses: HashMap::new(),
            status: AgentStatus::Active,
        }
    }
}

/// Product bonus categories.  Serialised as their display labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductCategory {
    #[serde(rename = "Batik Fabric")]
    BatikFabric,
    #[serde(rename = "Baju Melayu")]
    BajuMelayu,
    #[serde(rename = "Kurung Batik")]
    KurungBatik,
    #[serde(rename = "Premium Cotton")]
    PremiumCotton,
    #[serde(rename = "Satin Valentino")]
    SatinValentino,
    #[serde(rename = "Traditional Wear")]
    TraditionalWear,
    #[serde(rename = "Bulk Orders")]
    BulkOrders,
}

impl ProductCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::BatikFabric => "Batik Fabric",
            ProductCategory::BajuMelayu => "Baju Melayu",
            ProductCategory::KurungBatik => "Kurung Batik",
            ProductCategory::PremiumCotton => "Premium Cotton",
            ProductCategory::SatinValentino => "Satin Valentino",
            ProductCategory::TraditionalWear => "Traditional Wear",
            ProductCategory::BulkOrders => "Bulk Orders",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which customer bonus bracket an order fell into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    /// No customer, no identifier or no order count on record.
    Unknown,
    New,
    Loyal,
    Repeat,
    Standard,
}

/// Bonus contribution of one line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductBonusLine {
    pub title: String,
    pub quantity: u32,
    pub category: Option<ProductCategory>,
    pub rate: f64,
    pub amount: f64,
}

/// Every component of a commission, stored individually for audit.
/// Values are unrounded; only [`Commission::total_commission`] is
/// rounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    pub base_rate: f64,
    pub base_commission: f64,
    pub volume_bonus: f64,
    pub product_bonus: f64,
    pub customer_bonus: f64,
    /// Monthly order total the volume tier was selected from.
    pub monthly_total: f64,
    pub volume_rate: f64,
    #[serde(default)]
    pub product_lines: Vec<ProductBonusLine>,
    pub customer_tier: CustomerTier,
}

impl CommissionBreakdown {
    pub fn component_sum(&self) -> f64 {
        self.base_commission + self.volume_bonus + self.product_bonus + self.customer_bonus
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    /// The only status this engine ever assigns.
    #[default]
    Pending,
    Approved,
    Paid,
}

/// Order fields copied onto the commission for reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub item_count: usize,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
}

impl OrderDetails {
    pub fn from_order(order: &Order) -> Self {
        let customer = order.customer.as_ref();
        Self {
            customer_name: customer.and_then(|c| c.name.clone()),
            customer_email: customer.and_then(|c| c.email.clone()),
            item_count: order.line_items.len(),
            financial_status: order.financial_status.clone(),
            fulfillment_status: order.fulfillment_status.clone(),
        }
    }
}

/// Commission owed to an agent for one order.  Created once per
/// calculation and never mutated by this crate afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    /// Identifier assigned by the ledger; `None` until persisted.
    #[serde(default)]
    pub id: Option<String>,
    pub idempotency_key: String,
    pub order_id: String,
    pub order_number: String,
    pub agent_id: String,
    pub order_total: f64,
    pub commission_breakdown: CommissionBreakdown,
    pub total_commission: f64,
    pub currency: String,
    #[serde(default)]
    pub status: CommissionStatus,
    pub calculated_at: DateTime<Utc>,
    pub payout_date: NaiveDate,
    #[serde(default)]
    pub order_details: OrderDetails,
}

/// Deterministic key identifying the commission for an (order, agent)
/// pair.  The ledger keeps at most one record per key.
pub fn idempotency_key(order_id: &str, agent_id: &str) -> String {
    format!("{order_id}:{agent_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_deserializes_from_camel_case_json() {
        let order: Order = serde_json::from_value(json!({
            "id": "5001",
            "orderNumber": "#1001",
            "total": 88.0,
            "createdAt": "2026-03-14T08:30:00Z",
            "lineItems": [{"title": "Kurung Batik Alana", "quantity": 1, "price": 88.0}],
            "customer": {"id": "c-1", "name": "Siti", "ordersCount": 1}
        }))
        .unwrap();
        assert_eq!(order.currency, "MYR");
        assert_eq!(order.line_items[0].quantity, 1);
        assert_eq!(order.customer.unwrap().orders_count, Some(1));
        assert!(!order.commission_calculated);
    }

    #[test]
    fn agent_defaults_fill_missing_fields() {
        let agent: Agent = serde_json::from_value(json!({"id": "a-1"})).unwrap();
        assert_eq!(agent.commission_rate, None);
        assert_eq!(agent.territory, "Unknown");
        assert!(agent.product_bonuses.is_empty());
        assert_eq!(agent.status, AgentStatus::Active);
    }

    #[test]
    fn category_serializes_as_label() {
        let value = serde_json::to_value(ProductCategory::BulkOrders).unwrap();
        assert_eq!(value, json!("Bulk Orders"));
        assert_eq!(ProductCategory::SatinValentino.to_string(), "Satin Valentino");
    }
}
