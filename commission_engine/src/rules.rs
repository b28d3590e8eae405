//! Commission rule tables.
//!
//! The `rules` module holds every number and keyword the engine uses:
//! the default base rate, the monthly volume tiers, the ordered product
//! category rules with their rates, and the customer bonus brackets.
//! A [`CommissionRules`] value is built once (from [`Default`] or a
//! JSON file) and handed to the engine, so callers and tests can vary
//! the tables without touching code.

use crate::error::ConfigError;
use crate::models::ProductCategory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A monthly volume bracket.  The bonus rate applies to the whole
/// monthly total once `monthly_total >= min_total`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeTier {
    pub min_total: f64,
    pub rate: f64,
}

/// How a line item is matched against a category rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ItemMatcher {
    /// The item's own quantity is at least `min`.
    MinQuantity { min: u32 },
    /// The item title contains any keyword, ignoring case.
    TitleContains { keywords: Vec<String> },
}

impl ItemMatcher {
    fn title_contains<const N: usize>(keywords: [&str; N]) -> Self {
        ItemMatcher::TitleContains {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRule {
    pub matcher: ItemMatcher,
    pub category: ProductCategory,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTier {
    pub min_orders: u32,
    pub bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBonusRules {
    /// Customers with at most this many lifetime orders count as new.
    pub new_customer_max_orders: u32,
    pub new_customer_bonus: f64,
    pub loyalty_tiers: Vec<LoyaltyTier>,
}

impl Default for CustomerBonusRules {
    fn default() -> Self {
        Self {
            new_customer_max_orders: 1,
            new_customer_bonus: 50.0,
            loyalty_tiers: vec![
                LoyaltyTier { min_orders: 10, bonus: 20.0 },
                LoyaltyTier { min_orders: 5, bonus: 10.0 },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRules {
    pub default_rate: f64,
    pub volume_tiers: Vec<VolumeTier>,
    /// Evaluated in order; the first matching rule decides the category.
    pub category_rules: Vec<CategoryRule>,
    pub category_rates: BTreeMap<ProductCategory, f64>,
    pub customer_bonus: CustomerBonusRules,
}

impl Default for CommissionRules {
    fn default() -> Self {
        use ProductCategory::*;

        let category_rules = vec![
            CategoryRule {
                matcher: ItemMatcher::MinQuantity { min: 5 },
                category: BulkOrders,
            },
            CategoryRule {
                matcher: ItemMatcher::title_contains(["baju melayu", "adam tradisional", "muhammad"]),
                category: BajuMelayu,
            },
            CategoryRule {
                matcher: ItemMatcher::title_contains(["kurung batik", "alana", "sedondon"]),
                category: KurungBatik,
            },
            CategoryRule {
                matcher: ItemMatcher::title_contains(["tradisional", "pesak", "cekak musang"]),
                category: TraditionalWear,
            },
            CategoryRule {
                matcher: ItemMatcher::title_contains(["satin valentino", "satin paloma"]),
                category: SatinValentino,
            },
            CategoryRule {
                matcher: ItemMatcher::title_contains(["cotton", "premium", "eksklusif"]),
                category: PremiumCotton,
            },
            CategoryRule {
                matcher: ItemMatcher::title_contains(["batik", "fabric", "kain"]),
                category: BatikFabric,
            },
        ];

        let category_rates = BTreeMap::from([
            (BatikFabric, 0.01),
            (BajuMelayu, 0.025),
            (KurungBatik, 0.025),
            (PremiumCotton, 0.015),
            (SatinValentino, 0.02),
            (TraditionalWear, 0.03),
            (BulkOrders, 0.015),
        ]);

        Self {
            default_rate: 0.05,
            volume_tiers: vec![
                VolumeTier { min_total: 10_000.0, rate: 0.02 },
                VolumeTier { min_total: 5_000.0, rate: 0.015 },
                VolumeTier { min_total: 2_000.0, rate: 0.01 },
                VolumeTier { min_total: 1_000.0, rate: 0.005 },
            ],
            category_rules,
            category_rates,
            customer_bonus: CustomerBonusRules::default(),
        }
    }
}

impl CommissionRules {
    /// Rejects rates outside `[0, 1]` and negative or non-finite
    /// thresholds and bonuses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("defaultRate", self.default_rate)?;
        for tier in &self.volume_tiers {
            check_amount("volumeTiers.minTotal", tier.min_total)?;
            check_rate("volumeTiers.rate", tier.rate)?;
        }
        for (category, rate) in &self.category_rates {
            check_rate(category.label(), *rate)?;
        }
        for rule in &self.category_rules {
            if let ItemMatcher::TitleContains { keywords } = &rule.matcher {
                if keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err(ConfigError::InvalidRules(format!(
                        "empty keyword in rule for {}",
                        rule.category
                    )));
                }
            }
        }
        check_amount("customerBonus.newCustomerBonus", self.customer_bonus.new_customer_bonus)?;
        for tier in &self.customer_bonus.loyalty_tiers {
            check_amount("customerBonus.loyaltyTiers.bonus", tier.bonus)?;
        }
        Ok(())
    }

    /// Rate for a category, ignoring agent overrides.  Categories
    /// missing from the table earn nothing.
    pub fn category_rate(&self, category: ProductCategory) -> f64 {
        self.category_rates.get(&category).copied().unwrap_or(0.0)
    }
}

fn check_rate(name: &str, rate: f64) -> Result<(), ConfigError> {
    if rate.is_finite() && (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRules(format!("{name} must be within [0, 1], got {rate}")))
    }
}

fn check_amount(name: &str, amount: f64) -> Result<(), ConfigError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRules(format!("{name} must be a non-negative number, got {amount}")))
    }
}

/// Load and validate rules from a JSON file.
pub fn load_rules_from_file(path: &Path) -> Result<CommissionRules, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let rules: CommissionRules = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    rules.validate()?;
    Ok(rules)
}
