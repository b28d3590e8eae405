//! Pure bonus calculations.
//!
//! Nothing in this module touches storage: each function takes the
//! already-loaded inputs plus the [`CommissionRules`] tables and
//! returns an amount together with the detail recorded on the
//! commission breakdown.

use crate::models::{Agent, Customer, CustomerTier, LineItem, ProductBonusLine, ProductCategory};
use crate::rules::{CategoryRule, CommissionRules, CustomerBonusRules, ItemMatcher, VolumeTier};
use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Rounds a currency amount to two decimal places.
pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Bonus rate of the highest tier the monthly total reaches, or 0.
///
/// Tiers are compared from the highest threshold down regardless of
/// the order they are configured in, so a total sitting exactly on a
/// threshold gets that tier.
pub fn volume_rate(tiers: &[VolumeTier], monthly_total: f64) -> f64 {
    let mut ordered: Vec<&VolumeTier> = tiers.iter().collect();
    ordered.sort_by(|a, b| b.min_total.total_cmp(&a.min_total));
    ordered
        .into_iter()
        .find(|tier| monthly_total >= tier.min_total)
        .map(|tier| tier.rate)
        .unwrap_or(0.0)
}

impl ItemMatcher {
    pub fn matches(&self, item: &LineItem, lowercase_title: &str) -> bool {
        match self {
            ItemMatcher::MinQuantity { min } => item.quantity >= *min,
            ItemMatcher::TitleContains { keywords } => keywords
                .iter()
                .any(|keyword| lowercase_title.contains(&keyword.to_lowercase())),
        }
    }
}

/// First category whose rule matches the item, if any.
pub fn categorize(rules: &[CategoryRule], item: &LineItem) -> Option<ProductCategory> {
    let title = item.title.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.matcher.matches(item, &title))
        .map(|rule| rule.category)
}

/// Rate for `category`, preferring the agent's own override.
pub fn category_rate(rules: &CommissionRules, agent: &Agent, category: ProductCategory) -> f64 {
    agent
        .product_bonuses
        .get(category.label())
        .copied()
        .unwrap_or_else(|| rules.category_rate(category))
}

/// Sum of per-line product bonuses.  Each line is classified on its
/// own; quantities are never aggregated across lines.
pub fn product_bonus(
    rules: &CommissionRules,
    agent: &Agent,
    items: &[LineItem],
) -> Result<(f64, Vec<ProductBonusLine>)> {
    let mut total = 0.0;
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let category = categorize(&rules.category_rules, item);
        let rate = category
            .map(|c| category_rate(rules, agent, c))
            .unwrap_or(0.0);
        let amount = item.price * f64::from(item.quantity) * rate;
        if !amount.is_finite() {
            bail!("line item {:?} produced a non-finite bonus", item.title);
        }
        total += amount;
        lines.push(ProductBonusLine {
            title: item.title.clone(),
            quantity: item.quantity,
            category,
            rate,
            amount,
        });
    }
    Ok((total, lines))
}

/// Flat bonus from the customer's lifetime order count.  The new
/// customer check runs before the loyalty brackets.
pub fn customer_bonus(rules: &CustomerBonusRules, customer: Option<&Customer>) -> (f64, CustomerTier) {
    let Some(customer) = customer else {
        return (0.0, CustomerTier::Unknown);
    };
    if customer.id.as_deref().map_or(true, str::is_empty) {
        return (0.0, CustomerTier::Unknown);
    }
    let Some(orders) = customer.orders_count else {
        return (0.0, CustomerTier::Unknown);
    };

    if orders <= rules.new_customer_max_orders {
        return (rules.new_customer_bonus, CustomerTier::New);
    }

    let mut tiers: Vec<_> = rules.loyalty_tiers.iter().collect();
    tiers.sort_by(|a, b| b.min_orders.cmp(&a.min_orders));
    // Only the top bracket is "loyal"; anything lower is a repeat buyer.
    match tiers.iter().position(|tier| orders >= tier.min_orders) {
        Some(0) => (tiers[0].bonus, CustomerTier::Loyal),
        Some(i) => (tiers[i].bonus, CustomerTier::Repeat),
        None => (0.0, CustomerTier::Standard),
    }
}

/// First and last calendar day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first_of_next_month(date).pred_opt().unwrap_or(date);
    (first, last)
}

/// First day of the month after the one containing `date`.
pub fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Inclusive UTC instant range covering the calendar month of `at`.
pub fn month_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (first, _) = month_bounds(at.date_naive());
    let start = Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN));
    let next = Utc.from_utc_datetime(&first_of_next_month(first).and_time(NaiveTime::MIN));
    (start, next - Duration::milliseconds(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn item(title: &str, quantity: u32, price: f64) -> LineItem {
        LineItem {
            title: title.into(),
            vendor: None,
            quantity,
            price,
            sku: None,
        }
    }

    fn customer(orders: Option<u32>) -> Customer {
        Customer {
            id: Some("c-1".into()),
            orders_count: orders,
            ..Customer::default()
        }
    }

    #[test]
    fn volume_tier_boundaries_pick_the_higher_tier() {
        let tiers = CommissionRules::default().volume_tiers;
        assert_eq!(volume_rate(&tiers, 999.99), 0.0);
        assert_eq!(volume_rate(&tiers, 1_000.0), 0.005);
        assert_eq!(volume_rate(&tiers, 2_000.0), 0.01);
        assert_eq!(volume_rate(&tiers, 4_999.99), 0.01);
        assert_eq!(volume_rate(&tiers, 5_000.0), 0.015);
        assert_eq!(volume_rate(&tiers, 10_000.0), 0.02);
        assert_eq!(volume_rate(&tiers, 250_000.0), 0.02);
    }

    #[test]
    fn volume_rate_is_monotonic_even_when_tiers_are_unsorted() {
        let mut tiers = CommissionRules::default().volume_tiers;
        tiers.reverse();
        let mut previous = 0.0;
        for total in (0..12_000).step_by(250) {
            let rate = volume_rate(&tiers, total as f64);
            assert!(rate >= previous, "rate dropped at {total}");
            previous = rate;
        }
        assert_eq!(volume_rate(&tiers, 10_000.0), 0.02);
    }

    #[test]
    fn categorize_follows_rule_priority() {
        let rules = CommissionRules::default().category_rules;
        use ProductCategory::*;
        assert_eq!(categorize(&rules, &item("Baju Melayu Cekak Musang", 1, 1.0)), Some(BajuMelayu));
        assert_eq!(categorize(&rules, &item("KURUNG BATIK Sedondon", 1, 1.0)), Some(KurungBatik));
        assert_eq!(categorize(&rules, &item("Samping Pesak", 1, 1.0)), Some(TraditionalWear));
        assert_eq!(categorize(&rules, &item("Satin Paloma Shawl", 1, 1.0)), Some(SatinValentino));
        assert_eq!(categorize(&rules, &item("Eksklusif Kain Pasang", 1, 1.0)), Some(PremiumCotton));
        assert_eq!(categorize(&rules, &item("Kain Batik Lepas", 1, 1.0)), Some(BatikFabric));
        assert_eq!(categorize(&rules, &item("Gift Card", 1, 1.0)), None);
    }

    #[test]
    fn bulk_quantity_wins_over_title_keywords() {
        let rules = CommissionRules::default().category_rules;
        assert_eq!(
            categorize(&rules, &item("Kain Batik Lepas", 5, 10.0)),
            Some(ProductCategory::BulkOrders)
        );
        assert_eq!(
            categorize(&rules, &item("Basic Cotton Scarf", 5, 10.0)),
            Some(ProductCategory::BulkOrders)
        );
        assert_eq!(
            categorize(&rules, &item("Basic Cotton Scarf", 4, 10.0)),
            Some(ProductCategory::PremiumCotton)
        );
    }

    #[test]
    fn product_bonus_sums_lines_independently() {
        let rules = CommissionRules::default();
        let agent = Agent::synthetic("a-1", rules.default_rate);
        let items = vec![
            item("Kurung Batik Alana", 1, 88.0),
            item("Kain Batik", 3, 20.0),
            item("Kain Batik", 2, 20.0),
            item("Gift Card", 1, 50.0),
        ];
        let (total, lines) = product_bonus(&rules, &agent, &items).unwrap();
        // 88 * 2.5% + 60 * 1% + 40 * 1%; no bulk despite 5 units overall.
        assert!((total - 3.2).abs() < 1e-9);
        assert_eq!(lines[1].category, Some(ProductCategory::BatikFabric));
        assert_eq!(lines[3].category, None);
        assert_eq!(lines[3].amount, 0.0);
    }

    #[test]
    fn agent_override_replaces_only_its_category() {
        let rules = CommissionRules::default();
        let mut agent = Agent::synthetic("a-1", rules.default_rate);
        agent.product_bonuses.insert("Batik Fabric".into(), 0.04);
        let items = vec![item("Kain Batik", 1, 100.0), item("Satin Valentino", 1, 100.0)];
        let (total, lines) = product_bonus(&rules, &agent, &items).unwrap();
        assert_eq!(lines[0].rate, 0.04);
        assert_eq!(lines[1].rate, 0.02);
        assert!((total - 6.0).abs() < 1e-9);
    }

    #[test]
    fn product_bonus_rejects_non_finite_prices() {
        let rules = CommissionRules::default();
        let agent = Agent::synthetic("a-1", rules.default_rate);
        let items = vec![item("Kain Batik", 1, f64::INFINITY)];
        assert!(product_bonus(&rules, &agent, &items).is_err());
    }

    #[test]
    fn customer_bonus_brackets() {
        let rules = CustomerBonusRules::default();
        assert_eq!(customer_bonus(&rules, None), (0.0, CustomerTier::Unknown));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(0)))), (50.0, CustomerTier::New));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(1)))), (50.0, CustomerTier::New));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(2)))), (0.0, CustomerTier::Standard));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(4)))), (0.0, CustomerTier::Standard));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(5)))), (10.0, CustomerTier::Repeat));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(9)))), (10.0, CustomerTier::Repeat));
        assert_eq!(customer_bonus(&rules, Some(&customer(Some(10)))), (20.0, CustomerTier::Loyal));
        assert_eq!(customer_bonus(&rules, Some(&customer(None))), (0.0, CustomerTier::Unknown));
    }

    #[test]
    fn customer_without_id_earns_nothing() {
        let rules = CustomerBonusRules::default();
        let anonymous = Customer {
            orders_count: Some(1),
            ..Customer::default()
        };
        assert_eq!(customer_bonus(&rules, Some(&anonymous)).0, 0.0);
    }

    #[test]
    fn month_bounds_handle_year_end_and_leap_years() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(month_bounds(d(2026, 12, 15)), (d(2026, 12, 1), d(2026, 12, 31)));
        assert_eq!(month_bounds(d(2028, 2, 29)), (d(2028, 2, 1), d(2028, 2, 29)));
        assert_eq!(month_bounds(d(2027, 2, 1)), (d(2027, 2, 1), d(2027, 2, 28)));
        assert_eq!(first_of_next_month(d(2026, 12, 31)), d(2027, 1, 1));
    }

    #[test]
    fn month_window_is_inclusive_of_the_last_millisecond() {
        let at = Utc.with_ymd_and_hms(2026, 4, 30, 23, 0, 0).unwrap();
        let (start, end) = month_window(at);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2026, 4, 30).unwrap());
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
    }

    #[test]
    fn round2_rounds_to_cents() {
        assert_eq!(round2(56.6000000001), 56.6);
        assert_eq!(round2(0.125), 0.13);
    }
}
