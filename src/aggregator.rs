//! Store summary aggregation
//!
//! Combines seller records into the synthetic store record. Every metric is
//! combined with a rule fixed by configuration: counts and most currency
//! columns are summed, per-transaction averages and plain percentages are
//! averaged, and share columns are recomputed as a ratio of summed components.

use crate::config::{AggregationRule, ReportConfig};
use crate::normalizer::round2;
use crate::types::{Measurement, MetricKind, MetricMap, MetricValue, SalesRecord};
use tracing::{debug, warn};

/// Store record id
pub const STORE_ID: u32 = 0;

/// Aggregator producing the store summary record
pub struct StoreAggregator<'a> {
    config: &'a ReportConfig,
}

impl<'a> StoreAggregator<'a> {
    pub fn new(config: &'a ReportConfig) -> Self {
        Self { config }
    }

    /// Build the store record over `metric_columns` from the seller records.
    ///
    /// Seller records are only read. An empty seller list yields zeros.
    pub fn aggregate(&self, sellers: &[SalesRecord], metric_columns: &[String]) -> SalesRecord {
        let mut metrics = MetricMap::new();

        for column in metric_columns {
            let kind = self.config.classification.kind_of(column);
            let rule = self.config.aggregation_for(column, metric_columns);
            debug!(column = %column, ?kind, ?rule, "aggregating");

            let raw = match &rule {
                AggregationRule::Sum => sum(sellers, column),
                AggregationRule::Mean => mean(sellers, column),
                AggregationRule::Ratio {
                    numerator,
                    denominator,
                } => ratio_percent(sum(sellers, numerator), sum(sellers, denominator)),
            };
            let raw = bounded(column, raw);

            let value = match kind {
                MetricKind::Count => MetricValue::Int(raw.trunc() as i64),
                _ => MetricValue::Float(round2(raw)),
            };

            metrics.insert(
                column.clone(),
                Measurement {
                    value,
                    label: column.clone(),
                    unit: self.config.classification.unit_for(kind).to_string(),
                },
            );
        }

        SalesRecord {
            id: STORE_ID,
            name: self.config.store_name.clone(),
            position: self.config.store_position.clone(),
            initials: self.config.store_initials.clone(),
            gradient: self.config.store_gradient.clone(),
            metrics,
        }
    }
}

fn values<'r>(sellers: &'r [SalesRecord], column: &'r str) -> impl Iterator<Item = f64> + 'r {
    sellers.iter().map(move |s| {
        s.metrics
            .get(column)
            .map(|m| m.value.as_f64())
            .unwrap_or(0.0)
    })
}

fn total(sellers: &[SalesRecord], column: &str) -> f64 {
    values(sellers, column).sum()
}

fn sum(sellers: &[SalesRecord], column: &str) -> f64 {
    bounded(column, total(sellers, column))
}

fn mean(sellers: &[SalesRecord], column: &str) -> f64 {
    if sellers.is_empty() {
        return 0.0;
    }
    let n = sellers.len() as f64;
    let summed = total(sellers, column);
    if summed.is_finite() {
        summed / n
    } else {
        values(sellers, column).map(|v| v / n).sum()
    }
}

/// Keep an aggregate within the finite range. Overflow saturates, NaN is 0.
fn bounded(column: &str, value: f64) -> f64 {
    if value.is_finite() {
        return value;
    }
    warn!(column = %column, "aggregate out of range");
    if value.is_nan() {
        0.0
    } else {
        value.clamp(f64::MIN, f64::MAX)
    }
}

fn ratio_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seller(id: u32, metrics: &[(&str, MetricValue)]) -> SalesRecord {
        let mut map = MetricMap::new();
        for (name, value) in metrics {
            map.insert(
                name.to_string(),
                Measurement {
                    value: *value,
                    label: name.to_string(),
                    unit: String::new(),
                },
            );
        }
        SalesRecord {
            id,
            name: format!("seller {id}"),
            position: "продавець".to_string(),
            initials: "S".to_string(),
            gradient: String::new(),
            metrics: map,
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_counts_are_summed() {
        let config = ReportConfig::default();
        let sellers = vec![
            seller(1, &[("Шт.", MetricValue::Int(3))]),
            seller(2, &[("Шт.", MetricValue::Int(5))]),
        ];

        let store = StoreAggregator::new(&config).aggregate(&sellers, &columns(&["Шт."]));
        assert_eq!(
            store.metrics.get("Шт.").unwrap(),
            &Measurement {
                value: MetricValue::Int(8),
                label: "Шт.".to_string(),
                unit: "шт".to_string(),
            }
        );
    }

    #[test]
    fn test_store_identity() {
        let config = ReportConfig::default();
        let store = StoreAggregator::new(&config).aggregate(&[], &[]);
        assert_eq!(store.id, 0);
        assert_eq!(store.initials, "STORE");
        assert_eq!(store.name, config.store_name);
        assert_eq!(store.position, config.store_position);
        assert_eq!(store.gradient, config.store_gradient);
    }

    #[test]
    fn test_currency_sum_and_average_columns() {
        let config = ReportConfig::default();
        let sellers = vec![
            seller(1, &[("ТО", MetricValue::Float(1500.55)), ("Ср. Чек", MetricValue::Float(300.0))]),
            seller(2, &[("ТО", MetricValue::Float(999.99)), ("Ср. Чек", MetricValue::Float(500.0))]),
        ];

        let store =
            StoreAggregator::new(&config).aggregate(&sellers, &columns(&["ТО", "Ср. Чек"]));
        let to = store.metrics.get("ТО").unwrap().value.as_f64();
        assert!((to - 2500.54).abs() < 1e-6);
        assert_eq!(store.metrics.get("Ср. Чек").unwrap().value, MetricValue::Float(400.0));
    }

    #[test]
    fn test_share_column_uses_ratio_of_sums() {
        let config = ReportConfig::default();
        let sellers = vec![
            seller(
                1,
                &[
                    ("ТО", MetricValue::Float(1000.0)),
                    ("ACC", MetricValue::Float(100.0)),
                    ("% Доля ACC", MetricValue::Float(10.0)),
                ],
            ),
            seller(
                2,
                &[
                    ("ТО", MetricValue::Float(3000.0)),
                    ("ACC", MetricValue::Float(900.0)),
                    ("% Доля ACC", MetricValue::Float(30.0)),
                ],
            ),
        ];

        let store = StoreAggregator::new(&config)
            .aggregate(&sellers, &columns(&["ТО", "ACC", "% Доля ACC"]));
        // 1000 / 4000, not the mean of 10 and 30
        assert_eq!(store.metrics.get("% Доля ACC").unwrap().value, MetricValue::Float(25.0));
        assert_eq!(store.metrics.get("% Доля ACC").unwrap().unit, "%");
    }

    #[test]
    fn test_ratio_with_zero_denominator_is_zero() {
        let config = ReportConfig::default();
        let sellers = vec![seller(
            1,
            &[
                ("ТО", MetricValue::Float(0.0)),
                ("УДС", MetricValue::Float(50.0)),
                ("Доля УДС", MetricValue::Float(12.0)),
            ],
        )];

        let store = StoreAggregator::new(&config)
            .aggregate(&sellers, &columns(&["ТО", "УДС", "Доля УДС"]));
        assert_eq!(store.metrics.get("Доля УДС").unwrap().value, MetricValue::Float(0.0));
    }

    #[test]
    fn test_plain_percentage_and_unclassified_are_averaged() {
        let config = ReportConfig::default();
        let sellers = vec![
            seller(1, &[("Конверсія ПК", MetricValue::Float(20.0)), ("Рейтинг", MetricValue::Float(4.0))]),
            seller(2, &[("Конверсія ПК", MetricValue::Float(35.0)), ("Рейтинг", MetricValue::Float(4.5))]),
            seller(3, &[("Конверсія ПК", MetricValue::Float(0.0)), ("Рейтинг", MetricValue::Float(5.0))]),
        ];

        let store = StoreAggregator::new(&config)
            .aggregate(&sellers, &columns(&["Конверсія ПК", "Рейтинг"]));
        assert_eq!(store.metrics.get("Конверсія ПК").unwrap().value, MetricValue::Float(18.33));
        assert_eq!(store.metrics.get("Рейтинг").unwrap().value, MetricValue::Float(4.5));
        assert_eq!(store.metrics.get("Рейтинг").unwrap().unit, "");
    }

    #[test]
    fn test_overflowing_totals_stay_numbers() {
        let config = ReportConfig::default();
        let sellers = vec![
            seller(1, &[("ТО", MetricValue::Float(1.7e308)), ("ASP", MetricValue::Float(1.7e308))]),
            seller(2, &[("ТО", MetricValue::Float(1.7e308)), ("ASP", MetricValue::Float(1.7e308))]),
        ];

        let store =
            StoreAggregator::new(&config).aggregate(&sellers, &columns(&["ТО", "ASP"]));
        assert_eq!(store.metrics.get("ТО").unwrap().value, MetricValue::Float(f64::MAX));
        assert_eq!(store.metrics.get("ASP").unwrap().value, MetricValue::Float(1.7e308));

        let json = serde_json::to_string(&store).unwrap();
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_ratio_of_overflowing_sums_is_finite() {
        let config = ReportConfig::default();
        let sellers = vec![
            seller(1, &[("ТО", MetricValue::Float(1.7e308)), ("ACC", MetricValue::Float(1.7e308))]),
            seller(2, &[("ТО", MetricValue::Float(1.7e308)), ("ACC", MetricValue::Float(1.7e308))]),
        ];

        let store = StoreAggregator::new(&config)
            .aggregate(&sellers, &columns(&["ТО", "ACC", "% Доля ACC"]));
        assert_eq!(store.metrics.get("% Доля ACC").unwrap().value, MetricValue::Float(100.0));
    }

    #[test]
    fn test_no_sellers_yields_zeros_for_every_column() {
        let config = ReportConfig::default();
        let store = StoreAggregator::new(&config)
            .aggregate(&[], &columns(&["ТО", "Шт.", "Конверсія ПК"]));

        assert_eq!(store.metrics.len(), 3);
        assert_eq!(store.metrics.get("ТО").unwrap().value, MetricValue::Float(0.0));
        assert_eq!(store.metrics.get("Шт.").unwrap().value, MetricValue::Int(0));
        assert_eq!(store.metrics.get("Конверсія ПК").unwrap().value, MetricValue::Float(0.0));
    }
}
