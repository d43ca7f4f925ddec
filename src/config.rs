//! Report configuration
//!
//! Column classification, aggregation rules, identity columns and the visual
//! palette are plain data. A `ReportConfig` is built once and handed to the
//! normalizer and aggregator, so alternate layouts can be loaded from JSON or
//! constructed in tests.

use crate::error::ReportError;
use crate::types::MetricKind;
use serde::{Deserialize, Serialize};

/// Default physical row (0-based) holding the column names
pub const DEFAULT_HEADER_ROW: usize = 2;

/// Unit tag for percentage columns
pub const PERCENT_UNIT: &str = "%";

/// Static partition of metric column names into measurement categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnClassification {
    pub percentage: Vec<String>,
    pub count: Vec<String>,
    pub currency: Vec<String>,
    /// Unit tag for count columns
    pub count_unit: String,
    /// Unit tag for currency columns
    pub currency_unit: String,
}

impl Default for ColumnClassification {
    fn default() -> Self {
        Self {
            percentage: strings(&[
                "% Доля ACC",
                "Доля Послуг",
                "Конверсія ПК",
                "Конверсія ПК Offline",
                "Доля УДС",
            ]),
            count: strings(&["Шт.", "Чеки", "ПЧ"]),
            currency: strings(&["ТО", "ASP", "Ср. Чек", "ACC", "Послуги грн", "УДС"]),
            count_unit: "шт".to_string(),
            currency_unit: "грн".to_string(),
        }
    }
}

impl ColumnClassification {
    /// Category of a column; unknown columns are unclassified
    pub fn kind_of(&self, column: &str) -> MetricKind {
        if contains(&self.percentage, column) {
            MetricKind::Percentage
        } else if contains(&self.count, column) {
            MetricKind::Count
        } else if contains(&self.currency, column) {
            MetricKind::Currency
        } else {
            MetricKind::Unclassified
        }
    }

    /// Unit tag rendered next to values of the given category
    pub fn unit_for(&self, kind: MetricKind) -> &str {
        match kind {
            MetricKind::Percentage => PERCENT_UNIT,
            MetricKind::Count => &self.count_unit,
            MetricKind::Currency => &self.currency_unit,
            MetricKind::Unclassified => "",
        }
    }
}

/// A share column computed as `sum(numerator) / sum(denominator) * 100`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioRule {
    pub column: String,
    pub numerator: String,
    pub denominator: String,
}

impl RatioRule {
    pub fn new(column: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            column: column.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }
}

/// How the store summary combines one metric across sellers
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationRule {
    Sum,
    Mean,
    Ratio {
        numerator: String,
        denominator: String,
    },
}

/// Complete configuration for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Physical row (0-based) holding column names; earlier rows are metadata
    pub header_row: usize,
    /// Column holding the seller's name
    pub name_column: String,
    /// Column holding the seller's role
    pub position_column: String,
    /// Role used when the role cell is empty
    pub fallback_position: String,
    /// Name values that mean "no seller here" (case-insensitive)
    pub missing_sentinels: Vec<String>,
    pub classification: ColumnClassification,
    /// Currency columns holding per-transaction averages
    pub averaged_currency: Vec<String>,
    pub ratio_rules: Vec<RatioRule>,
    /// Card gradients assigned round-robin to sellers
    pub palette: Vec<String>,
    pub store_gradient: String,
    pub store_name: String,
    pub store_position: String,
    pub store_initials: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            header_row: DEFAULT_HEADER_ROW,
            name_column: "ПК".to_string(),
            position_column: "Посада".to_string(),
            fallback_position: "Продавець-консультант".to_string(),
            missing_sentinels: strings(&["nan", "n/a", "#n/a"]),
            classification: ColumnClassification::default(),
            averaged_currency: strings(&["ASP", "Ср. Чек"]),
            ratio_rules: vec![
                RatioRule::new("% Доля ACC", "ACC", "ТО"),
                RatioRule::new("Доля Послуг", "Послуги грн", "ТО"),
                RatioRule::new("Доля УДС", "УДС", "ТО"),
            ],
            palette: strings(&[
                "linear-gradient(135deg, #667eea 0%, #764ba2 100%)",
                "linear-gradient(135deg, #f093fb 0%, #f5576c 100%)",
                "linear-gradient(135deg, #4facfe 0%, #00f2fe 100%)",
                "linear-gradient(135deg, #43e97b 0%, #38f9d7 100%)",
                "linear-gradient(135deg, #fa709a 0%, #fee140 100%)",
                "linear-gradient(135deg, #30cfd0 0%, #330867 100%)",
                "linear-gradient(135deg, #a8edea 0%, #fed6e3 100%)",
                "linear-gradient(135deg, #ff9a9e 0%, #fecfef 100%)",
                "linear-gradient(135deg, #ffecd2 0%, #fcb69f 100%)",
            ]),
            store_gradient: "linear-gradient(135deg, #1e3c72 0%, #2a5298 100%)".to_string(),
            store_name: "Підсумок магазину".to_string(),
            store_position: "Всі продавці".to_string(),
            store_initials: "STORE".to_string(),
        }
    }
}

impl ReportConfig {
    /// Load configuration from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let config: ReportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the pipeline cannot honor
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.name_column.trim().is_empty() || self.position_column.trim().is_empty() {
            return Err(ReportError::Config(
                "identity column names must not be blank".to_string(),
            ));
        }
        if self.name_column == self.position_column {
            return Err(ReportError::Config(format!(
                "name and position columns are both '{}'",
                self.name_column
            )));
        }
        let c = &self.classification;
        for column in &c.percentage {
            if contains(&c.count, column) || contains(&c.currency, column) {
                return Err(ReportError::Config(format!(
                    "column '{column}' is classified more than once"
                )));
            }
        }
        for column in &c.count {
            if contains(&c.currency, column) {
                return Err(ReportError::Config(format!(
                    "column '{column}' is classified more than once"
                )));
            }
        }
        Ok(())
    }

    /// Identity columns every sheet must provide
    pub fn required_columns(&self) -> [&str; 2] {
        [self.name_column.as_str(), self.position_column.as_str()]
    }

    /// True when a trimmed name means "no seller"
    pub fn is_missing_name(&self, name: &str) -> bool {
        name.is_empty()
            || self
                .missing_sentinels
                .iter()
                .any(|s| s.trim().eq_ignore_ascii_case(name))
    }

    /// Aggregation rule for a column, given the metric columns actually present
    pub fn aggregation_for(&self, column: &str, present: &[String]) -> AggregationRule {
        match self.classification.kind_of(column) {
            MetricKind::Percentage => self
                .ratio_rules
                .iter()
                .find(|r| r.column == column)
                .filter(|r| contains(present, &r.numerator) && contains(present, &r.denominator))
                .map(|r| AggregationRule::Ratio {
                    numerator: r.numerator.clone(),
                    denominator: r.denominator.clone(),
                })
                .unwrap_or(AggregationRule::Mean),
            MetricKind::Count => AggregationRule::Sum,
            MetricKind::Currency if contains(&self.averaged_currency, column) => {
                AggregationRule::Mean
            }
            MetricKind::Currency => AggregationRule::Sum,
            MetricKind::Unclassified => AggregationRule::Mean,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn contains(list: &[String], value: &str) -> bool {
    list.iter().any(|v| v == value)
}
