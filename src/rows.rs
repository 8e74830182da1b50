use serde_json::Value;
use std::collections::HashMap;

/// One normalized table row, keyed by its Russian metric display name.
/// Absent periods are `None`, never omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRow {
    pub metric: String,
    pub unit: String,
    pub fact_2022: Option<String>,
    pub fact_2023: Option<String>,
    pub fact_2024: Option<String>,
    pub fact_2025: Option<String>,
    pub budget_2026: Option<String>,
}

/// Which questionnaire table is being normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Income,
    Balance,
}

/// Slug-to-display-name mapping for the keyed income-statement shape.
const INCOME_METRICS: [(&str, &str); 7] = [
    ("revenue", "Выручка"),
    ("cost_of_sales", "Себестоимость продаж"),
    ("commercial_expenses", "Коммерческие расходы"),
    ("management_expenses", "Управленческие расходы"),
    ("sales_profit", "Прибыль от продаж"),
    ("depreciation", "Амортизация"),
    ("net_profit", "Чистая прибыль"),
];

/// Slug-to-display-name mapping for the keyed balance-sheet shape.
const BALANCE_METRICS: [(&str, &str); 8] = [
    ("fixed_assets", "Основные средства"),
    ("inventory", "Запасы"),
    ("receivables", "Дебиторская задолженность"),
    ("payables", "Кредиторская задолженность"),
    ("short_term_loans", "Краткосрочные займы"),
    ("long_term_loans", "Долгосрочные займы"),
    ("cash", "Денежные средства"),
    ("net_assets", "Чистые активы"),
];

/// Normalize a raw questionnaire table into canonical rows.
///
/// Tables arrive in one of two historical shapes: a list of rows that
/// already carry a `metric` display name (passed through), or a map keyed by
/// metric slug whose inner records use per-period alias keys. A slug missing
/// from a keyed table produces no row at all; callers must treat a missing
/// metric as "no data", not as zero.
pub fn normalize_table(table: &Value, kind: TableKind) -> Vec<CanonicalRow> {
    match table {
        Value::Array(entries) => entries.iter().filter_map(legacy_row).collect(),
        Value::Object(map) => {
            let metrics = match kind {
                TableKind::Income => INCOME_METRICS.as_slice(),
                TableKind::Balance => BALANCE_METRICS.as_slice(),
            };
            metrics
                .iter()
                .filter_map(|(slug, name)| {
                    map.get(*slug)
                        .filter(|record| record.is_object())
                        .map(|record| keyed_row(name, record))
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Index rows by metric name for O(1) lookup. A later duplicate replaces an
/// earlier one.
pub fn index_by_metric(rows: Vec<CanonicalRow>) -> HashMap<String, CanonicalRow> {
    let mut indexed = HashMap::new();
    for row in rows {
        indexed.insert(row.metric.clone(), row);
    }
    indexed
}

/// A row from the legacy list shape. Rows without a `metric` name are
/// dropped; they can never be addressed downstream.
fn legacy_row(record: &Value) -> Option<CanonicalRow> {
    let metric = record.get("metric").and_then(Value::as_str)?;
    Some(CanonicalRow {
        metric: metric.to_string(),
        unit: record
            .get("unit")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        fact_2022: pick_value(record, &["fact_2022"]),
        fact_2023: pick_value(record, &["fact_2023"]),
        fact_2024: pick_value(record, &["fact_2024"]),
        fact_2025: pick_value(record, &["fact_2025"]),
        budget_2026: pick_value(record, &["budget_2026"]),
    })
}

/// A row built from a keyed-shape record, probing period aliases in order.
fn keyed_row(metric: &str, record: &Value) -> CanonicalRow {
    CanonicalRow {
        metric: metric.to_string(),
        unit: record
            .get("unit")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        fact_2022: pick_value(record, &["fact_2022", "2022_fact"]),
        fact_2023: pick_value(record, &["fact_2023", "2023_fact"]),
        fact_2024: pick_value(record, &["fact_2024", "2024_fact"]),
        fact_2025: pick_value(
            record,
            &["fact_2025", "2025_fact", "2025_q3_fact", "2025_9m_fact", "2025_budget"],
        ),
        budget_2026: pick_value(record, &["budget_2026", "2026_budget"]),
    }
}

/// First non-empty value among the candidate keys. Numbers are stringified;
/// anything else counts as absent.
fn pick_value(record: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match record.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}
