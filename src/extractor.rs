use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::error::ValuationError;
use crate::models::{FinancialSnapshot, SellerForm};
use crate::rows::{index_by_metric, normalize_table, CanonicalRow, TableKind};
use crate::units::{convert_to_millions, detect_unit};

/// Extract the normalized financial snapshot from a questionnaire record.
///
/// Fails when no financial table exists in any source field, or when no
/// positive revenue can be resolved for the latest fact period.
pub fn extract(form: &SellerForm) -> Result<FinancialSnapshot, ValuationError> {
    let (financial, balance) = resolve_tables(form);
    if is_empty_table(&financial) {
        return Err(ValuationError::MissingFinancialData);
    }

    let fin = index_by_metric(normalize_table(&financial, TableKind::Income));
    let bal = index_by_metric(normalize_table(&balance, TableKind::Balance));

    let revenue = match metric_value(&fin, "Выручка") {
        Some(r) if r > 0.0 => r,
        _ => return Err(ValuationError::MissingOrZeroRevenue),
    };

    // Explicit operating profit row wins; otherwise derive it from revenue
    // minus the three expense lines, each defaulting to 0 when missing.
    let operating_profit = metric_value(&fin, "Прибыль от продаж").unwrap_or_else(|| {
        let cost_of_sales = metric_value(&fin, "Себестоимость продаж").unwrap_or(0.0);
        let commercial = metric_value(&fin, "Коммерческие расходы").unwrap_or(0.0);
        let management = metric_value(&fin, "Управленческие расходы").unwrap_or(0.0);
        revenue - cost_of_sales - commercial - management
    });

    let mut depreciation = metric_value(&fin, "Амортизация").unwrap_or(0.0);
    if depreciation <= 0.0 {
        // Approximation for forms without a depreciation row: 10% of the
        // latest reported fixed assets. Not a depreciation schedule.
        if let Some(fixed_assets) = metric_value(&bal, "Основные средства") {
            if fixed_assets > 0.0 {
                depreciation = fixed_assets * 0.10;
                debug!(
                    "no depreciation reported, using 10% of fixed assets: {:.2}",
                    depreciation
                );
            }
        }
    }

    let debt = metric_value(&bal, "Краткосрочные займы").unwrap_or(0.0)
        + metric_value(&bal, "Долгосрочные займы").unwrap_or(0.0);
    let cash = metric_value(&bal, "Денежные средства").unwrap_or(0.0);

    // Only the financial-sector valuation branch needs this.
    let net_profit = metric_value(&fin, "Чистая прибыль");

    Ok(FinancialSnapshot {
        revenue,
        operating_profit,
        depreciation,
        ebitda: operating_profit + depreciation,
        debt,
        cash,
        net_profit,
    })
}

/// Pull the raw financial and balance tables out of a form.
///
/// The legacy columns are preferred; when a column is empty the same table
/// is looked up under `data_json.financial` / `data_json.balance`.
pub fn resolve_tables(form: &SellerForm) -> (Value, Value) {
    let mut financial = parse_json_column(form.financial_results.as_deref());
    let mut balance = parse_json_column(form.balance_indicators.as_deref());

    if let Some(decoded) = form
        .data_json
        .as_deref()
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
    {
        if is_empty_table(&financial) {
            if let Some(f) = decoded.get("financial").filter(|v| !is_empty_table(v)) {
                financial = f.clone();
            }
        }
        if is_empty_table(&balance) {
            if let Some(b) = decoded.get("balance").filter(|v| !is_empty_table(v)) {
                balance = b.clone();
            }
        }
    }

    (financial, balance)
}

fn parse_json_column(column: Option<&str>) -> Value {
    column
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null)
}

fn is_empty_table(value: &Value) -> bool {
    match value {
        Value::Array(entries) => entries.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => true,
    }
}

/// Resolve a metric to millions using the row's own reported unit and the
/// latest-fact-year policy. `None` when the row is missing or carries no
/// fact value at all.
fn metric_value(rows: &HashMap<String, CanonicalRow>, metric: &str) -> Option<f64> {
    let row = rows.get(metric)?;
    let unit = detect_unit(&row.unit);
    latest_fact(row).map(|raw| convert_to_millions(Some(raw), unit))
}

/// Latest available fact value: 2025, else 2024, else 2023. This priority
/// order is load-bearing; budget figures never participate.
fn latest_fact(row: &CanonicalRow) -> Option<&str> {
    [&row.fact_2025, &row.fact_2024, &row.fact_2023]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn form_with_tables(financial: Value, balance: Value) -> SellerForm {
        SellerForm {
            id: 1,
            financial_results: Some(financial.to_string()),
            balance_indicators: Some(balance.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_financial_data() {
        let form = SellerForm::default();
        assert_matches!(extract(&form), Err(ValuationError::MissingFinancialData));

        let empty = form_with_tables(json!([]), json!([]));
        assert_matches!(extract(&empty), Err(ValuationError::MissingFinancialData));
    }

    #[test]
    fn test_missing_revenue_row() {
        let form = form_with_tables(
            json!([{"metric": "Амортизация", "unit": "", "fact_2025": "5"}]),
            json!([]),
        );
        assert_matches!(extract(&form), Err(ValuationError::MissingOrZeroRevenue));
    }

    #[test]
    fn test_zero_revenue_fails() {
        let form = form_with_tables(
            json!([{"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "0"}]),
            json!([]),
        );
        assert_matches!(extract(&form), Err(ValuationError::MissingOrZeroRevenue));
    }

    #[test]
    fn test_latest_year_fallback() {
        let old_data = form_with_tables(
            json!([{"metric": "Выручка", "unit": "млн. руб.", "fact_2023": "100"}]),
            json!([]),
        );
        let snapshot = extract(&old_data).unwrap();
        assert_eq!(snapshot.revenue, 100.0);

        let fresh = form_with_tables(
            json!([{"metric": "Выручка", "unit": "млн. руб.", "fact_2024": "100", "fact_2025": "200"}]),
            json!([]),
        );
        let snapshot = extract(&fresh).unwrap();
        assert_eq!(snapshot.revenue, 200.0);
    }

    #[test]
    fn test_revenue_unit_conversion() {
        let form = form_with_tables(
            json!([{"metric": "Выручка", "unit": "тыс. руб.", "fact_2025": "1500000"}]),
            json!([]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.revenue, 1500.0);
    }

    #[test]
    fn test_explicit_operating_profit_preferred() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Прибыль от продаж", "unit": "млн. руб.", "fact_2025": "17"},
                {"metric": "Себестоимость продаж", "unit": "млн. руб.", "fact_2025": "60"}
            ]),
            json!([]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.operating_profit, 17.0);
    }

    #[test]
    fn test_operating_profit_derived_from_expenses() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Себестоимость продаж", "unit": "млн. руб.", "fact_2025": "60"},
                {"metric": "Коммерческие расходы", "unit": "млн. руб.", "fact_2025": "10"},
                {"metric": "Управленческие расходы", "unit": "млн. руб.", "fact_2025": "15"}
            ]),
            json!([]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.operating_profit, 15.0);
    }

    #[test]
    fn test_derivation_defaults_missing_expenses_to_zero() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Себестоимость продаж", "unit": "млн. руб.", "fact_2025": "60"}
            ]),
            json!([]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.operating_profit, 40.0);
    }

    #[test]
    fn test_depreciation_heuristic_from_fixed_assets() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Прибыль от продаж", "unit": "млн. руб.", "fact_2025": "10"}
            ]),
            json!([{"metric": "Основные средства", "unit": "млн. руб.", "fact_2025": "50"}]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.depreciation, 5.0);
        assert_eq!(snapshot.ebitda, 15.0);
    }

    #[test]
    fn test_explicit_depreciation_wins_over_heuristic() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Прибыль от продаж", "unit": "млн. руб.", "fact_2025": "10"},
                {"metric": "Амортизация", "unit": "млн. руб.", "fact_2025": "3"}
            ]),
            json!([{"metric": "Основные средства", "unit": "млн. руб.", "fact_2025": "50"}]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.depreciation, 3.0);
    }

    #[test]
    fn test_ebitda_invariant() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "250"},
                {"metric": "Прибыль от продаж", "unit": "млн. руб.", "fact_2025": "40"},
                {"metric": "Амортизация", "unit": "млн. руб.", "fact_2025": "7"}
            ]),
            json!([]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.ebitda, snapshot.operating_profit + snapshot.depreciation);
    }

    #[test]
    fn test_debt_and_cash_from_balance() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Прибыль от продаж", "unit": "млн. руб.", "fact_2025": "10"}
            ]),
            json!([
                {"metric": "Краткосрочные займы", "unit": "млн. руб.", "fact_2025": "12"},
                {"metric": "Долгосрочные займы", "unit": "млн. руб.", "fact_2025": "8"},
                {"metric": "Денежные средства", "unit": "млн. руб.", "fact_2025": "5"}
            ]),
        );
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.debt, 20.0);
        assert_eq!(snapshot.cash, 5.0);
    }

    #[test]
    fn test_net_profit_optional() {
        let form = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Прибыль от продаж", "unit": "млн. руб.", "fact_2025": "10"}
            ]),
            json!([]),
        );
        assert_eq!(extract(&form).unwrap().net_profit, None);

        let with_profit = form_with_tables(
            json!([
                {"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"},
                {"metric": "Чистая прибыль", "unit": "млн. руб.", "fact_2024": "9"}
            ]),
            json!([]),
        );
        assert_eq!(extract(&with_profit).unwrap().net_profit, Some(9.0));
    }

    #[test]
    fn test_data_json_fallback_source() {
        let form = SellerForm {
            id: 2,
            data_json: Some(
                json!({
                    "financial": {
                        "revenue": {"unit": "млн. руб.", "fact_2025": "80"},
                        "sales_profit": {"unit": "млн. руб.", "fact_2025": "8"}
                    },
                    "balance": {
                        "cash": {"unit": "млн. руб.", "fact_2025": "3"}
                    }
                })
                .to_string(),
            ),
            ..Default::default()
        };
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.revenue, 80.0);
        assert_eq!(snapshot.cash, 3.0);
    }

    #[test]
    fn test_legacy_column_preferred_over_data_json() {
        let form = SellerForm {
            id: 3,
            financial_results: Some(
                json!([{"metric": "Выручка", "unit": "млн. руб.", "fact_2025": "100"}]).to_string(),
            ),
            data_json: Some(
                json!({
                    "financial": {
                        "revenue": {"unit": "млн. руб.", "fact_2025": "999"}
                    }
                })
                .to_string(),
            ),
            ..Default::default()
        };
        let snapshot = extract(&form).unwrap();
        assert_eq!(snapshot.revenue, 100.0);
    }
}
