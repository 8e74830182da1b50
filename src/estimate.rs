use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::api::ChatModel;
use crate::classifier::determine_sector;
use crate::error::ValuationError;
use crate::extractor;
use crate::models::{Sector, SellerForm};
use crate::valuation;

/// Input unit for the quick-estimate figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateUnit {
    Million,
    Thousand,
}

/// Minimal input set for a valuation without a stored questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRequest {
    pub activity_description: String,
    pub revenue_last: f64,
    pub profit_last: Option<f64>,
    pub margin_pct: Option<f64>,
    pub unit: EstimateUnit,
    pub revenue_2023: Option<f64>,
    pub revenue_2024: Option<f64>,
}

/// Valuation range in millions of rubles, rounded to 2 decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRange {
    pub min: f64,
    pub max: f64,
    pub multiplier_mln: f64,
    pub sector: Sector,
}

/// Revenue shares used to synthesize the expense lines of the virtual form.
const COST_OF_SALES_SHARE: f64 = 0.60;
const COMMERCIAL_SHARE: f64 = 0.10;
const MANAGEMENT_SHARE: f64 = 0.15;

/// Produce a rough valuation range from the minimal inputs: synthesize a
/// virtual questionnaire, classify the sector, run the multiplier pipeline.
pub async fn estimate(
    request: &EstimateRequest,
    model: &dyn ChatModel,
) -> Result<EstimateRange, ValuationError> {
    if request.revenue_last <= 0.0 {
        return Err(ValuationError::MissingOrZeroRevenue);
    }

    let form = build_virtual_form(request);

    let sector = if request.activity_description.is_empty() {
        Sector::MarketAverage
    } else {
        determine_sector(
            &request.activity_description,
            &request.activity_description,
            model,
        )
        .await
    };

    let snapshot = match extractor::extract(&form) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("estimate extraction failed: {}", e);
            return Err(ValuationError::EstimateFailed);
        }
    };

    let equity_value = match valuation::calculate(sector, &snapshot) {
        Ok(result) if result.equity_value > 0.0 => result.equity_value,
        Ok(_) => return Err(ValuationError::EstimateFailed),
        Err(e) => {
            warn!("multiplier estimate failed: {}", e);
            return Err(ValuationError::EstimateFailed);
        }
    };

    let value = round2(equity_value);
    Ok(EstimateRange {
        min: value,
        max: value,
        multiplier_mln: value,
        sector,
    })
}

/// Build a virtual questionnaire from the minimal estimate inputs.
///
/// Missing prior-year revenues are backfilled assuming 10% annual growth,
/// the 2026 budget assumes 5%, and the expense lines come from fixed
/// revenue shares. All synthesized figures are in millions.
fn build_virtual_form(request: &EstimateRequest) -> SellerForm {
    let unit = request.unit;
    let r2025 = to_millions(request.revenue_last, unit);
    let r2024 = request
        .revenue_2024
        .map(|v| to_millions(v, unit))
        .unwrap_or(r2025 / 1.10);
    let r2023 = request
        .revenue_2023
        .map(|v| to_millions(v, unit))
        .unwrap_or(r2024 / 1.10);
    let budget_2026 = r2025 * 1.05;

    let profit = request
        .profit_last
        .map(|v| to_millions(v, unit))
        .or_else(|| request.margin_pct.map(|pct| r2025 * (pct / 100.0)))
        .unwrap_or(r2025 * 0.15);

    let expense_row = |share: f64| {
        json!({
            "unit": "млн. руб.",
            "fact_2022": "",
            "fact_2023": round2(r2023 * share),
            "fact_2024": round2(r2024 * share),
            "fact_2025": round2(r2025 * share),
            "budget_2026": round2(budget_2026 * share),
        })
    };

    let derived_profit = |revenue: f64| {
        revenue * (1.0 - COST_OF_SALES_SHARE - COMMERCIAL_SHARE - MANAGEMENT_SHARE)
    };

    let financial = json!({
        "revenue": {
            "unit": "млн. руб.",
            "fact_2022": "",
            "fact_2023": round2(r2023),
            "fact_2024": round2(r2024),
            "fact_2025": round2(r2025),
            "budget_2026": round2(budget_2026),
        },
        "cost_of_sales": expense_row(COST_OF_SALES_SHARE),
        "commercial_expenses": expense_row(COMMERCIAL_SHARE),
        "management_expenses": expense_row(MANAGEMENT_SHARE),
        "sales_profit": {
            "unit": "млн. руб.",
            "fact_2022": "",
            "fact_2023": round2(derived_profit(r2023)),
            "fact_2024": round2(derived_profit(r2024)),
            "fact_2025": round2(profit),
            "budget_2026": round2(derived_profit(budget_2026)),
        },
        "depreciation": {
            "unit": "млн. руб.",
            "fact_2022": "",
            "fact_2023": 0,
            "fact_2024": 0,
            "fact_2025": 0,
            "budget_2026": 0,
        },
    });

    let fixed_assets = (r2025 * 0.10).max(0.5);
    let assets_row = |scale: f64| {
        json!({
            "unit": "млн. руб.",
            "fact_2022": round2(fixed_assets * 0.8 * scale),
            "fact_2023": round2(fixed_assets * 0.9 * scale),
            "fact_2024": round2(fixed_assets * scale),
            "fact_2025": round2(fixed_assets * scale),
        })
    };
    let zero_row = || {
        json!({
            "unit": "млн. руб.",
            "fact_2022": 0, "fact_2023": 0, "fact_2024": 0, "fact_2025": 0,
        })
    };

    let balance = json!({
        "fixed_assets": assets_row(1.0),
        "inventory": zero_row(),
        "receivables": zero_row(),
        "payables": zero_row(),
        "short_term_loans": zero_row(),
        "long_term_loans": zero_row(),
        "cash": zero_row(),
        "net_assets": assets_row(1.0),
    });

    SellerForm {
        id: 0,
        activity_description: Some(request.activity_description.clone()),
        products_services: Some(request.activity_description.clone()),
        financial_results: Some(financial.to_string()),
        balance_indicators: Some(balance.to_string()),
        data_json: Some(
            json!({
                "activity_description": request.activity_description,
                "products_services": request.activity_description,
            })
            .to_string(),
        ),
    }
}

fn to_millions(value: f64, unit: EstimateUnit) -> f64 {
    match unit {
        EstimateUnit::Thousand => value / 1000.0,
        EstimateUnit::Million => value,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
