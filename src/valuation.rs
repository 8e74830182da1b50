use std::collections::BTreeMap;
use tracing::warn;

use crate::error::ValuationError;
use crate::models::{FinancialSnapshot, Sector, ValuationResult};

/// Fixed P/E multiple for the financial sector.
const PE_MULTIPLE: f64 = 7.3;

/// Multiples for the market-average default, also the fallback pair for
/// sectors absent from the table.
const MARKET_AVERAGE_MULTIPLES: (f64, f64) = (0.9, 4.8);

/// Sector multiples as (EV/Revenue, EV/OperatingProfit). Hand-curated
/// reference data; the financial sector has no pair and is valued on P/E.
fn sector_multiples(sector: Sector) -> Option<(f64, f64)> {
    match sector {
        Sector::MarketAverage => Some(MARKET_AVERAGE_MULTIPLES),
        Sector::Tmt => Some((2.0, 6.1)),
        Sector::Services => Some((1.8, 5.5)),
        Sector::Logistics => Some((1.6, 5.4)),
        Sector::Agriculture => Some((0.9, 5.2)),
        Sector::Retail => Some((0.5, 5.0)),
        Sector::ConsumerGoods => Some((0.5, 4.3)),
        Sector::HeavyIndustry => Some((0.4, 3.8)),
        _ => None,
    }
}

/// Value the company off its sector multiples.
///
/// General branch: EV₁ from revenue, EV₂ from operating profit plus
/// depreciation, EV as their mean, equity value as EV net of debt plus
/// cash. Financial sector: equity value straight off net profit × P/E.
pub fn calculate(
    sector: Sector,
    snapshot: &FinancialSnapshot,
) -> Result<ValuationResult, ValuationError> {
    if sector == Sector::Financial {
        let net_profit = match snapshot.net_profit {
            Some(profit) if profit > 0.0 => profit,
            _ => return Err(ValuationError::MissingNetProfit),
        };

        let mut applied = BTreeMap::new();
        applied.insert("P/E".to_string(), PE_MULTIPLE);

        return Ok(ValuationResult {
            sector,
            applied_multipliers: applied,
            equity_value: net_profit * PE_MULTIPLE,
            ev: None,
            ev1: None,
            ev2: None,
        });
    }

    let (ev_revenue_mult, ev_profit_mult) = sector_multiples(sector).unwrap_or_else(|| {
        // Classifier labels without a curated pair land here.
        warn!(
            "no multiples for sector {}, falling back to market average",
            sector
        );
        MARKET_AVERAGE_MULTIPLES
    });

    let ev1 = snapshot.revenue * ev_revenue_mult;
    // Inline operating profit + depreciation equals snapshot.ebitda by
    // construction.
    let ev2 = (snapshot.operating_profit + snapshot.depreciation) * ev_profit_mult;
    let ev = (ev1 + ev2) / 2.0;
    let equity_value = ev - snapshot.debt + snapshot.cash;

    let mut applied = BTreeMap::new();
    applied.insert("EV/Выручка".to_string(), ev_revenue_mult);
    applied.insert("EV/Прибыль от продаж".to_string(), ev_profit_mult);

    Ok(ValuationResult {
        sector,
        applied_multipliers: applied,
        equity_value,
        ev: Some(ev),
        ev1: Some(ev1),
        ev2: Some(ev2),
    })
}
