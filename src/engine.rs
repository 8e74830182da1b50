use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::api::ChatModel;
use crate::classifier::determine_sector;
use crate::error::ValuationError;
use crate::extractor;
use crate::models::{MultiplierValuation, SellerForm};
use crate::valuation;

/// Run the full valuation pipeline for one questionnaire record: classify
/// the sector, extract the snapshot, apply the multiples.
///
/// The returned record is ready to persist; the caller decides whether and
/// where to store it, and a failed store must not discard the result.
pub async fn run(
    form: &SellerForm,
    model: &dyn ChatModel,
) -> Result<MultiplierValuation, ValuationError> {
    let decoded = form
        .data_json
        .as_deref()
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
    let activity = classifier_text(decoded.as_ref(), "activity_description", &form.activity_description);
    let products = classifier_text(decoded.as_ref(), "products_services", &form.products_services);

    let sector = determine_sector(&activity, &products, model).await;
    let snapshot = extractor::extract(form)?;
    let valuation = valuation::calculate(sector, &snapshot)?;

    info!(
        "valuation complete for form {}: sector {}, equity value {:.2} mln",
        form.id, sector, valuation.equity_value
    );

    Ok(MultiplierValuation {
        sector,
        financial_data: snapshot,
        valuation,
        calculated_at: Utc::now(),
    })
}

/// Resolve a classifier input text: the `data_json` field wins when the key
/// is present, otherwise the dedicated column, otherwise empty.
fn classifier_text(data_json: Option<&Value>, field: &str, column: &Option<String>) -> String {
    if let Some(text) = data_json.and_then(|d| d.get(field)).and_then(Value::as_str) {
        return text.to_string();
    }
    column.clone().unwrap_or_default()
}
