use tracing::warn;

/// Reported measurement unit of a monetary field in the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Thousands,
    Millions,
    Unknown,
}

/// Detect the unit from a free-form label such as "тыс. руб." or "млн руб".
///
/// The "тыс" check runs before "млн"; a label containing both substrings is
/// treated as thousands.
pub fn detect_unit(label: &str) -> Unit {
    let label = label.trim().to_lowercase();
    if label.is_empty() {
        return Unit::Unknown;
    }
    if label.contains("тыс") {
        return Unit::Thousands;
    }
    if label.contains("млн") {
        return Unit::Millions;
    }
    Unit::Unknown
}

/// Convert a raw questionnaire value into millions of rubles.
///
/// Missing, empty and non-numeric inputs collapse to 0.0. An `Unknown` unit
/// leaves the value unchanged: forms saved before the unit field existed
/// reported figures in millions, and that assumption is kept for them.
pub fn convert_to_millions(value: Option<&str>, unit: Unit) -> f64 {
    let raw = match value {
        Some(v) if !v.is_empty() => v,
        _ => return 0.0,
    };
    let num: f64 = match raw.trim().parse() {
        Ok(n) => n,
        Err(_) => return 0.0,
    };
    if num == 0.0 {
        return 0.0;
    }
    match unit {
        Unit::Thousands => num / 1000.0,
        Unit::Millions => num,
        Unit::Unknown => {
            warn!("unit label not recognized, assuming {} is already in millions", raw);
            num
        }
    }
}
