use tracing::warn;

use crate::api::ChatModel;
use crate::models::Sector;

const SYSTEM_PROMPT: &str = "Ты помощник для классификации компаний по секторам экономики. \
    Отвечай только названием сектора из предложенного списка, без дополнительных пояснений.";

/// Classify the business into a sector from its free-text descriptions.
///
/// Never fails: a model error, timeout or unusable response degrades to
/// the market-average default with a logged warning.
pub async fn determine_sector(
    activity_description: &str,
    products_services: &str,
    model: &dyn ChatModel,
) -> Sector {
    let prompt = build_prompt(activity_description, products_services);

    match model.complete(SYSTEM_PROMPT, &prompt).await {
        Ok(raw) => match_sector(&clean_response(&raw)),
        Err(e) => {
            warn!("sector classification failed, using default: {}", e);
            Sector::MarketAverage
        }
    }
}

/// Build the classification prompt enumerating every allowed label.
fn build_prompt(activity_description: &str, products_services: &str) -> String {
    let activity = if activity_description.is_empty() {
        "не указано"
    } else {
        activity_description
    };
    let products = if products_services.is_empty() {
        "не указано"
    } else {
        products_services
    };

    let mut prompt =
        String::from("Определи сектор экономики для компании на основе следующей информации:\n\n");
    prompt.push_str(&format!("Описание деятельности: {}\n\n", activity));
    prompt.push_str(&format!("Продукция/услуги: {}\n\n", products));
    prompt.push_str("Выбери ОДИН сектор из следующего списка:\n");
    for sector in Sector::ALL {
        prompt.push_str(&format!("- {}\n", sector.label()));
    }
    prompt.push_str("\nОтветь ТОЛЬКО названием сектора, без дополнительных пояснений.");
    prompt
}

/// Strip everything except letters, whitespace and hyphens.
fn clean_response(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace() || *c == '-')
        .collect()
}

/// Match a cleaned model response against the label set: first an exact
/// scan tolerant of substrings in both directions, then ordered keyword
/// buckets. Anything unresolvable lands on the market-average default.
fn match_sector(cleaned: &str) -> Sector {
    if cleaned.trim().is_empty() {
        return Sector::MarketAverage;
    }
    let response = cleaned.to_lowercase();

    for sector in Sector::ALL {
        let label = sector.label().to_lowercase();
        if response.contains(&label) || label.contains(&response) {
            return sector;
        }
    }

    if contains_any(&response, &["tmt", "технологи", "интернет", "телеком", "медиа"]) {
        return Sector::Tmt;
    }
    if contains_any(&response, &["финанс", "банк", "страхован"]) {
        return Sector::Financial;
    }
    if contains_any(&response, &["ритейл", "розничн", "магазин"]) {
        return Sector::Retail;
    }
    if contains_any(&response, &["логистик", "транспорт", "доставк"]) {
        return Sector::Logistics;
    }
    if contains_any(&response, &["сельск", "агро", "ферм"]) {
        return Sector::Agriculture;
    }
    if contains_any(&response, &["здрав", "медицин", "клиник"]) {
        return Sector::Healthcare;
    }
    if contains_any(&response, &["недвижим", "нефтегаз", "нефть", "газ"]) {
        // Oil and gas outranks real estate when a response mentions both.
        if contains_any(&response, &["нефтегаз", "нефть", "газ"]) {
            return Sector::OilAndGas;
        }
        return Sector::RealEstate;
    }

    Sector::MarketAverage
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct StubModel(&'static str);

    #[async_trait::async_trait]
    impl ChatModel for StubModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingModel;

    #[async_trait::async_trait]
    impl ChatModel for FailingModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<String> {
            Err(anyhow!("connection timed out"))
        }
    }

    #[test]
    fn test_prompt_lists_every_sector() {
        let prompt = build_prompt("производство мебели", "");
        for sector in Sector::ALL {
            assert!(prompt.contains(sector.label()), "missing {}", sector.label());
        }
        assert!(prompt.contains("производство мебели"));
        assert!(prompt.contains("не указано"));
    }

    #[test]
    fn test_clean_response_strips_punctuation() {
        assert_eq!(clean_response("Сектор: «Ритейл»!"), "Сектор Ритейл");
        assert_eq!(clean_response("  TMT.  "), "TMT");
    }

    #[test]
    fn test_exact_label_match() {
        assert_eq!(match_sector("Ритейл"), Sector::Retail);
        assert_eq!(match_sector("ритейл"), Sector::Retail);
        assert_eq!(match_sector("Компания относится к сектору Логистика"), Sector::Logistics);
    }

    #[test]
    fn test_label_contains_response() {
        // A truncated answer still matches when the label contains it.
        assert_eq!(match_sector("Финансовый"), Sector::Financial);
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(match_sector("разработка интернет-платформ"), Sector::Tmt);
        assert_eq!(match_sector("сеть розничных точек"), Sector::Retail);
        assert_eq!(match_sector("грузовые перевозки и транспорт"), Sector::Logistics);
        assert_eq!(match_sector("агрохолдинг"), Sector::Agriculture);
        assert_eq!(match_sector("частная медицинская практика"), Sector::Healthcare);
        assert_eq!(match_sector("банковские продукты"), Sector::Financial);
    }

    #[test]
    fn test_oil_gas_outranks_real_estate() {
        // Both keyword groups hit; the oil/gas check runs first.
        assert_eq!(
            match_sector("газовое месторождение и недвижимое имущество"),
            Sector::OilAndGas
        );
        assert_eq!(match_sector("управление объектами недвижимости"), Sector::RealEstate);
    }

    #[test]
    fn test_unmatched_response_defaults() {
        assert_eq!(match_sector("что-то невнятное"), Sector::MarketAverage);
    }

    #[test]
    fn test_empty_response_defaults() {
        assert_eq!(match_sector(""), Sector::MarketAverage);
        assert_eq!(match_sector("   "), Sector::MarketAverage);
    }

    #[tokio::test]
    async fn test_model_answer_resolves_sector() {
        let sector = determine_sector("сеть магазинов", "продукты", &StubModel("Ритейл")).await;
        assert_eq!(sector, Sector::Retail);
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_default() {
        let sector = determine_sector("сеть магазинов", "продукты", &FailingModel).await;
        assert_eq!(sector, Sector::MarketAverage);
    }

    #[tokio::test]
    async fn test_noisy_answer_falls_back_to_keywords() {
        let model = StubModel("Это скорее всего технологическая компания.");
        let sector = determine_sector("ИТ-услуги", "SaaS", &model).await;
        assert_eq!(sector, Sector::Tmt);
    }
}
