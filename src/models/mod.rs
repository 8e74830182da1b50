use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Seller questionnaire record as stored by the marketplace.
///
/// `financial_results` and `balance_indicators` are the legacy JSON columns;
/// newer forms keep the same tables under `data_json.financial` and
/// `data_json.balance` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellerForm {
    pub id: i64,
    pub activity_description: Option<String>,
    pub products_services: Option<String>,
    pub financial_results: Option<String>,
    pub balance_indicators: Option<String>,
    pub data_json: Option<String>,
}

/// Economic sector of the business.
///
/// Closed set: 13 named sectors plus the market-average default. Serialized
/// as the Russian display label so persisted snapshots stay compatible with
/// the questionnaire data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Горнодобывающая и металлургия")]
    MiningAndMetals,
    #[serde(rename = "Здравоохранение")]
    Healthcare,
    #[serde(rename = "Коммунальные услуги")]
    Utilities,
    #[serde(rename = "Логистика")]
    Logistics,
    #[serde(rename = "Недвижимость")]
    RealEstate,
    #[serde(rename = "Нефтегаз")]
    OilAndGas,
    #[serde(rename = "Потребительские товары")]
    ConsumerGoods,
    #[serde(rename = "Ритейл")]
    Retail,
    #[serde(rename = "Сельское хозяйство")]
    Agriculture,
    #[serde(rename = "Сфера услуг")]
    Services,
    #[serde(rename = "TMT")]
    Tmt,
    #[serde(rename = "Тяжёлая промышленность")]
    HeavyIndustry,
    #[serde(rename = "Финансовый сектор")]
    Financial,
    #[serde(rename = "Средний по рынку")]
    MarketAverage,
}

impl Sector {
    /// Every sector, in prompt order. Label matching scans this order, so a
    /// response matching several labels resolves to the first one here.
    pub const ALL: [Sector; 14] = [
        Sector::MiningAndMetals,
        Sector::Healthcare,
        Sector::Utilities,
        Sector::Logistics,
        Sector::RealEstate,
        Sector::OilAndGas,
        Sector::ConsumerGoods,
        Sector::Retail,
        Sector::Agriculture,
        Sector::Services,
        Sector::Tmt,
        Sector::HeavyIndustry,
        Sector::Financial,
        Sector::MarketAverage,
    ];

    /// Russian display label, as shown to users and stored in snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            Sector::MiningAndMetals => "Горнодобывающая и металлургия",
            Sector::Healthcare => "Здравоохранение",
            Sector::Utilities => "Коммунальные услуги",
            Sector::Logistics => "Логистика",
            Sector::RealEstate => "Недвижимость",
            Sector::OilAndGas => "Нефтегаз",
            Sector::ConsumerGoods => "Потребительские товары",
            Sector::Retail => "Ритейл",
            Sector::Agriculture => "Сельское хозяйство",
            Sector::Services => "Сфера услуг",
            Sector::Tmt => "TMT",
            Sector::HeavyIndustry => "Тяжёлая промышленность",
            Sector::Financial => "Финансовый сектор",
            Sector::MarketAverage => "Средний по рынку",
        }
    }
}

impl std::fmt::Display for Sector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized financial figures, all in millions of rubles.
///
/// `ebitda` is always `operating_profit + depreciation`; it is never read
/// from a source row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub revenue: f64,
    pub operating_profit: f64,
    pub depreciation: f64,
    pub ebitda: f64,
    pub debt: f64,
    pub cash: f64,
    pub net_profit: Option<f64>,
}

/// Result of the multiplier valuation.
///
/// `ev`/`ev1`/`ev2` are populated for the general branch only; the
/// financial-sector P/E branch produces an equity value directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    pub sector: Sector,
    pub applied_multipliers: BTreeMap<String, f64>,
    pub equity_value: f64,
    pub ev: Option<f64>,
    pub ev1: Option<f64>,
    pub ev2: Option<f64>,
}

/// Snapshot persisted at `data_json.multiplier_valuation` on the form.
/// Overwritten whole on every recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplierValuation {
    pub sector: Sector,
    pub financial_data: FinancialSnapshot,
    pub valuation: ValuationResult,
    pub calculated_at: DateTime<Utc>,
}

/// Configuration for the binaries.
#[derive(Debug, Clone)]
pub struct Config {
    pub together_api_key: String,
    pub together_model: String,
    pub together_base_url: String,
    pub database_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            together_api_key: std::env::var("TOGETHER_API_KEY")
                .map_err(|_| anyhow::anyhow!("TOGETHER_API_KEY environment variable required"))?,
            together_model: std::env::var("TOGETHER_MODEL")
                .unwrap_or_else(|_| "meta-llama/Llama-3-8b-chat-hf".to_string()),
            together_base_url: std::env::var("TOGETHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.together.xyz".to_string()),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "forms.db".to_string()),
        })
    }
}
