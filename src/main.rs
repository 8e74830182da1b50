use anyhow::Result;
use clap::{Arg, Command};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use bizval::api::TogetherClient;
use bizval::database::SellerFormStore;
use bizval::engine;
use bizval::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bizval=info")),
        )
        .init();

    let matches = Command::new("bizval")
        .version("1.0")
        .about("Multiplier-based company valuation for seller questionnaires")
        .arg(
            Arg::new("user")
                .long("user")
                .value_name("ID")
                .help("User whose questionnaire should be valued")
                .required(true),
        )
        .arg(
            Arg::new("form_id")
                .long("form-id")
                .value_name("ID")
                .help("Value a specific form instead of the latest submitted one"),
        )
        .arg(
            Arg::new("database")
                .long("db")
                .value_name("FILE")
                .help("Path to the SQLite forms database (defaults to DATABASE_PATH)"),
        )
        .get_matches();

    let config = Config::from_env()?;
    let user_id: i64 = matches.get_one::<String>("user").unwrap().parse()?;
    let db_path = matches
        .get_one::<String>("database")
        .cloned()
        .unwrap_or_else(|| config.database_path.clone());

    let store = SellerFormStore::new(&db_path).await?;

    let form = match matches.get_one::<String>("form_id") {
        Some(raw) => {
            let form_id: i64 = raw.parse()?;
            store.form_by_id(form_id, user_id).await?
        }
        None => store.latest_submitted_form(user_id).await?,
    };

    let Some(form) = form else {
        error!("no submitted questionnaire found for user {}", user_id);
        eprintln!("❌ Нет отправленных анкет для расчета оценки.");
        std::process::exit(1);
    };

    let client = TogetherClient::new(&config)?;

    let result = match engine::run(&form, &client).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    // The computed result is reported even when persistence fails.
    if let Err(e) = store.save_valuation(&form, &result).await {
        warn!("failed to persist valuation for form {}: {}", form.id, e);
    }

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
