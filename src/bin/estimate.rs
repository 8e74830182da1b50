use anyhow::Result;
use clap::{Arg, Command};
use tracing_subscriber::EnvFilter;

use bizval::api::TogetherClient;
use bizval::estimate::{estimate, EstimateRequest, EstimateUnit};
use bizval::models::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bizval=warn")),
        )
        .init();

    let matches = Command::new("estimate")
        .version("1.0")
        .about("Quick valuation range from minimal financial inputs, no questionnaire required")
        .arg(
            Arg::new("activity")
                .long("activity")
                .value_name("TEXT")
                .help("Free-text description of the business")
                .default_value(""),
        )
        .arg(
            Arg::new("revenue")
                .long("revenue")
                .value_name("NUM")
                .help("Revenue for the last full year")
                .required(true),
        )
        .arg(
            Arg::new("profit")
                .long("profit")
                .value_name("NUM")
                .help("Operating profit for the last full year"),
        )
        .arg(
            Arg::new("margin")
                .long("margin")
                .value_name("PCT")
                .help("Operating margin percent, used when profit is not given"),
        )
        .arg(
            Arg::new("thousands")
                .long("thousands")
                .help("Inputs are in thousands of rubles instead of millions")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("revenue_2023")
                .long("revenue-2023")
                .value_name("NUM")
                .help("Revenue for 2023, backfilled from growth assumptions when omitted"),
        )
        .arg(
            Arg::new("revenue_2024")
                .long("revenue-2024")
                .value_name("NUM")
                .help("Revenue for 2024, backfilled from growth assumptions when omitted"),
        )
        .get_matches();

    let request = EstimateRequest {
        activity_description: matches
            .get_one::<String>("activity")
            .cloned()
            .unwrap_or_default(),
        revenue_last: matches.get_one::<String>("revenue").unwrap().parse()?,
        profit_last: matches
            .get_one::<String>("profit")
            .map(|v| v.parse())
            .transpose()?,
        margin_pct: matches
            .get_one::<String>("margin")
            .map(|v| v.parse())
            .transpose()?,
        unit: if matches.get_flag("thousands") {
            EstimateUnit::Thousand
        } else {
            EstimateUnit::Million
        },
        revenue_2023: matches
            .get_one::<String>("revenue_2023")
            .map(|v| v.parse())
            .transpose()?,
        revenue_2024: matches
            .get_one::<String>("revenue_2024")
            .map(|v| v.parse())
            .transpose()?,
    };

    let config = Config::from_env()?;
    let client = TogetherClient::new(&config)?;

    match estimate(&request, &client).await {
        Ok(range) => println!("{}", serde_json::to_string_pretty(&range)?),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
