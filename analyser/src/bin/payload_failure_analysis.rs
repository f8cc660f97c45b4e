use clap::Parser;
use release_payload_analyser::cli::PayloadFailureAnalysisArgs;
use release_payload_analyser::{query, report_regression_checks};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = PayloadFailureAnalysisArgs::parse();
    let filter = args.query.release_filter();

    let pool = query::connect(&args.query.dsn).await?;
    log::info!("connected");

    let report = report_regression_checks(&pool, &filter).await?;

    #[cfg(feature = "test_data")]
    release_payload_analyser::test_data::insert_report_output(
        "payload_failure_analysis",
        &filter,
        &report,
        false,
    )?;

    print!("{report}");

    Ok(())
}
