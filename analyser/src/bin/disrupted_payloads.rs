use clap::Parser;
use release_payload_analyser::cli::DisruptedPayloadsArgs;
use release_payload_analyser::{query, report_disrupted_payloads};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = DisruptedPayloadsArgs::parse();
    let filter = args.query.release_filter();

    let pool = query::connect(&args.query.dsn).await?;
    log::info!("connected");

    let report = report_disrupted_payloads(&pool, &filter, args.top, args.cost_per_payload).await?;

    #[cfg(feature = "test_data")]
    release_payload_analyser::test_data::insert_report_output(
        "disrupted_payloads",
        &filter,
        &report,
        false,
    )?;

    print!("{report}");

    Ok(())
}
