use crate::aggregator::{DisruptionAggregator, RegressionCheckAggregator};
use crate::model::{DisruptedPayloadsReport, RegressionCheckReport};
use crate::query::{query_failed_tests, query_rejected_payloads, FailedTestQuery};
use anyhow::Context;
use release_payload_model::ReleaseFilter;
use sqlx::PgPool;

pub mod aggregator;
pub mod classify;
pub mod cli;
pub mod model;
pub mod query;
pub mod summary;

#[cfg(any(feature = "test_data", feature = "query_test_data"))]
pub mod test_data;

/// Work out which rejected payloads failed on disruption and which tests fail payloads most.
pub async fn report_disrupted_payloads(
    pool: &PgPool,
    filter: &ReleaseFilter,
    top: usize,
    cost_per_payload: u64,
) -> anyhow::Result<DisruptedPayloadsReport> {
    let payloads = query_rejected_payloads(pool, filter)
        .await
        .context("Load rejected payloads")?;
    log::info!("Found {} failed payloads", payloads.len());

    let mut aggregator = DisruptionAggregator::new(filter.clone());
    for payload in &payloads {
        let failures = query_failed_tests(pool, &payload.release_tag, FailedTestQuery::NamesOnly)
            .await
            .with_context(|| format!("Load failed tests for {}", payload.release_tag))?;
        aggregator.add_payload(payload, &failures);
    }

    Ok(aggregator.finish(top, cost_per_payload))
}

/// Collect the summaries of disruption regression checks that failed in rejected payloads.
pub async fn report_regression_checks(
    pool: &PgPool,
    filter: &ReleaseFilter,
) -> anyhow::Result<RegressionCheckReport> {
    let payloads = query_rejected_payloads(pool, filter)
        .await
        .context("Load rejected payloads")?;
    log::info!("Found {} failed payloads", payloads.len());

    let mut aggregator = RegressionCheckAggregator::new(filter.clone());
    for payload in &payloads {
        let failures = query_failed_tests(pool, &payload.release_tag, FailedTestQuery::WithOutput)
            .await
            .with_context(|| format!("Load failed test outputs for {}", payload.release_tag))?;
        aggregator.add_payload(payload, &failures);
    }

    Ok(aggregator.finish())
}
