use anyhow::Context;
use release_payload_model::{Payload, ReleaseFilter, TestFailureRecord};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

pub const REJECTED_PAYLOADS_QUERY: &str = "select id, release_tag, release_time from release_tags where (release = $1 or release = $2) and phase = 'Rejected' and release_time >= NOW() - INTERVAL '30 days' order by release_time desc";

const FAILED_TESTS_QUERY: &str = r#"SELECT DISTINCT
       rt.release_tag,
       t.name as test_name,
       pj.name as job_name,
       pjr.url as prow_job_run_url,
       pjrt.id
FROM
     release_tags rt,
     release_job_runs rjr,
     prow_job_run_tests pjrt,
     tests t,
     prow_jobs pj,
     prow_job_runs pjr
WHERE
    rt.release_tag = $1
    AND rjr.kind = 'Blocking'
    AND rjr.release_tag_id = rt.id
    AND rjr.State = 'Failed'
    AND pjrt.prow_job_run_id = rjr.prow_job_run_id
    AND pjrt.status = 12
    AND t.id = pjrt.test_id
    AND pjr.id = pjrt.prow_job_run_id
    AND pj.id = pjr.prow_job_id
ORDER BY pjrt.id DESC"#;

const FAILED_TESTS_WITH_OUTPUT_QUERY: &str = r#"SELECT DISTINCT
       rt.release_tag,
       t.name as test_name,
       pj.name as job_name,
       pjr.url as prow_job_run_url,
       pjrt.id,
       pjrto.output
FROM
     release_tags rt,
     release_job_runs rjr,
     prow_job_run_tests pjrt,
     prow_job_run_test_outputs pjrto,
     tests t,
     prow_jobs pj,
     prow_job_runs pjr
WHERE
    rt.release_tag = $1
    AND rjr.kind = 'Blocking'
    AND rjr.release_tag_id = rt.id
    AND rjr.State = 'Failed'
    AND pjrt.prow_job_run_id = rjr.prow_job_run_id
    AND pjrt.status = 12
    AND pjrt.id = pjrto.prow_job_run_test_id
    AND t.id = pjrt.test_id
    AND pjr.id = pjrt.prow_job_run_id
    AND pj.id = pjr.prow_job_id
ORDER BY pjrt.id DESC"#;

/// Which columns to load for the failed tests of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedTestQuery {
    NamesOnly,
    /// Also join the test outputs, which is much slower
    WithOutput,
}

impl FailedTestQuery {
    pub fn sql(self) -> &'static str {
        match self {
            FailedTestQuery::NamesOnly => FAILED_TESTS_QUERY,
            FailedTestQuery::WithOutput => FAILED_TESTS_WITH_OUTPUT_QUERY,
        }
    }
}

/// Connect to the database, with a single connection shared by all queries.
pub async fn connect(dsn: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect(dsn)
        .await
        .context("Connect to the CI results database")
}

/// Create a pool that will not connect until the first query.
pub fn connect_lazy(dsn: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(dsn)
        .context("Invalid connection string")
}

/// Rejected payloads from the last 30 days, most recent first
pub async fn query_rejected_payloads(
    pool: &PgPool,
    filter: &ReleaseFilter,
) -> anyhow::Result<Vec<Payload>> {
    let params = [filter.release.as_str(), filter.also_release.as_str()];
    log::debug!("Querying rejected payloads for releases {:?}", params);

    #[cfg(feature = "query_test_data")]
    if cfg!(feature = "query_test_data") {
        return crate::test_data::load_query_result(REJECTED_PAYLOADS_QUERY, &params);
    }

    let rows = sqlx::query(REJECTED_PAYLOADS_QUERY)
        .bind(&filter.release)
        .bind(&filter.also_release)
        .fetch_all(pool)
        .await
        .context("Query rejected payloads")?;
    let payloads = rows
        .iter()
        .map(payload_from_row)
        .collect::<Result<Vec<_>, _>>()
        .context("Read rejected payloads")?;

    #[cfg(feature = "test_data")]
    crate::test_data::insert_query_result(REJECTED_PAYLOADS_QUERY, &params, &payloads)?;

    log::trace!("Loaded {} payloads", payloads.len());

    Ok(payloads)
}

/// Failed tests in blocking jobs for a payload, newest test result first
pub async fn query_failed_tests(
    pool: &PgPool,
    release_tag: &str,
    query: FailedTestQuery,
) -> anyhow::Result<Vec<TestFailureRecord>> {
    let params = [release_tag];
    log::debug!("Querying failed tests ({:?}) for {:?}", query, params);

    #[cfg(feature = "query_test_data")]
    if cfg!(feature = "query_test_data") {
        return crate::test_data::load_query_result(query.sql(), &params);
    }

    let rows = sqlx::query(query.sql())
        .bind(release_tag)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Query failed tests for {release_tag}"))?;
    let failures = rows
        .iter()
        .map(|row| failure_from_row(row, query))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Read failed tests for {release_tag}"))?;

    #[cfg(feature = "test_data")]
    crate::test_data::insert_query_result(query.sql(), &params, &failures)?;

    log::trace!("Loaded {} failed tests for {}", failures.len(), release_tag);

    Ok(failures)
}

fn payload_from_row(row: &PgRow) -> Result<Payload, sqlx::Error> {
    Ok(Payload {
        id: row.try_get("id")?,
        release_tag: row.try_get("release_tag")?,
        release_time: row.try_get("release_time")?,
    })
}

fn failure_from_row(row: &PgRow, query: FailedTestQuery) -> Result<TestFailureRecord, sqlx::Error> {
    Ok(TestFailureRecord {
        id: row.try_get("id")?,
        release_tag: row.try_get("release_tag")?,
        test_name: row.try_get("test_name")?,
        job_name: row.try_get("job_name")?,
        prow_job_run_url: row.try_get("prow_job_run_url")?,
        output: match query {
            FailedTestQuery::NamesOnly => None,
            FailedTestQuery::WithOutput => row.try_get("output")?,
        },
    })
}
