use anyhow::Context;
use release_payload_model::ReleaseFilter;
use serde::Serialize;
use sha3::Digest;

#[cfg(feature = "test_data")]
pub fn insert_query_result<T: Serialize>(
    sql: &str,
    params: &[&str],
    records: &[T],
) -> anyhow::Result<()> {
    let file_name = file_name_from_query(sql, params);
    let out_file = match open_output_path("2_query_results", &file_name, false)? {
        Some(f) => f,
        None => {
            log::info!(
                "Not creating query result file as it already exists for params {:?}: {:?}",
                params,
                file_name
            );
            return Ok(());
        }
    };

    log::debug!("Writing query result to {:?}", out_file);

    release_payload_model::store_records(records, out_file).context("Failed to write query result")
}

#[cfg(feature = "query_test_data")]
pub fn load_query_result<T: serde::de::DeserializeOwned>(
    sql: &str,
    params: &[&str],
) -> anyhow::Result<Vec<T>> {
    let in_file = open_input_path("2_query_results", file_name_from_query(sql, params))
        .with_context(|| format!("For query params: {:?}", params))?;

    release_payload_model::load_records(in_file).context("Failed to load query result")
}

/// Write a report so that it can be compared against in snapshot tests
pub fn insert_report_output<R: Serialize>(
    report_name: &str,
    filter: &ReleaseFilter,
    report: &R,
    overwrite: bool,
) -> anyhow::Result<()> {
    let out_file = match open_output_path(
        "3_report_outputs",
        &file_name_from_report(report_name, filter),
        overwrite,
    )? {
        Some(f) => f,
        None => {
            log::info!("Not creating report output file as it already exists");
            return Ok(());
        }
    };

    log::debug!("Writing report output to {:?}", out_file);

    serde_json::to_writer_pretty(out_file, report).context("Failed to write report output")?;

    Ok(())
}

/// Load a report written by [insert_report_output]
pub fn load_report_output<R: serde::de::DeserializeOwned>(
    report_name: &str,
    filter: &ReleaseFilter,
) -> anyhow::Result<R> {
    let in_file = open_input_path(
        "3_report_outputs",
        file_name_from_report(report_name, filter),
    )?;
    let reader = std::io::BufReader::new(in_file);

    serde_json::from_reader(reader).context("Failed to load report output")
}

fn open_output_path(
    stage: &str,
    file_name: &str,
    overwrite: bool,
) -> anyhow::Result<Option<std::fs::File>> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(stage)
        .join(file_name);

    match std::fs::OpenOptions::new()
        .create_new(!overwrite)
        .create(overwrite)
        .write(true)
        .truncate(overwrite)
        .open(path)
    {
        Ok(f) => Ok(Some(f)),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            // No need to error if this has already been created
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to open file for writing"),
    }
}

fn open_input_path(stage: &str, file_name: String) -> anyhow::Result<std::fs::File> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test_data")
        .join(stage)
        .join(file_name);

    match std::fs::OpenOptions::new().read(true).open(&path) {
        Ok(f) => Ok(f),
        Err(e) => Err(e).with_context(|| format!("Failed to open input file: {:?}", path)),
    }
}

fn file_name_from_report(report_name: &str, filter: &ReleaseFilter) -> String {
    format!(
        "{}-{}-{}.json",
        report_name, filter.release, filter.also_release
    )
}

/// Query results are keyed by the SHA3-256 of the SQL followed by each bound parameter
pub fn file_name_from_query(sql: &str, params: &[&str]) -> String {
    let mut hasher = sha3::Sha3_256::new();
    Digest::update(&mut hasher, sql.as_bytes());
    for param in params {
        Digest::update(&mut hasher, param.as_bytes());
    }

    format!("{:x}.json", hasher.finalize())
}
