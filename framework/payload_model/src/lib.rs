use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::io::{Read, Write};

/// A release payload that was rejected
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    /// The `release_tags` row id
    pub id: i64,
    /// The release tag, for example `4.14.0-0.nightly-2023-09-12-195514`
    pub release_tag: String,
    /// When the payload was released
    ///
    /// Only rejected payloads are loaded so this is effectively the rejection time.
    pub release_time: DateTime<Utc>,
}

/// A single failed test from a blocking job run that belongs to a payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestFailureRecord {
    /// The `prow_job_run_tests` row id
    pub id: i64,
    /// The release tag of the payload this failure counted against
    pub release_tag: String,
    /// The name of the test that failed
    pub test_name: String,
    /// The name of the job that ran the test
    pub job_name: String,
    /// Link to the job run
    pub prow_job_run_url: Option<String>,
    /// The raw test output
    ///
    /// Only loaded when the output was requested, otherwise this is always [None].
    pub output: Option<String>,
}

/// Statistics extracted from the summary line of a disruption regression test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    /// The percentile the test compares against, for example `P85`
    pub percentile: String,
    /// The allowed disruption at that percentile, in seconds
    pub percentile_value: f64,
    /// Grace period in seconds, if the summary had one
    pub grace: Option<u64>,
    /// How many passes the test needed
    pub required_passes: u64,
    /// Number of passes stated in the summary header
    pub reported_passes: u64,
    /// Number of failures stated in the summary header
    pub reported_failures: u64,
    /// Number of entries in the `successes=[...]` list
    pub successes: usize,
    /// Number of entries in the `failures=[...]` list that could be read
    pub failures: usize,
    /// Sum of the disruption seconds of every failure
    pub total_failure_seconds: f64,
    /// Sum of how far each failure went over the percentile value
    ///
    /// Individual failures can be under the percentile value so this may contain negative terms.
    pub total_failed_by_seconds: f64,
    /// [SummaryStats::total_failed_by_seconds] divided by [SummaryStats::failures]
    ///
    /// This is [None] when there were no failures to average over.
    pub average_failed_by_seconds: Option<f64>,
}

impl Display for SummaryStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "percentile={} percentileValue={:.2} grace={} requiredPasses={} successes={} failures={} totalFailureSeconds={:.2} totalFailedBySeconds={:.2} averageFailedBySeconds=",
            self.percentile,
            self.percentile_value,
            self.grace
                .map(|g| g.to_string())
                .unwrap_or_else(|| "none".to_string()),
            self.required_passes,
            self.successes,
            self.failures,
            self.total_failure_seconds,
            self.total_failed_by_seconds,
        )?;
        match self.average_failed_by_seconds {
            Some(average) => write!(f, "{average:.2}"),
            None => write!(f, "n/a"),
        }
    }
}

/// Which releases to look for rejected payloads in
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseFilter {
    /// The release being analysed
    pub release: String,
    /// A second release whose payloads are included
    pub also_release: String,
}

impl Default for ReleaseFilter {
    fn default() -> Self {
        Self {
            release: "4.14".to_string(),
            also_release: "4.15".to_string(),
        }
    }
}

/// Serialize records to a writer as a pretty printed JSON array
pub fn store_records<T: Serialize, W: Write>(records: &[T], writer: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

/// Load records from a reader containing a JSON array
///
/// This is the format produced by [store_records].
pub fn load_records<T: DeserializeOwned, R: Read>(reader: R) -> anyhow::Result<Vec<T>> {
    let reader = std::io::BufReader::new(reader);
    let records: Vec<T> = serde_json::from_reader(reader)?;
    Ok(records)
}
