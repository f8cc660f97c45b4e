use release_payload_model::{ReleaseFilter, SummaryStats};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Why rejected payloads failed, with a focus on disruption tests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisruptedPayloadsReport {
    pub release_filter: ReleaseFilter,
    pub payload_count: usize,
    /// Payloads that would have been accepted if not for disruption
    pub only_disrupted_payloads: Vec<OnlyDisruptedPayload>,
    /// The tests that failed the most payloads, most first
    pub top_failing_tests: Vec<TestFailureCount>,
    /// Payloads where at least one disruption test failed
    pub some_disrupted: usize,
    /// Payloads where only disruption tests failed
    pub only_disrupted: usize,
    /// The assumed dollar cost of a rejected payload
    pub cost_per_payload: u64,
}

impl DisruptedPayloadsReport {
    pub fn estimated_monthly_cost(&self) -> u64 {
        self.cost_per_payload * self.only_disrupted as u64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OnlyDisruptedPayload {
    pub release_tag: String,
    pub failures: Vec<JobFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobFailure {
    pub test_name: String,
    pub job_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestFailureCount {
    pub test_name: String,
    /// Number of payloads the test failed in
    pub count: usize,
}

impl Display for DisruptedPayloadsReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Found {} failed payloads", self.payload_count)?;
        for payload in &self.only_disrupted_payloads {
            writeln!(
                f,
                "{} FAILED ONLY ON AGGREGATED DISRUPTION",
                payload.release_tag
            )?;
            for failure in &payload.failures {
                writeln!(f, "    {} - {}", failure.test_name, failure.job_name)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Top failing tests")?;
        for test in &self.top_failing_tests {
            writeln!(f, "Test Name: {}, Count: {}", test.test_name, test.count)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{}/{} failed payloads included some disruption",
            self.some_disrupted, self.payload_count
        )?;
        writeln!(
            f,
            "{}/{} failed payloads were only due to disruption",
            self.only_disrupted, self.payload_count
        )?;
        writeln!(
            f,
            "Estimated cost at ${}/payload = {}/month",
            self.cost_per_payload,
            self.estimated_monthly_cost()
        )
    }
}

/// How the disruption regression checks failed in rejected payloads
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionCheckReport {
    pub release_filter: ReleaseFilter,
    pub payload_count: usize,
    pub matches: Vec<RegressionCheckMatch>,
    /// How many failures matched each check, in check order
    pub check_counts: Vec<RegressionCheckCount>,
}

/// A failed test whose name matched a regression check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionCheckMatch {
    pub release_tag: String,
    pub check: String,
    pub test_name: String,
    pub job_name: String,
    pub prow_job_run_url: Option<String>,
    pub summary_line: String,
    /// [None] when the output had no summary that could be read
    pub stats: Option<SummaryStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionCheckCount {
    pub check: String,
    pub count: usize,
}

impl Display for RegressionCheckReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Found {} failed payloads", self.payload_count)?;
        for m in &self.matches {
            writeln!(f, "{}", m.test_name)?;
            writeln!(
                f,
                "    {} - {} - {}",
                m.release_tag,
                m.job_name,
                m.prow_job_run_url.as_deref().unwrap_or("no url")
            )?;
            writeln!(f, "{}", m.summary_line)?;
            match &m.stats {
                Some(stats) => writeln!(f, "{stats}")?,
                None => writeln!(f, "None")?,
            }
            writeln!(f)?;
            writeln!(f)?;
        }

        writeln!(f, "Regression check failures")?;
        for count in &self.check_counts {
            writeln!(f, "{}: {}", count.check, count.count)?;
        }

        Ok(())
    }
}
