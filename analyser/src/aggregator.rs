use crate::classify::classify_failures;
use crate::model::{
    DisruptedPayloadsReport, JobFailure, OnlyDisruptedPayload, RegressionCheckCount,
    RegressionCheckMatch, RegressionCheckReport, TestFailureCount,
};
use crate::summary::{extract_summary_line, parse_summary};
use itertools::Itertools;
use release_payload_model::{Payload, ReleaseFilter, TestFailureRecord};
use std::collections::HashMap;

/// Disruption regression checks, matched as substrings of the test name
pub const REGRESSION_CHECKS: [&str; 3] = [
    "disruption P70 should not be worse",
    "disruption P85 should not be worse",
    "disruption P95 should not be worse",
];

/// Tallies the failed tests of rejected payloads
#[derive(Debug)]
pub struct DisruptionAggregator {
    release_filter: ReleaseFilter,
    payload_count: usize,
    some_disrupted: usize,
    only_disrupted: usize,
    only_disrupted_payloads: Vec<OnlyDisruptedPayload>,
    /// Number of payloads each test failed in
    test_fail_counts: HashMap<String, usize>,
}

impl DisruptionAggregator {
    pub fn new(release_filter: ReleaseFilter) -> Self {
        Self {
            release_filter,
            payload_count: 0,
            some_disrupted: 0,
            only_disrupted: 0,
            only_disrupted_payloads: Vec::new(),
            test_fail_counts: HashMap::new(),
        }
    }

    pub fn add_payload(&mut self, payload: &Payload, failures: &[TestFailureRecord]) {
        self.payload_count += 1;

        let classified = classify_failures(failures);
        if classified.has_disruption() {
            self.some_disrupted += 1;

            if classified.only_disruption() {
                log::debug!(
                    "{} failed only on aggregated disruption",
                    payload.release_tag
                );
                self.only_disrupted += 1;
                self.only_disrupted_payloads.push(OnlyDisruptedPayload {
                    release_tag: payload.release_tag.clone(),
                    failures: classified
                        .disruption
                        .iter()
                        .map(|failure| JobFailure {
                            test_name: failure.test_name.clone(),
                            job_name: failure.job_name.clone(),
                        })
                        .collect(),
                });
            }
        }

        // A test counts once per payload, however many job runs it failed in
        for test_name in failures.iter().map(|f| f.test_name.as_str()).unique() {
            *self
                .test_fail_counts
                .entry(test_name.to_string())
                .or_default() += 1;
        }
    }

    pub fn finish(self, top: usize, cost_per_payload: u64) -> DisruptedPayloadsReport {
        let top_failing_tests = self
            .test_fail_counts
            .into_iter()
            .sorted_by(|(a_name, a_count), (b_name, b_count)| {
                b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
            })
            .take(top)
            .map(|(test_name, count)| TestFailureCount { test_name, count })
            .collect();

        DisruptedPayloadsReport {
            release_filter: self.release_filter,
            payload_count: self.payload_count,
            only_disrupted_payloads: self.only_disrupted_payloads,
            top_failing_tests,
            some_disrupted: self.some_disrupted,
            only_disrupted: self.only_disrupted,
            cost_per_payload,
        }
    }
}

/// Collects the summaries of failed disruption regression checks
#[derive(Debug)]
pub struct RegressionCheckAggregator {
    release_filter: ReleaseFilter,
    payload_count: usize,
    matches: Vec<RegressionCheckMatch>,
    check_counts: [usize; REGRESSION_CHECKS.len()],
}

impl RegressionCheckAggregator {
    pub fn new(release_filter: ReleaseFilter) -> Self {
        Self {
            release_filter,
            payload_count: 0,
            matches: Vec::new(),
            check_counts: [0; REGRESSION_CHECKS.len()],
        }
    }

    pub fn add_payload(&mut self, payload: &Payload, failures: &[TestFailureRecord]) {
        self.payload_count += 1;

        for failure in failures {
            for (i, check) in REGRESSION_CHECKS.iter().enumerate() {
                if !failure.test_name.contains(check) {
                    continue;
                }

                self.check_counts[i] += 1;

                let summary_line = failure
                    .output
                    .as_deref()
                    .map(extract_summary_line)
                    .unwrap_or_default();
                let stats = parse_summary(&summary_line);
                if stats.is_none() {
                    log::debug!(
                        "No summary found for {} in {}",
                        failure.test_name,
                        payload.release_tag
                    );
                }

                self.matches.push(RegressionCheckMatch {
                    release_tag: payload.release_tag.clone(),
                    check: check.to_string(),
                    test_name: failure.test_name.clone(),
                    job_name: failure.job_name.clone(),
                    prow_job_run_url: failure.prow_job_run_url.clone(),
                    summary_line,
                    stats,
                });
            }
        }
    }

    pub fn finish(self) -> RegressionCheckReport {
        RegressionCheckReport {
            release_filter: self.release_filter,
            payload_count: self.payload_count,
            matches: self.matches,
            check_counts: REGRESSION_CHECKS
                .iter()
                .zip(self.check_counts)
                .map(|(check, count)| RegressionCheckCount {
                    check: check.to_string(),
                    count,
                })
                .collect(),
        }
    }
}
