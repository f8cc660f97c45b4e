use release_payload_model::TestFailureRecord;

/// Test names containing any of these are disruption tests
const DISRUPTION_MARKERS: [&str; 2] = ["BackendDisruption.", "plus five standard deviations"];

pub fn is_disruption_test(test_name: &str) -> bool {
    DISRUPTION_MARKERS
        .iter()
        .any(|marker| test_name.contains(marker))
}

/// The failures of one payload, split by whether they are disruption tests
#[derive(Debug, Default)]
pub struct ClassifiedFailures<'a> {
    pub disruption: Vec<&'a TestFailureRecord>,
    pub other: Vec<&'a TestFailureRecord>,
}

impl ClassifiedFailures<'_> {
    pub fn has_disruption(&self) -> bool {
        !self.disruption.is_empty()
    }

    /// Disruption was the only reason the payload failed
    pub fn only_disruption(&self) -> bool {
        self.has_disruption() && self.other.is_empty()
    }
}

pub fn classify_failures(failures: &[TestFailureRecord]) -> ClassifiedFailures<'_> {
    let (disruption, other) = failures
        .iter()
        .partition(|failure| is_disruption_test(&failure.test_name));

    ClassifiedFailures { disruption, other }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(test_name: &str) -> TestFailureRecord {
        TestFailureRecord {
            id: 1,
            release_tag: "4.14.0-0.nightly-2023-09-20-010101".to_string(),
            test_name: test_name.to_string(),
            job_name: "aggregated-aws-ovn-upgrade-4.14-micro".to_string(),
            prow_job_run_url: None,
            output: None,
        }
    }

    #[test]
    fn disruption_test_names() {
        assert!(is_disruption_test("[sig-network] BackendDisruption.something"));
        assert!(is_disruption_test(
            "[sig-api-machinery] kube-api new connections within plus five standard deviations"
        ));
        assert!(!is_disruption_test("[sig-api] some other check"));
        // Needs the trailing dot
        assert!(!is_disruption_test("[sig-network] BackendDisruption"));
    }

    #[test]
    fn only_disruption_when_nothing_else_failed() {
        let failures = vec![failure("[sig-network] BackendDisruption.something")];
        let classified = classify_failures(&failures);

        assert!(classified.has_disruption());
        assert!(classified.only_disruption());
    }

    #[test]
    fn mixed_failures_are_not_only_disruption() {
        let failures = vec![
            failure("[sig-network] BackendDisruption.something"),
            failure("[sig-api] some other check"),
        ];
        let classified = classify_failures(&failures);

        assert_eq!(classified.disruption.len(), 1);
        assert_eq!(classified.other.len(), 1);
        assert!(classified.has_disruption());
        assert!(!classified.only_disruption());
    }

    #[test]
    fn no_failures_is_not_disrupted() {
        let classified = classify_failures(&[]);

        assert!(!classified.has_disruption());
        assert!(!classified.only_disruption());
    }
}
