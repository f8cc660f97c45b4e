use release_payload_model::SummaryStats;
use thiserror::Error;

/// Problems found in a summary line that did not stop it from being parsed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummaryDiagnostic {
    #[error("Successes not found in the summary")]
    MissingSuccesses,
    #[error("Failures not found in the summary")]
    MissingFailures,
    #[error("Could not read failure entry {token:?}")]
    MalformedFailure { token: String },
    #[error("No failures to average the failed by seconds over")]
    NoFailuresToAverage,
}

/// Rebuild the summary line from the output of a disruption regression test.
///
/// The summary starts on a line beginning with `summary:` and wraps onto following lines until a
/// line beginning with `passes:`. Wrapped lines carry one leading character of indentation which
/// is dropped before joining.
pub fn extract_summary_line(output: &str) -> String {
    let mut summary_line = String::new();
    let mut in_summary = false;

    for line in output.lines() {
        if line.starts_with("summary:") {
            summary_line.push_str(line);
            in_summary = true;
            continue;
        }

        if in_summary && line.starts_with("passes:") {
            in_summary = false;
            continue;
        }

        if in_summary {
            let mut chars = line.chars();
            chars.next();
            summary_line.push_str(chars.as_str());
        }
    }

    summary_line
}

/// Parse a summary line, logging anything that had to be defaulted.
///
/// Returns [None] if the line does not contain a `Failed: Passed ...` summary.
pub fn parse_summary(line: &str) -> Option<SummaryStats> {
    let (stats, diagnostics) = read_summary(line)?;
    for diagnostic in diagnostics {
        log::warn!("{diagnostic}: {line}");
    }

    Some(stats)
}

/// Parse a summary line, returning the diagnostics instead of logging them.
pub fn read_summary(line: &str) -> Option<(SummaryStats, Vec<SummaryDiagnostic>)> {
    let header = line
        .match_indices("Failed: Passed ")
        .find_map(|(start, _)| read_header(&line[start..]))?;

    let mut diagnostics = Vec::new();

    let successes = match bracketed_list(line, "successes") {
        Some(list) => list.split_whitespace().count(),
        None => {
            diagnostics.push(SummaryDiagnostic::MissingSuccesses);
            0
        }
    };

    let mut failures = 0;
    let mut total_failure_seconds = 0.0;
    let mut total_failed_by_seconds = 0.0;
    match bracketed_list(line, "failures") {
        Some(list) => {
            for token in list.split_whitespace() {
                match failure_seconds(token) {
                    Some(seconds) => {
                        failures += 1;
                        total_failure_seconds += seconds;
                        total_failed_by_seconds += seconds - header.percentile_value;
                    }
                    None => diagnostics.push(SummaryDiagnostic::MalformedFailure {
                        token: token.to_string(),
                    }),
                }
            }
        }
        None => diagnostics.push(SummaryDiagnostic::MissingFailures),
    }

    let average_failed_by_seconds = if failures == 0 {
        diagnostics.push(SummaryDiagnostic::NoFailuresToAverage);
        None
    } else {
        Some(total_failed_by_seconds / failures as f64)
    };

    Some((
        SummaryStats {
            percentile: header.percentile,
            percentile_value: header.percentile_value,
            grace: header.grace,
            required_passes: header.required_passes,
            reported_passes: header.passes,
            reported_failures: header.failures,
            successes,
            failures,
            total_failure_seconds,
            total_failed_by_seconds,
            average_failed_by_seconds,
        },
        diagnostics,
    ))
}

struct SummaryHeader {
    passes: u64,
    failures: u64,
    percentile: String,
    percentile_value: f64,
    grace: Option<u64>,
    required_passes: u64,
}

/// Reads `Failed: Passed <n> times, failed <m> times.  (P<k>=<x>s [(grace=<g>)]) requiredPasses=<r>`
fn read_header(input: &str) -> Option<SummaryHeader> {
    let mut cursor = Cursor::new(input);

    cursor.eat("Failed: Passed ")?;
    let passes = cursor.unsigned()?;
    cursor.eat(" times, failed ")?;
    let failures = cursor.unsigned()?;
    cursor.eat(" times.")?;
    cursor.skip_whitespace();

    cursor.eat("(")?;
    cursor.eat("P")?;
    let percentile = format!("P{}", cursor.digits()?);
    cursor.eat("=")?;
    let percentile_value = cursor.decimal()?;
    cursor.eat("s")?;

    cursor.skip_whitespace();
    let grace = if cursor.eat("(grace=").is_some() {
        Some(cursor.unsigned()?)
    } else {
        None
    };

    // Closing parentheses for the grace and percentile groups
    loop {
        cursor.skip_whitespace();
        if cursor.eat(")").is_none() {
            break;
        }
    }

    cursor.eat("requiredPasses=")?;
    let required_passes = cursor.unsigned()?;

    Some(SummaryHeader {
        passes,
        failures,
        percentile,
        percentile_value,
        grace,
        required_passes,
    })
}

/// The content of the first `<name>=[...]` in the line
fn bracketed_list<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let open = format!("{name}=[");
    let start = line.find(&open)? + open.len();
    let len = line[start..].find(']')?;

    Some(&line[start..start + len])
}

/// Reads the seconds out of a `<job run id>=<seconds>s` failure entry
fn failure_seconds(token: &str) -> Option<f64> {
    let (_, value) = token.split_once('=')?;
    value.strip_suffix('s').unwrap_or(value).parse().ok()
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn eat(&mut self, literal: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(literal)?;
        Some(())
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> Option<&'a str> {
        let end = self.rest.find(|c: char| !pred(c)).unwrap_or(self.rest.len());
        if end == 0 {
            return None;
        }

        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(taken)
    }

    fn digits(&mut self) -> Option<&'a str> {
        self.take_while(|c| c.is_ascii_digit())
    }

    fn unsigned(&mut self) -> Option<u64> {
        self.digits()?.parse().ok()
    }

    fn decimal(&mut self) -> Option<f64> {
        self.take_while(|c| c.is_ascii_digit() || c == '.')?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "Failed: Passed 3 times, failed 2 times.  (P85=2.00s) requiredPasses=5 successes=[a=1s b=1s c=1s] failures=[x=3s y=5s]";

    #[test]
    fn parses_well_formed_summary() {
        let (stats, diagnostics) = read_summary(WELL_FORMED).unwrap();

        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(stats.percentile, "P85");
        assert_eq!(stats.percentile_value, 2.0);
        assert_eq!(stats.grace, None);
        assert_eq!(stats.required_passes, 5);
        assert_eq!(stats.reported_passes, 3);
        assert_eq!(stats.reported_failures, 2);
        assert_eq!(stats.successes, 3);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.total_failure_seconds, 8.0);
        assert_eq!(stats.total_failed_by_seconds, 4.0);
        assert_eq!(stats.average_failed_by_seconds, Some(2.0));
    }

    #[test]
    fn failed_by_seconds_are_signed() {
        let line = "Failed: Passed 1 times, failed 4 times.  (P95=4.50s) requiredPasses=5 successes=[1=2s] failures=[2=5.5s 3=6.5s 4=4.5s 5=3.5s]";
        let stats = parse_summary(line).unwrap();

        assert_eq!(stats.failures, 4);
        assert_eq!(stats.total_failure_seconds, 20.0);
        assert_eq!(stats.total_failed_by_seconds, 2.0);
        assert_eq!(stats.average_failed_by_seconds, Some(0.5));
    }

    #[test]
    fn reads_grace() {
        let line = "summary: 'Failed: Passed 2 times, failed 3 times.  (P70=1.25s (grace=3)) requiredPasses=4 successes=[1=0s 2=1s] failures=[3=2.25s 4=3.25s 5=1.25s]'";
        let stats = parse_summary(line).unwrap();

        assert_eq!(stats.percentile, "P70");
        assert_eq!(stats.percentile_value, 1.25);
        assert_eq!(stats.grace, Some(3));
        assert_eq!(stats.required_passes, 4);
        assert_eq!(stats.total_failure_seconds, 6.75);
        assert_eq!(stats.total_failed_by_seconds, 3.0);
        assert_eq!(stats.average_failed_by_seconds, Some(1.0));
    }

    #[test]
    fn reads_grace_without_its_own_closing_paren() {
        let line = "Failed: Passed 0 times, failed 1 times.  (P95=3s (grace=2) requiredPasses=1 successes=[] failures=[1=4s]";
        let stats = parse_summary(line).unwrap();

        assert_eq!(stats.grace, Some(2));
        assert_eq!(stats.required_passes, 1);
        assert_eq!(stats.successes, 0);
    }

    #[test]
    fn missing_successes_defaults_to_zero() {
        let line = "Failed: Passed 0 times, failed 2 times.  (P85=2.00s) requiredPasses=5 failures=[x=3s y=5s]";
        let (stats, diagnostics) = read_summary(line).unwrap();

        assert_eq!(stats.successes, 0);
        assert_eq!(stats.failures, 2);
        assert_eq!(diagnostics, vec![SummaryDiagnostic::MissingSuccesses]);
    }

    #[test]
    fn missing_failures_has_no_average() {
        let line = "Failed: Passed 3 times, failed 0 times.  (P85=2.00s) requiredPasses=5 successes=[a=1s b=1s c=1s]";
        let (stats, diagnostics) = read_summary(line).unwrap();

        assert_eq!(stats.failures, 0);
        assert_eq!(stats.total_failure_seconds, 0.0);
        assert_eq!(stats.total_failed_by_seconds, 0.0);
        assert_eq!(stats.average_failed_by_seconds, None);
        assert_eq!(
            diagnostics,
            vec![
                SummaryDiagnostic::MissingFailures,
                SummaryDiagnostic::NoFailuresToAverage
            ]
        );
    }

    #[test]
    fn empty_failures_has_no_average() {
        let line = "Failed: Passed 0 times, failed 0 times.  (P70=1.00s) requiredPasses=3 successes=[] failures=[]";
        let (stats, diagnostics) = read_summary(line).unwrap();

        assert_eq!(stats.successes, 0);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.average_failed_by_seconds, None);
        assert_eq!(diagnostics, vec![SummaryDiagnostic::NoFailuresToAverage]);
    }

    #[test]
    fn malformed_failures_are_skipped() {
        let line = "Failed: Passed 0 times, failed 3 times.  (P85=2.00s) requiredPasses=5 successes=[] failures=[x=3s broken y=zs z=4s]";
        let (stats, diagnostics) = read_summary(line).unwrap();

        assert_eq!(stats.failures, 2);
        assert_eq!(stats.total_failure_seconds, 7.0);
        assert_eq!(stats.average_failed_by_seconds, Some(1.5));
        assert_eq!(
            diagnostics,
            vec![
                SummaryDiagnostic::MalformedFailure {
                    token: "broken".to_string()
                },
                SummaryDiagnostic::MalformedFailure {
                    token: "y=zs".to_string()
                },
            ]
        );
    }

    #[test]
    fn no_summary_is_no_result() {
        assert!(parse_summary("").is_none());
        assert!(parse_summary("fail [k8s.io/kubernetes/test/e2e/network.go:12]: timed out").is_none());
        // Drifted format
        assert!(parse_summary("Failed: Passed 3 times, failed 2 times. P85=2.00s requiredPasses=5").is_none());
        assert!(parse_summary("Failed: Passed 3 times, failed 2 times.  (P85=2.00s) successes=[a=1s]").is_none());
    }

    #[test]
    fn later_summary_is_used_when_first_is_malformed() {
        let line = format!("Failed: Passed x times. {WELL_FORMED}");
        let stats = parse_summary(&line).unwrap();

        assert_eq!(stats.percentile, "P85");
        assert_eq!(stats.failures, 2);
    }

    #[test]
    fn extracts_wrapped_summary_line() {
        let output = "disruption was worse than allowed\nsummary: 'Failed: Passed 3 times, failed 2 times.  (P85=2.00s) requiredPasses=5\n\tsuccesses=[a=1s b=1s c=1s]\n\tfailures=[x=3s y=5s]'\npasses: 3\nfailures: 2\n";

        let line = extract_summary_line(output);

        assert_eq!(
            line,
            "summary: 'Failed: Passed 3 times, failed 2 times.  (P85=2.00s) requiredPasses=5successes=[a=1s b=1s c=1s]failures=[x=3s y=5s]'"
        );
        let stats = parse_summary(&line).unwrap();
        assert_eq!(stats.successes, 3);
        assert_eq!(stats.total_failure_seconds, 8.0);
    }

    #[test]
    fn extract_without_summary_is_empty() {
        assert_eq!(extract_summary_line("passes: 3\nsomething else"), "");
    }
}
