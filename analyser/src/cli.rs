use clap::{Args, Parser};
use release_payload_model::ReleaseFilter;

#[derive(Debug, Args)]
pub struct PayloadQueryArgs {
    /// Connection string for the CI results database.
    #[arg(long, env = "DSN_PROD", hide_env_values = true)]
    pub dsn: String,

    /// Release to look for rejected payloads in.
    #[arg(long, default_value = "4.14")]
    pub release: String,

    /// Another release whose rejected payloads are included.
    #[arg(long, default_value = "4.15")]
    pub also_release: String,
}

impl PayloadQueryArgs {
    pub fn release_filter(&self) -> ReleaseFilter {
        ReleaseFilter {
            release: self.release.clone(),
            also_release: self.also_release.clone(),
        }
    }
}

/// Count rejected payloads that failed on disruption tests, and what that costs.
#[derive(Debug, Parser)]
#[command(version, long_about = None)]
pub struct DisruptedPayloadsArgs {
    #[command(flatten)]
    pub query: PayloadQueryArgs,

    /// How many of the most failed tests to list.
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Dollar cost of a payload rejected only because of disruption.
    #[arg(long, default_value_t = 500)]
    pub cost_per_payload: u64,
}

/// Print the disruption summaries of failed P70, P85 and P95 regression checks in rejected payloads.
#[derive(Debug, Parser)]
#[command(version, long_about = None)]
pub struct PayloadFailureAnalysisArgs {
    #[command(flatten)]
    pub query: PayloadQueryArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        DisruptedPayloadsArgs::command().debug_assert();
        PayloadFailureAnalysisArgs::command().debug_assert();
    }

    #[test]
    fn defaults() -> anyhow::Result<()> {
        let args = DisruptedPayloadsArgs::try_parse_from([
            "disrupted-payloads",
            "--dsn",
            "postgresql://user@localhost/sippy",
        ])?;

        assert_eq!(args.query.dsn, "postgresql://user@localhost/sippy");
        assert_eq!(args.query.release_filter(), ReleaseFilter::default());
        assert_eq!(args.top, 20);
        assert_eq!(args.cost_per_payload, 500);
        Ok(())
    }

    #[test]
    fn release_filter_from_args() -> anyhow::Result<()> {
        let args = PayloadFailureAnalysisArgs::try_parse_from([
            "payload-failure-analysis",
            "--dsn",
            "postgresql://user@localhost/sippy",
            "--release",
            "4.15",
            "--also-release",
            "4.16",
        ])?;

        assert_eq!(
            args.query.release_filter(),
            ReleaseFilter {
                release: "4.15".to_string(),
                also_release: "4.16".to_string(),
            }
        );
        Ok(())
    }
}
