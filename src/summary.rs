//! Aggregate a run's [`DownloadResult`]s into counts and an exit code
//! for the CLI to report.

use crate::model::DownloadResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[DownloadResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self { succeeded, failed }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// `0` if every URL succeeded, `1` if at least one failed. Run-level
    /// cancellation (exit code `130`) is signaled separately by the
    /// caller, since it short-circuits before a summary is ever built.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }
}

pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_CANCELED: i32 = 130;

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    #[test]
    fn all_success_exits_zero() {
        let results = vec![DownloadResult::success(url(), 200, "/tmp/a".into())];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn any_failure_exits_one() {
        let results = vec![
            DownloadResult::success(url(), 200, "/tmp/a".into()),
            DownloadResult::http_error(url(), 404, "Not Found"),
        ];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn empty_results_is_success() {
        let summary = RunSummary::from_results(&[]);
        assert_eq!(summary.exit_code(), 0);
    }
}
