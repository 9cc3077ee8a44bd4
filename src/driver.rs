/// The check itself: reset ccache, take a baseline, then build the package
/// once per configured variant and attribute cache activity to each build.
use crate::ccache::Ccache;
use crate::conan::Conan;
use crate::config::CheckConfig;
use crate::report;
use crate::runner::{CommandLine, CommandRunner, RunError};
use crate::stats::StatsError;
use crate::summary::{RunSummary, SummaryError};
use std::path::Path;

/// How a check ended when no error escaped.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Every build ran; deltas were reported after each.
    Completed(RunSummary),
    /// ccache could not be reset, so no build was attempted.
    CacheUnavailable,
}

/// Errors that abort a check midway.
#[derive(Debug)]
pub enum CheckError {
    /// A build or stats read failed.
    Command(RunError),
    /// A tracked counter was missing or not an integer.
    Stats(StatsError),
    /// The run finished but its summary could not be written.
    Summary(SummaryError),
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckError::Command(e) => write!(f, "{e}"),
            CheckError::Stats(e) => write!(f, "{e}"),
            CheckError::Summary(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CheckError::Command(e) => Some(e),
            CheckError::Stats(e) => Some(e),
            CheckError::Summary(e) => Some(e),
        }
    }
}

impl From<RunError> for CheckError {
    fn from(e: RunError) -> Self {
        CheckError::Command(e)
    }
}

impl From<StatsError> for CheckError {
    fn from(e: StatsError) -> Self {
        CheckError::Stats(e)
    }
}

impl From<SummaryError> for CheckError {
    fn from(e: SummaryError) -> Self {
        CheckError::Summary(e)
    }
}

/// Resolved tools plus the sequence to run against one package.
pub struct Check<'a> {
    ccache: Ccache,
    conan: Conan,
    config: &'a CheckConfig,
    package: &'a Path,
}

impl<'a> Check<'a> {
    pub fn new(config: &'a CheckConfig, package: &'a Path) -> Result<Self, RunError> {
        Ok(Self {
            ccache: Ccache::from_config(&config.ccache)?,
            conan: Conan::from_config(&config.conan)?,
            config,
            package,
        })
    }

    /// Every command a full run would execute, in order.
    pub fn planned_commands(&self) -> Vec<CommandLine> {
        let mut commands = vec![
            self.ccache.reset_command(),
            self.ccache.show_stats_command(),
        ];
        for variant in &self.config.builds {
            commands.push(self.conan.create_command(self.package, variant));
            commands.push(self.ccache.show_stats_command());
        }
        commands
    }

    /// Run the whole sequence. Steps are strictly ordered; the first
    /// failing build or stats read ends the run.
    pub async fn run<R: CommandRunner>(&self, runner: &mut R) -> Result<CheckOutcome, CheckError> {
        if let Err(e) = self.ccache.reset(runner).await {
            tracing::error!("clearing ccache cache not possible");
            tracing::debug!(error = %e, "ccache reset failed");
            return Ok(CheckOutcome::CacheUnavailable);
        }

        let counters = &self.config.report.counters;
        let mut summary = RunSummary::new(self.package);

        let mut previous = self.ccache.read_stats(runner).await?;
        summary.baseline = report::report_stats(&previous, counters)?;

        let total = self.config.builds.len();
        for (index, variant) in self.config.builds.iter().enumerate() {
            tracing::info!("step {}/{}: {}", index + 1, total, variant);
            self.conan.create(runner, self.package, variant).await?;

            let current = self.ccache.read_stats(runner).await?;
            let deltas = report::report_delta(&previous, &current, counters)?;
            summary.record_step(*variant, deltas);
            previous = current;
        }

        summary.finish(previous);
        Ok(CheckOutcome::Completed(summary))
    }
}
