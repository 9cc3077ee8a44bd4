/// The two ccache invocations the check needs: zeroing the cache and
/// reading its statistics.
use crate::config::CcacheConfig;
use crate::runner::{CommandLine, CommandRunner, RunError};
use crate::stats::StatsSnapshot;

#[derive(Debug, Clone)]
pub struct Ccache {
    base: CommandLine,
}

impl Ccache {
    /// Build from config; `command` may carry leading options,
    /// e.g. `"ccache --config-path /etc/ccache.conf"`.
    pub fn from_config(config: &CcacheConfig) -> Result<Self, RunError> {
        Ok(Self {
            base: config.command.parse()?,
        })
    }

    pub fn reset_command(&self) -> CommandLine {
        self.base.clone().args(["--clear", "--zero-stats"])
    }

    pub fn show_stats_command(&self) -> CommandLine {
        self.base.clone().arg("--show-stats")
    }

    /// Drop every cached object and zero the counters.
    pub async fn reset<R: CommandRunner>(&self, runner: &mut R) -> Result<(), RunError> {
        runner.run(&self.reset_command()).await?;
        Ok(())
    }

    /// Take a snapshot of the current counters.
    pub async fn read_stats<R: CommandRunner>(
        &self,
        runner: &mut R,
    ) -> Result<StatsSnapshot, RunError> {
        let report = runner.run(&self.show_stats_command()).await?;
        let snapshot = StatsSnapshot::parse(&report);
        if snapshot.is_empty() {
            tracing::warn!("ccache printed no statistics");
        }
        tracing::debug!(entries = snapshot.len(), "parsed ccache statistics");
        Ok(snapshot)
    }
}
