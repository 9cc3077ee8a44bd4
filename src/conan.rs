/// Package builds through `conan create` under a given build configuration.
use crate::config::ConanConfig;
use crate::runner::{CommandLine, CommandRunner, RunError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Value passed as `-s build_type=<..>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildType {
    Release,
    Debug,
    RelWithDebInfo,
    MinSizeRel,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildType::Release => "Release",
            BuildType::Debug => "Debug",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        };
        f.write_str(name)
    }
}

/// One build configuration in the check sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildVariant {
    pub build_type: BuildType,
    pub with_tests: bool,
}

impl BuildVariant {
    pub const fn new(build_type: BuildType, with_tests: bool) -> Self {
        Self {
            build_type,
            with_tests,
        }
    }

    /// The `-o *:with_tests=<..>` value; conan options use Python booleans.
    fn with_tests_option(&self) -> String {
        let flag = if self.with_tests { "True" } else { "False" };
        format!("*:with_tests={flag}")
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.with_tests { "True" } else { "False" };
        write!(f, "{}, with_tests={flag}", self.build_type)
    }
}

/// Default check sequence. The last entry repeats the first on purpose: it
/// shows whether an identical rebuild hits the cache after the other
/// configurations have run in between.
pub const DEFAULT_SEQUENCE: [BuildVariant; 4] = [
    BuildVariant::new(BuildType::Release, true),
    BuildVariant::new(BuildType::Release, false),
    BuildVariant::new(BuildType::Debug, true),
    BuildVariant::new(BuildType::Release, true),
];

#[derive(Debug, Clone)]
pub struct Conan {
    base: CommandLine,
    extra_args: Vec<String>,
}

impl Conan {
    pub fn from_config(config: &ConanConfig) -> Result<Self, RunError> {
        Ok(Self {
            base: config.command.parse()?,
            extra_args: config.extra_args.clone(),
        })
    }

    /// `conan create <package> -s build_type=<T> -o *:with_tests=<B> [extra...]`
    pub fn create_command(&self, package: &Path, variant: &BuildVariant) -> CommandLine {
        self.base
            .clone()
            .arg("create")
            .arg(package.as_os_str())
            .arg("-s")
            .arg(format!("build_type={}", variant.build_type))
            .arg("-o")
            .arg(variant.with_tests_option())
            .args(self.extra_args.iter().cloned())
    }

    /// Build `package` once under `variant`.
    pub async fn create<R: CommandRunner>(
        &self,
        runner: &mut R,
        package: &Path,
        variant: &BuildVariant,
    ) -> Result<(), RunError> {
        runner.run(&self.create_command(package, variant)).await?;
        Ok(())
    }
}
