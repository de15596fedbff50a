use std::fmt;

use serde::Serialize;

/// Version details baked in at compile time.
///
/// `LADLE_GIT_COMMIT` and `LADLE_BUILD_TIME` are read from the build
/// environment and fall back to `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_time: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_commit: option_env!("LADLE_GIT_COMMIT").unwrap_or("unknown"),
            build_time: option_env!("LADLE_BUILD_TIME").unwrap_or("unknown"),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ladle {}", self.version)?;
        writeln!(f, "Git Commit: {}", self.git_commit)?;
        writeln!(f, "Build Time: {}", self.build_time)?;
        write!(f, "OS/Arch: {}/{}", self.os, self.arch)
    }
}
