use std::fmt;

use serde::Serialize;

/// Compile-time build metadata, reported on startup and by the version
/// endpoints
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub version: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, features: {}, built {})",
            self.version, self.build_profile, self.build_features, self.build_timestamp
        )
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        build_profile: env!("BUILD_PROFILE"),
        build_features: env!("BUILD_FEATURES"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        version: env!("REPO_VERSION"),
    }
}
