//! Versioned partition names.

use serde::{Deserialize, Serialize};

/// Names of the partitions owned by the running worker version.
///
/// Built once from configuration and handed to every consumer of the store.
/// Bumping the version yields new names, which is how a deployment
/// invalidates every entry cached by an older one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    static_name: String,
    dynamic_name: String,
}

impl CacheNames {
    /// `<prefix>-static-<version>` and `<prefix>-dynamic-<version>`.
    pub fn new(prefix: &str, version: &str) -> Self {
        Self { static_name: format!("{prefix}-static-{version}"), dynamic_name: format!("{prefix}-dynamic-{version}") }
    }

    /// Explicit names, for hosts that do not follow the prefix scheme.
    pub fn from_names(static_name: impl Into<String>, dynamic_name: impl Into<String>) -> Self {
        Self { static_name: static_name.into(), dynamic_name: dynamic_name.into() }
    }

    /// Partition holding the app shell and other static assets.
    pub fn static_name(&self) -> &str {
        &self.static_name
    }

    /// Partition holding API responses and other runtime fetches.
    pub fn dynamic_name(&self) -> &str {
        &self.dynamic_name
    }

    /// Names that survive activation.
    pub fn current(&self) -> Vec<String> {
        vec![self.static_name.clone(), self.dynamic_name.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versioned_names() {
        let names = CacheNames::new("ruralcare", "v1.0.0");
        assert_eq!(names.static_name(), "ruralcare-static-v1.0.0");
        assert_eq!(names.dynamic_name(), "ruralcare-dynamic-v1.0.0");
    }

    #[test]
    fn test_version_bump_changes_names() {
        let old = CacheNames::new("ruralcare", "v1.0.0");
        let new = CacheNames::new("ruralcare", "v1.0.1");
        assert_ne!(old.static_name(), new.static_name());
        assert_ne!(old.dynamic_name(), new.dynamic_name());
    }

    #[test]
    fn test_current() {
        let names = CacheNames::from_names("static-v1", "dynamic-v1");
        assert_eq!(names.current(), vec!["static-v1", "dynamic-v1"]);
    }
}
