//! Schema version constants and the migration gate.
//!
//! The engine never reads version state from an ambient store: the host
//! hands the stored version in and persists the new one after a
//! successful run.

/// The data schema version this engine migrates worlds to.
pub const SCHEMA_VERSION: &str = "0.6.0";

/// Whether a world at `stored` needs migrating to `current`.
///
/// A missing or unparseable stored version always migrates; rules are
/// idempotent no-ops on already-migrated data, so erring toward running
/// is safe.
pub fn needs_migration(stored: Option<&str>, current: &str) -> bool {
    let Some(stored) = stored else {
        return true;
    };
    match (parse_version(stored), parse_version(current)) {
        (Some(from), Some(to)) => from < to,
        _ => true,
    }
}

/// Parse a `major.minor.patch` version string.
fn parse_version(raw: &str) -> Option<(u32, u32, u32)> {
    let mut parts = raw.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_version_migrates() {
        assert!(needs_migration(None, SCHEMA_VERSION));
    }

    #[test]
    fn older_version_migrates() {
        assert!(needs_migration(Some("0.5.13"), "0.6.0"));
    }

    #[test]
    fn current_version_does_not_migrate() {
        assert!(!needs_migration(Some("0.6.0"), "0.6.0"));
    }

    #[test]
    fn newer_version_does_not_migrate() {
        assert!(!needs_migration(Some("0.7.1"), "0.6.0"));
    }

    #[test]
    fn garbage_version_migrates() {
        assert!(needs_migration(Some("yesterday"), "0.6.0"));
        assert!(needs_migration(Some("1.2"), "0.6.0"));
        assert!(needs_migration(Some("1.2.3.4"), "0.6.0"));
    }

    #[test]
    fn comparison_is_numeric_not_lexicographic() {
        assert!(needs_migration(Some("0.9.0"), "0.10.0"));
    }
}
