//! Reconciliation-run configuration.

use std::time::Duration;

/// Options threaded through one [`crate::reconciler::Reconciler::migrate`]
/// call. Carries no file paths or history-table settings: this engine has
/// neither.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// `lock_timeout` applied to the outer transaction.
    pub lock_timeout: Duration,
    /// `statement_timeout` applied to the outer transaction.
    pub statement_timeout: Duration,
    /// Destructive pre-pass: drop all non-`plpgsql` extensions, all
    /// public tables (`CASCADE`), and all public enum types before
    /// reconciling. Also gates enum value removal and orphan-type drops
    /// that would otherwise abort.
    pub reset: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(2),
            statement_timeout: Duration::from_secs(5),
            reset: false,
        }
    }
}

impl MigrationConfig {
    /// Config with default timeouts and `reset` as given.
    pub fn new(reset: bool) -> Self {
        Self {
            reset,
            ..Self::default()
        }
    }

    /// Override `lock_timeout`.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Override `statement_timeout`.
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// `SET LOCAL` statements applying both timeouts, run once right
    /// after the outer transaction opens.
    pub fn set_local_sql(&self) -> Vec<String> {
        vec![
            format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis()),
            format!(
                "SET LOCAL statement_timeout = '{}ms'",
                self.statement_timeout.as_millis()
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_two_and_five_seconds() {
        let config = MigrationConfig::default();
        assert_eq!(config.lock_timeout, Duration::from_secs(2));
        assert_eq!(config.statement_timeout, Duration::from_secs(5));
        assert!(!config.reset);
    }

    #[test]
    fn set_local_sql_reflects_overrides() {
        let config = MigrationConfig::new(true).lock_timeout(Duration::from_millis(500));
        let statements = config.set_local_sql();
        assert!(statements[0].contains("500ms"));
        assert!(config.reset);
    }
}
