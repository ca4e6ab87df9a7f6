use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use pool_model::ExecKind;

use crate::error::{Error, Result};

/// One entry of the prewarm configuration: keep `count` containers of
/// `(exec_kind, memory_mb)` ready at all times, replacing each as it is
/// promoted out of `prewarmed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrewarmEntry {
    pub count: u32,
    pub exec_kind: String,
    pub memory_mb: u32,
}

/// Pool configuration surface of §6: `maxActiveContainers`, `prewarmConfig`
/// and `logMessageInterval`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub max_active_containers: u32,

    #[serde(default)]
    pub prewarm: Vec<PrewarmEntry>,

    #[serde(default = "default_log_message_interval_secs")]
    pub log_message_interval_secs: u64,

    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log directory for file-based logging; console-only when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_message_interval_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PoolConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: PoolConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the §7 configuration-error taxonomy: non-positive
    /// `max_active_containers`, or an ill-formed prewarm entry
    /// (zero count or empty exec-kind).
    pub fn validate(&self) -> Result<()> {
        if self.max_active_containers == 0 {
            return Err(Error::Invalid(
                "max_active_containers must be positive".into(),
            ));
        }
        for entry in &self.prewarm {
            if entry.count == 0 {
                return Err(Error::Invalid(format!(
                    "prewarm entry for {} has count=0",
                    entry.exec_kind
                )));
            }
            if entry.exec_kind.trim().is_empty() {
                return Err(Error::Invalid("prewarm entry has empty exec_kind".into()));
            }
        }
        Ok(())
    }

    /// `(ExecKind, memory_mb, count)` triples ready for the Prewarm
    /// Manager's initial-fill pass.
    pub fn prewarm_targets(&self) -> Vec<(ExecKind, u32, u32)> {
        self.prewarm
            .iter()
            .map(|e| (ExecKind::new(e.exec_kind.clone()), e.memory_mb, e.count))
            .collect()
    }

    pub fn log_message_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.log_message_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "nodejs:6", 256)]
    #[case(4, "", 256)]
    #[case(4, "   ", 256)]
    fn rejects_ill_formed_prewarm_entries(
        #[case] count: u32,
        #[case] exec_kind: &str,
        #[case] memory_mb: u32,
    ) {
        let cfg = PoolConfig {
            max_active_containers: 4,
            prewarm: vec![PrewarmEntry {
                count,
                exec_kind: exec_kind.to_string(),
                memory_mb,
            }],
            log_message_interval_secs: 10,
            log_level: "info".into(),
            log_dir: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_active() {
        let cfg = PoolConfig {
            max_active_containers: 0,
            prewarm: vec![],
            log_message_interval_secs: 10,
            log_level: "info".into(),
            log_dir: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_count_prewarm_entry() {
        let cfg = PoolConfig {
            max_active_containers: 4,
            prewarm: vec![PrewarmEntry {
                count: 0,
                exec_kind: "nodejs:6".into(),
                memory_mb: 256,
            }],
            log_message_interval_secs: 10,
            log_level: "info".into(),
            log_dir: None,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        let cfg = PoolConfig {
            max_active_containers: 4,
            prewarm: vec![PrewarmEntry {
                count: 2,
                exec_kind: "nodejs:6".into(),
                memory_mb: 256,
            }],
            log_message_interval_secs: 10,
            log_level: "info".into(),
            log_dir: None,
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.prewarm_targets(), vec![(ExecKind::new("nodejs:6"), 256, 2)]);
    }

    #[test]
    fn loads_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.toml");
        fs::write(
            &path,
            r#"
            max_active_containers = 8

            [[prewarm]]
            count = 1
            exec_kind = "nodejs:6"
            memory_mb = 256
            "#,
        )
        .unwrap();
        let cfg = PoolConfig::load(&path).unwrap();
        assert_eq!(cfg.max_active_containers, 8);
        assert_eq!(cfg.log_message_interval_secs, 10);
        assert_eq!(cfg.prewarm.len(), 1);
    }
}
