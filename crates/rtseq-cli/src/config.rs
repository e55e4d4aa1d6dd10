//! Run configuration file: sequencer settings plus services with workloads.

use crate::error::CliError;
use crate::workload::Workload;
use rtseq_scheduler::{SequencerConfig, ServiceSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub sequencer: SequencerConfig,
    pub services: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(flatten)]
    pub spec: ServiceSpec,
    #[serde(default)]
    pub workload: Workload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl RunConfig {
    /// Read and parse a YAML or JSON file, chosen by extension.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let format =
            Format::from_path(path).ok_or_else(|| CliError::UnsupportedFormat(path.to_owned()))?;
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::parse(&text, format)?;
        config.validate()?;
        Ok(config)
    }

    fn parse(text: &str, format: Format) -> Result<Self, CliError> {
        Ok(match format {
            Format::Yaml => serde_yaml::from_str(text)?,
            Format::Json => serde_json::from_str(text)?,
        })
    }

    /// Checks that need no platform: the sequencer validates the rest.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.services.is_empty() {
            return Err(CliError::InvalidConfiguration(
                "at least one service is required".into(),
            ));
        }
        self.sequencer.validate().map_err(rtseq_scheduler::SequencerError::from)?;

        let mut seen = HashSet::new();
        for entry in &self.services {
            if !seen.insert(entry.spec.name.as_str()) {
                return Err(CliError::InvalidConfiguration(format!(
                    "service '{}' is defined more than once",
                    entry.spec.name
                )));
            }
            entry.workload.validate().map_err(|reason| {
                CliError::InvalidConfiguration(format!("service '{}': {reason}", entry.spec.name))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtseq_scheduler::{ReleaseDriverKind, ReleaseMode};

    const YAML: &str = "
sequencer:
  driver:
    kind: shared_tick
    resolution_us: 500
  release_mode: coalesce
services:
  - name: camera
    period_ms: 100
    affinity: 0
    workload:
      kind: busy
      ms: 5
  - name: gas
    period_ms: 300
";

    #[test]
    fn parses_yaml_with_defaults() -> Result<(), CliError> {
        let config = RunConfig::parse(YAML, Format::Yaml)?;
        config.validate()?;
        assert_eq!(
            config.sequencer.driver,
            ReleaseDriverKind::SharedTick { resolution_us: 500 }
        );
        assert_eq!(config.sequencer.release_mode, ReleaseMode::Coalesce);
        assert_eq!(config.services.len(), 2);

        let camera = config.services.first();
        assert_eq!(camera.map(|s| s.spec.affinity), Some(Some(0)));
        assert_eq!(camera.map(|s| s.workload), Some(Workload::Busy { ms: 5 }));

        let gas = config.services.get(1);
        assert_eq!(gas.map(|s| s.workload), Some(Workload::Noop));
        assert_eq!(gas.and_then(|s| s.spec.priority), None);
        Ok(())
    }

    #[test]
    fn parses_json() -> Result<(), CliError> {
        let json = r#"{"services":[{"name":"a","period_ms":10,"priority":50,
            "workload":{"kind":"fault_every","n":4}}]}"#;
        let config = RunConfig::parse(json, Format::Json)?;
        config.validate()?;
        assert_eq!(config.sequencer, SequencerConfig::default());
        assert_eq!(
            config.services.first().map(|s| s.workload),
            Some(Workload::FaultEvery { n: 4 })
        );
        Ok(())
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("run.YML")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("run.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("run.toml")), None);
        assert_eq!(Format::from_path(Path::new("run")), None);
    }

    #[test]
    fn rejects_empty_service_list() {
        let config = RunConfig::default();
        assert!(matches!(
            config.validate(),
            Err(CliError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_duplicate_names() -> Result<(), CliError> {
        let yaml = "services:\n  - {name: a, period_ms: 10}\n  - {name: a, period_ms: 20}\n";
        let config = RunConfig::parse(yaml, Format::Yaml)?;
        assert!(matches!(
            config.validate(),
            Err(CliError::InvalidConfiguration(msg)) if msg.contains("more than once")
        ));
        Ok(())
    }

    #[test]
    fn rejects_zero_tick_resolution() -> Result<(), CliError> {
        let yaml = "sequencer:\n  driver: {kind: shared_tick, resolution_us: 0}\nservices:\n  - {name: a, period_ms: 10}\n";
        let config = RunConfig::parse(yaml, Format::Yaml)?;
        let err = config.validate();
        assert!(matches!(&err, Err(e) if e.exit_code() == 2));
        Ok(())
    }
}
