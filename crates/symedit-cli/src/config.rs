use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use symedit::core::symmetry::subgroups::SubgroupTable;
use symedit::engine::config::{EngineConfig, EngineConfigBuilder};
use symedit::workflows::edit::SymmetryEditor;
use tracing::{debug, info};

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialTolerances {
    invariance: Option<f64>,
    constraint: Option<f64>,
    round_trip: Option<f64>,
    pathway: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialEditing {
    allow_projection: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialSubgroups {
    index_path: Option<PathBuf>,
}

/// Engine settings as read from a TOML file; every field is optional.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialEngineConfig {
    tolerances: Option<PartialTolerances>,
    editing: Option<PartialEditing>,
    subgroups: Option<PartialSubgroups>,
}

/// Fully resolved CLI settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub engine: EngineConfig,
    pub subgroup_index: Option<PathBuf>,
}

impl PartialEngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if let Some(index_path) = config
            .subgroups
            .as_mut()
            .and_then(|s| s.index_path.as_mut())
        {
            if index_path.is_relative() {
                if let Some(parent) = path.parent() {
                    *index_path = parent.join(&*index_path);
                }
            }
        }
        Ok(config)
    }

    pub fn into_settings(mut self, set_values: &[String]) -> Result<Settings> {
        self.apply_set_values(set_values)?;

        let tolerances = self.tolerances.take().unwrap_or_default();
        let editing = self.editing.take().unwrap_or_default();
        let subgroups = self.subgroups.take().unwrap_or_default();

        let mut builder = EngineConfigBuilder::new();
        if let Some(value) = tolerances.invariance {
            builder = builder.invariance_tolerance(value);
        }
        if let Some(value) = tolerances.constraint {
            builder = builder.constraint_tolerance(value);
        }
        if let Some(value) = tolerances.round_trip {
            builder = builder.round_trip_tolerance(value);
        }
        if let Some(value) = tolerances.pathway {
            builder = builder.pathway_tolerance(value);
        }
        if let Some(allow) = editing.allow_projection {
            builder = builder.allow_projection(allow);
        }
        let engine = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(Settings {
            engine,
            subgroup_index: subgroups.index_path,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;
            let float = || {
                value_str.parse::<f64>().map_err(|_| {
                    CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                })
            };

            match key {
                "tolerances.invariance" => {
                    self.tolerances
                        .get_or_insert_with(Default::default)
                        .invariance = Some(float()?);
                }
                "tolerances.constraint" => {
                    self.tolerances
                        .get_or_insert_with(Default::default)
                        .constraint = Some(float()?);
                }
                "tolerances.round-trip" => {
                    self.tolerances
                        .get_or_insert_with(Default::default)
                        .round_trip = Some(float()?);
                }
                "tolerances.pathway" => {
                    self.tolerances.get_or_insert_with(Default::default).pathway = Some(float()?);
                }
                "editing.allow-projection" => {
                    self.editing
                        .get_or_insert_with(Default::default)
                        .allow_projection = Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!(
                            "Invalid boolean value for {}: {}",
                            key, value_str
                        ))
                    })?);
                }
                "subgroups.index-path" => {
                    self.subgroups
                        .get_or_insert_with(Default::default)
                        .index_path = Some(PathBuf::from(value_str));
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Reads the optional config file and applies `--set` overrides.
pub fn load_settings(config_path: Option<&Path>, set_values: &[String]) -> Result<Settings> {
    let partial = match config_path {
        Some(path) => PartialEngineConfig::from_file(path)?,
        None => PartialEngineConfig::default(),
    };
    partial.into_settings(set_values)
}

impl Settings {
    /// Builds an editor, extending the built-in subgroup table with the configured CSV file.
    pub fn editor(&self) -> Result<SymmetryEditor> {
        let mut table = SubgroupTable::builtin();
        if let Some(path) = &self.subgroup_index {
            let added = table.load_csv(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
            info!("Loaded {} subgroup relation(s) from {:?}", added, path);
        }
        Ok(SymmetryEditor::with_subgroup_index(
            self.engine.clone(),
            Box::new(table),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write_config_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = load_settings(None, &[]).unwrap();
        assert_eq!(settings.engine, EngineConfig::default());
        assert_eq!(settings.subgroup_index, None);
    }

    #[test]
    fn test_load_from_file_and_merge_with_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            "engine.toml",
            r#"
        [tolerances]
        invariance = 1e-5
        round-trip = 1e-6

        [editing]
        allow-projection = false

        [subgroups]
        index-path = "relations.csv"
        "#,
        );

        let settings = load_settings(Some(&path), &[]).unwrap();
        assert_eq!(settings.engine.invariance_tolerance, 1e-5);
        assert_eq!(settings.engine.round_trip_tolerance, 1e-6);
        assert_eq!(settings.engine.constraint_tolerance, 1e-10);
        assert!(!settings.engine.allow_projection);
        assert_eq!(
            settings.subgroup_index,
            Some(dir.path().join("relations.csv"))
        );
    }

    #[test]
    fn test_set_value_overrides_file_and_defaults() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "engine.toml", "[tolerances]\npathway = 1e-4\n");
        let set_values = vec![
            "tolerances.pathway=1e-9".to_string(),
            "editing.allow-projection=false".to_string(),
        ];

        let settings = load_settings(Some(&path), &set_values).unwrap();
        assert_eq!(settings.engine.pathway_tolerance, 1e-9);
        assert!(!settings.engine.allow_projection);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "engine.toml", "[tolerances]\nsloppiness = 1.0\n");
        assert!(matches!(
            load_settings(Some(&path), &[]),
            Err(CliError::FileParsing { .. })
        ));

        let result = load_settings(None, &["tolerances.sloppiness=1".to_string()]);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = load_settings(None, &["tolerances.constraint=-1".to_string()]);
        assert!(matches!(result, Err(CliError::Config(_))));

        let result = load_settings(None, &["tolerances.constraint".to_string()]);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_editor_loads_configured_subgroup_index() {
        let dir = tempdir().unwrap();
        let csv = write_config_file(&dir, "relations.csv", "parent,child,transform\n16,1,\"a,b,c\"\n");
        let settings = load_settings(None, &[format!("subgroups.index-path={}", csv.display())])
            .unwrap();

        let editor = settings.editor().unwrap();
        assert!(editor.resolve_pathway(&["16", "sub", "1"], None).is_ok());
    }

    #[test]
    fn test_editor_reports_missing_subgroup_index() {
        let settings = Settings {
            engine: EngineConfig::default(),
            subgroup_index: Some(PathBuf::from("/nonexistent/relations.csv")),
        };
        assert!(matches!(
            settings.editor(),
            Err(CliError::FileParsing { .. })
        ));
    }
}
