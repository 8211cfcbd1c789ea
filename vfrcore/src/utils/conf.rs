use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::utils::error::{VfrError, VfrResult};

/// Files a compilation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Artifact {
    IfrPackage,
    CSource,
    RecordList,
    Yaml,
    Json,
}

impl Artifact {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn extension(self) -> &'static str {
        match self {
            Artifact::IfrPackage => "hpk",
            Artifact::CSource => "c",
            Artifact::RecordList => "lst",
            Artifact::Yaml => "yaml",
            Artifact::Json => "json",
        }
    }
}

/// Options of one compilation, usually read from a TOML file.
///
/// ```toml
/// output_dir = "build/Setup"
/// base_name = "Setup"
/// record_list = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub output_dir: PathBuf,
    pub base_name: String,
    /// Binary form package (`.hpk`).
    pub ifr_package: bool,
    /// C array holding the package (`.c`).
    pub c_source: bool,
    /// Source lines annotated with record bytes (`.lst`).
    pub record_list: bool,
    pub yaml: bool,
    pub json: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            output_dir: PathBuf::from("."),
            base_name: "Vfr".to_string(),
            ifr_package: true,
            c_source: true,
            record_list: false,
            yaml: false,
            json: false,
        }
    }
}

impl CompileOptions {
    /// Parses options from TOML text. `file` only names the origin in errors.
    pub fn from_toml_str(text: &str, file: &str) -> VfrResult<Self> {
        toml::from_str(text).map_err(|source| VfrError::ConfigParse {
            file: file.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> VfrResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| VfrError::io(path, e))?;
        Self::from_toml_str(&text, &path.display().to_string())
    }

    pub fn is_enabled(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::IfrPackage => self.ifr_package,
            Artifact::CSource => self.c_source,
            Artifact::RecordList => self.record_list,
            Artifact::Yaml => self.yaml,
            Artifact::Json => self.json,
        }
    }

    pub fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.base_name, artifact.extension()))
    }

    /// Enabled artifacts with their destination, in a fixed order.
    pub fn artifact_paths(&self) -> Vec<(Artifact, PathBuf)> {
        Artifact::iter()
            .filter(|artifact| self.is_enabled(*artifact))
            .map(|artifact| (artifact, self.artifact_path(artifact)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let options = CompileOptions::from_toml_str("base_name = \"Setup\"\njson = true\n", "inline")
            .expect("valid options");
        assert_eq!(options.base_name, "Setup");
        assert!(options.ifr_package && options.c_source && options.json);
        assert!(!options.record_list);

        let paths = options.artifact_paths();
        let artifacts: Vec<Artifact> = paths.iter().map(|(artifact, _)| *artifact).collect();
        assert_eq!(
            artifacts,
            [Artifact::IfrPackage, Artifact::CSource, Artifact::Json]
        );
        assert_eq!(paths[2].1, Path::new(".").join("Setup.json"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let err = CompileOptions::from_toml_str("yaml = \"maybe\"", "setup.toml").unwrap_err();
        assert!(err.is_config_parse());
        assert!(err.to_string().contains("setup.toml"));
    }
}
