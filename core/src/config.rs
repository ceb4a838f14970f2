use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::platform::BuildTarget;
use crate::shim::{DEFAULT_ENV_PREFIX, DEFAULT_PLACEHOLDER_NAME, ShimOptions};
use crate::stage::DEFAULT_MANIFEST;

pub const DEFAULT_SOURCE: &str = "cli.js";
pub const DEFAULT_GENERAL_OUTPUT: &str = "cli-native-bundled.js";
pub const DEFAULT_WINDOWS_STAGE_DIR: &str = ".windows-build-temp";
pub const DEFAULT_WINDOWS_OUTPUT: &str = "cli-windows.js";
pub const DEFAULT_SDK_MODULE: &str = "sdk.mjs";

/// Settings for one preparation run, loadable from TOML.
///
/// Relative paths are taken relative to the process working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    pub target: BuildTarget,
    /// Bundled CLI to rewrite.
    pub source: PathBuf,
    /// Directory holding `yoga.wasm`, `vendor/` and the manifest files.
    pub resource_root: PathBuf,
    pub output: Option<PathBuf>,
    pub stage_dir: Option<PathBuf>,
    pub sdk: Option<PathBuf>,
    pub env_prefix: String,
    pub placeholder_name: String,
    pub manifest: Vec<String>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            target: BuildTarget::General,
            source: PathBuf::from(DEFAULT_SOURCE),
            resource_root: PathBuf::from("."),
            output: None,
            stage_dir: None,
            sdk: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PrepareConfig {
    pub fn for_target(target: BuildTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config '{}'", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut chars = self.env_prefix.chars();
        let valid_prefix = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_prefix {
            bail!(
                "env_prefix '{}' must be a valid environment variable name",
                self.env_prefix
            );
        }
        if self.placeholder_name.trim().is_empty() || self.placeholder_name.contains(['/', '\\']) {
            bail!("placeholder_name must be a bare file name");
        }
        Ok(())
    }

    /// Stage directory; the Windows target always stages.
    pub fn stage_path(&self) -> Option<PathBuf> {
        match (&self.stage_dir, self.target) {
            (Some(dir), _) => Some(dir.clone()),
            (None, BuildTarget::Windows) => Some(self.resource_root.join(DEFAULT_WINDOWS_STAGE_DIR)),
            (None, BuildTarget::General) => None,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let file_name = match self.target {
            BuildTarget::Windows => DEFAULT_WINDOWS_OUTPUT,
            BuildTarget::General => DEFAULT_GENERAL_OUTPUT,
        };
        self.embed_root().join(file_name)
    }

    /// Directory probed for embeddable files: the stage directory once
    /// resources are copied there, the resource root otherwise.
    pub fn embed_root(&self) -> PathBuf {
        self.stage_path().unwrap_or_else(|| self.resource_root.clone())
    }

    /// SDK module to process, if any. The Windows target looks for
    /// `sdk.mjs` under the resource root unless one is configured.
    pub fn sdk_path(&self) -> Option<PathBuf> {
        match (&self.sdk, self.target) {
            (Some(sdk), _) => Some(sdk.clone()),
            (None, BuildTarget::Windows) => {
                let candidate = self.resource_root.join(DEFAULT_SDK_MODULE);
                candidate.is_file().then_some(candidate)
            }
            (None, BuildTarget::General) => None,
        }
    }

    pub fn shim_options(&self) -> ShimOptions {
        ShimOptions {
            target: self.target,
            env_prefix: self.env_prefix.clone(),
            placeholder_name: self.placeholder_name.clone(),
        }
    }
}
