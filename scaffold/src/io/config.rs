//! Scaffolder configuration (TOML, optional).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Directory name of the template shipped with the tool.
pub const TEMPLATE_DIR_NAME: &str = "template";

/// Scaffolder configuration.
///
/// Every field is optional in the file; missing fields take the defaults
/// below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Template to copy. Defaults to the bundled template, see [`bundled_template_dir`].
    pub template_dir: Option<PathBuf>,

    /// Wall-clock limit for the tool version check.
    pub version_timeout_secs: u64,

    /// Wall-clock limit for the dependency install.
    pub install_timeout_secs: u64,

    /// Keep at most this many bytes of each child output stream.
    pub output_limit_bytes: usize,

    pub tool: ToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    /// Package tool executable (e.g. `npm`).
    pub program: String,
    pub version_args: Vec<String>,
    pub install_args: Vec<String>,
    /// Shown to the user as the next step once the project is ready.
    pub run_args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let program = if cfg!(windows) { "npm.cmd" } else { "npm" };
        Self {
            program: program.to_string(),
            version_args: vec!["--version".to_string()],
            install_args: vec!["install".to_string()],
            run_args: vec!["run".to_string(), "dev".to_string()],
        }
    }
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            template_dir: None,
            version_timeout_secs: 30,
            install_timeout_secs: 10 * 60,
            output_limit_bytes: 1_000_000,
            tool: ToolConfig::default(),
        }
    }
}

impl ScaffoldConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version_timeout_secs == 0 {
            return Err(anyhow!("version_timeout_secs must be > 0"));
        }
        if self.install_timeout_secs == 0 {
            return Err(anyhow!("install_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.tool.program.trim().is_empty() {
            return Err(anyhow!("tool.program must be non-empty"));
        }
        Ok(())
    }

    pub fn version_timeout(&self) -> Duration {
        Duration::from_secs(self.version_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Configured template directory, or the bundled one.
    pub fn resolve_template_dir(&self) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(bundled_template_dir)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ScaffoldConfig::default()`.
pub fn load_config(path: &Path) -> Result<ScaffoldConfig> {
    if !path.exists() {
        let cfg = ScaffoldConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ScaffoldConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Template shipped with the tool.
///
/// Prefers `template/` next to the executable (installed layout) and falls
/// back to the crate's own `template/` directory (development builds).
pub fn bundled_template_dir() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(TEMPLATE_DIR_NAME)));
    match beside_exe {
        Some(dir) if dir.is_dir() => dir,
        _ => Path::new(env!("CARGO_MANIFEST_DIR")).join(TEMPLATE_DIR_NAME),
    }
}
