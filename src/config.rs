use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Default swatches, matching the ten colors of the picker widget the
/// original editor shipped with.
const DEFAULT_PALETTE: [&str; 10] = [
    "#FF6900", "#FCB900", "#7BDCB5", "#00D084", "#8ED1FC", "#0693E3", "#ABB8C0", "#EB144C",
    "#F78DA7", "#9900EF",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub max_suggestions: usize,
    pub timeout_ms: u64,
    pub palette: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.datamuse.com".to_string(),
            max_suggestions: 5,
            timeout_ms: 5000,
            palette: DEFAULT_PALETTE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Swatches as terminal colors; entries that fail to parse fall
    /// back to the default palette at the same position.
    pub fn swatches(&self) -> Vec<(String, Color)> {
        self.palette
            .iter()
            .enumerate()
            .map(|(i, hex)| {
                let color = parse_hex_color(hex)
                    .or_else(|| DEFAULT_PALETTE.get(i).and_then(|h| parse_hex_color(h)))
                    .unwrap_or(Color::White);
                (hex.clone(), color)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PartialConfig {
    api_base_url: Option<String>,
    max_suggestions: Option<usize>,
    timeout_ms: Option<u64>,
    palette: Option<Vec<String>>,
}

impl PartialConfig {
    fn apply_defaults(self) -> (Config, bool) {
        let defaults = Config::default();
        let mut changed = false;

        let api_base_url = match self.api_base_url {
            Some(v) => v,
            None => {
                changed = true;
                defaults.api_base_url
            }
        };
        let max_suggestions = match self.max_suggestions {
            Some(v) => v,
            None => {
                changed = true;
                defaults.max_suggestions
            }
        };
        let timeout_ms = match self.timeout_ms {
            Some(v) => v,
            None => {
                changed = true;
                defaults.timeout_ms
            }
        };
        let palette = match self.palette {
            Some(v) => v,
            None => {
                changed = true;
                defaults.palette
            }
        };

        (
            Config {
                api_base_url,
                max_suggestions,
                timeout_ms,
                palette,
            },
            changed,
        )
    }
}

pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("reword").join("config.toml"))
}

pub fn ensure_config_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        write_config(&cfg)?;
        return Ok(cfg);
    }

    let raw =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let partial: PartialConfig =
        toml::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))?;
    let (cfg, changed) = partial.apply_defaults();
    if changed {
        write_config(&cfg)?;
    }
    Ok(cfg)
}

pub fn write_config(cfg: &Config) -> Result<()> {
    let path = config_path()?;
    ensure_config_dir(&path)?;
    let text = toml::to_string_pretty(cfg).context("Failed to serialize config")?;
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn open_config_in_editor() -> Result<()> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        write_config(&cfg)?;
    }

    let editor = env::var("EDITOR").unwrap_or_else(|_| "nvim".to_string());
    let mut parts = match shell_words::split(&editor) {
        Ok(p) if !p.is_empty() => p,
        _ => vec![editor],
    };
    let cmd = parts.remove(0);
    let status = Command::new(cmd)
        .args(parts)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to launch editor for {}", path.display()))?;
    if !status.success() {
        anyhow::bail!("Editor exited with status {}", status);
    }
    Ok(())
}
