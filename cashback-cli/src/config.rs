use anyhow::{Context, Result};
use cashback_core::{Card, Catalog};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_cashback_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub advisor: AdvisorSection,
    #[serde(default)]
    pub catalog: CatalogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorSection {
    /// "openai", "anthropic" or "none"
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Advisory text is dropped in favour of the fallback after this long.
    pub timeout_secs: u64,
}

impl Default for AdvisorSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.4,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSection {
    /// JSON array of cards replacing the built-in wallet.
    pub path: Option<PathBuf>,
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_cashback_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// The configured catalog, or the built-in one.
pub fn load_catalog(cfg: &Config) -> Result<Catalog> {
    match &cfg.catalog.path {
        Some(path) => read_catalog(path),
        None => Ok(Catalog::builtin()),
    }
}

fn read_catalog(path: &Path) -> Result<Catalog> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cards: Vec<Card> =
        serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Catalog::new(cards).with_context(|| format!("load catalog {}", path.display()))
}
