use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// `$CASHBACK_HOME`, else `~/.cashback`.
pub fn cashback_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("CASHBACK_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cashback"))
}

pub fn ensure_cashback_home() -> Result<PathBuf> {
    let dir = cashback_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn ledger_path() -> Result<PathBuf> {
    Ok(ensure_cashback_home()?.join("ledger.json"))
}
