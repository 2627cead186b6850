//! Advisor API keys, one per provider, kept in `auth.json` under the state home.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::advisor::Provider;
use crate::state::ensure_cashback_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisorKeys {
    /// Provider name ("openai", "anthropic") to API key.
    #[serde(default)]
    keys: BTreeMap<String, String>,
}

impl AdvisorKeys {
    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(provider.as_str()).map(String::as_str)
    }

    pub fn set(&mut self, provider: Provider, key: &str) -> Result<()> {
        let key = key.trim();
        check_key(provider, key)?;
        self.keys.insert(provider.as_str().to_string(), key.to_string());
        Ok(())
    }

    pub fn has(&self, provider: Provider) -> bool {
        self.get(provider).is_some()
    }
}

/// Reject keys that obviously belong to the other provider or are truncated.
pub fn check_key(provider: Provider, key: &str) -> Result<()> {
    match provider {
        Provider::Anthropic if !key.starts_with("sk-ant-") => {
            bail!("key didn't look like an Anthropic key (expected prefix sk-ant-)")
        }
        Provider::OpenAI if key.starts_with("sk-ant-") => {
            bail!("that is an Anthropic key; set provider = \"anthropic\" in config.toml instead")
        }
        Provider::OpenAI if !key.starts_with("sk-") => {
            bail!("key didn't look like an OpenAI API key (expected prefix sk-)")
        }
        _ if key.len() < 20 => bail!("key is too short; was it pasted in full?"),
        _ => Ok(()),
    }
}

fn keys_path() -> Result<PathBuf> {
    Ok(ensure_cashback_home()?.join("auth.json"))
}

pub fn load_keys() -> Result<AdvisorKeys> {
    let p = keys_path()?;
    if !p.exists() {
        return Ok(AdvisorKeys::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

fn save_keys(keys: &AdvisorKeys) -> Result<()> {
    let p = keys_path()?;
    let s = serde_json::to_string_pretty(keys)?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Read one key from stdin and store it for `provider`.
pub fn paste_key(provider: Provider) -> Result<()> {
    print!("Paste {} API key: ", provider.as_str());
    io::stdout().flush().ok();
    let line = io::stdin()
        .lock()
        .lines()
        .next()
        .context("no key on stdin")??;

    let mut keys = load_keys()?;
    keys.set(provider, &line)?;
    save_keys(&keys)?;
    println!("Saved {} key to {}", provider.as_str(), keys_path()?.display());
    Ok(())
}

/// One line per provider: whether a key is stored and which one is active.
pub fn print_status(active: Option<Provider>) -> Result<()> {
    let keys = load_keys()?;
    for provider in [Provider::OpenAI, Provider::Anthropic] {
        let state = if keys.has(provider) { "key stored" } else { "no key" };
        let marker = if active == Some(provider) { " (active)" } else { "" };
        println!("{:<10} {state}{marker}", provider.as_str());
    }
    if active.is_none() {
        println!("Advisor is disabled (provider = \"none\").");
    }
    Ok(())
}
