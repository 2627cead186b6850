//! Advisory text client. Sends a formatted request to an LLM and returns its
//! reply, or the fixed fallback text on any failure or timeout.

use anyhow::{bail, Context, Result};
use cashback_core::{AdvisoryRequest, ADVISORY_FALLBACK};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::AdvisorKeys;
use crate::config::AdvisorSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    /// `None` when advice is turned off.
    pub fn parse(name: &str) -> Result<Option<Self>> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Some(Self::OpenAI)),
            "anthropic" => Ok(Some(Self::Anthropic)),
            "none" | "" => Ok(None),
            other => bail!("unknown advisor provider '{other}' (expected openai, anthropic or none)"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Advisory text for `req`. Never fails: errors are logged and replaced by
/// [`ADVISORY_FALLBACK`].
pub async fn advise(cfg: &AdvisorSection, keys: &AdvisorKeys, req: &AdvisoryRequest) -> String {
    let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
    match tokio::time::timeout(timeout, complete(cfg, keys, req)).await {
        Ok(Ok(text)) if !text.is_empty() => text,
        Ok(Ok(_)) => {
            warn!("advisor returned an empty reply");
            ADVISORY_FALLBACK.to_string()
        }
        Ok(Err(e)) => {
            warn!(error = %format!("{e:#}"), "advisor request failed");
            ADVISORY_FALLBACK.to_string()
        }
        Err(_) => {
            warn!(secs = timeout.as_secs(), "advisor timed out");
            ADVISORY_FALLBACK.to_string()
        }
    }
}

async fn complete(cfg: &AdvisorSection, keys: &AdvisorKeys, req: &AdvisoryRequest) -> Result<String> {
    let Some(provider) = Provider::parse(&cfg.provider)? else {
        bail!("advisor is disabled in config.toml");
    };
    let key = keys.get(provider).with_context(|| {
        format!("no {} key stored; run: cashback auth paste-key", provider.as_str())
    })?;
    debug!(?provider, model = %cfg.model, "requesting advisory text");
    match provider {
        Provider::Anthropic => anthropic_complete(cfg, key, req).await,
        Provider::OpenAI => openai_complete(cfg, key, req).await,
    }
}

async fn anthropic_complete(cfg: &AdvisorSection, token: &str, req: &AdvisoryRequest) -> Result<String> {
    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Serialize)]
    struct Req<'a> {
        model: &'a str,
        max_tokens: i32,
        temperature: f32,
        system: &'a str,
        messages: Vec<Msg<'a>>,
    }

    #[derive(Deserialize)]
    struct Resp {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        t: String,
        text: Option<String>,
    }

    let body = Req {
        model: &cfg.model,
        max_tokens: 600,
        temperature: cfg.temperature,
        system: &req.system,
        messages: vec![Msg {
            role: "user",
            content: &req.prompt,
        }],
    };

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(token)?);
    headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::new();
    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .headers(headers)
        .json(&body)
        .send()
        .await
        .context("anthropic request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("anthropic error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse anthropic response")?;
    let mut s = String::new();
    for b in out.content {
        if b.t == "text" {
            if let Some(t) = b.text {
                s.push_str(&t);
            }
        }
    }
    Ok(s.trim().to_string())
}

/// OpenAI chat completions, or any compatible server at `base_url`.
async fn openai_complete(cfg: &AdvisorSection, key: &str, req: &AdvisoryRequest) -> Result<String> {
    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Serialize)]
    struct Req<'a> {
        model: &'a str,
        messages: Vec<Msg<'a>>,
        temperature: f32,
    }

    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let body = Req {
        model: &cfg.model,
        messages: vec![
            Msg {
                role: "system",
                content: &req.system,
            },
            Msg {
                role: "user",
                content: &req.prompt,
            },
        ],
        temperature: cfg.temperature,
    };

    let url = format!("{}/v1/chat/completions", cfg.base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let resp = client
        .post(&url)
        .header(AUTHORIZATION, format!("Bearer {key}"))
        .json(&body)
        .send()
        .await
        .context("openai request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("openai error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse openai response")?;
    let content = out
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    Ok(content.trim().to_string())
}
