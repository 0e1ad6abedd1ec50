// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MAX_CONCURRENT_RECONCILES: usize = 1;
const DEFAULT_CLIENT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of this (source) cluster, stamped on every copied secret
    pub cluster_name: String,
    /// Reconcile worker count, also bounds concurrent client builds
    pub max_concurrent_reconciles: usize,
    /// How long a destination client is reused before it is rebuilt
    pub client_cache_ttl: Duration,
    /// Connect/read/write timeout for destination cluster requests
    pub request_timeout: Duration,
    /// Only watch secrets in this namespace when set
    pub watch_namespace: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cluster_name = lookup("CLUSTER_NAME")
            .filter(|v| !v.is_empty())
            .context("CLUSTER_NAME environment variable not set")?;

        let max_concurrent_reconciles = parse_positive(
            &lookup,
            "MAX_CONCURRENT_RECONCILES",
            DEFAULT_MAX_CONCURRENT_RECONCILES,
        )?;
        let client_cache_ttl = Duration::from_secs(parse_positive(
            &lookup,
            "CLIENT_CACHE_TTL_SECS",
            DEFAULT_CLIENT_CACHE_TTL_SECS,
        )?);
        let request_timeout = Duration::from_secs(parse_positive(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|v| !v.is_empty());

        Ok(Config {
            cluster_name,
            max_concurrent_reconciles,
            client_cache_ttl,
            request_timeout,
            watch_namespace,
        })
    }
}

fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = lookup(key).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    let value: T = raw
        .trim()
        .parse()
        .with_context(|| format!("{} has an invalid value {:?}", key, raw))?;
    if value <= T::default() {
        bail!("{} must be greater than zero", key);
    }
    Ok(value)
}
