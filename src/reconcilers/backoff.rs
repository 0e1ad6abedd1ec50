// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Exponential retry delay derived from the retry counter annotation

use crate::constants::{annotations, backoff::*};
use k8s_openapi::api::core::v1::Secret;
use std::time::Duration;

/// 30s, 60s, 120s, 240s, then capped at 5m
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
    Duration::from_secs(BASE_DELAY_SECS)
        .saturating_mul(factor)
        .min(Duration::from_secs(MAX_DELAY_SECS))
}

/// Retry counter from the secret; missing or malformed values count as 0
pub fn retry_count(secret: &Secret) -> u32 {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::RETRY_COUNT))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}
