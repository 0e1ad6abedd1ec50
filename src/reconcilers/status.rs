// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Sync status and retry bookkeeping written back onto the source secret.
//!
//! The three status annotations are the only retry state. The counter, the
//! delay and the patch are all derived from one read of the secret, and the
//! patch carries that read's resourceVersion so it never lands on a newer
//! version of the object.

use crate::constants::{annotations, status, OPERATOR_NAME};
use crate::copy::secrets::rfc3339;
use crate::error::{Result, SecretCopyError};
use crate::reconcilers::backoff::{calculate_backoff, retry_count};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{Patch, PatchParams},
    runtime::controller::Action,
    Api, ResourceExt,
};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: String,
    /// `None` removes the counter annotation
    pub retry_count: Option<u32>,
    pub requeue_after: Option<Duration>,
    pub synced_at: DateTime<Utc>,
}

impl StatusUpdate {
    /// Successful copy: clear the counter, nothing scheduled
    pub fn synced(now: DateTime<Utc>) -> Self {
        Self {
            status: status::SYNCED.to_string(),
            retry_count: None,
            requeue_after: None,
            synced_at: now,
        }
    }

    /// Invalid configuration: report it and wait for the user to edit the secret
    pub fn invalid(error: &SecretCopyError, now: DateTime<Utc>) -> Self {
        Self {
            status: error_status(error),
            retry_count: None,
            requeue_after: None,
            synced_at: now,
        }
    }

    /// Retryable failure: delay from the prior counter, persist counter + 1
    pub fn failed(secret: &Secret, error: &SecretCopyError, now: DateTime<Utc>) -> Self {
        let prior = retry_count(secret);
        Self {
            status: error_status(error),
            retry_count: Some(prior.saturating_add(1)),
            requeue_after: Some(calculate_backoff(prior)),
            synced_at: now,
        }
    }

    pub fn action(&self) -> Action {
        match self.requeue_after {
            Some(delay) => Action::requeue(delay),
            None => Action::await_change(),
        }
    }

    /// JSON merge patch guarded by the secret's resourceVersion
    pub fn to_patch(&self, secret: &Secret) -> Value {
        let mut metadata = Map::new();
        if let Some(rv) = secret.resource_version() {
            metadata.insert("resourceVersion".to_string(), Value::String(rv));
        }
        metadata.insert(
            "annotations".to_string(),
            json!({
                (annotations::LAST_SYNC_TIME): rfc3339(self.synced_at),
                (annotations::LAST_SYNC_STATUS): self.status,
                (annotations::RETRY_COUNT): self.retry_count.map(|c| c.to_string()),
            }),
        );

        json!({ "metadata": metadata })
    }
}

fn error_status(error: &SecretCopyError) -> String {
    format!("{}{}", status::ERROR_PREFIX, error)
}

/// Patch the status annotations onto the secret in a single request
#[instrument(
    skip(api, secret, update),
    fields(secret = %secret.name_any(), status = %update.status)
)]
pub async fn write_status(api: &Api<Secret>, secret: &Secret, update: &StatusUpdate) -> Result<()> {
    let pp = PatchParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };

    api.patch(&secret.name_any(), &pp, &Patch::Merge(&update.to_patch(secret)))
        .await?;
    debug!("Status written");

    Ok(())
}
