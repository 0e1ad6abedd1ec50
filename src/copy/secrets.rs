// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Building and writing the target secret in the destination cluster

use crate::constants::{annotations, LABEL_ENABLED, OPERATOR_NAME};
use crate::copy::directive::{CopyDirective, Strategy};
use crate::error::{Result, SecretCopyError};
use crate::kubernetes::require_namespace;
use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{
    api::{ObjectMeta, PostParams},
    Api, Client, ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// What happened to the target secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Created,
    Updated,
    /// Target exists and the strategy is `ignore`
    Skipped,
}

/// Copy the source secret into the destination cluster
#[instrument(
    skip(target, source, directive, cluster_name),
    fields(
        secret = %format!("{}/{}", source.namespace().unwrap_or_default(), source.name_any()),
        target = %format!("{}/{}", directive.namespace, directive.name)
    )
)]
pub async fn copy_secret(
    target: Client,
    source: &Secret,
    directive: &CopyDirective,
    cluster_name: &str,
) -> Result<CopyOutcome> {
    require_namespace(&target, &directive.namespace).await?;

    let target_secrets: Api<Secret> = Api::namespaced(target, &directive.namespace);
    let existing = target_secrets
        .get_opt(&directive.name)
        .await
        .map_err(|e| SecretCopyError::DestinationApi {
            action: "check existing secret",
            source: e,
        })?;

    let now = Utc::now();
    let pp = PostParams {
        field_manager: Some(OPERATOR_NAME.to_string()),
        ..Default::default()
    };

    match existing {
        Some(_) if directive.strategy == Strategy::Ignore => {
            info!("Target secret exists, strategy={}, skipping", directive.strategy);
            Ok(CopyOutcome::Skipped)
        }
        Some(existing) => {
            let updated = overwrite_target_secret(existing, source, directive, cluster_name, now);
            target_secrets
                .replace(&directive.name, &pp, &updated)
                .await
                .map_err(|e| SecretCopyError::DestinationApi {
                    action: "update target secret",
                    source: e,
                })?;
            info!("Updated target secret");
            Ok(CopyOutcome::Updated)
        }
        None => {
            let created = new_target_secret(source, directive, cluster_name, now);
            target_secrets
                .create(&pp, &created)
                .await
                .map_err(|e| SecretCopyError::DestinationApi {
                    action: "create target secret",
                    source: e,
                })?;
            info!("Created target secret");
            Ok(CopyOutcome::Created)
        }
    }
}

fn new_target_secret(
    source: &Secret,
    directive: &CopyDirective,
    cluster_name: &str,
    now: DateTime<Utc>,
) -> Secret {
    let mut copied = filter_annotations_for_copy(source.metadata.annotations.as_ref());
    stamp_provenance(&mut copied, cluster_name, source, now);

    Secret {
        metadata: ObjectMeta {
            name: Some(directive.name.clone()),
            namespace: Some(directive.namespace.clone()),
            labels: filter_labels(source.metadata.labels.as_ref()),
            annotations: Some(copied),
            ..Default::default()
        },
        data: Some(prepare_data(source.data.as_ref(), &directive.fields)),
        type_: resolve_secret_type(source.type_.as_deref(), directive.secret_type.as_deref()),
        ..Default::default()
    }
}

/// Replace data and type, merge copied annotations over the existing ones.
/// Existing labels and resourceVersion are kept.
fn overwrite_target_secret(
    mut existing: Secret,
    source: &Secret,
    directive: &CopyDirective,
    cluster_name: &str,
    now: DateTime<Utc>,
) -> Secret {
    existing.data = Some(prepare_data(source.data.as_ref(), &directive.fields));
    existing.string_data = None;
    existing.type_ = resolve_secret_type(source.type_.as_deref(), directive.secret_type.as_deref());

    let merged = existing.metadata.annotations.get_or_insert_with(BTreeMap::new);
    merged.extend(filter_annotations_for_copy(source.metadata.annotations.as_ref()));
    stamp_provenance(merged, cluster_name, source, now);

    existing
}

/// Apply the field mapping; an empty mapping copies every key.
/// Mapped keys missing from the source are skipped.
pub fn prepare_data(
    source: Option<&BTreeMap<String, ByteString>>,
    fields: &BTreeMap<String, String>,
) -> BTreeMap<String, ByteString> {
    let Some(source) = source else {
        return BTreeMap::new();
    };

    if fields.is_empty() {
        return source.clone();
    }

    fields
        .iter()
        .filter_map(|(src, dst)| source.get(src).map(|value| (dst.clone(), value.clone())))
        .collect()
}

/// The override wins over the source type when set
pub fn resolve_secret_type(source: Option<&str>, override_type: Option<&str>) -> Option<String> {
    override_type.or(source).map(str::to_string)
}

/// Drop the operator's own labels
pub fn filter_labels(
    labels: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    labels.map(|l| {
        l.iter()
            .filter(|(k, _)| !k.contains(LABEL_ENABLED))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    })
}

/// Drop operator config/status and tooling annotations
pub fn filter_annotations_for_copy(
    source: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    source
        .into_iter()
        .flatten()
        .filter(|(k, _)| {
            !annotations::PREFIXES_TO_FILTER
                .iter()
                .any(|prefix| k.starts_with(prefix))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Record where the copy came from and when
pub fn stamp_provenance(
    target: &mut BTreeMap<String, String>,
    cluster_name: &str,
    source: &Secret,
    now: DateTime<Utc>,
) {
    target.insert(annotations::SOURCE_CLUSTER.to_string(), cluster_name.to_string());
    target.insert(
        annotations::SOURCE_SECRET.to_string(),
        format!("{}/{}", source.namespace().unwrap_or_default(), source.name_any()),
    );
    target.insert(annotations::COPIED_AT.to_string(), rfc3339(now));
}

/// Second precision UTC timestamp, e.g. `2026-01-02T03:04:05Z`
pub fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
