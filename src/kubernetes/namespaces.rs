// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace checks on destination clusters

use crate::error::{Result, SecretCopyError};
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use tracing::{debug, instrument, warn};

/// Fail with `NamespaceMissing` unless the namespace exists.
/// Namespaces are never created; they may appear later and the copy is retried.
#[instrument(skip(client))]
pub async fn require_namespace(client: &Client, namespace: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.get_opt(namespace).await {
        Ok(Some(_)) => {
            debug!("Namespace {} exists", namespace);
            Ok(())
        }
        Ok(None) => {
            warn!("Target namespace {} does not exist", namespace);
            Err(SecretCopyError::NamespaceMissing(namespace.to_string()))
        }
        Err(source) => Err(SecretCopyError::DestinationApi {
            action: "check namespace existence",
            source,
        }),
    }
}
