// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubeconfig secret access and destination cluster client creation

use crate::constants::KUBECONFIG_KEY;
use crate::copy::SecretRef;
use crate::error::{Result, SecretCopyError};
use crate::kubernetes::cluster_manager::ClientFactory;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use std::time::Duration;
use tracing::{debug, instrument};

/// Raw kubeconfig bytes stored under the `value` key, if any
pub fn kubeconfig_from_secret(secret: &Secret) -> Option<&[u8]> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(KUBECONFIG_KEY))
        .map(|v| v.0.as_slice())
}

/// Fetch the kubeconfig secret a source secret points at
#[instrument(skip(client), fields(kubeconfig = %reference))]
pub async fn get_kubeconfig_secret(client: &Client, reference: &SecretRef) -> Result<Secret> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &reference.namespace);

    match secrets.get_opt(&reference.name).await {
        Ok(Some(secret)) => Ok(secret),
        Ok(None) => Err(SecretCopyError::CredentialMissing(format!(
            "secret {} does not exist",
            reference
        ))),
        Err(e) => Err(SecretCopyError::CredentialMissing(format!(
            "failed to get secret {}: {}",
            reference, e
        ))),
    }
}

/// Parse kubeconfig bytes into connection parameters
pub fn parse_kubeconfig(data: &[u8]) -> Result<Kubeconfig> {
    let text = std::str::from_utf8(data)
        .map_err(|e| SecretCopyError::CredentialInvalid(format!("not valid UTF-8: {}", e)))?;

    serde_yaml::from_str(text).map_err(|e| SecretCopyError::CredentialInvalid(e.to_string()))
}

/// Builds real clients from kubeconfigs, applying a request timeout
#[derive(Debug, Clone)]
pub struct KubeconfigClientFactory {
    request_timeout: Duration,
}

impl KubeconfigClientFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl ClientFactory for KubeconfigClientFactory {
    async fn build(&self, kubeconfig: Kubeconfig) -> Result<Client> {
        let mut client_config =
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    SecretCopyError::ClientBuild(format!("failed to create config: {}", e))
                })?;

        client_config.connect_timeout = Some(self.request_timeout);
        client_config.read_timeout = Some(self.request_timeout);
        client_config.write_timeout = Some(self.request_timeout);
        debug!("Building client for {}", client_config.cluster_url);

        Client::try_from(client_config).map_err(|e| SecretCopyError::ClientBuild(e.to_string()))
    }
}
