// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretCopyError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Bad or missing copy annotations; waits for the user to fix them
    #[error("{0}")]
    Config(String),

    #[error("kubeconfig not found: {0}")]
    CredentialMissing(String),

    #[error("failed to parse kubeconfig: {0}")]
    CredentialInvalid(String),

    #[error("failed to create client: {0}")]
    ClientBuild(String),

    #[error("target namespace {0:?} does not exist in destination cluster")]
    NamespaceMissing(String),

    #[error("failed to {action}: {source}")]
    DestinationApi {
        action: &'static str,
        #[source]
        source: kube::Error,
    },
}

impl SecretCopyError {
    /// Whether the failure is worth retrying on a timer
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SecretCopyError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, SecretCopyError>;
