// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Copy configuration parsed from source secret annotations

use crate::constants::annotations;
use crate::error::{Result, SecretCopyError};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Behaviour when the target secret already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Update the existing secret
    #[default]
    Overwrite,
    /// Leave the existing secret untouched
    Ignore,
}

impl FromStr for Strategy {
    type Err = SecretCopyError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "" | "overwrite" => Ok(Strategy::Overwrite),
            "ignore" => Ok(Strategy::Ignore),
            other => Err(SecretCopyError::Config(format!(
                "invalid strategy {:?}, expected \"overwrite\" or \"ignore\"",
                other
            ))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Overwrite => f.write_str("overwrite"),
            Strategy::Ignore => f.write_str("ignore"),
        }
    }
}

/// Namespace and name of a secret
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretRef {
    pub namespace: String,
    pub name: String,
}

impl FromStr for SecretRef {
    type Err = SecretCopyError;

    fn from_str(value: &str) -> Result<Self> {
        match value.split('/').collect::<Vec<_>>().as_slice() {
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => Ok(SecretRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
            _ => Err(SecretCopyError::Config(format!(
                "invalid {} format, expected 'namespace/name'",
                annotations::DST_KUBECONFIG
            ))),
        }
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Where and how a source secret is copied. Rebuilt on every reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDirective {
    pub kubeconfig_ref: SecretRef,
    pub namespace: String,
    pub name: String,
    /// Overrides the source type when set
    pub secret_type: Option<String>,
    pub strategy: Strategy,
    /// Source key to target key; empty copies every key as is
    pub fields: BTreeMap<String, String>,
}

impl CopyDirective {
    /// Parse the copy directive from the secret's annotations
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let Some(entries) = secret.metadata.annotations.as_ref() else {
            return Err(SecretCopyError::Config("no annotations found".to_string()));
        };
        let get = |key: &str| {
            entries
                .get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
        };

        let kubeconfig_ref: SecretRef = get(annotations::DST_KUBECONFIG)
            .ok_or_else(|| {
                SecretCopyError::Config(format!(
                    "annotation {} is required",
                    annotations::DST_KUBECONFIG
                ))
            })?
            .parse()?;

        let namespace = get(annotations::DST_NAMESPACE)
            .map(str::to_string)
            .unwrap_or_else(|| secret.namespace().unwrap_or_default());
        let name = get(annotations::DST_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| secret.name_any());
        let strategy: Strategy = get(annotations::STRATEGY_IF_EXIST).unwrap_or_default().parse()?;

        let fields = entries
            .iter()
            .filter_map(|(key, dst)| {
                let src = key.strip_prefix(annotations::FIELDS_PREFIX)?;
                (!src.is_empty() && !dst.is_empty()).then(|| (src.to_string(), dst.clone()))
            })
            .collect();

        Ok(CopyDirective {
            kubeconfig_ref,
            namespace,
            name,
            secret_type: get(annotations::DST_TYPE).map(str::to_string),
            strategy,
            fields,
        })
    }
}
