// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cache of destination cluster clients.
//!
//! Clients are keyed by the SHA-256 of the kubeconfig bytes, not by the secret
//! holding them, so a rotated kubeconfig resolves to a fresh client while
//! identical kubeconfigs in different secrets share one. Entries expire after
//! a fixed TTL and are only replaced when looked up again.

use crate::error::{Result, SecretCopyError};
use crate::kubernetes::client::{kubeconfig_from_secret, parse_kubeconfig};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::config::Kubeconfig;
use kube::{Client, ResourceExt};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

type BuildLocks = std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// Resolves a kubeconfig secret into a client for the cluster it describes
#[async_trait]
pub trait ClusterClientGetter: Send + Sync {
    async fn get_client(&self, kubeconfig_secret: &Secret) -> Result<Client>;
}

/// Builds a client from parsed connection parameters
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn build(&self, kubeconfig: Kubeconfig) -> Result<Client>;
}

struct CachedClient {
    client: Client,
    expires_at: Instant,
}

impl CachedClient {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct ClusterManager<F> {
    clients: Mutex<HashMap<String, CachedClient>>,
    /// One lock per digest currently being built
    builds: BuildLocks,
    build_permits: Semaphore,
    ttl: Duration,
    factory: F,
}

impl<F: ClientFactory> ClusterManager<F> {
    /// `max_concurrent_builds` is usually the reconcile worker count
    pub fn new(ttl: Duration, max_concurrent_builds: usize, factory: F) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            builds: BuildLocks::default(),
            build_permits: Semaphore::new(max_concurrent_builds.max(1)),
            ttl,
            factory,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a client for the kubeconfig secret, building one on a cache miss
    #[instrument(
        skip(self, kubeconfig_secret),
        fields(kubeconfig = %format!(
            "{}/{}",
            kubeconfig_secret.namespace().unwrap_or_default(),
            kubeconfig_secret.name_any()
        ))
    )]
    pub async fn resolve(&self, kubeconfig_secret: &Secret) -> Result<Client> {
        let data = kubeconfig_from_secret(kubeconfig_secret).ok_or_else(|| {
            SecretCopyError::CredentialMissing(format!(
                "secret {}/{} has no 'value' key",
                kubeconfig_secret.namespace().unwrap_or_default(),
                kubeconfig_secret.name_any()
            ))
        })?;
        let key = hash_kubeconfig(data);

        if let Some(client) = self.cached(&key).await {
            debug!("Using cached client");
            return Ok(client);
        }

        let slot = BuildSlot::claim(&self.builds, &key);
        let _building = slot.lock.lock().await;

        // Another caller may have finished the build while we waited
        if let Some(client) = self.cached(&key).await {
            debug!("Using client built by a concurrent reconcile");
            return Ok(client);
        }

        let client = self.build(&key, data).await?;
        Ok(client)
    }

    async fn cached(&self, key: &str) -> Option<Client> {
        let clients = self.clients.lock().await;
        clients
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.client.clone())
    }

    async fn build(&self, key: &str, data: &[u8]) -> Result<Client> {
        let _permit = self
            .build_permits
            .acquire()
            .await
            .map_err(|e| SecretCopyError::ClientBuild(e.to_string()))?;

        let kubeconfig = parse_kubeconfig(data)?;
        let client = self.factory.build(kubeconfig).await?;

        info!("Built new client for kubeconfig {}", &key[..12]);
        self.clients.lock().await.insert(
            key.to_string(),
            CachedClient {
                client: client.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );

        Ok(client)
    }
}

/// Membership in the single-flight build for one digest.
///
/// Dropping it releases the map entry, including when the resolve future is
/// cancelled mid-build.
struct BuildSlot<'a> {
    builds: &'a BuildLocks,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> BuildSlot<'a> {
    fn claim(builds: &'a BuildLocks, key: &'a str) -> Self {
        let lock = builds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .clone();
        Self { builds, key, lock }
    }
}

impl Drop for BuildSlot<'_> {
    fn drop(&mut self) {
        let mut builds = self.builds.lock().unwrap_or_else(PoisonError::into_inner);
        if builds
            .get(self.key)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock))
        {
            builds.remove(self.key);
        }
    }
}

#[async_trait]
impl<F: ClientFactory> ClusterClientGetter for ClusterManager<F> {
    async fn get_client(&self, kubeconfig_secret: &Secret) -> Result<Client> {
        self.resolve(kubeconfig_secret).await
    }
}

/// Hex encoded SHA-256 of the kubeconfig bytes
pub fn hash_kubeconfig(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
