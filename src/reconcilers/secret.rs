// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret reconciler - copies labeled secrets into their destination cluster.

use crate::config::Config;
use crate::constants::LABEL_ENABLED;
use crate::copy::{copy_secret, CopyDirective, CopyOutcome};
use crate::error::{Result, SecretCopyError};
use crate::kubernetes::{get_kubeconfig_secret, ClusterClientGetter};
use crate::reconcilers::admission::{is_replication_enabled, AdmissionFilter};
use crate::reconcilers::status::{write_status, StatusUpdate};
use chrono::Utc;
use futures::{future, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    runtime::{
        controller::{self, Action},
        reflector, watcher, Controller, WatchStreamExt,
    },
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

pub struct SecretCopyReconciler {
    client: Client,
    clusters: Arc<dyn ClusterClientGetter>,
    config: Config,
}

impl SecretCopyReconciler {
    pub fn new(client: Client, clusters: Arc<dyn ClusterClientGetter>, config: Config) -> Self {
        Self {
            client,
            clusters,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = match &self.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let concurrency = u16::try_from(self.config.max_concurrent_reconciles).unwrap_or(u16::MAX);
        info!(
            namespace = self.config.watch_namespace.as_deref().unwrap_or("*"),
            concurrency, "Watching secrets"
        );

        let (reader, writer) = reflector::store();
        let mut admission = AdmissionFilter::new();
        let triggers = watcher(
            secrets,
            WatcherConfig::default().labels(&format!("{LABEL_ENABLED}=true")),
        )
        .default_backoff()
        .reflect(writer)
        .try_filter_map(move |event| future::ready(Ok(admission.observe(event))));

        let context = Arc::new(self);

        Controller::for_stream(triggers, reader)
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled secret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        info!("Secret reconciler stopped");
        Ok(())
    }

    /// One reconcile pass over the current state of `namespace/name`
    #[instrument(skip(self), fields(secret = %format!("{}/{}", namespace, name)))]
    pub async fn reconcile_secret(&self, namespace: &str, name: &str) -> Result<Action> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let Some(secret) = api.get_opt(name).await? else {
            debug!("Secret no longer exists, nothing to do");
            return Ok(Action::await_change());
        };
        if !is_replication_enabled(&secret) {
            debug!("Secret is no longer labeled for replication, skipping");
            return Ok(Action::await_change());
        }

        let now = Utc::now();
        let update = match self.sync(&secret).await {
            Ok(outcome) => {
                info!(?outcome, "Secret synced");
                StatusUpdate::synced(now)
            }
            Err(e) if !e.is_retryable() => {
                warn!(error = %e, "Invalid copy configuration, waiting for the secret to change");
                StatusUpdate::invalid(&e, now)
            }
            Err(e) => {
                let update = StatusUpdate::failed(&secret, &e, now);
                warn!(
                    error = %e,
                    retry_count = update.retry_count,
                    requeue_after = ?update.requeue_after,
                    "Failed to sync secret"
                );
                update
            }
        };

        // The next pass recomputes everything from the object, so a lost
        // status write only costs accuracy of the counter.
        if let Err(e) = write_status(&api, &secret, &update).await {
            warn!(error = %e, "Failed to update secret status");
        }

        Ok(update.action())
    }

    async fn sync(&self, secret: &Secret) -> Result<CopyOutcome> {
        let directive = CopyDirective::from_secret(secret)?;
        debug!(
            kubeconfig = %directive.kubeconfig_ref,
            target = %format!("{}/{}", directive.namespace, directive.name),
            strategy = %directive.strategy,
            "Parsed copy directive"
        );

        let kubeconfig = get_kubeconfig_secret(&self.client, &directive.kubeconfig_ref).await?;
        let target = self.clusters.get_client(&kubeconfig).await?;

        copy_secret(target, secret, &directive, &self.config.cluster_name).await
    }
}

async fn reconcile(secret: Arc<Secret>, ctx: Arc<SecretCopyReconciler>) -> Result<Action> {
    let namespace = secret.namespace().unwrap_or_default();
    ctx.reconcile_secret(&namespace, &secret.name_any()).await
}

fn error_policy(
    _secret: Arc<Secret>,
    error: &SecretCopyError,
    _ctx: Arc<SecretCopyReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(60))
}
