// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decides which watch events should trigger a reconcile.
//!
//! Status writes only touch `status.secret-copy.in-cloud.io/` annotations, so
//! they never pass the update predicate and cannot feed back into the loop.

use crate::constants::{annotations, LABEL_ENABLED};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::runtime::{reflector::ObjectRef, watcher};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub enum SecretEvent<'a> {
    Created(&'a Secret),
    Updated { old: &'a Secret, new: &'a Secret },
    Deleted(&'a Secret),
    Generic(&'a Secret),
}

pub fn admit(event: &SecretEvent<'_>) -> bool {
    match event {
        SecretEvent::Created(secret) | SecretEvent::Generic(secret) => {
            is_replication_enabled(secret)
        }
        SecretEvent::Updated { old, new } => {
            is_replication_enabled(new) && spec_changed(old, new)
        }
        SecretEvent::Deleted(_) => false,
    }
}

pub fn is_replication_enabled(secret: &Secret) -> bool {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(LABEL_ENABLED))
        .is_some_and(|v| v == "true")
}

/// The parts of a secret that are user intent rather than operator bookkeeping
#[derive(Debug, PartialEq, Eq)]
pub struct SpecProjection<'a> {
    data: BTreeMap<&'a str, &'a ByteString>,
    labels: BTreeMap<&'a str, &'a str>,
    annotations: BTreeMap<&'a str, &'a str>,
}

impl<'a> SpecProjection<'a> {
    pub fn of(secret: &'a Secret) -> Self {
        let data = secret
            .data
            .iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        let labels = secret
            .metadata
            .labels
            .iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let annotations = secret
            .metadata
            .annotations
            .iter()
            .flatten()
            .filter(|(k, _)| !k.starts_with(annotations::STATUS_PREFIX))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        Self {
            data,
            labels,
            annotations,
        }
    }

    /// SHA-256 over a length-prefixed encoding of the projection
    pub fn digest(&self) -> SpecDigest {
        let mut hasher = Sha256::new();
        feed_entries(&mut hasher, self.data.iter().map(|(k, v)| (*k, v.0.as_slice())));
        feed_entries(&mut hasher, self.labels.iter().map(|(k, v)| (*k, v.as_bytes())));
        feed_entries(
            &mut hasher,
            self.annotations.iter().map(|(k, v)| (*k, v.as_bytes())),
        );
        hasher.finalize().to_vec()
    }
}

pub type SpecDigest = Vec<u8>;

fn feed_entries<'a, I>(hasher: &mut Sha256, entries: I)
where
    I: ExactSizeIterator<Item = (&'a str, &'a [u8])>,
{
    hasher.update((entries.len() as u64).to_le_bytes());
    for (key, value) in entries {
        for part in [key.as_bytes(), value] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
    }
}

pub fn spec_changed(old: &Secret, new: &Secret) -> bool {
    SpecProjection::of(old) != SpecProjection::of(new)
}

/// Turns raw watcher events into the objects that should be reconciled.
///
/// Remembers a digest of the last spec seen per object so updates can be
/// compared against it without holding on to secret payloads. During a
/// relist, objects that were never seen count as generic events and objects
/// missing from the relist are forgotten.
#[derive(Default)]
pub struct AdmissionFilter {
    seen: HashMap<ObjectRef<Secret>, SpecDigest>,
    relisted: Option<HashSet<ObjectRef<Secret>>>,
}

impl AdmissionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: watcher::Event<Secret>) -> Option<Secret> {
        match event {
            watcher::Event::Apply(secret) => self.remember(secret, false),
            watcher::Event::InitApply(secret) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(ObjectRef::from_obj(&secret));
                }
                self.remember(secret, true)
            }
            watcher::Event::Delete(secret) => {
                let admitted = admit(&SecretEvent::Deleted(&secret));
                self.seen.remove(&ObjectRef::from_obj(&secret));
                admitted.then_some(secret)
            }
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                None
            }
            watcher::Event::InitDone => {
                if let Some(relisted) = self.relisted.take() {
                    self.seen.retain(|key, _| relisted.contains(key));
                }
                None
            }
        }
    }

    fn remember(&mut self, secret: Secret, relist: bool) -> Option<Secret> {
        let key = ObjectRef::from_obj(&secret);
        let digest = SpecProjection::of(&secret).digest();
        let admitted = match self.seen.get(&key) {
            // Same predicate as `SecretEvent::Updated`, against the stored digest
            Some(previous) => is_replication_enabled(&secret) && *previous != digest,
            None if relist => admit(&SecretEvent::Generic(&secret)),
            None => admit(&SecretEvent::Created(&secret)),
        };
        trace!(secret = %key, admitted, "Observed secret");

        self.seen.insert(key, digest);
        admitted.then_some(secret)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.seen.len()
    }
}
