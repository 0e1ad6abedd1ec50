// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod admission;
pub mod backoff;
pub mod secret;
pub mod status;

pub use admission::AdmissionFilter;
pub use secret::SecretCopyReconciler;
