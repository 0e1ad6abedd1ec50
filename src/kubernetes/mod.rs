// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for destination clients, kubeconfig access, and namespace checks.

pub mod client;
pub mod cluster_manager;
pub mod namespaces;

pub use client::{get_kubeconfig_secret, KubeconfigClientFactory};
pub use cluster_manager::{ClientFactory, ClusterClientGetter, ClusterManager};
pub use namespaces::require_namespace;
