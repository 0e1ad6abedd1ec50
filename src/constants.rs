// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Label that marks a secret for copying when set to "true"
pub const LABEL_ENABLED: &str = "secret-copy.in-cloud.io";

/// Key in the kubeconfig secret's data holding the kubeconfig document
pub const KUBECONFIG_KEY: &str = "value";

/// Kubernetes annotation keys used by the operator
pub mod annotations {
    /// Kubeconfig secret reference (`namespace/name`), required
    pub const DST_KUBECONFIG: &str = "secret-copy.in-cloud.io/dstClusterKubeconfig";
    /// Target namespace (defaults to the source namespace)
    pub const DST_NAMESPACE: &str = "secret-copy.in-cloud.io/dstNamespace";
    /// Target secret name (defaults to the source name)
    pub const DST_NAME: &str = "secret-copy.in-cloud.io/dstName";
    /// Target secret type (defaults to the source type)
    pub const DST_TYPE: &str = "secret-copy.in-cloud.io/dstType";
    /// Behaviour when the target secret exists: "overwrite" or "ignore"
    pub const STRATEGY_IF_EXIST: &str = "strategy.secret-copy.in-cloud.io/ifExist";
    /// Prefix of field mapping annotations, `<prefix><srcKey>: <dstKey>`
    pub const FIELDS_PREFIX: &str = "fields.secret-copy.in-cloud.io/";

    /// Prefix shared by all status annotations
    pub const STATUS_PREFIX: &str = "status.secret-copy.in-cloud.io/";
    /// Last sync timestamp (RFC3339)
    pub const LAST_SYNC_TIME: &str = "status.secret-copy.in-cloud.io/lastSyncTime";
    /// Last sync status, "Synced" or "Error: <message>"
    pub const LAST_SYNC_STATUS: &str = "status.secret-copy.in-cloud.io/lastSyncStatus";
    /// Retry counter driving the exponential backoff
    pub const RETRY_COUNT: &str = "status.secret-copy.in-cloud.io/retryCount";

    /// Provenance stamped on copied secrets
    pub const SOURCE_CLUSTER: &str = "secret-copy.in-cloud.io/sourceCluster";
    pub const SOURCE_SECRET: &str = "secret-copy.in-cloud.io/sourceSecret";
    pub const COPIED_AT: &str = "secret-copy.in-cloud.io/copiedAt";

    /// Annotations with these prefixes are never copied to the target secret
    pub const PREFIXES_TO_FILTER: &[&str] = &[
        "secret-copy.in-cloud.io/",
        STATUS_PREFIX,
        "strategy.secret-copy.in-cloud.io/",
        FIELDS_PREFIX,
        "kubectl.kubernetes.io/",
        "argocd.argoproj.io/",
    ];
}

/// Values written to the last sync status annotation
pub mod status {
    pub const SYNCED: &str = "Synced";
    pub const ERROR_PREFIX: &str = "Error: ";
}

/// Retry backoff bounds
pub mod backoff {
    pub const BASE_DELAY_SECS: u64 = 30;
    pub const MAX_DELAY_SECS: u64 = 300;
}

/// The operator name, used as field manager
pub const OPERATOR_NAME: &str = "secret-copy-operator";
