// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory Kubernetes API server for tests.
//!
//! Serves the small slice of the core/v1 API the operator touches:
//! namespace lookups and secret get/create/replace/merge-patch, with
//! resourceVersion conflicts enforced the way the real API server does.

use crate::constants::{KUBECONFIG_KEY, LABEL_ENABLED};
use http::{Method, Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

pub const TEST_KUBECONFIG: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: target
  cluster:
    server: https://target.example.com:6443
contexts:
- name: target
  context:
    cluster: target
    user: admin
current-context: target
users:
- name: admin
  user:
    token: test-token
"#;

#[derive(Default)]
struct ApiState {
    namespaces: HashSet<String>,
    secrets: BTreeMap<(String, String), Value>,
    resource_version: u64,
    failures: HashMap<(String, String), u16>,
}

impl ApiState {
    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// A fake API server backing a real `kube::Client`
#[derive(Clone, Default)]
pub struct FakeApiServer {
    state: Arc<Mutex<ApiState>>,
}

impl FakeApiServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, name: &str) -> Self {
        self.state.lock().unwrap().namespaces.insert(name.to_string());
        self
    }

    /// Store a secret as-is, assigning it a fresh resourceVersion
    pub fn with_secret(self, secret: Secret) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let mut object = serde_json::to_value(&secret).unwrap();
            object["metadata"]["resourceVersion"] = Value::String(state.next_version());
            let key = (
                secret.metadata.namespace.clone().unwrap_or_default(),
                secret.metadata.name.clone().unwrap_or_default(),
            );
            state.secrets.insert(key, object);
        }
        self
    }

    /// Answer every `method` request on `path` with an error status
    pub fn fail(self, method: &str, path: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((method.to_string(), path.to_string()), status);
        self
    }

    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        let state = self.state.lock().unwrap();
        state
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .map(|object| serde_json::from_value(object.clone()).unwrap())
    }

    fn handle(&self, method: &Method, path: &str, body: &[u8]) -> (u16, Value) {
        let mut state = self.state.lock().unwrap();

        if let Some(status) = state.failures.get(&(method.to_string(), path.to_string())) {
            return (*status, status_json(*status, "InternalError", "injected failure"));
        }

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match (method, segments.as_slice()) {
            (&Method::GET, ["api", "v1", "namespaces", ns]) => {
                if state.namespaces.contains(*ns) {
                    (200, namespace_json(ns))
                } else {
                    (404, not_found_json("namespaces", ns))
                }
            }
            (&Method::GET, ["api", "v1", "namespaces", ns, "secrets", name]) => {
                match state.secrets.get(&(ns.to_string(), name.to_string())) {
                    Some(object) => (200, object.clone()),
                    None => (404, not_found_json("secrets", name)),
                }
            }
            (&Method::POST, ["api", "v1", "namespaces", ns, "secrets"]) => {
                let mut object: Value = serde_json::from_slice(body).unwrap();
                let name = object["metadata"]["name"].as_str().unwrap_or_default().to_string();
                let key = (ns.to_string(), name.clone());
                if state.secrets.contains_key(&key) {
                    let message = format!("secrets {name:?} already exists");
                    return (409, status_json(409, "AlreadyExists", &message));
                }
                object["metadata"]["namespace"] = Value::String(ns.to_string());
                object["metadata"]["resourceVersion"] = Value::String(state.next_version());
                state.secrets.insert(key, object.clone());
                (201, object)
            }
            (&Method::PUT, ["api", "v1", "namespaces", ns, "secrets", name]) => {
                let key = (ns.to_string(), name.to_string());
                let Some(current) = state.secrets.get(&key) else {
                    return (404, not_found_json("secrets", name));
                };
                let mut object: Value = serde_json::from_slice(body).unwrap();
                if is_stale(&object, current) {
                    return (409, conflict_json(name));
                }
                object["metadata"]["resourceVersion"] = Value::String(state.next_version());
                state.secrets.insert(key, object.clone());
                (200, object)
            }
            (&Method::PATCH, ["api", "v1", "namespaces", ns, "secrets", name]) => {
                let key = (ns.to_string(), name.to_string());
                let Some(current) = state.secrets.get(&key) else {
                    return (404, not_found_json("secrets", name));
                };
                let patch: Value = serde_json::from_slice(body).unwrap();
                if is_stale(&patch, current) {
                    return (409, conflict_json(name));
                }
                let mut object = current.clone();
                merge_patch(&mut object, &patch);
                object["metadata"]["resourceVersion"] = Value::String(state.next_version());
                state.secrets.insert(key, object.clone());
                (200, object)
            }
            _ => (404, status_json(404, "NotFound", &format!("no route for {method} {path}"))),
        }
    }
}

impl Service<Request<Body>> for FakeApiServer {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let server = self.clone();

        Box::pin(async move {
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let body = req.into_body().collect().await?.to_bytes();

            let (status, payload) = server.handle(&method, &path, &body);

            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string().into_bytes()))
                .unwrap())
        })
    }
}

/// A conflicting write carries a resourceVersion that no longer matches
fn is_stale(incoming: &Value, current: &Value) -> bool {
    match incoming["metadata"]["resourceVersion"].as_str() {
        Some(rv) => Some(rv) != current["metadata"]["resourceVersion"].as_str(),
        None => false,
    }
}

/// JSON merge patch: objects merge recursively, `null` removes a key
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(entries) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = json!({});
    }
    if let Value::Object(fields) = target {
        for (key, value) in entries {
            if value.is_null() {
                fields.remove(key);
            } else {
                merge_patch(fields.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn status_json(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
}

fn not_found_json(resource: &str, name: &str) -> Value {
    status_json(404, "NotFound", &format!("{resource} \"{name}\" not found"))
}

fn conflict_json(name: &str) -> Value {
    status_json(
        409,
        "Conflict",
        &format!(
            "Operation cannot be fulfilled on secrets \"{name}\": the object has been modified"
        ),
    )
}

fn namespace_json(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
}

/// A secret holding kubeconfig bytes under the well-known key
pub fn kubeconfig_secret(namespace: &str, name: &str, kubeconfig: &[u8]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            KUBECONFIG_KEY.to_string(),
            ByteString(kubeconfig.to_vec()),
        )])),
        ..Default::default()
    }
}

/// A replication-enabled secret with the given annotations and data
pub fn source_secret(
    namespace: &str,
    name: &str,
    annotations: Vec<(&str, &str)>,
    data: &[(&str, &str)],
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(LABEL_ENABLED.to_string(), "true".to_string())])),
            annotations: Some(
                annotations
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}
