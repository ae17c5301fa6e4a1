//! Shared test utilities for xref-bundler tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xref_bundler::{LifecyclePlugin, LoaderError, LoaderKind, LoaderPlugin, NodeContext, get_hash};

/// Serve `body` as JSON at `route`, expecting exactly `calls` requests.
pub async fn serve_json(server: &MockServer, route: &str, body: Value, calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Serve `body` as JSON at `route`, any number of times.
pub async fn serve(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// `#/x-ext/<hash(identifier)><fragment>`
pub fn bucket_ref(identifier: &str, fragment: &str) -> String {
    format!("#/x-ext/{}{}", get_hash(identifier), fragment)
}

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Before {
        node: Value,
        path: Vec<String>,
        parent: Option<Vec<String>>,
    },
    After {
        node: Value,
        path: Vec<String>,
    },
    ResolveStart(Value),
    ResolveSuccess(Value),
    ResolveError(Value),
}

/// Lifecycle plugin that records every call.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn before_paths(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Before { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn resolve_events(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::ResolveStart(_) | Event::ResolveSuccess(_) | Event::ResolveError(_)
                )
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl LifecyclePlugin for Recorder {
    fn on_before_node_process(&self, root: &mut Value, context: &NodeContext<'_>) {
        self.push(Event::Before {
            node: context.node(root).cloned().unwrap_or_default(),
            path: context.path.to_vec(),
            parent: context.parent_path.map(<[String]>::to_vec),
        });
    }

    fn on_after_node_process(&self, root: &mut Value, context: &NodeContext<'_>) {
        self.push(Event::After {
            node: context.node(root).cloned().unwrap_or_default(),
            path: context.path.to_vec(),
        });
    }

    fn on_resolve_start(&self, node: &Value) {
        self.push(Event::ResolveStart(node.clone()));
    }

    fn on_resolve_success(&self, node: &Value) {
        self.push(Event::ResolveSuccess(node.clone()));
    }

    fn on_resolve_error(&self, node: &Value) {
        self.push(Event::ResolveError(node.clone()));
    }
}

/// Loader with a fixed answer that counts how it is used.
#[derive(Debug)]
pub struct StubLoader {
    accepts: fn(&str) -> bool,
    answer: Value,
    kind: LoaderKind,
    pub validated: Mutex<Vec<String>>,
    pub executed: AtomicUsize,
}

impl StubLoader {
    pub fn new(accepts: fn(&str) -> bool, answer: Value) -> Self {
        Self {
            accepts,
            answer,
            kind: LoaderKind::Source,
            validated: Mutex::new(Vec::new()),
            executed: AtomicUsize::new(0),
        }
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn validated(&self) -> Vec<String> {
        self.validated.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoaderPlugin for StubLoader {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn validate(&self, identifier: &str) -> bool {
        self.validated.lock().unwrap().push(identifier.to_string());
        (self.accepts)(identifier)
    }

    async fn exec(&self, _identifier: &str) -> Result<Value, LoaderError> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }

    fn kind(&self) -> LoaderKind {
        self.kind
    }
}
