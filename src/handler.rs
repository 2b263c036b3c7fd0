//! Handler registration and resolution.
//!
//! A topic maps to an ordered list of handler descriptors; each descriptor
//! names a target and a method on it. Targets are looked up by name in a
//! resolver, so handler dispatch is a registry lookup rather than anything
//! reflective. Resolution failures are dispatch errors and abort the run.

use std::{collections::HashMap, fs::File, path::Path, sync::Arc};

use async_trait::async_trait;
use pom::utf8::{end, one_of, seq, Parser};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{decode::DecodedMessage, error::Error};

/// A unit of logic invocable with a decoded message.
///
/// A target groups related methods; the descriptor picks one. Invocation
/// errors are arbitrary handler failures and are deliberately not caught by
/// the engine.
#[async_trait]
pub trait HandlerTarget: Send + Sync {
    async fn invoke(&self, method: &str, message: &DecodedMessage) -> eyre::Result<()>;
}

/// Names a target and the method to call on it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub target: String,
    pub method: String,
}

impl HandlerDescriptor {
    pub fn new(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method: method.into(),
        }
    }

    /// Parse the compact `target::method` form used by topology files.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let parser = target_name() - seq("::") + method_name() - end();

        let (target, method) = parser
            .parse_str(input)
            .map_err(|e| Error::invalid_descriptor(format!("{input:?}: {e}")))?;

        Ok(Self::new(target, method))
    }
}

impl std::fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.target, self.method)
    }
}

fn target_name<'a>() -> Parser<'a, &'a str> {
    one_of("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890_.")
        .repeat(1..)
        .collect()
}

fn method_name<'a>() -> Parser<'a, &'a str> {
    one_of("abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890_")
        .repeat(1..)
        .collect()
}

/// Topic name to ordered handler descriptors.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    topics: HashMap<String, Vec<HandlerDescriptor>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, topic: impl Into<String>, descriptor: HandlerDescriptor) {
        self.topics.entry(topic.into()).or_default().push(descriptor);
    }

    /// Handlers for a topic in registration order; empty for unknown topics.
    pub fn handlers_for_topic(&self, topic: &str) -> &[HandlerDescriptor] {
        self.topics
            .get(topic)
            .map(|handlers| handlers.as_slice())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Build a registry from a topology map of topic to descriptor strings.
    pub fn from_topology(map: HashMap<String, Vec<String>>) -> Result<Self, Error> {
        let mut registry = Self::new();

        for (topic, descriptors) in map {
            for raw in descriptors {
                registry.register(&topic, HandlerDescriptor::parse(&raw)?);
            }
        }

        Ok(registry)
    }

    /// Load a topology file: a JSON object mapping each topic name to a list
    /// of `target::method` strings.
    pub fn from_topology_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| Error::topology(format!("unable to open {}", path.display()), e))?;

        let map: HashMap<String, Vec<String>> = serde_json::from_reader(file)
            .map_err(|e| Error::topology(format!("unable to parse {}", path.display()), e))?;

        debug!(path = %path.display(), topics = map.len(), "loaded handler topology");

        Self::from_topology(map)
    }
}

/// Target name to invocable instance.
#[derive(Clone, Default)]
pub struct TargetResolver {
    targets: HashMap<String, Arc<dyn HandlerTarget>>,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver preloaded with the built-in targets; embedders add their own
    /// on top.
    pub fn builtin() -> Self {
        let mut resolver = Self::new();
        resolver.register("log", Arc::new(LogTarget));
        resolver
    }

    pub fn register(&mut self, name: impl Into<String>, target: Arc<dyn HandlerTarget>) {
        self.targets.insert(name.into(), target);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn HandlerTarget>, Error> {
        self.targets
            .get(name)
            .cloned()
            .ok_or_else(|| Error::unknown_target(name))
    }
}

/// Built-in target that emits the decoded payload to the log. Gives the
/// binary a working handler wiring out of the box.
pub struct LogTarget;

#[async_trait]
impl HandlerTarget for LogTarget {
    async fn invoke(&self, method: &str, message: &DecodedMessage) -> eyre::Result<()> {
        match method {
            "info" => info!(payload = %message, "replayed message"),
            "debug" => debug!(payload = %message, "replayed message"),
            "warn" => warn!(payload = %message, "replayed message"),
            other => eyre::bail!("no method {other} on log target"),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_descriptor_valid() {
        let test_cases = vec![
            ("log::info", HandlerDescriptor::new("log", "info")),
            (
                "order.indexer::reindex",
                HandlerDescriptor::new("order.indexer", "reindex"),
            ),
            (
                "product_alert::send_batch",
                HandlerDescriptor::new("product_alert", "send_batch"),
            ),
        ];

        for (input, expected) in test_cases {
            let result = HandlerDescriptor::parse(input);
            assert!(
                result.is_ok(),
                "Failed to parse valid descriptor: {} ({})",
                input,
                result.unwrap_err()
            );
            assert_eq!(
                result.unwrap(),
                expected,
                "Descriptor mismatch for input: {}",
                input
            );
        }
    }

    #[test]
    fn test_parse_descriptor_invalid() {
        let invalid_inputs = vec![
            "log",          // Missing method
            "log::",        // Empty method
            "::info",       // Empty target
            "log:info",     // Single separator
            "log::in fo",   // Whitespace
            "",             // Empty string
            "log::info::x", // Trailing segment
        ];

        for input in invalid_inputs {
            let result = HandlerDescriptor::parse(input);
            assert!(
                result.is_err(),
                "Expected error for invalid input: {}",
                input
            );

            match result {
                Err(Error::InvalidDescriptor { .. }) => {}
                _ => panic!("Expected InvalidDescriptor error for input: {}", input),
            }
        }
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let mut registry = HandlerRegistry::new();
        registry.register("order_created", HandlerDescriptor::new("log", "info"));
        registry.register("order_created", HandlerDescriptor::new("indexer", "reindex"));

        let handlers = registry.handlers_for_topic("order_created");
        assert_eq!(handlers.len(), 2);
        assert_eq!(handlers[0].target, "log");
        assert_eq!(handlers[1].target, "indexer");

        assert!(registry.handlers_for_topic("unknown_topic").is_empty());
    }

    #[test]
    fn test_registry_from_topology() {
        let mut map = HashMap::new();
        map.insert(
            "order_created".to_owned(),
            vec!["log::info".to_owned(), "indexer::reindex".to_owned()],
        );

        let registry = HandlerRegistry::from_topology(map).unwrap();
        assert_eq!(registry.handlers_for_topic("order_created").len(), 2);

        let mut bad = HashMap::new();
        bad.insert("order_created".to_owned(), vec!["not-valid".to_owned()]);
        assert!(HandlerRegistry::from_topology(bad).is_err());
    }

    #[test]
    fn test_resolver_unknown_target() {
        let resolver = TargetResolver::builtin();

        assert!(resolver.resolve("log").is_ok());
        match resolver.resolve("missing").err() {
            Some(Error::UnknownTarget { target }) => assert_eq!(target, "missing"),
            other => panic!("expected UnknownTarget, got {other:?}"),
        }
    }
}
