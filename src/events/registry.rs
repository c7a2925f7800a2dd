use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::SearchIndex;
use crate::index::Indexes;

use super::listeners::{EntryListener, ListenerSet, ResponseListener, TraceListener};

/// Capability tag of the built-in tracing listener.
pub const TRACE_PLUGIN: &str = "trace";

/// Prefix marking a configured listener name as disabled.
const DISABLED_PREFIX: char = '#';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown {kind} listener `{name}`")]
    Unknown { kind: &'static str, name: String },
    #[error("{kind} listener `{name}` is already registered")]
    Duplicate { kind: &'static str, name: String },
}

/// What a plugin factory gets to build its listener from.
#[derive(Clone)]
pub struct PluginContext {
    pub collection: String,
    pub indexes: Indexes,
    pub search: Arc<dyn SearchIndex>,
}

pub type EntryListenerFactory =
    Arc<dyn Fn(&PluginContext) -> Arc<dyn EntryListener> + Send + Sync>;
pub type ResponseListenerFactory =
    Arc<dyn Fn(&PluginContext) -> Arc<dyn ResponseListener> + Send + Sync>;

/// Capability tag to listener factory.
///
/// Configuration names listeners by tag; resolution happens once, when a
/// collection is built, and an unknown tag fails the build.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    entry: BTreeMap<String, EntryListenerFactory>,
    response: BTreeMap<String, ResponseListenerFactory>,
}

impl ListenerRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding the built-in plugin tags.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.entry.insert(
            TRACE_PLUGIN.to_string(),
            Arc::new(|ctx: &PluginContext| {
                Arc::new(TraceListener::new(ctx.collection.clone())) as Arc<dyn EntryListener>
            }),
        );
        registry.response.insert(
            TRACE_PLUGIN.to_string(),
            Arc::new(|ctx: &PluginContext| {
                Arc::new(TraceListener::new(ctx.collection.clone())) as Arc<dyn ResponseListener>
            }),
        );
        registry
    }

    pub fn register_entry(
        &mut self,
        tag: impl Into<String>,
        factory: EntryListenerFactory,
    ) -> Result<(), RegistryError> {
        let tag = tag.into();
        if self.entry.contains_key(&tag) {
            return Err(RegistryError::Duplicate {
                kind: "entry",
                name: tag,
            });
        }
        debug!(tag = %tag, "Entry listener factory registered");
        self.entry.insert(tag, factory);
        Ok(())
    }

    pub fn register_response(
        &mut self,
        tag: impl Into<String>,
        factory: ResponseListenerFactory,
    ) -> Result<(), RegistryError> {
        let tag = tag.into();
        if self.response.contains_key(&tag) {
            return Err(RegistryError::Duplicate {
                kind: "response",
                name: tag,
            });
        }
        debug!(tag = %tag, "Response listener factory registered");
        self.response.insert(tag, factory);
        Ok(())
    }

    /// Build the configured plugin listeners, in configuration order.
    ///
    /// Blank names and names starting with `#` are skipped.
    pub fn resolve(
        &self,
        entry_names: &[String],
        response_names: &[String],
        ctx: &PluginContext,
    ) -> Result<ListenerSet, RegistryError> {
        let mut set = ListenerSet::new();

        for name in enabled(entry_names) {
            let factory = self.entry.get(name).ok_or_else(|| RegistryError::Unknown {
                kind: "entry",
                name: name.to_string(),
            })?;
            set = set.with_entry(factory(ctx));
        }
        for name in enabled(response_names) {
            let factory = self
                .response
                .get(name)
                .ok_or_else(|| RegistryError::Unknown {
                    kind: "response",
                    name: name.to_string(),
                })?;
            set = set.with_response(factory(ctx));
        }

        info!(
            collection = %ctx.collection,
            entry = set.entry_listeners().len(),
            response = set.response_listeners().len(),
            "Plugin listeners resolved"
        );
        Ok(set)
    }

    pub fn entry_tags(&self) -> Vec<String> {
        self.entry.keys().cloned().collect()
    }

    pub fn response_tags(&self) -> Vec<String> {
        self.response.keys().cloned().collect()
    }
}

fn enabled(names: &[String]) -> impl Iterator<Item = &str> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty() && !name.starts_with(DISABLED_PREFIX))
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("entry", &self.entry_tags())
            .field("response", &self.response_tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::date::SimpleDate;
    use crate::infra::search::MemorySearchIndex;

    fn context() -> PluginContext {
        let clock = Arc::new(FixedClock(SimpleDate::new(2024, 1, 1).expect("valid date")));
        PluginContext {
            collection: "blog".to_string(),
            indexes: Indexes::new(clock),
            search: Arc::new(MemorySearchIndex::new()),
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn resolves_builtin_tags_and_skips_disabled_names() {
        let registry = ListenerRegistry::with_builtins();
        let set = registry
            .resolve(&names(&["trace", "#missing", " "]), &names(&["trace"]), &context())
            .expect("names resolve");

        assert_eq!(set.entry_listeners().len(), 1);
        assert_eq!(set.response_listeners().len(), 1);
        assert_eq!(set.entry_listeners()[0].name(), "trace");
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        let registry = ListenerRegistry::with_builtins();
        let err = registry
            .resolve(&names(&["spam-filter"]), &[], &context())
            .expect_err("unknown tag");

        assert_eq!(
            err,
            RegistryError::Unknown {
                kind: "entry",
                name: "spam-filter".to_string()
            }
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = ListenerRegistry::with_builtins();
        let factory: EntryListenerFactory = Arc::new(|ctx: &PluginContext| {
            Arc::new(TraceListener::new(ctx.collection.clone())) as Arc<dyn EntryListener>
        });

        let err = registry
            .register_entry(TRACE_PLUGIN, Arc::clone(&factory))
            .expect_err("tag taken");
        assert!(matches!(err, RegistryError::Duplicate { .. }));
        registry
            .register_entry("audit-mirror", factory)
            .expect("new tag registers");
        assert_eq!(registry.entry_tags(), vec!["audit-mirror", "trace"]);
    }
}
