//! Per-connection cache of tool descriptors.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::protocol::ToolDescriptor;

/// Tool descriptors fetched on one connection.
///
/// Entries are tagged with the connection generation they were fetched on and
/// are never served for any other generation.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    cache: Mutex<Option<(u64, Arc<[ToolDescriptor]>)>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools cached for `generation`, if any.
    pub fn cached(&self, generation: u64) -> Option<Arc<[ToolDescriptor]>> {
        match self.cache.lock().as_ref() {
            Some((cached_generation, tools)) if *cached_generation == generation => {
                Some(Arc::clone(tools))
            }
            _ => None,
        }
    }

    /// Store the tools fetched on `generation`.
    ///
    /// Later duplicates of a name are dropped so names stay unique.
    pub fn store(&self, generation: u64, tools: Vec<ToolDescriptor>) -> Arc<[ToolDescriptor]> {
        let mut seen = HashSet::new();
        let unique: Vec<ToolDescriptor> = tools
            .into_iter()
            .filter(|tool| {
                let fresh = seen.insert(tool.name.clone());
                if !fresh {
                    tracing::warn!(tool = %tool.name, "host listed tool twice, keeping the first");
                }
                fresh
            })
            .collect();

        let tools: Arc<[ToolDescriptor]> = unique.into();
        *self.cache.lock() = Some((generation, Arc::clone(&tools)));
        tools
    }

    /// Drop the cached list.
    pub fn invalidate(&self) {
        self.cache.lock().take();
    }

    /// Look up a tool cached for `generation`.
    pub fn find(&self, generation: u64, name: &str) -> Option<ToolDescriptor> {
        self.cached(generation)?
            .iter()
            .find(|tool| tool.name == name)
            .cloned()
    }
}

/// The tool a view selects when the user has not picked one: the first listed.
pub fn default_tool(tools: &[ToolDescriptor]) -> Option<&ToolDescriptor> {
    tools.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools() -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("search", "Search"),
            ToolDescriptor::new("summarize", "Summarize"),
            ToolDescriptor::new("search", "Shadowed"),
        ]
    }

    #[test]
    fn test_cache_is_scoped_to_generation() {
        let registry = ToolRegistry::new();
        assert!(registry.cached(1).is_none());

        registry.store(1, tools());
        assert_eq!(registry.cached(1).unwrap().len(), 2);
        assert!(registry.cached(2).is_none());

        registry.invalidate();
        assert!(registry.cached(1).is_none());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let registry = ToolRegistry::new();
        let stored = registry.store(3, tools());
        assert_eq!(stored.len(), 2);
        assert_eq!(registry.find(3, "search").unwrap().description, "Search");
        assert!(registry.find(3, "missing").is_none());
    }

    #[test]
    fn test_default_tool_is_first() {
        let list = tools();
        assert_eq!(default_tool(&list).unwrap().name, "search");
        assert!(default_tool(&[]).is_none());
    }
}
