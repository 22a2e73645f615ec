//! Holds compiled patterns for one pipeline run (spec.md §4.5).

use std::collections::HashMap;

use super::Pattern;
use crate::error::CompileError;

/// A read-only-after-construction table of compiled patterns, keyed by
/// their fully-qualified name. Lifetime equals one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
    by_name: HashMap<String, usize>,
}

impl PatternRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern`. `prohib` mirrors the source's `prohib`
    /// modifier: when set, a pattern already registered under the same
    /// name is replaced in place (keeping its original registration
    /// order) rather than rejected.
    pub fn register(&mut self, mut pattern: Pattern, prohib: bool) -> Result<(), CompileError> {
        if let Some(&index) = self.by_name.get(&pattern.name) {
            if !prohib {
                return Err(CompileError::Duplicate(pattern.name.clone()));
            }
            pattern.registration_order = self.patterns[index].registration_order;
            self.patterns[index] = pattern;
            return Ok(());
        }
        pattern.registration_order = self.patterns.len();
        self.by_name.insert(pattern.name.clone(), self.patterns.len());
        self.patterns.push(pattern);
        Ok(())
    }

    /// All registered patterns, in registration order.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Look up a pattern by its registered name.
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.by_name.get(name).map(|&i| &self.patterns[i])
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ConfidenceMode, PatternKind};

    fn pattern(name: &str) -> Pattern {
        Pattern {
            name: name.to_string(),
            kind: PatternKind::Track,
            rules: Vec::new(),
            threshold: None,
            confidence_mode: ConfidenceMode::Product,
            registration_order: 0,
        }
    }

    #[test]
    fn duplicate_without_prohib_is_rejected() {
        let mut registry = PatternRegistry::new();
        registry.register(pattern("Button"), false).unwrap();
        let err = registry.register(pattern("Button"), false).unwrap_err();
        assert!(matches!(err, CompileError::Duplicate(name) if name == "Button"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_with_prohib_replaces_in_place() {
        let mut registry = PatternRegistry::new();
        registry.register(pattern("Button"), false).unwrap();
        registry.register(pattern("Window"), false).unwrap();
        registry.register(pattern("Button"), true).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Button").unwrap().registration_order, 0);
    }
}
