//! Generator back-end interface (spec.md §6).
//!
//! The core never inspects a back-end's output — it is an opaque
//! `{framework, text}` artifact. This module defines the [`Generator`]
//! trait, a small by-name registry callers populate at pipeline
//! construction (spec.md §9: "no process-wide singletons"), and one
//! demonstration back-end so the pipeline has something runnable without
//! a caller bringing their own.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::api::Options;
use crate::error::GeneratorError;
use crate::model::Model;

/// An opaque generated-code artifact (spec.md §6). The core never reads
/// `text`'s contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub framework: String,
    pub text: String,
}

/// A code-generation back-end. Implementors register under a name
/// (spec.md §6: "A back-end registers by name") and are looked up by
/// [`Options::generator`] at the `generate_code` pipeline stage.
pub trait Generator: Send + Sync {
    /// Stable name this back-end is registered under.
    fn name(&self) -> &'static str;

    /// Produce an artifact from `model`, or fail.
    fn generate(&self, model: &Model, options: &Options) -> Result<GeneratedArtifact, GeneratorError>;
}

/// A by-name table of registered back-ends, owned by the caller rather
/// than a process-wide singleton (spec.md §9) — except for the one
/// process-wide convenience instance [`registry`], which exists purely
/// so [`crate::pipeline::Orchestrator`] does not need a constructor
/// parameter for the overwhelmingly common case of "use the built-in
/// back-ends".
#[derive(Default)]
pub struct GeneratorRegistry {
    backends: HashMap<&'static str, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Box<dyn Generator>) {
        self.backends.insert(backend.name(), backend);
    }

    pub fn generate(&self, name: &str, model: &Model, options: &Options) -> Result<GeneratedArtifact, GeneratorError> {
        match self.backends.get(name) {
            Some(backend) => backend.generate(model, options),
            None => Err(GeneratorError::UnknownBackend(name.to_string())),
        }
    }
}

static DEFAULT_REGISTRY: OnceLock<GeneratorRegistry> = OnceLock::new();

/// The default registry, pre-populated with [`DemoTreeGenerator`].
pub fn registry() -> &'static GeneratorRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        let mut registry = GeneratorRegistry::new();
        registry.register(Box::new(DemoTreeGenerator));
        registry
    })
}

/// A demonstration back-end: renders the component forest as an indented
/// text tree. Exists to exercise the [`Generator`] contract end-to-end;
/// real framework back-ends (Tkinter, Qt, …) are out of scope (spec.md §1).
pub struct DemoTreeGenerator;

impl Generator for DemoTreeGenerator {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn generate(&self, model: &Model, _options: &Options) -> Result<GeneratedArtifact, GeneratorError> {
        let mut text = String::new();
        for root in model.roots() {
            render(model, root, 0, &mut text);
        }
        Ok(GeneratedArtifact { framework: "demo-tree".to_string(), text })
    }
}

fn render(model: &Model, id: u64, depth: usize, out: &mut String) {
    let Some(component) = model.get(id) else { return };
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("{} #{}\n", component.type_tag, component.id));
    for child in model.children_of(id) {
        render(model, child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::spatial_index::BBox;
    use std::collections::HashMap as Map;

    #[test]
    fn unknown_backend_name_is_an_error() {
        let model = Model::new();
        let options = Options::default();
        let err = registry().generate("nonexistent", &model, &options).unwrap_err();
        assert!(matches!(err, GeneratorError::UnknownBackend(name) if name == "nonexistent"));
    }

    #[test]
    fn demo_generator_renders_a_tree() {
        let mut model = Model::new();
        model.insert(crate::model::Component {
            id: 1,
            type_tag: "Window".to_string(),
            properties: Map::new(),
            bbox: BBox::new(0, 0, 10, 10),
            confidence: 1.0,
            boundary_incomplete: false,
        });
        let options = Options::default();
        let artifact = registry().generate("demo", &model, &options).unwrap();
        assert_eq!(artifact.framework, "demo-tree");
        assert!(artifact.text.contains("Window #1"));
    }
}
