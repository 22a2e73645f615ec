//! Component model and hierarchy builder (spec.md §3, §4.7).
//!
//! A [`Model`] is the final product of a pipeline run: every classified
//! [`Component`], keyed by id and indexed by type, plus the directed
//! [`Relationship`] edges between them. The hierarchy builder in this
//! module is what produces the `contains` forest and auxiliary edges
//! (`aligns_h`, `aligns_v`, `labels`) from a flat set of matched
//! components (spec.md §4.7).

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::grid::spatial_index::{BBox, SpatialIndex};
use crate::pattern::PropertyValue;

/// The closed vocabulary of relationship labels (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipLabel {
    Contains,
    Labels,
    Controls,
    AlignsH,
    AlignsV,
    SiblingInGroup,
}

/// A directed, labeled edge between two components, by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub source: u64,
    pub label: RelationshipLabel,
    pub target: u64,
}

/// A classified candidate (spec.md §3). Mutable only through [`Model`]'s
/// API once inserted.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u64,
    /// The best-matching pattern's type tag, or `"unknown"` if no pattern
    /// met its threshold.
    pub type_tag: String,
    pub properties: HashMap<String, PropertyValue>,
    pub bbox: BBox,
    pub confidence: f64,
    pub boundary_incomplete: bool,
}

impl Component {
    /// Insert `value` under `key`, overwriting any prior value under the
    /// same key (spec.md §3: "property keys within one component are
    /// unique").
    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.insert(key.into(), value);
    }
}

/// The complete output of one pipeline run: components plus relationships
/// (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct Model {
    components: HashMap<u64, Component>,
    by_type: HashMap<String, Vec<u64>>,
    relationships: HashSet<Relationship>,
    /// Insertion order, preserved so iteration matches the deterministic
    /// candidate order the rest of the pipeline relies on (spec.md §5).
    order: Vec<u64>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a component.
    pub fn insert(&mut self, component: Component) {
        let id = component.id;
        if !self.components.contains_key(&id) {
            self.order.push(id);
        }
        self.by_type.entry(component.type_tag.clone()).or_default().push(id);
        self.components.insert(id, component);
    }

    pub fn get(&self, id: u64) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Component> {
        self.components.get_mut(&id)
    }

    /// All components, in insertion order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().filter_map(|id| self.components.get(id))
    }

    /// All components whose type tag is `type_tag`.
    pub fn components_of_type(&self, type_tag: &str) -> impl Iterator<Item = &Component> {
        self.by_type.get(type_tag).into_iter().flatten().filter_map(|id| self.components.get(id))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    /// Add a relationship edge, enforcing the uniqueness invariant (at
    /// most one edge per `(source, label, target)` triple — a no-op if
    /// the edge is already present) and that both endpoints are live
    /// components. A dangling endpoint is reported and the edge dropped.
    pub fn add_relationship(&mut self, rel: Relationship, sink: &mut DiagnosticSink) {
        if !self.components.contains_key(&rel.source) {
            sink.push(Diagnostic::new(
                DiagnosticKind::ModelDanglingEdge,
                format!("relationship source {} is not a live component", rel.source),
            ));
            return;
        }
        if !self.components.contains_key(&rel.target) {
            sink.push(Diagnostic::new(
                DiagnosticKind::ModelDanglingEdge,
                format!("relationship target {} is not a live component", rel.target),
            ));
            return;
        }
        self.relationships.insert(rel);
    }

    /// The `contains` parent of `id`, if any.
    pub fn parent_of(&self, id: u64) -> Option<u64> {
        self.relationships.iter().find(|r| r.label == RelationshipLabel::Contains && r.target == id).map(|r| r.source)
    }

    /// Direct `contains` children of `id`.
    pub fn children_of(&self, id: u64) -> Vec<u64> {
        let mut children: Vec<u64> =
            self.relationships.iter().filter(|r| r.label == RelationshipLabel::Contains && r.source == id).map(|r| r.target).collect();
        children.sort_unstable();
        children
    }

    /// Components with no `contains` parent (spec.md §3: "every
    /// component is reachable from some root").
    pub fn roots(&self) -> Vec<u64> {
        self.order.iter().copied().filter(|&id| self.parent_of(id).is_none()).collect()
    }
}

/// Margin (in cells) the containment check shrinks a candidate container's
/// bbox by before testing strict containment, to avoid false positives
/// from a shared border cell (spec.md §4.7).
const CONTAINMENT_MARGIN: i64 = 1;

/// Maximum row/column midline difference still counted as "aligned"
/// (spec.md §4.7).
const ALIGNMENT_TOLERANCE: i64 = 1;

/// Build the `contains` forest and auxiliary edges over `model`'s current
/// components (spec.md §4.7). `index` must already have every component's
/// bbox registered.
pub fn build_hierarchy(model: &mut Model, index: &SpatialIndex, sink: &mut DiagnosticSink) {
    let mut ordered: Vec<u64> = model.components().map(|c| c.id).collect();
    ordered.sort_by_key(|&id| std::cmp::Reverse(model.get(id).map(|c| c.bbox.area()).unwrap_or(0)));

    let mut has_parent: HashSet<u64> = HashSet::new();
    for &container_id in &ordered {
        let Some(container_bbox) = model.get(container_id).map(|c| c.bbox) else { continue };
        let shrunk = container_bbox.shrink(CONTAINMENT_MARGIN);
        if shrunk.width() <= 0 || shrunk.height() <= 0 {
            continue;
        }
        let mut hits: Vec<u64> = index.query_rect(shrunk).into_iter().collect();
        hits.sort_unstable();
        for hit_id in hits {
            if hit_id == container_id || has_parent.contains(&hit_id) {
                continue;
            }
            let Some(hit_bbox) = model.get(hit_id).map(|c| c.bbox) else { continue };
            if container_bbox.strictly_contains(&hit_bbox) {
                model.add_relationship(
                    Relationship { source: container_id, label: RelationshipLabel::Contains, target: hit_id },
                    sink,
                );
                has_parent.insert(hit_id);
            }
        }
    }

    break_cycles(model, sink);
    build_auxiliary_edges(model, sink);
}

/// Detect and drop any containment cycle, emitting [`DiagnosticKind::ModelCycle`].
/// Spec.md §4.7 notes this "should be impossible given the strict-inside
/// rule, but is checked".
fn break_cycles(model: &mut Model, sink: &mut DiagnosticSink) {
    let ids: Vec<u64> = model.components().map(|c| c.id).collect();
    let mut to_drop = Vec::new();
    for start in &ids {
        let mut seen = HashSet::new();
        let mut current = *start;
        loop {
            if !seen.insert(current) {
                to_drop.push((*start, current));
                break;
            }
            match model.parent_of(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }
    if to_drop.is_empty() {
        return;
    }
    let cycle_ids: Vec<u64> = to_drop.iter().map(|&(_, id)| id).collect();
    sink.push(Diagnostic::new(DiagnosticKind::ModelCycle, format!("containment cycle broken among {cycle_ids:?}")));
    for (start, _) in to_drop {
        if let Some(parent) = model.parent_of(start) {
            model.relationships.retain(|r| {
                !(r.label == RelationshipLabel::Contains && r.source == parent && r.target == start)
            });
        }
    }
}

fn build_auxiliary_edges(model: &mut Model, sink: &mut DiagnosticSink) {
    let ids: Vec<u64> = model.components().map(|c| c.id).collect();
    for &parent in &ids {
        let mut siblings = model.children_of(parent);
        if siblings.is_empty() && model.parent_of(parent).is_none() {
            // Also check root-level siblings (no common container).
            siblings = model.roots();
        }
        detect_alignment(model, &siblings, sink);
        detect_labels(model, &siblings, sink);
    }
}

fn detect_alignment(model: &mut Model, siblings: &[u64], sink: &mut DiagnosticSink) {
    for i in 0..siblings.len() {
        for j in (i + 1)..siblings.len() {
            let (a, b) = (siblings[i], siblings[j]);
            let (Some(bbox_a), Some(bbox_b)) = (model.get(a).map(|c| c.bbox), model.get(b).map(|c| c.bbox)) else {
                continue;
            };
            let mid_a_y = (bbox_a.y1 + bbox_a.y2) / 2;
            let mid_b_y = (bbox_b.y1 + bbox_b.y2) / 2;
            let x_overlap = bbox_a.x1 < bbox_b.x2 && bbox_b.x1 < bbox_a.x2;
            if (mid_a_y - mid_b_y).abs() <= ALIGNMENT_TOLERANCE && x_overlap {
                model.add_relationship(Relationship { source: a, label: RelationshipLabel::AlignsH, target: b }, sink);
            }
            let mid_a_x = (bbox_a.x1 + bbox_a.x2) / 2;
            let mid_b_x = (bbox_b.x1 + bbox_b.x2) / 2;
            let y_overlap = bbox_a.y1 < bbox_b.y2 && bbox_b.y1 < bbox_a.y2;
            if (mid_a_x - mid_b_x).abs() <= ALIGNMENT_TOLERANCE && y_overlap {
                model.add_relationship(Relationship { source: a, label: RelationshipLabel::AlignsV, target: b }, sink);
            }
        }
    }
}

/// A `label` component immediately left of or above a control component it
/// does not enclose gets a `labels` edge to that control (spec.md §4.7).
fn detect_labels(model: &mut Model, siblings: &[u64], sink: &mut DiagnosticSink) {
    const LABEL_GAP: i64 = 2;
    for &a in siblings {
        let Some(label_bbox) = model.get(a).filter(|c| c.type_tag == "label").map(|c| c.bbox) else { continue };
        for &b in siblings {
            if a == b {
                continue;
            }
            let Some(control_bbox) = model.get(b).map(|c| c.bbox) else { continue };
            if label_bbox.strictly_contains(&control_bbox) || control_bbox.strictly_contains(&label_bbox) {
                continue;
            }
            let left_of = label_bbox.x2 <= control_bbox.x1
                && control_bbox.x1 - label_bbox.x2 <= LABEL_GAP
                && label_bbox.y1 < control_bbox.y2
                && control_bbox.y1 < label_bbox.y2;
            let above = label_bbox.y2 <= control_bbox.y1
                && control_bbox.y1 - label_bbox.y2 <= LABEL_GAP
                && label_bbox.x1 < control_bbox.x2
                && control_bbox.x1 < label_bbox.x2;
            if left_of || above {
                model.add_relationship(Relationship { source: a, label: RelationshipLabel::Labels, target: b }, sink);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: u64, bbox: BBox, type_tag: &str) -> Component {
        Component { id, type_tag: type_tag.to_string(), properties: HashMap::new(), bbox, confidence: 1.0, boundary_incomplete: false }
    }

    #[test]
    fn nested_component_becomes_a_child() {
        let mut model = Model::new();
        model.insert(component(1, BBox::new(0, 0, 20, 8), "window"));
        model.insert(component(2, BBox::new(5, 2, 10, 4), "button"));

        let mut index = SpatialIndex::new(4);
        index.insert(1, BBox::new(0, 0, 20, 8));
        index.insert(2, BBox::new(5, 2, 10, 4));

        let mut sink = DiagnosticSink::new();
        build_hierarchy(&mut model, &index, &mut sink);

        assert_eq!(model.parent_of(2), Some(1));
        assert_eq!(model.children_of(1), vec![2]);
        assert!(model.roots().contains(&1));
    }

    #[test]
    fn contains_subgraph_has_no_cycles() {
        let mut model = Model::new();
        model.insert(component(1, BBox::new(0, 0, 30, 30), "window"));
        model.insert(component(2, BBox::new(2, 2, 20, 20), "panel"));
        model.insert(component(3, BBox::new(4, 4, 10, 10), "button"));

        let mut index = SpatialIndex::new(4);
        index.insert(1, BBox::new(0, 0, 30, 30));
        index.insert(2, BBox::new(2, 2, 20, 20));
        index.insert(3, BBox::new(4, 4, 10, 10));

        let mut sink = DiagnosticSink::new();
        build_hierarchy(&mut model, &index, &mut sink);

        assert_eq!(model.parent_of(3), Some(2));
        assert_eq!(model.parent_of(2), Some(1));
        assert_eq!(model.parent_of(1), None);
    }

    #[test]
    fn label_left_of_button_gets_labels_edge() {
        let mut model = Model::new();
        model.insert(component(1, BBox::new(0, 0, 5, 1), "label"));
        model.insert(component(2, BBox::new(6, 0, 14, 1), "button"));

        let index = SpatialIndex::new(4);
        let mut sink = DiagnosticSink::new();
        build_hierarchy(&mut model, &index, &mut sink);

        assert!(model.relationships().any(|r| r.label == RelationshipLabel::Labels && r.source == 1 && r.target == 2));
    }
}
