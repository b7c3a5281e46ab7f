//! First pass over a document: discovers selectable blocks, sets, arrays and
//! time values without touching heavy arrays, and builds the hierarchy graph.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use meshtree_common::{Center, ChildCategory, Document, ItemId, ItemKind};
use petgraph::graph::NodeIndex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::partition::{Partition, PartitionStrategy};
use crate::selection::{Category, SelectionIndex, Selections};
use crate::sil::HierarchyGraph;
use crate::warning::StructuralWarning;

/// Bounds on the hierarchy graph.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexLimits {
    /// Vertices allowed beyond the three fixed ones.
    pub max_vertices: usize,
    /// Depth used for the rebuild after the cap is hit.
    pub degraded_depth: u32,
    /// Depth limit of the first pass; 0 means unlimited.
    pub max_depth: u32,
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self {
            max_vertices: 1000,
            degraded_depth: 4,
            max_depth: 0,
        }
    }
}

/// Everything the first pass learns about a document.
#[derive(Clone, Debug)]
pub struct HierarchyIndex {
    pub selections: Selections,
    pub hierarchy: HierarchyGraph,
    times: Vec<f64>,
    warnings: Vec<StructuralWarning>,
    degraded: bool,
}

impl HierarchyIndex {
    /// Distinct time values, ascending.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn warnings(&self) -> &[StructuralWarning] {
        &self.warnings
    }

    /// True when the vertex cap forced a shallow rebuild.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn selection(&self, category: Category) -> &SelectionIndex {
        self.selections.get(category)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TimeKey(f64);

impl Eq for TimeKey {}

impl PartialOrd for TimeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Clone, Copy, Debug)]
struct Pass {
    max_depth: u32,
    /// Arrays, times and warnings are gathered on the first pass only.
    collect: bool,
}

struct IndexBuilder<'a> {
    doc: &'a mut Document,
    partition: Partition,
    selections: Selections,
    hierarchy: HierarchyGraph,
    times: BTreeSet<TimeKey>,
    warnings: Vec<StructuralWarning>,
    renamed: Vec<(ItemId, String)>,
}

/// Run the first pass. Never fails; problems end up in
/// [`HierarchyIndex::warnings`].
pub fn build_index(doc: &mut Document, partition: Partition, limits: IndexLimits) -> HierarchyIndex {
    let root = doc.root();
    let mut builder = IndexBuilder {
        doc,
        partition,
        selections: Selections::default(),
        hierarchy: HierarchyGraph::new(limits.max_vertices),
        times: BTreeSet::new(),
        warnings: Vec::new(),
        renamed: Vec::new(),
    };
    for skipped in builder.doc.skipped().to_vec() {
        builder.warn(StructuralWarning::UnknownItemKind {
            name: skipped.name,
            kind: skipped.kind,
        });
    }
    builder.inspect(
        root,
        None,
        0,
        Pass {
            max_depth: limits.max_depth,
            collect: true,
        },
    );

    let degraded = builder.hierarchy.is_capped();
    if degraded {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            cap = limits.max_vertices,
            depth = limits.degraded_depth,
            "hierarchy vertex cap reached; rebuilding shallow"
        );
        builder.restore_names();
        builder.selections.blocks.clear();
        builder.selections.sets.clear();
        builder.hierarchy.reset();
        builder.inspect(
            root,
            None,
            0,
            Pass {
                max_depth: limits.degraded_depth,
                collect: false,
            },
        );
    }

    HierarchyIndex {
        selections: builder.selections,
        hierarchy: builder.hierarchy,
        times: builder.times.into_iter().map(|t| t.0).collect(),
        warnings: builder.warnings,
        degraded,
    }
}

fn unique_name(index: &SelectionIndex, name: &str) -> String {
    if !index.contains(name) {
        return name.to_string();
    }
    let mut count = 1usize;
    loop {
        let candidate = format!("{name}[{count}]");
        if !index.contains(&candidate) {
            return candidate;
        }
        count += 1;
    }
}

impl IndexBuilder<'_> {
    fn warn(&mut self, warning: StructuralWarning) {
        #[cfg(feature = "tracing")]
        tracing::warn!(%warning, "structural warning");
        self.warnings.push(warning);
    }

    fn rename(&mut self, id: ItemId, name: String) {
        let previous = &self.doc.item(id).name;
        if *previous != name {
            self.renamed.push((id, previous.clone()));
            self.doc.rename(id, name);
        }
    }

    fn restore_names(&mut self) {
        for (id, name) in self.renamed.drain(..).rev() {
            self.doc.rename(id, name);
        }
    }

    fn inspect(&mut self, id: ItemId, parent: Option<NodeIndex>, depth: u32, pass: Pass) {
        if pass.max_depth != 0 && depth >= pass.max_depth {
            return;
        }
        if pass.collect {
            self.collect_arrays(id);
            self.collect_times(id);
        }

        match &self.doc.item(id).kind {
            ItemKind::Domain(_) | ItemKind::GridCollection { .. } => {
                self.inspect_collection(id, parent, depth, pass)
            }
            ItemKind::UnstructuredGrid(_)
            | ItemKind::RectilinearGrid(_)
            | ItemKind::CurvilinearGrid(_)
            | ItemKind::RegularGrid(_) => self.inspect_grid(id, parent),
            ItemKind::Graph(_) => self.inspect_graph(id, parent),
            kind @ (ItemKind::Attribute(_) | ItemKind::Set(_)) => {
                if pass.collect {
                    let warning = StructuralWarning::UnknownItemKind {
                        name: self.doc.item(id).name.clone(),
                        kind: kind.label().to_string(),
                    };
                    self.warn(warning);
                }
            }
        }
    }

    fn inspect_collection(&mut self, id: ItemId, parent: Option<NodeIndex>, depth: u32, pass: Pass) {
        let item = self.doc.item(id);
        let is_domain = matches!(item.kind, ItemKind::Domain(_));
        let is_temporal = item.kind.is_temporal();
        let children = item.kind.children().cloned().unwrap_or_default();

        let mut vertex = parent;
        if !is_domain && !is_temporal && !item.name.is_empty() && !self.hierarchy.is_capped() {
            let name = item.name.clone();
            let under = parent.unwrap_or(self.hierarchy.hierarchy_root());
            vertex = Some(self.hierarchy.add_child(under, &name));
        }

        let count = children.collections.len();
        for (i, &child) in children.collections.iter().enumerate() {
            if is_domain && !self.partition.owns(PartitionStrategy::RoundRobin, i, count) {
                continue;
            }
            self.inspect(child, vertex, depth + 1, pass);
        }
        for category in ChildCategory::ATOMIC {
            for &child in children.get(category) {
                self.inspect(child, vertex, depth + 1, pass);
            }
        }
    }

    fn inspect_grid(&mut self, id: ItemId, parent: Option<NodeIndex>) {
        if self.hierarchy.is_capped() {
            return;
        }
        let item = self.doc.item(id);
        let sets = item.kind.sets().to_vec();
        if item.name.is_empty() || (sets.is_empty() && parent.is_none()) {
            return;
        }
        self.register_block(id, parent);

        for set in sets {
            let unique = unique_name(&self.selections.sets, &self.doc.item(set).name);
            self.selections.sets.add(&unique);
            self.rename(set, unique);
        }
    }

    fn inspect_graph(&mut self, id: ItemId, parent: Option<NodeIndex>) {
        if self.hierarchy.is_capped() {
            return;
        }
        if self.doc.item(id).name.is_empty() || parent.is_none() {
            return;
        }
        self.register_block(id, parent);
    }

    fn register_block(&mut self, id: ItemId, parent: Option<NodeIndex>) {
        let label = self.doc.item(id).name.clone();
        let unique = unique_name(&self.selections.blocks, &label);
        let under = parent.unwrap_or(self.hierarchy.hierarchy_root());
        self.selections.blocks.add(&unique);
        self.hierarchy.add_named_block(under, &label, &unique);
        self.rename(id, unique);
    }

    fn collect_arrays(&mut self, id: ItemId) {
        let item = self.doc.item(id);
        let is_graph = match item.kind {
            ItemKind::UnstructuredGrid(_)
            | ItemKind::RectilinearGrid(_)
            | ItemKind::CurvilinearGrid(_)
            | ItemKind::RegularGrid(_) => false,
            ItemKind::Graph(_) => true,
            _ => return,
        };
        let owner = item.name.clone();
        let owner_kind = item.kind.label();
        let attributes = item.kind.attributes().to_vec();

        for attribute in attributes {
            let attr_item = self.doc.item(attribute);
            let ItemKind::Attribute(attr) = &attr_item.kind else {
                continue;
            };
            if attr_item.name.is_empty() {
                self.warn(StructuralWarning::UnnamedAttribute {
                    owner: owner.clone(),
                });
                continue;
            }
            let category = match (is_graph, attr.center) {
                (_, Center::Grid) => Some(Category::FieldArrays),
                (false, Center::Cell) | (true, Center::Edge) => Some(Category::CellArrays),
                (_, Center::Node) => Some(Category::PointArrays),
                _ => None,
            };
            let name = attr_item.name.clone();
            match category {
                Some(category) => self.selections.get_mut(category).add(&name),
                None => {
                    let center = attr.center;
                    self.warn(StructuralWarning::UnrecognizedAssociation {
                        attribute: name,
                        center,
                        owner_kind,
                    });
                }
            }
        }
    }

    fn collect_times(&mut self, id: ItemId) {
        let item = self.doc.item(id);
        if !item.kind.is_temporal() {
            return;
        }
        let children: Vec<ItemId> = item
            .kind
            .children()
            .map(|c| c.iter().collect())
            .unwrap_or_default();

        let mut implied = 0u32;
        for child in children {
            let time = match self.doc.item(child).time {
                Some(t) => t,
                None => {
                    let t = f64::from(implied);
                    implied += 1;
                    self.doc.set_time(child, t);
                    t
                }
            };
            self.times.insert(TimeKey(time));
        }
    }
}
