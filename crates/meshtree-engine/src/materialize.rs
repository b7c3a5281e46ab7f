//! Second pass: builds the composite output for one selection, timestep and
//! partition.

use meshtree_common::{ChildCategory, Document, DocumentError, ItemId, ItemKind};
use meshtree_io::ArrayKeeper;

use crate::convert::Converter;
use crate::dataset::{Composite, CompositeKind, DataObject};
use crate::partition::{Partition, PartitionStrategy};
use crate::selection::Selections;

#[derive(Clone, Copy, Debug)]
pub struct MaterializeRequest<'a> {
    pub selections: &'a Selections,
    pub partition: Partition,
    /// Time to match; `None` disables time filtering.
    pub time: Option<f64>,
    pub as_time_series: bool,
}

impl MaterializeRequest<'_> {
    /// Strategy used for atomic siblings in non-temporal collections.
    pub fn strategy(&self) -> PartitionStrategy {
        if self.as_time_series {
            PartitionStrategy::RoundRobin
        } else {
            PartitionStrategy::Contiguous
        }
    }
}

/// Materialize the subtree rooted at `node`. `None` means nothing there
/// matched the request.
pub fn materialize<C: Converter + ?Sized>(
    doc: &Document,
    node: ItemId,
    request: &MaterializeRequest<'_>,
    converter: &C,
    keeper: &mut dyn ArrayKeeper,
) -> Result<Option<DataObject>, DocumentError> {
    let mut walker = Materializer {
        doc,
        request,
        converter,
        keeper,
    };
    walker.visit(node, request.time)
}

struct Materializer<'a, 'r, C: ?Sized> {
    doc: &'a Document,
    request: &'a MaterializeRequest<'r>,
    converter: &'a C,
    keeper: &'a mut dyn ArrayKeeper,
}

impl<C: Converter + ?Sized> Materializer<'_, '_, C> {
    fn visit(&mut self, id: ItemId, time: Option<f64>) -> Result<Option<DataObject>, DocumentError> {
        match &self.doc.item(id).kind {
            ItemKind::Domain(_) | ItemKind::GridCollection { .. } => self.visit_collection(id, time),
            ItemKind::UnstructuredGrid(_)
            | ItemKind::RectilinearGrid(_)
            | ItemKind::CurvilinearGrid(_)
            | ItemKind::RegularGrid(_) => self.visit_grid(id, time),
            ItemKind::Graph(_) => self.visit_graph(id, time),
            ItemKind::Attribute(_) | ItemKind::Set(_) => Ok(None),
        }
    }

    fn selected(&self, id: ItemId, time: Option<f64>) -> bool {
        let item = self.doc.item(id);
        let time_ok = match time {
            None => true,
            Some(target) => item.time == Some(target),
        };
        time_ok && self.request.selections.blocks.admits(&item.name)
    }

    fn visit_collection(
        &mut self,
        id: ItemId,
        time: Option<f64>,
    ) -> Result<Option<DataObject>, DocumentError> {
        let item = self.doc.item(id);
        let is_domain = matches!(item.kind, ItemKind::Domain(_));
        let is_temporal = item.kind.is_temporal();
        let Some(children) = item.kind.children() else {
            return Ok(None);
        };

        let mut time = time;
        if let Some(target) = time
            && !is_domain
            && !is_temporal
            && let Some(own) = item.time
        {
            if own != target {
                return Ok(None);
            }
            // The whole subtree belongs to the requested step.
            time = None;
        }

        let kind = if !self.request.as_time_series && !is_domain && children.collections.is_empty()
        {
            CompositeKind::MultiPiece
        } else {
            CompositeKind::MultiBlock
        };
        let mut composite = Composite::new(kind);

        for &child in &children.collections {
            if let Some(block) = self.visit(child, time)? {
                composite.push(block);
            }
        }

        let strategy = self.request.strategy();
        for category in ChildCategory::ATOMIC {
            let siblings = children.get(category);
            for (index, &child) in siblings.iter().enumerate() {
                if !is_temporal
                    && !self
                        .request
                        .partition
                        .owns(strategy, index, siblings.len())
                {
                    composite.push_placeholder();
                    continue;
                }
                match self.visit(child, time)? {
                    Some(block) => composite.push(block),
                    // Every rank keeps one slot per atomic sibling.
                    None if !is_temporal => composite.push_placeholder(),
                    None => {}
                }
            }
        }

        if is_temporal && composite.len() == 1 {
            return Ok(composite.into_blocks().pop().flatten());
        }
        Ok(Some(DataObject::Composite(composite)))
    }

    fn visit_grid(&mut self, id: ItemId, time: Option<f64>) -> Result<Option<DataObject>, DocumentError> {
        if !self.selected(id, time) {
            return Ok(None);
        }
        let grid = self
            .converter
            .populate(self.doc, id, self.request.selections, &mut *self.keeper)?;

        let sets = self.doc.item(id).kind.sets();
        if sets.is_empty() {
            return Ok(Some(grid));
        }
        let mut subsets = Vec::new();
        for &set in sets {
            if !self.request.selections.sets.admits(&self.doc.item(set).name) {
                continue;
            }
            subsets.push(
                self.converter
                    .extract_subset(self.doc, set, &grid, &mut *self.keeper)?,
            );
        }

        let mut composite = Composite::new(CompositeKind::MultiBlock);
        composite.push(grid);
        for subset in subsets {
            composite.push(DataObject::Unstructured(subset));
        }
        Ok(Some(DataObject::Composite(composite)))
    }

    fn visit_graph(&mut self, id: ItemId, time: Option<f64>) -> Result<Option<DataObject>, DocumentError> {
        if !self.selected(id, time) {
            return Ok(None);
        }
        let graph = self
            .converter
            .populate(self.doc, id, self.request.selections, &mut *self.keeper)?;
        Ok(Some(graph))
    }
}
