use meshtree_common::{ChildCategory, Children, Document, ItemId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Concrete output produced for a document.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputShape {
    Composite,
    Image,
    Rectilinear,
    Curvilinear,
    Unstructured,
    DirectedGraph,
}

impl OutputShape {
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            OutputShape::Image | OutputShape::Rectilinear | OutputShape::Curvilinear
        )
    }
}

/// Index extent of a structured output plus image geometry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WholeExtent {
    pub extent: [i64; 6],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
}

impl Default for WholeExtent {
    fn default() -> Self {
        Self {
            extent: [0, -1, 0, -1, 0, -1],
            origin: [0.0; 3],
            spacing: [1.0; 3],
        }
    }
}

impl WholeExtent {
    /// Extent covering `dims` points per axis.
    pub fn from_dimensions(dims: [usize; 3]) -> Self {
        let mut extent = [0i64; 6];
        for (axis, &n) in dims.iter().enumerate() {
            extent[2 * axis + 1] = n as i64 - 1;
        }
        Self {
            extent,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub shape: OutputShape,
    /// Atomic node whose shape stands for the whole output.
    pub representative: Option<ItemId>,
    /// Filled in for structured atomic outputs.
    pub extent: Option<WholeExtent>,
}

/// Decide the output shape without loading any array.
pub fn classify(doc: &Document) -> Classification {
    let domain = doc.root_children();
    if domain.collections.len() > 1 {
        return composite(None);
    }

    let mut temporal = false;
    let mut to_check: &Children = domain;
    if let [only] = domain.collections.as_slice() {
        let item = doc.item(*only);
        if let Some(children) = item.kind.children()
            && item.kind.is_temporal()
            && children.collections.is_empty()
        {
            temporal = true;
            to_check = children;
        }
    }

    let non_empty: Vec<ChildCategory> = ChildCategory::ATOMIC
        .into_iter()
        .filter(|c| !to_check.get(*c).is_empty())
        .collect();
    let atomic = temporal || (non_empty.len() == 1 && to_check.get(non_empty[0]).len() == 1);
    if !atomic {
        return composite(None);
    }

    // Later kinds override regular grids: rectilinear, curvilinear,
    // unstructured, then graphs.
    let first = |category: ChildCategory| to_check.get(category).first().copied();
    let (shape, representative) = if let Some(id) = first(ChildCategory::Rectilinear) {
        (OutputShape::Rectilinear, Some(id))
    } else if let Some(id) = first(ChildCategory::Curvilinear) {
        (OutputShape::Curvilinear, Some(id))
    } else if let Some(id) = first(ChildCategory::Unstructured) {
        (OutputShape::Unstructured, Some(id))
    } else if !to_check.graphs.is_empty() {
        (OutputShape::DirectedGraph, None)
    } else if let Some(id) = first(ChildCategory::Regular) {
        (OutputShape::Image, Some(id))
    } else {
        return composite(None);
    };

    let has_sets = representative
        .map(|id| !doc.item(id).kind.sets().is_empty())
        .unwrap_or(false);
    if has_sets {
        return composite(representative);
    }
    Classification {
        shape,
        representative,
        extent: None,
    }
}

fn composite(representative: Option<ItemId>) -> Classification {
    Classification {
        shape: OutputShape::Composite,
        representative,
        extent: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtree_common::{
        ArrayRef, CollectionType, GridParts, Item, ItemKind, RectilinearGrid, RegularGrid,
    };

    fn regular(name: &str) -> Item {
        Item::new(
            name,
            ItemKind::RegularGrid(RegularGrid {
                dimensions: [3, 3, 1],
                origin: [0.0; 3],
                spacing: [1.0; 3],
                parts: GridParts::default(),
            }),
        )
    }

    #[test]
    fn single_regular_grid_is_an_image() {
        let mut doc = Document::new();
        let root = doc.root();
        let g = doc.insert(root, regular("g")).unwrap();
        let c = classify(&doc);
        assert_eq!(c.shape, OutputShape::Image);
        assert_eq!(c.representative, Some(g));
    }

    #[test]
    fn temporal_series_classifies_by_its_steps() {
        let mut doc = Document::new();
        let root = doc.root();
        let series = doc
            .insert(root, Item::new("", ItemKind::collection(CollectionType::Temporal)))
            .unwrap();
        let first = doc.insert(series, regular("t0")).unwrap();
        doc.insert(series, regular("t1")).unwrap();
        let c = classify(&doc);
        assert_eq!(c.shape, OutputShape::Image);
        assert_eq!(c.representative, Some(first));
    }

    #[test]
    fn two_grids_make_a_composite() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.insert(root, regular("a")).unwrap();
        doc.insert(root, regular("b")).unwrap();
        assert_eq!(classify(&doc).shape, OutputShape::Composite);
    }

    #[test]
    fn sibling_collection_does_not_block_an_atomic_grid() {
        let mut doc = Document::new();
        let root = doc.root();
        doc.insert(root, Item::new("run", ItemKind::collection(CollectionType::Spatial)))
            .unwrap();
        let g = doc
            .insert(
                root,
                Item::new(
                    "G1",
                    ItemKind::RectilinearGrid(RectilinearGrid {
                        axes: vec![
                            ArrayRef::scalars(vec![0.0, 1.0, 2.0]),
                            ArrayRef::scalars(vec![0.0, 1.0]),
                        ],
                        parts: GridParts::default(),
                    }),
                ),
            )
            .unwrap();
        let c = classify(&doc);
        assert_eq!(c.shape, OutputShape::Rectilinear);
        assert_eq!(c.representative, Some(g));
    }

    #[test]
    fn empty_document_is_composite() {
        assert_eq!(classify(&Document::new()).shape, OutputShape::Composite);
    }

    #[test]
    fn whole_extent_defaults_to_empty() {
        let e = WholeExtent::default();
        assert_eq!(e.extent, [0, -1, 0, -1, 0, -1]);
        assert_eq!(WholeExtent::from_dimensions([4, 3, 1]).extent, [0, 3, 0, 2, 0, 0]);
    }
}
