use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::DocumentError;
use crate::item::{Children, Item, ItemKind};

/// Index of an item inside its owning [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u32);

impl ItemId {
    /// Rebuild an id from its raw index, e.g. one stored by an external index.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An item the parser could not represent and left out of the arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedItem {
    pub name: String,
    pub kind: String,
}

/// Arena holding a parsed description. Item 0 is always the domain root.
#[derive(Clone, Debug)]
pub struct Document {
    items: Vec<Item>,
    source: Option<PathBuf>,
    skipped: Vec<SkippedItem>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            items: vec![Item::new("", ItemKind::Domain(Children::default()))],
            source: None,
            skipped: Vec::new(),
        }
    }

    pub fn root(&self) -> ItemId {
        ItemId(0)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, path: impl Into<PathBuf>) {
        self.source = Some(path.into());
    }

    /// Note an item of unrecognized kind that was dropped while parsing.
    pub fn record_skipped(&mut self, name: impl Into<String>, kind: impl Into<String>) {
        self.skipped.push(SkippedItem {
            name: name.into(),
            kind: kind.into(),
        });
    }

    pub fn skipped(&self) -> &[SkippedItem] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_children().is_empty()
    }

    /// Panics when `id` was not issued by this document.
    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.index()]
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (ItemId(i as u32), item))
    }

    pub fn root_children(&self) -> &Children {
        match &self.items[0].kind {
            ItemKind::Domain(children) => children,
            _ => unreachable!("item 0 is always the domain"),
        }
    }

    pub fn children(&self, id: ItemId) -> Option<&Children> {
        self.get(id).and_then(|item| item.kind.children())
    }

    pub fn children_mut(&mut self, id: ItemId) -> Option<&mut Children> {
        self.items
            .get_mut(id.index())
            .and_then(|item| item.kind.children_mut())
    }

    /// Append an item that is not attached to any parent.
    pub fn push_detached(&mut self, item: Item) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(item);
        id
    }

    /// Append `item` under `parent`, placing it by kind: collections, grids and
    /// graphs join the parent's children; attributes join a grid, graph or
    /// set; sets join a grid.
    pub fn insert(&mut self, parent: ItemId, item: Item) -> Result<ItemId, DocumentError> {
        let Some(parent_item) = self.items.get(parent.index()) else {
            return Err(DocumentError::structure(format!("unknown parent {parent}")));
        };
        let parent_label = parent_item.kind.label();
        let child_label = item.kind.label();
        let accepted = match &item.kind {
            ItemKind::Domain(_) => false,
            ItemKind::Attribute(_) => matches!(
                parent_item.kind,
                ItemKind::UnstructuredGrid(_)
                    | ItemKind::RectilinearGrid(_)
                    | ItemKind::CurvilinearGrid(_)
                    | ItemKind::RegularGrid(_)
                    | ItemKind::Graph(_)
                    | ItemKind::Set(_)
            ),
            ItemKind::Set(_) => parent_item.kind.grid_parts().is_some(),
            _ => parent_item.kind.children().is_some(),
        };
        if !accepted {
            return Err(DocumentError::structure(format!(
                "a {child_label} cannot be placed under a {parent_label}"
            )));
        }

        let category = item.kind.child_category();
        let is_attribute = matches!(item.kind, ItemKind::Attribute(_));
        let is_set = matches!(item.kind, ItemKind::Set(_));
        let id = self.push_detached(item);
        let parent_kind = &mut self.items[parent.index()].kind;
        if is_attribute {
            if let Some(attrs) = parent_kind.attributes_mut() {
                attrs.push(id);
            }
        } else if is_set {
            if let Some(sets) = parent_kind.sets_mut() {
                sets.push(id);
            }
        } else if let (Some(category), Some(children)) = (category, parent_kind.children_mut()) {
            children.push(category, id);
        }
        Ok(id)
    }

    /// Write back a disambiguated name.
    pub fn rename(&mut self, id: ItemId, name: impl Into<String>) {
        if let Some(item) = self.items.get_mut(id.index()) {
            item.name = name.into();
        }
    }

    /// Write back an implied time.
    pub fn set_time(&mut self, id: ItemId, time: f64) {
        if let Some(item) = self.items.get_mut(id.index()) {
            item.time = Some(time);
        }
    }

    /// Move the items of `other` below its domain into this arena and append
    /// the children of that domain to the collection or domain `target`.
    pub fn graft(&mut self, other: Document, target: ItemId) -> Result<(), DocumentError> {
        if self.children(target).is_none() {
            return Err(DocumentError::structure(format!(
                "graft target {target} holds no children"
            )));
        }
        // Incoming item i lands at base + i; its domain (i = 0) is dropped.
        let base = self.items.len() as u32 - 1;
        let shift = move |id: ItemId| ItemId(id.0 + base);

        let mut incoming = other.items.into_iter().map(|mut item| {
            item.kind.remap_ids(shift);
            item
        });
        let grafted_root = match incoming.next().map(|root| root.kind) {
            Some(ItemKind::Domain(children)) => children,
            _ => Children::default(),
        };
        self.items.extend(incoming);
        self.skipped.extend(other.skipped);

        if let Some(children) = self.children_mut(target) {
            for category in crate::item::ChildCategory::ORDER {
                children
                    .get_mut(category)
                    .extend_from_slice(grafted_root.get(category));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayRef;
    use crate::item::{
        Attribute, Center, ChildCategory, CollectionType, GridParts, RegularGrid,
    };

    fn regular(name: &str) -> Item {
        Item::new(
            name,
            ItemKind::RegularGrid(RegularGrid {
                dimensions: [2, 2, 1],
                origin: [0.0; 3],
                spacing: [1.0; 3],
                parts: GridParts::default(),
            }),
        )
    }

    #[test]
    fn insert_places_by_kind() {
        let mut doc = Document::new();
        let root = doc.root();
        let c = doc
            .insert(root, Item::new("c", ItemKind::collection(CollectionType::Spatial)))
            .unwrap();
        let g = doc.insert(c, regular("g")).unwrap();
        let a = doc
            .insert(
                g,
                Item::new(
                    "p",
                    ItemKind::Attribute(Attribute {
                        center: Center::Node,
                        values: ArrayRef::scalars(vec![0.0; 4]),
                    }),
                ),
            )
            .unwrap();

        assert_eq!(doc.root_children().collections, vec![c]);
        assert_eq!(doc.children(c).unwrap().get(ChildCategory::Regular), &[g]);
        assert_eq!(doc.item(g).kind.attributes(), &[a]);
    }

    #[test]
    fn insert_rejects_misplaced_items() {
        let mut doc = Document::new();
        let root = doc.root();
        let g = doc.insert(root, regular("g")).unwrap();
        let err = doc.insert(g, regular("inner")).unwrap_err();
        assert!(matches!(err, DocumentError::InvalidStructure(_)));
    }

    #[test]
    fn graft_shifts_ids_and_appends_children() {
        let mut a = Document::new();
        let root = a.root();
        let series = a
            .insert(root, Item::new("", ItemKind::collection(CollectionType::Temporal)))
            .unwrap();

        let mut b = Document::new();
        let broot = b.root();
        b.insert(broot, regular("g0")).unwrap();

        a.graft(b, series).unwrap();
        let children = a.children(series).unwrap();
        assert_eq!(children.regular.len(), 1);
        assert_eq!(a.item(children.regular[0]).name, "g0");
    }

    #[test]
    fn graft_leaves_a_single_domain() {
        let mut a = Document::new();
        let root = a.root();
        let pieces = a
            .insert(root, Item::new("", ItemKind::collection(CollectionType::Spatial)))
            .unwrap();

        for name in ["g0", "g1"] {
            let mut part = Document::new();
            let proot = part.root();
            let g = part.insert(proot, regular(name)).unwrap();
            part.insert(
                g,
                Item::new(
                    "p",
                    ItemKind::Attribute(Attribute {
                        center: Center::Node,
                        values: ArrayRef::scalars(vec![0.0; 4]),
                    }),
                ),
            )
            .unwrap();
            part.record_skipped("odd", "polyhedral");
            a.graft(part, pieces).unwrap();
        }

        let domains = a
            .items()
            .filter(|(_, item)| matches!(item.kind, ItemKind::Domain(_)))
            .count();
        assert_eq!(domains, 1);
        assert_eq!(a.len(), 2 + 2 * 2);

        let grids = &a.children(pieces).unwrap().regular;
        assert_eq!(grids.len(), 2);
        for (&g, name) in grids.iter().zip(["g0", "g1"]) {
            assert_eq!(a.item(g).name, name);
            let attrs = a.item(g).kind.attributes();
            assert_eq!(attrs.len(), 1);
            assert_eq!(a.item(attrs[0]).name, "p");
        }
        assert_eq!(a.skipped().len(), 2);
    }

    #[test]
    fn rename_and_set_time_write_back() {
        let mut doc = Document::new();
        let root = doc.root();
        let g = doc.insert(root, regular("A")).unwrap();
        doc.rename(g, "A[1]");
        doc.set_time(g, 2.0);
        assert_eq!(doc.item(g).name, "A[1]");
        assert_eq!(doc.item(g).time, Some(2.0));
    }
}
