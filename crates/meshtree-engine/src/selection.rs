use rustc_hash::FxHashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which selection a name belongs to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    FieldArrays,
    CellArrays,
    PointArrays,
    Blocks,
    Sets,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::FieldArrays,
        Category::CellArrays,
        Category::PointArrays,
        Category::Blocks,
        Category::Sets,
    ];
}

/// Ordered name → enabled map. New names start enabled.
#[derive(Clone, Debug, Default)]
pub struct SelectionIndex {
    names: Vec<String>,
    enabled: Vec<bool>,
    lookup: FxHashMap<String, usize>,
}

impl SelectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`; repeated adds keep the original position and state.
    pub fn add(&mut self, name: &str) {
        if self.lookup.contains_key(name) {
            return;
        }
        self.lookup.insert(name.to_string(), self.names.len());
        self.names.push(name.to_string());
        self.enabled.push(true);
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Unknown names read as disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.lookup
            .get(name)
            .map(|&i| self.enabled[i])
            .unwrap_or(false)
    }

    /// No-op for names that were never added.
    pub fn set_enabled(&mut self, name: &str, on: bool) {
        if let Some(&i) = self.lookup.get(name) {
            self.enabled[i] = on;
        }
    }

    pub fn set_all(&mut self, on: bool) {
        self.enabled.iter_mut().for_each(|e| *e = on);
    }

    /// Names outside the index were never offered for selection and pass.
    pub fn admits(&self, name: &str) -> bool {
        self.lookup.get(name).is_none_or(|&i| self.enabled[i])
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.enabled.clear();
        self.lookup.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.enabled.iter().copied())
    }
}

/// The five selection indexes of a discovered document.
#[derive(Clone, Debug, Default)]
pub struct Selections {
    pub fields: SelectionIndex,
    pub cells: SelectionIndex,
    pub points: SelectionIndex,
    pub blocks: SelectionIndex,
    pub sets: SelectionIndex,
}

impl Selections {
    pub fn get(&self, category: Category) -> &SelectionIndex {
        match category {
            Category::FieldArrays => &self.fields,
            Category::CellArrays => &self.cells,
            Category::PointArrays => &self.points,
            Category::Blocks => &self.blocks,
            Category::Sets => &self.sets,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut SelectionIndex {
        match category {
            Category::FieldArrays => &mut self.fields,
            Category::CellArrays => &mut self.cells,
            Category::PointArrays => &mut self.points,
            Category::Blocks => &mut self.blocks,
            Category::Sets => &mut self.sets,
        }
    }
}
