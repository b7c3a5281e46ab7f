//! JSON description format.
//!
//! ```json
//! {
//!   "version": 1,
//!   "domain": {
//!     "collections": [{ "name": "run", "type": "temporal", "grids": [ ... ] }],
//!     "grids": [{
//!       "kind": "regular", "name": "G", "time": 0.5,
//!       "dimensions": [3, 3, 1], "origin": [0, 0, 0], "spacing": [1, 1, 1],
//!       "attributes": [{ "name": "p", "center": "node", "values": { "values": [0, 1] } }],
//!       "sets": [{ "name": "S", "type": "node", "indices": { "values": [0, 4] } }]
//!     }],
//!     "graphs": [{ "name": "net", "nodes": 3,
//!                  "sources": { "values": [0, 1] }, "targets": { "values": [1, 2] } }]
//!   }
//! }
//! ```
//!
//! Arrays are either inline (`"values"`) or raw little-endian `f64` data
//! (`"raw": { "path", "offset", "count" }`) with paths relative to the
//! description file. Dimensions list point counts x-fastest.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use meshtree_common::{
    ArrayRef, Attribute, CellType, Center, CollectionType, CurvilinearGrid, Document,
    DocumentError, Graph, GridParts, Item, ItemId, ItemKind, RectilinearGrid, RegularGrid, Set,
    SetType, Topology, UnstructuredGrid,
};
use serde::Deserialize;

use crate::traits::DocumentParser;

const SUPPORTED_VERSION: u32 = 1;

#[derive(Deserialize, Debug, Default)]
struct JsonFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    domain: JsonContainer,
}

fn default_version() -> u32 {
    1
}

fn default_components() -> usize {
    1
}

#[derive(Deserialize, Debug, Default)]
struct JsonContainer {
    #[serde(default)]
    collections: Vec<JsonCollection>,
    #[serde(default)]
    grids: Vec<JsonGrid>,
    #[serde(default)]
    graphs: Vec<JsonGraph>,
}

#[derive(Deserialize, Debug)]
struct JsonCollection {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    collection_type: CollectionType,
    #[serde(default)]
    time: Option<f64>,
    #[serde(flatten)]
    content: JsonContainer,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum JsonGridKind {
    Unstructured,
    Rectilinear,
    Curvilinear,
    Regular,
}

/// Unrecognized kinds parse too; the grid is then skipped and recorded on the
/// document.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
enum JsonKind {
    Known(JsonGridKind),
    Other(String),
}

#[derive(Deserialize, Debug)]
struct JsonGrid {
    kind: JsonKind,
    #[serde(default)]
    name: String,
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    topology: Option<JsonTopology>,
    #[serde(default)]
    points: Option<JsonArray>,
    #[serde(default)]
    axes: Vec<JsonArray>,
    #[serde(default)]
    dimensions: Vec<usize>,
    #[serde(default)]
    origin: Option<[f64; 3]>,
    #[serde(default)]
    spacing: Option<[f64; 3]>,
    #[serde(default)]
    attributes: Vec<JsonAttribute>,
    #[serde(default)]
    sets: Vec<JsonSet>,
}

#[derive(Deserialize, Debug)]
struct JsonTopology {
    #[serde(rename = "type")]
    cell_type: CellType,
    connectivity: JsonArray,
}

#[derive(Deserialize, Debug)]
struct JsonGraph {
    #[serde(default)]
    name: String,
    #[serde(default)]
    time: Option<f64>,
    nodes: usize,
    sources: JsonArray,
    targets: JsonArray,
    #[serde(default)]
    attributes: Vec<JsonAttribute>,
}

#[derive(Deserialize, Debug)]
struct JsonAttribute {
    #[serde(default)]
    name: String,
    center: Center,
    values: JsonArray,
}

#[derive(Deserialize, Debug)]
struct JsonSet {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    set_type: SetType,
    indices: JsonArray,
    #[serde(default)]
    attributes: Vec<JsonAttribute>,
}

#[derive(Deserialize, Debug)]
struct JsonArray {
    #[serde(default = "default_components")]
    components: usize,
    #[serde(default)]
    values: Option<Vec<f64>>,
    #[serde(default)]
    raw: Option<JsonRaw>,
}

#[derive(Deserialize, Debug)]
struct JsonRaw {
    path: PathBuf,
    #[serde(default)]
    offset: u64,
    count: usize,
}

/// Parser for the JSON description format.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDescription;

impl JsonDescription {
    pub fn new() -> Self {
        Self
    }

    fn build(
        &self,
        file: JsonFile,
        path: Option<&Path>,
        base_dir: Option<&Path>,
    ) -> Result<Document, DocumentError> {
        if file.version > SUPPORTED_VERSION {
            return Err(DocumentError::parse(
                path.map(Path::to_path_buf),
                format!("unsupported description version {}", file.version),
            ));
        }
        let mut builder = Builder {
            doc: Document::new(),
            path: path.map(Path::to_path_buf),
            base_dir,
        };
        let root = builder.doc.root();
        builder.container(root, file.domain)?;
        let mut doc = builder.doc;
        if let Some(path) = path {
            doc.set_source(path);
        }
        Ok(doc)
    }
}

impl DocumentParser for JsonDescription {
    fn read(&self, path: &Path) -> Result<Document, DocumentError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DocumentError::NotFound {
                path: path.to_path_buf(),
            },
            _ => DocumentError::Io(e),
        })?;
        let reader = BufReader::new(file);
        let data: JsonFile = serde_json::from_reader(reader)
            .map_err(|e| DocumentError::parse(Some(path.to_path_buf()), e.to_string()))?;
        self.build(data, Some(path), path.parent())
    }

    fn read_bytes(&self, bytes: &[u8], base_dir: Option<&Path>) -> Result<Document, DocumentError> {
        let data: JsonFile =
            serde_json::from_slice(bytes).map_err(|e| DocumentError::parse(None, e.to_string()))?;
        self.build(data, None, base_dir)
    }
}

struct Builder<'a> {
    doc: Document,
    path: Option<PathBuf>,
    base_dir: Option<&'a Path>,
}

impl Builder<'_> {
    fn malformed(&self, message: impl Into<String>) -> DocumentError {
        DocumentError::parse(self.path.clone(), message)
    }

    fn insert(&mut self, parent: ItemId, item: Item) -> Result<ItemId, DocumentError> {
        self.doc
            .insert(parent, item)
            .map_err(|e| self.malformed(e.to_string()))
    }

    fn container(&mut self, parent: ItemId, content: JsonContainer) -> Result<(), DocumentError> {
        for collection in content.collections {
            let mut item = Item::new(collection.name, ItemKind::collection(collection.collection_type));
            item.time = collection.time;
            let id = self.insert(parent, item)?;
            self.container(id, collection.content)?;
        }
        for grid in content.grids {
            self.grid(parent, grid)?;
        }
        for graph in content.graphs {
            self.graph(parent, graph)?;
        }
        Ok(())
    }

    fn array(&self, array: JsonArray, what: &str) -> Result<ArrayRef, DocumentError> {
        let mut out = match (array.values, array.raw) {
            (Some(values), None) => ArrayRef::inline(array.components, values),
            (None, Some(raw)) => ArrayRef::raw(array.components, raw.path, raw.offset, raw.count),
            (Some(_), Some(_)) => {
                return Err(self.malformed(format!("{what}: give either values or raw, not both")));
            }
            (None, None) => return Err(self.malformed(format!("{what}: missing values or raw"))),
        };
        if let Some(base) = self.base_dir {
            out.resolve_against(base);
        }
        Ok(out)
    }

    fn grid(&mut self, parent: ItemId, grid: JsonGrid) -> Result<(), DocumentError> {
        let label = if grid.name.is_empty() {
            "unnamed grid".to_string()
        } else {
            format!("grid '{}'", grid.name)
        };
        let kind = match grid.kind {
            JsonKind::Known(kind) => kind,
            JsonKind::Other(kind) => {
                self.doc.record_skipped(grid.name, kind);
                return Ok(());
            }
        };
        let parts = GridParts::default();
        let kind = match kind {
            JsonGridKind::Unstructured => {
                let topology = grid
                    .topology
                    .ok_or_else(|| self.malformed(format!("{label}: missing topology")))?;
                let points = grid
                    .points
                    .ok_or_else(|| self.malformed(format!("{label}: missing points")))?;
                ItemKind::UnstructuredGrid(UnstructuredGrid {
                    topology: Topology {
                        cell_type: topology.cell_type,
                        connectivity: self.array(topology.connectivity, &label)?,
                    },
                    points: self.array(points, &label)?,
                    parts,
                })
            }
            JsonGridKind::Rectilinear => {
                if grid.axes.is_empty() || grid.axes.len() > 3 {
                    return Err(self.malformed(format!("{label}: expected 1 to 3 axes")));
                }
                let axes = grid
                    .axes
                    .into_iter()
                    .map(|a| self.array(a, &label))
                    .collect::<Result<Vec<_>, _>>()?;
                ItemKind::RectilinearGrid(RectilinearGrid { axes, parts })
            }
            JsonGridKind::Curvilinear => {
                let dimensions = self.dimensions(&grid.dimensions, &label)?;
                let points = grid
                    .points
                    .ok_or_else(|| self.malformed(format!("{label}: missing points")))?;
                ItemKind::CurvilinearGrid(CurvilinearGrid {
                    dimensions,
                    points: self.array(points, &label)?,
                    parts,
                })
            }
            JsonGridKind::Regular => ItemKind::RegularGrid(RegularGrid {
                dimensions: self.dimensions(&grid.dimensions, &label)?,
                origin: grid.origin.unwrap_or([0.0; 3]),
                spacing: grid.spacing.unwrap_or([1.0; 3]),
                parts,
            }),
        };

        let mut item = Item::new(grid.name, kind);
        item.time = grid.time;
        let id = self.insert(parent, item)?;
        for attribute in grid.attributes {
            self.attribute(id, attribute)?;
        }
        for set in grid.sets {
            let indices = self.array(set.indices, "set indices")?;
            let kind = ItemKind::Set(Set {
                set_type: set.set_type,
                indices,
                attributes: Vec::new(),
            });
            let set_id = self.insert(id, Item::new(set.name, kind))?;
            for attribute in set.attributes {
                self.attribute(set_id, attribute)?;
            }
        }
        Ok(())
    }

    fn dimensions(&self, dims: &[usize], label: &str) -> Result<[usize; 3], DocumentError> {
        if dims.is_empty() || dims.len() > 3 {
            return Err(self.malformed(format!("{label}: expected 1 to 3 dimensions")));
        }
        let mut out = [1; 3];
        out[..dims.len()].copy_from_slice(dims);
        Ok(out)
    }

    fn graph(&mut self, parent: ItemId, graph: JsonGraph) -> Result<(), DocumentError> {
        let kind = ItemKind::Graph(Graph {
            node_count: graph.nodes,
            sources: self.array(graph.sources, "graph sources")?,
            targets: self.array(graph.targets, "graph targets")?,
            attributes: Vec::new(),
        });
        let mut item = Item::new(graph.name, kind);
        item.time = graph.time;
        let id = self.insert(parent, item)?;
        for attribute in graph.attributes {
            self.attribute(id, attribute)?;
        }
        Ok(())
    }

    fn attribute(&mut self, owner: ItemId, attribute: JsonAttribute) -> Result<(), DocumentError> {
        let values = self.array(attribute.values, "attribute values")?;
        let kind = ItemKind::Attribute(Attribute {
            center: attribute.center,
            values,
        });
        self.insert(owner, Item::new(attribute.name, kind))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtree_common::{ArraySource, ChildCategory};

    const SAMPLE: &str = r#"{
        "domain": {
            "collections": [{
                "name": "run", "type": "temporal",
                "grids": [
                    { "kind": "regular", "dimensions": [2, 2], "time": 0.0 },
                    { "kind": "regular", "dimensions": [2, 2], "time": 1.0 }
                ]
            }],
            "grids": [{
                "kind": "rectilinear", "name": "G1",
                "axes": [{ "values": [0, 1, 2] }, { "raw": { "path": "y.bin", "count": 2 } }],
                "attributes": [{ "name": "p", "center": "node", "values": { "values": [0, 0, 0, 0, 0, 0] } }],
                "sets": [{ "name": "S1", "type": "cell", "indices": { "values": [1] } }]
            }],
            "graphs": [{ "name": "net", "nodes": 2,
                         "sources": { "values": [0] }, "targets": { "values": [1] } }]
        }
    }"#;

    #[test]
    fn parses_nested_structure() {
        let doc = JsonDescription::new()
            .read_bytes(SAMPLE.as_bytes(), Some(Path::new("/data")))
            .unwrap();
        let root = doc.root_children();
        assert_eq!(root.collections.len(), 1);
        assert_eq!(root.get(ChildCategory::Rectilinear).len(), 1);
        assert_eq!(root.graphs.len(), 1);

        let run = doc.item(root.collections[0]);
        assert!(run.kind.is_temporal());
        assert_eq!(run.kind.children().unwrap().regular.len(), 2);

        let g1 = doc.item(root.rectilinear[0]);
        assert_eq!(g1.kind.attributes().len(), 1);
        assert_eq!(g1.kind.sets().len(), 1);
        match &g1.kind {
            ItemKind::RectilinearGrid(r) => {
                assert_eq!(r.dimensions(), [3, 2, 1]);
                match &r.axes[1].source {
                    ArraySource::Raw { path, .. } => assert_eq!(path, Path::new("/data/y.bin")),
                    ArraySource::Inline(_) => panic!("expected raw axis"),
                }
            }
            other => panic!("unexpected kind {}", other.label()),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = JsonDescription::new()
            .read(Path::new("/no/such/description.json"))
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound { .. }));
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let err = JsonDescription::new()
            .read_bytes(br#"{ "domain": { "grids": [{ "kind": "regular" }] } }"#, None)
            .unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));

        let err = JsonDescription::new()
            .read_bytes(b"{ not json", None)
            .unwrap_err();
        assert!(matches!(err, DocumentError::Parse { .. }));
    }

    #[test]
    fn reads_from_a_stream() {
        let stream = std::io::Cursor::new(SAMPLE.as_bytes().to_vec());
        let doc = JsonDescription::new()
            .read_from(Box::new(stream), None)
            .unwrap();
        assert_eq!(doc.root_children().len(), 3);
        assert!(doc.source().is_none());
    }

    #[test]
    fn unknown_grid_kind_is_skipped_and_recorded() {
        let doc = JsonDescription::new()
            .read_bytes(
                br#"{ "domain": { "grids": [
                    { "kind": "polyhedral", "name": "odd", "faces": { "values": [0] } },
                    { "kind": "regular", "name": "g", "dimensions": [2, 2] }
                ] } }"#,
                None,
            )
            .unwrap();
        assert_eq!(doc.root_children().len(), 1);
        assert_eq!(doc.item(doc.root_children().regular[0]).name, "g");
        assert_eq!(doc.skipped().len(), 1);
        assert_eq!(doc.skipped()[0].name, "odd");
        assert_eq!(doc.skipped()[0].kind, "polyhedral");
    }

    #[test]
    fn newer_versions_are_rejected() {
        let err = JsonDescription::new()
            .read_bytes(br#"{ "version": 9 }"#, None)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported description version"));
    }
}
