use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One entry of `node_types`/`edge_types`: either an enum table of type
/// names or the scalar kind of a non-enum field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    Enum(Vec<String>),
    Scalar(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotMeta {
    pub node_fields: Vec<String>,
    pub node_types: Vec<TypeDescriptor>,
    pub edge_fields: Vec<String>,
    pub edge_types: Vec<TypeDescriptor>,
    #[serde(default)]
    pub sample_fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotHeader {
    #[serde(default)]
    pub title: String,
    pub meta: SnapshotMeta,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(default)]
    pub trace_function_count: usize,
    #[serde(default)]
    pub root_index: Option<usize>,
}

/// The serialized heap snapshot as produced by the runtime.
///
/// Fields the engine has no use for (allocation trace trees, locations)
/// are ignored during deserialization.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotDocument {
    pub snapshot: SnapshotHeader,
    pub nodes: Vec<u32>,
    pub edges: Vec<u32>,
    pub strings: Vec<String>,
    #[serde(default)]
    pub samples: Vec<u64>,
}

impl SnapshotDocument {
    /// Read a snapshot from disk. Files ending in `.zst` are decompressed
    /// on the fly.
    pub fn from_path(p: impl AsRef<Path>) -> Result<SnapshotDocument> {
        let path = p.as_ref();
        let file = File::open(path)?;
        let compressed = path.extension().map_or(false, |ext| ext == "zst");
        if compressed {
            Self::from_reader(zstd::Decoder::new(file)?)
        } else {
            Self::from_reader(BufReader::new(file))
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<SnapshotDocument> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<SnapshotDocument> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "snapshot": {
            "meta": {
                "node_fields": ["type", "name", "id", "self_size", "edge_count", "trace_node_id"],
                "node_types": [["hidden", "object", "synthetic"], "string", "number", "number", "number", "number"],
                "edge_fields": ["type", "name_or_index", "to_node"],
                "edge_types": [["element", "property", "weak"], "string_or_number", "node"]
            },
            "node_count": 2,
            "edge_count": 1,
            "trace_function_count": 0,
            "extra_header_field": true
        },
        "nodes": [2, 0, 1, 0, 1, 0, 1, 1, 3, 16, 0, 0],
        "edges": [1, 2, 6],
        "strings": ["", "Foo", "bar"],
        "trace_tree": []
    }"#;

    #[test]
    fn test_parse_document() {
        let doc = SnapshotDocument::from_slice(MINIMAL.as_bytes()).unwrap();
        assert_eq!(doc.snapshot.node_count, 2);
        assert_eq!(doc.snapshot.root_index, None);
        assert_eq!(doc.nodes.len(), 12);
        assert_eq!(doc.strings[1], "Foo");
        assert!(doc.samples.is_empty());
        match &doc.snapshot.meta.node_types[0] {
            TypeDescriptor::Enum(names) => assert_eq!(names[2], "synthetic"),
            TypeDescriptor::Scalar(_) => panic!("type table should be an enum"),
        }
        assert_eq!(
            doc.snapshot.meta.node_types[1],
            TypeDescriptor::Scalar("string".to_string())
        );
    }

    #[test]
    fn test_from_path_plain_and_zstd() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("a.heapsnapshot");
        std::fs::write(&plain, MINIMAL).unwrap();
        let doc = SnapshotDocument::from_path(&plain).unwrap();
        assert_eq!(doc.edges, vec![1, 2, 6]);

        let compressed = dir.path().join("a.heapsnapshot.zst");
        let mut encoder = zstd::Encoder::new(std::fs::File::create(&compressed).unwrap(), 3)
            .unwrap()
            .auto_finish();
        encoder.write_all(MINIMAL.as_bytes()).unwrap();
        drop(encoder);
        let doc = SnapshotDocument::from_path(&compressed).unwrap();
        assert_eq!(doc.strings, vec!["", "Foo", "bar"]);
    }

    #[test]
    fn test_malformed_json() {
        assert!(SnapshotDocument::from_slice(b"{\"snapshot\": 1}").is_err());
    }
}
