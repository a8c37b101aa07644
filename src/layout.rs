use crate::constants::*;
use crate::document::{SnapshotMeta, TypeDescriptor};
use crate::error::{Result, SnapshotError};
use std::collections::HashMap;

lazy_static! {
    /// Class names of node types whose instances are not grouped by name.
    /// Types missing here render as `(<type>)`.
    static ref FIXED_CLASS_NAMES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("hidden", "(system)");
        m.insert("code", "(compiled code)");
        m
    };
}

/// Field offsets and type tags resolved from the snapshot metadata.
///
/// Every accessor on the store is expressed in terms of these values, so
/// the engine works with any field order the producer chooses.
#[derive(Debug, Clone)]
pub struct Layout {
    pub node_field_count: usize,
    pub node_type_offset: usize,
    pub node_name_offset: usize,
    pub node_id_offset: usize,
    pub node_self_size_offset: usize,
    pub node_edge_count_offset: usize,
    pub node_trace_node_id_offset: Option<usize>,

    pub node_types: Vec<String>,
    /// Class name for each node type tag, `None` for types grouped by name.
    pub node_class_names: Vec<Option<String>>,
    pub node_array_type: u32,
    pub node_hidden_type: u32,
    pub node_object_type: u32,
    pub node_native_type: u32,
    pub node_string_type: u32,
    pub node_cons_string_type: u32,
    pub node_sliced_string_type: u32,
    pub node_code_type: u32,
    pub node_synthetic_type: u32,

    pub edge_fields_count: usize,
    pub edge_type_offset: usize,
    pub edge_name_offset: usize,
    pub edge_to_node_offset: usize,

    pub edge_types: Vec<String>,
    pub edge_element_type: u32,
    pub edge_hidden_type: u32,
    pub edge_internal_type: u32,
    pub edge_shortcut_type: u32,
    pub edge_weak_type: u32,
    pub edge_invisible_type: u32,

    pub sample_timestamp_offset: Option<usize>,
    pub sample_last_assigned_id_offset: Option<usize>,
    pub sample_fields_count: usize,
}

fn field_offset(fields: &[String], name: &'static str) -> Result<usize> {
    fields
        .iter()
        .position(|f| f == name)
        .ok_or(SnapshotError::MissingField(name))
}

fn type_table(
    types: &[TypeDescriptor],
    offset: usize,
    what: &'static str,
) -> Result<Vec<String>> {
    match types.get(offset) {
        Some(TypeDescriptor::Enum(names)) => Ok(names.clone()),
        _ => Err(SnapshotError::MissingField(what)),
    }
}

fn type_tag(types: &[String], name: &str) -> u32 {
    types
        .iter()
        .position(|t| t == name)
        .map_or(ABSENT_TYPE, |p| p as u32)
}

impl Layout {
    pub fn from_meta(meta: &SnapshotMeta) -> Result<Layout> {
        let node_fields = &meta.node_fields;
        let node_type_offset = field_offset(node_fields, "type")?;
        let node_types = type_table(&meta.node_types, node_type_offset, "node_types")?;
        let node_class_names = node_types
            .iter()
            .map(|t| match t.as_str() {
                "object" | "native" => None,
                other => Some(
                    FIXED_CLASS_NAMES
                        .get(other)
                        .map_or_else(|| format!("({})", other), |s| s.to_string()),
                ),
            })
            .collect();

        let edge_fields = &meta.edge_fields;
        let edge_type_offset = field_offset(edge_fields, "type")?;
        let mut edge_types = type_table(&meta.edge_types, edge_type_offset, "edge_types")?;
        edge_types.push(INVISIBLE_EDGE_TYPE_NAME.to_string());

        let sample_fields = &meta.sample_fields;

        Ok(Layout {
            node_field_count: node_fields.len(),
            node_type_offset,
            node_name_offset: field_offset(node_fields, "name")?,
            node_id_offset: field_offset(node_fields, "id")?,
            node_self_size_offset: field_offset(node_fields, "self_size")?,
            node_edge_count_offset: field_offset(node_fields, "edge_count")?,
            node_trace_node_id_offset: field_offset(node_fields, "trace_node_id").ok(),

            node_array_type: type_tag(&node_types, "array"),
            node_hidden_type: type_tag(&node_types, "hidden"),
            node_object_type: type_tag(&node_types, "object"),
            node_native_type: type_tag(&node_types, "native"),
            node_string_type: type_tag(&node_types, "string"),
            node_cons_string_type: type_tag(&node_types, "concatenated string"),
            node_sliced_string_type: type_tag(&node_types, "sliced string"),
            node_code_type: type_tag(&node_types, "code"),
            node_synthetic_type: type_tag(&node_types, "synthetic"),
            node_types,
            node_class_names,

            edge_fields_count: edge_fields.len(),
            edge_type_offset,
            edge_name_offset: field_offset(edge_fields, "name_or_index")?,
            edge_to_node_offset: field_offset(edge_fields, "to_node")?,

            edge_element_type: type_tag(&edge_types, "element"),
            edge_hidden_type: type_tag(&edge_types, "hidden"),
            edge_internal_type: type_tag(&edge_types, "internal"),
            edge_shortcut_type: type_tag(&edge_types, "shortcut"),
            edge_weak_type: type_tag(&edge_types, "weak"),
            edge_invisible_type: type_tag(&edge_types, INVISIBLE_EDGE_TYPE_NAME),
            edge_types,

            sample_timestamp_offset: field_offset(sample_fields, "timestamp_us").ok(),
            sample_last_assigned_id_offset: field_offset(sample_fields, "last_assigned_id").ok(),
            sample_fields_count: sample_fields.len(),
        })
    }

    pub fn node_type_name(&self, tag: u32) -> &str {
        self.node_types
            .get(tag as usize)
            .map_or("unknown", |s| s.as_str())
    }

    pub fn edge_type_name(&self, tag: u32) -> &str {
        self.edge_types
            .get(tag as usize)
            .map_or("unknown", |s| s.as_str())
    }
}
