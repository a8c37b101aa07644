use crate::aggregates::{Aggregate, NodeFilter};
use crate::snapshot::{AnalysisOptions, JsHeapSnapshot};
use anyhow::Result;
use polars::functions::concat_df_diagonal;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// One row per class: instance count, min distance, self and retained size.
pub fn aggregates_frame(aggregates: &BTreeMap<String, Aggregate>) -> Result<DataFrame> {
    let mut class_names = Vec::with_capacity(aggregates.len());
    let mut types = Vec::with_capacity(aggregates.len());
    let mut counts = Vec::with_capacity(aggregates.len());
    let mut distances = Vec::with_capacity(aggregates.len());
    let mut self_sizes = Vec::with_capacity(aggregates.len());
    let mut retained_sizes = Vec::with_capacity(aggregates.len());
    for (class_name, aggregate) in aggregates {
        class_names.push(class_name.as_str());
        types.push(aggregate.node_type.as_str());
        counts.push(aggregate.count);
        distances.push(aggregate.distance);
        self_sizes.push(aggregate.self_size);
        retained_sizes.push(aggregate.max_ret);
    }
    let df = df! {
        "class_name" => class_names,
        "type" => types,
        "count" => counts,
        "distance" => distances,
        "self_size" => self_sizes,
        "retained_size" => retained_sizes
    }?;
    Ok(df)
}

/// Write the class aggregates of every snapshot into one Parquet file,
/// tagging each row with the snapshot it came from.
pub fn export_aggregates(
    paths: &[String],
    options: AnalysisOptions,
    filter: &NodeFilter,
    output_path: impl AsRef<Path>,
) -> Result<()> {
    let mut dfs = vec![];
    for path in paths {
        let snapshot = JsHeapSnapshot::from_path(path, options)?;
        let mut df = aggregates_frame(&snapshot.aggregates_with_filter(filter))?;
        let snapshot_series = Series::new("snapshot", vec![path.as_str(); df.height()]);
        df.with_column(snapshot_series)?;
        info!("{}: {} classes", path, df.height());
        dfs.push(df);
    }
    let mut df = concat_df_diagonal(&dfs)?;
    df.as_single_chunk_par();
    let file = File::create(output_path.as_ref())?;
    let writer = ParquetWriter::new(file);
    writer.finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_gc_roots;

    #[test]
    fn test_export_round_trips_through_parquet() {
        let (mut b, _, window) = with_gc_roots();
        let node = b.add_node("object", "Node", 20);
        b.add_edge(window, "property", "n", node);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.heapsnapshot");
        std::fs::write(&input, serde_json::to_vec(&b.document()).unwrap()).unwrap();
        let output = dir.path().join("aggregates.parquet");

        let paths = vec![input.to_string_lossy().to_string()];
        export_aggregates(
            &paths,
            AnalysisOptions::default(),
            &NodeFilter::default(),
            &output,
        )
        .unwrap();

        let df = ParquetReader::new(File::open(&output).unwrap()).finish().unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df
            .column("class_name")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(names, vec!["Node", "Window"]);
        assert!(df.column("snapshot").is_ok());
    }
}
