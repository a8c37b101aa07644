#[macro_use]
extern crate log;

use anyhow::{bail, Result};
use clap::Parser;
use heapsnap::*;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn stats(args: &Args) -> Result<()> {
    let worker = AnalysisWorker::spawn()?;
    let responses = args
        .paths
        .iter()
        .map(|path| worker.submit(SnapshotSource::Path(PathBuf::from(path)), args.options()))
        .collect::<Result<Vec<_>>>()?;
    for (path, response) in args.paths.iter().zip(responses) {
        let start = Instant::now();
        let report = response.recv()??;
        info!(
            "Analyzed {} ({} nodes) in {} ms",
            path,
            report.node_count,
            start.elapsed().as_millis()
        );
        print_json(&report)?;
    }
    worker.finish()
}

fn roots(args: &Args, roots_args: RootsArgs) -> Result<()> {
    for path in &args.paths {
        let snapshot = JsHeapSnapshot::from_path(path, args.options())?;
        let mut roots = vec![];
        snapshot.for_each_root(roots_args.user_roots_only, &mut |node| {
            roots.push(node.serialize())
        });
        print_json(&roots)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct NodeDetails {
    node: SerializedNode,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    edges: Vec<SerializedEdge>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    retainers: Vec<SerializedEdge>,
}

fn node(args: &Args, node_args: NodeArgs) -> Result<()> {
    for path in &args.paths {
        let snapshot = JsHeapSnapshot::from_path(path, args.options())?;
        snapshot.analyze()?;
        let Some(node) = snapshot.node_for_id(node_args.id) else {
            bail!("{}: no node with id @{}", path, node_args.id);
        };
        let (edges, retainers) = if node_args.edges {
            (
                snapshot.containment_edges(&node).map(|e| e.serialize()).collect(),
                snapshot.retaining_edges(&node).map(|r| r.serialize()).collect(),
            )
        } else {
            (vec![], vec![])
        };
        print_json(&NodeDetails {
            node: node.serialize(),
            edges,
            retainers,
        })?;
    }
    Ok(())
}

fn aggregates(args: &Args, aggregates_args: &AggregatesArgs) -> Result<()> {
    let filter = aggregates_args.filter();
    if let Some(output_path) = &aggregates_args.output_path {
        return export_aggregates(&args.paths, args.options(), &filter, output_path);
    }
    for path in &args.paths {
        let snapshot = JsHeapSnapshot::from_path(path, args.options())?;
        print_json(&snapshot.aggregates_with_filter(&filter))?;
    }
    Ok(())
}

fn get_git_info() -> String {
    match (built_info::GIT_COMMIT_HASH, built_info::GIT_DIRTY) {
        (Some(hash), Some(dirty)) => format!(
            "{}{}",
            hash.split_at(7).0,
            if dirty { "-dirty" } else { "" }
        ),
        (Some(hash), None) => format!("{}{}", hash.split_at(7).0, "-?"),
        _ => "unknown-git-version".to_string(),
    }
}

pub fn main() -> Result<()> {
    env_logger::init();
    eprintln!("heapsnap {}", get_git_info());
    let args = Args::parse();
    match &args.command {
        None | Some(Commands::Stats) => stats(&args),
        Some(Commands::Roots(roots_args)) => roots(&args, *roots_args),
        Some(Commands::Node(node_args)) => node(&args, *node_args),
        Some(Commands::Aggregates(aggregates_args)) => aggregates(&args, aggregates_args),
    }
}
