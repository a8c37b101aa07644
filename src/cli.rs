use crate::*;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Include engine internals in listings and retained sizes
    #[arg(long, default_value_t = false)]
    pub show_hidden_data: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Args {
    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            show_hidden_data: self.show_hidden_data,
        }
    }
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct RootsArgs {
    #[arg(short, long, default_value_t = false)]
    pub user_roots_only: bool,
}

#[derive(Parser, Debug, Clone, Copy)]
pub struct NodeArgs {
    #[arg(short, long)]
    pub id: u32,
    /// Also list containment edges and retainers
    #[arg(short, long, default_value_t = false)]
    pub edges: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct AggregatesArgs {
    #[arg(long)]
    pub min_node_id: Option<u32>,
    #[arg(long)]
    pub max_node_id: Option<u32>,
    /// Write a Parquet table instead of printing JSON
    #[arg(short, long)]
    pub output_path: Option<String>,
}

impl AggregatesArgs {
    pub fn filter(&self) -> NodeFilter {
        NodeFilter {
            min_node_id: self.min_node_id,
            max_node_id: self.max_node_id,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Size breakdown by category (the default)
    Stats,
    Roots(RootsArgs),
    Node(NodeArgs),
    Aggregates(AggregatesArgs),
}
