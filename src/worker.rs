use crate::document::SnapshotDocument;
use crate::samples::Samples;
use crate::snapshot::{AnalysisOptions, JsHeapSnapshot};
use crate::statistics::Statistics;
use crate::variant::SnapshotVariant;
use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use serde::Serialize;
use std::path::PathBuf;
use std::thread::JoinHandle;

pub enum SnapshotSource {
    Path(PathBuf),
    Document(SnapshotDocument),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub user_root_count: usize,
    pub total_size: u64,
    pub statistics: Statistics,
    pub samples: Option<Samples>,
}

impl AnalysisReport {
    pub fn from_snapshot(snapshot: &JsHeapSnapshot) -> Result<AnalysisReport> {
        let statistics = *snapshot.analyze()?;
        let mut user_root_count = 0;
        snapshot.for_each_root(true, &mut |_| user_root_count += 1);
        Ok(AnalysisReport {
            node_count: snapshot.node_count(),
            edge_count: snapshot.edge_count(),
            user_root_count,
            total_size: snapshot.total_size(),
            statistics,
            samples: snapshot.get_samples().cloned(),
        })
    }
}

type Reply = Sender<Result<AnalysisReport>>;

struct Request {
    source: SnapshotSource,
    options: AnalysisOptions,
    reply: Reply,
}

fn analyze(source: SnapshotSource, options: AnalysisOptions) -> Result<AnalysisReport> {
    let snapshot = match source {
        SnapshotSource::Path(path) => JsHeapSnapshot::from_path(&path, options)
            .with_context(|| format!("loading {}", path.display()))?,
        SnapshotSource::Document(doc) => JsHeapSnapshot::from_document(doc, options)?,
    };
    AnalysisReport::from_snapshot(&snapshot)
}

/// Runs snapshot construction and analysis on a dedicated thread.
///
/// Each request gets its own reply channel. Dropping that receiver abandons
/// the request; the worker finishes it and discards the result. Results
/// are only ever sent whole.
pub struct AnalysisWorker {
    requests: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    pub fn spawn() -> Result<AnalysisWorker> {
        let (sender, receiver) = unbounded::<Request>();
        let handle = std::thread::Builder::new()
            .name("heapsnap-analysis".to_string())
            .spawn(move || Self::run(receiver))?;
        Ok(AnalysisWorker {
            requests: Some(sender),
            handle: Some(handle),
        })
    }

    fn run(requests: Receiver<Request>) {
        info!("Analysis worker started");
        while let Ok(request) = requests.recv() {
            let result = analyze(request.source, request.options);
            if request.reply.send(result).is_err() {
                debug!("Analysis result dropped, requester went away");
            }
        }
        info!("Analysis worker exiting");
    }

    pub fn submit(
        &self,
        source: SnapshotSource,
        options: AnalysisOptions,
    ) -> Result<Receiver<Result<AnalysisReport>>> {
        let (reply, response) = bounded(1);
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| anyhow!("analysis worker already finished"))?;
        requests
            .send(Request {
                source,
                options,
                reply,
            })
            .map_err(|_| anyhow!("analysis worker is gone"))?;
        Ok(response)
    }

    /// Wait for queued requests to drain and stop the thread.
    pub fn finish(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("analysis worker panicked"))?;
        }
        Ok(())
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("{}", e);
        }
    }
}
