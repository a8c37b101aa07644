use harness::{bench, Bencher};
use heapsnap::{AnalysisOptions, JsHeapSnapshot, SnapshotDocument};
use std::sync::Mutex;

static DOCUMENT: Mutex<Option<SnapshotDocument>> = Mutex::new(None);

fn startup() {
    let path = std::env::var("HEAPSNAP_BENCH_SNAPSHOT")
        .unwrap_or("./sampled/bench.heapsnapshot".to_string());
    let document = SnapshotDocument::from_path(&path).unwrap();
    *DOCUMENT.lock().unwrap() = Some(document);
}

fn teardown() {
    let _document = DOCUMENT.lock().unwrap().take().unwrap();
}

#[bench(startup=startup, teardown=teardown)]
fn analyze(b: &Bencher) {
    let guard = DOCUMENT.lock().unwrap();
    let mut document = Some(guard.as_ref().unwrap().clone());
    let mut snapshot = None;
    b.time(|| {
        let s = JsHeapSnapshot::from_document(document.take().unwrap(), AnalysisOptions::default()).unwrap();
        s.analyze().unwrap();
        snapshot = Some(s);
    });
    let snapshot = snapshot.unwrap();
    let statistics = snapshot.get_statistics();
    b.add_stat("nodes", snapshot.node_count() as u64);
    b.add_stat("edges", snapshot.edge_count() as u64);
    b.add_stat("total_size", statistics.total);
    b.add_stat("aggregates", snapshot.aggregates().len() as u64);
}
