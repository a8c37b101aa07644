use crate::store::SnapshotStore;
use serde::Serialize;

/// Allocation timeline recorded alongside the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Samples {
    /// Milliseconds since the start of recording.
    pub timestamps: Vec<f64>,
    pub last_assigned_ids: Vec<u64>,
    /// Bytes of live JS objects allocated within each sample interval.
    pub size_for_range: Vec<u64>,
}

impl Samples {
    /// Interval a node id was allocated in, if it falls inside the timeline.
    pub fn range_of(&self, node_id: u64) -> Option<usize> {
        let range = self.last_assigned_ids.partition_point(|id| *id < node_id);
        (range < self.last_assigned_ids.len()).then_some(range)
    }
}

pub fn build_samples(store: &SnapshotStore) -> Option<Samples> {
    let layout = store.layout();
    if store.samples.is_empty() {
        return None;
    }
    let (timestamp_offset, last_assigned_id_offset) =
        match (layout.sample_timestamp_offset, layout.sample_last_assigned_id_offset) {
            (Some(t), Some(l)) => (t, l),
            _ => {
                warn!("snapshot has samples but no timestamp_us/last_assigned_id fields");
                return None;
            }
        };
    let stride = layout.sample_fields_count;
    let sample_count = store.samples.len() / stride;
    let mut timestamps = Vec::with_capacity(sample_count);
    let mut last_assigned_ids = Vec::with_capacity(sample_count);
    for sample in store.samples.chunks_exact(stride) {
        timestamps.push(sample[timestamp_offset] as f64 / 1000.0);
        last_assigned_ids.push(sample[last_assigned_id_offset]);
    }
    let mut samples = Samples {
        timestamps,
        last_assigned_ids,
        size_for_range: vec![0; sample_count],
    };

    for ordinal in 0..store.node_count() {
        let node_index = store.node_index(ordinal);
        let id = store.node_id(node_index);
        // JS objects have odd ids.
        if id % 2 == 0 {
            continue;
        }
        match samples.range_of(id as u64) {
            Some(range) => samples.size_for_range[range] += store.node_self_size(node_index) as u64,
            None => debug!("object @{} was allocated after the last sample", id),
        }
    }
    Some(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::SnapshotBuilder;

    #[test]
    fn test_sizes_bucket_by_last_assigned_id() {
        let mut b = SnapshotBuilder::new();
        let a = b.add_node("object", "A", 10);
        let c = b.add_node("object", "C", 20);
        let d = b.add_node("object", "D", 40);
        let native = b.add_node("native", "N", 80);
        let late = b.add_node("object", "Late", 160);
        b.set_id(0, 0);
        b.set_id(a, 3);
        b.set_id(c, 5);
        b.set_id(d, 9);
        b.set_id(native, 4);
        b.set_id(late, 101);
        // (timestamp_us, last_assigned_id)
        b.samples = vec![1000, 4, 2500, 9];
        let store = SnapshotStore::from_document(b.document()).unwrap();
        let samples = build_samples(&store).unwrap();
        assert_eq!(samples.timestamps, vec![1.0, 2.5]);
        assert_eq!(samples.last_assigned_ids, vec![4, 9]);
        // a in the first interval; c and d in the second; native and late skipped
        assert_eq!(samples.size_for_range, vec![10, 60]);
        assert_eq!(samples.range_of(9), Some(1));
        assert_eq!(samples.range_of(10), None);
    }

    #[test]
    fn test_no_samples() {
        let b = SnapshotBuilder::new();
        let store = SnapshotStore::from_document(b.document()).unwrap();
        assert!(build_samples(&store).is_none());
    }
}
