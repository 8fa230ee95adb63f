//! Batch planning
//!
//! Partitions work items into admissible batch requests. Batches are
//! non-empty, bounded by the provider maximum for the kind, preserve input
//! order, and together cover the input exactly once.

use crate::error::{SyncError, SyncResult};
use crate::models::{EntityKind, WorkItem};

/// A single provider batch request
///
/// Construction validates the size against the kind's provider maximum, so
/// an oversized request never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    kind: EntityKind,
    ids: Vec<String>,
}

impl BatchRequest {
    pub fn new(kind: EntityKind, ids: Vec<String>) -> SyncResult<Self> {
        let max = kind.max_batch();
        if ids.len() > max {
            return Err(SyncError::InvalidBatchSize {
                kind: kind.to_string(),
                requested: ids.len(),
                max,
            });
        }
        Ok(Self { kind, ids })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Comma-joined id list for the `ids` query parameter
    pub fn joined_ids(&self) -> String {
        self.ids.join(",")
    }
}

/// Split `items` into consecutive chunks of at most `max_batch_size`
///
/// Produces `ceil(N / M)` batches. Fails with `InvalidBatchSize` when there
/// is work to plan but `max_batch_size` is zero.
pub fn plan<T: Clone>(items: &[T], max_batch_size: usize) -> SyncResult<Vec<Vec<T>>> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    if max_batch_size == 0 {
        return Err(SyncError::InvalidBatchSize {
            kind: "unspecified".to_string(),
            requested: items.len(),
            max: 0,
        });
    }

    Ok(items
        .chunks(max_batch_size)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Plan provider requests for work items of one kind
///
/// `max_batch_size` may be smaller than the provider maximum but never
/// larger.
pub fn plan_requests(
    kind: EntityKind,
    items: &[WorkItem],
    max_batch_size: usize,
) -> SyncResult<Vec<BatchRequest>> {
    if max_batch_size > kind.max_batch() {
        return Err(SyncError::InvalidBatchSize {
            kind: kind.to_string(),
            requested: max_batch_size,
            max: kind.max_batch(),
        });
    }
    if let Some(stray) = items.iter().find(|item| item.kind != kind) {
        return Err(SyncError::UnknownEntityKind(format!(
            "{} item {} in {} batch",
            stray.kind, stray.id, kind
        )));
    }

    plan(items, max_batch_size)?
        .into_iter()
        .map(|chunk| BatchRequest::new(kind, chunk.into_iter().map(|item| item.id).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id{i}")).collect()
    }

    #[test]
    fn test_plan_counts_and_bounds() {
        for (n, m) in [(1, 1), (7, 3), (50, 50), (51, 50), (100, 20), (3, 10)] {
            let items = ids(n);
            let batches = plan(&items, m).unwrap();

            assert_eq!(batches.len(), n.div_ceil(m), "n={n} m={m}");
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= m));
            assert_eq!(batches.concat(), items, "concatenation must equal input");
        }
    }

    #[test]
    fn test_plan_empty_input() {
        let empty: Vec<String> = Vec::new();
        assert!(plan(&empty, 0).unwrap().is_empty());
        assert!(plan(&empty, 10).unwrap().is_empty());
    }

    #[test]
    fn test_plan_zero_max_rejected() {
        let err = plan(&ids(3), 0).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidBatchSize { requested: 3, max: 0, .. }
        ));
    }

    #[test]
    fn test_batch_request_over_provider_max() {
        let err = BatchRequest::new(EntityKind::Album, ids(21)).unwrap_err();
        assert!(matches!(
            err,
            SyncError::InvalidBatchSize { requested: 21, max: 20, ref kind } if kind == "album"
        ));

        let ok = BatchRequest::new(EntityKind::Album, ids(20)).unwrap();
        assert_eq!(ok.len(), 20);
        assert!(ok.joined_ids().starts_with("id0,id1,"));
    }

    #[test]
    fn test_plan_requests_respects_kind_maximum() {
        let items: Vec<WorkItem> = ids(45)
            .into_iter()
            .map(|id| WorkItem::new(EntityKind::Album, id))
            .collect();

        let requests = plan_requests(EntityKind::Album, &items, 20).unwrap();
        let sizes: Vec<usize> = requests.iter().map(BatchRequest::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);

        let err = plan_requests(EntityKind::Album, &items, 50).unwrap_err();
        assert!(matches!(err, SyncError::InvalidBatchSize { max: 20, .. }));
    }

    #[test]
    fn test_plan_requests_rejects_mixed_kinds() {
        let items = vec![
            WorkItem::new(EntityKind::Track, "t1"),
            WorkItem::new(EntityKind::Artist, "a1"),
        ];
        let err = plan_requests(EntityKind::Track, &items, 50).unwrap_err();
        assert!(matches!(err, SyncError::UnknownEntityKind(_)));
    }
}
