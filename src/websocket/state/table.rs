//! Table view state.
//!
//! A table is driven by full snapshots from `scanner-pairs` events and by per-row
//! merges fed from the pair streams of visible rows.

use crate::shared::types::PairRow;

/// Materialized rows for one scanner filter.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    rows: Vec<PairRow>,
    total_rows: u64,
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a REST snapshot: the first page of rows plus the query's unpaged
    /// total. This is the only place the total comes from.
    pub fn seed(pairs: Vec<PairRow>, total_rows: u64) -> Self {
        Self {
            rows: pairs,
            total_rows,
        }
    }

    /// Replace the whole row set. Snapshots are authoritative for the visible rows;
    /// rows absent from the snapshot are dropped. Live snapshots carry only the
    /// current page, so the total from the REST query is kept.
    pub fn apply_snapshot(&mut self, pairs: Vec<PairRow>) {
        self.rows = pairs;
    }

    /// Replace the row with a matching pair address. Returns `false` when the row is
    /// no longer in the table (its stream outlived the snapshot that listed it).
    pub fn apply_row(&mut self, row: PairRow) -> bool {
        match self
            .rows
            .iter_mut()
            .find(|r| r.pair_address == row.pair_address)
        {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[PairRow] {
        &self.rows
    }

    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pair: &str, price: &str) -> PairRow {
        PairRow {
            pair_address: pair.to_string(),
            price: price.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_replaces_rows_and_keeps_rest_total() {
        let mut table = TableState::seed(vec![row("a", "1"), row("b", "2")], 57);
        assert_eq!(table.total_rows(), 57);

        table.apply_snapshot(vec![row("c", "3")]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].pair_address, "c");
        // Live snapshots only carry the visible page; the query total stands.
        assert_eq!(table.total_rows(), 57);
    }

    #[test]
    fn test_apply_row_updates_in_place() {
        let mut table = TableState::seed(vec![row("a", "1"), row("b", "2")], 2);

        assert!(table.apply_row(row("b", "9")));
        assert_eq!(table.rows()[1].price, "9");
        assert_eq!(table.rows()[0].price, "1");
    }

    #[test]
    fn test_apply_row_for_evicted_pair_is_rejected() {
        let mut table = TableState::new();
        table.apply_snapshot(vec![row("a", "1")]);
        assert!(!table.apply_row(row("gone", "5")));
        assert_eq!(table.rows().len(), 1);
    }
}
