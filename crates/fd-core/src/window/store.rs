use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::Transaction;

use super::evictor::EvictReport;

// ---------------------------------------------------------------------------
// KeyedWindow
// ---------------------------------------------------------------------------

/// Event-time ordered buckets for a single partition key.
///
/// Each bucket holds the distinct transactions sharing one event time. A
/// bucket only exists while it holds at least one transaction.
#[derive(Debug, Default)]
pub struct KeyedWindow {
    buckets: BTreeMap<i64, HashSet<Transaction>>,
}

impl KeyedWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `txn` into the bucket for `event_time`. Returns `false` if the
    /// bucket already held an equal transaction.
    pub fn add(&mut self, event_time: i64, txn: Transaction) -> bool {
        self.buckets.entry(event_time).or_default().insert(txn)
    }

    /// Bucket keys in `[low, high]`, ascending.
    pub fn keys_in_range(&self, low: i64, high: i64) -> impl Iterator<Item = i64> {
        self.range(low, high).map(|(k, _)| *k)
    }

    /// Buckets in `[low, high]`, ascending. Empty when `low > high`.
    pub fn range(&self, low: i64, high: i64) -> impl Iterator<Item = (&i64, &HashSet<Transaction>)> {
        let bounds = if low <= high { Some(low..=high) } else { None };
        bounds.into_iter().flat_map(|r| self.buckets.range(r))
    }

    pub fn get(&self, bucket: i64) -> Option<&HashSet<Transaction>> {
        self.buckets.get(&bucket)
    }

    pub fn remove_bucket(&mut self, bucket: i64) -> Option<HashSet<Transaction>> {
        self.buckets.remove(&bucket)
    }

    pub fn clear(&mut self) -> EvictReport {
        let report = EvictReport {
            buckets_evicted: self.buckets.len(),
            transactions_evicted: self.transaction_count(),
        };
        self.buckets.clear();
        report
    }

    /// Drop every bucket whose key is strictly below `threshold`.
    pub fn evict_before(&mut self, threshold: i64) -> EvictReport {
        let kept = self.buckets.split_off(&threshold);
        let evicted = std::mem::replace(&mut self.buckets, kept);
        EvictReport {
            buckets_evicted: evicted.len(),
            transactions_evicted: evicted.values().map(HashSet::len).sum(),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn oldest_bucket(&self) -> Option<i64> {
        self.buckets.keys().next().copied()
    }
}

// ---------------------------------------------------------------------------
// WindowStore
// ---------------------------------------------------------------------------

/// All keyed windows owned by one partition.
#[derive(Debug, Default)]
pub struct WindowStore {
    windows: HashMap<String, KeyedWindow>,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self, key: &str) -> Option<&KeyedWindow> {
        self.windows.get(key)
    }

    pub fn window_mut(&mut self, key: &str) -> &mut KeyedWindow {
        self.windows.entry(key.to_string()).or_default()
    }

    /// Evict buckets below `threshold` for `key`, dropping the window once it
    /// is empty.
    pub fn evict_before(&mut self, key: &str, threshold: i64) -> EvictReport {
        let Some(window) = self.windows.get_mut(key) else {
            return EvictReport::default();
        };
        let report = window.evict_before(threshold);
        if window.is_empty() {
            self.windows.remove(key);
        }
        report
    }

    /// Discard all state for `key`.
    pub fn clear_key(&mut self, key: &str) -> EvictReport {
        self.windows
            .remove(key)
            .map(|mut w| w.clear())
            .unwrap_or_default()
    }

    /// Discard all state for every key.
    pub fn clear_all(&mut self) -> EvictReport {
        let mut report = EvictReport::default();
        for (_, mut window) in self.windows.drain() {
            report += window.clear();
        }
        report
    }

    pub fn key_count(&self) -> usize {
        self.windows.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.windows.values().map(KeyedWindow::transaction_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Money, PaymentType};

    fn txn(id: u64, event_time: i64) -> Transaction {
        Transaction {
            transaction_id: id,
            event_time,
            payee_id: 1,
            beneficiary_id: 2,
            payment_amount: Money::from_minor_units(100),
            payment_type: PaymentType::Card,
            ingestion_timestamp: event_time,
        }
    }

    #[test]
    fn add_groups_by_event_time_and_dedups() {
        let mut w = KeyedWindow::new();
        assert!(w.add(1000, txn(1, 1000)));
        assert!(w.add(1000, txn(2, 1000)));
        assert!(!w.add(1000, txn(1, 1000)));
        assert_eq!(w.bucket_count(), 1);
        assert_eq!(w.get(1000).unwrap().len(), 2);
    }

    #[test]
    fn range_is_inclusive_and_guards_inverted_bounds() {
        let mut w = KeyedWindow::new();
        for t in [1000, 2000, 3000, 4000] {
            w.add(t, txn(t as u64, t));
        }
        let keys: Vec<i64> = w.keys_in_range(2000, 3000).collect();
        assert_eq!(keys, vec![2000, 3000]);
        assert_eq!(w.keys_in_range(3000, 2000).count(), 0);
    }

    #[test]
    fn evict_before_is_strict() {
        let mut w = KeyedWindow::new();
        for t in [1000, 2000, 3000] {
            w.add(t, txn(t as u64, t));
        }
        let report = w.evict_before(2000);
        assert_eq!(report.buckets_evicted, 1);
        assert_eq!(report.transactions_evicted, 1);
        assert_eq!(w.oldest_bucket(), Some(2000));
    }

    #[test]
    fn remove_bucket_drops_single_key() {
        let mut w = KeyedWindow::new();
        w.add(1000, txn(1, 1000));
        w.add(2000, txn(2, 2000));
        assert_eq!(w.remove_bucket(1000).unwrap().len(), 1);
        assert!(w.remove_bucket(1000).is_none());
        assert_eq!(w.bucket_count(), 1);
    }

    #[test]
    fn store_prunes_empty_windows() {
        let mut store = WindowStore::new();
        store.window_mut("A").add(1000, txn(1, 1000));
        store.window_mut("B").add(5000, txn(2, 5000));

        store.evict_before("A", 2000);
        assert!(store.window("A").is_none());
        assert_eq!(store.key_count(), 1);

        let report = store.clear_all();
        assert_eq!(report.transactions_evicted, 1);
        assert_eq!(store.key_count(), 0);
    }
}
