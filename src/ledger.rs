//! Fixed-bucket table of live heap blocks, keyed by block address.
//!
//! Buckets are picked with `address % bucket_count` and never resized. Records
//! inside a bucket are unordered; removal swaps the last record into the gap.

/// Number of buckets used when nothing else is configured. Must stay prime.
pub const DEFAULT_BUCKETS: usize = 101;

/// One live heap block known to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRecord {
    /// Address returned to the caller.
    pub address: usize,
    /// Bytes currently attributed to `address`.
    pub size: usize,
}

#[cfg(debug_assertions)]
pub struct BlockTable {
    buckets: Vec<Vec<BlockRecord>>,
    len: usize,
}

#[cfg(debug_assertions)]
impl BlockTable {
    #[cfg(test)]
    pub fn new() -> BlockTable {
        BlockTable::with_buckets(DEFAULT_BUCKETS)
    }

    pub fn with_buckets(bucket_count: usize) -> BlockTable {
        let bucket_count = if bucket_count == 0 { DEFAULT_BUCKETS } else { bucket_count };
        BlockTable {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    #[inline(always)]
    fn bucket_index(&self, address: usize) -> usize {
        address % self.buckets.len()
    }

    #[cfg(test)]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records `size` bytes at `address`.
    ///
    /// There is at most one record per address: if one already exists its size is replaced
    /// and the previous size is returned.
    pub fn insert(&mut self, address: usize, size: usize) -> Option<usize> {
        if let Some(existing) = self.get_mut(address) {
            return Some(std::mem::replace(existing, size));
        }
        let index = self.bucket_index(address);
        self.buckets[index].push(BlockRecord { address, size });
        self.len += 1;
        None
    }

    pub fn get(&self, address: usize) -> Option<usize> {
        self.buckets[self.bucket_index(address)]
            .iter()
            .find(|record| record.address == address)
            .map(|record| record.size)
    }

    pub fn get_mut(&mut self, address: usize) -> Option<&mut usize> {
        let index = self.bucket_index(address);
        self.buckets[index]
            .iter_mut()
            .find(|record| record.address == address)
            .map(|record| &mut record.size)
    }

    /// Drops the record for `address` and returns its size.
    pub fn remove(&mut self, address: usize) -> Option<usize> {
        let index = self.bucket_index(address);
        let bucket = &mut self.buckets[index];
        let position = bucket.iter().position(|record| record.address == address)?;
        self.len -= 1;
        Some(bucket.swap_remove(position).size)
    }

    pub fn iter(&self) -> impl Iterator<Item=&BlockRecord> {
        self.buckets.iter().flat_map(|bucket| bucket.iter())
    }

    /// Sum of all recorded sizes, used to cross-check the running total.
    pub fn total(&self) -> usize {
        self.iter().map(|record| record.size).sum()
    }
}

#[cfg(all(test, debug_assertions))]
mod ledger_tests {
    use super::{BlockTable, BlockRecord, DEFAULT_BUCKETS};

    #[test]
    fn insert_get_remove() {
        let mut table = BlockTable::new();
        assert!(table.is_empty());
        assert_eq!(None, table.insert(0x1000, 64));
        assert_eq!(None, table.insert(0x2000, 16));
        assert_eq!(2, table.len());
        assert_eq!(Some(64), table.get(0x1000));
        assert_eq!(Some(16), table.get(0x2000));
        assert_eq!(None, table.get(0x3000));

        assert_eq!(Some(64), table.remove(0x1000));
        assert_eq!(None, table.remove(0x1000));
        assert_eq!(1, table.len());
        assert_eq!(16, table.total());
    }

    #[test]
    fn insert_existing_address_replaces_size() {
        let mut table = BlockTable::new();
        table.insert(0x40, 8);
        assert_eq!(Some(8), table.insert(0x40, 24));
        assert_eq!(1, table.len());
        assert_eq!(Some(24), table.get(0x40));
    }

    #[test]
    fn colliding_addresses_are_chained() {
        let mut table = BlockTable::new();
        let addresses: Vec<usize> = (1..=5).map(|i| 7 + i * DEFAULT_BUCKETS).collect();
        for (i, address) in addresses.iter().enumerate() {
            table.insert(*address, i + 1);
        }
        for (i, address) in addresses.iter().enumerate() {
            assert_eq!(Some(i + 1), table.get(*address), "at address {}", address);
        }

        assert_eq!(Some(3), table.remove(addresses[2]));
        assert_eq!(None, table.get(addresses[2]));
        assert_eq!(Some(5), table.get(addresses[4]));
        assert_eq!(4, table.len());
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut table = BlockTable::with_buckets(3);
        table.insert(10, 100);
        *table.get_mut(10).unwrap() = 40;
        assert_eq!(40, table.total());
        assert_eq!(vec![BlockRecord { address: 10, size: 40 }], table.iter().copied().collect::<Vec<_>>());
    }

    #[test]
    fn zero_buckets_falls_back_to_default() {
        let table = BlockTable::with_buckets(0);
        assert_eq!(DEFAULT_BUCKETS, table.bucket_count());
    }
}
