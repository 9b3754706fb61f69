//! Circular diagonal index.
//!
//! One power-of-two array of chain slots is shared by every build sequence.
//! Each sequence owns a contiguous sub-range sized by its length plus a
//! query slack; diagonals (`build - query`) fold into that sub-range modulo
//! its length, so distinct diagonals may share a bucket. Sub-ranges pack
//! back to back and the last one absorbs the padding up to the capacity.
//!
//! A slot holds the most recently linked region of its chain (the tail).
//! `tail.next` is the oldest region (the head); following `next` from the
//! head returns to the tail.

use crate::error::GapError;
use crate::region::{NO_REGION, Region, RegionId};

#[derive(Debug, Clone)]
pub struct GapBuckets {
    slots: Vec<RegionId>,
    mask: usize,
    /// First bucket owned by each sequence
    first: Vec<usize>,
    /// Number of buckets owned by each sequence
    sizes: Vec<usize>,
}

impl GapBuckets {
    /// Index for build sequences of the given lengths, each padded by `slack`
    /// diagonals to leave room for query offsets.
    pub fn new(build_lengths: &[u32], slack: u32) -> Self {
        if build_lengths.is_empty() {
            return GapBuckets {
                slots: vec![NO_REGION; 1],
                mask: 0,
                first: Vec::new(),
                sizes: Vec::new(),
            };
        }

        let mut sizes: Vec<usize> = build_lengths
            .iter()
            .map(|&len| (len as usize + slack as usize).max(1))
            .collect();
        let total: usize = sizes.iter().sum();
        let capacity = total.next_power_of_two();
        if let Some(last) = sizes.last_mut() {
            *last += capacity - total;
        }

        let mut first = Vec::with_capacity(sizes.len());
        let mut offset = 0usize;
        for &size in &sizes {
            first.push(offset);
            offset += size;
        }
        debug_assert_eq!(offset, capacity, "packed ranges must fill the index");

        log::debug!(
            "GapBuckets: {} sequences, {} diagonals, capacity {}",
            sizes.len(),
            total,
            capacity
        );

        GapBuckets {
            slots: vec![NO_REGION; capacity],
            mask: capacity - 1,
            first,
            sizes,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn num_sequences(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn first_bucket(&self, seq_id: u32) -> usize {
        self.first[seq_id as usize]
    }

    #[inline]
    pub fn last_bucket(&self, seq_id: u32) -> usize {
        self.first[seq_id as usize] + self.sizes[seq_id as usize] - 1
    }

    /// Bucket of the diagonal through `(build_pos, query_pos)`, folded into
    /// the sequence's own range.
    #[inline]
    pub fn bucket(&self, seq_id: u32, build_pos: i64, query_pos: i64) -> usize {
        let size = self.sizes[seq_id as usize] as i64;
        let offset = (build_pos - query_pos).rem_euclid(size) as usize;
        (self.first[seq_id as usize] + offset) & self.mask
    }

    /// Unfolded bucket: may fall outside `[first_bucket, last_bucket]`.
    #[inline]
    pub fn bucket_ex(&self, seq_id: u32, build_pos: i64, query_pos: i64) -> i64 {
        self.first[seq_id as usize] as i64 + (build_pos - query_pos)
    }

    /// Tail of the chain stored at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<RegionId> {
        let id = self.slots[index & self.mask];
        (id != NO_REGION).then_some(id)
    }

    #[inline]
    pub fn set(&mut self, index: usize, tail: Option<RegionId>) {
        self.slots[index & self.mask] = tail.unwrap_or(NO_REGION);
    }

    /// Oldest region in the chain at `bucket`.
    #[inline]
    pub fn head<R: Region>(&self, regions: &[R], bucket: usize) -> Option<RegionId> {
        self.get(bucket).map(|tail| regions[tail].core().next())
    }

    /// Make the initialised region `id` the new tail of its bucket's chain.
    ///
    /// The region's own `next` must already point at the current head (or
    /// at itself for an empty chain).
    pub fn append<R: Region>(&mut self, regions: &mut [R], id: RegionId) {
        let bucket = regions[id].core().bucket();
        if let Some(tail) = self.get(bucket) {
            regions[tail].core_mut().set_next(id);
        }
        self.set(bucket, Some(id));
    }

    /// Remove `expected` from the front of its bucket's chain.
    pub fn unlink_head<R: Region>(
        &mut self,
        regions: &mut [R],
        bucket: usize,
        expected: RegionId,
    ) -> Result<(), GapError> {
        let tail = self.get(bucket).ok_or(GapError::CorruptChain {
            bucket,
            expected,
            found: None,
        })?;
        let head = regions[tail].core().next();
        if head != expected {
            return Err(GapError::CorruptChain {
                bucket,
                expected,
                found: Some(head),
            });
        }
        if head == tail {
            self.set(bucket, None);
        } else {
            let second = regions[head].core().next();
            regions[tail].core_mut().set_next(second);
        }
        Ok(())
    }

    /// Regions in the chain at `bucket`, oldest first.
    pub fn chain<'a, R: Region>(&self, regions: &'a [R], bucket: usize) -> ChainIter<'a, R> {
        match self.get(bucket) {
            Some(tail) => ChainIter {
                regions,
                current: regions[tail].core().next(),
                tail,
                remaining: regions.len(),
            },
            None => ChainIter {
                regions,
                current: NO_REGION,
                tail: NO_REGION,
                remaining: 0,
            },
        }
    }
}

/// Walks one bucket chain from head to tail.
pub struct ChainIter<'a, R> {
    regions: &'a [R],
    current: RegionId,
    tail: RegionId,
    /// Bound on steps so a corrupt chain cannot loop forever
    remaining: usize,
}

impl<'a, R: Region> Iterator for ChainIter<'a, R> {
    type Item = RegionId;

    fn next(&mut self) -> Option<RegionId> {
        if self.remaining == 0 || self.current == NO_REGION {
            return None;
        }
        let id = self.current;
        if id == self.tail {
            self.remaining = 0;
        } else {
            self.remaining -= 1;
            self.current = self.regions[id].core().next();
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::PlainRegion;

    #[test]
    fn test_packing_fills_capacity() {
        let b = GapBuckets::new(&[100, 30, 7], 10);
        // 110 + 40 + 17 = 167 -> 256
        assert_eq!(b.capacity(), 256);
        assert_eq!(b.first_bucket(0), 0);
        assert_eq!(b.last_bucket(0), 109);
        assert_eq!(b.first_bucket(1), 110);
        assert_eq!(b.last_bucket(1), 149);
        assert_eq!(b.first_bucket(2), 150);
        assert_eq!(b.last_bucket(2), 255);
    }

    #[test]
    fn test_empty_index_has_one_slot() {
        let b = GapBuckets::new(&[], 10);
        assert_eq!(b.capacity(), 1);
        assert_eq!(b.num_sequences(), 0);
        assert_eq!(b.get(12345), None);
    }

    #[test]
    fn test_bucket_in_range_and_idempotent() {
        let b = GapBuckets::new(&[100, 30, 7], 10);
        for seq in 0..3u32 {
            for build in (-50i64..300).step_by(7) {
                for query in (0i64..400).step_by(13) {
                    let k = b.bucket(seq, build, query);
                    assert_eq!(k, b.bucket(seq, build, query));
                    assert!(k >= b.first_bucket(seq) && k <= b.last_bucket(seq));
                    let ex = b.bucket_ex(seq, build, query);
                    if ex >= b.first_bucket(seq) as i64 && ex <= b.last_bucket(seq) as i64 {
                        assert_eq!(ex as usize, k);
                    }
                }
            }
        }
    }

    #[test]
    fn test_same_diagonal_same_bucket() {
        let b = GapBuckets::new(&[1000], 100);
        assert_eq!(b.bucket(0, 500, 20), b.bucket(0, 510, 30));
        assert_ne!(b.bucket(0, 500, 20), b.bucket(0, 511, 30));
    }

    #[test]
    fn test_get_set_mask() {
        let mut b = GapBuckets::new(&[5], 3);
        assert_eq!(b.capacity(), 8);
        b.set(9, Some(4));
        assert_eq!(b.get(1), Some(4));
        b.set(1, None);
        assert_eq!(b.get(9), None);
    }

    fn linked(b: &mut GapBuckets, regions: &mut Vec<PlainRegion>, build: i64, query: i64) -> RegionId {
        let id = regions.len();
        regions.push(PlainRegion::empty(id));
        let bucket = b.bucket(0, build + 3, query + 3);
        let next = b.head(regions, bucket).unwrap_or(id);
        regions[id].initialize(0, build, query, 4, b, next, false).unwrap();
        b.append(regions, id);
        id
    }

    #[test]
    fn test_chain_order_and_unlink() {
        let mut b = GapBuckets::new(&[100], 20);
        let mut regions = Vec::new();
        let r0 = linked(&mut b, &mut regions, 50, 10);
        let r1 = linked(&mut b, &mut regions, 55, 15);
        let r2 = linked(&mut b, &mut regions, 60, 20);
        let bucket = regions[r0].core().bucket();
        assert_eq!(regions[r2].core().bucket(), bucket);

        assert_eq!(b.get(bucket), Some(r2));
        assert_eq!(b.head(&regions, bucket), Some(r0));
        assert_eq!(b.chain(&regions, bucket).collect::<Vec<_>>(), vec![r0, r1, r2]);

        assert!(matches!(
            b.unlink_head(&mut regions, bucket, r1),
            Err(GapError::CorruptChain { found: Some(id), .. }) if id == r0
        ));

        b.unlink_head(&mut regions, bucket, r0).unwrap();
        assert_eq!(b.chain(&regions, bucket).collect::<Vec<_>>(), vec![r1, r2]);
        b.unlink_head(&mut regions, bucket, r1).unwrap();
        assert_eq!(b.chain(&regions, bucket).collect::<Vec<_>>(), vec![r2]);
        b.unlink_head(&mut regions, bucket, r2).unwrap();
        assert_eq!(b.get(bucket), None);
        assert_eq!(b.chain(&regions, bucket).count(), 0);

        assert!(matches!(
            b.unlink_head(&mut regions, bucket, r2),
            Err(GapError::CorruptChain { found: None, .. })
        ));
    }
}
