//! Segmented bitmap set over sparse 64-bit node identifiers.
//!
//! Ids are split into a 48-bit segment key and a 16-bit offset. Each
//! populated segment is stored either as a sorted `Vec<u16>` (sparse) or as
//! a 1024-word bitmap (dense). A segment densifies above `ARRAY_LIMIT`
//! entries and goes back to sparse at `SPARSIFY_LIMIT` or fewer. Memory is
//! proportional to the number of populated segments, never to the id range.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::graph::NodeId;

/// Number of offset bits covered by one segment.
const SEGMENT_BITS: u32 = 16;

/// Words in a dense segment bitmap (65536 bits).
const WORDS: usize = 1 << (SEGMENT_BITS - 6);

/// Sparse segments hold at most this many offsets before becoming dense.
const ARRAY_LIMIT: usize = 4096;

/// Dense segments shrink back to sparse at or below this many offsets.
const SPARSIFY_LIMIT: usize = ARRAY_LIMIT / 2;

#[inline]
fn split(id: NodeId) -> (u64, u16) {
    (id >> SEGMENT_BITS, id as u16)
}

#[inline]
fn join(key: u64, low: u16) -> NodeId {
    (key << SEGMENT_BITS) | low as u64
}

#[derive(Clone)]
enum Segment {
    Sparse(Vec<u16>),
    Dense { words: Box<[u64; WORDS]>, len: usize },
}

impl Segment {
    fn len(&self) -> usize {
        match self {
            Segment::Sparse(values) => values.len(),
            Segment::Dense { len, .. } => *len,
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, low: u16) -> bool {
        match self {
            Segment::Sparse(values) => values.binary_search(&low).is_ok(),
            Segment::Dense { words, .. } => {
                words[(low >> 6) as usize] & (1u64 << (low & 63)) != 0
            }
        }
    }

    fn insert(&mut self, low: u16) -> bool {
        match self {
            Segment::Sparse(values) => match values.binary_search(&low) {
                Ok(_) => false,
                Err(pos) => {
                    values.insert(pos, low);
                    if values.len() > ARRAY_LIMIT {
                        self.densify();
                    }
                    true
                }
            },
            Segment::Dense { words, len } => {
                let word = &mut words[(low >> 6) as usize];
                let mask = 1u64 << (low & 63);
                if *word & mask != 0 {
                    return false;
                }
                *word |= mask;
                *len += 1;
                true
            }
        }
    }

    fn remove(&mut self, low: u16) -> bool {
        let removed = match self {
            Segment::Sparse(values) => match values.binary_search(&low) {
                Ok(pos) => {
                    values.remove(pos);
                    true
                }
                Err(_) => false,
            },
            Segment::Dense { words, len } => {
                let word = &mut words[(low >> 6) as usize];
                let mask = 1u64 << (low & 63);
                if *word & mask == 0 {
                    false
                } else {
                    *word &= !mask;
                    *len -= 1;
                    true
                }
            }
        };
        if removed {
            self.normalize();
        }
        removed
    }

    fn union_with(&mut self, other: &Segment) {
        match (&mut *self, other) {
            (Segment::Dense { words, len }, Segment::Dense { words: theirs, .. }) => {
                let mut count = 0usize;
                for (mine, theirs) in words.iter_mut().zip(theirs.iter()) {
                    *mine |= *theirs;
                    count += mine.count_ones() as usize;
                }
                *len = count;
            }
            (Segment::Dense { words, len }, Segment::Sparse(theirs)) => {
                for &low in theirs {
                    let word = &mut words[(low >> 6) as usize];
                    let mask = 1u64 << (low & 63);
                    if *word & mask == 0 {
                        *word |= mask;
                        *len += 1;
                    }
                }
            }
            (Segment::Sparse(mine), Segment::Dense { .. }) => {
                let mut merged = other.clone();
                for &low in mine.iter() {
                    merged.insert(low);
                }
                *self = merged;
            }
            (Segment::Sparse(mine), Segment::Sparse(theirs)) => {
                let mut merged = Vec::with_capacity(mine.len() + theirs.len());
                let (mut i, mut j) = (0, 0);
                while i < mine.len() && j < theirs.len() {
                    let (a, b) = (mine[i], theirs[j]);
                    if a < b {
                        merged.push(a);
                        i += 1;
                    } else if b < a {
                        merged.push(b);
                        j += 1;
                    } else {
                        merged.push(a);
                        i += 1;
                        j += 1;
                    }
                }
                merged.extend_from_slice(&mine[i..]);
                merged.extend_from_slice(&theirs[j..]);
                *mine = merged;
                self.normalize();
            }
        }
    }

    fn difference_with(&mut self, other: &Segment) {
        match (&mut *self, other) {
            (Segment::Dense { words, len }, Segment::Dense { words: theirs, .. }) => {
                let mut count = 0usize;
                for (mine, theirs) in words.iter_mut().zip(theirs.iter()) {
                    *mine &= !*theirs;
                    count += mine.count_ones() as usize;
                }
                *len = count;
            }
            (Segment::Dense { words, len }, Segment::Sparse(theirs)) => {
                for &low in theirs {
                    let word = &mut words[(low >> 6) as usize];
                    let mask = 1u64 << (low & 63);
                    if *word & mask != 0 {
                        *word &= !mask;
                        *len -= 1;
                    }
                }
            }
            (Segment::Sparse(mine), Segment::Dense { .. }) => {
                mine.retain(|&low| !other.contains(low));
            }
            (Segment::Sparse(mine), Segment::Sparse(theirs)) => {
                let mut j = 0;
                mine.retain(|&low| {
                    while j < theirs.len() && theirs[j] < low {
                        j += 1;
                    }
                    !(j < theirs.len() && theirs[j] == low)
                });
            }
        }
        self.normalize();
    }

    /// Re-pick the representation after a bulk change.
    fn normalize(&mut self) {
        match self {
            Segment::Sparse(values) if values.len() > ARRAY_LIMIT => self.densify(),
            Segment::Dense { len, .. } if *len <= SPARSIFY_LIMIT => {
                let values: Vec<u16> = self.iter().collect();
                *self = Segment::Sparse(values);
            }
            _ => {}
        }
    }

    fn densify(&mut self) {
        if let Segment::Sparse(values) = self {
            let mut words = Box::new([0u64; WORDS]);
            for &low in values.iter() {
                words[(low >> 6) as usize] |= 1u64 << (low & 63);
            }
            let len = values.len();
            *self = Segment::Dense { words, len };
        }
    }

    fn iter(&self) -> SegmentIter<'_> {
        match self {
            Segment::Sparse(values) => SegmentIter::Sparse(values.iter()),
            Segment::Dense { words, .. } => SegmentIter::Dense {
                words,
                index: 0,
                current: words[0],
            },
        }
    }

    fn memory_usage(&self) -> usize {
        match self {
            Segment::Sparse(values) => values.capacity() * std::mem::size_of::<u16>(),
            Segment::Dense { .. } => WORDS * std::mem::size_of::<u64>(),
        }
    }
}

enum SegmentIter<'a> {
    Sparse(std::slice::Iter<'a, u16>),
    Dense {
        words: &'a [u64; WORDS],
        index: usize,
        current: u64,
    },
}

impl Iterator for SegmentIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            SegmentIter::Sparse(iter) => iter.next().copied(),
            SegmentIter::Dense {
                words,
                index,
                current,
            } => loop {
                if *current != 0 {
                    let bit = current.trailing_zeros() as usize;
                    *current &= *current - 1;
                    return Some((*index * 64 + bit) as u16);
                }
                *index += 1;
                if *index >= WORDS {
                    return None;
                }
                *current = words[*index];
            },
        }
    }
}

/// A mutable set of node ids, compressed for sparse 64-bit key spaces.
///
/// Not safe for concurrent mutation; share it read-only across threads.
#[derive(Clone, Default)]
pub struct FrontierSet {
    segments: BTreeMap<u64, Segment>,
    len: u64,
}

impl FrontierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`. Returns false if it was already present.
    pub fn add(&mut self, id: NodeId) -> bool {
        let (key, low) = split(id);
        let inserted = self
            .segments
            .entry(key)
            .or_insert_with(|| Segment::Sparse(Vec::new()))
            .insert(low);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Remove `id`. Returns false if it was not present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let (key, low) = split(id);
        let Some(segment) = self.segments.get_mut(&key) else {
            return false;
        };
        let removed = segment.remove(low);
        if removed {
            self.len -= 1;
            if segment.is_empty() {
                self.segments.remove(&key);
            }
        }
        removed
    }

    pub fn contains(&self, id: NodeId) -> bool {
        let (key, low) = split(id);
        self.segments
            .get(&key)
            .map_or(false, |segment| segment.contains(low))
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.len = 0;
    }

    /// `self = self ∪ other`
    pub fn union_with(&mut self, other: &FrontierSet) {
        for (&key, theirs) in &other.segments {
            match self.segments.get_mut(&key) {
                Some(mine) => {
                    let before = mine.len();
                    mine.union_with(theirs);
                    self.len += (mine.len() - before) as u64;
                }
                None => {
                    self.len += theirs.len() as u64;
                    self.segments.insert(key, theirs.clone());
                }
            }
        }
    }

    /// `self = self \ other`
    pub fn difference_with(&mut self, other: &FrontierSet) {
        if self.is_empty() || other.is_empty() {
            return;
        }
        let mut removed = 0u64;
        self.segments.retain(|key, mine| {
            if let Some(theirs) = other.segments.get(key) {
                let before = mine.len();
                mine.difference_with(theirs);
                removed += (before - mine.len()) as u64;
            }
            !mine.is_empty()
        });
        self.len -= removed;
    }

    pub fn cardinality(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate the ids. Order is unspecified.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            segments: self.segments.iter(),
            current: None,
        }
    }

    /// Approximate heap usage in bytes.
    pub fn memory_usage(&self) -> usize {
        let per_entry = std::mem::size_of::<u64>() + std::mem::size_of::<Segment>();
        self.segments
            .values()
            .map(|segment| per_entry + segment.memory_usage())
            .sum()
    }
}

pub struct Iter<'a> {
    segments: btree_map::Iter<'a, u64, Segment>,
    current: Option<(u64, SegmentIter<'a>)>,
}

impl Iterator for Iter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            if let Some((key, iter)) = &mut self.current {
                if let Some(low) = iter.next() {
                    return Some(join(*key, low));
                }
            }
            let (&key, segment) = self.segments.next()?;
            self.current = Some((key, segment.iter()));
        }
    }
}

impl<'a> IntoIterator for &'a FrontierSet {
    type Item = NodeId;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl Extend<NodeId> for FrontierSet {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        for id in iter {
            self.add(id);
        }
    }
}

impl FromIterator<NodeId> for FrontierSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut set = FrontierSet::new();
        set.extend(iter);
        set
    }
}

impl PartialEq for FrontierSet {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for FrontierSet {}

impl fmt::Debug for FrontierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
