/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{Move, Score, SearchBounds, ZobristKey};

/// Number of bytes in a megabyte
const BYTES_IN_MB: usize = 1024 * 1024;

/// Number of entries sampled when computing [`TTable::hashfull`].
const HASHFULL_SAMPLE: usize = 1_000;

/// Type of node encountered during search.
///
/// See [CPW](https://www.chessprogramming.org/Node_Types) for more.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum NodeType {
    /// The score is exact.
    Exact,

    /// The score is greater than or equal to beta: the true score is at least this.
    LowerBound,

    /// The score is less than or equal to alpha: the true score is at most this.
    UpperBound,
}

impl NodeType {
    /// Creates a new [`NodeType`] based on the parameters as follows:
    ///
    /// ```text
    /// if score <= alpha:
    ///     UPPERBOUND
    /// else if score >= beta:
    ///     LOWERBOUND
    /// else:
    ///     EXACT
    /// ```
    ///
    /// `bounds` must be the window the node was entered with.
    #[inline(always)]
    pub fn new(score: Score, bounds: SearchBounds) -> Self {
        if score <= bounds.alpha {
            Self::UpperBound
        } else if score >= bounds.beta {
            Self::LowerBound
        } else {
            Self::Exact
        }
    }
}

/// An entry into a hash table
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TTableEntry {
    /// Key of the node this entry represents.
    pub key: ZobristKey,

    /// Depth at which the data for this entry was found.
    pub depth: u8,

    /// Best move found for this position, if the node had any moves to search.
    pub bestmove: Option<Move>,

    /// Best score found for this position.
    ///
    /// Mate scores are stored relative to this node, not the root.
    pub score: Score,

    /// Node type of this entry.
    pub node_type: NodeType,

    /// Value of [`TTable::generation`] when this entry was written.
    pub generation: u8,
}

/// Transposition Table.
///
/// Used during a search to keep track of previous search results on positions,
/// avoiding unnecessary re-computations.
///
/// Each key maps to exactly one slot, `key % capacity`. When two keys share a slot,
/// [`TTable::store`] decides which one survives; the loser is simply forgotten.
#[derive(Debug)]
pub struct TTable {
    /// Internal cache of the TTable.
    cache: Vec<Option<TTableEntry>>,

    /// Current search generation, advanced by [`TTable::new_search`].
    generation: u8,

    /// Number of collisions that have occurred since last clearing.
    pub(crate) collisions: usize,

    /// Number of accesses that have occurred since last clearing.
    pub(crate) accesses: usize,

    /// Number of hits that have occurred since last clearing.
    pub(crate) hits: usize,
}

impl TTable {
    /// Default size of the Transposition Table, in megabytes.
    pub const DEFAULT_SIZE: usize = 16;

    /// Minimum size of the Transposition Table, in megabytes.
    pub const MIN_SIZE: usize = 1;

    /// Maximum size of the Transposition Table, in megabytes.
    pub const MAX_SIZE: usize = 1_024;

    /// Create a new [`TTable`] that is `size` megabytes.
    ///
    /// `size` is clamped to `[MIN_SIZE, MAX_SIZE]`.
    ///
    /// Its size will be `size_of::<Option<TTableEntry>>() * capacity`
    #[inline(always)]
    pub fn new(size: usize) -> Self {
        let size = size.clamp(Self::MIN_SIZE, Self::MAX_SIZE);
        Self::from_capacity((size * BYTES_IN_MB) / size_of::<Option<TTableEntry>>())
    }

    /// Create a new [`TTable`] that can hold `capacity` entries.
    ///
    /// A capacity of `0` is rounded up to `1`.
    #[inline(always)]
    pub fn from_capacity(capacity: usize) -> Self {
        Self {
            cache: vec![None; capacity.max(1)],
            generation: 0,
            collisions: 0,
            accesses: 0,
            hits: 0,
        }
    }

    /// Clears the entries of this [`TTable`].
    #[inline(always)]
    pub fn clear(&mut self) {
        self.cache.iter_mut().for_each(|entry| *entry = None);
        self.generation = 0;
        self.collisions = 0;
        self.accesses = 0;
        self.hits = 0;
    }

    /// Discards every entry and re-allocates this [`TTable`] to be `size` megabytes.
    #[inline(always)]
    pub fn resize(&mut self, size: usize) {
        *self = Self::new(size);
    }

    /// Marks the start of a new search.
    ///
    /// Entries written by earlier searches become stale and are always replaceable.
    #[inline(always)]
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns the current search generation.
    #[inline(always)]
    pub const fn generation(&self) -> u8 {
        self.generation
    }

    /// Returns the number of entries that can fit within this [`TTable`]
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.cache.len()
    }

    /// Returns the size of this [`TTable`], in megabytes, rounded up.
    #[inline(always)]
    pub fn size(&self) -> usize {
        (self.cache.len() * size_of::<Option<TTableEntry>>()).div_ceil(BYTES_IN_MB)
    }

    /// Returns the number of `Some` entries in this [`TTable`].
    #[inline(always)]
    pub fn num_entries(&self) -> usize {
        self.cache.iter().filter(|entry| entry.is_some()).count()
    }

    /// Estimates how full this [`TTable`] is, in permille, from entries written by the current search.
    ///
    /// Only the first thousand slots are sampled, which is plenty for an estimate.
    pub fn hashfull(&self) -> usize {
        let sample = self.capacity().min(HASHFULL_SAMPLE);
        let used = self.cache[..sample]
            .iter()
            .flatten()
            .filter(|entry| entry.generation == self.generation)
            .count();

        used * 1_000 / sample
    }

    /// Returns the number of (hits, accesses, collisions) since the last time this table was cleared.
    #[inline(always)]
    pub const fn stats(&self) -> (usize, usize, usize) {
        (self.hits, self.accesses, self.collisions)
    }

    /// Map `key` to an index into this [`TTable`].
    #[inline(always)]
    pub fn index(&self, key: ZobristKey) -> usize {
        (key.inner() % self.capacity() as u64) as usize
    }

    /// Look up the entry for `key`, if one exists.
    ///
    /// A slot holding a different key is a miss. Mate scores in the returned entry
    /// are converted to be relative to the root, as seen from a node at `ply`.
    #[inline(always)]
    pub fn probe(&mut self, key: ZobristKey, ply: usize) -> Option<TTableEntry> {
        self.accesses += 1;

        let mut entry = self.cache[self.index(key)].filter(|entry| entry.key == key)?;
        self.hits += 1;

        entry.score = entry.score.relative(ply);
        Some(entry)
    }

    /// Returns the best move stored for `key`, if any, without counting as an access.
    #[inline(always)]
    pub fn bestmove(&self, key: ZobristKey) -> Option<Move> {
        self.cache[self.index(key)]
            .filter(|entry| entry.key == key)
            .and_then(|entry| entry.bestmove)
    }

    /// Store the result of searching the node with `key` at `ply`.
    ///
    /// The slot is overwritten when it is empty, holds a different key, holds an entry from an
    /// older search, holds an entry searched no deeper than `depth`, or when the new entry is exact.
    /// Otherwise the existing, deeper entry is kept.
    ///
    /// Returns `true` if the entry was written.
    pub fn store(
        &mut self,
        key: ZobristKey,
        score: Score,
        bestmove: Option<Move>,
        node_type: NodeType,
        depth: usize,
        ply: usize,
    ) -> bool {
        let index = self.index(key);
        let depth = depth.min(u8::MAX as usize) as u8;

        let replace = match &self.cache[index] {
            None => true,
            Some(old) => {
                old.key != key
                    || old.generation != self.generation
                    || old.depth <= depth
                    || node_type == NodeType::Exact
            }
        };

        if !replace {
            return false;
        }

        if self.cache[index].is_some_and(|old| old.key != key) {
            self.collisions += 1;
        }

        // Keep the old move if this search found none, since it's still the best guess we have
        let bestmove = bestmove.or_else(|| self.bestmove(key));

        self.cache[index] = Some(TTableEntry {
            key,
            depth,
            bestmove,
            score: score.absolute(ply),
            node_type,
            generation: self.generation,
        });

        true
    }
}

impl Default for TTable {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}
