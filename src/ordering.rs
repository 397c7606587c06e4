/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use arrayvec::ArrayVec;
use clap::ValueEnum;

use crate::{Move, MoveList, PieceKind, MAX_NUM_MOVES};

/// Score given to the TT move, so that it is always searched first.
const TT_MOVE_SCORE: i32 = i32::MAX;

/// How moves are ordered before being searched.
///
/// Searching good moves first lets alpha-beta prune far more of the tree;
/// the order never changes the result of a full-width search, only its speed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum MoveOrdering {
    /// Captures and promotions before quiet moves, otherwise in generation order.
    CaptureFirst,

    /// Most Valuable Victim, Least Valuable Aggressor: captures of big pieces by small pieces first.
    #[default]
    MvvLva,
}

impl MoveOrdering {
    /// Assigns `mv` a score, where a higher score is searched earlier.
    #[inline(always)]
    pub fn score(&self, mv: &Move) -> i32 {
        match self {
            Self::CaptureFirst => (mv.is_capture() || mv.is_promotion()) as i32,

            Self::MvvLva => {
                let capture = mv
                    .captured()
                    .map(|victim| MVV_LVA[mv.piece().kind().index()][victim.index()])
                    .unwrap_or_default();

                let promotion = mv.promotion().map(|kind| kind.value()).unwrap_or_default();

                capture + promotion
            }
        }
    }
}

impl fmt::Display for MoveOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CaptureFirst => write!(f, "capture-first"),
            Self::MvvLva => write!(f, "mvv-lva"),
        }
    }
}

/// Yields moves one at a time, best-scored first.
///
/// Scores are computed up front, but the list is only sorted lazily: each call to `next`
/// selects the best of the remaining moves. A cutoff usually happens after a few moves,
/// so most of the list is never sorted at all. Equally-scored moves keep their generation order.
#[derive(Debug)]
pub struct MovePicker {
    moves: MoveList,
    scores: ArrayVec<i32, MAX_NUM_MOVES>,
    current: usize,
}

impl MovePicker {
    /// Prepares `moves` to be yielded in the order given by `ordering`, with `tt_move` first.
    pub fn new(moves: MoveList, ordering: MoveOrdering, tt_move: Option<Move>) -> Self {
        let scores = moves
            .iter()
            .map(|mv| {
                if tt_move.is_some_and(|tt_mv| tt_mv == *mv) {
                    TT_MOVE_SCORE
                } else {
                    ordering.score(mv)
                }
            })
            .collect();

        Self {
            moves,
            scores,
            current: 0,
        }
    }

    /// Returns the moves that have been yielded so far.
    #[inline(always)]
    pub fn yielded(&self) -> &[Move] {
        &self.moves[..self.current]
    }
}

impl Iterator for MovePicker {
    type Item = Move;

    fn next(&mut self) -> Option<Self::Item> {
        // No more moves left
        if self.current >= self.moves.len() {
            return None;
        }

        // Find the index of the best remaining move; ties go to the earliest
        let mut best_index = self.current;
        for i in (self.current + 1)..self.moves.len() {
            if self.scores[i] > self.scores[best_index] {
                best_index = i;
            }
        }

        // Shift the best move into place, keeping the rest in their original order
        if best_index != self.current {
            self.moves[self.current..=best_index].rotate_right(1);
            self.scores[self.current..=best_index].rotate_right(1);
        }

        let mv = self.moves[self.current];
        self.current += 1;

        Some(mv)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.moves.len() - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MovePicker {}

/// Most Valuable Victim, Least Valuable Aggressor table, indexed by `[attacker][victim]`.
///
/// A king attacker counts as worth nothing, so it is never discouraged from capturing.
const MVV_LVA: [[i32; PieceKind::COUNT]; PieceKind::COUNT] = {
    let mut matrix = [[0; PieceKind::COUNT]; PieceKind::COUNT];
    let kinds = PieceKind::all();

    let mut attacker = 0;
    while attacker < PieceKind::COUNT {
        let mut victim = 0;
        while victim < PieceKind::COUNT {
            let atk = match kinds[attacker] {
                PieceKind::King => 0,
                kind => kind.value(),
            };

            // Captures always outrank quiets, so every entry is positive
            matrix[attacker][victim] =
                10 * kinds[victim].value() - atk + PieceKind::Queen.value();
            victim += 1;
        }
        attacker += 1;
    }
    matrix
};
