/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use super::{Board, CastlingRights, Color, File, Piece, Square, Xoshiro256};

/// Every random key used for hashing, built once at compile time.
static ZOBRIST_TABLE: ZobristTable = ZobristTable::new();

/// A [Zobrist hash](https://www.chessprogramming.org/Zobrist_Hashing) of a [`Board`].
///
/// The key is the XOR of one random value per feature of the position:
/// every (piece, square) pair, Black being on move, each castling right, and the file
/// of the en passant target. Toggling a feature twice cancels out, which is what lets
/// [`Board::apply`] and [`Board::undo`] maintain the key incrementally.
#[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct ZobristKey(u64);

impl ZobristKey {
    /// Computes the key of `board` from scratch.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let board = Board::default();
    /// assert_eq!(board.key(), ZobristKey::new(&board));
    /// assert_ne!(board.key().inner(), 0);
    /// ```
    pub fn new(board: &Board) -> Self {
        let mut key = Self::default();

        for (square, piece) in board.iter() {
            key.hash_piece(square, piece);
        }

        key.hash_castling_rights(board.castling_rights());
        key.hash_optional_ep_square(board.ep_square());

        if board.side_to_move() == Color::Black {
            key.hash_side_to_move();
        }

        key
    }

    #[inline(always)]
    pub const fn inner(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    fn hash(&mut self, key: u64) {
        self.0 ^= key;
    }

    /// Toggles `piece` standing on `square`.
    #[inline(always)]
    pub fn hash_piece(&mut self, square: Square, piece: Piece) {
        self.hash(ZOBRIST_TABLE.pieces[piece.index()][square.index()]);
    }

    /// Toggles Black being the side to move.
    #[inline(always)]
    pub fn hash_side_to_move(&mut self) {
        self.hash(ZOBRIST_TABLE.black_to_move);
    }

    /// Toggles the single castling right at `index` (see [`CastlingRights::indices`]).
    #[inline(always)]
    pub fn hash_castling_right(&mut self, index: usize) {
        self.hash(ZOBRIST_TABLE.castling[index]);
    }

    /// Toggles every right present in `rights`.
    #[inline(always)]
    pub fn hash_castling_rights(&mut self, rights: CastlingRights) {
        for index in rights.indices() {
            self.hash_castling_right(index);
        }
    }

    /// Toggles only the rights that differ between `old` and `new`.
    #[inline(always)]
    pub fn hash_castling_change(&mut self, old: CastlingRights, new: CastlingRights) {
        let diff = old.bits() ^ new.bits();
        for index in 0..CastlingRights::COUNT {
            if diff & (1 << index) != 0 {
                self.hash_castling_right(index);
            }
        }
    }

    /// Toggles the en passant key for the file of `ep_square`.
    #[inline(always)]
    pub fn hash_ep_square(&mut self, ep_square: Square) {
        self.hash(ZOBRIST_TABLE.ep_files[ep_square.file().index()]);
    }

    /// Toggles the en passant key if `ep_square` is set.
    #[inline(always)]
    pub fn hash_optional_ep_square(&mut self, ep_square: Option<Square>) {
        if let Some(square) = ep_square {
            self.hash_ep_square(square);
        }
    }
}

impl fmt::Display for ZobristKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl fmt::Debug for ZobristKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZobristKey({:#018x})", self.0)
    }
}

/// Random keys for each hashable feature of a position.
struct ZobristTable {
    pieces: [[u64; Square::COUNT]; Piece::COUNT],
    castling: [u64; CastlingRights::COUNT],
    ep_files: [u64; File::COUNT],
    black_to_move: u64,
}

impl ZobristTable {
    const fn new() -> Self {
        let mut rng = Xoshiro256::new();

        let mut pieces = [[0; Square::COUNT]; Piece::COUNT];
        let mut i = 0;
        while i < Piece::COUNT {
            let mut j = 0;
            while j < Square::COUNT {
                let (key, next) = rng.next();
                pieces[i][j] = key;
                rng = next;
                j += 1;
            }
            i += 1;
        }

        let mut castling = [0; CastlingRights::COUNT];
        let mut i = 0;
        while i < CastlingRights::COUNT {
            let (key, next) = rng.next();
            castling[i] = key;
            rng = next;
            i += 1;
        }

        let mut ep_files = [0; File::COUNT];
        let mut i = 0;
        while i < File::COUNT {
            let (key, next) = rng.next();
            ep_files[i] = key;
            rng = next;
            i += 1;
        }

        let (black_to_move, _) = rng.next();

        Self {
            pieces,
            castling,
            ep_files,
            black_to_move,
        }
    }
}
