/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Sets of squares stored as 64-bit masks.
mod bitboard;

/// Castling rights and the squares involved in castling.
mod castling;

/// Attack tables and legal move generation.
mod movegen;

/// Compact move encoding and UCI notation.
mod moves;

/// Move path enumeration, for validating move generation.
mod perft;

/// Colors, piece kinds, and colored pieces.
mod piece;

/// The board itself: piece placement, game state, and apply/undo.
mod position;

/// Compile-time random number generation for hash keys.
mod prng;

/// Squares, files, and ranks.
mod square;

/// Zobrist hashing of positions.
mod zobrist;

pub use bitboard::*;
pub use castling::*;
pub use movegen::*;
pub use moves::*;
pub use perft::*;
pub use piece::*;
pub use position::*;
use prng::*;
pub use square::*;
pub use zobrist::*;
