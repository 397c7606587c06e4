/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{bail, Result};

use super::{Bitboard, Color, Square};

/// One of the two directions a King may castle in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum CastleSide {
    /// Kingside, towards the h-file.
    Short,
    /// Queenside, towards the a-file.
    Long,
}

impl CastleSide {
    /// The King's destination when `color` castles to this side.
    #[inline(always)]
    pub const fn king_destination(&self, color: Color) -> Square {
        match self {
            Self::Short => Square::G1.rank_relative_to(color),
            Self::Long => Square::C1.rank_relative_to(color),
        }
    }

    /// Where `color`'s Rook starts when castling to this side.
    #[inline(always)]
    pub const fn rook_origin(&self, color: Color) -> Square {
        match self {
            Self::Short => Square::H1.rank_relative_to(color),
            Self::Long => Square::A1.rank_relative_to(color),
        }
    }

    /// Where `color`'s Rook lands after castling to this side.
    #[inline(always)]
    pub const fn rook_destination(&self, color: Color) -> Square {
        match self {
            Self::Short => Square::F1.rank_relative_to(color),
            Self::Long => Square::D1.rank_relative_to(color),
        }
    }

    /// Squares strictly between the King and the Rook, which must be empty.
    #[inline(always)]
    pub const fn empty_squares(&self, color: Color) -> Bitboard {
        let mask = match self {
            Self::Short => Bitboard::new(0x60),
            Self::Long => Bitboard::new(0x0E),
        };
        match color {
            Color::White => mask,
            Color::Black => Bitboard::new(mask.inner() << 56),
        }
    }

    /// Square the King passes over on its way to its destination.
    #[inline(always)]
    pub const fn king_transit(&self, color: Color) -> Square {
        self.rook_destination(color)
    }
}

/// The four castling rights, packed as bit flags.
///
/// ```text
///     0000 0 0 0 0
///      |   | | | +- White short
///      |   | | +- White long
///      |   | +- Black short
///      |   +- Black long
///      +- Unused
/// ```
///
/// Rights are only ever removed during a game: once a King or Rook has moved or been
/// captured, its bit never comes back.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const WHITE_SHORT: Self = Self(0b0001);
    pub const WHITE_LONG: Self = Self(0b0010);
    pub const BLACK_SHORT: Self = Self(0b0100);
    pub const BLACK_LONG: Self = Self(0b1000);

    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    /// Number of individual rights.
    pub const COUNT: usize = 4;

    #[inline(always)]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// The single right for `color` castling towards `side`.
    #[inline(always)]
    pub const fn flag(color: Color, side: CastleSide) -> Self {
        match (color, side) {
            (Color::White, CastleSide::Short) => Self::WHITE_SHORT,
            (Color::White, CastleSide::Long) => Self::WHITE_LONG,
            (Color::Black, CastleSide::Short) => Self::BLACK_SHORT,
            (Color::Black, CastleSide::Long) => Self::BLACK_LONG,
        }
    }

    #[inline(always)]
    pub const fn has(&self, color: Color, side: CastleSide) -> bool {
        self.0 & Self::flag(color, side).0 != 0
    }

    #[inline(always)]
    pub fn insert(&mut self, rights: Self) {
        self.0 |= rights.0;
    }

    /// Keeps only the rights that are also present in `mask`.
    #[inline(always)]
    pub fn retain(&mut self, mask: Self) {
        self.0 &= mask.0;
    }

    /// Iterates over the index of every right that is set, in `[0, 4)`.
    #[inline(always)]
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..Self::COUNT).filter(move |i| bits & (1 << i) != 0)
    }

    /// Rights that survive a move touching `square`.
    ///
    /// Moving from, or capturing on, a King or Rook home square clears the rights that depend on it.
    #[inline(always)]
    pub const fn surviving(square: Square) -> Self {
        CASTLING_MASKS[square.index()]
    }

    /// Parses the castling field of a FEN string, like `KQkq` or `-`.
    pub fn from_uci(castling: &str) -> Result<Self> {
        let mut rights = Self::NONE;
        if castling == "-" {
            return Ok(rights);
        }

        for c in castling.chars() {
            let right = match c {
                'K' => Self::WHITE_SHORT,
                'Q' => Self::WHITE_LONG,
                'k' => Self::BLACK_SHORT,
                'q' => Self::BLACK_LONG,
                _ => bail!("Castling rights must be '-' or a combination of [K, Q, k, q]. Got {c:?}"),
            };
            rights.insert(right);
        }

        Ok(rights)
    }

    /// Formats these rights as they appear in a FEN string.
    pub fn to_uci(&self) -> String {
        if self.0 == 0 {
            return String::from("-");
        }

        [
            (Self::WHITE_SHORT, 'K'),
            (Self::WHITE_LONG, 'Q'),
            (Self::BLACK_SHORT, 'k'),
            (Self::BLACK_LONG, 'q'),
        ]
        .into_iter()
        .filter(|(right, _)| self.0 & right.0 != 0)
        .map(|(_, c)| c)
        .collect()
    }
}

/// For each square, the rights that survive a move from or to it.
const CASTLING_MASKS: [CastlingRights; Square::COUNT] = {
    let mut masks = [CastlingRights::ALL; Square::COUNT];

    masks[Square::E1.index()] = CastlingRights(0b1100);
    masks[Square::H1.index()] = CastlingRights(0b1110);
    masks[Square::A1.index()] = CastlingRights(0b1101);

    masks[Square::E8.index()] = CastlingRights(0b0011);
    masks[Square::H8.index()] = CastlingRights(0b1011);
    masks[Square::A8.index()] = CastlingRights(0b0111);

    masks
};

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl fmt::Debug for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CastlingRights({} = {:#06b})", self.to_uci(), self.0)
    }
}
