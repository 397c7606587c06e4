/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{Index, IndexMut},
    str::FromStr,
};

use anyhow::{bail, Result};

use super::{Bitboard, Color};

/// Declares a named constant for every square on the board.
macro_rules! square_consts {
    ($($file:ident => [$($name:ident : $rank:ident),*]),* $(,)?) => {
        impl Square {
            $($(
                pub const $name: Self = Self::new(File::$file, Rank::$rank);
            )*)*
        }
    };
}

square_consts! {
    A => [A1: ONE, A2: TWO, A3: THREE, A4: FOUR, A5: FIVE, A6: SIX, A7: SEVEN, A8: EIGHT],
    B => [B1: ONE, B2: TWO, B3: THREE, B4: FOUR, B5: FIVE, B6: SIX, B7: SEVEN, B8: EIGHT],
    C => [C1: ONE, C2: TWO, C3: THREE, C4: FOUR, C5: FIVE, C6: SIX, C7: SEVEN, C8: EIGHT],
    D => [D1: ONE, D2: TWO, D3: THREE, D4: FOUR, D5: FIVE, D6: SIX, D7: SEVEN, D8: EIGHT],
    E => [E1: ONE, E2: TWO, E3: THREE, E4: FOUR, E5: FIVE, E6: SIX, E7: SEVEN, E8: EIGHT],
    F => [F1: ONE, F2: TWO, F3: THREE, F4: FOUR, F5: FIVE, F6: SIX, F7: SEVEN, F8: EIGHT],
    G => [G1: ONE, G2: TWO, G3: THREE, G4: FOUR, G5: FIVE, G6: SIX, G7: SEVEN, G8: EIGHT],
    H => [H1: ONE, H2: TWO, H3: THREE, H4: FOUR, H5: FIVE, H6: SIX, H7: SEVEN, H8: EIGHT],
}

/// A single square on an `8x8` board.
///
/// Squares use [Little-Endian Rank-File mapping](https://www.chessprogramming.org/Square_Mapping_Considerations),
/// so `square = file + rank * 8`:
/// ```text
/// 8| 56 57 58 59 60 61 62 63
/// 7| 48 49 50 51 52 53 54 55
/// 6| 40 41 42 43 44 45 46 47
/// 5| 32 33 34 35 36 37 38 39
/// 4| 24 25 26 27 28 29 30 31
/// 3| 16 17 18 19 20 21 22 23
/// 2|  8  9 10 11 12 13 14 15
/// 1|  0  1  2  3  4  5  6  7
///  +------------------------
///    a  b  c  d  e  f  g  h
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Square(pub(crate) u8);

impl Square {
    pub const MAX: u8 = 63;
    pub const COUNT: usize = 64;

    /// Iterates over every square from a1 to h8.
    ///
    /// # Example
    /// ```
    /// # use newt::Square;
    /// let mut iter = Square::iter();
    /// assert_eq!(iter.len(), 64);
    /// assert_eq!(iter.next(), Some(Square::A1));
    /// assert_eq!(iter.last(), Some(Square::H8));
    /// ```
    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..=Self::MAX).map(Self)
    }

    /// Creates a [`Square`] at the intersection of `file` and `rank`.
    #[inline(always)]
    pub const fn new(file: File, rank: Rank) -> Self {
        Self(rank.0 << 3 | file.0)
    }

    /// Creates a [`Square`] from its index, failing if `index` is not in `[0, 63]`.
    ///
    /// # Example
    /// ```
    /// # use newt::Square;
    /// assert_eq!(Square::from_index(26).unwrap(), Square::C4);
    /// assert!(Square::from_index(64).is_err());
    /// ```
    #[inline(always)]
    pub fn from_index(index: usize) -> Result<Self> {
        if index > Self::MAX as usize {
            bail!("Square index must be between [0, 63]. Got {index}");
        }
        Ok(Self(index as u8))
    }

    /// Creates a [`Square`] from its index without bounds checking.
    #[inline(always)]
    pub const fn from_index_unchecked(index: usize) -> Self {
        debug_assert!(index < Self::COUNT, "Square index must be between [0, 63]");
        Self(index as u8)
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    #[inline(always)]
    pub const fn file(&self) -> File {
        File(self.0 & 7)
    }

    #[inline(always)]
    pub const fn rank(&self) -> Rank {
        Rank(self.0 >> 3)
    }

    /// Returns a [`Bitboard`] with only this square set.
    #[inline(always)]
    pub const fn bitboard(&self) -> Bitboard {
        Bitboard::from_square(*self)
    }

    /// Mirrors this square vertically, so that a1 becomes a8.
    #[inline(always)]
    pub const fn flipped_rank(self) -> Self {
        Self(self.0 ^ 0b0011_1000)
    }

    /// Mirrors this square vertically if `color` is Black.
    ///
    /// Handy for writing tables from White's point of view.
    #[inline(always)]
    pub const fn rank_relative_to(self, color: Color) -> Self {
        match color {
            Color::White => self,
            Color::Black => self.flipped_rank(),
        }
    }

    /// Returns `true` if this is a dark square (a1 is dark).
    #[inline(always)]
    pub const fn is_dark(&self) -> bool {
        (self.file().0 + self.rank().0) % 2 == 0
    }

    /// Steps `file_delta` files and `rank_delta` ranks away from this square.
    ///
    /// Returns `None` if the step leaves the board, so a ray walked with this
    /// function can never wrap around onto a neighbouring rank or file.
    ///
    /// # Example
    /// ```
    /// # use newt::Square;
    /// assert_eq!(Square::E4.offset(1, 1), Some(Square::F5));
    /// assert_eq!(Square::H4.offset(1, 0), None);
    /// assert_eq!(Square::A1.offset(0, -1), None);
    /// ```
    #[inline(always)]
    pub const fn offset(&self, file_delta: i8, rank_delta: i8) -> Option<Self> {
        let file = self.file().0 as i8 + file_delta;
        let rank = self.rank().0 as i8 + rank_delta;

        if file < 0 || file > 7 || rank < 0 || rank > 7 {
            None
        } else {
            Some(Self::new(File(file as u8), Rank(rank as u8)))
        }
    }

    /// Steps `n` ranks towards the opponent of `color`.
    #[inline(always)]
    pub const fn forward_by(&self, color: Color, n: i8) -> Option<Self> {
        match color {
            Color::White => self.offset(0, n),
            Color::Black => self.offset(0, -n),
        }
    }

    /// Steps `n` ranks back towards `color`'s own side.
    #[inline(always)]
    pub const fn backward_by(&self, color: Color, n: i8) -> Option<Self> {
        self.forward_by(color, -n)
    }

    /// Parses a square in coordinate notation, like `e4`.
    ///
    /// # Example
    /// ```
    /// # use newt::Square;
    /// assert_eq!(Square::from_uci("e4").unwrap(), Square::E4);
    /// assert!(Square::from_uci("i9").is_err());
    /// ```
    pub fn from_uci(square: &str) -> Result<Self> {
        let mut chars = square.chars();
        let (Some(file), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            bail!("Square must be exactly 2 characters. Got {square:?}");
        };

        Ok(Self::new(File::from_char(file)?, Rank::from_char(rank)?))
    }
}

impl FromStr for Square {
    type Err = anyhow::Error;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uci(s)
    }
}

impl<T> Index<Square> for [T; Square::COUNT] {
    type Output = T;
    #[inline(always)]
    fn index(&self, index: Square) -> &Self::Output {
        &self[index.index()]
    }
}

impl<T> IndexMut<Square> for [T; Square::COUNT] {
    #[inline(always)]
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        &mut self[index.index()]
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({})", self.0)
    }
}

/// One of the eight files (columns) of the board, `a` through `h`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct File(pub(crate) u8);

impl File {
    pub const A: Self = Self(0);
    pub const B: Self = Self(1);
    pub const C: Self = Self(2);
    pub const D: Self = Self(3);
    pub const E: Self = Self(4);
    pub const F: Self = Self(5);
    pub const G: Self = Self(6);
    pub const H: Self = Self(7);

    pub const COUNT: usize = 8;

    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn from_char(file: char) -> Result<Self> {
        match file {
            'a'..='h' => Ok(Self(file as u8 - b'a')),
            _ => bail!("File must be a char between [a, h]. Got {file:?}"),
        }
    }

    #[inline(always)]
    pub const fn char(&self) -> char {
        (b'a' + self.0) as char
    }
}

impl fmt::Display for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File({})", self.char())
    }
}

/// One of the eight ranks (rows) of the board, `1` through `8`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Rank(pub(crate) u8);

impl Rank {
    pub const ONE: Self = Self(0);
    pub const TWO: Self = Self(1);
    pub const THREE: Self = Self(2);
    pub const FOUR: Self = Self(3);
    pub const FIVE: Self = Self(4);
    pub const SIX: Self = Self(5);
    pub const SEVEN: Self = Self(6);
    pub const EIGHT: Self = Self(7);

    pub const COUNT: usize = 8;

    #[inline(always)]
    pub fn iter() -> impl ExactSizeIterator<Item = Self> + DoubleEndedIterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }

    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn from_char(rank: char) -> Result<Self> {
        match rank {
            '1'..='8' => Ok(Self(rank as u8 - b'1')),
            _ => bail!("Rank must be a char between [1, 8]. Got {rank:?}"),
        }
    }

    #[inline(always)]
    pub const fn char(&self) -> char {
        (b'1' + self.0) as char
    }

    /// The rank on which `color`'s back-rank pieces start.
    #[inline(always)]
    pub const fn first(color: Color) -> Self {
        match color {
            Color::White => Self::ONE,
            Color::Black => Self::EIGHT,
        }
    }

    /// The rank on which `color`'s pawns start.
    #[inline(always)]
    pub const fn pawn_start(color: Color) -> Self {
        match color {
            Color::White => Self::TWO,
            Color::Black => Self::SEVEN,
        }
    }

    /// The rank on which `color`'s pawns promote.
    #[inline(always)]
    pub const fn promotion(color: Color) -> Self {
        match color {
            Color::White => Self::EIGHT,
            Color::Black => Self::ONE,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

impl fmt::Debug for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_parts() {
        assert_eq!(Square::C4.index(), 26);
        assert_eq!(Square::C4.file(), File::C);
        assert_eq!(Square::C4.rank(), Rank::FOUR);
        assert_eq!(Square::new(File::H, Rank::EIGHT), Square::H8);
    }

    #[test]
    fn test_offset_never_wraps() {
        // Walking east from every h-file square must leave the board.
        for rank in Rank::iter() {
            assert_eq!(Square::new(File::H, rank).offset(1, 0), None);
            assert_eq!(Square::new(File::A, rank).offset(-1, 0), None);
        }
        assert_eq!(Square::A8.offset(0, 1), None);
        assert_eq!(Square::D4.offset(-2, 3), Some(Square::B7));
    }

    #[test]
    fn test_square_parsing() {
        assert_eq!("a1".parse::<Square>().unwrap(), Square::A1);
        assert_eq!("h8".parse::<Square>().unwrap(), Square::H8);
        assert!("a".parse::<Square>().is_err());
        assert!("a10".parse::<Square>().is_err());
        assert!("z3".parse::<Square>().is_err());
        assert_eq!(Square::G7.to_string(), "g7");
    }

    #[test]
    fn test_square_colors() {
        assert!(Square::A1.is_dark());
        assert!(!Square::H1.is_dark());
        assert!(Square::H8.is_dark());
    }
}
