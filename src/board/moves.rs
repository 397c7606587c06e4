/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use anyhow::{anyhow, bail, Result};

use super::{Board, CastleSide, Piece, PieceKind, Square};

/// Maximum possible number of moves in a given chess position.
///
/// Found [here](<https://www.chessprogramming.org/Chess_Position#cite_note-4>)
pub const MAX_NUM_MOVES: usize = 218;

/// An alias for an [`arrayvec::ArrayVec`] containing at most [`MAX_NUM_MOVES`] moves.
pub type MoveList = arrayvec::ArrayVec<Move, MAX_NUM_MOVES>;

/// The special-move category of a [`Move`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MoveKind {
    /// A single piece moves to an empty square.
    Quiet,

    /// A piece moves onto a square occupied by an enemy piece, removing it.
    Capture,

    /// A Pawn advances two squares from its starting rank.
    PawnDoublePush,

    /// A Pawn captures the enemy Pawn that just double-pushed past it.
    EnPassantCapture,

    /// King and Rook slide past each other on the King's side of the board.
    ShortCastle,

    /// King and Rook slide past each other on the Queen's side of the board.
    LongCastle,

    /// A Pawn reaches the last rank and becomes another piece.
    Promotion,

    /// A Pawn captures onto the last rank and becomes another piece.
    CaptureAndPromotion,
}

impl MoveKind {
    const ALL: [Self; 8] = [
        Self::Quiet,
        Self::Capture,
        Self::PawnDoublePush,
        Self::EnPassantCapture,
        Self::ShortCastle,
        Self::LongCastle,
        Self::Promotion,
        Self::CaptureAndPromotion,
    ];

    /// Returns `true` if this kind of move removes an enemy piece.
    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        matches!(
            self,
            Self::Capture | Self::EnPassantCapture | Self::CaptureAndPromotion
        )
    }

    /// Returns `true` if this kind of move promotes a Pawn.
    #[inline(always)]
    pub const fn is_promotion(&self) -> bool {
        matches!(self, Self::Promotion | Self::CaptureAndPromotion)
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Quiet => "Quiet",
            Self::Capture => "Capture",
            Self::PawnDoublePush => "Pawn Double Push",
            Self::EnPassantCapture => "En Passant Capture",
            Self::ShortCastle => "Short Castle",
            Self::LongCastle => "Long Castle",
            Self::Promotion => "Promotion",
            Self::CaptureAndPromotion => "Capture and Promotion",
        };

        write!(f, "{s}")
    }
}

/// A single ply, holding everything needed to apply it and to take it back.
///
/// Packed into a `u32` with the following bit pattern:
/// ```text
///     0000000 000 000 000 0000 000000 000000
///        |     |   |   |   |     |      |
///        |     |   |   |   |     |      +- Source square.
///        |     |   |   |   |     +- Destination square.
///        |     |   |   |   +- Moving piece (see `Piece::bits`).
///        |     |   |   +- MoveKind.
///        |     |   +- Captured PieceKind + 1, or 0 if nothing is captured.
///        |     +- Promotion PieceKind + 1, or 0 if this is not a promotion.
///        +- Unused, always 0.
/// ```
///
/// The same integer is the payload stored in the transposition table, so two moves are
/// equal exactly when all of their fields are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Move(u32);

impl Move {
    const SQUARE_MASK: u32 = 0b11_1111;
    const PIECE_MASK: u32 = 0b1111;
    const FIELD_MASK: u32 = 0b111;

    const DST_SHIFT: u32 = 6;
    const PIECE_SHIFT: u32 = 12;
    const KIND_SHIFT: u32 = 16;
    const CAPTURED_SHIFT: u32 = 19;
    const PROMOTION_SHIFT: u32 = 22;
    const USED_BITS: u32 = 25;

    /// Creates a new [`Move`] from all of its parts.
    ///
    /// No legality checks are made; use [`Board::legal_moves`] or [`Move::from_uci`] for that.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let e2e4 = Move::new(Square::E2, Square::E4, Piece::WHITE_PAWN, MoveKind::PawnDoublePush, None, None);
    /// assert_eq!(e2e4.to_string(), "e2e4");
    /// assert_eq!(e2e4.piece(), Piece::WHITE_PAWN);
    /// assert!(e2e4.captured().is_none());
    /// ```
    #[inline(always)]
    pub const fn new(
        from: Square,
        to: Square,
        piece: Piece,
        kind: MoveKind,
        captured: Option<PieceKind>,
        promotion: Option<PieceKind>,
    ) -> Self {
        let captured = match captured {
            Some(kind) => kind as u32 + 1,
            None => 0,
        };
        let promotion = match promotion {
            Some(kind) => kind as u32 + 1,
            None => 0,
        };

        Self(
            from.0 as u32
                | (to.0 as u32) << Self::DST_SHIFT
                | (piece.bits() as u32) << Self::PIECE_SHIFT
                | (kind as u32) << Self::KIND_SHIFT
                | captured << Self::CAPTURED_SHIFT
                | promotion << Self::PROMOTION_SHIFT,
        )
    }

    /// Decodes a [`Move`] from its packed form, failing on any bit pattern that
    /// [`Move::new`] could not have produced from a consistent set of parts.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mv = Move::new(Square::B7, Square::C8, Piece::WHITE_PAWN, MoveKind::CaptureAndPromotion, Some(PieceKind::Knight), Some(PieceKind::Queen));
    /// assert_eq!(Move::from_bits(mv.bits()).unwrap(), mv);
    /// assert!(Move::from_bits(u32::MAX).is_err());
    /// ```
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits >> Self::USED_BITS != 0 {
            bail!("Move bits must fit in {} bits. Got {bits:#x}", Self::USED_BITS);
        }

        let mv = Self(bits);
        Piece::from_bits(((bits >> Self::PIECE_SHIFT) & Self::PIECE_MASK) as u8)?;

        let kind_bits = (bits >> Self::KIND_SHIFT) & Self::FIELD_MASK;
        let kind = MoveKind::ALL[kind_bits as usize];

        let captured = Self::decode_kind(bits >> Self::CAPTURED_SHIFT)?;
        let promotion = Self::decode_kind(bits >> Self::PROMOTION_SHIFT)?;

        if captured.is_some() != kind.is_capture() {
            bail!("Captured piece of {mv:?} does not match its kind");
        }
        if promotion.is_some() != kind.is_promotion() {
            bail!("Promotion piece of {mv:?} does not match its kind");
        }
        if mv.from() == mv.to() {
            bail!("Move cannot start and end on {}", mv.from());
        }

        Ok(mv)
    }

    /// Decodes an optional kind field stored as `kind + 1`.
    #[inline(always)]
    fn decode_kind(field: u32) -> Result<Option<PieceKind>> {
        match field & Self::FIELD_MASK {
            0 => Ok(None),
            n => PieceKind::from_bits(n as u8 - 1).map(Some),
        }
    }

    /// The packed integer form of this move.
    #[inline(always)]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn from(&self) -> Square {
        Square((self.0 & Self::SQUARE_MASK) as u8)
    }

    #[inline(always)]
    pub const fn to(&self) -> Square {
        Square(((self.0 >> Self::DST_SHIFT) & Self::SQUARE_MASK) as u8)
    }

    /// The piece being moved, as it stood on [`Move::from`].
    #[inline(always)]
    pub fn piece(&self) -> Piece {
        let bits = ((self.0 >> Self::PIECE_SHIFT) & Self::PIECE_MASK) as u8;
        // Moves are only built by `new` or validated by `from_bits`
        Piece::from_bits(bits).unwrap_or(Piece::WHITE_PAWN)
    }

    #[inline(always)]
    pub const fn kind(&self) -> MoveKind {
        MoveKind::ALL[((self.0 >> Self::KIND_SHIFT) & Self::FIELD_MASK) as usize]
    }

    /// The kind of piece removed by this move, if any.
    ///
    /// For en passant this is always a Pawn, even though it is not on [`Move::to`].
    #[inline(always)]
    pub fn captured(&self) -> Option<PieceKind> {
        Self::decode_kind(self.0 >> Self::CAPTURED_SHIFT).unwrap_or(None)
    }

    /// The kind of piece a Pawn turns into, if this is a promotion.
    #[inline(always)]
    pub fn promotion(&self) -> Option<PieceKind> {
        Self::decode_kind(self.0 >> Self::PROMOTION_SHIFT).unwrap_or(None)
    }

    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        self.kind().is_capture()
    }

    #[inline(always)]
    pub const fn is_quiet(&self) -> bool {
        !self.is_capture()
    }

    #[inline(always)]
    pub const fn is_promotion(&self) -> bool {
        self.kind().is_promotion()
    }

    #[inline(always)]
    pub const fn is_en_passant(&self) -> bool {
        matches!(self.kind(), MoveKind::EnPassantCapture)
    }

    #[inline(always)]
    pub const fn is_pawn_double_push(&self) -> bool {
        matches!(self.kind(), MoveKind::PawnDoublePush)
    }

    /// If this move is a castle, returns which side the King castles to.
    #[inline(always)]
    pub const fn castle_side(&self) -> Option<CastleSide> {
        match self.kind() {
            MoveKind::ShortCastle => Some(CastleSide::Short),
            MoveKind::LongCastle => Some(CastleSide::Long),
            _ => None,
        }
    }

    /// Converts this move to [UCI](https://en.wikipedia.org/wiki/Universal_Chess_Interface) long algebraic notation.
    ///
    /// Castling is written as the King's two-square move, and promotions get a lowercase suffix.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let castle = Move::new(Square::E8, Square::C8, Piece::BLACK_KING, MoveKind::LongCastle, None, None);
    /// assert_eq!(castle.to_uci(), "e8c8");
    ///
    /// let promote = Move::new(Square::A7, Square::A8, Piece::WHITE_PAWN, MoveKind::Promotion, None, Some(PieceKind::Knight));
    /// assert_eq!(promote.to_uci(), "a7a8n");
    /// ```
    pub fn to_uci(&self) -> String {
        match self.promotion() {
            Some(promotion) => format!("{}{}{}", self.from(), self.to(), promotion.to_uci()),
            None => format!("{}{}", self.from(), self.to()),
        }
    }

    /// Parses a move in UCI notation and resolves it against the legal moves of `board`.
    ///
    /// Fails if the text is malformed or if it does not name a legal move.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// let mv = Move::from_uci(&mut board, "g1f3").unwrap();
    /// assert_eq!(mv.piece(), Piece::WHITE_KNIGHT);
    ///
    /// assert!(Move::from_uci(&mut board, "e2e5").is_err());
    /// assert!(Move::from_uci(&mut board, "e2").is_err());
    /// ```
    pub fn from_uci(board: &mut Board, uci: &str) -> Result<Self> {
        let from = uci
            .get(0..2)
            .ok_or(anyhow!("Move must contain a `from` square. Got {uci:?}"))?;
        let to = uci
            .get(2..4)
            .ok_or(anyhow!("Move must contain a `to` square. Got {uci:?}"))?;

        let from = Square::from_uci(from)?;
        let to = Square::from_uci(to)?;

        let promotion = match uci.get(4..) {
            None | Some("") => None,
            Some(suffix) => Some(suffix.parse::<PieceKind>()?),
        };

        board
            .legal_moves()
            .into_iter()
            .find(|mv| mv.from() == from && mv.to() == to && mv.promotion() == promotion)
            .ok_or(anyhow!("{uci:?} is not a legal move in {}", board.to_fen()))
    }
}

impl fmt::Display for Move {
    /// A [`Move`] is displayed in its UCI format.
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

impl fmt::Debug for Move {
    /// Debug formatting shows the UCI string, the moving piece, and the [`MoveKind`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({} {}", self.piece(), self.kind())?;
        if let Some(captured) = self.captured() {
            write!(f, ", takes {}", captured.name())?;
        }
        write!(f, ")")
    }
}

impl<T: AsRef<str>> PartialEq<T> for Move {
    #[inline(always)]
    fn eq(&self, other: &T) -> bool {
        self.to_uci().eq(other.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    #[test]
    fn test_move_fields() {
        let mv = Move::new(
            Square::D5,
            Square::E6,
            Piece::WHITE_PAWN,
            MoveKind::EnPassantCapture,
            Some(PieceKind::Pawn),
            None,
        );
        assert_eq!(mv.from(), Square::D5);
        assert_eq!(mv.to(), Square::E6);
        assert_eq!(mv.piece(), Piece::WHITE_PAWN);
        assert_eq!(mv.kind(), MoveKind::EnPassantCapture);
        assert_eq!(mv.captured(), Some(PieceKind::Pawn));
        assert_eq!(mv.promotion(), None);
        assert!(mv.is_capture());
        assert!(mv.is_en_passant());
        assert!(!mv.is_promotion());
    }

    #[test]
    fn test_move_equality_is_all_fields() {
        let quiet = Move::new(Square::E1, Square::F1, Piece::WHITE_KING, MoveKind::Quiet, None, None);
        let capture = Move::new(
            Square::E1,
            Square::F1,
            Piece::WHITE_KING,
            MoveKind::Capture,
            Some(PieceKind::Bishop),
            None,
        );
        assert_ne!(quiet, capture);
        assert_ne!(quiet.bits(), capture.bits());
    }

    #[test]
    fn test_move_from_bits_rejects_inconsistent_parts() {
        // A capture that claims to capture nothing
        let bad = MoveKindBits::with(MoveKind::Capture, 0, 0);
        assert!(Move::from_bits(bad).is_err());

        // A quiet move with a promotion piece
        let bad = MoveKindBits::with(MoveKind::Quiet, 0, PieceKind::Queen as u32 + 1);
        assert!(Move::from_bits(bad).is_err());

        // A captured "kind" of 7 does not exist
        let bad = MoveKindBits::with(MoveKind::Capture, 7, 0);
        assert!(Move::from_bits(bad).is_err());
    }

    /// Builds raw bit patterns for e2 -> e4 by a White Pawn with arbitrary trailing fields.
    struct MoveKindBits;

    impl MoveKindBits {
        fn with(kind: MoveKind, captured: u32, promotion: u32) -> u32 {
            let base = Move::new(Square::E2, Square::E4, Piece::WHITE_PAWN, MoveKind::Quiet, None, None);
            base.bits()
                | (kind as u32) << Move::KIND_SHIFT
                | captured << Move::CAPTURED_SHIFT
                | promotion << Move::PROMOTION_SHIFT
        }
    }

    /// Helper function to assert that the `uci` move is parsed as `expected` on the position created from `fen`.
    fn test_move_parse(fen: &str, uci: &str, expected: Move) {
        let mut board = fen.parse::<Board>().unwrap();

        let mv = Move::from_uci(&mut board, uci);
        assert!(mv.is_ok(), "{}", mv.unwrap_err());
        let mv = mv.unwrap();
        assert_eq!(mv, expected, "{mv:?} is incorrect for {fen}");
    }

    #[test]
    fn test_move_parsing() {
        let pawn_fen = "2n1k3/1P6/8/5pP1/5n2/2P1P3/P7/4K3 w - f6 0 1";

        let mv = Move::new(Square::A2, Square::A3, Piece::WHITE_PAWN, MoveKind::Quiet, None, None);
        test_move_parse(pawn_fen, "a2a3", mv);

        let mv = Move::new(Square::A2, Square::A4, Piece::WHITE_PAWN, MoveKind::PawnDoublePush, None, None);
        test_move_parse(pawn_fen, "a2a4", mv);

        let mv = Move::new(
            Square::E3,
            Square::F4,
            Piece::WHITE_PAWN,
            MoveKind::Capture,
            Some(PieceKind::Knight),
            None,
        );
        test_move_parse(pawn_fen, "e3f4", mv);

        let mv = Move::new(
            Square::G5,
            Square::F6,
            Piece::WHITE_PAWN,
            MoveKind::EnPassantCapture,
            Some(PieceKind::Pawn),
            None,
        );
        test_move_parse(pawn_fen, "g5f6", mv);

        let mv = Move::new(
            Square::B7,
            Square::B8,
            Piece::WHITE_PAWN,
            MoveKind::Promotion,
            None,
            Some(PieceKind::Knight),
        );
        test_move_parse(pawn_fen, "b7b8n", mv);

        let mv = Move::new(
            Square::B7,
            Square::C8,
            Piece::WHITE_PAWN,
            MoveKind::CaptureAndPromotion,
            Some(PieceKind::Knight),
            Some(PieceKind::Queen),
        );
        test_move_parse(pawn_fen, "b7c8q", mv);

        let king_fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";

        let mv = Move::new(Square::E1, Square::G1, Piece::WHITE_KING, MoveKind::ShortCastle, None, None);
        test_move_parse(king_fen, "e1g1", mv);

        let mv = Move::new(Square::E1, Square::C1, Piece::WHITE_KING, MoveKind::LongCastle, None, None);
        test_move_parse(king_fen, "e1c1", mv);

        let king_fen = "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1";

        let mv = Move::new(Square::E8, Square::G8, Piece::BLACK_KING, MoveKind::ShortCastle, None, None);
        test_move_parse(king_fen, "e8g8", mv);

        let mv = Move::new(Square::E8, Square::C8, Piece::BLACK_KING, MoveKind::LongCastle, None, None);
        test_move_parse(king_fen, "e8c8", mv);
    }

    #[test]
    fn test_move_parsing_rejects_illegal_moves() {
        let mut board = Board::default();
        // Geometrically impossible
        assert!(Move::from_uci(&mut board, "e2e5").is_err());
        // Moves from an empty square
        assert!(Move::from_uci(&mut board, "e4e5").is_err());
        // Opponent's piece
        assert!(Move::from_uci(&mut board, "e7e5").is_err());
        // Malformed squares and suffixes
        assert!(Move::from_uci(&mut board, "z2e4").is_err());
        assert!(Move::from_uci(&mut board, "e2e4x").is_err());
    }

    #[test]
    fn test_every_generated_move_survives_its_encoding() {
        let mut board = Board::from_fen(FEN_KIWIPETE).unwrap();
        for mv in board.legal_moves() {
            assert_eq!(Move::from_bits(mv.bits()).unwrap(), mv);
        }
    }
}
