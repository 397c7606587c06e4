/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};

use super::{
    pawn_attacks, Bitboard, CastleSide, CastlingRights, Color, File, Move, Piece, PieceKind, Rank, Square,
    ZobristKey,
};

/// FEN string for the starting position of chess.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A popular FEN string for debugging move generation.
pub const FEN_KIWIPETE: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

/// Everything [`Board::apply`] overwrites that cannot be recovered from the [`Move`] itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
struct Snapshot {
    mv: Move,
    castling: CastlingRights,
    ep_square: Option<Square>,
    halfmove: usize,
    fullmove: usize,
    key: ZobristKey,
}

/// Why a game ended in a draw.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum DrawReason {
    /// One hundred plies without a capture or a Pawn move.
    FiftyMoves,

    /// The same position occurred three times.
    Repetition,

    /// Neither side has enough material left to deliver checkmate.
    InsufficientMaterial,
}

/// The result of a game, as seen from its current position.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    Draw(DrawReason),
}

impl GameStatus {
    /// Returns `true` if no more moves may be played.
    #[inline(always)]
    pub const fn is_over(&self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ongoing => write!(f, "ongoing"),
            Self::Checkmate { winner } => write!(f, "checkmate, {} wins", winner.name()),
            Self::Stalemate => write!(f, "stalemate"),
            Self::Draw(DrawReason::FiftyMoves) => write!(f, "draw by fifty-move rule"),
            Self::Draw(DrawReason::Repetition) => write!(f, "draw by threefold repetition"),
            Self::Draw(DrawReason::InsufficientMaterial) => {
                write!(f, "draw by insufficient material")
            }
        }
    }
}

/// A chess position together with the moves that led to it.
///
/// Pieces are stored twice: as twelve [`Bitboard`]s (one per color and kind) for move generation,
/// and as a mailbox for answering "what is on this square?" in constant time.
/// The derived color and occupancy masks are updated alongside them.
///
/// Moves are played in place with [`Board::apply`] and taken back with [`Board::undo`],
/// which restores the position bit-for-bit, including its [`ZobristKey`].
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    /// One mask per (color, kind) pair.
    pieces: [[Bitboard; PieceKind::COUNT]; Color::COUNT],

    /// Union of each color's masks.
    colors: [Bitboard; Color::COUNT],

    /// Union of everything.
    occupied: Bitboard,

    mailbox: [Option<Piece>; Square::COUNT],

    side_to_move: Color,

    castling: CastlingRights,

    /// Square a Pawn skipped over on the previous ply, if the previous ply was a double push.
    ep_square: Option<Square>,

    /// Plies since the last capture or Pawn move.
    halfmove: usize,

    /// Starts at 1 and is incremented after each of Black's moves.
    fullmove: usize,

    key: ZobristKey,

    history: Vec<Snapshot>,
}

impl Board {
    /// Creates an empty [`Board`] with White to move, no castling rights, and no en passant square.
    ///
    /// # Example
    /// ```
    /// # use newt::Board;
    /// let board = Board::new();
    /// assert_eq!(board.to_fen(), "8/8/8/8/8/8/8/8 w - - 0 1");
    /// ```
    pub fn new() -> Self {
        let mut board = Self {
            pieces: [[Bitboard::EMPTY; PieceKind::COUNT]; Color::COUNT],
            colors: [Bitboard::EMPTY; Color::COUNT],
            occupied: Bitboard::EMPTY,
            mailbox: [None; Square::COUNT],
            side_to_move: Color::White,
            castling: CastlingRights::NONE,
            ep_square: None,
            halfmove: 0,
            fullmove: 1,
            key: ZobristKey::default(),
            history: Vec::with_capacity(256),
        };
        board.key = ZobristKey::new(&board);
        board
    }

    /// Creates a new [`Board`] from the provided FEN string.
    ///
    /// Only the piece placements are required; the remaining fields default to `w - - 0 1`.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let board = Board::from_fen(FEN_KIWIPETE).unwrap();
    /// assert_eq!(board.to_fen(), FEN_KIWIPETE);
    ///
    /// let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3").unwrap();
    /// assert_eq!(board.to_fen(), "4k3/8/8/8/8/8/8/4K3 w - - 0 1");
    ///
    /// assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 x").is_err());
    /// ```
    pub fn from_fen(fen: &str) -> Result<Self> {
        let mut board = Self::new();
        let mut split = fen.split_whitespace();

        let placements = split
            .next()
            .ok_or(anyhow!("FEN string must have piece placements."))?;
        board
            .parse_placements(placements)
            .with_context(|| format!("Invalid piece placements in FEN {fen:?}"))?;

        let active_color = split.next().unwrap_or("w");
        board.side_to_move = active_color
            .parse()
            .with_context(|| format!("Invalid active color in FEN {fen:?}"))?;

        let castling = split.next().unwrap_or("-");
        board.castling = CastlingRights::from_uci(castling)
            .with_context(|| format!("Invalid castling rights in FEN {fen:?}"))?;
        board.validate_castling()?;

        let en_passant_target = split.next().unwrap_or("-");
        board.ep_square = match en_passant_target {
            "-" => None,
            square => Some(
                Square::from_uci(square)
                    .with_context(|| format!("Invalid en passant target in FEN {fen:?}"))?,
            ),
        };
        board.validate_ep_square()?;

        // A target nobody can capture onto does not distinguish the position
        board.ep_square = board
            .ep_square
            .filter(|&sq| board.can_capture_en_passant(sq, board.side_to_move));

        let halfmove = split.next().unwrap_or("0");
        board.halfmove = halfmove.parse().or(Err(anyhow!(
            "FEN string must have valid halfmove counter. Got {halfmove:?}"
        )))?;

        let fullmove = split.next().unwrap_or("1");
        board.fullmove = fullmove.parse().or(Err(anyhow!(
            "FEN string must have valid fullmove counter. Got {fullmove:?}"
        )))?;
        if board.fullmove == 0 {
            bail!("FEN string must have a fullmove counter of at least 1");
        }

        if let Some(extra) = split.next() {
            bail!("FEN string has unexpected trailing field {extra:?}");
        }

        let waiting = board.side_to_move.opponent();
        if let Some(king) = board.king_square(waiting) {
            if board.is_square_attacked(king, board.side_to_move) {
                bail!(
                    "FEN string is illegal: {} is to move and can capture the {} King",
                    board.side_to_move.name(),
                    waiting.name()
                );
            }
        }

        board.key = ZobristKey::new(&board);

        Ok(board)
    }

    /// Fills the board from the first field of a FEN string.
    fn parse_placements(&mut self, placements: &str) -> Result<()> {
        let ranks = placements.split('/').collect::<Vec<_>>();
        if ranks.len() != Rank::COUNT {
            bail!(
                "Placements must have {} ranks separated by '/'. Got {}",
                Rank::COUNT,
                ranks.len()
            );
        }

        for (rank, pieces) in Rank::iter().rev().zip(ranks) {
            let mut file = 0;

            for c in pieces.chars() {
                if let Some(empty) = c.to_digit(10) {
                    if !(1..=8).contains(&empty) {
                        bail!("Empty square count must be between [1, 8]. Got {c:?}");
                    }
                    file += empty as u8;
                } else {
                    if file as usize >= File::COUNT {
                        bail!("Rank {rank} has more than {} files", File::COUNT);
                    }
                    let piece = Piece::from_uci(c)?;
                    let square = Square::new(File(file), rank);
                    if piece.is_pawn() && (rank == Rank::ONE || rank == Rank::EIGHT) {
                        bail!("Pawns cannot stand on the first or last rank. Found {piece:?} on {square}");
                    }
                    self.place(piece, square);
                    file += 1;
                }
            }

            if file as usize != File::COUNT {
                bail!("Rank {rank} must describe exactly {} files. Got {file}", File::COUNT);
            }
        }

        for color in Color::all() {
            let kings = self.piece_parts(color, PieceKind::King).population();
            if kings != 1 {
                bail!("{} must have exactly one King. Got {kings}", color.name());
            }
        }

        Ok(())
    }

    /// Every castling right must still have its King and Rook on their home squares.
    fn validate_castling(&self) -> Result<()> {
        for color in Color::all() {
            for side in [CastleSide::Short, CastleSide::Long] {
                if !self.castling.has(color, side) {
                    continue;
                }

                let king_home = Square::E1.rank_relative_to(color);
                let rook_home = side.rook_origin(color);
                if self.piece_at(king_home) != Some(Piece::new(color, PieceKind::King))
                    || self.piece_at(rook_home) != Some(Piece::new(color, PieceKind::Rook))
                {
                    bail!(
                        "Castling right {} requires a King on {king_home} and a Rook on {rook_home}",
                        CastlingRights::flag(color, side)
                    );
                }
            }
        }

        Ok(())
    }

    /// Returns `true` if a Pawn of `capturer` stands beside the Pawn that just double-pushed past `ep_square`.
    ///
    /// Pins are not considered.
    fn can_capture_en_passant(&self, ep_square: Square, capturer: Color) -> bool {
        let pawns = self.piece_parts(capturer, PieceKind::Pawn);
        (pawn_attacks(ep_square, capturer.opponent()) & pawns).is_nonempty()
    }

    /// An en passant target must sit right behind an enemy Pawn that could have just double-pushed.
    fn validate_ep_square(&self) -> Result<()> {
        let Some(ep_square) = self.ep_square else {
            return Ok(());
        };

        let pusher = self.side_to_move.opponent();
        let expected_rank = Rank::pawn_start(pusher);
        let pawn = Piece::new(pusher, PieceKind::Pawn);

        let pawn_square = ep_square.forward_by(pusher, 1);
        let start_square = ep_square.backward_by(pusher, 1);
        let is_valid = start_square.map(|sq| sq.rank()) == Some(expected_rank)
            && pawn_square.and_then(|sq| self.piece_at(sq)) == Some(pawn)
            && self.piece_at(ep_square).is_none()
            && start_square.is_some_and(|sq| self.piece_at(sq).is_none());

        if !is_valid {
            bail!(
                "En passant target {ep_square} does not follow a {} double push",
                pusher.name()
            );
        }

        Ok(())
    }

    /// Generates a [FEN](https://www.chess.com/terms/fen-chess) string of this [`Board`].
    pub fn to_fen(&self) -> String {
        let mut placements: Vec<String> = Vec::with_capacity(Rank::COUNT);

        for rank in Rank::iter().rev() {
            let mut row = String::with_capacity(File::COUNT);
            let mut empty_spaces = 0;

            for file in File::iter() {
                if let Some(piece) = self.piece_at(Square::new(file, rank)) {
                    if empty_spaces != 0 {
                        row += &empty_spaces.to_string();
                        empty_spaces = 0;
                    }
                    row.push(piece.to_uci());
                } else {
                    empty_spaces += 1;
                }
            }

            if empty_spaces != 0 {
                row += &empty_spaces.to_string();
            }
            placements.push(row);
        }

        let en_passant_target = self
            .ep_square
            .map(|square| square.to_string())
            .unwrap_or(String::from("-"));

        format!(
            "{} {} {} {en_passant_target} {} {}",
            placements.join("/"),
            self.side_to_move.to_uci(),
            self.castling,
            self.halfmove,
            self.fullmove
        )
    }

    #[inline(always)]
    pub const fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline(always)]
    pub const fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    #[inline(always)]
    pub const fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    #[inline(always)]
    pub const fn halfmove(&self) -> usize {
        self.halfmove
    }

    #[inline(always)]
    pub const fn fullmove(&self) -> usize {
        self.fullmove
    }

    /// Fetch the Zobrist hash key of this position.
    #[inline(always)]
    pub const fn key(&self) -> ZobristKey {
        self.key
    }

    #[inline(always)]
    pub const fn piece_at(&self, square: Square) -> Option<Piece> {
        self.mailbox[square.index()]
    }

    /// Squares occupied by `color`'s pieces of `kind`.
    #[inline(always)]
    pub const fn piece_parts(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    #[inline(always)]
    pub const fn pieces(&self, piece: Piece) -> Bitboard {
        self.piece_parts(piece.color(), piece.kind())
    }

    /// Squares occupied by pieces of `kind`, of either color.
    #[inline(always)]
    pub const fn kind(&self, kind: PieceKind) -> Bitboard {
        self.piece_parts(Color::White, kind)
            .or(self.piece_parts(Color::Black, kind))
    }

    #[inline(always)]
    pub const fn color(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    #[inline(always)]
    pub const fn occupied(&self) -> Bitboard {
        self.occupied
    }

    #[inline(always)]
    pub const fn empty(&self) -> Bitboard {
        self.occupied.not()
    }

    /// Where `color`'s King stands, if it has one.
    #[inline(always)]
    pub const fn king_square(&self, color: Color) -> Option<Square> {
        self.piece_parts(color, PieceKind::King).lsb()
    }

    /// Iterates over every occupied square and the piece on it, from a1 to h8.
    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.occupied
            .into_iter()
            .filter_map(|square| self.piece_at(square).map(|piece| (square, piece)))
    }

    /// Number of moves that can be taken back with [`Board::undo`].
    #[inline(always)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The most recently applied move, if any.
    #[inline(always)]
    pub fn last_move(&self) -> Option<Move> {
        self.history.last().map(|snapshot| snapshot.mv)
    }

    /// Every move applied to this board so far, oldest first.
    pub fn moves_played(&self) -> impl Iterator<Item = Move> + '_ {
        self.history.iter().map(|snapshot| snapshot.mv)
    }

    #[inline(always)]
    fn place(&mut self, piece: Piece, square: Square) {
        debug_assert!(self.mailbox[square].is_none(), "{square} is occupied");
        self.pieces[piece.color()][piece.kind()].set(square);
        self.colors[piece.color()].set(square);
        self.occupied.set(square);
        self.mailbox[square] = Some(piece);
    }

    #[inline(always)]
    fn take(&mut self, square: Square) -> Option<Piece> {
        let piece = self.mailbox[square].take()?;
        self.pieces[piece.color()][piece.kind()].clear(square);
        self.colors[piece.color()].clear(square);
        self.occupied.clear(square);
        Some(piece)
    }

    /// Square of the piece removed by `mv`, which differs from its destination only for en passant.
    #[inline(always)]
    fn victim_square(mv: Move, mover: Color) -> Square {
        if mv.is_en_passant() {
            mv.to().backward_by(mover, 1).unwrap_or(mv.to())
        } else {
            mv.to()
        }
    }

    /// Applies `mv` to the board, updating the key incrementally.
    ///
    /// No legality checks are made: `mv` must come from [`Board::legal_moves`] of this position.
    /// Use [`Board::apply_checked`] for moves from an untrusted source.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// let mv = Move::from_uci(&mut board, "e2e4").unwrap();
    /// board.apply(mv);
    /// assert_eq!(board.to_fen(), "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
    /// assert_eq!(board.key(), ZobristKey::new(&board));
    /// ```
    pub fn apply(&mut self, mv: Move) {
        let color = self.side_to_move;
        let piece = mv.piece();
        let (from, to) = (mv.from(), mv.to());
        debug_assert_eq!(self.piece_at(from), Some(piece), "{mv:?} on {}", self.to_fen());

        self.history.push(Snapshot {
            mv,
            castling: self.castling,
            ep_square: self.ep_square,
            halfmove: self.halfmove,
            fullmove: self.fullmove,
            key: self.key,
        });

        self.key.hash_optional_ep_square(self.ep_square.take());

        if let Some(captured) = mv.captured() {
            let victim = Self::victim_square(mv, color);
            self.take(victim);
            self.key
                .hash_piece(victim, Piece::new(color.opponent(), captured));
        }

        self.take(from);
        self.key.hash_piece(from, piece);

        let placed = match mv.promotion() {
            Some(kind) => piece.promoted(kind),
            None => piece,
        };
        self.place(placed, to);
        self.key.hash_piece(to, placed);

        if let Some(side) = mv.castle_side() {
            let rook = Piece::new(color, PieceKind::Rook);
            let (rook_from, rook_to) = (side.rook_origin(color), side.rook_destination(color));
            self.take(rook_from);
            self.place(rook, rook_to);
            self.key.hash_piece(rook_from, rook);
            self.key.hash_piece(rook_to, rook);
        }

        // The target is only recorded when an enemy Pawn can take it
        if mv.is_pawn_double_push() {
            self.ep_square = from
                .forward_by(color, 1)
                .filter(|&sq| self.can_capture_en_passant(sq, color.opponent()));
            self.key.hash_optional_ep_square(self.ep_square);
        }

        let old_rights = self.castling;
        self.castling.retain(CastlingRights::surviving(from));
        self.castling.retain(CastlingRights::surviving(to));
        self.key.hash_castling_change(old_rights, self.castling);

        if mv.is_capture() || piece.is_pawn() {
            self.halfmove = 0;
        } else {
            self.halfmove += 1;
        }

        if color == Color::Black {
            self.fullmove += 1;
        }

        self.side_to_move = color.opponent();
        self.key.hash_side_to_move();
    }

    /// Applies `mv` only if it is legal in this position.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// let e2e4 = Move::new(Square::E2, Square::E4, Piece::WHITE_PAWN, MoveKind::PawnDoublePush, None, None);
    /// let e2e5 = Move::new(Square::E2, Square::E5, Piece::WHITE_PAWN, MoveKind::Quiet, None, None);
    /// assert!(board.apply_checked(e2e5).is_err());
    /// assert!(board.apply_checked(e2e4).is_ok());
    /// ```
    pub fn apply_checked(&mut self, mv: Move) -> Result<()> {
        if !self.legal_moves().contains(&mv) {
            bail!("{mv:?} is not legal in {}", self.to_fen());
        }
        self.apply(mv);
        Ok(())
    }

    /// Parses `uci` against this position's legal moves and applies it, returning the parsed move.
    pub fn apply_uci(&mut self, uci: &str) -> Result<Move> {
        let mv = Move::from_uci(self, uci)?;
        self.apply(mv);
        Ok(mv)
    }

    /// Takes back the last applied move, returning it.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// assert!(board.undo().is_err());
    ///
    /// let before = board.clone();
    /// board.apply_uci("g1f3").unwrap();
    /// assert_eq!(board.undo().unwrap().to_string(), "g1f3");
    /// assert_eq!(board, before);
    /// ```
    pub fn undo(&mut self) -> Result<Move> {
        self.pop_move()
            .ok_or(anyhow!("No moves to undo in {}", self.to_fen()))
    }

    /// Takes back the last applied move, if there is one.
    ///
    /// Used on the hot paths, where every call is paired with an [`Board::apply`].
    #[inline(always)]
    pub(crate) fn pop_move(&mut self) -> Option<Move> {
        let snapshot = self.history.pop()?;

        let mv = snapshot.mv;
        let color = self.side_to_move.opponent();
        let (from, to) = (mv.from(), mv.to());

        if let Some(side) = mv.castle_side() {
            let rook = Piece::new(color, PieceKind::Rook);
            let (rook_from, rook_to) = (side.rook_origin(color), side.rook_destination(color));
            self.take(rook_to);
            self.place(rook, rook_from);
            self.key.hash_piece(rook_to, rook);
            self.key.hash_piece(rook_from, rook);
        }

        if let Some(placed) = self.take(to) {
            self.key.hash_piece(to, placed);
        }
        self.place(mv.piece(), from);
        self.key.hash_piece(from, mv.piece());

        if let Some(captured) = mv.captured() {
            let victim = Self::victim_square(mv, color);
            let piece = Piece::new(color.opponent(), captured);
            self.place(piece, victim);
            self.key.hash_piece(victim, piece);
        }

        self.key.hash_castling_change(self.castling, snapshot.castling);
        self.key.hash_optional_ep_square(self.ep_square);
        self.key.hash_optional_ep_square(snapshot.ep_square);
        self.key.hash_side_to_move();
        debug_assert_eq!(self.key, snapshot.key, "{mv:?} on {}", self.to_fen());

        self.side_to_move = color;
        self.castling = snapshot.castling;
        self.ep_square = snapshot.ep_square;
        self.halfmove = snapshot.halfmove;
        self.fullmove = snapshot.fullmove;

        Some(mv)
    }

    /// Returns `true` if this position already occurred since the last irreversible move.
    ///
    /// Inside a search a single earlier occurrence is enough to score the node as a draw,
    /// since the side that repeated could repeat again.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// for mv in ["b1a3", "b8a6", "a3b1"] {
    ///     board.apply_uci(mv).unwrap();
    ///     assert!(!board.is_repetition());
    /// }
    /// board.apply_uci("a6b8").unwrap();
    /// assert!(board.is_repetition());
    /// ```
    pub fn is_repetition(&self) -> bool {
        self.earlier_occurrences().next().is_some()
    }

    /// Returns `true` if this position has occurred at least three times, counting this one.
    pub fn is_threefold_repetition(&self) -> bool {
        self.earlier_occurrences().count() >= 2
    }

    /// Keys of earlier positions with the same side to move and no irreversible move in between,
    /// filtered to those equal to the current key.
    fn earlier_occurrences(&self) -> impl Iterator<Item = &Snapshot> + '_ {
        self.history
            .iter()
            .rev()
            .take(self.halfmove)
            .skip(1)
            .step_by(2)
            .filter(|snapshot| snapshot.key == self.key)
    }

    /// Returns `true` if the half-move counter is 100 or greater.
    ///
    /// Since "half-move" increases with ply, the 50-move rule takes effect at 100 ply.
    #[inline(always)]
    pub const fn can_draw_by_fifty(&self) -> bool {
        self.halfmove >= 100
    }

    /// Returns `true` if there is insufficient material on the board to cause a checkmate.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// // Lone Kings
    /// let kk: Board = "8/4k3/8/8/3K4/8/8/8 w - - 0 1".parse().unwrap();
    /// assert!(kk.can_draw_by_insufficient_material());
    ///
    /// // A single Knight
    /// let knk: Board = "8/4k3/2n5/8/3K4/8/8/8 w - - 0 1".parse().unwrap();
    /// assert!(knk.can_draw_by_insufficient_material());
    ///
    /// // Opposing Bishops on the same color square
    /// let same_square_bishops: Board = "8/2b1k3/8/8/3K4/8/5B2/8 w - - 0 1".parse().unwrap();
    /// assert!(same_square_bishops.can_draw_by_insufficient_material());
    ///
    /// // Opposing Bishops on different color squares
    /// let diff_square_bishops: Board = "8/3bk3/8/8/3K4/8/5B2/8 w - - 0 1".parse().unwrap();
    /// assert!(!diff_square_bishops.can_draw_by_insufficient_material());
    /// ```
    pub fn can_draw_by_insufficient_material(&self) -> bool {
        if (self.kind(PieceKind::Queen) | self.kind(PieceKind::Rook) | self.kind(PieceKind::Pawn))
            .is_nonempty()
        {
            return false;
        }

        let wb = self.piece_parts(Color::White, PieceKind::Bishop);
        let wn = self.piece_parts(Color::White, PieceKind::Knight);
        let bb = self.piece_parts(Color::Black, PieceKind::Bishop);
        let bn = self.piece_parts(Color::Black, PieceKind::Knight);

        match (
            wb.population(),
            wn.population(),
            bb.population(),
            bn.population(),
        ) {
            // Lone kings, or a single minor piece
            (0, 0, 0, 0) | (1, 0, 0, 0) | (0, 0, 1, 0) | (0, 1, 0, 0) | (0, 0, 0, 1) => true,

            // One Bishop each, on the same color
            (1, 0, 1, 0) => wb.to_square_unchecked().is_dark() == bb.to_square_unchecked().is_dark(),

            _ => false,
        }
    }

    /// Determines whether the game is over, and how.
    ///
    /// Checkmate and stalemate take precedence over the draw rules.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut mated: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3".parse().unwrap();
    /// assert_eq!(mated.status(), GameStatus::Checkmate { winner: Color::Black });
    ///
    /// let mut stalemate: Board = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1".parse().unwrap();
    /// assert_eq!(stalemate.status(), GameStatus::Stalemate);
    ///
    /// assert_eq!(Board::default().status(), GameStatus::Ongoing);
    /// ```
    pub fn status(&mut self) -> GameStatus {
        if self.legal_moves().is_empty() {
            return if self.is_in_check() {
                GameStatus::Checkmate {
                    winner: self.side_to_move.opponent(),
                }
            } else {
                GameStatus::Stalemate
            };
        }

        if self.can_draw_by_fifty() {
            GameStatus::Draw(DrawReason::FiftyMoves)
        } else if self.is_threefold_repetition() {
            GameStatus::Draw(DrawReason::Repetition)
        } else if self.can_draw_by_insufficient_material() {
            GameStatus::Draw(DrawReason::InsufficientMaterial)
        } else {
            GameStatus::Ongoing
        }
    }
}

impl FromStr for Board {
    type Err = anyhow::Error;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl Default for Board {
    #[inline(always)]
    fn default() -> Self {
        // Safety: The FEN for startpos is always valid
        unsafe { Self::from_fen(FEN_STARTPOS).unwrap_unchecked() }
    }
}

impl fmt::Display for Board {
    /// Display this position's FEN string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

impl fmt::Debug for Board {
    /// Draws the board, with the remaining state printed alongside it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in Rank::iter().rev() {
            write!(f, "{rank}|")?;
            for file in File::iter() {
                let piece = self.piece_at(Square::new(file, rank));
                let piece_char = piece.map(|p| p.to_uci()).unwrap_or('.');
                write!(f, " {piece_char}")?;
            }

            if rank == Rank::SEVEN {
                write!(f, "           FEN: {}", self.to_fen())?;
            } else if rank == Rank::SIX {
                write!(f, "          Side: {}", self.side_to_move.name())?;
            } else if rank == Rank::FIVE {
                write!(f, "      Castling: {}", self.castling)?;
            } else if rank == Rank::FOUR {
                let ep = self
                    .ep_square
                    .map(|t| t.to_string())
                    .unwrap_or(String::from("-"));
                write!(f, "            EP: {ep}")?;
            } else if rank == Rank::THREE {
                write!(f, "     Half-move: {}", self.halfmove)?;
            } else if rank == Rank::TWO {
                write!(f, "     Full-move: {}", self.fullmove)?;
            } else if rank == Rank::ONE {
                write!(f, "           Key: {}", self.key)?;
            }
            writeln!(f)?;
        }
        write!(f, " +")?;
        for _ in File::iter() {
            write!(f, "--")?;
        }
        write!(f, "\n   ")?;
        for file in File::iter() {
            write!(f, "{file} ")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MoveKind;

    /// Applies every legal move, checks the key, recurses, and checks that undo restores everything.
    fn check_apply_undo(board: &mut Board, depth: usize) {
        if depth == 0 {
            return;
        }

        for mv in board.legal_moves() {
            let before = board.clone();
            board.apply(mv);
            assert_eq!(board.key(), ZobristKey::new(board), "Key drifted after {mv:?}");
            assert_eq!(board.color(Color::White) | board.color(Color::Black), board.occupied());
            assert!(board.color(Color::White).and(board.color(Color::Black)).is_empty());

            check_apply_undo(board, depth - 1);

            assert_eq!(board.undo().unwrap(), mv);
            assert_eq!(board.key(), ZobristKey::new(board), "Key drifted undoing {mv:?}");
            assert_eq!(*board, before, "Undo of {mv:?} did not restore the board");
        }
    }

    #[test]
    fn test_undo_unhashes_every_move_kind() {
        for (fen, uci) in [
            ("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "e1g1"),
            ("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1", "e8c8"),
            ("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2", "e5d6"),
            ("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1", "a7b8q"),
            ("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1", "e2e4"),
            ("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1", "e2e4"),
            ("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", "a1a8"),
        ] {
            let mut board = Board::from_fen(fen).unwrap();
            let key = board.key();
            board.apply_uci(uci).unwrap();
            assert_ne!(board.key(), key, "{uci} on {fen}");

            board.undo().unwrap();
            assert_eq!(board.key(), key, "{uci} on {fen}");
            assert_eq!(board.key(), ZobristKey::new(&board), "{uci} on {fen}");
            assert_eq!(board.to_fen(), fen);
        }
    }

    #[test]
    fn test_apply_undo_identity() {
        for fen in [
            FEN_STARTPOS,
            FEN_KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        ] {
            let mut board = Board::from_fen(fen).unwrap();
            check_apply_undo(&mut board, 3);
            assert_eq!(board.to_fen(), fen);
        }
    }

    #[test]
    fn test_hash_consistency_over_long_sequence() {
        let mut board = Board::from_fen(FEN_KIWIPETE).unwrap();
        let start = board.key();

        // A deterministic walk: always play the move at index (ply * 7) % len
        for ply in 0..60 {
            let moves = board.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[(ply * 7) % moves.len()];
            board.apply(mv);
            assert_eq!(board.key(), ZobristKey::new(&board));
        }

        while board.undo().is_ok() {
            assert_eq!(board.key(), ZobristKey::new(&board));
        }
        assert_eq!(board.key(), start);
        assert_eq!(board.to_fen(), FEN_KIWIPETE);
    }

    #[test]
    fn test_transposition_has_same_key() {
        let mut a = Board::default();
        let mut b = Board::default();
        for mv in ["g1f3", "g8f6", "b1c3", "b8c6"] {
            a.apply_uci(mv).unwrap();
        }
        for mv in ["b1c3", "b8c6", "g1f3", "g8f6"] {
            b.apply_uci(mv).unwrap();
        }
        assert_eq!(a.key(), b.key());
        assert_eq!(a.to_fen(), b.to_fen());
    }

    #[test]
    fn test_ep_square_only_after_double_push() {
        let mut board = Board::default();
        for mv in ["e2e4", "a7a6", "e4e5"] {
            board.apply_uci(mv).unwrap();
        }
        assert_eq!(board.ep_square(), None);
        board.apply_uci("d7d5").unwrap();
        assert_eq!(board.ep_square(), Some(Square::D6));
        board.apply_uci("a2a3").unwrap();
        assert_eq!(board.ep_square(), None);
    }

    #[test]
    fn test_ep_square_needs_a_capturer() {
        let mut board = Board::default();
        board.apply_uci("e2e4").unwrap();
        assert_eq!(board.ep_square(), None);
        assert_eq!(board.key(), ZobristKey::new(&board));

        // Pawns still on the fourth rank are too far back to capture
        let mut board: Board = "4k3/p3p3/8/8/5P1P/8/8/4K3 b - - 0 1".parse().unwrap();
        board.apply_uci("e7e5").unwrap();
        assert_eq!(board.ep_square(), None);
        board.apply_uci("f4f5").unwrap();
        board.apply_uci("a7a5").unwrap();
        assert_eq!(board.ep_square(), None);

        let mut board: Board = "4k3/4p3/8/5P2/8/8/8/4K3 b - - 0 1".parse().unwrap();
        board.apply_uci("e7e5").unwrap();
        assert_eq!(board.ep_square(), Some(Square::E6));
        assert_eq!(board.to_fen(), "4k3/8/8/4pP2/8/8/8/4K3 w - e6 0 2");
    }

    #[test]
    fn test_fen_drops_uncapturable_ep_square() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert_eq!(board.ep_square(), None);
        assert_eq!(
            board.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );

        let mut played = Board::default();
        played.apply_uci("e2e4").unwrap();
        assert_eq!(board.key(), played.key());
    }

    #[test]
    fn test_double_push_then_shuffle_repeats() {
        let mut board = Board::default();
        for mv in ["e2e4", "e7e5"] {
            board.apply_uci(mv).unwrap();
        }
        let key = board.key();
        let fen = board.to_fen();

        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            board.apply_uci(mv).unwrap();
        }
        assert_eq!(board.key(), key);
        assert_eq!(board.to_fen(), fen);
        assert!(board.is_repetition());
    }

    #[test]
    fn test_en_passant_only_on_next_ply() {
        let mut board: Board = "4k3/3p4/8/4P3/8/8/8/4K3 b - - 0 1".parse().unwrap();
        board.apply_uci("d7d5").unwrap();
        assert!(Move::from_uci(&mut board, "e5d6").is_ok());

        // Make the capture and check the victim is removed
        let mut captured = board.clone();
        captured.apply_uci("e5d6").unwrap();
        assert_eq!(captured.piece_at(Square::D5), None);
        assert_eq!(captured.piece_at(Square::D6), Some(Piece::WHITE_PAWN));
        assert_eq!(captured.halfmove(), 0);
        captured.undo().unwrap();
        assert_eq!(captured, board);

        // Waiting a move forfeits the right
        board.apply_uci("e1e2").unwrap();
        board.apply_uci("e8e7").unwrap();
        assert!(Move::from_uci(&mut board, "e5d6").is_err());
    }

    #[test]
    fn test_castling_rights_update_on_king_move() {
        let mut board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        board.apply_uci("e1e2").unwrap();
        assert_eq!(board.castling_rights().to_uci(), "kq");
        board.apply_uci("e8d8").unwrap();
        assert_eq!(board.castling_rights().to_uci(), "-");
    }

    #[test]
    fn test_castling_rights_update_on_rook_captured() {
        let mut board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        board.apply_uci("a1a8").unwrap();
        assert_eq!(board.castling_rights().to_uci(), "Kk");
        assert_eq!(board.key(), ZobristKey::new(&board));
    }

    #[test]
    fn test_castling_rights_lost_after_rook_round_trip() {
        let mut board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        board.apply_uci("h1h2").unwrap();
        board.apply_uci("a8a7").unwrap();
        board.apply_uci("h2h1").unwrap();
        board.apply_uci("a7a8").unwrap();

        // Same placement as the start, but rights never come back
        assert_eq!(board.castling_rights().to_uci(), "Qk");
        assert!(Move::from_uci(&mut board, "e1g1").is_err());
        assert!(Move::from_uci(&mut board, "e1c1").is_ok());
    }

    #[test]
    fn test_castling_moves_rook() {
        let mut board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let mv = board.apply_uci("e1g1").unwrap();
        assert_eq!(mv.kind(), MoveKind::ShortCastle);
        assert_eq!(board.piece_at(Square::G1), Some(Piece::WHITE_KING));
        assert_eq!(board.piece_at(Square::F1), Some(Piece::WHITE_ROOK));
        assert_eq!(board.piece_at(Square::H1), None);

        let mv = board.apply_uci("e8c8").unwrap();
        assert_eq!(mv.kind(), MoveKind::LongCastle);
        assert_eq!(board.piece_at(Square::C8), Some(Piece::BLACK_KING));
        assert_eq!(board.piece_at(Square::D8), Some(Piece::BLACK_ROOK));
        assert_eq!(board.piece_at(Square::A8), None);
        assert_eq!(board.castling_rights(), CastlingRights::NONE);
        assert_eq!(board.key(), ZobristKey::new(&board));
    }

    #[test]
    fn test_promotion_and_counters() {
        let mut board: Board = "4k3/1P6/8/8/8/8/8/4K3 w - - 12 40".parse().unwrap();
        board.apply_uci("b7b8q").unwrap();
        assert_eq!(board.piece_at(Square::B8), Some(Piece::WHITE_QUEEN));
        assert_eq!(board.halfmove(), 0);
        assert_eq!(board.fullmove(), 40);

        board.apply_uci("e8e7").unwrap();
        assert_eq!(board.halfmove(), 1);
        assert_eq!(board.fullmove(), 41);

        board.undo().unwrap();
        board.undo().unwrap();
        assert_eq!(board.to_fen(), "4k3/1P6/8/8/8/8/8/4K3 w - - 12 40");
    }

    #[test]
    fn test_fen_errors() {
        // Bad placements
        assert!(Board::from_fen("").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/4K3 w - - 0 1").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K4 w - - 0 1").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4X3 w - - 0 1").is_err());
        assert!(Board::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1").is_err());
        assert!(Board::from_fen("P3k3/8/8/8/8/8/8/4K3 w - - 0 1").is_err());

        // Bad fields
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w X - 0 1").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w K - 0 1").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - e3 0 1").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - x 1").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 0").is_err());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1 extra").is_err());

        // Side not to move is in check
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 0 1").is_ok());
        assert!(Board::from_fen("4k3/8/8/8/8/8/8/4R2K w - - 0 1").is_err());
    }

    #[test]
    fn test_threefold_repetition() {
        let mut board = Board::default();
        for _ in 0..2 {
            for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                assert!(!board.is_threefold_repetition());
                board.apply_uci(mv).unwrap();
            }
        }
        assert!(board.is_threefold_repetition());
        assert_eq!(board.status(), GameStatus::Draw(DrawReason::Repetition));
    }

    #[test]
    fn test_repetition_window_resets_on_pawn_move() {
        let mut board = Board::default();
        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            board.apply_uci(mv).unwrap();
        }
        assert!(board.is_repetition());

        for mv in ["e2e4", "e7e5", "g1f3", "g8f6", "f3g1", "f6g8"] {
            board.apply_uci(mv).unwrap();
        }
        // The position after e5 repeats, but the start position is out of reach
        assert!(board.is_repetition());
        assert!(!board.is_threefold_repetition());
    }

    #[test]
    fn test_fifty_move_status() {
        let mut board: Board = "4k3/8/8/8/8/8/8/R3K3 w - - 99 80".parse().unwrap();
        assert!(!board.can_draw_by_fifty());
        board.apply_uci("a1a2").unwrap();
        assert!(board.can_draw_by_fifty());
        assert_eq!(board.status(), GameStatus::Draw(DrawReason::FiftyMoves));
    }

    #[test]
    fn test_mate_beats_fifty_move_rule() {
        let mut board: Board = "7k/6Q1/6K1/8/8/8/8/8 b - - 100 80".parse().unwrap();
        assert_eq!(board.status(), GameStatus::Checkmate { winner: Color::White });
    }
}
