/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use anyhow::{bail, Result};

use super::{
    Bitboard, Board, CastleSide, CastlingRights, Color, Move, MoveKind, MoveList, Piece,
    PieceKind, Rank, Square,
};

/// Deltas for the movement of the Queen, ordered so that each direction's opposite is 4 entries away.
///
/// The first four point towards higher square indices.
const QUEEN_DELTAS: [(i8, i8); 8] = [
    /* Increasing */
    (0, 1),
    (1, 1),
    (1, 0),
    (-1, 1),
    /* Decreasing */
    (0, -1),
    (-1, -1),
    (-1, 0),
    (1, -1),
];

/// Indices into [`QUEEN_DELTAS`] for the Rook's directions.
const ROOK_DIRECTIONS: [usize; 4] = [0, 2, 4, 6];

/// Indices into [`QUEEN_DELTAS`] for the Bishop's directions.
const BISHOP_DIRECTIONS: [usize; 4] = [1, 3, 5, 7];

/// Deltas for the movement of the Knight.
const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (1, 2),
    (1, -2),
    (2, 1),
    (2, -1),
    (-1, 2),
    (-1, -2),
    (-2, 1),
    (-2, -1),
];

const KNIGHT_ATTACKS: [Bitboard; Square::COUNT] = generate_leaper_mobility(&KNIGHT_DELTAS);
const KING_ATTACKS: [Bitboard; Square::COUNT] = generate_leaper_mobility(&QUEEN_DELTAS);
const PAWN_ATTACKS: [[Bitboard; Square::COUNT]; Color::COUNT] = [
    generate_pawn_attacks(Color::White),
    generate_pawn_attacks(Color::Black),
];

/// For every direction and square, the unblocked ray leaving that square (exclusive).
const RAYS: [[Bitboard; Square::COUNT]; 8] = generate_rays();

/// Fetch the raw, unblocked attacks for a knight on the provided square.
#[inline(always)]
pub const fn knight_attacks(square: Square) -> Bitboard {
    KNIGHT_ATTACKS[square.index()]
}

/// Fetch the raw, unblocked attacks for a king on the provided square.
#[inline(always)]
pub const fn king_attacks(square: Square) -> Bitboard {
    KING_ATTACKS[square.index()]
}

/// Fetch the squares a pawn of the provided color attacks from the provided square.
///
/// # Example
/// ```
/// # use newt::*;
/// let attacks = pawn_attacks(Square::A2, Color::White);
/// assert_eq!(attacks, Square::B3.bitboard());
/// ```
#[inline(always)]
pub const fn pawn_attacks(square: Square, color: Color) -> Bitboard {
    PAWN_ATTACKS[color.index()][square.index()]
}

/// Squares reached by walking from `square` in `direction` until the first blocker, inclusive.
///
/// The precomputed ray is cut off at its first occupied square: the nearest blocker is the
/// lowest set bit for increasing directions and the highest for decreasing ones.
#[inline(always)]
const fn ray_attacks(direction: usize, square: Square, blockers: Bitboard) -> Bitboard {
    let ray = RAYS[direction][square.index()];
    let hits = ray.and(blockers);

    let nearest = if direction < 4 { hits.lsb() } else { hits.msb() };
    match nearest {
        Some(blocker) => Bitboard::new(ray.inner() ^ RAYS[direction][blocker.index()].inner()),
        None => ray,
    }
}

/// Computes the possible moves for a Rook at a given [`Square`] with the provided blockers.
///
/// This will yield a [`Bitboard`] that allows the Rook to capture the first blocker.
///
/// # Example
/// ```
/// # use newt::*;
/// let blockers = Square::D6.bitboard() | Square::F4.bitboard();
/// let attacks = rook_attacks(Square::D4, blockers);
/// assert!(attacks.contains(Square::D6));
/// assert!(!attacks.contains(Square::D7));
/// assert!(attacks.contains(Square::F4));
/// assert!(!attacks.contains(Square::G4));
/// assert!(attacks.contains(Square::D1));
/// assert!(attacks.contains(Square::A4));
/// assert_eq!(attacks.population(), 10);
/// ```
#[inline(always)]
pub const fn rook_attacks(square: Square, blockers: Bitboard) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;
    let mut i = 0;
    while i < ROOK_DIRECTIONS.len() {
        attacks = attacks.or(ray_attacks(ROOK_DIRECTIONS[i], square, blockers));
        i += 1;
    }
    attacks
}

/// Computes the possible moves for a Bishop at a given [`Square`] with the provided blockers.
///
/// This will yield a [`Bitboard`] that allows the Bishop to capture the first blocker.
#[inline(always)]
pub const fn bishop_attacks(square: Square, blockers: Bitboard) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;
    let mut i = 0;
    while i < BISHOP_DIRECTIONS.len() {
        attacks = attacks.or(ray_attacks(BISHOP_DIRECTIONS[i], square, blockers));
        i += 1;
    }
    attacks
}

/// Computes the possible moves for a Queen at a given [`Square`] with the provided blockers.
#[inline(always)]
pub const fn queen_attacks(square: Square, blockers: Bitboard) -> Bitboard {
    rook_attacks(square, blockers).or(bishop_attacks(square, blockers))
}

/// Squares attacked by `piece` standing on `square`, given the pieces in `blockers`.
///
/// Pawn pushes are not attacks, so only the diagonal captures are included for Pawns.
#[inline(always)]
pub const fn attacks_for(piece: Piece, square: Square, blockers: Bitboard) -> Bitboard {
    match piece.kind() {
        PieceKind::Pawn => pawn_attacks(square, piece.color()),
        PieceKind::Knight => knight_attacks(square),
        PieceKind::Bishop => bishop_attacks(square, blockers),
        PieceKind::Rook => rook_attacks(square, blockers),
        PieceKind::Queen => queen_attacks(square, blockers),
        PieceKind::King => king_attacks(square),
    }
}

/// Generates the moves from every location for the "Leaper" pieces.
/// Leapers may "leap" or "jump" to a square a specified distance away.
///
/// In standard chess, the Leapers are the King and Knight.
const fn generate_leaper_mobility(deltas: &[(i8, i8)]) -> [Bitboard; Square::COUNT] {
    let mut mobility = [Bitboard::EMPTY; Square::COUNT];

    let mut i = 0;
    while i < Square::COUNT {
        let square = Square::from_index_unchecked(i);
        let mut movement = Bitboard::EMPTY;

        let mut j = 0;
        while j < deltas.len() {
            let (df, dr) = deltas[j];
            if let Some(shifted) = square.offset(df, dr) {
                movement = movement.or(shifted.bitboard());
            }
            j += 1;
        }

        mobility[i] = movement;
        i += 1;
    }

    mobility
}

/// Generates the diagonal-forward captures of a Pawn of `color` from every square.
const fn generate_pawn_attacks(color: Color) -> [Bitboard; Square::COUNT] {
    let forward = match color {
        Color::White => 1,
        Color::Black => -1,
    };
    generate_leaper_mobility(&[(-1, forward), (1, forward)])
}

/// Walks each of the eight directions from every square until the edge of the board.
const fn generate_rays() -> [[Bitboard; Square::COUNT]; 8] {
    let mut rays = [[Bitboard::EMPTY; Square::COUNT]; 8];

    let mut dir = 0;
    while dir < QUEEN_DELTAS.len() {
        let (df, dr) = QUEEN_DELTAS[dir];

        let mut i = 0;
        while i < Square::COUNT {
            let mut ray = Square::from_index_unchecked(i);
            let mut movement = Bitboard::EMPTY;

            while let Some(shifted) = ray.offset(df, dr) {
                movement = movement.or(shifted.bitboard());
                ray = shifted;
            }

            rays[dir][i] = movement;
            i += 1;
        }

        dir += 1;
    }

    rays
}

/// Appends the moves of one piece to a list.
type Generator = fn(&Board, Square, Piece, &mut MoveList);

/// Per-kind generators, indexed by [`PieceKind::index`].
const GENERATORS: [Generator; PieceKind::COUNT] = [
    generate_pawn_moves,
    generate_knight_moves,
    generate_slider_moves,
    generate_slider_moves,
    generate_slider_moves,
    generate_king_moves,
];

/// Serializes a move to every square of `targets`, as a capture if an enemy stands there.
#[inline(always)]
fn serialize_targets(board: &Board, from: Square, piece: Piece, targets: Bitboard, moves: &mut MoveList) {
    for to in targets {
        let mv = match board.piece_at(to) {
            Some(victim) => Move::new(from, to, piece, MoveKind::Capture, Some(victim.kind()), None),
            None => Move::new(from, to, piece, MoveKind::Quiet, None, None),
        };
        moves.push(mv);
    }
}

fn generate_knight_moves(board: &Board, from: Square, piece: Piece, moves: &mut MoveList) {
    let targets = knight_attacks(from) & !board.color(piece.color());
    serialize_targets(board, from, piece, targets, moves);
}

/// Bishops, Rooks, and Queens: every ray runs until it meets a piece, capturing it if it is an enemy.
fn generate_slider_moves(board: &Board, from: Square, piece: Piece, moves: &mut MoveList) {
    let targets = attacks_for(piece, from, board.occupied()) & !board.color(piece.color());
    serialize_targets(board, from, piece, targets, moves);
}

fn generate_king_moves(board: &Board, from: Square, piece: Piece, moves: &mut MoveList) {
    let color = piece.color();
    let targets = king_attacks(from) & !board.color(color);
    serialize_targets(board, from, piece, targets, moves);

    for side in [CastleSide::Short, CastleSide::Long] {
        if board.can_castle(color, side) {
            let to = side.king_destination(color);
            let kind = match side {
                CastleSide::Short => MoveKind::ShortCastle,
                CastleSide::Long => MoveKind::LongCastle,
            };
            moves.push(Move::new(from, to, piece, kind, None, None));
        }
    }
}

fn generate_pawn_moves(board: &Board, from: Square, piece: Piece, moves: &mut MoveList) {
    let color = piece.color();
    let promotion_rank = Rank::promotion(color);

    // Adds one move per promotion kind when the Pawn lands on its last rank
    let mut push = |to: Square, captured: Option<PieceKind>, kind: MoveKind| {
        if to.rank() == promotion_rank {
            let kind = if captured.is_some() {
                MoveKind::CaptureAndPromotion
            } else {
                MoveKind::Promotion
            };
            for promotion in PieceKind::PROMOTIONS {
                moves.push(Move::new(from, to, piece, kind, captured, Some(promotion)));
            }
        } else {
            moves.push(Move::new(from, to, piece, kind, captured, None));
        }
    };

    if let Some(single) = from.forward_by(color, 1) {
        if board.piece_at(single).is_none() {
            push(single, None, MoveKind::Quiet);

            if from.rank() == Rank::pawn_start(color) {
                if let Some(double) = from.forward_by(color, 2) {
                    if board.piece_at(double).is_none() {
                        push(double, None, MoveKind::PawnDoublePush);
                    }
                }
            }
        }
    }

    let enemies = board.color(color.opponent());
    for to in pawn_attacks(from, color) & enemies {
        let victim = board.piece_at(to).map(|p| p.kind());
        push(to, victim, MoveKind::Capture);
    }

    if let Some(ep_square) = board.ep_square() {
        if pawn_attacks(from, color).contains(ep_square) {
            push(ep_square, Some(PieceKind::Pawn), MoveKind::EnPassantCapture);
        }
    }
}

impl Board {
    /// Returns `true` if any piece of `attacker` attacks `square`.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let board = Board::default();
    /// assert!(board.is_square_attacked(Square::F3, Color::White));
    /// assert!(!board.is_square_attacked(Square::E4, Color::White));
    /// assert!(board.is_square_attacked(Square::F6, Color::Black));
    /// ```
    pub fn is_square_attacked(&self, square: Square, attacker: Color) -> bool {
        self.attackers_of(square, attacker).is_nonempty()
    }

    /// All pieces of `attacker` that attack `square`.
    pub fn attackers_of(&self, square: Square, attacker: Color) -> Bitboard {
        let blockers = self.occupied();
        let queens = self.piece_parts(attacker, PieceKind::Queen);
        let diagonal = self.piece_parts(attacker, PieceKind::Bishop) | queens;
        let orthogonal = self.piece_parts(attacker, PieceKind::Rook) | queens;

        // A Pawn of `attacker` attacks `square` exactly when a Pawn of the other color on `square` would attack it back
        (pawn_attacks(square, attacker.opponent()) & self.piece_parts(attacker, PieceKind::Pawn))
            | (knight_attacks(square) & self.piece_parts(attacker, PieceKind::Knight))
            | (king_attacks(square) & self.piece_parts(attacker, PieceKind::King))
            | (bishop_attacks(square, blockers) & diagonal)
            | (rook_attacks(square, blockers) & orthogonal)
    }

    /// Pieces giving check to the side to move.
    pub fn checkers(&self) -> Bitboard {
        match self.king_square(self.side_to_move()) {
            Some(king) => self.attackers_of(king, self.side_to_move().opponent()),
            None => Bitboard::EMPTY,
        }
    }

    /// Returns `true` if the side-to-move is currently in check.
    #[inline(always)]
    pub fn is_in_check(&self) -> bool {
        self.checkers().is_nonempty()
    }

    /// Returns `true` if `color` may castle towards `side` right now.
    ///
    /// Requires the castling right, empty squares between King and Rook, and that the King is not
    /// in check, does not pass through an attacked square, and does not land on one.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// // The Black Rook on f8 covers f1, which the King must cross to castle short
    /// let board: Board = "4kr2/8/8/8/8/8/8/R3K2R w KQ - 0 1".parse().unwrap();
    /// assert!(!board.can_castle(Color::White, CastleSide::Short));
    /// assert!(board.can_castle(Color::White, CastleSide::Long));
    /// ```
    pub fn can_castle(&self, color: Color, side: CastleSide) -> bool {
        if !self.castling_rights().has(color, side) {
            return false;
        }

        if side.empty_squares(color).intersects(self.occupied()) {
            return false;
        }

        debug_assert_eq!(
            self.piece_at(side.rook_origin(color)),
            Some(Piece::new(color, PieceKind::Rook)),
            "{} has right {} without its Rook",
            self.to_fen(),
            CastlingRights::flag(color, side)
        );

        let enemy = color.opponent();
        let king = Square::E1.rank_relative_to(color);
        [king, side.king_transit(color), side.king_destination(color)]
            .into_iter()
            .all(|square| !self.is_square_attacked(square, enemy))
    }

    /// Generates every move for the side to move that obeys piece movement rules,
    /// without checking whether it leaves the mover's King in check.
    pub fn pseudo_legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        for square in self.color(self.side_to_move()) {
            self.generate_moves_from(square, &mut moves);
        }
        moves
    }

    /// Dispatches to the generator for the piece on `square`, if any.
    #[inline(always)]
    fn generate_moves_from(&self, square: Square, moves: &mut MoveList) {
        if let Some(piece) = self.piece_at(square) {
            GENERATORS[piece.kind().index()](self, square, piece, moves);
        }
    }

    /// Removes every move from `moves` that would leave the mover's King attacked.
    ///
    /// Each move is applied, tested, and taken back, leaving the board as it was.
    fn retain_legal(&mut self, moves: &mut MoveList) {
        let mover = self.side_to_move();
        moves.retain(|mv| {
            self.apply(*mv);
            let is_legal = match self.king_square(mover) {
                Some(king) => !self.is_square_attacked(king, mover.opponent()),
                None => true,
            };
            self.pop_move();
            is_legal
        });
    }

    /// Generates all legal moves for the side to move.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// assert_eq!(board.legal_moves().len(), 20);
    ///
    /// let mut kiwipete = Board::from_fen(FEN_KIWIPETE).unwrap();
    /// assert_eq!(kiwipete.legal_moves().len(), 48);
    /// ```
    pub fn legal_moves(&mut self) -> MoveList {
        let mut moves = self.pseudo_legal_moves();
        self.retain_legal(&mut moves);
        moves
    }

    /// Generates all legal moves of the piece on `square`.
    ///
    /// Fails if `square` is empty. A piece that does not belong to the side to move has no moves.
    ///
    /// # Example
    /// ```
    /// # use newt::*;
    /// let mut board = Board::default();
    /// assert_eq!(board.legal_moves_from(Square::G1).unwrap().len(), 2);
    /// assert!(board.legal_moves_from(Square::G8).unwrap().is_empty());
    /// assert!(board.legal_moves_from(Square::E4).is_err());
    /// ```
    pub fn legal_moves_from(&mut self, square: Square) -> Result<MoveList> {
        let Some(piece) = self.piece_at(square) else {
            bail!("Cannot generate moves from empty square {square}");
        };

        let mut moves = MoveList::new();
        if piece.color() == self.side_to_move() {
            self.generate_moves_from(square, &mut moves);
            self.retain_legal(&mut moves);
        }

        Ok(moves)
    }

    /// Legal captures and promotions, or every legal move if the side to move is in check.
    ///
    /// These are the moves searched past the horizon.
    pub fn noisy_moves(&mut self) -> MoveList {
        let mut moves = self.legal_moves();
        if !self.is_in_check() {
            moves.retain(|mv| mv.is_capture() || mv.is_promotion());
        }
        moves
    }
}
