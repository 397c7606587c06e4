/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::{Board, Color, PieceKind, Psqt, Score};

/// Encapsulates the logic of scoring a chess position.
///
/// Evaluators are called only at the leaves of a search and during quiescence.
/// They must be stateless and symmetric: evaluating the same board for the other
/// perspective yields exactly the negated score.
///
/// Implementations are shared with the search thread, hence the `Send + Sync` bound.
pub trait Evaluator: fmt::Debug + Send + Sync {
    /// Evaluate `board` from `perspective`'s point of view.
    ///
    /// A positive number is good for `perspective`, while a negative number is better for its opponent.
    /// `ply` is the distance from the root of the search, for evaluators that care about it.
    fn evaluate(&self, board: &Board, perspective: Color, ply: usize) -> Score;
}

/// Counts material only, with the values of [`PieceKind::value`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MaterialEvaluator;

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, board: &Board, perspective: Color, _ply: usize) -> Score {
        let white = material_of(board, Color::White);
        let black = material_of(board, Color::Black);

        Score::new((white - black) * perspective.sign())
    }
}

/// Material plus the [Simplified Evaluation Function](https://www.chessprogramming.org/Simplified_Evaluation_Function)'s
/// Piece-Square tables.
///
/// This is the default evaluator.
///
/// # Example
/// ```
/// # use newt::*;
/// let board = Board::default();
/// let eval = PsqtEvaluator;
/// assert_eq!(eval.evaluate(&board, Color::White, 0), Score::DRAW);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PsqtEvaluator;

impl Evaluator for PsqtEvaluator {
    fn evaluate(&self, board: &Board, perspective: Color, _ply: usize) -> Score {
        let endgame = is_endgame(board);

        // From White's perspective
        let score = board.iter().fold(0, |score, (square, piece)| {
            let color = piece.color();
            let value = piece.kind().value()
                + Psqt::for_kind(piece.kind(), endgame).get_relative(square, color);

            score + value * color.sign()
        });

        Score::new(score * perspective.sign())
    }
}

/// Sums the material value of all of `color`'s pieces, including the king.
#[inline(always)]
fn material_of(board: &Board, color: Color) -> i32 {
    PieceKind::all().into_iter().fold(0, |total, kind| {
        total + board.piece_parts(color, kind).population() as i32 * kind.value()
    })
}

/// Returns `true` if kings should use their endgame table.
///
/// That is the case when both queens are off the board, or when every side that
/// still has a queen has at most one minor piece to go with it.
fn is_endgame(board: &Board) -> bool {
    Color::all().into_iter().all(|color| {
        let queens = board.piece_parts(color, PieceKind::Queen);
        let minors = board.piece_parts(color, PieceKind::Knight)
            | board.piece_parts(color, PieceKind::Bishop);

        queens.is_empty() || minors.population() <= 1
    })
}
