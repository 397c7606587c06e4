/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use super::Board;

/// Perform a perft at the specified depth, collecting only data about the number of possible positions (nodes).
///
/// This performs bulk counting, meaning that, at depth 1, it returns the number of available moves,
/// rather than making them, recursing again, and returning 1 for each terminal case.
///
/// The board is walked in place and is left exactly as it was found.
///
/// # Example
/// ```
/// # use newt::*;
/// let mut board = Board::default();
/// assert_eq!(perft(&mut board, 3), 8_902);
/// assert_eq!(board, Board::default());
/// ```
pub fn perft(board: &mut Board, depth: usize) -> u64 {
    // Bulk counting; no need to recurse again just to apply a singular move and return 1.
    if depth == 1 {
        return board.legal_moves().len() as u64;
    } else
    // Recursion limit; return 1, since we're fathoming this node.
    if depth == 0 {
        return 1;
    }

    board.legal_moves().into_iter().fold(0, |nodes, mv| {
        board.apply(mv);
        let new_nodes = perft(board, depth - 1);
        board.pop_move();
        nodes + new_nodes
    })
}

/// Perform a splitperft at the specified depth, printing the number of nodes reachable after
/// each move available at the root node, followed by the total.
pub fn splitperft(board: &mut Board, depth: usize) -> u64 {
    if depth == 0 {
        println!("\n{}", 1);
        return 1;
    }

    let total = board.legal_moves().into_iter().fold(0, |nodes, mv| {
        board.apply(mv);
        let new_nodes = perft(board, depth - 1);
        board.pop_move();

        println!("{mv}\t{new_nodes}");
        nodes + new_nodes
    });

    println!("\n{total}");
    total
}
