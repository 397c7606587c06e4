/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Board representation, move generation, and everything else about the rules of chess.
mod board;

/// Parsing of the commands the engine accepts.
mod cli;

/// Code related to the engine's functionality, such as user input handling.
mod engine;

/// Evaluation of chess positions.
mod eval;

/// Move ordering and lazy move selection.
mod ordering;

/// Piece-Square tables.
mod psqt;

/// Search scores, including mate scores.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Transposition table.
mod ttable;

/// Misc utility functions, constants, and types.
mod utils;

pub use board::*;
pub use cli::*;
pub use engine::*;
pub use eval::*;
pub use ordering::*;
pub use psqt::*;
pub use score::*;
pub use search::*;
pub use ttable::*;
pub use utils::*;
