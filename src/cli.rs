/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{str::FromStr, time::Duration};

use clap::{builder::BoolishValueParser, ArgAction, Args, Parser};

use crate::{Color, MoveOrdering, SearchConfig, Square, MAX_DEPTH};

/// A command to be sent to the engine.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<ENGINE COMMAND>")
)]
pub enum EngineCommand {
    /// Toggle printing of extra diagnostics to `stderr`.
    Debug {
        /// `on` or `off`.
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },

    /// Print a visual representation of the current board state.
    #[command(alias = "d")]
    Display,

    /// Print the evaluator's score of the current position, for the side to move.
    Eval,

    /// Quit the engine.
    #[command(alias = "quit")]
    Exit {
        /// If set, the engine will await the completion of any search threads before exiting.
        #[arg(short, long, default_value = "false")]
        cleanup: bool,
    },

    /// Generate and print a FEN string for the current position.
    Fen,

    /// Search the current position, printing `info` lines for every completed depth and then `bestmove`.
    Go(GoArgs),

    /// Resize the transposition table, clearing it in the process.
    Hash {
        /// New size of the table, in megabytes.
        mb: usize,
    },

    /// Display information about the transposition table.
    #[command(aliases = ["tt", "ttable"])]
    HashInfo,

    /// Apply the provided moves to the current position, in order.
    ///
    /// Moves are given in UCI notation, and must be legal. If any move is rejected, none are applied.
    Move {
        #[arg(required = true)]
        moves: Vec<String>,
    },

    /// Shows all legal moves in the current position, or for a specific piece.
    Moves {
        square: Option<Square>,

        /// If set, moves will be sorted in alphabetical order.
        ///
        /// By default, moves are listed in the order they are generated.
        #[arg(short, long, default_value = "false")]
        sort: bool,
    },

    /// Clear the transposition table and reset to the starting position.
    #[command(alias = "ucinewgame")]
    NewGame,

    /// Performs a perft on the current position at the supplied depth, printing total node count.
    Perft { depth: usize },

    /// Set the current position.
    ///
    /// Usage: `position [startpos | kiwipete | fen <FEN>] [moves <MOVE>...]`
    Position {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Performs a split perft on the current position at the supplied depth.
    #[command(alias = "sperft")]
    Splitperft { depth: usize },

    /// Print whether the game is ongoing, and how it ended if it is not.
    Status,

    /// Signal the current search to stop as soon as possible.
    Stop,

    /// Take back the most recent move.
    Undo,

    /// Await the current search, blocking until it completes.
    ///
    /// This is primarily used when executing searches on startup,
    /// to await their results before doing something else.
    Wait,
}

impl FromStr for EngineCommand {
    type Err = clap::Error;
    /// Attempt to parse an [`EngineCommand`] from a string.
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse_from(s.split_ascii_whitespace())
    }
}

/// Limits and options for the `go` command.
///
/// All times are in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct GoArgs {
    /// Search no deeper than this many plies.
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Search for exactly this long.
    ///
    /// Takes precedence over the clock options.
    #[arg(long)]
    pub movetime: Option<u64>,

    /// White's remaining time.
    #[arg(long)]
    pub wtime: Option<u64>,

    /// Black's remaining time.
    #[arg(long)]
    pub btime: Option<u64>,

    /// White's increment per move.
    #[arg(long)]
    pub winc: Option<u64>,

    /// Black's increment per move.
    #[arg(long)]
    pub binc: Option<u64>,

    /// Stop after searching this many nodes.
    #[arg(short, long)]
    pub nodes: Option<u64>,

    /// How to order moves within the search.
    #[arg(short, long, value_enum)]
    pub ordering: Option<MoveOrdering>,

    /// Seed for breaking ties between equally-scored moves.
    ///
    /// Without one, ties are broken differently every search.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl GoArgs {
    /// Builds the [`SearchConfig`] described by these arguments, for a search where `side_to_move` is to play.
    pub fn to_config(&self, side_to_move: Color) -> SearchConfig {
        let ms = |time: Option<u64>| time.map(Duration::from_millis);

        let mut config = SearchConfig {
            max_depth: self.depth.unwrap_or(MAX_DEPTH),
            max_nodes: self.nodes.unwrap_or(u64::MAX),
            movetime: ms(self.movetime),
            ordering: self.ordering.unwrap_or_default(),
            seed: self.seed,
            ..Default::default()
        };

        // A fixed movetime overrides the clock
        if config.movetime.is_none() {
            config.set_clock(
                side_to_move,
                ms(self.wtime),
                ms(self.btime),
                ms(self.winc),
                ms(self.binc),
            );
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let parse = |s: &str| s.parse::<EngineCommand>();

        assert!(matches!(parse("d"), Ok(EngineCommand::Display)));
        assert!(matches!(parse("quit"), Ok(EngineCommand::Exit { cleanup: false })));
        assert!(matches!(parse("hash 64"), Ok(EngineCommand::Hash { mb: 64 })));
        assert!(matches!(parse("debug on"), Ok(EngineCommand::Debug { enabled: true })));
        assert!(matches!(parse("debug off"), Ok(EngineCommand::Debug { enabled: false })));

        assert!(parse("hash").is_err());
        assert!(parse("move").is_err());
        assert!(parse("frobnicate").is_err());
    }

    #[test]
    fn test_parse_position_keeps_fen_intact() {
        let cmd = "position fen 4k3/8/8/8/8/8/8/4K2R w K - 0 1 moves e1g1"
            .parse::<EngineCommand>()
            .unwrap();

        let EngineCommand::Position { args } = cmd else {
            panic!("Expected position command");
        };

        assert_eq!(
            args,
            ["fen", "4k3/8/8/8/8/8/8/4K2R", "w", "K", "-", "0", "1", "moves", "e1g1"]
        );
    }

    #[test]
    fn test_go_args_to_config() {
        let EngineCommand::Go(args) = "go --depth 6 --ordering capture-first --seed 7"
            .parse::<EngineCommand>()
            .unwrap()
        else {
            panic!("Expected go command");
        };

        let config = args.to_config(Color::White);
        assert_eq!(config.max_depth, 6);
        assert_eq!(config.ordering, MoveOrdering::CaptureFirst);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.movetime, None);
        assert_eq!(config.max_nodes, u64::MAX);
    }

    #[test]
    fn test_go_args_allocate_time() {
        let args = GoArgs {
            wtime: Some(60_000),
            btime: Some(30_000),
            winc: Some(1_000),
            binc: Some(500),
            ..Default::default()
        };

        assert_eq!(
            args.to_config(Color::White).movetime,
            Some(Duration::from_millis(3_500))
        );
        assert_eq!(
            args.to_config(Color::Black).movetime,
            Some(Duration::from_millis(1_750))
        );

        // Movetime wins over the clock
        let args = GoArgs {
            movetime: Some(250),
            ..args
        };
        assert_eq!(
            args.to_config(Color::White).movetime,
            Some(Duration::from_millis(250))
        );
    }
}
