/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    marker::PhantomData,
    ops::Neg,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use arrayvec::ArrayVec;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    send_string, Board, Color, Evaluator, LogLevel, Move, MoveOrdering, MovePicker, NodeType,
    Score, TTable, MAX_DEPTH, MAX_PLY,
};

/// Number of nodes between each check of the clock and the stop flag.
const CHECK_INTERVAL: u64 = 4_096;

/// Default ceiling on the number of plies quiescence search may extend past the horizon.
pub const DEFAULT_QUIESCENCE_DEPTH: usize = 10;

/// Represents the best sequence of moves found during a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrincipalVariation(ArrayVec<Move, MAX_PLY>);

impl PrincipalVariation {
    /// An empty PV.
    const EMPTY: Self = Self(ArrayVec::new_const());

    /// Clears the moves of `self`.
    #[inline(always)]
    fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace the contents of `self` with `mv`, followed by the contents of `other`.
    ///
    /// Moves that do not fit are dropped from the end of the line.
    #[inline(always)]
    fn extend(&mut self, mv: Move, other: &Self) {
        self.clear();
        self.0.push(mv);
        for &next in other.0.iter() {
            if self.0.try_push(next).is_err() {
                break;
            }
        }
    }

    /// Returns the moves of this PV, in the order they are played.
    #[inline(always)]
    pub fn moves(&self) -> &[Move] {
        &self.0
    }
}

impl Default for PrincipalVariation {
    #[inline(always)]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for PrincipalVariation {
    /// Formats as the moves of the PV in UCI notation, separated by spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let moves = self.0.iter().map(Move::to_uci).collect::<Vec<_>>();
        write!(f, "{}", moves.join(" "))
    }
}

/// Bounds within an alpha-beta search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBounds {
    /// Lower bound.
    ///
    /// We are guaranteed a score that is AT LEAST `alpha`.
    /// During search, if no move can raise `alpha`, we are said to have "failed low."
    pub alpha: Score,

    /// Upper bound.
    ///
    /// Our opponent is guaranteed a score that is AT MOST `beta`.
    /// During search, if a move scores at least `beta`, we are said to have "failed high,"
    /// and the remaining moves are pruned: our opponent would never allow this position.
    pub beta: Score,
}

impl SearchBounds {
    /// Create a new [`SearchBounds`] from the provided `alpha` and `beta` values.
    #[inline(always)]
    pub const fn new(alpha: Score, beta: Score) -> Self {
        Self { alpha, beta }
    }
}

impl Neg for SearchBounds {
    type Output = Self;

    /// Negating a [`SearchBounds`] swaps the `alpha` and `beta` fields and negates them both.
    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self {
            alpha: -self.beta,
            beta: -self.alpha,
        }
    }
}

impl Default for SearchBounds {
    /// Default [`SearchBounds`] are a `(-infinity, infinity)`.
    #[inline(always)]
    fn default() -> Self {
        Self::new(Score::ALPHA, Score::BETA)
    }
}

/// The result of a search, containing the best move found, score, and total nodes searched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResult {
    /// Number of nodes searched.
    pub nodes: u64,

    /// Best move found during the search.
    ///
    /// Only `None` if the root position had no legal moves.
    pub bestmove: Option<Move>,

    /// Evaluation of the root position, from the side to move's perspective.
    pub score: Score,

    /// The depth of the deepest completed iteration that produced this result.
    pub depth: usize,

    /// Principal variation of the deepest completed iteration.
    pub pv: PrincipalVariation,
}

impl Default for SearchResult {
    /// A default search result should initialize to a *very bad* value,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            nodes: 0,
            bestmove: None,
            score: Score::ALPHA,
            depth: 0,
            pv: PrincipalVariation::EMPTY,
        }
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Maximum depth to execute the search.
    ///
    /// Values above [`MAX_DEPTH`] are treated as [`MAX_DEPTH`].
    pub max_depth: usize,

    /// Node allowance.
    ///
    /// If the search exceeds this many nodes, it will exit as quickly as possible.
    pub max_nodes: u64,

    /// Time allotted to the search, measured from when the search is constructed.
    ///
    /// `None` searches until stopped, or until `max_depth` or `max_nodes` is reached.
    pub movetime: Option<Duration>,

    /// How to order moves before searching them.
    pub ordering: MoveOrdering,

    /// Maximum number of plies quiescence search may extend past the horizon.
    pub quiescence_depth: usize,

    /// Seed for choosing between equally-scored root moves.
    ///
    /// `None` seeds from system entropy, so repeated searches may play different moves.
    pub seed: Option<u64>,
}

impl SearchConfig {
    /// Computes how long to search given the time on our clock and our increment.
    ///
    /// Spends a twentieth of the remaining time, plus half of the increment.
    ///
    /// # Example
    /// ```
    /// # use newt::SearchConfig;
    /// # use std::time::Duration;
    /// let time = SearchConfig::allocate_time(Duration::from_secs(60), Duration::from_secs(2));
    /// assert_eq!(time, Duration::from_secs(4));
    /// ```
    #[inline(always)]
    pub fn allocate_time(remaining: Duration, increment: Duration) -> Duration {
        remaining / 20 + increment / 2
    }

    /// Sets [`Self::movetime`] from the clocks of both players, using the clock of `side_to_move`.
    ///
    /// Does nothing if `side_to_move` has no time on its clock.
    pub fn set_clock(
        &mut self,
        side_to_move: Color,
        wtime: Option<Duration>,
        btime: Option<Duration>,
        winc: Option<Duration>,
        binc: Option<Duration>,
    ) {
        let (time, inc) = match side_to_move {
            Color::White => (wtime, winc),
            Color::Black => (btime, binc),
        };

        if let Some(time) = time {
            self.movetime = Some(Self::allocate_time(time, inc.unwrap_or_default()));
        }
    }
}

impl Default for SearchConfig {
    /// A default [`SearchConfig`] will permit an "infinite" search.
    ///
    /// The word "infinite" is quoted here because the actual defaults are the maximum values for each field.
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: u64::MAX,
            movetime: None,
            ordering: MoveOrdering::default(),
            quiescence_depth: DEFAULT_QUIESCENCE_DEPTH,
            seed: None,
        }
    }
}

/// Executes a search on a board.
///
/// The board is walked in place with apply/undo, and is restored to its original state
/// by the time the search returns.
pub struct Search<'a, Log> {
    /// Position to search. Its history is used for repetition detection.
    board: &'a mut Board,

    /// Transposition table used to cache information during search.
    ttable: &'a mut TTable,

    /// Scores the leaves of the search.
    evaluator: &'a dyn Evaluator,

    /// An atomic flag to determine if the search should be cancelled at any time.
    ///
    /// If this is ever `false`, the search must exit as soon as possible.
    is_searching: Arc<AtomicBool>,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// When the search was requested.
    starttime: Instant,

    /// Number of nodes searched.
    nodes: u64,

    /// Set once any limit has been exceeded; every node unwinds as soon as it sees this.
    stopped: bool,

    /// Source of randomness for breaking ties between root moves.
    rng: StdRng,

    /// Marker for the level of logging to print.
    log: PhantomData<Log>,
}

impl<'a, Log: LogLevel> Search<'a, Log> {
    /// Construct a new [`Search`] instance to execute.
    ///
    /// The clock for [`SearchConfig::movetime`] starts now.
    pub fn new(
        board: &'a mut Board,
        ttable: &'a mut TTable,
        evaluator: &'a dyn Evaluator,
        is_searching: Arc<AtomicBool>,
        config: SearchConfig,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            board,
            ttable,
            evaluator,
            is_searching,
            config,
            starttime: Instant::now(),
            nodes: 0,
            stopped: false,
            rng,
            log: PhantomData,
        }
    }

    /// Start the search, returning a [`SearchResult`].
    ///
    /// This is the entrypoint of the search. It runs iterative deepening and, if logging is enabled,
    /// concludes by sending the `bestmove` message.
    pub fn start(mut self) -> SearchResult {
        self.ttable.new_search();

        if Log::DEBUG {
            send_string(format!("Starting search on {:?}", self.board.to_fen()));

            let depth = self.config.max_depth;
            let nodes = self.config.max_nodes;
            if let Some(movetime) = self.config.movetime {
                send_string(format!("Movetime := {}ms", movetime.as_millis()));
            }
            if nodes < u64::MAX {
                send_string(format!("Max nodes := {nodes} nodes"));
            }
            if depth < MAX_DEPTH {
                send_string(format!("Max depth := {depth}"));
            }
            send_string(format!("Move ordering := {}", self.config.ordering));
        }

        let res = self.iterative_deepening();

        if Log::DEBUG {
            let (hits, accesses, collisions) = self.ttable.stats();
            let hit_rate = hits as f32 / accesses.max(1) as f32 * 100.0;
            send_string(format!(
                "TT stats: {hits} hits / {accesses} accesses ({hit_rate:.2}% hit rate), {collisions} collisions"
            ));
        }

        // Search has ended; send bestmove
        if Log::INFO {
            match res.bestmove {
                Some(mv) => println!("bestmove {mv}"),
                None => println!("bestmove 0000"),
            }
        }

        // Search has concluded, alert other thread(s) that we are no longer searching
        self.is_searching.store(false, Ordering::Relaxed);

        res
    }

    /// Sends info about the conclusion of an iteration to `stdout`.
    fn send_iteration_info(&self, result: &SearchResult) {
        let elapsed = self.starttime.elapsed();
        let nps = (self.nodes as f64 / elapsed.as_secs_f64().max(0.001)) as u64;

        println!(
            "info depth {} score {} nodes {} nps {nps} time {} hashfull {} pv {}",
            result.depth,
            result.score,
            self.nodes,
            elapsed.as_millis(),
            self.ttable.hashfull(),
            result.pv,
        );
    }

    /// Performs [iterative deepening](https://www.chessprogramming.org/Iterative_Deepening) (ID) on the Search's position.
    ///
    /// Searches at depth 1, then 2, and so on, until a limit is reached. An iteration that is cut short
    /// is thrown away in favor of the last one that completed, except for the very first iteration:
    /// its best move so far is still better than nothing.
    fn iterative_deepening(&mut self) -> SearchResult {
        let moves = self.board.legal_moves();

        // Initialize `bestmove` to the first move available
        let mut result = SearchResult {
            bestmove: moves.first().copied(),
            ..Default::default()
        };

        // Nothing to search; the game is over.
        if moves.is_empty() {
            result.score = if self.board.is_in_check() {
                Score::mated_in(0)
            } else {
                Score::DRAW
            };
            return result;
        }

        let max_depth = self.config.max_depth.clamp(1, MAX_DEPTH);

        for depth in 1..=max_depth {
            let mut pv = PrincipalVariation::default();
            let (score, bestmove) = self.search_root(depth, &mut pv);

            // If we've ran out of time, we shouldn't update the score, because the last search iteration was forcibly cancelled.
            if self.stopped {
                if Log::DEBUG {
                    send_string(format!("Search cancelled during depth {depth}"));
                }

                // Anything is better than an arbitrary move
                if depth == 1 && bestmove.is_some() {
                    result.bestmove = bestmove;
                    result.score = score;
                    result.pv = pv;
                }
                break;
            }

            result.score = score;
            result.bestmove = bestmove;
            result.depth = depth;
            result.pv = pv;

            if Log::INFO {
                self.send_iteration_info(&result);
            }

            // A mate within the horizon cannot be improved upon by searching deeper
            if score.is_mate() && score.plies_to_mate() as usize <= depth {
                break;
            }
        }

        result.nodes = self.nodes;
        result
    }

    /// Searches every root move, returning the best score and a move chosen at random among those that share it.
    ///
    /// After the first move, moves are searched with the window `(best - 1, beta)`: a move that merely
    /// ties the best score then comes back with its exact score, rather than failing low.
    ///
    /// If the search is stopped, only moves whose subtrees were searched completely are considered.
    fn search_root(&mut self, depth: usize, pv: &mut PrincipalVariation) -> (Score, Option<Move>) {
        let key = self.board.key();
        let tt_move = self.ttable.bestmove(key);
        let moves = self.board.legal_moves();

        let mut local_pv = PrincipalVariation::default();
        let mut best = Score::ALPHA;
        let mut bestmove = None;
        let mut ties = 0;

        for mv in MovePicker::new(moves, self.config.ordering, tt_move) {
            let bounds = if bestmove.is_none() {
                SearchBounds::default()
            } else {
                SearchBounds::new(best - 1, Score::BETA)
            };

            self.board.apply(mv);
            let score = -self.negamax(depth - 1, 1, -bounds, &mut local_pv, mv.is_capture());
            self.board.pop_move();

            // This move's subtree is incomplete, so its score can't be trusted
            if self.stopped {
                break;
            }

            if score > best {
                best = score;
                bestmove = Some(mv);
                ties = 1;
                pv.extend(mv, &local_pv);
            } else if score == best {
                // Reservoir sampling: the k-th tie replaces the current choice with probability 1/k,
                // so every tied move is equally likely to be played.
                ties += 1;
                if self.rng.gen_range(0..ties) == 0 {
                    bestmove = Some(mv);
                    pv.extend(mv, &local_pv);
                }
            }
        }

        if !self.stopped {
            self.ttable
                .store(key, best, bestmove, NodeType::Exact, depth, 0);
        }

        (best, bestmove)
    }

    /// Primary location of search logic.
    ///
    /// Uses the [negamax](https://www.chessprogramming.org/Negamax) algorithm in a [fail soft](https://www.chessprogramming.org/Alpha-Beta#Negamax_Framework) framework.
    /// `after_capture` is whether the move into this node was a capture, which decides whether the
    /// horizon is extended by quiescence search.
    fn negamax(
        &mut self,
        depth: usize,
        ply: usize,
        mut bounds: SearchBounds,
        pv: &mut PrincipalVariation,
        after_capture: bool,
    ) -> Score {
        // Clear any nodes in this PV, since we're searching from a new position
        pv.clear();

        self.nodes += 1;
        if self.search_cancelled() {
            return Score::DRAW;
        }

        // Drawn positions need no further search
        if self.board.can_draw_by_fifty() || self.board.is_repetition() {
            return Score::DRAW;
        }

        let key = self.board.key();
        let original_bounds = bounds;

        /****************************************************************************************************
         * TT Cutoffs: https://www.chessprogramming.org/Transposition_Table#Transposition_Table_Cutoffs
         *
         * If we've already searched this position at least as deep, the stored score may be enough to
         * narrow the window, or even to return immediately.
         ****************************************************************************************************/
        if let Some(entry) = self.ttable.probe(key, ply) {
            if entry.depth as usize >= depth {
                match entry.node_type {
                    NodeType::Exact => return entry.score,
                    NodeType::LowerBound => bounds.alpha = bounds.alpha.max(entry.score),
                    NodeType::UpperBound => bounds.beta = bounds.beta.min(entry.score),
                }

                if bounds.alpha >= bounds.beta {
                    return entry.score;
                }
            }
        }

        // If there are no legal moves, it's either mate or a draw.
        let moves = self.board.legal_moves();
        if moves.is_empty() {
            return if self.board.is_in_check() {
                // Offset by ply to prefer earlier mates
                Score::mated_in(ply)
            } else {
                // Drawing is better than losing
                Score::DRAW
            };
        }

        /****************************************************************************************************
         * Quiescence Search: https://www.chessprogramming.org/Quiescence_Search
         *
         * A capture just before the horizon may be answered by a recapture just after it. Rather than
         * trusting a static evaluation in the middle of an exchange, play captures out until it settles.
         ****************************************************************************************************/
        if depth == 0 {
            return if after_capture {
                self.quiescence(ply, bounds, 0)
            } else {
                self.evaluate(ply)
            };
        }

        // Start with a *really bad* initial score
        let mut best = Score::ALPHA;
        let mut bestmove = None;
        let mut local_pv = PrincipalVariation::default();
        let tt_move = self.ttable.bestmove(key);

        /****************************************************************************************************
         * Primary move loop
         ****************************************************************************************************/
        for mv in MovePicker::new(moves, self.config.ordering, tt_move) {
            self.board.apply(mv);
            let score = -self.negamax(depth - 1, ply + 1, -bounds, &mut local_pv, mv.is_capture());
            self.board.pop_move();

            // If we've found a better move than our current best, update the results
            if score > best {
                best = score;
                bestmove = Some(mv);

                // PV found
                if score > bounds.alpha {
                    bounds.alpha = score;
                    pv.extend(mv, &local_pv);
                }

                // Fail high
                if score >= bounds.beta {
                    break;
                }
            }

            // Check if we can continue searching
            if self.stopped {
                break;
            }
        }

        // A cancelled subtree's score is meaningless, so it must not pollute the TT.
        if !self.stopped {
            let node_type = NodeType::new(best, original_bounds);
            self.ttable.store(key, best, bestmove, node_type, depth, ply);
        }

        best
    }

    /// Quiescence Search (QSearch)
    ///
    /// A search that looks only at captures and promotions, or at every move when in check.
    /// This is called when [`Search::negamax`] reaches a depth of 0 right after a capture,
    /// and extends at most [`SearchConfig::quiescence_depth`] plies.
    fn quiescence(&mut self, ply: usize, mut bounds: SearchBounds, qdepth: usize) -> Score {
        self.nodes += 1;
        if self.search_cancelled() {
            return Score::DRAW;
        }

        // Reached the ceiling; the position is as quiet as it's going to get
        if qdepth >= self.config.quiescence_depth || ply >= MAX_PLY - 1 {
            return self.evaluate(ply);
        }

        let moves = self.board.noisy_moves();

        // When in check, `moves` holds every legal move, so an empty list is mate.
        if moves.is_empty() && self.board.is_in_check() {
            return Score::mated_in(ply);
        }

        // Evaluate the current position, to serve as our baseline
        let stand_pat = self.evaluate(ply);

        // Beta cutoff; this position is "too good" and our opponent would never let us get here
        if stand_pat >= bounds.beta {
            return bounds.beta;
        }
        bounds.alpha = bounds.alpha.max(stand_pat);

        if moves.is_empty() {
            return stand_pat;
        }

        for mv in MovePicker::new(moves, self.config.ordering, None) {
            self.board.apply(mv);
            let score = -self.quiescence(ply + 1, -bounds, qdepth + 1);
            self.board.pop_move();

            if self.stopped {
                break;
            }

            if score >= bounds.beta {
                return bounds.beta;
            }
            bounds.alpha = bounds.alpha.max(score);
        }

        bounds.alpha
    }

    /// Evaluates the current position from the side to move's perspective.
    #[inline(always)]
    fn evaluate(&self, ply: usize) -> Score {
        let stm = self.board.side_to_move();
        self.evaluator.evaluate(self.board, stm, ply)
    }

    /// Checks if we've exceeded any conditions that would warrant the search to end.
    ///
    /// The node allowance is checked on every call; the clock and the stop flag every
    /// [`CHECK_INTERVAL`] nodes.
    #[inline(always)]
    fn search_cancelled(&mut self) -> bool {
        if self.stopped {
            return true;
        }

        if self.nodes >= self.config.max_nodes {
            self.stopped = true;
        } else if self.nodes % CHECK_INTERVAL == 0 {
            let timed_out = self
                .config
                .movetime
                .is_some_and(|movetime| self.starttime.elapsed() >= movetime);

            self.stopped = timed_out || !self.is_searching.load(Ordering::Relaxed);
        }

        self.stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::*;

    fn run_search_on(board: &mut Board, config: SearchConfig) -> SearchResult {
        let is_searching = Arc::new(AtomicBool::new(true));
        let mut ttable = TTable::from_capacity(1 << 16);

        Search::<LogNone>::new(board, &mut ttable, &PsqtEvaluator, is_searching, config).start()
    }

    fn run_search(fen: &str, config: SearchConfig) -> SearchResult {
        let mut board = Board::from_fen(fen).unwrap();
        run_search_on(&mut board, config)
    }

    fn ensure_is_mate_in(fen: &str, config: SearchConfig, moves: i32) -> SearchResult {
        let res = run_search(fen, config);
        assert!(
            res.score.is_mate(),
            "Search on {fen:?} with config {config:#?} produced result that is not mate.\nResult: {res:#?}"
        );
        assert_eq!(
            res.score.moves_to_mate(),
            moves,
            "Search on {fen:?} with config {config:#?} produced result not mate in {moves}.\nResult: {res:#?}"
        );
        res
    }

    /// Plain negamax over every move with no pruning, no TT, and no quiescence.
    fn brute_force(board: &mut Board, depth: usize, ply: usize) -> Score {
        if ply > 0 && (board.can_draw_by_fifty() || board.is_repetition()) {
            return Score::DRAW;
        }

        let moves = board.legal_moves();
        if moves.is_empty() {
            return if board.is_in_check() {
                Score::mated_in(ply)
            } else {
                Score::DRAW
            };
        }

        if depth == 0 {
            return PsqtEvaluator.evaluate(board, board.side_to_move(), ply);
        }

        moves.into_iter().fold(Score::ALPHA, |best, mv| {
            board.apply(mv);
            let score = -brute_force(board, depth - 1, ply + 1);
            board.pop_move();
            best.max(score)
        })
    }

    #[test]
    fn test_white_mate_in_1() {
        let fen = "k7/8/KQ6/8/8/8/8/8 w - - 0 1";
        let config = SearchConfig {
            max_depth: 2,
            ..Default::default()
        };

        let res = ensure_is_mate_in(fen, config, 1);

        // Several queen moves mate; any of them will do
        let mut board = Board::from_fen(fen).unwrap();
        board.apply_checked(res.bestmove.unwrap()).unwrap();
        assert_eq!(
            board.status(),
            GameStatus::Checkmate {
                winner: Color::White
            }
        );
    }

    #[test]
    fn test_black_mated_in_1() {
        let fen = "1k6/8/KQ6/2Q5/8/8/8/8 b - - 0 1";
        let config = SearchConfig {
            max_depth: 3,
            ..Default::default()
        };

        let res = ensure_is_mate_in(fen, config, -1);
        assert_eq!(res.bestmove.unwrap(), "b8a8");
    }

    #[test]
    fn test_mate_in_2() {
        // Ladder mate with two rooks
        let fen = "7k/8/8/8/8/8/R7/1R5K w - - 0 1";
        let config = SearchConfig {
            max_depth: 4,
            ..Default::default()
        };

        let res = ensure_is_mate_in(fen, config, 2);
        assert_eq!(res.pv.moves().first().copied(), res.bestmove);
    }

    #[test]
    fn test_checkmated_and_stalemated_roots() {
        let res = run_search("k7/8/KQ6/8/8/8/8/8 b - - 0 1", SearchConfig::default());
        assert!(res.bestmove.is_none());
        assert_eq!(res.score, Score::DRAW);

        let res = run_search("k7/1Q6/1K6/8/8/8/8/8 b - - 0 1", SearchConfig::default());
        assert!(res.bestmove.is_none());
        assert_eq!(res.score, Score::mated_in(0));
    }

    #[test]
    fn test_obvious_capture_promote() {
        // Pawn should take queen and also promote to queen
        let fen = "3q1n2/4P3/8/8/8/8/k7/7K w - - 0 1";
        let config = SearchConfig {
            max_depth: 1,
            ..Default::default()
        };

        let res = run_search(fen, config);
        assert_eq!(res.bestmove.unwrap(), "e7d8q");
    }

    #[test]
    fn test_quiescence_sees_recapture() {
        // Qxd5 wins a pawn at depth 1, unless the recapture by the pawn on e6 is noticed
        let fen = "4k3/8/4p3/3p4/8/8/8/3QK3 w - - 0 1";
        let config = SearchConfig {
            max_depth: 1,
            ..Default::default()
        };

        let res = run_search(fen, config);
        assert_ne!(res.bestmove.unwrap(), "d1d5");
    }

    #[test]
    fn test_alpha_beta_matches_brute_force() {
        let fens = [
            FEN_STARTPOS,
            FEN_KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        ];

        for fen in fens {
            for depth in 1..=3 {
                // Kiwipete is wide enough that depth 3 brute force is slow
                if fen == FEN_KIWIPETE && depth == 3 {
                    continue;
                }

                for ordering in [MoveOrdering::CaptureFirst, MoveOrdering::MvvLva] {
                    let config = SearchConfig {
                        max_depth: depth,
                        quiescence_depth: 0,
                        ordering,
                        seed: Some(0),
                        ..Default::default()
                    };

                    let mut board = Board::from_fen(fen).unwrap();
                    let expected = brute_force(&mut board, depth, 0);
                    let res = run_search_on(&mut board, config);

                    assert_eq!(
                        res.score, expected,
                        "{fen} at depth {depth} with {ordering} ordering"
                    );
                }
            }
        }
    }

    #[test]
    fn test_search_leaves_board_untouched() {
        let mut board = Board::from_fen(FEN_KIWIPETE).unwrap();
        board.apply_uci("e2a6").unwrap();
        let before = board.clone();

        let config = SearchConfig {
            max_depth: 3,
            ..Default::default()
        };
        run_search_on(&mut board, config);

        assert_eq!(board, before);
    }

    #[test]
    fn test_fifty_move_rule_scores_as_draw() {
        // White is a rook up, but every move it has is the hundredth reversible ply
        let fen = "k7/8/8/8/8/8/8/1R4K1 w - - 99 80";
        let config = SearchConfig {
            max_depth: 2,
            ..Default::default()
        };

        let res = run_search(fen, config);
        assert_eq!(res.score, Score::DRAW);
        assert!(res.bestmove.is_some());
    }

    #[test]
    fn test_seed_makes_tie_break_deterministic() {
        let config = SearchConfig {
            max_depth: 1,
            seed: Some(42),
            ..Default::default()
        };

        let first = run_search(FEN_STARTPOS, config);
        let second = run_search(FEN_STARTPOS, config);
        assert_eq!(first.bestmove, second.bestmove);
        assert_eq!(first.score, second.score);
    }

    #[test]
    fn test_ties_are_broken_randomly() {
        // Both knights develop to squares worth the same, so different seeds pick different moves
        let results = (0..32)
            .map(|seed| {
                let config = SearchConfig {
                    max_depth: 1,
                    seed: Some(seed),
                    ..Default::default()
                };
                run_search(FEN_STARTPOS, config)
            })
            .collect::<Vec<_>>();

        let score = results[0].score;
        assert!(results.iter().all(|res| res.score == score));

        let mut moves = results
            .iter()
            .filter_map(|res| res.bestmove)
            .map(|mv| mv.to_uci())
            .collect::<Vec<_>>();
        moves.sort();
        moves.dedup();
        assert!(moves.len() > 1, "Only ever chose {moves:?}");
    }

    #[test]
    fn test_limits_still_produce_a_move() {
        // A search that is stopped right away still returns a legal move
        let config = SearchConfig {
            max_nodes: 1,
            ..Default::default()
        };
        let res = run_search(FEN_STARTPOS, config);
        assert!(res.bestmove.is_some());

        let config = SearchConfig {
            movetime: Some(Duration::from_millis(0)),
            ..Default::default()
        };
        let res = run_search(FEN_KIWIPETE, config);
        assert!(res.bestmove.is_some());
    }

    #[test]
    fn test_stop_flag_cancels_search() {
        let mut board = Board::default();
        let mut ttable = TTable::from_capacity(1 << 16);
        let is_searching = Arc::new(AtomicBool::new(false));

        // No limits at all, so only the flag can end this search
        let res = Search::<LogNone>::new(
            &mut board,
            &mut ttable,
            &MaterialEvaluator,
            is_searching,
            SearchConfig::default(),
        )
        .start();

        assert!(res.bestmove.is_some());
        assert!(res.depth < MAX_DEPTH);
    }

    #[test]
    fn test_set_clock_uses_side_to_move() {
        let mut config = SearchConfig::default();
        let (white, black) = (Duration::from_secs(40), Duration::from_secs(20));
        let inc = Some(Duration::from_secs(2));

        config.set_clock(Color::Black, Some(white), Some(black), inc, inc);
        assert_eq!(config.movetime, Some(Duration::from_secs(2)));

        // Without a clock for the side to move, the search is unlimited
        let mut config = SearchConfig::default();
        config.set_clock(Color::White, None, Some(black), None, None);
        assert_eq!(config.movetime, None);
    }
}
