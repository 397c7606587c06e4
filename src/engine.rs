/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};

use anyhow::{bail, Context, Result};

use crate::{
    perft, send_string, splitperft, Board, EngineCommand, Evaluator, GoArgs, LogDebug, LogInfo,
    LogLevel, PsqtEvaluator, Search, SearchConfig, SearchResult, Square, TTable, FEN_KIWIPETE,
};

/// The Newt chess engine.
#[derive(Debug)]
pub struct Engine {
    /// The current position, including the moves that led to it.
    ///
    /// Searches run on a copy of this, so it is never touched by the search thread.
    board: Board,

    /// One half of a channel, responsible for sending commands to the engine to execute.
    sender: Sender<EngineCommand>,

    /// One half of a channel, responsible for receiving commands for the engine to execute.
    receiver: Receiver<EngineCommand>,

    /// Atomic flag to determine whether a search is currently running
    is_searching: Arc<AtomicBool>,

    /// Handle to the currently-running search thread, if one exists.
    search_thread: Option<JoinHandle<SearchResult>>,

    /// Transposition table used to cache information found during search.
    ///
    /// Locked by the search thread for the entirety of a search.
    ttable: Arc<Mutex<TTable>>,

    /// Scores the leaves of every search.
    evaluator: Arc<dyn Evaluator>,

    /// Whether to display extra information during execution.
    debug: bool,
}

impl Engine {
    /// Constructs a new [`Engine`] instance to be executed with [`Engine::run`].
    #[inline(always)]
    pub fn new() -> Self {
        Self::with_evaluator(PsqtEvaluator)
    }

    /// Constructs a new [`Engine`] that scores positions with `evaluator`.
    pub fn with_evaluator(evaluator: impl Evaluator + 'static) -> Self {
        // Construct a channel for communication between the input thread and the engine
        let (sender, receiver) = channel();

        Self {
            board: Board::default(),
            sender,
            receiver,
            is_searching: Arc::default(),
            search_thread: None,
            ttable: Arc::default(),
            evaluator: Arc::new(evaluator),
            debug: false,
        }
    }

    /// Returns a string of the engine's name and current version.
    #[inline(always)]
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Sends an [`EngineCommand`] to the engine to be executed.
    #[inline(always)]
    pub fn send_command(&self, command: EngineCommand) -> Result<()> {
        self.sender
            .send(command)
            .context("Failed to send a command to the engine via channels")
    }

    /// Entrypoint of the engine.
    ///
    /// This function first spawns a new thread that handles user input from `stdin`.
    /// It then loops on commands received by the engine, executing them in the order received,
    /// until told to exit or until `stdin` is closed.
    pub fn run(&mut self) {
        // Spawn a separate thread for handling user input
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                eprintln!("Input handler thread stopping after fatal error: {err:#}");
            }
        });

        // Execute commands as they are received
        while let Ok(cmd) = self.receiver.recv() {
            if self.debug {
                send_string(format!("Received command {cmd:?}"));
            }

            // Exit the loop so the engine can quit
            if let EngineCommand::Exit { cleanup } = cmd {
                // If requested, await the completion of any ongoing search threads
                if cleanup {
                    self.stop_search();
                } else {
                    self.set_is_searching(false);
                }
                break;
            }

            // Errors are reported, and the engine keeps running
            if let Err(e) = self.handle_command(cmd) {
                eprintln!("Error: {e:#}");
            }
        }
    }

    /// Handle the execution of a single [`EngineCommand`].
    fn handle_command(&mut self, cmd: EngineCommand) -> Result<()> {
        match cmd {
            EngineCommand::Debug { enabled } => self.debug = enabled,

            EngineCommand::Display => println!("{:?}", self.board),

            EngineCommand::Eval => {
                let stm = self.board.side_to_move();
                println!("{}", self.evaluator.evaluate(&self.board, stm, 0));
            }

            // Handled by the event loop
            EngineCommand::Exit { .. } => {}

            EngineCommand::Fen => println!("{}", self.board.to_fen()),

            EngineCommand::Go(args) => {
                let config = args_to_config(&args, &self.board);
                self.search_thread = if self.debug {
                    self.start_search::<LogDebug>(config)
                } else {
                    self.start_search::<LogInfo>(config)
                };
            }

            EngineCommand::Hash { mb } => self.resize_hash(mb)?,

            EngineCommand::HashInfo => {
                // The search thread owns the table until it finishes
                if self.is_searching() {
                    bail!("Cannot inspect the hash table while a search is running");
                }
                self.hash_info();
            }

            EngineCommand::Move { moves } => self.make_moves(&moves)?,

            EngineCommand::Moves { square, sort } => self.moves(square, sort)?,

            EngineCommand::NewGame => self.new_game(),

            EngineCommand::Perft { depth } => println!("{}", perft(&mut self.board, depth)),

            EngineCommand::Position { args } => self.board = parse_position(&args)?,

            EngineCommand::Splitperft { depth } => _ = splitperft(&mut self.board, depth),

            EngineCommand::Status => println!("{}", self.board.status()),

            EngineCommand::Stop => self.set_is_searching(false),

            EngineCommand::Undo => {
                let mv = self.board.undo()?;
                if self.debug {
                    send_string(format!("Took back {mv}"));
                }
            }

            EngineCommand::Wait => _ = self.stop_search(),
        }

        Ok(())
    }

    /// Display info about the transposition table.
    fn hash_info(&self) {
        let ttable = self.ttable();

        let size = ttable.size();
        let num = ttable.num_entries();
        let cap = ttable.capacity();
        let percent = num as f32 / cap as f32 * 100.0;
        println!("TT info: {size}mb @ {num}/{cap} entries ({percent:.2}% full)");

        let (hits, accesses, collisions) = ttable.stats();
        println!(
            "TT stats: {hits} hits / {accesses} accesses, {collisions} collisions, hashfull {}",
            ttable.hashfull()
        );
    }

    /// Executes the `hash` command, replacing the transposition table with an empty one of `mb` megabytes.
    fn resize_hash(&mut self, mb: usize) -> Result<()> {
        // Ensure the value is within bounds
        if mb < TTable::MIN_SIZE {
            bail!("Minimum value for Hash is {}mb", TTable::MIN_SIZE);
        }
        if mb > TTable::MAX_SIZE {
            bail!("Maximum value for Hash is {}mb", TTable::MAX_SIZE);
        }

        // The search thread owns the table until it finishes
        if self.is_searching() {
            bail!("Cannot resize the hash table while a search is running");
        }

        self.ttable().resize(mb);

        if self.debug {
            send_string(format!("Hash table resized to {mb}mb"));
        }

        Ok(())
    }

    /// Applies the supplied moves to the current position.
    ///
    /// If any move is illegal, the position is left as it was.
    fn make_moves(&mut self, moves: &[String]) -> Result<()> {
        let mut board = self.board.clone();

        for mv_str in moves {
            board
                .apply_uci(mv_str)
                .with_context(|| format!("Failed to apply move {mv_str:?}"))?;
        }

        self.board = board;
        Ok(())
    }

    /// Executes the `moves` command, displaying all available moves on the board, or for the given square.
    fn moves(&mut self, square: Option<Square>, sort: bool) -> Result<()> {
        // Get the legal moves
        let moves = if let Some(square) = square {
            self.board.legal_moves_from(square)?
        } else {
            self.board.legal_moves()
        };

        // If there are none, print "(none)"
        if moves.is_empty() {
            println!("(none)");
            return Ok(());
        }

        let mut strings = moves.iter().map(|mv| mv.to_uci()).collect::<Vec<_>>();

        // Sort alphabetically, if necessary
        if sort {
            strings.sort();
        }

        println!("{}", strings.join(", "));
        Ok(())
    }

    /// Resets the engine's internal game state.
    ///
    /// This clears the transposition table and cancels any ongoing search, ignoring its result.
    fn new_game(&mut self) {
        self.set_is_searching(false);
        self.stop_search();
        self.ttable().clear();
        self.board = Board::default();
    }

    /// Sets the search flag to signal that the engine is starting/stopping a search.
    #[inline(always)]
    fn set_is_searching(&mut self, status: bool) {
        self.is_searching.store(status, Ordering::Relaxed);
    }

    /// Returns `true` if the engine is currently executing a search.
    #[inline(always)]
    fn is_searching(&self) -> bool {
        self.is_searching.load(Ordering::Relaxed)
    }

    /// Starts a search on the current position, given the parameters in `config`.
    fn start_search<Log: LogLevel + 'static>(
        &mut self,
        config: SearchConfig,
    ) -> Option<JoinHandle<SearchResult>> {
        // Cannot start a search if one is already running
        if self.is_searching() {
            send_string("A search is already running");
            return self.search_thread.take();
        }

        // Collect the previous search, which has already concluded
        self.stop_search();
        self.set_is_searching(true);

        // Clone the parameters that will be sent into the thread
        let mut board = self.board.clone();
        let is_searching = Arc::clone(&self.is_searching);
        let ttable = Arc::clone(&self.ttable);
        let evaluator = Arc::clone(&self.evaluator);

        // Spawn a thread to conduct the search
        let handle = thread::spawn(move || {
            // Lock the hash table at the start of the search so that only the search thread may modify it
            let mut ttable = ttable.lock().unwrap_or_else(PoisonError::into_inner);

            // Start the search, returning the result when completed.
            Search::<Log>::new(
                &mut board,
                &mut ttable,
                evaluator.as_ref(),
                is_searching,
                config,
            )
            .start()
        });

        Some(handle)
    }

    /// Awaits the current search thread, blocking until it finishes and returning its result.
    fn stop_search(&mut self) -> Option<SearchResult> {
        // Can't stop a search if there aren't any threads searching!
        let handle = self.search_thread.take()?;

        // Attempt to join the thread handle to retrieve the result
        let id = handle.thread().id();
        let Ok(res) = handle.join() else {
            send_string(format!("Failed to join on thread {id:?}"));
            return None;
        };

        // Flip the search flag so that any active threads will (hopefully) begin to clean themselves up.
        self.set_is_searching(false);

        Some(res)
    }

    /// Helper function to fetch the TTable.
    ///
    /// A search thread that panicked leaves the table poisoned, but every entry in it is still
    /// self-contained, so the table is used as-is.
    #[inline(always)]
    fn ttable(&self) -> MutexGuard<'_, TTable> {
        self.ttable.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Engine {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the [`SearchConfig`] for a `go` command issued on `board`.
#[inline(always)]
fn args_to_config(args: &GoArgs, board: &Board) -> SearchConfig {
    args.to_config(board.side_to_move())
}

/// Parses the arguments of the `position` command into a new [`Board`].
///
/// Accepts `[startpos | kiwipete | fen <FEN>] [moves <MOVE>...]`, where an empty list means `startpos`.
/// The FEN may span several arguments; it ends at `moves` or at the end of the list.
///
/// # Example
/// ```
/// # use newt::*;
/// let board = parse_position(&["startpos", "moves", "e2e4", "e7e5"]).unwrap();
/// assert_eq!(
///     board.to_fen(),
///     "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
/// );
/// ```
pub fn parse_position<T: AsRef<str>>(args: &[T]) -> Result<Board> {
    let mut tokens = args.iter().map(T::as_ref).peekable();

    let mut board = match tokens.next() {
        None | Some("startpos") => Board::default(),

        Some("kiwipete") => Board::from_fen(FEN_KIWIPETE)?,

        Some("fen") => {
            let mut fields = Vec::with_capacity(6);
            while let Some(field) = tokens.next_if(|&token| token != "moves") {
                fields.push(field);
            }

            if fields.is_empty() {
                bail!("usage: position fen <FEN> [moves <MOVE>...]");
            }

            let fen = fields.join(" ");
            Board::from_fen(&fen).with_context(|| format!("Invalid FEN {fen:?}"))?
        }

        Some(other) => bail!("Expected one of startpos, kiwipete, or fen. Got {other:?}"),
    };

    match tokens.next() {
        None | Some("moves") => {}
        Some(other) => bail!("Expected \"moves\" after the position. Got {other:?}"),
    }

    // Apply the provided moves
    for mv_str in tokens {
        board
            .apply_uci(mv_str)
            .with_context(|| format!("Failed to apply move {mv_str:?}"))?;
    }

    Ok(board)
}

/// Loops endlessly to await input via `stdin`, sending all successfully-parsed commands through the supplied `sender`.
fn input_handler(sender: Sender<EngineCommand>) -> Result<()> {
    let mut buffer = String::with_capacity(2048); // Seems like a good amount of space to pre-allocate

    loop {
        // Clear the buffer, read input, and trim the trailing newline
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read line when parsing commands")?;

        // For ctrl + d
        if 0 == bytes {
            // Send the Exit command and exit this function
            sender
                .send(EngineCommand::Exit { cleanup: false })
                .context("Failed to send 'exit' command after receiving empty input")?;

            bail!("Engine received input of 0 bytes and is quitting");
        }

        // Trim any leading/trailing whitespace
        let buf = buffer.trim();

        // Ignore empty lines
        if buf.is_empty() {
            continue;
        }

        match buf.parse() {
            Ok(cmd) => sender
                .send(cmd)
                .context("Failed to send command to engine")?,

            // If an invalid command was received, just print the error and continue running
            Err(err) => err.print()?,
        }
    }
}
