/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Maximum depth that iterative deepening will ever request.
pub const MAX_DEPTH: usize = 128;

/// Maximum distance from the root that any node can be, including quiescence.
///
/// Mate scores are only distinguishable from ordinary scores within this many plies.
pub const MAX_PLY: usize = 255;

/// Compile-time verbosity of a search.
///
/// Every check against these constants is resolved at compile time, so a search run
/// with [`LogNone`] carries no cost for the diagnostics it does not print.
pub trait LogLevel {
    /// Whether to print `info` lines after each completed iteration.
    const INFO: bool = false;

    /// Whether to collect and print extra diagnostics, such as TT statistics.
    const DEBUG: bool = false;
}

/// Print nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogNone;

/// Print `info` lines and the final `bestmove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogInfo;

/// Print everything [`LogInfo`] does, plus debugging diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogDebug;

impl LogLevel for LogNone {}

impl LogLevel for LogInfo {
    const INFO: bool = true;
}

impl LogLevel for LogDebug {
    const INFO: bool = true;
    const DEBUG: bool = true;
}

/// Prints `info` to `stderr`, formatted as an `info string` line.
///
/// Diagnostics go to `stderr` so that they never interleave with parseable search output.
#[inline(always)]
pub fn send_string<T: std::fmt::Display>(info: T) {
    eprintln!("info string {info}");
}
