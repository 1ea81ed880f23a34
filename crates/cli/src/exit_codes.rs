//! CLI Exit Code Registry
//!
//! Single source of truth for `tabdiff` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (no differences, or differences not fatal)   |
//! | 1    | Differences found                                    |
//! | 2    | Usage error (bad arguments, unsupported file type)   |
//! | 3    | I/O error (missing file, too large, write failure)   |
//! | 4    | Invalid mapping or job (keys, columns, entries)      |
//! | 5    | Parse error (CSV, XLSX or TOML input)                |
//! | 6    | Run aborted (timeout)                                |
//! | 9    | Internal error                                       |

// =============================================================================
// Universal
// =============================================================================

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// Differences found. Like `diff(1)`, exit 1 means "inputs differ".
/// Structural mode always reports it; delta and subtract modes only
/// with `--strict-exit`.
pub const EXIT_DIFFERENCES: u8 = 1;

/// Usage error - bad arguments, missing mapping, unsupported file type.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Inputs
// =============================================================================

/// A file could not be read or written, or exceeds the size limit.
pub const EXIT_IO: u8 = 3;

/// The mapping or job failed validation against itself or the headers.
pub const EXIT_INVALID_MAPPING: u8 = 4;

/// An input file or job file could not be parsed.
pub const EXIT_PARSE: u8 = 5;

// =============================================================================
// Run
// =============================================================================

/// The run was cancelled before completion (`--timeout`). No output is written.
pub const EXIT_ABORTED: u8 = 6;

/// The worker thread panicked.
pub const EXIT_INTERNAL: u8 = 9;
