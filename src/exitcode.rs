//! Process exit codes

/// Successful termination
pub const OK: i32 = 0;

/// Any fatal condition: invalid configuration, unresolvable input, or a
/// semantic processing error batch
pub const FAILURE: i32 = 1;
