//! Compilation target constants.

/// Largest value an integer constant may hold.
///
/// The target word is 16 bits and `push constant` operands are limited
/// to the non-negative half of its range. Literals above this are
/// rejected by the lexer rather than wrapped.
pub const MAX_INT: u16 = 0x7FFF;
