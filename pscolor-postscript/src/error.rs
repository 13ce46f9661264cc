//! Error types for scanning and evaluating PostScript procedures.

use core::fmt;

/// A specialized [`Result`] type for procedure operations.
pub type Result<T> = core::result::Result<T, Error>;

/// An error encountered while scanning or executing a PostScript procedure.
///
/// The variants mirror the PostScript error names so that a host interpreter
/// can raise the matching error object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A syntax error in the procedure source.
    SyntaxError,
    /// An operator needed more operands than the stack holds.
    StackUnderflow,
    /// The operand stack exceeded its maximum depth.
    StackOverflow,
    /// An operand had the wrong type.
    TypeCheck,
    /// An operand was outside of its permitted range.
    RangeCheck,
    /// The result of an operation is not defined, for example a division by zero.
    UndefinedResult,
    /// `]` was executed without a matching mark on the stack.
    UnmatchedMark,
    /// An implementation limit, like the nesting depth, was exceeded.
    LimitCheck,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError => f.write_str("syntaxerror"),
            Self::StackUnderflow => f.write_str("stackunderflow"),
            Self::StackOverflow => f.write_str("stackoverflow"),
            Self::TypeCheck => f.write_str("typecheck"),
            Self::RangeCheck => f.write_str("rangecheck"),
            Self::UndefinedResult => f.write_str("undefinedresult"),
            Self::UnmatchedMark => f.write_str("unmatchedmark"),
            Self::LimitCheck => f.write_str("limitcheck"),
        }
    }
}

impl core::error::Error for Error {}
