//! Errors raised while validating color spaces, functions and shadings.

use core::fmt;

/// A specialized [`Result`] type for validation.
pub type Result<T> = core::result::Result<T, Error>;

/// A structural error in a color space, function, shading or image description.
///
/// The variants correspond to the PostScript errors a host interpreter should raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An object had the wrong type, for example a number where a dictionary was expected.
    TypeCheck,
    /// A value was outside of its permitted range, or an array had the wrong length.
    RangeCheck,
    /// A required dictionary entry or color space family is missing.
    Undefined,
    /// An implementation limit was exceeded.
    LimitCheck,
    /// Scanning or running a procedure failed.
    Procedure(pscolor_postscript::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeCheck => f.write_str("typecheck"),
            Self::RangeCheck => f.write_str("rangecheck"),
            Self::Undefined => f.write_str("undefined"),
            Self::LimitCheck => f.write_str("limitcheck"),
            Self::Procedure(e) => write!(f, "{e}"),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Procedure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<pscolor_postscript::Error> for Error {
    fn from(e: pscolor_postscript::Error) -> Self {
        Self::Procedure(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_postscript_names() {
        assert_eq!(Error::RangeCheck.to_string(), "rangecheck");
        assert_eq!(Error::Undefined.to_string(), "undefined");
        assert_eq!(
            Error::from(pscolor_postscript::Error::StackUnderflow).to_string(),
            "stackunderflow"
        );
    }
}
