//! Tokens of a PostScript procedure.

use core::hash::{Hash, Hasher};
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};
use crate::name;
use crate::number::{self, Number};
use crate::procedure::Procedure;
use crate::reader::Reader;
use crate::string;

/// The maximum nesting depth of procedure bodies.
const MAX_NESTING: usize = 64;

/// A single token of a procedure body.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A number literal.
    Number(Number),
    /// A built-in operator.
    Operator(Op),
    /// A name that is not a known operator. Executable names are skipped
    /// during execution and literal names push nothing.
    Name {
        /// The bytes of the name.
        name: Arc<[u8]>,
        /// Whether the name was written as `/name`.
        literal: bool,
    },
    /// A string literal.
    String(Arc<[u8]>),
    /// A nested procedure body, which is pushed onto the stack when encountered.
    Procedure(Procedure),
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);

        match self {
            Self::Number(n) => n.hash(state),
            Self::Operator(op) => op.hash(state),
            Self::Name { name, literal } => {
                name.hash(state);
                literal.hash(state);
            }
            Self::String(s) => s.hash(state),
            Self::Procedure(p) => p.hash(state),
        }
    }
}

macro_rules! operators {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// An operator understood by the evaluator.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(missing_docs)]
        pub enum Op {
            $($variant),*
        }

        impl Op {
            /// Look up an operator by its PostScript name.
            pub fn from_name(name: &[u8]) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// The PostScript name of the operator.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => core::str::from_utf8($name).unwrap_or("")),*
                }
            }
        }
    };
}

operators! {
    // Stack.
    Dup => b"dup",
    Pop => b"pop",
    Exch => b"exch",
    Index => b"index",
    Roll => b"roll",
    Copy => b"copy",
    // Arithmetic.
    Add => b"add",
    Sub => b"sub",
    Mul => b"mul",
    Div => b"div",
    Idiv => b"idiv",
    Mod => b"mod",
    Exp => b"exp",
    Neg => b"neg",
    Abs => b"abs",
    Floor => b"floor",
    Ceiling => b"ceiling",
    Round => b"round",
    Truncate => b"truncate",
    Cvi => b"cvi",
    Cvr => b"cvr",
    Sqrt => b"sqrt",
    Sin => b"sin",
    Cos => b"cos",
    Atan => b"atan",
    Ln => b"ln",
    Log => b"log",
    // Relational, boolean and bitwise.
    Eq => b"eq",
    Ne => b"ne",
    Ge => b"ge",
    Gt => b"gt",
    Le => b"le",
    Lt => b"lt",
    Not => b"not",
    And => b"and",
    Or => b"or",
    Xor => b"xor",
    Bitshift => b"bitshift",
    True => b"true",
    False => b"false",
    // Control.
    If => b"if",
    IfElse => b"ifelse",
    Exec => b"exec",
    // Arrays and strings.
    Mark => b"[",
    ArrayEnd => b"]",
    Get => b"get",
    Length => b"length",
    // Accepted, but without effect.
    Bind => b"bind",
    Readonly => b"readonly",
}

impl Op {
    /// Whether the operator has no effect on the operand stack.
    pub fn is_no_op(self) -> bool {
        matches!(self, Self::Bind | Self::Readonly)
    }
}

/// Scan the body of a procedure. A leading `{` and its matching `}` are
/// optional, so both `{ 1 add }` and `1 add` are accepted.
pub(crate) fn parse(data: &[u8]) -> Result<Vec<Token>> {
    let mut r = Reader::new(data);
    r.skip_whitespace_and_comments();

    let tokens = if r.forward_tag(b"{").is_some() {
        let tokens = parse_body(&mut r, 1)?;
        r.skip_whitespace_and_comments();

        if r.peek_byte().is_some() {
            // Trailing content after the closing brace.
            return Err(Error::SyntaxError);
        }

        tokens
    } else {
        parse_body(&mut r, 0)?
    };

    Ok(tokens)
}

fn parse_body(r: &mut Reader<'_>, depth: usize) -> Result<Vec<Token>> {
    if depth > MAX_NESTING {
        return Err(Error::LimitCheck);
    }

    let mut tokens = vec![];

    loop {
        r.skip_whitespace_and_comments();

        let Some(b) = r.peek_byte() else {
            // Running out of data is only fine for a bare top-level body.
            return if depth == 0 {
                Ok(tokens)
            } else {
                Err(Error::SyntaxError)
            };
        };

        let token = match b {
            b'}' => {
                r.forward();

                return if depth == 0 {
                    Err(Error::SyntaxError)
                } else {
                    Ok(tokens)
                };
            }
            b'{' => {
                r.forward();
                Token::Procedure(Procedure::from_tokens(parse_body(r, depth + 1)?))
            }
            b'[' => {
                r.forward();
                Token::Operator(Op::Mark)
            }
            b']' => {
                r.forward();
                Token::Operator(Op::ArrayEnd)
            }
            b'(' => Token::String(string::read_literal(r)?.into()),
            b'<' | b'>' => {
                if let Some(delim @ (b"<<" | b">>")) = r.peek_bytes(2) {
                    r.forward();
                    r.forward();
                    // Dictionaries are never touched by the evaluator.
                    debug!("ignoring dictionary delimiter in procedure");

                    Token::Name {
                        name: delim.into(),
                        literal: false,
                    }
                } else if b == b'<' {
                    Token::String(string::read_hex(r)?.into())
                } else {
                    return Err(Error::SyntaxError);
                }
            }
            b'/' => {
                let name = name::parse_literal(r).ok_or(Error::SyntaxError)?;

                Token::Name {
                    name: name.into(),
                    literal: true,
                }
            }
            b')' | b'%' => return Err(Error::SyntaxError),
            _ => read_number_or_name(r)?,
        };

        tokens.push(token);
    }
}

fn read_number_or_name(r: &mut Reader<'_>) -> Result<Token> {
    let start = r.offset();

    if let Ok(n) = number::read(r) {
        return Ok(Token::Number(n));
    }

    // Things like `1a` or `-foo` are names.
    r.jump(start);
    let name = name::parse_executable(r).ok_or(Error::SyntaxError)?;

    let op = Op::from_name(name).or_else(|| (name == b"mark").then_some(Op::Mark));

    Ok(match op {
        Some(op) => Token::Operator(op),
        None => Token::Name {
            name: name.into(),
            literal: false,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_1() {
        let parsed = parse(b"{ copy dup 2.0 exch roll }").unwrap();

        assert_eq!(
            parsed,
            vec![
                Token::Operator(Op::Copy),
                Token::Operator(Op::Dup),
                Token::Number(Number::Real(2.0)),
                Token::Operator(Op::Exch),
                Token::Operator(Op::Roll),
            ]
        );
    }

    #[test]
    fn lex_nested() {
        let parsed = parse(b" {  {dup exch} if {0} {1} ifelse }").unwrap();

        assert_eq!(
            parsed,
            vec![
                Token::Procedure(Procedure::from_tokens(vec![
                    Token::Operator(Op::Dup),
                    Token::Operator(Op::Exch),
                ])),
                Token::Operator(Op::If),
                Token::Procedure(Procedure::from_tokens(vec![Token::Number(
                    Number::Integer(0)
                )])),
                Token::Procedure(Procedure::from_tokens(vec![Token::Number(
                    Number::Integer(1)
                )])),
                Token::Operator(Op::IfElse),
            ]
        );
    }

    #[test]
    fn lex_arrays_and_strings() {
        let parsed = parse(b"{[1 2](ab)<0A>length}").unwrap();

        assert_eq!(
            parsed,
            vec![
                Token::Operator(Op::Mark),
                Token::Number(Number::Integer(1)),
                Token::Number(Number::Integer(2)),
                Token::Operator(Op::ArrayEnd),
                Token::String(Arc::from(&b"ab"[..])),
                Token::String(Arc::from(&[0x0A][..])),
                Token::Operator(Op::Length),
            ]
        );
    }

    #[test]
    fn lex_unknown_names() {
        let parsed = parse(b"/foo bar 1a").unwrap();

        assert_eq!(
            parsed,
            vec![
                Token::Name {
                    name: Arc::from(&b"foo"[..]),
                    literal: true
                },
                Token::Name {
                    name: Arc::from(&b"bar"[..]),
                    literal: false
                },
                Token::Name {
                    name: Arc::from(&b"1a"[..]),
                    literal: false
                },
            ]
        );
    }

    #[test]
    fn lex_errors() {
        assert_eq!(parse(b"{ 1 2 add"), Err(Error::SyntaxError));
        assert_eq!(parse(b"1 2 }"), Err(Error::SyntaxError));
        assert_eq!(parse(b"{ 1 } 2"), Err(Error::SyntaxError));
        assert_eq!(parse(b"{ (abc }"), Err(Error::SyntaxError));
    }

    #[test]
    fn lex_nesting_limit() {
        let mut source = vec![b'{'; MAX_NESTING + 2];
        source.extend(vec![b'}'; MAX_NESTING + 2]);
        assert_eq!(parse(&source), Err(Error::LimitCheck));
    }

    #[test]
    fn operator_names() {
        assert_eq!(Op::from_name(b"ifelse"), Some(Op::IfElse));
        assert_eq!(Op::from_name(b"ceiling"), Some(Op::Ceiling));
        assert_eq!(Op::from_name(b"def"), None);
        assert_eq!(Op::Bitshift.name(), "bitshift");
    }
}
