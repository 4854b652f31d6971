//! Result and errors.
use std::fmt::{self, Display, Formatter};
use std::io;

use crate::constants::MAX_INT;
use crate::tokens::{Span, TokenKind};

pub type JackResult<T> = std::result::Result<T, JackError>;

/// Top level error for one compilation unit.
///
/// The first lexical or syntactic error aborts the unit; there is no
/// recovery and no second diagnostic.
#[derive(Debug)]
pub enum JackError {
    Lex(LexError),
    /// An exact token kind was expected and something else was found.
    Token(TokenError),
    /// The current token cannot start or continue the active production.
    Unexpected {
        expected: &'static str,
        encountered: TokenKind,
        span: Span,
    },
    /// An identifier used as a variable is declared in neither scope.
    UnresolvedSymbol { name: String, span: Span },
    /// The token cursor was queried past the end of the stream.
    UnexpectedEof,
    /// Destination unopenable or unwritable.
    Io(io::Error),
}

impl JackError {
    pub(crate) fn unexpected(expected: &'static str, encountered: TokenKind, span: Span) -> Self {
        Self::Unexpected {
            expected,
            encountered,
            span,
        }
    }

    /// Source location of the offending token, when there is one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lex(err) => err.span(),
            Self::Token(err) => Some(err.span),
            Self::Unexpected { span, .. } => Some(*span),
            Self::UnresolvedSymbol { span, .. } => Some(*span),
            Self::UnexpectedEof | Self::Io(_) => None,
        }
    }
}

impl Display for JackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(err) => Display::fmt(err, f),
            Self::Token(err) => Display::fmt(err, f),
            Self::Unexpected {
                expected,
                encountered,
                ..
            } => write!(f, "expected {}, found {}", expected, encountered),
            Self::UnresolvedSymbol { name, .. } => {
                write!(f, "variable '{}' is not defined", name)
            }
            Self::UnexpectedEof => write!(f, "unexpected end of source code"),
            Self::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for JackError {}

impl From<LexError> for JackError {
    fn from(err: LexError) -> Self {
        JackError::Lex(err)
    }
}

impl From<TokenError> for JackError {
    fn from(err: TokenError) -> Self {
        JackError::Token(err)
    }
}

impl From<io::Error> for JackError {
    fn from(err: io::Error) -> Self {
        JackError::Io(err)
    }
}

/// Error returned when an unexpected token kind is encountered.
#[derive(Debug, Clone, Copy)]
pub struct TokenError {
    pub expected: TokenKind,
    pub encountered: TokenKind,
    pub span: Span,
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "encountered unexpected token {}, expected {}",
            self.encountered, self.expected
        )
    }
}

impl std::error::Error for TokenError {}

#[derive(Debug, Clone, Copy)]
pub enum LexError {
    UnknownCharacter(char, Span),
    /// A string constant ran to end-of-file without a closing quote.
    UnterminatedString(Span),
    /// A block comment ran to end-of-file without its terminator.
    UnterminatedComment(Span),
    /// Integer constant outside the target word range.
    IntegerRange(Span),
}

impl LexError {
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnknownCharacter(_, span)
            | Self::UnterminatedString(span)
            | Self::UnterminatedComment(span)
            | Self::IntegerRange(span) => Some(*span),
        }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCharacter(c, _) => write!(f, "unknown character '{}'", c),
            Self::UnterminatedString(_) => write!(f, "string constant is not terminated"),
            Self::UnterminatedComment(_) => write!(f, "block comment is not terminated"),
            Self::IntegerRange(_) => {
                write!(f, "integer constant out of range (maximum is {})", MAX_INT)
            }
        }
    }
}

impl std::error::Error for LexError {}
