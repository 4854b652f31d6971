//! Buffered stream of tokens for look ahead.
use crate::{
    error::{JackError, JackResult, TokenError},
    lexer::{Lexer, LexerIter},
    tokens::{Span, Token, TokenKind},
};

use itertools::{multipeek, MultiPeek};

/// Buffered stream of tokens that allows look ahead.
///
/// Tokens are lazily lexed. Peeking or consuming the next token
/// triggers the internal lexer. The cursor is monotonic: tokens are
/// only ever consumed forward, never pushed back.
pub struct TokenStream<'a> {
    lexer: MultiPeek<LexerIter<'a>>,
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    source: &'a str,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            source: lexer.source_code(),
            lexer: multipeek(lexer),
        }
    }

    pub fn source_code(&self) -> &'a str {
        self.source
    }

    /// Helper function to extract the span's string fragment
    /// from the original source code.
    #[inline]
    pub fn span_fragment(&self, span: &Span) -> &'a str {
        span.fragment(self.source)
    }

    /// Output text of the given token. String constants lose their
    /// surrounding quotes.
    #[inline]
    pub fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }

    /// Consume the current token regardless of kind.
    ///
    /// Querying past the end of the stream is an error.
    pub fn next_token(&mut self) -> JackResult<Token> {
        match self.lexer.next() {
            Some(result) => result.map_err(JackError::from),
            None => Err(JackError::UnexpectedEof),
        }
    }

    /// Return the current token without advancing the cursor.
    pub fn peek(&mut self) -> JackResult<Token> {
        // Ensure clean peek state.
        self.lexer.reset_peek();

        let result = match self.lexer.peek() {
            Some(Ok(token)) => Ok(*token),
            Some(Err(err)) => Err(JackError::from(*err)),
            None => Err(JackError::UnexpectedEof),
        };

        self.lexer.reset_peek();
        result
    }

    /// Return the current token kind without advancing the cursor.
    #[inline]
    pub fn peek_kind(&mut self) -> JackResult<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    /// Return the current token and advance the cursor.
    ///
    /// The consumed token must match the given token kind, otherwise
    /// an unexpected-token error is returned. The cursor is not
    /// advanced if the kinds do not match.
    pub fn consume(&mut self, kind: TokenKind) -> JackResult<Token> {
        let token = self.peek()?;
        if token.kind != kind {
            return Err(JackError::from(TokenError {
                expected: kind,
                encountered: token.kind,
                span: token.span,
            }));
        }
        self.next_token()
    }

    /// Consume the current token if it matches the given kind.
    ///
    /// Returns true when matched. The cursor does not advance when the
    /// kinds do not match.
    pub fn match_token(&mut self, kind: TokenKind) -> JackResult<bool> {
        if self.peek_kind()? == kind {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokens::{Keyword, Sym};

    #[test]
    fn test_stream_consume() {
        let lexer = Lexer::new("return;");
        let mut stream = TokenStream::new(lexer);

        assert_eq!(
            stream.peek_kind().unwrap(),
            TokenKind::Keyword(Keyword::Return)
        );
        stream.consume(TokenKind::Keyword(Keyword::Return)).unwrap();
        stream.consume(TokenKind::Sym(Sym::Semicolon)).unwrap();
        stream.consume(TokenKind::Eof).unwrap();

        // The stream is exhausted; any further query is an error.
        assert!(matches!(
            stream.next_token(),
            Err(JackError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_stream_consume_mismatch_keeps_cursor() {
        let lexer = Lexer::new("x + 1");
        let mut stream = TokenStream::new(lexer);

        let err = stream.consume(TokenKind::Number).unwrap_err();
        assert!(matches!(err, JackError::Token(_)));

        // The mismatch did not eat the identifier.
        let token = stream.consume(TokenKind::Ident).unwrap();
        assert_eq!(stream.text(&token), "x");
    }

    #[test]
    fn test_stream_match_token() {
        let lexer = Lexer::new(", )");
        let mut stream = TokenStream::new(lexer);

        assert!(stream.match_token(TokenKind::Sym(Sym::Comma)).unwrap());
        assert!(!stream.match_token(TokenKind::Sym(Sym::Comma)).unwrap());
        assert!(stream.match_token(TokenKind::Sym(Sym::RightParen)).unwrap());
    }
}
