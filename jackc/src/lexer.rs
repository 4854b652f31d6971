//! Lexical analysis
use crate::{
    constants::MAX_INT,
    cursor::{Cursor, EOF_CHAR},
    error::LexError,
    tokens::{Keyword, Span, Sym, Token, TokenKind},
};

pub struct Lexer<'a> {
    /// Character scanner
    cursor: Cursor<'a>,
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    original: &'a str,
    /// Start absolute byte position of the current token
    /// in the source.
    start_pos: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        let mut cursor = Cursor::new(source_code);

        // Initial state of the cursor is a non-existant EOF char,
        // but the initial state of the lexer should be a valid
        // token starting character.
        //
        // Prime the cursor for the first iteration.
        cursor.next();

        let start_pos = cursor.offset();

        Self {
            cursor,
            original: source_code,
            start_pos,
        }
    }

    /// Original source code that was passed in during construction.
    pub fn source_code(&self) -> &'a str {
        self.original
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Each call starts with the cursor pointing at the first
    /// unconsumed character, and leaves it at the start of the next
    /// token's text when the token is done.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        use TokenKind as TK;

        // Erase leading whitespace and comments. Comments can sit
        // back-to-back, so keep stripping until neither matches.
        loop {
            while is_whitespace(self.cursor.current()) {
                self.cursor.next();
            }

            if self.cursor.current() == '/' {
                match self.cursor.peek() {
                    '/' => self.erase_line_comment(),
                    '*' => self.erase_block_comment()?,
                    _ => break,
                }
            } else {
                break;
            }
        }

        // Assume that lexer initialization, or previous iteration,
        // leaves the cursor at the next character.
        self.start_token();

        match self.cursor.current() {
            '"' => self.consume_string(),
            '0'..='9' => self.consume_number(),
            '_' | 'a'..='z' | 'A'..='Z' => Ok(self.consume_ident()),
            EOF_CHAR if self.cursor.at_end() => Ok(self.make_token(TK::Eof)),
            c => match Sym::parse(c) {
                Some(sym) => Ok(self.make_token(TK::Sym(sym))),
                None => Err(LexError::UnknownCharacter(c, self.make_span())),
            },
        }
    }

    /// Indicates whether the lexer is at the end of the source.
    pub fn at_end(&self) -> bool {
        self.cursor.at_end()
    }

    /// Create a span using the starting position of the current token,
    /// and the current offset of the cursor.
    fn make_span(&self) -> Span {
        let start = self.start_pos;
        let end = self.cursor.peek_offset();

        // start and end can be equal, and a token can have 0 size.
        debug_assert!(end >= start);
        let size = end - start;

        Span { index: start, size }
    }

    fn fragment(&self) -> &str {
        self.make_span().fragment(self.original)
    }

    /// Primes the lexer to consume the next token.
    fn start_token(&mut self) {
        self.start_pos = self.cursor.offset();
    }

    /// Build a token, using the source text from the position stored
    /// by [`start_token`] to the current cursor position.
    ///
    /// Also prepare the cursor for the next iteration.
    fn make_token(&mut self, kind: TokenKind) -> Token {
        let token = Token {
            span: self.make_span(),
            kind,
        };

        // Position the cursor at the starting character for the
        // next token, so the lexer state is primed for the next
        // iteration.
        self.cursor.next();
        debug_assert_eq!(self.cursor.offset(), token.span.end());

        token
    }
}

/// Specialised tokens.
impl<'a> Lexer<'a> {
    /// Erase a `//` comment up to, but not including, the trailing
    /// newline.
    fn erase_line_comment(&mut self) {
        debug_assert_eq!(self.cursor.current(), '/');
        debug_assert_eq!(self.cursor.peek(), '/');

        while self.cursor.current() != '\n' && !self.cursor.at_end() {
            self.cursor.next();
        }
    }

    /// Erase a `/* ... */` comment, terminator included. The body may
    /// span multiple lines.
    fn erase_block_comment(&mut self) -> Result<(), LexError> {
        debug_assert_eq!(self.cursor.current(), '/');
        debug_assert_eq!(self.cursor.peek(), '*');

        // Record the opening in case the terminator never shows up.
        self.start_token();
        self.cursor.next(); // '*'

        loop {
            self.cursor.next();
            if self.cursor.at_end() {
                return Err(LexError::UnterminatedComment(self.make_span()));
            }
            if self.cursor.current() == '*' && self.cursor.peek() == '/' {
                self.cursor.next(); // '/'
                self.cursor.next(); // first character after the comment
                return Ok(());
            }
        }
    }

    /// Consume a double-quoted string constant.
    ///
    /// The quotes are part of the token's span and the contents are
    /// preserved verbatim.
    fn consume_string(&mut self) -> Result<Token, LexError> {
        debug_assert_eq!(self.cursor.current(), '"');

        loop {
            match self.cursor.next() {
                Some((_, '"')) => return Ok(self.make_token(TokenKind::Str)),
                Some((_, _)) => continue,
                None => return Err(LexError::UnterminatedString(self.make_span())),
            }
        }
    }

    /// Consume an integer constant and check that it fits the target
    /// word. Out-of-range literals are rejected, never wrapped.
    fn consume_number(&mut self) -> Result<Token, LexError> {
        debug_assert!(self.cursor.current().is_ascii_digit());

        while self.cursor.peek().is_ascii_digit() {
            self.cursor.next();
        }

        let token = self.make_token(TokenKind::Number);

        match token.span.fragment(self.original).parse::<u32>() {
            Ok(value) if value <= MAX_INT as u32 => Ok(token),
            _ => Err(LexError::IntegerRange(token.span)),
        }
    }

    /// Make an identifier token.
    fn consume_ident(&mut self) -> Token {
        debug_assert!(is_letter(self.cursor.current()));

        while is_letter_or_digit(self.cursor.peek()) {
            self.cursor.next();
        }

        // Keywords win over user defined identifiers.
        let token_kind = match Keyword::parse(self.fragment()) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident,
        };

        self.make_token(token_kind)
    }
}

/// Whitespace that separates tokens. Newlines carry no syntax.
fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_letter(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

fn is_letter_or_digit(c: char) -> bool {
    is_letter(c) || c.is_ascii_digit()
}

impl<'a> IntoIterator for Lexer<'a> {
    type Item = Result<Token, LexError>;
    type IntoIter = LexerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        LexerIter {
            lexer: self,
            done: false,
        }
    }
}

/// Convenience iterator that wraps the lexer.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct LexerIter<'a> {
    // Track end so the EOF token is emitted exactly once.
    done: bool,
    lexer: Lexer<'a>,
}

impl<'a> Iterator for LexerIter<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.lexer.next_token();

        // The stream ends at the EOF token, or at the first error.
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.done = true,
            Err(_) => self.done = true,
            _ => {}
        }

        Some(result)
    }
}
