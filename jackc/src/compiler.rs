//! Grammar-driven compilation engine.
//!
//! One strict LL(1) recursive-descent walk over the token stream.
//! Every production decides from the current token alone, with no
//! backtracking, and reports each step to the emission sink. The same
//! walk serves both output modes; the sink decides what an emission
//! call turns into.
use crate::{
    emit::{Command, Emit, Node, Segment},
    error::{JackError, JackResult},
    lexer::Lexer,
    symbols::{Symbol, SymbolKind, SymbolTable},
    token_stream::TokenStream,
    tokens::{Keyword, Sym, Token, TokenKind},
};

/// Compiles one unit: a single class declaration.
///
/// Owns everything with unit lifetime: the token cursor, the symbol
/// table, and the label counter. Units never share state, so a batch
/// can run one `Compiler` per worker without coordination.
pub struct Compiler<'a, S> {
    tokens: TokenStream<'a>,
    symbols: SymbolTable,
    sink: S,
    /// Name of the class being compiled, once seen.
    class_name: String,
    /// Monotonic counter backing label allocation. Scoped to the unit
    /// so labels never collide across units.
    labels: u16,
}

impl<'a, S: Emit> Compiler<'a, S> {
    pub fn new(lexer: Lexer<'a>, sink: S) -> Self {
        Self {
            tokens: TokenStream::new(lexer),
            symbols: SymbolTable::new(),
            sink,
            class_name: String::new(),
            labels: 0,
        }
    }

    /// Compile the unit and hand back the sink.
    ///
    /// The entire token stream must form one class declaration;
    /// trailing tokens are an error.
    pub fn compile(mut self) -> JackResult<S> {
        self.compile_class()?;
        self.tokens.consume(TokenKind::Eof)?;
        Ok(self.sink)
    }
}

/// Token plumbing.
impl<'a, S: Emit> Compiler<'a, S> {
    /// Consume a token of the expected kind and report it to the sink.
    fn eat(&mut self, kind: TokenKind) -> JackResult<Token> {
        let token = self.tokens.consume(kind)?;
        self.leaf(&token)?;
        Ok(token)
    }

    fn eat_sym(&mut self, sym: Sym) -> JackResult<Token> {
        self.eat(TokenKind::Sym(sym))
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> JackResult<Token> {
        self.eat(TokenKind::Keyword(keyword))
    }

    /// Consume an identifier and return its text.
    fn eat_ident(&mut self) -> JackResult<String> {
        let token = self.eat(TokenKind::Ident)?;
        Ok(self.tokens.text(&token).to_owned())
    }

    /// Consume a declared type: `int`, `char`, `boolean`, or a class
    /// name.
    fn eat_type(&mut self) -> JackResult<String> {
        let token = self.tokens.peek()?;
        match token.kind {
            TokenKind::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean)
            | TokenKind::Ident => {
                self.tokens.next_token()?;
                self.leaf(&token)?;
                Ok(self.tokens.text(&token).to_owned())
            }
            kind => Err(JackError::unexpected("a type name", kind, token.span)),
        }
    }

    /// Consume a subroutine return type: `void` or a type.
    fn eat_return_type(&mut self) -> JackResult<()> {
        let token = self.tokens.peek()?;
        match token.kind {
            TokenKind::Keyword(
                Keyword::Void | Keyword::Int | Keyword::Char | Keyword::Boolean,
            )
            | TokenKind::Ident => {
                self.tokens.next_token()?;
                self.leaf(&token)
            }
            kind => Err(JackError::unexpected("a return type", kind, token.span)),
        }
    }

    fn leaf(&mut self, token: &Token) -> JackResult<()> {
        self.sink.leaf(token.kind, token.text(self.tokens.source_code()))
    }

    /// Resolve a token that must name a variable.
    fn resolve(&self, token: &Token) -> JackResult<Symbol> {
        let name = self.tokens.text(token);
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| JackError::UnresolvedSymbol {
                name: name.to_owned(),
                span: token.span,
            })
    }

    /// Draw the next value from the unit's label counter.
    fn next_label(&mut self) -> u16 {
        let id = self.labels;
        self.labels += 1;
        id
    }
}

/// Grammar productions.
impl<'a, S: Emit> Compiler<'a, S> {
    fn compile_class(&mut self) -> JackResult<()> {
        self.sink.open(Node::Class)?;

        self.eat_keyword(Keyword::Class)?;
        self.class_name = self.eat_ident()?;
        self.eat_sym(Sym::LeftBrace)?;

        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Keyword(Keyword::Static | Keyword::Field) => {
                    self.compile_class_var_dec()?
                }
                _ => break,
            }
        }

        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Keyword(
                    Keyword::Constructor | Keyword::Function | Keyword::Method,
                ) => self.compile_subroutine()?,
                _ => break,
            }
        }

        self.eat_sym(Sym::RightBrace)?;

        self.sink.close(Node::Class)?;
        Ok(())
    }

    fn compile_class_var_dec(&mut self) -> JackResult<()> {
        self.sink.open(Node::ClassVarDec)?;

        let kind = match self.tokens.peek_kind()? {
            TokenKind::Keyword(Keyword::Static) => {
                self.eat_keyword(Keyword::Static)?;
                SymbolKind::Static
            }
            _ => {
                self.eat_keyword(Keyword::Field)?;
                SymbolKind::Field
            }
        };

        let ty = self.eat_type()?;
        let name = self.eat_ident()?;
        self.symbols.define(&name, &ty, kind);

        while self.tokens.peek_kind()? == TokenKind::Sym(Sym::Comma) {
            self.eat_sym(Sym::Comma)?;
            let name = self.eat_ident()?;
            self.symbols.define(&name, &ty, kind);
        }

        self.eat_sym(Sym::Semicolon)?;

        self.sink.close(Node::ClassVarDec)?;
        Ok(())
    }

    fn compile_subroutine(&mut self) -> JackResult<()> {
        self.sink.open(Node::SubroutineDec)?;
        self.symbols.start_subroutine();

        let token = self.tokens.peek()?;
        let kind = match token.kind {
            TokenKind::Keyword(
                keyword @ (Keyword::Constructor | Keyword::Function | Keyword::Method),
            ) => {
                self.tokens.next_token()?;
                self.leaf(&token)?;
                keyword
            }
            kind => {
                return Err(JackError::unexpected(
                    "a subroutine declaration",
                    kind,
                    token.span,
                ))
            }
        };

        self.eat_return_type()?;
        let name = self.eat_ident()?;

        // The receiver occupies argument 0, ahead of any declared
        // parameter.
        if kind == Keyword::Method {
            self.symbols
                .define("this", &self.class_name, SymbolKind::Argument);
        }

        self.eat_sym(Sym::LeftParen)?;
        self.compile_parameter_list()?;
        self.eat_sym(Sym::RightParen)?;

        self.compile_subroutine_body(kind, &name)?;

        self.sink.close(Node::SubroutineDec)?;
        Ok(())
    }

    fn compile_parameter_list(&mut self) -> JackResult<()> {
        self.sink.open(Node::ParameterList)?;

        if self.tokens.peek_kind()? != TokenKind::Sym(Sym::RightParen) {
            let ty = self.eat_type()?;
            let name = self.eat_ident()?;
            self.symbols.define(&name, &ty, SymbolKind::Argument);

            while self.tokens.peek_kind()? == TokenKind::Sym(Sym::Comma) {
                self.eat_sym(Sym::Comma)?;
                let ty = self.eat_type()?;
                let name = self.eat_ident()?;
                self.symbols.define(&name, &ty, SymbolKind::Argument);
            }
        }

        self.sink.close(Node::ParameterList)?;
        Ok(())
    }

    fn compile_subroutine_body(&mut self, kind: Keyword, name: &str) -> JackResult<()> {
        self.sink.open(Node::SubroutineBody)?;
        self.eat_sym(Sym::LeftBrace)?;

        while self.tokens.peek_kind()? == TokenKind::Keyword(Keyword::Var) {
            self.compile_var_dec()?;
        }

        // The function directive carries the local count, so it can
        // only go out once every declaration is in the table.
        let full_name = format!("{}.{}", self.class_name, name);
        self.sink
            .function(&full_name, self.symbols.var_count(SymbolKind::Local))?;

        match kind {
            Keyword::Constructor => {
                // Allocate one word per field and anchor the object
                // pointer to the fresh block.
                self.sink
                    .push(Segment::Constant, self.symbols.var_count(SymbolKind::Field))?;
                self.sink.call("Memory.alloc", 1)?;
                self.sink.pop(Segment::Pointer, 0)?;
            }
            Keyword::Method => {
                // The receiver arrives as argument 0.
                self.sink.push(Segment::Argument, 0)?;
                self.sink.pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        self.compile_statements()?;
        self.eat_sym(Sym::RightBrace)?;

        self.sink.close(Node::SubroutineBody)?;
        Ok(())
    }

    fn compile_var_dec(&mut self) -> JackResult<()> {
        self.sink.open(Node::VarDec)?;

        self.eat_keyword(Keyword::Var)?;
        let ty = self.eat_type()?;
        let name = self.eat_ident()?;
        self.symbols.define(&name, &ty, SymbolKind::Local);

        while self.tokens.peek_kind()? == TokenKind::Sym(Sym::Comma) {
            self.eat_sym(Sym::Comma)?;
            let name = self.eat_ident()?;
            self.symbols.define(&name, &ty, SymbolKind::Local);
        }

        self.eat_sym(Sym::Semicolon)?;

        self.sink.close(Node::VarDec)?;
        Ok(())
    }

    fn compile_statements(&mut self) -> JackResult<()> {
        self.sink.open(Node::Statements)?;

        loop {
            match self.tokens.peek_kind()? {
                TokenKind::Keyword(Keyword::Let) => self.compile_let()?,
                TokenKind::Keyword(Keyword::If) => self.compile_if()?,
                TokenKind::Keyword(Keyword::While) => self.compile_while()?,
                TokenKind::Keyword(Keyword::Do) => self.compile_do()?,
                TokenKind::Keyword(Keyword::Return) => self.compile_return()?,
                // The caller checks that the token ending the sequence
                // is the closing symbol it expects.
                _ => break,
            }
        }

        self.sink.close(Node::Statements)?;
        Ok(())
    }

    fn compile_let(&mut self) -> JackResult<()> {
        self.sink.open(Node::LetStatement)?;

        self.eat_keyword(Keyword::Let)?;
        let target = self.tokens.consume(TokenKind::Ident)?;
        self.leaf(&target)?;

        let is_array = self.tokens.peek_kind()? == TokenKind::Sym(Sym::LeftBracket);
        if is_array {
            self.eat_sym(Sym::LeftBracket)?;
            self.compile_expression()?;
            self.eat_sym(Sym::RightBracket)?;

            // The element address goes on the stack before the
            // right-hand side is evaluated.
            let symbol = self.resolve(&target)?;
            self.sink.push(symbol.kind.segment(), symbol.index)?;
            self.sink.command(Command::Add)?;
        }

        self.eat_sym(Sym::Eq)?;
        self.compile_expression()?;
        self.eat_sym(Sym::Semicolon)?;

        if is_array {
            // Stack holds the address, then the value. Park the value,
            // re-anchor `that`, and store through it.
            self.sink.pop(Segment::Temp, 0)?;
            self.sink.pop(Segment::Pointer, 1)?;
            self.sink.push(Segment::Temp, 0)?;
            self.sink.pop(Segment::That, 0)?;
        } else {
            let symbol = self.resolve(&target)?;
            self.sink.pop(symbol.kind.segment(), symbol.index)?;
        }

        self.sink.close(Node::LetStatement)?;
        Ok(())
    }

    fn compile_if(&mut self) -> JackResult<()> {
        self.sink.open(Node::IfStatement)?;

        // All three targets come from one counter draw. Nested
        // statements draw fresh values before their bodies recurse,
        // so no target is ever reused in the unit.
        let id = self.next_label();
        let label_true = format!("IF_TRUE{}", id);
        let label_false = format!("IF_FALSE{}", id);
        let label_end = format!("IF_END{}", id);

        self.eat_keyword(Keyword::If)?;
        self.eat_sym(Sym::LeftParen)?;
        self.compile_expression()?;
        self.eat_sym(Sym::RightParen)?;

        self.sink.if_goto(&label_true)?;
        self.sink.goto(&label_false)?;
        self.sink.label(&label_true)?;

        self.eat_sym(Sym::LeftBrace)?;
        self.compile_statements()?;
        self.eat_sym(Sym::RightBrace)?;

        if self.tokens.peek_kind()? == TokenKind::Keyword(Keyword::Else) {
            self.sink.goto(&label_end)?;
            self.sink.label(&label_false)?;

            self.eat_keyword(Keyword::Else)?;
            self.eat_sym(Sym::LeftBrace)?;
            self.compile_statements()?;
            self.eat_sym(Sym::RightBrace)?;

            self.sink.label(&label_end)?;
        } else {
            // Without an else clause the false target is the join
            // point and the end label goes unused.
            self.sink.label(&label_false)?;
        }

        self.sink.close(Node::IfStatement)?;
        Ok(())
    }

    fn compile_while(&mut self) -> JackResult<()> {
        self.sink.open(Node::WhileStatement)?;

        let id = self.next_label();
        let label_test = format!("WHILE_EXP{}", id);
        let label_end = format!("WHILE_END{}", id);

        self.sink.label(&label_test)?;

        self.eat_keyword(Keyword::While)?;
        self.eat_sym(Sym::LeftParen)?;
        self.compile_expression()?;
        self.eat_sym(Sym::RightParen)?;

        // Fall through into the body only while the condition holds.
        self.sink.command(Command::Not)?;
        self.sink.if_goto(&label_end)?;

        self.eat_sym(Sym::LeftBrace)?;
        self.compile_statements()?;
        self.eat_sym(Sym::RightBrace)?;

        self.sink.goto(&label_test)?;
        self.sink.label(&label_end)?;

        self.sink.close(Node::WhileStatement)?;
        Ok(())
    }

    fn compile_do(&mut self) -> JackResult<()> {
        self.sink.open(Node::DoStatement)?;

        self.eat_keyword(Keyword::Do)?;
        let name = self.tokens.consume(TokenKind::Ident)?;
        self.leaf(&name)?;
        self.compile_call(&name)?;
        self.eat_sym(Sym::Semicolon)?;

        // A do statement ignores the callee's result.
        self.sink.pop(Segment::Temp, 0)?;

        self.sink.close(Node::DoStatement)?;
        Ok(())
    }

    fn compile_return(&mut self) -> JackResult<()> {
        self.sink.open(Node::ReturnStatement)?;

        self.eat_keyword(Keyword::Return)?;
        if self.tokens.peek_kind()? == TokenKind::Sym(Sym::Semicolon) {
            // Callers always expect a value on the stack.
            self.sink.push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }
        self.eat_sym(Sym::Semicolon)?;
        self.sink.ret()?;

        self.sink.close(Node::ReturnStatement)?;
        Ok(())
    }

    fn compile_expression(&mut self) -> JackResult<()> {
        self.sink.open(Node::Expression)?;

        self.compile_term()?;

        // Operators carry no precedence: a star binds exactly as
        // loosely as a minus. Operands are pushed as they are read and
        // the collected operators apply once the last term is down.
        let mut pending = Vec::new();
        loop {
            let (sym, op) = match self.tokens.peek_kind()? {
                TokenKind::Sym(sym) => match binary_op(sym) {
                    Some(op) => (sym, op),
                    None => break,
                },
                _ => break,
            };

            self.eat_sym(sym)?;
            self.compile_term()?;
            pending.push(op);
        }

        for op in pending.into_iter().rev() {
            match op {
                BinOp::Command(command) => self.sink.command(command)?,
                BinOp::Call(name) => self.sink.call(name, 2)?,
            }
        }

        self.sink.close(Node::Expression)?;
        Ok(())
    }

    fn compile_term(&mut self) -> JackResult<()> {
        self.sink.open(Node::Term)?;

        let token = self.tokens.peek()?;
        match token.kind {
            TokenKind::Number => {
                self.tokens.next_token()?;
                self.leaf(&token)?;
                // The lexer bounds integer constants, so this cannot
                // be out of range.
                let value = self
                    .tokens
                    .text(&token)
                    .parse::<u16>()
                    .map_err(|_| crate::error::LexError::IntegerRange(token.span))?;
                self.sink.push(Segment::Constant, value)?;
            }
            TokenKind::Str => {
                self.tokens.next_token()?;
                self.leaf(&token)?;

                // One allocation sized to the literal, then one append
                // per character in source order.
                let text = self.tokens.text(&token).to_owned();
                self.sink
                    .push(Segment::Constant, text.chars().count() as u16)?;
                self.sink.call("String.new", 1)?;
                for c in text.chars() {
                    self.sink.push(Segment::Constant, c as u16)?;
                    self.sink.call("String.appendChar", 2)?;
                }
            }
            TokenKind::Keyword(
                keyword @ (Keyword::True | Keyword::False | Keyword::Null | Keyword::This),
            ) => {
                self.tokens.next_token()?;
                self.leaf(&token)?;
                match keyword {
                    Keyword::True => {
                        self.sink.push(Segment::Constant, 0)?;
                        self.sink.command(Command::Not)?;
                    }
                    Keyword::False | Keyword::Null => {
                        self.sink.push(Segment::Constant, 0)?;
                    }
                    _ => self.sink.push(Segment::Pointer, 0)?,
                }
            }
            TokenKind::Ident => {
                self.tokens.next_token()?;
                self.leaf(&token)?;

                match self.tokens.peek_kind()? {
                    TokenKind::Sym(Sym::LeftBracket) => {
                        // Indexed read: address arithmetic, then read
                        // through `that`.
                        self.eat_sym(Sym::LeftBracket)?;
                        self.compile_expression()?;
                        self.eat_sym(Sym::RightBracket)?;

                        let symbol = self.resolve(&token)?;
                        self.sink.push(symbol.kind.segment(), symbol.index)?;
                        self.sink.command(Command::Add)?;
                        self.sink.pop(Segment::Pointer, 1)?;
                        self.sink.push(Segment::That, 0)?;
                    }
                    TokenKind::Sym(Sym::LeftParen | Sym::Dot) => {
                        self.compile_call(&token)?;
                    }
                    _ => {
                        let symbol = self.resolve(&token)?;
                        self.sink.push(symbol.kind.segment(), symbol.index)?;
                    }
                }
            }
            TokenKind::Sym(Sym::LeftParen) => {
                self.eat_sym(Sym::LeftParen)?;
                self.compile_expression()?;
                self.eat_sym(Sym::RightParen)?;
            }
            TokenKind::Sym(sym @ (Sym::Minus | Sym::Tilde)) => {
                self.eat_sym(sym)?;
                self.compile_term()?;
                let command = if sym == Sym::Minus {
                    Command::Neg
                } else {
                    Command::Not
                };
                self.sink.command(command)?;
            }
            kind => return Err(JackError::unexpected("a term", kind, token.span)),
        }

        self.sink.close(Node::Term)?;
        Ok(())
    }

    /// Subroutine call, entered after the leading identifier was
    /// consumed.
    ///
    /// Three shapes, decided by the next symbol and the symbol table:
    /// `name(...)` targets the current class with the current object
    /// as receiver; `var.method(...)` pushes the variable and targets
    /// its declared type; `Class.function(...)` passes through with no
    /// receiver.
    fn compile_call(&mut self, name_token: &Token) -> JackResult<()> {
        let name = self.tokens.text(name_token).to_owned();
        let mut n_args: u16 = 0;
        let full_name;

        if self.tokens.peek_kind()? == TokenKind::Sym(Sym::Dot) {
            self.eat_sym(Sym::Dot)?;
            let method = self.eat_ident()?;

            match self.symbols.get(&name).cloned() {
                Some(symbol) => {
                    // Method call on a variable: its value is the
                    // receiver.
                    self.sink.push(symbol.kind.segment(), symbol.index)?;
                    n_args += 1;
                    full_name = format!("{}.{}", symbol.ty, method);
                }
                None => {
                    // Not a variable, so the qualifier names a class.
                    full_name = format!("{}.{}", name, method);
                }
            }
        } else {
            // Unqualified calls stay within the current class and
            // take the current object as their receiver.
            self.sink.push(Segment::Pointer, 0)?;
            n_args += 1;
            full_name = format!("{}.{}", self.class_name, name);
        }

        self.eat_sym(Sym::LeftParen)?;
        n_args += self.compile_expression_list()?;
        self.eat_sym(Sym::RightParen)?;

        self.sink.call(&full_name, n_args)?;
        Ok(())
    }

    /// Returns the number of expressions in the list.
    fn compile_expression_list(&mut self) -> JackResult<u16> {
        self.sink.open(Node::ExpressionList)?;

        let mut count = 0;
        if self.tokens.peek_kind()? != TokenKind::Sym(Sym::RightParen) {
            self.compile_expression()?;
            count += 1;

            while self.tokens.peek_kind()? == TokenKind::Sym(Sym::Comma) {
                self.eat_sym(Sym::Comma)?;
                self.compile_expression()?;
                count += 1;
            }
        }

        self.sink.close(Node::ExpressionList)?;
        Ok(count)
    }
}

/// Stack effect of a binary operator.
enum BinOp {
    Command(Command),
    /// Operators without a machine primitive lower to runtime calls.
    Call(&'static str),
}

#[rustfmt::skip]
fn binary_op(sym: Sym) -> Option<BinOp> {
    match sym {
        Sym::Plus    => Some(BinOp::Command(Command::Add)),
        Sym::Minus   => Some(BinOp::Command(Command::Sub)),
        Sym::Star    => Some(BinOp::Call("Math.multiply")),
        Sym::Slash   => Some(BinOp::Call("Math.divide")),
        Sym::Amp     => Some(BinOp::Command(Command::And)),
        Sym::Pipe    => Some(BinOp::Command(Command::Or)),
        Sym::Less    => Some(BinOp::Command(Command::Lt)),
        Sym::Greater => Some(BinOp::Command(Command::Gt)),
        Sym::Eq      => Some(BinOp::Command(Command::Eq)),
        _ => None,
    }
}
