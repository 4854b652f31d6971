//! Single-pass compiler for a small class-based language, targeting a
//! stack machine.
//!
//! One compilation unit is one class. A unit compiles to either flat
//! stack machine instructions or a structural parse tree in markup
//! form; both outputs come from the same grammar walk, switched by the
//! emission sink.
pub mod compiler;
pub mod constants;
mod cursor;
pub mod emit;
pub mod error;
pub mod lexer;
pub mod symbols;
pub mod token_stream;
pub mod tokens;

use std::io::Write;

use crate::{
    compiler::Compiler,
    emit::{TreeWriter, VmWriter},
    error::JackResult,
    lexer::Lexer,
};

/// Compile one unit to stack machine instructions.
pub fn compile_to_vm<W: Write>(source: &str, out: W) -> JackResult<W> {
    let lexer = Lexer::new(source);
    let writer = Compiler::new(lexer, VmWriter::new(out)).compile()?;
    Ok(writer.into_inner())
}

/// Compile one unit to its parse tree in markup form.
pub fn compile_to_tree<W: Write>(source: &str, out: W) -> JackResult<W> {
    let lexer = Lexer::new(source);
    let writer = Compiler::new(lexer, TreeWriter::new(out)).compile()?;
    Ok(writer.into_inner())
}

/// Write one unit's classified token sequence as flat markup.
pub fn write_tokens<W: Write>(source: &str, out: W) -> JackResult<W> {
    emit::write_tokens(source, out)
}

pub mod prelude {
    pub use super::{
        compiler::Compiler,
        emit::{Emit, TreeWriter, VmWriter},
        error::{JackError, JackResult, LexError, TokenError},
        lexer::Lexer,
        symbols::{SymbolKind, SymbolTable},
        token_stream::TokenStream,
        tokens::{Keyword, Span, Sym, Token, TokenKind},
    };
}
