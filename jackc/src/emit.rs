//! Emission sinks.
//!
//! The grammar engine performs one walk regardless of output mode and
//! reports everything it does through the [`Emit`] trait. Tree sinks
//! implement the node and leaf calls; instruction sinks implement the
//! rest. Unused calls default to no-ops, so each sink carries only the
//! half it cares about.
//!
//! Output is append-only: a call writes immediately, in call order,
//! and nothing is ever reordered or revisited.
use std::fmt;
use std::io::Write;

use crate::error::JackResult;
use crate::lexer::Lexer;
use crate::tokens::TokenKind;

/// Grammar production node kinds for tree output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Class,
    ClassVarDec,
    SubroutineDec,
    ParameterList,
    SubroutineBody,
    VarDec,
    Statements,
    LetStatement,
    IfStatement,
    WhileStatement,
    DoStatement,
    ReturnStatement,
    Expression,
    Term,
    ExpressionList,
}

impl Node {
    #[rustfmt::skip]
    pub fn tag(&self) -> &'static str {
        match self {
            Node::Class           => "class",
            Node::ClassVarDec     => "classVarDec",
            Node::SubroutineDec   => "subroutineDec",
            Node::ParameterList   => "parameterList",
            Node::SubroutineBody  => "subroutineBody",
            Node::VarDec          => "varDec",
            Node::Statements      => "statements",
            Node::LetStatement    => "letStatement",
            Node::IfStatement     => "ifStatement",
            Node::WhileStatement  => "whileStatement",
            Node::DoStatement     => "doStatement",
            Node::ReturnStatement => "returnStatement",
            Node::Expression      => "expression",
            Node::Term            => "term",
            Node::ExpressionList  => "expressionList",
        }
    }
}

/// Storage segments of the target stack machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Constant => write!(f, "constant"),
            Self::Argument => write!(f, "argument"),
            Self::Local    => write!(f, "local"),
            Self::Static   => write!(f, "static"),
            Self::This     => write!(f, "this"),
            Self::That     => write!(f, "that"),
            Self::Pointer  => write!(f, "pointer"),
            Self::Temp     => write!(f, "temp"),
        }
    }
}

/// Zero-operand stack machine commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl fmt::Display for Command {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Neg => write!(f, "neg"),
            Self::Eq  => write!(f, "eq"),
            Self::Gt  => write!(f, "gt"),
            Self::Lt  => write!(f, "lt"),
            Self::And => write!(f, "and"),
            Self::Or  => write!(f, "or"),
            Self::Not => write!(f, "not"),
        }
    }
}

/// Capability surface connecting the grammar walk to an output mode.
#[allow(unused_variables)]
pub trait Emit {
    /// Open a node for a grammar production.
    fn open(&mut self, node: Node) -> JackResult<()> {
        Ok(())
    }

    /// Close the most recently opened node.
    fn close(&mut self, node: Node) -> JackResult<()> {
        Ok(())
    }

    /// One consumed token, tagged with its classified kind.
    fn leaf(&mut self, kind: TokenKind, text: &str) -> JackResult<()> {
        Ok(())
    }

    fn push(&mut self, segment: Segment, index: u16) -> JackResult<()> {
        Ok(())
    }

    fn pop(&mut self, segment: Segment, index: u16) -> JackResult<()> {
        Ok(())
    }

    fn command(&mut self, command: Command) -> JackResult<()> {
        Ok(())
    }

    fn label(&mut self, label: &str) -> JackResult<()> {
        Ok(())
    }

    fn goto(&mut self, label: &str) -> JackResult<()> {
        Ok(())
    }

    fn if_goto(&mut self, label: &str) -> JackResult<()> {
        Ok(())
    }

    fn call(&mut self, name: &str, n_args: u16) -> JackResult<()> {
        Ok(())
    }

    fn function(&mut self, name: &str, n_locals: u16) -> JackResult<()> {
        Ok(())
    }

    fn ret(&mut self) -> JackResult<()> {
        Ok(())
    }
}

/// Writes flat stack machine instructions, one per line.
pub struct VmWriter<W> {
    out: W,
}

impl<W: Write> VmWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Emit for VmWriter<W> {
    fn push(&mut self, segment: Segment, index: u16) -> JackResult<()> {
        writeln!(self.out, "push {} {}", segment, index)?;
        Ok(())
    }

    fn pop(&mut self, segment: Segment, index: u16) -> JackResult<()> {
        writeln!(self.out, "pop {} {}", segment, index)?;
        Ok(())
    }

    fn command(&mut self, command: Command) -> JackResult<()> {
        writeln!(self.out, "{}", command)?;
        Ok(())
    }

    fn label(&mut self, label: &str) -> JackResult<()> {
        writeln!(self.out, "label {}", label)?;
        Ok(())
    }

    fn goto(&mut self, label: &str) -> JackResult<()> {
        writeln!(self.out, "goto {}", label)?;
        Ok(())
    }

    fn if_goto(&mut self, label: &str) -> JackResult<()> {
        writeln!(self.out, "if-goto {}", label)?;
        Ok(())
    }

    fn call(&mut self, name: &str, n_args: u16) -> JackResult<()> {
        writeln!(self.out, "call {} {}", name, n_args)?;
        Ok(())
    }

    fn function(&mut self, name: &str, n_locals: u16) -> JackResult<()> {
        writeln!(self.out, "function {} {}", name, n_locals)?;
        Ok(())
    }

    fn ret(&mut self) -> JackResult<()> {
        writeln!(self.out, "return")?;
        Ok(())
    }
}

/// Writes nested markup, one tag pair per grammar production and one
/// leaf per consumed token.
pub struct TreeWriter<W> {
    out: W,
}

impl<W: Write> TreeWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Emit for TreeWriter<W> {
    fn open(&mut self, node: Node) -> JackResult<()> {
        writeln!(self.out, "<{}>", node.tag())?;
        Ok(())
    }

    fn close(&mut self, node: Node) -> JackResult<()> {
        writeln!(self.out, "</{}>", node.tag())?;
        Ok(())
    }

    fn leaf(&mut self, kind: TokenKind, text: &str) -> JackResult<()> {
        write_leaf(&mut self.out, kind, text)
    }
}

/// Markup tag for a classified token kind.
fn leaf_tag(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Keyword(_) => "keyword",
        TokenKind::Sym(_) => "symbol",
        TokenKind::Number => "integerConstant",
        TokenKind::Str => "stringConstant",
        TokenKind::Ident => "identifier",
        TokenKind::Eof => "unknown",
    }
}

fn write_leaf<W: Write>(out: &mut W, kind: TokenKind, text: &str) -> JackResult<()> {
    let tag = leaf_tag(kind);
    writeln!(out, "<{}> {} </{}>", tag, escape(text), tag)?;
    Ok(())
}

/// Escape markup-reserved characters in leaf text.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write the classified token sequence of one unit as flat markup,
/// one leaf per token inside a single `<tokens>` element.
pub fn write_tokens<W: Write>(source: &str, mut out: W) -> JackResult<W> {
    let mut lexer = Lexer::new(source);

    writeln!(out, "<tokens>")?;
    loop {
        let token = lexer.next_token()?;
        if token.kind == TokenKind::Eof {
            break;
        }
        write_leaf(&mut out, token.kind, token.text(source))?;
    }
    writeln!(out, "</tokens>")?;

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_escape_reserved() {
        assert_eq!(escape("a < b"), "a &lt; b");
        assert_eq!(escape("a & b > c"), "a &amp; b &gt; c");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_vm_writer_format() {
        let mut writer = VmWriter::new(Vec::new());
        writer.push(Segment::Constant, 7).unwrap();
        writer.pop(Segment::Temp, 0).unwrap();
        writer.command(Command::Add).unwrap();
        writer.label("WHILE_EXP0").unwrap();
        writer.if_goto("WHILE_END0").unwrap();
        writer.goto("WHILE_EXP0").unwrap();
        writer.call("Math.multiply", 2).unwrap();
        writer.function("Main.main", 3).unwrap();
        writer.ret().unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let expected = "\
push constant 7
pop temp 0
add
label WHILE_EXP0
if-goto WHILE_END0
goto WHILE_EXP0
call Math.multiply 2
function Main.main 3
return
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_tree_writer_leaf_format() {
        let mut writer = TreeWriter::new(Vec::new());
        writer.open(Node::Term).unwrap();
        writer
            .leaf(TokenKind::Sym(crate::tokens::Sym::Less), "<")
            .unwrap();
        writer.close(Node::Term).unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "<term>\n<symbol> &lt; </symbol>\n</term>\n");
    }

    #[test]
    fn test_write_tokens() {
        let out = write_tokens("let x = \"a<b\";", Vec::new()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = "\
<tokens>
<keyword> let </keyword>
<identifier> x </identifier>
<symbol> = </symbol>
<stringConstant> a&lt;b </stringConstant>
<symbol> ; </symbol>
</tokens>
";
        assert_eq!(text, expected);
    }
}
