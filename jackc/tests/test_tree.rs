//! Tree mode integration tests.
use jackc::prelude::*;

const SCOREBOARD: &str = include_str!("scoreboard.jack");

fn compile(source: &str) -> String {
    match jackc::compile_to_tree(source, Vec::new()) {
        Ok(out) => String::from_utf8(out).unwrap(),
        Err(err) => panic!("{}", err),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[test]
fn test_tree_minimal_class() {
    let tree = compile(
        "class Main {
            function void main() {
                return;
            }
        }",
    );

    let expected = "\
<class>
<keyword> class </keyword>
<identifier> Main </identifier>
<symbol> { </symbol>
<subroutineDec>
<keyword> function </keyword>
<keyword> void </keyword>
<identifier> main </identifier>
<symbol> ( </symbol>
<parameterList>
</parameterList>
<symbol> ) </symbol>
<subroutineBody>
<symbol> { </symbol>
<statements>
<returnStatement>
<keyword> return </keyword>
<symbol> ; </symbol>
</returnStatement>
</statements>
<symbol> } </symbol>
</subroutineBody>
</subroutineDec>
<symbol> } </symbol>
</class>
";
    assert_eq!(tree, expected);
}

#[test]
fn test_tree_expression_nesting() {
    let tree = compile(
        "class Main {
            function int main() {
                return 1 + 2;
            }
        }",
    );

    // The expression stays flat: term, operator leaf, term.
    let expected_fragment = "\
<expression>
<term>
<integerConstant> 1 </integerConstant>
</term>
<symbol> + </symbol>
<term>
<integerConstant> 2 </integerConstant>
</term>
</expression>
";
    assert!(tree.contains(expected_fragment), "tree was:\n{}", tree);
}

#[test]
fn test_tree_escapes_reserved_characters() {
    let tree = compile(
        "class Main {
            function boolean main(int i) {
                return i < 10;
            }
        }",
    );

    assert!(tree.contains("<symbol> &lt; </symbol>"));
    assert!(!tree.contains("<symbol> < </symbol>"));
}

#[test]
fn test_leaf_sequence_round_trips_tokens() {
    let tree = compile(SCOREBOARD);

    // Leaf lines carry text between the open and close tag; node
    // lines do not.
    let leaves: Vec<&str> = tree.lines().filter(|line| line.contains(" </")).collect();

    let tokens: Vec<Token> = Lexer::new(SCOREBOARD)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let mut expected = Vec::new();
    for token in tokens {
        let tag = match token.kind {
            TokenKind::Keyword(_) => "keyword",
            TokenKind::Sym(_) => "symbol",
            TokenKind::Number => "integerConstant",
            TokenKind::Str => "stringConstant",
            TokenKind::Ident => "identifier",
            TokenKind::Eof => continue,
        };
        expected.push(format!(
            "<{}> {} </{}>",
            tag,
            escape(token.text(SCOREBOARD)),
            tag
        ));
    }

    assert_eq!(leaves.len(), expected.len());
    for (leaf, expected) in leaves.iter().zip(&expected) {
        assert_eq!(*leaf, expected.as_str());
    }
}

#[test]
fn test_token_markup_matches_tree_leaves() {
    let tree = compile(SCOREBOARD);
    let tokens = String::from_utf8(jackc::write_tokens(SCOREBOARD, Vec::new()).unwrap()).unwrap();

    let tree_leaves: Vec<&str> = tree.lines().filter(|line| line.contains(" </")).collect();
    let token_leaves: Vec<&str> = tokens
        .lines()
        .filter(|line| line.contains(" </"))
        .collect();

    assert_eq!(tree_leaves, token_leaves);
    assert!(tokens.starts_with("<tokens>\n"));
    assert!(tokens.ends_with("</tokens>\n"));
}

#[test]
fn test_comment_style_does_not_change_tokens() {
    let plain = "class Main { function void main() { return; } }";
    let commented = "// header comment
class Main { /* inline */ function void main() {
    /* multi
       line */ return; // trailing
} }";

    let a = String::from_utf8(jackc::write_tokens(plain, Vec::new()).unwrap()).unwrap();
    let b = String::from_utf8(jackc::write_tokens(commented, Vec::new()).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_tree_var_decs_and_statements() {
    let tree = compile(SCOREBOARD);

    // One class, three classVarDec lines' worth of declarations.
    assert_eq!(tree.matches("<classVarDec>").count(), 3);
    assert_eq!(tree.matches("</classVarDec>").count(), 3);

    // Every opened production is closed.
    for tag in [
        "class",
        "subroutineDec",
        "parameterList",
        "subroutineBody",
        "varDec",
        "statements",
        "letStatement",
        "ifStatement",
        "whileStatement",
        "doStatement",
        "returnStatement",
        "expression",
        "term",
        "expressionList",
    ] {
        let open = format!("<{}>\n", tag);
        let close = format!("</{}>\n", tag);
        assert_eq!(
            tree.matches(open.as_str()).count(),
            tree.matches(close.as_str()).count(),
            "unbalanced {}",
            tag
        );
    }
}
