//! Tokenizer for the expression language.
//!
//! Raw tokenization is handled entirely by logos. Keywords (`true`, `null`,
//! ...) come out as identifiers and are recognised by the parser.

use logos::Logos;

use crate::error::ExprError;

/// All tokens of the expression language.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    #[regex(r"'([^'\\]|\\.)*'", unescape)]
    Str(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("=>")]
    Arrow,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("??")]
    Nullish,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

impl Token {
    /// Short human-readable form used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Arrow => "'=>'".to_string(),
            Token::StrictEq => "'==='".to_string(),
            Token::StrictNe => "'!=='".to_string(),
            Token::Eq => "'=='".to_string(),
            Token::Ne => "'!='".to_string(),
            Token::Le => "'<='".to_string(),
            Token::Ge => "'>='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
            Token::Nullish => "'??'".to_string(),
            Token::Question => "'?'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
        }
    }
}

/// Strip the quotes from a string literal and resolve backslash escapes.
fn unescape(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Some(out)
}

/// Tokenize an expression, pairing each token with its byte span.
pub fn tokenize(source: &str) -> Result<Vec<(Token, logos::Span)>, ExprError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(ExprError::syntax(
                    format!("unexpected character sequence '{}'", lexer.slice()),
                    lexer.span().start,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_member_call() {
        assert_eq!(
            kinds("R.toUpper($)"),
            vec![
                Token::Ident("R".to_string()),
                Token::Dot,
                Token::Ident("toUpper".to_string()),
                Token::LParen,
                Token::Ident("$".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 3e2"),
            vec![Token::Number(1.0), Token::Number(2.5), Token::Number(300.0)]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#"'a\'b' "c\nd""#),
            vec![Token::Str("a'b".to_string()), Token::Str("c\nd".to_string())]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            kinds("a === b !== c => d ?? e"),
            vec![
                Token::Ident("a".to_string()),
                Token::StrictEq,
                Token::Ident("b".to_string()),
                Token::StrictNe,
                Token::Ident("c".to_string()),
                Token::Arrow,
                Token::Ident("d".to_string()),
                Token::Nullish,
                Token::Ident("e".to_string()),
            ]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("  $ + 1").unwrap();
        assert_eq!(tokens[0].1, 2..3);
        assert_eq!(tokens[1].1, 4..5);
        assert_eq!(tokens[2].1, 6..7);
    }

    #[test]
    fn test_unterminated_string_is_syntax_error() {
        let err = tokenize("'abc").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { .. }));
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("$ # 1").unwrap_err();
        assert_eq!(
            err,
            ExprError::Syntax {
                message: "unexpected character sequence '#'".to_string(),
                position: 2
            }
        );
    }
}
