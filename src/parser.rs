//! Recursive-descent parser for the expression language.
//!
//! Grammar, lowest precedence first:
//! ```text
//! expr     := arrow | ternary
//! arrow    := IDENT '=>' expr | '(' params ')' '=>' expr
//! ternary  := nullish ['?' expr ':' expr]
//! nullish  := or ('??' or)*
//! or       := and ('||' and)*
//! and      := equality ('&&' equality)*
//! equality := compare (('==' | '!=' | '===' | '!==') compare)*
//! compare  := additive (('<' | '<=' | '>' | '>=') additive)*
//! additive := mult (('+' | '-') mult)*
//! mult     := unary (('*' | '/' | '%') unary)*
//! unary    := ('!' | '-' | '+') unary | postfix
//! postfix  := primary ('.' IDENT | '[' expr ']' | '(' args ')')*
//! primary  := NUMBER | STRING | literal | IDENT | '(' expr ')' | array | object
//! ```

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::error::ExprError;
use crate::lexer::{Token, tokenize};
use crate::value::format_number;

/// Parse a complete expression; trailing tokens are an error.
pub fn parse_expression(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
    };
    if parser.tokens.is_empty() {
        return Err(ExprError::syntax("empty expression", 0));
    }
    let expr = parser.expression()?;
    if let Some((token, span)) = parser.tokens.get(parser.pos) {
        return Err(ExprError::syntax(
            format!("unexpected {}", token.describe()),
            span.start,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, logos::Span)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        if self.eat(&expected) {
            return Ok(());
        }
        Err(self.unexpected(&format!("expected {}", expected.describe())))
    }

    fn unexpected(&self, wanted: &str) -> ExprError {
        match self.peek() {
            Some(token) => ExprError::syntax(
                format!("{wanted}, found {}", token.describe()),
                self.offset(),
            ),
            None => ExprError::syntax(format!("{wanted}, found end of input"), self.end),
        }
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        if let Some(params) = self.arrow_params()? {
            let body = self.expression()?;
            return Ok(Expr::Arrow {
                params,
                body: Rc::new(body),
            });
        }
        self.ternary()
    }

    /// Consume an arrow-function head (`x =>` or `(a, b) =>`) if one starts here.
    fn arrow_params(&mut self) -> Result<Option<Vec<String>>, ExprError> {
        if let (Some(Token::Ident(name)), Some(Token::Arrow)) = (self.peek(), self.peek_at(1)) {
            let params = vec![name.clone()];
            self.pos += 2;
            return Ok(Some(params));
        }
        if self.peek() != Some(&Token::LParen) {
            return Ok(None);
        }

        // Look for `( ident, ident ... ) =>` without consuming anything.
        let mut offset = 1;
        let mut params = Vec::new();
        loop {
            match self.peek_at(offset) {
                Some(Token::RParen) => break,
                Some(Token::Ident(name)) => {
                    params.push(name.clone());
                    offset += 1;
                    match self.peek_at(offset) {
                        Some(Token::Comma) => offset += 1,
                        Some(Token::RParen) => break,
                        _ => return Ok(None),
                    }
                }
                _ => return Ok(None),
            }
        }
        if self.peek_at(offset + 1) != Some(&Token::Arrow) {
            return Ok(None);
        }
        self.pos += offset + 2;
        Ok(Some(params))
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let test = self.nullish()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(Token::Colon)?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical(
        &mut self,
        token: &Token,
        op: LogicalOp,
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut left = next(self)?;
        while self.eat(token) {
            let right = next(self)?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn nullish(&mut self) -> Result<Expr, ExprError> {
        self.logical(&Token::Nullish, LogicalOp::Nullish, Self::or)
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        self.logical(&Token::Or, LogicalOp::Or, Self::and)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        self.logical(&Token::And, LogicalOp::And, Self::equality)
    }

    fn binary(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.binary(
            &[
                (Token::StrictEq, BinaryOp::StrictEq),
                (Token::StrictNe, BinaryOp::StrictNe),
                (Token::Eq, BinaryOp::Eq),
                (Token::Ne, BinaryOp::Ne),
            ],
            Self::compare,
        )
    }

    fn compare(&mut self) -> Result<Expr, ExprError> {
        self.binary(
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let Some(Token::Ident(property)) = self.peek().cloned() else {
                    return Err(self.unexpected("expected property name after '.'"));
                };
                self.pos += 1;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::LParen) {
                let args = self.list(Token::RParen)?;
                expr = Expr::call(expr, args);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn list(&mut self, close: Token) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        loop {
            if self.eat(&close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let start = self.offset();
        let Some(token) = self.advance() else {
            return Err(self.unexpected("expected an expression"));
        };
        match token {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Bool(true),
                "false" => Expr::Bool(false),
                "null" => Expr::Null,
                "undefined" => Expr::Undefined,
                _ => Expr::Ident(name),
            }),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::Array(self.list(Token::RBracket)?)),
            Token::LBrace => self.object(),
            other => Err(ExprError::syntax(
                format!("expected an expression, found {}", other.describe()),
                start,
            )),
        }
    }

    fn object(&mut self) -> Result<Expr, ExprError> {
        let mut fields = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Object(fields));
            }
            let key = match self.peek() {
                Some(Token::Ident(name)) => name.clone(),
                Some(Token::Str(s)) => s.clone(),
                Some(Token::Number(n)) => format_number(*n),
                _ => return Err(self.unexpected("expected object key")),
            };
            self.pos += 1;
            let value = if self.eat(&Token::Colon) {
                self.expression()?
            } else {
                Expr::Ident(key.clone())
            };
            fields.push((key, value));
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace)?;
                return Ok(Expr::Object(fields));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(source: &str) -> String {
        parse_expression(source).unwrap().to_string()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(roundtrip("1 + 2 * 3"), "1 + (2 * 3)");
        assert_eq!(roundtrip("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(roundtrip("a || b && c"), "a || (b && c)");
        assert_eq!(roundtrip("$ > 1 && $ < 5"), "($ > 1) && ($ < 5)");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(roundtrip("10 - 4 - 3"), "(10 - 4) - 3");
    }

    #[test]
    fn test_member_index_call_chain() {
        assert_eq!(
            roundtrip("$.split(',')[0].trim()"),
            "$.split(\",\")[0].trim()"
        );
    }

    #[test]
    fn test_arrow_forms() {
        assert_eq!(roundtrip("x => x + 1"), "(x) => x + 1");
        assert_eq!(roundtrip("(a, b) => a + b"), "(a, b) => a + b");
        assert_eq!(roundtrip("() => 1"), "() => 1");
        assert_eq!(roundtrip("R.map(x => x * 2, $)"), "R.map((x) => x * 2, $)");
    }

    #[test]
    fn test_parenthesized_ident_is_not_arrow() {
        assert_eq!(roundtrip("($) + 1"), "$ + 1");
    }

    #[test]
    fn test_ternary_and_unary() {
        assert_eq!(roundtrip("!$ ? 'empty' : -i"), "(!$) ? \"empty\" : (-i)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(roundtrip("[1, 'a', true, null]"), "[1, \"a\", true, null]");
        assert_eq!(roundtrip("{a: 1, 'b c': $}"), "{\"a\": 1, \"b c\": $}");
        assert_eq!(roundtrip("{i}"), "{\"i\": i}");
    }

    #[test]
    fn test_unmatched_paren() {
        let err = parse_expression("R.toUpper($").unwrap_err();
        assert_eq!(
            err,
            ExprError::Syntax {
                message: "expected ')', found end of input".to_string(),
                position: 11
            }
        );
    }

    #[test]
    fn test_trailing_tokens() {
        let err = parse_expression("$ $").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { position: 2, .. }));
    }

    #[test]
    fn test_empty_expression() {
        assert!(matches!(
            parse_expression("   "),
            Err(ExprError::Syntax { .. })
        ));
    }

    #[test]
    fn test_dangling_operator() {
        assert!(parse_expression("$ +").is_err());
        assert!(parse_expression("$.").is_err());
        assert!(parse_expression("a ? b").is_err());
    }
}
