//! Expression parsing for HTMS.
//!
//! Precedence climbing over the shared token stream, lowest first:
//!
//! ```text
//! ternary  ?:
//! or       ||
//! and      &&
//! equality == !=
//! compare  < <= > >=
//! additive +
//! unary    !
//! postfix  .member
//! ```

use crate::ast::{BinaryOp, ContextPath, ExprKind, Expression};
use crate::parser::{PResult, Parser};
use htms_lexer::TokenKind;

type Level = fn(&mut Parser) -> PResult<Expression>;

impl Parser {
    /// Parse a complete expression.
    pub(crate) fn parse_expression(&mut self) -> PResult<Expression> {
        self.nested(Parser::parse_ternary)
    }

    fn parse_ternary(&mut self) -> PResult<Expression> {
        let condition = self.parse_or()?;
        if !self.check(&TokenKind::Question) {
            return Ok(condition);
        }

        self.advance(); // consume `?`
        let consequent = self.parse_expression()?;
        self.expect(&TokenKind::Colon, "':' in conditional expression")?;
        let alternate = self.parse_expression()?;

        let span = condition.span.to(alternate.span);
        Ok(Expression::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> PResult<Expression> {
        self.parse_left_assoc(&[(TokenKind::OrOr, BinaryOp::Or)], Parser::parse_and)
    }

    fn parse_and(&mut self) -> PResult<Expression> {
        self.parse_left_assoc(&[(TokenKind::AndAnd, BinaryOp::And)], Parser::parse_equality)
    }

    fn parse_equality(&mut self) -> PResult<Expression> {
        self.parse_left_assoc(
            &[
                (TokenKind::EqEq, BinaryOp::Eq),
                (TokenKind::NotEq, BinaryOp::NotEq),
            ],
            Parser::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> PResult<Expression> {
        self.parse_left_assoc(
            &[
                (TokenKind::Lt, BinaryOp::Lt),
                (TokenKind::LtEq, BinaryOp::LtEq),
                (TokenKind::Gt, BinaryOp::Gt),
                (TokenKind::GtEq, BinaryOp::GtEq),
            ],
            Parser::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> PResult<Expression> {
        self.parse_left_assoc(&[(TokenKind::Plus, BinaryOp::Add)], Parser::parse_unary)
    }

    fn parse_left_assoc(
        &mut self,
        operators: &[(TokenKind, BinaryOp)],
        next: Level,
    ) -> PResult<Expression> {
        let mut left = next(self)?;

        while let Some(op) = operators
            .iter()
            .find(|(kind, _)| self.check(kind))
            .map(|(_, op)| *op)
        {
            self.advance();
            let right = next(self)?;
            let span = left.span.to(right.span);
            left = Expression::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expression> {
        if self.check(&TokenKind::Bang) {
            return self.nested(|parser| {
                let start = parser.advance().span;
                let operand = parser.parse_unary()?;
                let span = start.to(operand.span);
                Ok(Expression::new(ExprKind::Not(Box::new(operand)), span))
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expression> {
        let token = self.peek().clone();

        let kind = match token.kind {
            TokenKind::String(value) => ExprKind::String(value),
            TokenKind::Number(value) => ExprKind::Number(value),
            TokenKind::Boolean(value) => ExprKind::Boolean(value),
            TokenKind::Identifier(_) => return self.parse_path(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "')' to close the parenthesized expression")?;
                return Ok(inner);
            }
            other => return Err(self.error(format!("Expected an expression, found {other}"))),
        };

        self.advance();
        Ok(Expression::new(kind, token.span))
    }

    /// `root.member.member`
    pub(crate) fn parse_path(&mut self) -> PResult<Expression> {
        let (root, start) = self.expect_identifier("a name")?;
        let mut segments = Vec::new();
        let mut end = start;

        while self.check(&TokenKind::Dot) {
            self.advance();
            let (segment, span) = self.expect_name("a property name after '.'")?;
            segments.push(segment);
            end = span;
        }

        Ok(Expression::new(
            ExprKind::Path(ContextPath { root, segments }),
            start.to(end),
        ))
    }
}
