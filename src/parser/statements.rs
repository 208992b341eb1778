//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Simple statements: assignment, augmented assignment, expression,
//!   `return`, `global`, `assert`, `pass`, `break`, `continue`
//! - Compound statements: `if`/`elif`/`else`, `while`, `for`, `def`
//! - Blocks: an indented suite or simple statements on the header line
//!
//! # Grammar
//!
//! ```text
//! statement   ::= compound | simple_line
//! simple_line ::= simple (";" simple)* [";"] NEWLINE
//! block       ::= NEWLINE INDENT statement+ DEDENT | simple_line
//! ```
//!
//! Only the first statement of a physical line is marked `starts_line`; the
//! interpreter raises line events for those alone.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use std::rc::Rc;

impl Parser {
    /// Parse one logical statement line, which may expand to several statements
    pub(crate) fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let compound: fn(&mut Self) -> Result<Stmt, ParseError> = match self.peek().kind {
            TokenKind::If => Self::parse_if_statement,
            TokenKind::While => Self::parse_while_statement,
            TokenKind::For => Self::parse_for_statement,
            TokenKind::Def => Self::parse_function_def,
            _ => return self.parse_simple_line(true),
        };
        Ok(vec![self.nested(compound)?])
    }

    /// Parse the suite after a compound statement header's `:`
    pub(crate) fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if !self.match_token(&TokenKind::Newline) {
            // `if x: y = 1` keeps the body on the header line
            return self.parse_simple_line(false);
        }

        self.expect_token(&TokenKind::Indent, "expected an indented block")?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            statements.extend(self.parse_statement()?);
        }
        self.match_token(&TokenKind::Dedent);

        Ok(statements)
    }

    fn parse_simple_line(&mut self, starts_line: bool) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = vec![self.parse_simple_statement(starts_line)?];

        while self.match_token(&TokenKind::Semicolon) {
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
            statements.push(self.parse_simple_statement(false)?);
        }

        if !self.match_token(&TokenKind::Newline) && !self.is_at_end() {
            return Err(self.error_here("expected end of line"));
        }

        Ok(statements)
    }

    fn parse_simple_statement(&mut self, starts_line: bool) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        let kind = match self.peek().kind {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Return => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expression_list()?))
                }
            }
            TokenKind::Global => {
                self.advance();
                let mut names = vec![self.expect_identifier("after 'global'")?];
                while self.match_token(&TokenKind::Comma) {
                    names.push(self.expect_identifier("after ','")?);
                }
                StmtKind::Global(names)
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_expression()?;
                let message = if self.match_token(&TokenKind::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            _ => self.parse_expression_statement()?,
        };

        Ok(Stmt {
            kind,
            location,
            starts_line,
        })
    }

    /// Expression statement, assignment chain, or augmented assignment
    fn parse_expression_statement(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.parse_expression_list()?;

        if let Some(op) = self.augmented_operator() {
            let location = self.current_location();
            self.advance();
            let target = to_target(first, location)?;
            if matches!(target, Target::Tuple(_)) {
                return Err(ParseError::new(
                    "illegal expression for augmented assignment",
                    location,
                ));
            }
            let value = self.parse_expression_list()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        if !self.check(&TokenKind::Assign) {
            return Ok(StmtKind::Expr(first));
        }

        let mut chain = vec![(first, self.current_location())];
        while self.match_token(&TokenKind::Assign) {
            let location = self.current_location();
            chain.push((self.parse_expression_list()?, location));
        }

        let (value, _) = chain.pop().ok_or_else(|| self.error_here("expected a value"))?;
        let targets = chain
            .into_iter()
            .map(|(expr, location)| to_target(expr, location))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StmtKind::Assign { targets, value })
    }

    fn augmented_operator(&self) -> Option<BinOp> {
        match self.peek().kind {
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::DoubleSlashEq => Some(BinOp::FloorDiv),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => None,
        }
    }

    pub(crate) fn at_statement_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof
        )
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_token(&TokenKind::If, "expected 'if'")?;

        let test = self.parse_expression()?;
        self.expect_colon("after if condition")?;
        let body = self.parse_block()?;
        let mut branches = vec![IfBranch {
            test,
            body,
            location,
        }];

        while self.check(&TokenKind::Elif) {
            let location = self.current_location();
            self.advance();
            let test = self.parse_expression()?;
            self.expect_colon("after elif condition")?;
            let body = self.parse_block()?;
            branches.push(IfBranch {
                test,
                body,
                location,
            });
        }

        let orelse = if self.match_token(&TokenKind::Else) {
            self.expect_colon("after 'else'")?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt {
            kind: StmtKind::If { branches, orelse },
            location,
            starts_line: true,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_token(&TokenKind::While, "expected 'while'")?;

        let test = self.parse_expression()?;
        self.expect_colon("after while condition")?;
        let body = self.parse_block()?;

        Ok(Stmt {
            kind: StmtKind::While { test, body },
            location,
            starts_line: true,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_token(&TokenKind::For, "expected 'for'")?;

        let target = self.parse_target_list()?;
        self.expect_token(&TokenKind::In, "expected 'in' after for target")?;
        let iter = self.parse_expression_list()?;
        self.expect_colon("after for clause")?;
        let body = self.parse_block()?;

        Ok(Stmt {
            kind: StmtKind::For { target, iter, body },
            location,
            starts_line: true,
        })
    }

    /// Loop target: names, subscripts or tuples of them, stopping before `in`
    pub(crate) fn parse_target_list(&mut self) -> Result<Target, ParseError> {
        let location = self.current_location();
        let first = self.parse_bitwise_or()?;
        if !self.check(&TokenKind::Comma) {
            return to_target(first, location);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::In) {
                break;
            }
            items.push(self.parse_bitwise_or()?);
        }
        to_target(Expr::Tuple(items), location)
    }

    fn parse_function_def(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current_location();
        self.expect_token(&TokenKind::Def, "expected 'def'")?;

        let name = self.expect_identifier("after 'def'")?;
        self.expect_token(&TokenKind::LParen, "expected '(' after function name")?;

        let mut params: Vec<Param> = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param_location = self.current_location();
            let param = self.expect_identifier("in parameter list")?;
            let default = if self.match_token(&TokenKind::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(ParseError::new(
                    "non-default argument follows default argument",
                    param_location,
                ));
            }
            if params.iter().any(|p| p.name == param) {
                return Err(ParseError::new(
                    format!("duplicate argument '{param}' in function definition"),
                    param_location,
                ));
            }
            params.push(Param {
                name: param,
                default,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rparen("after parameters")?;
        self.expect_colon("after function signature")?;
        let body = self.parse_block()?;

        Ok(Stmt {
            kind: StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body,
                location,
            })),
            location,
            starts_line: true,
        })
    }
}

/// Convert a parsed expression into an assignment target
pub(crate) fn to_target(expr: Expr, location: SourceLocation) -> Result<Target, ParseError> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Index { value, index } => Ok(Target::Index {
            value: *value,
            index: *index,
        }),
        Expr::Tuple(items) | Expr::List(items) => {
            let targets = items
                .into_iter()
                .map(|item| to_target(item, location))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Target::Tuple(targets))
        }
        Expr::Call { .. } => Err(ParseError::new(
            "cannot assign to function call",
            location,
        )),
        _ => Err(ParseError::new("cannot assign to expression", location)),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse;

    #[test]
    fn test_inline_block_does_not_start_line() {
        let program = parse("while i < 3: i += 1\n").unwrap();
        match &program.body[0].kind {
            StmtKind::While { body, .. } => {
                assert_eq!(body.len(), 1);
                assert!(!body[0].starts_line);
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_tuple_target() {
        let program = parse("for i, v in enumerate(xs):\n    pass\n").unwrap();
        match &program.body[0].kind {
            StmtKind::For { target, .. } => {
                assert!(matches!(target, Target::Tuple(items) if items.len() == 2));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_assignment() {
        let program = parse("a = b = 0\n").unwrap();
        match &program.body[0].kind {
            StmtKind::Assign { targets, .. } => assert_eq!(targets.len(), 2),
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_augmented_subscript() {
        let program = parse("counts[k] += 1\n").unwrap();
        assert!(matches!(
            &program.body[0].kind,
            StmtKind::AugAssign { target: Target::Index { .. }, op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_invalid_targets_rejected() {
        assert!(parse("f() = 1\n").is_err());
        assert!(parse("1 = x\n").is_err());
        assert!(parse("a, b += 1\n").is_err());
        assert!(parse("def f(a=1, b):\n    pass\n").is_err());
    }

    #[test]
    fn test_nested_blocks() {
        let source = "def f(n):\n    total = 0\n    for i in range(n):\n        if i % 2:\n            total += i\n    return total\n";
        let program = parse(source).unwrap();
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.body.len(), 3);
                assert_eq!(def.body[2].location.line, 6);
            }
            other => panic!("expected def, got {:?}", other),
        }
    }
}
