//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses recursive descent with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `statements`: simple and compound statements, blocks
//! - `expressions`: expressions by precedence level, f-strings
//!
//! Parser methods are split across files using `impl Parser` blocks, so each
//! module extends the Parser with related functionality while sharing its state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use thiserror::Error;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("line {}: {message}", .location.line)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        ParseError {
            message: message.into(),
            location,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Parse a complete source unit
pub fn parse(source: &str) -> Result<Program, ParseError> {
    Parser::new(source)?.parse_program()
}

/// Deepest nesting of brackets, unary operators and blocks the parser accepts
pub const MAX_NESTING: usize = 100;

/// Recursive descent parser for the scripting subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            depth: 0,
        })
    }

    /// Parse the entire program
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            if self.check(&TokenKind::Indent) {
                return Err(ParseError::new(
                    "unexpected indent",
                    self.current_location(),
                ));
            }
            let statements = self.parse_statement()?;
            program.body.extend(statements);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`]
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                format!("too many nested levels (limit is {})", MAX_NESTING),
                self.current_location(),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn check_ahead(&self, n: usize, kind: &TokenKind) -> bool {
        self.peek_ahead(n)
            .is_some_and(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.position.min(last)]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        message: &str,
    ) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    pub(crate) fn expect_colon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::Colon, &format!("expected ':' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RParen, &format!("expected ')' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self, ctx: &str) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_here(&format!("expected a name {ctx}")))
        }
    }

    pub(crate) fn error_here(&self, message: &str) -> ParseError {
        ParseError::new(
            format!("invalid syntax: {}, found {}", message, self.peek()),
            self.current_location(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment_and_print() {
        let program = parse("x = 1\nprint(x)\n").unwrap();
        assert_eq!(program.body.len(), 2);
        match &program.body[0].kind {
            StmtKind::Assign { targets, .. } => {
                assert!(matches!(&targets[0], Target::Name(n) if n == "x"));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
        assert_eq!(program.body[1].location.line, 2);
    }

    #[test]
    fn test_parse_function_def() {
        let source = "def add(a, b=2):\n    return a + b\n";
        let program = parse(source).unwrap();
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name, "add");
                assert_eq!(def.params.len(), 2);
                assert!(def.params[1].default.is_some());
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_elif_else() {
        let source = "if x > 0:\n    y = 1\nelif x < 0:\n    y = -1\nelse:\n    y = 0\n";
        let program = parse(source).unwrap();
        assert_eq!(program.body.len(), 1);
        match &program.body[0].kind {
            StmtKind::If { branches, orelse } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(branches[1].location.line, 3);
                assert!(orelse.is_some());
            }
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_semicolon_statements_share_a_line() {
        let program = parse("a = 1; b = 2\n").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(program.body[0].starts_line);
        assert!(!program.body[1].starts_line);
    }

    #[test]
    fn test_tuple_unpacking_target() {
        let program = parse("a, b = b, a\n").unwrap();
        match &program.body[0].kind {
            StmtKind::Assign { targets, value } => {
                assert!(matches!(&targets[0], Target::Tuple(items) if items.len() == 2));
                assert!(matches!(value, Expr::Tuple(items) if items.len() == 2));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison() {
        let program = parse("ok = 0 <= i < n\n").unwrap();
        match &program.body[0].kind {
            StmtKind::Assign { value: Expr::Compare { rest, .. }, .. } => {
                assert_eq!(rest.len(), 2);
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("x = 1\ny = (2\n").unwrap_err();
        assert!(err.location.line >= 2);
        let err = parse("if x\n    y = 1\n").unwrap_err();
        assert_eq!(err.location.line, 1);
    }

    /// Parse on a thread with room for deep recursion; returns the error message
    fn parse_error_of(source: String) -> Option<String> {
        std::thread::Builder::new()
            .name("deep_parse".to_string())
            .stack_size(16 * 1024 * 1024)
            .spawn(move || parse(&source).err().map(|err| err.message))
            .expect("spawn parse thread")
            .join()
            .expect("parser does not panic")
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse_error_of(nested(MAX_NESTING - 1)), None);

        let message = parse_error_of(nested(20_000)).expect("too deep");
        assert!(message.contains("too many nested levels"));

        let negations = format!("x = {}1\n", "-".repeat(20_000));
        assert!(parse_error_of(negations).is_some());
    }

    #[test]
    fn test_block_nesting_limit() {
        let mut source = String::new();
        for level in 0..MAX_NESTING + 1 {
            source.push_str(&" ".repeat(level));
            source.push_str("if True:\n");
        }
        source.push_str(&" ".repeat(MAX_NESTING + 1));
        source.push_str("pass\n");
        let message = parse_error_of(source).expect("too deep");
        assert!(message.contains("too many nested levels"));
    }
}
