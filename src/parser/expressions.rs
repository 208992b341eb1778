//! Expression parsing implementation
//!
//! This module handles parsing of all expression types using precedence climbing.
//!
//! # Operator Precedence (lowest to highest)
//!
//! 1. Conditional: `a if cond else b`
//! 2. Logical OR: `or`
//! 3. Logical AND: `and`
//! 4. Logical NOT: `not`
//! 5. Comparison: `==`, `!=`, `<`, `<=`, `>`, `>=`, `in`, `not in`, `is`, `is not`
//! 6. Bitwise OR: `|`
//! 7. Bitwise XOR: `^`
//! 8. Bitwise AND: `&`
//! 9. Shift: `<<`, `>>`
//! 10. Additive: `+`, `-`
//! 11. Multiplicative: `*`, `/`, `//`, `%`
//! 12. Unary: `-`, `+`, `~`
//! 13. Power: `**` (right-associative, binds tighter than a unary on its left)
//! 14. Postfix: calls, subscripts, slices, attribute access
//!
//! Comparisons chain: `a < b < c` is a single [`Expr::Compare`] node.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Comma-separated expressions; more than one yields a tuple
    pub(crate) fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let body = self.parse_or()?;

        if self.match_token(&TokenKind::If) {
            let test = self.parse_or()?;
            self.expect_token(&TokenKind::Else, "expected 'else' in conditional expression")?;
            let orelse = self.parse_expression()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            });
        }

        Ok(body)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.match_token(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.match_token(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::Not) {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let first = self.parse_bitwise_or()?;
        let mut rest = Vec::new();

        while let Some(op) = self.comparison_operator() {
            rest.push((op, self.parse_bitwise_or()?));
        }

        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    /// Consume a comparison operator, including the two-word forms
    fn comparison_operator(&mut self) -> Option<CmpOp> {
        let op = match self.peek().kind {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::NotEq => CmpOp::NotEq,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            TokenKind::In => CmpOp::In,
            TokenKind::Not if self.check_ahead(1, &TokenKind::In) => {
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Is => {
                if self.check_ahead(1, &TokenKind::Not) {
                    self.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    pub(crate) fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.match_token(&TokenKind::Pipe) {
            let right = self.parse_bitwise_xor()?;
            left = binary(BinOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.match_token(&TokenKind::Caret) {
            let right = self.parse_bitwise_and()?;
            left = binary(BinOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        while self.match_token(&TokenKind::Amp) {
            let right = self.parse_shift()?;
            left = binary(BinOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::DoubleSlash => BinOp::FloorDiv,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.match_token(&TokenKind::DoubleStar) {
            // -2 ** 2 == -(2 ** 2), but 2 ** -1 is allowed
            let exponent = self.parse_unary()?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.match_token(&TokenKind::LParen) {
                expr = self.parse_call(expr)?;
            } else if self.match_token(&TokenKind::LBracket) {
                expr = self.parse_subscript(expr)?;
            } else if self.match_token(&TokenKind::Dot) {
                let name = self.expect_identifier("after '.'")?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_call(&mut self, func: Expr) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();

        while !self.check(&TokenKind::RParen) {
            let is_keyword = matches!(self.peek().kind, TokenKind::Ident(_))
                && self.check_ahead(1, &TokenKind::Assign);

            if is_keyword {
                let location = self.current_location();
                let name = self.expect_identifier("for keyword argument")?;
                self.advance(); // '='
                if kwargs.iter().any(|(k, _)| *k == name) {
                    return Err(ParseError::new(
                        format!("keyword argument repeated: {name}"),
                        location,
                    ));
                }
                kwargs.push((name, self.parse_expression()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                let arg = self.parse_expression()?;
                if self.check(&TokenKind::For) && args.is_empty() {
                    // sum(x for x in xs) evaluates like a list comprehension
                    args.push(self.parse_comprehension(arg)?);
                    break;
                }
                args.push(arg);
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_rparen("after arguments")?;

        Ok(Expr::Call {
            func: Box::new(func),
            args,
            kwargs,
        })
    }

    fn parse_subscript(&mut self, value: Expr) -> Result<Expr, ParseError> {
        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        if !self.match_token(&TokenKind::Colon) {
            let index = lower.ok_or_else(|| self.error_here("expected index"))?;
            self.expect_token(&TokenKind::RBracket, "expected ']' after index")?;
            return Ok(Expr::Index {
                value: Box::new(value),
                index: Box::new(index),
            });
        }

        let upper = if self.check(&TokenKind::Colon) || self.check(&TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let step = if self.match_token(&TokenKind::Colon) && !self.check(&TokenKind::RBracket) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect_token(&TokenKind::RBracket, "expected ']' after slice")?;

        Ok(Expr::Slice {
            value: Box::new(value),
            lower: lower.map(Box::new),
            upper,
            step,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let location = self.current_location();
        let kind = self.peek().kind.clone();

        match kind {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Int(value))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Float(value))
            }
            TokenKind::Str(_) | TokenKind::FString(_) => self.parse_string_literals(),
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::None)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            TokenKind::LParen => {
                self.advance();
                self.parse_parenthesized()
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_list_display()
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_dict_display(location)
            }
            _ => Err(self.error_here("expected expression")),
        }
    }

    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let comp = self.parse_comprehension(first)?;
            self.expect_rparen("after generator expression")?;
            return Ok(comp);
        }
        if !self.check(&TokenKind::Comma) {
            self.expect_rparen("to close '('")?;
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_rparen("to close tuple")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list_display(&mut self) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }

        let first = self.parse_expression()?;
        if self.check(&TokenKind::For) {
            let comp = self.parse_comprehension(first)?;
            self.expect_token(&TokenKind::RBracket, "expected ']' after comprehension")?;
            return Ok(comp);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expression()?);
        }
        self.expect_token(&TokenKind::RBracket, "expected ']' to close list")?;
        Ok(Expr::List(items))
    }

    fn parse_dict_display(&mut self, location: SourceLocation) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                return Err(ParseError::new("set literals are not supported", location));
            }
            self.advance();
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBrace, "expected '}' to close dict")?;

        Ok(Expr::Dict(entries))
    }

    /// `for target in iter [if cond]*` following an element expression
    fn parse_comprehension(&mut self, element: Expr) -> Result<Expr, ParseError> {
        self.expect_token(&TokenKind::For, "expected 'for'")?;
        let target = self.parse_target_list()?;
        self.expect_token(&TokenKind::In, "expected 'in' in comprehension")?;
        let iter = self.parse_or()?;

        let mut conditions = Vec::new();
        while self.match_token(&TokenKind::If) {
            conditions.push(self.parse_or()?);
        }
        if self.check(&TokenKind::For) {
            return Err(self.error_here("nested comprehension clauses are not supported"));
        }

        Ok(Expr::ListComp {
            element: Box::new(element),
            target: Box::new(target),
            iter: Box::new(iter),
            conditions,
        })
    }

    /// Adjacent string literals concatenate; any f-string makes the result an f-string
    fn parse_string_literals(&mut self) -> Result<Expr, ParseError> {
        let mut parts: Vec<FStringPart> = Vec::new();
        let mut formatted = false;

        loop {
            let location = self.current_location();
            match self.peek().kind.clone() {
                TokenKind::Str(text) => {
                    self.advance();
                    push_literal(&mut parts, &text);
                }
                TokenKind::FString(text) => {
                    self.advance();
                    formatted = true;
                    for part in parse_fstring(&text, location)? {
                        match part {
                            FStringPart::Literal(text) => push_literal(&mut parts, &text),
                            field => parts.push(field),
                        }
                    }
                }
                _ => break,
            }
        }

        if formatted {
            return Ok(Expr::FString(parts));
        }
        match parts.pop() {
            Some(FStringPart::Literal(text)) => Ok(Expr::Str(text)),
            _ => Ok(Expr::Str(String::new())),
        }
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::FString(_)
                | TokenKind::Ident(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Tilde
                | TokenKind::Not
        )
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn push_literal(parts: &mut Vec<FStringPart>, text: &str) {
    if let Some(FStringPart::Literal(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(FStringPart::Literal(text.to_string()));
    }
}

/// Split f-string content into literal text and `{expr[:spec]}` fields
fn parse_fstring(text: &str, location: SourceLocation) -> Result<Vec<FStringPart>, ParseError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(ParseError::new(
                    "f-string: single '}' is not allowed",
                    location,
                ));
            }
            '{' => {
                if !literal.is_empty() {
                    parts.push(FStringPart::Literal(std::mem::take(&mut literal)));
                }
                let (source, spec) = split_field(&mut chars, location)?;
                if source.trim().is_empty() {
                    return Err(ParseError::new(
                        "f-string: empty expression not allowed",
                        location,
                    ));
                }
                let expr = parse_field_expression(&source, location)?;
                parts.push(FStringPart::Field { expr, spec });
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        parts.push(FStringPart::Literal(literal));
    }
    Ok(parts)
}

/// Read up to the closing `}` of a field, separating a top-level `:spec`
fn split_field(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    location: SourceLocation,
) -> Result<(String, Option<String>), ParseError> {
    let mut source = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            source.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                source.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                source.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                source.push(c);
            }
            '}' if depth > 0 => {
                depth -= 1;
                source.push(c);
            }
            '}' => return Ok((source, None)),
            ':' if depth == 0 => {
                let mut spec = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        return Ok((source, Some(spec)));
                    }
                    spec.push(c);
                }
                break;
            }
            other => source.push(other),
        }
    }

    Err(ParseError::new("f-string: expecting '}'", location))
}

fn parse_field_expression(source: &str, location: SourceLocation) -> Result<Expr, ParseError> {
    let relocate = |err: ParseError| ParseError::new(format!("f-string: {}", err.message), location);

    let mut parser = Parser::new(source.trim()).map_err(relocate)?;
    let expr = parser.parse_expression().map_err(relocate)?;
    while parser.match_token(&TokenKind::Newline) {}
    if !parser.is_at_end() {
        return Err(relocate(parser.error_here("unexpected token in f-string field")));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::parse;

    fn expr_of(source: &str) -> Expr {
        let program = parse(source).unwrap();
        match program.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(expr)) => expr,
            Some(StmtKind::Assign { value, .. }) => value,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        match expr_of("1 + 2 * 3\n") {
            Expr::Binary { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus_below_power() {
        match expr_of("-2 ** 2\n") {
            Expr::Unary { op: UnaryOp::Neg, operand } => {
                assert!(matches!(*operand, Expr::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_not_in_and_is_not() {
        match expr_of("x not in xs\n") {
            Expr::Compare { rest, .. } => assert_eq!(rest[0].0, CmpOp::NotIn),
            other => panic!("unexpected tree {:?}", other),
        }
        match expr_of("x is not None\n") {
            Expr::Compare { rest, .. } => assert_eq!(rest[0].0, CmpOp::IsNot),
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_slices() {
        assert!(matches!(expr_of("xs[1:3]\n"), Expr::Slice { step: None, .. }));
        match expr_of("xs[::-1]\n") {
            Expr::Slice { lower, upper, step, .. } => {
                assert!(lower.is_none());
                assert!(upper.is_none());
                assert!(step.is_some());
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_call_with_keywords() {
        match expr_of("print(a, b, sep='-', end='')\n") {
            Expr::Call { args, kwargs, .. } => {
                assert_eq!(args.len(), 2);
                assert_eq!(kwargs.len(), 2);
                assert_eq!(kwargs[0].0, "sep");
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_list_comprehension() {
        match expr_of("[x * x for x in range(5) if x % 2 == 0]\n") {
            Expr::ListComp { conditions, .. } => assert_eq!(conditions.len(), 1),
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(
            expr_of("a if a > b else b\n"),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn test_fstring_fields() {
        match expr_of("f'{name}: {value:.2f} {{x}}'\n") {
            Expr::FString(parts) => {
                assert_eq!(parts.len(), 4);
                assert!(matches!(&parts[0], FStringPart::Field { spec: None, .. }));
                assert!(matches!(&parts[2], FStringPart::Field { spec: Some(s), .. } if s == ".2f"));
                assert!(matches!(&parts[3], FStringPart::Literal(s) if s == " {x}"));
            }
            other => panic!("unexpected tree {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(expr_of("'ab' 'cd'\n"), Expr::Str(s) if s == "abcd"));
    }

    #[test]
    fn test_dict_display_and_empty_tuple() {
        assert!(matches!(expr_of("{'a': 1, 'b': 2}\n"), Expr::Dict(e) if e.len() == 2));
        assert!(matches!(expr_of("()\n"), Expr::Tuple(items) if items.is_empty()));
        assert!(parse("{1, 2}\n").is_err());
    }
}
