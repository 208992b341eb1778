//! Lexer (tokenizer) for the scripting subset
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Block structure is indentation based, so the lexer tracks an indentation stack
//! and emits synthetic `Indent` / `Dedent` tokens, plus `Newline` at the end of
//! every logical line. Newlines inside brackets are ignored, as are blank and
//! comment-only lines.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// Token categories produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    /// Body of an f-string with escapes already processed
    FString(String),

    Ident(String),

    // Keywords
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Is,
    Def,
    Return,
    Break,
    Continue,
    Pass,
    True,
    False,
    None,
    Global,
    Assert,

    // Arithmetic
    Plus,        // +
    Minus,       // -
    Star,        // *
    DoubleStar,  // **
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    Shl,   // <<
    Shr,   // >>

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Assignment
    Assign,        // =
    PlusEq,        // +=
    MinusEq,       // -=
    StarEq,        // *=
    SlashEq,       // /=
    DoubleSlashEq, // //=
    PercentEq,     // %=

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "def" => TokenKind::Def,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "pass" => TokenKind::Pass,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "global" => TokenKind::Global,
            "assert" => TokenKind::Assert,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Float(x) => write!(f, "{}", x),
            TokenKind::Str(s) => write!(f, "'{}'", s),
            TokenKind::FString(s) => write!(f, "f'{}'", s),
            TokenKind::Ident(name) => write!(f, "'{}'", name),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", other.symbol()),
        }
    }
}

impl TokenKind {
    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::Def => "def",
            TokenKind::Return => "return",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Pass => "pass",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::None => "None",
            TokenKind::Global => "global",
            TokenKind::Assert => "assert",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::DoubleStar => "**",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Assign => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::DoubleSlashEq => "//=",
            TokenKind::PercentEq => "%=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            _ => "?",
        }
    }
}

/// A token with the location of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Lexer error
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Indentation-aware tokenizer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                if self.handle_indentation()? {
                    continue;
                }
                if self.is_at_end() {
                    break;
                }
            }
            if self.is_at_end() {
                break;
            }

            let c = self.current_char();
            match c {
                ' ' | '\t' | '\r' | '\u{feff}' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\\' if self.peek_char(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '\n' => {
                    let location = self.current_location();
                    self.advance();
                    if self.bracket_depth == 0 {
                        self.push(TokenKind::Newline, location);
                        self.at_line_start = true;
                    }
                }
                '0'..='9' => self.read_number()?,
                '.' if self.peek_char(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.read_number()?
                }
                '"' | '\'' => self.read_string(false, false)?,
                c if c.is_alphabetic() || c == '_' => self.read_word()?,
                _ => self.read_operator()?,
            }
        }

        let location = self.current_location();
        if self
            .tokens
            .last()
            .is_some_and(|t| t.kind != TokenKind::Newline)
        {
            self.push(TokenKind::Newline, location);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokenKind::Dedent, location);
        }
        self.push(TokenKind::Eof, location);

        Ok(std::mem::take(&mut self.tokens))
    }

    /// Measure the indentation of a fresh line and emit `Indent`/`Dedent`.
    ///
    /// Returns `true` when the line was blank and has been consumed.
    fn handle_indentation(&mut self) -> Result<bool, LexError> {
        let mut width = 0;
        while !self.is_at_end() {
            match self.current_char() {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\r' | '\u{feff}' => {}
                _ => break,
            }
            self.advance();
        }

        if self.is_at_end() {
            return Ok(false);
        }
        match self.current_char() {
            '\n' => {
                self.advance();
                return Ok(true);
            }
            '#' => {
                self.skip_comment();
                return Ok(true);
            }
            _ => {}
        }

        self.at_line_start = false;
        let location = self.current_location();
        let current = self.indent_stack.last().copied().unwrap_or(0);

        if width > current {
            self.indent_stack.push(width);
            self.push(TokenKind::Indent, location);
        } else if width < current {
            while self.indent_stack.last().is_some_and(|&w| w > width) {
                self.indent_stack.pop();
                self.push(TokenKind::Dedent, location);
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(LexError {
                    message: "unindent does not match any outer indentation level".to_string(),
                    location,
                });
            }
        }
        Ok(false)
    }

    fn skip_comment(&mut self) {
        while !self.is_at_end() && self.current_char() != '\n' {
            self.advance();
        }
    }

    fn read_number(&mut self) -> Result<(), LexError> {
        let location = self.current_location();

        if self.current_char() == '0' {
            let radix = match self.peek_char(1) {
                Some('x' | 'X') => Some(16),
                Some('b' | 'B') => Some(2),
                Some('o' | 'O') => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.advance();
                let mut digits = String::new();
                while !self.is_at_end()
                    && (self.current_char().is_digit(radix) || self.current_char() == '_')
                {
                    if self.current_char() != '_' {
                        digits.push(self.current_char());
                    }
                    self.advance();
                }
                let value = i64::from_str_radix(&digits, radix).map_err(|_| LexError {
                    message: "invalid integer literal".to_string(),
                    location,
                })?;
                self.push(TokenKind::Int(value), location);
                return Ok(());
            }
        }

        let mut text = String::new();
        let mut is_float = false;
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '_' {
                // digit separator
            } else if c == '.' && !is_float && !text.contains('e') {
                is_float = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !text.contains('e') {
                let sign = self.peek_char(1);
                let digit_after = match sign {
                    Some('+' | '-') => self.peek_char(2),
                    other => other,
                };
                if !digit_after.is_some_and(|d| d.is_ascii_digit()) {
                    break;
                }
                is_float = true;
                text.push('e');
                if let Some(s @ ('+' | '-')) = sign {
                    self.advance();
                    text.push(s);
                }
            } else {
                break;
            }
            self.advance();
        }

        if is_float {
            let value: f64 = text.parse().map_err(|_| LexError {
                message: format!("invalid number literal '{}'", text),
                location,
            })?;
            self.push(TokenKind::Float(value), location);
        } else {
            let value: i64 = text.parse().map_err(|_| LexError {
                message: format!("integer literal '{}' is too large", text),
                location,
            })?;
            self.push(TokenKind::Int(value), location);
        }
        Ok(())
    }

    fn read_word(&mut self) -> Result<(), LexError> {
        let location = self.current_location();
        let mut word = String::new();
        while !self.is_at_end() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // String prefixes: f"..", r"..", rf"..", b".."
        if matches!(self.current_char_opt(), Some('"' | '\'')) {
            let lower = word.to_ascii_lowercase();
            if matches!(lower.as_str(), "f" | "r" | "rf" | "fr" | "b" | "u") {
                let raw = lower.contains('r');
                let formatted = lower.contains('f');
                self.read_string(raw, formatted)?;
                if let Some(last) = self.tokens.last_mut() {
                    last.location = location;
                }
                return Ok(());
            }
        }

        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
        self.push(kind, location);
        Ok(())
    }

    fn read_string(&mut self, raw: bool, formatted: bool) -> Result<(), LexError> {
        let location = self.current_location();
        let quote = self.current_char();
        let triple = self.peek_char(1) == Some(quote) && self.peek_char(2) == Some(quote);
        let quote_len = if triple { 3 } else { 1 };
        for _ in 0..quote_len {
            self.advance();
        }

        let mut value = String::new();
        loop {
            if self.is_at_end() {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    location,
                });
            }
            let c = self.current_char();
            if c == quote
                && (!triple
                    || (self.peek_char(1) == Some(quote) && self.peek_char(2) == Some(quote)))
            {
                for _ in 0..quote_len {
                    self.advance();
                }
                break;
            }
            if c == '\n' && !triple {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    location,
                });
            }
            if c == '\\' && !raw {
                self.advance();
                if self.is_at_end() {
                    continue;
                }
                let escaped = self.current_char();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\n' => {}
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
                self.advance();
                continue;
            }
            value.push(c);
            self.advance();
        }

        let kind = if formatted {
            TokenKind::FString(value)
        } else {
            TokenKind::Str(value)
        };
        self.push(kind, location);
        Ok(())
    }

    fn read_operator(&mut self) -> Result<(), LexError> {
        let location = self.current_location();
        let c = self.current_char();
        let next = self.peek_char(1);
        let third = self.peek_char(2);

        let (kind, len) = match (c, next, third) {
            ('*', Some('*'), _) => (TokenKind::DoubleStar, 2),
            ('/', Some('/'), Some('=')) => (TokenKind::DoubleSlashEq, 3),
            ('/', Some('/'), _) => (TokenKind::DoubleSlash, 2),
            ('<', Some('<'), _) => (TokenKind::Shl, 2),
            ('>', Some('>'), _) => (TokenKind::Shr, 2),
            ('=', Some('='), _) => (TokenKind::EqEq, 2),
            ('!', Some('='), _) => (TokenKind::NotEq, 2),
            ('<', Some('='), _) => (TokenKind::Le, 2),
            ('>', Some('='), _) => (TokenKind::Ge, 2),
            ('+', Some('='), _) => (TokenKind::PlusEq, 2),
            ('-', Some('='), _) => (TokenKind::MinusEq, 2),
            ('*', Some('='), _) => (TokenKind::StarEq, 2),
            ('/', Some('='), _) => (TokenKind::SlashEq, 2),
            ('%', Some('='), _) => (TokenKind::PercentEq, 2),
            ('+', _, _) => (TokenKind::Plus, 1),
            ('-', _, _) => (TokenKind::Minus, 1),
            ('*', _, _) => (TokenKind::Star, 1),
            ('/', _, _) => (TokenKind::Slash, 1),
            ('%', _, _) => (TokenKind::Percent, 1),
            ('&', _, _) => (TokenKind::Amp, 1),
            ('|', _, _) => (TokenKind::Pipe, 1),
            ('^', _, _) => (TokenKind::Caret, 1),
            ('~', _, _) => (TokenKind::Tilde, 1),
            ('<', _, _) => (TokenKind::Lt, 1),
            ('>', _, _) => (TokenKind::Gt, 1),
            ('=', _, _) => (TokenKind::Assign, 1),
            ('(', _, _) => (TokenKind::LParen, 1),
            (')', _, _) => (TokenKind::RParen, 1),
            ('[', _, _) => (TokenKind::LBracket, 1),
            (']', _, _) => (TokenKind::RBracket, 1),
            ('{', _, _) => (TokenKind::LBrace, 1),
            ('}', _, _) => (TokenKind::RBrace, 1),
            (',', _, _) => (TokenKind::Comma, 1),
            (':', _, _) => (TokenKind::Colon, 1),
            ('.', _, _) => (TokenKind::Dot, 1),
            (';', _, _) => (TokenKind::Semicolon, 1),
            _ => {
                return Err(LexError {
                    message: format!("invalid character '{}'", c),
                    location,
                })
            }
        };

        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                self.bracket_depth += 1
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1)
            }
            _ => {}
        }

        for _ in 0..len {
            self.advance();
        }
        self.push(kind, location);
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, location: SourceLocation) {
        self.tokens.push(Token { kind, location });
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn current_char_opt(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&c) = self.input.get(self.position) {
            self.position += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("x = 1 + 2.5");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Assign,
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Float(2.5),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("** // //= <= >= == != << >> +=");
        assert_eq!(
            &tokens[..10],
            &[
                TokenKind::DoubleStar,
                TokenKind::DoubleSlash,
                TokenKind::DoubleSlashEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::PlusEq,
            ]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = kinds("if x:\n    y = 1\nz = 2\n");
        assert!(tokens.contains(&TokenKind::Indent));
        let indent = tokens.iter().position(|t| *t == TokenKind::Indent).unwrap();
        let dedent = tokens.iter().position(|t| *t == TokenKind::Dedent).unwrap();
        assert!(indent < dedent);
        assert_eq!(tokens[dedent + 1], TokenKind::Ident("z".to_string()));
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        let tokens = kinds("x = 1\n\n   # note\ny = 2 # trailing\n");
        let newlines = tokens.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 2);
        assert!(!tokens.contains(&TokenKind::Indent));
    }

    #[test]
    fn test_brackets_join_lines() {
        let tokens = kinds("a = [1,\n     2]\n");
        let newlines = tokens.iter().filter(|t| **t == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_string_literals() {
        let tokens = kinds(r#"s = "a\nb" + 'c' + f"{x}!""#);
        assert_eq!(tokens[2], TokenKind::Str("a\nb".to_string()));
        assert_eq!(tokens[4], TokenKind::Str("c".to_string()));
        assert_eq!(tokens[6], TokenKind::FString("{x}!".to_string()));
    }

    #[test]
    fn test_unicode_identifiers() {
        let tokens = kinds("合計 = 0");
        assert_eq!(tokens[0], TokenKind::Ident("合計".to_string()));
    }

    #[test]
    fn test_bad_dedent_is_an_error() {
        let result = Lexer::new("if x:\n    y = 1\n  z = 2\n").tokenize();
        assert!(result.is_err());
    }
}
