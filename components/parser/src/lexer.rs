//! slo Lexer - tokenizes source code into tokens
//!
//! Strings may contain `${expr}` interpolations. The lexer splits such a
//! string into a [`Token::TemplateHead`], the tokens of each embedded
//! expression, optional [`Token::TemplateMiddle`] pieces and a final
//! [`Token::TemplateTail`]; the compiler stitches them back together.

use crate::error::syntax_error;
use core_types::{SloError, SourcePosition};

/// slo keyword types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// and keyword
    And,
    /// as keyword
    As,
    /// assert keyword
    Assert,
    /// break keyword
    Break,
    /// class keyword
    Class,
    /// continue keyword
    Continue,
    /// elif keyword
    Elif,
    /// else keyword
    Else,
    /// enum keyword
    Enum,
    /// extends keyword
    Extends,
    /// false keyword
    False,
    /// final keyword
    Final,
    /// for keyword
    For,
    /// func keyword
    Func,
    /// has keyword
    Has,
    /// `has not`, scanned as one operator
    HasNot,
    /// if keyword
    If,
    /// import keyword
    Import,
    /// in keyword
    In,
    /// nil keyword
    Nil,
    /// or keyword
    Or,
    /// return keyword
    Return,
    /// self keyword
    SelfValue,
    /// super keyword
    Super,
    /// true keyword
    True,
    /// var keyword
    Var,
    /// while keyword
    While,
}

impl Keyword {
    /// Look up a reserved word
    pub fn from_word(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "and" => Keyword::And,
            "as" => Keyword::As,
            "assert" => Keyword::Assert,
            "break" => Keyword::Break,
            "class" => Keyword::Class,
            "continue" => Keyword::Continue,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "enum" => Keyword::Enum,
            "extends" => Keyword::Extends,
            "false" => Keyword::False,
            "final" => Keyword::Final,
            "for" => Keyword::For,
            "func" => Keyword::Func,
            "has" => Keyword::Has,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "nil" => Keyword::Nil,
            "or" => Keyword::Or,
            "return" => Keyword::Return,
            "self" => Keyword::SelfValue,
            "super" => Keyword::Super,
            "true" => Keyword::True,
            "var" => Keyword::Var,
            "while" => Keyword::While,
            _ => return None,
        };
        Some(keyword)
    }
}

/// slo punctuators (operators and delimiters)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuator {
    /// Opening parenthesis
    LParen,
    /// Closing parenthesis
    RParen,
    /// Opening brace
    LBrace,
    /// Closing brace
    RBrace,
    /// Opening bracket
    LBracket,
    /// Closing bracket
    RBracket,
    /// Semicolon
    Semicolon,
    /// Comma
    Comma,
    /// Dot
    Dot,
    /// Colon
    Colon,
    /// Assignment
    Assign,
    /// Plus
    Plus,
    /// Minus
    Minus,
    /// Multiply
    Star,
    /// Divide
    Slash,
    /// Modulo
    Percent,
    /// Exponentiation
    StarStar,
    /// Equality
    EqEq,
    /// Inequality
    NotEq,
    /// Less than
    Lt,
    /// Less than or equal
    LtEq,
    /// Greater than
    Gt,
    /// Greater than or equal
    GtEq,
    /// Logical NOT
    Not,
    /// Plus equals
    PlusEq,
    /// Minus equals
    MinusEq,
    /// Multiply equals
    StarEq,
    /// Divide equals
    SlashEq,
    /// Increment
    PlusPlus,
    /// Decrement
    MinusMinus,
}

/// Token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier
    Identifier(String),
    /// Number literal
    Number(f64),
    /// String literal with escapes processed and no interpolation
    String(String),
    /// Text from the opening quote to the first `${`
    TemplateHead(String),
    /// Text between a `}` and the next `${`
    TemplateMiddle(String),
    /// Text from the last `}` to the closing quote
    TemplateTail(String),
    /// Keyword
    Keyword(Keyword),
    /// Punctuator/operator
    Punctuator(Punctuator),
    /// End of file
    EOF,
}

/// A token with the place it starts and its source text
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token
    pub token: Token,
    /// Line and column of the first character
    pub position: SourcePosition,
    /// The raw source text of the token
    pub lexeme: String,
}

impl SpannedToken {
    /// A synthetic end-of-file token at the origin
    pub fn eof() -> Self {
        Self {
            token: Token::EOF,
            position: SourcePosition::new(1, 1),
            lexeme: String::new(),
        }
    }
}

/// An interpolation whose closing `}` has not been seen yet
#[derive(Debug, Clone, Copy)]
struct OpenTemplate {
    quote: char,
    brace_depth: u32,
}

/// Lexer for slo source code
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    templates: Vec<OpenTemplate>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            templates: Vec::new(),
        }
    }

    /// The source text being scanned
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Get the next token from the source.
    ///
    /// On error the offending characters have already been consumed, so
    /// calling again resumes scanning after them.
    pub fn next_token(&mut self) -> Result<SpannedToken, SloError> {
        self.skip_whitespace_and_comments();

        let start = self.position;
        let position = self.current_position();
        if self.is_at_end() {
            return Ok(SpannedToken {
                token: Token::EOF,
                position,
                lexeme: String::new(),
            });
        }

        let token = self.scan_token(position)?;
        let lexeme: String = self.chars[start..self.position].iter().collect();
        Ok(SpannedToken {
            token,
            position,
            lexeme,
        })
    }

    fn scan_token(&mut self, start: SourcePosition) -> Result<Token, SloError> {
        let ch = self.advance();

        if is_identifier_start(ch) {
            return Ok(self.scan_identifier());
        }
        if ch.is_ascii_digit() {
            return self.scan_number(start);
        }

        let punct = match ch {
            '(' => Punctuator::LParen,
            ')' => Punctuator::RParen,
            '[' => Punctuator::LBracket,
            ']' => Punctuator::RBracket,
            ';' => Punctuator::Semicolon,
            ',' => Punctuator::Comma,
            '.' => Punctuator::Dot,
            ':' => Punctuator::Colon,
            '%' => Punctuator::Percent,
            '{' => {
                if let Some(open) = self.templates.last_mut() {
                    open.brace_depth += 1;
                }
                Punctuator::LBrace
            }
            '}' => {
                if let Some(open) = self.templates.last().copied() {
                    if open.brace_depth == 0 {
                        self.templates.pop();
                        return self.scan_string_continuation(open.quote, start);
                    }
                }
                if let Some(open) = self.templates.last_mut() {
                    open.brace_depth -= 1;
                }
                Punctuator::RBrace
            }
            '+' => {
                if self.match_char('+') {
                    Punctuator::PlusPlus
                } else if self.match_char('=') {
                    Punctuator::PlusEq
                } else {
                    Punctuator::Plus
                }
            }
            '-' => {
                if self.match_char('-') {
                    Punctuator::MinusMinus
                } else if self.match_char('=') {
                    Punctuator::MinusEq
                } else {
                    Punctuator::Minus
                }
            }
            '*' => {
                if self.match_char('*') {
                    Punctuator::StarStar
                } else if self.match_char('=') {
                    Punctuator::StarEq
                } else {
                    Punctuator::Star
                }
            }
            '/' => {
                if self.match_char('=') {
                    Punctuator::SlashEq
                } else {
                    Punctuator::Slash
                }
            }
            '!' => {
                if self.match_char('=') {
                    Punctuator::NotEq
                } else {
                    Punctuator::Not
                }
            }
            '=' => {
                if self.match_char('=') {
                    Punctuator::EqEq
                } else {
                    Punctuator::Assign
                }
            }
            '<' => {
                if self.match_char('=') {
                    Punctuator::LtEq
                } else {
                    Punctuator::Lt
                }
            }
            '>' => {
                if self.match_char('=') {
                    Punctuator::GtEq
                } else {
                    Punctuator::Gt
                }
            }
            '"' | '\'' => return self.scan_string(ch, start),
            _ => return Err(syntax_error("Unexpected character.", start)),
        };
        Ok(Token::Punctuator(punct))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.position - 1;
        while !self.is_at_end() && is_identifier_part(self.peek()) {
            self.advance();
        }
        let word: String = self.chars[start..self.position].iter().collect();
        match Keyword::from_word(&word) {
            Some(Keyword::Has) if self.follows_not() => Token::Keyword(Keyword::HasNot),
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(word),
        }
    }

    /// After `has`, consume a following `not` (separated by spaces) if present
    fn follows_not(&mut self) -> bool {
        let mut probe = self.position;
        while probe < self.chars.len() && matches!(self.chars[probe], ' ' | '\t') {
            probe += 1;
        }
        let is_not = self.chars.get(probe..probe + 3) == Some(&['n', 'o', 't'][..])
            && !self
                .chars
                .get(probe + 3)
                .copied()
                .is_some_and(is_identifier_part);
        if is_not {
            while self.position < probe + 3 {
                self.advance();
            }
        }
        is_not
    }

    fn scan_number(&mut self, start: SourcePosition) -> Result<Token, SloError> {
        let first = self.position - 1;
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }
        if !self.is_at_end()
            && self.peek() == '.'
            && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text: String = self.chars[first..self.position].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| syntax_error(format!("Invalid number literal '{}'.", text), start))
    }

    fn scan_string(&mut self, quote: char, start: SourcePosition) -> Result<Token, SloError> {
        let (text, interpolates) = self.scan_string_body(quote, start)?;
        if interpolates {
            self.templates.push(OpenTemplate {
                quote,
                brace_depth: 0,
            });
            Ok(Token::TemplateHead(text))
        } else {
            Ok(Token::String(text))
        }
    }

    fn scan_string_continuation(
        &mut self,
        quote: char,
        start: SourcePosition,
    ) -> Result<Token, SloError> {
        let (text, interpolates) = self.scan_string_body(quote, start)?;
        if interpolates {
            self.templates.push(OpenTemplate {
                quote,
                brace_depth: 0,
            });
            Ok(Token::TemplateMiddle(text))
        } else {
            Ok(Token::TemplateTail(text))
        }
    }

    /// Scan string characters up to the closing quote or a `${`.
    ///
    /// Returns the text and whether it stopped at an interpolation.
    fn scan_string_body(
        &mut self,
        quote: char,
        start: SourcePosition,
    ) -> Result<(String, bool), SloError> {
        let mut text = String::new();
        loop {
            if self.is_at_end() {
                return Err(syntax_error("Unterminated string.", start));
            }
            let ch = self.advance();
            match ch {
                c if c == quote => return Ok((text, false)),
                '$' if !self.is_at_end() && self.peek() == '{' => {
                    self.advance();
                    return Ok((text, true));
                }
                '\\' => {
                    if self.is_at_end() {
                        return Err(syntax_error("Unterminated string.", start));
                    }
                    match self.advance() {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        '\'' => text.push('\''),
                        '$' => text.push('$'),
                        other => {
                            text.push('\\');
                            text.push(other);
                        }
                    }
                }
                other => text.push(other),
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                ' ' | '\r' | '\t' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => self.skip_line_comment(),
                '#' => self.skip_line_comment(),
                _ => break,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn current_position(&self) -> SourcePosition {
        SourcePosition::new(self.line, self.column)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.position]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.position];
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.advance();
        true
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
