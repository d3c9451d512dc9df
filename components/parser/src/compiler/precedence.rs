//! Operator binding strength for the Pratt parser.

use crate::lexer::{Keyword, Punctuator, Token};

/// Precedence levels, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Power,
    Call,
    Primary,
}

impl Precedence {
    /// The next stronger level, used for left-associative operands
    pub(crate) fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Power,
            Precedence::Power => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// Binding strength of `token` in infix position
pub(crate) fn infix_precedence(token: &Token) -> Precedence {
    match token {
        Token::Punctuator(punct) => match punct {
            Punctuator::LParen | Punctuator::Dot | Punctuator::LBracket => Precedence::Call,
            Punctuator::StarStar => Precedence::Power,
            Punctuator::Star | Punctuator::Slash | Punctuator::Percent => Precedence::Factor,
            Punctuator::Plus | Punctuator::Minus => Precedence::Term,
            Punctuator::Lt | Punctuator::LtEq | Punctuator::Gt | Punctuator::GtEq => {
                Precedence::Comparison
            }
            Punctuator::EqEq | Punctuator::NotEq => Precedence::Equality,
            _ => Precedence::None,
        },
        Token::Keyword(Keyword::Has | Keyword::HasNot) => Precedence::Equality,
        Token::Keyword(Keyword::And) => Precedence::And,
        Token::Keyword(Keyword::Or) => Precedence::Or,
        _ => Precedence::None,
    }
}
