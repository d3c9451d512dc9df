//! Expression compilation: prefix and infix parse rules.

use super::precedence::{infix_precedence, Precedence};
use super::{Compiler, MAX_ARGS, MAX_NESTING};
use crate::lexer::{Keyword, Punctuator, Token};
use bytecode_system::OpCode;
use core_types::{SourcePosition, Value};

impl<'src, 'heap> Compiler<'src, 'heap> {
    pub(super) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    pub(super) fn parse_precedence(&mut self, precedence: Precedence) {
        if self.expression_depth == MAX_NESTING {
            self.error_at_current("Expression nested too deeply.");
            self.advance();
            return;
        }
        self.expression_depth += 1;
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;
        if self.prefix(can_assign) {
            self.infix_loop(precedence, can_assign);
        } else {
            self.error("Expect expression.");
        }
        self.expression_depth -= 1;
    }

    /// Finish an assignment-level expression whose first token has
    /// already been consumed
    pub(super) fn expression_after_prefix(&mut self) {
        if !self.prefix(true) {
            self.error("Expect expression.");
            return;
        }
        self.infix_loop(Precedence::Assignment, true);
    }

    fn infix_loop(&mut self, precedence: Precedence, can_assign: bool) {
        while precedence <= infix_precedence(&self.current.token) {
            self.advance();
            self.infix(can_assign);
        }
        if can_assign
            && (self.match_punct(Punctuator::Assign) || self.match_compound_operator().is_some())
        {
            self.error("Invalid assignment target.");
        }
    }

    /// Run the prefix rule for the previous token; false if it has none
    fn prefix(&mut self, can_assign: bool) -> bool {
        let token = self.previous.token.clone();
        match token {
            Token::Number(n) => self.emit_constant(Value::Number(n)),
            Token::String(text) => self.string_constant(&text),
            Token::TemplateHead(text) => self.interpolation(&text),
            Token::Identifier(name) => self.named_variable(&name, can_assign),
            Token::Keyword(Keyword::True) => {
                self.emit(OpCode::True);
            }
            Token::Keyword(Keyword::False) => {
                self.emit(OpCode::False);
            }
            Token::Keyword(Keyword::Nil) => {
                self.emit(OpCode::Nil);
            }
            Token::Keyword(Keyword::SelfValue) => self.self_expression(),
            Token::Keyword(Keyword::Super) => self.super_expression(),
            Token::Punctuator(Punctuator::LParen) => self.grouping(),
            Token::Punctuator(Punctuator::LBracket) => self.list_literal(),
            Token::Punctuator(Punctuator::LBrace) => self.dict_literal(),
            Token::Punctuator(op @ (Punctuator::Minus | Punctuator::Not)) => self.unary(op),
            Token::Punctuator(op @ (Punctuator::PlusPlus | Punctuator::MinusMinus)) => {
                self.prefix_increment(op)
            }
            _ => return false,
        }
        true
    }

    /// Run the infix rule for the operator just consumed
    fn infix(&mut self, can_assign: bool) {
        let position = self.previous.position;
        match self.previous.token.clone() {
            Token::Punctuator(Punctuator::LParen) => self.call(),
            Token::Punctuator(Punctuator::Dot) => self.dot(can_assign),
            Token::Punctuator(Punctuator::LBracket) => self.index(can_assign),
            Token::Punctuator(op) => self.binary(op, position),
            Token::Keyword(Keyword::And) => self.and(),
            Token::Keyword(Keyword::Or) => self.or(),
            Token::Keyword(Keyword::Has) => self.membership(OpCode::Has, position),
            Token::Keyword(Keyword::HasNot) => self.membership(OpCode::HasNot, position),
            _ => {}
        }
    }

    fn match_compound_operator(&mut self) -> Option<OpCode> {
        let op = match self.current.token {
            Token::Punctuator(Punctuator::PlusEq) => OpCode::Add,
            Token::Punctuator(Punctuator::MinusEq) => OpCode::Subtract,
            Token::Punctuator(Punctuator::StarEq) => OpCode::Multiply,
            Token::Punctuator(Punctuator::SlashEq) => OpCode::Divide,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn match_increment(&mut self) -> Option<OpCode> {
        let op = match self.current.token {
            Token::Punctuator(Punctuator::PlusPlus) => OpCode::Add,
            Token::Punctuator(Punctuator::MinusMinus) => OpCode::Subtract,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn string_constant(&mut self, text: &str) {
        let value = self.heap.string_value(text);
        self.emit_constant(value);
    }

    /// `"a${x}b"`: push each piece, then join their display strings
    fn interpolation(&mut self, head: &str) {
        let position = self.previous.position;
        let mut parts = 0usize;
        if !head.is_empty() {
            self.string_constant(head);
            parts += 1;
        }
        loop {
            self.expression();
            parts += 1;
            match self.current.token.clone() {
                Token::TemplateMiddle(text) => {
                    self.advance();
                    if !text.is_empty() {
                        self.string_constant(&text);
                        parts += 1;
                    }
                }
                Token::TemplateTail(text) => {
                    self.advance();
                    if !text.is_empty() {
                        self.string_constant(&text);
                        parts += 1;
                    }
                    break;
                }
                _ => {
                    self.error_at_current("Expect '}' after interpolated expression.");
                    return;
                }
            }
        }
        match u8::try_from(parts) {
            Ok(parts) => {
                self.emit_at(OpCode::Interpolate(parts), position);
            }
            Err(_) => self.error("Too many parts in string interpolation."),
        }
    }

    /// Load, assign, compound-assign or post-increment a named variable
    pub(super) fn named_variable(&mut self, name: &str, can_assign: bool) {
        let (target, is_final) = self.resolve_variable(name);

        if can_assign && self.match_punct(Punctuator::Assign) {
            self.reject_final(is_final, name);
            self.expression();
            self.emit(target.set());
            return;
        }

        if can_assign {
            if let Some(op) = self.match_compound_operator() {
                let position = self.previous.position;
                self.reject_final(is_final, name);
                self.emit(target.get());
                self.expression();
                self.emit_at(op, position);
                self.emit_at(target.set(), position);
                return;
            }
        }

        if let Some(op) = self.match_increment() {
            // The old value stays underneath as the expression's result
            let position = self.previous.position;
            self.reject_final(is_final, name);
            self.emit(target.get());
            self.emit_at(OpCode::Dup, position);
            self.emit_constant(Value::Number(1.0));
            self.emit_at(op, position);
            self.emit_at(target.set(), position);
            self.emit_at(OpCode::Pop, position);
            return;
        }

        self.emit(target.get());
    }

    fn prefix_increment(&mut self, operator: Punctuator) {
        let position = self.previous.position;
        let op = if operator == Punctuator::PlusPlus {
            OpCode::Add
        } else {
            OpCode::Subtract
        };
        let name = self.consume_identifier("Expect variable name after increment operator.");
        let (target, is_final) = self.resolve_variable(&name);
        self.reject_final(is_final, &name);
        self.emit(target.get());
        self.emit_constant(Value::Number(1.0));
        self.emit_at(op, position);
        self.emit_at(target.set(), position);
    }

    fn self_expression(&mut self) {
        if self.classes.is_empty() {
            self.error("Can't use 'self' outside of a class.");
            return;
        }
        self.load_variable("self");
    }

    fn super_expression(&mut self) {
        match self.classes.last().map(|class| class.has_superclass) {
            None => self.error("Can't use 'super' outside of a class."),
            Some(false) => self.error("Can't use 'super' in a class with no superclass."),
            Some(true) => {}
        }

        self.consume(Punctuator::Dot, "Expect '.' after 'super'.");
        let name = self.consume_identifier("Expect superclass method name.");
        let constant = self.identifier_constant(&name);

        self.load_variable("self");
        if self.match_punct(Punctuator::LParen) {
            let argc = self.argument_list();
            self.load_variable("super");
            self.emit(OpCode::SuperInvoke(constant, argc));
        } else {
            self.load_variable("super");
            self.emit(OpCode::GetSuper(constant));
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(Punctuator::RParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, operator: Punctuator) {
        let position = self.previous.position;
        self.parse_precedence(Precedence::Unary);
        match operator {
            Punctuator::Minus => self.emit_at(OpCode::Negate, position),
            _ => self.emit_at(OpCode::Not, position),
        };
    }

    fn binary(&mut self, operator: Punctuator, position: SourcePosition) {
        let precedence = infix_precedence(&Token::Punctuator(operator));
        // `**` is right-associative
        if operator == Punctuator::StarStar {
            self.parse_precedence(precedence);
        } else {
            self.parse_precedence(precedence.next());
        }

        let op = match operator {
            Punctuator::Plus => OpCode::Add,
            Punctuator::Minus => OpCode::Subtract,
            Punctuator::Star => OpCode::Multiply,
            Punctuator::Slash => OpCode::Divide,
            Punctuator::Percent => OpCode::Modulo,
            Punctuator::StarStar => OpCode::Power,
            Punctuator::EqEq => OpCode::Equal,
            Punctuator::NotEq => OpCode::NotEqual,
            Punctuator::Lt => OpCode::Less,
            Punctuator::LtEq => OpCode::LessEqual,
            Punctuator::Gt => OpCode::Greater,
            Punctuator::GtEq => OpCode::GreaterEqual,
            _ => return,
        };
        self.emit_at(op, position);
    }

    fn and(&mut self) {
        let end = self.emit_jump(OpCode::JumpIfFalse(0));
        self.emit(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end);
    }

    fn or(&mut self) {
        let end = self.emit_jump(OpCode::JumpIfTrue(0));
        self.emit(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end);
    }

    /// `container has item` and `container has not item`
    fn membership(&mut self, op: OpCode, position: SourcePosition) {
        self.parse_precedence(Precedence::Comparison);
        self.emit_at(op, position);
    }

    fn list_literal(&mut self) {
        let position = self.previous.position;
        let mut count = 0usize;
        while !self.check(Punctuator::RBracket) && !self.is_at_end() {
            self.expression();
            count += 1;
            if !self.match_punct(Punctuator::Comma) {
                break;
            }
        }
        self.consume(Punctuator::RBracket, "Expect ']' after list literal.");
        match u16::try_from(count) {
            Ok(count) => {
                self.emit_at(OpCode::List(count), position);
            }
            Err(_) => self.error("Too many elements in list literal."),
        }
    }

    fn dict_literal(&mut self) {
        let position = self.previous.position;
        let mut count = 0usize;
        while !self.check(Punctuator::RBrace) && !self.is_at_end() {
            self.expression();
            self.consume(Punctuator::Colon, "Expect ':' after dictionary key.");
            self.expression();
            count += 1;
            if !self.match_punct(Punctuator::Comma) {
                break;
            }
        }
        self.consume(Punctuator::RBrace, "Expect '}' after dictionary literal.");
        match u16::try_from(count) {
            Ok(count) => {
                self.emit_at(OpCode::Dict(count), position);
            }
            Err(_) => self.error("Too many entries in dictionary literal."),
        }
    }

    pub(super) fn argument_list(&mut self) -> u8 {
        let mut count = 0usize;
        if !self.check(Punctuator::RParen) {
            loop {
                self.expression();
                if count == MAX_ARGS {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_punct(Punctuator::Comma) {
                    break;
                }
            }
        }
        self.consume(Punctuator::RParen, "Expect ')' after arguments.");
        count.min(MAX_ARGS) as u8
    }

    fn call(&mut self) {
        let argc = self.argument_list();
        self.emit(OpCode::Call(argc));
    }

    fn dot(&mut self, can_assign: bool) {
        let name = self.consume_identifier("Expect property name after '.'.");
        let constant = self.identifier_constant(&name);

        if can_assign && self.match_punct(Punctuator::Assign) {
            self.expression();
            self.emit(OpCode::SetProperty(constant));
            return;
        }
        if can_assign {
            if let Some(op) = self.match_compound_operator() {
                let position = self.previous.position;
                self.emit(OpCode::Dup);
                self.emit(OpCode::GetProperty(constant));
                self.expression();
                self.emit_at(op, position);
                self.emit_at(OpCode::SetProperty(constant), position);
                return;
            }
        }
        if self.match_punct(Punctuator::LParen) {
            let argc = self.argument_list();
            self.emit(OpCode::Invoke(constant, argc));
        } else {
            self.emit(OpCode::GetProperty(constant));
        }
    }

    /// `a[i]`, `a[i] = v`, `a[i] op= v` and slices `a[s:e]`
    fn index(&mut self, can_assign: bool) {
        let position = self.previous.position;
        if self.check(Punctuator::Colon) {
            self.emit(OpCode::Nil);
        } else {
            self.expression();
        }

        if self.match_punct(Punctuator::Colon) {
            if self.check(Punctuator::RBracket) {
                self.emit(OpCode::Nil);
            } else {
                self.expression();
            }
            self.consume(Punctuator::RBracket, "Expect ']' after slice.");
            self.emit_at(OpCode::Slice, position);
            return;
        }

        self.consume(Punctuator::RBracket, "Expect ']' after index.");
        if can_assign && self.match_punct(Punctuator::Assign) {
            self.expression();
            self.emit_at(OpCode::SetIndex, position);
            return;
        }
        if can_assign {
            if let Some(op) = self.match_compound_operator() {
                let operator = self.previous.position;
                self.emit_at(OpCode::Dup2, position);
                self.emit_at(OpCode::GetIndex, position);
                self.expression();
                self.emit_at(op, operator);
                self.emit_at(OpCode::SetIndex, position);
                return;
            }
        }
        self.emit_at(OpCode::GetIndex, position);
    }
}
