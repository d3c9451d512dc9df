//! Declarations and statements.

use super::{ClassState, Compiler, FunctionKind, LoopState, MAX_NESTING};
use crate::lexer::{Keyword, Punctuator, Token};
use bytecode_system::OpCode;
use core_types::Value;

impl<'src, 'heap> Compiler<'src, 'heap> {
    pub(super) fn declaration(&mut self) {
        if self.match_keyword(Keyword::Class) {
            self.class_declaration();
        } else if self.match_keyword(Keyword::Func) {
            self.func_declaration();
        } else if self.match_keyword(Keyword::Var) {
            self.var_declaration(false);
        } else if self.match_keyword(Keyword::Final) {
            self.var_declaration(true);
        } else if self.match_keyword(Keyword::Enum) {
            self.enum_declaration();
        } else if self.match_keyword(Keyword::Import) {
            self.import_statement();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn statement(&mut self) {
        self.nested_statement(Self::statement_body);
    }

    fn statement_body(&mut self) {
        if self.match_keyword(Keyword::For) {
            self.for_statement();
        } else if self.match_keyword(Keyword::If) {
            self.if_statement();
        } else if self.match_keyword(Keyword::Return) {
            self.return_statement();
        } else if self.match_keyword(Keyword::While) {
            self.while_statement();
        } else if self.match_keyword(Keyword::Break) {
            self.break_statement();
        } else if self.match_keyword(Keyword::Continue) {
            self.continue_statement();
        } else if self.match_keyword(Keyword::Assert) {
            self.assert_statement();
        } else if self.match_punct(Punctuator::LBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    pub(super) fn block(&mut self) {
        self.nested_statement(|compiler| {
            while !compiler.check(Punctuator::RBrace) && !compiler.is_at_end() {
                compiler.declaration();
            }
            compiler.consume(Punctuator::RBrace, "Expect '}' after block.");
        });
    }

    /// Run `body` one statement level deeper. Past [`MAX_NESTING`] the
    /// current token is reported and skipped instead.
    fn nested_statement(&mut self, body: impl FnOnce(&mut Self)) {
        if self.statement_depth == MAX_NESTING {
            self.error_at_current("Statement nested too deeply.");
            self.advance();
            return;
        }
        self.statement_depth += 1;
        body(self);
        self.statement_depth -= 1;
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(Punctuator::Semicolon, "Expect ';' after expression.");
        self.emit(OpCode::Pop);
    }

    fn var_declaration(&mut self, is_final: bool) {
        let (name, global) = self.parse_variable("Expect variable name.");
        if self.match_punct(Punctuator::Assign) {
            self.expression();
        } else if is_final {
            self.error_at_current(&format!("Final variable '{}' must be initialized.", name));
        } else {
            self.emit(OpCode::Nil);
        }
        self.consume(
            Punctuator::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.define_variable(global, is_final);
    }

    fn func_declaration(&mut self) {
        let (name, global) = self.parse_variable("Expect function name.");
        // A local function may refer to itself
        self.mark_initialized(false);
        self.function(FunctionKind::Function, &name);
        self.define_variable(global, false);
    }

    fn class_declaration(&mut self) {
        let class_name = self.consume_identifier("Expect class name.");
        let name_constant = self.identifier_constant(&class_name);
        self.declare_variable(&class_name);

        self.emit(OpCode::Class(name_constant));
        self.define_variable(name_constant, false);

        self.classes.push(ClassState {
            has_superclass: false,
        });

        if self.match_keyword(Keyword::Extends) {
            let superclass = self.consume_identifier("Expect superclass name.");
            self.load_variable(&superclass);
            if superclass == class_name {
                self.error("A class can't inherit from itself.");
            }

            // The superclass stays on the stack as a local named `super`
            self.begin_scope();
            self.add_local("super");
            self.define_variable(0, false);

            self.load_variable(&class_name);
            self.emit(OpCode::Inherit);
            if let Some(class) = self.classes.last_mut() {
                class.has_superclass = true;
            }
        }

        self.load_variable(&class_name);
        self.consume(Punctuator::LBrace, "Expect '{' before class body.");
        while !self.check(Punctuator::RBrace) && !self.is_at_end() {
            self.method();
        }
        self.consume(Punctuator::RBrace, "Expect '}' after class body.");
        self.emit(OpCode::Pop);

        let has_superclass = self
            .classes
            .pop()
            .is_some_and(|class| class.has_superclass);
        if has_superclass {
            self.end_scope();
        }
    }

    fn method(&mut self) {
        self.consume_keyword(Keyword::Func, "Expect 'func' to define method.");
        let name = self.consume_identifier("Expect method name.");
        let constant = self.identifier_constant(&name);
        let kind = if Self::is_initializer_name(&name) {
            FunctionKind::Initializer
        } else {
            FunctionKind::Method
        };
        self.function(kind, &name);
        self.emit(OpCode::Method(constant));
    }

    /// `enum Name { A, B, C }`: members are the ordinals 0..n
    fn enum_declaration(&mut self) {
        let enum_name = self.consume_identifier("Expect enum name.");
        let name_constant = self.identifier_constant(&enum_name);
        self.declare_variable(&enum_name);

        self.consume(Punctuator::LBrace, "Expect '{' before enum body.");
        let mut count = 0usize;
        while !self.check(Punctuator::RBrace) && !self.is_at_end() {
            let member = self.consume_identifier("Expect enum member name.");
            let value = self.heap.string_value(&member);
            self.emit_constant(value);
            self.emit_constant(Value::Number(count as f64));
            count += 1;
            if !self.match_punct(Punctuator::Comma) {
                break;
            }
        }
        self.consume(Punctuator::RBrace, "Expect '}' after enum members.");
        self.match_punct(Punctuator::Semicolon);

        match u8::try_from(count) {
            Ok(count) => {
                self.emit(OpCode::Enum(name_constant, count));
            }
            Err(_) => self.error("Too many members in enum."),
        }
        self.define_variable(name_constant, false);
    }

    /// `import name;` or `import name as alias;`
    fn import_statement(&mut self) {
        let module = self.consume_identifier("Expect module name after 'import'.");
        let module_constant = self.identifier_constant(&module);
        if self.match_keyword(Keyword::As) {
            let alias = self.consume_identifier("Expect alias name after 'as'.");
            let alias_constant = self.identifier_constant(&alias);
            self.emit(OpCode::ImportAs(module_constant, alias_constant));
        } else {
            self.emit(OpCode::Import(module_constant));
        }
        self.consume(Punctuator::Semicolon, "Expect ';' after import.");
    }

    fn if_statement(&mut self) {
        self.consume(Punctuator::LParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(Punctuator::RParen, "Expect ')' after condition.");

        let mut exits = Vec::new();
        self.conditional_branch(&mut exits);

        while self.match_keyword(Keyword::Elif) {
            self.consume(Punctuator::LParen, "Expect '(' after 'elif'.");
            self.expression();
            self.consume(Punctuator::RParen, "Expect ')' after condition.");
            self.conditional_branch(&mut exits);
        }

        if self.match_keyword(Keyword::Else) {
            self.statement();
        }
        for exit in exits {
            self.patch_jump(exit);
        }
    }

    /// Body of one `if`/`elif` arm whose condition is on the stack
    fn conditional_branch(&mut self, exits: &mut Vec<usize>) {
        let skip = self.emit_jump(OpCode::JumpIfFalse(0));
        self.emit(OpCode::Pop);
        self.statement();
        exits.push(self.emit_jump(OpCode::Jump(0)));
        self.patch_jump(skip);
        self.emit(OpCode::Pop);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk().len();
        self.consume(Punctuator::LParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(Punctuator::RParen, "Expect ')' after condition.");

        let exit = self.emit_jump(OpCode::JumpIfFalse(0));
        self.emit(OpCode::Pop);
        self.begin_loop(Some(loop_start));
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit);
        self.emit(OpCode::Pop);
        self.end_loop();
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(Punctuator::LParen, "Expect '(' after 'for'.");

        if let Token::Identifier(name) = self.current.token.clone() {
            self.advance();
            if self.match_keyword(Keyword::In) {
                self.for_in_loop(&name);
            } else {
                self.expression_after_prefix();
                self.consume(Punctuator::Semicolon, "Expect ';' after expression.");
                self.emit(OpCode::Pop);
                self.for_loop_clauses();
            }
        } else {
            if self.match_punct(Punctuator::Semicolon) {
                // no initializer
            } else if self.match_keyword(Keyword::Var) {
                self.var_declaration(false);
            } else if self.match_keyword(Keyword::Final) {
                self.var_declaration(true);
            } else {
                self.expression_statement();
            }
            self.for_loop_clauses();
        }

        self.end_scope();
    }

    /// Condition, increment and body of a C-style `for`
    fn for_loop_clauses(&mut self) {
        let mut loop_start = self.chunk().len();
        let mut exit = None;
        if !self.match_punct(Punctuator::Semicolon) {
            self.expression();
            self.consume(Punctuator::Semicolon, "Expect ';' after loop condition.");
            exit = Some(self.emit_jump(OpCode::JumpIfFalse(0)));
            self.emit(OpCode::Pop);
        }

        if !self.match_punct(Punctuator::RParen) {
            let body = self.emit_jump(OpCode::Jump(0));
            let increment_start = self.chunk().len();
            self.expression();
            self.emit(OpCode::Pop);
            self.consume(Punctuator::RParen, "Expect ')' after for clauses.");
            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body);
        }

        self.begin_loop(Some(loop_start));
        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit) = exit {
            self.patch_jump(exit);
            self.emit(OpCode::Pop);
        }
        self.end_loop();
    }

    /// `for (x in iterable) body`, driven by a hidden index counter
    fn for_in_loop(&mut self, variable: &str) {
        self.expression();
        self.consume(Punctuator::RParen, "Expect ')' after for clauses.");

        // Names that can never be written in source
        self.add_local("(iterable)");
        self.mark_initialized(false);
        self.emit_constant(Value::Number(0.0));
        self.add_local("(index)");
        self.mark_initialized(false);
        let index_slot = (self.state().locals.len() - 1) as u8;
        let iterable_slot = index_slot.saturating_sub(1);

        let loop_start = self.chunk().len();
        self.emit(OpCode::GetLocal(index_slot));
        self.emit(OpCode::GetLocal(iterable_slot));
        self.emit(OpCode::Len);
        self.emit(OpCode::Less);
        let exit = self.emit_jump(OpCode::JumpIfFalse(0));
        self.emit(OpCode::Pop);

        self.begin_loop(None);
        self.emit(OpCode::GetLocal(iterable_slot));
        self.emit(OpCode::GetLocal(index_slot));
        self.emit(OpCode::GetIndex);

        // A fresh variable per iteration, so closures capture each value
        self.begin_scope();
        self.add_local(variable);
        self.mark_initialized(false);
        self.statement();
        self.end_scope();

        self.patch_continues();
        self.emit(OpCode::GetLocal(index_slot));
        self.emit_constant(Value::Number(1.0));
        self.emit(OpCode::Add);
        self.emit(OpCode::SetLocal(index_slot));
        self.emit(OpCode::Pop);
        self.emit_loop(loop_start);

        self.patch_jump(exit);
        self.emit(OpCode::Pop);
        self.end_loop();
    }

    fn begin_loop(&mut self, continue_target: Option<usize>) {
        let scope_depth = self.state().scope_depth;
        self.state().loops.push(LoopState {
            continue_target,
            scope_depth,
            ..LoopState::default()
        });
    }

    /// Point pending forward `continue` jumps at the next instruction
    fn patch_continues(&mut self) {
        let jumps = match self.state().loops.last_mut() {
            Some(state) => std::mem::take(&mut state.continue_jumps),
            None => return,
        };
        for jump in jumps {
            self.patch_jump(jump);
        }
    }

    /// Close the innermost loop, landing its `break`s here
    fn end_loop(&mut self) {
        if let Some(state) = self.state().loops.pop() {
            for jump in state.break_jumps {
                self.patch_jump(jump);
            }
        }
    }

    fn break_statement(&mut self) {
        let Some(depth) = self.state().loops.last().map(|l| l.scope_depth) else {
            self.error("Can't use 'break' outside of a loop.");
            return;
        };
        self.consume(Punctuator::Semicolon, "Expect ';' after 'break'.");
        self.discard_locals(depth);
        let jump = self.emit_jump(OpCode::Jump(0));
        if let Some(state) = self.state().loops.last_mut() {
            state.break_jumps.push(jump);
        }
    }

    fn continue_statement(&mut self) {
        let Some((depth, target)) = self
            .state()
            .loops
            .last()
            .map(|l| (l.scope_depth, l.continue_target))
        else {
            self.error("Can't use 'continue' outside of a loop.");
            return;
        };
        self.consume(Punctuator::Semicolon, "Expect ';' after 'continue'.");
        self.discard_locals(depth);
        match target {
            Some(start) => self.emit_loop(start),
            None => {
                let jump = self.emit_jump(OpCode::Jump(0));
                if let Some(state) = self.state().loops.last_mut() {
                    state.continue_jumps.push(jump);
                }
            }
        }
    }

    fn return_statement(&mut self) {
        let kind = self.state().kind;
        if kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }

        if self.match_punct(Punctuator::Semicolon) {
            self.emit_return();
            return;
        }
        if kind == FunctionKind::Initializer {
            self.error("Can't return a value from an initializer.");
        }
        self.expression();
        self.consume(Punctuator::Semicolon, "Expect ';' after return value.");
        self.emit(OpCode::Return);
    }

    /// `assert cond;` or `assert cond, message;`
    fn assert_statement(&mut self) {
        let position = self.previous.position;
        self.expression();
        let has_message = self.match_punct(Punctuator::Comma);
        if has_message {
            self.expression();
        }
        self.consume(Punctuator::Semicolon, "Expect ';' after assert.");
        self.emit_at(OpCode::Assert(has_message), position);
    }
}
