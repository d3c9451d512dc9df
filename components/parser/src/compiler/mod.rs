//! Single-pass compiler from slo source to bytecode.
//!
//! A Pratt parser drives code generation directly: there is no syntax
//! tree. Each function being compiled has a [`FunctionState`] on a stack,
//! innermost last, which owns the [`ObjFunction`] under construction, the
//! declared locals and the captured upvalues. Finished nested functions
//! are moved into the heap and referenced from the enclosing chunk's
//! constant pool.
//!
//! Every object the compiler places in a constant pool is also pushed as
//! an extra heap root until compilation finishes, so a collection that
//! happens while compiling cannot free a half-built program.

mod expressions;
mod precedence;
mod statements;

use crate::error::{syntax_error, CompileErrors};
use crate::lexer::{Keyword, Lexer, Punctuator, SpannedToken, Token};
use bytecode_system::{Chunk, OpCode, UpvalueDescriptor};
use core_types::{ObjRef, SloError, SourcePosition, Value};
use memory_manager::{Heap, Obj, ObjFunction, INIT_METHOD_NAME};

/// Maximum locals in one function, including the reserved slot zero
pub const MAX_LOCALS: usize = 256;
/// Maximum captured variables in one function
pub const MAX_UPVALUES: usize = 256;
/// Maximum parameters or call arguments
pub const MAX_ARGS: usize = 255;

/// Deepest allowed nesting of expressions, and separately of statements
pub const MAX_NESTING: usize = 256;

/// Compile `source` into the top-level script function.
///
/// `file` labels the code in fault reports and stack traces. On failure
/// every syntax error found is returned, in source order.
///
/// # Examples
///
/// ```
/// use memory_manager::Heap;
/// use parser::compile;
///
/// let mut heap = Heap::new();
/// let script = compile(&mut heap, "var x = 1 + 2;", "main.slo").unwrap();
/// assert!(heap.as_function(script).is_some());
///
/// let errors = compile(&mut heap, "var = ;", "main.slo").unwrap_err();
/// assert_eq!(errors.len(), 1);
/// ```
pub fn compile(heap: &mut Heap, source: &str, file: &str) -> Result<ObjRef, CompileErrors> {
    Compiler::new(heap, source, file).compile_script()
}

/// What kind of routine a [`FunctionState`] compiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Script,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone)]
struct Local {
    name: String,
    /// `None` while the variable's initializer is being compiled
    depth: Option<u32>,
    is_captured: bool,
    is_final: bool,
}

impl Local {
    fn deeper_than(&self, depth: u32) -> bool {
        self.depth.map_or(true, |d| d > depth)
    }
}

#[derive(Debug, Clone, Copy)]
struct Upvalue {
    index: u8,
    is_local: bool,
    is_final: bool,
}

#[derive(Debug, Default)]
struct LoopState {
    /// Backward target of `continue`; `None` when continues jump forward
    continue_target: Option<usize>,
    continue_jumps: Vec<usize>,
    break_jumps: Vec<usize>,
    /// Locals deeper than this are discarded when leaving the body
    scope_depth: u32,
}

struct FunctionState {
    function: ObjFunction,
    kind: FunctionKind,
    locals: Vec<Local>,
    upvalues: Vec<Upvalue>,
    scope_depth: u32,
    loops: Vec<LoopState>,
}

impl FunctionState {
    fn new(kind: FunctionKind, name: Option<ObjRef>, file: ObjRef) -> Self {
        let function = ObjFunction {
            name,
            file: Some(file),
            ..ObjFunction::default()
        };
        // Slot zero holds the callee, or the receiver inside methods
        let receiver = match kind {
            FunctionKind::Method | FunctionKind::Initializer => "self",
            FunctionKind::Script | FunctionKind::Function => "",
        };
        Self {
            function,
            kind,
            locals: vec![Local {
                name: receiver.to_string(),
                depth: Some(0),
                is_captured: false,
                is_final: false,
            }],
            upvalues: Vec::new(),
            scope_depth: 0,
            loops: Vec::new(),
        }
    }
}

struct ClassState {
    has_superclass: bool,
}

/// Where a named variable lives
#[derive(Debug, Clone, Copy)]
enum Target {
    Local(u8),
    Upvalue(u8),
    Global(u16),
}

impl Target {
    fn get(self) -> OpCode {
        match self {
            Target::Local(slot) => OpCode::GetLocal(slot),
            Target::Upvalue(slot) => OpCode::GetUpvalue(slot),
            Target::Global(name) => OpCode::GetGlobal(name),
        }
    }

    fn set(self) -> OpCode {
        match self {
            Target::Local(slot) => OpCode::SetLocal(slot),
            Target::Upvalue(slot) => OpCode::SetUpvalue(slot),
            Target::Global(name) => OpCode::SetGlobal(name),
        }
    }
}

pub(crate) struct Compiler<'src, 'heap> {
    lexer: Lexer<'src>,
    heap: &'heap mut Heap,
    file: String,
    file_ref: ObjRef,
    source_lines: Vec<&'src str>,
    current: SpannedToken,
    previous: SpannedToken,
    panic_mode: bool,
    errors: Vec<SloError>,
    functions: Vec<FunctionState>,
    classes: Vec<ClassState>,
    root_base: usize,
    /// Expressions currently being parsed inside one another
    expression_depth: usize,
    /// Statements and blocks currently open inside one another
    statement_depth: usize,
}

impl<'src, 'heap> Compiler<'src, 'heap> {
    fn new(heap: &'heap mut Heap, source: &'src str, file: &str) -> Self {
        let root_base = heap.root_count();
        let file_ref = heap.intern(file);
        heap.push_root(Value::Obj(file_ref));
        Self {
            lexer: Lexer::new(source),
            heap,
            file: file.to_string(),
            file_ref,
            source_lines: source.lines().collect(),
            current: SpannedToken::eof(),
            previous: SpannedToken::eof(),
            panic_mode: false,
            errors: Vec::new(),
            functions: vec![FunctionState::new(FunctionKind::Script, None, file_ref)],
            classes: Vec::new(),
            root_base,
            expression_depth: 0,
            statement_depth: 0,
        }
    }

    fn compile_script(mut self) -> Result<ObjRef, CompileErrors> {
        self.advance();
        while !self.is_at_end() {
            self.declaration();
        }
        let function = self.end_function();

        let result = if self.errors.is_empty() {
            Ok(self.heap.alloc(Obj::Function(Box::new(function))))
        } else {
            log::debug!(
                "compilation of {} failed with {} error(s)",
                self.file,
                self.errors.len()
            );
            Err(CompileErrors {
                errors: std::mem::take(&mut self.errors),
            })
        };
        self.heap.truncate_roots(self.root_base);
        result
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    fn advance(&mut self) {
        let next = loop {
            match self.lexer.next_token() {
                Ok(token) => break token,
                Err(err) => self.report(err),
            }
        };
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn is_at_end(&self) -> bool {
        self.current.token == Token::EOF
    }

    fn check(&self, punct: Punctuator) -> bool {
        self.current.token == Token::Punctuator(punct)
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current.token == Token::Keyword(keyword)
    }

    fn match_punct(&mut self, punct: Punctuator) -> bool {
        if !self.check(punct) {
            return false;
        }
        self.advance();
        true
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if !self.check_keyword(keyword) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, punct: Punctuator, message: &str) {
        if !self.match_punct(punct) {
            self.error_at_current(message);
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword, message: &str) {
        if !self.match_keyword(keyword) {
            self.error_at_current(message);
        }
    }

    /// Consume an identifier and return its name, or an empty name after
    /// reporting an error
    fn consume_identifier(&mut self, message: &str) -> String {
        if let Token::Identifier(name) = &self.current.token {
            let name = name.clone();
            self.advance();
            return name;
        }
        self.error_at_current(message);
        String::new()
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    fn error(&mut self, message: &str) {
        let position = self.previous.position;
        self.report(syntax_error(message, position));
    }

    fn error_at_current(&mut self, message: &str) {
        let position = self.current.position;
        self.report(syntax_error(message, position));
    }

    /// Record an error unless one is already being recovered from
    fn report(&mut self, error: SloError) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let mut error = error.with_file(self.file.clone());
        if let Some(position) = error.position {
            let line = position
                .line
                .checked_sub(1)
                .and_then(|index| self.source_lines.get(index as usize));
            if let Some(text) = line {
                error = error.with_source_line(*text);
            }
        }
        self.errors.push(error);
    }

    /// Skip tokens until a likely statement boundary
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.is_at_end() {
            if self.previous.token == Token::Punctuator(Punctuator::Semicolon) {
                return;
            }
            if let Token::Keyword(
                Keyword::Class
                | Keyword::Func
                | Keyword::Var
                | Keyword::Final
                | Keyword::For
                | Keyword::If
                | Keyword::While
                | Keyword::Return
                | Keyword::Import
                | Keyword::Enum
                | Keyword::Assert,
            ) = self.current.token
            {
                return;
            }
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    fn state(&mut self) -> &mut FunctionState {
        let innermost = self.functions.len() - 1;
        &mut self.functions[innermost]
    }

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.state().function.chunk
    }

    fn emit(&mut self, op: OpCode) -> usize {
        let position = self.previous.position;
        self.emit_at(op, position)
    }

    fn emit_at(&mut self, op: OpCode, position: SourcePosition) -> usize {
        self.chunk().write(op, position)
    }

    fn make_constant(&mut self, value: Value) -> u16 {
        if value.is_obj() {
            self.heap.push_root(value);
        }
        let index = self.chunk().add_constant(value);
        match u16::try_from(index) {
            Ok(index) => index,
            Err(_) => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit(OpCode::Constant(index));
    }

    /// Constant-pool index of a name, reusing an existing entry
    fn identifier_constant(&mut self, name: &str) -> u16 {
        let value = self.heap.string_value(name);
        let existing = self
            .chunk()
            .constants
            .iter()
            .position(|constant| *constant == value);
        match existing.and_then(|index| u16::try_from(index).ok()) {
            Some(index) => index,
            None => self.make_constant(value),
        }
    }

    /// Emit a forward jump with a placeholder distance
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit(op)
    }

    /// Point the forward jump at `offset` to the next instruction emitted
    fn patch_jump(&mut self, offset: usize) {
        let distance = self.chunk().len() - offset - 1;
        match u16::try_from(distance) {
            Ok(distance) => self.chunk().patch_jump(offset, distance),
            Err(_) => self.error("Too much code to jump over."),
        }
    }

    fn emit_loop(&mut self, start: usize) {
        let distance = self.chunk().len() + 1 - start;
        match u16::try_from(distance) {
            Ok(distance) => {
                self.emit(OpCode::Loop(distance));
            }
            Err(_) => self.error("Loop body too large."),
        }
    }

    fn emit_return(&mut self) {
        if self.state().kind == FunctionKind::Initializer {
            self.emit(OpCode::GetLocal(0));
        } else {
            self.emit(OpCode::Nil);
        }
        self.emit(OpCode::Return);
    }

    /// Finish the innermost function and hand back its compiled form
    fn end_function(&mut self) -> ObjFunction {
        self.emit_return();
        let Some(state) = self.functions.pop() else {
            return ObjFunction::default();
        };
        let mut function = state.function;
        function.upvalues = state
            .upvalues
            .iter()
            .map(|upvalue| UpvalueDescriptor::new(upvalue.is_local, upvalue.index))
            .collect();
        log::trace!(
            "compiled {}: {} instructions, {} constants, {} upvalues",
            function
                .name
                .map_or("<script>", |name| self.heap.str_of(name)),
            function.chunk.len(),
            function.chunk.constants.len(),
            function.upvalues.len()
        );
        function
    }

    /// Compile a parameter list and body, then emit a closure over it
    fn function(&mut self, kind: FunctionKind, name: &str) {
        let name_ref = self.heap.intern(name);
        self.heap.push_root(Value::Obj(name_ref));
        self.functions
            .push(FunctionState::new(kind, Some(name_ref), self.file_ref));
        self.begin_scope();

        self.consume(Punctuator::LParen, "Expect '(' after function name.");
        if !self.check(Punctuator::RParen) {
            loop {
                let arity = usize::from(self.state().function.arity) + 1;
                if arity > MAX_ARGS {
                    self.error_at_current("Can't have more than 255 parameters.");
                } else {
                    self.state().function.arity = arity as u8;
                }
                let (_, constant) = self.parse_variable("Expect parameter name.");
                self.define_variable(constant, false);
                if !self.match_punct(Punctuator::Comma) {
                    break;
                }
            }
        }
        self.consume(Punctuator::RParen, "Expect ')' after parameters.");
        self.consume(Punctuator::LBrace, "Expect '{' before function body.");
        self.block();

        let function = self.end_function();
        let handle = self.heap.alloc(Obj::Function(Box::new(function)));
        let constant = self.make_constant(Value::Obj(handle));
        self.emit(OpCode::Closure(constant));
    }

    // ------------------------------------------------------------------
    // Scopes and variables
    // ------------------------------------------------------------------

    fn begin_scope(&mut self) {
        self.state().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let depth = {
            let state = self.state();
            state.scope_depth -= 1;
            state.scope_depth
        };
        self.discard_locals(depth);
        let state = self.state();
        while state.locals.last().is_some_and(|local| local.deeper_than(depth)) {
            state.locals.pop();
        }
    }

    /// Emit pops for every local deeper than `depth`, closing captured
    /// ones, without forgetting them
    fn discard_locals(&mut self, depth: u32) {
        let ops: Vec<OpCode> = self
            .state()
            .locals
            .iter()
            .rev()
            .take_while(|local| local.deeper_than(depth))
            .map(|local| {
                if local.is_captured {
                    OpCode::CloseUpvalue
                } else {
                    OpCode::Pop
                }
            })
            .collect();
        for op in ops {
            self.emit(op);
        }
    }

    fn add_local(&mut self, name: &str) {
        if self.state().locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.state().locals.push(Local {
            name: name.to_string(),
            depth: None,
            is_captured: false,
            is_final: false,
        });
    }

    /// Record a local in the current scope; globals need no declaration
    fn declare_variable(&mut self, name: &str) {
        let state = self.state();
        let scope = state.scope_depth;
        if scope == 0 {
            return;
        }
        let duplicate = state
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.map_or(true, |d| d >= scope))
            .any(|local| local.name == name);
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    /// Consume a variable name and declare it. Returns the name and, at
    /// global scope, its constant index.
    fn parse_variable(&mut self, message: &str) -> (String, u16) {
        let name = self.consume_identifier(message);
        self.declare_variable(&name);
        if self.state().scope_depth > 0 {
            return (name, 0);
        }
        let constant = self.identifier_constant(&name);
        (name, constant)
    }

    fn mark_initialized(&mut self, is_final: bool) {
        let state = self.state();
        let scope = state.scope_depth;
        if scope == 0 {
            return;
        }
        if let Some(local) = state.locals.last_mut() {
            local.depth = Some(scope);
            local.is_final = is_final;
        }
    }

    fn define_variable(&mut self, global: u16, is_final: bool) {
        if self.state().scope_depth > 0 {
            self.mark_initialized(is_final);
            return;
        }
        if is_final {
            self.emit(OpCode::DefineFinalGlobal(global));
        } else {
            self.emit(OpCode::DefineGlobal(global));
        }
    }

    fn resolve_local(&mut self, function: usize, name: &str) -> Option<(u8, bool)> {
        let (slot, uninitialized, is_final) = self.functions[function]
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)
            .map(|(slot, local)| (slot, local.depth.is_none(), local.is_final))?;
        if uninitialized {
            self.error("Can't read local variable in its own initializer.");
        }
        Some((slot as u8, is_final))
    }

    fn add_upvalue(&mut self, function: usize, index: u8, is_local: bool, is_final: bool) -> u8 {
        let upvalues = &self.functions[function].upvalues;
        if let Some(existing) = upvalues
            .iter()
            .position(|upvalue| upvalue.index == index && upvalue.is_local == is_local)
        {
            return existing as u8;
        }
        if upvalues.len() == MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        let upvalues = &mut self.functions[function].upvalues;
        upvalues.push(Upvalue {
            index,
            is_local,
            is_final,
        });
        (upvalues.len() - 1) as u8
    }

    fn resolve_upvalue(&mut self, function: usize, name: &str) -> Option<u8> {
        if function == 0 {
            return None;
        }
        let enclosing = function - 1;
        if let Some((local, is_final)) = self.resolve_local(enclosing, name) {
            self.functions[enclosing].locals[usize::from(local)].is_captured = true;
            return Some(self.add_upvalue(function, local, true, is_final));
        }
        let upvalue = self.resolve_upvalue(enclosing, name)?;
        let is_final = self.upvalue_is_final(enclosing, upvalue);
        Some(self.add_upvalue(function, upvalue, false, is_final))
    }

    /// Whether an upvalue of `function` captures a final variable
    fn upvalue_is_final(&self, function: usize, index: u8) -> bool {
        self.functions[function]
            .upvalues
            .get(usize::from(index))
            .is_some_and(|upvalue| upvalue.is_final)
    }

    /// Resolve a name to a local, an upvalue or a global, with its finality
    fn resolve_variable(&mut self, name: &str) -> (Target, bool) {
        let innermost = self.functions.len() - 1;
        if let Some((slot, is_final)) = self.resolve_local(innermost, name) {
            return (Target::Local(slot), is_final);
        }
        if let Some(slot) = self.resolve_upvalue(innermost, name) {
            return (Target::Upvalue(slot), self.upvalue_is_final(innermost, slot));
        }
        (Target::Global(self.identifier_constant(name)), false)
    }

    /// Compile-time check for assignments to final locals and upvalues
    fn reject_final(&mut self, is_final: bool, name: &str) {
        if is_final {
            self.error(&format!("Cannot reassign final variable '{}'.", name));
        }
    }

    /// Push a variable's value without looking for an assignment
    fn load_variable(&mut self, name: &str) {
        let (target, _) = self.resolve_variable(name);
        self.emit(target.get());
    }

    /// The name the initializer method must have
    fn is_initializer_name(name: &str) -> bool {
        name == INIT_METHOD_NAME
    }
}
