//! Bytecode instruction set for the slo stack machine.
//!
//! Operands are carried as typed fields of each variant. Constant-pool
//! operands are `u16` indices, local and upvalue slots are `u8`, and jump
//! distances are `u16` counts of instructions relative to the instruction
//! following the jump.

/// Descriptor for a captured variable (upvalue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpvalueDescriptor {
    /// true if the variable is a local of the immediately enclosing function,
    /// false if it is one of the enclosing function's own upvalues
    pub is_local: bool,
    /// Stack slot (if local) or upvalue index (if not)
    pub index: u8,
}

impl UpvalueDescriptor {
    /// Create a new upvalue descriptor
    pub fn new(is_local: bool, index: u8) -> Self {
        Self { is_local, index }
    }
}

/// Bytecode instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    // Literals
    /// Push constant from the pool
    Constant(u16),
    /// Push `nil`
    Nil,
    /// Push `true`
    True,
    /// Push `false`
    False,

    // Stack
    /// Discard the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top two values, preserving order
    Dup2,

    // Variables
    /// Bind a global to the popped value; operand names it
    DefineGlobal(u16),
    /// Bind a global that can never be reassigned
    DefineFinalGlobal(u16),
    /// Push a global by name
    GetGlobal(u16),
    /// Assign an existing global, leaving the value on the stack
    SetGlobal(u16),
    /// Push a local slot of the current frame
    GetLocal(u8),
    /// Assign a local slot, leaving the value on the stack
    SetLocal(u8),
    /// Push a captured variable of the current closure
    GetUpvalue(u8),
    /// Assign a captured variable
    SetUpvalue(u8),
    /// Close the upvalue for the top stack slot, then pop it
    CloseUpvalue,

    // Comparison
    /// Structural equality
    Equal,
    /// Structural inequality
    NotEqual,
    /// Numeric `>`
    Greater,
    /// Numeric `>=`
    GreaterEqual,
    /// Numeric `<`
    Less,
    /// Numeric `<=`
    LessEqual,

    // Arithmetic
    /// Numeric add, string concatenation or list concatenation
    Add,
    /// Numeric subtraction
    Subtract,
    /// Numeric multiplication
    Multiply,
    /// Numeric division
    Divide,
    /// Numeric remainder
    Modulo,
    /// Exponentiation
    Power,
    /// Numeric negation
    Negate,
    /// Logical not of truthiness
    Not,

    // Control flow
    /// Jump forward unconditionally
    Jump(u16),
    /// Jump forward if the top value is falsey; the value stays on the stack
    JumpIfFalse(u16),
    /// Jump forward if the top value is truthy; the value stays on the stack
    JumpIfTrue(u16),
    /// Jump backward unconditionally
    Loop(u16),

    // Calls
    /// Call the value below `argc` arguments
    Call(u8),
    /// Invoke a named method on the receiver below `argc` arguments
    Invoke(u16, u8),
    /// Invoke a named method resolved on the popped superclass
    SuperInvoke(u16, u8),
    /// Wrap the function constant in a closure and capture its upvalues
    Closure(u16),
    /// Return from the current frame
    Return,

    // Classes
    /// Push a new class named by the constant
    Class(u16),
    /// Bind the closure on top of the stack as a method of the class below it
    Method(u16),
    /// Copy the superclass's methods into the subclass on top of the stack
    Inherit,
    /// Read a field, method, enum member or module export
    GetProperty(u16),
    /// Write a field on an instance
    SetProperty(u16),
    /// Bind a superclass method to the receiver
    GetSuper(u16),

    // Containers
    /// Build a list from the top `n` values
    List(u16),
    /// Build a dict from the top `n` key/value pairs
    Dict(u16),
    /// `container[index]`
    GetIndex,
    /// `container[index] = value`
    SetIndex,
    /// `list[start:end]`
    Slice,
    /// Membership test
    Has,
    /// Negated membership test
    HasNot,
    /// Length of a list, string or dict
    Len,
    /// Build an enum named by the constant from the top `n` name/ordinal pairs
    Enum(u16, u8),

    // Modules and misc
    /// Import a module and bind it under its own name
    Import(u16),
    /// Import a module (first operand) and bind it under an alias (second)
    ImportAs(u16, u16),
    /// Concatenate the display strings of the top `n` values
    Interpolate(u8),
    /// Fault unless the condition is truthy; `true` when a message is on the stack
    Assert(bool),
}

impl OpCode {
    /// Mnemonic used by the disassembler
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant(_) => "CONSTANT",
            OpCode::Nil => "NIL",
            OpCode::True => "TRUE",
            OpCode::False => "FALSE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::Dup2 => "DUP2",
            OpCode::DefineGlobal(_) => "DEFINE_GLOBAL",
            OpCode::DefineFinalGlobal(_) => "DEFINE_FINAL_GLOBAL",
            OpCode::GetGlobal(_) => "GET_GLOBAL",
            OpCode::SetGlobal(_) => "SET_GLOBAL",
            OpCode::GetLocal(_) => "GET_LOCAL",
            OpCode::SetLocal(_) => "SET_LOCAL",
            OpCode::GetUpvalue(_) => "GET_UPVALUE",
            OpCode::SetUpvalue(_) => "SET_UPVALUE",
            OpCode::CloseUpvalue => "CLOSE_UPVALUE",
            OpCode::Equal => "EQUAL",
            OpCode::NotEqual => "NOT_EQUAL",
            OpCode::Greater => "GREATER",
            OpCode::GreaterEqual => "GREATER_EQUAL",
            OpCode::Less => "LESS",
            OpCode::LessEqual => "LESS_EQUAL",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUBTRACT",
            OpCode::Multiply => "MULTIPLY",
            OpCode::Divide => "DIVIDE",
            OpCode::Modulo => "MODULO",
            OpCode::Power => "POW",
            OpCode::Negate => "NEGATE",
            OpCode::Not => "NOT",
            OpCode::Jump(_) => "JUMP",
            OpCode::JumpIfFalse(_) => "JUMP_IF_FALSE",
            OpCode::JumpIfTrue(_) => "JUMP_IF_TRUE",
            OpCode::Loop(_) => "LOOP",
            OpCode::Call(_) => "CALL",
            OpCode::Invoke(_, _) => "INVOKE",
            OpCode::SuperInvoke(_, _) => "SUPER_INVOKE",
            OpCode::Closure(_) => "CLOSURE",
            OpCode::Return => "RETURN",
            OpCode::Class(_) => "CLASS",
            OpCode::Method(_) => "METHOD",
            OpCode::Inherit => "INHERIT",
            OpCode::GetProperty(_) => "GET_PROPERTY",
            OpCode::SetProperty(_) => "SET_PROPERTY",
            OpCode::GetSuper(_) => "GET_SUPER",
            OpCode::List(_) => "LIST",
            OpCode::Dict(_) => "DICT",
            OpCode::GetIndex => "GET_INDEX",
            OpCode::SetIndex => "SET_INDEX",
            OpCode::Slice => "SLICE",
            OpCode::Has => "HAS",
            OpCode::HasNot => "HAS_NOT",
            OpCode::Len => "LEN",
            OpCode::Enum(_, _) => "ENUM",
            OpCode::Import(_) => "IMPORT",
            OpCode::ImportAs(_, _) => "IMPORT_AS",
            OpCode::Interpolate(_) => "INTERPOLATE",
            OpCode::Assert(_) => "ASSERT",
        }
    }

    /// The constant-pool index this instruction refers to, if any
    pub fn constant_operand(&self) -> Option<u16> {
        match *self {
            OpCode::Constant(i)
            | OpCode::DefineGlobal(i)
            | OpCode::DefineFinalGlobal(i)
            | OpCode::GetGlobal(i)
            | OpCode::SetGlobal(i)
            | OpCode::Invoke(i, _)
            | OpCode::SuperInvoke(i, _)
            | OpCode::Closure(i)
            | OpCode::Class(i)
            | OpCode::Method(i)
            | OpCode::GetProperty(i)
            | OpCode::SetProperty(i)
            | OpCode::GetSuper(i)
            | OpCode::Enum(i, _)
            | OpCode::Import(i)
            | OpCode::ImportAs(i, _) => Some(i),
            _ => None,
        }
    }

    /// Check if this opcode transfers control
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            OpCode::Jump(_) | OpCode::JumpIfFalse(_) | OpCode::JumpIfTrue(_) | OpCode::Loop(_)
        )
    }

    /// Returns a copy of a forward jump with its distance replaced.
    ///
    /// Non-jump instructions are returned unchanged.
    pub fn with_jump_distance(self, distance: u16) -> Self {
        match self {
            OpCode::Jump(_) => OpCode::Jump(distance),
            OpCode::JumpIfFalse(_) => OpCode::JumpIfFalse(distance),
            OpCode::JumpIfTrue(_) => OpCode::JumpIfTrue(distance),
            other => other,
        }
    }
}
