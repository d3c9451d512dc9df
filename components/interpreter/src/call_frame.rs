//! Call frames for the engine's frame stack

use core_types::ObjRef;

/// Deepest call nesting before a stack overflow fault
pub const FRAMES_MAX: usize = 256;

/// Operand stack capacity in slots
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// One active function invocation
///
/// Slot `base` of the operand stack holds the callee (or the receiver for
/// methods), followed by the arguments and then the frame's other locals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    /// Closure being executed
    pub closure: ObjRef,
    /// The closure's function, cached to skip one lookup per instruction
    pub function: ObjRef,
    /// Index of the next instruction to execute
    pub ip: usize,
    /// Operand stack index of slot zero
    pub base: usize,
}

impl CallFrame {
    /// Create a frame positioned at the first instruction
    pub fn new(closure: ObjRef, function: ObjRef, base: usize) -> Self {
        Self {
            closure,
            function,
            ip: 0,
            base,
        }
    }

    /// Index of the instruction most recently fetched
    pub fn current_instruction(&self) -> usize {
        self.ip.saturating_sub(1)
    }
}
