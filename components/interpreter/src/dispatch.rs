//! Dispatch loop for bytecode execution
//!
//! Fetches one instruction at a time from the innermost frame and executes
//! it against the shared operand stack. Calls and property access live in
//! [`calls`](crate::calls); container instructions in
//! [`containers`](crate::containers).

use bytecode_system::{disassemble_instruction, OpCode};
use core_types::{ErrorKind, ObjRef, Value};
use memory_manager::{Obj, TableKey};

use crate::call_frame::{CallFrame, STACK_MAX};
use crate::error::{fault, Interrupt};
use crate::vm::Vm;

/// IEEE 754 remainder: `a - b * n` with `n` the integer nearest `a / b`,
/// ties to even. The result may be negative for positive operands.
pub fn ieee_remainder(a: f64, b: f64) -> f64 {
    if b.is_infinite() && a.is_finite() {
        return a;
    }
    a - b * (a / b).round_ties_even()
}

impl Vm {
    /// Execute until the outermost frame returns
    pub(crate) fn run(&mut self) -> Result<(), Interrupt> {
        loop {
            self.collect_if_needed();
            let Some(op) = self.fetch() else {
                return Ok(());
            };
            if self.config.trace_execution {
                self.trace_instruction();
            }

            match op {
                OpCode::Constant(index) => {
                    let value = self.read_constant(index);
                    self.push(value)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,

                OpCode::Pop => {
                    self.pop();
                }
                OpCode::Dup => {
                    let value = self.peek(0);
                    self.push(value)?;
                }
                OpCode::Dup2 => {
                    let below = self.peek(1);
                    let top = self.peek(0);
                    self.push(below)?;
                    self.push(top)?;
                }

                OpCode::DefineGlobal(index) => self.define_global(index, false)?,
                OpCode::DefineFinalGlobal(index) => self.define_global(index, true)?,
                OpCode::GetGlobal(index) => {
                    let key = self.constant_key(index);
                    match self.globals.get(key) {
                        Some(value) => self.push(value)?,
                        None => {
                            return fault(
                                ErrorKind::Name,
                                format!("Undefined variable '{}'.", self.constant_name(index)),
                            )
                        }
                    }
                }
                OpCode::SetGlobal(index) => {
                    let key = self.constant_key(index);
                    if self.finals.contains(key) {
                        return fault(
                            ErrorKind::Name,
                            format!(
                                "Cannot reassign final variable '{}'.",
                                self.constant_name(index)
                            ),
                        );
                    }
                    if !self.globals.contains(key) {
                        return fault(
                            ErrorKind::Name,
                            format!("Undefined variable '{}'.", self.constant_name(index)),
                        );
                    }
                    let value = self.peek(0);
                    self.globals.set(key, value);
                }
                OpCode::GetLocal(slot) => {
                    let value = self.local(slot);
                    self.push(value)?;
                }
                OpCode::SetLocal(slot) => {
                    let value = self.peek(0);
                    let index = self.frame().base + slot as usize;
                    if let Some(target) = self.stack.get_mut(index) {
                        *target = value;
                    }
                }
                OpCode::GetUpvalue(slot) => {
                    let value = self.read_upvalue(self.frame().closure, slot as usize);
                    self.push(value)?;
                }
                OpCode::SetUpvalue(slot) => {
                    let value = self.peek(0);
                    self.write_upvalue(self.frame().closure, slot as usize, value);
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len().saturating_sub(1));
                    self.pop();
                }

                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(self.heap.values_equal(a, b)))?;
                }
                OpCode::NotEqual => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(!self.heap.values_equal(a, b)))?;
                }
                OpCode::Greater => self.compare(|a, b| a > b)?,
                OpCode::GreaterEqual => self.compare(|a, b| a >= b)?,
                OpCode::Less => self.compare(|a, b| a < b)?,
                OpCode::LessEqual => self.compare(|a, b| a <= b)?,

                OpCode::Add => self.add()?,
                OpCode::Subtract => self.arithmetic(|a, b| a - b)?,
                OpCode::Multiply => self.arithmetic(|a, b| a * b)?,
                OpCode::Divide => self.arithmetic(|a, b| a / b)?,
                OpCode::Modulo => self.arithmetic(ieee_remainder)?,
                OpCode::Power => self.arithmetic(f64::powf)?,
                OpCode::Negate => match self.peek(0) {
                    Value::Number(n) => {
                        self.pop();
                        self.push(Value::Number(-n))?;
                    }
                    other => {
                        return fault(
                            ErrorKind::Type,
                            format!(
                                "Operand must be a number, not '{}'.",
                                self.heap.type_name(other)
                            ),
                        )
                    }
                },
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()))?;
                }

                OpCode::Jump(distance) => self.frame_mut().ip += distance as usize,
                OpCode::JumpIfFalse(distance) => {
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += distance as usize;
                    }
                }
                OpCode::JumpIfTrue(distance) => {
                    if !self.peek(0).is_falsey() {
                        self.frame_mut().ip += distance as usize;
                    }
                }
                OpCode::Loop(distance) => {
                    let frame = self.frame_mut();
                    frame.ip = frame.ip.saturating_sub(distance as usize);
                }

                OpCode::Call(argc) => {
                    let argc = argc as usize;
                    let callee = self.peek(argc);
                    self.call_value(callee, argc)?;
                }
                OpCode::Invoke(name, argc) => {
                    let key = self.constant_key(name);
                    self.invoke(key, argc as usize)?;
                }
                OpCode::SuperInvoke(name, argc) => {
                    let key = self.constant_key(name);
                    let superclass = self.pop();
                    let superclass = self.expect_class(superclass)?;
                    self.invoke_from_class(superclass, key, argc as usize)?;
                }
                OpCode::Closure(index) => self.make_closure(index)?,
                OpCode::Return => {
                    let result = self.pop();
                    let Some(frame) = self.frames.pop() else {
                        return Ok(());
                    };
                    self.close_upvalues(frame.base);
                    self.stack.truncate(frame.base);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result)?;
                }

                OpCode::Class(name) => {
                    let name = self.constant_ref(name);
                    let class = self.heap.new_class(name, None);
                    self.push(Value::Obj(class))?;
                }
                OpCode::Method(name) => self.define_method(name),
                OpCode::Inherit => self.inherit()?,
                OpCode::GetProperty(name) => self.get_property(name)?,
                OpCode::SetProperty(name) => self.set_property(name)?,
                OpCode::GetSuper(name) => self.get_super(name)?,

                OpCode::List(count) => self.build_list(count as usize)?,
                OpCode::Dict(count) => self.build_dict(count as usize)?,
                OpCode::GetIndex => self.get_index()?,
                OpCode::SetIndex => self.set_index()?,
                OpCode::Slice => self.slice()?,
                OpCode::Has => self.membership(false)?,
                OpCode::HasNot => self.membership(true)?,
                OpCode::Len => self.length()?,
                OpCode::Enum(name, count) => self.build_enum(name, count as usize)?,

                OpCode::Import(module) => self.import(module, None)?,
                OpCode::ImportAs(module, alias) => self.import(module, Some(alias))?,
                OpCode::Interpolate(count) => self.interpolate(count as usize)?,
                OpCode::Assert(has_message) => self.assert(has_message)?,
            }
        }
    }

    /// Read the next instruction of the innermost frame and advance past it
    fn fetch(&mut self) -> Option<OpCode> {
        let frame = self.frames.last_mut()?;
        let op = match self.heap.get(frame.function) {
            Obj::Function(function) => function.chunk.code.get(frame.ip).copied(),
            _ => None,
        }?;
        frame.ip += 1;
        Some(op)
    }

    fn trace_instruction(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let frame = self.frame();
        let Some(function) = self.heap.as_function(frame.function) else {
            return;
        };
        let stack: Vec<String> = self
            .stack
            .iter()
            .map(|value| format!("[ {} ]", self.heap.display(*value)))
            .collect();
        log::trace!("          {}", stack.concat());
        let render = |value: Value| self.heap.display(value);
        log::trace!(
            "{}",
            disassemble_instruction(&function.chunk, frame.current_instruction(), &render)
        );
    }

    // ------------------------------------------------------------------
    // Stack and frame access
    // ------------------------------------------------------------------

    /// Push onto the operand stack, which holds at most [`STACK_MAX`] values
    pub(crate) fn push(&mut self, value: Value) -> Result<(), Interrupt> {
        if self.stack.len() >= STACK_MAX {
            return fault(ErrorKind::Runtime, "Stack overflow.");
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Nil)
    }

    /// The value `distance` slots below the top
    pub(crate) fn peek(&self, distance: usize) -> Value {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .and_then(|index| self.stack.get(index))
            .copied()
            .unwrap_or(Value::Nil)
    }

    /// Pop the top `count` values, oldest first
    pub(crate) fn pop_many(&mut self, count: usize) -> Vec<Value> {
        let start = self.stack.len().saturating_sub(count);
        self.stack.split_off(start)
    }

    /// Copy of the innermost frame
    pub(crate) fn frame(&self) -> CallFrame {
        self.frames
            .last()
            .copied()
            .unwrap_or_else(|| CallFrame::new(ObjRef::new(0), ObjRef::new(0), 0))
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        let index = self.frames.len().saturating_sub(1);
        &mut self.frames[index]
    }

    fn local(&self, slot: u8) -> Value {
        self.stack
            .get(self.frame().base + slot as usize)
            .copied()
            .unwrap_or(Value::Nil)
    }

    // ------------------------------------------------------------------
    // Constants
    // ------------------------------------------------------------------

    pub(crate) fn read_constant(&self, index: u16) -> Value {
        self.heap
            .as_function(self.frame().function)
            .and_then(|function| function.chunk.constants.get(index as usize))
            .copied()
            .unwrap_or(Value::Nil)
    }

    /// A name constant as a heap handle
    pub(crate) fn constant_ref(&self, index: u16) -> ObjRef {
        self.read_constant(index)
            .as_obj()
            .unwrap_or_else(|| self.heap.init_string())
    }

    /// A name constant as a table key
    pub(crate) fn constant_key(&self, index: u16) -> TableKey {
        self.heap.string_key(self.constant_ref(index))
    }

    /// A name constant's text, for messages
    pub(crate) fn constant_name(&self, index: u16) -> String {
        self.heap.str_of(self.constant_ref(index)).to_string()
    }

    // ------------------------------------------------------------------
    // Globals and operators
    // ------------------------------------------------------------------

    fn define_global(&mut self, index: u16, is_final: bool) -> Result<(), Interrupt> {
        let key = self.constant_key(index);
        if self.finals.contains(key) {
            return fault(
                ErrorKind::Name,
                format!(
                    "Cannot reassign final variable '{}'.",
                    self.constant_name(index)
                ),
            );
        }
        let value = self.peek(0);
        self.globals.set(key, value);
        if is_final {
            self.finals.set(key, Value::Bool(true));
        }
        self.pop();
        Ok(())
    }

    fn numeric_operands(&self) -> Result<(f64, f64), Interrupt> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),
            (a, b) => fault(
                ErrorKind::Type,
                format!(
                    "Operands must be numbers, got '{}' and '{}'.",
                    self.heap.type_name(a),
                    self.heap.type_name(b)
                ),
            ),
        }
    }

    fn arithmetic(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), Interrupt> {
        let (a, b) = self.numeric_operands()?;
        self.pop();
        self.pop();
        self.push(Value::Number(op(a, b)))
    }

    fn compare(&mut self, op: impl Fn(f64, f64) -> bool) -> Result<(), Interrupt> {
        let (a, b) = self.numeric_operands()?;
        self.pop();
        self.pop();
        self.push(Value::Bool(op(a, b)))
    }

    /// Numeric addition, string concatenation or list concatenation
    fn add(&mut self) -> Result<(), Interrupt> {
        let (a, b) = (self.peek(1), self.peek(0));
        let result = match (a, b) {
            (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
            (Value::Obj(x), Value::Obj(y)) => match (self.heap.get(x), self.heap.get(y)) {
                (Obj::String(x), Obj::String(y)) => {
                    let joined = format!("{}{}", x.chars, y.chars);
                    Value::Obj(self.heap.intern_owned(joined))
                }
                (Obj::List(x), Obj::List(y)) => {
                    let values: Vec<Value> = x.values.iter().chain(&y.values).copied().collect();
                    Value::Obj(self.heap.new_list(values))
                }
                _ => return self.add_mismatch(a, b),
            },
            _ => return self.add_mismatch(a, b),
        };
        self.pop();
        self.pop();
        self.push(result)
    }

    fn add_mismatch(&self, a: Value, b: Value) -> Result<(), Interrupt> {
        let (left, right) = (self.heap.type_name(a), self.heap.type_name(b));
        let message = if left != right {
            format!("Mismatched types: {} and {}.", left, right)
        } else {
            format!("Addition not supported for {}.", left)
        };
        fault(ErrorKind::Type, message)
    }
}
