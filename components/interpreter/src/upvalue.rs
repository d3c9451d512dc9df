//! Upvalue capture and closing
//!
//! A captured local stays on the operand stack while its frame is active;
//! the upvalue records the absolute slot. When the slot goes out of scope
//! the current value is copied into the upvalue, which then owns it.
//!
//! The open list holds at most one upvalue per slot, so closures created in
//! the same call that capture the same variable share a single upvalue.

use core_types::{ObjRef, Value};
use memory_manager::{Obj, ObjUpvalue};

use crate::vm::Vm;

impl Vm {
    /// Slot of an open upvalue; closed upvalues never sit in the open list
    fn open_slot(&self, upvalue: ObjRef) -> Option<usize> {
        match self.heap.get(upvalue) {
            Obj::Upvalue(ObjUpvalue::Open(slot)) => Some(*slot),
            _ => None,
        }
    }

    /// Find or create the open upvalue for a stack slot
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> ObjRef {
        let mut index = self.open_upvalues.len();
        while index > 0 {
            let candidate = self.open_upvalues[index - 1];
            match self.open_slot(candidate) {
                Some(open) if open == slot => return candidate,
                Some(open) if open < slot => break,
                _ => index -= 1,
            }
        }
        let created = self.heap.new_upvalue(slot);
        self.open_upvalues.insert(index, created);
        created
    }

    /// Close every open upvalue at or above `boundary`
    pub(crate) fn close_upvalues(&mut self, boundary: usize) {
        while let Some(&upvalue) = self.open_upvalues.last() {
            let Some(slot) = self.open_slot(upvalue) else {
                self.open_upvalues.pop();
                continue;
            };
            if slot < boundary {
                break;
            }
            let value = self.stack.get(slot).copied().unwrap_or(Value::Nil);
            *self.heap.get_mut(upvalue) = Obj::Upvalue(ObjUpvalue::Closed(value));
            self.open_upvalues.pop();
        }
    }

    /// Current value of the upvalue at `index` of the running closure
    pub(crate) fn read_upvalue(&self, closure: ObjRef, index: usize) -> Value {
        let Some(upvalue) = self.closure_upvalue(closure, index) else {
            return Value::Nil;
        };
        match self.heap.get(upvalue) {
            Obj::Upvalue(ObjUpvalue::Open(slot)) => {
                self.stack.get(*slot).copied().unwrap_or(Value::Nil)
            }
            Obj::Upvalue(ObjUpvalue::Closed(value)) => *value,
            _ => Value::Nil,
        }
    }

    /// Assign through the upvalue at `index` of the running closure
    pub(crate) fn write_upvalue(&mut self, closure: ObjRef, index: usize, value: Value) {
        let Some(upvalue) = self.closure_upvalue(closure, index) else {
            return;
        };
        match self.heap.get_mut(upvalue) {
            Obj::Upvalue(ObjUpvalue::Open(slot)) => {
                let slot = *slot;
                if let Some(target) = self.stack.get_mut(slot) {
                    *target = value;
                }
            }
            Obj::Upvalue(ObjUpvalue::Closed(stored)) => *stored = value,
            _ => {}
        }
    }

    fn closure_upvalue(&self, closure: ObjRef, index: usize) -> Option<ObjRef> {
        self.heap
            .as_closure(closure)
            .and_then(|closure| closure.upvalues.get(index))
            .copied()
    }

    /// Number of upvalues still pointing into the stack
    pub fn open_upvalue_count(&self) -> usize {
        self.open_upvalues.len()
    }
}
