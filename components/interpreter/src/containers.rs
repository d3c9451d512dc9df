//! Container literals, indexing, slicing and the remaining
//! statement-level instructions

use core_types::{ErrorKind, Value};
use memory_manager::Obj;

use crate::error::{fault, Interrupt};
use crate::vm::Vm;

/// Resolve a possibly negative index against `len`
fn resolve_index(index: f64, len: usize) -> Option<usize> {
    if index.fract() != 0.0 {
        return None;
    }
    let resolved = if index < 0.0 { len as f64 + index } else { index };
    if resolved < 0.0 || resolved >= len as f64 {
        return None;
    }
    Some(resolved as usize)
}

/// Clamp optional slice bounds to `0..=len`, counting negatives from the end
fn slice_bounds(start: Option<f64>, end: Option<f64>, len: usize) -> (usize, usize) {
    let clamp = |bound: f64| {
        let bound = if bound < 0.0 { len as f64 + bound } else { bound };
        bound.clamp(0.0, len as f64) as usize
    };
    let start = start.map_or(0, clamp);
    let end = end.map_or(len, clamp);
    (start, end.max(start))
}

impl Vm {
    /// `[a, b, c]`
    pub(crate) fn build_list(&mut self, count: usize) -> Result<(), Interrupt> {
        let values = self.pop_many(count);
        let list = self.heap.new_list(values);
        self.push(Value::Obj(list))
    }

    /// `{k: v, ...}`; keys must be hashable
    pub(crate) fn build_dict(&mut self, count: usize) -> Result<(), Interrupt> {
        let values = self.pop_many(count * 2);
        let dict = self.heap.new_dict();
        for pair in values.chunks_exact(2) {
            let key = self.heap.key(pair[0])?;
            if let Some(dict) = self.heap.as_dict_mut(Value::Obj(dict)) {
                dict.table.set(key, pair[1]);
            }
        }
        self.push(Value::Obj(dict))
    }

    /// `container[index]`
    pub(crate) fn get_index(&mut self) -> Result<(), Interrupt> {
        let index = self.peek(0);
        let container = self.peek(1);
        let value = match container.as_obj().map(|r| self.heap.get(r)) {
            Some(Obj::List(list)) => {
                let Value::Number(n) = index else {
                    return fault(ErrorKind::Type, "Index must be a number.");
                };
                match resolve_index(n, list.values.len()) {
                    Some(i) => list.values[i],
                    None => return fault(ErrorKind::Index, "Index out of bounds."),
                }
            }
            Some(Obj::String(s)) => {
                let Value::Number(n) = index else {
                    return fault(ErrorKind::Type, "Index must be a number.");
                };
                let Some(i) = resolve_index(n, s.chars.len()) else {
                    return fault(ErrorKind::Index, "Index out of bounds.");
                };
                let byte = String::from_utf8_lossy(&s.chars.as_bytes()[i..=i]).into_owned();
                Value::Obj(self.heap.intern_owned(byte))
            }
            Some(Obj::Dict(dict)) => {
                let key = self.heap.key(index)?;
                match dict.table.get(key) {
                    Some(value) => value,
                    None => return fault(ErrorKind::Index, "Key not found in dictionary."),
                }
            }
            _ => {
                return fault(
                    ErrorKind::Type,
                    format!("Cannot index into '{}'.", self.heap.type_name(container)),
                )
            }
        };
        self.pop();
        self.pop();
        self.push(value)
    }

    /// `container[index] = value`, leaving the value on the stack
    pub(crate) fn set_index(&mut self) -> Result<(), Interrupt> {
        let value = self.peek(0);
        let index = self.peek(1);
        let container = self.peek(2);
        let key = match container.as_obj().map(|r| self.heap.get(r)) {
            Some(Obj::Dict(_)) => Some(self.heap.key(index)?),
            _ => None,
        };
        match container.as_obj().map(|r| self.heap.get_mut(r)) {
            Some(Obj::List(list)) => {
                let Value::Number(n) = index else {
                    return fault(ErrorKind::Type, "Index must be a number.");
                };
                match resolve_index(n, list.values.len()) {
                    Some(i) => list.values[i] = value,
                    None => return fault(ErrorKind::Index, "Index out of bounds."),
                }
            }
            Some(Obj::Dict(dict)) => {
                if let Some(key) = key {
                    dict.table.set(key, value);
                }
            }
            _ => {
                return fault(
                    ErrorKind::Type,
                    format!(
                        "Cannot assign by index into '{}'.",
                        self.heap.type_name(container)
                    ),
                )
            }
        }
        self.stack.truncate(self.stack.len() - 3);
        self.push(value)
    }

    /// `container[start:end]` on lists and strings
    pub(crate) fn slice(&mut self) -> Result<(), Interrupt> {
        let bound = |value: Value| -> Result<Option<f64>, Interrupt> {
            match value {
                Value::Nil => Ok(None),
                Value::Number(n) => Ok(Some(n.trunc())),
                _ => fault(ErrorKind::Type, "Slice bounds must be numbers."),
            }
        };
        let end = bound(self.peek(0))?;
        let start = bound(self.peek(1))?;
        let container = self.peek(2);

        let result = match container.as_obj().map(|r| self.heap.get(r)) {
            Some(Obj::List(list)) => {
                let (from, to) = slice_bounds(start, end, list.values.len());
                let values = list.values[from..to].to_vec();
                Value::Obj(self.heap.new_list(values))
            }
            Some(Obj::String(s)) => {
                let (from, to) = slice_bounds(start, end, s.chars.len());
                let piece = String::from_utf8_lossy(&s.chars.as_bytes()[from..to]).into_owned();
                Value::Obj(self.heap.intern_owned(piece))
            }
            _ => {
                return fault(
                    ErrorKind::Type,
                    format!("Cannot slice '{}'.", self.heap.type_name(container)),
                )
            }
        };
        self.stack.truncate(self.stack.len() - 3);
        self.push(result)
    }

    /// `container has item`, or `has not` when `negate` is set
    pub(crate) fn membership(&mut self, negate: bool) -> Result<(), Interrupt> {
        let item = self.peek(0);
        let container = self.peek(1);
        let found = match container.as_obj().map(|r| self.heap.get(r)) {
            Some(Obj::List(list)) => list
                .values
                .iter()
                .any(|value| self.heap.values_equal(*value, item)),
            Some(Obj::String(s)) => match self.heap.as_str(item) {
                Some(needle) => s.chars.contains(needle),
                None => return fault(ErrorKind::Type, "Can only check for strings in strings."),
            },
            Some(Obj::Dict(dict)) => {
                let key = self.heap.key(item)?;
                dict.table.contains(key)
            }
            _ => {
                return fault(
                    ErrorKind::Type,
                    format!(
                        "Cannot check membership in '{}'.",
                        self.heap.type_name(container)
                    ),
                )
            }
        };
        self.pop();
        self.pop();
        self.push(Value::Bool(found != negate))
    }

    /// Length of the list, string or dict on top of the stack
    pub(crate) fn length(&mut self) -> Result<(), Interrupt> {
        let value = self.peek(0);
        let len = match value.as_obj().map(|r| self.heap.get(r)) {
            Some(Obj::List(list)) => list.values.len(),
            Some(Obj::String(s)) => s.chars.len(),
            Some(Obj::Dict(dict)) => dict.table.len(),
            _ => {
                return fault(
                    ErrorKind::Type,
                    format!("Object of type '{}' has no length.", self.heap.type_name(value)),
                )
            }
        };
        self.pop();
        self.push(Value::Number(len as f64))
    }

    /// `enum Name { ... }` from `count` (member, ordinal) pairs
    pub(crate) fn build_enum(&mut self, name: u16, count: usize) -> Result<(), Interrupt> {
        let name = self.constant_ref(name);
        let pairs = self.pop_many(count * 2);
        let enumeration = self.heap.new_enum(name);
        for pair in pairs.chunks_exact(2) {
            let key = self.heap.key(pair[0])?;
            if let Obj::Enum(e) = self.heap.get_mut(enumeration) {
                e.members.set(key, pair[1]);
            }
        }
        self.push(Value::Obj(enumeration))
    }

    /// `import name [as alias];`
    ///
    /// Modules are loaded once per engine. The plain form binds the
    /// module's own name; the aliased form binds only the alias.
    pub(crate) fn import(&mut self, module: u16, alias: Option<u16>) -> Result<(), Interrupt> {
        let key = self.constant_key(module);
        let module_value = match self.modules.get(key) {
            Some(loaded) => loaded,
            None => {
                let name = self.constant_name(module);
                let Some(loaded) = builtins::load_module(&mut self.heap, &name) else {
                    return fault(
                        ErrorKind::Import,
                        format!("Failed to import module '{}'.", name),
                    );
                };
                self.modules.set(key, Value::Obj(loaded));
                Value::Obj(loaded)
            }
        };
        let binding = match alias {
            Some(alias) => self.constant_key(alias),
            None => key,
        };
        self.globals.set(binding, module_value);
        Ok(())
    }

    /// Concatenate the display strings of the top `count` values
    pub(crate) fn interpolate(&mut self, count: usize) -> Result<(), Interrupt> {
        let parts = self.pop_many(count);
        let joined: String = parts.iter().map(|part| self.heap.display(*part)).collect();
        let string = self.heap.intern_owned(joined);
        self.push(Value::Obj(string))
    }

    /// `assert cond [, message];`
    pub(crate) fn assert(&mut self, has_message: bool) -> Result<(), Interrupt> {
        let message = if has_message { Some(self.pop()) } else { None };
        let condition = self.pop();
        if !condition.is_falsey() {
            return Ok(());
        }
        let message = match message {
            Some(message) => self.heap.display(message),
            None => "Assertion failed.".to_string(),
        };
        fault(ErrorKind::Assertion, message)
    }
}
