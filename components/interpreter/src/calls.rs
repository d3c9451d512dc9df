//! Call protocol, method dispatch and property access

use core_types::{ErrorKind, ObjRef, Value};
use memory_manager::{NativeContext, Obj, TableKey};

use crate::call_frame::{CallFrame, STACK_MAX};
use crate::error::{fault, Interrupt};
use crate::vm::Vm;

/// Where a method name resolves for a receiver
enum MethodSource {
    /// An instance field holding a callable
    Field(Value),
    /// A user class's flattened method table
    Class(ObjRef),
    /// A built-in class, searched up its superclass chain
    Builtin(Option<ObjRef>, &'static str),
    /// A module export, called without a receiver
    Export(Option<Value>, ObjRef),
    /// A class invoked directly, e.g. `Point.origin()`
    Static(ObjRef),
}

/// Result of a property lookup, resolved before anything is allocated
enum Property {
    Value(Value),
    Bind(ObjRef),
    Builtin(Option<ObjRef>, &'static str),
    Missing,
}

impl Vm {
    /// Call `callee`, which sits below `argc` arguments on the stack
    pub(crate) fn call_value(&mut self, callee: Value, argc: usize) -> Result<(), Interrupt> {
        if let Value::Obj(r) = callee {
            match self.heap.get(r) {
                Obj::Closure(_) => return self.call_closure(r, argc),
                Obj::Class(_) => return self.construct(r, argc),
                Obj::Native(_) => return self.call_native(r, argc, false),
                Obj::BoundMethod(bound) => {
                    let (receiver, method) = (bound.receiver, bound.method);
                    let slot = self.stack.len() - argc - 1;
                    self.stack[slot] = receiver;
                    return self.call_method(method, argc);
                }
                _ => {}
            }
        }
        fault(
            ErrorKind::Type,
            format!(
                "Can only call functions and classes, not '{}'.",
                self.heap.type_name(callee)
            ),
        )
    }

    /// Push a frame for a closure whose arguments are already on the stack
    pub(crate) fn call_closure(&mut self, closure: ObjRef, argc: usize) -> Result<(), Interrupt> {
        let function = match self.heap.as_closure(closure) {
            Some(closure) => closure.function,
            None => return fault(ErrorKind::Type, "Can only call functions and classes."),
        };
        let arity = self.heap.as_function(function).map_or(0, |f| f.arity as usize);
        if argc != arity {
            return fault(
                ErrorKind::Type,
                format!(
                    "{}() expected {} argument{} but got {}.",
                    self.function_name(function),
                    arity,
                    if arity == 1 { "" } else { "s" },
                    argc
                ),
            );
        }
        if self.frames.is_full() || self.stack.len() >= STACK_MAX {
            return fault(ErrorKind::Runtime, "Stack overflow.");
        }
        let base = self.stack.len() - argc - 1;
        self.frames.push(CallFrame::new(closure, function, base));
        Ok(())
    }

    /// Call a method closure or native with the receiver in the callee slot
    fn call_method(&mut self, method: ObjRef, argc: usize) -> Result<(), Interrupt> {
        match self.heap.get(method) {
            Obj::Native(_) => self.call_native(method, argc, true),
            _ => self.call_closure(method, argc),
        }
    }

    /// Run a native over its argument window and replace the window with the
    /// result.
    ///
    /// Methods see their receiver as the first argument. An error value
    /// returned by the native becomes a fault of the error's kind.
    pub(crate) fn call_native(
        &mut self,
        native: ObjRef,
        argc: usize,
        with_receiver: bool,
    ) -> Result<(), Interrupt> {
        let window = argc + usize::from(with_receiver);
        let function = match self.heap.get(native) {
            Obj::Native(n) => {
                if let Err(message) = n.check_arity(window) {
                    return fault(ErrorKind::Type, message);
                }
                n.function
            }
            _ => return fault(ErrorKind::Type, "Can only call functions and classes."),
        };

        let callee_slot = self.stack.len() - argc - 1;
        let start = self.stack.len() - window;
        let mut ctx = NativeContext {
            heap: &mut self.heap,
            out: &mut *self.out,
            random_state: &mut self.random_state,
            exit_code: None,
        };
        let result = function(&mut ctx, &self.stack[start..]);
        if let Some(code) = ctx.exit_code {
            return Err(Interrupt::Exit(code));
        }
        if let Some(error) = self.heap.as_error(result) {
            return fault(error.kind, error.message.clone());
        }
        self.stack.truncate(callee_slot);
        self.push(result)
    }

    /// Instantiate a class and run its `__init__`, if it has one
    fn construct(&mut self, class: ObjRef, argc: usize) -> Result<(), Interrupt> {
        let instance = self.heap.new_instance(class);
        let slot = self.stack.len() - argc - 1;
        self.stack[slot] = Value::Obj(instance);

        let init = self.heap.string_key(self.heap.init_string());
        let initializer = match self.heap.get(class) {
            Obj::Class(c) => c.methods.get(init),
            _ => None,
        };
        match initializer.and_then(|value| value.as_obj()) {
            Some(method) => self.call_method(method, argc),
            None if argc != 0 => fault(
                ErrorKind::Type,
                format!("Expected 0 arguments but got {}.", argc),
            ),
            None => Ok(()),
        }
    }

    /// Wrap a function constant in a closure, capturing its upvalues
    pub(crate) fn make_closure(&mut self, index: u16) -> Result<(), Interrupt> {
        let Some(function) = self.read_constant(index).as_obj() else {
            return Ok(());
        };
        let descriptors = self
            .heap
            .as_function(function)
            .map(|f| f.upvalues.clone())
            .unwrap_or_default();
        let frame = self.frame();
        let enclosing: Vec<ObjRef> = self
            .heap
            .as_closure(frame.closure)
            .map(|c| c.upvalues.clone())
            .unwrap_or_default();

        let mut upvalues = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let index = descriptor.index as usize;
            if descriptor.is_local {
                upvalues.push(self.capture_upvalue(frame.base + index));
            } else if let Some(&upvalue) = enclosing.get(index) {
                upvalues.push(upvalue);
            }
        }
        let closure = self.heap.new_closure(function, upvalues);
        self.push(Value::Obj(closure))
    }

    // ------------------------------------------------------------------
    // Methods
    // ------------------------------------------------------------------

    /// Look up a method by walking a built-in class and its superclasses
    fn builtin_method(&self, class: Option<ObjRef>, key: TableKey) -> Option<ObjRef> {
        let mut current = class;
        while let Some(class) = current {
            let Obj::Class(c) = self.heap.get(class) else {
                return None;
            };
            if let Some(method) = c.methods.get(key).and_then(|v| v.as_obj()) {
                return Some(method);
            }
            current = c.superclass;
        }
        None
    }

    /// Native property getter of a built-in class chain
    fn builtin_property(&self, class: Option<ObjRef>, key: TableKey) -> Option<ObjRef> {
        let mut current = class;
        while let Some(class) = current {
            let Obj::Class(c) = self.heap.get(class) else {
                return None;
            };
            if let Some(getter) = c.native_properties.get(key).and_then(|v| v.as_obj()) {
                return Some(getter);
            }
            current = c.superclass;
        }
        None
    }

    fn method_source(&self, receiver: Value, key: TableKey) -> Result<MethodSource, Interrupt> {
        let classes = &self.heap.classes;
        let source = match receiver.as_obj().map(|r| (r, self.heap.get(r))) {
            Some((_, Obj::Instance(instance))) => match instance.fields.get(key) {
                Some(field) => MethodSource::Field(field),
                None => MethodSource::Class(instance.class),
            },
            Some((_, Obj::List(list))) => MethodSource::Builtin(list.class.or(classes.list), "list"),
            Some((_, Obj::Dict(dict))) => MethodSource::Builtin(dict.class.or(classes.dict), "dict"),
            Some((_, Obj::String(_))) => MethodSource::Builtin(classes.string, "string"),
            Some((_, Obj::File(_))) => MethodSource::Builtin(classes.file, "file"),
            Some((_, Obj::Module(module))) => {
                MethodSource::Export(module.exports.get(key), module.name)
            }
            Some((class, Obj::Class(_))) => MethodSource::Static(class),
            _ => {
                return fault(
                    ErrorKind::Type,
                    format!(
                        "Only instances and containers have methods, not '{}'.",
                        self.heap.type_name(receiver)
                    ),
                )
            }
        };
        Ok(source)
    }

    /// `receiver.name(args)`, with the receiver below `argc` arguments
    pub(crate) fn invoke(&mut self, key: TableKey, argc: usize) -> Result<(), Interrupt> {
        let receiver = self.peek(argc);
        let slot = self.stack.len() - argc - 1;
        match self.method_source(receiver, key)? {
            MethodSource::Field(field) => {
                self.stack[slot] = field;
                self.call_value(field, argc)
            }
            MethodSource::Class(class) => self.invoke_from_class(class, key, argc),
            MethodSource::Builtin(class, type_name) => match self.builtin_method(class, key) {
                Some(method) => self.call_method(method, argc),
                None => fault(
                    ErrorKind::Attribute,
                    format!(
                        "Undefined method '{}' for {}.",
                        self.key_name(key),
                        type_name
                    ),
                ),
            },
            MethodSource::Export(Some(export), _) => {
                self.stack[slot] = export;
                self.call_value(export, argc)
            }
            MethodSource::Export(None, module) => fault(
                ErrorKind::Attribute,
                format!(
                    "Undefined method '{}' in module '{}'.",
                    self.key_name(key),
                    self.heap.str_of(module)
                ),
            ),
            MethodSource::Static(class) => self.invoke_from_class(class, key, argc),
        }
    }

    /// Call a method found in `class`'s own (flattened) table
    pub(crate) fn invoke_from_class(
        &mut self,
        class: ObjRef,
        key: TableKey,
        argc: usize,
    ) -> Result<(), Interrupt> {
        match self.class_method(class, key) {
            Some(method) => self.call_method(method, argc),
            None => fault(
                ErrorKind::Attribute,
                format!("Undefined method '{}'.", self.key_name(key)),
            ),
        }
    }

    pub(crate) fn expect_class(&self, value: Value) -> Result<ObjRef, Interrupt> {
        match value.as_obj() {
            Some(r) if matches!(self.heap.get(r), Obj::Class(_)) => Ok(r),
            _ => fault(ErrorKind::Type, "Superclass must be a class."),
        }
    }

    fn key_name(&self, key: TableKey) -> String {
        self.heap.as_str(key.value).unwrap_or("?").to_string()
    }

    // ------------------------------------------------------------------
    // Classes and properties
    // ------------------------------------------------------------------

    /// Bind the closure on top of the stack as a method of the class below
    pub(crate) fn define_method(&mut self, name: u16) {
        let key = self.constant_key(name);
        let method = self.peek(0);
        if let Some(class) = self.peek(1).as_obj() {
            if let Obj::Class(c) = self.heap.get_mut(class) {
                c.methods.set(key, method);
            }
        }
        self.pop();
    }

    /// Copy the superclass's methods into the subclass on top of the stack
    pub(crate) fn inherit(&mut self) -> Result<(), Interrupt> {
        let superclass = self.expect_class(self.peek(1))?;
        let subclass = self.expect_class(self.peek(0))?;
        let (methods, properties) = match self.heap.get(superclass) {
            Obj::Class(c) => (c.methods.clone(), c.native_properties.clone()),
            _ => return fault(ErrorKind::Type, "Superclass must be a class."),
        };
        if let Obj::Class(c) = self.heap.get_mut(subclass) {
            methods.add_all(&mut c.methods);
            properties.add_all(&mut c.native_properties);
            c.superclass = Some(superclass);
        }
        self.pop();
        Ok(())
    }

    /// Replace the receiver on top of the stack with the named property
    pub(crate) fn get_property(&mut self, name: u16) -> Result<(), Interrupt> {
        let key = self.constant_key(name);
        let receiver = self.peek(0);
        let Some(r) = receiver.as_obj() else {
            return fault(ErrorKind::Attribute, "Only instances have properties.");
        };
        let classes = &self.heap.classes;
        let found = match self.heap.get(r) {
            Obj::Instance(instance) => match instance.fields.get(key) {
                Some(field) => Property::Value(field),
                None => match self.class_method(instance.class, key) {
                    Some(method) => Property::Bind(method),
                    None => Property::Missing,
                },
            },
            Obj::Enum(e) => e.members.get(key).map_or(Property::Missing, Property::Value),
            Obj::Module(m) => m.exports.get(key).map_or(Property::Missing, Property::Value),
            Obj::Class(c) => c.methods.get(key).map_or(Property::Missing, Property::Value),
            Obj::List(list) => Property::Builtin(list.class.or(classes.list), "list"),
            Obj::Dict(dict) => Property::Builtin(dict.class.or(classes.dict), "dict"),
            Obj::String(_) => Property::Builtin(classes.string, "string"),
            Obj::File(_) => Property::Builtin(classes.file, "file"),
            _ => return fault(ErrorKind::Attribute, "Only instances have properties."),
        };
        match found {
            Property::Value(value) => {
                self.pop();
                self.push(value)
            }
            Property::Bind(method) => {
                let bound = self.heap.new_bound_method(receiver, method);
                self.pop();
                self.push(Value::Obj(bound))
            }
            Property::Builtin(class, type_name) => {
                self.builtin_member(class, receiver, key, type_name)
            }
            Property::Missing => fault(
                ErrorKind::Attribute,
                format!("Undefined property '{}'.", self.constant_name(name)),
            ),
        }
    }

    fn class_method(&self, class: ObjRef, key: TableKey) -> Option<ObjRef> {
        match self.heap.get(class) {
            Obj::Class(c) => c.methods.get(key).and_then(|v| v.as_obj()),
            _ => None,
        }
    }

    /// Property of a built-in receiver: a native getter, else a bound method
    fn builtin_member(
        &mut self,
        class: Option<ObjRef>,
        receiver: Value,
        key: TableKey,
        type_name: &str,
    ) -> Result<(), Interrupt> {
        if let Some(getter) = self.builtin_property(class, key) {
            return self.call_native(getter, 0, true);
        }
        match self.builtin_method(class, key) {
            Some(method) => {
                let bound = self.heap.new_bound_method(receiver, method);
                self.pop();
                self.push(Value::Obj(bound))
            }
            None => fault(
                ErrorKind::Attribute,
                format!(
                    "Undefined property '{}' for {}.",
                    self.key_name(key),
                    type_name
                ),
            ),
        }
    }

    /// `instance.name = value`, leaving the value on the stack
    pub(crate) fn set_property(&mut self, name: u16) -> Result<(), Interrupt> {
        let key = self.constant_key(name);
        let value = self.peek(0);
        let target = self.peek(1);
        match target.as_obj().map(|r| self.heap.get_mut(r)) {
            Some(Obj::Instance(instance)) => {
                instance.fields.set(key, value);
            }
            _ => return fault(ErrorKind::Attribute, "Only instances have fields."),
        }
        self.pop();
        self.pop();
        self.push(value)
    }

    /// `super.name`: bind the superclass's method to the receiver
    pub(crate) fn get_super(&mut self, name: u16) -> Result<(), Interrupt> {
        let key = self.constant_key(name);
        let superclass = self.pop();
        let superclass = self.expect_class(superclass)?;
        let Some(method) = self.class_method(superclass, key) else {
            return fault(
                ErrorKind::Attribute,
                format!("Undefined property '{}'.", self.constant_name(name)),
            );
        };
        let receiver = self.pop();
        let bound = self.heap.new_bound_method(receiver, method);
        self.push(Value::Obj(bound))
    }
}
