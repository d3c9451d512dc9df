//! Virtual machine for bytecode execution
//!
//! [`Vm`] owns every piece of mutable runtime state: the heap, the operand
//! stack, the frame stack and the globals table. Each [`Vm::interpret`]
//! call compiles one source text and runs it against that state, so globals
//! survive from one call to the next (which is what the REPL relies on).

use arrayvec::ArrayVec;
use bytecode_system::disassemble_chunk;
use core_types::{ObjRef, SloError, StackFrame, Value};
use memory_manager::{Heap, Obj, Table, DEFAULT_GC_GROWTH_FACTOR, DEFAULT_GC_THRESHOLD};
use parser::CompileErrors;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::call_frame::{CallFrame, FRAMES_MAX};
use crate::error::{InterpretError, InterpretResult, Interrupt};

/// Label used in stack traces for top-level code
pub const SCRIPT_NAME: &str = "<script>";

/// Tunables for one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Bytes allocated before the first collection
    pub initial_gc_threshold: usize,
    /// The next threshold is the surviving bytes times this factor
    pub gc_growth_factor: usize,
    /// Collect at every instruction boundary that follows an allocation
    pub stress_gc: bool,
    /// Log every executed instruction at trace level
    pub trace_execution: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            initial_gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_growth_factor: DEFAULT_GC_GROWTH_FACTOR,
            stress_gc: false,
            trace_execution: false,
        }
    }
}

/// Virtual machine for executing slo bytecode
///
/// # Example
///
/// ```
/// use interpreter::{SharedBuffer, Vm};
///
/// let out = SharedBuffer::new();
/// let mut vm = Vm::new().with_output(Box::new(out.clone()));
/// vm.interpret("var x = 1; func f() { x = x + 1; return x; }", "main.slo").unwrap();
/// vm.interpret("println(f()); println(f());", "main.slo").unwrap();
/// assert_eq!(out.contents(), "2\n3\n");
/// ```
pub struct Vm {
    pub(crate) heap: Heap,
    /// Operand stack shared by every frame
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: ArrayVec<CallFrame, FRAMES_MAX>,
    pub(crate) globals: Table,
    /// Names bound with `final`, each mapped to `true`
    pub(crate) finals: Table,
    /// Imported modules keyed by their canonical name
    pub(crate) modules: Table,
    /// Upvalues still pointing into the stack, ordered by ascending slot
    pub(crate) open_upvalues: Vec<ObjRef>,
    pub(crate) out: Box<dyn Write>,
    pub(crate) random_state: u64,
    pub(crate) config: VmConfig,
    /// Source text of every file label interpreted so far, for fault excerpts
    sources: HashMap<String, String>,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("stack_depth", &self.stack.len())
            .field("frames", &self.frames.len())
            .field("globals", &self.globals.len())
            .field("open_upvalues", &self.open_upvalues.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Create an engine with the default configuration, printing to stdout
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    /// Create an engine with explicit collector and tracing settings
    pub fn with_config(config: VmConfig) -> Self {
        let mut heap = Heap::with_gc_settings(config.initial_gc_threshold, config.gc_growth_factor);
        heap.set_stress(config.stress_gc);
        builtins::register_classes(&mut heap);
        let mut globals = Table::new();
        builtins::define_globals(&mut heap, &mut globals);
        log::debug!(
            "vm ready: {} globals, gc threshold {} bytes",
            globals.len(),
            config.initial_gc_threshold
        );

        Self {
            heap,
            stack: Vec::with_capacity(256),
            frames: ArrayVec::new(),
            globals,
            finals: Table::new(),
            modules: Table::new(),
            open_upvalues: Vec::new(),
            out: Box::new(io::stdout()),
            random_state: initial_seed(),
            config,
            sources: HashMap::new(),
        }
    }

    /// Redirect `print` and `println`
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// The active configuration
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Compile `source` and run it to completion.
    ///
    /// On a fault the operand and frame stacks are emptied; globals defined
    /// before the fault remain bound.
    pub fn interpret(&mut self, source: &str, file: &str) -> InterpretResult {
        self.sources.insert(file.to_string(), source.to_string());
        let function = parser::compile(&mut self.heap, source, file)?;

        self.stack.push(Value::Obj(function));
        let closure = self.heap.new_closure(function, Vec::new());
        self.stack.pop();
        self.stack.push(Value::Obj(closure));

        let outcome = self
            .call_closure(closure, 0)
            .and_then(|()| self.run());
        let flushed = self.out.flush();

        match outcome {
            Ok(()) => {
                if let Err(error) = flushed {
                    log::warn!("failed to flush output: {}", error);
                }
                Ok(())
            }
            Err(Interrupt::Fault(error)) => {
                let error = self.locate(error);
                log::debug!("runtime fault: {}", error);
                self.reset_stack();
                Err(InterpretError::Runtime(error))
            }
            Err(Interrupt::Exit(code)) => {
                log::debug!("script exited with status {}", code);
                self.reset_stack();
                Err(InterpretError::Exit(code))
            }
        }
    }

    /// Compile `source` and list the bytecode of the script and every
    /// function nested in it
    pub fn disassemble(&mut self, source: &str, file: &str) -> Result<String, CompileErrors> {
        let script = parser::compile(&mut self.heap, source, file)?;
        let heap = &self.heap;
        let render = |value: Value| match heap.as_str(value) {
            Some(text) => format!("'{}'", text),
            None => heap.display(value),
        };

        let mut listing = String::new();
        let mut pending = vec![script];
        while let Some(function) = pending.pop() {
            let Some(f) = heap.as_function(function) else {
                continue;
            };
            let name = f.name.map_or(SCRIPT_NAME, |name| heap.str_of(name));
            listing.push_str(&disassemble_chunk(&f.chunk, name, &render));
            for constant in f.chunk.constants.iter().rev() {
                if let Some(nested) = constant.as_obj().filter(|r| heap.as_function(*r).is_some()) {
                    pending.push(nested);
                }
            }
        }
        Ok(listing)
    }

    /// Look up a global by name
    pub fn global(&mut self, name: &str) -> Option<Value> {
        let key = self.heap.name_key(name);
        self.globals.get(key)
    }

    /// Bind a global, replacing any previous binding
    pub fn set_global(&mut self, name: &str, value: Value) {
        let key = self.heap.name_key(name);
        self.globals.set(key, value);
    }

    /// The display string `print` would show for `value`
    pub fn display(&self, value: Value) -> String {
        self.heap.display(value)
    }

    /// The engine's heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the engine's heap
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Number of values on the operand stack
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of active call frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    /// Attach the faulting position, source excerpt and call stack
    pub(crate) fn locate(&self, mut error: SloError) -> SloError {
        let mut trace = Vec::with_capacity(self.frames.len());
        for frame in self.frames.iter().rev() {
            let Some(function) = self.heap.as_function(frame.function) else {
                continue;
            };
            let position = function.chunk.position(frame.current_instruction());
            trace.push(StackFrame {
                function_name: function
                    .name
                    .map_or(SCRIPT_NAME, |name| self.heap.str_of(name))
                    .to_string(),
                file: function
                    .file
                    .map_or(SCRIPT_NAME, |file| self.heap.str_of(file))
                    .to_string(),
                line: position.line,
                column: position.column,
            });
        }

        if let Some(innermost) = trace.first() {
            let position = core_types::SourcePosition::new(innermost.line, innermost.column);
            let line = self
                .sources
                .get(&innermost.file)
                .zip(innermost.line.checked_sub(1))
                .and_then(|(source, index)| source.lines().nth(index as usize));
            if let Some(text) = line {
                error = error.with_source_line(text);
            }
            error = error.with_file(innermost.file.clone()).with_position(position);
        }
        error.with_stack(trace)
    }

    /// The function a frame is executing, for name lookups in messages
    pub(crate) fn function_name(&self, function: ObjRef) -> &str {
        match self.heap.get(function) {
            Obj::Function(f) => f.name.map_or(SCRIPT_NAME, |name| self.heap.str_of(name)),
            _ => SCRIPT_NAME,
        }
    }
}

/// A nonzero seed for the `random` module, varied per process
fn initial_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0);
    (builtins::random::DEFAULT_SEED ^ nanos).max(1)
}
