//! GC integration for the execution engine
//!
//! The heap marks its own roots (the `__init__` string, the built-in
//! classes and any extra roots pushed by the compiler). The engine marks
//! everything it holds before handing over to the heap's trace and sweep:
//! the operand stack, each frame's closure, the open upvalues, the globals
//! and the module memo.
//!
//! Collections only happen at instruction boundaries, so values held in
//! Rust locals while one instruction executes are never swept.

use memory_manager::{GcReport, HeapStats};

use crate::vm::Vm;

impl Vm {
    /// Run a full collection cycle now
    pub fn collect_garbage(&mut self) -> GcReport {
        self.mark_roots();
        self.heap.collect_garbage()
    }

    /// Allocation counters and completed cycle count
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Collect if allocation pressure, stress mode or `gc()` asks for it
    pub(crate) fn collect_if_needed(&mut self) {
        self.heap.account_growth();
        if self.heap.should_collect() {
            self.collect_garbage();
        }
    }

    fn mark_roots(&mut self) {
        for value in &self.stack {
            self.heap.mark_value(*value);
        }
        for frame in &self.frames {
            self.heap.mark_object(frame.closure);
        }
        for upvalue in &self.open_upvalues {
            self.heap.mark_object(*upvalue);
        }
        self.heap.mark_table(&self.globals);
        self.heap.mark_table(&self.finals);
        self.heap.mark_table(&self.modules);
    }
}
