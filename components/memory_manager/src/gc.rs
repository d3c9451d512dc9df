//! Tracing mark-sweep collector.
//!
//! A cycle is driven by the owner of the external roots:
//!
//! 1. mark external roots with [`Heap::mark_value`], [`Heap::mark_object`]
//!    and [`Heap::mark_table`];
//! 2. call [`Heap::collect_garbage`], which marks the heap's own roots,
//!    traces the gray worklist, drops unreached strings from the intern
//!    table and sweeps.
//!
//! Marking sets an object's bit to the current polarity. The polarity
//! flips after every sweep, so survivors read as unmarked at the start of
//! the next cycle without a pass to clear them.

use crate::heap::{Heap, Slot};
use crate::object::{Obj, ObjUpvalue};
use crate::table::Table;
use core_types::{ObjRef, Value};

/// Outcome of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcReport {
    /// Bytes charged before the cycle
    pub bytes_before: usize,
    /// Bytes charged after the cycle
    pub bytes_after: usize,
    /// Objects freed
    pub freed_objects: usize,
    /// New collection threshold
    pub next_gc: usize,
}

/// Mark one value, queueing it for tracing when it has children.
fn mark_in(
    objects: &[Option<Slot>],
    marks: &mut Vec<bool>,
    gray: &mut Vec<ObjRef>,
    polarity: bool,
    value: Value,
) {
    if let Value::Obj(r) = value {
        mark_ref_in(objects, marks, gray, polarity, r);
    }
}

fn mark_ref_in(
    objects: &[Option<Slot>],
    marks: &mut Vec<bool>,
    gray: &mut Vec<ObjRef>,
    polarity: bool,
    r: ObjRef,
) {
    let index = r.index();
    let Some(Some(slot)) = objects.get(index) else {
        return;
    };
    if marks[index] == polarity {
        return;
    }
    marks[index] = polarity;
    if !slot.obj.is_leaf() {
        gray.push(r);
    }
}

fn mark_table_in(
    objects: &[Option<Slot>],
    marks: &mut Vec<bool>,
    gray: &mut Vec<ObjRef>,
    polarity: bool,
    table: &Table,
) {
    for (key, value) in table.iter() {
        mark_in(objects, marks, gray, polarity, key);
        mark_in(objects, marks, gray, polarity, value);
    }
}

impl Heap {
    /// Mark a root value
    pub fn mark_value(&mut self, value: Value) {
        mark_in(&self.objects, &mut self.marks, &mut self.gray, self.mark_value, value);
    }

    /// Mark a root object
    pub fn mark_object(&mut self, r: ObjRef) {
        mark_ref_in(&self.objects, &mut self.marks, &mut self.gray, self.mark_value, r);
    }

    /// Mark every key and value of a table owned outside the heap
    pub fn mark_table(&mut self, table: &Table) {
        mark_table_in(&self.objects, &mut self.marks, &mut self.gray, self.mark_value, table);
    }

    /// Returns true if the object was reached in the current cycle
    pub fn is_marked(&self, r: ObjRef) -> bool {
        self.marks.get(r.index()).copied() == Some(self.mark_value)
    }

    fn mark_heap_roots(&mut self) {
        let init = self.init_string();
        self.mark_object(init);
        let classes: Vec<ObjRef> = self.classes.iter().collect();
        for class in classes {
            self.mark_object(class);
        }
        let Heap {
            objects,
            marks,
            gray,
            extra_roots,
            mark_value,
            ..
        } = self;
        for value in extra_roots.iter() {
            mark_in(objects, marks, gray, *mark_value, *value);
        }
    }

    /// Pop the gray worklist until empty, marking each object's children
    fn trace_references(&mut self) {
        let Heap {
            objects,
            marks,
            gray,
            mark_value,
            ..
        } = self;
        let objects: &[Option<Slot>] = objects;
        let polarity = *mark_value;
        let value = |v: Value, marks: &mut Vec<bool>, gray: &mut Vec<ObjRef>| {
            mark_in(objects, marks, gray, polarity, v)
        };
        while let Some(r) = gray.pop() {
            let Some(Some(slot)) = objects.get(r.index()) else {
                continue;
            };
            match &slot.obj {
                Obj::BoundMethod(bound) => {
                    value(bound.receiver, marks, gray);
                    value(Value::Obj(bound.method), marks, gray);
                }
                Obj::Class(class) => {
                    value(Value::Obj(class.name), marks, gray);
                    if let Some(superclass) = class.superclass {
                        value(Value::Obj(superclass), marks, gray);
                    }
                    mark_table_in(objects, marks, gray, polarity, &class.methods);
                    mark_table_in(objects, marks, gray, polarity, &class.native_properties);
                }
                Obj::Closure(closure) => {
                    value(Value::Obj(closure.function), marks, gray);
                    for upvalue in &closure.upvalues {
                        value(Value::Obj(*upvalue), marks, gray);
                    }
                }
                Obj::Instance(instance) => {
                    value(Value::Obj(instance.class), marks, gray);
                    mark_table_in(objects, marks, gray, polarity, &instance.fields);
                }
                Obj::Function(function) => {
                    if let Some(name) = function.name {
                        value(Value::Obj(name), marks, gray);
                    }
                    if let Some(file) = function.file {
                        value(Value::Obj(file), marks, gray);
                    }
                    for constant in &function.chunk.constants {
                        value(*constant, marks, gray);
                    }
                }
                Obj::Upvalue(ObjUpvalue::Closed(closed)) => value(*closed, marks, gray),
                Obj::Upvalue(ObjUpvalue::Open(_)) => {}
                Obj::List(list) => {
                    if let Some(class) = list.class {
                        value(Value::Obj(class), marks, gray);
                    }
                    for item in &list.values {
                        value(*item, marks, gray);
                    }
                }
                Obj::Dict(dict) => {
                    if let Some(class) = dict.class {
                        value(Value::Obj(class), marks, gray);
                    }
                    mark_table_in(objects, marks, gray, polarity, &dict.table);
                }
                Obj::Module(module) => {
                    value(Value::Obj(module.name), marks, gray);
                    mark_table_in(objects, marks, gray, polarity, &module.exports);
                }
                Obj::Enum(enumeration) => {
                    value(Value::Obj(enumeration.name), marks, gray);
                    mark_table_in(objects, marks, gray, polarity, &enumeration.members);
                }
                Obj::File(file) => value(Value::Obj(file.path), marks, gray),
                Obj::String(_) | Obj::Native(_) | Obj::Error(_) => {}
            }
        }
    }

    /// Free every unreached object except natives. Returns the count freed.
    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for index in 0..self.objects.len() {
            let reached = self.marks[index] == self.mark_value;
            let slot = &mut self.objects[index];
            let keep = match slot {
                None => continue,
                Some(Slot {
                    obj: Obj::Native(_),
                    ..
                }) => true,
                Some(_) => reached,
            };
            if keep {
                continue;
            }
            if let Some(dead) = slot.take() {
                if let Obj::File(file) = &dead.obj {
                    if !file.is_closed() {
                        log::debug!("closing unreachable file #{}", index);
                    }
                }
                self.bytes_allocated = self.bytes_allocated.saturating_sub(dead.size);
                self.free_slots.push(index);
                freed += 1;
            }
        }
        freed
    }

    /// Re-measure survivors, which may have grown since allocation
    fn remeasure(&mut self) {
        let mut total = 0;
        for slot in self.objects.iter_mut().flatten() {
            slot.size = slot.obj.size_estimate();
            total += slot.size;
        }
        self.bytes_allocated = total;
        self.touched.clear();
    }

    /// Run the rest of a collection cycle after external roots are marked.
    pub fn collect_garbage(&mut self) -> GcReport {
        let bytes_before = self.bytes_allocated;
        log::debug!("gc begin: {} bytes allocated", bytes_before);

        self.mark_heap_roots();
        self.trace_references();

        let Heap {
            strings,
            marks,
            mark_value,
            ..
        } = self;
        let polarity = *mark_value;
        strings.retain_keys(|r| marks.get(r.index()).copied() == Some(polarity));

        let freed_objects = self.sweep();
        self.remeasure();

        self.next_gc = self.bytes_allocated.saturating_mul(self.growth_factor);
        self.mark_value = !self.mark_value;
        self.collections += 1;
        self.collect_requested = false;
        self.allocated_since_collect = false;

        let report = GcReport {
            bytes_before,
            bytes_after: self.bytes_allocated,
            freed_objects,
            next_gc: self.next_gc,
        };
        log::debug!(
            "gc end: collected {} bytes ({} -> {}), freed {} objects, next at {}",
            bytes_before.saturating_sub(report.bytes_after),
            bytes_before,
            report.bytes_after,
            freed_objects,
            report.next_gc
        );
        report
    }
}
