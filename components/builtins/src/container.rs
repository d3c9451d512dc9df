//! Methods shared by lists and dictionaries.

use crate::error::NativeError;
use crate::registry::{self, NativeSpec, SELF};
use core_types::Value;
use memory_manager::{Obj, ParamInfo, TableKey};

/// Methods of the `container` base class
pub const METHODS: &[NativeSpec] = &[
    NativeSpec::new("clear", clear, 1, 1, &[SELF]),
    NativeSpec::new(
        "pop",
        pop,
        1,
        3,
        &[SELF, ParamInfo::optional("key"), ParamInfo::optional("default")],
    ),
    NativeSpec::new("clone", clone, 1, 1, &[SELF]),
];

const NOT_A_CONTAINER: &str = "Container method called on a value that is not a list or dict.";

native! {
    /// Remove every element in place
    fn clear(ctx, args) {
        let Value::Obj(r) = args[0] else {
            return Err(NativeError::type_error(NOT_A_CONTAINER));
        };
        match ctx.heap.get_mut(r) {
            Obj::List(list) => list.values.clear(),
            Obj::Dict(dict) => dict.table.clear(),
            _ => return Err(NativeError::type_error(NOT_A_CONTAINER)),
        }
        Ok(Value::Nil)
    }
}

native! {
    /// `list.pop([index])` or `dict.pop(key[, default])`
    fn pop(ctx, args) {
        let receiver = args[0];
        if ctx.heap.as_list(receiver).is_some() {
            if args.len() > 2 {
                return Err(NativeError::type_error("pop() on a list expects at most one index."));
            }
            let index = match args.get(1) {
                Some(v) => Some(registry::integer(*v, "pop() expects a numeric index.")?),
                None => None,
            };
            let Some(list) = ctx.heap.as_list_mut(receiver) else {
                return Err(NativeError::type_error(NOT_A_CONTAINER));
            };
            if list.values.is_empty() {
                return Ok(Value::Nil);
            }
            let position = match index {
                Some(i) => registry::resolve_index(i, list.values.len())
                    .ok_or_else(|| NativeError::index("pop() index out of range."))?,
                None => list.values.len() - 1,
            };
            return Ok(list.values.remove(position));
        }

        if ctx.heap.as_dict(receiver).is_some() {
            let Some(key) = args.get(1) else {
                return Err(NativeError::type_error("pop() on a dict expects a key."));
            };
            let key = ctx.heap.key(*key)?;
            let default = args.get(2).copied();
            let Some(dict) = ctx.heap.as_dict_mut(receiver) else {
                return Err(NativeError::type_error(NOT_A_CONTAINER));
            };
            return match dict.table.get(key) {
                Some(value) => {
                    dict.table.delete(key);
                    Ok(value)
                }
                None => default.ok_or_else(|| NativeError::index("pop() key not found in dict.")),
            };
        }

        Err(NativeError::type_error(NOT_A_CONTAINER))
    }
}

native! {
    /// Shallow copy
    fn clone(ctx, args) {
        let receiver = args[0];
        if let Some(list) = ctx.heap.as_list(receiver) {
            let values = list.values.clone();
            return Ok(registry::new_list(ctx.heap, values));
        }
        if let Some(dict) = ctx.heap.as_dict(receiver) {
            let entries: Vec<_> = dict.table.entries().cloned().collect();
            let copy = ctx.heap.new_dict();
            if let Obj::Dict(target) = ctx.heap.get_mut(copy) {
                for entry in entries {
                    target.table.set(
                        TableKey::new(entry.key, entry.hash),
                        entry.value,
                    );
                }
            }
            return Ok(Value::Obj(copy));
        }
        Err(NativeError::type_error(NOT_A_CONTAINER))
    }
}
