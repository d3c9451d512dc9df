//! Dictionary methods.

use crate::error::NativeError;
use crate::registry::{self, NativeSpec, SELF};
use core_types::Value;
use memory_manager::{Entry, ParamInfo, TableKey};

/// Methods of the `dict` class
pub const METHODS: &[NativeSpec] = &[
    NativeSpec::new("keys", keys, 1, 1, &[SELF]),
    NativeSpec::new("values", values, 1, 1, &[SELF]),
    NativeSpec::new(
        "get",
        get,
        2,
        3,
        &[SELF, ParamInfo::required("key"), ParamInfo::optional("default")],
    ),
    NativeSpec::new("update", update, 2, 2, &[SELF, ParamInfo::required("other")]),
    NativeSpec::new("items", items, 1, 1, &[SELF]),
];

fn entries(heap: &memory_manager::Heap, value: Value, method: &str) -> Result<Vec<Entry>, NativeError> {
    heap.as_dict(value)
        .map(|dict| dict.table.entries().copied().collect())
        .ok_or_else(|| NativeError::type_error(format!("{}() expects a dict receiver.", method)))
}

native! {
    fn keys(ctx, args) {
        let keys = entries(ctx.heap, args[0], "keys")?.iter().map(|e| e.key).collect();
        Ok(registry::new_list(ctx.heap, keys))
    }
}

native! {
    fn values(ctx, args) {
        let values = entries(ctx.heap, args[0], "values")?.iter().map(|e| e.value).collect();
        Ok(registry::new_list(ctx.heap, values))
    }
}

native! {
    /// Look up `key`, falling back to `default` (nil when omitted)
    fn get(ctx, args) {
        let key = ctx.heap.key(args[1])?;
        let dict = ctx
            .heap
            .as_dict(args[0])
            .ok_or_else(|| NativeError::type_error("get() expects a dict receiver."))?;
        Ok(dict
            .table
            .get(key)
            .unwrap_or_else(|| args.get(2).copied().unwrap_or(Value::Nil)))
    }
}

native! {
    /// Copy every entry of `other` into the receiver
    fn update(ctx, args) {
        let other = ctx
            .heap
            .as_dict(args[1])
            .map(|dict| dict.table.clone())
            .ok_or_else(|| NativeError::type_error("update() expects a dict argument."))?;
        let dict = ctx
            .heap
            .as_dict_mut(args[0])
            .ok_or_else(|| NativeError::type_error("update() expects a dict receiver."))?;
        other.add_all(&mut dict.table);
        Ok(args[0])
    }
}

native! {
    /// `[key, value]` pairs as a list of lists
    fn items(ctx, args) {
        let pairs = entries(ctx.heap, args[0], "items")?;
        let mut items = Vec::with_capacity(pairs.len());
        for entry in pairs {
            items.push(registry::new_list(ctx.heap, vec![entry.key, entry.value]));
        }
        Ok(registry::new_list(ctx.heap, items))
    }
}

/// Insert `key: value` into a dict value; used by tests and the json loader
pub(crate) fn insert(heap: &mut memory_manager::Heap, dict: Value, key: Value, value: Value) -> Result<(), NativeError> {
    let key: TableKey = heap.key(key)?;
    let dict = heap
        .as_dict_mut(dict)
        .ok_or_else(|| NativeError::type_error("Expected a dict."))?;
    dict.table.set(key, value);
    Ok(())
}
