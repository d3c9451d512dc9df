//! List methods.

use crate::error::NativeError;
use crate::registry::{self, NativeSpec, SELF};
use core_types::Value;
use memory_manager::{Heap, ObjList, ParamInfo};
use std::cmp::Ordering;

const VALUE: &[ParamInfo] = &[SELF, ParamInfo::required("value")];

/// Methods of the `list` class
pub const METHODS: &[NativeSpec] = &[
    NativeSpec::new("append", append, 2, 2, VALUE),
    NativeSpec::new(
        "insert",
        insert,
        3,
        3,
        &[SELF, ParamInfo::required("index"), ParamInfo::required("value")],
    ),
    NativeSpec::new("remove", remove, 2, 2, &[SELF, ParamInfo::required("index")]),
    NativeSpec::new("reverse", reverse, 1, 1, &[SELF]),
    NativeSpec::new("index", index, 2, 2, VALUE),
    NativeSpec::new("count", count, 2, 2, VALUE),
    NativeSpec::new("extend", extend, 2, 2, &[SELF, ParamInfo::required("other")]),
    NativeSpec::new("sort", sort, 1, 1, &[SELF]),
];

fn receiver<'h>(heap: &'h mut Heap, value: Value, method: &str) -> Result<&'h mut ObjList, NativeError> {
    heap.as_list_mut(value)
        .ok_or_else(|| NativeError::type_error(format!("{}() expects a list receiver.", method)))
}

native! {
    fn append(ctx, args) {
        receiver(ctx.heap, args[0], "append")?.values.push(args[1]);
        Ok(Value::Nil)
    }
}

native! {
    /// Insert before `index`; out-of-range indices clamp to the ends
    fn insert(ctx, args) {
        let index = registry::integer(args[1], "insert() expects a numeric index.")?;
        let list = receiver(ctx.heap, args[0], "insert")?;
        let len = list.values.len() as i64;
        let position = if index < 0 { index + len } else { index }.clamp(0, len);
        list.values.insert(position as usize, args[2]);
        Ok(Value::Nil)
    }
}

native! {
    /// Remove the element at `index` and return it
    fn remove(ctx, args) {
        let index = registry::integer(args[1], "remove() expects a numeric index.")?;
        let list = receiver(ctx.heap, args[0], "remove")?;
        let position = registry::resolve_index(index, list.values.len())
            .ok_or_else(|| NativeError::index("remove() index out of range."))?;
        Ok(list.values.remove(position))
    }
}

native! {
    /// A reversed copy
    fn reverse(ctx, args) {
        let mut values = receiver(ctx.heap, args[0], "reverse")?.values.clone();
        values.reverse();
        Ok(registry::new_list(ctx.heap, values))
    }
}

native! {
    /// Position of the first equal element, or nil
    fn index(ctx, args) {
        let values = receiver(ctx.heap, args[0], "index")?.values.clone();
        let heap = &*ctx.heap;
        Ok(values
            .iter()
            .position(|v| heap.values_equal(*v, args[1]))
            .map_or(Value::Nil, |i| Value::Number(i as f64)))
    }
}

native! {
    fn count(ctx, args) {
        let values = receiver(ctx.heap, args[0], "count")?.values.clone();
        let heap = &*ctx.heap;
        let n = values.iter().filter(|v| heap.values_equal(**v, args[1])).count();
        Ok(Value::Number(n as f64))
    }
}

native! {
    /// Append every element of another list
    fn extend(ctx, args) {
        let other = registry::list(ctx.heap, args[1], "extend() expects a list argument.")?;
        receiver(ctx.heap, args[0], "extend")?.values.extend(other);
        Ok(Value::Nil)
    }
}

native! {
    /// Sort in place; elements must be all numbers or all strings
    fn sort(ctx, args) {
        let mut values = receiver(ctx.heap, args[0], "sort")?.values.clone();
        if values.iter().all(Value::is_number) {
            values.sort_by(|a, b| {
                let (x, y) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            });
        } else if values.iter().all(|v| ctx.heap.is_string(*v)) {
            let heap = &*ctx.heap;
            values.sort_by(|a, b| heap.as_str(*a).cmp(&heap.as_str(*b)));
        } else {
            return Err(NativeError::type_error(
                "sort() expects a list of only numbers or only strings.",
            ));
        }
        receiver(ctx.heap, args[0], "sort")?.values = values;
        Ok(Value::Nil)
    }
}
