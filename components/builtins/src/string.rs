//! String methods.
//!
//! Strings are byte sequences as far as positions go: `find`, `index` and
//! `count` report byte offsets, and case conversion only touches ASCII.

use crate::error::NativeError;
use crate::registry::{self, NativeSpec, SELF};
use core_types::Value;
use memory_manager::{Heap, ParamInfo};

const SUB: &[ParamInfo] = &[SELF, ParamInfo::required("sub")];

/// Methods of the `string` class
pub const METHODS: &[NativeSpec] = &[
    NativeSpec::new("upper", upper, 1, 1, &[SELF]),
    NativeSpec::new("lower", lower, 1, 1, &[SELF]),
    NativeSpec::new("title", title, 1, 1, &[SELF]),
    NativeSpec::new("split", split, 2, 2, &[SELF, ParamInfo::required("delimiter")]),
    NativeSpec::new("strip", strip, 1, 1, &[SELF]),
    NativeSpec::new("startswith", startswith, 2, 2, &[SELF, ParamInfo::required("prefix")]),
    NativeSpec::new("endswith", endswith, 2, 2, &[SELF, ParamInfo::required("suffix")]),
    NativeSpec::new("isalpha", isalpha, 1, 1, &[SELF]),
    NativeSpec::new("isdigit", isdigit, 1, 1, &[SELF]),
    NativeSpec::new("isalphanum", isalphanum, 1, 1, &[SELF]),
    NativeSpec::new("find", find, 2, 2, SUB),
    NativeSpec::new(
        "replace",
        replace,
        3,
        3,
        &[SELF, ParamInfo::required("old"), ParamInfo::required("new")],
    ),
    NativeSpec::new("count", count, 2, 2, SUB),
    NativeSpec::new("index", index, 2, 2, SUB),
];

fn receiver(heap: &Heap, value: Value, method: &str) -> Result<String, NativeError> {
    registry::string(heap, value, &format!("{}() must be called on a string.", method))
}

fn argument(heap: &Heap, value: Value, method: &str) -> Result<String, NativeError> {
    registry::string(heap, value, &format!("{}() expects a string argument.", method))
}

native! {
    fn upper(ctx, args) {
        let text = receiver(ctx.heap, args[0], "upper")?;
        Ok(registry::new_string(ctx.heap, text.to_ascii_uppercase()))
    }
}

native! {
    fn lower(ctx, args) {
        let text = receiver(ctx.heap, args[0], "lower")?;
        Ok(registry::new_string(ctx.heap, text.to_ascii_lowercase()))
    }
}

native! {
    /// Capitalize the first letter of each whitespace-separated word
    fn title(ctx, args) {
        let text = receiver(ctx.heap, args[0], "title")?;
        let mut result = String::with_capacity(text.len());
        let mut capitalize = true;
        for c in text.chars() {
            if c.is_ascii_whitespace() {
                capitalize = true;
                result.push(c);
            } else if capitalize {
                capitalize = false;
                result.push(c.to_ascii_uppercase());
            } else {
                result.push(c.to_ascii_lowercase());
            }
        }
        Ok(registry::new_string(ctx.heap, result))
    }
}

native! {
    /// Split on every occurrence of `delimiter`, dropping empty pieces
    fn split(ctx, args) {
        let text = receiver(ctx.heap, args[0], "split")?;
        let delimiter = argument(ctx.heap, args[1], "split")?;
        if delimiter.is_empty() {
            return Err(NativeError::runtime("split() delimiter must be non-empty."));
        }
        let mut parts = Vec::new();
        for piece in text.split(delimiter.as_str()).filter(|p| !p.is_empty()) {
            parts.push(ctx.heap.string_value(piece));
        }
        Ok(registry::new_list(ctx.heap, parts))
    }
}

native! {
    fn strip(ctx, args) {
        let text = receiver(ctx.heap, args[0], "strip")?;
        Ok(ctx.heap.string_value(text.trim_matches(|c: char| c.is_ascii_whitespace())))
    }
}

native! {
    fn startswith(ctx, args) {
        let text = receiver(ctx.heap, args[0], "startswith")?;
        let prefix = argument(ctx.heap, args[1], "startswith")?;
        Ok(Value::Bool(text.starts_with(&prefix)))
    }
}

native! {
    fn endswith(ctx, args) {
        let text = receiver(ctx.heap, args[0], "endswith")?;
        let suffix = argument(ctx.heap, args[1], "endswith")?;
        Ok(Value::Bool(text.ends_with(&suffix)))
    }
}

native! {
    fn isalpha(ctx, args) {
        let text = receiver(ctx.heap, args[0], "isalpha")?;
        Ok(Value::Bool(text.bytes().all(|b| b.is_ascii_alphabetic())))
    }
}

native! {
    fn isdigit(ctx, args) {
        let text = receiver(ctx.heap, args[0], "isdigit")?;
        Ok(Value::Bool(text.bytes().all(|b| b.is_ascii_digit())))
    }
}

native! {
    fn isalphanum(ctx, args) {
        let text = receiver(ctx.heap, args[0], "isalphanum")?;
        Ok(Value::Bool(text.bytes().all(|b| b.is_ascii_alphanumeric())))
    }
}

native! {
    /// Byte offset of the first occurrence, or -1
    fn find(ctx, args) {
        let text = receiver(ctx.heap, args[0], "find")?;
        let sub = argument(ctx.heap, args[1], "find")?;
        Ok(Value::Number(text.find(&sub).map_or(-1.0, |i| i as f64)))
    }
}

native! {
    /// Replace every non-overlapping occurrence of `old`
    fn replace(ctx, args) {
        let text = receiver(ctx.heap, args[0], "replace")?;
        let old = argument(ctx.heap, args[1], "replace")?;
        let new = argument(ctx.heap, args[2], "replace")?;
        if old.is_empty() {
            return Ok(args[0]);
        }
        Ok(registry::new_string(ctx.heap, text.replace(&old, &new)))
    }
}

native! {
    /// Non-overlapping occurrences; an empty needle matches between every byte
    fn count(ctx, args) {
        let text = receiver(ctx.heap, args[0], "count")?;
        let sub = argument(ctx.heap, args[1], "count")?;
        let n = if sub.is_empty() {
            text.len() + 1
        } else {
            text.matches(sub.as_str()).count()
        };
        Ok(Value::Number(n as f64))
    }
}

native! {
    /// Like `find`, but a missing substring is an index failure
    fn index(ctx, args) {
        let text = receiver(ctx.heap, args[0], "index")?;
        let sub = argument(ctx.heap, args[1], "index")?;
        text.find(&sub)
            .map(|i| Value::Number(i as f64))
            .ok_or_else(|| NativeError::index(format!("Substring '{}' not found in string.", sub)))
    }
}
