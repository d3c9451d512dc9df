//! The `json` module, backed by `serde_json`.

use crate::error::{NativeError, NativeResult};
use crate::file;
use crate::registry::{self, define_all, NativeSpec};
use core_types::Value;
use memory_manager::{Heap, Obj, ParamInfo, Table};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Containers nested deeper than this are treated as cyclic
pub const MAX_DEPTH: usize = 512;

const INDENT: ParamInfo = ParamInfo::optional("indent");

/// Functions exported by `json`
pub const FUNCTIONS: &[NativeSpec] = &[
    NativeSpec::new("loads", loads, 1, 1, &[ParamInfo::required("text")]),
    NativeSpec::new("dumps", dumps, 1, 2, &[ParamInfo::required("obj"), INDENT]),
    NativeSpec::new("load", load, 1, 1, &[ParamInfo::required("file")]),
    NativeSpec::new(
        "dump",
        dump,
        2,
        3,
        &[ParamInfo::required("obj"), ParamInfo::required("file"), INDENT],
    ),
];

/// Populate the module's export table
pub fn define(heap: &mut Heap, exports: &mut Table) {
    define_all(heap, exports, FUNCTIONS);
}

/// Convert a runtime value into a JSON tree
pub fn to_json(heap: &Heap, value: Value, depth: usize) -> NativeResult<serde_json::Value> {
    if depth > MAX_DEPTH {
        return Err(NativeError::runtime(
            "Structure is nested too deeply to serialize (circular reference?).",
        ));
    }
    let r = match value {
        Value::Nil => return Ok(serde_json::Value::Null),
        Value::Bool(b) => return Ok(serde_json::Value::Bool(b)),
        Value::Number(n) => return number(n).map(serde_json::Value::Number),
        Value::Obj(r) => r,
        Value::Empty => return Err(not_serializable("empty")),
    };
    match heap.get(r) {
        Obj::String(s) => Ok(serde_json::Value::String(s.chars.clone())),
        Obj::List(list) => list
            .values
            .iter()
            .map(|item| to_json(heap, *item, depth + 1))
            .collect::<NativeResult<Vec<_>>>()
            .map(serde_json::Value::Array),
        Obj::Dict(dict) => {
            let mut map = serde_json::Map::new();
            for (key, item) in dict.table.iter() {
                let key = heap
                    .as_str(key)
                    .ok_or_else(|| NativeError::type_error("JSON object keys must be strings."))?;
                map.insert(key.to_string(), to_json(heap, item, depth + 1)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        other => Err(not_serializable(other.type_name())),
    }
}

fn not_serializable(type_name: &str) -> NativeError {
    NativeError::type_error(format!(
        "Object of type '{}' is not JSON serializable.",
        type_name
    ))
}

/// Integral numbers are written without a fraction
fn number(n: f64) -> NativeResult<serde_json::Number> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= EXACT {
        return Ok(serde_json::Number::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .ok_or_else(|| NativeError::runtime("Out of range float values are not JSON compliant."))
}

/// Convert a JSON tree into runtime values
pub fn from_json(heap: &mut Heap, json: &serde_json::Value) -> NativeResult {
    Ok(match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => heap.string_value(s),
        serde_json::Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| from_json(heap, item))
                .collect::<NativeResult<Vec<_>>>()?;
            registry::new_list(heap, values)
        }
        serde_json::Value::Object(map) => {
            let mut table = Table::new();
            for (key, item) in map {
                let item = from_json(heap, item)?;
                let key = heap.name_key(key);
                table.set(key, item);
            }
            let dict = heap.new_dict();
            if let Obj::Dict(d) = heap.get_mut(dict) {
                d.table = table;
            }
            Value::Obj(dict)
        }
    })
}

fn indent_arg(value: Option<&Value>, function: &str) -> NativeResult<Option<usize>> {
    match value {
        None | Some(Value::Nil) => Ok(None),
        Some(v) => {
            let n = registry::integer(*v, &format!("{}() indent must be a number.", function))?;
            usize::try_from(n)
                .map(Some)
                .map_err(|_| NativeError::runtime(format!("{}() indent must not be negative.", function)))
        }
    }
}

/// Serialize compactly, or pretty-printed with `indent` spaces per level
pub fn render(json: &serde_json::Value, indent: Option<usize>) -> NativeResult<String> {
    let failure = |e: serde_json::Error| NativeError::runtime(format!("JSON encoding failed: {}.", e));
    match indent {
        None => serde_json::to_string(json).map_err(failure),
        Some(width) => {
            let pad = vec![b' '; width];
            let mut out = Vec::new();
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&pad));
            json.serialize(&mut serializer).map_err(failure)?;
            Ok(String::from_utf8_lossy(&out).into_owned())
        }
    }
}

fn parse(heap: &mut Heap, text: &str, function: &str) -> NativeResult {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| NativeError::runtime(format!("{}() invalid JSON: {}.", function, e)))?;
    from_json(heap, &json)
}

native! {
    /// Parse a JSON document
    fn loads(ctx, args) {
        let text = registry::string(ctx.heap, args[0], "loads() expects a string argument.")?;
        parse(ctx.heap, &text, "loads")
    }
}

native! {
    /// Serialize to a JSON string
    fn dumps(ctx, args) {
        let indent = indent_arg(args.get(1), "dumps")?;
        let json = to_json(ctx.heap, args[0], 0)?;
        let text = render(&json, indent)?;
        Ok(registry::new_string(ctx.heap, text))
    }
}

native! {
    /// Parse the whole contents of an open file
    fn load(ctx, args) {
        let text = file::read_all(ctx.heap, args[0], "load")?;
        parse(ctx.heap, &text, "load")
    }
}

native! {
    /// Serialize into an open file
    fn dump(ctx, args) {
        let indent = indent_arg(args.get(2), "dump")?;
        let json = to_json(ctx.heap, args[0], 0)?;
        let text = render(&json, indent)?;
        file::write_text(ctx.heap, args[1], &text, "dump")?;
        Ok(Value::Nil)
    }
}
