//! Global functions available in every program.

use crate::error::{NativeError, NativeResult};
use crate::registry::{self, define_all, NativeSpec, VARIADIC};
use core_types::Value;
use memory_manager::{FileMode, Heap, NativeContext, Obj, ParamInfo, Table};
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

const MESSAGE: &[ParamInfo] = &[
    ParamInfo::optional("message"),
    ParamInfo::optional("...args"),
];
const VALUE: &[ParamInfo] = &[ParamInfo::required("value")];
const PAIR: &[ParamInfo] = &[ParamInfo::required("a"), ParamInfo::required("b")];

/// Every global native
pub const GLOBALS: &[NativeSpec] = &[
    NativeSpec::new("clock", clock, 0, 0, &[]),
    NativeSpec::new("time", time, 0, 0, &[]),
    NativeSpec::new("sleep", sleep, 1, 1, &[ParamInfo::required("seconds")]),
    NativeSpec::new("exit", exit, 0, 1, &[ParamInfo::optional("code")]),
    NativeSpec::new("print", print, 0, VARIADIC, MESSAGE),
    NativeSpec::new("println", println, 0, VARIADIC, MESSAGE),
    NativeSpec::new("len", len, 1, 1, &[ParamInfo::required("sequence")]),
    NativeSpec::new("abs", abs, 1, 1, VALUE),
    NativeSpec::new("min", min, 2, 2, PAIR),
    NativeSpec::new("max", max, 2, 2, PAIR),
    NativeSpec::new("str", to_str, 1, 1, VALUE),
    NativeSpec::new("number", to_number, 1, 1, VALUE),
    NativeSpec::new("bool", to_bool, 1, 1, VALUE),
    NativeSpec::new("type", type_of, 1, 1, VALUE),
    NativeSpec::new(
        "open",
        open,
        1,
        2,
        &[ParamInfo::required("path"), ParamInfo::optional("mode")],
    ),
    NativeSpec::new("gc", gc, 0, 0, &[]),
];

/// Bind every global native into `globals`
pub fn define_globals(heap: &mut Heap, globals: &mut Table) {
    define_all(heap, globals, GLOBALS);
}

fn process_start() -> Instant {
    static START: OnceLock<Instant> = OnceLock::new();
    *START.get_or_init(Instant::now)
}

native! {
    /// Seconds since the runtime started
    fn clock(_ctx, _args) {
        Ok(Value::Number(process_start().elapsed().as_secs_f64()))
    }
}

native! {
    /// Seconds since the Unix epoch, with microsecond precision
    fn time(_ctx, _args) {
        let micros = chrono::Utc::now().timestamp_micros();
        Ok(Value::Number(micros as f64 / 1e6))
    }
}

native! {
    fn sleep(_ctx, args) {
        let seconds = registry::number(args[0], "sleep() expects a single numeric argument.")?;
        if seconds.is_finite() && seconds > 0.0 {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
        Ok(Value::Nil)
    }
}

native! {
    /// Stop the program; the engine unwinds once this returns
    fn exit(ctx, args) {
        let code = match args.first() {
            Some(value) => registry::number(*value, "exit() expects a numeric argument (if any).")? as i32,
            None => 0,
        };
        ctx.exit_code = Some(code);
        Ok(Value::Nil)
    }
}

fn write_values(ctx: &mut NativeContext<'_>, args: &[Value], newline: bool) -> NativeResult {
    let mut text = String::new();
    for value in args {
        text.push_str(&ctx.heap.display(*value));
    }
    if newline {
        text.push('\n');
    }
    ctx.out
        .write_all(text.as_bytes())
        .map_err(|e| NativeError::io(format!("Failed to write output: {}", e)))?;
    Ok(Value::Nil)
}

native! {
    /// Print every argument without separators
    fn print(ctx, args) {
        write_values(ctx, args, false)
    }
}

native! {
    /// Print every argument followed by a newline
    fn println(ctx, args) {
        write_values(ctx, args, true)
    }
}

native! {
    fn len(ctx, args) {
        let heap = &*ctx.heap;
        let count = match args[0] {
            Value::Obj(r) => match heap.get(r) {
                Obj::String(s) => Some(s.chars.len()),
                Obj::List(l) => Some(l.values.len()),
                Obj::Dict(d) => Some(d.table.len()),
                _ => None,
            },
            _ => None,
        };
        count
            .map(|n| Value::Number(n as f64))
            .ok_or_else(|| NativeError::type_error("len() expects a single argument of type string, list, or dict."))
    }
}

native! {
    fn abs(_ctx, args) {
        let value = registry::number(args[0], "abs() expects a single numeric argument.")?;
        Ok(Value::Number(value.abs()))
    }
}

native! {
    fn min(_ctx, args) {
        let message = "min() expects two numeric arguments.";
        let a = registry::number(args[0], message)?;
        let b = registry::number(args[1], message)?;
        Ok(Value::Number(if a < b { a } else { b }))
    }
}

native! {
    fn max(_ctx, args) {
        let message = "max() expects two numeric arguments.";
        let a = registry::number(args[0], message)?;
        let b = registry::number(args[1], message)?;
        Ok(Value::Number(if a > b { a } else { b }))
    }
}

native! {
    /// The display form of any value
    fn to_str(ctx, args) {
        if ctx.heap.is_string(args[0]) {
            return Ok(args[0]);
        }
        let text = ctx.heap.display(args[0]);
        Ok(registry::new_string(ctx.heap, text))
    }
}

native! {
    fn to_number(ctx, args) {
        match args[0] {
            Value::Nil => Ok(Value::Number(0.0)),
            Value::Bool(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
            Value::Number(_) => Ok(args[0]),
            other => match ctx.heap.as_str(other) {
                Some(text) => text
                    .trim()
                    .parse::<f64>()
                    .map(Value::Number)
                    .map_err(|_| NativeError::type_error("number() could not convert string to number.")),
                None => Err(NativeError::type_error("number() could not convert value to number.")),
            },
        }
    }
}

native! {
    /// Truthiness for conversion: empty strings and containers are false
    fn to_bool(ctx, args) {
        let value = args[0];
        let empty = match value {
            Value::Obj(r) => match ctx.heap.get(r) {
                Obj::String(s) => s.chars.is_empty(),
                Obj::List(l) => l.values.is_empty(),
                Obj::Dict(d) => d.table.is_empty(),
                _ => false,
            },
            _ => value.is_falsey(),
        };
        Ok(Value::Bool(!empty))
    }
}

native! {
    fn type_of(ctx, args) {
        let name = ctx.heap.type_name(args[0]);
        Ok(ctx.heap.string_value(name))
    }
}

native! {
    /// Open a file; the mode defaults to `"r"`
    fn open(ctx, args) {
        let path = registry::string(ctx.heap, args[0], "open() expects a string path.")?;
        let mode_text = match args.get(1) {
            Some(mode) => registry::string(ctx.heap, *mode, "open() expects a string mode.")?,
            None => "r".to_string(),
        };
        let mode = FileMode::parse(&mode_text)
            .ok_or_else(|| NativeError::type_error(format!("Invalid file mode '{}'.", mode_text)))?;

        let mut options = OpenOptions::new();
        match mode_text.as_str() {
            "r" | "rb" => options.read(true),
            "w" | "wb" => options.write(true).create(true).truncate(true),
            "a" | "ab" => options.append(true).create(true),
            "r+" => options.read(true).write(true),
            "w+" => options.read(true).write(true).create(true).truncate(true),
            _ => options.read(true).append(true).create(true),
        };
        let handle = options
            .open(&path)
            .map_err(|e| NativeError::io(format!("Could not open file '{}': {}.", path, e)))?;
        log::debug!("opened {} with mode {}", path, mode.as_str());

        let path = ctx.heap.intern_owned(path);
        Ok(Value::Obj(ctx.heap.new_file(handle, mode, path)))
    }
}

native! {
    /// Ask the engine for a full collection at the next instruction
    fn gc(ctx, _args) {
        ctx.heap.request_collection();
        Ok(Value::Nil)
    }
}
