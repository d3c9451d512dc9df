//! The `os` module.

use crate::error::NativeError;
use crate::registry::{self, define_all, NativeSpec};
use core_types::Value;
use memory_manager::{Heap, ParamInfo, Table};

const NAME: &[ParamInfo] = &[ParamInfo::required("name")];
const PATH: &[ParamInfo] = &[ParamInfo::required("path")];

/// Functions exported by `os`
pub const FUNCTIONS: &[NativeSpec] = &[
    NativeSpec::new("getenv", getenv, 1, 1, NAME),
    NativeSpec::new(
        "setenv",
        setenv,
        2,
        2,
        &[ParamInfo::required("name"), ParamInfo::required("value")],
    ),
    NativeSpec::new("unsetenv", unsetenv, 1, 1, NAME),
    NativeSpec::new("listdir", listdir, 0, 1, &[ParamInfo::optional("path")]),
    NativeSpec::new("remove", remove, 1, 1, PATH),
    NativeSpec::new("exists", exists, 1, 1, PATH),
    NativeSpec::new("cwd", cwd, 0, 0, &[]),
];

/// Populate the module's export table
pub fn define(heap: &mut Heap, exports: &mut Table) {
    define_all(heap, exports, FUNCTIONS);
}

fn variable_name(heap: &Heap, value: Value, function: &str) -> Result<String, NativeError> {
    let name = registry::string(heap, value, &format!("{}() expects a string name.", function))?;
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(NativeError::runtime(format!(
            "{}() invalid variable name '{}'.",
            function, name
        )));
    }
    Ok(name)
}

native! {
    /// The variable's value, or nil when unset
    fn getenv(ctx, args) {
        let name = variable_name(ctx.heap, args[0], "getenv")?;
        match std::env::var(&name) {
            Ok(value) => Ok(registry::new_string(ctx.heap, value)),
            Err(_) => Ok(Value::Nil),
        }
    }
}

native! {
    fn setenv(ctx, args) {
        let name = variable_name(ctx.heap, args[0], "setenv")?;
        let value = registry::string(ctx.heap, args[1], "setenv() expects a string value.")?;
        if value.contains('\0') {
            return Err(NativeError::runtime("setenv() value must not contain NUL."));
        }
        std::env::set_var(name, value);
        Ok(Value::Nil)
    }
}

native! {
    fn unsetenv(ctx, args) {
        let name = variable_name(ctx.heap, args[0], "unsetenv")?;
        std::env::remove_var(name);
        Ok(Value::Nil)
    }
}

native! {
    /// Entry names of a directory (the working directory by default), sorted
    fn listdir(ctx, args) {
        let path = match args.first() {
            Some(path) => registry::string(ctx.heap, *path, "listdir() expects a string path.")?,
            None => ".".to_string(),
        };
        let entries = std::fs::read_dir(&path)
            .map_err(|e| NativeError::io(format!("listdir() could not read '{}': {}.", path, e)))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| NativeError::io(format!("listdir() failed: {}.", e)))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        let values = names
            .into_iter()
            .map(|name| registry::new_string(ctx.heap, name))
            .collect();
        Ok(registry::new_list(ctx.heap, values))
    }
}

native! {
    /// Delete a file
    fn remove(ctx, args) {
        let path = registry::string(ctx.heap, args[0], "remove() expects a string path.")?;
        std::fs::remove_file(&path)
            .map_err(|e| NativeError::io(format!("remove() could not delete '{}': {}.", path, e)))?;
        Ok(Value::Nil)
    }
}

native! {
    fn exists(ctx, args) {
        let path = registry::string(ctx.heap, args[0], "exists() expects a string path.")?;
        Ok(Value::Bool(std::path::Path::new(&path).exists()))
    }
}

native! {
    /// The working directory
    fn cwd(ctx, _args) {
        let dir = std::env::current_dir()
            .map_err(|e| NativeError::io(format!("cwd() failed: {}.", e)))?;
        Ok(registry::new_string(ctx.heap, dir.to_string_lossy().into_owned()))
    }
}
