//! Standard library of the slo language
//!
//! This crate provides the host functions the engine exposes to programs:
//! - Global functions (`print`, `len`, `open`, conversions, timing)
//! - Methods of the built-in container, list, dict, string and file classes
//! - The importable `math`, `random`, `os` and `json` modules
//!
//! # Example
//!
//! ```
//! use builtins::{define_globals, register_classes};
//! use memory_manager::{Heap, Table};
//!
//! let mut heap = Heap::new();
//! register_classes(&mut heap);
//!
//! let mut globals = Table::new();
//! define_globals(&mut heap, &mut globals);
//!
//! let key = heap.name_key("println");
//! assert!(globals.get(key).is_some());
//! assert!(heap.classes.list.is_some());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Define a native whose body returns a [`error::NativeResult`].
///
/// Failures become error values of the matching kind.
macro_rules! native {
    ($(#[$meta:meta])* fn $name:ident($ctx:ident, $args:ident) $body:block) => {
        $(#[$meta])*
        pub(crate) fn $name(
            $ctx: &mut memory_manager::NativeContext<'_>,
            $args: &[core_types::Value],
        ) -> core_types::Value {
            #[allow(clippy::redundant_closure_call, unused_variables)]
            let result = (|| -> $crate::error::NativeResult { $body })();
            $crate::error::finish($ctx, result)
        }
    };
}

pub mod container;
pub mod dict;
pub mod error;
pub mod file;
pub mod globals;
pub mod json;
pub mod list;
pub mod math;
pub mod os;
pub mod random;
pub mod registry;
pub mod string;


use core_types::ObjRef;
use memory_manager::{Heap, Table};

// Re-export main types for convenience
pub use error::{NativeError, NativeResult};
pub use globals::define_globals;
pub use registry::{define_all, NativeSpec, VARIADIC};

/// Names accepted by `import`
pub const MODULE_NAMES: &[&str] = &["math", "random", "os", "json"];

/// Create the built-in classes and record them on the heap.
///
/// `list` and `dict` inherit the shared container methods. Call this before
/// any list or dict is allocated so new containers pick up their class.
pub fn register_classes(heap: &mut Heap) {
    let container = registry::native_class(heap, "container", None, container::METHODS, &[]);
    let list = registry::native_class(heap, "list", Some(container), list::METHODS, &[]);
    let dict = registry::native_class(heap, "dict", Some(container), dict::METHODS, &[]);
    let string = registry::native_class(heap, "string", None, string::METHODS, &[]);
    let file = registry::native_class(heap, "file", None, file::METHODS, file::PROPERTIES);

    heap.classes.container = Some(container);
    heap.classes.list = Some(list);
    heap.classes.dict = Some(dict);
    heap.classes.string = Some(string);
    heap.classes.file = Some(file);
    log::debug!("registered built-in classes");
}

/// Build the module object for `name`, or `None` if no such module exists
pub fn load_module(heap: &mut Heap, name: &str) -> Option<ObjRef> {
    let mut exports = Table::new();
    match name {
        "math" => math::define(heap, &mut exports),
        "random" => random::define(heap, &mut exports),
        "os" => os::define(heap, &mut exports),
        "json" => json::define(heap, &mut exports),
        _ => return None,
    }
    let module_name = heap.intern(name);
    let module = heap.new_module(module_name);
    if let memory_manager::Obj::Module(m) = heap.get_mut(module) {
        m.exports = exports;
    }
    log::debug!("loaded module {}", name);
    Some(module)
}
