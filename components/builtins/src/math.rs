//! The `math` module.

use crate::error::NativeError;
use crate::registry::{self, define_all, define_value, NativeSpec};
use core_types::Value;
use memory_manager::{Heap, ParamInfo, Table};

const X: &[ParamInfo] = &[ParamInfo::required("x")];

/// Functions exported by `math`
pub const FUNCTIONS: &[NativeSpec] = &[
    NativeSpec::new("ceil", ceil, 1, 1, X),
    NativeSpec::new("floor", floor, 1, 1, X),
    NativeSpec::new("sqrt", sqrt, 1, 1, X),
    NativeSpec::new("sin", sin, 1, 1, X),
    NativeSpec::new("cos", cos, 1, 1, X),
    NativeSpec::new("tan", tan, 1, 1, X),
    NativeSpec::new(
        "pow",
        pow,
        2,
        2,
        &[ParamInfo::required("base"), ParamInfo::required("exponent")],
    ),
    NativeSpec::new("log", log, 1, 1, X),
    NativeSpec::new("exp", exp, 1, 1, X),
];

/// Populate the module's export table
pub fn define(heap: &mut Heap, exports: &mut Table) {
    define_all(heap, exports, FUNCTIONS);
    define_value(heap, exports, "pi", Value::Number(std::f64::consts::PI));
    define_value(heap, exports, "e", Value::Number(std::f64::consts::E));
}

fn operand(value: Value, name: &str) -> Result<f64, NativeError> {
    registry::number(value, &format!("{}() expects a numeric argument.", name))
}

macro_rules! unary {
    ($($name:ident => $op:expr),* $(,)?) => {
        $(
            native! {
                fn $name(_ctx, args) {
                    let x = operand(args[0], stringify!($name))?;
                    let op: fn(f64) -> f64 = $op;
                    Ok(Value::Number(op(x)))
                }
            }
        )*
    };
}

unary! {
    ceil => f64::ceil,
    floor => f64::floor,
    sin => f64::sin,
    cos => f64::cos,
    tan => f64::tan,
    exp => f64::exp,
}

native! {
    fn sqrt(_ctx, args) {
        let x = operand(args[0], "sqrt")?;
        if x < 0.0 {
            return Err(NativeError::runtime("sqrt() domain error: negative input."));
        }
        Ok(Value::Number(x.sqrt()))
    }
}

native! {
    /// Natural logarithm of a positive number
    fn log(_ctx, args) {
        let x = operand(args[0], "log")?;
        if x <= 0.0 {
            return Err(NativeError::runtime("log() domain error: input must be positive."));
        }
        Ok(Value::Number(x.ln()))
    }
}

native! {
    fn pow(_ctx, args) {
        let base = operand(args[0], "pow")?;
        let exponent = operand(args[1], "pow")?;
        Ok(Value::Number(base.powf(exponent)))
    }
}
