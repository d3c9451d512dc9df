//! The `random` module.
//!
//! A xorshift64* generator whose state lives in the engine, so `seed()` makes
//! a program's sequence reproducible.

use crate::error::NativeError;
use crate::registry::{self, define_all, NativeSpec};
use core_types::Value;
use memory_manager::{Heap, ParamInfo, Table};

const RANGE: &[ParamInfo] = &[ParamInfo::required("min"), ParamInfo::required("max")];
const LIST: &[ParamInfo] = &[ParamInfo::required("list")];

/// Functions exported by `random`
pub const FUNCTIONS: &[NativeSpec] = &[
    NativeSpec::new("seed", seed, 1, 1, &[ParamInfo::required("seed")]),
    NativeSpec::new("random", random, 0, 0, &[]),
    NativeSpec::new("randint", randint, 2, 2, RANGE),
    NativeSpec::new("randrange", randrange, 2, 2, RANGE),
    NativeSpec::new("choice", choice, 1, 1, LIST),
    NativeSpec::new("shuffle", shuffle, 1, 1, LIST),
    NativeSpec::new("randbool", randbool, 0, 0, &[]),
    NativeSpec::new("randbytes", randbytes, 1, 1, &[ParamInfo::required("length")]),
    NativeSpec::new(
        "gauss",
        gauss,
        2,
        2,
        &[ParamInfo::required("mu"), ParamInfo::required("sigma")],
    ),
    NativeSpec::new(
        "sample",
        sample,
        2,
        2,
        &[ParamInfo::required("list"), ParamInfo::required("k")],
    ),
];

/// Seed used when a program never calls `seed()`
pub const DEFAULT_SEED: u64 = 0x853c_49e6_748f_ea9b;

/// Populate the module's export table
pub fn define(heap: &mut Heap, exports: &mut Table) {
    define_all(heap, exports, FUNCTIONS);
}

/// Advance the generator
pub fn next_u64(state: &mut u64) -> u64 {
    if *state == 0 {
        *state = DEFAULT_SEED;
    }
    let mut x = *state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    *state = x;
    x.wrapping_mul(0x2545_f491_4f6c_dd1d)
}

/// Uniform float in `[0, 1)`
pub fn next_f64(state: &mut u64) -> f64 {
    (next_u64(state) >> 11) as f64 / (1u64 << 53) as f64
}

/// Uniform integer in `[0, bound)`; `bound` must be non-zero
fn below(state: &mut u64, bound: u64) -> u64 {
    next_u64(state) % bound
}

fn range(args: &[Value], name: &str) -> Result<(f64, f64), NativeError> {
    let message = format!("{}() expects two numeric arguments.", name);
    let low = registry::number(args[0], &message)?;
    let high = registry::number(args[1], &message)?;
    if low > high {
        return Err(NativeError::runtime(format!(
            "{}() min must be less than or equal to max.",
            name
        )));
    }
    Ok((low, high))
}

native! {
    fn seed(ctx, args) {
        let seed = registry::number(args[0], "seed() expects a single numeric argument.")?;
        *ctx.random_state = seed.to_bits() ^ DEFAULT_SEED;
        Ok(Value::Nil)
    }
}

native! {
    fn random(ctx, _args) {
        Ok(Value::Number(next_f64(ctx.random_state)))
    }
}

native! {
    /// Integer in `[min, max]`
    fn randint(ctx, args) {
        let (low, high) = range(args, "randint")?;
        let (low, high) = (low as i64, high as i64);
        let span = (high - low) as u64 + 1;
        Ok(Value::Number((low + below(ctx.random_state, span) as i64) as f64))
    }
}

native! {
    /// Float in `[min, max)`
    fn randrange(ctx, args) {
        let (low, high) = range(args, "randrange")?;
        Ok(Value::Number(low + next_f64(ctx.random_state) * (high - low)))
    }
}

native! {
    /// A random element, or nil for an empty list
    fn choice(ctx, args) {
        let values = registry::list(ctx.heap, args[0], "choice() expects a single list argument.")?;
        if values.is_empty() {
            return Ok(Value::Nil);
        }
        let i = below(ctx.random_state, values.len() as u64) as usize;
        Ok(values[i])
    }
}

native! {
    /// Shuffle in place and return the list
    fn shuffle(ctx, args) {
        let mut values = registry::list(ctx.heap, args[0], "shuffle() expects a single list argument.")?;
        for i in (1..values.len()).rev() {
            let j = below(ctx.random_state, i as u64 + 1) as usize;
            values.swap(i, j);
        }
        if let Some(list) = ctx.heap.as_list_mut(args[0]) {
            list.values = values;
        }
        Ok(args[0])
    }
}

native! {
    fn randbool(ctx, _args) {
        Ok(Value::Bool(next_u64(ctx.random_state) & 1 == 1))
    }
}

native! {
    /// A list of `length` numbers in `[0, 255]`
    fn randbytes(ctx, args) {
        let length = registry::integer(args[0], "randbytes() expects a single numeric argument.")?;
        if length < 0 {
            return Err(NativeError::runtime("randbytes() length must be non-negative."));
        }
        let bytes = (0..length)
            .map(|_| Value::Number(below(ctx.random_state, 256) as f64))
            .collect();
        Ok(registry::new_list(ctx.heap, bytes))
    }
}

native! {
    /// Normal deviate by the Box-Muller transform
    fn gauss(ctx, args) {
        let message = "gauss() expects two numeric arguments.";
        let mu = registry::number(args[0], message)?;
        let sigma = registry::number(args[1], message)?;
        if sigma <= 0.0 {
            return Err(NativeError::runtime("gauss() sigma must be positive."));
        }
        let u1 = 1.0 - next_f64(ctx.random_state);
        let u2 = next_f64(ctx.random_state);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        Ok(Value::Number(mu + sigma * z))
    }
}

native! {
    /// `k` distinct elements in random order; the source list is untouched
    fn sample(ctx, args) {
        let mut values = registry::list(ctx.heap, args[0], "sample() expects a list and a numeric argument.")?;
        let k = registry::integer(args[1], "sample() expects a list and a numeric argument.")?;
        if k < 0 || k as usize > values.len() {
            return Err(NativeError::runtime("sample() size must be in range 0..list length."));
        }
        let k = k as usize;
        let n = values.len();
        for i in 0..k {
            let j = i + below(ctx.random_state, (n - i) as u64) as usize;
            values.swap(i, j);
        }
        values.truncate(k);
        Ok(registry::new_list(ctx.heap, values))
    }
}
