//! Shared helpers for indicator argument handling and windowed computation.

use crate::domain::error::IndicatorError;
use crate::domain::rule::Arg;
use std::fmt::Display;
use std::num::IntErrorKind;

/// Resolve the optional window argument of a windowed indicator.
///
/// No argument means `default`. A single numeric argument must be an integer
/// `>= min` that fits in a `usize`. Anything else is rejected.
pub fn window_arg(
    name: &str,
    args: &[Arg],
    default: usize,
    min: usize,
) -> Result<usize, IndicatorError> {
    let window = match args {
        [] => default,
        [Arg::Number(v)] => {
            if v.fract() != 0.0 || *v < 0.0 || !v.is_finite() {
                return Err(invalid(name, format!("window must be a whole number, got {}", v)));
            }
            // usize::MAX as f64 rounds up to 2^64, so this bound is exclusive
            if *v >= usize::MAX as f64 {
                return Err(too_large(name, v));
            }
            *v as usize
        }
        [Arg::Text(s)] => match s.trim().parse::<usize>() {
            Ok(w) => w,
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => return Err(too_large(name, s)),
            Err(_) => return Err(invalid(name, format!("window must be a whole number, got \"{}\"", s))),
        },
        _ => {
            return Err(invalid(
                name,
                format!("expected at most 1 argument, got {}", args.len()),
            ));
        }
    };
    if window < min {
        return Err(invalid(name, format!("window must be at least {}, got {}", min, window)));
    }
    Ok(window)
}

/// Reject any extra argument for indicators that take none.
pub fn no_args(name: &str, args: &[Arg]) -> Result<(), IndicatorError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(invalid(
            name,
            format!("takes no arguments, got {}", args.len()),
        ))
    }
}

/// Evaluate `f(start, end)` over every trailing window `[t-window+1, t]`.
///
/// Indices before the first full window are NaN.
pub fn rolling<F>(len: usize, window: usize, mut f: F) -> Vec<f64>
where
    F: FnMut(usize, usize) -> f64,
{
    let mut out = vec![f64::NAN; len];
    if window == 0 {
        return out;
    }
    for (t, slot) in out.iter_mut().enumerate().skip(window - 1) {
        *slot = f(t + 1 - window, t);
    }
    out
}

fn too_large(name: &str, window: impl Display) -> IndicatorError {
    invalid(name, format!("window {} is too large", window))
}

fn invalid(name: &str, reason: String) -> IndicatorError {
    IndicatorError::InvalidArgument {
        name: name.to_string(),
        reason,
    }
}
