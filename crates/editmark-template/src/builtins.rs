//! Allow-listed builtins and methods available to template expressions.

use std::cmp::Ordering;

use crate::context::FormatContext;
use crate::error::{Result, TemplateError};
use crate::expression::{BinOp, CmpOp};
use crate::format::format_template;
use crate::value::Value;

/// Methods that may be called on values.
pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "split",
    "join",
    "upper",
    "capitalize",
    "lower",
    "strip",
    "lstrip",
    "rstrip",
    "replace",
    "startswith",
    "endswith",
    "format",
    "count",
];

/// Free functions that may be called by name.
pub const ALLOWED_BUILTINS: &[&str] = &[
    "len",
    "str",
    "int",
    "float",
    "list",
    "tuple",
    "dict",
    "set",
    "bool",
    "max",
    "min",
    "sum",
    "round",
    "abs",
    "enumerate",
    "zip",
    "range",
];

fn type_error(expected: &str, got: &Value) -> TemplateError {
    TemplateError::Type {
        expected: expected.to_string(),
        got: got.type_name().to_string(),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(TemplateError::Eval(format!(
            "{}() takes {}..={} arguments ({} given)",
            name,
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

fn iterable(value: &Value) -> Result<Vec<Value>> {
    value.iter_items().ok_or_else(|| type_error("iterable", value))
}

fn expect_str<'a>(value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| type_error("str", value))
}

// ── Builtin functions ──────────────────────────────────────────

/// Call an allow-listed builtin by name.
pub fn call_builtin(name: &str, args: Vec<Value>) -> Result<Value> {
    match name {
        "len" => {
            arity(name, &args, 1, 1)?;
            let n = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(v) | Value::Tuple(v) | Value::Set(v) => v.len(),
                Value::Dict(d) => d.len(),
                other => return Err(type_error("sized", other)),
            };
            Ok(Value::Int(n as i64))
        }
        "str" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Str(args.first().map(Value::to_py_str).unwrap_or_default()))
        }
        "int" => {
            arity(name, &args, 0, 2)?;
            match (args.first(), args.get(1)) {
                (None, _) => Ok(Value::Int(0)),
                (Some(Value::Str(s)), base) => {
                    let radix = match base {
                        Some(b) => b.as_i64().ok_or_else(|| type_error("int", b))? as u32,
                        None => 10,
                    };
                    if !(2..=36).contains(&radix) {
                        return Err(TemplateError::Eval(
                            "int() base must be >= 2 and <= 36".into(),
                        ));
                    }
                    i64::from_str_radix(s.trim(), radix)
                        .map(Value::Int)
                        .map_err(|_| {
                            TemplateError::Eval(format!(
                                "invalid literal for int() with base {}: {}",
                                radix,
                                Value::Str(s.clone()).to_py_repr()
                            ))
                        })
                }
                (Some(Value::Float(f)), None) => Ok(Value::Int(f.trunc() as i64)),
                (Some(v @ (Value::Int(_) | Value::Bool(_))), None) => {
                    Ok(Value::Int(v.as_i64().unwrap_or_default()))
                }
                (Some(other), _) => Err(type_error("str or number", other)),
            }
        }
        "float" => {
            arity(name, &args, 0, 1)?;
            match args.first() {
                None => Ok(Value::Float(0.0)),
                Some(Value::Str(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                    TemplateError::Eval(format!("could not convert string to float: '{}'", s))
                }),
                Some(other) => other
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| type_error("str or number", other)),
            }
        }
        "bool" => {
            arity(name, &args, 0, 1)?;
            Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
        }
        "list" | "tuple" | "set" => {
            arity(name, &args, 0, 1)?;
            let items = match args.first() {
                Some(v) => iterable(v)?,
                None => Vec::new(),
            };
            Ok(match name {
                "list" => Value::List(items),
                "tuple" => Value::Tuple(items),
                _ => {
                    let mut unique: Vec<Value> = Vec::new();
                    for item in items {
                        if !unique.iter().any(|u| u.py_eq(&item)) {
                            unique.push(item);
                        }
                    }
                    Value::Set(unique)
                }
            })
        }
        "dict" => {
            arity(name, &args, 0, 1)?;
            let Some(source) = args.first() else {
                return Ok(Value::Dict(Vec::new()));
            };
            if let Value::Dict(pairs) = source {
                return Ok(Value::Dict(pairs.clone()));
            }
            let mut pairs = Vec::new();
            for item in iterable(source)? {
                match iterable(&item)?.as_slice() {
                    [k, v] => pairs.push((k.clone(), v.clone())),
                    _ => {
                        return Err(TemplateError::Eval(
                            "dictionary update sequence element must have length 2".into(),
                        ))
                    }
                }
            }
            Ok(Value::Dict(pairs))
        }
        "max" | "min" => {
            if args.is_empty() {
                return Err(TemplateError::Eval(format!("{}() expected at least 1 argument", name)));
            }
            let items = if args.len() == 1 {
                iterable(&args[0])?
            } else {
                args
            };
            let wanted = if name == "max" {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let mut best: Option<Value> = None;
            for item in items {
                best = match best {
                    None => Some(item),
                    Some(current) => {
                        let ord = item.py_cmp(&current).ok_or_else(|| {
                            TemplateError::Eval(format!(
                                "'{}' not supported between '{}' and '{}'",
                                name,
                                item.type_name(),
                                current.type_name()
                            ))
                        })?;
                        Some(if ord == wanted { item } else { current })
                    }
                };
            }
            best.ok_or_else(|| TemplateError::Eval(format!("{}() arg is an empty sequence", name)))
        }
        "sum" => {
            arity(name, &args, 1, 2)?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            iterable(&args[0])?
                .into_iter()
                .try_fold(start, |acc, item| binary(BinOp::Add, &acc, &item))
        }
        "round" => {
            arity(name, &args, 1, 2)?;
            let x = args[0].as_f64().ok_or_else(|| type_error("number", &args[0]))?;
            match args.get(1) {
                None | Some(Value::None) => match &args[0] {
                    Value::Int(i) => Ok(Value::Int(*i)),
                    _ => Ok(Value::Int(round_half_even(x) as i64)),
                },
                Some(n) => {
                    let digits = n.as_i64().ok_or_else(|| type_error("int", n))?;
                    if let Value::Int(i) = &args[0] {
                        if digits >= 0 {
                            return Ok(Value::Int(*i));
                        }
                    }
                    let scale = 10f64.powi(digits as i32);
                    Ok(Value::Float(round_half_even(x * scale) / scale))
                }
            }
        }
        "abs" => {
            arity(name, &args, 1, 1)?;
            match &args[0] {
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| TemplateError::Eval("integer overflow in abs()".into())),
                Value::Bool(b) => Ok(Value::Int(*b as i64)),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(type_error("number", other)),
            }
        }
        "enumerate" => {
            arity(name, &args, 1, 2)?;
            let start = match args.get(1) {
                Some(v) => v.as_i64().ok_or_else(|| type_error("int", v))?,
                None => 0,
            };
            Ok(Value::List(
                iterable(&args[0])?
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Value::Tuple(vec![Value::Int(start + i as i64), v]))
                    .collect(),
            ))
        }
        "zip" => {
            let columns = args.iter().map(iterable).collect::<Result<Vec<_>>>()?;
            let len = columns.iter().map(Vec::len).min().unwrap_or(0);
            Ok(Value::List(
                (0..len)
                    .map(|row| Value::Tuple(columns.iter().map(|c| c[row].clone()).collect()))
                    .collect(),
            ))
        }
        "range" => {
            arity(name, &args, 1, 3)?;
            let ints = args
                .iter()
                .map(|a| a.as_i64().ok_or_else(|| type_error("int", a)))
                .collect::<Result<Vec<_>>>()?;
            let (start, stop, step) = match ints.as_slice() {
                [stop] => (0, *stop, 1),
                [start, stop] => (*start, *stop, 1),
                [start, stop, step] => (*start, *stop, *step),
                _ => return Err(TemplateError::Eval("range() expects 1 to 3 arguments".into())),
            };
            if step == 0 {
                return Err(TemplateError::Eval("range() arg 3 must not be zero".into()));
            }
            let mut out = Vec::new();
            let mut i = start;
            while (step > 0 && i < stop) || (step < 0 && i > stop) {
                if out.len() >= MAX_SEQUENCE_LEN {
                    return Err(TemplateError::Eval(format!(
                        "range() longer than {} items",
                        MAX_SEQUENCE_LEN
                    )));
                }
                out.push(Value::Int(i));
                match i.checked_add(step) {
                    Some(next) => i = next,
                    None => break,
                }
            }
            Ok(Value::List(out))
        }
        other => Err(TemplateError::Disallowed(format!("call to '{}'", other))),
    }
}

fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

// ── Methods ────────────────────────────────────────────────────

/// Call an allow-listed method on a receiver.
pub fn call_method(receiver: &Value, method: &str, args: Vec<Value>) -> Result<Value> {
    if !ALLOWED_ATTRIBUTES.contains(&method) {
        return Err(TemplateError::Disallowed(format!("attribute '{}'", method)));
    }
    match receiver {
        Value::Str(s) => str_method(s, method, args),
        Value::List(items) | Value::Tuple(items) if method == "count" => {
            arity(method, &args, 1, 1)?;
            Ok(Value::Int(
                items.iter().filter(|v| v.py_eq(&args[0])).count() as i64
            ))
        }
        other => Err(TemplateError::Eval(format!(
            "'{}' object has no attribute '{}'",
            other.type_name(),
            method
        ))),
    }
}

fn str_method(s: &str, method: &str, args: Vec<Value>) -> Result<Value> {
    match method {
        "upper" => {
            arity(method, &args, 0, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        "lower" => {
            arity(method, &args, 0, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        "capitalize" => {
            arity(method, &args, 0, 0)?;
            Ok(Value::Str(capitalize(s)))
        }
        "strip" | "lstrip" | "rstrip" => {
            arity(method, &args, 0, 1)?;
            let chars: Option<Vec<char>> = match args.first() {
                None | Some(Value::None) => None,
                Some(v) => Some(expect_str(v)?.chars().collect()),
            };
            let matcher = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            Ok(Value::Str(
                match method {
                    "strip" => s.trim_matches(matcher),
                    "lstrip" => s.trim_start_matches(matcher),
                    _ => s.trim_end_matches(matcher),
                }
                .to_string(),
            ))
        }
        "split" => {
            arity(method, &args, 0, 2)?;
            let maxsplit = match args.get(1) {
                Some(v) => v.as_i64().ok_or_else(|| type_error("int", v))?,
                None => -1,
            };
            let parts: Vec<String> = match args.first() {
                None | Some(Value::None) => {
                    let words = s.split_whitespace();
                    if maxsplit < 0 {
                        words.map(str::to_string).collect()
                    } else {
                        split_whitespace_n(s, maxsplit as usize)
                    }
                }
                Some(sep) => {
                    let sep = expect_str(sep)?;
                    if sep.is_empty() {
                        return Err(TemplateError::Eval("empty separator".into()));
                    }
                    if maxsplit < 0 {
                        s.split(sep).map(str::to_string).collect()
                    } else {
                        s.splitn(maxsplit as usize + 1, sep)
                            .map(str::to_string)
                            .collect()
                    }
                }
            };
            Ok(Value::List(parts.into_iter().map(Value::Str).collect()))
        }
        "join" => {
            arity(method, &args, 1, 1)?;
            let parts = iterable(&args[0])?
                .iter()
                .map(|v| expect_str(v).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Str(parts.join(s)))
        }
        "replace" => {
            arity(method, &args, 2, 3)?;
            let old = expect_str(&args[0])?;
            let new = expect_str(&args[1])?;
            let hits = if old.is_empty() { s.chars().count() + 1 } else { s.matches(old).count() };
            let grown = hits.saturating_mul(new.len()).saturating_add(s.len());
            if grown > MAX_SEQUENCE_LEN {
                return Err(TemplateError::Eval(format!(
                    "replace() result longer than {} bytes",
                    MAX_SEQUENCE_LEN
                )));
            }
            Ok(Value::Str(match args.get(2).and_then(Value::as_i64) {
                Some(n) if n >= 0 => s.replacen(old, new, n as usize),
                _ => s.replace(old, new),
            }))
        }
        "startswith" | "endswith" => {
            arity(method, &args, 1, 1)?;
            let candidates = match &args[0] {
                Value::Tuple(items) => items.clone(),
                v => vec![v.clone()],
            };
            for candidate in &candidates {
                let c = expect_str(candidate)?;
                let hit = if method == "startswith" {
                    s.starts_with(c)
                } else {
                    s.ends_with(c)
                };
                if hit {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "count" => {
            arity(method, &args, 1, 1)?;
            let sub = expect_str(&args[0])?;
            let n = if sub.is_empty() {
                s.chars().count() + 1
            } else {
                s.matches(sub).count()
            };
            Ok(Value::Int(n as i64))
        }
        "format" => Ok(Value::Str(positional_format(s, &args)?)),
        other => Err(TemplateError::Eval(format!(
            "'str' object has no attribute '{}'",
            other
        ))),
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn split_whitespace_n(s: &str, maxsplit: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = s.trim_start();
    while !rest.is_empty() {
        if out.len() == maxsplit {
            out.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                out.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                out.push(rest.to_string());
                break;
            }
        }
    }
    out
}

/// `'{}-{:0>3}'.format(a, b)` with automatic and explicit positional fields.
fn positional_format(template: &str, args: &[Value]) -> Result<String> {
    let ctx: FormatContext = args
        .iter()
        .enumerate()
        .map(|(i, v)| (i.to_string(), v.clone()))
        .collect();
    let mut numbered = String::with_capacity(template.len());
    let mut auto = 0usize;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        numbered.push(c);
        if c != '{' {
            continue;
        }
        if chars.peek() == Some(&'{') {
            numbered.push('{');
            chars.next();
            continue;
        }
        if matches!(chars.peek(), Some('}') | Some(':') | Some('!') | Some('[')) {
            numbered.push_str(&auto.to_string());
            auto += 1;
        }
    }
    format_template(&numbered, &ctx)
}

// ── Operators ──────────────────────────────────────────────────

fn unsupported(op: &str, l: &Value, r: &Value) -> TemplateError {
    TemplateError::Eval(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        l.type_name(),
        r.type_name()
    ))
}

/// Largest string or list a template expression may build.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// Repetition count of `len * n`, refused past [`MAX_SEQUENCE_LEN`].
fn repeat_count(len: usize, n: &Value) -> Result<usize> {
    let times = usize::try_from(n.as_i64().unwrap_or_default().max(0))
        .map_err(|_| TemplateError::Eval("repeat count out of range".into()))?;
    match len.checked_mul(times) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(times),
        _ => Err(TemplateError::Eval(format!(
            "repeated sequence longer than {} items",
            MAX_SEQUENCE_LEN
        ))),
    }
}

fn zero_division() -> TemplateError {
    TemplateError::Eval("division by zero".into())
}

/// Evaluate a binary arithmetic operator.
pub fn binary(op: BinOp, l: &Value, r: &Value) -> Result<Value> {
    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    };

    // sequences first
    match (op, l, r) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            return Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            return Ok(Value::Tuple(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_i64().is_some() => {
            let times = repeat_count(s.len(), n)?;
            return Ok(Value::Str(s.repeat(times)));
        }
        (BinOp::Mul, Value::List(v), n) | (BinOp::Mul, n, Value::List(v)) if n.as_i64().is_some() => {
            let times = repeat_count(v.len(), n)?;
            let mut out = Vec::with_capacity(v.len() * times);
            for _ in 0..times {
                out.extend(v.iter().cloned());
            }
            return Ok(Value::List(out));
        }
        _ => {}
    }

    if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
        let overflow = || TemplateError::Eval(format!("integer overflow in {}", symbol));
        return match op {
            BinOp::Add => a.checked_add(b).map(Value::Int).ok_or_else(overflow),
            BinOp::Sub => a.checked_sub(b).map(Value::Int).ok_or_else(overflow),
            BinOp::Mul => a.checked_mul(b).map(Value::Int).ok_or_else(overflow),
            BinOp::Div => {
                if b == 0 {
                    Err(zero_division())
                } else {
                    Ok(Value::Float(a as f64 / b as f64))
                }
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return Err(zero_division());
                }
                let q = a.checked_div(b).ok_or_else(overflow)?;
                let r = a.checked_rem(b).ok_or_else(overflow)?;
                Ok(Value::Int(if r != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }))
            }
            BinOp::Mod => {
                if b == 0 {
                    return Err(zero_division());
                }
                // only i64::MIN % -1 fails, and that remainder is zero
                let r = a.checked_rem(b).unwrap_or(0);
                Ok(Value::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
            }
            BinOp::Pow => {
                if b >= 0 {
                    u32::try_from(b)
                        .ok()
                        .and_then(|exp| a.checked_pow(exp))
                        .map(Value::Int)
                        .ok_or_else(overflow)
                } else {
                    Ok(Value::Float((a as f64).powf(b as f64)))
                }
            }
        };
    }

    let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
        return Err(unsupported(symbol, l, r));
    };
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(zero_division());
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(zero_division());
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(zero_division());
            }
            a - b * (a / b).floor()
        }
        BinOp::Pow => a.powf(b),
    };
    Ok(Value::Float(result))
}

/// Evaluate a single comparison.
pub fn compare(op: CmpOp, l: &Value, r: &Value) -> Result<bool> {
    let ordered = |want: fn(Ordering) -> bool| -> Result<bool> {
        l.py_cmp(r).map(want).ok_or_else(|| {
            TemplateError::Eval(format!(
                "comparison not supported between '{}' and '{}'",
                l.type_name(),
                r.type_name()
            ))
        })
    };
    match op {
        CmpOp::Eq => Ok(l.py_eq(r)),
        CmpOp::NotEq => Ok(!l.py_eq(r)),
        CmpOp::Lt => ordered(|o| o == Ordering::Less),
        CmpOp::LtE => ordered(|o| o != Ordering::Greater),
        CmpOp::Gt => ordered(|o| o == Ordering::Greater),
        CmpOp::GtE => ordered(|o| o != Ordering::Less),
        CmpOp::In => contains(r, l),
        CmpOp::NotIn => contains(r, l).map(|hit| !hit),
    }
}

fn contains(container: &Value, needle: &Value) -> Result<bool> {
    match container {
        Value::Str(s) => Ok(s.contains(expect_str(needle)?)),
        Value::List(v) | Value::Tuple(v) | Value::Set(v) => Ok(v.iter().any(|x| x.py_eq(needle))),
        Value::Dict(d) => Ok(d.iter().any(|(k, _)| k.py_eq(needle))),
        other => Err(type_error("container", other)),
    }
}

// ── Indexing ───────────────────────────────────────────────────

fn sequence_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Str(_) | Value::List(_) | Value::Tuple(_) => value.iter_items(),
        _ => None,
    }
}

/// `value[index]`
pub fn subscript(value: &Value, index: &Value) -> Result<Value> {
    if let Value::Dict(pairs) = value {
        return pairs
            .iter()
            .find(|(k, _)| k.py_eq(index))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| TemplateError::MissingKey(index.to_py_str()));
    }
    let items = sequence_items(value).ok_or_else(|| type_error("subscriptable", value))?;
    let i = index.as_i64().ok_or_else(|| type_error("int", index))?;
    let len = items.len() as i64;
    let resolved = if i < 0 { i + len } else { i };
    if resolved < 0 || resolved >= len {
        return Err(TemplateError::Eval(format!(
            "{} index out of range",
            value.type_name()
        )));
    }
    Ok(items[resolved as usize].clone())
}

/// `value[start:stop:step]`
pub fn slice(
    value: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Value> {
    let items = sequence_items(value).ok_or_else(|| type_error("sliceable", value))?;
    let len = items.len() as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(TemplateError::Eval("slice step cannot be zero".into()));
    }

    let clamp = |bound: i64, low: i64, high: i64| {
        let b = if bound < 0 { bound + len } else { bound };
        b.clamp(low, high)
    };
    let picked: Vec<Value> = if step > 0 {
        let begin = start.map_or(0, |s| clamp(s, 0, len));
        let end = stop.map_or(len, |s| clamp(s, 0, len));
        let mut out = Vec::new();
        let mut i = begin;
        while i < end {
            out.push(items[i as usize].clone());
            i += step;
        }
        out
    } else {
        let begin = start.map_or(len - 1, |s| clamp(s, -1, len - 1));
        let end = stop.map_or(-1, |s| clamp(s, -1, len - 1));
        let mut out = Vec::new();
        let mut i = begin;
        while i > end {
            out.push(items[i as usize].clone());
            i += step;
        }
        out
    };

    Ok(match value {
        Value::Str(_) => Value::Str(picked.iter().map(Value::to_py_str).collect()),
        Value::Tuple(_) => Value::Tuple(picked),
        _ => Value::List(picked),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("mainPlate"), "Mainplate");
        assert_eq!(capitalize("hero"), "Hero");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_split_variants() {
        let out = call_method(&s("a_b_c"), "split", vec![s("_"), Value::Int(1)]).unwrap();
        assert_eq!(out.to_py_str(), "['a', 'b_c']");
        let out = call_method(&s("  a  b "), "split", vec![]).unwrap();
        assert_eq!(out.to_py_str(), "['a', 'b']");
    }

    #[test]
    fn test_format_method() {
        let out = call_method(&s("{}_{:0>3}"), "format", vec![s("sh"), Value::Int(7)]).unwrap();
        assert_eq!(out.to_py_str(), "sh_007");
        let out = call_method(&s("{1}-{0}"), "format", vec![s("a"), s("b")]).unwrap();
        assert_eq!(out.to_py_str(), "b-a");
    }

    #[test]
    fn test_strip_with_chars() {
        let out = call_method(&s("__x__"), "strip", vec![s("_")]).unwrap();
        assert_eq!(out.to_py_str(), "x");
        let out = call_method(&s("__x__"), "rstrip", vec![s("_")]).unwrap();
        assert_eq!(out.to_py_str(), "__x");
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(call_builtin("round", vec![Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(call_builtin("round", vec![Value::Float(3.5)]).unwrap(), Value::Int(4));
        assert_eq!(
            call_builtin("round", vec![Value::Float(1.2345), Value::Int(2)]).unwrap(),
            Value::Float(1.23)
        );
    }

    #[test]
    fn test_range_enumerate_zip() {
        assert_eq!(
            call_builtin("range", vec![Value::Int(0), Value::Int(6), Value::Int(2)])
                .unwrap()
                .to_py_str(),
            "[0, 2, 4]"
        );
        assert_eq!(
            call_builtin("enumerate", vec![s("ab")]).unwrap().to_py_str(),
            "[(0, 'a'), (1, 'b')]"
        );
        assert_eq!(
            call_builtin("zip", vec![s("ab"), Value::List(vec![Value::Int(1)])])
                .unwrap()
                .to_py_str(),
            "[('a', 1)]"
        );
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(call_builtin("int", vec![s(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(call_builtin("int", vec![s("ff"), Value::Int(16)]).unwrap(), Value::Int(255));
        assert_eq!(call_builtin("int", vec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert!(call_builtin("int", vec![s("x")]).is_err());
    }

    #[test]
    fn test_floor_semantics() {
        assert_eq!(binary(BinOp::FloorDiv, &Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(-4));
        assert_eq!(binary(BinOp::Mod, &Value::Int(7), &Value::Int(-3)).unwrap(), Value::Int(-2));
        assert!(binary(BinOp::Div, &Value::Int(1), &Value::Int(0)).is_err());
    }

    #[test]
    fn test_integer_edges_are_errors() {
        let min = Value::Int(i64::MIN);
        let neg_one = Value::Int(-1);
        assert!(matches!(
            binary(BinOp::FloorDiv, &min, &neg_one),
            Err(TemplateError::Eval(_))
        ));
        assert_eq!(binary(BinOp::Mod, &min, &neg_one).unwrap(), Value::Int(0));
        assert!(matches!(
            binary(BinOp::Pow, &Value::Int(2), &Value::Int(4_294_967_296)),
            Err(TemplateError::Eval(_))
        ));
        assert!(call_builtin("abs", vec![min]).is_err());
    }

    #[test]
    fn test_oversized_sequences_are_errors() {
        assert!(matches!(
            binary(BinOp::Mul, &s("a"), &Value::Int(i64::MAX)),
            Err(TemplateError::Eval(_))
        ));
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(binary(BinOp::Mul, &Value::Int(1 << 40), &list).is_err());
        assert!(call_builtin("range", vec![Value::Int(i64::MAX)]).is_err());
        let near_max = call_builtin(
            "range",
            vec![Value::Int(i64::MAX - 2), Value::Int(i64::MAX), Value::Int(5)],
        )
        .unwrap();
        assert_eq!(near_max, Value::List(vec![Value::Int(i64::MAX - 2)]));
        let big = binary(BinOp::Mul, &s("ab"), &Value::Int(1 << 18)).unwrap();
        assert!(call_method(&big, "replace", vec![s("a"), big.clone()]).is_err());
    }

    #[test]
    fn test_sequence_ops() {
        assert_eq!(binary(BinOp::Mul, &s("ab"), &Value::Int(2)).unwrap(), s("abab"));
        assert_eq!(binary(BinOp::Add, &s("a"), &s("b")).unwrap(), s("ab"));
        assert!(binary(BinOp::Add, &s("a"), &Value::Int(1)).is_err());
    }

    #[test]
    fn test_negative_index_and_slice() {
        assert_eq!(subscript(&s("abc"), &Value::Int(-1)).unwrap(), s("c"));
        assert!(subscript(&s("abc"), &Value::Int(3)).is_err());
        assert_eq!(slice(&s("abcdef"), Some(1), Some(-1), Some(2)).unwrap(), s("bd"));
        assert_eq!(slice(&s("abc"), None, None, Some(-1)).unwrap(), s("cba"));
    }

    #[test]
    fn test_set_dedup_and_sum() {
        let out = call_builtin("set", vec![Value::List(vec![Value::Int(1), Value::Int(1)])]).unwrap();
        assert_eq!(out.to_py_str(), "{1}");
        let out = call_builtin("sum", vec![Value::List(vec![Value::Int(1), Value::Float(0.5)])]).unwrap();
        assert_eq!(out, Value::Float(1.5));
    }
}
