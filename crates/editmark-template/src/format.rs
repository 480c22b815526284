//! Plain `{field:spec}` formatting.
//!
//! Implements the replacement-field grammar used by naming templates:
//! `{name}`, `{name[0]}`, `{name!r}`, `{name:0>3}`, with `{{`/`}}` escapes.
//! Format specs follow `[[fill]align][sign][#][0][width][,][.precision][type]`.

use crate::context::FormatContext;
use crate::error::{Result, TemplateError};
use crate::value::{float_repr, Value};

/// Largest width or precision a format spec may ask for.
pub const MAX_FORMAT_WIDTH: usize = 4096;

/// A parsed format spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatSpec {
    pub fill: Option<char>,
    pub align: Option<char>,
    pub sign: Option<char>,
    pub zero: bool,
    pub width: Option<usize>,
    pub grouping: Option<char>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl FormatSpec {
    /// Parse a spec string (the part after `:`).
    pub fn parse(spec: &str) -> Result<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut out = FormatSpec::default();
        let mut i = 0;

        let is_align = |c: char| matches!(c, '<' | '>' | '=' | '^');
        if chars.len() >= 2 && is_align(chars[1]) {
            out.fill = Some(chars[0]);
            out.align = Some(chars[1]);
            i = 2;
        } else if !chars.is_empty() && is_align(chars[0]) {
            out.align = Some(chars[0]);
            i = 1;
        }
        if i < chars.len() && matches!(chars[i], '+' | '-' | ' ') {
            out.sign = Some(chars[i]);
            i += 1;
        }
        if i < chars.len() && chars[i] == '#' {
            i += 1;
        }
        if i < chars.len() && chars[i] == '0' {
            out.zero = true;
            i += 1;
        }
        let width_start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i > width_start {
            out.width = Some(
                chars[width_start..i]
                    .iter()
                    .collect::<String>()
                    .parse()
                    .unwrap_or(usize::MAX),
            );
        }
        if i < chars.len() && matches!(chars[i], ',' | '_') {
            out.grouping = Some(chars[i]);
            i += 1;
        }
        if i < chars.len() && chars[i] == '.' {
            i += 1;
            let precision_start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i == precision_start {
                return Err(invalid(spec, "format specifier missing precision"));
            }
            out.precision = Some(
                chars[precision_start..i]
                    .iter()
                    .collect::<String>()
                    .parse()
                    .unwrap_or(usize::MAX),
            );
        }
        if i < chars.len() {
            out.kind = Some(chars[i]);
            i += 1;
        }
        if i != chars.len() {
            return Err(invalid(spec, "invalid format specifier"));
        }
        if out.width.into_iter().chain(out.precision).any(|n| n > MAX_FORMAT_WIDTH) {
            return Err(invalid(spec, "width or precision too large"));
        }
        Ok(out)
    }

    /// Render a value with this spec.
    pub fn apply(&self, value: &Value, raw_spec: &str) -> Result<String> {
        let (negative, body, numeric) = match value {
            Value::Str(s) => {
                if !matches!(self.kind, None | Some('s')) || self.sign.is_some() {
                    return Err(invalid(raw_spec, "str"));
                }
                let body = match self.precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s.clone(),
                };
                (false, body, false)
            }
            Value::Int(_) | Value::Bool(_) => {
                let i = value.as_i64().unwrap_or_default();
                self.render_int(i, raw_spec)?
            }
            Value::Float(f) => self.render_float(*f, raw_spec)?,
            other => {
                if *self != FormatSpec::default() {
                    return Err(invalid(raw_spec, other.type_name()));
                }
                (false, other.to_py_str(), false)
            }
        };

        let sign = match (negative, self.sign) {
            (true, _) => "-",
            (false, Some('+')) if numeric => "+",
            (false, Some(' ')) if numeric => " ",
            _ => "",
        };

        let width = self.width.unwrap_or(0);
        let len = sign.chars().count() + body.chars().count();
        if len >= width {
            return Ok(format!("{}{}", sign, body));
        }
        let pad = width - len;
        let fill = self.fill.unwrap_or(if self.zero { '0' } else { ' ' });
        let align = self.align.unwrap_or(if self.zero && numeric {
            '='
        } else if numeric {
            '>'
        } else {
            '<'
        });
        let padding = |n: usize| fill.to_string().repeat(n);
        Ok(match align {
            '<' => format!("{}{}{}", sign, body, padding(pad)),
            '^' => format!(
                "{}{}{}{}",
                padding(pad / 2),
                sign,
                body,
                padding(pad - pad / 2)
            ),
            '=' => format!("{}{}{}", sign, padding(pad), body),
            _ => format!("{}{}{}", padding(pad), sign, body),
        })
    }

    fn render_int(&self, i: i64, raw_spec: &str) -> Result<(bool, String, bool)> {
        let magnitude = i.unsigned_abs();
        let body = match self.kind {
            None | Some('d') | Some('n') => group(&magnitude.to_string(), self.grouping),
            Some('x') => format!("{:x}", magnitude),
            Some('X') => format!("{:X}", magnitude),
            Some('o') => format!("{:o}", magnitude),
            Some('b') => format!("{:b}", magnitude),
            Some('f') | Some('F') | Some('e') | Some('E') | Some('%') | Some('g') => {
                return self.render_float(i as f64, raw_spec)
            }
            Some(_) => return Err(invalid(raw_spec, "int")),
        };
        Ok((i < 0, body, true))
    }

    fn render_float(&self, f: f64, raw_spec: &str) -> Result<(bool, String, bool)> {
        let negative = f.is_sign_negative() && f != 0.0;
        let magnitude = f.abs();
        let body = match self.kind {
            None | Some('g') | Some('G') => match self.precision {
                Some(p) => trim_fixed(&format!("{:.*}", p, magnitude)),
                None => float_repr(magnitude),
            },
            Some('f') | Some('F') => {
                let fixed = format!("{:.*}", self.precision.unwrap_or(6), magnitude);
                group_fixed(&fixed, self.grouping)
            }
            Some('e') | Some('E') => {
                let sci = format!("{:.*e}", self.precision.unwrap_or(6), magnitude);
                let sci = match sci.split_once('e') {
                    Some((m, e)) => {
                        let (s, d) = match e.strip_prefix('-') {
                            Some(d) => ('-', d),
                            None => ('+', e),
                        };
                        format!("{}e{}{:0>2}", m, s, d)
                    }
                    None => sci,
                };
                if self.kind == Some('E') {
                    sci.to_uppercase()
                } else {
                    sci
                }
            }
            Some('%') => format!("{:.*}%", self.precision.unwrap_or(6), magnitude * 100.0),
            Some(_) => return Err(invalid(raw_spec, "float")),
        };
        Ok((negative, body, true))
    }
}

fn invalid(spec: &str, value: &str) -> TemplateError {
    TemplateError::InvalidFormatSpec {
        spec: spec.to_string(),
        value: value.to_string(),
    }
}

fn trim_fixed(fixed: &str) -> String {
    if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        fixed.to_string()
    }
}

fn group(digits: &str, separator: Option<char>) -> String {
    let Some(sep) = separator else {
        return digits.to_string();
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

fn group_fixed(fixed: &str, separator: Option<char>) -> String {
    match fixed.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group(int_part, separator), frac),
        None => group(fixed, separator),
    }
}

// ── Replacement fields ─────────────────────────────────────────

/// Resolve a field path like `name`, `name[0]` or `name[key]` against the
/// context. Attribute access (`name.attr`) is reported as
/// [`TemplateError::Attribute`] so the extended formatter can promote it to
/// an expression.
pub fn resolve_field(path: &str, ctx: &FormatContext) -> Result<Value> {
    let head_end = path.find(|c| c == '.' || c == '[').unwrap_or(path.len());
    let head = &path[..head_end];
    if head.is_empty() {
        return Err(TemplateError::Parse(format!(
            "positional field in '{{{}}}' is not supported",
            path
        )));
    }
    let mut current = ctx
        .get(head)
        .cloned()
        .ok_or_else(|| TemplateError::MissingKey(head.to_string()))?;

    let mut rest = &path[head_end..];
    while !rest.is_empty() {
        if rest.starts_with('.') {
            return Err(TemplateError::Attribute(path.to_string()));
        }
        let Some(close) = rest.find(']') else {
            return Err(TemplateError::Parse(format!(
                "missing ']' in field '{}'",
                path
            )));
        };
        let key = &rest[1..close];
        current = index_value(&current, key, path)?;
        rest = &rest[close + 1..];
    }
    Ok(current)
}

fn index_value(value: &Value, key: &str, path: &str) -> Result<Value> {
    if let Ok(index) = key.parse::<usize>() {
        let items = match value {
            Value::List(v) | Value::Tuple(v) => Some(v.clone()),
            Value::Str(_) => value.iter_items(),
            _ => None,
        };
        if let Some(items) = items {
            return items.get(index).cloned().ok_or_else(|| {
                TemplateError::Eval(format!("index {} out of range in '{}'", index, path))
            });
        }
    }
    match value {
        Value::Dict(pairs) => pairs
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| TemplateError::MissingKey(key.to_string())),
        other => Err(TemplateError::Type {
            expected: "subscriptable".into(),
            got: other.type_name().into(),
        }),
    }
}

fn find_outside_brackets(field: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in field.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == target && depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Format the inside of one replacement field, e.g. `shot:0>3`.
pub fn format_field(field: &str, ctx: &FormatContext) -> Result<String> {
    let spec_at = find_outside_brackets(field, ':');
    let conv_at = find_outside_brackets(field, '!').filter(|c| spec_at.map_or(true, |s| *c < s));
    let name_end = conv_at.or(spec_at).unwrap_or(field.len());
    let path = &field[..name_end];

    let mut value = resolve_field(path, ctx)?;
    if let Some(c) = conv_at {
        let conversion = &field[c + 1..spec_at.unwrap_or(field.len())];
        value = match conversion {
            "s" => Value::Str(value.to_py_str()),
            "r" | "a" => Value::Str(value.to_py_repr()),
            other => {
                return Err(TemplateError::Parse(format!(
                    "unknown conversion specifier {}",
                    other
                )))
            }
        };
    }

    let raw_spec = spec_at.map(|s| &field[s + 1..]).unwrap_or("");
    if raw_spec.is_empty() {
        return Ok(value.to_py_str());
    }
    FormatSpec::parse(raw_spec)?.apply(&value, raw_spec)
}

/// Strictly format a whole template. Every field must resolve; a missing
/// key fails with [`TemplateError::MissingKey`] naming it.
pub fn format_template(template: &str, ctx: &FormatContext) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let start = idx + 1;
                let mut end = None;
                for (j, inner) in chars.by_ref() {
                    if inner == '}' {
                        end = Some(j);
                        break;
                    }
                    if inner == '{' {
                        return Err(TemplateError::Parse(format!(
                            "nested replacement field in '{}'",
                            template
                        )));
                    }
                }
                let end = end.ok_or_else(|| {
                    TemplateError::Parse(format!("expected '}}' in '{}'", template))
                })?;
                out.push_str(&format_field(&template[start..end], ctx)?);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::Parse(format!(
                        "single '}}' encountered in '{}'",
                        template
                    )));
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
