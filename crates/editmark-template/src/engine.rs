//! Template resolution with literal fields and `{{ expr }}` expressions.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::context::FormatContext;
use crate::error::{Result, TemplateError};
use crate::expression::Expression;
use crate::format::format_field;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^{}]+\}").expect("valid token regex"))
}

fn single_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("valid token regex"))
}

fn format_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*:[0-9a-zA-Z#+\- .]+$").expect("valid format regex")
    })
}

fn expression_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]+)\s*\}\}").expect("valid expression regex"))
}

/// Substitute every single-brace token the context can resolve. Tokens that
/// need attribute access, or name keys the context lacks, are left in place.
fn substitute_literals(template: &str, ctx: &FormatContext) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for m in token_regex().find_iter(template) {
        let inside_expression =
            template[..m.start()].ends_with('{') && template[m.end()..].starts_with('}');
        if inside_expression {
            continue;
        }
        let field = &m.as_str()[1..m.as_str().len() - 1];
        match format_field(field, ctx) {
            Ok(formatted) => {
                out.push_str(&template[last..m.start()]);
                out.push_str(&formatted);
                last = m.end();
            }
            Err(e @ TemplateError::InvalidFormatSpec { .. }) => return Err(e),
            Err(_) => continue,
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Rewrite leftover `{a.b}` / `{a[0]}` tokens as `{{ a.b }}` so the
/// expression pass picks them up. `{name:spec}` tokens are never promoted.
fn promote_expression_tokens(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for m in single_token_regex().find_iter(template) {
        let body = &m.as_str()[1..m.as_str().len() - 1];
        let closes_double = template[m.end()..].starts_with('}');
        if closes_double
            || !(body.contains('.') || body.contains('['))
            || format_token_regex().is_match(body)
        {
            continue;
        }
        out.push_str(&template[last..m.start()]);
        out.push_str("{{ ");
        out.push_str(body);
        out.push_str(" }}");
        last = m.end();
    }
    out.push_str(&template[last..]);
    out
}

/// Evaluate every `{{ expr }}` block against the context.
pub fn format_expression_string(template: &str, ctx: &FormatContext) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in expression_regex().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let src = &whole.as_str()[2..whole.as_str().len() - 2];
        let rendered = Expression::compile(src)?.evaluate_to_string(ctx)?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&rendered);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Format a template with literal substitution first, then expression
/// evaluation. Unresolvable literal tokens are left untouched.
pub fn extended_format(template: &str, ctx: &FormatContext) -> Result<String> {
    let substituted = substitute_literals(template, ctx)?;
    let promoted = promote_expression_tokens(&substituted);
    debug!(template, promoted = %promoted, "formatted string before expression evaluation");
    format_expression_string(&promoted, ctx)
}

/// Extended formatting that also requires every plain token to resolve.
///
/// A token left over after both passes fails with
/// [`TemplateError::MissingKey`] naming the missing key.
pub fn resolve_template(template: &str, ctx: &FormatContext) -> Result<String> {
    let missing = token_regex()
        .find_iter(template)
        .filter(|m| {
            !template[..m.start()].ends_with('{') && !template[m.end()..].starts_with('}')
        })
        .find_map(|m| unresolved_key(&m.as_str()[1..m.as_str().len() - 1], ctx));
    if let Some(key) = missing {
        return Err(TemplateError::MissingKey(key));
    }
    extended_format(template, ctx)
}

/// Key named by a plain `{key...}` token when the context does not hold it.
fn unresolved_key(body: &str, ctx: &FormatContext) -> Option<String> {
    let end = body
        .find(|c: char| matches!(c, ':' | '!' | '.' | '['))
        .unwrap_or(body.len());
    let key = &body[..end];
    let is_identifier = key
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_alphanumeric() || c == '_');
    (is_identifier && !ctx.contains_key(key)).then(|| key.to_string())
}

/// Statically check a template: every `{{ expr }}` block must parse and
/// pass the allow-list.
pub fn validate_template(template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(TemplateError::Parse("empty template".into()));
    }
    for caps in expression_regex().captures_iter(template) {
        if let Some(whole) = caps.get(0) {
            Expression::compile(&whole.as_str()[2..whole.as_str().len() - 2])?;
        }
    }
    Ok(())
}
