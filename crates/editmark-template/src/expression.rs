//! Expression compilation and evaluation.
//!
//! A small interpreter for the `{{ expr }}` blocks of extended templates.
//! Supported: literals, context names, allow-listed method calls on values,
//! allow-listed builtin calls, subscripts and slices, arithmetic,
//! comparisons, `and`/`or`/`not`, `in` and conditional expressions.
//! Lambdas, comprehensions, imports and keyword arguments are rejected at
//! parse time; attribute and call targets are checked by [`Expression::validate`]
//! before anything runs.

use crate::builtins::{self, ALLOWED_ATTRIBUTES, ALLOWED_BUILTINS};
use crate::context::FormatContext;
use crate::error::{Result, TemplateError};
use crate::value::Value;

// ── Tokens ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Op(&'static str),
}

const OPERATORS: &[&str] = &[
    "**", "//", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "(", ")", "[", "]",
    ",", ".", ":",
];

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let start = i;
            let mut is_float = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '_') {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                is_float = true;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                is_float = true;
                i += 1;
                if i < chars.len() && matches!(chars[i], '+' | '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().filter(|c| **c != '_').collect();
            let token = if is_float {
                Token::Float(text.parse().map_err(|_| {
                    TemplateError::Parse(format!("invalid number literal '{}'", text))
                })?)
            } else {
                Token::Int(text.parse().map_err(|_| {
                    TemplateError::Parse(format!("invalid number literal '{}'", text))
                })?)
            };
            tokens.push(token);
            continue;
        }
        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            let mut text = String::new();
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(TemplateError::Parse(format!(
                        "unterminated string literal in '{}'",
                        src
                    )));
                };
                i += 1;
                if ch == quote {
                    break;
                }
                if ch == '\\' {
                    let escaped = chars.get(i).copied().ok_or_else(|| {
                        TemplateError::Parse(format!("dangling escape in '{}'", src))
                    })?;
                    i += 1;
                    text.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                } else {
                    text.push(ch);
                }
            }
            tokens.push(Token::Str(text));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Name(chars[start..i].iter().collect()));
            continue;
        }
        let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(&op) => {
                tokens.push(Token::Op(op));
                i += op.chars().count();
            }
            None if c == '=' => {
                return Err(TemplateError::Disallowed(format!(
                    "assignment or keyword arguments in '{}'",
                    src
                )))
            }
            None => {
                return Err(TemplateError::Parse(format!(
                    "unexpected character '{}' in '{}'",
                    c, src
                )))
            }
        }
    }
    Ok(tokens)
}

// ── Syntax tree ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        value: Box<Expr>,
        start: Option<Box<Expr>>,
        stop: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        ops: Vec<(CmpOp, Expr)>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    IfElse {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
}

// ── Parser ─────────────────────────────────────────────────────

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    src: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(o)) if *o == op)
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", op)))
        }
    }

    fn error(&self, msg: &str) -> TemplateError {
        TemplateError::Parse(format!("{} in '{}'", msg, self.src))
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        if self.at_keyword("lambda") {
            return Err(TemplateError::Disallowed(format!("lambda in '{}'", self.src)));
        }
        let body = self.parse_or()?;
        if self.at_keyword("if") {
            self.pos += 1;
            let test = self.parse_or()?;
            if !self.at_keyword("else") {
                return Err(self.error("expected 'else'"));
            }
            self.pos += 1;
            let orelse = self.parse_expression()?;
            return Ok(Expr::IfElse {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            });
        }
        Ok(body)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.at_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.at_keyword("and") {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.at_keyword("not") {
            self.pos += 1;
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.peek()? {
            Token::Op("==") => CmpOp::Eq,
            Token::Op("!=") => CmpOp::NotEq,
            Token::Op("<") => CmpOp::Lt,
            Token::Op("<=") => CmpOp::LtE,
            Token::Op(">") => CmpOp::Gt,
            Token::Op(">=") => CmpOp::GtE,
            Token::Name(n) if n == "in" => CmpOp::In,
            Token::Name(n) if n == "not" => {
                if matches!(self.tokens.get(self.pos + 1), Some(Token::Name(m)) if m == "in") {
                    self.pos += 1;
                    CmpOp::NotIn
                } else {
                    return None;
                }
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        let mut ops = Vec::new();
        while let Some(op) = self.comparison_op() {
            ops.push((op, self.parse_additive()?));
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                ops,
            })
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat_op("+") {
                BinOp::Add
            } else if self.eat_op("-") {
                BinOp::Sub
            } else {
                break;
            };
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_op("*") {
                BinOp::Mul
            } else if self.eat_op("//") {
                BinOp::FloorDiv
            } else if self.eat_op("/") {
                BinOp::Div
            } else if self.eat_op("%") {
                BinOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = if self.eat_op("-") {
            UnaryOp::Neg
        } else if self.eat_op("+") {
            UnaryOp::Pos
        } else {
            return self.parse_power();
        };
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_postfix()?;
        if self.eat_op("**") {
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op(".") {
                match self.next() {
                    Some(Token::Name(attr)) => {
                        expr = Expr::Attribute {
                            value: Box::new(expr),
                            attr,
                        }
                    }
                    _ => return Err(self.error("expected attribute name")),
                }
            } else if self.eat_op("(") {
                let args = self.parse_sequence(")")?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.eat_op("[") {
                expr = self.parse_subscript(expr)?;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_subscript(&mut self, value: Expr) -> Result<Expr> {
        let start = if self.at_op(":") {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        if self.eat_op("]") {
            let index = start.ok_or_else(|| self.error("empty subscript"))?;
            return Ok(Expr::Subscript {
                value: Box::new(value),
                index,
            });
        }
        self.expect_op(":")?;
        let stop = if self.at_op(":") || self.at_op("]") {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        let step = if self.eat_op(":") && !self.at_op("]") {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.expect_op("]")?;
        Ok(Expr::Slice {
            value: Box::new(value),
            start,
            stop,
            step,
        })
    }

    /// Comma separated expressions up to `close`. Comprehensions are
    /// rejected here since `for` can only appear inside brackets.
    fn parse_sequence(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.at_op(close) {
            items.push(self.parse_expression()?);
            if self.at_keyword("for") {
                return Err(TemplateError::Disallowed(format!(
                    "comprehension in '{}'",
                    self.src
                )));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(close)?;
        Ok(items)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(mut s)) => {
                // adjacent literals concatenate
                while let Some(Token::Str(next)) = self.peek() {
                    s.push_str(next);
                    self.pos += 1;
                }
                Ok(Expr::Literal(Value::Str(s)))
            }
            Some(Token::Name(name)) => match name.as_str() {
                "True" => Ok(Expr::Literal(Value::Bool(true))),
                "False" => Ok(Expr::Literal(Value::Bool(false))),
                "None" => Ok(Expr::Literal(Value::None)),
                "import" | "lambda" | "for" | "yield" | "await" | "del" | "global" | "class"
                | "def" | "from" => Err(TemplateError::Disallowed(format!(
                    "'{}' in '{}'",
                    name, self.src
                ))),
                _ => Ok(Expr::Name(name)),
            },
            Some(Token::Op("(")) => {
                if self.eat_op(")") {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.parse_expression()?;
                if self.at_keyword("for") {
                    return Err(TemplateError::Disallowed(format!(
                        "generator expression in '{}'",
                        self.src
                    )));
                }
                if self.eat_op(")") {
                    return Ok(first);
                }
                self.expect_op(",")?;
                let mut items = vec![first];
                items.extend(self.parse_sequence(")")?);
                Ok(Expr::Tuple(items))
            }
            Some(Token::Op("[")) => Ok(Expr::List(self.parse_sequence("]")?)),
            Some(token) => Err(self.error(&format!("unexpected token {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

// ── Compiled expression ────────────────────────────────────────

/// A compiled expression that can be evaluated with a context.
#[derive(Debug, Clone)]
pub struct Expression {
    pub source: String,
    ast: Expr,
}

impl Expression {
    /// Parse an expression from source code.
    pub fn parse(source: &str) -> Result<Self> {
        let src = source.trim();
        if src.is_empty() {
            return Err(TemplateError::Parse("empty expression".into()));
        }
        let mut parser = Parser {
            tokens: tokenize(src)?,
            pos: 0,
            src,
        };
        let ast = parser.parse_expression()?;
        if parser.pos < parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(Self {
            source: src.to_string(),
            ast,
        })
    }

    /// Parse and statically validate in one step.
    pub fn compile(source: &str) -> Result<Self> {
        let expr = Self::parse(source)?;
        expr.validate()?;
        Ok(expr)
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Check every attribute and call target against the allow-lists.
    pub fn validate(&self) -> Result<()> {
        validate_node(&self.ast, &self.source)
    }

    /// Check if the expression would pass validation.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validate then evaluate the expression.
    pub fn evaluate(&self, ctx: &FormatContext) -> Result<Value> {
        self.validate()?;
        eval(&self.ast, ctx)
    }

    /// Evaluate and render the result with `str()` semantics.
    pub fn evaluate_to_string(&self, ctx: &FormatContext) -> Result<String> {
        Ok(self.evaluate(ctx)?.to_py_str())
    }
}

fn validate_node(expr: &Expr, src: &str) -> Result<()> {
    let disallowed =
        |what: String| -> Result<()> { Err(TemplateError::Disallowed(format!("{} in '{}'", what, src))) };
    match expr {
        Expr::Literal(_) | Expr::Name(_) => Ok(()),
        Expr::List(items) | Expr::Tuple(items) => {
            items.iter().try_for_each(|item| validate_node(item, src))
        }
        Expr::Attribute { value, attr } => {
            if !ALLOWED_ATTRIBUTES.contains(&attr.as_str()) {
                return disallowed(format!("attribute '{}'", attr));
            }
            validate_node(value, src)
        }
        Expr::Call { func, args } => {
            match func.as_ref() {
                Expr::Name(name) if !ALLOWED_BUILTINS.contains(&name.as_str()) => {
                    return disallowed(format!("call to '{}'", name));
                }
                Expr::Name(_) | Expr::Attribute { .. } => {}
                _ => return disallowed("complex call target".to_string()),
            }
            validate_node(func, src)?;
            args.iter().try_for_each(|arg| validate_node(arg, src))
        }
        Expr::Subscript { value, index } => {
            validate_node(value, src)?;
            validate_node(index, src)
        }
        Expr::Slice {
            value,
            start,
            stop,
            step,
        } => {
            validate_node(value, src)?;
            for part in [start, stop, step].into_iter().flatten() {
                validate_node(part, src)?;
            }
            Ok(())
        }
        Expr::Unary { operand, .. } => validate_node(operand, src),
        Expr::Binary { left, right, .. } | Expr::And(left, right) | Expr::Or(left, right) => {
            validate_node(left, src)?;
            validate_node(right, src)
        }
        Expr::Compare { left, ops } => {
            validate_node(left, src)?;
            ops.iter().try_for_each(|(_, e)| validate_node(e, src))
        }
        Expr::IfElse { test, body, orelse } => {
            validate_node(test, src)?;
            validate_node(body, src)?;
            validate_node(orelse, src)
        }
    }
}

// ── Evaluation ─────────────────────────────────────────────────

fn eval(expr: &Expr, ctx: &FormatContext) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Name(name) => match ctx.get(name) {
            Some(v) => Ok(v.clone()),
            None if ALLOWED_BUILTINS.contains(&name.as_str()) => Err(TemplateError::Eval(format!(
                "builtin '{}' must be called",
                name
            ))),
            None => Err(TemplateError::Undefined(name.clone())),
        },
        Expr::List(items) => Ok(Value::List(eval_all(items, ctx)?)),
        Expr::Tuple(items) => Ok(Value::Tuple(eval_all(items, ctx)?)),
        Expr::Attribute { attr, .. } => Err(TemplateError::Eval(format!(
            "method '{}' must be called",
            attr
        ))),
        Expr::Call { func, args } => {
            let args = eval_all(args, ctx)?;
            match func.as_ref() {
                Expr::Name(name) => {
                    if let Some(local) = ctx.get(name) {
                        return Err(TemplateError::Type {
                            expected: "callable".into(),
                            got: local.type_name().into(),
                        });
                    }
                    builtins::call_builtin(name, args)
                }
                Expr::Attribute { value, attr } => {
                    let receiver = eval(value, ctx)?;
                    builtins::call_method(&receiver, attr, args)
                }
                _ => Err(TemplateError::Disallowed("complex call target".into())),
            }
        }
        Expr::Subscript { value, index } => {
            let value = eval(value, ctx)?;
            let index = eval(index, ctx)?;
            builtins::subscript(&value, &index)
        }
        Expr::Slice {
            value,
            start,
            stop,
            step,
        } => {
            let value = eval(value, ctx)?;
            let bound = |part: &Option<Box<Expr>>| -> Result<Option<i64>> {
                match part {
                    None => Ok(None),
                    Some(e) => match eval(e, ctx)? {
                        Value::None => Ok(None),
                        v => v.as_i64().map(Some).ok_or_else(|| TemplateError::Type {
                            expected: "int".into(),
                            got: v.type_name().into(),
                        }),
                    },
                }
            };
            builtins::slice(&value, bound(start)?, bound(stop)?, bound(step)?)
        }
        Expr::Unary { op, operand } => {
            let v = eval(operand, ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
                UnaryOp::Pos => match v {
                    Value::Int(_) | Value::Float(_) => Ok(v),
                    Value::Bool(b) => Ok(Value::Int(b as i64)),
                    other => Err(unary_type_error("+", &other)),
                },
                UnaryOp::Neg => match v {
                    Value::Int(i) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| TemplateError::Eval("integer overflow in -".into())),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    Value::Bool(b) => Ok(Value::Int(-(b as i64))),
                    other => Err(unary_type_error("-", &other)),
                },
            }
        }
        Expr::Binary { op, left, right } => {
            let l = eval(left, ctx)?;
            let r = eval(right, ctx)?;
            builtins::binary(*op, &l, &r)
        }
        Expr::Compare { left, ops } => {
            let mut current = eval(left, ctx)?;
            for (op, rhs) in ops {
                let next = eval(rhs, ctx)?;
                if !builtins::compare(*op, &current, &next)? {
                    return Ok(Value::Bool(false));
                }
                current = next;
            }
            Ok(Value::Bool(true))
        }
        Expr::And(left, right) => {
            let l = eval(left, ctx)?;
            if !l.is_truthy() {
                return Ok(l);
            }
            eval(right, ctx)
        }
        Expr::Or(left, right) => {
            let l = eval(left, ctx)?;
            if l.is_truthy() {
                return Ok(l);
            }
            eval(right, ctx)
        }
        Expr::IfElse { test, body, orelse } => {
            if eval(test, ctx)?.is_truthy() {
                eval(body, ctx)
            } else {
                eval(orelse, ctx)
            }
        }
    }
}

fn eval_all(items: &[Expr], ctx: &FormatContext) -> Result<Vec<Value>> {
    items.iter().map(|item| eval(item, ctx)).collect()
}

fn unary_type_error(op: &str, v: &Value) -> TemplateError {
    TemplateError::Eval(format!("bad operand type for unary {}: '{}'", op, v.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FormatContext {
        FormatContext::new()
            .with("_track_", "main_plate")
            .with("_clip_", "Shot 010")
            .with("shot", 10)
            .with("parts", Value::List(vec!["a".into(), "b".into(), "c".into()]))
    }

    fn eval_str(src: &str) -> String {
        Expression::compile(src)
            .unwrap()
            .evaluate_to_string(&ctx())
            .unwrap()
    }

    #[test]
    fn test_method_calls() {
        assert_eq!(eval_str("_track_.upper()"), "MAIN_PLATE");
        assert_eq!(eval_str("_track_.split('_')[0]"), "main");
        assert_eq!(eval_str("_clip_.replace(' ', '_').lower()"), "shot_010");
        assert_eq!(eval_str("'-'.join(parts)"), "a-b-c");
    }

    #[test]
    fn test_arithmetic_and_builtins() {
        assert_eq!(eval_str("shot * 10 + 1"), "101");
        assert_eq!(eval_str("shot / 4"), "2.5");
        assert_eq!(eval_str("shot // 3"), "3");
        assert_eq!(eval_str("-7 % 3"), "2");
        assert_eq!(eval_str("len(parts)"), "3");
        assert_eq!(eval_str("str(shot) + 'x'"), "10x");
        assert_eq!(eval_str("max(shot, 3, 42)"), "42");
        assert_eq!(eval_str("2 ** 3"), "8");
    }

    #[test]
    fn test_slices_and_conditionals() {
        assert_eq!(eval_str("_track_[:4]"), "main");
        assert_eq!(eval_str("_track_[::-1]"), "etalp_niam");
        assert_eq!(eval_str("'yes' if shot > 5 else 'no'"), "yes");
        assert_eq!(eval_str("'b' in parts and not shot == 3"), "True");
        assert_eq!(eval_str("1 < shot <= 10"), "True");
    }

    #[test]
    fn test_result_rendering() {
        assert_eq!(eval_str("parts[:2]"), "['a', 'b']");
        assert_eq!(eval_str("(shot,)"), "(10,)");
        assert_eq!(eval_str("None"), "None");
    }

    #[test]
    fn test_disallowed_attribute() {
        let expr = Expression::parse("_track_.__class__").unwrap();
        assert!(matches!(expr.validate(), Err(TemplateError::Disallowed(_))));
    }

    #[test]
    fn test_disallowed_builtin() {
        let expr = Expression::parse("open('x')").unwrap();
        assert!(matches!(expr.validate(), Err(TemplateError::Disallowed(_))));
        assert!(!expr.is_valid());
    }

    #[test]
    fn test_disallowed_syntax() {
        assert!(matches!(
            Expression::parse("[x for x in parts]"),
            Err(TemplateError::Disallowed(_))
        ));
        assert!(matches!(
            Expression::parse("lambda: 1"),
            Err(TemplateError::Disallowed(_))
        ));
        assert!(matches!(
            Expression::parse("__import__('os')").map(|e| e.validate()),
            Ok(Err(TemplateError::Disallowed(_)))
        ));
        assert!(matches!(
            Expression::parse("str(x=1)"),
            Err(TemplateError::Disallowed(_))
        ));
    }

    #[test]
    fn test_complex_call_target_rejected() {
        let expr = Expression::parse("parts[0]()").unwrap();
        assert!(matches!(expr.validate(), Err(TemplateError::Disallowed(_))));
    }

    #[test]
    fn test_undefined_name() {
        let expr = Expression::compile("missing.upper()").unwrap();
        assert!(matches!(
            expr.evaluate(&ctx()),
            Err(TemplateError::Undefined(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expression::parse("").is_err());
        assert!(Expression::parse("(1 + ").is_err());
        assert!(Expression::parse("'open").is_err());
        assert!(Expression::parse("1 2").is_err());
    }
}
