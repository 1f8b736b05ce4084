// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tree-walking interpreter for parsed build scripts.
//!
//! Evaluation is synchronous and never suspends. Quotas are enforced at loop
//! back-edges: aggregate iteration count, per-`range` size, and the wall-clock
//! deadline. Numeric semantics follow the source language: `/` always yields a
//! float, `//` floors, `%` takes the sign of the divisor.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use super::parser::{
    BinOp, BoolOp, CmpOp, Expr, ExprKind, FsPart, Program, Stmt, StmtKind, Target, UnaryOp,
};
use super::{Limits, SandboxError};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    List(Rc<RefCell<Vec<Value>>>),
    Range(i64, i64, i64),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bool(_) => "bool",
            Self::None => "None",
            Self::List(_) => "list",
            Self::Range(..) => "range",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Str(value) => !value.is_empty(),
            Self::Bool(value) => *value,
            Self::None => false,
            Self::List(items) => !items.borrow().is_empty(),
            Self::Range(start, stop, step) => range_len(*start, *stop, *step) > 0,
        }
    }
}

fn range_len(start: i64, stop: i64, step: i64) -> i64 {
    if step > 0 && stop > start {
        (stop - start + step - 1) / step
    } else if step < 0 && stop < start {
        (start - stop + (-step) - 1) / (-step)
    } else {
        0
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
}

pub(super) fn run(
    program: &Program,
    limits: &Limits,
    deadline: Instant,
) -> Result<HashMap<String, Value>, SandboxError> {
    let mut interp = Interp {
        env: HashMap::new(),
        iterations: 0,
        limits,
        deadline,
    };
    interp.exec_block(&program.body)?;
    Ok(interp.env)
}

struct Interp<'a> {
    env: HashMap<String, Value>,
    iterations: u64,
    limits: &'a Limits,
    deadline: Instant,
}

impl Interp<'_> {
    fn runtime(&self, line: usize, message: impl Into<String>) -> SandboxError {
        SandboxError::Runtime {
            line,
            message: message.into(),
        }
    }

    fn check_deadline(&self) -> Result<(), SandboxError> {
        if Instant::now() > self.deadline {
            return Err(SandboxError::Timeout {
                limit: self.limits.timeout,
            });
        }
        Ok(())
    }

    fn charge_iteration(&mut self) -> Result<(), SandboxError> {
        self.iterations += 1;
        if self.iterations > self.limits.max_iterations {
            return Err(SandboxError::IterationBudgetExceeded {
                max: self.limits.max_iterations,
            });
        }
        Ok(())
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> Result<Flow, SandboxError> {
        for statement in statements {
            match self.exec_statement(statement)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, statement: &Stmt) -> Result<Flow, SandboxError> {
        self.check_deadline()?;
        let line = statement.line;
        match &statement.kind {
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value, line)?;
                Ok(Flow::Normal)
            }
            StmtKind::AugAssign { target, op, value } => {
                let current = self.read_target(target, line)?;
                let rhs = self.eval(value)?;
                let combined = self.binary(*op, current, rhs, line)?;
                self.assign(target, combined, line)?;
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::For {
                targets,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable)?;
                let items = self.iterate(iterable, line)?;
                for item in items {
                    self.charge_iteration()?;
                    self.check_deadline()?;
                    self.bind_loop_targets(targets, item, line)?;
                    match self.exec_block(body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::If { branches, orelse } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.truthy() {
                        return self.exec_block(body);
                    }
                }
                self.exec_block(orelse)
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
        }
    }

    fn iterate(&mut self, value: Value, line: usize) -> Result<Vec<Value>, SandboxError> {
        match value {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Range(start, stop, step) => {
                let mut items = Vec::new();
                let mut current = start;
                if step > 0 {
                    while current < stop {
                        items.push(Value::Int(current));
                        current += step;
                    }
                } else {
                    while current > stop {
                        items.push(Value::Int(current));
                        current += step;
                    }
                }
                Ok(items)
            }
            Value::Str(text) => {
                Ok(text.chars().map(|ch| Value::Str(ch.to_string())).collect())
            }
            other => Err(self.runtime(
                line,
                format!("cannot iterate over {}", other.type_name()),
            )),
        }
    }

    fn bind_loop_targets(
        &mut self,
        targets: &[String],
        item: Value,
        line: usize,
    ) -> Result<(), SandboxError> {
        if targets.len() == 1 {
            self.env.insert(targets[0].clone(), item);
            return Ok(());
        }
        let Value::List(items) = &item else {
            return Err(self.runtime(
                line,
                format!("cannot unpack {} into {} names", item.type_name(), targets.len()),
            ));
        };
        let items = items.borrow();
        if items.len() != targets.len() {
            return Err(self.runtime(
                line,
                format!("cannot unpack {} values into {} names", items.len(), targets.len()),
            ));
        }
        for (name, value) in targets.iter().zip(items.iter()) {
            self.env.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    fn assign(&mut self, target: &Target, value: Value, line: usize) -> Result<(), SandboxError> {
        match target {
            Target::Name(name) => {
                self.env.insert(name.clone(), value);
                Ok(())
            }
            Target::Index { target, index } => {
                let container = self.eval(target)?;
                let index = self.eval(index)?;
                let Value::List(items) = &container else {
                    return Err(self.runtime(
                        line,
                        format!("cannot index-assign into {}", container.type_name()),
                    ));
                };
                let length = items.borrow().len();
                let position = self.resolve_index(&index, length, line)?;
                items.borrow_mut()[position] = value;
                Ok(())
            }
        }
    }

    fn read_target(&mut self, target: &Target, line: usize) -> Result<Value, SandboxError> {
        match target {
            Target::Name(name) => self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| self.runtime(line, format!("name {name:?} is not defined"))),
            Target::Index { target, index } => {
                let container = self.eval(target)?;
                let index = self.eval(index)?;
                self.index_value(&container, &index, line)
            }
        }
    }

    fn resolve_index(
        &self,
        index: &Value,
        length: usize,
        line: usize,
    ) -> Result<usize, SandboxError> {
        let Value::Int(raw) = index else {
            return Err(self.runtime(
                line,
                format!("list index must be an int, found {}", index.type_name()),
            ));
        };
        let length = length as i64;
        let resolved = if *raw < 0 { raw + length } else { *raw };
        if resolved < 0 || resolved >= length {
            return Err(self.runtime(line, format!("list index {raw} out of range")));
        }
        Ok(resolved as usize)
    }

    fn index_value(
        &self,
        container: &Value,
        index: &Value,
        line: usize,
    ) -> Result<Value, SandboxError> {
        match container {
            Value::List(items) => {
                let items = items.borrow();
                let position = self.resolve_index(index, items.len(), line)?;
                Ok(items[position].clone())
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let position = self.resolve_index(index, chars.len(), line)?;
                Ok(Value::Str(chars[position].to_string()))
            }
            other => Err(self.runtime(
                line,
                format!("{} is not indexable", other.type_name()),
            )),
        }
    }

    // ---- expression evaluation -----------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Value, SandboxError> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Str(value) => Ok(Value::Str(value.clone())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::NoneLiteral => Ok(Value::None),
            ExprKind::Name(name) => self.lookup(name, line),
            ExprKind::List(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            ExprKind::FString(parts) => self.eval_fstring(parts, line),
            ExprKind::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(value)) => Ok(Value::Int(-value)),
                    (UnaryOp::Neg, Value::Float(value)) => Ok(Value::Float(-value)),
                    (UnaryOp::Pos, value @ (Value::Int(_) | Value::Float(_))) => Ok(value),
                    (_, other) => Err(self.runtime(
                        line,
                        format!("bad operand type for unary op: {}", other.type_name()),
                    )),
                }
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*op, left, right, line)
            }
            ExprKind::BoolChain { op, values } => {
                match op {
                    BoolOp::And => {
                        let mut last = Value::Bool(true);
                        for value in values {
                            last = self.eval(value)?;
                            if !last.truthy() {
                                return Ok(last);
                            }
                        }
                        Ok(last)
                    }
                    BoolOp::Or => {
                        let mut last = Value::Bool(false);
                        for value in values {
                            last = self.eval(value)?;
                            if last.truthy() {
                                return Ok(last);
                            }
                        }
                        Ok(last)
                    }
                }
            }
            ExprKind::Not(operand) => Ok(Value::Bool(!self.eval(operand)?.truthy())),
            ExprKind::Compare { left, rest } => {
                let mut previous = self.eval(left)?;
                for (op, right) in rest {
                    let current = self.eval(right)?;
                    if !self.compare(*op, &previous, &current, line)? {
                        return Ok(Value::Bool(false));
                    }
                    previous = current;
                }
                Ok(Value::Bool(true))
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            ExprKind::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_builtin(function, args, line)
            }
            ExprKind::MethodCall {
                target,
                method,
                args,
            } => {
                let target = self.eval(target)?;
                let Value::List(items) = &target else {
                    return Err(self.runtime(
                        line,
                        format!(".{method}() is only available on lists"),
                    ));
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match method.as_str() {
                    "append" => {
                        if args.len() != 1 {
                            return Err(
                                self.runtime(line, "append() takes exactly one argument")
                            );
                        }
                        items.borrow_mut().push(args.into_iter().next().unwrap_or(Value::None));
                        Ok(Value::None)
                    }
                    "extend" => {
                        if args.len() != 1 {
                            return Err(
                                self.runtime(line, "extend() takes exactly one argument")
                            );
                        }
                        let argument = args.into_iter().next().unwrap_or(Value::None);
                        let extension = self.iterate(argument, line)?;
                        items.borrow_mut().extend(extension);
                        Ok(Value::None)
                    }
                    other => Err(self.runtime(line, format!("unknown list method {other:?}"))),
                }
            }
            ExprKind::Index { target, index } => {
                let container = self.eval(target)?;
                let index = self.eval(index)?;
                self.index_value(&container, &index, line)
            }
        }
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value, SandboxError> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        match name {
            "pi" => Ok(Value::Float(std::f64::consts::PI)),
            "e" => Ok(Value::Float(std::f64::consts::E)),
            _ => Err(self.runtime(line, format!("name {name:?} is not defined"))),
        }
    }

    fn eval_fstring(&mut self, parts: &[FsPart], line: usize) -> Result<Value, SandboxError> {
        let mut output = String::new();
        for part in parts {
            match part {
                FsPart::Literal(text) => output.push_str(text),
                FsPart::Expression { expr, spec } => {
                    let value = self.eval(expr)?;
                    output.push_str(&self.format_value(&value, spec.as_deref(), line)?);
                }
            }
        }
        Ok(Value::Str(output))
    }

    fn format_value(
        &self,
        value: &Value,
        spec: Option<&str>,
        line: usize,
    ) -> Result<String, SandboxError> {
        let Some(spec) = spec else {
            return Ok(display_value(value));
        };

        // Only the `.Nf` precision spec is supported.
        let spec = spec.trim();
        if let Some(precision) = spec
            .strip_prefix('.')
            .and_then(|rest| rest.strip_suffix('f'))
            .and_then(|digits| digits.parse::<usize>().ok())
        {
            let number = match value {
                Value::Int(value) => *value as f64,
                Value::Float(value) => *value,
                other => {
                    return Err(self.runtime(
                        line,
                        format!("cannot apply float format to {}", other.type_name()),
                    ));
                }
            };
            return Ok(format!("{number:.precision$}"));
        }

        Err(self.runtime(line, format!("unsupported format spec {spec:?}")))
    }

    fn binary(
        &self,
        op: BinOp,
        left: Value,
        right: Value,
        line: usize,
    ) -> Result<Value, SandboxError> {
        use Value::{Float, Int, Str};

        match (op, &left, &right) {
            (BinOp::Add, Str(a), Str(b)) => return Ok(Str(format!("{a}{b}"))),
            (BinOp::Add, Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                return Ok(Value::list(items));
            }
            (BinOp::Mul, Str(text), Int(count)) | (BinOp::Mul, Int(count), Str(text)) => {
                let count = (*count).max(0) as usize;
                return Ok(Str(text.repeat(count)));
            }
            (BinOp::Mul, Value::List(items), Int(count))
            | (BinOp::Mul, Int(count), Value::List(items)) => {
                let count = (*count).max(0) as usize;
                let base = items.borrow().clone();
                let mut repeated = Vec::with_capacity(base.len() * count);
                for _ in 0..count {
                    repeated.extend(base.iter().cloned());
                }
                return Ok(Value::list(repeated));
            }
            _ => {}
        }

        let both_int = matches!((&left, &right), (Int(_), Int(_)));
        let (a, b) = match (&left, &right) {
            (Int(a), Int(b)) => (*a as f64, *b as f64),
            (Int(a), Float(b)) => (*a as f64, *b),
            (Float(a), Int(b)) => (*a, *b as f64),
            (Float(a), Float(b)) => (*a, *b),
            _ => {
                return Err(self.runtime(
                    line,
                    format!(
                        "unsupported operand types: {} and {}",
                        left.type_name(),
                        right.type_name()
                    ),
                ));
            }
        };

        match op {
            BinOp::Add => Ok(self.numeric(both_int, a + b)),
            BinOp::Sub => Ok(self.numeric(both_int, a - b)),
            BinOp::Mul => Ok(self.numeric(both_int, a * b)),
            BinOp::Div => {
                if b == 0.0 {
                    return Err(self.runtime(line, "division by zero"));
                }
                Ok(Float(a / b))
            }
            BinOp::FloorDiv => {
                if b == 0.0 {
                    return Err(self.runtime(line, "division by zero"));
                }
                Ok(self.numeric(both_int, (a / b).floor()))
            }
            BinOp::Mod => {
                if b == 0.0 {
                    return Err(self.runtime(line, "modulo by zero"));
                }
                // Result takes the sign of the divisor.
                Ok(self.numeric(both_int, a - b * (a / b).floor()))
            }
            BinOp::Pow => {
                let result = a.powf(b);
                if !result.is_finite() {
                    return Err(self.runtime(line, "numeric overflow in exponentiation"));
                }
                Ok(self.numeric(both_int && b >= 0.0, result))
            }
        }
    }

    fn numeric(&self, as_int: bool, value: f64) -> Value {
        if as_int && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Value::Int(value as i64)
        } else {
            Value::Float(value)
        }
    }

    fn compare(
        &self,
        op: CmpOp,
        left: &Value,
        right: &Value,
        line: usize,
    ) -> Result<bool, SandboxError> {
        use std::cmp::Ordering;

        let ordering = match (left, right) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => {
                // Only equality is defined across other types.
                return match op {
                    CmpOp::Eq => Ok(left == right),
                    CmpOp::Ne => Ok(left != right),
                    _ => Err(self.runtime(
                        line,
                        format!(
                            "cannot order {} and {}",
                            left.type_name(),
                            right.type_name()
                        ),
                    )),
                };
            }
        };
        let Some(ordering) = ordering else {
            return Ok(false);
        };

        Ok(match op {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        })
    }

    // ---- builtins ------------------------------------------------------------

    fn call_builtin(
        &mut self,
        function: &str,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, SandboxError> {
        match function {
            "range" => self.builtin_range(args, line),
            "len" => {
                let [value] = self.arity::<1>(function, args, line)?;
                let length = match &value {
                    Value::List(items) => items.borrow().len() as i64,
                    Value::Str(text) => text.chars().count() as i64,
                    Value::Range(start, stop, step) => range_len(*start, *stop, *step),
                    other => {
                        return Err(self.runtime(
                            line,
                            format!("len() does not support {}", other.type_name()),
                        ));
                    }
                };
                Ok(Value::Int(length))
            }
            "enumerate" => {
                let [value] = self.arity::<1>(function, args, line)?;
                let items = self.iterate(value, line)?;
                Ok(Value::list(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(index, item)| Value::list(vec![Value::Int(index as i64), item]))
                        .collect(),
                ))
            }
            "zip" => {
                if args.len() < 2 {
                    return Err(self.runtime(line, "zip() takes at least two arguments"));
                }
                let mut columns = Vec::new();
                for arg in args {
                    columns.push(self.iterate(arg, line)?);
                }
                let shortest = columns.iter().map(Vec::len).min().unwrap_or(0);
                let mut rows = Vec::with_capacity(shortest);
                for index in 0..shortest {
                    rows.push(Value::list(
                        columns.iter().map(|column| column[index].clone()).collect(),
                    ));
                }
                Ok(Value::list(rows))
            }
            "abs" => {
                let [value] = self.arity::<1>(function, args, line)?;
                match value {
                    Value::Int(value) => Ok(Value::Int(value.abs())),
                    Value::Float(value) => Ok(Value::Float(value.abs())),
                    other => Err(self.runtime(
                        line,
                        format!("abs() does not support {}", other.type_name()),
                    )),
                }
            }
            "min" | "max" => self.builtin_min_max(function, args, line),
            "int" => {
                let [value] = self.arity::<1>(function, args, line)?;
                match value {
                    Value::Int(value) => Ok(Value::Int(value)),
                    Value::Float(value) => Ok(Value::Int(value.trunc() as i64)),
                    Value::Bool(value) => Ok(Value::Int(i64::from(value))),
                    Value::Str(text) => text.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        self.runtime(line, format!("invalid literal for int(): {text:?}"))
                    }),
                    other => Err(self.runtime(
                        line,
                        format!("int() does not support {}", other.type_name()),
                    )),
                }
            }
            "float" => {
                let [value] = self.arity::<1>(function, args, line)?;
                match value {
                    Value::Int(value) => Ok(Value::Float(value as f64)),
                    Value::Float(value) => Ok(Value::Float(value)),
                    Value::Bool(value) => Ok(Value::Float(f64::from(u8::from(value)))),
                    Value::Str(text) => {
                        text.trim().parse::<f64>().map(Value::Float).map_err(|_| {
                            self.runtime(line, format!("invalid literal for float(): {text:?}"))
                        })
                    }
                    other => Err(self.runtime(
                        line,
                        format!("float() does not support {}", other.type_name()),
                    )),
                }
            }
            "str" => {
                let [value] = self.arity::<1>(function, args, line)?;
                Ok(Value::Str(display_value(&value)))
            }
            "sqrt" | "sin" | "cos" | "tan" | "asin" | "acos" | "atan" | "radians" | "degrees"
            | "floor" | "ceil" | "log" | "log10" | "exp" => {
                let [value] = self.arity::<1>(function, args, line)?;
                let input = self.as_float(&value, function, line)?;
                self.math_unary(function, input, line)
            }
            "atan2" => {
                let [y, x] = self.arity::<2>(function, args, line)?;
                let y = self.as_float(&y, function, line)?;
                let x = self.as_float(&x, function, line)?;
                Ok(Value::Float(y.atan2(x)))
            }
            other => Err(self.runtime(line, format!("unknown function {other:?}"))),
        }
    }

    fn arity<const N: usize>(
        &self,
        function: &str,
        args: Vec<Value>,
        line: usize,
    ) -> Result<[Value; N], SandboxError> {
        let count = args.len();
        args.try_into().map_err(|_| {
            self.runtime(
                line,
                format!("{function}() takes {N} argument(s), got {count}"),
            )
        })
    }

    fn as_float(&self, value: &Value, function: &str, line: usize) -> Result<f64, SandboxError> {
        match value {
            Value::Int(value) => Ok(*value as f64),
            Value::Float(value) => Ok(*value),
            other => Err(self.runtime(
                line,
                format!("{function}() requires a number, got {}", other.type_name()),
            )),
        }
    }

    fn math_unary(&self, function: &str, input: f64, line: usize) -> Result<Value, SandboxError> {
        let result = match function {
            "sqrt" => input.sqrt(),
            "sin" => input.sin(),
            "cos" => input.cos(),
            "tan" => input.tan(),
            "asin" => input.asin(),
            "acos" => input.acos(),
            "atan" => input.atan(),
            "radians" => input.to_radians(),
            "degrees" => input.to_degrees(),
            "floor" => return Ok(Value::Int(input.floor() as i64)),
            "ceil" => return Ok(Value::Int(input.ceil() as i64)),
            "log" => input.ln(),
            "log10" => input.log10(),
            "exp" => input.exp(),
            _ => return Err(self.runtime(line, format!("unknown function {function:?}"))),
        };
        if result.is_nan() {
            return Err(self.runtime(line, format!("math domain error in {function}()")));
        }
        Ok(Value::Float(result))
    }

    fn builtin_range(&self, args: Vec<Value>, line: usize) -> Result<Value, SandboxError> {
        let ints = args
            .iter()
            .map(|value| match value {
                Value::Int(value) => Ok(*value),
                other => Err(self.runtime(
                    line,
                    format!("range() arguments must be ints, got {}", other.type_name()),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (start, stop, step) = match ints.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => return Err(self.runtime(line, "range() takes 1 to 3 arguments")),
        };
        if step == 0 {
            return Err(self.runtime(line, "range() step cannot be zero"));
        }

        let size = range_len(start, stop, step);
        if size > self.limits.max_range_size {
            return Err(SandboxError::RangeTooLarge {
                line,
                size,
                max: self.limits.max_range_size,
            });
        }

        Ok(Value::Range(start, stop, step))
    }

    fn builtin_min_max(
        &mut self,
        function: &str,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, SandboxError> {
        let candidates = if args.len() == 1 {
            self.iterate(args.into_iter().next().unwrap_or(Value::None), line)?
        } else {
            args
        };
        if candidates.is_empty() {
            return Err(self.runtime(line, format!("{function}() of an empty sequence")));
        }

        let mut best = candidates[0].clone();
        for candidate in &candidates[1..] {
            let replace = if function == "min" {
                self.compare(CmpOp::Lt, candidate, &best, line)?
            } else {
                self.compare(CmpOp::Gt, candidate, &best, line)?
            };
            if replace {
                best = candidate.clone();
            }
        }
        Ok(best)
    }
}

/// String rendition used by `str()` and f-string interpolation. Floats with
/// no fractional part render with a trailing `.0`, matching the source
/// language's `str()`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Int(value) => value.to_string(),
        Value::Float(value) => {
            if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e16 {
                format!("{value:.1}")
            } else {
                value.to_string()
            }
        }
        Value::Str(text) => text.clone(),
        Value::Bool(value) => if *value { "True" } else { "False" }.to_owned(),
        Value::None => "None".to_owned(),
        Value::List(items) => {
            let rendered: Vec<String> =
                items.borrow().iter().map(render_list_item).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Range(start, stop, step) => {
            if *step == 1 {
                format!("range({start}, {stop})")
            } else {
                format!("range({start}, {stop}, {step})")
            }
        }
    }
}

fn render_list_item(value: &Value) -> String {
    match value {
        Value::Str(text) => format!("{text:?}"),
        other => display_value(other),
    }
}
