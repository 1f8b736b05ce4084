// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Recursive-descent parser for the build-script language.
//!
//! The grammar structurally excludes everything the sandbox denies: there are
//! no function definitions, no imports, and the only attribute access that
//! parses is a list `append`/`extend` method call. Nesting depth is bounded
//! during parsing so pathological inputs fail before execution.

use super::lexer::{self, FStrPart, Keyword, Op, Spanned, Token};
use super::SandboxError;

/// Function names that must never be callable, even though the runtime would
/// not resolve them anyway. Rejected statically for a clearer diagnostic.
const BLOCKED_CALLS: [&str; 14] = [
    "eval", "exec", "compile", "open", "input", "getattr", "setattr", "delattr", "globals",
    "locals", "vars", "dir", "type", "super",
];

const LIST_METHODS: [&str; 2] = ["append", "extend"];

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        target: Target,
        value: Expr,
    },
    AugAssign {
        target: Target,
        op: BinOp,
        value: Expr,
    },
    Expr(Expr),
    For {
        targets: Vec<String>,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(String),
    Index { target: Box<Expr>, index: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub line: usize,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLiteral,
    Name(String),
    List(Vec<Expr>),
    FString(Vec<FsPart>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    BoolChain {
        op: BoolOp,
        values: Vec<Expr>,
    },
    Not(Box<Expr>),
    Compare {
        left: Box<Expr>,
        rest: Vec<(CmpOp, Expr)>,
    },
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        function: String,
        args: Vec<Expr>,
    },
    MethodCall {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FsPart {
    Literal(String),
    Expression { expr: Expr, spec: Option<String> },
}

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
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

pub fn parse(source: &str, max_depth: usize) -> Result<Program, SandboxError> {
    let tokens = lexer::lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let body = parser.parse_statements_until(&Token::Eof)?;
    Ok(Program { body })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|spanned| &spanned.token).unwrap_or(&Token::Eof)
    }

    fn line(&self) -> usize {
        self.tokens.get(self.pos).map(|spanned| spanned.line).unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, op: Op) -> bool {
        if *self.peek() == Token::Op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: Op, context: &str) -> Result<(), SandboxError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.syntax(format!("expected {op:?} {context}")))
        }
    }

    fn expect(&mut self, token: &Token, context: &str) -> Result<(), SandboxError> {
        if self.peek() == token {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.syntax(format!("expected {token:?} {context}, found {:?}", self.peek())))
        }
    }

    fn syntax(&self, message: String) -> SandboxError {
        SandboxError::Syntax {
            line: self.line(),
            message,
        }
    }

    fn parse_statements_until(&mut self, end: &Token) -> Result<Vec<Stmt>, SandboxError> {
        let mut statements = Vec::new();
        while self.peek() != end {
            if *self.peek() == Token::Eof {
                return Err(self.syntax(format!("unexpected end of script, expected {end:?}")));
            }
            statements.push(self.parse_statement()?);
        }
        self.pos += 1;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, SandboxError> {
        let line = self.line();
        match self.peek().clone() {
            Token::Keyword(Keyword::For) => self.parse_for(line),
            Token::Keyword(Keyword::If) => self.parse_if(line),
            Token::Keyword(Keyword::Break) => {
                self.pos += 1;
                self.expect(&Token::Newline, "after break")?;
                Ok(Stmt {
                    line,
                    kind: StmtKind::Break,
                })
            }
            Token::Keyword(Keyword::Continue) => {
                self.pos += 1;
                self.expect(&Token::Newline, "after continue")?;
                Ok(Stmt {
                    line,
                    kind: StmtKind::Continue,
                })
            }
            _ => self.parse_simple_statement(line),
        }
    }

    fn parse_simple_statement(&mut self, line: usize) -> Result<Stmt, SandboxError> {
        let expr = self.parse_expression()?;

        let kind = if self.eat_op(Op::Assign) {
            let value = self.parse_expression()?;
            StmtKind::Assign {
                target: self.as_target(expr)?,
                value,
            }
        } else if self.eat_op(Op::PlusAssign) {
            let value = self.parse_expression()?;
            StmtKind::AugAssign {
                target: self.as_target(expr)?,
                op: BinOp::Add,
                value,
            }
        } else if self.eat_op(Op::MinusAssign) {
            let value = self.parse_expression()?;
            StmtKind::AugAssign {
                target: self.as_target(expr)?,
                op: BinOp::Sub,
                value,
            }
        } else if self.eat_op(Op::StarAssign) {
            let value = self.parse_expression()?;
            StmtKind::AugAssign {
                target: self.as_target(expr)?,
                op: BinOp::Mul,
                value,
            }
        } else {
            StmtKind::Expr(expr)
        };

        self.expect(&Token::Newline, "at end of statement")?;
        Ok(Stmt { line, kind })
    }

    fn as_target(&self, expr: Expr) -> Result<Target, SandboxError> {
        match expr.kind {
            ExprKind::Name(name) => Ok(Target::Name(name)),
            ExprKind::Index { target, index } => Ok(Target::Index { target, index }),
            _ => Err(SandboxError::Syntax {
                line: expr.line,
                message: "invalid assignment target".to_owned(),
            }),
        }
    }

    fn enter_block(&mut self, line: usize) -> Result<(), SandboxError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(SandboxError::NestingTooDeep {
                line,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SandboxError> {
        self.expect_op(Op::Colon, "before block")?;
        self.expect(&Token::Newline, "after ':'")?;
        self.expect(&Token::Indent, "to open an indented block")?;
        self.parse_statements_until(&Token::Dedent)
    }

    fn parse_for(&mut self, line: usize) -> Result<Stmt, SandboxError> {
        self.pos += 1;
        let mut targets = vec![self.parse_target_name()?];
        while self.eat_op(Op::Comma) {
            targets.push(self.parse_target_name()?);
        }
        self.expect(&Token::Keyword(Keyword::In), "in for statement")?;
        let iterable = self.parse_expression()?;
        self.enter_block(line)?;
        let body = self.parse_block()?;
        self.depth -= 1;
        Ok(Stmt {
            line,
            kind: StmtKind::For {
                targets,
                iterable,
                body,
            },
        })
    }

    fn parse_target_name(&mut self) -> Result<String, SandboxError> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(SandboxError::Syntax {
                line: self.line(),
                message: format!("expected loop variable name, found {other:?}"),
            }),
        }
    }

    fn parse_if(&mut self, line: usize) -> Result<Stmt, SandboxError> {
        self.pos += 1;
        self.enter_block(line)?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        let mut branches = vec![(condition, body)];
        let mut orelse = Vec::new();

        loop {
            match self.peek().clone() {
                Token::Keyword(Keyword::Elif) => {
                    self.pos += 1;
                    let condition = self.parse_expression()?;
                    let body = self.parse_block()?;
                    branches.push((condition, body));
                }
                Token::Keyword(Keyword::Else) => {
                    self.pos += 1;
                    orelse = self.parse_block()?;
                    break;
                }
                _ => break,
            }
        }

        self.depth -= 1;
        Ok(Stmt {
            line,
            kind: StmtKind::If { branches, orelse },
        })
    }

    // ---- expressions ---------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let value = self.parse_or()?;
        if *self.peek() == Token::Keyword(Keyword::If) {
            self.pos += 1;
            let condition = self.parse_or()?;
            self.expect(&Token::Keyword(Keyword::Else), "in conditional expression")?;
            let otherwise = self.parse_expression()?;
            return Ok(Expr {
                line,
                kind: ExprKind::Ternary {
                    condition: Box::new(condition),
                    then: Box::new(value),
                    otherwise: Box::new(otherwise),
                },
            });
        }
        Ok(value)
    }

    fn parse_or(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let first = self.parse_and()?;
        if *self.peek() != Token::Keyword(Keyword::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while *self.peek() == Token::Keyword(Keyword::Or) {
            self.pos += 1;
            values.push(self.parse_and()?);
        }
        Ok(Expr {
            line,
            kind: ExprKind::BoolChain {
                op: BoolOp::Or,
                values,
            },
        })
    }

    fn parse_and(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let first = self.parse_not()?;
        if *self.peek() != Token::Keyword(Keyword::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while *self.peek() == Token::Keyword(Keyword::And) {
            self.pos += 1;
            values.push(self.parse_not()?);
        }
        Ok(Expr {
            line,
            kind: ExprKind::BoolChain {
                op: BoolOp::And,
                values,
            },
        })
    }

    fn parse_not(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        if *self.peek() == Token::Keyword(Keyword::Not) {
            self.pos += 1;
            let operand = self.parse_not()?;
            return Ok(Expr {
                line,
                kind: ExprKind::Not(Box::new(operand)),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let left = self.parse_arith()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Op(Op::EqEq) => CmpOp::Eq,
                Token::Op(Op::NotEq) => CmpOp::Ne,
                Token::Op(Op::Lt) => CmpOp::Lt,
                Token::Op(Op::Gt) => CmpOp::Gt,
                Token::Op(Op::LtEq) => CmpOp::Le,
                Token::Op(Op::GtEq) => CmpOp::Ge,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.parse_arith()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(Expr {
                line,
                kind: ExprKind::Compare {
                    left: Box::new(left),
                    rest,
                },
            })
        }
    }

    fn parse_arith(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Op(Op::Plus) => BinOp::Add,
                Token::Op(Op::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr {
                line,
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Token::Op(Op::Star) => BinOp::Mul,
                Token::Op(Op::Slash) => BinOp::Div,
                Token::Op(Op::DoubleSlash) => BinOp::FloorDiv,
                Token::Op(Op::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_factor()?;
            left = Expr {
                line,
                kind: ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        match self.peek() {
            Token::Op(Op::Minus) => {
                self.pos += 1;
                let operand = self.parse_factor()?;
                Ok(Expr {
                    line,
                    kind: ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                })
            }
            Token::Op(Op::Plus) => {
                self.pos += 1;
                let operand = self.parse_factor()?;
                Ok(Expr {
                    line,
                    kind: ExprKind::Unary {
                        op: UnaryOp::Pos,
                        operand: Box::new(operand),
                    },
                })
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        let base = self.parse_postfix()?;
        if self.eat_op(Op::DoubleStar) {
            // Right-associative, binds tighter than unary on the right.
            let exponent = self.parse_factor()?;
            return Ok(Expr {
                line,
                kind: ExprKind::Binary {
                    op: BinOp::Pow,
                    left: Box::new(base),
                    right: Box::new(exponent),
                },
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, SandboxError> {
        let mut expr = self.parse_atom()?;
        loop {
            let line = self.line();
            if self.eat_op(Op::LBracket) {
                let index = self.parse_expression()?;
                self.expect_op(Op::RBracket, "after index")?;
                expr = Expr {
                    line,
                    kind: ExprKind::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                };
                continue;
            }
            if self.eat_op(Op::Dot) {
                let method = match self.advance() {
                    Token::Ident(name) => name,
                    other => {
                        return Err(SandboxError::Syntax {
                            line,
                            message: format!("expected method name after '.', found {other:?}"),
                        });
                    }
                };
                if !LIST_METHODS.contains(&method.as_str()) {
                    return Err(SandboxError::DeniedConstruct {
                        line,
                        construct: format!(
                            "attribute access '.{method}' is not allowed; only list append/extend"
                        ),
                    });
                }
                self.expect_op(Op::LParen, "after method name")?;
                let args = self.parse_call_args()?;
                expr = Expr {
                    line,
                    kind: ExprKind::MethodCall {
                        target: Box::new(expr),
                        method,
                        args,
                    },
                };
                continue;
            }
            if *self.peek() == Token::Op(Op::LParen) {
                // A call on something that is not a bare name.
                let function = match &expr.kind {
                    ExprKind::Name(name) => name.clone(),
                    _ => {
                        return Err(SandboxError::DeniedConstruct {
                            line,
                            construct: "only named functions can be called".to_owned(),
                        });
                    }
                };
                if BLOCKED_CALLS.contains(&function.as_str()) {
                    return Err(SandboxError::DeniedConstruct {
                        line,
                        construct: format!("call to {function}() is not allowed"),
                    });
                }
                self.pos += 1;
                let args = self.parse_call_args()?;
                expr = Expr {
                    line,
                    kind: ExprKind::Call { function, args },
                };
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, SandboxError> {
        let mut args = Vec::new();
        if self.eat_op(Op::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.eat_op(Op::Comma) {
                if self.eat_op(Op::RParen) {
                    break;
                }
                continue;
            }
            self.expect_op(Op::RParen, "after call arguments")?;
            break;
        }
        Ok(args)
    }

    fn parse_atom(&mut self) -> Result<Expr, SandboxError> {
        let line = self.line();
        match self.advance() {
            Token::Int(value) => Ok(Expr {
                line,
                kind: ExprKind::Int(value),
            }),
            Token::Float(value) => Ok(Expr {
                line,
                kind: ExprKind::Float(value),
            }),
            Token::Str(value) => Ok(Expr {
                line,
                kind: ExprKind::Str(value),
            }),
            Token::Keyword(Keyword::True) => Ok(Expr {
                line,
                kind: ExprKind::Bool(true),
            }),
            Token::Keyword(Keyword::False) => Ok(Expr {
                line,
                kind: ExprKind::Bool(false),
            }),
            Token::Keyword(Keyword::None) => Ok(Expr {
                line,
                kind: ExprKind::NoneLiteral,
            }),
            Token::Ident(name) => Ok(Expr {
                line,
                kind: ExprKind::Name(name),
            }),
            Token::FStr(parts) => {
                let parts = parts
                    .into_iter()
                    .map(|part| self.convert_fstring_part(part, line))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr {
                    line,
                    kind: ExprKind::FString(parts),
                })
            }
            Token::Op(Op::LBracket) => {
                let mut items = Vec::new();
                if self.eat_op(Op::RBracket) {
                    return Ok(Expr {
                        line,
                        kind: ExprKind::List(items),
                    });
                }
                loop {
                    items.push(self.parse_expression()?);
                    if self.eat_op(Op::Comma) {
                        if self.eat_op(Op::RBracket) {
                            break;
                        }
                        continue;
                    }
                    self.expect_op(Op::RBracket, "after list items")?;
                    break;
                }
                Ok(Expr {
                    line,
                    kind: ExprKind::List(items),
                })
            }
            Token::Op(Op::LParen) => {
                let inner = self.parse_expression()?;
                self.expect_op(Op::RParen, "after parenthesized expression")?;
                Ok(inner)
            }
            other => Err(SandboxError::Syntax {
                line,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }

    fn convert_fstring_part(
        &self,
        part: FStrPart,
        line: usize,
    ) -> Result<FsPart, SandboxError> {
        match part {
            FStrPart::Literal(text) => Ok(FsPart::Literal(text)),
            FStrPart::Expression { source, spec } => {
                let expr = parse_embedded_expression(&source, line, self.max_depth)?;
                Ok(FsPart::Expression { expr, spec })
            }
        }
    }
}

/// Parse the expression inside an f-string placeholder. Reported line numbers
/// are the line of the enclosing f-string.
fn parse_embedded_expression(
    source: &str,
    line: usize,
    max_depth: usize,
) -> Result<Expr, SandboxError> {
    let tokens = lexer::lex(source).map_err(|err| relocate(err, line))?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let expr = parser.parse_expression().map_err(|err| relocate(err, line))?;
    match parser.peek() {
        Token::Newline | Token::Eof => Ok(Expr {
            line,
            kind: expr.kind,
        }),
        other => Err(SandboxError::Syntax {
            line,
            message: format!("unexpected {other:?} in f-string expression"),
        }),
    }
}

fn relocate(err: SandboxError, line: usize) -> SandboxError {
    match err {
        SandboxError::Syntax { message, .. } => SandboxError::Syntax { line, message },
        SandboxError::DeniedConstruct { construct, .. } => {
            SandboxError::DeniedConstruct { line, construct }
        }
        SandboxError::BlockedName { name, .. } => SandboxError::BlockedName { line, name },
        other => other,
    }
}
