//! Tree-walking interpreter. Executes a parsed program against a [`Host`].
//! All per-run state lives on the `Interpreter`; two runs never share anything.

use std::rc::Rc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::config::{FunctionScope, RunConfig};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::builtins;
use crate::runtime::env::Env;
use crate::runtime::host::{Color, Host};
use crate::runtime::value::{Closure, Value};
use crate::syntax::ast::{BinOp, DrawShape, Expr, Literal, Program, Stmt, UnOp};

/// Nested user-function calls allowed before the run fails with R007.
pub const MAX_CALL_DEPTH: usize = 200;

/// Nested blocks, function bodies included, allowed before the run fails
/// with R007. Bounds native stack use when loops and branches sit between
/// recursive calls.
pub const MAX_BLOCK_DEPTH: usize = 600;

// ─── Interpreter ──────────────────────────────────────────────────────────────

pub struct Interpreter<'h> {
    globals: Env,
    env: Env,
    /// Set by `return`; checked after every statement and cleared by the call
    /// that consumed it.
    returning: Option<Value>,
    host: &'h mut dyn Host,
    config: RunConfig,
    rng: ChaCha8Rng,
    /// Scopes that a closure captured and that may still be reachable.
    /// Released when their block ends unless a function escaped; the rest
    /// are cleared on drop.
    closure_scopes: Vec<Env>,
    depth: usize,
    nesting: usize,
}

impl<'h> Interpreter<'h> {
    pub fn new(host: &'h mut dyn Host, config: RunConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let globals = Env::global();
        Self {
            env: globals.clone(),
            globals,
            returning: None,
            host,
            config,
            rng,
            closure_scopes: Vec::new(),
            depth: 0,
            nesting: 0,
        }
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    // ─── Entry point ──────────────────────────────────────────────────────────

    /// Executes the top-level statements in order. A top-level `return` stops
    /// the run early without error.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        debug!(statements = program.statements.len(), "run started");
        self.env = self.globals.clone();
        self.returning = None;
        let result = self.exec_stmts(&program.statements);
        match &result {
            Ok(()) => debug!("run finished"),
            Err(e) => debug!(error = %e, "run aborted"),
        }
        result
    }

    // ─── Statement executor ───────────────────────────────────────────────────

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.exec_stmt(stmt)?;
            if self.returning.is_some() { break; }
        }
        Ok(())
    }

    /// Runs `stmts` with `scope` as the current scope, restoring the previous
    /// scope afterwards even on error.
    fn exec_block(&mut self, stmts: &[Stmt], scope: Env, line: usize) -> Result<(), RuntimeError> {
        if self.nesting >= MAX_BLOCK_DEPTH {
            return Err(RuntimeError::new(RuntimeErrorKind::CallDepth, line, format!(
                "blocks nested deeper than {MAX_BLOCK_DEPTH}"
            )));
        }
        let previous = std::mem::replace(&mut self.env, scope);
        self.nesting += 1;
        let result = self.exec_stmts(stmts);
        self.nesting -= 1;
        let finished = std::mem::replace(&mut self.env, previous);
        self.release(finished);
        result
    }

    /// Clears a finished scope that functions were declared in, unless
    /// something outside it still holds the scope or one of those functions.
    fn release(&mut self, scope: Env) {
        let entries = self.closure_scopes.iter().filter(|s| s.ptr_eq(&scope)).count();
        if entries == 0 {
            return;
        }
        // `scope` itself, the registry entries and each unshared function
        if scope.ref_count() == 1 + entries + scope.unshared_functions() {
            self.closure_scopes.retain(|s| !s.ptr_eq(&scope));
            scope.clear();
        }
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Scene(scene) => {
                debug!(width = scene.width, height = scene.height, "scene");
                self.host.clear();
                self.exec_stmts(&scene.body)?;
            }

            Stmt::Let { name, init, .. } => {
                let val = self.eval_expr(init)?;
                self.env.define(name, val);
            }

            Stmt::Assign { name, value, span } => {
                let val = self.eval_expr(value)?;
                if !self.env.assign(name, val) {
                    return Err(RuntimeError::undefined(span.line, name));
                }
            }

            Stmt::Function(decl) => {
                let closure = Closure { decl: decl.clone(), env: self.env.clone() };
                self.env.define(&decl.name, Value::Function(Rc::new(closure)));
                if !self.closure_scopes.iter().rev().any(|s| s.ptr_eq(&self.env)) {
                    self.closure_scopes.push(self.env.clone());
                }
            }

            Stmt::Return(expr, _) => {
                let val = match expr {
                    Some(e) => self.eval_expr(e)?,
                    None    => Value::Null,
                };
                self.returning = Some(val);
            }

            Stmt::If(i) => {
                let branch = if self.eval_expr(&i.condition)?.is_truthy() {
                    Some(&i.then_block)
                } else {
                    i.else_block.as_ref()
                };
                if let Some(block) = branch {
                    self.exec_block(block, Env::child(&self.env), i.span.line)?;
                }
            }

            Stmt::While { condition, body, span } => {
                while self.eval_expr(condition)?.is_truthy() {
                    self.exec_block(body, Env::child(&self.env), span.line)?;
                    if self.returning.is_some() { break; }
                }
            }

            Stmt::ForEach { var, iterable, body, span } => {
                let items = match self.eval_expr(iterable)? {
                    Value::Array(items) => items,
                    other => return Err(RuntimeError::type_mismatch(span.line, format!(
                        "`for` expects an array, got {}", other.type_name()
                    ))),
                };
                for item in items.iter() {
                    self.env.define(var, item.clone());
                    self.exec_block(body, Env::child(&self.env), span.line)?;
                    if self.returning.is_some() { break; }
                }
            }

            Stmt::Block(stmts, span) => {
                self.exec_block(stmts, Env::child(&self.env), span.line)?;
            }

            Stmt::Load { name, path, span } => match self.host.load_image(path) {
                Ok(image) => {
                    debug!(line = span.line, path = %path, id = image.id, "image loaded");
                    self.env.define(name, Value::Image(image));
                }
                Err(e) => warn!(line = span.line, error = %e, "`{name}` left unbound"),
            },

            Stmt::Draw(shape, span) => {
                debug!(line = span.line, shape = shape.name(), "draw");
                self.exec_draw(shape, span.line)?;
            }

            Stmt::Show { text, x, y, align, span } => {
                let text = self.eval_expr(text)?.to_display_string();
                let x = self.number(x, "show")?;
                let y = self.number(y, "show")?;
                debug!(line = span.line, text = %text, "show");
                self.host.draw_text(&text, x, y, *align);
            }

            Stmt::Play { path, span } => {
                debug!(line = span.line, path = %path, "play");
                if let Err(e) = self.host.play_sound(path) {
                    warn!(line = span.line, error = %e, "sound not played");
                }
            }

            Stmt::Print(expr, span) => {
                let line = self.eval_expr(expr)?.to_display_string();
                debug!(line = span.line, "print");
                self.host.log(&line);
            }

            Stmt::Wait(expr, span) => {
                let ms = self.number(expr, "wait")?.max(0.0);
                let duration = Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX);
                debug!(line = span.line, ?duration, "wait");
                self.host.wait(duration);
            }

            Stmt::Expr(e) => { self.eval_expr(e)?; }
        }
        Ok(())
    }

    fn exec_draw(&mut self, shape: &DrawShape, line: usize) -> Result<(), RuntimeError> {
        match shape {
            DrawShape::Rect { x, y, w, h, color } => {
                let (x, y) = (self.number(x, "draw rect")?, self.number(y, "draw rect")?);
                let (w, h) = (self.number(w, "draw rect")?, self.number(h, "draw rect")?);
                let color = self.color(color)?;
                self.host.fill_rect(x, y, w, h, color);
            }
            DrawShape::Circle { x, y, r, color } => {
                let (x, y) = (self.number(x, "draw circle")?, self.number(y, "draw circle")?);
                let r = self.number(r, "draw circle")?;
                let color = self.color(color)?;
                self.host.fill_circle(x, y, r, color);
            }
            DrawShape::Line { x1, y1, x2, y2, color } => {
                let (x1, y1) = (self.number(x1, "draw line")?, self.number(y1, "draw line")?);
                let (x2, y2) = (self.number(x2, "draw line")?, self.number(y2, "draw line")?);
                let color = self.color(color)?;
                self.host.draw_line(x1, y1, x2, y2, color);
            }
            DrawShape::Triangle { x1, y1, x2, y2, x3, y3, color } => {
                let (x1, y1) = (self.number(x1, "draw triangle")?, self.number(y1, "draw triangle")?);
                let (x2, y2) = (self.number(x2, "draw triangle")?, self.number(y2, "draw triangle")?);
                let (x3, y3) = (self.number(x3, "draw triangle")?, self.number(y3, "draw triangle")?);
                let color = self.color(color)?;
                self.host.fill_triangle(x1, y1, x2, y2, x3, y3, color);
            }
            DrawShape::Image { image, x, y } => {
                let image = match self.eval_expr(image)? {
                    Value::Image(handle) => handle,
                    other => return Err(RuntimeError::type_mismatch(line, format!(
                        "`draw image` expects an image, got {}", other.type_name()
                    ))),
                };
                let (x, y) = (self.number(x, "draw image")?, self.number(y, "draw image")?);
                self.host.draw_image(&image, x, y);
            }
        }
        Ok(())
    }

    // ─── Expression evaluator ─────────────────────────────────────────────────

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit, _) => Ok(match lit {
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s)    => Value::str(s),
                Literal::Bool(b)   => Value::Bool(*b),
                Literal::Null      => Value::Null,
            }),

            Expr::Variable(name, span) => self.env.lookup(name)
                .ok_or_else(|| RuntimeError::undefined(span.line, name)),

            Expr::Binary { left, op: BinOp::And, right, .. } => {
                if !self.eval_expr(left)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_expr(right)?.is_truthy()))
            }

            Expr::Binary { left, op: BinOp::Or, right, .. } => {
                if self.eval_expr(left)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_expr(right)?.is_truthy()))
            }

            Expr::Binary { left, op, right, span } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                eval_binop(*op, l, r, span.line)
            }

            Expr::Unary { op, operand, span } => {
                let v = self.eval_expr(operand)?;
                eval_unop(*op, v, span.line)
            }

            Expr::Call { callee, args, span } => self.eval_call(callee, args, span.line),

            Expr::Index { target, index, span } => {
                let target = self.eval_expr(target)?;
                let index = self.eval_expr(index)?;
                eval_index(target, index, span.line)
            }

            Expr::Array(items, _) => {
                let vals = items.iter()
                    .map(|e| self.eval_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::array(vals))
            }
        }
    }

    // ─── Call dispatch ────────────────────────────────────────────────────────

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], line: usize) -> Result<Value, RuntimeError> {
        // builtins only when the name is not bound by the program
        if let Expr::Variable(name, _) = callee {
            if builtins::is_builtin(name) && self.env.lookup(name).is_none() {
                let arg_vals = self.eval_args(args)?;
                trace!(name = %name, line, "builtin call");
                if let Some(v) = builtins::call(name, &arg_vals, &*self.host, &mut self.rng, line)? {
                    return Ok(v);
                }
            }
        }

        let callee_val = self.eval_expr(callee)?;
        let arg_vals = self.eval_args(args)?;
        match callee_val {
            Value::Function(closure) => self.call_function(&closure, arg_vals, line),
            other => Err(RuntimeError::new(RuntimeErrorKind::NotCallable, line, format!(
                "cannot call a value of type {}", other.type_name()
            ))),
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval_expr(a)).collect()
    }

    /// Binds parameters positionally (missing ones are null, extras dropped)
    /// in a fresh scope and runs the body. Yields the returned value or null.
    pub fn call_function(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(RuntimeErrorKind::CallDepth, line, format!(
                "call depth exceeded {MAX_CALL_DEPTH} in `{}`", closure.decl.name
            )));
        }
        let parent = match self.config.function_scope {
            FunctionScope::Global  => &self.globals,
            FunctionScope::Lexical => &closure.env,
        };
        let scope = Env::child(parent);
        let mut args = args.into_iter();
        for param in &closure.decl.params {
            scope.define(param, args.next().unwrap_or(Value::Null));
        }
        trace!(name = %closure.decl.name, line, depth = self.depth, "call");

        let saved = self.returning.take();
        self.depth += 1;
        let result = self.exec_block(&closure.decl.body, scope, line);
        self.depth -= 1;
        let value = self.returning.take().unwrap_or(Value::Null);
        self.returning = saved;
        result.map(|()| value)
    }

    // ─── Operand helpers ──────────────────────────────────────────────────────

    fn number(&mut self, expr: &Expr, what: &str) -> Result<f64, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Number(n) => Ok(n),
            other => Err(RuntimeError::type_mismatch(expr.span().line, format!(
                "`{what}` expects a number, got {}", other.type_name()
            ))),
        }
    }

    fn color(&mut self, expr: &Expr) -> Result<Color, RuntimeError> {
        Ok(Color::from_name(&self.eval_expr(expr)?.to_display_string()))
    }
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        // closures and the scopes they captured point at each other
        for scope in self.closure_scopes.drain(..) {
            scope.clear();
        }
        self.globals.clear();
    }
}

// ─── Binary / unary operators ─────────────────────────────────────────────────

fn eval_binop(op: BinOp, l: Value, r: Value, line: usize) -> Result<Value, RuntimeError> {
    match op {
        BinOp::Eq    => return Ok(Value::Bool(l.equals(&r))),
        BinOp::NotEq => return Ok(Value::Bool(!l.equals(&r))),
        BinOp::Add if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
            let joined = format!("{}{}", l.to_display_string(), r.to_display_string());
            return Ok(Value::str(&joined));
        }
        _ => {}
    }

    let (a, b) = match (&l, &r) {
        (Value::Number(a), Value::Number(b)) => (*a, *b),
        _ => return Err(RuntimeError::type_mismatch(line, format!(
            "operator `{}` not supported between {} and {}",
            op.symbol(), l.type_name(), r.type_name()
        ))),
    };

    let v = match op {
        BinOp::Add  => Value::Number(a + b),
        BinOp::Sub  => Value::Number(a - b),
        BinOp::Mul  => Value::Number(a * b),
        BinOp::Div | BinOp::Mod if b == 0.0 => {
            return Err(RuntimeError::new(RuntimeErrorKind::DivisionByZero, line, format!(
                "`{}` by zero", op.symbol()
            )));
        }
        BinOp::Div  => Value::Number(a / b),
        BinOp::Mod  => Value::Number(a % b),
        BinOp::Lt   => Value::Bool(a < b),
        BinOp::LtEq => Value::Bool(a <= b),
        BinOp::Gt   => Value::Bool(a > b),
        BinOp::GtEq => Value::Bool(a >= b),
        BinOp::Eq | BinOp::NotEq | BinOp::And | BinOp::Or => Value::Null,
    };
    Ok(v)
}

fn eval_unop(op: UnOp, v: Value, line: usize) -> Result<Value, RuntimeError> {
    match op {
        UnOp::Neg => match v {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(RuntimeError::type_mismatch(line, format!(
                "unary `-` not supported on {}", other.type_name()
            ))),
        },
        UnOp::Not => Ok(Value::Bool(!v.is_truthy())),
    }
}

// ─── Indexing ─────────────────────────────────────────────────────────────────

fn eval_index(target: Value, index: Value, line: usize) -> Result<Value, RuntimeError> {
    let n = match (&target, &index) {
        (Value::Array(_) | Value::Str(_), Value::Number(n)) => *n,
        (Value::Array(_) | Value::Str(_), other) => return Err(RuntimeError::type_mismatch(line, format!(
            "index must be a number, got {}", other.type_name()
        ))),
        (other, _) => return Err(RuntimeError::type_mismatch(line, format!(
            "cannot index {}", other.type_name()
        ))),
    };
    let out_of_bounds = |len: usize| RuntimeError::new(RuntimeErrorKind::IndexOutOfBounds, line, format!(
        "index {} out of bounds for length {len}", crate::runtime::value::format_number(n)
    ));
    let slot = |len: usize| {
        if n.fract() == 0.0 && n >= 0.0 && n < len as f64 { Some(n as usize) } else { None }
    };

    match target {
        Value::Array(items) => {
            let i = slot(items.len()).ok_or_else(|| out_of_bounds(items.len()))?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let len = s.chars().count();
            let i = slot(len).ok_or_else(|| out_of_bounds(len))?;
            let ch = s.chars().nth(i).map(String::from).unwrap_or_default();
            Ok(Value::str(&ch))
        }
        _ => Ok(Value::Null),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
