//! JavaScript back end. Turns a program into a standalone HTML page whose
//! canvas output follows the interpreter's semantics.

pub mod preamble;

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::GenConfig;
use crate::error::GenError;
use crate::runtime::builtins::{is_builtin, BUILTINS};
use crate::runtime::value::format_number;
use crate::syntax::ast::{walk_stmts, BinOp, DrawShape, Expr, IfStmt, Literal, Program, Stmt, UnOp};

/// Words that cannot be used as JavaScript binding names in strict mode.
const JS_RESERVED: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue",
    "debugger", "default", "delete", "do", "else", "enum", "eval", "export",
    "extends", "false", "finally", "for", "function", "if", "implements", "import",
    "in", "instanceof", "interface", "let", "new", "null", "package", "private",
    "protected", "public", "return", "static", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with", "yield",
    "undefined", "NaN", "Infinity",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Complete page: canvas, preamble and script.
    pub html: String,
    /// The program part only: `__IMAGES`, `__main` and the bootstrap call.
    pub script: String,
    /// Image paths in first-seen order, without duplicates.
    pub images: Vec<String>,
    pub width: f64,
    pub height: f64,
}

// ─── Generator ────────────────────────────────────────────────────────────────

pub struct Generator {
    config: GenConfig,
    out: String,
    indent: usize,
    /// Source name → emitted name, one map per generated block.
    scopes: Vec<HashMap<String, String>>,
    /// Names bound at the top level anywhere in the program.
    globals: HashSet<String>,
    /// Builtin names the program also binds at the top level. Declared
    /// unassigned at the start of `__main` so calls can tell whether the
    /// binding exists yet.
    hoisted: Vec<&'static str>,
    suffixes: HashMap<String, usize>,
}

impl Generator {
    pub fn new(config: GenConfig) -> Self {
        Self {
            config,
            out: String::new(),
            indent: 0,
            scopes: Vec::new(),
            globals: HashSet::new(),
            hoisted: Vec::new(),
            suffixes: HashMap::new(),
        }
    }

    pub fn generate(mut self, program: &Program) -> Result<Artifact, GenError> {
        let images = collect_images(program);
        self.globals = collect_globals(program);
        self.hoisted = BUILTINS.into_iter().filter(|b| self.globals.contains(*b)).collect();
        let (width, height) = program.scene()
            .unwrap_or((self.config.default_width, self.config.default_height));
        debug!(statements = program.statements.len(), images = images.len(), "generating script");

        let image_list = images.iter().map(|p| js_string(p)).collect::<Vec<_>>().join(", ");
        self.line(&format!("const __IMAGES = [{image_list}];"));
        self.line("");
        self.line("function __main() {");
        self.indent += 1;
        for name in self.hoisted.clone() {
            self.line(&format!("let {name};"));
        }
        self.indent -= 1;
        self.gen_body(&program.statements)?;
        self.line("}");
        self.line("");
        self.line("__loadImages(__IMAGES, __main);");

        let script = std::mem::take(&mut self.out);
        let html = preamble::html_document(
            &self.config.title,
            canvas_dim(width),
            canvas_dim(height),
            &self.config.asset_dir,
            &script,
        );
        debug!(bytes = html.len(), "script generated");
        Ok(Artifact { html, script, images, width, height })
    }

    // ─── Output ───────────────────────────────────────────────────────────────

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.out.push_str("    ");
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    // ─── Names ────────────────────────────────────────────────────────────────

    fn lookup(&self, name: &str) -> Option<&String> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    fn resolve(&self, name: &str) -> String {
        self.lookup(name).cloned().unwrap_or_else(|| mangle(name))
    }

    /// Binds `name` in the innermost block. Returns the emitted name and
    /// whether it needs a `let`. A nested declaration that would shadow a
    /// top-level or enclosing name gets a fresh suffix; a hoisted top-level
    /// name is only assigned.
    fn declare(&mut self, name: &str) -> (String, bool) {
        if let Some(js) = self.scopes.last().and_then(|s| s.get(name)) {
            return (js.clone(), false);
        }
        let base = mangle(name);
        let nested = self.scopes.len() > 1;
        let js = if nested && (self.globals.contains(name) || self.lookup(name).is_some()) {
            self.fresh(&base)
        } else {
            base
        };
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), js.clone());
        }
        let hoisted = !nested && self.is_hoisted(name);
        (js, !hoisted)
    }

    fn is_hoisted(&self, name: &str) -> bool {
        self.hoisted.iter().any(|h| *h == name)
    }

    /// Callee for a call by builtin name. A binding visible in the current
    /// function or block wins; a top-level binding is checked when the call
    /// runs, since the builtin applies until the declaration executes.
    fn builtin_callee(&self, name: &str) -> String {
        if let Some(js) = self.scopes.iter().skip(1).rev().find_map(|s| s.get(name)) {
            return js.clone();
        }
        if self.is_hoisted(name) {
            format!("({name} === undefined ? __{name} : {name})")
        } else {
            format!("__{name}")
        }
    }

    fn fresh(&mut self, base: &str) -> String {
        let n = self.suffixes.entry(base.to_string()).or_insert(0);
        *n += 1;
        format!("{base}${n}")
    }

    // ─── Statements ───────────────────────────────────────────────────────────

    /// Emits `stmts` one level deeper, in a new block scope.
    fn gen_body(&mut self, stmts: &[Stmt]) -> Result<(), GenError> {
        self.indent += 1;
        self.scopes.push(HashMap::new());
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        self.scopes.pop();
        self.indent -= 1;
        Ok(())
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), GenError> {
        match stmt {
            Stmt::Scene(scene) => {
                self.line("__clear();");
                for s in &scene.body {
                    self.gen_stmt(s)?;
                }
            }

            Stmt::Let { name, init, .. } => {
                let value = self.gen_expr(init)?;
                let (js, fresh) = self.declare(name);
                let keyword = if fresh { "let " } else { "" };
                self.line(&format!("{keyword}{js} = {value};"));
            }

            Stmt::Assign { name, value, .. } => {
                let value = self.gen_expr(value)?;
                let js = self.resolve(name);
                self.line(&format!("{js} = {value};"));
            }

            Stmt::Function(decl) => {
                let (js, fresh) = self.declare(&decl.name);
                // bodies resolve names against their own locals, then globals
                let enclosing = self.scopes.split_off(1.min(self.scopes.len()));
                self.scopes.push(HashMap::new());
                let mut params = Vec::with_capacity(decl.params.len());
                for (i, param) in decl.params.iter().enumerate() {
                    // a repeated parameter binds the last argument
                    let p = if decl.params[i + 1..].contains(param) {
                        self.fresh("$unused")
                    } else {
                        self.declare(param).0
                    };
                    params.push(format!("{p} = null"));
                }
                let keyword = if fresh { "let " } else { "" };
                self.line(&format!("{keyword}{js} = function {js}({}) {{", params.join(", ")));
                self.indent += 1;
                for s in &decl.body {
                    self.gen_stmt(s)?;
                }
                self.line("return null;");
                self.indent -= 1;
                self.line("};");
                self.scopes.pop();
                self.scopes.extend(enclosing);
            }

            Stmt::Return(expr, _) => match expr {
                Some(e) => {
                    let value = self.gen_expr(e)?;
                    self.line(&format!("return {value};"));
                }
                None => self.line("return null;"),
            },

            Stmt::If(i) => self.gen_if(i, "")?,

            Stmt::While { condition, body, .. } => {
                let cond = self.gen_expr(condition)?;
                self.line(&format!("while (__truthy({cond})) {{"));
                self.gen_body(body)?;
                self.line("}");
            }

            Stmt::ForEach { var, iterable, body, .. } => {
                let items = self.gen_expr(iterable)?;
                let (js, fresh) = self.declare(var);
                if fresh {
                    self.line(&format!("let {js};"));
                }
                self.line(&format!("for ({js} of __array({items})) {{"));
                self.gen_body(body)?;
                self.line("}");
            }

            Stmt::Block(stmts, _) => {
                self.line("{");
                self.gen_body(stmts)?;
                self.line("}");
            }

            Stmt::Load { name, path, .. } => {
                let (js, fresh) = self.declare(name);
                let keyword = if fresh { "let " } else { "" };
                self.line(&format!("{keyword}{js} = __images[{}];", js_string(path)));
            }

            Stmt::Draw(shape, _) => {
                let (func, args): (&str, Vec<&Expr>) = match shape {
                    DrawShape::Rect { x, y, w, h, color } => ("__fillRect", vec![x, y, w, h, color]),
                    DrawShape::Circle { x, y, r, color } => ("__fillCircle", vec![x, y, r, color]),
                    DrawShape::Line { x1, y1, x2, y2, color } => ("__drawLine", vec![x1, y1, x2, y2, color]),
                    DrawShape::Triangle { x1, y1, x2, y2, x3, y3, color } => {
                        ("__fillTriangle", vec![x1, y1, x2, y2, x3, y3, color])
                    }
                    DrawShape::Image { image, x, y } => ("__drawImage", vec![image, x, y]),
                };
                let args = self.gen_args(&args)?;
                self.line(&format!("{func}({args});"));
            }

            Stmt::Show { text, x, y, align, .. } => {
                let args = self.gen_args(&[text, x, y])?;
                self.line(&format!("__drawText({args}, {});", js_string(align.as_str())));
            }

            Stmt::Play { path, .. } => self.line(&format!("__play({});", js_string(path))),

            Stmt::Print(expr, _) => {
                let value = self.gen_expr(expr)?;
                self.line(&format!("__log({value});"));
            }

            Stmt::Wait(expr, _) => {
                let value = self.gen_expr(expr)?;
                self.line(&format!("void ({value}); // wait: pages never block"));
            }

            Stmt::Expr(expr) => {
                let value = self.gen_expr(expr)?;
                self.line(&format!("{value};"));
            }
        }
        Ok(())
    }

    fn gen_if(&mut self, stmt: &IfStmt, prefix: &str) -> Result<(), GenError> {
        let cond = self.gen_expr(&stmt.condition)?;
        self.line(&format!("{prefix}if (__truthy({cond})) {{"));
        self.gen_body(&stmt.then_block)?;
        match stmt.else_block.as_deref() {
            Some([Stmt::If(nested)]) => self.gen_if(nested, "} else ")?,
            Some(block) => {
                self.line("} else {");
                self.gen_body(block)?;
                self.line("}");
            }
            None => self.line("}"),
        }
        Ok(())
    }

    // ─── Expressions ──────────────────────────────────────────────────────────

    fn gen_args(&mut self, args: &[&Expr]) -> Result<String, GenError> {
        let parts = args.iter()
            .map(|e| self.gen_expr(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(", "))
    }

    fn gen_expr(&mut self, expr: &Expr) -> Result<String, GenError> {
        let js = match expr {
            Expr::Literal(lit, span) => match lit {
                Literal::Number(n) if !n.is_finite() => {
                    return Err(GenError::UnrepresentableNumber { line: span.line, value: *n });
                }
                Literal::Number(n) => format_number(*n),
                Literal::Str(s)    => js_string(s),
                Literal::Bool(b)   => b.to_string(),
                Literal::Null      => "null".to_string(),
            },

            Expr::Variable(name, _) => self.resolve(name),

            Expr::Binary { left, op, right, .. } => {
                let l = self.gen_expr(left)?;
                let r = self.gen_expr(right)?;
                match op {
                    BinOp::Eq    => format!("__eq({l}, {r})"),
                    BinOp::NotEq => format!("__ne({l}, {r})"),
                    BinOp::And   => format!("(__truthy({l}) && __truthy({r}))"),
                    BinOp::Or    => format!("(__truthy({l}) || __truthy({r}))"),
                    BinOp::Add   => format!("__add({l}, {r})"),
                    _ => format!("({l} {} {r})", op.symbol()),
                }
            }

            Expr::Unary { op, operand, .. } => {
                let v = self.gen_expr(operand)?;
                match op {
                    UnOp::Neg => format!("(-{v})"),
                    UnOp::Not => format!("(!__truthy({v}))"),
                }
            }

            Expr::Call { callee, args, .. } => {
                let callee = match &**callee {
                    Expr::Variable(name, _) if is_builtin(name) => self.builtin_callee(name),
                    other => self.gen_expr(other)?,
                };
                let args = args.iter()
                    .map(|a| self.gen_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("{callee}({})", args.join(", "))
            }

            Expr::Index { target, index, .. } => {
                let t = self.gen_expr(target)?;
                let i = self.gen_expr(index)?;
                format!("__index({t}, {i})")
            }

            Expr::Array(items, _) => {
                let items = items.iter()
                    .map(|e| self.gen_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("[{}]", items.join(", "))
            }
        };
        Ok(js)
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn mangle(name: &str) -> String {
    if name.starts_with("__") || JS_RESERVED.contains(&name) {
        format!("${name}")
    } else {
        name.to_string()
    }
}

/// Double-quoted JavaScript string literal, safe inside a `<script>` element.
pub(crate) fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"'  => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<'  => out.push_str("\\u003c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn canvas_dim(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 { v.round() as u64 } else { 0 }
}

fn collect_images(program: &Program) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    walk_stmts(&program.statements, &mut |stmt| {
        if let Stmt::Load { path, .. } = stmt {
            if !images.contains(path) {
                images.push(path.clone());
            }
        }
    });
    images
}

/// Names a top-level statement (or the scene body) can bind.
fn collect_globals(program: &Program) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut visit = |stmt: &Stmt| match stmt {
        Stmt::Let { name, .. } | Stmt::Load { name, .. } => { names.insert(name.clone()); }
        Stmt::ForEach { var, .. } => { names.insert(var.clone()); }
        Stmt::Function(decl) => { names.insert(decl.name.clone()); }
        _ => {}
    };
    for stmt in &program.statements {
        if let Stmt::Scene(scene) = stmt {
            scene.body.iter().for_each(&mut visit);
        }
        visit(stmt);
    }
    names
}

// ─── Tests ───────────────────────────────────────────────────────────────────
