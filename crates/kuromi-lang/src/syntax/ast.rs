use std::sync::Arc;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    /// Canvas size declared by a leading `game W H { }` block.
    pub fn scene(&self) -> Option<(f64, f64)> {
        match self.statements.first() {
            Some(Stmt::Scene(scene)) => Some((scene.width, scene.height)),
            _ => None,
        }
    }
}

/// `game 800 600 { ... }`
#[derive(Debug, Clone)]
pub struct SceneBlock {
    pub width: f64,
    pub height: f64,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ─── Functions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    Scene(SceneBlock),
    /// `let x = 3`
    Let { name: String, init: Expr, span: Span },
    /// `x = 3`
    Assign { name: String, value: Expr, span: Span },
    /// `fn name(a, b) { }`
    /// Shared with the closures created from it.
    Function(Arc<FunctionDecl>),
    /// `return expr` or bare `return`
    Return(Option<Expr>, Span),
    If(IfStmt),
    /// `while cond { }`
    While { condition: Expr, body: Vec<Stmt>, span: Span },
    /// `for item in list { }`
    ForEach { var: String, iterable: Expr, body: Vec<Stmt>, span: Span },
    /// `load hero "hero.bmp"`
    Load { name: String, path: String, span: Span },
    Draw(DrawShape, Span),
    /// `show (center) "text" x y`
    Show { text: Expr, x: Expr, y: Expr, align: Align, span: Span },
    /// `play "jump.wav"`
    Play { path: String, span: Span },
    Print(Expr, Span),
    /// `wait 500` (milliseconds)
    Wait(Expr, Span),
    Block(Vec<Stmt>, Span),
    /// A standalone expression used as a statement (e.g. a function call).
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Vec<Stmt>,
    /// `else if` chains nest as a single `If` statement in the else block.
    pub else_block: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DrawShape {
    Rect { x: Expr, y: Expr, w: Expr, h: Expr, color: Expr },
    Circle { x: Expr, y: Expr, r: Expr, color: Expr },
    Line { x1: Expr, y1: Expr, x2: Expr, y2: Expr, color: Expr },
    Triangle { x1: Expr, y1: Expr, x2: Expr, y2: Expr, x3: Expr, y3: Expr, color: Expr },
    Image { image: Expr, x: Expr, y: Expr },
}

impl DrawShape {
    pub fn name(&self) -> &'static str {
        match self {
            DrawShape::Rect { .. }     => "rect",
            DrawShape::Circle { .. }   => "circle",
            DrawShape::Line { .. }     => "line",
            DrawShape::Triangle { .. } => "triangle",
            DrawShape::Image { .. }    => "image",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "left" => Some(Align::Left),
            "center" | "centered" => Some(Align::Center),
            "right" => Some(Align::Right),
            _ => None,
        }
    }

    /// Canvas `textAlign` keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left   => "left",
            Align::Center => "center",
            Align::Right  => "right",
        }
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal, Span),
    Variable(String, Span),

    /// `a + b`, `a == b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `not x`, `-x`
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `callee(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `target[index]`
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },

    /// `[1, 2, 3]`
    Array(Vec<Expr>, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, s)       => *s,
            Expr::Variable(_, s)      => *s,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. }  => *span,
            Expr::Call { span, .. }   => *span,
            Expr::Index { span, .. }  => *span,
            Expr::Array(_, s)         => *s,
        }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add  => "+",  BinOp::Sub  => "-",
            BinOp::Mul  => "*",  BinOp::Div  => "/",  BinOp::Mod => "%",
            BinOp::Eq   => "==", BinOp::NotEq => "!=",
            BinOp::Lt   => "<",  BinOp::LtEq => "<=",
            BinOp::Gt   => ">",  BinOp::GtEq => ">=",
            BinOp::And  => "and", BinOp::Or  => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

// ─── Traversal ───────────────────────────────────────────────────────────────

/// Calls `f` on every statement in `stmts`, depth first, in source order.
pub fn walk_stmts<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
    for stmt in stmts {
        f(stmt);
        match stmt {
            Stmt::Scene(scene) => walk_stmts(&scene.body, f),
            Stmt::Function(decl) => walk_stmts(&decl.body, f),
            Stmt::If(i) => {
                walk_stmts(&i.then_block, f);
                if let Some(else_block) = &i.else_block { walk_stmts(else_block, f); }
            }
            Stmt::While { body, .. } | Stmt::ForEach { body, .. } | Stmt::Block(body, _) => {
                walk_stmts(body, f)
            }
            _ => {}
        }
    }
}
