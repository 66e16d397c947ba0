/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // misplaced or malformed scene block
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
        }
    }

    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::L001 | Self::L002)
    }
}

/// A lexical or syntax diagnostic. Collected, never fatal on its own.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{}] {}:{}: {}", .code.as_str(), .line, .column, .message)]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    TypeMismatch,
    DivisionByZero,
    NotCallable,
    IndexOutOfBounds,
    ArgumentCount,
    CallDepth,
}

impl RuntimeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndefinedVariable => "R001",
            Self::TypeMismatch      => "R002",
            Self::DivisionByZero    => "R003",
            Self::NotCallable       => "R004",
            Self::IndexOutOfBounds  => "R005",
            Self::ArgumentCount     => "R006",
            Self::CallDepth         => "R007",
        }
    }
}

/// Fatal evaluator error. Stops the current run.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{}] line {}: {}", .kind.code(), .line, .message)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self { kind, line, message: message.into() }
    }

    pub fn undefined(line: usize, name: &str) -> Self {
        Self::new(RuntimeErrorKind::UndefinedVariable, line, format!("undefined variable `{name}`"))
    }

    pub fn type_mismatch(line: usize, message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::TypeMismatch, line, message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Failure raised by the code generator before any output is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenError {
    #[error("line {line}: number literal evaluates to `{value}`, which has no script representation")]
    UnrepresentableNumber { line: usize, value: f64 },
}

/// Reported by asset loaders. Logged by the evaluator, never fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssetError {
    #[error("asset `{path}` not found")]
    NotFound { path: String },
    #[error("cannot decode `{path}`: {reason}")]
    Decode { path: String, reason: String },
    #[error("{0}")]
    Unsupported(String),
}
