pub mod syntax;
pub mod runtime;
pub mod codegen;
pub mod config;
pub mod error;

pub use codegen::{Artifact, Generator};
pub use config::{FunctionScope, GenConfig, RunConfig};
pub use error::{AssetError, Error, ErrorCode, GenError, RuntimeError, RuntimeErrorKind};
pub use runtime::host::{AssetLoader, Color, CommandSink, DrawCommand, Host, LogSink, Recorder, Surface};
pub use runtime::interpreter::Interpreter;
pub use runtime::value::{ImageHandle, Value};
pub use syntax::ast::{Align, Program};
pub use syntax::token::{Token, TokenKind};

use syntax::lexer::Lexer;
use syntax::parser::Parser;

// ─── Public API ───────────────────────────────────────────────────────────────

/// Lexes and parses `source`, recovering from every error it can. Returns the
/// best-effort program together with all diagnostics, lexical ones first.
pub fn check(source: &str) -> (Program, Vec<Error>) {
    let (tokens, mut errors) = Lexer::new(source).tokenize();
    let (program, syntax_errors) = Parser::new(tokens).parse_recovering();
    errors.extend(syntax_errors);
    (program, errors)
}

/// Parse source text. Fails if any lexical or syntax diagnostic was produced.
pub fn compile(source: &str) -> Result<Program, Vec<Error>> {
    let (program, errors) = check(source);
    if errors.is_empty() { Ok(program) } else { Err(errors) }
}

/// Executes `program` once against `host`. Stops at the first runtime error.
pub fn run(program: &Program, host: &mut dyn Host, config: &RunConfig) -> Result<(), RuntimeError> {
    Interpreter::new(host, config.clone()).run(program)
}

/// Translates `program` into a standalone HTML page.
pub fn generate(program: &Program, config: &GenConfig) -> Result<Artifact, GenError> {
    Generator::new(config.clone()).generate(program)
}
