mod assets;
mod host;
mod viewer;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kuromi_lang::{check, generate, Error, FunctionScope, GenConfig, Program, RunConfig};
use tracing::{error, info, warn};

use crate::host::{spawn_eval, HeadlessHost};
use crate::viewer::Launch;

#[derive(Parser)]
#[command(version, about = "Run KuromiScript scenes or compile them to a web page")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a program in a window
    Run {
        file: PathBuf,
        /// Directory `load` and `play` paths are resolved against
        /// (defaults to the program's directory)
        #[arg(long, value_name = "DIR")]
        assets: Option<PathBuf>,
        /// Run without a window; drawing is recorded and waits are skipped
        #[arg(long)]
        headless: bool,
        /// Seed for `random`
        #[arg(long)]
        seed: Option<u64>,
        /// Let functions see the scope they were declared in
        #[arg(long)]
        lexical_scope: bool,
    },
    /// Compile a program to a standalone HTML page
    Build {
        file: PathBuf,
        /// Output path (defaults to the input with an .html extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "Kuromi")]
        title: String,
        /// Asset path prefix used by the page
        #[arg(long, default_value = "assets/")]
        assets: String,
    },
    /// Report lexical and syntax errors without running
    Check { file: PathBuf },
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kuromi=info,kuromi_lang=warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).with_level(true))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run { file, assets, headless, seed, lexical_scope } => {
            let mut config = RunConfig::default();
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if lexical_scope {
                config = config.with_function_scope(FunctionScope::Lexical);
            }
            run(&file, assets, headless, config)
        }
        Command::Build { file, output, title, assets } => {
            let output = output.unwrap_or_else(|| file.with_extension("html"));
            build(&file, &output, GenConfig { title, asset_dir: assets, ..GenConfig::default() })
        }
        Command::Check { file } => check_file(&file),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn read_source(file: &Path) -> Result<String, String> {
    std::fs::read_to_string(file).map_err(|e| format!("cannot read {}: {e}", file.display()))
}

/// Parses `source` once. Each diagnostic has already been logged by the
/// lexer or parser; this adds the summary.
fn parse(file: &Path, source: &str) -> (Program, Vec<Error>) {
    let (program, errors) = check(source);
    if !errors.is_empty() {
        warn!(file = %file.display(), count = errors.len(), "source has errors");
    }
    (program, errors)
}

fn run(file: &Path, assets: Option<PathBuf>, headless: bool, config: RunConfig) -> Result<(), String> {
    let source = read_source(file)?;
    let asset_dir = assets.unwrap_or_else(|| {
        file.parent().map(Path::to_path_buf).unwrap_or_default()
    });
    let (program, errors) = parse(file, &source);

    if headless {
        return run_headless(program, asset_dir, config);
    }

    let errors = errors.iter().map(Error::to_string).collect();
    viewer::open(Launch { file: file.to_path_buf(), program, errors, asset_dir, config })
        .map_err(|e| format!("viewer failed: {e}"))
}

fn run_headless(program: Program, asset_dir: PathBuf, config: RunConfig) -> Result<(), String> {
    let worker = spawn_eval(move || {
        let mut host = HeadlessHost::new(&asset_dir);
        kuromi_lang::run(&program, &mut host, &config)
            .map(|()| host.commands.len())
            .map_err(|e| e.to_string())
    })
    .map_err(|e| format!("cannot start evaluation thread: {e}"))?;
    let commands = worker.join().map_err(|_| "evaluation thread panicked".to_string())??;
    info!(commands, "program finished");
    Ok(())
}

fn build(file: &Path, output: &Path, config: GenConfig) -> Result<(), String> {
    let source = read_source(file)?;
    let (program, errors) = check(&source);
    if !errors.is_empty() {
        return Err(format!("{}: {} error(s), nothing written", file.display(), errors.len()));
    }
    let artifact = generate(&program, &config).map_err(|e| e.to_string())?;
    std::fs::write(output, &artifact.html)
        .map_err(|e| format!("cannot write {}: {e}", output.display()))?;
    info!(
        output = %output.display(),
        width = artifact.width,
        height = artifact.height,
        images = artifact.images.len(),
        "page written"
    );
    Ok(())
}

fn check_file(file: &Path) -> Result<(), String> {
    let source = read_source(file)?;
    match parse(file, &source).1.len() {
        0 => {
            info!(file = %file.display(), "ok");
            Ok(())
        }
        n => Err(format!("{}: {n} error(s)", file.display())),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
