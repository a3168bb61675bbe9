use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{self, Command};

use clap::Parser as ClapParser;
use log::{debug, error};

use mica::errors::CompileError;
use mica::{check, generate_code, SourceFile};

#[derive(ClapParser, Debug)]
#[command(name = "mica")]
#[command(about = "A single-pass compiler for the Mica language", long_about = None)]
struct Args {
    #[arg(help = "Input source file (.mc)")]
    input: PathBuf,

    #[arg(long, help = "Stop after writing the assembly file")]
    emit_asm: bool,

    #[arg(long, help = "Run the produced binary and propagate its exit status")]
    run: bool,

    #[arg(short, long, help = "Output path for the linked binary")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Verbose compiler logging")]
    verbose: bool,
}

/// Locate the hand-written runtime, in resolution order: the MICA_RUNTIME
/// environment variable (file or directory), a runtime/ directory next to
/// the executable, then the working directory.
fn find_runtime() -> Option<PathBuf> {
    if let Ok(value) = env::var("MICA_RUNTIME") {
        let path = PathBuf::from(&value);
        if path.is_file() {
            return Some(path);
        }
        let in_dir = path.join("runtime.s");
        if in_dir.is_file() {
            return Some(in_dir);
        }
    }
    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            let beside = dir.join("runtime").join("runtime.s");
            if beside.is_file() {
                return Some(beside);
            }
        }
    }
    let local = PathBuf::from("runtime/runtime.s");
    if local.is_file() {
        return Some(local);
    }
    None
}

fn report(diagnostics: &[CompileError]) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
}

fn assemble_and_link(asm_path: &Path, runtime: &Path, output: &Path) -> Result<(), String> {
    let program_obj = asm_path.with_extension("o");
    let runtime_obj = asm_path.with_file_name("mica_runtime.o");

    run_tool(
        Command::new("as")
            .arg("-o")
            .arg(&program_obj)
            .arg(asm_path),
        "as",
    )?;
    run_tool(
        Command::new("as").arg("-o").arg(&runtime_obj).arg(runtime),
        "as",
    )?;
    run_tool(
        Command::new("ld")
            .arg("-o")
            .arg(output)
            .arg(&program_obj)
            .arg(&runtime_obj),
        "ld",
    )?;

    let _ = fs::remove_file(&program_obj);
    let _ = fs::remove_file(&runtime_obj);
    Ok(())
}

fn run_tool(command: &mut Command, name: &str) -> Result<(), String> {
    let status = command
        .status()
        .map_err(|e| format!("failed to invoke {}: {}", name, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{} exited with {}", name, status))
    }
}

fn main() {
    let args = Args::parse();
    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            error!("cannot read {}: {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let filename = args.input.to_string_lossy().to_string();
    debug!("compiling {}", filename);
    let (program, symbols, mut diagnostics) = check(&source, &filename);

    // The assembly file is written even for a failing compile, partial
    // output helps when chasing a bad diagnostic.
    let asm_path = args.input.with_extension("s");
    if let Some(program) = &program {
        let source_file = SourceFile::new(&filename, &source);
        let asm = generate_code(program, &symbols, &source_file, &mut diagnostics);
        if let Err(e) = fs::write(&asm_path, &asm) {
            error!("cannot write {}: {}", asm_path.display(), e);
            process::exit(1);
        }
        debug!("wrote {}", asm_path.display());
    }

    if !diagnostics.is_empty() {
        report(&diagnostics);
        process::exit(1);
    }

    if args.emit_asm {
        return;
    }

    let Some(runtime) = find_runtime() else {
        error!("runtime.s not found; set MICA_RUNTIME or keep runtime/ beside the compiler");
        process::exit(1);
    };
    debug!("linking against {}", runtime.display());

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension(""));
    if let Err(message) = assemble_and_link(&asm_path, &runtime, &output) {
        error!("{}", message);
        process::exit(1);
    }

    if args.run {
        let absolute = match fs::canonicalize(&output) {
            Ok(path) => path,
            Err(e) => {
                error!("cannot resolve {}: {}", output.display(), e);
                process::exit(1);
            }
        };
        debug!("running {}", absolute.display());
        match Command::new(&absolute).status() {
            Ok(status) => process::exit(status.code().unwrap_or(1)),
            Err(e) => {
                error!("failed to run {}: {}", absolute.display(), e);
                process::exit(1);
            }
        }
    }
}
