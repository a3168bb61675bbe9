pub mod analyzer;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod parser;

use thiserror::Error;

pub use analyzer::{Analyzer, SymbolTable};
pub use codegen::{generate_code, CodeGenerator};
pub use errors::{CompileError, ErrorCode, SourceFile, SourceLocation};
pub use lexer::Lexer;
pub use parser::Parser;

use parser::ast::Program;

/// Driver-level failure. Per-construct problems are `CompileError`
/// diagnostics and are carried in the `Compilation` variant as a batch.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("compilation failed with {} error(s)", .0.len())]
    Compilation(Vec<CompileError>),
}

/// Front half of the pipeline: source text to analyzed program plus any
/// diagnostics collected along the way.
pub fn check(source: &str, filename: &str) -> (Option<Program>, SymbolTable, Vec<CompileError>) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    let mut diagnostics = std::mem::take(&mut lexer.errors);

    let mut parser = Parser::new(tokens).with_source(filename, source);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(error) => {
            diagnostics.push(error);
            return (None, SymbolTable::default(), diagnostics);
        }
    };

    let source_file = SourceFile::new(filename, source);
    let mut analyzer = Analyzer::new().with_source(&source_file);
    analyzer.analyze(&program);
    diagnostics.append(&mut analyzer.errors);
    (Some(program), analyzer.symbols, diagnostics)
}

/// Compiles source text to assembly. Any diagnostic fails the compile; the
/// CLI driver goes through `check`/`generate_code` itself so it can keep
/// the partial output.
pub fn compile_to_string(source: &str, filename: &str) -> Result<String, CompilerError> {
    let (program, symbols, mut diagnostics) = check(source, filename);
    let Some(program) = program else {
        return Err(CompilerError::Compilation(diagnostics));
    };
    let source_file = SourceFile::new(filename, source);
    let asm = generate_code(&program, &symbols, &source_file, &mut diagnostics);
    if diagnostics.is_empty() {
        Ok(asm)
    } else {
        Err(CompilerError::Compilation(diagnostics))
    }
}

/// Reads, compiles and returns the assembly for one source file.
pub fn compile_file(path: &std::path::Path) -> Result<String, CompilerError> {
    let source = std::fs::read_to_string(path)?;
    compile_to_string(&source, &path.to_string_lossy())
}
