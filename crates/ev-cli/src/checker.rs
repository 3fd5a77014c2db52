use std::path::Path;

use ev_compiler::{compile_program, CompilerOptions, ExpressionCompiler, RhaiExpressionCompiler};
use ev_core::{EventError, Program};

use crate::{
    collect_program_files, json_string, load_program_file, map_cli_scan, resolve_dir, CheckArgs,
};

pub(crate) fn run_check(args: CheckArgs) -> Result<i32, EventError> {
    let root = resolve_dir(&args.dir)?;
    let files = collect_program_files(&root);
    if files.is_empty() {
        return Err(EventError::new(
            "CLI_CHECK_EMPTY",
            format!("No program files found under {}", root.display()),
        ));
    }

    let compiler = RhaiExpressionCompiler::new();
    let options = CompilerOptions::default();
    let mut failed = 0usize;
    for path in &files {
        let relative = path.strip_prefix(&root).map_err(map_cli_scan)?;
        match check_program_file(path, &compiler, &options) {
            Ok(commands) => println!("CHECK:OK|{}|{}", relative.display(), commands),
            Err(error) => {
                failed += 1;
                println!(
                    "CHECK:ERROR|{}|{}|{}",
                    relative.display(),
                    error.code,
                    json_string(&error.message)
                );
            }
        }
    }

    if failed > 0 {
        return Err(EventError::new(
            "CLI_CHECK_FAILED",
            format!("{} of {} program files failed to compile.", failed, files.len()),
        ));
    }
    println!("RESULT:OK");
    println!("CHECKED:{}", files.len());
    Ok(0)
}

/// Compiles the main program and every common event of one file; returns
/// the number of commands compiled.
pub(crate) fn check_program_file(
    path: &Path,
    compiler: &dyn ExpressionCompiler,
    options: &CompilerOptions,
) -> Result<usize, EventError> {
    let bundle = load_program_file(path)?;
    let mut commands = compile_program(&Program::new(bundle.commands), compiler, options)?.len();
    for (id, common) in bundle.common_events {
        let compiled = compile_program(&Program::new(common), compiler, options).map_err(
            |error| EventError {
                message: format!("common event {}: {}", id, error.message),
                ..error
            },
        )?;
        commands += compiled.len();
    }
    Ok(commands)
}
