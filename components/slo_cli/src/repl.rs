//! REPL (Read-Eval-Print Loop) implementation

use crate::error::{CliError, CliResult};
use crate::runtime::{Runtime, REPL_LABEL};
use interpreter::InterpretError;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive REPL
///
/// Faults are reported and the loop continues. `exit`, `quit` or Ctrl-D
/// leave normally; a script-level `exit(n)` is returned to the caller.
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()?;

    println!("slo {}", env!("CARGO_PKG_VERSION"));
    println!("Type slo code, .help for commands, or 'exit' to quit.");

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "> " } else { "... " };
        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if buffer.is_empty() {
                    if trimmed == "exit" || trimmed == "quit" {
                        break;
                    }
                    if trimmed.starts_with('.') {
                        handle_repl_command(trimmed, runtime);
                        continue;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                } else {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if !is_input_complete(&buffer) {
                    continue;
                }
                let _ = editor.add_history_entry(buffer.as_str());
                let source = std::mem::take(&mut buffer);
                match runtime.execute_string(&source, REPL_LABEL) {
                    Ok(()) => {}
                    Err(CliError::Interpret(InterpretError::Exit(code))) => {
                        return Err(CliError::Interpret(InterpretError::Exit(code)));
                    }
                    Err(error) => eprint!("{}", error.report()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                if buffer.is_empty() {
                    println!("Press Ctrl-D or type 'exit' to quit");
                } else {
                    println!("^C");
                    buffer.clear();
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}

/// Handle special REPL commands
fn handle_repl_command(command: &str, runtime: &mut Runtime) {
    match command {
        ".help" => {
            println!("REPL Commands:");
            println!("  .help     - Show this help message");
            println!("  .clear    - Clear the screen");
            println!("  .gc       - Run a garbage collection now");
            println!("  .stats    - Show heap statistics");
            println!("  exit      - Exit the REPL");
        }
        ".clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        ".gc" => {
            let report = runtime.vm_mut().collect_garbage();
            println!(
                "collected {} objects, {} -> {} bytes, next at {}",
                report.freed_objects, report.bytes_before, report.bytes_after, report.next_gc
            );
        }
        ".stats" => {
            let stats = runtime.vm().heap_stats();
            println!(
                "{} live objects, {} bytes allocated, next collection at {}, {} cycles",
                stats.live_objects, stats.bytes_allocated, stats.next_gc, stats.collections
            );
        }
        _ => {
            println!("Unknown command: {}", command);
            println!("Type .help for available commands");
        }
    }
}

/// Check if the input appears to be complete
///
/// Balanced braces, brackets and parentheses outside strings and comments.
pub(crate) fn is_input_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(open) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                c if c == open => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '#' => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars),
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && quote.is_none()
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}
