use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sjson::ast::Value;
use sjson::evaluator::{self, Environment};
use sjson::writer;
use std::panic;
use std::process;

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("sjson - Symbolic JSON interpreter");
    println!("Enter notation forms like: (cons 'a '(b c))");
    println!("JSON literals work too: {{\"a\": [1, 2, 3]}}");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut env = evaluator::create_global_env();

    loop {
        match rl.readline("sjson> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                // A line may hold several top-level forms; evaluate them
                // all and print each non-void result
                match evaluator::eval_source(line, &mut env) {
                    Ok(results) => {
                        for result in results {
                            println!("{}", render(&result));
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// Render through the writer, falling back to the debug display for
/// values outside the notation (closures, macros, natives, forms).
fn render(value: &Value) -> String {
    writer::encode(value).unwrap_or_else(|_| format!("{value}"))
}

fn print_help() {
    println!("sjson interpreter:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("The notation mixes S-expressions and JSON literals:");
    println!("  Lists: (a b c), (dotted . pair), '(quoted list)");
    println!("  JSON: [1, 2, 3], {{\"key\": value}}, \"string\", 42, 2.5, true, null");
    println!();
    println!("Special forms: quote, quasiquote, if, lambda, syntax, set!");
    println!("Natives: cons, car, cdr, null?, pair?, symbol?, eq?, fresh-symbol");
    println!("Bootstrap: defmacro, defun, list, reverse");
    println!();
    println!("Examples:");
    println!("  (set! x '(1 2 3))");
    println!("  (reverse x)");
    println!("  (defun (second lst) (car (cdr lst)))");
    println!("  (second x)");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate wired-in procedures from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Native(_) | Value::Form(_) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in procedures and forms ({}):", builtins.len());
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {}", render(&value));
        }
    }
}
