use minilisp::evaluator::{self, Environment};
use minilisp::value::Heap;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
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
    println!("minilisp interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize line editor");
    let mut heap = Heap::new();
    let env = evaluator::root_environment(&mut heap);

    loop {
        match rl.readline("minilisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&heap, &env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match evaluator::eval_source(&mut heap, line, &env) {
                    Ok(value) => println!("{}", heap.display(&value)),
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

fn print_help() {
    println!("minilisp REPL:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Special forms: quote, lambda, if, define, begin");
    println!("Primitives: cons, car, cdr, null?, +");
    println!();
    println!("Examples:");
    println!("  (+ 1 2)");
    println!("  (define lst (cons 1 (cons 2 ())))");
    println!("  (car lst)");
    println!("  ((lambda (a b) (+ a b)) 1 2)");
    println!();
}

/// Walk the frame chain outward, printing each frame's bindings.
fn print_environment(heap: &Heap, env: &Environment) {
    let mut frame = env.as_value().clone();
    let mut level = 0;

    while frame.is_pair() {
        let (Ok(mut vars), Ok(mut vals)) = (heap.car(&frame), heap.cadr(&frame)) else {
            break;
        };

        if vars.is_nil() {
            println!("frame {level}: (empty)");
        } else {
            println!("frame {level}:");
            while vars.is_pair() {
                let (Ok(name), Ok(value)) = (heap.car(&vars), heap.car(&vals)) else {
                    break;
                };
                println!("  {} = {}", heap.display(&name), heap.display(&value));
                let (Ok(next_vars), Ok(next_vals)) = (heap.cdr(&vars), heap.cdr(&vals)) else {
                    break;
                };
                vars = next_vars;
                vals = next_vals;
            }
        }

        // Parent frame is the third element of the frame list.
        let Ok(tail) = heap.cdr(&frame) else { break };
        let Ok(tail) = heap.cdr(&tail) else { break };
        let Ok(parent) = heap.car(&tail) else { break };
        frame = parent;
        level += 1;
    }
}
