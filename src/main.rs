use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use itertools::Itertools;
use lispy::{Interpreter, Value};
use rustyline::{error::ReadlineError, DefaultEditor};

fn main() -> anyhow::Result<()> {
    color_backtrace::install();
    init_tracing();

    let app = App::parse();

    let mut lisp = Interpreter::new();
    if !app.no_prelude {
        lisp.load_prelude().context("Failed to load the prelude")?;
    }
    for path in &app.files {
        if let Value::Err(e) = lisp.load(&path.to_string_lossy()) {
            bail!("{}: {}", path.display(), e);
        }
    }
    if app.repl() {
        repl(&mut lisp)?;
    }
    Ok(())
}

#[derive(Parser)]
#[clap(version, about = "A small Lisp interpreter")]
struct App {
    /// Source files to load, in order
    #[clap(value_parser)]
    files: Vec<PathBuf>,
    /// Start the REPL after loading the files
    #[clap(short, long)]
    interactive: bool,
    /// Do not load the prelude
    #[clap(long)]
    no_prelude: bool,
}

impl App {
    fn repl(&self) -> bool {
        self.interactive || self.files.is_empty()
    }
}

/// Enable with `RUST_LOG=lispy=debug` or `RUST_LOG=lispy=trace`
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn repl(lisp: &mut Interpreter) -> anyhow::Result<()> {
    println!("Lispy Version {}", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl+C to exit\n");

    let mut editor = DefaultEditor::new().context("Could not initialize the line editor")?;
    loop {
        match editor.readline("lispy> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Err(e) = editor.add_history_entry(line) {
                    tracing::warn!(error = %e, "could not record history");
                }
                match line {
                    ":quit" | ":exit" => break,
                    ":env" => {
                        println!("{}", lisp.global().names().sorted().join(" "));
                        continue;
                    }
                    _ => {}
                }
                #[cfg(feature = "debug")]
                println!("{:#?}", lispy::parse::parse(line));
                match lisp.eval_str(line) {
                    Value::Err(e) => println!("{}", format!("Error: {}", e).red()),
                    value => println!("{}", value),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read a line"),
        }
    }
    Ok(())
}
