//! Interactive query session.
//!
//! Lines are accumulated until a blank line, then the buffered text is run as
//! one query. Errors are printed and the session continues.

use csvql::{CsvSource, Engine};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::error::Result;
use crate::output::format_relation;
use crate::OutputFormat;

pub struct Repl {
    engine: Engine<CsvSource>,
    format: OutputFormat,
    show_ast: bool,
    editor: DefaultEditor,
}

impl Repl {
    pub fn new(engine: Engine<CsvSource>, format: OutputFormat, show_ast: bool) -> Result<Self> {
        let editor = DefaultEditor::new()?;
        Ok(Self {
            engine,
            format,
            show_ast,
            editor,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        println!("csvql v{}", env!("CARGO_PKG_VERSION"));
        println!("Enter a query, then a blank line to run it. Type .exit to quit.");

        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { "csvql> " } else { "  ...> " };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if buffer.is_empty() && matches!(trimmed, ".exit" | ".quit") {
                        break;
                    }
                    if !trimmed.is_empty() {
                        buffer.push_str(&line);
                        buffer.push('\n');
                        continue;
                    }
                    if buffer.trim().is_empty() {
                        continue;
                    }
                    let query = std::mem::take(&mut buffer);
                    if let Err(e) = self.editor.add_history_entry(query.trim_end()) {
                        debug!(error = %e, "history entry not recorded");
                    }
                    if let Err(e) = self.run_query(&query) {
                        eprintln!("Error: {e}");
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    buffer.clear();
                    println!("Use .exit or Ctrl-D to exit");
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn run_query(&self, text: &str) -> Result<()> {
        debug!(bytes = text.len(), "running buffered query");
        let query = self.engine.compile(text)?;
        if self.show_ast {
            println!("{query}");
        }
        let result = self.engine.execute(&query)?;
        println!("{}", format_relation(&result, self.format)?);
        Ok(())
    }
}
