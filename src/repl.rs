//! The REPL loop: reads a line from stdin, dispatches meta-commands
//! (`.exit`, `.constants`, `.btree`) or statements, and echoes results.
//! Plain `stdin().lines()` — no raw-mode terminal handling — so piped
//! input (as used by the end-to-end test scenarios) works unmodified.

use std::io::{self, Write};

use crate::btree::ROOT_PAGE_NUM;
use crate::diagnostics;
use crate::errors::Error;
use crate::statement::{self, Statement};
use crate::table::Table;

/// The recognized meta-commands, checked against by `dispatch_meta` so
/// `Unrecognized` is derived from one place instead of drifting from the
/// dispatch arms below.
const META_COMMANDS: [&str; 3] = [".exit", ".constants", ".btree"];

pub fn run(mut table: Table, mut input: impl io::BufRead, mut output: impl Write) -> Result<(), Error> {
    let result = (|| -> Result<(), Error> {
        let mut line = String::new();
        loop {
            write!(output, "db > ")?;
            output.flush()?;

            line.clear();
            let bytes_read = input.read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            let line = line.trim_end_matches(['\n', '\r']);

            if line.starts_with('.') {
                match dispatch_meta(line, &mut table, &mut output)? {
                    MetaOutcome::Exit => break,
                    MetaOutcome::Handled => continue,
                    MetaOutcome::Unrecognized => {
                        writeln!(output, "{}", Error::UnrecognizedCommand(line.to_string()))?;
                        continue;
                    }
                }
            }

            match statement::prepare(line) {
                Ok(stmt) => execute(stmt, &mut table, &mut output)?,
                Err(err) => {
                    tracing::debug!(%err, "prepare failed");
                    writeln!(output, "{}", err)?;
                }
            }
        }
        Ok(())
    })();

    // Run to completion regardless of which error ended the loop above, so
    // rows inserted earlier in the session are flushed even if a later
    // statement hit a fatal error.
    let close_result = table.close();
    result.and(close_result)
}

enum MetaOutcome {
    Exit,
    Handled,
    Unrecognized,
}

fn dispatch_meta(line: &str, table: &mut Table, output: &mut impl Write) -> Result<MetaOutcome, Error> {
    if !META_COMMANDS.contains(&line) {
        return Ok(MetaOutcome::Unrecognized);
    }
    match line {
        ".exit" => Ok(MetaOutcome::Exit),
        ".constants" => {
            write!(output, "{}", diagnostics::constants())?;
            Ok(MetaOutcome::Handled)
        }
        ".btree" => match diagnostics::btree(table.pager_mut(), ROOT_PAGE_NUM) {
            Ok(rendered) => {
                write!(output, "{}", rendered)?;
                Ok(MetaOutcome::Handled)
            }
            Err(err) if err.is_fatal() => {
                tracing::error!(%err, ".btree hit a fatal error");
                Err(err)
            }
            Err(err) => {
                writeln!(output, "{}", err)?;
                Ok(MetaOutcome::Handled)
            }
        },
        _ => unreachable!("checked against META_COMMANDS above"),
    }
}

fn execute(stmt: Statement, table: &mut Table, output: &mut impl Write) -> Result<(), Error> {
    match stmt {
        Statement::Insert(row) => match table.insert(row) {
            Ok(()) => writeln!(output, "Executed.")?,
            Err(err) if err.is_fatal() => {
                tracing::error!(%err, "insert hit a fatal error");
                return Err(err);
            }
            Err(err) => {
                tracing::debug!(%err, "insert failed");
                writeln!(output, "{}", err)?;
            }
        },
        Statement::Select => {
            let rows = table.iterate_all().map_err(|err| {
                tracing::error!(%err, "select hit a fatal error");
                err
            })?;
            for row in rows {
                writeln!(output, "{}", row)?;
            }
            writeln!(output, "Executed.")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn run_scenario(db_path: &std::path::Path, script: &str) -> String {
        let table = Table::open(db_path).unwrap();
        let input = io::BufReader::new(script.as_bytes());
        let mut out = Vec::new();
        run(table, input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn insert_then_select_echoes_the_row() {
        let file = NamedTempFile::new().unwrap();
        let out = run_scenario(
            file.path(),
            "insert 1 user1 user1@example.com\nselect\n.exit\n",
        );
        assert!(out.contains("Executed."));
        assert!(out.contains("(1 user1 user1@example.com)"));
    }

    #[test]
    fn duplicate_id_reports_an_error() {
        let file = NamedTempFile::new().unwrap();
        let out = run_scenario(file.path(), "insert 1 a a@x\ninsert 1 b b@x\n.exit\n");
        assert!(out.contains("Error: Duplicate key."));
    }

    #[test]
    fn string_too_long_is_reported() {
        let file = NamedTempFile::new().unwrap();
        let long_username = "a".repeat(33);
        let script = format!("insert 1 {} a@x\n.exit\n", long_username);
        let out = run_scenario(file.path(), &script);
        assert!(out.contains("String is too long."));
    }

    #[test]
    fn persists_across_process_restart() {
        let file = NamedTempFile::new().unwrap();
        run_scenario(file.path(), "insert 1 a a@x\ninsert 2 b b@x\ninsert 3 c c@x\n.exit\n");
        let out = run_scenario(file.path(), "select\n.exit\n");
        assert!(out.contains("(1 a a@x)"));
        assert!(out.contains("(2 b b@x)"));
        assert!(out.contains("(3 c c@x)"));
    }
}
