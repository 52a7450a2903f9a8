//! Parses the two statement forms the store accepts: `insert <id> <username>
//! <email>` and `select`, producing the diagnostic taxonomy of §7
//! (`SyntaxError` / `NegativeId` / `StringTooLong` / `UnrecognizedStatement`).

use crate::errors::Error;
use crate::row::{Row, EMAIL_MAX, USERNAME_MAX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

pub fn prepare(line: &str) -> Result<Statement, Error> {
    let mut words = line.split_whitespace();
    let keyword = words.next().unwrap_or("");

    if keyword == "select" {
        return Ok(Statement::Select);
    }
    if keyword == "insert" {
        return prepare_insert(words);
    }
    Err(Error::UnrecognizedStatement(line.to_string()))
}

fn prepare_insert<'a>(mut words: impl Iterator<Item = &'a str>) -> Result<Statement, Error> {
    let id_string = words
        .next()
        .ok_or(Error::Syntax("Could not parse statement.".to_string()))?;
    let username = words
        .next()
        .ok_or(Error::Syntax("Could not parse statement.".to_string()))?;
    let email = words
        .next()
        .ok_or(Error::Syntax("Could not parse statement.".to_string()))?;

    let id: i64 = id_string
        .parse()
        .map_err(|_| Error::Syntax("Could not parse statement.".to_string()))?;
    if id < 0 {
        return Err(Error::NegativeId);
    }
    let id: u32 = id
        .try_into()
        .map_err(|_| Error::Syntax("Could not parse statement.".to_string()))?;
    if username.len() > USERNAME_MAX || email.len() > EMAIL_MAX {
        return Err(Error::StringTooLong);
    }

    Ok(Statement::Insert(Row::new(id, username, email)))
}
