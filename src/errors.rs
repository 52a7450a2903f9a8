use std::fmt;

/// Crate-wide error type, grouped by the Prepare/Execute/Meta/Fatal
/// taxonomy the REPL reports against.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    CorruptFile,
    PageOutOfBounds(u32),
    FlushEmptySlot(u32),
    SplitOfNonRoot,

    Syntax(String),
    NegativeId,
    StringTooLong,
    UnrecognizedStatement(String),

    DuplicateKey,
    TableFull,

    UnrecognizedCommand(String),
}

impl Error {
    /// True for the conditions that terminate the process (§7 Fatal).
    /// Everything else is reported on one line and the REPL continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::CorruptFile
                | Error::PageOutOfBounds(_)
                | Error::FlushEmptySlot(_)
                | Error::SplitOfNonRoot
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error. {}", e),
            Error::CorruptFile => write!(f, "Db file is not a whole number of pages. Corrupt file."),
            Error::PageOutOfBounds(n) => {
                write!(f, "Tried to fetch page number out of bounds. {}", n)
            }
            Error::FlushEmptySlot(n) => write!(f, "Tried to flush null page {}.", n),
            Error::SplitOfNonRoot => write!(f, "Internal error: split node has no recorded ancestor."),

            Error::Syntax(msg) => write!(f, "Syntax error. {}", msg),
            Error::NegativeId => write!(f, "ID must be positive."),
            Error::StringTooLong => write!(f, "String is too long."),
            Error::UnrecognizedStatement(input) => {
                write!(f, "Unrecognized keyword at start of '{}'.", input)
            }

            Error::DuplicateKey => write!(f, "Error: Duplicate key."),
            Error::TableFull => write!(f, "Error: Table full."),

            Error::UnrecognizedCommand(input) => {
                write!(f, "Unrecognized command '{}'.", input)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
