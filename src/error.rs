use thiserror::Error;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("{0}")]
    Usage(String),
    #[error("cannot open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown node kind {0:#04x}")]
    UnknownNodeKind(u8),
    #[error("expected a {expected} node, found {found}")]
    WrongNodeKind {
        expected: &'static str,
        found: &'static str,
    },
    #[error("cell {index} out of bounds for node with {count} cells")]
    CellOutOfBounds { index: usize, count: u32 },
    #[error("cell count {count} exceeds capacity {max}")]
    CellCountOverflow { count: u32, max: usize },
    #[error("cell array truncated: {0}")]
    Truncated(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type TreeResult<T> = Result<T, TreeError>;
