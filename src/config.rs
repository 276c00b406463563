use std::path::PathBuf;

use crate::error::{TreeError, TreeResult};
use crate::storage::page::TABLE_MAX_PAGES;

const DEFAULT_PROGRAM: &str = "debugtree";

/// Settings for one inspection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectConfig {
    pub path: PathBuf,
    /// Pages to attempt before stopping; the scan also stops at end of file.
    pub max_pages: u32,
    /// Print root flag, parent and separator keys under each page line.
    pub verbose: bool,
}

impl InspectConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        InspectConfig {
            path: path.into(),
            max_pages: TABLE_MAX_PAGES,
            verbose: false,
        }
    }

    /// Parse `argv`, program name first.
    pub fn from_args<I>(args: I) -> TreeResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let program = args.next().unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
        let usage = |msg: Option<String>| {
            let line = format!("Usage: {} [--max-pages <n>] [--verbose] <db_file>", program);
            TreeError::Usage(match msg {
                Some(msg) => format!("{}\n{}", msg, line),
                None => line,
            })
        };

        let mut path = None;
        let mut max_pages = TABLE_MAX_PAGES;
        let mut verbose = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-v" | "--verbose" => verbose = true,
                "-n" | "--max-pages" => {
                    let value = args
                        .next()
                        .ok_or_else(|| usage(Some(format!("{} needs a value", arg))))?;
                    max_pages = value
                        .parse()
                        .map_err(|_| usage(Some(format!("invalid page count '{}'", value))))?;
                }
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(usage(Some(format!("unknown option '{}'", flag))));
                }
                _ if path.is_none() => path = Some(PathBuf::from(&arg)),
                _ => return Err(usage(Some(format!("unexpected argument '{}'", arg)))),
            }
        }

        let path = path.ok_or_else(|| usage(None))?;
        Ok(InspectConfig {
            path,
            max_pages,
            verbose,
        })
    }
}
