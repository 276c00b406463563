//! Flat, physical-order dump of every page in a database file.
//!
//! Pages are visited by index from 0 upward, not by walking the tree from
//! its root, so orphaned or unreachable pages are reported too.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, Write};

use log::{debug, error, info, warn};

use crate::config::InspectConfig;
use crate::error::{TreeError, TreeResult};
use crate::storage::node::{Cell, Node};
use crate::storage::page::{NodeHeader, NodeKind, PAGE_SIZE};
use crate::storage::pager::{Page, Pager};

/// What one page decoded to.
#[derive(Debug)]
pub enum PageReport {
    Leaf {
        page_num: u32,
        header: NodeHeader,
        num_cells: u32,
    },
    Internal {
        page_num: u32,
        header: NodeHeader,
        right_child: u32,
        cells: Vec<Cell>,
    },
    Corrupt {
        page_num: u32,
        error: TreeError,
    },
}

impl PageReport {
    pub fn page_num(&self) -> u32 {
        match self {
            PageReport::Leaf { page_num, .. }
            | PageReport::Internal { page_num, .. }
            | PageReport::Corrupt { page_num, .. } => *page_num,
        }
    }

    /// Write the summary line, plus a detail line in verbose mode.
    pub fn write_to<W: Write>(&self, out: &mut W, verbose: bool) -> TreeResult<()> {
        writeln!(out, "{}", self)?;
        if !verbose {
            return Ok(());
        }

        let header = match self {
            PageReport::Leaf { header, .. } | PageReport::Internal { header, .. } => header,
            PageReport::Corrupt { .. } => return Ok(()),
        };
        write!(out, "  is_root={}, parent=", header.is_root)?;
        match header.parent {
            Some(parent) => write!(out, "{}", parent)?,
            None => write!(out, "none")?,
        }
        if let PageReport::Internal { cells, .. } = self {
            write!(out, ", keys:")?;
            for cell in cells {
                write!(out, " {}", cell.key)?;
            }
        }
        writeln!(out)?;
        Ok(())
    }
}

impl fmt::Display for PageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageReport::Leaf {
                page_num,
                num_cells,
                ..
            } => write!(f, "Page {}: {}, num_cells={}", page_num, NodeKind::Leaf, num_cells),
            PageReport::Internal {
                page_num,
                right_child,
                cells,
                ..
            } => {
                write!(
                    f,
                    "Page {}: {}, num_keys={}, right_child={}, children: ",
                    page_num,
                    NodeKind::Internal,
                    cells.len(),
                    right_child
                )?;
                for cell in cells {
                    write!(f, "{} ", cell.child)?;
                }
                Ok(())
            }
            PageReport::Corrupt { page_num, error } => {
                write!(f, "Page {}: ERROR, {}", page_num, error)
            }
        }
    }
}

/// Decode a single page. `page_count` bounds the child references that are
/// considered valid; anything at or past it is logged.
pub fn inspect_page(page_num: u32, page: &Page, page_count: u32) -> PageReport {
    let node = match Node::decode(page) {
        Ok(node) => node,
        Err(error) => {
            warn!("Page {}: cannot decode node: {}", page_num, error);
            return PageReport::Corrupt { page_num, error };
        }
    };

    match node {
        Node::Leaf(leaf) => {
            debug!("Page {}: leaf with {} cells.", page_num, leaf.num_cells());
            if let Err(e) = leaf.check_capacity() {
                warn!("Page {}: {}", page_num, e);
            }
            PageReport::Leaf {
                page_num,
                header: leaf.header(),
                num_cells: leaf.num_cells(),
            }
        }
        Node::Internal(internal) => {
            debug!(
                "Page {}: internal with {} keys, right child {}.",
                page_num,
                internal.num_keys(),
                internal.right_child()
            );
            let cells = match internal.cells() {
                Ok(cells) => cells,
                Err(error) => {
                    warn!("Page {}: cannot decode cells: {}", page_num, error);
                    return PageReport::Corrupt { page_num, error };
                }
            };
            for child in internal.out_of_range_children(page_count) {
                warn!(
                    "Page {}: child {} is past the end of the file ({} pages).",
                    page_num, child, page_count
                );
            }
            PageReport::Internal {
                page_num,
                header: internal.header(),
                right_child: internal.right_child(),
                cells,
            }
        }
    }
}

/// Totals for one scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub pages_read: u32,
    pub leaves: u32,
    pub internals: u32,
    pub corrupt: u32,
    /// Size of a partial page found at the end of the file, if any.
    pub trailing_bytes: usize,
}

impl ScanSummary {
    fn record(&mut self, report: &PageReport) {
        self.pages_read += 1;
        match report {
            PageReport::Leaf { .. } => self.leaves += 1,
            PageReport::Internal { .. } => self.internals += 1,
            PageReport::Corrupt { .. } => self.corrupt += 1,
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages: {} leaf, {} internal, {} corrupt",
            self.pages_read, self.leaves, self.internals, self.corrupt
        )
    }
}

pub struct Inspector<R = File> {
    pager: Pager<R>,
    config: InspectConfig,
}

impl Inspector<File> {
    /// Open the file named by `config` and prepare a scan over it.
    pub fn open(config: InspectConfig) -> TreeResult<Self> {
        let pager = Pager::open(&config.path)?;
        Ok(Inspector::new(pager, config))
    }
}

impl<R: Read + Seek> Inspector<R> {
    pub fn new(pager: Pager<R>, config: InspectConfig) -> Self {
        Inspector { pager, config }
    }

    /// Walk pages `0..max_pages`, writing one line per decoded page to `out`.
    ///
    /// The scan ends early at the first short or empty read. Pages that fail
    /// to decode are reported and skipped. An I/O error stops the scan and is
    /// returned; lines already written are left in `out`.
    pub fn scan<W: Write>(&mut self, out: &mut W) -> TreeResult<ScanSummary> {
        info!(
            "Scanning {} (up to {} pages).",
            self.config.path.display(),
            self.config.max_pages
        );

        let page_count = self.pager.file_length_pages();
        let mut page = Page::new();
        let mut summary = ScanSummary::default();

        for page_num in 0..self.config.max_pages {
            let read = match self.pager.read_page(page_num, &mut page) {
                Ok(read) => read,
                Err(e) => {
                    error!("Reading page {} failed: {}", page_num, e);
                    out.flush()?;
                    return Err(e.into());
                }
            };

            if read < PAGE_SIZE {
                if page_num == 0 && read == 0 {
                    warn!("{} holds no pages.", self.config.path.display());
                } else if read > 0 {
                    warn!(
                        "Page {} is truncated ({} of {} bytes); ignoring it.",
                        page_num, read, PAGE_SIZE
                    );
                    summary.trailing_bytes = read;
                }
                debug!("End of file at page {}.", page_num);
                break;
            }

            let report = inspect_page(page_num, &page, page_count);
            summary.record(&report);
            report.write_to(out, self.config.verbose)?;
        }

        out.flush()?;
        info!("Scan complete: {}.", summary);
        Ok(summary)
    }
}
