use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::{TreeError, TreeResult};
use crate::storage::page::PAGE_SIZE;

/// A single 4 KiB page of data.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
}

impl Page {
    pub fn new() -> Self {
        Page { data: [0; PAGE_SIZE] }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new()
    }
}

/// Pager: reads 4 KiB pages from a database file, or from any seekable
/// reader standing in for one. Read-only; nothing is cached and nothing is
/// ever written back.
pub struct Pager<R = File> {
    reader: R,

    /// The number of complete pages in the store when it was opened.
    file_length_pages: u32,

    /// Bytes past the last complete page.
    trailing_bytes: usize,
}

impl Pager<File> {
    /// Open the database file at `path` for reading. Anything that is not a
    /// regular file is refused here rather than failing on the first read.
    pub fn open(path: impl AsRef<Path>) -> TreeResult<Self> {
        let path = path.as_ref();
        let open_err = |source: io::Error| TreeError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_err)?;
        let metadata = file.metadata().map_err(open_err)?;
        if !metadata.is_file() {
            return Err(open_err(io::Error::new(
                ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        debug!("Opened {} ({} bytes).", path.display(), metadata.len());
        Ok(Pager::with_len(file, metadata.len()))
    }
}

impl<R: Read + Seek> Pager<R> {
    /// Wrap an already open store; its length is taken by seeking to the end.
    pub fn new(mut reader: R) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        Ok(Pager::with_len(reader, len))
    }

    fn with_len(reader: R, len: u64) -> Self {
        let file_length_pages = (len / PAGE_SIZE as u64) as u32;
        let trailing_bytes = (len % PAGE_SIZE as u64) as usize;
        debug!(
            "Store holds {} full pages and {} trailing bytes.",
            file_length_pages, trailing_bytes
        );
        Pager {
            reader,
            file_length_pages,
            trailing_bytes,
        }
    }

    /// Read page `page_num` into `page`, returning the number of bytes read.
    ///
    /// A return value below `PAGE_SIZE` means the end of the file was reached
    /// inside (or before) this page; the bytes past it are left zeroed.
    pub fn read_page(&mut self, page_num: u32, page: &mut Page) -> io::Result<usize> {
        let offset = (page_num as u64) * (PAGE_SIZE as u64);
        self.reader.seek(SeekFrom::Start(offset))?;
        page.data.fill(0);

        let mut filled = 0;
        while filled < PAGE_SIZE {
            match self.reader.read(&mut page.data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// How many complete pages were in the file when we opened it?
    pub fn file_length_pages(&self) -> u32 {
        self.file_length_pages
    }

    /// Size of a trailing partial page, zero if the file is page aligned.
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }
}
