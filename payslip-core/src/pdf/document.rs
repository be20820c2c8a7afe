use crate::error::{ExtractError, Result};
use crate::pdf::PageSource;
use lopdf::Document;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A loaded source PDF. Never mutated; subsets are written from clones.
pub struct PdfDocument {
    inner: Document,
    /// lopdf's 1-based page numbers in page-tree order; position = zero-based index
    page_numbers: Vec<u32>,
}

impl PdfDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let inner = Document::load(path).map_err(|source| ExtractError::DocumentLoad {
            path: path.to_path_buf(),
            source,
        })?;
        if inner.is_encrypted() {
            return Err(ExtractError::Encrypted(path.to_path_buf()));
        }
        let page_numbers = inner.get_pages().into_keys().collect();
        Ok(Self {
            inner,
            page_numbers,
        })
    }

    /// Write a new PDF holding only the given zero-based pages, in source order.
    ///
    /// Out-of-range indices are ignored. Returns the number of pages written.
    pub fn save_pages(&self, pages: &[usize], dest: &Path) -> Result<usize> {
        let keep: BTreeSet<u32> = pages
            .iter()
            .filter_map(|&i| self.page_numbers.get(i).copied())
            .collect();
        let discard: Vec<u32> = self
            .page_numbers
            .iter()
            .copied()
            .filter(|n| !keep.contains(n))
            .collect();

        let mut subset = self.inner.clone();
        subset.delete_pages(&discard);
        subset.prune_objects();

        let write_err = |source: std::io::Error| ExtractError::PageWrite {
            path: dest.to_path_buf(),
            source,
        };
        let file = File::create(dest).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        subset.save_to(&mut writer).map_err(write_err)?;
        writer.flush().map_err(write_err)?;

        Ok(keep.len())
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        let number = *self.page_numbers.get(index)?;
        self.inner.extract_text(&[number]).ok()
    }
}
