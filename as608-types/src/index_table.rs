//! Occupied template indices
//!
//! The module reports its template library as bitmap pages. Bit `j` of
//! byte `i` on page `p` marks template `p * 256 + 8 * i + j` as stored.

use std::collections::BTreeSet;

use as608_core::constants::index_table::{CAPACITY, INDICES_PER_PAGE, PAGES};

use crate::error::{Error, Result};

/// Ascending set of occupied template indices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTable {
    occupied: BTreeSet<u16>,
}

impl IndexTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one bitmap page
    ///
    /// # Examples
    ///
    /// ```
    /// use as608_types::IndexTable;
    ///
    /// let mut table = IndexTable::new();
    /// table.push_page(0, &[0b0000_0101]).unwrap();
    /// table.push_page(1, &[0x00, 0x80]).unwrap();
    ///
    /// assert_eq!(table.occupied(), vec![0, 2, 271]);
    /// ```
    pub fn push_page(&mut self, page: u8, bitmap: &[u8]) -> Result<()> {
        if page >= PAGES {
            return Err(Error::Validation(format!(
                "index page {} out of range (0..{})",
                page, PAGES
            )));
        }

        let base = u32::from(page) * u32::from(INDICES_PER_PAGE);
        for (i, byte) in bitmap.iter().enumerate() {
            for j in 0..8u32 {
                if byte & (1 << j) == 0 {
                    continue;
                }

                let index = base + 8 * i as u32 + j;
                let index = u16::try_from(index).map_err(|_| {
                    Error::Validation(format!("template index {} out of range", index))
                })?;
                self.occupied.insert(index);
            }
        }

        Ok(())
    }

    /// Occupied indices in ascending order
    pub fn occupied(&self) -> Vec<u16> {
        self.occupied.iter().copied().collect()
    }

    /// Check if a template is stored at `index`
    pub fn contains(&self, index: u16) -> bool {
        self.occupied.contains(&index)
    }

    /// Number of stored templates
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Smallest unused index below the table capacity
    ///
    /// Returns `None` when every index is taken.
    pub fn next_free(&self) -> Option<u16> {
        (0..CAPACITY).find(|index| !self.occupied.contains(index))
    }
}

impl FromIterator<u16> for IndexTable {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self {
            occupied: iter.into_iter().collect(),
        }
    }
}
