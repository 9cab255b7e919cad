//! Variant gallery paging.
//!
//! The primary variant is shown on its own; the remaining ones are listed
//! newest first and paged.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantKind {
    /// Interpolated clips of a shot
    Motion,
    Image,
}

impl VariantKind {
    pub fn items_per_page(self) -> usize {
        match self {
            VariantKind::Motion => 2,
            VariantKind::Image => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantPager {
    pub kind: VariantKind,
    pub variant_count: usize,
    pub primary: Option<usize>,
}

impl VariantPager {
    pub fn new(kind: VariantKind, variant_count: usize, primary: Option<usize>) -> Self {
        Self { kind, variant_count, primary }
    }

    /// Pages needed for every variant but the primary one.
    pub fn num_pages(&self) -> usize {
        self.variant_count
            .saturating_sub(1)
            .div_ceil(self.kind.items_per_page())
    }

    /// Variant indices other than the primary, highest first.
    pub fn additional(&self) -> Vec<usize> {
        (0..self.variant_count)
            .rev()
            .filter(|idx| Some(*idx) != self.primary)
            .collect()
    }

    /// Indices on 1-based page `page`; empty past the end.
    pub fn page(&self, page: usize) -> Vec<usize> {
        let per_page = self.kind.items_per_page();
        let start = page.saturating_sub(1) * per_page;
        self.additional()
            .into_iter()
            .skip(start)
            .take(per_page)
            .collect()
    }
}
