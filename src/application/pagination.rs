//! Page-number pagination over ordered listings.

use serde::Serialize;

pub const PAGE_SIZE: u64 = 10;

/// Resolves a requested page number against a listing of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u64) -> Self {
        Self {
            total,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages; an empty listing still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// Picks the page to show. Anything that is not a number falls back to
    /// the first page; numbers outside the range are clamped.
    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        let number = clamp_page_number(requested, self.num_pages());
        PageWindow {
            number,
            num_pages: self.num_pages(),
            total: self.total,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

/// Normalises a raw `?page=` value into `1..=num_pages`.
pub fn clamp_page_number(requested: Option<&str>, num_pages: u64) -> u64 {
    let Some(raw) = requested.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return 1;
    };
    match raw.parse::<i64>() {
        Ok(value) if value < 1 => 1,
        Ok(value) => (value as u64).min(num_pages.max(1)),
        Err(_) if is_overflowing_number(raw) => num_pages.max(1),
        Err(_) => 1,
    }
}

/// A run of digits too long for `i64` is past any real page.
fn is_overflowing_number(raw: &str) -> bool {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit())
}

/// The slice of a listing that belongs to one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_page_number(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }

    pub fn previous_page_number(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Navigation links, one per page.
    pub fn links(&self) -> Vec<PageLink> {
        (1..=self.num_pages)
            .map(|number| PageLink {
                number,
                current: number == self.number,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}
