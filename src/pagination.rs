use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page arithmetic for a counted result set.
///
/// Out-of-range requests never fail: a missing or unparsable page number
/// yields the first page, a number past either end yields the last page, and an
/// empty result still has a single (empty) page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: u64,
}

impl Page {
    pub fn resolve(requested: Option<&str>, total: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(u64::from(per_page)).max(1);
        let num_pages = u32::try_from(num_pages).unwrap_or(u32::MAX);

        let number = match requested.map(str::trim) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX).min(num_pages),
                Ok(_) => num_pages,
                // Whole numbers too large to parse are past one end or the other.
                Err(_) if is_integer(raw) => num_pages,
                Err(_) => 1,
            },
            None => 1,
        };

        Self {
            number,
            num_pages,
            per_page,
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> Option<u32> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u32> {
        self.has_next().then(|| self.number + 1)
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
