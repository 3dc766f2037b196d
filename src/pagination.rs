// Pagination - fixed-size pages over an ordered sequence
//
// Out-of-range page numbers degrade to an empty page. A zero page size is a
// caller bug and panics.

use serde::Serialize;

/// Slice of an ordered collection plus what a view needs to link to
/// neighbouring pages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub per_page: usize,
    pub total_count: u64,
    pub num_pages: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
    /// 1-based index of the first item on the page, 0 when empty
    pub start_index: u64,
    pub end_index: u64,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_count: self.total_count,
            num_pages: self.num_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
            start_index: self.start_index,
            end_index: self.end_index,
        }
    }
}

/// Requested page number. Absent means page 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest(Option<i64>);

impl PageRequest {
    pub fn first() -> Self {
        Self(None)
    }

    pub fn number(number: i64) -> Self {
        Self(Some(number))
    }

    /// Parse a `?page=` value; anything that is not an integer counts as unset
    pub fn from_query(raw: Option<&str>) -> Self {
        Self(raw.and_then(|value| value.trim().parse::<i64>().ok()))
    }

    pub fn resolved(self) -> i64 {
        self.0.unwrap_or(1)
    }
}

impl From<Option<i64>> for PageRequest {
    fn from(value: Option<i64>) -> Self {
        Self(value)
    }
}

/// Limit/offset pair for a store query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: usize,
}

impl Paginator {
    pub fn new(per_page: usize) -> Self {
        assert!(per_page > 0, "page size must be a positive integer");
        Self { per_page }
    }

    /// Store window for the requested page, or `None` when the number is
    /// below 1 and the page is empty by definition
    pub fn window(&self, request: PageRequest) -> Option<PageWindow> {
        let number = request.resolved();
        if number < 1 {
            return None;
        }
        let offset = usize::try_from(number - 1)
            .ok()
            .and_then(|n| n.checked_mul(self.per_page))?;
        Some(PageWindow {
            number,
            limit: self.per_page,
            offset,
        })
    }

    /// Assemble a page from items already sliced by the store
    pub fn page_from_parts<T>(&self, items: Vec<T>, number: i64, total_count: u64) -> Page<T> {
        let per_page = self.per_page as u64;
        let num_pages = std::cmp::max(1, total_count.div_ceil(per_page)) as i64;
        let in_range = number >= 1 && number <= num_pages;
        // Stores return nothing past the end; trust the count over the rows
        let items = if in_range { items } else { Vec::new() };

        let (start_index, end_index) = if items.is_empty() {
            (0, 0)
        } else {
            let start = (number as u64 - 1) * per_page + 1;
            (start, start + items.len() as u64 - 1)
        };

        let has_next = in_range && number < num_pages;
        let has_previous = in_range && number > 1;

        Page {
            items,
            number,
            per_page: self.per_page,
            total_count,
            num_pages,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| number + 1),
            previous_page_number: has_previous.then(|| number - 1),
            start_index,
            end_index,
        }
    }

    /// Paginate an in-memory ordered slice. The slice is left untouched.
    pub fn paginate<T: Clone>(&self, items: &[T], request: PageRequest) -> Page<T> {
        let total_count = items.len() as u64;
        match self.window(request) {
            Some(window) => {
                let slice: Vec<T> = items
                    .iter()
                    .skip(window.offset)
                    .take(window.limit)
                    .cloned()
                    .collect();
                self.page_from_parts(slice, window.number, total_count)
            }
            None => self.page_from_parts(Vec::new(), request.resolved(), total_count),
        }
    }
}

/// Wrap an ordered collection into the requested fixed-size page.
///
/// Panics when `page_size` is zero.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, requested_page: Option<i64>) -> Page<T> {
    Paginator::new(page_size).paginate(items, PageRequest::from(requested_page))
}
