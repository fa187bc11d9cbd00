//! Pagination slicer.
//!
//! Pages are borrowed windows into the resolved scope sequence. The
//! sequence itself is never modified, so the same scope can be paged any
//! number of times with identical results.

use crate::config::PAGE_LENGTH;

/// A window over a scope sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Number of pages the full sequence spans. Always at least 1.
    pub total_pages: usize,
}

/// Number of pages needed for `len` items, never less than 1.
pub fn total_pages(len: usize) -> usize {
    len.div_ceil(PAGE_LENGTH).max(1)
}

/// Takes page `page` (zero-indexed) of `sequence`.
///
/// Without a page number the whole sequence is one page. A page past the
/// end yields an empty window.
pub fn paginate<T>(sequence: &[T], page: Option<usize>) -> Page<'_, T> {
    let Some(page) = page else {
        return Page {
            items: sequence,
            total_pages: 1,
        };
    };

    let start = page.saturating_mul(PAGE_LENGTH).min(sequence.len());
    let end = start.saturating_add(PAGE_LENGTH).min(sequence.len());
    Page {
        items: &sequence[start..end],
        total_pages: total_pages(sequence.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn total_pages_rounds_up_with_floor_of_one() {
        assert_eq!(total_pages(0), 1);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
        assert_eq!(total_pages(25), 3);
        assert_eq!(total_pages(30), 3);
    }

    #[test]
    fn no_page_returns_everything_as_one_page() {
        let s = seq(37);
        let page = paginate(&s, None);
        assert_eq!(page.items, &s[..]);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn middle_and_last_pages() {
        let s = seq(25);
        let p1 = paginate(&s, Some(1));
        assert_eq!(p1.items, &s[10..20]);
        assert_eq!(p1.total_pages, 3);

        let p2 = paginate(&s, Some(2));
        assert_eq!(p2.items, &s[20..25]);
    }

    #[test]
    fn page_past_end_is_empty() {
        let s = seq(5);
        let page = paginate(&s, Some(4));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);

        let huge = paginate(&s, Some(usize::MAX));
        assert!(huge.items.is_empty());
    }

    #[test]
    fn empty_sequence_still_has_one_page() {
        let s: Vec<usize> = vec![];
        let page = paginate(&s, Some(0));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn consecutive_pages_reconstruct_the_sequence() {
        let s = seq(43);
        let pages = total_pages(s.len());
        let mut rebuilt = Vec::new();
        for p in 0..pages {
            rebuilt.extend_from_slice(paginate(&s, Some(p)).items);
        }
        assert_eq!(rebuilt, s);
    }

    #[test]
    fn slicing_is_repeatable_and_leaves_source_intact() {
        let s = seq(23);
        let first = paginate(&s, Some(1)).items.to_vec();
        let second = paginate(&s, Some(1)).items.to_vec();
        assert_eq!(first, second);
        assert_eq!(s.len(), 23);
        assert_eq!(paginate(&s, Some(0)).items, &s[..10]);
    }
}
