//! Host-side cursor accounting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

/// Iterator adapter that holds one open cursor for as long as it lives.
pub struct Cursor<I> {
    inner: I,
    open: Arc<AtomicUsize>,
}

impl<I> Cursor<I> {
    pub(crate) fn open(inner: I, open: &Arc<AtomicUsize>) -> Self {
        let count = open.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(open = count, "cursor opened");
        Self {
            inner,
            open: Arc::clone(open),
        }
    }
}

impl<I: Iterator> Iterator for Cursor<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<I> Drop for Cursor<I> {
    fn drop(&mut self) {
        let count = self.open.fetch_sub(1, Ordering::SeqCst) - 1;
        trace!(open = count, "cursor closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_follows_lifetime() {
        let open = Arc::new(AtomicUsize::new(0));
        let mut cursor = Cursor::open(vec![1, 2, 3].into_iter(), &open);
        assert_eq!(open.load(Ordering::SeqCst), 1);
        assert_eq!(cursor.next(), Some(1));
        drop(cursor);
        assert_eq!(open.load(Ordering::SeqCst), 0);
    }
}
