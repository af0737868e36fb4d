//! Write-once derived views.
//!
//! A [`LazyView`] starts empty. The first reader runs the derivation and
//! publishes its result; later readers get the published value without
//! recomputing. Readers racing on first access may each run the derivation,
//! but only one result is published and all of them observe that one.
//! Nobody waits on another reader's derivation.

use std::fmt;
use std::sync::OnceLock;

/// A cell holding a value derived on first access.
pub struct LazyView<T> {
    cell: OnceLock<T>,
}

impl<T> LazyView<T> {
    /// Create an empty view.
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Return the published value, deriving and publishing it if absent.
    ///
    /// `derive` must be pure: a losing racer's result is dropped.
    pub fn get_or_derive<F>(&self, derive: F) -> &T
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.cell.get() {
            return value;
        }
        let value = derive();
        self.cell.get_or_init(|| value)
    }

    /// The published value, if any reader has derived it yet.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T> Default for LazyView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for LazyView<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("LazyView").field(value).finish(),
            None => f.write_str("LazyView(<pending>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn derives_once_for_sequential_readers() {
        let calls = AtomicUsize::new(0);
        let view = LazyView::new();
        for _ in 0..3 {
            let v = view.get_or_derive(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                42
            });
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_is_empty_until_derived() {
        let view: LazyView<String> = LazyView::new();
        assert!(view.get().is_none());
        view.get_or_derive(|| "x".to_string());
        assert_eq!(view.get().map(String::as_str), Some("x"));
    }

    #[test]
    fn concurrent_first_readers_observe_one_value() {
        const READERS: usize = 16;
        let view = Arc::new(LazyView::new());
        let barrier = Arc::new(Barrier::new(READERS));
        let next_id = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..READERS)
            .map(|_| {
                let view = Arc::clone(&view);
                let barrier = Arc::clone(&barrier);
                let next_id = Arc::clone(&next_id);
                thread::spawn(move || {
                    barrier.wait();
                    // Each derivation yields a distinct vector so a mixed
                    // publication would be visible.
                    let published = view.get_or_derive(|| {
                        let id = next_id.fetch_add(1, Ordering::SeqCst);
                        vec![id; 64]
                    });
                    (published.as_ptr() as usize, published.clone())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (first_ptr, first_value) = &results[0];
        assert!(first_value.iter().all(|v| *v == first_value[0]));
        for (ptr, value) in &results {
            assert_eq!(ptr, first_ptr);
            assert_eq!(value, first_value);
        }
    }
}
