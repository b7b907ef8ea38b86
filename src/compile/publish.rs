//! Publish-once cells, shared between threads without locks
//!
//! A cell starts empty. Any thread may try to publish a value; the first one wins, and every
//! other publisher gets the winner's value back. Once published, a value is visible to all
//! subsequent readers.

use std::fmt;

use once_cell::race::OnceBox;

/// An atomically published optional value
pub struct PublishCell<T> {
    value: OnceBox<T>,
}

impl<T> Default for PublishCell<T> {
    fn default() -> Self {
        PublishCell::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for PublishCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublishCell").field(&self.get()).finish()
    }
}

impl<T> PublishCell<T> {
    /// Create an empty cell
    pub fn new() -> PublishCell<T> {
        PublishCell {
            value: OnceBox::new(),
        }
    }

    /// The published value, if any
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Try to publish a value; returns the surviving value, and whether it is ours
    pub fn publish(&self, value: T) -> (&T, bool) {
        let won = self.value.set(Box::new(value)).is_ok();
        let v = self
            .value
            .get()
            .expect("A published cell always holds a value");
        (v, won)
    }
}

/// Publish-once cells indexed by a dense integer id
pub struct PublishTable<T> {
    cells: Box<[PublishCell<T>]>,
}

impl<T> PublishTable<T> {
    /// Create a table of empty cells
    pub fn new(len: usize) -> PublishTable<T> {
        PublishTable {
            cells: (0..len).map(|_| PublishCell::new()).collect(),
        }
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the table has no cell
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The value published at an index, if any
    pub fn get(&self, i: usize) -> Option<&T> {
        self.cells[i].get()
    }

    /// Try to publish a value at an index; returns the surviving value
    pub fn publish(&self, i: usize, value: T) -> &T {
        self.cells[i].publish(value).0
    }

    /// Number of published cells
    pub fn nb_published(&self) -> usize {
        self.cells.iter().filter(|c| c.get().is_some()).count()
    }
}

impl<T> fmt::Debug for PublishTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublishTable({}/{} published)", self.nb_published(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    #[test]
    fn test_single_thread() {
        let c = PublishCell::new();
        assert!(c.get().is_none());
        assert_eq!(c.publish(3), (&3, true));
        assert_eq!(c.publish(4), (&3, false));
        assert_eq!(c.get(), Some(&3));
    }

    #[test]
    fn test_one_winner() {
        for nb_threads in [2, 4, 8] {
            let cell = PublishCell::new();
            let wins = AtomicUsize::new(0);
            let barrier = Barrier::new(nb_threads);
            let seen: Vec<usize> = thread::scope(|s| {
                let handles: Vec<_> = (0..nb_threads)
                    .map(|i| {
                        let (cell, wins, barrier) = (&cell, &wins, &barrier);
                        s.spawn(move || {
                            barrier.wait();
                            let (v, won) = cell.publish(i);
                            if won {
                                wins.fetch_add(1, Ordering::Relaxed);
                            }
                            *v
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert_eq!(wins.load(Ordering::Relaxed), 1);
            let winner = *cell.get().unwrap();
            assert!(seen.iter().all(|v| *v == winner));
        }
    }

    #[test]
    fn test_table() {
        let table: PublishTable<String> = PublishTable::new(64);
        assert_eq!(table.len(), 64);
        thread::scope(|s| {
            for t in 0..4 {
                let table = &table;
                s.spawn(move || {
                    for i in 0..64 {
                        let v = table.publish(i, format!("{i}-{t}"));
                        assert!(v.starts_with(&format!("{i}-")));
                    }
                });
            }
        });
        assert_eq!(table.nb_published(), 64);
        for i in 0..64 {
            assert!(table.get(i).unwrap().starts_with(&format!("{i}-")));
        }
        let empty: PublishTable<u32> = PublishTable::new(0);
        assert!(empty.is_empty());
    }
}
