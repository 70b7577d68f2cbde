//! How often the gold tree turns up in A* search lists.

use std::fmt;

use planner::SearchLists;
use ttree::TTree;

/// Fractions of searches where the gold tree was the best closed tree, was
/// closed at all, or appeared on either list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListStats {
    pub best: f64,
    pub close: f64,
    pub any: f64,
}

impl fmt::Display for ListStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BEST: {:.4}, on CLOSE: {:.4}, on ANY list: {:.4}",
            self.best, self.close, self.any
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListsAnalyzer {
    total: usize,
    best: usize,
    close: usize,
    any: usize,
}

impl ListsAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn append(&mut self, gold: &TTree, lists: &SearchLists) {
        self.total += 1;
        let closed = lists.in_closed(gold);
        if lists.best_closed().is_some_and(|(tree, _)| tree == gold) {
            self.best += 1;
        }
        if closed {
            self.close += 1;
        }
        if closed || lists.in_open(gold) {
            self.any += 1;
        }
    }

    /// Number of searches recorded since the last reset.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// All zero when nothing was appended.
    pub fn stats(&self) -> ListStats {
        if self.total == 0 {
            return ListStats::default();
        }
        let n = self.total as f64;
        ListStats {
            best: self.best as f64 / n,
            close: self.close as f64 / n,
            any: self.any as f64 / n,
        }
    }
}
