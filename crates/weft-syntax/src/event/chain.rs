//! Persistent, prepend-only list used for event traces.
//!
//! Every parse attempt extends the list it was handed and returns the new
//! head. Backtracking is simply dropping the head: the shared prefix is
//! untouched, so sibling attempts can diverge from it without copying.

use std::fmt;
use std::rc::Rc;

/// An immutable singly-linked list with structural sharing.
///
/// The newest element sits at the head. Cloning is O(1).
pub struct Chain<T> {
    head: Option<Rc<Link<T>>>,
}

struct Link<T> {
    value: T,
    next: Chain<T>,
    len: usize,
}

impl<T> Chain<T> {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Returns a new chain with `value` appended after every element of
    /// `self`. `self` is left untouched.
    #[must_use]
    pub fn push(&self, value: T) -> Self {
        let len = self.len() + 1;
        Self {
            head: Some(Rc::new(Link {
                value,
                next: self.clone(),
                len,
            })),
        }
    }

    /// The most recently appended element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.head.as_ref().map(|link| &link.value)
    }

    /// Splits off the most recent element, returning it together with the
    /// chain that precedes it.
    #[must_use]
    pub fn split_last(&self) -> Option<(&T, &Chain<T>)> {
        self.head.as_ref().map(|link| (&link.value, &link.next))
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |link| link.len)
    }

    /// Returns `true` when the chain has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns `true` when both chains share the same head node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Iterates from the newest element to the oldest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }
}

impl<T: Clone> Chain<T> {
    /// Copies the elements out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut out: Vec<T> = self.iter().cloned().collect();
        out.reverse();
        out
    }
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items: Vec<&T> = self.iter().collect();
        items.reverse();
        f.debug_list().entries(items).finish()
    }
}

// Long traces would otherwise drop recursively, one stack frame per link.
impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        let mut head = self.head.take();
        while let Some(link) = head {
            match Rc::try_unwrap(link) {
                Ok(mut link) => head = link.next.head.take(),
                Err(_) => break,
            }
        }
    }
}

/// Iterator over a [`Chain`], newest element first.
pub struct Iter<'a, T> {
    next: Option<&'a Link<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.next?;
        self.next = link.next.head.as_deref();
        Some(&link.value)
    }
}
