//! Lookahead-1 sets.
//!
//! Each variant records which characters may begin a match. The engine
//! consults the set before trying a variant, which is the main pruning lever
//! for a scannerless parser.

use std::fmt;

/// A set of characters. ASCII is tracked exactly; any non-ASCII member makes
/// the set admit every non-ASCII character.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CharSet {
    ascii: [u64; 2],
    non_ascii: bool,
}

impl CharSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ascii: [0, 0],
            non_ascii: false,
        }
    }

    /// A set holding every character of `chars`.
    #[must_use]
    pub fn of(chars: &str) -> Self {
        let mut set = Self::empty();
        for c in chars.chars() {
            set.insert(c);
        }
        set
    }

    /// A set holding every character in the inclusive range.
    #[must_use]
    pub fn range(from: char, to: char) -> Self {
        let mut set = Self::empty();
        for c in from..=to {
            set.insert(c);
        }
        set
    }

    /// Adds a character.
    pub fn insert(&mut self, c: char) {
        let code = c as u32;
        if code < 128 {
            self.ascii[(code / 64) as usize] |= 1 << (code % 64);
        } else {
            self.non_ascii = true;
        }
    }

    /// Returns `true` if `c` may be a member.
    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        let code = c as u32;
        if code < 128 {
            self.ascii[(code / 64) as usize] & (1 << (code % 64)) != 0
        } else {
            self.non_ascii
        }
    }

    /// The union of two sets.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            ascii: [self.ascii[0] | other.ascii[0], self.ascii[1] | other.ascii[1]],
            non_ascii: self.non_ascii || other.non_ascii,
        }
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ascii == [0, 0] && !self.non_ascii
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: String = (0u8..128)
            .map(char::from)
            .filter(|c| self.contains(*c))
            .collect();
        write!(f, "CharSet({members:?}")?;
        if self.non_ascii {
            f.write_str(" + non-ascii")?;
        }
        f.write_str(")")
    }
}

/// What may appear at the start of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lookahead {
    /// Characters that may begin a non-empty match.
    pub first: CharSet,
    /// `true` when the first character cannot be predicted.
    pub any: bool,
    /// `true` when the match may consume nothing.
    pub nullable: bool,
}

impl Lookahead {
    /// Matches nothing, consumes nothing.
    pub const NONE: Self = Self {
        first: CharSet::empty(),
        any: false,
        nullable: false,
    };

    /// Admits every position.
    pub const ANY: Self = Self {
        first: CharSet::empty(),
        any: true,
        nullable: true,
    };

    /// Returns `true` if a match could start at a position whose next
    /// character is `next` (`None` at end of input).
    #[must_use]
    pub fn admits(&self, next: Option<char>) -> bool {
        if self.nullable || self.any {
            return true;
        }
        next.is_some_and(|c| self.first.contains(c))
    }

    /// Union of the alternatives `self` and `other`.
    #[must_use]
    pub fn either(self, other: Self) -> Self {
        Self {
            first: self.first.union(other.first),
            any: self.any || other.any,
            nullable: self.nullable || other.nullable,
        }
    }
}
