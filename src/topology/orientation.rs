//! Orientation of a shape use relative to its stored (forward) form.
//!
//! B-rep orientation is the group C₂: composing two uses is XOR, every element
//! is its own inverse. Cells are stored once in forward orientation; a reversed
//! use lives on the parent→child link and is accumulated along explorer paths.

use core::fmt::{self, Display, Formatter};
use serde::{Deserialize, Serialize};

/// Group law for orientation tags carried on arrows.
pub trait OrientationGroup: Copy + Eq + Default {
    /// Orientation of a path `a` followed by `b`.
    fn compose(a: Self, b: Self) -> Self;
    /// Element undoing `a`.
    fn inverse(a: Self) -> Self;
}

/// Forward / reversed use of a shape.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
}

impl Orientation {
    #[inline]
    pub fn is_reversed(self) -> bool {
        self == Orientation::Reversed
    }

    /// The opposite orientation.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Orientation::Forward => Orientation::Reversed,
            Orientation::Reversed => Orientation::Forward,
        }
    }

    /// Shorthand for [`OrientationGroup::compose`].
    #[inline]
    pub fn then(self, child: Self) -> Self {
        <Self as OrientationGroup>::compose(self, child)
    }
}

impl OrientationGroup for Orientation {
    #[inline]
    fn compose(a: Self, b: Self) -> Self {
        if a == b {
            Orientation::Forward
        } else {
            Orientation::Reversed
        }
    }
    #[inline]
    fn inverse(a: Self) -> Self {
        a
    }
}

impl Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Forward => "+",
            Orientation::Reversed => "-",
        })
    }
}

/// Fold the orientations of a path from the root to a descendant.
pub fn accumulate_path<I>(path: I) -> Orientation
where
    I: IntoIterator<Item = Orientation>,
{
    path.into_iter().fold(Orientation::Forward, Orientation::then)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_orientation() -> impl Strategy<Value = Orientation> {
        prop_oneof![Just(Orientation::Forward), Just(Orientation::Reversed)]
    }

    #[test]
    fn reversal_is_xor() {
        use Orientation::*;
        assert_eq!(Forward.then(Forward), Forward);
        assert_eq!(Forward.then(Reversed), Reversed);
        assert_eq!(Reversed.then(Reversed), Forward);
        assert_eq!(accumulate_path([Reversed, Forward, Reversed, Reversed]), Reversed);
        assert_eq!(Reversed.to_string(), "-");
    }

    proptest! {
        #[test]
        fn group_laws(a in any_orientation(), b in any_orientation(), c in any_orientation()) {
            prop_assert_eq!(Orientation::compose(Orientation::compose(a, b), c),
                            Orientation::compose(a, Orientation::compose(b, c)));
            prop_assert_eq!(Orientation::compose(a, Orientation::inverse(a)), Orientation::default());
            prop_assert_eq!(Orientation::compose(Orientation::default(), a), a);
        }
    }
}
