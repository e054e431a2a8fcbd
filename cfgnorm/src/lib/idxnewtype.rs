// This macro generates a newtype struct around the (possibly narrow) unsigned integer type
// a grammar uses for storage, so that rule, token, production, and within-production symbol
// indices cannot be accidentally mixed up with one another.

use std::mem::size_of;

use num_traits::{self, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $n<T>(pub T);

        impl<T: PrimInt + Unsigned> From<$n<T>> for usize {
            fn from(st: $n<T>) -> Self {
                debug_assert!(size_of::<usize>() >= size_of::<T>());
                num_traits::cast(st.0).unwrap()
            }
        }

        impl<T: PrimInt + Unsigned> $n<T> {
            pub fn as_storaget(&self) -> T {
                self.0
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for rule (nonterminal) indices.
    ///
    /// It is guaranteed that an `RIdx` within a grammar can be converted, without loss of
    /// precision, to `usize` with the idiom `usize::from(ridx)`.
    RIdx
);
IdxNewtype!(
    /// A type specifically for production indices (e.g. a rule `E: A | B;` has two
    /// productions for the single rule `E`).
    ///
    /// It is guaranteed that a `PIdx` within a grammar can be converted, without loss of
    /// precision, to `usize` with the idiom `usize::from(pidx)`.
    PIdx
);
IdxNewtype!(
    /// A type specifically for symbol offsets within a production.
    ///
    /// It is guaranteed that an `SIdx` within a grammar can be converted, without loss of
    /// precision, to `usize` with the idiom `usize::from(sidx)`.
    SIdx
);
IdxNewtype!(
    /// A type specifically for token (terminal) indices.
    ///
    /// It is guaranteed that a `TIdx` within a grammar can be converted, without loss of
    /// precision, to `usize` with the idiom `usize::from(tidx)`.
    TIdx
);
