//! Row-parallel iteration that degrades to plain iterators.
//!
//! Pixel loops in this crate are written as `(0..rows).into_par_iter()`.
//! With the `parallel` feature that resolves to rayon; without it the
//! stand-in trait below maps `into_par_iter` onto `into_iter`, so the same
//! `.flat_map(..).collect()` chains compile against `std::iter`.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
