//! Result-aggregation policies for emissions.
//!
//! A collector receives each observer's return value in invocation order and
//! may ask the emission to stop early by returning [`ControlFlow::Break`].

use std::ops::ControlFlow;

/// Folds the values yielded by one emission into its result.
pub trait Collector<R>: Default {
    type Output;

    /// Feed the next observer value. `Break` stops the emission.
    fn collect(&mut self, value: R) -> ControlFlow<()>;

    /// Result of the emission; an untouched collector yields its empty value.
    fn finish(self) -> Self::Output;
}

/// Last value wins; `R::default()` when nobody is connected.
///
/// With `R = ()` this simply runs every observer for its side effects.
#[derive(Debug, Clone, Default)]
pub struct Last<R>(R);

/// Policy used when an event declaration does not name one.
pub type DefaultCollector<R> = Last<R>;

impl<R: Default> Collector<R> for Last<R> {
    type Output = R;

    fn collect(&mut self, value: R) -> ControlFlow<()> {
        self.0 = value;
        ControlFlow::Continue(())
    }

    fn finish(self) -> R {
        self.0
    }
}

/// Values that can be summed into an accumulator.
pub trait Accumulate {
    fn accumulate(&mut self, value: Self);
}

macro_rules! impl_accumulate_add {
    ($($t:ty)*) => {
        $(
            impl Accumulate for $t {
                fn accumulate(&mut self, value: Self) {
                    *self += value;
                }
            }
        )*
    };
}

impl_accumulate_add!(i8 i16 i32 i64 i128 isize u8 u16 u32 u64 u128 usize f32 f64);

impl Accumulate for String {
    fn accumulate(&mut self, value: Self) {
        self.push_str(&value);
    }
}

impl<T> Accumulate for Vec<T> {
    fn accumulate(&mut self, value: Self) {
        self.extend(value);
    }
}

/// Adds every value onto `R::default()`.
#[derive(Debug, Clone, Default)]
pub struct Sum<R>(R);

impl<R: Default + Accumulate> Collector<R> for Sum<R> {
    type Output = R;

    fn collect(&mut self, value: R) -> ControlFlow<()> {
        self.0.accumulate(value);
        ControlFlow::Continue(())
    }

    fn finish(self) -> R {
        self.0
    }
}

/// Truthiness for the short-circuiting collectors.
pub trait Truth {
    fn is_truthy(&self) -> bool;
    fn falsy() -> Self;
    fn truthy() -> Self;
}

impl Truth for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
    fn falsy() -> Self {
        false
    }
    fn truthy() -> Self {
        true
    }
}

macro_rules! impl_truth_int {
    ($($t:ty)*) => {
        $(
            impl Truth for $t {
                fn is_truthy(&self) -> bool {
                    *self != 0
                }
                fn falsy() -> Self {
                    0
                }
                fn truthy() -> Self {
                    1
                }
            }
        )*
    };
}

impl_truth_int!(i8 i16 i32 i64 i128 isize u8 u16 u32 u64 u128 usize);

macro_rules! impl_truth_float {
    ($($t:ty)*) => {
        $(
            impl Truth for $t {
                fn is_truthy(&self) -> bool {
                    *self != 0.0
                }
                fn falsy() -> Self {
                    0.0
                }
                fn truthy() -> Self {
                    1.0
                }
            }
        )*
    };
}

impl_truth_float!(f32 f64);

/// First truthy value wins and stops the emission; falsy when nobody claims it.
#[derive(Debug, Clone)]
pub struct While0<R>(R);

impl<R: Truth> Default for While0<R> {
    fn default() -> Self {
        Self(R::falsy())
    }
}

impl<R: Truth> Collector<R> for While0<R> {
    type Output = R;

    fn collect(&mut self, value: R) -> ControlFlow<()> {
        self.0 = value;
        if self.0.is_truthy() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn finish(self) -> R {
        self.0
    }
}

/// First falsy value wins and stops the emission; truthy when nobody objects.
#[derive(Debug, Clone)]
pub struct Until0<R>(R);

impl<R: Truth> Default for Until0<R> {
    fn default() -> Self {
        Self(R::truthy())
    }
}

impl<R: Truth> Collector<R> for Until0<R> {
    type Output = R;

    fn collect(&mut self, value: R) -> ControlFlow<()> {
        self.0 = value;
        if self.0.is_truthy() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    fn finish(self) -> R {
        self.0
    }
}
