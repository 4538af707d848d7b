//! Type-level decomposition of callback signatures.
//!
//! An event is declared with a function pointer type such as
//! `fn(i32, String) -> bool`; [`Signature`] exposes its argument tuple and
//! result type, and [`Argument<K>`] names the K-th argument (1-based).
//! Signatures of 0 to 16 arguments are supported.
//!
//! Arguments must be owned or `'static`. A signature with an elided borrow,
//! like `fn(&str)`, is generic over that lifetime and matches none of these
//! impls; `fn(&'static str)` does.

/// Argument tuple and result of a callback signature.
pub trait Signature {
    type Args;
    type Output;
    const ARITY: usize;
}

/// The `K`-th argument type of a signature, counting from 1.
pub trait Argument<const K: usize>: Signature {
    type Type;
}

macro_rules! signature {
    (@argument $all:tt;) => {};
    (@argument ($($all:ident)*); $arg:ident $idx:tt $($rest:ident $ridx:tt)*) => {
        impl<R, $($all,)*> Argument<$idx> for fn($($all),*) -> R {
            type Type = $arg;
        }
        signature!(@argument ($($all)*); $($rest $ridx)*);
    };
    ($arity:literal; $($arg:ident $idx:tt)*) => {
        impl<R, $($arg,)*> Signature for fn($($arg),*) -> R {
            type Args = ($($arg,)*);
            type Output = R;
            const ARITY: usize = $arity;
        }
        signature!(@argument ($($arg)*); $($arg $idx)*);
    };
}

signature!(0;);
signature!(1; A1 1);
signature!(2; A1 1 A2 2);
signature!(3; A1 1 A2 2 A3 3);
signature!(4; A1 1 A2 2 A3 3 A4 4);
signature!(5; A1 1 A2 2 A3 3 A4 4 A5 5);
signature!(6; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6);
signature!(7; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7);
signature!(8; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8);
signature!(9; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9);
signature!(10; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10);
signature!(11; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10 A11 11);
signature!(12; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10 A11 11 A12 12);
signature!(13; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10 A11 11 A12 12 A13 13);
signature!(14; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10 A11 11 A12 12 A13 13 A14 14);
signature!(15; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10 A11 11 A12 12 A13 13 A14 14 A15 15);
signature!(16; A1 1 A2 2 A3 3 A4 4 A5 5 A6 6 A7 7 A8 8 A9 9 A10 10 A11 11 A12 12 A13 13 A14 14 A15 15 A16 16);
