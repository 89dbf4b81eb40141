//! Calling conventions for adapted functions.
//!
//! Adapted functions take their arguments as one tuple, so a single generic
//! `call` works for every arity: `f.call(())`, `f.call((x,))`,
//! `f.call((x, y))`. Both traits are implemented for plain `Fn` closures and
//! function items of up to eight arguments.

use std::future::Future;

/// A function returning a future, callable with an argument tuple.
pub trait AsyncCallable<Args>: Send + Sync {
    type Output;
    type Future: Future<Output = Self::Output> + Send;

    fn call_async(&self, args: Args) -> Self::Future;
}

/// An ordinary blocking function, callable with an argument tuple.
pub trait BlockingCallable<Args>: Send + Sync {
    type Output;

    fn call_blocking(&self, args: Args) -> Self::Output;
}

macro_rules! impl_callable {
    ($($arg:ident),*) => {
        impl<Func, Fut, $($arg,)*> AsyncCallable<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Fut + Send + Sync,
            Fut: Future + Send,
        {
            type Output = Fut::Output;
            type Future = Fut;

            #[allow(non_snake_case)]
            fn call_async(&self, ($($arg,)*): ($($arg,)*)) -> Fut {
                (self)($($arg),*)
            }
        }

        impl<Func, Ret, $($arg,)*> BlockingCallable<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync,
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn call_blocking(&self, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)($($arg),*)
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);
impl_callable!(A1, A2, A3, A4, A5, A6, A7);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8);
