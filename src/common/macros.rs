//! Macros.

/// Numeric verbosity threshold of a log tag.
#[macro_export]
macro_rules! log_at {
    (@info) => {
        1
    };
    (@verb) => {
        2
    };
    (@debug) => {
        3
    };
    (@$lvl:expr) => {
        $lvl
    };
}

/// Logging macro, gated by the global verbosity.
///
/// Levels are either numeric (`log! { @3 "..." }`) or one of `@info`,
/// `@verb` and `@debug`. Inactive in bench mode.
#[macro_export]
#[cfg(not(feature = "bench"))]
macro_rules! log {
    ( @$lvl:tt | $($args:tt)* ) => (
        log! { @$lvl $($args)* }
    );
    ( @$lvl:tt $($args:tt)* ) => (
        if $crate::common::conf.verb >= $crate::log_at!(@$lvl) {
            for line in format!( $($args)* ).lines() {
                println!("; {}", line)
            }
        }
    );
}
#[cfg(feature = "bench")]
macro_rules! log {
    ($($tt:tt)*) => {
        ()
    };
}

/// Runs something if the verbosity is high enough. Inactive in bench mode.
#[macro_export]
#[cfg(not(feature = "bench"))]
macro_rules! if_log {
    ( @$lvl:tt then { $($stuff:tt)* } ) => (
        if $crate::common::conf.verb >= $crate::log_at!(@$lvl) {
            $($stuff)*
        }
    );
    ( @$lvl:tt $($stuff:tt)* ) => (
        if_log! { @$lvl then { $($stuff)* } }
    );
}
#[cfg(feature = "bench")]
macro_rules! if_log {
    ($($tt:tt)*) => {
        ()
    };
}

/// Profiling macro.
///
/// If passed `self`, assumes `self` has a `_profiler` field.
#[macro_export]
#[cfg(not(feature = "bench"))]
macro_rules! profile {
    ( | $prof:ident | $stat:expr => add $e:expr ) => {
        $prof.stat_do($stat, |val| val + $e)
    };
    ( | $prof:ident | wrap $b:block $( $scope:expr ),+ $(,)* ) => {{
        profile! { |$prof| tick $($scope),+ }
        let res = $b;
        profile! { |$prof| mark $($scope),+ }
        res
    }};
    ( | $prof:ident | $meth:ident $( $scope:expr ),+ $(,)* ) => {
        $prof.$meth(vec![ $($scope),+ ])
    };
    ( $slf:ident $stat:expr => add $e:expr ) => {{
        let prof = &$slf._profiler;
        profile! { |prof| $stat => add $e }
    }};
    ( $slf:ident wrap $b:block $( $scope:expr ),+ $(,)* ) => {{
        let prof = &$slf._profiler;
        profile! { |prof| wrap $b $($scope),+ }
    }};
    ( $slf:ident $meth:ident $( $scope:expr ),+ $(,)* ) => {{
        let prof = &$slf._profiler;
        profile! { |prof| $meth $($scope),+ }
    }};
}
#[cfg(feature = "bench")]
macro_rules! profile {
    ( | $prof:ident | wrap $b:block $( $scope:expr ),+ $(,)* ) => {
        $b
    };
    ( $slf:ident wrap $b:block $( $scope:expr ),+ $(,)* ) => {
        $b
    };
    ( $($tt:tt)* ) => {
        ()
    };
}
