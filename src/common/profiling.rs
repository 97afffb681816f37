//! Profiling stuff.
//!
//! In `bench` mode, `Profiler` is a unit structure and all profiling macros
//! expand to nothing.

use std::time::{Duration, Instant};

use crate::common::*;

/// Extends duration with a pretty printing.
pub trait DurationExt {
    /// Nice string representation.
    fn to_str(&self) -> String;
}
impl DurationExt for Duration {
    fn to_str(&self) -> String {
        format!("{}.{:0>9}", self.as_secs(), self.subsec_nanos())
    }
}

/// Maps strings to counters.
pub type Stats = HashMap<String, usize>;
/// Provides a debug print function.
pub trait CanPrint {
    /// Debug print (multi-line).
    fn print(&self, pref: &str);
}
impl CanPrint for Stats {
    fn print(&self, pref: &str) {
        let mut stats: Vec<_> = self.iter().collect();
        stats.sort_unstable();
        for (stat, count) in stats {
            if *count > 0 {
                println!(";{} {:>30}: {:>5}", pref, conf.emph(stat), count)
            }
        }
    }
}

/// Profiling structure, only in `not(bench)`.
///
/// Maintains cumulative durations and counters, both indexed by static
/// string scopes. Internally the maps are wrapped in `RefCell`s so that
/// mutation does not require `&mut self`.
#[cfg(not(feature = "bench"))]
pub struct Profiler {
    /// Scope-indexed durations: live tick (if any) and cumulative time.
    map: ::std::cell::RefCell<HashMap<Vec<&'static str>, (Option<Instant>, Duration)>>,
    /// Starting tick, for total time.
    start: Instant,
    /// Other statistics.
    stats: ::std::cell::RefCell<Stats>,
}
#[cfg(feature = "bench")]
pub struct Profiler;

impl Profiler {
    /// Constructor.
    #[cfg(not(feature = "bench"))]
    pub fn new() -> Self {
        use std::cell::RefCell;
        Profiler {
            map: RefCell::new(HashMap::new()),
            start: Instant::now(),
            stats: RefCell::new(HashMap::new()),
        }
    }
    #[cfg(feature = "bench")]
    pub fn new() -> Self {
        Profiler
    }

    /// Acts on a statistic.
    #[cfg(not(feature = "bench"))]
    pub fn stat_do<F, S>(&self, stat: S, f: F)
    where
        F: Fn(usize) -> usize,
        S: Into<String>,
    {
        let stat = stat.into();
        let mut map = self.stats.borrow_mut();
        let val = map.get(&stat).cloned().unwrap_or(0);
        let _ = map.insert(stat, f(val));
    }

    /// Ticks.
    #[cfg(not(feature = "bench"))]
    pub fn tick(&self, scope: Vec<&'static str>) {
        debug_assert!(!scope.is_empty());
        let mut map = self.map.borrow_mut();
        let time = map
            .entry(scope)
            .or_insert_with(|| (None, Duration::from_secs(0)));
        time.0 = Some(Instant::now())
    }

    /// Registers the time since the last tick.
    ///
    /// Panics if there was no tick since the last time registration.
    #[cfg(not(feature = "bench"))]
    pub fn mark(&self, scope: Vec<&'static str>) {
        let mut map = self.map.borrow_mut();
        if let Some(&mut (ref mut tick, ref mut sum)) = map.get_mut(&scope) {
            let mut instant = None;
            ::std::mem::swap(&mut instant, tick);
            if let Some(instant) = instant {
                *sum += Instant::now().duration_since(instant);
                *tick = None
            }
        } else {
            panic!("profiling: trying to mark the time without ticking first")
        }
    }

    /// Prints the durations and statistics gathered so far.
    #[cfg(not(feature = "bench"))]
    pub fn print(&self, name: &'static str) {
        println!(
            "; {} total {}s",
            conf.emph(name),
            Instant::now().duration_since(self.start).to_str()
        );
        let mut scopes: Vec<_> = self
            .map
            .borrow()
            .iter()
            .map(|(scope, &(_, time))| (scope.clone(), time))
            .collect();
        scopes.sort_unstable();
        for (scope, time) in scopes {
            println!(";   |- {}s {}", time.to_str(), scope.join("/"))
        }
        self.stats.borrow().print("  ")
    }
    #[cfg(feature = "bench")]
    pub fn print(&self, _: &'static str) {}
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}
