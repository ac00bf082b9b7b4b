//! Provides the [`profile`](crate::profile) macro or a dummy implementation depending on the selected feature

#[cfg(feature = "profiling")]
/// Creates a named scope for profiling
///
/// The macro returns a scope guard that records the time until it is dropped at the end of the
/// enclosing block. The guard is stored in a variable called `_profiling_scope_guard`.
/// Scopes nest according to the scopes that are active on the current thread, timings of scopes
/// with the same nesting path are accumulated over all threads. The collected timings can be
/// printed with [`write`](crate::profiling::write) and look like this:
/// ```text
/// export particle cloud: 100.00%, 12.31ms avg, 1 call (total: 0.012s)
///   consolidate: 41.20%, 5.07ms avg, 1 call (total: 0.005s)
///   write particle cloud vtk: 58.11%, 7.15ms avg, 1 call (total: 0.007s)
/// ```
///
/// Without the `profiling` feature the macro expands to nothing.
/// ```ignore
/// {
///     profile!("write surface vtk");
///     // ...
/// }
/// ```
#[macro_export]
#[cfg_attr(docsrs, doc(cfg(feature = "profiling")))]
macro_rules! profile {
    ($name:expr) => {
        let _profiling_scope_guard = $crate::profiling::PROFILER
            .get_or(Default::default)
            .write()
            .enter($name);
    };
}

#[cfg(not(feature = "profiling"))]
/// No-op macro if profiling is disabled
#[macro_export]
macro_rules! profile {
    ($name:expr) => {};
}
