//! Implementation details for the [`profile`](crate::profile) macro

use parking_lot::RwLock;
use std::collections::HashMap;
use std::error::Error;
use std::io;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use thread_local::ThreadLocal;

/// Thread local storage of the [`Profiler`]s storing all scopes of the thread
pub static PROFILER: LazyLock<ThreadLocal<RwLock<Profiler>>> = LazyLock::new(ThreadLocal::new);

/// A scope guard recording the elapsed time of the scope
pub struct Guard {
    enter_time: Instant,
}

/// Dropping a `Guard` adds its recorded elapsed time to the scope on top of the thread's scope stack
impl Drop for Guard {
    fn drop(&mut self) {
        let duration = self.enter_time.elapsed();
        if let Some(profiler) = PROFILER.get() {
            profiler.write().leave(duration);
        }
    }
}

/// Path of a scope: names of all enclosing scopes from the outermost to the scope itself
type ScopePath = Vec<&'static str>;

#[derive(Clone, Debug)]
struct Scope {
    num_calls: usize,
    duration_sum: Duration,
    first_call: Instant,
}

impl Scope {
    fn new() -> Self {
        Scope {
            num_calls: 0,
            duration_sum: Duration::default(),
            first_call: Instant::now(),
        }
    }

    fn merge(&mut self, other: &Self) {
        self.num_calls += other.num_calls;
        self.duration_sum += other.duration_sum;
        self.first_call = self.first_call.min(other.first_call);
    }
}

/// Profiler storing all scopes entered on one thread and the current stack of active scopes
#[derive(Default)]
pub struct Profiler {
    scopes: HashMap<ScopePath, Scope>,
    stack: ScopePath,
}

impl Profiler {
    /// Resets all profiling data of this profiler
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.stack.clear();
    }

    /// Enters a scope with the given name as a child of the scope on top of the stack
    pub fn enter(&mut self, name: &'static str) -> Guard {
        self.stack.push(name);
        self.scopes
            .entry(self.stack.clone())
            .or_insert_with(Scope::new);
        Guard {
            enter_time: Instant::now(),
        }
    }

    /// Leaves the scope on top of the stack and adds the given duration to it
    fn leave(&mut self, duration: Duration) {
        if let Some(scope) = self.scopes.get_mut(&self.stack) {
            scope.num_calls += 1;
            scope.duration_sum += duration;
        }
        self.stack.pop();
    }
}

/// Pretty prints the collected profiling data of all thread local [`Profiler`]s to the given writer
pub fn write<W: io::Write>(out: &mut W) -> io::Result<()> {
    let mut merged = HashMap::<ScopePath, Scope>::new();
    for profiler in PROFILER.iter() {
        let profiler = profiler.read();
        for (path, scope) in &profiler.scopes {
            merged
                .entry(path.clone())
                .and_modify(|s| s.merge(scope))
                .or_insert_with(|| scope.clone());
        }
    }

    // Depth first order: children directly follow their parent, siblings by time of first call
    let mut sorted = merged.iter().collect::<Vec<_>>();
    sorted.sort_by(|(path_a, _), (path_b, _)| {
        let first_calls = |path: &ScopePath| {
            (1..=path.len())
                .filter_map(|len| merged.get(&path[..len]).map(|s| s.first_call))
                .collect::<Vec<_>>()
        };
        first_calls(path_a)
            .iter()
            .zip(first_calls(path_b).iter())
            .map(|(a, b)| a.cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| path_a.len().cmp(&path_b.len()))
    });

    for (path, scope) in sorted {
        let parent_duration = (path.len() > 1)
            .then(|| merged.get(&path[..path.len() - 1]))
            .flatten()
            .map(|parent| parent.duration_sum)
            .unwrap_or(scope.duration_sum);

        let duration_secs = scope.duration_sum.as_secs_f64();
        let percent = if parent_duration.is_zero() {
            100.0
        } else {
            duration_secs / parent_duration.as_secs_f64() * 100.0
        };

        writeln!(
            out,
            "{}{}: {:3.2}%, {:>4.2}ms avg, {} {} (total: {:.3}s)",
            "  ".repeat(path.len() - 1),
            path[path.len() - 1],
            percent,
            duration_secs * 1000.0 / (scope.num_calls.max(1) as f64),
            scope.num_calls,
            if scope.num_calls > 1 { "calls" } else { "call" },
            duration_secs
        )?;
    }

    Ok(())
}

/// Returns the pretty printed output of the collected profiling data as a `String`
pub fn write_to_string() -> Result<String, Box<dyn Error>> {
    let mut buffer = Vec::new();
    write(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Resets the profiling data of all thread local [`Profiler`]s
pub fn reset() {
    for profiler in PROFILER.iter() {
        profiler.write().reset();
    }
}
