use std::time::Instant;

use log::info;

/// Runs `f`, logging how long it took.
pub fn measure<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let tt = Instant::now();
    let val = f();

    info!(
        "{label}; tt = {}",
        humantime::format_duration(tt.elapsed())
    );

    val
}
