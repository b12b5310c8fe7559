/// Prints a tagged per-competition status line to stdout.
/// ```ignore
/// status!(OK, "compId={} -> {} athletes", id, n);
/// status!(ERR, "compId={} -> {}", id, err);
/// ```
#[macro_export]
macro_rules! status {
    ($tag:ident, $($arg:tt)+) => {{
        println!("[{}] {}", stringify!($tag), format!($($arg)+));
    }};
}

/// Similar to `info!` from `log`, but takes a starting time and appends how long it took
/// from that time to now.
/// ```ignore
/// let time = Local::now();
/// info_time!(time, "str {}, {}", 1, 2);
/// ```
#[macro_export]
macro_rules! info_time {
    ($time:expr, $($arg:tt)+) => {{
        let run_time = (::chrono::Local::now() - $time)
            .num_microseconds()
            .map(|n| n as f64 / 1_000_000.0)
            .unwrap_or(0.0);
        ::log::info!("{} (RUNTIME: {:.3} sec)", format!($($arg)+), run_time);
    }};
}
