//! Single-line download progress on stderr.

use rescache_core::progress::{ProgressObserver, ProgressStats};
use std::io::Write;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
const MIB: f64 = 1_048_576.0;

struct State {
    started: Instant,
    last_print: Option<Instant>,
    stats: ProgressStats,
}

#[derive(Default)]
pub struct StderrProgress {
    state: Mutex<Option<State>>,
}

impl StderrProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

fn render(stats: &ProgressStats) {
    let done_mib = stats.bytes_done as f64 / MIB;
    let rate_mib = stats.bytes_per_sec() / MIB;
    let line = match (stats.total_bytes, stats.fraction()) {
        (Some(total), Some(fraction)) => {
            let eta = stats
                .eta_secs()
                .map(|s| format!("{:.0}s", s))
                .unwrap_or_else(|| "?".to_string());
            format!(
                "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  ",
                done_mib,
                total as f64 / MIB,
                fraction * 100.0,
                rate_mib,
                eta
            )
        }
        _ => format!("\r  {:.1} MiB  {:.2} MiB/s  ", done_mib, rate_mib),
    };
    let mut err = std::io::stderr().lock();
    let _ = err.write_all(line.as_bytes());
    let _ = err.flush();
}

impl ProgressObserver for StderrProgress {
    fn on_start(&self, total: Option<u64>) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(State {
            started: Instant::now(),
            last_print: None,
            stats: ProgressStats {
                bytes_done: 0,
                total_bytes: total,
                elapsed_secs: 0.0,
            },
        });
    }

    fn on_bytes(&self, n: u64) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(state) = guard.as_mut() else {
            return;
        };
        let now = Instant::now();
        state.stats.bytes_done += n;
        state.stats.elapsed_secs = now.duration_since(state.started).as_secs_f64();
        let due = state
            .last_print
            .map_or(true, |t| now.duration_since(t) >= PROGRESS_INTERVAL);
        if due {
            render(&state.stats);
            state.last_print = Some(now);
        }
    }

    fn on_finish(&self) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut state) = guard.take() {
            state.stats.elapsed_secs = state.started.elapsed().as_secs_f64();
            if state.last_print.is_some() {
                render(&state.stats);
                eprintln!();
            }
        }
    }
}
