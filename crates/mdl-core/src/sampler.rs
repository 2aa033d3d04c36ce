//! Throughput sampler.
//!
//! One background thread ticks every `interval` while at least one task is
//! registered. Each tick turns the counter delta since the previous tick into a
//! rate and reports it through the task's progress callback. Fetchers register
//! a task for the duration of their transfer phase and always send the final
//! 100% event themselves; the sampler never does.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::format;
use crate::task::{ProgressEvent, Task, TaskStatus, TransferKind};

/// Percent reported for a segmented task once all segments are fetched.
pub(crate) const MERGE_PERCENT: f64 = 90.0;

/// Highest percent a sampled event may carry; 100 belongs to the final report.
const SAMPLED_PERCENT_CAP: f64 = 99.9;

struct Entry {
    task: Arc<Task>,
    last_value: u64,
    last_time: Instant,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<PathBuf, Entry>,
    running: bool,
}

struct Shared {
    registry: Mutex<Registry>,
    /// Held by the sampler thread while it delivers a tick's events.
    delivery: Mutex<()>,
}

#[derive(Clone)]
pub(crate) struct ThroughputSampler {
    interval: Duration,
    shared: Arc<Shared>,
}

impl ThroughputSampler {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                delivery: Mutex::new(()),
            }),
        }
    }

    /// Start sampling `task`. Sampling stops when the returned guard drops.
    pub(crate) fn register(&self, task: &Arc<Task>) -> Registration {
        let key = task.destination().to_path_buf();
        let mut reg = lock(&self.shared.registry);
        reg.entries.insert(
            key.clone(),
            Entry {
                task: Arc::clone(task),
                last_value: counter(task),
                last_time: Instant::now(),
            },
        );
        if !reg.running {
            let shared = Arc::clone(&self.shared);
            let interval = self.interval;
            let spawned = std::thread::Builder::new()
                .name("mdl-sampler".into())
                .spawn(move || run(&shared, interval));
            match spawned {
                Ok(_) => reg.running = true,
                Err(e) => tracing::warn!(error = %e, "could not start throughput sampler"),
            }
        }
        Registration {
            shared: Arc::clone(&self.shared),
            key,
        }
    }

    #[cfg(test)]
    pub(crate) fn registered(&self) -> usize {
        lock(&self.shared.registry).entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        lock(&self.shared.registry).running
    }
}

/// Keeps a task registered with the sampler.
///
/// Dropping it removes the task and waits for any tick already delivering
/// events, so nothing from the sampler reaches the callback afterwards.
pub(crate) struct Registration {
    shared: Arc<Shared>,
    key: PathBuf,
}

impl Drop for Registration {
    fn drop(&mut self) {
        lock(&self.shared.registry).entries.remove(&self.key);
        drop(lock(&self.shared.delivery));
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run(shared: &Shared, interval: Duration) {
    tracing::debug!("throughput sampler started");
    loop {
        std::thread::sleep(interval);
        if !tick(shared) {
            break;
        }
    }
    tracing::debug!("throughput sampler stopped");
}

/// One sampling pass. Returns false (and marks the sampler stopped) when
/// nothing is registered.
fn tick(shared: &Shared) -> bool {
    let _delivering = lock(&shared.delivery);
    let now = Instant::now();
    let events: Vec<(Arc<Task>, ProgressEvent)> = {
        let mut reg = lock(&shared.registry);
        if reg.entries.is_empty() {
            reg.running = false;
            return false;
        }
        reg.entries
            .values_mut()
            .filter_map(|entry| {
                let status = entry.task.status();
                if !status.is_active() {
                    return None;
                }
                let value = counter(&entry.task);
                let secs = now.duration_since(entry.last_time).as_secs_f64();
                let rate = if secs > 0.0 {
                    value.saturating_sub(entry.last_value) as f64 / secs
                } else {
                    0.0
                };
                entry.last_value = value;
                entry.last_time = now;
                if !entry.task.has_progress() {
                    return None;
                }
                let event = sample(&entry.task, status, rate);
                Some((Arc::clone(&entry.task), event))
            })
            .collect()
    };
    for (task, event) in events {
        task.report(event);
    }
    true
}

/// The counter a task's rate is computed from.
fn counter(task: &Task) -> u64 {
    if task.kind().is_segmented() {
        task.downloaded_segments()
    } else {
        task.downloaded_bytes()
    }
}

/// Build the progress event for one task given its current rate (bytes/s or segments/s).
pub(crate) fn sample(task: &Task, status: TaskStatus, rate: f64) -> ProgressEvent {
    let bytes = task.downloaded_bytes();
    if status == TaskStatus::Merging {
        return ProgressEvent::new(MERGE_PERCENT, "merging", Some(bytes), None);
    }
    match task.kind() {
        TransferKind::WholeFile { size: Some(total) } if total > 0 => {
            let percent = bytes as f64 / total as f64 * 100.0;
            ProgressEvent::new(
                percent.min(SAMPLED_PERCENT_CAP),
                format::byte_rate_label(rate),
                Some(bytes),
                Some(total),
            )
        }
        TransferKind::WholeFile { .. } => {
            ProgressEvent::new(0.0, format::byte_rate_label(rate), Some(bytes), None)
        }
        TransferKind::Segmented { segment_count } => {
            let done = task.downloaded_segments();
            let total = segment_count.unwrap_or(0);
            let percent = if total > 0 {
                done as f64 / total as f64 * MERGE_PERCENT
            } else {
                0.0
            };
            ProgressEvent::new(
                percent,
                format::segment_rate_label(rate, done, total),
                Some(bytes),
                None,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ProgressFn;

    fn recording_task(path: &str, kind: TransferKind) -> (Arc<Task>, Arc<Mutex<Vec<ProgressEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let cb: ProgressFn = Arc::new(move |e: &ProgressEvent| s.lock().unwrap().push(e.clone()));
        let task = Arc::new(Task::new("http://host/x", path, kind, Some(cb)));
        (task, seen)
    }

    #[test]
    fn whole_file_percent_from_bytes() {
        let (t, _) = recording_task("/tmp/a", TransferKind::WholeFile { size: Some(200) });
        t.add_bytes(50);
        let e = sample(&t, TaskStatus::Downloading, 2.0 * 1024.0 * 1024.0);
        assert_eq!(e.percent, 25.0);
        assert_eq!(e.label, "2.00 MB/s");
        assert_eq!(e.current_bytes, Some(50));
        assert_eq!(e.total_bytes, Some(200));
        t.add_bytes(150);
        assert!(sample(&t, TaskStatus::Downloading, 0.0).percent < 100.0);
    }

    #[test]
    fn unknown_size_reports_zero_percent() {
        let (t, _) = recording_task("/tmp/b", TransferKind::WholeFile { size: None });
        t.add_bytes(10);
        let e = sample(&t, TaskStatus::Downloading, 0.0);
        assert_eq!(e.percent, 0.0);
        assert_eq!(e.total_bytes, None);
        assert_eq!(e.current_bytes, Some(10));
    }

    #[test]
    fn segmented_percent_tops_out_at_ninety() {
        let (t, _) = recording_task(
            "/tmp/c",
            TransferKind::Segmented {
                segment_count: Some(4),
            },
        );
        for _ in 0..4 {
            t.add_segment();
        }
        let e = sample(&t, TaskStatus::Downloading, 1.5);
        assert_eq!(e.percent, 90.0);
        assert_eq!(e.label, "1.50 seg/s (4/4)");
        assert_eq!(e.total_bytes, None);
        let e = sample(&t, TaskStatus::Merging, 0.0);
        assert_eq!(e.label, "merging");
    }

    #[test]
    fn reports_only_active_tasks_and_stops_when_empty() {
        let sampler = ThroughputSampler::new(Duration::from_millis(10));
        let (t, seen) = recording_task("/tmp/d", TransferKind::WholeFile { size: Some(100) });
        let reg = sampler.register(&t);
        assert!(sampler.is_running());
        std::thread::sleep(Duration::from_millis(50));
        assert!(seen.lock().unwrap().is_empty(), "pending task is not sampled");

        t.set_status(TaskStatus::Downloading);
        t.add_bytes(40);
        std::thread::sleep(Duration::from_millis(60));
        drop(reg);
        let n = seen.lock().unwrap().len();
        assert!(n > 0);
        assert!(seen.lock().unwrap().iter().all(|e| e.percent < 100.0));

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(seen.lock().unwrap().len(), n, "no events after unregister");
        assert_eq!(sampler.registered(), 0);
        assert!(!sampler.is_running());
    }
}
