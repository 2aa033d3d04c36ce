//! indicatif progress bars driven by task progress callbacks.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mdl_core::format::format_size;
use mdl_core::{ProgressEvent, ProgressFn};
use std::sync::Arc;

/// One bar per task, all under a single `MultiProgress`.
pub(crate) struct ProgressBoard {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl ProgressBoard {
    pub(crate) fn new() -> Self {
        let style = ProgressStyle::with_template(
            "{prefix:<24!} [{elapsed_precise}] {wide_bar} {pos:>3}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        Self {
            multi: MultiProgress::new(),
            style,
        }
    }

    /// Add a bar labelled `name` and return the callback that drives it.
    pub(crate) fn track(&self, name: &str) -> (ProgressBar, ProgressFn) {
        let bar = self.multi.add(ProgressBar::new(100));
        bar.set_style(self.style.clone());
        bar.set_prefix(name.to_string());
        let driven = bar.clone();
        let cb: ProgressFn = Arc::new(move |e: &ProgressEvent| apply(&driven, e));
        (bar, cb)
    }

    pub(crate) fn println(&self, line: &str) {
        if self.multi.println(line).is_err() {
            println!("{line}");
        }
    }
}

fn apply(bar: &ProgressBar, e: &ProgressEvent) {
    bar.set_position(e.percent.round() as u64);
    let msg = match (e.current_bytes, e.total_bytes) {
        (Some(cur), Some(total)) => format!(
            "{} {}/{}",
            e.label,
            format_size(Some(cur)),
            format_size(Some(total))
        ),
        (Some(cur), None) => format!("{} {}", e.label, format_size(Some(cur))),
        (None, Some(total)) => format!("{} {}", e.label, format_size(Some(total))),
        (None, None) => e.label.clone(),
    };
    bar.set_message(msg);
}
