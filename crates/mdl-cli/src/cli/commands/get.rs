//! `mdl get` – download URLs with live progress bars.

use anyhow::{bail, Context, Result};
use mdl_core::config::MdlConfig;
use mdl_core::format::format_size;
use mdl_core::{Scheduler, TaskHandle, TaskStatus};
use std::path::PathBuf;
use std::sync::Arc;

use super::progress::ProgressBoard;
use super::targets::plan_targets;

#[derive(Debug, Clone)]
pub struct GetOptions {
    pub urls: Vec<String>,
    pub output: Option<PathBuf>,
    pub overwrite: bool,
}

pub async fn run_get(cfg: MdlConfig, opts: GetOptions) -> Result<()> {
    let cwd = std::env::current_dir().context("current directory")?;
    let targets = plan_targets(&opts.urls, opts.output.as_deref(), &cwd)?;

    let board = ProgressBoard::new();
    let scheduler = Arc::new(Scheduler::new(&cfg));
    let mut bars = Vec::new();
    for (url, dest) in targets {
        if dest.exists() && !opts.overwrite {
            board.println(&format!("{}: already exists, skipping", dest.display()));
            continue;
        }
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dest.display().to_string());
        let (bar, cb) = board.track(&name);
        let task = scheduler.add_task(url, dest, Some(cb));
        bars.push((task, bar));
    }
    if bars.is_empty() {
        return Ok(());
    }

    let started = scheduler.start();
    tracing::info!("started {} download(s)", started);

    let waiter = {
        let scheduler = Arc::clone(&scheduler);
        tokio::task::spawn_blocking(move || scheduler.wait_all())
    };
    tokio::pin!(waiter);
    tokio::select! {
        res = &mut waiter => res.context("wait for downloads")?,
        _ = tokio::signal::ctrl_c() => {
            board.println("interrupted, cancelling downloads");
            scheduler.cancel_all();
            waiter.await.context("wait for downloads")?;
        }
    }

    let mut failed = 0usize;
    for (task, bar) in &bars {
        match task.status() {
            TaskStatus::Completed => bar.finish(),
            _ => bar.abandon(),
        }
        if report(&board, task) {
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{} of {} download(s) failed", failed, bars.len());
    }
    Ok(())
}

/// Print the outcome of one task. Returns true if it failed.
fn report(board: &ProgressBoard, task: &TaskHandle) -> bool {
    let dest = task.destination().display();
    match task.status() {
        TaskStatus::Completed => {
            let size = std::fs::metadata(task.destination()).ok().map(|m| m.len());
            let secs = task.elapsed().map_or(0.0, |d| d.as_secs_f64());
            board.println(&format!("{dest}: done, {} in {secs:.1}s", format_size(size)));
            if let Some(missing) = task.missing_segments().filter(|&m| m > 0) {
                board.println(&format!("{dest}: warning, {missing} segment(s) could not be fetched"));
            }
            false
        }
        TaskStatus::Cancelled => {
            board.println(&format!("{dest}: cancelled"));
            false
        }
        TaskStatus::Error => {
            let reason = task
                .error()
                .map(|e| format!("{:#}", e))
                .unwrap_or_else(|| "unknown error".to_string());
            board.println(&format!("{dest}: failed: {reason}"));
            true
        }
        other => {
            board.println(&format!("{dest}: stopped while {other}"));
            true
        }
    }
}
