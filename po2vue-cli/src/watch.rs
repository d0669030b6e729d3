//! Watch mode: re-run the conversion when catalog files change.
//!
//! Change events are debounced over a fixed window, and conversions run
//! sequentially on the watcher thread, so overlapping runs cannot occur
//! even when events arrive mid-conversion.

use std::{
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use anyhow::Context;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use po2vue::{Options, convert};
use tracing::{debug, error, info};

/// Watches the catalog pattern roots and re-runs the conversion on
/// every debounced add/change burst. Failed runs are logged and
/// watching continues.
pub fn watch_and_rerun(options: &Options, debounce: Duration) -> anyhow::Result<()> {
    let roots = watch_roots(&options.po);

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("failed to create file watcher")?;
    for root in &roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", root.display()))?;
    }
    info!(roots = roots.len(), "watching for catalog changes");

    loop {
        let event = match rx.recv() {
            Ok(event) => event,
            Err(_) => return Ok(()), // watcher gone, nothing left to do
        };
        if !is_relevant(&event) {
            continue;
        }

        // Editors fire bursts of events for a single save; wait for the
        // burst to settle before converting.
        while rx.recv_timeout(debounce).is_ok() {}

        debug!("change detected, re-running conversion");
        match convert(options) {
            Ok(output) => info!(locales = output.len(), "conversion finished"),
            Err(e) => error!(error = %e, "conversion failed"),
        }
    }
}

fn is_relevant(event: &notify::Result<Event>) -> bool {
    match event {
        Ok(event) => matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)),
        Err(_) => false,
    }
}

/// Deduplicated static directory prefixes of the catalog patterns,
/// cut before the first glob meta-character.
fn watch_roots(patterns: &[String]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    for pattern in patterns {
        let root = static_prefix_dir(pattern);
        if !roots.iter().any(|r| r == &root) {
            roots.push(root);
        }
    }
    roots
}

fn static_prefix_dir(pattern: &str) -> PathBuf {
    let meta = pattern
        .find(|c| matches!(c, '*' | '?' | '[' | '{'))
        .unwrap_or(pattern.len());
    let prefix = Path::new(&pattern[..meta]);
    if prefix.is_dir() {
        prefix.to_path_buf()
    } else {
        prefix
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
