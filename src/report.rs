use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::assemble::LinkStats;

/// Pretty-printed JSON, creating the parent directory if needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

pub fn render_summary(stats: &LinkStats, driving_label: &str, candidate_label: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} {} records against {} {} records\n",
        stats.driving, driving_label, stats.candidates, candidate_label
    ));
    out.push_str(&format!(
        "  matched:   {} ({:.1}%)\n  unmatched: {}\n",
        stats.matched,
        percent(stats.matched, stats.driving),
        stats.unmatched
    ));
    for (kind, count) in &stats.by_matcher {
        out.push_str(&format!("  - {:<9} {}\n", kind.as_str(), count));
    }
    out
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}
