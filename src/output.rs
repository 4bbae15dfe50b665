use std::fmt::Write;

use skillet_core::migrate::MoveResult;
use skillet_core::{SyncAction, SyncResult, SyncSummary, TargetStatus};
use skillet_skills::Skill;

const DESCRIPTION_WIDTH: usize = 60;
const STATUS_SEPARATOR: &str = "----------------------------------------";

/// Cut `s` to `max` characters, marking the cut with `...`.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push_str("...");
    out
}

pub(crate) fn skill_table(skills: &[Skill]) -> String {
    let header = ["NAME", "SCOPE", "CATEGORY", "DESCRIPTION"];
    let rule = ["----", "-----", "--------", "-----------"];
    let mut rows: Vec<[String; 4]> = vec![header.map(String::from), rule.map(String::from)];
    rows.extend(skills.iter().map(|s| {
        [
            s.name.clone(),
            s.scope.to_string(),
            s.category.to_string(),
            truncate(&s.description, DESCRIPTION_WIDTH),
        ]
    }));

    let mut widths = [0usize; 3];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in &rows {
        let line = format!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            row[0],
            row[1],
            row[2],
            row[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

/// Results grouped per target, each group ending with its counts.
pub(crate) fn sync_report(results: &[SyncResult], dry_run: bool) -> String {
    let mut out = String::new();
    if dry_run {
        out.push_str("Dry run - no changes made:\n");
    }
    if results.is_empty() {
        out.push_str("No skills to sync.\n");
        return out;
    }

    for group in results.chunk_by(|a, b| a.target == b.target) {
        let _ = writeln!(out, "\nTarget: {}", group[0].target);
        for r in group {
            match r.action {
                SyncAction::Install => {
                    let _ = writeln!(out, "  + {} (install{})", r.skill, method_note(r));
                }
                SyncAction::Update => {
                    let _ = writeln!(out, "  ~ {} (update{})", r.skill, method_note(r));
                }
                SyncAction::Error => {
                    let error = r.error.as_ref().map(ToString::to_string).unwrap_or_default();
                    let _ = writeln!(out, "  ! {} (error: {error})", r.skill);
                }
                SyncAction::Skip => {}
            }
        }
        let summary = summary_line(&SyncSummary::from_results(group));
        if !summary.is_empty() {
            let _ = writeln!(out, "  Summary: {summary}");
        }
    }
    out
}

fn method_note(result: &SyncResult) -> String {
    match result.method {
        Some(method) => format!(", {method}"),
        None => String::new(),
    }
}

fn summary_line(summary: &SyncSummary) -> String {
    [
        (summary.installed, "installed"),
        (summary.updated, "updated"),
        (summary.skipped, "skipped"),
        (summary.errors, "errors"),
    ]
    .into_iter()
    .filter(|(n, _)| *n > 0)
    .map(|(n, label)| format!("{n} {label}"))
    .collect::<Vec<_>>()
    .join(", ")
}

pub(crate) fn status_report(statuses: &[TargetStatus]) -> String {
    let mut out = String::new();
    for status in statuses {
        let _ = writeln!(out, "\nTarget: {}", status.target);
        let _ = writeln!(out, "{STATUS_SEPARATOR}");
        if let Some(e) = &status.error {
            let _ = writeln!(out, "  Status: Error - {e}");
            continue;
        }
        let state = if status.in_sync { "In sync" } else { "Out of sync" };
        let _ = writeln!(out, "  Status: {state}");
        for (header, names, prefix) in [
            ("Installed", &status.installed, '+'),
            ("Missing", &status.missing, '-'),
            ("Extra", &status.extra, '?'),
        ] {
            if names.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {header} ({}):", names.len());
            for name in names {
                let _ = writeln!(out, "    {prefix} {name}");
            }
        }
    }

    if statuses.is_empty() {
        out.push_str("\nNo targets found.\n");
        return out;
    }
    let errors = statuses.iter().filter(|s| s.error.is_some()).count();
    let in_sync = statuses.iter().filter(|s| s.in_sync).count();
    let out_of_sync = statuses.len() - errors - in_sync;
    let _ = write!(
        out,
        "\nSummary: {} target(s), {in_sync} in sync, {out_of_sync} out of sync",
        statuses.len()
    );
    if errors > 0 {
        let _ = write!(out, ", {errors} error(s)");
    }
    out.push('\n');
    out
}

pub(crate) fn move_report(moves: &[MoveResult]) -> String {
    let mut out = String::new();
    for m in moves {
        let message = m.message.unwrap_or_default();
        match &m.error {
            Some(e) => {
                let _ = writeln!(out, "  ! {} from {}: {message}: {e}", m.skill, m.from_target);
            }
            None => {
                let _ = writeln!(out, "  {} {} from {} ({message})", m.action, m.skill, m.from_target);
            }
        }
    }
    out
}

pub(crate) fn migrate_sync_report(results: &[SyncResult]) -> String {
    let mut out = String::from("\nSynced to targets:\n");
    for r in results {
        match r.action {
            SyncAction::Install | SyncAction::Update => {
                let _ = writeln!(out, "  ✓ {} → {}", r.skill, r.target);
            }
            SyncAction::Error => {
                let error = r.error.as_ref().map(ToString::to_string).unwrap_or_default();
                let _ = writeln!(out, "  ⚠ {} → {}: {error}", r.skill, r.target);
            }
            SyncAction::Skip => {}
        }
    }
    out
}
