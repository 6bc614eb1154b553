//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::result::{CancelReason, FilterResult, FitOutcome, StopReason};

/// Rejected indices listed before the line is truncated.
const MAX_LISTED: usize = 12;

/// Format a FilterResult for human-readable terminal output.
pub fn format_result(result: &FilterResult) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("adaptive-knockoff\n");
    output.push_str(&sep);
    output.push('\n');
    output.push('\n');

    output.push_str(&format!(
        "  Hypotheses: {} ({} revealed: {} positive, {} negative)\n",
        result.num_hypotheses,
        result.revealed(),
        result.pos_count,
        result.neg_count
    ));
    output.push_str(&format!(
        "  Model: {} (version {}, refit every {} reveals)\n",
        result.metadata.model, result.metadata.model_version, result.metadata.refit_every_k_reveals
    ));
    output.push_str(&format!("  Stopped: {}\n", format_stop(result.stop_reason)));
    output.push('\n');

    for level in &result.levels {
        let headline = format!("\u{03B1} = {:<6} {} rejections", level.alpha, level.count);
        if level.count > 0 {
            output.push_str(&format!("  {}\n", headline.green().bold()));
        } else {
            output.push_str(&format!("  {}\n", headline.dimmed()));
        }
        if level.admissible {
            output.push_str(&format!(
                "    Prefix: {} reveals, estimated FDP {:.3}\n",
                level.prefix_len, level.fdp_hat
            ));
        } else {
            output.push_str("    No admissible prefix\n");
        }
        if level.count > 0 {
            output.push_str(&format!("    Rejected: {}\n", list_indices(&level.rejections)));
        }
    }
    output.push('\n');

    let failures: Vec<&str> = result
        .diagnostics
        .fit_events
        .iter()
        .filter_map(|e| match &e.outcome {
            FitOutcome::Failed { reason } => Some(reason.as_str()),
            FitOutcome::Fitted { .. } => None,
        })
        .collect();
    if !failures.is_empty() {
        output.push_str(&format!(
            "  {}\n",
            format!(
                "\u{26A0} {} of {} refits failed (last: {})",
                failures.len(),
                result.diagnostics.fit_events.len(),
                failures[failures.len() - 1]
            )
            .yellow()
        ));
    }
    for warning in &result.diagnostics.warnings {
        output.push_str(&format!("  {} {}\n", "\u{26A0}".yellow(), warning));
    }

    output.push_str(&sep);
    output.push('\n');
    if !result.stop_reason.is_complete() {
        output.push_str(
            "Note: Run was cancelled; rejection sets cover the revealed prefix only.\n",
        );
    }

    output
}

fn format_stop(reason: StopReason) -> String {
    match reason {
        StopReason::Exhausted => "all hypotheses revealed".green().to_string(),
        StopReason::EarlyStop => "early (no longer prefix admissible)".green().to_string(),
        StopReason::Cancelled {
            reason: CancelReason::Requested,
        } => "cancelled".red().bold().to_string(),
        StopReason::Cancelled {
            reason: CancelReason::DeadlineExceeded,
        } => "deadline exceeded".red().bold().to_string(),
    }
}

fn list_indices(indices: &[usize]) -> String {
    let shown: Vec<String> = indices.iter().take(MAX_LISTED).map(usize::to_string).collect();
    let mut line = shown.join(", ");
    if indices.len() > MAX_LISTED {
        line.push_str(&format!(", ... (+{})", indices.len() - MAX_LISTED));
    }
    line
}
