//! Plain-text rendering of polls for the terminal.

use std::fmt::Write;

use domains::{OptionId, Poll};

const BAR_WIDTH: u64 = 20;

pub fn share_link(origin: &str, poll_id: &str) -> String {
    format!("{}/?poll={}", origin.trim_end_matches('/'), poll_id)
}

pub fn summary_line(poll: &Poll) -> String {
    format!("{}  {}  ({} votes)", poll.id, poll.question, poll.total_votes)
}

/// Question, then one line per option with its share of the vote. The
/// option this session picked is marked with `*`.
pub fn results(poll: &Poll, choice: Option<OptionId>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", poll.question);
    for option in &poll.options {
        let pct = poll.percentage(option.id);
        let filled = (pct.min(100) * BAR_WIDTH / 100) as usize;
        let marker = if choice == Some(option.id) { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} [{}] {:<24} {:>4} {:>3}% {}{}",
            option.id,
            option.text,
            option.count,
            pct,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH as usize - filled),
        );
    }
    let _ = writeln!(out, "  {} votes", poll.total_votes);
    out
}
