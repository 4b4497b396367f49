//! Prompt primitives over generic reader/writer handles. Every menu flow in
//! the crate goes through a `Console`, so tests can script stdin and capture
//! stdout with in-memory buffers.

use crate::format::FormatContext;
use std::io::{BufRead, Write};

pub struct Console<R, W> {
    input: R,
    out: W,
    pub fmt: FormatContext,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W, fmt: FormatContext) -> Self {
        Self { input, out, fmt }
    }

    pub fn say(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    pub fn blank(&mut self) {
        let _ = writeln!(self.out);
    }

    pub fn ok(&mut self, text: &str) {
        let rendered = self.fmt.ok(text);
        let _ = writeln!(self.out, "{rendered}");
    }

    pub fn warn(&mut self, text: &str) {
        let rendered = self.fmt.warn(text);
        let _ = writeln!(self.out, "{rendered}");
    }

    /// Banner-style section title between separator rules.
    pub fn section(&mut self, title: &str) {
        let rendered = self.fmt.header(title);
        let rule = crate::format::rule(50);
        let _ = writeln!(self.out, "\n{rule}\n{rendered}\n{rule}");
    }

    /// Print a prompt without a newline and read one trimmed line.
    /// Returns `None` on EOF or a read error.
    pub fn prompt_line(&mut self, prompt: &str) -> Option<String> {
        let _ = write!(self.out, "{prompt}");
        let _ = self.out.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    /// 1-based selection from a list of `len` items; loops until a valid
    /// number is supplied. `cancel` or `back` aborts. Returns 0-based.
    pub fn prompt_index(&mut self, prompt: &str, len: usize) -> Option<usize> {
        loop {
            let raw = self.prompt_line(prompt)?;
            if is_cancel(&raw) {
                return None;
            }
            match raw.parse::<usize>() {
                Ok(n) if (1..=len).contains(&n) => return Some(n - 1),
                Ok(_) => {
                    self.warn(&format!("Choice out of range (1-{len})."));
                }
                Err(_) => self.warn("Enter a valid number."),
            }
        }
    }

    /// Numbered list followed by an index prompt.
    pub fn choose(&mut self, what: &str, labels: &[String]) -> Option<usize> {
        for (i, label) in labels.iter().enumerate() {
            let text = format!("{}. {label}", i + 1);
            self.say(&text);
        }
        let prompt =
            format!("\nSelect {what} (1-{}, or cancel): ", labels.len());
        self.prompt_index(&prompt, labels.len())
    }

    /// Yes/no gate. Anything but `y` declines, including EOF.
    pub fn confirm(&mut self, question: &str) -> bool {
        match self.prompt_line(&format!("{question} (y/n): ")) {
            Some(answer) => answer.eq_ignore_ascii_case("y"),
            None => false,
        }
    }

    /// Repeated prompts terminated by the `done` sentinel. Blank entries are
    /// skipped rather than collected.
    pub fn collect_until_done(&mut self, label: &str) -> Vec<String> {
        self.say("(type 'done' to finish)");
        let mut collected = Vec::new();
        loop {
            let Some(raw) = self.prompt_line(&format!("{label}: ")) else {
                break;
            };
            if raw.eq_ignore_ascii_case("done") {
                break;
            }
            if !raw.is_empty() {
                collected.push(raw);
            }
        }
        collected
    }

    /// Free-form multi-line accumulation for rewriting a response. Lines are
    /// joined with single spaces; `done` or a blank line (after at least one
    /// line was read) finishes. Reports the running length as it grows and
    /// warns once it passes `warn_over` characters.
    pub fn collect_joined_lines(
        &mut self,
        label: &str,
        warn_over: usize,
    ) -> Option<String> {
        let mut text = String::new();
        let mut lines = 0usize;
        loop {
            let prompt = if lines == 0 {
                format!("{label}: ")
            } else {
                format!("{:width$}: ", "", width = label.len())
            };
            let Some(raw) = self.prompt_line(&prompt) else { break };
            if raw.eq_ignore_ascii_case("done") {
                break;
            }
            if raw.is_empty() {
                if lines > 0 {
                    break;
                }
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&raw);
            lines += 1;
            let len = text.chars().count();
            self.say(&format!("   length so far: {len} chars"));
            if len > warn_over {
                self.warn(&format!("   over {warn_over} characters"));
            }
        }
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn pause(&mut self) {
        let _ = self.prompt_line("\nPress Enter to continue...");
    }
}

fn is_cancel(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("cancel")
        || raw.eq_ignore_ascii_case("back")
        || raw.eq_ignore_ascii_case("done")
}

/// Parse a single index or a comma-separated list of 1-based indices into
/// 0-based positions sorted descending, so removals never shift later
/// targets. Any invalid or out-of-range piece rejects the whole selection.
pub fn parse_index_selection(raw: &str, len: usize) -> Option<Vec<usize>> {
    let mut picked = Vec::new();
    for piece in raw.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return None;
        }
        match piece.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => picked.push(n - 1),
            _ => return None,
        }
    }
    if picked.is_empty() {
        return None;
    }
    picked.sort_unstable_by(|a, b| b.cmp(a));
    picked.dedup();
    Some(picked)
}
