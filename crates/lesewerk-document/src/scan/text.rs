// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text cleanup applied to raw engine output.

/// Normalise recognised text.
///
/// Trailing whitespace is stripped from every line, runs of blank lines
/// collapse to a single blank line, and the whole text is trimmed.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_blank = false;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        out.push_str(if out.is_empty() { line.trim_start() } else { line });
        pending_blank = false;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(normalize_text("a  \n\n\n\nb\n"), "a\n\nb");
    }

    #[test]
    fn trims_leading_blank_lines() {
        assert_eq!(normalize_text("\n\n   \nhello\r\n"), "hello");
    }

    #[test]
    fn keeps_inner_indentation() {
        assert_eq!(normalize_text("  first\n  indented"), "first\n  indented");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(normalize_text(" \n\t\n"), "");
    }
}
