// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ESC/POS content formatter.
//
// Turns line-based ticket text into the control-code byte stream a thermal
// receipt printer consumes. Pure byte assembly, no I/O — the dispatcher
// owns the socket. Classification rules are evaluated top-to-bottom per
// line; the first matching rule styles the line.

/// Initialize the printer (`ESC @`). Also used by discovery as a benign
/// handshake payload.
pub const INIT: [u8; 2] = [0x1B, b'@'];

/// Left alignment (`ESC a 0`).
pub const ALIGN_LEFT: [u8; 3] = [0x1B, b'a', 0x00];
/// Centre alignment (`ESC a 1`).
pub const ALIGN_CENTER: [u8; 3] = [0x1B, b'a', 0x01];

/// Emphasis on (`ESC E 1`).
pub const BOLD_ON: [u8; 3] = [0x1B, b'E', 0x01];
/// Emphasis off (`ESC E 0`).
pub const BOLD_OFF: [u8; 3] = [0x1B, b'E', 0x00];

/// Normal character size (`GS ! 0`).
pub const SIZE_NORMAL: [u8; 3] = [0x1D, b'!', 0x00];
/// Double height (`GS ! 1`).
pub const SIZE_DOUBLE_HEIGHT: [u8; 3] = [0x1D, b'!', 0x01];
/// Double height and width (`GS ! 0x11`).
pub const SIZE_DOUBLE: [u8; 3] = [0x1D, b'!', 0x11];

/// Line feed.
pub const FEED: u8 = 0x0A;

/// Partial cut (`GS V 1`).
pub const CUT: [u8; 3] = [0x1D, b'V', 0x01];

/// Glyph used when re-drawing separator lines at device width.
const SEPARATOR_GLYPH: u8 = b'-';

/// How a single ticket line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStyle {
    /// Run of `=`/`-` — re-drawn centred at full device width.
    Separator,
    /// Ticket header (KOT/BOT/BILL) — centred, bold, double height.
    Header,
    /// Room/customer/order context — left, bold.
    Context,
    /// `*****` location banner — centred, bold, double height, stars stripped.
    Banner,
    /// `**…**` note — left, bold, markers stripped.
    BoldNote,
    /// Order item — left, bold, double size.
    Item,
    /// Empty line — a single feed, no text.
    Blank,
    /// Anything else — left, normal weight.
    Plain,
}

/// Printable columns for separator lines at the given paper width.
fn separator_width(paper_width: u16) -> usize {
    if paper_width == 58 { 32 } else { 42 }
}

/// Classify one ticket line. First match wins, evaluated in rule order.
fn classify(line: &str) -> LineStyle {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        // Checked early so the later rules can assume non-empty input,
        // but ranked per the rule table: no earlier rule matches a
        // blank line anyway.
        return LineStyle::Blank;
    }
    if is_separator(trimmed) {
        return LineStyle::Separator;
    }
    let upper = trimmed.to_ascii_uppercase();
    if upper.contains("KOT") || upper.contains("BOT") || upper.contains("BILL") {
        return LineStyle::Header;
    }
    if trimmed.contains("Room:") || trimmed.contains("Customer:") || trimmed.contains("Order #") {
        return LineStyle::Context;
    }
    if trimmed.contains("*****")
        && (upper.contains("TABLE") || upper.contains("ROOM") || upper.contains("TAKEAWAY"))
    {
        return LineStyle::Banner;
    }
    if is_bold_note(trimmed) {
        return LineStyle::BoldNote;
    }
    if is_item(line) {
        return LineStyle::Item;
    }
    LineStyle::Plain
}

/// A run of at least 20 `=` or `-` characters.
fn is_separator(trimmed: &str) -> bool {
    trimmed.len() >= 20 && trimmed.bytes().all(|b| b == b'=' || b == b'-')
}

/// Wrapped in `**…**` with some content between the markers.
fn is_bold_note(trimmed: &str) -> bool {
    trimmed.len() > 4 && trimmed.starts_with("**") && trimmed.ends_with("**")
}

/// Order-item patterns: `1. …`, `- 2x …`, or `  3x …`.
fn is_item(line: &str) -> bool {
    starts_with_numbered_dot(line)
        || starts_with_dash_quantity(line)
        || starts_with_quantity(line.trim_start())
}

/// `^\d+\.`
fn starts_with_numbered_dot(line: &str) -> bool {
    let digits = line.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits > 0 && line.as_bytes().get(digits) == Some(&b'.')
}

/// `^-\s*\d+x`
fn starts_with_dash_quantity(line: &str) -> bool {
    line.strip_prefix('-')
        .map(|rest| starts_with_quantity(rest.trim_start()))
        .unwrap_or(false)
}

/// `^\d+x` on an already-trimmed slice.
fn starts_with_quantity(rest: &str) -> bool {
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    digits > 0 && rest.as_bytes().get(digits) == Some(&b'x')
}

/// Encode ticket text into an ESC/POS byte stream.
///
/// Pure and deterministic: identical input always yields byte-identical
/// output. The stream opens with the initialize sequence and closes with
/// two feeds and a cut, so every ticket leaves the printer in a known
/// state regardless of its content.
pub fn format(content: &str, paper_width: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 64);
    out.extend_from_slice(&INIT);

    for line in content.lines() {
        emit_line(&mut out, line, paper_width);
    }

    out.push(FEED);
    out.push(FEED);
    out.extend_from_slice(&CUT);
    out
}

/// Render one classified line, always restoring left/normal/plain state
/// afterwards so styles never leak across lines.
fn emit_line(out: &mut Vec<u8>, line: &str, paper_width: u16) {
    match classify(line) {
        LineStyle::Blank => out.push(FEED),
        LineStyle::Separator => {
            out.extend_from_slice(&ALIGN_CENTER);
            out.extend(std::iter::repeat_n(
                SEPARATOR_GLYPH,
                separator_width(paper_width),
            ));
            out.push(FEED);
            out.extend_from_slice(&ALIGN_LEFT);
        }
        LineStyle::Header => emit_styled(out, line.trim(), true, &SIZE_DOUBLE_HEIGHT, true),
        LineStyle::Banner => {
            let text = line.replace('*', "");
            emit_styled(out, text.trim(), true, &SIZE_DOUBLE_HEIGHT, true);
        }
        LineStyle::Context => emit_styled(out, line.trim(), false, &SIZE_NORMAL, true),
        LineStyle::BoldNote => {
            let trimmed = line.trim();
            let text = &trimmed[2..trimmed.len() - 2];
            emit_styled(out, text.trim(), false, &SIZE_NORMAL, true);
        }
        LineStyle::Item => emit_styled(out, line.trim(), false, &SIZE_DOUBLE, true),
        LineStyle::Plain => {
            out.extend_from_slice(line.trim_end().as_bytes());
            out.push(FEED);
        }
    }
}

/// Emit text with the given alignment/size/weight, then reset.
fn emit_styled(out: &mut Vec<u8>, text: &str, centered: bool, size: &[u8; 3], bold: bool) {
    if centered {
        out.extend_from_slice(&ALIGN_CENTER);
    }
    if bold {
        out.extend_from_slice(&BOLD_ON);
    }
    if size != &SIZE_NORMAL {
        out.extend_from_slice(size);
    }
    out.extend_from_slice(text.as_bytes());
    out.push(FEED);
    if size != &SIZE_NORMAL {
        out.extend_from_slice(&SIZE_NORMAL);
    }
    if bold {
        out.extend_from_slice(&BOLD_OFF);
    }
    if centered {
        out.extend_from_slice(&ALIGN_LEFT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Find a byte subsequence in the output stream.
    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn formatting_is_deterministic() {
        let content = "KOT Ticket\nTable: 5\n1. Burger x2\n";
        assert_eq!(format(content, 80), format(content, 80));
    }

    #[test]
    fn output_is_wrapped_with_init_and_cut() {
        let bytes = format("hello\n", 80);
        assert!(bytes.starts_with(&INIT));
        let tail: Vec<u8> = [FEED, FEED, CUT[0], CUT[1], CUT[2]].to_vec();
        assert!(bytes.ends_with(&tail));
    }

    #[test]
    fn kot_ticket_scenario() {
        let bytes = format(
            "========================\nKOT Ticket\nTable: 5\n1. Burger x2\n",
            80,
        );
        assert!(bytes.starts_with(&INIT));

        // Centred 42-char separator.
        let mut separator = ALIGN_CENTER.to_vec();
        separator.extend(std::iter::repeat_n(b'-', 42));
        assert!(contains(&bytes, &separator));

        // Centred bold double-height header.
        let mut header = ALIGN_CENTER.to_vec();
        header.extend_from_slice(&BOLD_ON);
        header.extend_from_slice(&SIZE_DOUBLE_HEIGHT);
        header.extend_from_slice(b"KOT Ticket");
        assert!(contains(&bytes, &header));

        // Bold double-size item line.
        let mut item = BOLD_ON.to_vec();
        item.extend_from_slice(&SIZE_DOUBLE);
        item.extend_from_slice(b"1. Burger x2");
        assert!(contains(&bytes, &item));

        let tail = [FEED, FEED, CUT[0], CUT[1], CUT[2]];
        assert!(bytes.ends_with(&tail));
    }

    #[test]
    fn narrow_paper_uses_32_column_separator() {
        let bytes = format("--------------------\n", 58);
        let mut separator = ALIGN_CENTER.to_vec();
        separator.extend(std::iter::repeat_n(b'-', 32));
        assert!(contains(&bytes, &separator));
    }

    #[test]
    fn short_dash_run_is_not_a_separator() {
        assert_eq!(classify("-------------------"), LineStyle::Plain); // 19 chars
        assert_eq!(classify("--------------------"), LineStyle::Separator); // 20
        assert_eq!(classify("===================="), LineStyle::Separator);
    }

    #[test]
    fn header_match_is_case_insensitive() {
        assert_eq!(classify("kot ticket"), LineStyle::Header);
        assert_eq!(classify("Bar Order (BOT)"), LineStyle::Header);
        assert_eq!(classify("Final Bill"), LineStyle::Header);
    }

    #[test]
    fn context_lines_are_bold() {
        assert_eq!(classify("Room: 204"), LineStyle::Context);
        assert_eq!(classify("Customer: Jane"), LineStyle::Context);
        assert_eq!(classify("Order #1042"), LineStyle::Context);
    }

    #[test]
    fn banner_requires_stars_and_location_keyword() {
        assert_eq!(classify("***** TABLE 7 *****"), LineStyle::Banner);
        assert_eq!(classify("***** TAKEAWAY *****"), LineStyle::Banner);
        // Stars without a location keyword fall through.
        assert_eq!(classify("***** special *****"), LineStyle::BoldNote);
    }

    #[test]
    fn banner_stars_are_stripped() {
        let bytes = format("***** TABLE 7 *****\n", 80);
        assert!(!contains(&bytes, b"*"));
        assert!(contains(&bytes, b"TABLE 7"));
    }

    #[test]
    fn bold_note_markers_are_stripped() {
        assert_eq!(classify("**no onions**"), LineStyle::BoldNote);
        let bytes = format("**no onions**\n", 80);
        assert!(contains(&bytes, b"no onions"));
        assert!(!contains(&bytes, b"**"));
    }

    #[test]
    fn item_patterns_match() {
        assert_eq!(classify("1. Burger x2"), LineStyle::Item);
        assert_eq!(classify("- 2x Fries"), LineStyle::Item);
        assert_eq!(classify("  3x Cola"), LineStyle::Item);
        assert_eq!(classify("12. Paneer Tikka"), LineStyle::Item);
    }

    #[test]
    fn plain_text_stays_plain() {
        assert_eq!(classify("Thank you, come again"), LineStyle::Plain);
        assert_eq!(classify("x2 reversed quantity"), LineStyle::Plain);
        assert_eq!(classify("1 without dot"), LineStyle::Plain);
    }

    #[test]
    fn blank_line_is_a_single_feed() {
        let bytes = format("\n", 80);
        // INIT, one feed for the blank line, then the trailer.
        let expected: Vec<u8> = INIT
            .iter()
            .chain([FEED, FEED, FEED].iter())
            .chain(CUT.iter())
            .copied()
            .collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn rule_order_prefers_header_over_item() {
        // Contains both a header keyword and an item prefix; rule 2 wins.
        assert_eq!(classify("1. KOT reprint"), LineStyle::Header);
    }

    #[test]
    fn styles_are_reset_after_each_line() {
        let bytes = format("1. Burger x2\nplain line\n", 80);
        let mut reset = SIZE_NORMAL.to_vec();
        reset.extend_from_slice(&BOLD_OFF);
        reset.extend_from_slice(b"plain line");
        assert!(contains(&bytes, &reset));
    }
}
