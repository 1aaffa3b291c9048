//! Width-aware clipping that skips over ANSI CSI escapes.

const ESC: char = '\u{1b}';
const ELLIPSIS: &str = "...";

/// Display cells for one character: 2 for the common CJK blocks, 1 otherwise.
pub fn char_width(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F // Hangul Jamo
        | 0x2E80..=0x9FFF // CJK radicals through unified ideographs
        | 0xAC00..=0xD7A3 // Hangul syllables
        | 0xF900..=0xFAFF // CJK compatibility ideographs
        | 0xFF00..=0xFFEF => 2, // fullwidth forms
        _ => 1,
    }
}

/// Visible width of `s`, ignoring escape sequences.
pub fn visible_length(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == ESC {
            in_escape = true;
        } else {
            width += char_width(c);
        }
    }
    width
}

/// Strip escape sequences, leaving only the visible text.
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == ESC {
            in_escape = true;
        } else {
            out.push(c);
        }
    }
    out
}

/// Clip `s` to at most `max_width` visible cells. Strings that already fit
/// are returned unchanged; otherwise as much of `...` as fits is appended.
/// Escape sequences before the cut are preserved.
pub fn truncate(s: &str, max_width: usize) -> String {
    if visible_length(s) <= max_width {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut width = 0;
    let mut in_escape = false;
    let mut clipped = false;

    for c in s.chars() {
        if in_escape {
            out.push(c);
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
            continue;
        }
        if c == ESC {
            in_escape = true;
            out.push(c);
            continue;
        }
        let w = char_width(c);
        if width + w > max_width.saturating_sub(ELLIPSIS.len()) {
            clipped = true;
            break;
        }
        out.push(c);
        width += w;
    }

    if clipped {
        let room = max_width - width;
        out.push_str(&ELLIPSIS[..room.min(ELLIPSIS.len())]);
        if out.contains(ESC) {
            out.push_str("\u{1b}[0m");
        }
    }
    out
}
