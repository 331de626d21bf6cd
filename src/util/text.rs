use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

const ESC: char = '\u{1b}';
const BEL: char = '\u{07}';

/// Removes terminal control characters from feed-supplied text.
///
/// Feed titles end up on a terminal in text output, so anything that could
/// drive it is dropped:
///
/// - ANSI CSI sequences (`ESC [ ... final`) and OSC sequences
///   (`ESC ] ... BEL` or `ESC ] ... ESC \`) are removed whole
/// - A lone `ESC` is removed along with the character after it
/// - Other C0 controls, `DEL` and C1 controls are removed
///
/// Tab, newline and carriage return are kept. Clean input is returned
/// borrowed.
///
/// # Examples
///
/// ```
/// use freshfeed::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("plain"), "plain");
/// assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            skip_escape_sequence(&mut chars);
        } else if !is_stripped(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

fn is_stripped(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Consumes the remainder of an escape sequence whose `ESC` was already read.
fn skip_escape_sequence(chars: &mut Peekable<Chars<'_>>) {
    match chars.next() {
        Some('[') => {
            // CSI: parameter and intermediate bytes up to a final byte in @..~
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
        Some(']') => {
            // OSC: terminated by BEL or ST (ESC \)
            while let Some(c) = chars.next() {
                if c == BEL {
                    break;
                }
                if c == ESC && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        _ => {}
    }
}
