//! Turning one persona record into one training example: prompt choice,
//! profile rendering, and the instruct wrapper around both.

pub mod format;
pub mod profile;
pub mod prompt;
pub mod sampler;

/// Replace underscores with spaces ("never_married" -> "never married").
pub fn humanize(value: &str) -> String {
    value.replace('_', " ")
}

/// Title-case a string the way Python's `str.title` does: a cased character
/// following an uncased one takes its titlecase form, every other cased
/// character is lower-cased.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_cased = false;
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if prev_cased {
            if ch == 'Σ' && !chars.peek().map_or(false, |&next| is_cased(next)) {
                out.push('ς');
            } else {
                out.extend(ch.to_lowercase());
            }
        } else {
            push_titlecase(&mut out, ch);
        }
        prev_cased = is_cased(ch);
    }
    out
}

/// Unicode `Cased`: upper, lower, or titlecase.
fn is_cased(ch: char) -> bool {
    ch.is_uppercase() || ch.is_lowercase() || is_titlecase(ch)
}

/// General category Lt.
fn is_titlecase(ch: char) -> bool {
    matches!(
        ch,
        '\u{01C5}' | '\u{01C8}' | '\u{01CB}' | '\u{01F2}'
            | '\u{1F88}'..='\u{1F8F}'
            | '\u{1F98}'..='\u{1F9F}'
            | '\u{1FA8}'..='\u{1FAF}'
            | '\u{1FBC}' | '\u{1FCC}' | '\u{1FFC}'
    )
}

/// Push the titlecase mapping of `ch`. Falls back to the uppercase mapping,
/// which is identical outside the characters listed here.
fn push_titlecase(out: &mut String, ch: char) {
    let mapped = match ch {
        '\u{01C4}'..='\u{01C6}' => '\u{01C5}',
        '\u{01C7}'..='\u{01C9}' => '\u{01C8}',
        '\u{01CA}'..='\u{01CC}' => '\u{01CB}',
        '\u{01F1}'..='\u{01F3}' => '\u{01F2}',
        '\u{1F80}'..='\u{1F87}' | '\u{1F90}'..='\u{1F97}' | '\u{1FA0}'..='\u{1FA7}' => {
            char::from_u32(ch as u32 + 8).unwrap_or(ch)
        }
        '\u{1FB3}' => '\u{1FBC}',
        '\u{1FC3}' => '\u{1FCC}',
        '\u{1FF3}' => '\u{1FFC}',
        'ß' => return out.push_str("Ss"),
        'ﬀ' => return out.push_str("Ff"),
        'ﬁ' => return out.push_str("Fi"),
        'ﬂ' => return out.push_str("Fl"),
        'ﬃ' => return out.push_str("Ffi"),
        'ﬄ' => return out.push_str("Ffl"),
        'ﬅ' | 'ﬆ' => return out.push_str("St"),
        _ if is_titlecase(ch) => ch,
        _ => return out.extend(ch.to_uppercase()),
    };
    out.push(mapped);
}
