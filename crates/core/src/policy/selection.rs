//! Numeric selection parsing for option lists.

/// Converts Persian (U+06F0..U+06F9) and Arabic-Indic (U+0660..U+0669) digits
/// to their ASCII equivalents, leaving everything else untouched.
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|character| match character {
            '\u{06F0}'..='\u{06F9}' => {
                char::from(b'0' + (character as u32 - 0x06F0) as u8)
            }
            '\u{0660}'..='\u{0669}' => {
                char::from(b'0' + (character as u32 - 0x0660) as u8)
            }
            _ => character,
        })
        .collect()
}

/// Outcome of resolving a user reply against a presented option list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Valid 1-based choice, returned as a zero-based index.
    Chosen(usize),
    /// A numeral was found but falls outside `[1, option_count]`.
    OutOfRange(i64),
    /// No numeral in the reply.
    NoNumeral,
}

/// Parses the first integer in the normalized text as a 1-based selection.
pub fn parse_selection(text: &str, option_count: usize) -> SelectionOutcome {
    let normalized = normalize_digits(text);
    let mut digits = String::new();
    for character in normalized.chars() {
        if character.is_ascii_digit() {
            digits.push(character);
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        return SelectionOutcome::NoNumeral;
    }
    let Ok(number) = digits.parse::<i64>() else {
        return SelectionOutcome::NoNumeral;
    };
    if number < 1 || number > option_count as i64 {
        return SelectionOutcome::OutOfRange(number);
    }
    SelectionOutcome::Chosen((number - 1) as usize)
}
