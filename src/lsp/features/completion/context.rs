//! Context detection for code completion
//!
//! Works purely on the text around the cursor:
//! 1. Find the token under the cursor using a broad character class that also
//!    covers Elm operator characters. No token, or a token made only of operator
//!    characters, means no completion.
//! 2. Re-extract a stricter identifier token (letters, digits, `_`, `.`) and
//!    split it on the last dot into a qualifier prefix and the word being typed.
//! 3. A non-empty prefix or a capitalized word is a module-qualified request;
//!    anything else is a bare value.
//!
//! Lines starting with `import` complete module names instead.

use std::ops::Range;

use ropey::Rope;
use tower_lsp::lsp_types::Position;
use tracing::trace;

/// What kind of completion the cursor position asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// A bare lower-case identifier, e.g. `ma`
    Function { text: String },

    /// A qualified or capitalized identifier, e.g. `List.ma` or `Li`
    Module { prefix: String, text: String },

    /// The module name of an `import` clause, e.g. `import Html.At`
    Import { partial: String },
}

/// Characters Elm uses in infix operators.
const OPERATOR_CHARS: &[char] = &[
    '+', '-', '/', '*', '=', '.', '$', '<', '>', ':', '&', '|', '^', '?', '%', '#', '@', '~', '!',
];

/// Identifier characters plus operator characters.
pub fn is_word_char(c: char) -> bool {
    is_identifier_char(c) || OPERATOR_CHARS.contains(&c)
}

/// Letters, digits, `_` and `.` (for qualified names).
pub fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Character range of the run of `is_word` characters touching `column`.
///
/// The cursor may sit right after the last character of the word.
pub fn word_range_at(line: &str, column: usize, is_word: impl Fn(char) -> bool) -> Option<Range<usize>> {
    let chars: Vec<char> = line.chars().collect();
    if column > chars.len() {
        return None;
    }

    let mut start = column;
    while start > 0 && is_word(chars[start - 1]) {
        start -= 1;
    }
    let mut end = column;
    while end < chars.len() && is_word(chars[end]) {
        end += 1;
    }

    (start < end).then_some(start..end)
}

fn slice_chars(line: &str, range: Range<usize>) -> String {
    line.chars().skip(range.start).take(range.end - range.start).collect()
}

/// Splits `token` on its last dot into `(prefix, word)`.
pub fn split_qualified(token: &str) -> (&str, &str) {
    match token.rfind('.') {
        Some(idx) => (&token[..idx], &token[idx + 1..]),
        None => ("", token),
    }
}

/// Classifies an identifier token (see module docs).
pub fn classify(token: &str) -> CompletionContext {
    let (prefix, word) = split_qualified(token);
    let capitalized = word.chars().next().is_some_and(char::is_uppercase);

    if !prefix.is_empty() || capitalized {
        CompletionContext::Module {
            prefix: prefix.to_string(),
            text: word.to_string(),
        }
    } else {
        CompletionContext::Function { text: word.to_string() }
    }
}

/// Text of `line` without its line ending, and the cursor's char column.
///
/// LSP columns count UTF-16 code units; the rope converts them to chars.
fn line_and_column(text: &Rope, position: &Position) -> Option<(String, usize)> {
    let slice = text.get_line(position.line as usize)?;
    let utf16_column = position.character as usize;
    if utf16_column > slice.len_utf16_cu() {
        return None;
    }
    let column = slice.utf16_cu_to_char(utf16_column);

    let mut line = slice.to_string();
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Some((line, column))
}

/// Determines the completion context at `position`, or `None` when no
/// completion should be offered.
pub fn determine_context(text: &Rope, position: &Position) -> Option<CompletionContext> {
    let (line, column) = line_and_column(text, position)?;

    let broad = word_range_at(&line, column, is_word_char)?;
    let broad_token = slice_chars(&line, broad);
    if !broad_token.chars().any(|c| c.is_alphanumeric() || c == '_') {
        trace!("Cursor is inside operator {:?}", broad_token);
        return None;
    }

    // Cursor right after an operator glued to a name (`a+`): still mid-operator.
    let Some(token) = word_range_at(&line, column, is_identifier_char).map(|range| slice_chars(&line, range))
    else {
        trace!("No identifier at cursor in {:?}", broad_token);
        return None;
    };

    if let Some(rest) = line.strip_prefix("import") {
        let keyword_end = "import".len();
        let in_module_name = rest.starts_with(char::is_whitespace)
            && column > keyword_end
            && !rest.trim_start().contains(char::is_whitespace);
        if in_module_name {
            return Some(CompletionContext::Import { partial: token });
        }
    }

    Some(classify(&token))
}
