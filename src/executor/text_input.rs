// Text entry encoding for `adb shell input text`.
// Printable ASCII goes through `input text`; anything else needs the
// ADBKeyBoard IME broadcast, which takes base64 so no shell quoting applies.

/// Returns true if `input text` can type this string.
pub fn is_plain_ascii(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii() && !c.is_ascii_control())
}

/// Escape for `adb shell input text <arg>`: spaces become `%s` and shell
/// metacharacters are backslash-escaped.
pub fn escape_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c {
            ' ' => out.push_str("%s"),
            '%' => out.push_str("\\%"),
            '\\' | '"' | '\'' | '`' | '$' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '*'
            | '?' | '~' | '#' | '!' | '[' | ']' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
