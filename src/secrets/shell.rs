//! POSIX shell quoting for environment assignments

/// Whether `key` is a portable environment variable name
pub fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Quote `value` so a POSIX shell reads it back verbatim
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Whether `text` ends inside a single- or double-quoted string, meaning a
/// shell would keep reading the next line into the same word
pub fn has_open_quote(text: &str) -> bool {
    let mut chars = text.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match (quote, c) {
            (None, '\\') | (Some('"'), '\\') => {
                chars.next();
            }
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            _ => {}
        }
    }

    quote.is_some()
}

/// Undo shell quoting of a single word: single quotes, double quotes and
/// backslash escapes, concatenated in any order.
pub fn shell_unquote(word: &str) -> Result<String, String> {
    let mut out = String::with_capacity(word.len());
    let mut chars = word.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => loop {
                match chars.next() {
                    Some('\'') => break,
                    Some(c) => out.push(c),
                    None => return Err("unterminated single quote".to_string()),
                }
            },
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(c @ ('"' | '\\' | '$' | '`')) => out.push(c),
                        Some('\n') => {}
                        Some(c) => {
                            out.push('\\');
                            out.push(c);
                        }
                        None => return Err("unterminated double quote".to_string()),
                    },
                    Some(c) => out.push(c),
                    None => return Err("unterminated double quote".to_string()),
                }
            },
            '\\' => match chars.next() {
                Some(c) => out.push(c),
                None => return Err("trailing backslash".to_string()),
            },
            c if c.is_whitespace() => return Err("unquoted whitespace".to_string()),
            c => out.push(c),
        }
    }

    Ok(out)
}
