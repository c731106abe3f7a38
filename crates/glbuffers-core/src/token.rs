//! Format string tokenizer

use crate::dtype::DType;
use crate::{Error, Result};

/// One `(count kind)[name]` group of a format string
#[derive(Debug, Clone, PartialEq)]
pub struct FormatToken {
    pub count: usize,
    pub kind: DType,
    pub name: String,
}

impl FormatToken {
    /// `"<count><kind>"`, as shown in shape error messages
    pub fn format_code(&self) -> String {
        format!("{}{}", self.count, self.kind.code())
    }
}

/// Parse a format string into tokens
///
/// Grammar: `(count kind)[name]`, one or more repetitions. Whitespace is
/// ignored everywhere, including inside names.
pub fn parse(format: &str) -> Result<Vec<FormatToken>> {
    let src: Vec<char> = format.chars().filter(|c| !c.is_whitespace()).collect();
    if src.is_empty() {
        return Err(Error::EmptyFormat);
    }

    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < src.len() {
        if src[pos] != '(' {
            return Err(Error::InvalidFormat);
        }
        pos += 1;

        let digits_start = pos;
        while pos < src.len() && src[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start {
            return Err(Error::InvalidFormat);
        }
        let count: usize = src[digits_start..pos]
            .iter()
            .collect::<String>()
            .parse()
            .map_err(|_| Error::InvalidFormat)?;
        if count == 0 {
            return Err(Error::InvalidFormat);
        }

        let kind = src
            .get(pos)
            .and_then(|c| DType::from_code(*c))
            .ok_or(Error::InvalidFormat)?;
        pos += 1;

        if src.get(pos) != Some(&')') {
            return Err(Error::InvalidFormat);
        }
        pos += 1;

        if src.get(pos) != Some(&'[') {
            return Err(Error::InvalidFormat);
        }
        pos += 1;

        let name_start = pos;
        while pos < src.len() && src[pos] != ']' {
            pos += 1;
        }
        if pos == src.len() {
            return Err(Error::InvalidFormat);
        }
        let name: String = src[name_start..pos].iter().collect();
        pos += 1;

        if name.is_empty() {
            return Err(Error::InvalidFormat);
        }
        if !is_identifier(&name) {
            return Err(Error::InvalidName(name));
        }

        tokens.push(FormatToken { count, kind, name });
    }

    Ok(tokens)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
