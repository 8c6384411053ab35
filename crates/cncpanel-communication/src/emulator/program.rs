//! Minimal G-code reading for the emulator
//!
//! The emulator does not interpret motion. It only needs to know whether a
//! line is made of well-formed words and whether it asks the operator for
//! something (a program stop or a tool change).

/// One address word such as `G1` or `X-10.5`
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: f64,
}

/// Remove `;` line comments and `( ... )` inline comments
pub fn strip_comments(line: &str) -> String {
    let code = line.split(';').next().unwrap_or_default();
    let mut out = String::with_capacity(code.len());
    let mut depth = 0usize;
    for c in code.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Split a line into address words
///
/// Blank and comment-only lines yield no words. Words may be separated by
/// whitespace or written back to back (`G1X10Y5`).
pub fn parse_words(line: &str) -> Result<Vec<Word>, String> {
    let code = strip_comments(line);
    let mut words = Vec::new();
    let mut chars = code.chars().filter(|c| !c.is_whitespace()).peekable();

    while let Some(c) = chars.next() {
        if !c.is_ascii_alphabetic() {
            return Err(format!("unexpected '{}'", c));
        }
        let mut number = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_digit() || next == '.' || next == '-' || next == '+' {
                number.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let value = number
            .parse::<f64>()
            .map_err(|_| format!("word '{}' has no valid number", c.to_ascii_uppercase()))?;
        words.push(Word {
            letter: c.to_ascii_uppercase(),
            value,
        });
    }
    Ok(words)
}

fn has_word(words: &[Word], letter: char, value: f64) -> bool {
    words.iter().any(|w| w.letter == letter && w.value == value)
}

/// Operator message for a line that holds the program, if any
///
/// `M0` is a plain program stop; `M6` with a `T` word is a tool change.
pub fn pause_reason(words: &[Word]) -> Option<String> {
    if has_word(words, 'M', 6.0) {
        if let Some(tool) = words.iter().find(|w| w.letter == 'T') {
            return Some(format!("Please insert tool #{}", tool.value as i64));
        }
    }
    if has_word(words, 'M', 0.0) {
        return Some("Pause".to_string());
    }
    None
}

/// Check a whole program, reporting the first bad line (1-based)
pub fn check_program(lines: &[String]) -> Result<(), String> {
    for (idx, line) in lines.iter().enumerate() {
        parse_words(line).map_err(|reason| format!("line {}: {}", idx + 1, reason))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("G1 X10 ; cut"), "G1 X10 ");
        assert_eq!(strip_comments("G0 (rapid) X5"), "G0  X5");
        assert_eq!(strip_comments("(header only)"), "");
    }

    #[test]
    fn test_parse_words() {
        let words = parse_words("g1X10 Y-2.5 F300").unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words[0], Word { letter: 'G', value: 1.0 });
        assert_eq!(words[2], Word { letter: 'Y', value: -2.5 });
        assert!(parse_words("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_words("G1 X").is_err());
        assert!(parse_words("hello world").is_err());
        assert!(parse_words("12 G0").is_err());
    }

    #[test]
    fn test_pause_reason() {
        assert_eq!(
            pause_reason(&parse_words("M0").unwrap()),
            Some("Pause".to_string())
        );
        assert_eq!(
            pause_reason(&parse_words("M00 (check part)").unwrap()),
            Some("Pause".to_string())
        );
        assert_eq!(
            pause_reason(&parse_words("M6 T3").unwrap()),
            Some("Please insert tool #3".to_string())
        );
        assert_eq!(pause_reason(&parse_words("M6").unwrap()), None);
        assert_eq!(pause_reason(&parse_words("G0 X0").unwrap()), None);
    }

    #[test]
    fn test_check_program() {
        let lines = vec!["G21".to_string(), "".to_string(), "G1 X?".to_string()];
        assert_eq!(
            check_program(&lines),
            Err("line 3: word 'X' has no valid number".to_string())
        );
    }
}
