//! Best-effort parsing of incomplete JSON while a response streams in.

use serde_json::Value;

/// Close an unfinished JSON prefix and parse it.
///
/// Returns `None` when nothing sensible can be recovered yet.
pub fn complete(prefix: &str) -> Option<Value> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    let scan = Scan::new(trimmed);

    let mut candidate = trimmed.to_string();
    if scan.in_string {
        if scan.escaped {
            candidate.pop();
        }
        candidate.push('"');
    }
    let tail = candidate.trim_end();
    if let Some(stripped) = tail.strip_suffix(',') {
        candidate = stripped.to_string();
    } else if tail.ends_with(':') {
        candidate = format!("{} null", tail);
    }
    candidate.extend(scan.closers());
    if let Ok(value) = serde_json::from_str(&candidate) {
        return Some(value);
    }

    // Drop the unfinished trailing member and close what remains.
    let cut = scan.last_comma?;
    let truncated = &trimmed[..cut];
    let mut fallback = truncated.to_string();
    fallback.extend(Scan::new(truncated).closers());
    serde_json::from_str(&fallback).ok()
}

struct Scan {
    stack: Vec<char>,
    in_string: bool,
    escaped: bool,
    last_comma: Option<usize>,
}

impl Scan {
    fn new(text: &str) -> Self {
        let mut scan = Scan {
            stack: Vec::new(),
            in_string: false,
            escaped: false,
            last_comma: None,
        };

        for (i, c) in text.char_indices() {
            if scan.in_string {
                if scan.escaped {
                    scan.escaped = false;
                } else if c == '\\' {
                    scan.escaped = true;
                } else if c == '"' {
                    scan.in_string = false;
                }
                continue;
            }
            match c {
                '"' => scan.in_string = true,
                '{' | '[' => scan.stack.push(c),
                '}' | ']' => {
                    scan.stack.pop();
                }
                ',' => scan.last_comma = Some(i),
                _ => {}
            }
        }
        scan
    }

    fn closers(&self) -> impl Iterator<Item = char> + '_ {
        self.stack
            .iter()
            .rev()
            .map(|open| if *open == '{' { '}' } else { ']' })
    }
}
