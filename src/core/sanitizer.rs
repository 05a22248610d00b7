// src/core/sanitizer.rs — Normalize model-generated code and extract JSON payloads
//
// Model output is unreliable in exactly two ways this module repairs:
// fencing/prose wrapped around code, and whitespace. Indentation is
// re-derived structurally from bracket depth and block-opening keywords
// instead of trusting whatever the model emitted. JSON extraction is
// total: it never panics and never raises past its boundary.

use serde_json::Value;

use crate::infra::errors::JsonExtractError;

const INDENT: &str = "    ";

/// Normalize raw model output into executable source.
///
/// Strips fence markers (with an optional language tag), maps smart
/// punctuation to ASCII, and re-indents the code structurally. Comment
/// lines are preserved verbatim. Idempotent.
pub fn sanitize_code(text: &str) -> String {
    let stripped = strip_fences(text);
    let ascii = normalize_punctuation(&stripped);
    reindent(&ascii)
}

/// Remove leading/trailing triple-fence markers and an optional language
/// tag on the opening fence.
fn strip_fences(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();

    while let Some(first) = lines.first() {
        let t = first.trim();
        if t.is_empty() {
            lines.remove(0);
        } else if t.starts_with("```") {
            // Opening fence, possibly "```python"
            lines.remove(0);
            break;
        } else {
            break;
        }
    }

    while let Some(last) = lines.last() {
        let t = last.trim();
        if t.is_empty() {
            lines.pop();
        } else if t == "```" {
            lines.pop();
            break;
        } else {
            break;
        }
    }

    lines.join("\n")
}

/// Map "smart" quotes and punctuation to their ASCII equivalents.
fn normalize_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2015}' => '-',
            '\u{2026}' => '.', // ellipsis collapses; better than a non-ASCII token
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect()
}

/// Keywords that sit one level shallower than the block they follow.
fn is_dedent_keyword(code: &str) -> bool {
    ["else", "elif", "except", "finally"]
        .iter()
        .any(|kw| code == *kw || code.starts_with(&format!("{kw} ")) || code.starts_with(&format!("{kw}:")))
}

/// Statements that terminate a block; the next statement is assumed to
/// dedent one level.
fn is_block_exit(code: &str) -> bool {
    ["return", "pass", "break", "continue", "raise"]
        .iter()
        .any(|kw| code == *kw || code.starts_with(&format!("{kw} ")) || code.starts_with(&format!("{kw}(")))
}

/// Split a code line into its code part and net bracket delta, honoring
/// string literals and trailing comments.
fn scan_line(line: &str) -> (String, i32) {
    let mut code = String::new();
    let mut delta = 0i32;
    let mut in_str: Option<char> = None;
    let mut escaped = false;

    for c in line.chars() {
        if let Some(q) = in_str {
            code.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                in_str = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                in_str = Some(c);
                code.push(c);
            }
            '#' => break, // trailing comment: not part of the code
            '(' | '[' | '{' => {
                delta += 1;
                code.push(c);
            }
            ')' | ']' | '}' => {
                delta -= 1;
                code.push(c);
            }
            other => code.push(other),
        }
    }

    (code.trim_end().to_string(), delta)
}

/// Re-derive indentation from structure. The model's own leading
/// whitespace is discarded entirely.
fn reindent(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let mut bracket: i32 = 0;

    for raw in text.lines() {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }
        if trimmed.starts_with('#') {
            // Comment lines pass through verbatim.
            out.push(raw.trim_end().to_string());
            continue;
        }

        let (code, delta) = scan_line(trimmed);

        if bracket > 0 {
            // Continuation inside an open bracket: one extra level,
            // except for lines that only close brackets.
            let closer_only = code.chars().all(|c| matches!(c, ')' | ']' | '}' | ',' | ' '));
            let level = if closer_only { depth } else { depth + 1 };
            out.push(format!("{}{}", INDENT.repeat(level), trimmed));
            bracket = (bracket + delta).max(0);
            continue;
        }

        let mut level = depth;
        if is_dedent_keyword(&code) && depth > 0 {
            depth -= 1;
            level = depth;
        }

        out.push(format!("{}{}", INDENT.repeat(level), trimmed));

        bracket = (bracket + delta).max(0);
        if bracket == 0 {
            if code.ends_with(':') {
                depth += 1;
            } else if is_block_exit(&code) && depth > 0 {
                depth -= 1;
            }
        }
    }

    out.join("\n")
}

/// Extract a JSON value from free-form model text.
///
/// Tries a direct parse of the whole (trimmed) text first, then scans for
/// the first balanced `{...}` span and parses that, advancing to the next
/// opening brace on a failed candidate. Total: never panics, returns a
/// typed failure instead.
pub fn extract_json(text: &str) -> Result<Value, JsonExtractError> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        if v.is_object() || v.is_array() {
            return Ok(v);
        }
    }

    let mut last_err: Option<String> = None;
    let bytes: Vec<char> = trimmed.chars().collect();
    let mut start = 0usize;

    while let Some(open) = find_char(&bytes, start, '{') {
        if let Some(end) = balanced_end(&bytes, open) {
            let candidate: String = bytes[open..=end].iter().collect();
            match serde_json::from_str::<Value>(&candidate) {
                Ok(v) => return Ok(v),
                Err(e) => last_err = Some(e.to_string()),
            }
        }
        start = open + 1;
    }

    match last_err {
        Some(e) => Err(JsonExtractError::Malformed(e)),
        None => Err(JsonExtractError::NotFound),
    }
}

fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars[from..].iter().position(|&c| c == target).map(|i| from + i)
}

/// Index of the closing brace balancing `chars[open]`, honoring strings.
fn balanced_end(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_str = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate().skip(open) {
        if in_str {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_str = false;
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ─── sanitize_code ──────────────────────────────────────────

    #[test]
    fn test_strip_fence_with_language_tag() {
        assert_eq!(sanitize_code("```python\nx = 1\n```"), "x = 1");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(sanitize_code("```\nx = 1\n```"), "x = 1");
    }

    #[test]
    fn test_unfenced_passthrough() {
        assert_eq!(sanitize_code("x = 1"), "x = 1");
    }

    #[test]
    fn test_smart_quotes_normalized() {
        let out = sanitize_code("name = \u{201C}desk\u{201D}\nc = \u{2018}a\u{2019}");
        assert_eq!(out, "name = \"desk\"\nc = 'a'");
    }

    #[test]
    fn test_reindent_block() {
        let messy = "def make():\nx = 1\nif x:\ny = 2\nreturn y";
        let out = sanitize_code(messy);
        assert_eq!(
            out,
            "def make():\n    x = 1\n    if x:\n        y = 2\n        return y"
        );
    }

    #[test]
    fn test_reindent_else_dedents() {
        let messy = "if a:\nb = 1\nelse:\nb = 2";
        let out = sanitize_code(messy);
        assert_eq!(out, "if a:\n    b = 1\nelse:\n    b = 2");
    }

    #[test]
    fn test_reindent_ignores_model_whitespace() {
        let messy = "        def f():\n                return 1";
        assert_eq!(sanitize_code(messy), "def f():\n    return 1");
    }

    #[test]
    fn test_colon_in_string_does_not_open_block() {
        let code = "label = \"a: b\"\nx = 1";
        assert_eq!(sanitize_code(code), "label = \"a: b\"\nx = 1");
    }

    #[test]
    fn test_bracket_continuation_indents() {
        let code = "verts = [\n(0, 0, 0),\n(1, 1, 1),\n]";
        let out = sanitize_code(code);
        assert_eq!(out, "verts = [\n    (0, 0, 0),\n    (1, 1, 1),\n]");
    }

    #[test]
    fn test_comment_lines_preserved_verbatim() {
        let code = "def f():\n  # keep   my   spacing\nreturn 1";
        let out = sanitize_code(code);
        assert!(out.contains("  # keep   my   spacing"));
    }

    #[test]
    fn test_sanitize_idempotent() {
        let inputs = [
            "```python\ndef make():\nx = 1\nif x:\nreturn x\n```",
            "verts = [\n(0,0,0),\n]",
            "if a:\nb = 1\nelse:\nb = 2",
            "plain = True",
        ];
        for input in inputs {
            let once = sanitize_code(input);
            assert_eq!(sanitize_code(&once), once, "not idempotent for {input:?}");
        }
    }

    // ─── extract_json ───────────────────────────────────────────

    #[test]
    fn test_extract_direct() {
        let v = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_extract_embedded_in_prose() {
        let v = extract_json(
            "Sure! Here is the evaluation:\n{\"status\": \"PASS\", \"score\": 7}\nLet me know.",
        )
        .unwrap();
        assert_eq!(v["status"], "PASS");
    }

    #[test]
    fn test_extract_fenced_json() {
        let v = extract_json("```json\n{\"objects\": []}\n```").unwrap();
        assert!(v["objects"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_extract_nested_braces() {
        let v = extract_json(r#"noise {"a": {"b": {"c": 3}}} trailing"#).unwrap();
        assert_eq!(v["a"]["b"]["c"], 3);
    }

    #[test]
    fn test_extract_brace_inside_string() {
        let v = extract_json(r#"{"note": "curly } inside", "n": 2}"#).unwrap();
        assert_eq!(v["n"], 2);
    }

    #[test]
    fn test_extract_skips_bad_candidate() {
        let v = extract_json("{not json} but then {\"ok\": true}").unwrap();
        assert_eq!(v["ok"], true);
    }

    #[test]
    fn test_extract_total_on_garbage() {
        assert_eq!(extract_json("no braces here"), Err(JsonExtractError::NotFound));
        assert!(matches!(
            extract_json("{{{{"),
            Err(JsonExtractError::NotFound) | Err(JsonExtractError::Malformed(_))
        ));
        assert!(extract_json("").is_err());
    }

    #[test]
    fn test_extract_array_direct() {
        let v = extract_json("[1, 2, 3]").unwrap();
        assert_eq!(v.as_array().unwrap().len(), 3);
    }
}
