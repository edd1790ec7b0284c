/// Greedy word wrap against a measured width.
///
/// Words are added to the current line while it still fits; a word that is
/// wider than `max_width` on its own is broken by character.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if measure(word) <= max_width {
            current = word.to_string();
            continue;
        }

        for ch in word.chars() {
            current.push(ch);
            if measure(&current) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::replace(&mut current, ch.to_string()));
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Shortens `text` to fit `max_width`, ending it with an ellipsis
pub fn truncate(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> String {
    if measure(text) <= max_width {
        return text.to_string();
    }
    let mut out = text.to_string();
    while !out.is_empty() {
        out.pop();
        let candidate = format!("{}…", out.trim_end());
        if measure(&candidate) <= max_width {
            return candidate;
        }
    }
    "…".to_string()
}

/// Wraps and then cuts to `max_lines`, ellipsizing the last kept line
pub fn wrap_lines(
    text: &str,
    max_width: f32,
    max_lines: usize,
    measure: impl Fn(&str) -> f32,
) -> Vec<String> {
    let mut lines = wrap_text(text, max_width, &measure);
    if lines.len() > max_lines && max_lines > 0 {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = truncate(&format!("{last}…"), max_width, &measure);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn test_wrap_is_greedy() {
        let lines = wrap_text("the quick brown fox jumps over", 10.0, chars);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over"]);
    }

    #[test]
    fn test_wrap_breaks_overlong_words() {
        let lines = wrap_text("see abcdefghijkl end", 5.0, chars);
        assert_eq!(lines, vec!["see", "abcde", "fghij", "kl", "end"]);
        assert!(lines.iter().all(|l| chars(l) <= 5.0));
    }

    #[test]
    fn test_wrap_empty_and_whitespace() {
        assert!(wrap_text("", 10.0, chars).is_empty());
        assert!(wrap_text("  \n\t ", 10.0, chars).is_empty());
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10.0, chars), "short");
        assert_eq!(truncate("a much longer title", 8.0, chars), "a much…");
    }

    #[test]
    fn test_wrap_lines_caps_line_count() {
        let lines = wrap_lines("one two three four five six", 9.0, 2, chars);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "one two");
        assert!(lines[1].ends_with('…'));
        assert!(chars(&lines[1]) <= 9.0);
    }
}
