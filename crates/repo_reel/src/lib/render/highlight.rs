use super::style::{editor, Rgba};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "def", "default",
    "defer", "do", "elif", "else", "enum", "except", "export", "extends", "false", "finally", "fn",
    "for", "from", "func", "function", "go", "if", "impl", "import", "in", "interface", "let",
    "match", "mod", "module", "mut", "new", "nil", "None", "null", "package", "pass", "pub",
    "public", "private", "raise", "return", "self", "static", "struct", "super", "switch", "this",
    "throw", "trait", "true", "True", "False", "try", "type", "use", "var", "void", "where", "while",
    "with", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    String,
    Comment,
    Number,
    Plain,
}

impl TokenKind {
    pub fn color(self) -> Rgba {
        match self {
            TokenKind::Keyword => editor::KEYWORD,
            TokenKind::String => editor::STRING,
            TokenKind::Comment => editor::COMMENT,
            TokenKind::Number => editor::NUMBER,
            TokenKind::Plain => editor::PLAIN,
        }
    }
}

fn line_comment(language: &str) -> &'static [&'static str] {
    match language.to_ascii_lowercase().as_str() {
        "python" | "ruby" | "shell" | "bash" | "yaml" | "toml" | "r" | "perl" | "elixir" => &["#"],
        "sql" | "lua" | "haskell" => &["--"],
        "php" => &["//", "#"],
        _ => &["//"],
    }
}

fn is_ident(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Splits one source line into coloured tokens. Purely lexical: no state is
/// carried between lines, so a block comment only colours the line it opens on.
pub fn highlight_line(line: &str, language: &str) -> Vec<(TokenKind, String)> {
    let comments = line_comment(language);
    let chars = line.char_indices().collect::<Vec<_>>();
    let mut tokens: Vec<(TokenKind, String)> = Vec::new();
    let mut push = |kind: TokenKind, text: &str| match tokens.last_mut() {
        Some((last, buf)) if *last == kind && kind == TokenKind::Plain => buf.push_str(text),
        _ => tokens.push((kind, text.to_string())),
    };

    let mut i = 0;
    while i < chars.len() {
        let (start, ch) = chars[i];
        let rest = &line[start..];

        if comments.iter().any(|c| rest.starts_with(c)) || rest.starts_with("/*") {
            push(TokenKind::Comment, rest);
            break;
        }

        if matches!(ch, '"' | '\'' | '`') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1 != ch {
                if chars[j].1 == '\\' {
                    j += 1;
                }
                j += 1;
            }
            let end = chars.get(j + 1).map(|(b, _)| *b).unwrap_or(line.len());
            push(TokenKind::String, &line[start..end]);
            i = j + 1;
            continue;
        }

        if ch.is_ascii_digit() {
            let mut j = i;
            while j < chars.len() && (is_ident(chars[j].1) || chars[j].1 == '.') {
                j += 1;
            }
            let end = chars.get(j).map(|(b, _)| *b).unwrap_or(line.len());
            push(TokenKind::Number, &line[start..end]);
            i = j;
            continue;
        }

        if is_ident(ch) {
            let mut j = i;
            while j < chars.len() && is_ident(chars[j].1) {
                j += 1;
            }
            let end = chars.get(j).map(|(b, _)| *b).unwrap_or(line.len());
            let word = &line[start..end];
            let kind = if KEYWORDS.contains(&word) {
                TokenKind::Keyword
            } else {
                TokenKind::Plain
            };
            push(kind, word);
            i = j;
            continue;
        }

        push(TokenKind::Plain, &line[start..start + ch.len_utf8()]);
        i += 1;
    }

    tokens
}
