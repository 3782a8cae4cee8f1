//! Statement splitting and light normalisation
//!
//! Templates are split naively on `;`; a semicolon inside a string literal
//! or comment splits too. Each fragment has its blank lines removed, its
//! `--` line comments rewritten as block comments, and is terminated with
//! `\n;`.

/// Split `text` on `;` and format every non-empty fragment
pub fn split_and_format(text: &str) -> Vec<String> {
    text.split(';').filter_map(format_statement).collect()
}

/// Format one statement fragment; `None` when nothing but whitespace remains
pub fn format_statement(fragment: &str) -> Option<String> {
    format_fragment(fragment).map(|body| format!("{}\n;", body))
}

/// Normalise a fragment the way [`format_statement`] does, without adding
/// the `\n;` terminator.
pub fn format_fragment(fragment: &str) -> Option<String> {
    let body: Vec<&str> = fragment
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if body.is_empty() {
        return None;
    }

    let mut scanner = CommentScanner::default();
    let lines: Vec<String> = body
        .into_iter()
        .map(|line| scanner.rewrite_line(line))
        .collect();
    Some(lines.join("\n").trim().to_string())
}

/// Whether `sql` contains anything besides comments, whitespace and `;`
pub fn has_sql_content(sql: &str) -> bool {
    let mut scanner = CommentScanner::default();
    sql.lines().any(|line| scanner.line_has_code(line))
}

/// Tracks block-comment and string-literal state across lines
#[derive(Debug, Default)]
struct CommentScanner {
    in_block: bool,
    in_quote: bool,
}

impl CommentScanner {
    /// Advance over `line`, returning the byte offset of a `--` that starts
    /// a line comment, if any.
    fn find_line_comment(&mut self, line: &str) -> Option<usize> {
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let pair = (bytes[i], bytes.get(i + 1).copied());
            if self.in_block {
                if pair == (b'*', Some(b'/')) {
                    self.in_block = false;
                    i += 2;
                    continue;
                }
            } else if self.in_quote {
                if bytes[i] == b'\'' {
                    self.in_quote = false;
                }
            } else {
                match pair {
                    (b'-', Some(b'-')) => return Some(i),
                    (b'/', Some(b'*')) => {
                        self.in_block = true;
                        i += 2;
                        continue;
                    }
                    (b'\'', _) => self.in_quote = true,
                    _ => {}
                }
            }
            i += 1;
        }
        None
    }

    fn rewrite_line(&mut self, line: &str) -> String {
        match self.find_line_comment(line) {
            None => line.to_string(),
            Some(pos) => {
                let code = line[..pos].trim_end();
                let comment = line[pos + 2..].trim().replace("*/", "* /");
                if code.is_empty() {
                    format!("/* {} */", comment)
                } else {
                    format!("{} /* {} */", code, comment)
                }
            }
        }
    }

    fn line_has_code(&mut self, line: &str) -> bool {
        let bytes = line.as_bytes();
        let mut i = 0;
        let mut found = false;
        while i < bytes.len() {
            let pair = (bytes[i], bytes.get(i + 1).copied());
            if self.in_block {
                if pair == (b'*', Some(b'/')) {
                    self.in_block = false;
                    i += 1;
                }
            } else {
                match pair {
                    (b'-', Some(b'-')) if !self.in_quote => break,
                    (b'/', Some(b'*')) if !self.in_quote => {
                        self.in_block = true;
                        i += 1;
                    }
                    (b'\'', _) => {
                        self.in_quote = !self.in_quote;
                        found = true;
                    }
                    (c, _) if !c.is_ascii_whitespace() && c != b';' => found = true,
                    _ => {}
                }
            }
            i += 1;
        }
        found
    }
}
