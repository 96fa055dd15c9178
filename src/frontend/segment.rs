// Purpose: Split raw JSC text into logical statements for the module parser.
// Inputs/Outputs: Takes whole-file text and returns statements in source order.
// Invariants: Comment text and comment delimiters never reach an output statement.
// Gotchas: Block comments and brace depth persist across physical lines; quote state does not.

/// Splits `text` into logical statements.
///
/// A statement ends at a top-level `;`, or at the start of a new physical line
/// once every brace opened by the pending text has been closed. The final
/// buffer is always flushed, so the last element may be blank.
pub fn segment(text: &str) -> Vec<String> {
    let mut seg = Segmenter::default();
    for line in text.lines() {
        seg.feed_line(line);
    }
    seg.finish()
}

#[derive(Default)]
struct Segmenter {
    statements: Vec<String>,
    buffer: String,
    in_block_comment: bool,
    depth: usize,
}

impl Segmenter {
    fn feed_line(&mut self, line: &str) {
        if !self.buffer.is_empty() {
            if !self.in_block_comment && self.depth == 0 {
                self.flush();
            } else {
                self.buffer.push('\n');
            }
        }

        let chars: Vec<char> = line.chars().collect();
        // `\"` pairs delimit an escaped-quote region; plain `"` pairs are string literals.
        let mut in_escaped_quote = false;
        let mut in_string = false;
        let mut i = 0;
        while let Some(&c) = chars.get(i) {
            let next = chars.get(i + 1).copied();

            if self.in_block_comment {
                if c == '*' && next == Some('/') {
                    self.in_block_comment = false;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if in_string {
                self.buffer.push(c);
                if c == '\\' {
                    if let Some(n) = next {
                        self.buffer.push(n);
                        i += 2;
                        continue;
                    }
                } else if c == '"' {
                    in_string = false;
                }
                i += 1;
                continue;
            }

            if c == '\\' && next == Some('"') {
                in_escaped_quote = !in_escaped_quote;
                self.buffer.push_str("\\\"");
                i += 2;
                continue;
            }

            if !in_escaped_quote {
                if c == '/' && next == Some('/') {
                    break;
                }
                if c == '/' && next == Some('*') {
                    self.in_block_comment = true;
                    i += 2;
                    continue;
                }
                if c == '"' {
                    in_string = true;
                    self.buffer.push(c);
                    i += 1;
                    continue;
                }
                if c == '\'' {
                    i = self.copy_char_literal(&chars, i);
                    continue;
                }
                match c {
                    '{' => self.depth += 1,
                    '}' => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
            }

            self.buffer.push(c);
            if c == ';' && self.depth == 0 && !in_escaped_quote {
                self.flush();
            }
            i += 1;
        }
    }

    /// Copies a `'x'` literal verbatim and returns the index after it. A lone
    /// quote with no closing partner on the line is copied as a single char.
    fn copy_char_literal(&mut self, chars: &[char], start: usize) -> usize {
        let mut j = start + 1;
        while let Some(&c) = chars.get(j) {
            match c {
                '\\' => j += 2,
                '\'' => {
                    self.buffer.extend(chars.iter().take(j + 1).skip(start));
                    return j + 1;
                }
                _ => j += 1,
            }
        }
        self.buffer.push('\'');
        start + 1
    }

    fn flush(&mut self) {
        self.statements.push(std::mem::take(&mut self.buffer));
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.statements
    }
}
