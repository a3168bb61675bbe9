use std::fmt::Write as _;

/// Append-only sink for one stream of GNU-assembler text. The writer never
/// interprets what it is given; ordering is the caller's responsibility.
#[derive(Debug, Default)]
pub struct AsmWriter {
    buf: String,
}

impl AsmWriter {
    pub fn new() -> Self {
        AsmWriter { buf: String::new() }
    }

    /// A raw line at column zero (directives, blank separators).
    pub fn raw(&mut self, line: &str) {
        self.buf.push_str(line);
        self.buf.push('\n');
    }

    /// An indented instruction line.
    pub fn ins(&mut self, instruction: &str) {
        self.buf.push_str("    ");
        self.buf.push_str(instruction);
        self.buf.push('\n');
    }

    pub fn label(&mut self, name: &str) {
        let _ = writeln!(self.buf, "{}:", name);
    }

    pub fn comment(&mut self, text: &str) {
        let _ = writeln!(self.buf, "    # {}", text);
    }

    pub fn section(&mut self, name: &str) {
        self.buf.push_str("    ");
        self.buf.push_str(name);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buf)
    }

    pub fn append(&mut self, other: &AsmWriter) {
        self.buf.push_str(&other.buf);
    }
}
