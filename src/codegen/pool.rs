use super::writer::AsmWriter;

/// Width of a pooled float constant. Doubles back expressions, the
/// single-precision entries feed `cvtss2sd` loads of narrowed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    Double,
    Single,
}

/// Read-only literal storage. Every string and float literal in the program
/// is interned here during the pre-pass so `.rodata` can be emitted before
/// any function body, and duplicate literals share one label.
#[derive(Debug, Default)]
pub struct LiteralPool {
    strings: Vec<String>,
    floats: Vec<(String, FloatWidth)>,
    pub uses_sign_mask: bool,
}

impl LiteralPool {
    pub fn new() -> Self {
        LiteralPool::default()
    }

    /// Returns the `.STR_<n>` label for `text`, interning it on first sight.
    pub fn intern_string(&mut self, text: &str) -> String {
        let index = match self.strings.iter().position(|s| s == text) {
            Some(i) => i,
            None => {
                self.strings.push(text.to_string());
                self.strings.len() - 1
            }
        };
        format!(".STR_{}", index)
    }

    /// Returns the `.DOUBLE_<n>` or `.FLOAT_<n>` label for a float literal.
    /// Entries are keyed by the rendered value text plus width; callers
    /// pass [`float_text`] of the parsed value, so spellings that parse to
    /// the same number (`1.5`, `1.50`) share one entry.
    pub fn intern_float(&mut self, text: &str, width: FloatWidth) -> String {
        let key = (text.to_string(), width);
        let index = match self.floats.iter().position(|entry| *entry == key) {
            Some(i) => i,
            None => {
                self.floats.push(key);
                self.floats.len() - 1
            }
        };
        match width {
            FloatWidth::Double => format!(".DOUBLE_{}", index),
            FloatWidth::Single => format!(".FLOAT_{}", index),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.floats.is_empty() && !self.uses_sign_mask
    }

    /// Writes the `.rodata` section. Called once after the literal pre-pass.
    pub fn emit(&self, w: &mut AsmWriter) {
        if self.is_empty() {
            return;
        }
        w.section(".section .rodata");
        for (i, text) in self.strings.iter().enumerate() {
            w.label(&format!(".STR_{}", i));
            w.ins(&format!(".string \"{}\"", escape(text)));
        }
        for (i, (text, width)) in self.floats.iter().enumerate() {
            match width {
                FloatWidth::Double => {
                    w.label(&format!(".DOUBLE_{}", i));
                    w.ins(&format!(".double {}", text));
                }
                FloatWidth::Single => {
                    w.label(&format!(".FLOAT_{}", i));
                    w.ins(&format!(".float {}", text));
                }
            }
        }
        if self.uses_sign_mask {
            // xorpd reads a full 16-byte operand and faults on misalignment.
            w.ins(".align 16");
            w.label(".LC_SIGN_MASK");
            w.ins(".quad 0x8000000000000000");
            w.ins(".quad 0");
        }
        w.blank();
    }
}

/// Canonical text form of a float value, used as the pool key. Debug
/// formatting always keeps a decimal point or exponent, so the emitted
/// `.double` directive parses as a float.
pub fn float_text(value: f64) -> String {
    format!("{:?}", value)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_interning_dedups() {
        let mut pool = LiteralPool::new();
        assert_eq!(pool.intern_string("hello"), ".STR_0");
        assert_eq!(pool.intern_string("world"), ".STR_1");
        assert_eq!(pool.intern_string("hello"), ".STR_0");
    }

    #[test]
    fn test_float_width_labels() {
        let mut pool = LiteralPool::new();
        assert_eq!(pool.intern_float("1.5", FloatWidth::Double), ".DOUBLE_0");
        assert_eq!(pool.intern_float("1.5", FloatWidth::Single), ".FLOAT_1");
        assert_eq!(pool.intern_float("1.5", FloatWidth::Double), ".DOUBLE_0");
    }

    #[test]
    fn test_emit_rodata() {
        let mut pool = LiteralPool::new();
        pool.intern_string("hi\n");
        pool.intern_float("2.5", FloatWidth::Double);
        pool.uses_sign_mask = true;
        let mut w = AsmWriter::new();
        pool.emit(&mut w);
        let asm = w.as_str();
        assert!(asm.contains(".section .rodata"));
        assert!(asm.contains(".STR_0:\n    .string \"hi\\n\""));
        assert!(asm.contains(".DOUBLE_0:\n    .double 2.5"));
        assert!(asm.contains(".LC_SIGN_MASK:\n    .quad 0x8000000000000000"));
    }

    #[test]
    fn test_empty_pool_emits_nothing() {
        let pool = LiteralPool::new();
        let mut w = AsmWriter::new();
        pool.emit(&mut w);
        assert!(w.is_empty());
    }
}
