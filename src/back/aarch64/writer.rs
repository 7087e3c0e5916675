//! A buffered text sink for assembly output: thin enough that the emitter
//! reads as a sequence of instruction/label/directive calls instead of
//! `write!` boilerplate, with no behaviour of its own beyond string
//! accumulation (§4.I, §5's "emission concatenates per-function output").

use std::fmt;

#[derive(Default)]
pub struct AsmWriter {
    buf: String,
}

impl AsmWriter {
    pub fn new() -> Self {
        AsmWriter::default()
    }

    pub fn directive(&mut self, text: impl fmt::Display) {
        self.buf.push_str(&text.to_string());
        self.buf.push('\n');
    }

    pub fn label(&mut self, name: impl fmt::Display) {
        self.buf.push_str(&format!("{name}:\n"));
    }

    pub fn instr(&mut self, text: impl fmt::Display) {
        self.buf.push_str(&format!("    {text}\n"));
    }

    pub fn comment(&mut self, text: impl fmt::Display) {
        self.buf.push_str(&format!("    // {text}\n"));
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn append(&mut self, other: AsmWriter) {
        self.buf.push_str(&other.buf);
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
