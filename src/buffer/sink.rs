//! Output sinks for classified disassembly text.
//!
//! A [`Sink`] receives the committed operations of an [`crate::EncodeBuffer`]. Two sinks ship
//! with the crate: [`TextSink`] renders plain text into any [`std::io::Write`], and
//! [`Transcript`] records every line together with its classification.

use std::io::Write;

use bitflags::bitflags;
use strum::{EnumCount, EnumIter};

use crate::Result;

/// Semantic classification of a piece of output.
///
/// Renderers use the kind to colorize or filter text; the disassembler never interprets it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    EnumCount,
    strum::Display,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum OutputKind {
    /// Unclassified text such as separators
    Plain,
    /// Immediate values and resolved constants
    Value,
    /// Annotations, e.g. symbol names next to an index
    Comment,
    /// Mnemonics
    Keyword,
    /// Punctuation between operands
    Operator,
    /// Addresses and branch targets
    Label,
    /// Unknown bytes and decode failures
    Error,
}

bitflags! {
    #[derive(PartialEq, Clone, Copy, Debug)]
    /// Output classifications accepted by a [`TextSink`]
    pub struct Channels: u8 {
        /// Accept [`OutputKind::Plain`]
        const PLAIN = 0x01;
        /// Accept [`OutputKind::Value`]
        const VALUE = 0x02;
        /// Accept [`OutputKind::Comment`]
        const COMMENT = 0x04;
        /// Accept [`OutputKind::Keyword`]
        const KEYWORD = 0x08;
        /// Accept [`OutputKind::Operator`]
        const OPERATOR = 0x10;
        /// Accept [`OutputKind::Label`]
        const LABEL = 0x20;
        /// Accept [`OutputKind::Error`]
        const ERROR = 0x40;
    }
}

impl Channels {
    /// The channel flag matching `kind`
    #[must_use]
    pub fn of(kind: OutputKind) -> Channels {
        match kind {
            OutputKind::Plain => Channels::PLAIN,
            OutputKind::Value => Channels::VALUE,
            OutputKind::Comment => Channels::COMMENT,
            OutputKind::Keyword => Channels::KEYWORD,
            OutputKind::Operator => Channels::OPERATOR,
            OutputKind::Label => Channels::LABEL,
            OutputKind::Error => Channels::ERROR,
        }
    }

    /// Returns `true` if output of `kind` passes this filter
    #[must_use]
    pub fn accepts(self, kind: OutputKind) -> bool {
        self.contains(Channels::of(kind))
    }
}

impl Default for Channels {
    fn default() -> Self {
        Channels::all()
    }
}

/// The real destination of committed output.
pub trait Sink {
    /// Emits `text` classified as `kind` on the current line.
    ///
    /// # Errors
    /// Propagates failures of the underlying writer.
    fn print(&mut self, kind: OutputKind, text: &str) -> Result<()>;

    /// Terminates the current line.
    ///
    /// # Errors
    /// Propagates failures of the underlying writer.
    fn newline(&mut self) -> Result<()>;

    /// Increases the indentation of the following lines by one level.
    fn indent(&mut self);

    /// Decreases the indentation of the following lines by one level; saturates at zero.
    fn unindent(&mut self);
}

/// Renders output as plain text, one indentation step per level.
pub struct TextSink<W: Write> {
    writer: W,
    channels: Channels,
    indent_width: usize,
    level: usize,
    line_start: bool,
}

impl<W: Write> TextSink<W> {
    /// Renders every channel with an indentation width of four spaces.
    pub fn new(writer: W) -> TextSink<W> {
        TextSink {
            writer,
            channels: Channels::default(),
            indent_width: 4,
            level: 0,
            line_start: true,
        }
    }

    /// Restricts rendering to `channels`. Line structure is kept for filtered lines.
    #[must_use]
    pub fn with_channels(mut self, channels: Channels) -> TextSink<W> {
        self.channels = channels;
        self
    }

    /// Sets the number of spaces emitted per indentation level.
    #[must_use]
    pub fn with_indent_width(mut self, width: usize) -> TextSink<W> {
        self.indent_width = width;
        self
    }

    /// Current indentation level
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Flushes and returns the underlying writer.
    ///
    /// # Errors
    /// Propagates flush failures.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> Sink for TextSink<W> {
    fn print(&mut self, kind: OutputKind, text: &str) -> Result<()> {
        if text.is_empty() || !self.channels.accepts(kind) {
            return Ok(());
        }

        if self.line_start {
            let padding = self.level * self.indent_width;
            write!(self.writer, "{:padding$}", "")?;
            self.line_start = false;
        }

        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        self.line_start = true;
        Ok(())
    }

    fn indent(&mut self) {
        self.level += 1;
    }

    fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

/// Records classified output line by line.
///
/// Each line is a list of `(kind, text)` segments; indentation is kept per line.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
    current: TranscriptLine,
    level: usize,
}

/// A single line of a [`Transcript`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TranscriptLine {
    /// Indentation level at which the line started
    pub level: usize,
    /// The classified segments in output order
    pub segments: Vec<(OutputKind, String)>,
}

impl TranscriptLine {
    /// Concatenates all segments of the line.
    #[must_use]
    pub fn text(&self) -> String {
        self.segments.iter().map(|(_, text)| text.as_str()).collect()
    }

    /// Returns `true` if any segment is classified as `kind`.
    #[must_use]
    pub fn has(&self, kind: OutputKind) -> bool {
        self.segments.iter().any(|(segment, _)| *segment == kind)
    }
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Transcript {
        Transcript::default()
    }

    /// All terminated lines.
    #[must_use]
    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// The plain text of every terminated line.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(TranscriptLine::text).collect()
    }

    /// Segments written after the last newline.
    #[must_use]
    pub fn pending(&self) -> &TranscriptLine {
        &self.current
    }
}

impl Sink for Transcript {
    fn print(&mut self, kind: OutputKind, text: &str) -> Result<()> {
        if self.current.segments.is_empty() {
            self.current.level = self.level;
        }
        self.current.segments.push((kind, text.to_string()));
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        let mut line = std::mem::take(&mut self.current);
        if line.segments.is_empty() {
            line.level = self.level;
        }
        self.lines.push(line);
        Ok(())
    }

    fn indent(&mut self) {
        self.level += 1;
    }

    fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn channels_cover_every_kind() {
        let mut all = Channels::empty();
        for kind in OutputKind::iter() {
            all |= Channels::of(kind);
        }
        assert_eq!(all, Channels::all());
        assert_eq!(OutputKind::COUNT, 7);
        assert_eq!(OutputKind::Keyword.to_string(), "keyword");
        assert_eq!(OutputKind::Error.as_ref(), "error");
    }

    #[test]
    fn text_sink_indents_and_filters() {
        let mut sink = TextSink::new(Vec::new())
            .with_indent_width(2)
            .with_channels(Channels::all() - Channels::COMMENT);

        sink.print(OutputKind::Keyword, "code").unwrap();
        sink.newline().unwrap();
        sink.indent();
        sink.print(OutputKind::Keyword, "nop").unwrap();
        sink.print(OutputKind::Comment, " ; ignored").unwrap();
        sink.newline().unwrap();
        sink.unindent();
        sink.unindent();
        assert_eq!(sink.level(), 0);
        sink.print(OutputKind::Label, "end").unwrap();

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "code\n  nop\nend");
    }

    #[test]
    fn transcript_records_segments() {
        let mut transcript = Transcript::new();
        transcript.print(OutputKind::Label, "0000: ").unwrap();
        transcript.print(OutputKind::Keyword, "ret").unwrap();
        transcript.newline().unwrap();
        transcript.indent();
        transcript.print(OutputKind::Error, "?").unwrap();

        assert_eq!(transcript.texts(), vec!["0000: ret".to_string()]);
        assert!(transcript.lines()[0].has(OutputKind::Keyword));
        assert!(!transcript.lines()[0].has(OutputKind::Error));
        assert_eq!(transcript.pending().level, 1);
        assert_eq!(transcript.pending().text(), "?");
    }
}
