//! Transactional, classified output.
//!
//! [`EncodeBuffer`] mirrors [`crate::DecodeBuffer`] on the output side. With auto-commit on,
//! every call goes straight to the [`Sink`]. With auto-commit off, calls are recorded as
//! [`Operation`]s and only replayed, in order, on [`EncodeBuffer::commit`];
//! [`EncodeBuffer::discard`] drops everything recorded since the last commit.
//!
//! # Examples
//!
//! ```rust
//! use opscope::{EncodeBuffer, Transcript};
//!
//! let mut transcript = Transcript::new();
//! let mut output = EncodeBuffer::new(&mut transcript);
//!
//! output.set_auto_commit(false)?;
//! output.print_keyword("jmp")?;
//! output.discard();
//!
//! output.println_keyword("ret")?;
//! output.commit()?;
//! drop(output);
//!
//! assert_eq!(transcript.texts(), vec!["ret".to_string()]);
//! # Ok::<(), opscope::Error>(())
//! ```

use std::fmt;

use crate::{
    buffer::sink::{OutputKind, Sink},
    Result,
};

/// A recorded output operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Text on the current line
    Print(OutputKind, String),
    /// End of the current line
    Newline,
    /// One more indentation level
    Indent,
    /// One less indentation level
    Unindent,
}

/// Classified output with deferred, discardable writes.
pub struct EncodeBuffer<'s> {
    sink: &'s mut dyn Sink,
    auto_commit: bool,
    queue: Vec<Operation>,
}

macro_rules! classified_printers {
    ($($print:ident, $println:ident => $kind:ident),* $(,)?) => {
        $(
            #[doc = concat!("Prints `text` classified as [`OutputKind::", stringify!($kind), "`].")]
            ///
            /// # Errors
            /// Propagates sink failures when auto-commit is on.
            pub fn $print(&mut self, text: impl fmt::Display) -> Result<()> {
                self.print(OutputKind::$kind, text)
            }

            #[doc = concat!(
                "Prints `text` classified as [`OutputKind::",
                stringify!($kind),
                "`] and ends the line."
            )]
            ///
            /// # Errors
            /// Propagates sink failures when auto-commit is on.
            pub fn $println(&mut self, text: impl fmt::Display) -> Result<()> {
                self.println(OutputKind::$kind, text)
            }
        )*
    };
}

impl<'s> EncodeBuffer<'s> {
    /// Wraps `sink` with auto-commit on.
    pub fn new(sink: &'s mut dyn Sink) -> EncodeBuffer<'s> {
        EncodeBuffer {
            sink,
            auto_commit: true,
            queue: Vec::new(),
        }
    }

    /// Returns whether output goes straight to the sink.
    #[must_use]
    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Toggles auto-commit. Switching it back on replays all recorded operations.
    ///
    /// # Errors
    /// Propagates sink failures of the replay.
    pub fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        if enabled && !self.auto_commit {
            self.commit()?;
        }
        self.auto_commit = enabled;
        Ok(())
    }

    /// Operations recorded since the last commit.
    #[must_use]
    pub fn pending(&self) -> &[Operation] {
        &self.queue
    }

    /// Replays all recorded operations against the sink, in recording order.
    ///
    /// # Errors
    /// Propagates the first sink failure; operations after it are dropped.
    pub fn commit(&mut self) -> Result<()> {
        let queue = std::mem::take(&mut self.queue);
        for operation in queue {
            Self::apply(self.sink, operation)?;
        }
        Ok(())
    }

    /// Drops all recorded operations without touching the sink.
    pub fn discard(&mut self) {
        self.queue.clear();
    }

    /// Prints `text` classified as `kind`.
    ///
    /// # Errors
    /// Propagates sink failures when auto-commit is on.
    pub fn print(&mut self, kind: OutputKind, text: impl fmt::Display) -> Result<()> {
        self.push(Operation::Print(kind, text.to_string()))
    }

    /// Prints `text` classified as `kind` and ends the line.
    ///
    /// # Errors
    /// Propagates sink failures when auto-commit is on.
    pub fn println(&mut self, kind: OutputKind, text: impl fmt::Display) -> Result<()> {
        self.print(kind, text)?;
        self.newline()
    }

    /// Ends the current line.
    ///
    /// # Errors
    /// Propagates sink failures when auto-commit is on.
    pub fn newline(&mut self) -> Result<()> {
        self.push(Operation::Newline)
    }

    /// Indents the following lines by one more level.
    ///
    /// # Errors
    /// Propagates sink failures when auto-commit is on.
    pub fn indent(&mut self) -> Result<()> {
        self.push(Operation::Indent)
    }

    /// Indents the following lines by one less level.
    ///
    /// # Errors
    /// Propagates sink failures when auto-commit is on.
    pub fn unindent(&mut self) -> Result<()> {
        self.push(Operation::Unindent)
    }

    classified_printers! {
        print_plain, println_plain => Plain,
        print_value, println_value => Value,
        print_comment, println_comment => Comment,
        print_keyword, println_keyword => Keyword,
        print_operator, println_operator => Operator,
        print_label, println_label => Label,
        print_error, println_error => Error,
    }

    fn push(&mut self, operation: Operation) -> Result<()> {
        if self.auto_commit {
            Self::apply(self.sink, operation)
        } else {
            self.queue.push(operation);
            Ok(())
        }
    }

    fn apply(sink: &mut dyn Sink, operation: Operation) -> Result<()> {
        match operation {
            Operation::Print(kind, text) => sink.print(kind, &text),
            Operation::Newline => sink.newline(),
            Operation::Indent => {
                sink.indent();
                Ok(())
            }
            Operation::Unindent => {
                sink.unindent();
                Ok(())
            }
        }
    }
}

impl fmt::Debug for EncodeBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeBuffer")
            .field("auto_commit", &self.auto_commit)
            .field("pending", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::sink::{TextSink, Transcript};

    #[test]
    fn auto_commit_writes_through() {
        let mut transcript = Transcript::new();
        let mut output = EncodeBuffer::new(&mut transcript);
        output.print_label("0004: ").unwrap();
        output.print_keyword("push").unwrap();
        output.print_plain(" ").unwrap();
        output.println_value(7).unwrap();
        assert!(output.pending().is_empty());
        drop(output);

        let line = &transcript.lines()[0];
        assert_eq!(line.text(), "0004: push 7");
        assert_eq!(
            line.segments,
            vec![
                (OutputKind::Label, "0004: ".to_string()),
                (OutputKind::Keyword, "push".to_string()),
                (OutputKind::Plain, " ".to_string()),
                (OutputKind::Value, "7".to_string()),
            ]
        );
    }

    #[test]
    fn deferred_output_commits_in_order() {
        let mut sink = TextSink::new(Vec::new());
        let mut output = EncodeBuffer::new(&mut sink);
        output.set_auto_commit(false).unwrap();

        output.println_keyword("block").unwrap();
        output.indent().unwrap();
        output.println_keyword("nop").unwrap();
        output.unindent().unwrap();
        assert_eq!(output.pending().len(), 6);

        output.commit().unwrap();
        output.print_error("dropped").unwrap();
        output.discard();
        output.println_comment("; end").unwrap();
        output.set_auto_commit(true).unwrap();
        drop(output);

        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "block\n    nop\n; end\n");
    }

    #[test]
    fn discard_leaves_flushed_output() {
        let mut transcript = Transcript::new();
        let mut output = EncodeBuffer::new(&mut transcript);
        output.println_keyword("first").unwrap();

        output.set_auto_commit(false).unwrap();
        output.print_keyword("second").unwrap();
        output.print_value("?").unwrap();
        output.discard();
        assert!(output.pending().is_empty());
        output.commit().unwrap();
        drop(output);

        assert_eq!(transcript.texts(), vec!["first".to_string()]);
        assert!(transcript.pending().segments.is_empty());
    }
}
