//! A table-driven decoder over an index of [`StockInstruction`]s.

use log::warn;

use crate::{
    buffer::{decode::DecodeBuffer, encode::EncodeBuffer},
    context::{DecoderSettings, MachineCodeDecoder},
    disassembler::{instruction::StockFactory, label, symbols::SymbolTable},
    index::{descriptor::InstructionDescriptor, Index},
    opcode::Opcode,
    Error, Result,
};

/// Disassembles a code stream instruction by instruction through an opcode index.
///
/// Each instruction is rendered on its own line, prefixed with its address label. The
/// operands are decoded speculatively: a failing instruction leaves no partial output
/// behind. An instruction cut off by the end of the stream is rendered as an error line
/// and ends the decode loop; any other failure aborts the decode call.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use opscope::prelude::*;
///
/// let table = "10;push;u8\nB1;ret;-\n";
/// let mut builder = IndexBuilder::new();
/// for entry in opscope::reference::parse(table)? {
///     builder.add(entry.opcode.clone(), StockInstruction::from_reference(&entry)?)?;
/// }
///
/// let index = Index::open(StockFactory, File::from_mem(builder.save_to_vec()?)?)?;
/// let decoder = Rc::new(TableDecoder::new("demo", index));
///
/// let mut transcript = Transcript::new();
/// decode(&decoder, &[0x10, 0x2A, 0xB1][..], &mut transcript)?;
/// assert_eq!(transcript.texts(), vec!["L0000: push 0x2a", "L0002: ret"]);
/// # Ok::<(), opscope::Error>(())
/// ```
pub struct TableDecoder {
    settings: DecoderSettings,
    index: Index<StockFactory>,
    symbols: SymbolTable,
    eager: bool,
}

impl TableDecoder {
    /// Creates a decoder named `name`; the matching mode follows the index configuration.
    pub fn new(name: impl Into<String>, index: Index<StockFactory>) -> TableDecoder {
        let eager = index.config().eager;
        TableDecoder {
            settings: DecoderSettings::new(name),
            index,
            symbols: SymbolTable::new(),
            eager,
        }
    }

    /// Replaces the symbol table `sym` operands resolve against.
    #[must_use]
    pub fn with_symbols(mut self, symbols: SymbolTable) -> TableDecoder {
        self.symbols = symbols;
        self
    }

    /// Replaces the matching mode.
    #[must_use]
    pub fn with_eager(mut self, eager: bool) -> TableDecoder {
        self.eager = eager;
        self
    }

    /// Replaces the settings, e.g. to change the byte order of operands.
    #[must_use]
    pub fn with_settings(mut self, settings: DecoderSettings) -> TableDecoder {
        self.settings = settings;
        self
    }

    /// The symbol table of this decoder.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The index instructions are looked up in.
    #[must_use]
    pub fn index(&self) -> &Index<StockFactory> {
        &self.index
    }

    /// Returns `true` if lookups prefer the longest matching opcode.
    #[must_use]
    pub fn eager(&self) -> bool {
        self.eager
    }
}

impl MachineCodeDecoder for TableDecoder {
    fn settings(&self) -> &DecoderSettings {
        &self.settings
    }

    fn decode_instructions(
        &self,
        input: &mut DecodeBuffer<'_>,
        output: &mut EncodeBuffer<'_>,
    ) -> Result<()> {
        while let Some(lookup) = self.index.lookup_next_instruction(input, self.eager)? {
            let opcode = match lookup.opcode() {
                Some(opcode) => opcode,
                None => Opcode::wrap(&[])?,
            };

            output.set_auto_commit(false)?;
            input.set_auto_commit(false);

            output.print_label(format!("{}: ", label(lookup.offset())))?;
            let result = lookup.descriptor().decode(&opcode, input, output);

            match result {
                Ok(()) => {
                    input.set_auto_commit(true);
                    output.set_auto_commit(true)?;
                }
                Err(Error::OutOfBounds) => {
                    input.discard(None);
                    input.set_auto_commit(true);
                    output.discard();

                    warn!(
                        "{}: instruction [{}] at {:#x} is truncated",
                        self.settings.name(),
                        opcode,
                        lookup.offset()
                    );

                    output.print_label(format!("{}: ", label(lookup.offset())))?;
                    output.println_error(format!(
                        "<truncated {}>",
                        lookup.descriptor().mnemonic().unwrap_or("instruction")
                    ))?;
                    output.set_auto_commit(true)?;
                    break;
                }
                Err(error) => {
                    input.discard(None);
                    input.set_auto_commit(true);
                    output.discard();
                    output.set_auto_commit(true)?;
                    return Err(error);
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for TableDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDecoder")
            .field("settings", &self.settings)
            .field("index", &self.index)
            .field("symbols", &self.symbols.len())
            .field("eager", &self.eager)
            .finish()
    }
}
