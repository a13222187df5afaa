//! A stock, table-driven disassembler built on the opcode index.
//!
//! This module provides a closed instruction set that covers the common shapes of byte-code
//! instructions (no operands, fixed operand lists, jump tables) and a decoder that drives
//! it. Instruction sets are described in reference tables and compiled into an index once.
//!
//! # Key Types
//! - [`StockInstruction`] - Persisted instruction descriptor, dispatched by a tag byte
//! - [`OperandKind`] - Operand shapes, selected by tokens such as `u8` or `rel16`
//! - [`StockFactory`] - Loads [`StockInstruction`]s from an index
//! - [`SymbolTable`] - Names for symbol operands, resolved through the active decoder
//! - [`TableDecoder`] - The [`crate::MachineCodeDecoder`] driving the index
//!
//! # Example
//! ```rust
//! use std::rc::Rc;
//! use opscope::prelude::*;
//!
//! let mut builder = IndexBuilder::new();
//! let ldc = StockInstruction::with_operands("ldc", vec![OperandKind::Sym8]);
//! builder.add(Opcode::parse("12")?, ldc)?;
//! let index = Index::open(StockFactory, File::from_mem(builder.save_to_vec()?)?)?;
//!
//! let symbols = [(1, "String \"hi\"")].into_iter().collect();
//! let decoder = Rc::new(TableDecoder::new("jvm", index).with_symbols(symbols));
//!
//! let mut transcript = Transcript::new();
//! decode(&decoder, &[0x12, 0x01][..], &mut transcript)?;
//! assert_eq!(transcript.texts(), vec!["L0000: ldc #1 /* String \"hi\" */"]);
//! # Ok::<(), opscope::Error>(())
//! ```

mod decoder;
mod instruction;
mod operand;
mod symbols;

pub use decoder::TableDecoder;
pub use instruction::{StockFactory, StockInstruction};
pub use operand::OperandKind;
pub use symbols::SymbolTable;

/// Renders the address label of stream offset `address`.
#[must_use]
pub fn label(address: u64) -> String {
    format!("L{address:04X}")
}
