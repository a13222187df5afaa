//! Integration tests for opcode lookup over a persisted index.
//!
//! The table used throughout contains the single-byte opcodes `00`, `01`, `02` and the
//! two-byte opcodes `01 01`, `01 02`, `02 01`, `02 02`.

use opscope::{prelude::*, Result};

const CODE: [u8; 9] = [0x00, 0x01, 0x01, 0x02, 0x01, 0x01, 0x02, 0x02, 0x02];

const TABLE: &str = "\
00;op00
01;op01
02;op02
01 01;op0101
01 02;op0102
02 01;op0201
02 02;op0202
";

fn build_index(config: IndexConfig) -> Result<Index<StockFactory>> {
    let mut builder = IndexBuilder::new();
    for entry in opscope::reference::parse(TABLE)? {
        builder.add(entry.opcode.clone(), StockInstruction::from_reference(&entry)?)?;
    }

    Index::open_with_config(StockFactory, File::from_mem(builder.save_to_vec()?)?, config)
}

fn mnemonics(index: &Index<StockFactory>, code: &[u8], eager: bool) -> Result<Vec<String>> {
    let mut input = DecodeBuffer::new(code);
    let mut found = Vec::new();

    while let Some(lookup) = index.lookup_next_instruction(&mut input, eager)? {
        let name = match lookup.descriptor() {
            StockInstruction::Unknown { bytes } => format!("?{}", bytes.len()),
            instruction => instruction.mnemonic().unwrap_or_default().to_string(),
        };
        found.push(name);
    }

    Ok(found)
}

#[test]
fn non_eager_matches_single_bytes() -> Result<()> {
    let index = build_index(IndexConfig::default())?;
    let found = mnemonics(&index, &CODE, false)?;

    assert_eq!(
        found,
        ["op00", "op01", "op01", "op02", "op01", "op01", "op02", "op02", "op02"]
    );
    Ok(())
}

#[test]
fn eager_matches_longest() -> Result<()> {
    let index = build_index(IndexConfig::default())?;
    let found = mnemonics(&index, &CODE, true)?;

    assert_eq!(found, ["op00", "op0101", "op0201", "op0102", "op0202"]);
    Ok(())
}

#[test]
fn unknown_runs_cover_exactly_the_unmatched_bytes() -> Result<()> {
    let index = build_index(IndexConfig::default())?;
    let mut code = vec![0x01, 0x01];
    code.extend_from_slice(&[0xF0; 5]);
    code.extend_from_slice(&[0x02, 0x02]);

    let mut input = DecodeBuffer::new(&code[..]);
    let mut spans = Vec::new();
    while let Some(lookup) = index.lookup_next_instruction(&mut input, true)? {
        spans.push((lookup.offset(), lookup.len(), lookup.is_known()));
    }

    assert_eq!(spans, [(0, 2, true), (2, 5, false), (7, 2, true)]);
    Ok(())
}

#[test]
fn unknown_runs_resume_after_each_chunk() -> Result<()> {
    let index = build_index(IndexConfig::default())?;
    let mut code = vec![0xEE; 40];
    code.push(0x00);

    let found = mnemonics(&index, &code, true)?;
    assert_eq!(found, ["?16", "?16", "?8", "op00"]);

    let index = build_index(IndexConfig::default().with_unknown_chunk_size(32))?;
    let found = mnemonics(&index, &code, true)?;
    assert_eq!(found, ["?32", "?8", "op00"]);
    Ok(())
}

#[test]
fn end_of_stream_is_not_an_error() -> Result<()> {
    let index = build_index(IndexConfig::default())?;

    let mut input = DecodeBuffer::new(&[][..]);
    assert!(index.lookup_next_instruction(&mut input, true)?.is_none());
    assert!(index.lookup_next_instruction(&mut input, true)?.is_none());

    let mut input = DecodeBuffer::new(&[0x02][..]);
    assert!(index.lookup_next_instruction(&mut input, false)?.is_some());
    assert!(index.lookup_next_instruction(&mut input, false)?.is_none());
    assert!(index.lookup_next_instruction(&mut input, true)?.is_none());
    Ok(())
}

#[test]
fn lookup_respects_the_decode_window() -> Result<()> {
    let index = build_index(IndexConfig::default())?;

    // The window ends between the two bytes of `01 01`, so only `01` can match.
    let mut input = DecodeBuffer::new(&CODE[..]).with_limit(2);
    let first = index.lookup_next_instruction(&mut input, true)?;
    let second = index.lookup_next_instruction(&mut input, true)?;

    assert_eq!(first.map(|lookup| lookup.len()), Some(1));
    assert_eq!(
        second.as_ref().and_then(|lookup| lookup.descriptor().mnemonic()),
        Some("op01")
    );
    assert!(index.lookup_next_instruction(&mut input, true)?.is_none());
    Ok(())
}

#[test]
fn speculative_lookup_can_be_rolled_back() -> Result<()> {
    let index = build_index(IndexConfig::default())?;
    let mut input = DecodeBuffer::new(&CODE[..]);
    input.set_auto_commit(false);

    let first = index.lookup_next_instruction(&mut input, true)?;
    let second = index.lookup_next_instruction(&mut input, true)?;
    assert!(first.is_some() && second.is_some());
    assert_eq!(input.total_read(), 3);
    assert_eq!(input.position(), 0);

    input.discard(None);
    let again = index.lookup_next_instruction(&mut input, true)?;
    assert_eq!(again.map(|lookup| lookup.offset()), Some(0));
    Ok(())
}

#[test]
fn index_is_shared_between_threads() -> Result<()> {
    let index = build_index(IndexConfig::default())?;

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| mnemonics(&index, &CODE, true)))
            .collect();

        for worker in workers {
            let found = worker.join().unwrap().unwrap();
            assert_eq!(found.len(), 5);
        }
    });

    Ok(())
}
