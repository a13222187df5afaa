#![no_main]

use libfuzzer_sys::fuzz_target;
use opscope::{DecodeBuffer, File, Index, StockFactory};

fuzz_target!(|data: &[u8]| {
    let Ok(file) = File::from_mem(data.to_vec()) else {
        return;
    };
    let Ok(index) = Index::open(StockFactory, file) else {
        return;
    };

    // Scan the image itself as a code stream; every opcode that matches loads its descriptor.
    let mut input = DecodeBuffer::new(data);
    while let Ok(Some(_)) = index.lookup_next_instruction(&mut input, true) {}
});
