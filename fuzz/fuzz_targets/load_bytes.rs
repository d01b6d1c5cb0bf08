#![no_main]
use bsvec::{BpVector, EfVector, IntSequence, PforVector};
use libfuzzer_sys::fuzz_target;

// Arbitrary bytes must load as an error or as a container whose every
// access returns without panicking.
fn load_and_read<S: IntSequence>(data: &[u8]) {
    if let Ok(seq) = S::from_bytes(data) {
        for i in 0..seq.len().min(4096) {
            let _ = seq.get(i);
        }
        for v in seq.iter().take(4096) {
            if v.is_err() {
                break;
            }
        }
    }
}

fuzz_target!(|data: &[u8]| {
    load_and_read::<BpVector<128>>(data);
    load_and_read::<PforVector<32>>(data);
    load_and_read::<EfVector<16>>(data);
});
