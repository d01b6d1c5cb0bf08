#![no_main]
use bsvec::{EfVector, IntSequence, PforVector};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<u32>, bool)| {
    let (raw, sorted) = data;
    let mut values: Vec<u64> = raw.into_iter().map(u64::from).collect();
    if sorted {
        values.sort_unstable();
    }

    let pfor = PforVector::<32>::new(&values).unwrap();
    let ef = EfVector::<32>::new(&values).unwrap();
    assert_eq!(pfor.len(), values.len());
    assert_eq!(ef.len(), values.len());

    for (i, &v) in values.iter().enumerate() {
        assert_eq!(pfor.get(i).unwrap(), v);
        assert_eq!(ef.get(i).unwrap(), v);
    }
    assert!(pfor.get(values.len()).is_err());

    let bytes = ef.to_bytes().unwrap();
    let back = EfVector::<32>::from_bytes(&bytes).unwrap();
    assert_eq!(back.to_bytes().unwrap(), bytes);
});
