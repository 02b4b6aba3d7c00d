use std::io::{Read, Write};
use std::sync::Arc;

use cuckoo_backend::{Backend, MemoryBackend, OpenMode, SharedBackend};
use cuckoo_parted::PartedFs;
use proptest::prelude::*;

fn roundtrip(max_part_size: u64, payload: &[u8]) {
    let backend: SharedBackend = Arc::new(MemoryBackend::new("mem"));
    let fs = PartedFs::new(backend, max_part_size);

    let mut writer = fs.open("/f.bin", OpenMode::Write).unwrap();
    writer.write_all(payload).unwrap();
    writer.close().unwrap();

    assert_eq!(fs.getsize("/f.bin").unwrap(), payload.len() as u64);

    let mut reader = fs.open("/f.bin", OpenMode::Read).unwrap();
    let mut got = Vec::new();
    let chunk_size = max_part_size.min(4096).max(1) as usize;
    let mut buf = vec![0u8; chunk_size];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        got.extend_from_slice(&buf[..n]);
    }
    assert_eq!(got, payload);
}

proptest! {
    #[test]
    fn round_trip_holds_for_arbitrary_payloads(
        max_part_size in 1u64..=2048,
        payload in proptest::collection::vec(any::<u8>(), 0..6000),
    ) {
        roundtrip(max_part_size, &payload);
    }
}

proptest! {
    #[test]
    fn part_length_law_holds(
        max_part_size in 1u64..=1024,
        payload in proptest::collection::vec(any::<u8>(), 0..5000),
    ) {
        let backend: SharedBackend = Arc::new(MemoryBackend::new("mem"));
        let fs = PartedFs::new(Arc::clone(&backend), max_part_size);
        fs.open("/f.bin", OpenMode::Write).unwrap().write_all(&payload).unwrap();

        let mut sizes = Vec::new();
        let mut index = 0u64;
        loop {
            let path = format!("/f.bin.part{index}");
            if !backend.isfile(&path) {
                break;
            }
            sizes.push(backend.getsize(&path).unwrap());
            index += 1;
        }

        if payload.is_empty() {
            prop_assert_eq!(sizes, vec![0]);
        } else {
            for size in &sizes[..sizes.len() - 1] {
                prop_assert_eq!(*size, max_part_size);
            }
            let last = *sizes.last().unwrap();
            prop_assert!(last > 0 && last <= max_part_size);
        }
    }
}
