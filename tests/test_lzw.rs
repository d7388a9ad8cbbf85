//! LZW encoder round-trip properties, checked against an independent
//! decoder.

use lptpdf::lzw::LzwEncoder;
use proptest::prelude::*;

fn decode(data: &[u8]) -> Vec<u8> {
    weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .decode(data)
        .expect("decode")
}

#[test]
fn test_roundtrip_classic_corpus() {
    let mut enc = LzwEncoder::new();
    for input in [
        &b""[..],
        b"a",
        b"aaaaaaaaaaaaaaaa",
        b"TOBEORNOTTOBEORTOBEORNOT",
        b"\x00\xff\x00\xff\x00\xff",
    ] {
        assert_eq!(decode(enc.encode(input)), input);
    }
}

#[test]
fn test_roundtrip_page_like_stream() {
    // Shaped like real page output: long runs of structure with
    // varying text.
    let mut page = Vec::new();
    for i in 0..400 {
        page.extend_from_slice(format!(" T* (LINE {i:05} REPORT FIELD {})Tj", i % 7).as_bytes());
    }
    let mut enc = LzwEncoder::new();
    let out = enc.encode(&page);
    assert!(out.len() < page.len() / 3);
    assert_eq!(decode(out), page);
}

proptest! {
    #[test]
    fn prop_roundtrip_arbitrary_bytes(input in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let mut enc = LzwEncoder::new();
        prop_assert_eq!(decode(enc.encode(&input)), input);
    }

    #[test]
    fn prop_roundtrip_low_entropy(input in proptest::collection::vec(0u8..4, 0..16384)) {
        // Few distinct symbols drive deep dictionary chains.
        let mut enc = LzwEncoder::new();
        prop_assert_eq!(decode(enc.encode(&input)), input);
    }
}
