//! Encoding Property Tests
//!
//! Randomized inputs checked against the base64 crate's decoder.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::Rng;
use upyun_relay::encoding::{base64_encode, EncodeError};

fn random_latin1(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| char::from_u32(rng.random_range(0..=0xFFu32)).unwrap())
        .collect()
}

#[test]
fn test_latin1_strings_decode_to_code_units() {
    let mut rng = rand::rng();

    for _ in 0..200 {
        let len = rng.random_range(0..64);
        let input = random_latin1(&mut rng, len);

        let encoded = base64_encode(&input).unwrap();
        assert_eq!(encoded.len(), len.div_ceil(3) * 4);

        let decoded = STANDARD.decode(&encoded).unwrap();
        let expected: Vec<u8> = input.chars().map(|c| c as u8).collect();
        assert_eq!(decoded, expected);
    }
}

#[test]
fn test_out_of_range_char_is_reported_at_its_index() {
    let mut rng = rand::rng();

    for _ in 0..50 {
        let prefix_len = rng.random_range(0..16);
        let mut input = random_latin1(&mut rng, prefix_len);
        let wide = char::from_u32(rng.random_range(0x100u32..0xD800)).unwrap();
        input.push(wide);
        input.push('a');

        match base64_encode(&input) {
            Err(EncodeError::CharOutOfRange { index, .. }) => assert_eq!(index, prefix_len),
            other => panic!("Expected CharOutOfRange, got {:?}", other),
        }
    }
}
