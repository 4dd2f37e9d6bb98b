// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use tempest_core::buffer::{Reader, Writer};
use tempest_core::error::Error;
use tempest_core::meta::{
    Encoding, MetaStringDecoder, MetaStringEncoder, NAMESPACE_DECODER, NAMESPACE_ENCODER,
    TYPE_NAME_DECODER, TYPE_NAME_ENCODER,
};

fn roundtrip(encoder: &MetaStringEncoder, decoder: &MetaStringDecoder, input: &str) -> Encoding {
    let ms = encoder.encode(input).unwrap();
    let decoded = decoder.decode(&ms.bytes, ms.encoding, ms.num_bits).unwrap();
    assert_eq!(decoded, input, "roundtrip failed for {input:?}");
    ms.encoding
}

#[test]
fn test_lower_special() {
    let ms = TYPE_NAME_ENCODER.encode("abc_def").unwrap();
    assert_eq!(ms.encoding, Encoding::LowerSpecial);
    assert_eq!(ms.num_bits, 35);
    assert_eq!(ms.bytes.len(), 5);
    let decoded = TYPE_NAME_DECODER
        .decode(&ms.bytes, Encoding::LowerSpecial, 35)
        .unwrap();
    assert_eq!(decoded, "abc_def");
}

#[test]
fn test_lower_special_bit_layout() {
    // 'a'=0, 'b'=1, 'c'=2 packed MSB-first: 00000 00001 00010 0
    let ms = TYPE_NAME_ENCODER.encode("abc").unwrap();
    assert_eq!(ms.encoding, Encoding::LowerSpecial);
    assert_eq!(ms.num_bits, 15);
    assert_eq!(ms.bytes, vec![0x00, 0x44]);
}

#[test]
fn test_lower_upper_digit_special() {
    let ms = NAMESPACE_ENCODER.encode("ExampleInput123").unwrap();
    assert_eq!(ms.encoding, Encoding::LowerUpperDigitSpecial);
    assert_eq!(ms.num_bits, 90);
    assert_eq!(ms.bytes.len(), 12);
    let decoded = NAMESPACE_DECODER
        .decode(&ms.bytes, ms.encoding, ms.num_bits)
        .unwrap();
    assert_eq!(decoded, "ExampleInput123");
}

#[test]
fn test_first_to_lower_special() {
    let ms = TYPE_NAME_ENCODER.encode("Aabcdef").unwrap();
    assert_eq!(ms.encoding, Encoding::FirstToLowerSpecial);
    let decoded = TYPE_NAME_DECODER
        .decode(&ms.bytes, ms.encoding, ms.num_bits)
        .unwrap();
    assert_eq!(decoded, "Aabcdef");
}

#[test]
fn test_all_to_lower_special() {
    // 2 uppers over 12 chars: (12 + 2) * 5 < 12 * 6
    let ms = TYPE_NAME_ENCODER.encode("AbcdefGhijkl").unwrap();
    assert_eq!(ms.encoding, Encoding::AllToLowerSpecial);
    assert_eq!(ms.num_bits, 70);
    let decoded = TYPE_NAME_DECODER
        .decode(&ms.bytes, ms.encoding, ms.num_bits)
        .unwrap();
    assert_eq!(decoded, "AbcdefGhijkl");
}

#[test]
fn test_utf8_fallback() {
    let input = "你好，世界";
    let ms = TYPE_NAME_ENCODER.encode(input).unwrap();
    assert_eq!(ms.encoding, Encoding::Utf8);
    assert_eq!(ms.bytes, input.as_bytes());
    assert_eq!(ms.num_bits, input.len() * 8);
    let decoded = TYPE_NAME_DECODER
        .decode(&ms.bytes, Encoding::Utf8, ms.num_bits)
        .unwrap();
    assert_eq!(decoded, input);
}

#[test]
fn test_empty_string() {
    let ms = TYPE_NAME_ENCODER.encode("").unwrap();
    assert_eq!(ms.encoding, Encoding::Utf8);
    assert!(ms.bytes.is_empty());
    assert_eq!(ms.num_bits, 0);
    let decoded = TYPE_NAME_DECODER
        .decode(&ms.bytes, Encoding::Utf8, 0)
        .unwrap();
    assert_eq!(decoded, "");
}

#[test]
fn test_encoding_selection_is_deterministic() {
    let inputs = [
        ("abc_def", Encoding::LowerSpecial),
        ("org.apache", Encoding::LowerSpecial),
        ("field1", Encoding::LowerUpperDigitSpecial),
        ("Aabcdef", Encoding::FirstToLowerSpecial),
        ("AbcdefGhijkl", Encoding::AllToLowerSpecial),
        ("ABCDEF", Encoding::LowerUpperDigitSpecial),
        ("hello world", Encoding::Utf8),
    ];
    for (input, expected) in inputs {
        for _ in 0..3 {
            let ms = TYPE_NAME_ENCODER.encode(input).unwrap();
            assert_eq!(ms.encoding, expected, "selection changed for {input:?}");
        }
    }
}

#[test]
fn test_roundtrip_various() {
    let inputs = [
        "a",
        "z",
        "example.namespace",
        "snake_case_name",
        "$internal$",
        "MixedCaseIdentifierWithLongTail",
        "XY",
        "A1b2C3",
        "café",
    ];
    for input in inputs {
        roundtrip(&TYPE_NAME_ENCODER, &TYPE_NAME_DECODER, input);
        roundtrip(&NAMESPACE_ENCODER, &NAMESPACE_DECODER, input);
    }
}

#[test]
fn test_special_chars_in_six_bit_alphabet() {
    let ms = NAMESPACE_ENCODER.encode("a.b_c9").unwrap();
    assert_eq!(ms.encoding, Encoding::LowerUpperDigitSpecial);
    let decoded = NAMESPACE_DECODER
        .decode(&ms.bytes, ms.encoding, ms.num_bits)
        .unwrap();
    assert_eq!(decoded, "a.b_c9");
}

#[test]
fn test_wire_roundtrip() {
    for input in ["abc_def", "ExampleInput123", "Aabcdef", "你好"] {
        let ms = NAMESPACE_ENCODER.encode(input).unwrap();
        let mut writer = Writer::default();
        ms.write_to(&mut writer);
        let binding = writer.dump();
        let mut reader = Reader::new(binding.as_slice());
        let read_back = NAMESPACE_DECODER.read_from(&mut reader).unwrap();
        assert_eq!(read_back.original, input);
        assert_eq!(read_back.encoding, ms.encoding);
        assert_eq!(read_back.bytes, ms.bytes);
        assert_eq!(reader.cursor(), binding.len());
    }
}

#[test]
fn test_oversized_string_rejected() {
    let long = "a".repeat(32768);
    assert!(matches!(
        TYPE_NAME_ENCODER.encode(&long),
        Err(Error::EncodeError(_))
    ));
    let max = "a".repeat(32767);
    assert!(TYPE_NAME_ENCODER.encode(&max).is_ok());
}

#[test]
fn test_unknown_encoding_byte_rejected() {
    let mut writer = Writer::default();
    writer.write_u8(0x09);
    writer.write_varuint32(8);
    writer.write_u8(0xFF);
    let binding = writer.dump();
    let mut reader = Reader::new(binding.as_slice());
    assert!(matches!(
        NAMESPACE_DECODER.read_from(&mut reader),
        Err(Error::EncodingError(_))
    ));
}

#[test]
fn test_alphabet_violation_is_internal_error() {
    // forcing a packed encoding on an out-of-alphabet input must fail loudly
    assert!(matches!(
        TYPE_NAME_ENCODER.encode_with_encoding("ABC", Encoding::LowerSpecial),
        Err(Error::EncodingError(_))
    ));
}

#[test]
fn test_restricted_encodings() {
    let ms = TYPE_NAME_ENCODER
        .encode_with_encodings("Aabcdef", &[Encoding::Utf8, Encoding::LowerUpperDigitSpecial])
        .unwrap();
    assert_eq!(ms.encoding, Encoding::LowerUpperDigitSpecial);
    let decoded = TYPE_NAME_DECODER
        .decode(&ms.bytes, ms.encoding, ms.num_bits)
        .unwrap();
    assert_eq!(decoded, "Aabcdef");
}
