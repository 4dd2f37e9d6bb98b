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

use num_enum::TryFromPrimitive;

use crate::buffer::{Reader, Writer};
use crate::ensure;
use crate::error::Error;
use crate::meta::string_util;

// equal to i16::MAX
const SHORT_MAX_VALUE: usize = 32767;

pub static NAMESPACE_ENCODER: MetaStringEncoder = MetaStringEncoder::new('.', '_');
pub static TYPE_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder::new('$', '_');
pub static FIELD_NAME_ENCODER: MetaStringEncoder = MetaStringEncoder::new('$', '_');

pub static NAMESPACE_DECODER: MetaStringDecoder = MetaStringDecoder::new('.', '_');
pub static TYPE_NAME_DECODER: MetaStringDecoder = MetaStringDecoder::new('$', '_');
pub static FIELD_NAME_DECODER: MetaStringDecoder = MetaStringDecoder::new('$', '_');

/// Encoding of a meta string payload.
///
/// The packed encodings index a fixed alphabet and write symbols MSB-first
/// into the output bytes; `Utf8` is the fallback for anything the alphabets
/// cannot express.
#[derive(Debug, PartialEq, Hash, Eq, Clone, Copy, Default, TryFromPrimitive)]
#[repr(u8)]
pub enum Encoding {
    LowerSpecial = 0x00,
    LowerUpperDigitSpecial = 0x01,
    FirstToLowerSpecial = 0x02,
    AllToLowerSpecial = 0x03,
    #[default]
    Utf8 = 0x04,
}

impl Encoding {
    pub fn bits_per_char(self) -> usize {
        match self {
            Encoding::LowerSpecial
            | Encoding::FirstToLowerSpecial
            | Encoding::AllToLowerSpecial => 5,
            Encoding::LowerUpperDigitSpecial => 6,
            Encoding::Utf8 => 8,
        }
    }
}

/// A string together with its chosen encoding and packed payload.
///
/// Invariant: decoding `bytes` with `encoding` and `num_bits` yields
/// `original`.
#[derive(Debug, Clone, Default)]
pub struct MetaString {
    pub original: String,
    pub encoding: Encoding,
    pub bytes: Vec<u8>,
    pub num_chars: usize,
    pub num_bits: usize,
    pub special_char1: char,
    pub special_char2: char,
}

impl PartialEq for MetaString {
    fn eq(&self, other: &Self) -> bool {
        self.encoding == other.encoding && self.bytes == other.bytes
    }
}

impl Eq for MetaString {}

impl std::hash::Hash for MetaString {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.encoding.hash(state);
        self.bytes.hash(state);
    }
}

impl MetaString {
    /// Wire form: `u8(encoding)`, `varuint32(num_bits)`, then
    /// `ceil(num_bits / 8)` payload bytes.
    pub fn write_to(&self, writer: &mut Writer) {
        writer.write_u8(self.encoding as u8);
        writer.write_varuint32(self.num_bits as u32);
        writer.write_bytes(&self.bytes);
    }
}

#[derive(Clone)]
pub struct MetaStringEncoder {
    pub special_char1: char,
    pub special_char2: char,
}

#[derive(Clone)]
pub struct MetaStringDecoder {
    pub special_char1: char,
    pub special_char2: char,
}

#[derive(Debug)]
struct StringStatistics {
    digit_count: usize,
    upper_count: usize,
    can_lower_upper_digit_special_encoded: bool,
    can_lower_special_encoded: bool,
}

impl MetaStringEncoder {
    pub const fn new(special_char1: char, special_char2: char) -> Self {
        Self {
            special_char1,
            special_char2,
        }
    }

    /// Encode `input`, choosing the cheapest encoding by inspection.
    pub fn encode(&self, input: &str) -> Result<MetaString, Error> {
        if let Some(ms) = self.encode_trivial(input)? {
            return Ok(ms);
        }
        let encoding = self.compute_encoding(input, None);
        self.encode_with_encoding(input, encoding)
    }

    /// Like [`MetaStringEncoder::encode`], restricted to a subset of
    /// encodings the call site can represent.
    pub fn encode_with_encodings(
        &self,
        input: &str,
        encodings: &[Encoding],
    ) -> Result<MetaString, Error> {
        if let Some(ms) = self.encode_trivial(input)? {
            return Ok(ms);
        }
        let encoding = self.compute_encoding(input, Some(encodings));
        self.encode_with_encoding(input, encoding)
    }

    // Empty and non-Latin inputs short-circuit to UTF-8.
    fn encode_trivial(&self, input: &str) -> Result<Option<MetaString>, Error> {
        if input.is_empty() {
            return Ok(Some(self.utf8_meta_string(input)));
        }
        ensure!(
            input.len() <= SHORT_MAX_VALUE,
            Error::encode_error(format!(
                "Meta string is too long, max:{SHORT_MAX_VALUE}, current:{}",
                input.len()
            ))
        );
        if !string_util::is_latin(input) {
            return Ok(Some(self.utf8_meta_string(input)));
        }
        Ok(None)
    }

    fn utf8_meta_string(&self, input: &str) -> MetaString {
        let bytes = input.as_bytes().to_vec();
        MetaString {
            original: input.to_string(),
            encoding: Encoding::Utf8,
            num_chars: bytes.len(),
            num_bits: bytes.len() * 8,
            bytes,
            special_char1: self.special_char1,
            special_char2: self.special_char2,
        }
    }

    fn compute_encoding(&self, input: &str, encodings: Option<&[Encoding]>) -> Encoding {
        let allow = |e: Encoding| encodings.map_or(true, |opts| opts.contains(&e));
        let statistics = self.compute_statistics(input);
        if statistics.can_lower_special_encoded && allow(Encoding::LowerSpecial) {
            return Encoding::LowerSpecial;
        }
        if statistics.can_lower_upper_digit_special_encoded {
            if statistics.digit_count != 0 && allow(Encoding::LowerUpperDigitSpecial) {
                return Encoding::LowerUpperDigitSpecial;
            }
            let upper_count = statistics.upper_count;
            if upper_count == 1
                && input.as_bytes()[0].is_ascii_uppercase()
                && allow(Encoding::FirstToLowerSpecial)
            {
                return Encoding::FirstToLowerSpecial;
            }
            if ((input.len() + upper_count) * 5) < (input.len() * 6)
                && allow(Encoding::AllToLowerSpecial)
            {
                return Encoding::AllToLowerSpecial;
            }
            if allow(Encoding::LowerUpperDigitSpecial) {
                return Encoding::LowerUpperDigitSpecial;
            }
        }
        Encoding::Utf8
    }

    fn compute_statistics(&self, input: &str) -> StringStatistics {
        let mut can_lower_upper_digit_special_encoded = true;
        let mut can_lower_special_encoded = true;
        let mut digit_count = 0;
        let mut upper_count = 0;
        for c in input.chars() {
            if can_lower_upper_digit_special_encoded
                && !(c.is_ascii_lowercase()
                    || c.is_ascii_uppercase()
                    || c.is_ascii_digit()
                    || c == self.special_char1
                    || c == self.special_char2)
            {
                can_lower_upper_digit_special_encoded = false;
            }
            if can_lower_special_encoded
                && !(c.is_ascii_lowercase() || matches!(c, '.' | '_' | '$' | '|'))
            {
                can_lower_special_encoded = false;
            }
            if c.is_ascii_digit() {
                digit_count += 1;
            }
            if c.is_ascii_uppercase() {
                upper_count += 1;
            }
        }
        StringStatistics {
            digit_count,
            upper_count,
            can_lower_upper_digit_special_encoded,
            can_lower_special_encoded,
        }
    }

    /// Encode `input` with a caller-chosen encoding. The input must fit the
    /// alphabet of that encoding.
    pub fn encode_with_encoding(
        &self,
        input: &str,
        encoding: Encoding,
    ) -> Result<MetaString, Error> {
        if input.is_empty() {
            return Ok(self.utf8_meta_string(input));
        }
        ensure!(
            input.len() <= SHORT_MAX_VALUE,
            Error::encode_error(format!(
                "Meta string is too long, max:{SHORT_MAX_VALUE}, current:{}",
                input.len()
            ))
        );
        let len = input.len();
        match encoding {
            Encoding::LowerSpecial => {
                let bytes = self.encode_generic(input.as_bytes(), 5)?;
                Ok(self.packed_meta_string(input, encoding, bytes, len, len * 5))
            }
            Encoding::LowerUpperDigitSpecial => {
                let bytes = self.encode_generic(input.as_bytes(), 6)?;
                Ok(self.packed_meta_string(input, encoding, bytes, len, len * 6))
            }
            Encoding::FirstToLowerSpecial => {
                let mut chars = input.as_bytes().to_vec();
                chars[0] = chars[0].to_ascii_lowercase();
                let bytes = self.encode_generic(&chars, 5)?;
                Ok(self.packed_meta_string(input, encoding, bytes, len, len * 5))
            }
            Encoding::AllToLowerSpecial => {
                let upper_count = input
                    .bytes()
                    .filter(|b| b.is_ascii_uppercase())
                    .count();
                let mut chars = Vec::with_capacity(len + upper_count);
                for b in input.bytes() {
                    if b.is_ascii_uppercase() {
                        chars.push(b'|');
                        chars.push(b.to_ascii_lowercase());
                    } else {
                        chars.push(b);
                    }
                }
                let bytes = self.encode_generic(&chars, 5)?;
                Ok(self.packed_meta_string(input, encoding, bytes, len, (len + upper_count) * 5))
            }
            Encoding::Utf8 => Ok(self.utf8_meta_string(input)),
        }
    }

    fn packed_meta_string(
        &self,
        input: &str,
        encoding: Encoding,
        bytes: Vec<u8>,
        num_chars: usize,
        num_bits: usize,
    ) -> MetaString {
        MetaString {
            original: input.to_string(),
            encoding,
            bytes,
            num_chars,
            num_bits,
            special_char1: self.special_char1,
            special_char2: self.special_char2,
        }
    }

    // Symbols are packed MSB-first: the first symbol occupies the high bits
    // of the first output byte.
    fn encode_generic(&self, chars: &[u8], bits_per_char: usize) -> Result<Vec<u8>, Error> {
        let total_bits = chars.len() * bits_per_char;
        let mut bytes = vec![0u8; total_bits.div_ceil(8)];
        let mut current_bit = 0;
        for &c in chars {
            let value = self.char_to_value(c, bits_per_char)?;
            for i in (0..bits_per_char).rev() {
                if (value & (1 << i)) != 0 {
                    let byte_pos = current_bit / 8;
                    let bit_pos = current_bit % 8;
                    bytes[byte_pos] |= 1 << (7 - bit_pos);
                }
                current_bit += 1;
            }
        }
        Ok(bytes)
    }

    fn char_to_value(&self, c: u8, bits_per_char: usize) -> Result<u8, Error> {
        match bits_per_char {
            5 => match c {
                b'a'..=b'z' => Ok(c - b'a'),
                b'.' => Ok(26),
                b'_' => Ok(27),
                b'$' => Ok(28),
                b'|' => Ok(29),
                _ => Err(Error::encoding_error(format!(
                    "Unsupported character for LOWER_SPECIAL encoding: {}",
                    c as char
                ))),
            },
            6 => {
                if c.is_ascii_lowercase() {
                    Ok(c - b'a')
                } else if c.is_ascii_uppercase() {
                    Ok(c - b'A' + 26)
                } else if c.is_ascii_digit() {
                    Ok(c - b'0' + 52)
                } else if c as u32 == self.special_char1 as u32 {
                    Ok(62)
                } else if c as u32 == self.special_char2 as u32 {
                    Ok(63)
                } else {
                    Err(Error::encoding_error(format!(
                        "Unsupported character for LOWER_UPPER_DIGIT_SPECIAL encoding: {}",
                        c as char
                    )))
                }
            }
            _ => unreachable!(),
        }
    }
}

impl MetaStringDecoder {
    pub const fn new(special_char1: char, special_char2: char) -> Self {
        MetaStringDecoder {
            special_char1,
            special_char2,
        }
    }

    /// Decode a payload produced by [`MetaStringEncoder`]. `num_bits` is the
    /// exact bit count of the payload; trailing padding bits are ignored.
    pub fn decode(
        &self,
        encoded_data: &[u8],
        encoding: Encoding,
        num_bits: usize,
    ) -> Result<String, Error> {
        if encoded_data.is_empty() && num_bits == 0 {
            return Ok(String::new());
        }
        ensure!(
            num_bits <= encoded_data.len() * 8,
            Error::encoding_error(format!(
                "Meta string payload too short: {} bits declared, {} bytes present",
                num_bits,
                encoded_data.len()
            ))
        );
        match encoding {
            Encoding::LowerSpecial => self.decode_lower_special(encoded_data, num_bits),
            Encoding::LowerUpperDigitSpecial => {
                self.decode_lower_upper_digit_special(encoded_data, num_bits)
            }
            Encoding::FirstToLowerSpecial => {
                self.decode_rep_first_lower_special(encoded_data, num_bits)
            }
            Encoding::AllToLowerSpecial => {
                self.decode_rep_all_to_lower_special(encoded_data, num_bits)
            }
            Encoding::Utf8 => Ok(String::from_utf8_lossy(encoded_data).into_owned()),
        }
    }

    /// Read `u8(encoding)`, `varuint32(num_bits)` and the payload from the
    /// wire and decode it.
    pub fn read_from(&self, reader: &mut Reader) -> Result<MetaString, Error> {
        let encoding_value = reader.read_u8()?;
        let encoding = Encoding::try_from(encoding_value).map_err(|_| {
            Error::encoding_error(format!(
                "Unknown meta string encoding: {encoding_value}"
            ))
        })?;
        let num_bits = reader.read_varuint32()? as usize;
        let bytes = reader.read_bytes(num_bits.div_ceil(8))?;
        let original = self.decode(bytes, encoding, num_bits)?;
        Ok(MetaString {
            num_chars: original.chars().count(),
            original,
            encoding,
            bytes: bytes.to_vec(),
            num_bits,
            special_char1: self.special_char1,
            special_char2: self.special_char2,
        })
    }

    // Inverse of the MSB-first packing: pull `bits_per_char` bits per symbol
    // until `num_bits` is exhausted.
    fn decode_values(
        &self,
        data: &[u8],
        bits_per_char: usize,
        num_bits: usize,
    ) -> Vec<u8> {
        let mut values = Vec::with_capacity(num_bits / bits_per_char);
        let mut bit_index = 0;
        while bit_index + bits_per_char <= num_bits {
            let mut value = 0u8;
            for _ in 0..bits_per_char {
                let bit = (data[bit_index / 8] >> (7 - bit_index % 8)) & 1;
                value = (value << 1) | bit;
                bit_index += 1;
            }
            values.push(value);
        }
        values
    }

    fn decode_lower_special(&self, data: &[u8], num_bits: usize) -> Result<String, Error> {
        self.decode_values(data, 5, num_bits)
            .into_iter()
            .map(|v| self.decode_lower_special_char(v))
            .collect()
    }

    fn decode_lower_upper_digit_special(
        &self,
        data: &[u8],
        num_bits: usize,
    ) -> Result<String, Error> {
        self.decode_values(data, 6, num_bits)
            .into_iter()
            .map(|v| self.decode_lower_upper_digit_special_char(v))
            .collect()
    }

    fn decode_rep_first_lower_special(
        &self,
        data: &[u8],
        num_bits: usize,
    ) -> Result<String, Error> {
        let decoded = self.decode_lower_special(data, num_bits)?;
        let mut chars = decoded.chars();
        match chars.next() {
            Some(first) => {
                let mut result = first.to_ascii_uppercase().to_string();
                result.extend(chars);
                Ok(result)
            }
            None => Ok(decoded),
        }
    }

    // A '|' escape capitalizes the following character.
    fn decode_rep_all_to_lower_special(
        &self,
        data: &[u8],
        num_bits: usize,
    ) -> Result<String, Error> {
        let decoded = self.decode_lower_special(data, num_bits)?;
        let mut result = String::with_capacity(decoded.len());
        let mut chars = decoded.chars();
        while let Some(c) = chars.next() {
            if c == '|' {
                if let Some(next) = chars.next() {
                    result.push(next.to_ascii_uppercase());
                }
            } else {
                result.push(c);
            }
        }
        Ok(result)
    }

    fn decode_lower_special_char(&self, value: u8) -> Result<char, Error> {
        match value {
            0..=25 => Ok((b'a' + value) as char),
            26 => Ok('.'),
            27 => Ok('_'),
            28 => Ok('$'),
            29 => Ok('|'),
            _ => Err(Error::encoding_error(format!(
                "Invalid character value for LOWER_SPECIAL decoding: {value}"
            ))),
        }
    }

    fn decode_lower_upper_digit_special_char(&self, value: u8) -> Result<char, Error> {
        match value {
            0..=25 => Ok((b'a' + value) as char),
            26..=51 => Ok((b'A' + value - 26) as char),
            52..=61 => Ok((b'0' + value - 52) as char),
            62 => Ok(self.special_char1),
            63 => Ok(self.special_char2),
            _ => Err(Error::encoding_error(format!(
                "Invalid character value for LOWER_UPPER_DIGIT_SPECIAL decoding: {value}"
            ))),
        }
    }
}
