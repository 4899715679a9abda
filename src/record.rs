use std::{
    fmt,
    io::Cursor,
};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
    bits::BitVec,
    compressor::Compressor,
    error::CodecError,
};


/// Container header size: model count byte plus payload length field.
const HEADER_BITS: u64 = 8 + 24;

/// Size of one serialized model descriptor.
const MODEL_BITS: u64 = 16;

pub(crate) const PAYLOAD_LENGTH_MAX: u32 = (1 << 24) - 1;


/// One model descriptor in the container header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelEntry {
    pub context:  u8,
    pub weight:   u8,
}


/// In-memory compressed container: the model ensemble that coded the
/// payload, the exact payload bit length, and the coded bit stream.
///
/// Serialized layout, little-endian byte order across multi-byte
/// fields, MSB-first bits within each byte of the coded stream:
///
/// ```text
/// 8 bits   model count
/// 16 bits  per model: context, weight (both nonzero)
/// 24 bits  payload bit length, LSB first across 3 bytes
/// rest     coded bits, zero padded to the next byte boundary
/// ```
#[derive(Clone, Debug, Default)]
pub struct CompressedRecord {
    models:        Vec<ModelEntry>,
    payload_bits:  u32,
    coded:         BitVec,
}
impl CompressedRecord {
    pub fn new(payload_bits: u32, compressor: &Compressor) -> CompressedRecord {
        let mut record = CompressedRecord {
            models:  Vec::new(),
            payload_bits,
            coded:   BitVec::new(),
        };
        record.replace_models(compressor);
        record
    }

    /// Swap the header's model list for the given compressor's. Used
    /// after a rebase; the coded bits stay untouched since mixing only
    /// depends on weight ratios.
    pub fn replace_models(&mut self, compressor: &Compressor) {
        self.models.clear();
        for model in compressor.models() {
            self.models.push(
                ModelEntry {
                    context:  model.context(),
                    weight:   model.weight(),
                }
            );
        }
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    pub fn payload_bit_length(&self) -> u32 {
        self.payload_bits
    }

    /// Exact length of the coded bit stream.
    pub fn coded_bit_length(&self) -> usize {
        self.coded.bit_length()
    }

    pub(crate) fn coded(&self) -> &BitVec {
        &self.coded
    }

    pub(crate) fn coded_mut(&mut self) -> &mut BitVec {
        &mut self.coded
    }

    /// Total size of the serialized container in bits, before padding.
    pub fn size_bits(&self) -> u64 {
        HEADER_BITS
            + self.models.len() as u64 * MODEL_BITS
            + self.coded.bit_length() as u64
    }

    /// Serialize to the container byte format.
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        if self.models.len() > 0xFF {
            return Err(CodecError::InputTooLarge(self.models.len() as u64));
        }
        if self.payload_bits > PAYLOAD_LENGTH_MAX {
            return Err(CodecError::InputTooLarge(u64::from(self.payload_bits)));
        }

        let mut out = Vec::with_capacity(4 + self.models.len() * 2 + self.coded.as_bytes().len());
        out.push(self.models.len() as u8);
        for model in self.models.iter() {
            out.push(model.context);
            out.push(model.weight);
        }
        out.push(self.payload_bits as u8);
        out.push((self.payload_bits >> 8) as u8);
        out.push((self.payload_bits >> 16) as u8);
        out.extend_from_slice(self.coded.as_bytes());
        Ok(out)
    }

    /// Parse a container byte image. A truncated header or a zero
    /// context or weight byte is Corrupt; an empty payload is legal.
    pub fn parse(bytes: &[u8]) -> Result<CompressedRecord, CodecError> {
        let mut cursor = Cursor::new(bytes);

        let model_count = cursor.read_u8()?;
        let mut models = Vec::with_capacity(model_count as usize);
        for _ in 0..model_count {
            let context = cursor.read_u8()?;
            let weight = cursor.read_u8()?;
            if context == 0 || weight == 0 {
                return Err(CodecError::Corrupt(
                    format!("impossible model descriptor: c{context:02x} w{weight:02x}")
                ));
            }
            models.push(ModelEntry { context, weight });
        }

        let payload_bits = cursor.read_u24::<LittleEndian>()?;
        if payload_bits & 7 != 0 {
            return Err(CodecError::Corrupt(
                format!("payload length {payload_bits} is not a whole number of bytes")
            ));
        }

        let pos = cursor.position() as usize;
        let coded = BitVec::from_bytes(bytes[pos..].to_vec());

        // A nonempty payload always comes with coded bits; the encoder
        // flush emits at least two.
        if payload_bits > 0 && coded.bit_length() == 0 {
            return Err(CodecError::Corrupt(
                "no coded bits for a nonempty payload".to_string()
            ));
        }

        Ok(
            CompressedRecord {
                models, payload_bits, coded,
            }
        )
    }
}

impl fmt::Display for CompressedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Models({}):", self.models.len())?;
        for model in self.models.iter() {
            write!(f, " c{:02x}w{:02x}", model.context, model.weight)?;
        }
        write!(f, "; Data({} bits): {} coded bits, {} total",
            self.payload_bits,
            self.coded.bit_length(),
            self.size_bits()
        )
    }
}

/// Coded streams compare in their padded byte form; the container
/// stores no finer bit count, so that is the information a round trip
/// through serialization preserves.
impl PartialEq for CompressedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.models == other.models
            && self.payload_bits == other.payload_bits
            && self.coded.as_bytes() == other.coded.as_bytes()
    }
}
impl Eq for CompressedRecord {}


#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CompressedRecord {
        let mut record = CompressedRecord::default();
        record.models.push(ModelEntry { context: 1, weight: 32 });
        record.models.push(ModelEntry { context: 3, weight: 7 });
        record.payload_bits = 40;
        for i in 0..13 {
            record.coded.push(i % 3 == 0);
        }
        record
    }

    #[test]
    fn serialize_parse_round_trip() {
        let record = sample_record();
        let bytes = record.serialize().unwrap();
        let parsed = CompressedRecord::parse(&bytes).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn serialized_layout() {
        let record = sample_record();
        let bytes = record.serialize().unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..5], &[1, 32, 3, 7]);
        // 40 = 0x000028, LSB first.
        assert_eq!(&bytes[5..8], &[0x28, 0x00, 0x00]);
        assert_eq!(bytes.len(), 8 + 2);
    }

    #[test]
    fn empty_record_round_trips() {
        let record = CompressedRecord::default();
        let bytes = record.serialize().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        let parsed = CompressedRecord::parse(&bytes).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.payload_bit_length(), 0);
    }

    #[test]
    fn truncated_model_list_is_corrupt() {
        // Header claims five models but nothing follows.
        let bytes = [5u8];
        assert!(matches!(
            CompressedRecord::parse(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn missing_length_field_is_corrupt() {
        let bytes = [1u8, 1, 32, 0x10];
        assert!(matches!(
            CompressedRecord::parse(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn zero_model_bytes_are_corrupt() {
        let bytes = [1u8, 0, 32, 8, 0, 0];
        assert!(matches!(
            CompressedRecord::parse(&bytes),
            Err(CodecError::Corrupt(_))
        ));
        let bytes = [1u8, 1, 0, 8, 0, 0];
        assert!(matches!(
            CompressedRecord::parse(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn nonempty_payload_without_coded_bits_is_corrupt() {
        let bytes = [0u8, 8, 0, 0];
        assert!(matches!(
            CompressedRecord::parse(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn ragged_payload_length_is_corrupt() {
        let bytes = [0u8, 13, 0, 0];
        assert!(matches!(
            CompressedRecord::parse(&bytes),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn oversized_payload_rejected_on_write() {
        let mut record = CompressedRecord::default();
        record.payload_bits = 1 << 24;
        assert!(matches!(
            record.serialize(),
            Err(CodecError::InputTooLarge(_))
        ));
    }

    #[test]
    fn size_bits_counts_header_models_and_stream() {
        let record = sample_record();
        assert_eq!(record.size_bits(), 32 + 2 * 16 + 13);
    }
}
