use crate::{
    bits::{BitVec, RecordReader},
    error::CodecError,
};

// Adapted from Dr. Dobbs arithmetic coder example:
// http://www.drdobbs.com/cpp/data-compression-with-arithmetic-encodin/240169251?pgno=2

/// Bits of precision in coding.
pub const PRECISION_BITS: u32 = 31;

/// Maximum value for coding.
pub const CODE_MAX: u32 = (1 << PRECISION_BITS) - 1;

/// Half of the code space.
pub const CODE_HALF: u32 = 1 << (PRECISION_BITS - 1);

/// Lower limit for renormalization (1/4).
pub const CODE_LOW: u32 = 1 << (PRECISION_BITS - 2);

/// High limit for renormalization (3/4).
pub const CODE_HIGH: u32 = CODE_LOW + CODE_HALF;


/// Sub-interval [lower, upper) of [0, denominator) assigned to the bit
/// being coded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbabilityInterval {
    pub lower:        u64,
    pub upper:        u64,
    pub denominator:  u64,
}
impl ProbabilityInterval {
    /// The complementary portion below lower, i.e. the zero bit's
    /// sub-interval of the canonical partition.
    pub fn lower_portion(self) -> ProbabilityInterval {
        ProbabilityInterval {
            lower:        0,
            upper:        self.lower,
            denominator:  self.denominator,
        }
    }
}


/// Narrow [low, high] to the given sub-interval. Weighted count sums
/// exceed 32 bits, so the products run in 128 bit arithmetic.
fn narrow(low: u32, high: u32, prob: &ProbabilityInterval) -> (u32, u32) {
    let range = u128::from(high - low) + 1;
    let den = u128::from(prob.denominator);
    let new_low  = u128::from(low) + range * u128::from(prob.lower) / den;
    let new_high = u128::from(low) + range * u128::from(prob.upper) / den - 1;
    (new_low as u32, new_high as u32)
}


/// Renormalising arithmetic encoder. Bits whose value still depends on
/// an unresolved carry are tracked in pending and emitted, inverted,
/// after the next definite bit.
pub struct Encoder {
    high:     u32, // Right endpoint of range
    low:      u32, // Left endpoint of range
    pending:  u32, // Carry-deferred bits
}
impl Encoder {
    pub fn new() -> Encoder {
        Encoder {
            high:     CODE_MAX,
            low:      0,
            pending:  0,
        }
    }

    /// Code one bit, given the sub-interval the actual bit occupies.
    pub fn encode(&mut self, out: &mut BitVec, prob: ProbabilityInterval) -> Result<(), CodecError> {
        if self.low >= self.high {
            return Err(CodecError::Internal(
                format!("range inconsistency: {} / {}", self.low, self.high)
            ));
        }

        let (low, high) = narrow(self.low, self.high, &prob);
        self.low = low;
        self.high = high;

        loop {
            if self.high < CODE_HALF {
                self.emit(out, false);
            }
            else if self.low >= CODE_HALF {
                self.emit(out, true);
                self.low -= CODE_HALF;
                self.high -= CODE_HALF;
            }
            else if self.low >= CODE_LOW && self.high < CODE_HIGH {
                self.pending += 1;
                self.low -= CODE_LOW;
                self.high -= CODE_LOW;
            }
            else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
        }
        Ok(())
    }

    /// Flush after the last input bit. One more definite bit pins the
    /// final interval so that any continuation of the stream decodes to
    /// the same payload.
    pub fn finish(&mut self, out: &mut BitVec) {
        self.pending += 1;
        let bit = self.low >= CODE_LOW;
        self.emit(out, bit);
    }

    fn emit(&mut self, out: &mut BitVec, bit: bool) {
        out.push(bit);
        while self.pending > 0 {
            out.push(!bit);
            self.pending -= 1;
        }
    }
}


/// Renormalising arithmetic decoder. Mirrors the encoder's interval
/// updates exactly; value holds the next PRECISION_BITS of the stream.
pub struct Decoder {
    high:   u32,
    low:    u32,
    value:  u32, // Sliding window of compressed data
}
impl Decoder {
    /// Prefill value with exactly PRECISION_BITS stream bits.
    pub fn new(reader: &mut RecordReader<'_>) -> Decoder {
        let mut value = 0u32;
        for _ in 0..PRECISION_BITS {
            value = (value << 1) | u32::from(reader.next_bit());
        }
        Decoder {
            high: CODE_MAX,
            low: 0,
            value,
        }
    }

    /// Decode one bit given the canonical (bit = 1) partition.
    pub fn decode(&mut self, reader: &mut RecordReader<'_>, prob: ProbabilityInterval) -> Result<bool, CodecError> {
        if self.low >= self.high {
            return Err(CodecError::Corrupt(
                format!("range inconsistency: {} / {} / {}", self.low, self.value, self.high)
            ));
        }

        let range = u128::from(self.high - self.low) + 1;
        let prediction =
            (u128::from(self.value - self.low + 1) * u128::from(prob.denominator) - 1) / range;
        let bit = prediction >= u128::from(prob.lower);

        let interval = if bit { prob } else { prob.lower_portion() };
        let (low, high) = narrow(self.low, self.high, &interval);
        self.low = low;
        self.high = high;

        if self.value < self.low || self.value > self.high {
            return Err(CodecError::Corrupt(
                format!("range inconsistency: {} / {} / {}", self.low, self.value, self.high)
            ));
        }

        loop {
            if self.high < CODE_HALF {
                // Shift only.
            }
            else if self.low >= CODE_HALF {
                self.low -= CODE_HALF;
                self.high -= CODE_HALF;
                self.value -= CODE_HALF;
            }
            else if self.low >= CODE_LOW && self.high < CODE_HIGH {
                self.low -= CODE_LOW;
                self.high -= CODE_LOW;
                self.value -= CODE_LOW;
            }
            else {
                break;
            }
            self.low <<= 1;
            self.high = (self.high << 1) | 1;
            self.value = (self.value << 1) | u32::from(reader.next_bit());
        }
        Ok(bit)
    }
}
