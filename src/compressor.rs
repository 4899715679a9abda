use std::fmt;

use crate::{
    bits::{BitReader, RecordReader},
    coder::{Decoder, Encoder, ProbabilityInterval},
    error::CodecError,
    model::Model,
    record::{CompressedRecord, PAYLOAD_LENGTH_MAX},
    state::ReadState,
};


/// Target weight a rebase scales the ensemble around.
const DEFAULT_WEIGHT: u32 = 32;


fn gcd(mut lhs: u8, mut rhs: u8) -> u8 {
    while rhs != 0 {
        let rem = lhs % rhs;
        lhs = rhs;
        rhs = rem;
    }
    lhs
}


/// An ordered bag of weighted models mixed into a single bit
/// probability. At most one model per context value; the list of
/// (context, weight) pairs is the signature the container stores.
#[derive(Clone, Default)]
pub struct Compressor {
    models: Vec<Model>,
}
impl Compressor {
    pub fn new() -> Compressor {
        Compressor::default()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Add a model. Adding with weight 0 is equal to removing; adding
    /// an existing context with a new weight updates it. Returns true
    /// if the compressor changed.
    pub fn add_model(&mut self, context: u8, weight: u8) -> bool {
        for i in 0..self.models.len() {
            if self.models[i].matches(context) {
                if weight == 0 {
                    self.models.remove(i);
                    return true;
                }
                if self.models[i].weight() != weight {
                    self.models[i].set_weight(weight);
                    return true;
                }
                return false;
            }
        }
        if weight == 0 {
            return false;
        }
        self.models.push(Model::new(context, weight));
        true
    }

    /// A deep copy with add_model applied, or None if the addition
    /// would not change anything.
    pub fn mutate(&self, context: u8, weight: u8) -> Option<Compressor> {
        let mut copy = self.clone();
        if copy.add_model(context, weight) {
            Some(copy)
        }
        else {
            None
        }
    }

    /// Mixed probability of the target bit under the current state.
    ///
    /// Models without a prediction for this state contribute nothing.
    /// If no model has data the mix falls back to uniform. A total of
    /// exactly 1 cannot occur while every predictor starts at (1,1),
    /// so it signals a bug. The decoder always asks for the bit = 1
    /// partition and derives the decoded bit from it.
    pub fn probability(&self, state: &ReadState, bit: bool) -> Result<ProbabilityInterval, CodecError> {
        let mut sum_one: u64 = 0;
        let mut sum_zero: u64 = 0;

        for model in self.models.iter() {
            if let Some((one, zero)) = model.predict(state) {
                sum_one += u64::from(model.weight()) * u64::from(one);
                sum_zero += u64::from(model.weight()) * u64::from(zero);
            }
        }

        let mut total = sum_one + sum_zero;
        if total == 1 {
            return Err(CodecError::Internal(
                format!("illegal total value counts: {sum_one} / {sum_zero}")
            ));
        }
        if total == 0 {
            sum_zero = 1;
            total = 2;
        }

        if bit {
            Ok(
                ProbabilityInterval {
                    lower:        sum_zero,
                    upper:        total,
                    denominator:  total,
                }
            )
        }
        else {
            Ok(
                ProbabilityInterval {
                    lower:        0,
                    upper:        sum_zero,
                    denominator:  total,
                }
            )
        }
    }

    /// Record an observed bit in every model.
    pub fn update(&mut self, state: &ReadState, bit: bool) {
        for model in self.models.iter_mut() {
            model.update(state, bit);
        }
    }

    /// Empty every model's predictor table.
    pub fn reset(&mut self) {
        for model in self.models.iter_mut() {
            model.reset();
        }
    }

    /// Rebase weights: divide by their common divisor, and with rescale
    /// set, multiply back so the ensemble sits squarely around
    /// DEFAULT_WEIGHT. Mixing depends only on weight ratios, so the
    /// coded stream of a record produced before the rebase stays valid
    /// under the rebased weights. Returns true if any weight changed.
    pub fn rebase(&mut self, rescale: bool) -> bool {
        if self.models.is_empty() {
            return false;
        }

        let before: Vec<u8> = self.models.iter().map(|m| m.weight()).collect();

        let mut divisor = before[0];
        for &weight in before[1..].iter() {
            divisor = gcd(divisor, weight);
        }

        let mut weights: Vec<u32> = before.iter()
            .map(|&w| u32::from(w / divisor))
            .collect();

        let mut min = weights[0];
        let mut max = weights[0];
        for &weight in weights[1..].iter() {
            min = min.min(weight);
            max = max.max(weight);
        }

        if rescale {
            // Fit the spread around the default weight, minimising the
            // squared distance of min and max from it.
            let mut best_mul = 1;
            let mut best_err = u64::MAX;

            for mul in 1..=DEFAULT_WEIGHT {
                let min_mul = min * mul;
                let max_mul = max * mul;
                if max_mul > 255 {
                    break;
                }
                if min_mul <= DEFAULT_WEIGHT && DEFAULT_WEIGHT <= max_mul {
                    let err_up = u64::from(DEFAULT_WEIGHT - min_mul);
                    let err_down = u64::from(max_mul - DEFAULT_WEIGHT);
                    let err = err_up * err_up + err_down * err_down;
                    if err < best_err {
                        best_err = err;
                        best_mul = mul;
                    }
                }
            }

            for weight in weights.iter_mut() {
                *weight *= best_mul;
            }

            // A minimum stuck at 1 can never be halved relative to the
            // rest; double everything while there is room.
            if min * best_mul == 1 && max * best_mul * 2 <= 255 {
                for weight in weights.iter_mut() {
                    *weight *= 2;
                }
            }
        }

        let mut changed = false;
        for (model, &weight) in self.models.iter_mut().zip(weights.iter()) {
            if u32::from(model.weight()) != weight {
                model.set_weight(weight as u8);
                changed = true;
            }
        }
        changed
    }

    /// One full trial encode of the payload with the current ensemble.
    ///
    /// Resets every model, then codes each payload bit with the mixed
    /// probability, updating the models after each bit. Aborts once the
    /// record outgrows size_limit; the partial record is strictly worse
    /// than the limit and gets discarded by the caller.
    pub fn compress_run(&mut self, data: &[u8], size_limit: u64) -> Result<CompressedRecord, CodecError> {
        let payload_bits = data.len() as u64 * 8;
        if payload_bits > u64::from(PAYLOAD_LENGTH_MAX) {
            return Err(CodecError::InputTooLarge(payload_bits));
        }

        // Models must be present in the record even if no data is.
        let mut record = CompressedRecord::new(payload_bits as u32, self);
        if data.is_empty() {
            return Ok(record);
        }

        self.reset();
        let mut reader = BitReader::new(data);
        let mut encoder = Encoder::new();

        loop {
            let actual = reader.current_bit();
            let prob = self.probability(reader.state(), actual)?;
            encoder.encode(record.coded_mut(), prob)?;
            self.update(reader.state(), actual);

            if record.size_bits() > size_limit {
                return Ok(record);
            }
            if !reader.advance() {
                break;
            }
        }
        encoder.finish(record.coded_mut());
        Ok(record)
    }

    /// Decode a record back into payload bytes. The model list in the
    /// record header rebuilds the ensemble; the decoder then replays
    /// the exact prediction and update sequence of the encoder.
    pub fn extract(record: &CompressedRecord) -> Result<Vec<u8>, CodecError> {
        let payload_bits = record.payload_bit_length() as usize;
        let mut out = Vec::with_capacity(payload_bits / 8);
        if payload_bits == 0 {
            return Ok(out);
        }

        let mut compressor = Compressor::new();
        for entry in record.models() {
            compressor.add_model(entry.context, entry.weight);
        }

        let mut reader = RecordReader::new(record.coded());
        let mut decoder = Decoder::new(&mut reader);
        let mut state = ReadState::new();
        let mut byte = 0u8;
        let mut bits_done = 0;

        loop {
            let prob = compressor.probability(&state, true)?;
            let bit = decoder.decode(&mut reader, prob)?;

            byte = (byte << 1) | u8::from(bit);
            bits_done += 1;
            if bits_done & 7 == 0 {
                out.push(byte);
                byte = 0;
            }

            if bits_done == payload_bits {
                return Ok(out);
            }

            compressor.update(&state, bit);
            state.advance_with(bit);
        }
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ ")?;
        for (i, model) in self.models.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{model}")?;
        }
        write!(f, " ]")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_model_semantics() {
        let mut cmp = Compressor::new();
        assert!(cmp.add_model(1, 16));       // new
        assert!(!cmp.add_model(1, 16));      // no change
        assert!(cmp.add_model(1, 32));       // weight update
        assert!(!cmp.add_model(2, 0));       // removing an absent model
        assert!(cmp.add_model(1, 0));        // removal
        assert_eq!(cmp.model_count(), 0);
    }

    #[test]
    fn mutate_copies_or_declines() {
        let mut cmp = Compressor::new();
        cmp.add_model(3, 8);
        assert!(cmp.mutate(3, 8).is_none());
        let mutated = cmp.mutate(3, 9).unwrap();
        assert_eq!(mutated.models()[0].weight(), 9);
        assert_eq!(cmp.models()[0].weight(), 8);
    }

    #[test]
    fn cold_mix_is_uniform() {
        let cmp = Compressor::new();
        let state = ReadState::new();
        let prob = cmp.probability(&state, true).unwrap();
        assert_eq!(prob, ProbabilityInterval { lower: 1, upper: 2, denominator: 2 });
        let prob = cmp.probability(&state, false).unwrap();
        assert_eq!(prob, ProbabilityInterval { lower: 0, upper: 1, denominator: 2 });
    }

    #[test]
    fn mix_weighs_model_counts() {
        let mut cmp = Compressor::new();
        cmp.add_model(1, 2);
        let state = ReadState::new();
        cmp.update(&state, true);
        cmp.update(&state, true);
        // Counts are now (3,1), weight 2: sums 6 and 2.
        let prob = cmp.probability(&state, true).unwrap();
        assert_eq!(prob, ProbabilityInterval { lower: 2, upper: 8, denominator: 8 });
    }

    #[test]
    fn rebase_scales_down_by_common_divisor() {
        let mut cmp = Compressor::new();
        cmp.add_model(1, 100);
        cmp.add_model(2, 40);
        assert!(cmp.rebase(false));
        let weights: Vec<u8> = cmp.models().iter().map(|m| m.weight()).collect();
        assert_eq!(weights, vec![5, 2]);
        assert!(!cmp.rebase(false));
    }

    #[test]
    fn rebase_rescales_single_model_to_default() {
        let mut cmp = Compressor::new();
        cmp.add_model(7, 3);
        assert!(cmp.rebase(true));
        assert_eq!(cmp.models()[0].weight(), 32);
    }

    #[test]
    fn rebase_preserves_ratios() {
        let mut cmp = Compressor::new();
        cmp.add_model(1, 30);
        cmp.add_model(2, 60);
        cmp.rebase(true);
        let w: Vec<u32> = cmp.models().iter().map(|m| u32::from(m.weight())).collect();
        assert_eq!(w[1], w[0] * 2);
        assert!(w.iter().all(|&w| (1..=255).contains(&w)));
    }

    #[test]
    fn rebase_unsticks_minimum_weight_one() {
        let mut cmp = Compressor::new();
        cmp.add_model(1, 1);
        cmp.add_model(2, 100);
        assert!(cmp.rebase(true));
        let weights: Vec<u8> = cmp.models().iter().map(|m| m.weight()).collect();
        assert_eq!(weights, vec![2, 200]);
    }

    #[test]
    fn empty_payload_run() {
        let mut cmp = Compressor::new();
        cmp.add_model(1, 16);
        let record = cmp.compress_run(&[], u64::MAX).unwrap();
        assert_eq!(record.payload_bit_length(), 0);
        assert_eq!(record.coded().bit_length(), 0);
        assert_eq!(record.models().len(), 1);
        assert_eq!(Compressor::extract(&record).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn fixed_ensemble_round_trip() {
        let data = b"abracadabra";
        let mut cmp = Compressor::new();
        cmp.add_model(1, 32);
        cmp.add_model(3, 16);
        let record = cmp.compress_run(data, u64::MAX).unwrap();
        assert_eq!(record.payload_bit_length(), 88);
        assert_eq!(Compressor::extract(&record).unwrap(), data);
    }

    #[test]
    fn single_byte_round_trip() {
        let mut cmp = Compressor::new();
        cmp.add_model(1, 1);
        let record = cmp.compress_run(b"A", u64::MAX).unwrap();
        assert_eq!(record.payload_bit_length(), 8);
        assert_eq!(Compressor::extract(&record).unwrap(), b"A");
    }

    #[test]
    fn runs_are_deterministic() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut cmp = Compressor::new();
        cmp.add_model(1, 20);
        cmp.add_model(2, 10);
        let first = cmp.compress_run(data, u64::MAX).unwrap();
        let second = cmp.compress_run(data, u64::MAX).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn size_limit_cuts_run_short() {
        let data = [0x55u8; 64];
        let mut cmp = Compressor::new();
        cmp.add_model(1, 16);
        let full = cmp.compress_run(&data, u64::MAX).unwrap();
        let limit = full.size_bits() / 2;
        let partial = cmp.compress_run(&data, limit).unwrap();
        assert!(partial.size_bits() > limit);
        assert!(partial.size_bits() < full.size_bits());
    }

    #[test]
    fn header_swap_after_rebase_still_decodes() {
        let data = b"banana banana banana";
        let mut cmp = Compressor::new();
        cmp.add_model(1, 4);
        cmp.add_model(2, 8);
        let mut record = cmp.compress_run(data, u64::MAX).unwrap();

        let mut rebased = cmp.clone();
        assert!(rebased.rebase(true));
        record.replace_models(&rebased);

        assert_eq!(Compressor::extract(&record).unwrap(), data);
    }

    #[test]
    fn oversized_payload_rejected() {
        let data = vec![0u8; (1 << 21) + 1];
        let mut cmp = Compressor::new();
        cmp.add_model(1, 16);
        assert!(matches!(
            cmp.compress_run(&data, u64::MAX),
            Err(CodecError::InputTooLarge(_))
        ));
    }
}
