use std::{
    collections::BTreeMap,
    fmt,
};

use crate::{
    predictor::{PredictorKey, PredictorValue},
    state::ReadState,
};


/// Expand a context bitfield into a byte mask over the history word.
/// Set bit i selects the i+1'th previous byte.
fn context_byte_mask(context: u8) -> u64 {
    let mut mask = 0u64;
    for i in 0..8 {
        if context & (1 << i) != 0 {
            mask |= 0xFF_u64 << (i * 8);
        }
    }
    mask
}


/// One weighted byte-context predictor bank: a context mask choosing
/// which previous bytes key the predictors, an integer mixing weight,
/// and the predictor table itself, populated on first access.
#[derive(Clone)]
pub struct Model {
    context:     u8,
    weight:      u8,
    mask:        u64,
    predictors:  BTreeMap<PredictorKey, PredictorValue>,
}
impl Model {
    pub fn new(context: u8, weight: u8) -> Model {
        Model {
            context,
            weight,
            mask:        context_byte_mask(context),
            predictors:  BTreeMap::new(),
        }
    }

    pub fn context(&self) -> u8 {
        self.context
    }

    pub fn weight(&self) -> u8 {
        self.weight
    }

    pub fn set_weight(&mut self, weight: u8) {
        self.weight = weight;
    }

    pub fn matches(&self, context: u8) -> bool {
        self.context == context
    }

    /// Counts recorded for the current state, or None if this history
    /// has never been seen.
    pub fn predict(&self, state: &ReadState) -> Option<(u32, u32)> {
        let key = PredictorKey::new(state, self.mask, self.context);
        self.predictors.get(&key)
            .map(|value| (value.count_one(), value.count_zero()))
    }

    /// Record an observed bit, creating the predictor at (1,1) on first
    /// access.
    pub fn update(&mut self, state: &ReadState, bit: bool) {
        let key = PredictorKey::new(state, self.mask, self.context);
        self.predictors.entry(key)
            .or_default()
            .update(bit);
    }

    /// Empty the predictor table, retaining context and weight.
    pub fn reset(&mut self) {
        self.predictors.clear();
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{:02x}w{:02x}", self.context, self.weight)
    }
}
