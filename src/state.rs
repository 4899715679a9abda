/// Rolling view of already consumed input, used to key predictors.
///
/// Tracks the most recent whole bytes and the partially consumed byte
/// under the bit cursor. The encoder drives it through BitReader; the
/// decoder replays the identical updates via advance_with, so both
/// sides key their predictors off the same state at every bit.
#[derive(Clone, Copy, Default)]
pub struct ReadState {
    history:  u64, // Previous whole bytes, most recent in the low byte
    partial:  u8,  // Consumed bits of the current byte, packed MSB-first
    bits:     u8,  // Number of valid bits in partial (0..=7)
}
impl ReadState {
    pub fn new() -> ReadState {
        ReadState::default()
    }

    /// Previous whole bytes, 1st-previous in the least significant byte.
    /// Bytes before the start of the stream read as 0.
    pub fn history(&self) -> u64 {
        self.history
    }

    /// Consumed bits of the byte in progress.
    pub fn partial(&self) -> u8 {
        self.partial
    }

    /// Number of valid bits in partial.
    pub fn bits_in_partial(&self) -> u8 {
        self.bits
    }

    /// Consume one bit. On the eighth bit the completed byte shifts
    /// into history from the low end and partial clears.
    pub fn advance_with(&mut self, bit: bool) {
        if bit {
            self.partial |= 0x80 >> self.bits;
        }
        self.bits += 1;

        if self.bits == 8 {
            self.history = (self.history << 8) | u64::from(self.partial);
            self.partial = 0;
            self.bits = 0;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_enter_history_low_end() {
        let mut state = ReadState::new();
        for byte in [0xA5u8, 0x3C] {
            for i in (0..8).rev() {
                state.advance_with((byte >> i) & 1 == 1);
            }
        }
        assert_eq!(state.history(), 0xA53C);
        assert_eq!(state.partial(), 0);
        assert_eq!(state.bits_in_partial(), 0);
    }

    #[test]
    fn partial_packs_msb_first() {
        let mut state = ReadState::new();
        state.advance_with(true);
        state.advance_with(false);
        state.advance_with(true);
        assert_eq!(state.partial(), 0b1010_0000);
        assert_eq!(state.bits_in_partial(), 3);
        assert_eq!(state.history(), 0);
    }
}
