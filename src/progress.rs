use std::time::Instant;

use log::{info, trace};


// Probes per cycle: contexts 1..=255 by weight slots 0..=255.
const PROBES_PER_CYCLE: u32 = 255 * 256;


/// Tracks probe completion within the current search cycle and reports
/// milestones through the log facade. Whether anything is printed is
/// the log consumer's choice.
pub struct Progress {
    probes:   u32,     // Probes finished this cycle
    cycles:   u32,     // Current cycle number
    percent:  u32,     // Last reported percentage
    time:     Instant,
}
impl Progress {
    /// Create a new Progress.
    pub fn new() -> Progress {
        Progress {
            probes:   0,
            cycles:   0,
            percent:  0,
            time:     Instant::now(),
        }
    }

    pub fn begin_cycle(&mut self) {
        self.probes = 0;
        self.percent = 0;
        self.cycles += 1;
    }

    pub fn probe(&mut self) {
        self.probes += 1;
        let percent = self.probes * 100 / PROBES_PER_CYCLE;
        if percent != self.percent {
            self.percent = percent;
            trace!("cycle {}: [ {:3}% ]", self.cycles, percent);
        }
    }

    pub fn end_cycle(&mut self, improved: bool, best_bits: u64) {
        if improved {
            info!("cycle {}: improved, best record {} bits (elapsed: {:.2?})",
                self.cycles, best_bits, self.time.elapsed());
        }
        else {
            info!("cycle {}: no improvement, settling at {} bits (elapsed: {:.2?})",
                self.cycles, best_bits, self.time.elapsed());
        }
    }
}
