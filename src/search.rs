use std::{
    num::NonZeroUsize,
    sync::Arc,
    thread,
};

use log::{debug, info};

use crate::{
    compressor::Compressor,
    error::CodecError,
    progress::Progress,
    record::{CompressedRecord, PAYLOAD_LENGTH_MAX},
    threads::{ThreadPool, TrialQueue},
};


/// Exhaustive parallel search over (context, weight) mutations of the
/// best compressor found so far.
///
/// One cycle enumerates every context 1..=255 against every weight
/// slot 0..=255 (slot 0 probes removal of the context). Probes run on
/// the worker pool, but their results are re-ordered back into
/// enumeration order before any adoption decision, so the search is a
/// pure function of the input: thread count and completion timing
/// cannot change the outcome. A trial is adopted only when strictly
/// smaller than the incumbent, which breaks ties toward the earliest
/// candidate in enumeration order.
pub struct SearchEngine {
    data:      Arc<Vec<u8>>,
    current:   Compressor,
    next:      Option<Compressor>,
    best:      Option<CompressedRecord>,
    pool:      ThreadPool,
    progress:  Progress,
}
impl SearchEngine {
    /// Create a new SearchEngine. A thread count of 0 means hardware
    /// concurrency.
    pub fn new(data: Vec<u8>, threads: usize) -> Result<SearchEngine, CodecError> {
        let payload_bits = data.len() as u64 * 8;
        if payload_bits > u64::from(PAYLOAD_LENGTH_MAX) {
            return Err(CodecError::InputTooLarge(payload_bits));
        }

        let size = if threads == 0 {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        }
        else {
            threads
        };

        Ok(
            SearchEngine {
                data:      Arc::new(data),
                current:   Compressor::new(),
                next:      None,
                best:      None,
                pool:      ThreadPool::new(size),
                progress:  Progress::new(),
            }
        )
    }

    /// Run compress cycles until one fails to improve, then hand out
    /// the best record.
    pub fn run(mut self) -> Result<CompressedRecord, CodecError> {
        while self.compress_cycle()? {}
        self.best.take().ok_or_else(||
            CodecError::Internal("search finished without a record".to_string())
        )
    }

    /// One full enumeration of the mutation space against the current
    /// compressor. Returns true if a candidate was promoted.
    fn compress_cycle(&mut self) -> Result<bool, CodecError> {
        self.progress.begin_cycle();

        // The base is frozen for the whole cycle; workers clone from it.
        let base = Arc::new(self.current.clone());
        let mut queue = TrialQueue::new();
        let mut dispatched: u32 = 0;
        let mut completed: u32 = 0;

        for context in 1..=255u8 {
            for weight_slot in 0..=255u8 {
                // Wait for a free worker before queueing more.
                while (dispatched - completed) as usize >= self.pool.size() {
                    queue.push(self.pool.recv_trial()?);
                    completed += 1;
                    self.drain(&mut queue)?;
                }

                let size_limit = self.best.as_ref()
                    .map_or(u64::MAX, |best| best.size_bits());

                self.pool.probe(
                    dispatched,
                    Arc::clone(&base),
                    Arc::clone(&self.data),
                    context,
                    weight_slot,
                    size_limit,
                );
                dispatched += 1;
            }
        }

        // Wait until every probe of the cycle has reported back.
        while completed < dispatched {
            queue.push(self.pool.recv_trial()?);
            completed += 1;
            self.drain(&mut queue)?;
        }

        self.finish_cycle()
    }

    /// Feed every trial whose enumeration turn has come into the
    /// adoption decision.
    fn drain(&mut self, queue: &mut TrialQueue) -> Result<(), CodecError> {
        while let Some(trial) = queue.try_next() {
            if let Some((candidate, record)) = trial.outcome? {
                self.update(candidate, record)?;
            }
            self.progress.probe();
        }
        Ok(())
    }

    /// Adopt a strictly better trial as the next compressor and best
    /// record, then prove the record still decodes to the input.
    fn update(&mut self, candidate: Compressor, record: CompressedRecord) -> Result<(), CodecError> {
        let better = match self.best.as_ref() {
            Some(best) => record.size_bits() < best.size_bits(),
            None => true,
        };
        if better {
            info!("{} -> {} bits", candidate, record.size_bits());
            self.next = Some(candidate);
            self.best = Some(record);
            self.verify_best()?;
        }
        Ok(())
    }

    /// Promote the cycle's winner, or settle the current weights. A
    /// weight-changing rebase rewrites the best record's header (the
    /// coded bits stay valid, mixing only sees weight ratios) and is
    /// re-verified by decoding.
    fn finish_cycle(&mut self) -> Result<bool, CodecError> {
        let improved = match self.next.take() {
            Some(next) => {
                self.current = next;
                // Predictor tables are per-run state; drop them so the
                // next cycle's base clones stay small.
                self.current.reset();

                if self.current.rebase(true) {
                    debug!("{} (rebase)", self.current);
                    self.apply_weights()?;
                }
                true
            }
            None => {
                if self.current.rebase(false) {
                    debug!("{} (downscale)", self.current);
                    self.apply_weights()?;
                }
                false
            }
        };

        let best_bits = self.best.as_ref().map_or(0, |best| best.size_bits());
        self.progress.end_cycle(improved, best_bits);
        Ok(improved)
    }

    fn apply_weights(&mut self) -> Result<(), CodecError> {
        if let Some(best) = self.best.as_mut() {
            best.replace_models(&self.current);
        }
        self.verify_best()
    }

    /// Decoding the adopted record must reproduce the input exactly.
    fn verify_best(&self) -> Result<(), CodecError> {
        if let Some(best) = self.best.as_ref() {
            let decoded = Compressor::extract(best)?;
            if decoded != *self.data {
                return Err(CodecError::Internal(
                    "best record no longer decodes to the input".to_string()
                ));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_input_is_rejected_up_front() {
        let data = vec![0u8; 1 << 21];
        assert!(matches!(
            SearchEngine::new(data, 1),
            Err(CodecError::InputTooLarge(_))
        ));
    }

    #[test]
    fn empty_input_settles_on_empty_record() {
        let engine = SearchEngine::new(Vec::new(), 2).unwrap();
        let record = engine.run().unwrap();
        assert_eq!(record.models().len(), 0);
        assert_eq!(record.payload_bit_length(), 0);
        assert_eq!(record.coded().bit_length(), 0);
    }
}
