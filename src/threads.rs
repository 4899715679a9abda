use std::{
    thread::{self, JoinHandle},
    sync::{
        mpsc::{self, Sender, Receiver},
        Arc, Mutex,
    },
};

use crate::{
    compressor::Compressor,
    error::CodecError,
    record::CompressedRecord,
};

pub enum Message {
    NewJob(Job),
    Terminate,
}


type Job = Box<dyn FnOnce() -> Trial + Send + 'static>;
type SharedReceiver = Arc<Mutex<Receiver<Message>>>;


/// Result of one probe: the enumeration id it was dispatched under, and
/// the candidate plus its trial record if the mutation changed the
/// compressor at all.
pub struct Trial {
    pub id:       u32,
    pub outcome:  Result<Option<(Compressor, CompressedRecord)>, CodecError>,
}


/// A threadpool spawns a set number of threads and hands probe jobs to
/// idle ones, where a job mutates the cycle's base compressor and runs
/// one trial encode. Finished trials flow back through the results
/// channel; waiting on it is how the engine sleeps until a worker is
/// free again.
pub struct ThreadPool {
    threads:  Vec<Thread>,
    sndr:     Sender<Message>,
    results:  Receiver<Trial>,
    size:     usize,
}
impl ThreadPool {
    /// Create a new ThreadPool.
    pub fn new(size: usize) -> ThreadPool {
        let (sndr, rcvr) = mpsc::channel();
        let (trial_sndr, results) = mpsc::channel();
        let rcvr: SharedReceiver = Arc::new(Mutex::new(rcvr));
        let mut threads = Vec::with_capacity(size);

        for _ in 0..size {
            threads.push(
                Thread::new(Arc::clone(&rcvr), trial_sndr.clone())
            );
        }
        ThreadPool { threads, sndr, results, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue one probe. The worker applies the (context, weight)
    /// mutation to the base compressor and trial-encodes the payload,
    /// aborting once the attempt outgrows the dispatch-time size limit.
    pub fn probe(
        &self,
        id: u32,
        base: Arc<Compressor>,
        data: Arc<Vec<u8>>,
        context: u8,
        weight: u8,
        size_limit: u64,
    ) {
        self.sndr.send(
            Message::NewJob(
                Box::new(move || {
                    let outcome = match base.mutate(context, weight) {
                        Some(mut candidate) => {
                            candidate.compress_run(&data, size_limit)
                                .map(|record| Some((candidate, record)))
                        }
                        None => Ok(None),
                    };
                    Trial { id, outcome }
                })
            )
        ).unwrap();
    }

    /// Wait for the next finished trial, in completion order.
    pub fn recv_trial(&self) -> Result<Trial, CodecError> {
        self.results.recv().map_err(|_|
            CodecError::Internal("worker pool disconnected".to_string())
        )
    }
}

/// Send a terminate message to every spawned thread and join all handles.
impl Drop for ThreadPool {
    fn drop(&mut self) {
        for _ in &self.threads {
            self.sndr.send(Message::Terminate).unwrap();
        }

        for thread in &mut self.threads {
            if let Some(handle) = thread.handle.take() {
                handle.join().unwrap();
            }
        }
    }
}


/// A thread and associated handle. A thread receives a probe job,
/// runs it, and sends the finished trial back to the engine.
struct Thread {
    handle: Option<JoinHandle<()>>,
}
impl Thread {
    fn new(rcvr: SharedReceiver, results: Sender<Trial>) -> Thread {
        let handle = thread::spawn(move || loop {
            let message = rcvr.lock().unwrap().recv().unwrap();

            match message {
                Message::NewJob(job) => {
                    let trial = job();
                    if results.send(trial).is_err() {
                        break;
                    }
                }
                Message::Terminate => { break; }
            }
        });
        Thread { handle: Some(handle) }
    }
}


/// Stores finished trials. Adoption decisions must be made in the order
/// probes were dispatched, not the order workers finish, so trials wait
/// here until theirs is the next id out.
pub struct TrialQueue {
    trials:    Vec<Trial>,
    next_out:  u32,
}
impl TrialQueue {
    /// Create a new TrialQueue.
    pub fn new() -> TrialQueue {
        TrialQueue {
            trials:    Vec::new(),
            next_out:  0,
        }
    }

    pub fn push(&mut self, trial: Trial) {
        self.trials.push(trial);
    }

    /// Try getting the next trial in dispatch order. If it hasn't
    /// arrived yet, do nothing.
    pub fn try_next(&mut self) -> Option<Trial> {
        let mut i = 0;
        while i < self.trials.len() {
            if self.trials[i].id == self.next_out {
                let trial = self.trials.swap_remove(i);
                self.next_out += 1;
                return Some(trial);
            }
            i += 1;
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn empty_trial(id: u32) -> Trial {
        Trial { id, outcome: Ok(None) }
    }

    #[test]
    fn queue_releases_trials_in_dispatch_order() {
        let mut queue = TrialQueue::new();
        queue.push(empty_trial(2));
        queue.push(empty_trial(1));
        assert!(queue.try_next().is_none());

        queue.push(empty_trial(0));
        assert_eq!(queue.try_next().map(|t| t.id), Some(0));
        assert_eq!(queue.try_next().map(|t| t.id), Some(1));
        assert_eq!(queue.try_next().map(|t| t.id), Some(2));
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn pool_runs_probes_and_reports_back() {
        let pool = ThreadPool::new(2);
        let base = Arc::new(Compressor::new());
        let data = Arc::new(b"aaaa".to_vec());

        for id in 0..4 {
            pool.probe(id, Arc::clone(&base), Arc::clone(&data), 1, (id + 1) as u8, u64::MAX);
        }

        let mut ids = Vec::new();
        for _ in 0..4 {
            let trial = pool.recv_trial().unwrap();
            assert!(trial.outcome.unwrap().is_some());
            ids.push(trial.id);
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unchanged_mutation_reports_none() {
        let pool = ThreadPool::new(1);
        let mut cmp = Compressor::new();
        cmp.add_model(1, 16);
        let base = Arc::new(cmp);
        let data = Arc::new(b"aaaa".to_vec());

        pool.probe(0, base, data, 1, 16, u64::MAX);
        let trial = pool.recv_trial().unwrap();
        assert!(trial.outcome.unwrap().is_none());
    }
}
