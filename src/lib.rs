mod bits;
mod buffered_io;
mod coder;
mod compressor;
mod model;
mod predictor;
mod progress;
mod record;
mod search;
mod state;
mod threads;
pub mod config;
pub mod error;

use std::{
    path::PathBuf,
    time::Instant,
};

use log::{debug, info};

use crate::{
    buffered_io::{read_file, write_file},
    compressor::Compressor,
    config::Config,
    error::{CodecError, PackError},
    search::SearchEngine,
};

pub use crate::record::{CompressedRecord, ModelEntry};


/// Search for the model ensemble whose record codes the payload
/// shortest and return that record. A thread count of 0 means hardware
/// concurrency. The search enumerates the same mutation space in the
/// same order regardless of thread count, so the result is a pure
/// function of the input.
pub fn compress(data: &[u8], threads: usize) -> Result<CompressedRecord, CodecError> {
    SearchEngine::new(data.to_vec(), threads)?.run()
}

/// Decode a record back into its payload bytes. Deterministic.
pub fn extract(record: &CompressedRecord) -> Result<Vec<u8>, CodecError> {
    Compressor::extract(record)
}

/// Serialize a record to the container byte format.
pub fn serialize(record: &CompressedRecord) -> Result<Vec<u8>, CodecError> {
    record.serialize()
}

/// Parse a container byte image back into a record.
pub fn parse(bytes: &[u8]) -> Result<CompressedRecord, CodecError> {
    CompressedRecord::parse(bytes)
}


/// Mixpak API. Compresses or extracts single files using method
/// chaining syntax or by supplying an existing Config.
#[derive(Clone, Default)]
pub struct Mixpak {
    cfg: Config,
}
impl Mixpak {
    /// Create a Mixpak compressor or extractor with an existing Config.
    pub fn new(cfg: Config) -> Mixpak {
        Mixpak {
            cfg
        }
    }

    /// Allow file clobbering.
    pub fn clobber(mut self) -> Self {
        self.cfg.clobber = true;
        self
    }

    /// Choose number of threads to use, 0 for hardware concurrency.
    pub fn threads(mut self, count: usize) -> Self {
        self.cfg.threads = count;
        self
    }

    /// Choose an output path.
    pub fn output(mut self, path: &str) -> Self {
        self.cfg.user_out = path.to_string();
        self
    }

    /// Choose the input file.
    pub fn input(mut self, path: &str) -> Self {
        self.cfg.input = PathBuf::from(path);
        self
    }

    /// Compress the input file into a container file.
    pub fn compress_file(self) -> Result<(), PackError> {
        let time = Instant::now();
        let data = read_file(&self.cfg.input)?;
        let record = compress(&data, self.cfg.threads)?;
        debug!("{record}");
        let bytes = serialize(&record)?;
        write_file(&self.out_path("mxp"), &bytes, self.cfg.clobber)?;
        info!("{} bytes -> {} bytes in {:.2?}",
            data.len(), bytes.len(), time.elapsed());
        Ok(())
    }

    /// Extract a container file back into its original bytes.
    pub fn extract_file(self) -> Result<(), PackError> {
        let time = Instant::now();
        let bytes = read_file(&self.cfg.input)?;
        let record = parse(&bytes)?;
        let data = extract(&record)?;
        write_file(&self.out_path("out"), &data, self.cfg.clobber)?;
        info!("{} bytes -> {} bytes in {:.2?}",
            bytes.len(), data.len(), time.elapsed());
        Ok(())
    }

    fn out_path(&self, ext: &str) -> PathBuf {
        if self.cfg.user_out.is_empty() {
            self.cfg.input.with_extension(ext)
        }
        else {
            PathBuf::from(&self.cfg.user_out)
        }
    }
}
