use std::{
    fs::File,
    io::{Read, Write, BufReader, BufWriter},
    path::Path,
};

use crate::error::PackError;


/// Open an existing file for buffered reading.
pub fn new_input_file(path: &Path) -> Result<BufReader<File>, PackError> {
    Ok(BufReader::new(File::open(path)?))
}

/// Create a new output file for buffered writing. Refuses to overwrite
/// an existing file unless clobbering is allowed.
pub fn new_output_file(path: &Path, clobber: bool) -> Result<BufWriter<File>, PackError> {
    if path.exists() && !clobber {
        return Err(PackError::FileExists(path.to_path_buf()));
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Read a whole file into memory.
pub fn read_file(path: &Path) -> Result<Vec<u8>, PackError> {
    let mut data = Vec::new();
    new_input_file(path)?.read_to_end(&mut data)?;
    Ok(data)
}

/// Write a whole buffer to a file.
pub fn write_file(path: &Path, data: &[u8], clobber: bool) -> Result<(), PackError> {
    let mut file_out = new_output_file(path, clobber)?;
    file_out.write_all(data)?;
    file_out.flush()?;
    Ok(())
}
