//! Flat vector files
//!
//! Layout: `u64` little-endian element count, then that many 32-byte elements.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, VcsError};
use crate::field::{fr_from_bytes, fr_to_bytes, Fr, ELEMENT_SIZE};

/// File name used for the account vector inside a vector directory
pub const VECTOR_FILE: &str = "Vec.data";

pub fn write_elements<W: Write>(w: &mut W, elements: &[Fr]) -> Result<()> {
    w.write_all(&(elements.len() as u64).to_le_bytes())?;
    for fe in elements {
        w.write_all(&fr_to_bytes(fe))?;
    }
    Ok(())
}

/// Read the first `n` elements; fails if the header declares fewer than `n`
pub fn read_elements<R: Read>(r: &mut R, n: u64) -> Result<Vec<Fr>> {
    let mut header = [0u8; 8];
    r.read_exact(&mut header)?;
    let available = u64::from_le_bytes(header);

    if n > available {
        return Err(VcsError::NotEnoughElements { requested: n, available });
    }

    let mut buf = [0u8; ELEMENT_SIZE];
    let mut elements = Vec::with_capacity(n as usize);
    for _ in 0..n {
        r.read_exact(&mut buf)?;
        elements.push(fr_from_bytes(&buf)?);
    }
    Ok(elements)
}

/// Save a vector, creating parent directories as needed
pub fn save_vector(path: &Path, elements: &[Fr]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut w = BufWriter::new(File::create(path)?);
    write_elements(&mut w, elements)?;
    w.flush()?;

    tracing::debug!("dumped {} elements to {}", elements.len(), path.display());
    Ok(())
}

pub fn load_vector(path: &Path, n: u64) -> Result<Vec<Fr>> {
    let mut r = BufReader::new(File::open(path)?);
    let elements = read_elements(&mut r, n)?;
    tracing::debug!("loaded {} elements from {}", elements.len(), path.display());
    Ok(elements)
}
