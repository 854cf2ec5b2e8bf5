//! Key material: one nonzero basis element per vector position
//!
//! Key file layout (`Keys.data`): `u32` LE security parameter, then the flat
//! element layout of [`crate::ser`]. A file generated for depth `L` also serves
//! any smaller depth, since only the first `2^depth` elements are read.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ff::{Field, FromUniformBytes};
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::error::{Result, VcsError};
use crate::field::Fr;
use crate::ser::{read_elements, write_elements};

pub const KEY_FILE: &str = "Keys.data";

/// Largest supported tree depth
pub const MAX_DEPTH: u8 = 28;

const BASIS_DOMAIN: &[u8] = b"statevec/basis/v1";

#[derive(Clone, Debug)]
pub struct KeyMaterial {
    security_param: u32,
    depth: u8,
    basis: Vec<Fr>,
}

impl KeyMaterial {
    /// Derive keys deterministically from a 32-byte seed
    pub fn generate(security_param: u32, depth: u8, seed: &[u8; 32]) -> Result<Self> {
        check_depth(depth)?;

        let basis = (0..1u64 << depth)
            .map(|i| derive_basis(seed, security_param, i))
            .collect();

        Ok(Self { security_param, depth, basis })
    }

    /// Fresh keys from the thread RNG
    pub fn random(security_param: u32, depth: u8) -> Result<Self> {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::generate(security_param, depth, &seed)
    }

    pub fn security_param(&self) -> u32 {
        self.security_param
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of vector positions covered (`2^depth`)
    pub fn size(&self) -> u64 {
        self.basis.len() as u64
    }

    pub fn basis(&self) -> &[Fr] {
        &self.basis
    }

    /// Basis element for one position
    pub fn get(&self, index: u64) -> Result<Fr> {
        self.basis
            .get(index as usize)
            .copied()
            .ok_or(VcsError::IndexOutOfRange { index, size: self.size() })
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let path = dir.join(KEY_FILE);

        let mut w = BufWriter::new(File::create(&path)?);
        w.write_all(&self.security_param.to_le_bytes())?;
        write_elements(&mut w, &self.basis)?;
        w.flush()?;

        tracing::info!("dumped keys (depth {}) to {}", self.depth, path.display());
        Ok(())
    }

    /// Load keys for `depth`; fails on missing, short or corrupt key files
    pub fn load(security_param: u32, depth: u8, dir: &Path) -> Result<Self> {
        check_depth(depth)?;
        let path = dir.join(KEY_FILE);

        let mut r = BufReader::new(File::open(&path)?);
        let mut header = [0u8; 4];
        r.read_exact(&mut header)?;
        let stored = u32::from_le_bytes(header);
        if stored != security_param {
            return Err(VcsError::InvalidKeys(format!(
                "security parameter {} does not match requested {}",
                stored, security_param
            )));
        }

        let basis = read_elements(&mut r, 1u64 << depth)?;
        if let Some(pos) = basis.iter().position(|h| bool::from(h.is_zero())) {
            return Err(VcsError::InvalidKeys(format!("zero basis element at {}", pos)));
        }

        Ok(Self { security_param, depth, basis })
    }
}

/// Generate fresh keys and write them to `dir`
pub fn keygen(security_param: u32, depth: u8, dir: &Path) -> Result<KeyMaterial> {
    let keys = KeyMaterial::random(security_param, depth)?;
    keys.save(dir)?;
    Ok(keys)
}

fn check_depth(depth: u8) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(VcsError::InvalidKeys(format!("depth {} exceeds {}", depth, MAX_DEPTH)));
    }
    Ok(())
}

fn derive_basis(seed: &[u8; 32], security_param: u32, index: u64) -> Fr {
    let mut counter = 0u32;
    loop {
        let mut hasher = Sha512::new();
        hasher.update(BASIS_DOMAIN);
        hasher.update(seed);
        hasher.update(security_param.to_le_bytes());
        hasher.update(index.to_le_bytes());
        hasher.update(counter.to_le_bytes());
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&hasher.finalize());

        let h = Fr::from_uniform_bytes(&wide);
        if !bool::from(h.is_zero()) {
            return h;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_deterministic() {
        let a = KeyMaterial::generate(16, 3, &[7u8; 32]).unwrap();
        let b = KeyMaterial::generate(16, 3, &[7u8; 32]).unwrap();
        let c = KeyMaterial::generate(16, 3, &[8u8; 32]).unwrap();

        assert_eq!(a.size(), 8);
        assert_eq!(a.basis(), b.basis());
        assert_ne!(a.basis(), c.basis());
    }

    #[test]
    fn test_basis_distinct_per_position() {
        let keys = KeyMaterial::generate(16, 4, &[1u8; 32]).unwrap();
        for i in 0..keys.basis().len() {
            for j in i + 1..keys.basis().len() {
                assert_ne!(keys.basis()[i], keys.basis()[j]);
            }
        }
        assert!(keys.get(16).is_err());
    }

    #[test]
    fn test_save_load_smaller_depth() {
        let dir = tempfile::tempdir().unwrap();
        let keys = KeyMaterial::generate(16, 4, &[3u8; 32]).unwrap();
        keys.save(dir.path()).unwrap();

        let loaded = KeyMaterial::load(16, 2, dir.path()).unwrap();
        assert_eq!(loaded.depth(), 2);
        assert_eq!(loaded.basis(), &keys.basis()[..4]);
    }

    #[test]
    fn test_load_rejects_larger_depth() {
        let dir = tempfile::tempdir().unwrap();
        KeyMaterial::generate(16, 2, &[3u8; 32]).unwrap().save(dir.path()).unwrap();

        assert!(matches!(
            KeyMaterial::load(16, 3, dir.path()),
            Err(VcsError::NotEnoughElements { requested: 8, available: 4 })
        ));
    }

    #[test]
    fn test_load_rejects_security_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        keygen(16, 2, dir.path()).unwrap();

        assert!(matches!(KeyMaterial::load(12, 2, dir.path()), Err(VcsError::InvalidKeys(_))));
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            KeyMaterial::load(16, 2, &dir.path().join("pkvk-02")),
            Err(VcsError::Io(_))
        ));
    }
}
