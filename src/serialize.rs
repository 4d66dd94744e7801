//! Byte-stream encode/decode of a trained index.
//!
//! # Layout (format v1)
//!
//! ```text
//! offset 0 : u8      format version (= 1)
//! offset 1 : u32 LE  header length H
//! offset 5 : H bytes JSON header: { config, bias, n_instances }
//! payload  : dims × f64 LE                      mean vector μ
//!            per instance, per plane:
//!              dims × f64 LE                    plane coefficients
//!              f64 LE                           plane offset
//! ```
//!
//! The JSON header makes the stream self-describing; the payload stays
//! raw little-endian floats so round-trips are bit-exact. The store is
//! never part of the stream.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::hasher::{Hasher, HasherInstance, Plane};
use crate::index::Config;

const FORMAT_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DumpHeader {
    config: Config,
    bias: f64,
    n_instances: usize,
}

pub(crate) fn encode(config: &Config, hasher: &Hasher) -> Result<Vec<u8>> {
    let header = DumpHeader {
        config: config.clone(),
        bias: hasher.bias(),
        n_instances: hasher.n_tables(),
    };
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| IndexError::Format(format!("header encoding failed: {e}")))?;

    let dims = hasher.dims();
    let plane_floats = dims + 1;
    let payload_floats =
        dims + hasher.n_tables() * config.n_planes * plane_floats;
    let mut out = Vec::with_capacity(1 + 4 + header_json.len() + payload_floats * 8);

    out.push(FORMAT_VERSION);
    out.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_json);
    for &x in hasher.mean() {
        out.extend_from_slice(&x.to_le_bytes());
    }
    for instance in hasher.instances() {
        for plane in instance.planes() {
            for &c in &plane.coefs {
                out.extend_from_slice(&c.to_le_bytes());
            }
            out.extend_from_slice(&plane.offset.to_le_bytes());
        }
    }
    Ok(out)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<(Config, Hasher)> {
    let mut reader = Reader::new(bytes);

    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(IndexError::Format(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }

    let header_len = reader.u32()? as usize;
    let header: DumpHeader = serde_json::from_slice(reader.take(header_len)?)
        .map_err(|e| IndexError::Format(format!("malformed header: {e}")))?;
    if header.n_instances == 0 {
        return Err(IndexError::EmptyIndex);
    }
    header
        .config
        .validate()
        .map_err(|e| IndexError::Format(format!("invalid config in header: {e}")))?;
    if header.n_instances != header.config.n_permutes {
        return Err(IndexError::Format(format!(
            "instance count {} does not match n_permutes {}",
            header.n_instances, header.config.n_permutes
        )));
    }

    // Size the payload from the header before reading it; a mismatch is
    // caught here instead of surfacing as a giant allocation.
    let dims = header.config.dims;
    let plane_floats = dims
        .checked_add(1)
        .and_then(|w| w.checked_mul(header.config.n_planes))
        .and_then(|w| w.checked_mul(header.n_instances))
        .ok_or_else(|| IndexError::Format("plane section size overflows".into()))?;
    let expected = dims
        .checked_add(plane_floats)
        .and_then(|floats| floats.checked_mul(8))
        .ok_or_else(|| IndexError::Format("payload size overflows".into()))?;
    if reader.remaining() != expected {
        return Err(IndexError::Format(format!(
            "payload is {} bytes, header describes {expected}",
            reader.remaining()
        )));
    }

    let mean = reader.f64s(dims)?;
    let mut instances = Vec::with_capacity(header.n_instances);
    for _ in 0..header.n_instances {
        let mut planes = Vec::with_capacity(header.config.n_planes);
        for _ in 0..header.config.n_planes {
            let coefs = reader.f64s(dims)?;
            let offset = reader.f64()?;
            planes.push(Plane { coefs, offset });
        }
        instances.push(HasherInstance::new(planes));
    }
    reader.finish()?;

    let hasher = Hasher::from_parts(dims, header.bias, mean, instances);
    Ok((header.config, hasher))
}

/// Bounds-checked little-endian cursor; every short read is a
/// [`IndexError::Format`].
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| IndexError::Format("unexpected end of input".into()))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes(raw.try_into().expect("4-byte slice")))
    }

    fn f64(&mut self) -> Result<f64> {
        let raw = self.take(8)?;
        Ok(f64::from_le_bytes(raw.try_into().expect("8-byte slice")))
    }

    fn f64s(&mut self, n: usize) -> Result<Vec<f64>> {
        let raw = self.take(n * 8)?;
        Ok(raw
            .chunks_exact(8)
            .map(|chunk| f64::from_le_bytes(chunk.try_into().expect("8-byte chunk")))
            .collect())
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(IndexError::Format(format!(
                "{} trailing bytes after payload",
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn trained_hasher(seed: u64) -> (Config, Hasher) {
        let mut config = Config::new(6);
        config.n_permutes = 3;
        config.n_planes = 10;
        config.seed = Some(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let mean: Vec<f64> = (0..6).map(|i| i as f64 * 0.5).collect();
        let std = vec![1.0; 6];
        let hasher = Hasher::generate(&config, Metric::Euclidean, mean, &std, &mut rng).unwrap();
        (config, hasher)
    }

    #[test]
    fn roundtrip_is_structural_identity() {
        let (config, hasher) = trained_hasher(42);
        let bytes = encode(&config, &hasher).unwrap();
        let (config2, hasher2) = decode(&bytes).unwrap();
        assert_eq!(config, config2);
        assert_eq!(hasher, hasher2);
    }

    #[test]
    fn roundtrip_hashes_bit_identically() {
        let (config, hasher) = trained_hasher(7);
        let bytes = encode(&config, &hasher).unwrap();
        let (_, hasher2) = decode(&bytes).unwrap();
        let v = [0.1, -2.0, 3.5, 0.0, 1.0, -0.5];
        assert_eq!(hasher.hash(&v).unwrap(), hasher2.hash(&v).unwrap());
    }

    #[test]
    fn truncation_is_a_format_error() {
        let (config, hasher) = trained_hasher(1);
        let bytes = encode(&config, &hasher).unwrap();
        for cut in [0, 1, 3, 5, bytes.len() / 2, bytes.len() - 1] {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, IndexError::Format(_)), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn trailing_bytes_are_a_format_error() {
        let (config, hasher) = trained_hasher(1);
        let mut bytes = encode(&config, &hasher).unwrap();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(IndexError::Format(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let (config, hasher) = trained_hasher(1);
        let mut bytes = encode(&config, &hasher).unwrap();
        bytes[0] = 9;
        assert!(matches!(decode(&bytes), Err(IndexError::Format(_))));
    }

    #[test]
    fn zero_instances_is_empty_index() {
        let header = DumpHeader {
            config: Config::new(2),
            bias: 0.0,
            n_instances: 0,
        };
        let header_json = serde_json::to_vec(&header).unwrap();
        let mut bytes = vec![FORMAT_VERSION];
        bytes.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&header_json);
        assert!(matches!(decode(&bytes), Err(IndexError::EmptyIndex)));
    }

    #[test]
    fn garbage_header_is_a_format_error() {
        let mut bytes = vec![FORMAT_VERSION];
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"????");
        assert!(matches!(decode(&bytes), Err(IndexError::Format(_))));
    }
}
