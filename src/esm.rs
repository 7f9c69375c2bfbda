use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Reads the master names a plugin file declares in its header.
///
/// Abstracted so the catalog builder can be fed an in-memory reader in
/// tests instead of real files on disk.
pub trait MasterReader {
    fn read_declared_masters(&self, path: &Path) -> Result<Vec<String>, EsmError>;
}

#[derive(Debug, Error)]
pub enum EsmError {
    #[error("open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: not a TES3 plugin file", path.display())]
    BadMagic { path: PathBuf },
    #[error("{}: truncated or malformed header record", path.display())]
    Malformed { path: PathBuf },
}

/// Parses the leading TES3 record of Morrowind-format plugin files.
pub struct EsmFileReader;

impl MasterReader for EsmFileReader {
    fn read_declared_masters(&self, path: &Path) -> Result<Vec<String>, EsmError> {
        let mut file = fs::File::open(path).map_err(|source| EsmError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Record header: tag, data size, then two u32 fields we skip.
        let mut tag = [0u8; 4];
        file.read_exact(&mut tag).map_err(|_| EsmError::Malformed {
            path: path.to_path_buf(),
        })?;
        if &tag != b"TES3" {
            return Err(EsmError::BadMagic {
                path: path.to_path_buf(),
            });
        }
        let data_size = read_u32(&mut file).ok_or_else(|| EsmError::Malformed {
            path: path.to_path_buf(),
        })? as usize;
        let mut skip = [0u8; 8];
        file.read_exact(&mut skip).map_err(|_| EsmError::Malformed {
            path: path.to_path_buf(),
        })?;

        let mut data = vec![0u8; data_size];
        file.read_exact(&mut data).map_err(|_| EsmError::Malformed {
            path: path.to_path_buf(),
        })?;

        parse_masters(&data).ok_or_else(|| EsmError::Malformed {
            path: path.to_path_buf(),
        })
    }
}

/// Walks the subrecords of the TES3 record, collecting MAST values in
/// declaration order.
fn parse_masters(data: &[u8]) -> Option<Vec<String>> {
    let mut masters = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        if offset + 8 > data.len() {
            return None;
        }
        let name = &data[offset..offset + 4];
        let len = u32::from_le_bytes(data[offset + 4..offset + 8].try_into().ok()?) as usize;
        offset += 8;
        if offset + len > data.len() {
            return None;
        }
        if name == b"MAST" {
            let raw = &data[offset..offset + len];
            let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
            let master = std::str::from_utf8(&raw[..end]).ok()?;
            masters.push(master.to_string());
        }
        offset += len;
    }

    Some(masters)
}

fn read_u32(file: &mut fs::File) -> Option<u32> {
    let mut bytes = [0u8; 4];
    file.read_exact(&mut bytes).ok()?;
    Some(u32::from_le_bytes(bytes))
}
