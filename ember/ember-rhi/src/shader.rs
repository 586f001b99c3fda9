//! Compiled shader binaries are loaded as opaque SPIR-V blobs with named
//! entry points; the envelope is validated, nothing else is inspected.

use std::path::Path;

use ash::vk;
use render_api::{Error, Result};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Validate a SPIR-V blob and decode it into words.
pub fn decode(bytes: &[u8], name: &str) -> Result<Vec<u32>> {
    if bytes.len() < 20 || bytes.len() % 4 != 0 {
        return Err(Error::parse(format!(
            "shader '{name}' is not a SPIR-V blob (length {})",
            bytes.len()
        )));
    }
    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if words[0] != SPIRV_MAGIC {
        return Err(Error::parse(format!(
            "shader '{name}' has a bad SPIR-V magic number ({:#010x})",
            words[0]
        )));
    }
    Ok(words)
}

/// Load a shader module from a compiled SPIR-V file on disk.
pub fn from_file(device: &ash::Device, path: impl AsRef<Path>) -> Result<vk::ShaderModule> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| Error::io(format!("shader file '{}': {e}", path.display())))?;
    let words = decode(&bytes, &path.display().to_string())?;
    let ci = vk::ShaderModuleCreateInfo::default().code(&words);
    unsafe {
        device
            .create_shader_module(&ci, None)
            .map_err(|e| Error::device_init(format!("failed to create shader module: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_blobs() {
        assert!(matches!(decode(&[1, 2, 3], "t"), Err(Error::Parse(_))));
        // Word-aligned but too short for a header.
        assert!(matches!(decode(&[0u8; 8], "t"), Err(Error::Parse(_))));
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut blob = vec![0u8; 24];
        blob[0..4].copy_from_slice(&0xdead_beefu32.to_le_bytes());
        assert!(matches!(decode(&blob, "t"), Err(Error::Parse(_))));
    }

    #[test]
    fn accepts_a_minimal_header() {
        let mut blob = vec![0u8; 24];
        blob[0..4].copy_from_slice(&SPIRV_MAGIC.to_le_bytes());
        let words = decode(&blob, "t").unwrap();
        assert_eq!(words.len(), 6);
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn decode_is_endian_stable() {
        let mut blob = vec![0u8; 24];
        blob[0..4].copy_from_slice(&SPIRV_MAGIC.to_le_bytes());
        blob[4..8].copy_from_slice(&0x0001_0600u32.to_le_bytes());
        let words = decode(&blob, "t").unwrap();
        assert_eq!(words[1], 0x0001_0600);
    }
}
