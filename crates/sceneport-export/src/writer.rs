//! Output writers: GLB container and `.gltf` + `.bin`

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{GltfExportError, GltfResult};
use crate::gltf::ExportOutput;

pub const GLB_MAGIC: &[u8; 4] = b"glTF";
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F534A;
pub const CHUNK_BIN: u32 = 0x004E4942;

fn padding(len: usize) -> usize {
    (4 - (len % 4)) % 4
}

/// GLB length fields are u32
fn glb_length(len: usize) -> GltfResult<u32> {
    u32::try_from(len).map_err(|_| GltfExportError::Capacity {
        requested: len,
        capacity: u32::MAX as usize,
    })
}

/// Serialize into a GLB container
///
/// The JSON chunk is padded with spaces, the BIN chunk with zeros; the BIN
/// chunk is omitted when the buffer is empty.
pub fn to_glb_bytes(output: &ExportOutput) -> GltfResult<Vec<u8>> {
    let json = serde_json::to_string(&output.document)?;
    let json_len = json.len();
    let json_padding = padding(json_len);
    let bin_len = output.buffer.len();
    let bin_padding = padding(bin_len);

    let mut total_len = 12 + 8 + json_len + json_padding;
    if bin_len > 0 {
        total_len += 8 + bin_len + bin_padding;
    }

    let header_len = glb_length(total_len)?;
    let json_chunk_len = glb_length(json_len + json_padding)?;
    let bin_chunk_len = glb_length(bin_len + bin_padding)?;

    let mut glb = Vec::with_capacity(total_len);

    // GLB header
    glb.write_all(GLB_MAGIC)?;
    glb.write_all(&GLB_VERSION.to_le_bytes())?;
    glb.write_all(&header_len.to_le_bytes())?;

    // JSON chunk
    glb.write_all(&json_chunk_len.to_le_bytes())?;
    glb.write_all(&CHUNK_JSON.to_le_bytes())?;
    glb.write_all(json.as_bytes())?;
    glb.resize(glb.len() + json_padding, 0x20);

    // BIN chunk
    if bin_len > 0 {
        glb.write_all(&bin_chunk_len.to_le_bytes())?;
        glb.write_all(&CHUNK_BIN.to_le_bytes())?;
        glb.write_all(&output.buffer)?;
        glb.resize(glb.len() + bin_padding, 0x00);
    }

    Ok(glb)
}

/// Write a GLB file
pub fn write_glb(output: &ExportOutput, path: &Path) -> GltfResult<()> {
    let bytes = to_glb_bytes(output)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote GLB");
    Ok(())
}

/// Write `path` as JSON plus a sibling `.bin` referenced by URI
pub fn write_gltf(output: &ExportOutput, path: &Path, pretty: bool) -> GltfResult<()> {
    let mut document = output.document.clone();

    if let Some(buffer) = document.buffers.first_mut() {
        let bin_path = path.with_extension("bin");
        let uri = bin_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "buffer.bin".to_string());
        buffer.uri = Some(uri);
        std::fs::write(&bin_path, &output.buffer)?;
    }

    let json = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Wrote glTF");
    Ok(())
}

/// Write by extension: `.glb` or `.gltf`; anything else follows `prefer_glb`
pub fn write_to_path(
    output: &ExportOutput,
    path: &Path,
    pretty: bool,
    prefer_glb: bool,
) -> GltfResult<PathBuf> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    let glb = match extension.as_deref() {
        Some("glb") => true,
        Some("gltf") => false,
        _ => prefer_glb,
    };

    if glb {
        let path = path.with_extension("glb");
        write_glb(output, &path)?;
        Ok(path)
    } else {
        let path = path.with_extension("gltf");
        write_gltf(output, &path, pretty)?;
        Ok(path)
    }
}
