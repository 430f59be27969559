use crate::{
    helpers::{BakeContext, BakeError},
    scene::Document,
};
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, error};
use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_CHUNK_JSON: u32 = 0x4E4F534A;
const GLB_CHUNK_BIN: u32 = 0x004E4942;

/// A parsed scene document together with the raw bytes of every buffer.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub path: PathBuf,
    pub document: Document,
    pub buffers: Vec<Vec<u8>>,
}

/// Reads a `.gltf` or `.glb` file and resolves all of its buffers.
pub fn load_scene(path: &Path) -> Result<LoadedScene, BakeError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let bytes = std::fs::read(path)
        .map_err(|e| BakeError::InvalidInput(format!("{}: {}", path.display(), e)))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let (document, blob) = match extension.as_deref() {
        Some("gltf") => (serde_json::from_slice::<Document>(&bytes)?, None),
        Some("glb") => {
            let (document, blob) = parse_glb(&bytes)?;
            (document, Some(blob))
        }
        _ => {
            error!("Not a glTF scene: {}", path.display());
            return Err(BakeError::UnsupportedFormat(path.display().to_string()));
        }
    };

    let buffers = resolve_buffers(&document, blob, base_dir)?;
    debug!(
        "Loaded {} ({} meshes, {} accessors, {} buffers)",
        path.display(),
        document.meshes.len(),
        document.accessors.len(),
        buffers.len()
    );

    Ok(LoadedScene {
        path: path.to_path_buf(),
        document,
        buffers,
    })
}

/// Splits a binary glTF container into its JSON document and BIN chunk.
pub fn parse_glb(glb: &[u8]) -> Result<(Document, Vec<u8>), BakeError> {
    let total_len = glb.len();
    let mut cursor = Cursor::new(glb);

    // --- GLB Header ---
    let mut magic = [0; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != GLB_MAGIC {
        error!("Invalid GLB magic header: {:?}", magic);
        return Err(BakeError::UnsupportedFormat(
            "invalid GLB magic header".to_string(),
        ));
    }

    let version = cursor.read_u32::<LittleEndian>()?;
    if version != 2 {
        error!("Unsupported GLB version: {}", version);
        return Err(BakeError::UnsupportedFormat(format!(
            "GLB version {version}, only 2 is supported"
        )));
    }

    let _length = cursor.read_u32::<LittleEndian>()?;

    // --- JSON Chunk ---
    let json_len = cursor.read_u32::<LittleEndian>()? as usize;
    let json_type = cursor.read_u32::<LittleEndian>()?;
    if json_type != GLB_CHUNK_JSON {
        error!("Expected JSON chunk, got: 0x{:X}", json_type);
        return Err(BakeError::UnsupportedFormat(
            "expected JSON chunk".to_string(),
        ));
    }

    if total_len < 12 + 8 + json_len {
        return Err(BakeError::InvalidInput(format!(
            "GLB too small for JSON chunk: need {}, have {}",
            12 + 8 + json_len,
            total_len
        )));
    }

    let mut json_buf = vec![0u8; json_len];
    cursor.read_exact(&mut json_buf)?;
    let document: Document = serde_json::from_slice(&json_buf)?;

    // BIN chunk is optional
    if (cursor.position() as usize) + 8 > total_len {
        return Ok((document, Vec::new()));
    }

    // --- BIN Chunk ---
    let bin_len = cursor.read_u32::<LittleEndian>()? as usize;
    let bin_type = cursor.read_u32::<LittleEndian>()?;
    if bin_type != GLB_CHUNK_BIN {
        error!("Expected BIN chunk, got: 0x{:X}", bin_type);
        return Err(BakeError::UnsupportedFormat(
            "expected BIN chunk".to_string(),
        ));
    }

    let remaining = total_len.saturating_sub(cursor.position() as usize);
    if remaining < bin_len {
        return Err(BakeError::InvalidInput(format!(
            "GLB too small for BIN chunk: need {}, have {}",
            bin_len, remaining
        )));
    }

    let mut bin_buf = vec![0u8; bin_len];
    cursor.read_exact(&mut bin_buf)?;

    Ok((document, bin_buf))
}

/// Loads the bytes behind every `buffers[]` entry.
///
/// Buffers without a `uri` refer to the GLB BIN chunk, `data:` URIs are
/// decoded in place, everything else is a path relative to `base_dir`.
pub fn resolve_buffers(
    document: &Document,
    mut blob: Option<Vec<u8>>,
    base_dir: &Path,
) -> Result<Vec<Vec<u8>>, BakeError> {
    let mut buffers = Vec::with_capacity(document.buffers.len());

    for (index, buffer) in document.buffers.iter().enumerate() {
        let data = match buffer.uri.as_deref() {
            None => blob.take().ok_or_else(|| {
                BakeError::Buffer(format!("buffer {index} has no uri and no GLB BIN chunk"))
            })?,
            Some(uri) if uri.starts_with("data:") => decode_data_uri(uri)
                .bake_context(&format!("buffer {index} data uri"))?,
            Some(uri) => {
                let file = base_dir.join(uri);
                std::fs::read(&file)
                    .map_err(|e| BakeError::Buffer(format!("{}: {}", file.display(), e)))?
            }
        };

        if data.len() < buffer.byte_length {
            return Err(BakeError::Buffer(format!(
                "buffer {index} holds {} bytes, byteLength is {}",
                data.len(),
                buffer.byte_length
            )));
        }
        buffers.push(data);
    }

    Ok(buffers)
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, BakeError> {
    // data:[<mediatype>][;base64],<data>
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| BakeError::InvalidInput("malformed data uri".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(BakeError::UnsupportedFormat(
            "only base64 data uris are supported".to_string(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .bake_context("base64")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Buffer;

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::new();
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
        out
    }

    #[test]
    fn glb_chunks_are_split() {
        let data = glb(r#"{"buffers":[{"byteLength":4}]}"#, &[1, 2, 3, 4]);
        let (doc, bin) = parse_glb(&data).unwrap();
        assert_eq!(doc.buffers.len(), 1);
        assert_eq!(bin, vec![1, 2, 3, 4]);

        let buffers = resolve_buffers(&doc, Some(bin), Path::new(".")).unwrap();
        assert_eq!(buffers[0], vec![1, 2, 3, 4]);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut data = glb("{}", &[]);
        data[0] = b'x';
        assert!(matches!(
            parse_glb(&data),
            Err(BakeError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn data_uri_buffers_are_decoded() {
        let doc = Document {
            buffers: vec![Buffer {
                byte_length: 3,
                uri: Some("data:application/octet-stream;base64,AQID".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let buffers = resolve_buffers(&doc, None, Path::new(".")).unwrap();
        assert_eq!(buffers[0], vec![1, 2, 3]);
    }

    #[test]
    fn short_buffers_are_rejected() {
        let doc = Document {
            buffers: vec![Buffer {
                byte_length: 8,
                uri: Some("data:application/octet-stream;base64,AQID".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            resolve_buffers(&doc, None, Path::new(".")),
            Err(BakeError::Buffer(_))
        ));
    }

    #[test]
    fn wrong_extension_produces_no_scene() {
        let path = std::env::temp_dir().join("meshbake_reader_wrong_ext.obj");
        std::fs::write(&path, b"o cube").unwrap();
        assert!(matches!(
            load_scene(&path),
            Err(BakeError::UnsupportedFormat(_))
        ));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_produces_no_scene() {
        let path = std::env::temp_dir().join("meshbake_reader_does_not_exist.gltf");
        assert!(matches!(
            load_scene(&path),
            Err(BakeError::InvalidInput(_))
        ));
    }
}
