//! Binary glTF model decoding: nodes, meshes, primitives, POSITION and
//! NORMAL attributes, indices when present.

use glam::Vec3;
use render_api::{Error, Mesh, Result};

use crate::Files;

/// Load one mesh out of a binary glTF file. `mesh_index` selects among the
/// file's mesh-carrying nodes in document order.
pub fn load_mesh(files: &Files, path: &str, material: Vec3, mesh_index: usize) -> Result<Mesh> {
    let bytes = files.read_binary_file(path)?;
    let (document, buffers, _images) = gltf::import_slice(&bytes)
        .map_err(|e| Error::parse(format!("model '{path}': {e}")))?;

    let mesh = document
        .nodes()
        .filter_map(|node| node.mesh())
        .nth(mesh_index)
        .ok_or_else(|| Error::parse(format!("model '{path}' has no mesh at index {mesh_index}")))?;

    let mut vertices = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    for primitive in mesh.primitives() {
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));

        let base = vertices.len() as u32;
        let positions = reader
            .read_positions()
            .ok_or_else(|| Error::parse(format!("model '{path}' primitive lacks POSITION")))?;
        vertices.extend(positions.map(Vec3::from));

        match reader.read_normals() {
            Some(read) => normals.extend(read.map(Vec3::from)),
            // Missing normals degrade to flat zero; the maintainer keeps the
            // arrays index-aligned either way.
            None => normals.resize(vertices.len(), Vec3::ZERO),
        }

        if let Some(read) = reader.read_indices() {
            indices.extend(read.into_u32().map(|i| i + base));
        }
    }

    let tri_count = if indices.is_empty() {
        vertices.len() / 3
    } else {
        indices.len() / 3
    };

    log::info!(target: "system", "loaded model '{path}': {tri_count} triangles");
    Ok(Mesh {
        vertices,
        normals,
        indices,
        material,
        tri_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_report_the_parse_tier() {
        let dir = std::env::temp_dir().join("ember_model_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.glb");
        std::fs::write(&path, b"this is not a gltf binary envelope").unwrap();

        let files = Files::new();
        let err = load_mesh(&files, path.to_str().unwrap(), Vec3::ONE, 0).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn missing_files_report_the_io_tier() {
        let files = Files::new();
        let err = load_mesh(&files, "missing.glb", Vec3::ONE, 0).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
