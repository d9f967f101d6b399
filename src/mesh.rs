use std::path::{Path, PathBuf};

/// The vertex streams of the first model in an OBJ file, with a single index
/// buffer shared by all attributes.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn has_texcoords(&self) -> bool {
        !self.texcoords.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("could not load mesh {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("mesh {} contains no geometry", path.display())]
    Empty { path: PathBuf },
}

pub fn load_obj(path: &Path) -> Result<MeshData, MeshError> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| MeshError::Load {
        path: path.to_owned(),
        source,
    })?;

    // Only the first model is used, extra objects in the file are ignored.
    let Some(model) = models.into_iter().next() else {
        return Err(MeshError::Empty {
            path: path.to_owned(),
        });
    };
    let mesh = model.mesh;
    if mesh.positions.is_empty() || mesh.indices.is_empty() {
        return Err(MeshError::Empty {
            path: path.to_owned(),
        });
    }

    Ok(MeshData {
        positions: mesh.positions,
        texcoords: mesh.texcoords,
        normals: mesh.normals,
        indices: mesh.indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("planets-gl-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_reports_its_name() {
        let path = Path::new("definitely/not/here/earth.obj");
        let err = load_obj(path).unwrap_err();
        assert!(matches!(err, MeshError::Load { .. }));
        assert!(err.to_string().contains("earth.obj"), "{err}");
    }

    #[test]
    fn loads_positions_texcoords_and_normals() {
        let path = write_temp(
            "quad.obj",
            "v -1 0 -1\nv 1 0 -1\nv 1 0 1\nv -1 0 1\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             vn 0 1 0\n\
             f 1/1/1 2/2/1 3/3/1 4/4/1\n",
        );
        let mesh = load_obj(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(4, mesh.vertex_count());
        // The quad is triangulated into two triangles.
        assert_eq!(6, mesh.indices.len());
        assert!(mesh.has_texcoords());
        assert!(mesh.has_normals());
    }

    #[test]
    fn positions_only_mesh_has_no_optional_streams() {
        let path = write_temp("triangle.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let mesh = load_obj(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(3, mesh.indices.len());
        assert!(!mesh.has_texcoords());
        assert!(!mesh.has_normals());
    }

    #[test]
    fn file_without_faces_is_empty() {
        let path = write_temp("empty.obj", "# points only, no faces\nv 0 0 0\n");
        let err = load_obj(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, MeshError::Empty { .. }));
        assert!(err.to_string().contains("empty.obj"), "{err}");
    }
}
