use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr;

use anyhow::Context;
use glam::Vec4;

use crate::bmp::{self, Bitmap};
use crate::mesh::{self, MeshData};
use crate::renderer::gl;
use crate::renderer::program::{ProgramKind, ATTR_LOC_NORMAL, ATTR_LOC_POSITION, ATTR_LOC_TEXCOORD};
use crate::scene::{Motion, RenderableObject};

const POSITION_BUFFER: usize = 0;
const TEXCOORD_BUFFER: usize = 1;
const NORMAL_BUFFER: usize = 2;
const INDEX_BUFFER: usize = 3;

/// What a mesh will occupy on the GPU, without touching GL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryLayout {
    pub vertex_count: usize,
    pub index_count: usize,
    pub has_texcoords: bool,
    pub has_normals: bool,
}

/// A vertex array with its position, texcoord, normal and index buffers. The
/// GL names are released by [`Geometry::release`], which consumes the value so
/// it can only happen once.
#[derive(Debug, Default)]
pub struct Geometry {
    pub vao: gl::types::GLuint,
    pub buffers: [gl::types::GLuint; 4],
    /// The number of indices uploaded to the index buffer.
    pub index_count: i32,
}

impl Geometry {
    pub fn layout(mesh: &MeshData) -> GeometryLayout {
        GeometryLayout {
            vertex_count: mesh.vertex_count(),
            index_count: mesh.indices.len(),
            has_texcoords: mesh.has_texcoords(),
            has_normals: mesh.has_normals(),
        }
    }

    /// Uploads positions unconditionally, and texcoords and normals only if
    /// the mesh has them. Missing streams leave their attribute disabled.
    pub fn upload(mesh: &MeshData) -> Geometry {
        let layout = Geometry::layout(mesh);
        log::debug!(
            "uploading {} vertices and {} indices",
            layout.vertex_count,
            layout.index_count
        );
        let mut vao = 0;
        let mut buffers = [0; 4];
        gl::call!(gl::GenVertexArrays(1, &mut vao));
        gl::call!(gl::GenBuffers(buffers.len() as i32, buffers.as_mut_ptr()));
        gl::call!(gl::BindVertexArray(vao));

        let attribute = |buffer: usize, location: gl::types::GLuint, size: i32, data: &[f32]| {
            gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, buffers[buffer]));
            gl::buffer_data(gl::ARRAY_BUFFER, data, gl::STATIC_DRAW);
            gl::call!(gl::EnableVertexAttribArray(location));
            gl::call!(gl::VertexAttribPointer(
                location,
                size,
                gl::FLOAT,
                gl::FALSE,
                0,
                ptr::null::<c_void>(),
            ));
        };
        attribute(POSITION_BUFFER, ATTR_LOC_POSITION, 3, &mesh.positions);
        if layout.has_texcoords {
            attribute(TEXCOORD_BUFFER, ATTR_LOC_TEXCOORD, 2, &mesh.texcoords);
        }
        if layout.has_normals {
            attribute(NORMAL_BUFFER, ATTR_LOC_NORMAL, 3, &mesh.normals);
        }

        gl::call!(gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, buffers[INDEX_BUFFER]));
        gl::buffer_data(gl::ELEMENT_ARRAY_BUFFER, &mesh.indices, gl::STATIC_DRAW);

        gl::call!(gl::BindVertexArray(0));
        gl::call!(gl::BindBuffer(gl::ARRAY_BUFFER, 0));

        Geometry {
            vao,
            buffers,
            index_count: layout.index_count as i32,
        }
    }

    pub fn release(self) {
        gl::call!(gl::DeleteVertexArrays(1, &self.vao));
        gl::call!(gl::DeleteBuffers(
            self.buffers.len() as i32,
            self.buffers.as_ptr()
        ));
    }
}

/// The texture an object samples. Borrowed textures belong to someone else
/// (the offscreen target) and are left alone on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureRef {
    #[default]
    None,
    Owned(gl::types::GLuint),
    Borrowed(gl::types::GLuint),
}

impl TextureRef {
    /// The name to bind; 0 unbinds, which is a valid target for untextured
    /// objects.
    pub fn name(&self) -> gl::types::GLuint {
        match *self {
            TextureRef::None => 0,
            TextureRef::Owned(name) | TextureRef::Borrowed(name) => name,
        }
    }

    pub fn release(self) {
        if let TextureRef::Owned(name) = self {
            gl::call!(gl::DeleteTextures(1, &name));
        }
    }
}

/// Uploads a decoded bitmap as an RGBA texture with mipmaps.
pub fn upload_texture(bitmap: &Bitmap) -> gl::types::GLuint {
    let format = if bitmap.channels == 3 {
        gl::RGB
    } else {
        gl::RGBA
    };
    let mut texture = 0;
    gl::call!(gl::GenTextures(1, &mut texture));
    gl::call!(gl::BindTexture(gl::TEXTURE_2D, texture));
    // Decoded rows are tightly packed.
    gl::call!(gl::PixelStorei(gl::UNPACK_ALIGNMENT, 1));
    gl::call!(gl::TexImage2D(
        gl::TEXTURE_2D,
        0,
        gl::RGBA as i32,
        bitmap.width as i32,
        bitmap.height as i32,
        0,
        format,
        gl::UNSIGNED_BYTE,
        bitmap.pixels.as_ptr() as *const c_void,
    ));
    gl::call!(gl::TexParameteri(
        gl::TEXTURE_2D,
        gl::TEXTURE_MAG_FILTER,
        gl::LINEAR as i32
    ));
    gl::call!(gl::TexParameteri(
        gl::TEXTURE_2D,
        gl::TEXTURE_MIN_FILTER,
        gl::LINEAR_MIPMAP_NEAREST as i32
    ));
    gl::call!(gl::GenerateMipmap(gl::TEXTURE_2D));
    gl::call!(gl::BindTexture(gl::TEXTURE_2D, 0));
    texture
}

/// Position of an object in the registry, valid for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle(pub usize);

/// Owns every renderable object of the scene along with its GPU resources.
pub struct ResourceRegistry {
    asset_dir: PathBuf,
    objects: Vec<RenderableObject>,
}

impl ResourceRegistry {
    pub fn new(asset_dir: impl Into<PathBuf>) -> ResourceRegistry {
        ResourceRegistry {
            asset_dir: asset_dir.into(),
            objects: Vec::new(),
        }
    }

    /// Loads a mesh (and optionally a texture) from the asset directory,
    /// uploads it, and appends a static object using `program`.
    ///
    /// A missing or empty mesh is an error. A texture that fails to load is
    /// only logged, and the object is drawn without one.
    pub fn create_object(
        &mut self,
        mesh_file: impl AsRef<Path>,
        texture_file: Option<&str>,
        program: ProgramKind,
        emission: Vec4,
    ) -> anyhow::Result<ObjectHandle> {
        let mesh_path = self.asset_dir.join(mesh_file);
        let mesh = mesh::load_obj(&mesh_path)
            .with_context(|| format!("could not create object from {}", mesh_path.display()))?;
        let geometry = Geometry::upload(&mesh);

        let texture = match texture_file {
            Some(texture_file) if mesh.has_texcoords() => {
                self.load_texture(&self.asset_dir.join(texture_file))
            }
            Some(texture_file) => {
                log::warn!(
                    "{} has no texture coordinates, not applying {texture_file}",
                    mesh_path.display()
                );
                TextureRef::None
            }
            None => TextureRef::None,
        };

        log::info!(
            "created {program:?} object from {} ({} vertices, {} indices)",
            mesh_path.display(),
            mesh.vertex_count(),
            geometry.index_count,
        );
        Ok(self.push(RenderableObject {
            program,
            geometry,
            texture,
            emission,
            model: glam::Mat4::IDENTITY,
            motion: Motion::Static,
            emits_light: false,
        }))
    }

    fn load_texture(&self, path: &Path) -> TextureRef {
        match bmp::load_bmp(path) {
            Some(bitmap) => {
                log::debug!(
                    "uploading {}x{} texture with {} bits per pixel",
                    bitmap.width,
                    bitmap.height,
                    bitmap.bits_per_pixel()
                );
                TextureRef::Owned(upload_texture(&bitmap))
            }
            None => {
                log::warn!("could not load texture {}, drawing untextured", path.display());
                TextureRef::None
            }
        }
    }

    pub fn push(&mut self, object: RenderableObject) -> ObjectHandle {
        self.objects.push(object);
        ObjectHandle(self.objects.len() - 1)
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> &mut RenderableObject {
        &mut self.objects[handle.0]
    }

    pub fn objects(&self) -> &[RenderableObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [RenderableObject] {
        &mut self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Releases every object's buffers and owned texture. Safe to call more
    /// than once; released objects are removed from the registry.
    pub fn release_all(&mut self) {
        if !self.objects.is_empty() {
            log::debug!("releasing {} objects", self.objects.len());
        }
        for object in self.objects.drain(..) {
            object.release();
        }
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
