use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

use anyhow::Context;
use glam::{Mat4, Vec4};

use crate::renderer::gl;

/// The vertex attribute location of mesh positions.
pub const ATTR_LOC_POSITION: gl::types::GLuint = 0;
/// The vertex attribute location of mesh texture coordinates.
pub const ATTR_LOC_TEXCOORD: gl::types::GLuint = 1;
/// The vertex attribute location of mesh normals.
pub const ATTR_LOC_NORMAL: gl::types::GLuint = 2;

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("compiling {stage} shader failed: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("linking shader program failed: {log}")]
    Link { log: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn gl_enum(self) -> gl::types::GLenum {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
        }
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// The lighting model (or screen pass) a shader program implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Unlit textured surface with an emission term, used for the sun.
    Emissive,
    Flat,
    Gouraud,
    Phong,
    BlinnPhong,
    /// Draws the offscreen color target onto a screen-aligned quad.
    Composite,
}

impl ProgramKind {
    pub const LIGHTING: [ProgramKind; 4] = [
        ProgramKind::Flat,
        ProgramKind::Gouraud,
        ProgramKind::Phong,
        ProgramKind::BlinnPhong,
    ];

    /// File names of the vertex and fragment stages, relative to the shader
    /// directory.
    pub fn source_files(self) -> (&'static str, &'static str) {
        match self {
            ProgramKind::Emissive => ("vs.glsl", "fs.glsl"),
            ProgramKind::Flat => ("vs_flat.glsl", "fs_flat.glsl"),
            ProgramKind::Gouraud => ("vs_gouraud.glsl", "fs_gouraud.glsl"),
            ProgramKind::Phong => ("vs_phong.glsl", "fs_phong.glsl"),
            ProgramKind::BlinnPhong => ("vs_blinn.glsl", "fs_blinn.glsl"),
            ProgramKind::Composite => ("vs_fbo.glsl", "fs_fbo.glsl"),
        }
    }

    /// Flat-shaded programs take their per-face color from the first vertex of
    /// each triangle.
    pub fn is_flat(self) -> bool {
        self == ProgramKind::Flat
    }
}

pub enum UniformValue<'a> {
    Float(f32),
    FloatArray(&'a [f32]),
    Vec4(Vec4),
    Vec4Array(&'a [Vec4]),
    Mat4(Mat4),
}

impl From<f32> for UniformValue<'_> {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl<'a> From<&'a [f32]> for UniformValue<'a> {
    fn from(value: &'a [f32]) -> Self {
        UniformValue::FloatArray(value)
    }
}

impl From<Vec4> for UniformValue<'_> {
    fn from(value: Vec4) -> Self {
        UniformValue::Vec4(value)
    }
}

impl<'a> From<&'a [Vec4]> for UniformValue<'a> {
    fn from(value: &'a [Vec4]) -> Self {
        UniformValue::Vec4Array(value)
    }
}

impl From<Mat4> for UniformValue<'_> {
    fn from(value: Mat4) -> Self {
        UniformValue::Mat4(value)
    }
}

/// Uniform name to location table of one linked program. Array uniforms are
/// stored under their bare name, so `light` resolves `light[0]`.
#[derive(Debug, Default)]
pub struct UniformSlots {
    locations: HashMap<String, gl::types::GLint>,
}

impl UniformSlots {
    pub fn new<S: Into<String>>(uniforms: impl IntoIterator<Item = (S, gl::types::GLint)>) -> Self {
        let locations = uniforms
            .into_iter()
            .map(|(name, location)| {
                let mut name = name.into();
                if name.ends_with("[0]") {
                    name.truncate(name.len() - 3);
                }
                (name, location)
            })
            .collect();
        UniformSlots { locations }
    }

    pub fn location(&self, name: &str) -> Option<gl::types::GLint> {
        self.locations.get(name).copied()
    }

    /// Calls `write` with the uniform's location if the program declares it.
    /// Returns whether anything was written; a missing name is not an error.
    pub fn apply(&self, name: &str, write: impl FnOnce(gl::types::GLint)) -> bool {
        match self.location(name) {
            Some(location) => {
                write(location);
                true
            }
            None => false,
        }
    }
}

pub struct ShaderProgram {
    pub program: gl::types::GLuint,
    slots: UniformSlots,
}

impl ShaderProgram {
    /// Compiles both stages and links them. Never returns a zero program.
    pub fn compile_and_link(
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ShaderProgram, ShaderError> {
        let vertex_shader = create_shader(ShaderStage::Vertex, vertex_source)?;
        let fragment_shader = match create_shader(ShaderStage::Fragment, fragment_source) {
            Ok(shader) => shader,
            Err(err) => {
                gl::call!(gl::DeleteShader(vertex_shader));
                return Err(err);
            }
        };

        let program = gl::call!(gl::CreateProgram());
        gl::call!(gl::AttachShader(program, vertex_shader));
        gl::call!(gl::AttachShader(program, fragment_shader));
        gl::call!(gl::LinkProgram(program));
        gl::call!(gl::DeleteShader(vertex_shader));
        gl::call!(gl::DeleteShader(fragment_shader));

        let mut link_status = 0;
        gl::call!(gl::GetProgramiv(program, gl::LINK_STATUS, &mut link_status));
        if link_status == gl::FALSE as i32 {
            let log = gl::program_info_log(program);
            gl::call!(gl::DeleteProgram(program));
            return Err(ShaderError::Link { log });
        }

        let slots = UniformSlots::new(gl::active_uniforms(program));
        Ok(ShaderProgram { program, slots })
    }

    pub fn bind(&self) {
        gl::call!(gl::UseProgram(self.program));
    }

    /// Makes this program current and writes the uniform, if the program
    /// declares it. Returns false for names the program does not have.
    pub fn set_uniform<'a>(&self, name: &str, value: impl Into<UniformValue<'a>>) -> bool {
        self.bind();
        let value = value.into();
        self.slots.apply(name, |location| write_uniform(location, &value))
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        gl::call!(gl::DeleteProgram(self.program));
    }
}

fn create_shader(stage: ShaderStage, source: &str) -> Result<gl::types::GLuint, ShaderError> {
    let shader = gl::call!(gl::CreateShader(stage.gl_enum()));
    let sources = [source.as_ptr() as *const gl::types::GLchar];
    let source_lens = [source.len() as i32];
    gl::call!(gl::ShaderSource(
        shader,
        1,
        sources.as_ptr(),
        source_lens.as_ptr(),
    ));
    gl::call!(gl::CompileShader(shader));
    let mut compile_status = 0;
    gl::call!(gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut compile_status));
    if compile_status == gl::FALSE as i32 {
        let log = gl::shader_info_log(shader);
        gl::call!(gl::DeleteShader(shader));
        return Err(ShaderError::Compile { stage, log });
    }
    Ok(shader)
}

fn write_uniform(location: gl::types::GLint, value: &UniformValue) {
    match value {
        UniformValue::Float(f) => gl::call!(gl::Uniform1f(location, *f)),
        UniformValue::FloatArray(floats) => {
            gl::call!(gl::Uniform1fv(location, floats.len() as i32, floats.as_ptr()))
        }
        UniformValue::Vec4(vec) => gl::call!(gl::Uniform4fv(location, 1, vec.as_ref().as_ptr())),
        UniformValue::Vec4Array(vecs) => {
            let floats: &[f32] = bytemuck::cast_slice(vecs);
            gl::call!(gl::Uniform4fv(location, vecs.len() as i32, floats.as_ptr()))
        }
        // glam matrices are column major, like GL expects.
        UniformValue::Mat4(mat) => gl::call!(gl::UniformMatrix4fv(
            location,
            1,
            gl::FALSE,
            mat.as_ref().as_ptr()
        )),
    }
}

/// The compiled programs of one run, keyed by what they render.
pub struct ShaderPrograms {
    programs: HashMap<ProgramKind, ShaderProgram>,
}

impl ShaderPrograms {
    /// Builds the program of every requested kind. See [`load_program`].
    pub fn load(shader_dir: &Path, kinds: &[ProgramKind]) -> anyhow::Result<ShaderPrograms> {
        let mut programs = HashMap::with_capacity(kinds.len());
        for &kind in kinds {
            if !programs.contains_key(&kind) {
                programs.insert(kind, load_program(shader_dir, kind)?);
            }
        }
        Ok(ShaderPrograms { programs })
    }

    pub fn get(&self, kind: ProgramKind) -> Option<&ShaderProgram> {
        self.programs.get(&kind)
    }

    pub fn contains(&self, kind: ProgramKind) -> bool {
        self.programs.contains_key(&kind)
    }

    /// Writes the same uniform to every program. Programs without it are skipped.
    pub fn set_uniform_all<'a>(&self, name: &str, value: impl Into<UniformValue<'a>> + Copy) {
        for program in self.programs.values() {
            program.set_uniform(name, value);
        }
    }
}

/// Reads and compiles the sources of one program kind. A missing source file
/// or a failed compile aborts with the offending path.
pub fn load_program(shader_dir: &Path, kind: ProgramKind) -> anyhow::Result<ShaderProgram> {
    let (vertex_file, fragment_file) = kind.source_files();
    let vertex_path = shader_dir.join(vertex_file);
    let fragment_path = shader_dir.join(fragment_file);
    let vertex_source = read_source(&vertex_path)?;
    let fragment_source = read_source(&fragment_path)?;
    let program =
        ShaderProgram::compile_and_link(&vertex_source, &fragment_source).with_context(|| {
            format!(
                "could not build the {kind:?} program from {} and {}",
                vertex_path.display(),
                fragment_path.display()
            )
        })?;
    log::debug!("built {kind:?} program {}", program.program);
    Ok(program)
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("could not read shader source {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_uniforms_resolve_by_bare_name() {
        let slots = UniformSlots::new([("light[0]", 3), ("model", 0), ("k[0]", 6)]);
        assert_eq!(Some(3), slots.location("light"));
        assert_eq!(Some(6), slots.location("k"));
        assert_eq!(Some(0), slots.location("model"));
        assert_eq!(None, slots.location("light[0]"));
    }

    #[test]
    fn missing_uniform_is_a_silent_no_op() {
        let slots = UniformSlots::new([("vp", 0), ("model", 4)]);
        let mut written: HashMap<gl::types::GLint, f32> = HashMap::new();
        assert!(slots.apply("vp", |location| {
            written.insert(location, 1.0);
        }));
        assert!(slots.apply("model", |location| {
            written.insert(location, 2.0);
        }));

        let applied = slots.apply("shininess", |location| {
            written.insert(location, 99.0);
        });

        assert!(!applied);
        assert_eq!(2, written.len());
        assert_eq!(Some(&1.0), written.get(&0));
        assert_eq!(Some(&2.0), written.get(&4));
    }

    #[test]
    fn only_flat_kind_uses_flat_shading() {
        assert!(ProgramKind::Flat.is_flat());
        for kind in [
            ProgramKind::Emissive,
            ProgramKind::Gouraud,
            ProgramKind::Phong,
            ProgramKind::BlinnPhong,
            ProgramKind::Composite,
        ] {
            assert!(!kind.is_flat());
        }
    }

    #[test]
    fn compile_error_names_the_stage() {
        let err = ShaderError::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3: syntax error".to_string(),
        };
        assert_eq!(
            "compiling fragment shader failed: 0:3: syntax error",
            err.to_string()
        );
    }

    #[test]
    fn missing_source_file_names_the_path() {
        let err = load_program(Path::new("no/such/dir"), ProgramKind::Phong)
            .err()
            .expect("loading from a missing directory succeeded");
        let message = format!("{err:#}");
        assert!(message.contains("vs_phong.glsl"), "{message}");
    }
}
