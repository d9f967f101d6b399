#![allow(clippy::all, non_upper_case_globals, dead_code, unused_imports)]

use std::ffi::{c_void, CString};

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

/// Runs the given GL call in an unsafe block, and in debug builds, panics with
/// the call site if `glGetError` reports anything afterwards.
macro_rules! call {
    ($expr:expr) => {{
        let result = unsafe { $expr };
        if cfg!(debug_assertions) {
            use $crate::renderer::gl as gl_errors;
            let error = unsafe { gl_errors::GetError() };
            if error != gl_errors::NO_ERROR {
                let error_number_stringified;
                let error_name = match error {
                    gl_errors::INVALID_ENUM => "INVALID_ENUM",
                    gl_errors::INVALID_VALUE => "INVALID_VALUE",
                    gl_errors::INVALID_OPERATION => "INVALID_OPERATION",
                    gl_errors::OUT_OF_MEMORY => "OUT_OF_MEMORY",
                    gl_errors::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
                    _ => {
                        error_number_stringified = format!("{error}");
                        &error_number_stringified
                    }
                };
                panic!(
                    "OpenGL error {error_name} at {}:{}:{}",
                    file!(),
                    line!(),
                    column!(),
                );
            }
        }
        result
    }};
}

pub(crate) use call;

/// Uploads `data` into the buffer currently bound to `target`.
pub fn buffer_data<T: bytemuck::Pod>(target: types::GLenum, data: &[T], usage: types::GLenum) {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    call!(BufferData(
        target,
        bytes.len() as isize,
        bytes.as_ptr() as *const c_void,
        usage,
    ));
}

/// Returns the info log of a shader object, e.g. the compiler's diagnostics.
pub fn shader_info_log(shader: types::GLuint) -> String {
    let mut length = 0;
    call!(GetShaderiv(shader, INFO_LOG_LENGTH, &mut length));
    let mut info_log = vec![0u8; length.max(1) as usize];
    let mut written = 0;
    call!(GetShaderInfoLog(
        shader,
        info_log.len() as i32,
        &mut written,
        info_log.as_mut_ptr() as *mut types::GLchar,
    ));
    String::from_utf8_lossy(&info_log[..written as usize]).into_owned()
}

/// Returns the info log of a program object, e.g. the linker's diagnostics.
pub fn program_info_log(program: types::GLuint) -> String {
    let mut length = 0;
    call!(GetProgramiv(program, INFO_LOG_LENGTH, &mut length));
    let mut info_log = vec![0u8; length.max(1) as usize];
    let mut written = 0;
    call!(GetProgramInfoLog(
        program,
        info_log.len() as i32,
        &mut written,
        info_log.as_mut_ptr() as *mut types::GLchar,
    ));
    String::from_utf8_lossy(&info_log[..written as usize]).into_owned()
}

pub fn get_uniform_location(program: types::GLuint, name: &str) -> Option<types::GLint> {
    let name = CString::new(name).ok()?;
    let location = call!(GetUniformLocation(program, name.as_ptr()));
    (location != -1).then_some(location)
}

/// Lists the names and locations of every active uniform of a linked program.
/// Built-in uniforms (which have no location) are skipped.
pub fn active_uniforms(program: types::GLuint) -> Vec<(String, types::GLint)> {
    let mut count = 0;
    let mut max_name_length = 0;
    call!(GetProgramiv(program, ACTIVE_UNIFORMS, &mut count));
    call!(GetProgramiv(
        program,
        ACTIVE_UNIFORM_MAX_LENGTH,
        &mut max_name_length
    ));
    let mut name_buffer = vec![0u8; max_name_length.max(1) as usize];
    let mut uniforms = Vec::with_capacity(count as usize);
    for index in 0..count as types::GLuint {
        let mut length = 0;
        let mut size = 0;
        let mut type_ = 0;
        call!(GetActiveUniform(
            program,
            index,
            name_buffer.len() as i32,
            &mut length,
            &mut size,
            &mut type_,
            name_buffer.as_mut_ptr() as *mut types::GLchar,
        ));
        let name = String::from_utf8_lossy(&name_buffer[..length as usize]).into_owned();
        if let Some(location) = get_uniform_location(program, &name) {
            uniforms.push((name, location));
        }
    }
    uniforms
}
