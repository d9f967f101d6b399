use std::f32::consts::PI;
use std::ffi::c_void;
use std::path::Path;
use std::ptr;

use anyhow::Context;
use glam::{Mat4, Vec3, Vec4};

use crate::mesh;
use crate::renderer::gl;
use crate::renderer::program::{ProgramKind, ShaderProgram};
use crate::renderer::registry::{Geometry, TextureRef};
use crate::scene::RenderableObject;

/// Side length of the blur kernel the compositing shader expects.
pub const KERNEL_SIZE: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum FramebufferError {
    #[error(
        "color attachment is {}x{} but depth/stencil attachment is {}x{}",
        color.0, color.1, depth_stencil.0, depth_stencil.1
    )]
    AttachmentMismatch {
        color: (i32, i32),
        depth_stencil: (i32, i32),
    },
    #[error("framebuffer has an empty {0}x{1} attachment")]
    EmptyAttachment(i32, i32),
    #[error("framebuffer is incomplete (status 0x{0:x})")]
    Incomplete(gl::types::GLenum),
}

/// The sizes the color and depth/stencil attachments are allocated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentExtents {
    pub color: (i32, i32),
    pub depth_stencil: (i32, i32),
}

impl AttachmentExtents {
    pub fn uniform(width: i32, height: i32) -> AttachmentExtents {
        AttachmentExtents {
            color: (width, height),
            depth_stencil: (width, height),
        }
    }

    /// The completeness rules that can be checked before any GL object is
    /// created: non-empty attachments of equal size.
    pub fn verify(&self) -> Result<(), FramebufferError> {
        let (width, height) = self.color;
        if width <= 0 || height <= 0 {
            return Err(FramebufferError::EmptyAttachment(width, height));
        }
        if self.color != self.depth_stencil {
            return Err(FramebufferError::AttachmentMismatch {
                color: self.color,
                depth_stencil: self.depth_stencil,
            });
        }
        Ok(())
    }
}

/// A framebuffer with an RGBA color texture and a depth/stencil renderbuffer.
pub struct OffscreenTarget {
    framebuffer: gl::types::GLuint,
    color_texture: gl::types::GLuint,
    depth_stencil: gl::types::GLuint,
    pub width: i32,
    pub height: i32,
}

impl OffscreenTarget {
    pub fn new(width: i32, height: i32) -> Result<OffscreenTarget, FramebufferError> {
        OffscreenTarget::with_extents(AttachmentExtents::uniform(width, height))
    }

    pub fn with_extents(extents: AttachmentExtents) -> Result<OffscreenTarget, FramebufferError> {
        extents.verify()?;
        let (width, height) = extents.color;

        let mut framebuffer = 0;
        gl::call!(gl::GenFramebuffers(1, &mut framebuffer));
        gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer));

        let mut color_texture = 0;
        gl::call!(gl::GenTextures(1, &mut color_texture));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, color_texture));
        gl::call!(gl::TexImage2D(
            gl::TEXTURE_2D,
            0,
            gl::RGBA as i32,
            width,
            height,
            0,
            gl::RGBA,
            gl::UNSIGNED_BYTE,
            ptr::null::<c_void>(),
        ));
        gl::call!(gl::TexParameteri(
            gl::TEXTURE_2D,
            gl::TEXTURE_MAG_FILTER,
            gl::NEAREST as i32
        ));
        gl::call!(gl::TexParameteri(
            gl::TEXTURE_2D,
            gl::TEXTURE_MIN_FILTER,
            gl::NEAREST as i32
        ));
        gl::call!(gl::FramebufferTexture2D(
            gl::FRAMEBUFFER,
            gl::COLOR_ATTACHMENT0,
            gl::TEXTURE_2D,
            color_texture,
            0,
        ));

        let (depth_width, depth_height) = extents.depth_stencil;
        let mut depth_stencil = 0;
        gl::call!(gl::GenRenderbuffers(1, &mut depth_stencil));
        gl::call!(gl::BindRenderbuffer(gl::RENDERBUFFER, depth_stencil));
        gl::call!(gl::RenderbufferStorage(
            gl::RENDERBUFFER,
            gl::DEPTH24_STENCIL8,
            depth_width,
            depth_height,
        ));
        gl::call!(gl::FramebufferRenderbuffer(
            gl::FRAMEBUFFER,
            gl::DEPTH_STENCIL_ATTACHMENT,
            gl::RENDERBUFFER,
            depth_stencil,
        ));

        let draw_buffers = [gl::COLOR_ATTACHMENT0];
        gl::call!(gl::DrawBuffers(1, draw_buffers.as_ptr()));

        // Constructed before the status check so that Drop cleans up on failure.
        let target = OffscreenTarget {
            framebuffer,
            color_texture,
            depth_stencil,
            width,
            height,
        };
        let status = gl::call!(gl::CheckFramebufferStatus(gl::FRAMEBUFFER));
        gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, 0));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, 0));
        gl::call!(gl::BindRenderbuffer(gl::RENDERBUFFER, 0));
        if status != gl::FRAMEBUFFER_COMPLETE {
            return Err(FramebufferError::Incomplete(status));
        }
        Ok(target)
    }

    pub fn bind(&self) {
        gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, self.framebuffer));
    }

    pub fn color_texture(&self) -> gl::types::GLuint {
        self.color_texture
    }
}

impl Drop for OffscreenTarget {
    fn drop(&mut self) {
        gl::call!(gl::DeleteFramebuffers(1, &self.framebuffer));
        gl::call!(gl::DeleteTextures(1, &self.color_texture));
        gl::call!(gl::DeleteRenderbuffers(1, &self.depth_stencil));
    }
}

/// The 2D Gaussian `exp(-(x² + y²) / 2σ²) / 2πσ²`.
pub fn gaussian(x: f32, y: f32, sigma: f32) -> f32 {
    let two_sigma_squared = 2.0 * sigma * sigma;
    (-(x * x + y * y) / two_sigma_squared).exp() / (PI * two_sigma_squared)
}

/// A row-major `KERNEL_SIZE`² blur kernel, normalized to sum to one. Without a
/// sigma, the kernel passes the center texel through unchanged.
pub fn gaussian_kernel(sigma: Option<f32>) -> [f32; KERNEL_SIZE * KERNEL_SIZE] {
    let mut kernel = [0.0; KERNEL_SIZE * KERNEL_SIZE];
    let half = (KERNEL_SIZE / 2) as i32;
    match sigma {
        Some(sigma) if sigma > 0.0 => {
            for (i, weight) in kernel.iter_mut().enumerate() {
                let x = (i % KERNEL_SIZE) as i32 - half;
                let y = (i / KERNEL_SIZE) as i32 - half;
                *weight = gaussian(x as f32, y as f32, sigma);
            }
            let sum: f32 = kernel.iter().sum();
            kernel.iter_mut().for_each(|weight| *weight /= sum);
        }
        _ => kernel[KERNEL_SIZE * KERNEL_SIZE / 2] = 1.0,
    }
    kernel
}

/// Second pass of the offscreen variant: draws the offscreen color target on a
/// screen-aligned quad.
pub struct Compositor {
    target: OffscreenTarget,
    quad: RenderableObject,
    program: ShaderProgram,
}

impl Compositor {
    /// Creates the offscreen target, loads the quad mesh and configures the
    /// compositing program's uniforms once.
    pub fn new(
        width: i32,
        height: i32,
        plane_mesh: &Path,
        program: ShaderProgram,
        blur_sigma: Option<f32>,
    ) -> anyhow::Result<Compositor> {
        let target = OffscreenTarget::new(width, height)
            .with_context(|| format!("could not create a {width}x{height} offscreen target"))?;
        let mesh = mesh::load_obj(plane_mesh).context("could not load the compositing quad")?;

        // The plane mesh lies on the X-Z plane, turn it to face the camera.
        let quad = RenderableObject {
            program: ProgramKind::Composite,
            geometry: Geometry::upload(&mesh),
            texture: TextureRef::Borrowed(target.color_texture()),
            model: Mat4::from_rotation_x(90f32.to_radians()),
            ..RenderableObject::default()
        };

        let vp = Mat4::orthographic_rh_gl(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0);
        program.set_uniform("vp", vp);
        program.set_uniform("model", quad.model);
        let kernel = gaussian_kernel(blur_sigma);
        program.set_uniform("kernel", &kernel[..]);
        program.set_uniform(
            "texelSize",
            Vec4::new(1.0 / width as f32, 1.0 / height as f32, 0.0, 0.0),
        );
        log::info!("compositing through a {width}x{height} offscreen target");

        Ok(Compositor {
            target,
            quad,
            program,
        })
    }

    pub fn target(&self) -> &OffscreenTarget {
        &self.target
    }

    /// Binds the default framebuffer, clears it and draws the quad.
    pub fn composite(&self, clear_color: Vec3) {
        let quad = &self.quad;
        gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, 0));
        gl::call!(gl::ClearColor(clear_color.x, clear_color.y, clear_color.z, 1.0));
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));
        self.program.bind();
        gl::call!(gl::BindVertexArray(quad.geometry.vao));
        gl::call!(gl::ActiveTexture(gl::TEXTURE0));
        gl::call!(gl::BindTexture(gl::TEXTURE_2D, quad.texture.name()));
        gl::call!(gl::DrawElements(
            gl::TRIANGLES,
            quad.geometry.index_count,
            gl::UNSIGNED_INT,
            ptr::null::<c_void>(),
        ));
        gl::call!(gl::BindVertexArray(0));
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        // The quad only borrows the target's texture, the target frees it.
        std::mem::take(&mut self.quad.geometry).release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_attachments_are_incomplete() {
        let extents = AttachmentExtents {
            color: (800, 600),
            depth_stencil: (640, 480),
        };
        let err = extents.verify().unwrap_err();
        assert!(matches!(err, FramebufferError::AttachmentMismatch { .. }));
        assert_eq!(
            "color attachment is 800x600 but depth/stencil attachment is 640x480",
            err.to_string()
        );
    }

    #[test]
    fn matching_attachments_pass() {
        assert!(AttachmentExtents::uniform(800, 600).verify().is_ok());
    }

    #[test]
    fn empty_attachments_are_incomplete() {
        let err = AttachmentExtents::uniform(0, 600).verify().unwrap_err();
        assert!(matches!(err, FramebufferError::EmptyAttachment(0, 600)));
    }

    #[test]
    fn gaussian_peaks_at_the_origin() {
        let sigma = 1.0;
        let peak = gaussian(0.0, 0.0, sigma);
        assert!((peak - 1.0 / (2.0 * PI)).abs() < 1e-6);
        assert!(gaussian(1.0, 0.0, sigma) < peak);
        assert_eq!(gaussian(1.0, 2.0, sigma), gaussian(-2.0, 1.0, sigma));
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(Some(1.2));
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        let center = kernel[12];
        assert!(kernel.iter().all(|&weight| weight <= center));
        for i in 0..kernel.len() {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn kernel_without_sigma_is_identity() {
        let kernel = gaussian_kernel(None);
        assert_eq!(1.0, kernel[12]);
        assert_eq!(1.0, kernel.iter().sum::<f32>());
        assert_eq!(kernel, gaussian_kernel(Some(0.0)));
    }
}
