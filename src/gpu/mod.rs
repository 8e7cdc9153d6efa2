//! GPU substrate.
//!
//! State grids live in `Rgba32Float` textures. The physics step is a compute
//! pass that reads the input texture and writes the output texture as a storage
//! texture, one invocation per particle. Emission writes runs with
//! `Queue::write_texture`, and copy-back publishing is a texture-to-texture copy.
//!
//! [`GpuContext`] owns the device and queue and performs the startup checks;
//! [`GpuSubstrate`] implements [`Substrate`](crate::substrate::Substrate) on top
//! of it; [`PointRenderer`] draws the current grid as additive point sprites.

mod compute;
mod readback;
mod render;

pub use compute::{GpuGrid, GpuSubstrate, StepUniforms, PHYSICS_SHADER, STATE_FORMAT};
pub use render::{PointRenderer, RenderUniforms, RENDER_SHADER};

use crate::encoding::GridLayout;
use crate::error::GpuError;

/// Texture usages every state grid needs.
pub const GRID_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::STORAGE_BINDING)
    .union(wgpu::TextureUsages::COPY_DST)
    .union(wgpu::TextureUsages::COPY_SRC);

/// Device, queue and the adapter they came from.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Request an adapter (compatible with `surface`, if given) and a device.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Particle Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// A context without a surface, for compute-only use and tests.
    pub fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        pollster::block_on(Self::new(&instance, None))
    }

    /// Fail unless grids for `layout` can be created and used by the physics step.
    pub fn check_layout(&self, layout: &GridLayout) -> Result<(), GpuError> {
        let features = self.adapter.get_texture_format_features(STATE_FORMAT);
        let missing = GRID_USAGES.difference(features.allowed_usages);
        if !missing.is_empty() {
            return Err(GpuError::UnsupportedFormat {
                format: STATE_FORMAT,
                missing,
            });
        }

        let max = self.device.limits().max_texture_dimension_2d;
        if layout.width() > max || layout.height() > max {
            return Err(GpuError::GridTooLarge {
                width: layout.width(),
                height: layout.height(),
                max,
            });
        }
        Ok(())
    }
}
