use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{GpuContext, GRID_USAGES};
use crate::emission::Run;
use crate::encoding::{GridLayout, Slot};
use crate::error::GpuError;
use crate::grid::StateGrid;
use crate::physics::StepParams;
use crate::substrate::Substrate;

/// Texel format of every state grid: one slot per texel.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// WGSL source of the physics step.
pub const PHYSICS_SHADER: &str = include_str!("physics.wgsl");

const WORKGROUP_SIZE: u32 = 8;
const BYTES_PER_SLOT: u32 = std::mem::size_of::<Slot>() as u32;

/// Uniform block of the physics shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct StepUniforms {
    pub time_step: f32,
    pub _padding: [f32; 3],
}

impl From<&StepParams> for StepUniforms {
    fn from(params: &StepParams) -> Self {
        Self {
            time_step: params.time_step,
            _padding: [0.0; 3],
        }
    }
}

/// A state grid held in an `Rgba32Float` texture.
pub struct GpuGrid {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    layout: GridLayout,
}

impl GpuGrid {
    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.layout.width(),
            height: self.layout.height(),
            depth_or_array_layers: 1,
        }
    }
}

/// wgpu implementation of [`Substrate`].
pub struct GpuSubstrate {
    context: GpuContext,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniforms: StepUniforms,
}

impl GpuSubstrate {
    /// Verify `layout` fits the adapter, then build the physics pipeline.
    pub fn new(context: GpuContext, layout: &GridLayout) -> Result<Self, GpuError> {
        context.check_layout(layout)?;
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Physics Shader"),
            source: wgpu::ShaderSource::Wgsl(PHYSICS_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Physics Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: STATE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Physics Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Physics Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let uniforms = StepUniforms::from(&StepParams::default());
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Physics Uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            context,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            uniforms,
        })
    }

    #[inline]
    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Copy `grid` back to host memory.
    pub fn read_grid(&self, grid: &GpuGrid) -> Result<StateGrid, GpuError> {
        super::readback::read_texture(&self.context, &grid.texture, grid.layout)
    }
}

impl Substrate for GpuSubstrate {
    type Grid = GpuGrid;

    fn create_grid(&mut self, layout: &GridLayout, label: &str) -> GpuGrid {
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: layout.width(),
                height: layout.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: GRID_USAGES,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // New textures are zero-initialized: every particle starts inactive
        GpuGrid {
            texture,
            view,
            layout: *layout,
        }
    }

    fn write_run(&mut self, grid: &mut GpuGrid, run: &Run, data: &[Slot]) {
        debug_assert_eq!(data.len(), run.len as usize);
        if run.len == 0 {
            return;
        }
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &grid.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: run.x,
                    y: run.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(run.len * BYTES_PER_SLOT),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: run.len,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    fn step(&mut self, input: &GpuGrid, output: &mut GpuGrid, params: &StepParams) {
        let uniforms = StepUniforms::from(params);
        if uniforms.time_step != self.uniforms.time_step {
            self.context
                .queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
            self.uniforms = uniforms;
        }

        let device = &self.context.device;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Physics Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&output.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Physics Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Physics Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            // One invocation per particle: x walks the particles of a row
            let groups = input.layout.side().div_ceil(WORKGROUP_SIZE);
            pass.dispatch_workgroups(groups, groups, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn copy(&mut self, src: &GpuGrid, dst: &mut GpuGrid) {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Publish Encoder"),
            });
        encoder.copy_texture_to_texture(
            src.texture.as_image_copy(),
            dst.texture.as_image_copy(),
            src.extent(),
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_uniforms_layout() {
        assert_eq!(std::mem::size_of::<StepUniforms>(), 16);
        let uniforms = StepUniforms::from(&StepParams { time_step: 0.25 });
        assert_eq!(bytemuck::cast::<_, [f32; 4]>(uniforms), [0.25, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_physics_shader_is_valid() {
        let module = naga::front::wgsl::parse_str(PHYSICS_SHADER)
            .unwrap_or_else(|e| panic!("WGSL parse error:\n{}", e.emit_to_string(PHYSICS_SHADER)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("WGSL validation error: {e:?}"));

        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == "main")
            .expect("physics shader has a `main` entry point");
        assert_eq!(entry.workgroup_size, [WORKGROUP_SIZE, WORKGROUP_SIZE, 1]);
    }
}
