//! Error types for texel-particles.
//!
//! Every error here is an initialization failure. Once a [`ParticleSystem`](crate::ParticleSystem)
//! exists, emission, stepping and publishing cannot fail.

use thiserror::Error;

/// Errors that can occur when deriving a grid layout from a particle capacity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A capacity of zero particles.
    #[error("Particle capacity must be greater than zero")]
    ZeroCapacity,
    /// Capacity that is not a perfect square.
    #[error("Particle capacity {0} is not a perfect square (e.g. 1048576 = 1024 * 1024)")]
    NotSquare(u32),
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("Failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The adapter cannot use 32-bit float RGBA textures the way the state grid needs.
    #[error("Float state textures not supported: {format:?} is missing {missing:?}")]
    UnsupportedFormat {
        format: wgpu::TextureFormat,
        missing: wgpu::TextureUsages,
    },
    /// The state grid does not fit in a single 2D texture on this adapter.
    #[error("State grid {width}x{height} exceeds the adapter's max 2D texture size {max}")]
    GridTooLarge { width: u32, height: u32, max: u32 },
    /// Failed to map buffer for reading.
    #[error("Failed to map GPU buffer: {0}")]
    BufferMapping(String),
}

/// Errors that can occur when dumping a state grid for inspection.
#[derive(Debug, Error)]
pub enum DebugError {
    /// Failed to encode or write the image.
    #[error("Failed to write debug image: {0}")]
    Image(#[from] image::ImageError),
    /// Reading the grid back from the GPU failed.
    #[error("Failed to read state grid: {0}")]
    Gpu(#[from] GpuError),
}

/// Errors that can occur when running a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Failed to create event loop.
    #[error("Failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("Failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The configured capacity cannot be laid out as a grid.
    #[error("Invalid particle capacity: {0}")]
    Layout(#[from] LayoutError),
}
