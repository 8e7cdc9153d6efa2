//! Texture readback through a mappable staging buffer.

use std::sync::mpsc;

use super::GpuContext;
use crate::encoding::{GridLayout, Slot};
use crate::error::GpuError;
use crate::grid::StateGrid;

const BYTES_PER_SLOT: u32 = std::mem::size_of::<Slot>() as u32;

/// Row pitch of the staging buffer: the texel row rounded up to the copy alignment.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_SLOT;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Copy a whole state texture into a [`StateGrid`]. Blocks until the GPU is done.
pub(crate) fn read_texture(
    context: &GpuContext,
    texture: &wgpu::Texture,
    layout: GridLayout,
) -> Result<StateGrid, GpuError> {
    let (width, height) = (layout.width(), layout.height());
    let padded = padded_bytes_per_row(width);

    let staging = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("State Grid Staging Buffer"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    context.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    context.device.poll(wgpu::Maintain::Wait);

    receiver
        .recv()
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?
        .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

    let mut slots = Vec::with_capacity(layout.slot_count());
    {
        let data = slice.get_mapped_range();
        let row_bytes = (width * BYTES_PER_SLOT) as usize;
        for row in data.chunks_exact(padded as usize) {
            slots.extend(
                row[..row_bytes]
                    .chunks_exact(BYTES_PER_SLOT as usize)
                    .map(bytemuck::pod_read_unaligned::<Slot>),
            );
        }
    }
    staging.unmap();

    Ok(StateGrid::from_slots(layout, slots))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_padding() {
        // 4 texels * 16 bytes = 64 -> one alignment unit
        assert_eq!(padded_bytes_per_row(4), 256);
        assert_eq!(padded_bytes_per_row(16), 256);
        assert_eq!(padded_bytes_per_row(17), 512);
        assert_eq!(padded_bytes_per_row(2048), 2048 * 16);
    }
}
