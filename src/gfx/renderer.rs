// src/gfx/renderer.rs
//! Renderer adapter for the cloth surface
//!
//! Binds the simulation's live position and normal storage buffers
//! (read-only) plus its triangle index stream and submits a single
//! indexed draw per frame. The host application owns the render pass,
//! camera, and surface; this adapter only supplies the cloth geometry.

use cgmath::Matrix4;
use log::warn;

use crate::error::ClothError;
use crate::sim::cloth::ClothSimulation;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder},
    binding_types,
    uniform_buffer::UniformBuffer,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

/// Draws a cloth simulation's surface into a caller-supplied render pass
pub struct ClothRenderer {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    camera_buffer: UniformBuffer<CameraUniform>,
}

impl ClothRenderer {
    /// Builds the draw pipeline against a simulation's buffers
    ///
    /// The bind group holds read-only views of the simulation's position
    /// and normal buffers, so the renderer must not outlive the
    /// simulation's disposal.
    pub fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        simulation: &ClothSimulation,
    ) -> Result<Self, ClothError> {
        let (Some(positions), Some(normals)) =
            (simulation.position_buffer(), simulation.normal_buffer())
        else {
            return Err(ClothError::Config(
                "cannot build a renderer for a disposed simulation".into(),
            ));
        };

        let camera_buffer = UniformBuffer::new(device);

        let layout_with_desc = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::storage_buffer_read_only()) // positions
            .next_binding_vertex(binding_types::storage_buffer_read_only()) // normals
            .next_binding_vertex(binding_types::uniform()) // camera
            .create(device, "Cloth Draw Layout");

        let bind_group = BindGroupBuilder::new(&layout_with_desc)
            .buffer(positions)
            .buffer(normals)
            .buffer(camera_buffer.buffer())
            .create(device, "Cloth Draw Bind Group");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cloth Draw Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/cloth_draw.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cloth Draw Pipeline Layout"),
            bind_group_layouts: &[&layout_with_desc.layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Cloth Draw Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                // Vertices are pulled from the storage buffers by index.
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                // Cloth is visible from both sides.
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            pipeline,
            bind_group,
            camera_buffer,
        })
    }

    /// Uploads the view-projection matrix for the next draw
    pub fn update_camera(&mut self, queue: &wgpu::Queue, view_proj: Matrix4<f32>) {
        self.camera_buffer.update_content(
            queue,
            CameraUniform {
                view_proj: view_proj.into(),
            },
        );
    }

    /// Submits one indexed draw of the cloth surface
    ///
    /// Silently does nothing until the simulation's initialization fence
    /// has resolved, and warns once the simulation has been disposed.
    pub fn draw<'pass>(
        &'pass self,
        render_pass: &mut wgpu::RenderPass<'pass>,
        simulation: &'pass ClothSimulation,
    ) {
        if !simulation.is_running() {
            return;
        }
        let Some(index_buffer) = simulation.index_buffer() else {
            warn!("draw requested for a disposed cloth simulation");
            return;
        };

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..simulation.index_count(), 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_uniform_is_one_mat4() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }
}
