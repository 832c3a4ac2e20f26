// src/sim/cloth.rs
//! GPU cloth simulation core
//!
//! `ClothSimulation` owns the device-resident particle state (position,
//! velocity, normal storage buffers), the three compute kernels that
//! update it, and the lifecycle around them. The external driver ticks it
//! once per frame with a wall-clock delta; a fixed-step accumulator turns
//! that into zero or more velocity/position dispatch pairs.
//!
//! Lifecycle: `new` allocates everything, `initialize` runs the init
//! kernel and issues an asynchronous readback as a completion fence,
//! `poll_initialized` drives the Uninitialized -> Running transition, and
//! `dispose` releases the buffers (idempotent).

use futures::channel::oneshot;
use log::{error, info, trace, warn};
use wgpu::util::DeviceExt;

use crate::error::ClothError;
use crate::sim::collision::CollisionSphere;
use crate::sim::scheduler::StepAccumulator;
use crate::sim::settings::{ClothConfig, SimulateSettings, THREAD_X, THREAD_Y};
use crate::sim::topology::ClothGrid;
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder},
    binding_types,
    uniform_buffer::{ArrayBuffer, UniformBuffer},
};

/// One 16-byte particle attribute slot (vec3 padded to vec4 on the GPU)
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleSlot(pub [f32; 4]);

/// Uniform parameter block shared by all three kernels
///
/// Field order matches the `ClothParams` struct in `shaders/cloth.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct ClothParams {
    grid_size: [u32; 2],
    particle_count: u32,
    pin_top_edge: u32,
    rest_lengths: [f32; 3],
    mass: f32,
    spring_stiffness: [f32; 3],
    delta_time: f32,
    wind: [f32; 3],
    wind_multiply_at_normal: f32,
    collider: [f32; 4],
}

impl ClothParams {
    fn new(config: &ClothConfig, grid: &ClothGrid) -> Self {
        let lengths = grid.rest_lengths();
        let settings = &config.settings;
        Self {
            grid_size: [grid.resolution(), grid.resolution()],
            particle_count: grid.particle_count(),
            pin_top_edge: config.pin_top_edge as u32,
            rest_lengths: [lengths.structural, lengths.shear, lengths.bend],
            mass: settings.mass,
            spring_stiffness: settings.spring_stiffness.into(),
            delta_time: settings.fixed_step,
            wind: settings.wind.into(),
            wind_multiply_at_normal: settings.wind_multiply_at_normal,
            collider: CollisionSphere::none().to_array(),
        }
    }
}

/// Host-side mirror of the kernel's pinning predicate
///
/// When `pin_top_edge` is set the top grid row keeps zero velocity; every
/// other particle integrates freely.
pub fn is_pinned(cell_y: u32, resolution: u32, pin_top_edge: bool) -> bool {
    pin_top_edge && cell_y == resolution - 1
}

/// Lifecycle states of a cloth instance
///
/// `Failed` is terminal: the only recovery is tearing the instance down
/// and building a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    /// Buffers allocated, init kernel not yet dispatched
    Uninitialized,
    /// Init dispatched, waiting on the readback fence
    Pending,
    /// Fence resolved cleanly; stepping and drawing are live
    Running,
    /// The fence reported a device error
    Failed,
    /// Buffers released
    Disposed,
}

/// What the initialization fence reported when last polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceSignal {
    /// Nothing yet; keep polling
    NotReady,
    /// The readback mapped cleanly
    Completed,
    /// The readback reported a device error
    DeviceError,
    /// The fence callback was dropped without firing
    Dropped,
}

impl SimulationState {
    /// Whether stepping and drawing are live in this state
    pub fn allows_draw(self) -> bool {
        self == SimulationState::Running
    }

    /// State after the initialization fence reports `signal`
    ///
    /// Only `Pending` moves; every other state ignores fence noise, and
    /// `Failed` is terminal.
    fn after_fence(self, signal: FenceSignal) -> SimulationState {
        match (self, signal) {
            (SimulationState::Pending, FenceSignal::Completed) => SimulationState::Running,
            (SimulationState::Pending, FenceSignal::DeviceError)
            | (SimulationState::Pending, FenceSignal::Dropped) => SimulationState::Failed,
            (state, _) => state,
        }
    }

    /// State after a dispose call, valid from any state
    fn after_dispose(self) -> SimulationState {
        SimulationState::Disposed
    }
}

/// Device-resident resources, released together on dispose
struct GpuResources {
    positions: ArrayBuffer<ParticleSlot>,
    velocities: ArrayBuffer<ParticleSlot>,
    normals: ArrayBuffer<ParticleSlot>,
    staging: ArrayBuffer<ParticleSlot>,
    params_buffer: UniformBuffer<ClothParams>,
    index_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    init_pipeline: wgpu::ComputePipeline,
    step_velocity_pipeline: wgpu::ComputePipeline,
    step_position_pipeline: wgpu::ComputePipeline,
}

/// A cloth mesh simulated as a mass-spring network on the GPU
pub struct ClothSimulation {
    grid: ClothGrid,
    config: ClothConfig,
    params: ClothParams,
    accumulator: StepAccumulator,
    state: SimulationState,
    index_count: u32,
    dispatch: (u32, u32),
    gpu: Option<GpuResources>,
    init_fence: Option<oneshot::Receiver<Result<(), wgpu::BufferAsyncError>>>,
}

impl ClothSimulation {
    /// Allocates buffers and builds the kernel pipelines for `config`
    pub fn new(device: &wgpu::Device, config: ClothConfig) -> Result<Self, ClothError> {
        config.validate()?;

        let grid = ClothGrid::new(config.resolution, config.size);
        let params = ClothParams::new(&config, &grid);
        let count = grid.particle_count() as usize;

        let positions = ArrayBuffer::new(device, count, false);
        let velocities = ArrayBuffer::new(device, count, false);
        let normals = ArrayBuffer::new(device, count, false);
        let staging = ArrayBuffer::new_staging(device, count);
        let params_buffer = UniformBuffer::new(device);

        let indices = grid.build_indices();
        let index_count = indices.len() as u32;
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cloth Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let layout_with_desc = BindGroupLayoutBuilder::new()
            .next_binding_compute(binding_types::storage_buffer_read_write()) // positions
            .next_binding_compute(binding_types::storage_buffer_read_write()) // velocities
            .next_binding_compute(binding_types::storage_buffer_read_write()) // normals
            .next_binding_compute(binding_types::uniform()) // params
            .create(device, "Cloth Kernel Layout");

        let bind_group = BindGroupBuilder::new(&layout_with_desc)
            .buffer(positions.buffer())
            .buffer(velocities.buffer())
            .buffer(normals.buffer())
            .buffer(params_buffer.buffer())
            .create(device, "Cloth Kernel Bind Group");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cloth Kernel Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/cloth.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cloth Kernel Pipeline Layout"),
            bind_group_layouts: &[&layout_with_desc.layout],
            push_constant_ranges: &[],
        });

        let kernel_pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&format!("Cloth {entry_point} Pipeline")),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let init_pipeline = kernel_pipeline("init");
        let step_velocity_pipeline = kernel_pipeline("step_velocity");
        let step_position_pipeline = kernel_pipeline("step_position");

        let resolution = grid.resolution();
        let dispatch = (
            (resolution + THREAD_X - 1) / THREAD_X,
            (resolution + THREAD_Y - 1) / THREAD_Y,
        );

        Ok(Self {
            accumulator: StepAccumulator::new(config.settings.fixed_step),
            grid,
            config,
            params,
            state: SimulationState::Uninitialized,
            index_count,
            dispatch,
            gpu: Some(GpuResources {
                positions,
                velocities,
                normals,
                staging,
                params_buffer,
                index_buffer,
                bind_group,
                init_pipeline,
                step_velocity_pipeline,
                step_position_pipeline,
            }),
            init_fence: None,
        })
    }

    /// Dispatches the init kernel and issues the completion readback
    ///
    /// The readback maps the freshly written position buffer purely as a
    /// device-completion fence; the data itself is discarded. Stepping and
    /// drawing stay inert until [`poll_initialized`](Self::poll_initialized)
    /// observes the fence.
    pub fn initialize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.state != SimulationState::Uninitialized {
            warn!("cloth initialize called twice, ignoring");
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        gpu.params_buffer.update_content(queue, self.params);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cloth Init Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Cloth Init Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&gpu.init_pipeline);
            pass.set_bind_group(0, &gpu.bind_group, &[]);
            pass.dispatch_workgroups(self.dispatch.0, self.dispatch.1, 1);
        }
        encoder.copy_buffer_to_buffer(
            gpu.positions.buffer(),
            0,
            gpu.staging.buffer(),
            0,
            gpu.staging.byte_size(),
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (sender, receiver) = oneshot::channel();
        gpu.staging
            .buffer()
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });

        self.init_fence = Some(receiver);
        self.state = SimulationState::Pending;
        info!(
            "cloth init dispatched ({} particles, {}x{} workgroups)",
            self.grid.particle_count(),
            self.dispatch.0,
            self.dispatch.1
        );
    }

    /// Drives the initialization fence without blocking
    ///
    /// Returns `true` once the simulation is running. A fence error is
    /// logged and leaves the instance permanently in [`SimulationState::Failed`].
    pub fn poll_initialized(&mut self, device: &wgpu::Device) -> bool {
        match self.state {
            SimulationState::Running => return true,
            SimulationState::Pending => {}
            _ => return false,
        }

        let _ = device.poll(wgpu::MaintainBase::Poll);

        let Some(fence) = self.init_fence.as_mut() else {
            return false;
        };
        let signal = match fence.try_recv() {
            Ok(None) => FenceSignal::NotReady,
            Ok(Some(Ok(()))) => FenceSignal::Completed,
            Ok(Some(Err(err))) => {
                error!("cloth initialization readback failed: {err}");
                FenceSignal::DeviceError
            }
            Err(oneshot::Canceled) => {
                error!("cloth initialization fence dropped before completing");
                FenceSignal::Dropped
            }
        };

        if signal != FenceSignal::NotReady {
            self.init_fence = None;
        }
        if signal == FenceSignal::Completed {
            // Fence only; the mapped data is discarded.
            if let Some(gpu) = &self.gpu {
                gpu.staging.buffer().unmap();
            }
            info!("cloth simulation running");
        }
        self.state = self.state.after_fence(signal);
        self.state.allows_draw()
    }

    /// Advances the simulation by a wall-clock delta
    ///
    /// Accumulates `delta` and encodes one velocity + position dispatch
    /// pair per whole fixed step, in strict order. Dispatches are
    /// fire-and-forget; nothing here blocks on the device. No-op unless
    /// running.
    pub fn tick(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, delta: f32) {
        if self.state != SimulationState::Running {
            return;
        }
        let steps = self.accumulator.accumulate(delta);
        if steps == 0 {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        // Parameter and collider writes from the driver land here, at the
        // substep boundary.
        gpu.params_buffer.update_content(queue, self.params);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cloth Step Encoder"),
        });
        for _ in 0..steps {
            // Separate passes: step_position must observe the fully
            // integrated velocities of this substep.
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Cloth StepVelocity Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&gpu.step_velocity_pipeline);
                pass.set_bind_group(0, &gpu.bind_group, &[]);
                pass.dispatch_workgroups(self.dispatch.0, self.dispatch.1, 1);
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Cloth StepPosition Pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&gpu.step_position_pipeline);
                pass.set_bind_group(0, &gpu.bind_group, &[]);
                pass.dispatch_workgroups(self.dispatch.0, self.dispatch.1, 1);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
        trace!("cloth tick: {steps} substeps, {:.4}s banked", self.accumulator.remainder());
    }

    /// Replaces the runtime parameters, pushed to the GPU immediately
    ///
    /// Invalid values (non-positive mass or step) are rejected with a
    /// warning and the previous settings stay in effect.
    pub fn update_settings(&mut self, queue: &wgpu::Queue, settings: SimulateSettings) {
        if let Err(err) = settings.validate() {
            warn!("ignoring settings update: {err}");
            return;
        }
        if settings.fixed_step != self.config.settings.fixed_step {
            self.accumulator = StepAccumulator::new(settings.fixed_step);
        }
        self.config.settings = settings;

        let collider = self.params.collider;
        self.params = ClothParams::new(&self.config, &self.grid);
        self.params.collider = collider;
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.params_buffer.update_content(queue, self.params);
        }
    }

    /// Moves the collision sphere; meant to be called every external tick
    pub fn update_collider(&mut self, queue: &wgpu::Queue, sphere: CollisionSphere) {
        self.params.collider = sphere.to_array();
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.params_buffer.update_content(queue, self.params);
        }
    }

    /// Releases all device buffers; safe to call repeatedly or before
    /// initialization completes
    pub fn dispose(&mut self) {
        // take() guarantees the buffers are destroyed at most once no
        // matter how often this runs.
        if let Some(gpu) = self.gpu.take() {
            info!("release cloth buffers");
            gpu.positions.buffer().destroy();
            gpu.velocities.buffer().destroy();
            gpu.normals.buffer().destroy();
            gpu.staging.buffer().destroy();
            gpu.index_buffer.destroy();
        }
        self.init_fence = None;
        self.state = self.state.after_dispose();
    }

    /// Current lifecycle state
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Whether the init fence has resolved and stepping is live
    pub fn is_running(&self) -> bool {
        self.state.allows_draw()
    }

    /// Grid topology of this cloth
    pub fn grid(&self) -> &ClothGrid {
        &self.grid
    }

    /// Construction-time configuration
    pub fn config(&self) -> &ClothConfig {
        &self.config
    }

    /// Number of indices in the triangle stream
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Position storage buffer (N^2 x vec4), `None` after dispose
    pub fn position_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref().map(|gpu| gpu.positions.buffer())
    }

    /// Normal storage buffer, co-indexed with positions
    pub fn normal_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref().map(|gpu| gpu.normals.buffer())
    }

    /// Triangle index buffer
    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.gpu.as_ref().map(|gpu| &gpu.index_buffer)
    }
}

impl Drop for ClothSimulation {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn params_match_wgsl_layout() {
        // The WGSL ClothParams struct is 5 x 16 bytes.
        assert_eq!(std::mem::size_of::<ClothParams>(), 80);
        assert_eq!(std::mem::align_of::<ClothParams>(), 4);
    }

    #[test]
    fn params_pack_config_values() {
        let mut config = ClothConfig::default();
        config.pin_top_edge = true;
        config.settings.wind = Vector3::new(1.0, 2.0, 3.0);
        let grid = ClothGrid::new(config.resolution, config.size);
        let params = ClothParams::new(&config, &grid);

        assert_eq!(params.grid_size, [32, 32]);
        assert_eq!(params.particle_count, 1024);
        assert_eq!(params.pin_top_edge, 1);
        assert_eq!(params.wind, [1.0, 2.0, 3.0]);
        assert_eq!(params.delta_time, config.settings.fixed_step);

        let lengths = grid.rest_lengths();
        assert_eq!(
            params.rest_lengths,
            [lengths.structural, lengths.shear, lengths.bend]
        );
        // The default collider cannot be hit.
        assert_eq!(params.collider[3], 0.0);
    }

    #[test]
    fn only_the_top_row_is_pinned() {
        let resolution = 8;
        for y in 0..resolution {
            assert_eq!(is_pinned(y, resolution, true), y == resolution - 1);
            assert!(!is_pinned(y, resolution, false));
        }
    }

    const ALL_STATES: [SimulationState; 5] = [
        SimulationState::Uninitialized,
        SimulationState::Pending,
        SimulationState::Running,
        SimulationState::Failed,
        SimulationState::Disposed,
    ];

    #[test]
    fn fence_only_moves_the_pending_state() {
        use FenceSignal::*;
        use SimulationState::*;

        assert_eq!(Pending.after_fence(Completed), Running);
        assert_eq!(Pending.after_fence(DeviceError), Failed);
        assert_eq!(Pending.after_fence(Dropped), Failed);
        assert_eq!(Pending.after_fence(NotReady), Pending);

        // A failed instance never recovers, and settled states ignore
        // late fence signals entirely.
        for signal in [NotReady, Completed, DeviceError, Dropped] {
            assert_eq!(Failed.after_fence(signal), Failed);
            assert_eq!(Running.after_fence(signal), Running);
            assert_eq!(Uninitialized.after_fence(signal), Uninitialized);
            assert_eq!(Disposed.after_fence(signal), Disposed);
        }
    }

    #[test]
    fn dispose_is_terminal_and_repeatable_from_any_state() {
        for state in ALL_STATES {
            let disposed = state.after_dispose();
            assert_eq!(disposed, SimulationState::Disposed);
            // A second dispose is a no-op, including before the init
            // fence ever resolved.
            assert_eq!(disposed.after_dispose(), SimulationState::Disposed);
        }
    }

    #[test]
    fn only_the_running_state_draws() {
        for state in ALL_STATES {
            assert_eq!(state.allows_draw(), state == SimulationState::Running);
        }
    }
}
