//! Compute shader retiling on a [wgpu] device.
//!
//! [Retiler] compiles one pipeline per supported combination of tile mode,
//! element class and direction up front and records retile dispatches into
//! caller provided command encoders. Recording returns a [RetileHandle] that
//! keeps the dispatch's bind group alive. Release the handle with
//! [Retiler::release_handle] once the submitted commands have finished
//! executing on the device.
//!
//! The buffers bind as 32 bit storage words, so the byte offsets passed to
//! [Retiler::untile] and [Retiler::tile] must satisfy the device's storage
//! buffer offset alignment. The offsets in a
//! [SliceRetileInfo](crate::retile::SliceRetileInfo) are whole slices, which
//! meets the default 256 byte alignment for every surface whose slices are
//! at least that large.

mod shaders;

use crate::retile::SliceRetileInfo;
use crate::{div_round_up, TileMode};
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;

const WORKGROUP_SIZE: usize = 32;

const TILED_MODES: [TileMode; 14] = [
    TileMode::Micro1DTiledThin1,
    TileMode::Micro1DTiledThick,
    TileMode::Macro2DTiledThin1,
    TileMode::Macro2DTiledThin2,
    TileMode::Macro2DTiledThin4,
    TileMode::Macro2DTiledThick,
    TileMode::Macro2BTiledThin1,
    TileMode::Macro2BTiledThin2,
    TileMode::Macro2BTiledThin4,
    TileMode::Macro2BTiledThick,
    TileMode::Macro3DTiledThin1,
    TileMode::Macro3DTiledThick,
    TileMode::Macro3BTiledThin1,
    TileMode::Macro3BTiledThick,
];

// Bits per element and depth class pairs with a compiled pipeline.
const ELEMENT_CLASSES: [(usize, bool); 8] = [
    (8, false),
    (16, false),
    (32, false),
    (64, false),
    (128, false),
    (16, true),
    (32, true),
    (64, true),
];

/// The push constants of the retile shader.
///
/// Matches the `RetileParams` struct in the WGSL source.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct RetileParams {
    first_slice_index: u32,
    max_tiles: u32,
    num_tiles_per_row: u32,
    num_tiles_per_slice: u32,
    thin_micro_tile_bytes: u32,
    thick_slice_bytes: u32,
    bank_swizzle: u32,
    pipe_swizzle: u32,
    bank_swap_width: u32,
}

const PUSH_CONSTANT_SIZE: u32 = std::mem::size_of::<RetileParams>() as u32;

fn pipeline_key(tile_mode: TileMode, bpp: usize, is_depth: bool, is_untiling: bool) -> u32 {
    let element_class = bpp as u32 + if is_depth { 100 } else { 0 };
    (element_class & 0xFFFF)
        | (((tile_mode as u32) << 16) & 0x0FFF_0000)
        | ((is_untiling as u32) << 28)
}

/// Holds the core wgpu resources for standalone retiling.
///
/// Rendering applications usually already own a device and can construct a
/// [Retiler] directly. [Context::new] exists for command line tools and
/// tests that have nothing else to create one from.
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl Context {
    /// Attempts to create a device suitable for the retiler. Tries a
    /// hardware adapter first, then falls back to a software rasterizer so
    /// retiling still works on headless machines.
    pub fn new() -> Option<Context> {
        if let Some(context) = pollster::block_on(Context::new_async(false)) {
            return Some(context);
        }
        pollster::block_on(Context::new_async(true))
    }

    async fn new_async(force_fallback: bool) -> Option<Context> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: force_fallback,
            })
            .await?;

        let adapter_name = adapter.get_info().name;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("latte_tiling"),
                    required_features: wgpu::Features::PUSH_CONSTANTS,
                    required_limits: wgpu::Limits {
                        max_push_constant_size: PUSH_CONSTANT_SIZE,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .ok()?;

        Some(Context {
            device,
            queue,
            adapter_name,
        })
    }
}

/// Keeps the GPU resources of one recorded retile dispatch alive.
///
/// Handles are not tied to device synchronization. The caller decides when
/// the submitted commands have completed, usually with a fence or by polling
/// the device, and releases the handle afterwards.
#[derive(Debug)]
pub struct RetileHandle(usize);

/// Records tile and untile dispatches between storage buffers.
///
/// All pipelines compile in [Retiler::new], so recording a dispatch never
/// stalls on shader compilation.
pub struct Retiler {
    bind_group_layout: wgpu::BindGroupLayout,
    pipelines: HashMap<u32, wgpu::ComputePipeline>,
    slots: Vec<Option<wgpu::BindGroup>>,
    free_slots: Vec<usize>,
}

impl Retiler {
    pub fn new(device: &wgpu::Device) -> Retiler {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("retile_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::RETILE.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("retile_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("retile_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[wgpu::PushConstantRange {
                stages: wgpu::ShaderStages::COMPUTE,
                range: 0..PUSH_CONSTANT_SIZE,
            }],
        });

        let mut pipelines = HashMap::new();
        for tile_mode in TILED_MODES {
            for (bpp, is_depth) in ELEMENT_CLASSES {
                for is_untiling in [false, true] {
                    let constants = HashMap::from([
                        ("IS_UNTILING".to_string(), is_untiling as u32 as f64),
                        (
                            "MICRO_TILE_THICKNESS".to_string(),
                            tile_mode.micro_tile_thickness() as f64,
                        ),
                        (
                            "MACRO_TILE_WIDTH".to_string(),
                            tile_mode.macro_tile_width() as f64,
                        ),
                        (
                            "MACRO_TILE_HEIGHT".to_string(),
                            tile_mode.macro_tile_height() as f64,
                        ),
                        ("IS_MACRO_3X".to_string(), tile_mode.is_macro_3x() as u32 as f64),
                        (
                            "IS_BANK_SWAPPED".to_string(),
                            tile_mode.is_bank_swapped() as u32 as f64,
                        ),
                        ("BPP".to_string(), bpp as f64),
                        ("IS_DEPTH".to_string(), is_depth as u32 as f64),
                    ]);

                    let pipeline =
                        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                            label: Some("retile_pipeline"),
                            layout: Some(&pipeline_layout),
                            module: &module,
                            entry_point: "retile",
                            compilation_options: wgpu::PipelineCompilationOptions {
                                constants: &constants,
                                ..Default::default()
                            },
                        });
                    pipelines.insert(pipeline_key(tile_mode, bpp, is_depth, is_untiling), pipeline);
                }
            }
        }

        Retiler {
            bind_group_layout,
            pipelines,
            slots: Vec::new(),
            free_slots: Vec::new(),
        }
    }

    /// Records an untile dispatch reading the window of `tiled` at
    /// `tiled_offset` and writing the window of `untiled` at
    /// `untiled_offset`.
    ///
    /// # Panics
    /// Panics if `scoped` describes a linear surface or an element class
    /// with no compiled pipeline.
    pub fn untile(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        untiled: &wgpu::Buffer,
        untiled_offset: u64,
        tiled: &wgpu::Buffer,
        tiled_offset: u64,
        scoped: &SliceRetileInfo,
    ) -> RetileHandle {
        self.record(device, encoder, tiled, tiled_offset, untiled, untiled_offset, scoped, true)
    }

    /// Records a tile dispatch reading the window of `untiled` at
    /// `untiled_offset` and writing the window of `tiled` at `tiled_offset`.
    ///
    /// # Panics
    /// Panics if `scoped` describes a linear surface or an element class
    /// with no compiled pipeline.
    pub fn tile(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        tiled: &wgpu::Buffer,
        tiled_offset: u64,
        untiled: &wgpu::Buffer,
        untiled_offset: u64,
        scoped: &SliceRetileInfo,
    ) -> RetileHandle {
        self.record(device, encoder, tiled, tiled_offset, untiled, untiled_offset, scoped, false)
    }

    /// Frees the bind group of a completed dispatch and recycles its slot.
    pub fn release_handle(&mut self, handle: RetileHandle) {
        self.slots[handle.0] = None;
        self.free_slots.push(handle.0);
    }

    fn record(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        tiled: &wgpu::Buffer,
        tiled_offset: u64,
        untiled: &wgpu::Buffer,
        untiled_offset: u64,
        scoped: &SliceRetileInfo,
        is_untiling: bool,
    ) -> RetileHandle {
        let info = &scoped.info;
        assert!(info.is_tiled, "Cannot retile a linear surface");

        let key = pipeline_key(info.tile_mode, info.bits_per_element, info.is_depth, is_untiling);
        let pipeline = match self.pipelines.get(&key) {
            Some(pipeline) => pipeline,
            None => panic!("Attempted to retile an unsupported surface configuration"),
        };

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("retile_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: tiled,
                        offset: tiled_offset,
                        size: wgpu::BufferSize::new(scoped.tiled_size as u64),
                    }),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: untiled,
                        offset: untiled_offset,
                        size: wgpu::BufferSize::new(scoped.untiled_size as u64),
                    }),
                },
            ],
        });

        let thickness = info.micro_tile_thickness;
        let num_tiles = scoped.num_slices * info.num_tiles_per_slice;
        let params = RetileParams {
            first_slice_index: scoped.first_slice as u32,
            max_tiles: num_tiles as u32,
            num_tiles_per_row: info.num_tiles_per_row as u32,
            num_tiles_per_slice: info.num_tiles_per_slice as u32,
            thin_micro_tile_bytes: (info.thick_micro_tile_bytes / thickness) as u32,
            thick_slice_bytes: (info.thin_slice_bytes * thickness) as u32,
            bank_swizzle: info.bank_swizzle as u32,
            pipe_swizzle: info.pipe_swizzle as u32,
            bank_swap_width: info.bank_swap_width as u32,
        };

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("retile_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_push_constants(0, bytemuck::bytes_of(&params));
            pass.dispatch_workgroups(div_round_up(num_tiles, WORKGROUP_SIZE) as u32, 1, 1);
        }

        match self.free_slots.pop() {
            Some(index) => {
                self.slots[index] = Some(bind_group);
                RetileHandle(index)
            }
            None => {
                self.slots.push(Some(bind_group));
                RetileHandle(self.slots.len() - 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retile::{slice_retile_info, tile, untile};
    use crate::surface::{surface_info, DataFormat, SurfaceDescription, SurfaceDim, SurfaceUse};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use wgpu::util::DeviceExt;

    fn description(
        tile_mode: TileMode,
        bpp: usize,
        num_slices: usize,
        depth_buffer: bool,
    ) -> SurfaceDescription {
        SurfaceDescription {
            tile_mode,
            format: DataFormat::Invalid,
            bpp,
            width: 96,
            height: 96,
            num_slices,
            num_samples: 1,
            num_levels: 1,
            bank_swizzle: 2,
            pipe_swizzle: 1,
            usage: if depth_buffer {
                SurfaceUse::DEPTH_BUFFER
            } else {
                SurfaceUse::TEXTURE
            },
            dim: SurfaceDim::Texture2DArray,
        }
    }

    fn read_buffer(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        buffer: &wgpu::Buffer,
        size: u64,
    ) -> Vec<u8> {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver.recv().unwrap().unwrap();

        let data = slice.get_mapped_range().to_vec();
        staging.unmap();
        data
    }

    #[test]
    fn gpu_untile_matches_cpu() {
        let Some(context) = Context::new() else {
            return;
        };
        let mut retiler = Retiler::new(&context.device);

        // Every compiled pipeline runs against the CPU kernel. The slice
        // windows rotate per combination so whole images, interior windows
        // and partial thick groups all reach the shader.
        let windows = [(0, 5), (1, 3), (3, 1), (2, 2)];
        let mut combo = 0;

        for tile_mode in TILED_MODES {
            for (bpp, is_depth) in ELEMENT_CLASSES {
                let (first_slice, num_slices) = windows[combo % windows.len()];
                combo += 1;

                let desc = description(tile_mode, bpp, 5, is_depth);
                let scoped = slice_retile_info(&desc, first_slice, num_slices);
                let info = &scoped.info;

                let tiled_len = surface_info(&desc, 0).surf_size;
                let untiled_len = 5 * info.thin_slice_bytes;

                let mut rng = StdRng::from_seed([67u8; 32]);
                let tiled_data: Vec<u8> = (0..tiled_len).map(|_| rng.gen()).collect();

                let mut expected = vec![0u8; scoped.untiled_size];
                untile(
                    info,
                    &tiled_data[scoped.tiled_offset..scoped.tiled_offset + scoped.tiled_size],
                    &mut expected,
                    first_slice,
                    num_slices,
                )
                .unwrap();

                let tiled_buffer =
                    context
                        .device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: None,
                            contents: &tiled_data,
                            usage: wgpu::BufferUsages::STORAGE,
                        });
                let untiled_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
                    label: None,
                    size: untiled_len as u64,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });

                let mut encoder = context
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
                let handle = retiler.untile(
                    &context.device,
                    &mut encoder,
                    &untiled_buffer,
                    scoped.untiled_offset as u64,
                    &tiled_buffer,
                    scoped.tiled_offset as u64,
                    &scoped,
                );
                // Released handles recycle their slot on the next dispatch.
                assert_eq!(0, handle.0, "{:?} bpp {} depth {}", tile_mode, bpp, is_depth);
                context.queue.submit(std::iter::once(encoder.finish()));
                context.device.poll(wgpu::Maintain::Wait);
                retiler.release_handle(handle);

                let actual = read_buffer(
                    &context.device,
                    &context.queue,
                    &untiled_buffer,
                    untiled_len as u64,
                );
                assert_eq!(
                    expected,
                    &actual[scoped.untiled_offset..scoped.untiled_offset + scoped.untiled_size],
                    "{:?} bpp {} depth {}",
                    tile_mode,
                    bpp,
                    is_depth
                );
            }
        }
    }

    #[test]
    fn gpu_tile_matches_cpu() {
        let Some(context) = Context::new() else {
            return;
        };
        let mut retiler = Retiler::new(&context.device);

        // The tiling direction covers the same pipeline grid as untiling,
        // with both buffers bound at their window start instead of a whole
        // image offset.
        let windows = [(1, 4), (0, 5), (2, 3), (4, 1)];
        let mut combo = 0;

        for tile_mode in TILED_MODES {
            for (bpp, is_depth) in ELEMENT_CLASSES {
                let (first_slice, num_slices) = windows[combo % windows.len()];
                combo += 1;

                let desc = description(tile_mode, bpp, 5, is_depth);
                let scoped = slice_retile_info(&desc, first_slice, num_slices);

                let mut rng = StdRng::from_seed([71u8; 32]);
                let untiled_data: Vec<u8> = (0..scoped.untiled_size).map(|_| rng.gen()).collect();

                // Partial thick groups leave the bytes of untouched slices
                // zeroed on both paths.
                let mut expected = vec![0u8; scoped.tiled_size];
                tile(
                    &scoped.info,
                    &untiled_data,
                    &mut expected,
                    first_slice,
                    num_slices,
                )
                .unwrap();

                let untiled_buffer =
                    context
                        .device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: None,
                            contents: &untiled_data,
                            usage: wgpu::BufferUsages::STORAGE,
                        });
                let tiled_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
                    label: None,
                    size: scoped.tiled_size as u64,
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    mapped_at_creation: false,
                });

                let mut encoder = context
                    .device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
                let handle = retiler.tile(
                    &context.device,
                    &mut encoder,
                    &tiled_buffer,
                    0,
                    &untiled_buffer,
                    0,
                    &scoped,
                );
                context.queue.submit(std::iter::once(encoder.finish()));
                context.device.poll(wgpu::Maintain::Wait);
                retiler.release_handle(handle);

                let actual = read_buffer(
                    &context.device,
                    &context.queue,
                    &tiled_buffer,
                    scoped.tiled_size as u64,
                );
                assert_eq!(
                    expected, actual,
                    "{:?} bpp {} depth {}",
                    tile_mode, bpp, is_depth
                );
            }
        }
    }
}
