//! WGSL source for the retile kernels.
//!
//! The shader mirrors the CPU kernels in [retile](crate::retile). One
//! invocation retiles one micro tile, with the element class, tile mode
//! shape and direction baked in per pipeline through override constants.

pub(super) const RETILE: &str = r#"
override IS_UNTILING: u32 = 0u;
override MICRO_TILE_THICKNESS: u32 = 1u;
override MACRO_TILE_WIDTH: u32 = 1u;
override MACRO_TILE_HEIGHT: u32 = 1u;
override IS_MACRO_3X: u32 = 0u;
override IS_BANK_SWAPPED: u32 = 0u;
override BPP: u32 = 32u;
override IS_DEPTH: u32 = 0u;

const MICRO_TILE_WIDTH: u32 = 8u;
const MICRO_TILE_HEIGHT: u32 = 8u;
const NUM_PIPES: u32 = 2u;
const NUM_BANKS: u32 = 4u;
const NUM_GROUP_BITS: u32 = 8u;
const NUM_PIPE_BITS: u32 = 1u;
const NUM_BANK_BITS: u32 = 2u;
const GROUP_MASK: u32 = 0xFFu;

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

var<push_constant> params: RetileParams;

@group(0) @binding(0) var<storage, read_write> tiled: array<u32>;
@group(0) @binding(1) var<storage, read_write> untiled: array<u32>;

// Every copy group in every element class is a multiple of 4 bytes and 4
// byte aligned, so the buffers move in 32 bit words.
fn copy_group(tiled_offset: u32, untiled_offset: u32, num_bytes: u32) {
    let tiled_word = tiled_offset / 4u;
    let untiled_word = untiled_offset / 4u;
    for (var i = 0u; i < num_bytes / 4u; i = i + 1u) {
        if (IS_UNTILING != 0u) {
            untiled[untiled_word + i] = tiled[tiled_word + i];
        } else {
            tiled[tiled_word + i] = untiled[untiled_word + i];
        }
    }
}

fn retile_micro_8(tiled_offset: u32, untiled_offset: u32, untiled_stride: u32) {
    let tiled_stride = MICRO_TILE_WIDTH;
    var tiled_row = tiled_offset;
    var untiled_row = untiled_offset;

    // Rows 1 and 2 trade places within each group of 4 rows.
    for (var y = 0u; y < MICRO_TILE_HEIGHT; y = y + 4u) {
        copy_group(tiled_row, untiled_row, 8u);
        copy_group(tiled_row + 2u * tiled_stride, untiled_row + untiled_stride, 8u);
        copy_group(tiled_row + tiled_stride, untiled_row + 2u * untiled_stride, 8u);
        copy_group(tiled_row + 3u * tiled_stride, untiled_row + 3u * untiled_stride, 8u);

        tiled_row = tiled_row + 4u * tiled_stride;
        untiled_row = untiled_row + 4u * untiled_stride;
    }
}

fn retile_micro_16(tiled_offset: u32, untiled_offset: u32, untiled_stride: u32) {
    let tiled_stride = MICRO_TILE_WIDTH * 2u;
    for (var row = 0u; row < MICRO_TILE_HEIGHT; row = row + 1u) {
        copy_group(tiled_offset + row * tiled_stride, untiled_offset + row * untiled_stride, 16u);
    }
}

fn retile_micro_32(tiled_offset: u32, untiled_offset: u32, untiled_stride: u32) {
    let tiled_stride = MICRO_TILE_WIDTH * 4u;
    var tiled_row = tiled_offset;
    var untiled_row = untiled_offset;

    // Each pair of tiled rows holds the left then right halves of two
    // untiled rows.
    for (var y = 0u; y < MICRO_TILE_HEIGHT; y = y + 2u) {
        let tiled_row2 = tiled_row + tiled_stride;
        let untiled_row2 = untiled_row + untiled_stride;

        copy_group(tiled_row, untiled_row, 16u);
        copy_group(tiled_row2, untiled_row + 16u, 16u);
        copy_group(tiled_row + 16u, untiled_row2, 16u);
        copy_group(tiled_row2 + 16u, untiled_row2 + 16u, 16u);

        tiled_row = tiled_row + 2u * tiled_stride;
        untiled_row = untiled_row + 2u * untiled_stride;
    }
}

fn retile_micro_64(tiled_offset: u32, untiled_offset: u32, untiled_stride: u32, macro_tiling: bool) {
    let tiled_stride = MICRO_TILE_WIDTH * 8u;
    var tiled_row = tiled_offset;
    var untiled_row = untiled_offset;

    for (var y = 0u; y < MICRO_TILE_HEIGHT; y = y + 2u) {
        if (macro_tiling && y == 4u) {
            // The second half of the tile lives in the next bank/pipe group.
            tiled_row = tiled_row - y * tiled_stride + (0x100u << (NUM_BANK_BITS + NUM_PIPE_BITS));
        }

        let tiled_row2 = tiled_row + tiled_stride;
        let untiled_row2 = untiled_row + untiled_stride;

        copy_group(tiled_row, untiled_row, 16u);
        copy_group(tiled_row + 16u, untiled_row2, 16u);
        copy_group(tiled_row + 32u, untiled_row + 16u, 16u);
        copy_group(tiled_row + 48u, untiled_row2 + 16u, 16u);
        copy_group(tiled_row2, untiled_row + 32u, 16u);
        copy_group(tiled_row2 + 16u, untiled_row2 + 32u, 16u);
        copy_group(tiled_row2 + 32u, untiled_row + 48u, 16u);
        copy_group(tiled_row2 + 48u, untiled_row2 + 48u, 16u);

        tiled_row = tiled_row + 2u * tiled_stride;
        untiled_row = untiled_row + 2u * untiled_stride;
    }
}

fn retile_micro_128(tiled_offset: u32, untiled_offset: u32, untiled_stride: u32, macro_tiling: bool) {
    let tiled_stride = MICRO_TILE_WIDTH * 16u;
    var tiled_row = tiled_offset;
    var untiled_row = untiled_offset;

    // Elements of two untiled rows interleave across two tiled rows.
    for (var y = 0u; y < MICRO_TILE_HEIGHT; y = y + 2u) {
        let tiled_row2 = tiled_row + tiled_stride;
        let untiled_row2 = untiled_row + untiled_stride;

        copy_group(tiled_row, untiled_row, 16u);
        copy_group(tiled_row + 32u, untiled_row + 16u, 16u);
        copy_group(tiled_row + 16u, untiled_row2, 16u);
        copy_group(tiled_row + 48u, untiled_row2 + 16u, 16u);
        copy_group(tiled_row + 64u, untiled_row + 32u, 16u);
        copy_group(tiled_row + 96u, untiled_row + 48u, 16u);
        copy_group(tiled_row + 80u, untiled_row2 + 32u, 16u);
        copy_group(tiled_row + 112u, untiled_row2 + 48u, 16u);
        copy_group(tiled_row2, untiled_row + 64u, 16u);
        copy_group(tiled_row2 + 32u, untiled_row + 80u, 16u);
        copy_group(tiled_row2 + 16u, untiled_row2 + 64u, 16u);
        copy_group(tiled_row2 + 48u, untiled_row2 + 80u, 16u);
        copy_group(tiled_row2 + 64u, untiled_row + 96u, 16u);
        copy_group(tiled_row2 + 96u, untiled_row + 112u, 16u);
        copy_group(tiled_row2 + 80u, untiled_row2 + 96u, 16u);
        copy_group(tiled_row2 + 112u, untiled_row2 + 112u, 16u);

        if (macro_tiling) {
            tiled_row = tiled_row + (0x100u << (NUM_BANK_BITS + NUM_PIPE_BITS));
        } else {
            tiled_row = tiled_row + 2u * tiled_stride;
        }
        untiled_row = untiled_row + 2u * untiled_stride;
    }
}

fn retile_micro_depth(
    tiled_offset: u32,
    untiled_offset: u32,
    untiled_stride: u32,
    bytes_per_element: u32,
) {
    let group_bytes = 2u * bytes_per_element;
    let tiled_stride = MICRO_TILE_WIDTH * bytes_per_element;

    // Depth data moves in 2 element groups that swap both across and within
    // row quads.
    for (var y = 0u; y < MICRO_TILE_HEIGHT; y = y + 4u) {
        for (var dy = 0u; dy < 4u; dy = dy + 1u) {
            for (var tx = 0u; tx < 4u; tx = tx + 1u) {
                let untiled_x = (dy / 2u) * 2u + tx / 2u;
                let untiled_y = y + (dy % 2u) * 2u + tx % 2u;
                copy_group(
                    tiled_offset + (y + dy) * tiled_stride + tx * group_bytes,
                    untiled_offset + untiled_y * untiled_stride + untiled_x * group_bytes,
                    group_bytes,
                );
            }
        }
    }
}

fn macro_tile_offsets(
    slice_tile_index: u32,
    local_slice_index: u32,
    thick_slice_index: u32,
    thin_slice_bytes: u32,
    thick_micro_tile_bytes: u32,
    untiled_stride: u32,
    bytes_per_element: u32,
) -> vec2<u32> {
    let micro_tiles_per_macro = MACRO_TILE_WIDTH * MACRO_TILE_HEIGHT;
    let macro_tiles_per_row = params.num_tiles_per_row / MACRO_TILE_WIDTH;
    let micro_tiles_per_macro_row = micro_tiles_per_macro * macro_tiles_per_row;

    let src_macro_tile_y = slice_tile_index / micro_tiles_per_macro_row;
    let macro_row_tile_index = slice_tile_index % micro_tiles_per_macro_row;
    let src_macro_tile_x = macro_row_tile_index / micro_tiles_per_macro;
    let micro_tile_index = macro_row_tile_index % micro_tiles_per_macro;
    let src_micro_tile_y = micro_tile_index / MACRO_TILE_WIDTH;
    let src_micro_tile_x = micro_tile_index % MACRO_TILE_WIDTH;
    let src_tile_x = src_macro_tile_x * MACRO_TILE_WIDTH + src_micro_tile_x;
    let src_tile_y = src_macro_tile_y * MACRO_TILE_HEIGHT + src_micro_tile_y;

    let untiled_offset = local_slice_index * thin_slice_bytes
        + src_tile_x * MICRO_TILE_WIDTH * bytes_per_element
        + src_tile_y * MICRO_TILE_HEIGHT * untiled_stride;

    let macro_tile_bytes = micro_tiles_per_macro * thick_micro_tile_bytes;
    let macro_tile_index = src_macro_tile_y * macro_tiles_per_row + src_macro_tile_x;
    let macro_tile_offset = macro_tile_index * macro_tile_bytes;

    let tiled_base_offset = (macro_tile_offset >> (NUM_BANK_BITS + NUM_PIPE_BITS))
        + local_slice_index * params.thin_micro_tile_bytes;
    let offset_high = (tiled_base_offset & ~GROUP_MASK) << (NUM_BANK_BITS + NUM_PIPE_BITS);
    let offset_low = tiled_base_offset & GROUP_MASK;

    var bank_slice_rotation = 0u;
    var pipe_slice_rotation = 0u;
    if (IS_MACRO_3X != 0u) {
        bank_slice_rotation = thick_slice_index / NUM_PIPES;
        pipe_slice_rotation = thick_slice_index;
    } else {
        bank_slice_rotation = ((NUM_BANKS >> 1u) - 1u) * thick_slice_index;
    }

    var bank_swap_rotation = 0u;
    if (IS_BANK_SWAPPED != 0u) {
        var bank_swap_order = array<u32, 4>(0u, 1u, 3u, 2u);
        let swap_index =
            src_macro_tile_x * MICRO_TILE_WIDTH * MACRO_TILE_WIDTH / params.bank_swap_width;
        bank_swap_rotation = bank_swap_order[swap_index % NUM_BANKS];
    }

    var bank = ((src_tile_x & 1u) ^ ((src_tile_y >> 2u) & 1u))
        | ((((src_tile_x >> 1u) & 1u) ^ ((src_tile_y >> 1u) & 1u)) << 1u);
    bank = bank ^ ((params.bank_swizzle + bank_slice_rotation) & (NUM_BANKS - 1u));
    bank = bank ^ bank_swap_rotation;

    var pipe = (src_tile_x & 1u) ^ (src_tile_y & 1u);
    pipe = pipe ^ ((params.pipe_swizzle + pipe_slice_rotation) & (NUM_PIPES - 1u));

    let tiled_offset = (bank << (NUM_GROUP_BITS + NUM_PIPE_BITS))
        | (pipe << NUM_GROUP_BITS)
        | offset_low
        | offset_high;

    return vec2<u32>(untiled_offset, tiled_offset);
}

fn micro_tile_offsets(
    slice_tile_index: u32,
    local_slice_index: u32,
    thin_slice_bytes: u32,
    thick_micro_tile_bytes: u32,
    bytes_per_element: u32,
) -> vec2<u32> {
    let src_tile_y = slice_tile_index / params.num_tiles_per_row;
    let src_tile_x = slice_tile_index % params.num_tiles_per_row;

    let untiled_offset = local_slice_index * thin_slice_bytes
        + src_tile_x * MICRO_TILE_WIDTH * bytes_per_element
        + src_tile_y * params.num_tiles_per_row * params.thin_micro_tile_bytes;
    let tiled_offset = local_slice_index * params.thin_micro_tile_bytes
        + slice_tile_index * thick_micro_tile_bytes;

    return vec2<u32>(untiled_offset, tiled_offset);
}

@compute @workgroup_size(32)
fn retile(@builtin(global_invocation_id) invocation: vec3<u32>) {
    let tile_index = invocation.x;
    if (tile_index >= params.max_tiles) {
        return;
    }

    let is_macro = MACRO_TILE_WIDTH * MACRO_TILE_HEIGHT != 1u;
    let bytes_per_element = BPP / 8u;
    let thin_slice_bytes = params.thick_slice_bytes / MICRO_TILE_THICKNESS;
    let thick_micro_tile_bytes = params.thin_micro_tile_bytes * MICRO_TILE_THICKNESS;
    let untiled_stride = params.num_tiles_per_row * MICRO_TILE_WIDTH * bytes_per_element;

    let first_thick_slice_index = params.first_slice_index / MICRO_TILE_THICKNESS;
    let first_thin_slice_index = params.first_slice_index % MICRO_TILE_THICKNESS;

    let dispatch_slice_index = tile_index / params.num_tiles_per_slice;
    let slice_tile_index = tile_index % params.num_tiles_per_slice;
    let src_slice_index = params.first_slice_index + dispatch_slice_index;
    let local_slice_index = src_slice_index % MICRO_TILE_THICKNESS;
    let thick_slice_index = src_slice_index / MICRO_TILE_THICKNESS;

    var offsets: vec2<u32>;
    if (is_macro) {
        offsets = macro_tile_offsets(
            slice_tile_index,
            local_slice_index,
            thick_slice_index,
            thin_slice_bytes,
            thick_micro_tile_bytes,
            untiled_stride,
            bytes_per_element,
        );
    } else {
        offsets = micro_tile_offsets(
            slice_tile_index,
            local_slice_index,
            thin_slice_bytes,
            thick_micro_tile_bytes,
            bytes_per_element,
        );
    }

    // Thick groups advance linearly; partial ranges are rebased onto the
    // bound buffer windows.
    let thick_slice_offset = (thick_slice_index - first_thick_slice_index) * params.thick_slice_bytes;
    let tiled_offset = offsets.y + thick_slice_offset;
    let untiled_offset = offsets.x + thick_slice_offset - first_thin_slice_index * thin_slice_bytes;

    if (IS_DEPTH != 0u) {
        retile_micro_depth(tiled_offset, untiled_offset, untiled_stride, bytes_per_element);
    } else if (BPP == 8u) {
        retile_micro_8(tiled_offset, untiled_offset, untiled_stride);
    } else if (BPP == 16u) {
        retile_micro_16(tiled_offset, untiled_offset, untiled_stride);
    } else if (BPP == 32u) {
        retile_micro_32(tiled_offset, untiled_offset, untiled_stride);
    } else if (BPP == 64u) {
        retile_micro_64(tiled_offset, untiled_offset, untiled_stride, is_macro);
    } else {
        retile_micro_128(tiled_offset, untiled_offset, untiled_stride, is_macro);
    }
}
"#;
