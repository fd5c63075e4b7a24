#![no_main]
use libfuzzer_sys::fuzz_target;

extern crate arbitrary;
use arbitrary::{Arbitrary, Result, Unstructured};

extern crate rand;
use rand::{rngs::StdRng, Rng, SeedableRng};

use latte_tiling::surface::{
    image_size, tile_image, untile_image, DataFormat, SurfaceDescription, SurfaceUse,
};

#[derive(Debug)]
struct Input {
    description: SurfaceDescription,
}

impl<'a> Arbitrary<'a> for Input {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        let depth_buffer: bool = u.arbitrary()?;
        let bpp = if depth_buffer {
            *u.choose(&[16usize, 32, 64])?
        } else {
            *u.choose(&[8usize, 16, 32, 64, 128])?
        };

        Ok(Input {
            description: SurfaceDescription {
                tile_mode: u.arbitrary()?,
                format: DataFormat::Invalid,
                bpp,
                width: u.int_in_range(1..=256)?,
                height: u.int_in_range(1..=256)?,
                num_slices: u.int_in_range(1..=16)?,
                num_samples: 1,
                num_levels: 1,
                bank_swizzle: u.int_in_range(0..=3)?,
                pipe_swizzle: u.int_in_range(0..=1)?,
                usage: if depth_buffer {
                    SurfaceUse::DEPTH_BUFFER
                } else {
                    SurfaceUse::TEXTURE
                },
                dim: u.arbitrary()?,
            },
        })
    }
}

fuzz_target!(|input: Input| {
    let size = image_size(&input.description);

    let seed = [13u8; 32];
    let mut rng: StdRng = SeedableRng::from_seed(seed);
    let untiled: Vec<_> = (0..size).map(|_| rng.gen_range::<u8, _>(0..=255)).collect();

    let mut tiled = vec![0u8; size];
    tile_image(&input.description, &untiled, &mut tiled).unwrap();

    let mut round_tripped = vec![0u8; size];
    untile_image(&input.description, &tiled, &mut round_tripped).unwrap();

    // Tiling is a permutation of the bytes the kernels touch, so tiling the
    // untiled result again must reproduce the tiled buffer exactly.
    let mut tiled_again = vec![0u8; size];
    tile_image(&input.description, &round_tripped, &mut tiled_again).unwrap();

    if tiled != tiled_again {
        panic!("Tile untile is not 1:1");
    }
});
