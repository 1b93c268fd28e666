// Vita Morton/Z-order unswizzle.
//
// Swizzled textures store pixels along a Z-order curve inside macro tiles
// for GPU cache locality. The map below is built once per texture: a list
// of (dx, dy) bit weights, one per bit of the intra-tile index, plus the
// macro tile dimensions derived from them. `localize` is pure and
// allocation-free; decode loops call it once per pixel.

/// Precomputed unswizzle map for one texture's dimensions.
#[derive(Debug, Clone)]
pub struct SwizzleMap {
    /// Bit-weight pairs, LSB first: bit `i` of the linear index XORs
    /// `weights[i].0` into x and `weights[i].1` into y.
    weights: Vec<(u32, u32)>,
    macro_tile_width: u32,
    macro_tile_height: u32,
    width_in_tiles: u32,
    points_per_tile: u32,
    width: u32,
    height: u32,
}

impl SwizzleMap {
    /// Build the map for a `width` x `height` texture. `block_encoded`
    /// selects the variant used by 4x4-block formats, which seeds the
    /// low bits with a fixed 4x4 pattern before the doubling walk.
    pub fn new(width: u32, height: u32, block_encoded: bool) -> Self {
        let mut weights: Vec<(u32, u32)> = Vec::new();
        let mut i = if block_encoded {
            weights.extend_from_slice(&[(1, 0), (2, 0), (0, 1), (0, 2)]);
            4
        } else {
            1
        };
        // Classic bit-interleaved Z-order construction: alternate y/x
        // weights, doubling until the shorter texture axis is covered.
        while i < width.min(height) {
            weights.push((0, i));
            weights.push((i, 0));
            i *= 2;
        }

        let macro_tile_width = weights.iter().fold(0, |acc, &(dx, _)| acc | dx) + 1;
        let macro_tile_height = weights.iter().fold(0, |acc, &(_, dy)| acc | dy) + 1;
        let width_in_tiles = width.div_ceil(macro_tile_width);
        let points_per_tile = macro_tile_width * macro_tile_height;

        Self {
            weights,
            macro_tile_width,
            macro_tile_height,
            width_in_tiles,
            points_per_tile,
            width,
            height,
        }
    }

    pub fn macro_tile_size(&self) -> (u32, u32) {
        (self.macro_tile_width, self.macro_tile_height)
    }

    /// Map a linear storage index to its row-major (x, y) destination.
    ///
    /// Returns `None` for coordinates outside the texture, which happens
    /// legitimately when the dimensions are not tile-aligned; callers drop
    /// those points instead of writing them.
    pub fn localize(&self, p: u32) -> Option<(u32, u32)> {
        let tile_index = p / self.points_per_tile;
        let macro_x = tile_index % self.width_in_tiles;
        let macro_y = tile_index / self.width_in_tiles;

        let mut x = macro_x * self.macro_tile_width;
        let mut y = macro_y * self.macro_tile_height;
        for (bit, &(dx, dy)) in self.weights.iter().enumerate() {
            if (p >> bit) & 1 == 1 {
                x ^= dx;
                y ^= dy;
            }
        }

        (x < self.width && y < self.height).then_some((x, y))
    }
}
