//! Work partitioning.
//!
//! A render is split into one pass per sample, and each pass into square
//! tiles. Every chunk is one tile of one pass, so chunks can be rendered
//! in any order and on any thread.

/// Workers refresh the shared progress every this many chunks.
pub const CHUNK_COUNT_UPDATE_INTERVAL: usize = 10;

/// One tile of one sample pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Top-left pixel, inclusive
    pub start: (u32, u32),
    /// Bottom-right pixel, exclusive
    pub end: (u32, u32),
    /// Stratified sub-pixel cell for this pass
    pub subpixel_grid_pos: (u32, u32),
    /// Sample pass this chunk belongs to
    pub sample: u32,
    /// Position in the render order; also selects the random stream
    pub index: usize,
}

impl Chunk {
    pub fn width(&self) -> u32 {
        self.end.0 - self.start.0
    }

    pub fn height(&self) -> u32 {
        self.end.1 - self.start.1
    }

    pub fn pixel_count(&self) -> u32 {
        self.width() * self.height()
    }

    /// Pixels of the chunk in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.start.1..self.end.1).flat_map(move |y| (self.start.0..self.end.0).map(move |x| (x, y)))
    }
}

/// Chunks for every sample pass, tiles sorted center-out within a pass.
pub fn generate_chunks(width: u32, height: u32, chunk_size: u32, samples_per_pixel: u32) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let samples_per_row = ((samples_per_pixel.max(1) as f64).sqrt() as u32).max(1);

    let mut tiles = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            tiles.push(((x, y), ((x + chunk_size).min(width), (y + chunk_size).min(height))));
            x += chunk_size;
        }
        y += chunk_size;
    }
    sort_spiral(&mut tiles, width, height);

    let mut chunks = Vec::with_capacity(tiles.len() * samples_per_pixel as usize);
    for sample in 0..samples_per_pixel {
        let grid = (sample % samples_per_row, sample / samples_per_row);
        for &(start, end) in &tiles {
            chunks.push(Chunk {
                start,
                end,
                subpixel_grid_pos: grid,
                sample,
                index: chunks.len(),
            });
        }
    }
    chunks
}

/// Sort tiles by distance from the image center.
fn sort_spiral(tiles: &mut [((u32, u32), (u32, u32))], width: u32, height: u32) {
    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;

    let distance = |&((x0, y0), (x1, y1)): &((u32, u32), (u32, u32))| {
        let cx = (x0 + x1) as f64 / 2.0;
        let cy = (y0 + y1) as f64 / 2.0;
        (cx - center_x).powi(2) + (cy - center_y).powi(2)
    };

    tiles.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_chunks_exact_fit() {
        let chunks = generate_chunks(128, 128, 64, 1);
        assert_eq!(chunks.len(), 4);

        let total_pixels: u32 = chunks.iter().map(|c| c.pixel_count()).sum();
        assert_eq!(total_pixels, 128 * 128);
    }

    #[test]
    fn test_generate_chunks_partial_fit() {
        let chunks = generate_chunks(100, 70, 64, 1);
        assert_eq!(chunks.len(), 4);

        let total_pixels: u32 = chunks.iter().map(|c| c.pixel_count()).sum();
        assert_eq!(total_pixels, 100 * 70);
    }

    #[test]
    fn test_spiral_order() {
        let chunks = generate_chunks(192, 192, 64, 1);
        assert_eq!(chunks.len(), 9);
        assert_eq!(chunks[0].start, (64, 64));
    }

    #[test]
    fn test_every_pass_covers_every_pixel_once() {
        let (width, height, spp) = (37, 23, 4);
        let chunks = generate_chunks(width, height, 8, spp);

        let mut coverage = vec![0u32; (width * height) as usize];
        for chunk in &chunks {
            for (x, y) in chunk.pixels() {
                coverage[(y * width + x) as usize] += 1;
            }
        }
        assert!(coverage.iter().all(|&c| c == spp));
    }

    #[test]
    fn test_subpixel_grid_and_indices() {
        let chunks = generate_chunks(4, 4, 4, 9);
        assert_eq!(chunks.len(), 9);

        let grid: Vec<(u32, u32)> = chunks.iter().map(|c| c.subpixel_grid_pos).collect();
        assert_eq!(grid[0], (0, 0));
        assert_eq!(grid[4], (1, 1));
        assert_eq!(grid[8], (2, 2));

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.sample, i as u32);
        }
    }

    #[test]
    fn test_chunk_size_one() {
        let chunks = generate_chunks(3, 2, 1, 1);
        assert_eq!(chunks.len(), 6);
        assert!(chunks.iter().all(|c| c.pixel_count() == 1));
    }
}
