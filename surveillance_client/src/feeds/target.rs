// CPU-side render target: the scoped resource behind one feed.

/// Owns the pixel storage for one virtual-camera output. Released exactly
/// once; rendering into a disposed target is a programming error surfaced by
/// `is_disposed` checks rather than a panic.
#[derive(Debug)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    disposed: bool,
}

const BYTES_PER_PIXEL: usize = 4; // RGBA

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            disposed: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Releases the target's storage. Returns false if it was already
    /// disposed, so callers can assert exactly-once release.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.pixels = Vec::new();
        true
    }
}
