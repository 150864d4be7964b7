// Decoded textures and their sub-regions

use anyhow::{bail, Context, Result};
use glam::Vec2;
use std::path::{Path, PathBuf};

/// Extension of the sidecar file describing a texture's sub-regions
pub const METAFILE_EXTENSION: &str = "meta";

/// A region within a texture, e.g. one animation frame or one sprite of a sheet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubTexture {
    /// Position in the texture (pixels)
    pub x: u32,
    pub y: u32,

    /// Size of the region (pixels)
    pub width: u32,
    pub height: u32,

    /// Hotspot, relative to the region origin
    pub center_x: i32,
    pub center_y: i32,

    /// UV coordinates (0.0 to 1.0)
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

impl SubTexture {
    /// Create a new region with calculated UV coordinates
    pub fn new(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        center: (i32, i32),
        texture_width: u32,
        texture_height: u32,
    ) -> Self {
        let uv_min = Vec2::new(
            x as f32 / texture_width as f32,
            y as f32 / texture_height as f32,
        );
        let uv_max = Vec2::new(
            (x + width) as f32 / texture_width as f32,
            (y + height) as f32 / texture_height as f32,
        );

        Self {
            x,
            y,
            width,
            height,
            center_x: center.0,
            center_y: center.1,
            uv_min,
            uv_max,
        }
    }

    /// A region covering a whole texture
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height, (0, 0), width, height)
    }
}

/// A decoded texture held in memory as RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,

    /// Tightly packed RGBA8 rows
    pub pixels: Vec<u8>,

    /// Sub-regions; a single full-size region when no metafile was used
    subtextures: Vec<SubTexture>,
}

impl Texture {
    /// Create a texture from raw RGBA8 pixels with one full-size region
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            bail!(
                "pixel buffer holds {} bytes, {}x{} RGBA needs {}",
                pixels.len(),
                width,
                height,
                expected
            );
        }

        Ok(Self {
            width,
            height,
            pixels,
            subtextures: vec![SubTexture::full(width, height)],
        })
    }

    /// Decode an image file into a texture
    pub fn from_file(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Replace the sub-regions with the ones described by a metafile
    pub fn with_metafile(mut self, metafile: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(metafile)
            .with_context(|| format!("failed to read metafile {}", metafile.display()))?;
        self.subtextures = parse_metafile(&text, self.width, self.height)
            .with_context(|| format!("invalid metafile {}", metafile.display()))?;
        Ok(self)
    }

    /// Get a region by index
    pub fn subtexture(&self, index: usize) -> Option<&SubTexture> {
        self.subtextures.get(index)
    }

    /// Get all regions
    pub fn subtextures(&self) -> &[SubTexture] {
        &self.subtextures
    }

    /// Get the number of regions
    pub fn subtexture_count(&self) -> usize {
        self.subtextures.len()
    }
}

/// Sidecar metafile location for a texture path
pub fn metafile_path(texture_path: &Path) -> PathBuf {
    texture_path.with_extension(METAFILE_EXTENSION)
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], index: usize, line_no: usize) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fields[index]
        .parse::<T>()
        .with_context(|| format!("line {}: bad number {:?}", line_no, fields[index]))
}

/// Parse `x,y,w,h,cx,cy` rows into regions of a `width`x`height` texture
pub fn parse_metafile(text: &str, width: u32, height: u32) -> Result<Vec<SubTexture>> {
    let mut regions = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 6 {
            bail!("line {}: expected 6 fields, got {}", line_no + 1, fields.len());
        }

        let line_no = line_no + 1;
        let x: u32 = parse_field(&fields, 0, line_no)?;
        let y: u32 = parse_field(&fields, 1, line_no)?;
        let w: u32 = parse_field(&fields, 2, line_no)?;
        let h: u32 = parse_field(&fields, 3, line_no)?;
        let center_x: i32 = parse_field(&fields, 4, line_no)?;
        let center_y: i32 = parse_field(&fields, 5, line_no)?;

        if w == 0 || h == 0 {
            bail!("line {}: region must have a positive size", line_no);
        }
        let fits = |origin: u32, extent: u32, limit: u32| {
            origin.checked_add(extent).is_some_and(|end| end <= limit)
        };
        if !fits(x, w, width) || !fits(y, h, height) {
            bail!(
                "line {}: region {}x{}+{}+{} exceeds texture {}x{}",
                line_no,
                w,
                h,
                x,
                y,
                width,
                height
            );
        }

        regions.push(SubTexture::new(
            x,
            y,
            w,
            h,
            (center_x, center_y),
            width,
            height,
        ));
    }

    if regions.is_empty() {
        bail!("metafile describes no regions");
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_subtexture_uv() {
        let region = SubTexture::new(0, 0, 64, 64, (0, 0), 256, 256);

        assert_eq!(region.uv_min, Vec2::new(0.0, 0.0));
        assert_eq!(region.uv_max, Vec2::new(0.25, 0.25));
    }

    #[test]
    fn test_from_rgba_single_region() {
        let tex = Texture::from_rgba(2, 2, vec![0; 16]).unwrap();

        assert_eq!(tex.subtexture_count(), 1);
        assert_eq!(tex.subtexture(0), Some(&SubTexture::full(2, 2)));
        assert!(tex.subtexture(1).is_none());
    }

    #[test]
    fn test_from_rgba_rejects_short_buffer() {
        assert!(Texture::from_rgba(4, 4, vec![0; 10]).is_err());
    }

    #[test]
    fn test_parse_metafile() {
        let text = "# x,y,w,h,cx,cy\n0,0,32,32,16,16\n\n32, 0, 32, 16, -4, 8\n";
        let regions = parse_metafile(text, 64, 32).unwrap();

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[1].x, 32);
        assert_eq!(regions[1].center_x, -4);
        assert_relative_eq!(regions[1].uv_min.x, 0.5);
        assert_relative_eq!(regions[1].uv_max.y, 0.5);
    }

    #[test]
    fn test_parse_metafile_out_of_bounds() {
        let err = parse_metafile("48,0,32,32,0,0", 64, 64).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_parse_metafile_huge_origin() {
        let err = parse_metafile("9223372036854775807,0,1,1,0,0", 8, 8).unwrap_err();
        assert!(err.to_string().contains("line 1"));

        let err = parse_metafile("4294967295,0,1,1,0,0", 8, 8).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn test_parse_metafile_hotspot_out_of_range() {
        assert!(parse_metafile("0,0,1,1,4294967296,0", 8, 8).is_err());
        assert!(parse_metafile("0,0,1,1,0,-2147483649", 8, 8).is_err());

        let regions = parse_metafile("0,0,1,1,-2147483648,7", 8, 8).unwrap();
        assert_eq!(regions[0].center_x, i32::MIN);
        assert_eq!(regions[0].center_y, 7);
    }

    #[test]
    fn test_parse_metafile_negative_origin() {
        assert!(parse_metafile("-1,0,1,1,0,0", 8, 8).is_err());
        assert!(parse_metafile("0,0,0,1,0,0", 8, 8).is_err());
    }

    #[test]
    fn test_parse_metafile_wrong_arity() {
        assert!(parse_metafile("0,0,1,1", 8, 8).is_err());
        assert!(parse_metafile("# only a comment\n", 8, 8).is_err());
    }

    #[test]
    fn test_metafile_path() {
        let path = metafile_path(Path::new("/assets/units/archer.png"));
        assert_eq!(path, PathBuf::from("/assets/units/archer.meta"));
    }

    #[test]
    fn test_from_file_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let tex = Texture::from_file(&path).unwrap();
        assert_eq!((tex.width, tex.height), (3, 2));
        assert_eq!(&tex.pixels[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_from_file_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(Texture::from_file(&path).is_err());
    }
}
