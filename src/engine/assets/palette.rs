// Color palettes read from row-per-color text files

use anyhow::{bail, Context, Result};
use bytemuck::{Pod, Zeroable};
use std::path::Path;

/// One palette entry
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PaletteColor {
    pub idx: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl PaletteColor {
    pub fn new(idx: u32, r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { idx, r, g, b, a }
    }

    pub fn rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// View a palette as raw bytes, e.g. for a lookup-texture upload
pub fn as_bytes(palette: &[PaletteColor]) -> &[u8] {
    bytemuck::cast_slice(palette)
}

/// Read and parse a palette file
pub fn read_palette(path: &Path) -> Result<Vec<PaletteColor>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read palette {}", path.display()))?;
    parse_palette(&text).with_context(|| format!("invalid palette {}", path.display()))
}

/// Parse `idx,r,g,b,a` rows; blank lines and `#` comments are skipped
pub fn parse_palette(text: &str) -> Result<Vec<PaletteColor>> {
    let mut colors = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 5 {
            bail!("line {}: expected 5 fields, got {}", line_no + 1, fields.len());
        }

        let idx = fields[0]
            .parse::<u32>()
            .with_context(|| format!("line {}: bad index {:?}", line_no + 1, fields[0]))?;

        let mut channels = [0u8; 4];
        for (channel, field) in channels.iter_mut().zip(&fields[1..]) {
            *channel = field
                .parse::<u8>()
                .with_context(|| format!("line {}: bad channel {:?}", line_no + 1, field))?;
        }

        let [r, g, b, a] = channels;
        colors.push(PaletteColor::new(idx, r, g, b, a));
    }

    Ok(colors)
}
