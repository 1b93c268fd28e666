// GXT palette location and channel-order handling.
//
// Palettes live at the tail of the data region, 8-bit palettes nearest the
// end. A palette color is 4 bytes whose meaning depends on a per-texture
// channel-order code; decoding normalizes everything to (r, g, b, a).

/// Colors in a 4-bit palette.
pub const PALETTE4_COLORS: usize = 16;
/// Colors in an 8-bit palette.
pub const PALETTE8_COLORS: usize = 256;

/// Byte order of a stored palette color. The name spells the stream order:
/// `Argb` means byte 0 is alpha, byte 1 red, and so on. `X` positions are
/// ignored on read and force alpha to 255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Abgr,
    Argb,
    Rgba,
    Bgra,
    Xbgr,
    Xrgb,
    Rgbx,
    Bgrx,
}

impl ChannelOrder {
    /// Map a format-word channel-order code (bits 12..=15) to an order.
    /// Unrecognized codes fall back to RGBA so bulk decoding keeps going
    /// on partially-understood format variants.
    pub fn from_code(code: u32) -> Self {
        match code {
            0x0 => Self::Abgr,
            0x1 => Self::Argb,
            0x2 => Self::Rgba,
            0x3 => Self::Bgra,
            0x4 => Self::Xbgr,
            0x5 => Self::Xrgb,
            0x6 => Self::Rgbx,
            0x7 => Self::Bgrx,
            other => {
                log::warn!("unknown palette channel-order code {other:#x}, assuming RGBA");
                Self::Rgba
            }
        }
    }

    /// Reorder one stored color to (r, g, b, a).
    pub fn to_rgba(self, c: [u8; 4]) -> [u8; 4] {
        match self {
            Self::Abgr => [c[3], c[2], c[1], c[0]],
            Self::Argb => [c[1], c[2], c[3], c[0]],
            Self::Rgba => [c[0], c[1], c[2], c[3]],
            Self::Bgra => [c[2], c[1], c[0], c[3]],
            Self::Xbgr => [c[3], c[2], c[1], 255],
            Self::Xrgb => [c[1], c[2], c[3], 255],
            Self::Rgbx => [c[0], c[1], c[2], 255],
            Self::Bgrx => [c[2], c[1], c[0], 255],
        }
    }
}

/// A palette normalized to RGBA.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<[u8; 4]>,
}

impl Palette {
    pub fn from_raw(raw: &[u8], order: ChannelOrder) -> Self {
        let colors = raw
            .chunks_exact(4)
            .map(|c| order.to_rgba([c[0], c[1], c[2], c[3]]))
            .collect();
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color for a pixel index, or `None` when the index is outside the
    /// palette (callers substitute the sentinel color).
    #[inline]
    pub fn color(&self, index: usize) -> Option<[u8; 4]> {
        self.colors.get(index).copied()
    }
}

/// Byte range of palette `palette_index` inside the buffer, or `None` when
/// the declared palette counts do not fit in the data region.
///
/// Walks backward from the end of the data region: the 8-bit palettes sit
/// last, the 4-bit palettes directly before them, each group in index order.
pub fn palette_range(
    data_offset: usize,
    data_size: usize,
    palette4_count: usize,
    palette8_count: usize,
    palette_index: usize,
    is_4bit: bool,
) -> Option<(usize, usize)> {
    let data_end = data_offset + data_size;
    let p8_base = data_end.checked_sub(palette8_count * PALETTE8_COLORS * 4)?;
    let p4_base = p8_base.checked_sub(palette4_count * PALETTE4_COLORS * 4)?;
    let entry_size = if is_4bit {
        PALETTE4_COLORS * 4
    } else {
        PALETTE8_COLORS * 4
    };
    let base = if is_4bit { p4_base } else { p8_base };
    let start = base + palette_index * entry_size;
    Some((start, start + entry_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

    #[test]
    fn channel_orders_permute_as_named() {
        // The order name spells the byte order of the stored color.
        assert_eq!(ChannelOrder::Argb.to_rgba(SAMPLE), [0x02, 0x03, 0x04, 0x01]);
        assert_eq!(ChannelOrder::Abgr.to_rgba(SAMPLE), [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(ChannelOrder::Rgba.to_rgba(SAMPLE), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(ChannelOrder::Bgra.to_rgba(SAMPLE), [0x03, 0x02, 0x01, 0x04]);
    }

    #[test]
    fn x_orders_force_opaque_alpha() {
        assert_eq!(ChannelOrder::Xbgr.to_rgba(SAMPLE), [0x04, 0x03, 0x02, 255]);
        assert_eq!(ChannelOrder::Xrgb.to_rgba(SAMPLE), [0x02, 0x03, 0x04, 255]);
        assert_eq!(ChannelOrder::Rgbx.to_rgba(SAMPLE), [0x01, 0x02, 0x03, 255]);
        assert_eq!(ChannelOrder::Bgrx.to_rgba(SAMPLE), [0x03, 0x02, 0x01, 255]);
    }

    #[test]
    fn unknown_code_defaults_to_rgba() {
        assert_eq!(ChannelOrder::from_code(0xC), ChannelOrder::Rgba);
    }

    #[test]
    fn recognized_codes_map_in_order() {
        assert_eq!(ChannelOrder::from_code(0), ChannelOrder::Abgr);
        assert_eq!(ChannelOrder::from_code(7), ChannelOrder::Bgrx);
    }

    #[test]
    fn palette_ranges_walk_back_from_data_end() {
        // Data region 0x100..0x100+0x3000 with two 8-bit and three 4-bit
        // palettes at the tail.
        let (data_offset, data_size) = (0x100, 0x3000);
        let p8_total = 2 * PALETTE8_COLORS * 4; // 0x800
        let p4_total = 3 * PALETTE4_COLORS * 4; // 0xC0

        let (s, e) = palette_range(data_offset, data_size, 3, 2, 1, false).unwrap();
        assert_eq!(e, data_offset + data_size);
        assert_eq!(s, e - PALETTE8_COLORS * 4);

        let (s4, _) = palette_range(data_offset, data_size, 3, 2, 0, true).unwrap();
        assert_eq!(s4, data_offset + data_size - p8_total - p4_total);
    }

    #[test]
    fn oversized_palette_counts_do_not_fit() {
        // 100 8-bit palettes cannot fit a 0x1000-byte data region.
        assert!(palette_range(0, 0x1000, 0, 100, 0, false).is_none());
    }

    #[test]
    fn palette_lookup_miss_is_none() {
        let raw = [0u8; PALETTE4_COLORS * 4];
        let pal = Palette::from_raw(&raw, ChannelOrder::Rgba);
        assert_eq!(pal.len(), 16);
        assert!(pal.color(15).is_some());
        assert!(pal.color(16).is_none());
    }
}
