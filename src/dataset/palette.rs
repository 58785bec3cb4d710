use crate::util::stable_hash;

/// A packed `0xRRGGBB` display color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const fn r(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    pub const fn g(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    pub const fn b(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Channels as floats in `[0, 1]`.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
        ]
    }

    /// Multiplies every channel, saturating at full intensity.
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |channel: u8| ((channel as f32 * factor.max(0.0)).min(255.0)) as u32;
        Self((scale(self.r()) << 16) | (scale(self.g()) << 8) | scale(self.b()))
    }

    pub fn lerp(self, other: Self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| ((a as f32 * (1.0 - amount)) + (b as f32 * amount)).round() as u32;
        Self(
            (mix(self.r(), other.r()) << 16)
                | (mix(self.g(), other.g()) << 8)
                | mix(self.b(), other.b()),
        )
    }
}

/// Color every dimmed node fades toward.
pub const DIMMED_NODE_COLOR: Rgb = Rgb(0x333333);

/// Neutral color for edges inferred from shared tags.
pub const INFERRED_EDGE_COLOR: Rgb = Rgb(0x666666);

/// Bright pool used for category-derived flat colors.
pub const COLOR_POOL: [Rgb; 18] = [
    Rgb(0x3b82f6),
    Rgb(0x10b981),
    Rgb(0xf59e0b),
    Rgb(0xec4899),
    Rgb(0x6366f1),
    Rgb(0x06b6d4),
    Rgb(0x84cc16),
    Rgb(0x8b5cf6),
    Rgb(0x14b8a6),
    Rgb(0xf97316),
    Rgb(0xef4444),
    Rgb(0xa855f7),
    Rgb(0x22c55e),
    Rgb(0xf43f5e),
    Rgb(0xeab308),
    Rgb(0xf472b6),
    Rgb(0xfb923c),
    Rgb(0x38bdf8),
];

/// Visual skin of a node: a texture key plus the surface and glow colors used
/// when the texture is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkinPalette {
    pub key: &'static str,
    pub color: Rgb,
    pub emissive: Rgb,
}

pub const SKIN_PALETTES: [SkinPalette; 9] = [
    SkinPalette {
        key: "mercury",
        color: Rgb(0x9e9e9e),
        emissive: Rgb(0x424242),
    },
    SkinPalette {
        key: "venus",
        color: Rgb(0xe6c27a),
        emissive: Rgb(0x8d6e3f),
    },
    SkinPalette {
        key: "earth",
        color: Rgb(0x4f8fd6),
        emissive: Rgb(0x1b3d6b),
    },
    SkinPalette {
        key: "mars",
        color: Rgb(0xc1440e),
        emissive: Rgb(0x6d2607),
    },
    SkinPalette {
        key: "jupiter",
        color: Rgb(0xd8ca9d),
        emissive: Rgb(0x8a7a56),
    },
    SkinPalette {
        key: "saturn",
        color: Rgb(0xf4d59e),
        emissive: Rgb(0x9c8357),
    },
    SkinPalette {
        key: "uranus",
        color: Rgb(0x4fc3f7),
        emissive: Rgb(0x0288d1),
    },
    SkinPalette {
        key: "neptune",
        color: Rgb(0x1a3a70),
        emissive: Rgb(0x0d1f3d),
    },
    SkinPalette {
        key: "pluto",
        color: Rgb(0xb5a597),
        emissive: Rgb(0x8b7d71),
    },
];

/// Picks the skin palette for a node: the named skin when it exists, otherwise
/// a round-robin entry by node index.
pub fn skin_palette(skin: Option<&str>, index: usize) -> SkinPalette {
    skin.and_then(|key| {
        SKIN_PALETTES
            .iter()
            .find(|palette| palette.key.eq_ignore_ascii_case(key))
            .copied()
    })
    .unwrap_or(SKIN_PALETTES[index % SKIN_PALETTES.len()])
}

/// Flat fallback color for a node whose skin failed to load.
pub fn category_color(category: Option<&str>, fallback: Rgb) -> Rgb {
    match category.map(str::trim).filter(|category| !category.is_empty()) {
        Some(category) => COLOR_POOL[(stable_hash(category) % COLOR_POOL.len() as u64) as usize],
        None => fallback,
    }
}
