use tracing::warn;

use crate::session::HexColor;
use crate::store::{KvStore, THEME_KEY};

pub type Rgb = (u8, u8, u8);

/// Cell colors per theme, indexed by [`HexColor::theme_slot`]
pub const THEMES: [[Rgb; 4]; 4] = [
    [
        (0xF7, 0x93, 0x1E),
        (0x8C, 0xC6, 0x3F),
        (0x29, 0xAB, 0xE2),
        (0x7B, 0x8C, 0xDE),
    ],
    [
        (0xF5, 0xA6, 0x23),
        (0x7E, 0xD4, 0xD1),
        (0xEC, 0x8C, 0x99),
        (0x8F, 0xD4, 0x7E),
    ],
    [
        (0x6B, 0x93, 0x70),
        (0xB5, 0xD4, 0xA1),
        (0xA8, 0xCE, 0xE2),
        (0xD4, 0xC8, 0x9E),
    ],
    [
        (0x2D, 0x34, 0x36),
        (0x4A, 0x5F, 0x8C),
        (0xB8, 0xC5, 0xE0),
        (0xF4, 0xE6, 0x3D),
    ],
];

/// Highlight used for the target marker in the pattern indicator
pub const TARGET_HIGHLIGHT: Rgb = (0x29, 0xAB, 0xE2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Theme {
    index: usize,
}

impl Theme {
    /// Out-of-range indices fall back to the default theme
    pub fn new(index: usize) -> Self {
        if index < THEMES.len() {
            Self { index }
        } else {
            Self::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn color(&self, color: HexColor) -> Rgb {
        THEMES[self.index][color.theme_slot()]
    }

    pub fn next(&self) -> Self {
        Self::new((self.index + 1) % THEMES.len())
    }

    pub fn prev(&self) -> Self {
        Self::new((self.index + THEMES.len() - 1) % THEMES.len())
    }

    pub fn load<S: KvStore>(store: &S) -> Self {
        match store.get(THEME_KEY) {
            Ok(Some(raw)) => raw.trim().parse::<usize>().map(Self::new).unwrap_or_default(),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, "failed to load theme preference");
                Self::default()
            }
        }
    }

    pub fn save<S: KvStore>(&self, store: &mut S) {
        if let Err(e) = store.set(THEME_KEY, &self.index.to_string()) {
            warn!(error = %e, "failed to save theme preference");
        }
    }
}
