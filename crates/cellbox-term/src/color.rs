// SPDX-License-Identifier: MIT
//
// Color quantization — how an attribute's color index becomes a palette index.
//
// Cells store an abstract color index. The output mode decides, at flush
// time, which slice of the terminal palette that index addresses:
//
//   Normal     1..=8    the eight ANSI colors (SGR 30–37 / 40–47)
//   Color256   1..=256  the full xterm palette, offset by one
//   Color216   1..=216  the 6×6×6 cube only (palette 16..=231)
//   Grayscale  1..=26   the 24-step gray ramp plus cube black and white
//
// In every mode 0 is the terminal's default color. Out-of-range indices in
// the restricted modes fall back to the default color rather than wrapping
// into an unrelated part of the palette.

use serde::{Deserialize, Serialize};

use crate::cell::Attribute;

// ─── OutputMode ──────────────────────────────────────────────────────────────

/// Color interpretation applied when cells are written to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Query sentinel: passed to `set_output_mode`, returns the active
    /// mode without changing it.
    Current,
    /// Eight colors.
    #[default]
    Normal,
    /// The 256-color palette.
    #[serde(alias = "256")]
    Color256,
    /// The 216-color cube.
    #[serde(alias = "216")]
    Color216,
    /// 26 shades of gray.
    #[serde(alias = "gray")]
    Grayscale,
}

impl OutputMode {
    /// Whether colors are emitted with the `38;5` / `48;5` extended syntax.
    #[inline]
    #[must_use]
    pub const fn is_extended(self) -> bool {
        matches!(self, Self::Color256 | Self::Color216 | Self::Grayscale)
    }
}

// ─── Quantization ────────────────────────────────────────────────────────────

/// Palette positions (one-based, as emitted minus one) for grayscale mode.
///
/// Index 1 is cube black, 2..=25 the gray ramp, 26 cube white.
const GRAYSCALE: [u16; 27] = [
    0, 17, 233, 234, 235, 236, 237, 238, 239, 240, 241, 242, 243, 244, 245, 246, 247, 248, 249,
    250, 251, 252, 253, 254, 255, 256, 232,
];

/// Map one attribute to a one-based palette value for `mode`.
///
/// Returns `0` for the default color. The caller emits `value - 1`.
#[must_use]
pub fn quantize(attr: Attribute, mode: OutputMode) -> u16 {
    let bits = attr.bits();
    match mode {
        OutputMode::Color256 => bits & 0x01FF,
        OutputMode::Color216 => match bits & 0x00FF {
            0 | 217.. => 0,
            c => c + 0x10,
        },
        OutputMode::Grayscale => match bits & 0x001F {
            0 | 27.. => 0,
            c => GRAYSCALE[usize::from(c)],
        },
        OutputMode::Normal | OutputMode::Current => bits & 0x000F,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_color_is_zero_in_every_mode() {
        for mode in [
            OutputMode::Normal,
            OutputMode::Color256,
            OutputMode::Color216,
            OutputMode::Grayscale,
        ] {
            assert_eq!(quantize(Attribute::DEFAULT, mode), 0, "{mode:?}");
        }
    }

    #[test]
    fn normal_mode_keeps_low_nibble() {
        assert_eq!(quantize(Attribute::RED | Attribute::BOLD, OutputMode::Normal), 2);
        assert_eq!(quantize(Attribute::WHITE, OutputMode::Normal), 8);
    }

    #[test]
    fn color256_passes_index_through() {
        assert_eq!(quantize(Attribute::color_index(184), OutputMode::Color256), 184);
        assert_eq!(quantize(Attribute::color_index(256), OutputMode::Color256), 256);
    }

    #[test]
    fn color216_offsets_into_cube() {
        assert_eq!(quantize(Attribute::color_index(1), OutputMode::Color216), 17);
        assert_eq!(quantize(Attribute::color_index(216), OutputMode::Color216), 232);
    }

    #[test]
    fn color216_out_of_range_is_default() {
        assert_eq!(quantize(Attribute::color_index(217), OutputMode::Color216), 0);
    }

    #[test]
    fn grayscale_uses_ramp() {
        assert_eq!(quantize(Attribute::color_index(1), OutputMode::Grayscale), 17);
        assert_eq!(quantize(Attribute::color_index(2), OutputMode::Grayscale), 233);
        assert_eq!(quantize(Attribute::color_index(25), OutputMode::Grayscale), 256);
        assert_eq!(quantize(Attribute::color_index(26), OutputMode::Grayscale), 232);
    }

    #[test]
    fn grayscale_out_of_range_is_default() {
        assert_eq!(quantize(Attribute::color_index(27), OutputMode::Grayscale), 0);
    }

    #[test]
    fn extended_modes() {
        assert!(!OutputMode::Normal.is_extended());
        assert!(OutputMode::Color256.is_extended());
        assert!(OutputMode::Color216.is_extended());
        assert!(OutputMode::Grayscale.is_extended());
    }

    #[test]
    fn output_mode_parses_from_config_names() {
        #[derive(Deserialize)]
        struct Wrap {
            mode: OutputMode,
        }
        let w: Wrap = toml::from_str("mode = \"color216\"").unwrap();
        assert_eq!(w.mode, OutputMode::Color216);
        let w: Wrap = toml::from_str("mode = \"256\"").unwrap();
        assert_eq!(w.mode, OutputMode::Color256);
    }
}
