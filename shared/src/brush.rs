//! Static color and thickness catalog.
//!
//! Both the drawing side and the receiving side resolve ids through these
//! tables, so a payload decoded on another client paints exactly what the
//! sender saw.

use serde::{Deserialize, Serialize};

use crate::codec::MalformedPayload;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ColorId {
    #[default]
    Default = 0,
    Eraser = 1,
    Red = 2,
    Blue = 3,
    Green = 4,
    Yellow = 5,
    Orange = 6,
    Purple = 7,
    Pink = 8,
    Gray = 9,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ThicknessId {
    Thin = 0,
    #[default]
    SemiThin = 1,
    Medium = 2,
    SemiThick = 3,
    Thick = 4,
    Eraser = 5,
}

const COLOR_TABLE: [Rgb; 10] = [
    Rgb(34, 34, 34),
    Rgb(255, 255, 255),
    Rgb(235, 51, 36),
    Rgb(0, 162, 232),
    Rgb(34, 177, 76),
    Rgb(255, 242, 0),
    Rgb(255, 127, 39),
    Rgb(163, 73, 164),
    Rgb(255, 174, 201),
    Rgb(195, 195, 195),
];

const THICKNESS_TABLE: [f64; 6] = [2.0, 4.0, 6.0, 8.0, 10.0, 50.0];

impl ColorId {
    pub const ALL: [ColorId; 10] = [
        ColorId::Default,
        ColorId::Eraser,
        ColorId::Red,
        ColorId::Blue,
        ColorId::Green,
        ColorId::Yellow,
        ColorId::Orange,
        ColorId::Purple,
        ColorId::Pink,
        ColorId::Gray,
    ];

    pub fn rgb(self) -> Rgb {
        COLOR_TABLE[self as usize]
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ColorId {
    type Error = MalformedPayload;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ColorId::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(MalformedPayload::UnknownColor(value))
    }
}

impl ThicknessId {
    pub const ALL: [ThicknessId; 6] = [
        ThicknessId::Thin,
        ThicknessId::SemiThin,
        ThicknessId::Medium,
        ThicknessId::SemiThick,
        ThicknessId::Thick,
        ThicknessId::Eraser,
    ];

    pub fn width_px(self) -> f64 {
        THICKNESS_TABLE[self as usize]
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ThicknessId {
    type Error = MalformedPayload;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ThicknessId::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(MalformedPayload::UnknownThickness(value))
    }
}

/// The brush a stroke was drawn with, as ids.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct BrushState {
    pub color: ColorId,
    pub thickness: ThicknessId,
}

/// A brush resolved to concrete paint values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedBrush {
    pub rgb: Rgb,
    pub width_px: f64,
}

impl BrushState {
    pub fn new(color: ColorId, thickness: ThicknessId) -> Self {
        Self { color, thickness }
    }

    pub fn resolve(self) -> ResolvedBrush {
        ResolvedBrush {
            rgb: self.color.rgb(),
            width_px: self.thickness.width_px(),
        }
    }

    pub fn half_thickness(self) -> f64 {
        self.thickness.width_px() / 2.0
    }
}
