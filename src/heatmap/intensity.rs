use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_EXPECTED_COUNT: u32 = 10;
pub const MIN_OPACITY: f64 = 0.1;

const LIGHT_PALETTE: [&str; 5] = ["#ebedf0", "#9be9a8", "#40c463", "#30a14e", "#216e39"];
const DARK_PALETTE: [&str; 5] = ["#161b22", "#0e4429", "#006d32", "#26a641", "#39d353"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Palette,
    Opacity,
}

/// Discrete intensity buckets: 0, 1-2, 3-5, 6-8, 9+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntensityLevel {
    Empty,
    Low,
    Medium,
    High,
    Max,
}

impl IntensityLevel {
    pub const ALL: [Self; 5] = [Self::Empty, Self::Low, Self::Medium, Self::High, Self::Max];

    pub fn from_count(count: u32) -> Self {
        match count {
            0 => Self::Empty,
            1..=2 => Self::Low,
            3..=5 => Self::Medium,
            6..=8 => Self::High,
            _ => Self::Max,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn color(self, theme: Theme) -> &'static str {
        let palette = match theme {
            Theme::Light => &LIGHT_PALETTE,
            Theme::Dark => &DARK_PALETTE,
        };
        palette[usize::from(self.index())]
    }

    pub fn glyph(self) -> char {
        match self {
            Self::Empty => '·',
            Self::Low => '░',
            Self::Medium => '▒',
            Self::High => '▓',
            Self::Max => '█',
        }
    }
}

/// Zero renders as the neutral background at full opacity.
pub fn opacity(count: u32, max_expected: u32) -> f64 {
    if count == 0 {
        return 1.0;
    }

    let ceiling = f64::from(max_expected.max(1));
    (f64::from(count) / ceiling).clamp(MIN_OPACITY, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Shade {
    Color { value: &'static str },
    Opacity { value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadeMapper {
    pub scheme: Scheme,
    pub theme: Theme,
    pub max_expected: u32,
}

impl Default for ShadeMapper {
    fn default() -> Self {
        Self {
            scheme: Scheme::Palette,
            theme: Theme::Light,
            max_expected: DEFAULT_MAX_EXPECTED_COUNT,
        }
    }
}

impl ShadeMapper {
    pub fn shade(&self, count: u32) -> Shade {
        match self.scheme {
            Scheme::Palette => Shade::Color {
                value: IntensityLevel::from_count(count).color(self.theme),
            },
            Scheme::Opacity => Shade::Opacity {
                value: opacity(count, self.max_expected),
            },
        }
    }
}
