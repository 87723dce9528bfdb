//! Backend modes and their construction options.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which backend variant renders the triangle.
///
/// Also names the kind of context a backend requests from its surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// GPU pipeline via wgpu (WebGPU in browsers).
    #[default]
    Accelerated,
    /// GL shader pipeline (WebGL2 in browsers).
    Rasterized,
    /// CPU rasterization into a pixel buffer.
    Software,
}

impl Mode {
    /// All modes in fallback order.
    pub const ALL: [Mode; 3] = [Mode::Accelerated, Mode::Rasterized, Mode::Software];

    /// Successor on a manual toggle.
    ///
    /// `rasterized → accelerated → software → rasterized`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Rasterized => Self::Accelerated,
            Self::Accelerated => Self::Software,
            Self::Software => Self::Rasterized,
        }
    }

    /// Successor when construction reports the mode unavailable.
    ///
    /// `accelerated → rasterized → software`, then nothing.
    #[must_use]
    pub fn fallback(self) -> Option<Self> {
        match self {
            Self::Accelerated => Some(Self::Rasterized),
            Self::Rasterized => Some(Self::Software),
            Self::Software => None,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Rasterized => "rasterized",
            Self::Software => "software",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accelerated" | "webgpu" | "wgpu" => Ok(Self::Accelerated),
            "rasterized" | "webgl" | "webgl2" => Ok(Self::Rasterized),
            "software" | "canvas2d" | "2d" => Ok(Self::Software),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// Backend construction hints.
///
/// Each backend reads the hints that apply to it and ignores the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackendOptions {
    /// Prefer the high-performance adapter / GPU.
    pub high_performance: bool,
    /// Ask for a low-latency, desynchronized presentation path.
    pub desynchronized: bool,
    /// Request an anti-aliased drawing buffer.
    pub antialias: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            high_performance: false,
            desynchronized: false,
            antialias: true,
        }
    }
}

impl BackendOptions {
    /// Flip the named option and return its new value.
    pub fn toggle(&mut self, name: OptionName) -> bool {
        let flag = match name {
            OptionName::HighPerformance => &mut self.high_performance,
            OptionName::Desynchronized => &mut self.desynchronized,
            OptionName::Antialias => &mut self.antialias,
        };
        *flag = !*flag;
        *flag
    }

    /// Current value of the named option.
    #[must_use]
    pub fn get(&self, name: OptionName) -> bool {
        match name {
            OptionName::HighPerformance => self.high_performance,
            OptionName::Desynchronized => self.desynchronized,
            OptionName::Antialias => self.antialias,
        }
    }
}

/// Names accepted by a host's `toggleOption` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionName {
    /// [`BackendOptions::high_performance`].
    HighPerformance,
    /// [`BackendOptions::desynchronized`].
    Desynchronized,
    /// [`BackendOptions::antialias`].
    Antialias,
}

impl FromStr for OptionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "highPerformance" | "high_performance" | "powerPreference" => {
                Ok(Self::HighPerformance)
            }
            "desynchronized" => Ok(Self::Desynchronized),
            "antialias" => Ok(Self::Antialias),
            other => Err(format!("unknown option '{other}'")),
        }
    }
}
