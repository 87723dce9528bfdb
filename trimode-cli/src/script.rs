//! Scripted pointer drags.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trimode_core::{PointerEvent, SurfaceEvent};

/// Errors from parsing a `x0,y0:x1,y1` drag.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DragParseError {
    /// The `:` separating start and end is missing.
    #[error("expected 'x0,y0:x1,y1', got '{0}'")]
    Shape(String),

    /// A point is not two comma-separated numbers.
    #[error("invalid point '{0}'")]
    Point(String),
}

/// A straight drag from one CSS-pixel position to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drag {
    /// Where the pointer goes down.
    pub from: (f64, f64),
    /// Where it moves to and is released.
    pub to: (f64, f64),
}

impl Drag {
    /// The down, move and up events for this drag.
    #[must_use]
    pub fn events(&self) -> [SurfaceEvent; 3] {
        [
            SurfaceEvent::Pointer(PointerEvent::down(self.from.0, self.from.1)),
            SurfaceEvent::Pointer(PointerEvent::moved(self.to.0, self.to.1)),
            SurfaceEvent::Pointer(PointerEvent::up(self.to.0, self.to.1)),
        ]
    }
}

fn parse_point(s: &str) -> Result<(f64, f64), DragParseError> {
    let invalid = || DragParseError::Point(s.to_string());
    let (x, y) = s.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse::<f64>().map_err(|_| invalid())?;
    let y = y.trim().parse::<f64>().map_err(|_| invalid())?;
    if x.is_finite() && y.is_finite() {
        Ok((x, y))
    } else {
        Err(invalid())
    }
}

impl FromStr for Drag {
    type Err = DragParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(':')
            .ok_or_else(|| DragParseError::Shape(s.to_string()))?;
        Ok(Self {
            from: parse_point(from)?,
            to: parse_point(to)?,
        })
    }
}
