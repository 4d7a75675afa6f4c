use crate::error::ClientError;
use schema::{Detection, Point};
use std::fmt;
use std::str::FromStr;

/// Region of interest inside the submitted image, in pixels.
///
/// All four values are non-negative; they are embedded into the request
/// exactly as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl CropRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self, ClientError> {
        for (name, value) in [("x", x), ("y", y), ("width", width), ("height", height)] {
            if value < 0 {
                return Err(ClientError::Validation(format!(
                    "crop rectangle {} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Wire form of the rectangle tagged with the line that triggered it.
    pub fn to_detection(&self, line_id: i32) -> Detection {
        Detection {
            x_left: self.x,
            y_top: self.y,
            width: self.width,
            height: self.height,
            line_id,
        }
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A frame coordinate given on the command line as `x,y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl FromStr for PixelPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `x,y`, got `{}`", s))?;

        let x = x
            .trim()
            .parse()
            .map_err(|e| format!("invalid x in `{}`: {}", s, e))?;
        let y = y
            .trim()
            .parse()
            .map_err(|e| format!("invalid y in `{}`: {}", s, e))?;

        Ok(Self { x, y })
    }
}

impl From<PixelPoint> for Point {
    fn from(p: PixelPoint) -> Self {
        Point { x: p.x, y: p.y }
    }
}
