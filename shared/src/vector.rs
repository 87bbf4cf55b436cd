use serde::{Deserialize, Serialize};
use std::fmt;

///Represents a point or direction in 3D space.
///
/// Travels over the wire as a plain `[x, y, z]` array. Decoding rejects
/// components that are infinite or NaN, including numbers too large for `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "[f32; 3]", into = "[f32; 3]")]
pub struct Vec3 {
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is up.
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    ///Returns the squared magnitude of the vector.
    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    ///Returns true if no component is infinite or NaN.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    ///Returns the normalized vector, or zero for a zero-length or non-finite vector.
    /// Components are pre-scaled by the largest one so huge inputs do not overflow.
    pub fn normalize(&self) -> Vec3 {
        let largest = self.x.abs().max(self.y.abs()).max(self.z.abs());
        if largest == 0.0 || !largest.is_finite() {
            return Vec3::ZERO;
        }
        let reduced = self.scale(1.0 / largest);
        reduced.scale(1.0 / reduced.magnitude())
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    ///Returns the squared distance between two points.
    /// Hit tests compare against a squared radius to stay off `sqrt`.
    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude_squared()
    }
}

/// Error for a vector component that is infinite or NaN
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonFiniteVector([f32; 3]);

impl fmt::Display for NonFiniteVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "non-finite vector component in {:?}", self.0)
    }
}

impl std::error::Error for NonFiniteVector {}

impl TryFrom<[f32; 3]> for Vec3 {
    type Error = NonFiniteVector;

    fn try_from(components: [f32; 3]) -> Result<Self, Self::Error> {
        let [x, y, z] = components;
        let v = Vec3 { x, y, z };
        if v.is_finite() {
            Ok(v)
        } else {
            Err(NonFiniteVector(components))
        }
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}
