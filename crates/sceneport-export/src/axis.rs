//! Axis inversion between left- and right-handed coordinates
//!
//! Mirroring a single axis flips handedness. Positions, directions and
//! rotations are mirrored consistently so a fully converted scene keeps its
//! visual shape. Every operation is its own inverse.

use std::str::FromStr;

use sceneport_core::{Mat4x4, Quat, Vec3, Vec4};

/// Axis mirrored on export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Leave coordinates untouched
    None,
    /// Mirror across the YZ plane
    X,
    /// Mirror across the XY plane
    #[default]
    Z,
}

impl Axis {
    /// Sign applied to each of x, y, z
    fn signs(self) -> [f32; 3] {
        match self {
            Axis::None => [1.0, 1.0, 1.0],
            Axis::X => [-1.0, 1.0, 1.0],
            Axis::Z => [1.0, 1.0, -1.0],
        }
    }

    /// Whether triangle winding must be reversed to keep front faces
    pub fn flips_handedness(self) -> bool {
        self != Axis::None
    }

    /// Mirror a position or direction
    pub fn invert_vec3(self, v: Vec3) -> Vec3 {
        let [sx, sy, sz] = self.signs();
        Vec3::new(v.x * sx, v.y * sy, v.z * sz)
    }

    /// Mirror the direction part of a tangent, keeping `w`
    pub fn invert_vec4(self, v: Vec4) -> Vec4 {
        let [sx, sy, sz] = self.signs();
        Vec4::new(v.x * sx, v.y * sy, v.z * sz, v.w)
    }

    /// Scale is unaffected by a single-axis mirror
    pub fn invert_scale(self, s: Vec3) -> Vec3 {
        s
    }

    /// Mirror a rotation: `S * R * S` as a quaternion
    pub fn invert_quat(self, q: Quat) -> Quat {
        match self {
            Axis::None => q,
            Axis::X => Quat::new(q.x, -q.y, -q.z, q.w),
            Axis::Z => Quat::new(-q.x, -q.y, q.z, q.w),
        }
    }

    /// Mirror a transform: `S * M * S`
    pub fn invert_mat4(self, m: Mat4x4) -> Mat4x4 {
        let [sx, sy, sz] = self.signs();
        let s = [sx, sy, sz, 1.0];
        let mut out = m;
        for (c, column) in out.m.iter_mut().enumerate() {
            for (r, value) in column.iter_mut().enumerate() {
                *value *= s[c] * s[r];
            }
        }
        out
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Axis::None),
            "x" => Ok(Axis::X),
            "z" => Ok(Axis::Z),
            _ => Err(format!("Unknown axis: {}", s)),
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Axis::None => "none",
            Axis::X => "x",
            Axis::Z => "z",
        })
    }
}
