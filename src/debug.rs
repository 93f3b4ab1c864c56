//! Debug line output.
//!
//! Stances describe what they are probing as line segments. Hosts read the
//! [`DebugLines`] component and render it however they like; the crate
//! itself does not depend on a renderer.

use bevy::prelude::*;

use crate::error::LocomotionError;

/// Sink for debug primitives.
pub trait DebugDraw {
    fn line(&mut self, start: Vec3, end: Vec3, color: Color) -> Result<(), LocomotionError>;

    fn ray(&mut self, origin: Vec3, vector: Vec3, color: Color) -> Result<(), LocomotionError> {
        self.line(origin, origin + vector, color)
    }

    /// Wireframe of an oriented box.
    fn wire_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
        color: Color,
    ) -> Result<(), LocomotionError> {
        let corner =
            |x: f32, y: f32, z: f32| center + rotation * (half_extents * Vec3::new(x, y, z));
        let corners = [
            corner(-1.0, -1.0, -1.0),
            corner(1.0, -1.0, -1.0),
            corner(1.0, -1.0, 1.0),
            corner(-1.0, -1.0, 1.0),
            corner(-1.0, 1.0, -1.0),
            corner(1.0, 1.0, -1.0),
            corner(1.0, 1.0, 1.0),
            corner(-1.0, 1.0, 1.0),
        ];
        for i in 0..4 {
            let next = (i + 1) % 4;
            self.line(corners[i], corners[next], color)?;
            self.line(corners[i + 4], corners[next + 4], color)?;
            self.line(corners[i], corners[i + 4], color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub start: Vec3,
    pub end: Vec3,
    pub color: Color,
}

/// Debug lines gathered for one character this frame.
///
/// Add this component to a character to opt in. Lines past `capacity` are
/// refused with [`LocomotionError::DebugDraw`].
#[derive(Component, Debug, Clone)]
pub struct DebugLines {
    lines: Vec<DebugLine>,
    capacity: usize,
}

impl Default for DebugLines {
    fn default() -> Self {
        Self::with_capacity(256)
    }
}

impl DebugLines {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Vec::new(),
            capacity,
        }
    }

    pub fn lines(&self) -> &[DebugLine] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl DebugDraw for DebugLines {
    fn line(&mut self, start: Vec3, end: Vec3, color: Color) -> Result<(), LocomotionError> {
        if self.lines.len() >= self.capacity {
            return Err(LocomotionError::DebugDraw(format!(
                "line buffer full ({} lines)",
                self.capacity
            )));
        }
        self.lines.push(DebugLine { start, end, color });
        Ok(())
    }
}
