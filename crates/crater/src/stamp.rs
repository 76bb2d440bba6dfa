//! Carve stamps: the mutation primitive for terrain.
//!
//! A stamp describes a region of world space whose cells are cleared. Cells
//! are tested by their centre point, so the same stamp always touches the same
//! cells on every participant.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::Bounds;

/// Shape of a carve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CarveShape {
    /// Disc defined by center and radius
    Circle {
        /// World-space centre
        center: Vec2,
        /// Radius in world units
        radius: f32,
    },
    /// Annulus: cells with `inner < distance <= outer`
    Ring {
        /// World-space centre
        center: Vec2,
        /// Exclusive inner radius
        inner: f32,
        /// Inclusive outer radius
        outer: f32,
    },
}

impl CarveShape {
    /// Create a circle shape.
    #[must_use]
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::Circle { center, radius }
    }

    /// Create a ring shape.
    #[must_use]
    pub fn ring(center: Vec2, inner: f32, outer: f32) -> Self {
        Self::Ring {
            center,
            inner,
            outer,
        }
    }

    /// Centre of the shape.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        match self {
            Self::Circle { center, .. } | Self::Ring { center, .. } => *center,
        }
    }

    /// Returns `false` for non-finite input or empty shapes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Circle { center, radius } => center.is_finite() && radius.is_finite() && radius > 0.0,
            Self::Ring {
                center,
                inner,
                outer,
            } => center.is_finite() && inner.is_finite() && outer.is_finite() && inner >= 0.0 && outer > inner,
        }
    }

    /// Farthest distance from the centre the shape can clear.
    #[must_use]
    pub fn reach(&self) -> f32 {
        match *self {
            Self::Circle { radius, .. } => radius,
            Self::Ring { outer, .. } => outer,
        }
    }

    /// Get the bounding box of this shape.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        let center = self.center();
        let reach = Vec2::splat(self.reach());
        Bounds::from_min_max(center - reach, center + reach)
    }

    /// Check if a point is inside this shape.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        match *self {
            Self::Circle { center, radius } => center.distance_squared(point) <= radius * radius,
            Self::Ring {
                center,
                inner,
                outer,
            } => {
                let d2 = center.distance_squared(point);
                d2 > inner * inner && d2 <= outer * outer
            }
        }
    }
}
