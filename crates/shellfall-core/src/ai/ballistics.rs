//! Closed-form firing solutions.
//!
//! For a launch speed `v` under gravity `g`, the elevation `θ` that passes
//! through a point `(dx, dy)` away satisfies
//!
//! ```text
//! tan θ = (v² ∓ √(v⁴ − g(g·dx² + 2·dy·v²))) / (g·dx)
//! ```
//!
//! The low root (minus) gives a flat shot, the high root a lob. When the
//! discriminant is negative the target is out of reach at that speed.
//!
//! # Example
//!
//! ```
//! use shellfall_core::ai::ballistics::solve_elevation;
//!
//! let angle = solve_elevation(10.0, 0.0, 9.8, 15.0).unwrap();
//! assert!((angle - 12.9).abs() < 0.1);
//! ```

use glam::Vec2;

/// Lowest elevation a bot will use, in degrees.
pub const MIN_ELEVATION_DEG: f32 = 5.0;

/// Highest elevation a bot will use, in degrees.
pub const MAX_ELEVATION_DEG: f32 = 85.0;

/// Elevation used when no solution exists.
pub const FALLBACK_ELEVATION_DEG: f32 = 45.0;

/// Speed multiplier for the single retry after an unreachable solve.
pub const POWER_RETRY_FACTOR: f32 = 1.35;

/// A chosen shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiringSolution {
    /// Elevation above horizontal toward the target, in degrees
    pub elevation_deg: f32,
    /// Power in (0, 1]
    pub power: f32,
    /// `+1` to shoot right, `-1` to shoot left
    pub side: f32,
    /// No closed-form solution was found and the fallback angle is used
    pub fallback: bool,
}

impl FiringSolution {
    /// Unit aim direction.
    #[must_use]
    pub fn direction(&self) -> Vec2 {
        let radians = self.elevation_deg.to_radians();
        Vec2::new(self.side * radians.cos(), radians.sin())
    }

    /// Add an aim error in degrees, keeping the elevation in the allowed band.
    #[must_use]
    pub fn with_error(self, error_deg: f32) -> Self {
        Self {
            elevation_deg: (self.elevation_deg + error_deg).clamp(MIN_ELEVATION_DEG, MAX_ELEVATION_DEG),
            ..self
        }
    }
}

/// Outcome of a closed-form elevation solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Elevation {
    /// Usable elevation in degrees
    Angle(f32),
    /// Reachable, but neither root lies in `[5°, 85°]`
    OutOfBand,
    /// Negative discriminant: the target is beyond reach at this speed
    Unreachable,
}

/// Classify the elevation that reaches `(dx, dy)` at speed `v`.
///
/// Prefers the low root; falls back to the high root when the low one is
/// outside `[5°, 85°]`. A target straight above or below the muzzle is
/// out of band; a non-positive speed or gravity is unreachable.
#[must_use]
pub fn elevation(dx: f32, dy: f32, gravity: f32, speed: f32) -> Elevation {
    if gravity <= 0.0 || speed <= 0.0 {
        return Elevation::Unreachable;
    }
    let dx = dx.abs();
    if dx <= f32::EPSILON {
        return Elevation::OutOfBand;
    }
    let v2 = speed * speed;
    let disc = v2 * v2 - gravity * (gravity * dx * dx + 2.0 * dy * v2);
    if disc < 0.0 {
        return Elevation::Unreachable;
    }
    let root = disc.sqrt();
    let in_band = |deg: f32| (MIN_ELEVATION_DEG..=MAX_ELEVATION_DEG).contains(&deg);
    let low = ((v2 - root) / (gravity * dx)).atan().to_degrees();
    if in_band(low) {
        return Elevation::Angle(low);
    }
    let high = ((v2 + root) / (gravity * dx)).atan().to_degrees();
    if in_band(high) {
        Elevation::Angle(high)
    } else {
        Elevation::OutOfBand
    }
}

/// Elevation in degrees that reaches `(dx, dy)` at speed `v`, if usable.
#[must_use]
pub fn solve_elevation(dx: f32, dy: f32, gravity: f32, speed: f32) -> Option<f32> {
    match elevation(dx, dy, gravity, speed) {
        Elevation::Angle(deg) => Some(deg),
        Elevation::OutOfBand | Elevation::Unreachable => None,
    }
}

/// Solve a gravity-affected shot from `origin` to `target`.
///
/// Tries `power` first. Only an unreachable target earns a single retry
/// with the speed raised by [`POWER_RETRY_FACTOR`] (capped at `max_speed`).
/// A reachable target whose roots are both outside the band, or a failed
/// retry, uses exactly [`FALLBACK_ELEVATION_DEG`] at the power last tried.
///
/// # Arguments
///
/// * `origin` - Muzzle position
/// * `target` - Aim point
/// * `gravity` - Downward acceleration
/// * `max_speed` - Launch speed at full power
/// * `power` - Preferred power in (0, 1]
#[must_use]
pub fn solve(origin: Vec2, target: Vec2, gravity: f32, max_speed: f32, power: f32) -> FiringSolution {
    let delta = target - origin;
    let side = if delta.x < 0.0 { -1.0 } else { 1.0 };
    let power = power.clamp(f32::EPSILON, 1.0);
    let shot = |elevation_deg, power, fallback| FiringSolution {
        elevation_deg,
        power,
        side,
        fallback,
    };

    let speed = max_speed * power;
    match elevation(delta.x, delta.y, gravity, speed) {
        Elevation::Angle(deg) => return shot(deg, power, false),
        Elevation::OutOfBand => return shot(FALLBACK_ELEVATION_DEG, power, true),
        Elevation::Unreachable => {}
    }

    let retry_speed = (speed * POWER_RETRY_FACTOR).min(max_speed);
    let retry_power = if max_speed > 0.0 { retry_speed / max_speed } else { 1.0 };
    match elevation(delta.x, delta.y, gravity, retry_speed) {
        Elevation::Angle(deg) => shot(deg, retry_power, false),
        Elevation::OutOfBand | Elevation::Unreachable => shot(FALLBACK_ELEVATION_DEG, retry_power.max(f32::EPSILON), true),
    }
}

/// Straight-line aim for weapons that ignore gravity.
#[must_use]
pub fn direct_aim(origin: Vec2, target: Vec2) -> Option<Vec2> {
    (target - origin).try_normalize()
}

/// Rotate a direction by `degrees` (counter-clockwise).
#[must_use]
pub fn rotate_deg(direction: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(direction)
}
