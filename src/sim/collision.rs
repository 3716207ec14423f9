//! Vector math and circle collision primitives
//!
//! Every game in the arena is made of circles: cars, slimes, the ball.
//! These helpers detect overlaps, reflect velocities and resolve equal-mass
//! impacts without ever dividing by a zero distance.

use glam::Vec2;

/// Extra gap left between bodies after separation so they do not touch again
/// on the same normal due to float rounding.
pub const SEPARATION_SLOP: f32 = 0.01;

/// Overlap between two circles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the first body toward the second
    pub normal: Vec2,
    /// How far the circles overlap along the normal
    pub penetration: f32,
    /// Distance between centres
    pub distance: f32,
}

#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (b - a).length()
}

/// Unit vector along `v`, or `None` for a zero-length input
#[inline]
pub fn normalize(v: Vec2) -> Option<Vec2> {
    v.try_normalize()
}

/// Scale `v` down so its length does not exceed `max`
#[inline]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > max * max && len_sq > 0.0 {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Check whether two circles overlap.
///
/// Returns `None` when they are apart, or when the centres coincide (no
/// usable normal; the pair is retried on the next tick).
pub fn circle_overlap(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Option<Contact> {
    let delta = pos_b - pos_a;
    let min_dist = radius_a + radius_b;
    let dist_sq = delta.length_squared();
    if dist_sq >= min_dist * min_dist || dist_sq <= f32::EPSILON {
        return None;
    }
    let dist = dist_sq.sqrt();
    Some(Contact {
        normal: delta / dist,
        penetration: min_dist - dist,
        distance: dist,
    })
}

/// True once a body has travelled further than `limit` from `center`
#[inline]
pub fn beyond_radius(pos: Vec2, center: Vec2, limit: f32) -> bool {
    (pos - center).length_squared() > limit * limit
}

/// Resolve an impact between two equal-mass bodies.
///
/// The bodies are pushed apart along the contact normal by half the
/// penetration each, then the velocity components along the normal are
/// exchanged if the bodies are approaching. Returns the approach speed along
/// the normal before the exchange (zero when already separating).
pub fn resolve_elastic_collision(
    pos_a: &mut Vec2,
    vel_a: &mut Vec2,
    pos_b: &mut Vec2,
    vel_b: &mut Vec2,
    contact: &Contact,
) -> f32 {
    let n = contact.normal;
    let half = (contact.penetration + SEPARATION_SLOP) * 0.5;
    *pos_a -= n * half;
    *pos_b += n * half;

    let approach = (*vel_a - *vel_b).dot(n);
    if approach <= 0.0 {
        return 0.0;
    }
    *vel_a -= n * approach;
    *vel_b += n * approach;
    approach
}
