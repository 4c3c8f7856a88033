//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Return the sign of a value as `1`, `-1` or `0`.
///
/// Unlike `Float::signum` zero (of either sign) maps to zero, so a zero error
/// produces no correction.
pub fn sign<T>(value: T) -> T
where
    T: Float
{
    if value > T::zero() {
        T::one()
    }
    else if value < T::zero() {
        -T::one()
    }
    else {
        T::zero()
    }
}

/// Squared euclidian distance between two points in the plane.
pub fn dist_sq<T>(x_0: T, y_0: T, x_1: T, y_1: T) -> T
where
    T: Float
{
    (x_0 - x_1).powi(2) + (y_0 - y_1).powi(2)
}

/// Euclidian distance between two points in the plane.
pub fn dist<T>(x_0: T, y_0: T, x_1: T, y_1: T) -> T
where
    T: Float
{
    dist_sq(x_0, y_0, x_1, y_1).sqrt()
}

/// Clamp a value between `min` and `max` (inclusive).
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let mut ret = value;

    if ret >= max {
        ret = max
    }
    if ret <= min {
        ret = min
    }

    ret
}

/// Remainder of `lhs / rhs` using a floored quotient.
///
/// The result carries the sign of `rhs`, so `floor_mod(x, 2pi)` lies in
/// `[0, 2pi)` and `floor_mod(x, -2pi)` in `(-2pi, 0]`.
pub fn floor_mod<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    lhs - (lhs / rhs).floor() * rhs
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()` if `lhs` is much smaller than `rhs.abs()` in
/// magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the range `[-pi, pi)`.
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // Round-off in rem_euclid can land exactly on the open end of the range
    if wrapped >= pi_t {
        wrapped - tau_t
    }
    else {
        wrapped
    }
}

/// Limit an angular difference to `(-pi, pi]`.
///
/// Differences at or beyond `pi` are folded with a floored modulo against
/// `-2pi`, then differences at or below `-pi` against `2pi`. The two checks
/// are applied in sequence, so an input of exactly `pi` comes back as `pi`.
pub fn limit_ang_diff<T>(diff: T) -> T
where
    T: Float
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let mut limited = diff;

    if limited >= pi_t {
        limited = floor_mod(limited, -tau_t);
    }
    if limited <= -pi_t {
        limited = floor_mod(limited, tau_t);
    }

    limited
}
