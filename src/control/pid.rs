use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

use nalgebra::Vector3;

use crate::config::PidGains;
use crate::error::{ConfigError, ControlError};

// ---------------------------------------------------------------------------
// Error signals a PID can run on
// ---------------------------------------------------------------------------

/// Scalar or vector quantity fed through a [`Pid`]. Clamping is per component.
pub trait Signal:
    Copy
    + Debug
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    fn zero() -> Self;
    fn clamp_each(self, min: f64, max: f64) -> Self;
    fn all_finite(&self) -> bool;
    fn magnitude(&self) -> f64;
}

impl Signal for f64 {
    fn zero() -> Self {
        0.0
    }

    fn clamp_each(self, min: f64, max: f64) -> Self {
        self.clamp(min, max)
    }

    fn all_finite(&self) -> bool {
        self.is_finite()
    }

    fn magnitude(&self) -> f64 {
        self.abs()
    }
}

impl Signal for Vector3<f64> {
    fn zero() -> Self {
        Vector3::zeros()
    }

    fn clamp_each(self, min: f64, max: f64) -> Self {
        self.map(|c| c.clamp(min, max))
    }

    fn all_finite(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }
}

// ---------------------------------------------------------------------------
// PID controller
// ---------------------------------------------------------------------------

/// `output = Kp*e + Ki*∫e dt + Kd*de/dt`, clamped to the configured bounds.
///
/// The accumulator advances exactly once per accepted `update`. A
/// non-positive `dt` is rejected: state is left untouched and the previous
/// output is returned.
#[derive(Debug, Clone)]
pub struct Pid<T: Signal> {
    gains: PidGains,
    integral: T,
    prev_error: T,
    last_output: T,
}

pub type ScalarPid = Pid<f64>;
pub type VectorPid = Pid<Vector3<f64>>;

impl<T: Signal> Pid<T> {
    pub fn new(gains: PidGains) -> Result<Self, ConfigError> {
        gains.validate()?;
        Ok(Self {
            gains,
            integral: T::zero(),
            prev_error: T::zero(),
            last_output: T::zero(),
        })
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Swap in new gains. With `clear_errors` the accumulated state is dropped.
    pub fn retune(&mut self, gains: PidGains, clear_errors: bool) -> Result<(), ConfigError> {
        gains.validate()?;
        self.gains = gains;
        if clear_errors {
            self.reset();
        }
        Ok(())
    }

    pub fn try_update(&mut self, error: T, dt: f64) -> Result<T, ControlError> {
        if !(dt > 0.0) {
            return Err(ControlError::InvalidTimestep(dt));
        }
        if !error.all_finite() {
            return Err(ControlError::NonFinite);
        }

        let mut integral = self.integral + error * dt;
        if let Some(limit) = self.gains.integral_limit {
            integral = integral.clamp_each(-limit, limit);
        }
        let derivative = (error - self.prev_error) / dt;

        let raw = error * self.gains.kp + integral * self.gains.ki + derivative * self.gains.kd;
        if !raw.all_finite() {
            return Err(ControlError::NonFinite);
        }

        let output = raw.clamp_each(self.gains.output_min, self.gains.output_max);
        self.integral = integral;
        self.prev_error = error;
        self.last_output = output;
        Ok(output)
    }

    /// Like [`try_update`](Self::try_update) but never fails: a rejected
    /// timestep returns the previous output, a non-finite signal returns
    /// [`rest_output`](Self::rest_output).
    pub fn update(&mut self, error: T, dt: f64) -> T {
        match self.try_update(error, dt) {
            Ok(out) => out,
            Err(ControlError::InvalidTimestep(dt)) => {
                tracing::warn!(dt, "PID rejected non-positive timestep, holding previous output");
                self.last_output
            }
            Err(ControlError::NonFinite) => {
                tracing::warn!(?error, "PID saw a non-finite signal, resting output");
                self.rest_output()
            }
        }
    }

    /// Zero, or the nearest bound when zero lies outside the bounds.
    pub fn rest_output(&self) -> T {
        T::zero().clamp_each(self.gains.output_min, self.gains.output_max)
    }

    pub fn reset(&mut self) {
        self.integral = T::zero();
        self.prev_error = T::zero();
        self.last_output = T::zero();
    }

    /// Forget the previous error only; the integral keeps holding its load.
    pub fn reset_derivative(&mut self) {
        self.prev_error = T::zero();
    }

    pub fn integral(&self) -> T {
        self.integral
    }

    pub fn previous_error(&self) -> T {
        self.prev_error
    }

    pub fn last_output(&self) -> T {
        self.last_output
    }
}
