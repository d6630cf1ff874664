use nalgebra::Vector3;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Rigid-body mass properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BodyProperties {
    pub name: String,
    pub mass: f64,                 // kg
    pub inertia: Vector3<f64>,     // [Ixx, Iyy, Izz] principal moments, kg·m^2
    pub linear_damping: f64,       // 1/s, velocity-proportional drag
    pub angular_damping: f64,      // 1/s
}

impl BodyProperties {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(ConfigError::InvalidMass(self.mass));
        }
        if self.inertia.iter().any(|i| !(*i > 0.0 && i.is_finite())) {
            return Err(ConfigError::InvalidMass(self.inertia.min()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Body builder
// ---------------------------------------------------------------------------

pub struct BodyBuilder {
    name: String,
    mass: f64,
    inertia: Vector3<f64>,
    linear_damping: f64,
    angular_damping: f64,
}

impl BodyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mass: 1.0,
            inertia: Vector3::new(0.01, 0.01, 0.01),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    pub fn mass(mut self, v: f64) -> Self { self.mass = v; self }
    pub fn inertia(mut self, v: Vector3<f64>) -> Self { self.inertia = v; self }
    pub fn linear_damping(mut self, v: f64) -> Self { self.linear_damping = v; self }
    pub fn angular_damping(mut self, v: f64) -> Self { self.angular_damping = v; self }

    pub fn build(self) -> BodyProperties {
        BodyProperties {
            name: self.name,
            mass: self.mass,
            inertia: self.inertia,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_are_valid() {
        let b = BodyBuilder::new("hand").build();
        assert!(b.validate().is_ok());
        assert_eq!(b.name, "hand");
    }

    #[test]
    fn zero_mass_rejected() {
        let b = BodyBuilder::new("ghost").mass(0.0).build();
        assert_eq!(b.validate(), Err(ConfigError::InvalidMass(0.0)));
    }
}
