//! Территории враждебных агентов (disc / ring)
//!
//! Территория назначается внешним генератором один раз при спавне.
//! После назначения можно только увеличить внешний радиус.
//!
//! Геометрия containment: в `enforcer`, её используют CombatAI и Wanderer.

use bevy::prelude::*;
use thiserror::Error;

pub mod enforcer;


pub use enforcer::*;

/// Ошибки API назначения территории
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TerritoryError {
    #[error("territory already assigned")]
    AlreadyAssigned,
    #[error("no territory assigned")]
    NotAssigned,
    #[error("invalid radii: inner {inner:?}, outer {outer}")]
    InvalidRadii { inner: Option<f32>, outer: f32 },
    #[error("outer radius can only grow ({current} -> {requested})")]
    RadiusShrink { current: f32, requested: f32 },
}

/// Территория: круг (disc) или кольцо (ring, с исключённым центральным диском)
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Territory {
    pub center: Vec3,
    pub outer_radius: f32,
    /// Some: кольцо, центральный диск этого радиуса исключён
    pub inner_radius: Option<f32>,
}

impl Territory {
    pub fn disc(center: Vec3, outer_radius: f32) -> Result<Self, TerritoryError> {
        Self::new(center, outer_radius, None)
    }

    pub fn ring(center: Vec3, inner_radius: f32, outer_radius: f32) -> Result<Self, TerritoryError> {
        Self::new(center, outer_radius, Some(inner_radius))
    }

    pub fn new(center: Vec3, outer_radius: f32, inner_radius: Option<f32>) -> Result<Self, TerritoryError> {
        let valid_outer = outer_radius.is_finite() && outer_radius > 0.0;
        let valid_inner = inner_radius.map_or(true, |inner| inner.is_finite() && inner >= 0.0 && inner < outer_radius);

        if !valid_outer || !valid_inner {
            return Err(TerritoryError::InvalidRadii { inner: inner_radius, outer: outer_radius });
        }

        Ok(Self { center, outer_radius, inner_radius })
    }

    pub fn is_ring(&self) -> bool {
        self.inner_radius.is_some_and(|inner| inner > 0.0)
    }

    pub fn inner(&self) -> f32 {
        self.inner_radius.unwrap_or(0.0)
    }
}

/// Component: территория, к которой привязан враждебный агент (0 или 1)
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct TerritoryBinding {
    territory: Option<Territory>,
}

impl TerritoryBinding {
    pub fn bound(territory: Territory) -> Self {
        Self { territory: Some(territory) }
    }

    pub fn get(&self) -> Option<&Territory> {
        self.territory.as_ref()
    }

    /// Назначить территорию (только один раз)
    pub fn assign(&mut self, territory: Territory) -> Result<(), TerritoryError> {
        if self.territory.is_some() {
            return Err(TerritoryError::AlreadyAssigned);
        }
        self.territory = Some(territory);
        Ok(())
    }

    /// Явное переназначение: разрешён только рост внешнего радиуса
    pub fn grow_outer_radius(&mut self, new_outer: f32) -> Result<(), TerritoryError> {
        let Some(territory) = self.territory.as_mut() else {
            return Err(TerritoryError::NotAssigned);
        };

        if !new_outer.is_finite() || new_outer < territory.outer_radius {
            return Err(TerritoryError::RadiusShrink {
                current: territory.outer_radius,
                requested: new_outer,
            });
        }

        territory.outer_radius = new_outer;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_only_once() {
        let mut binding = TerritoryBinding::default();
        let territory = Territory::disc(Vec3::ZERO, 10.0).unwrap();

        assert!(binding.assign(territory).is_ok());
        assert_eq!(binding.assign(territory), Err(TerritoryError::AlreadyAssigned));
    }

    #[test]
    fn test_radius_can_only_grow() {
        let mut binding = TerritoryBinding::bound(Territory::disc(Vec3::ZERO, 10.0).unwrap());

        assert!(binding.grow_outer_radius(12.0).is_ok());
        assert_eq!(binding.get().unwrap().outer_radius, 12.0);
        assert!(matches!(binding.grow_outer_radius(8.0), Err(TerritoryError::RadiusShrink { .. })));
    }

    #[test]
    fn test_grow_without_territory() {
        let mut binding = TerritoryBinding::default();
        assert_eq!(binding.grow_outer_radius(5.0), Err(TerritoryError::NotAssigned));
    }

    #[test]
    fn test_invalid_ring_rejected() {
        assert!(Territory::ring(Vec3::ZERO, 12.0, 10.0).is_err());
        assert!(Territory::disc(Vec3::ZERO, 0.0).is_err());
        assert!(Territory::ring(Vec3::ZERO, 4.0, 10.0).unwrap().is_ring());
    }
}
