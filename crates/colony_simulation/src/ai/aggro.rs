//! AggroMemory: кто нас ударил и как долго помним

use bevy::prelude::*;

/// Память агрессии (per hostile)
///
/// Инвариант: `has_been_attacked == false` ⇒ `target == None`.
/// Активна на интервале `[last_damage_time, last_damage_time + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct AggroMemory {
    target: Option<Entity>,
    has_been_attacked: bool,
    /// Секунды симуляционного времени
    last_damage_time: f64,
}

impl AggroMemory {
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn has_been_attacked(&self) -> bool {
        self.has_been_attacked
    }

    pub fn last_damage_time(&self) -> f64 {
        self.last_damage_time
    }

    /// Получили урон от aggressor в момент now (перезапускает окно памяти)
    pub fn record_damage(&mut self, aggressor: Entity, now: f64) {
        self.target = Some(aggressor);
        self.has_been_attacked = true;
        self.last_damage_time = now;
    }

    /// Активна ли память в момент now
    pub fn is_active(&self, now: f64, duration: f32) -> bool {
        self.has_been_attacked && now - self.last_damage_time < duration as f64
    }

    /// Сбросить память если окно истекло; true если только что истекла
    pub fn expire(&mut self, now: f64, duration: f32) -> bool {
        if self.has_been_attacked && !self.is_active(now, duration) {
            self.clear();
            return true;
        }
        false
    }

    /// Забыть агрессора (target сбрасывается вместе с флагом)
    pub fn clear(&mut self) {
        self.target = None;
        self.has_been_attacked = false;
    }

    /// Забыть конкретного агрессора (например, он погиб)
    pub fn forget(&mut self, entity: Entity) {
        if self.target == Some(entity) {
            self.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggro_window() {
        let aggressor = Entity::from_raw(7);
        let mut aggro = AggroMemory::default();
        assert!(!aggro.is_active(0.0, 5.0));

        aggro.record_damage(aggressor, 10.0);
        assert!(aggro.is_active(10.0, 5.0));
        assert!(aggro.is_active(14.99, 5.0));
        // Граница исключена: now - T >= D → неактивна
        assert!(!aggro.is_active(15.0, 5.0));
    }

    #[test]
    fn test_expire_clears_target() {
        let aggressor = Entity::from_raw(3);
        let mut aggro = AggroMemory::default();
        aggro.record_damage(aggressor, 1.0);

        assert!(!aggro.expire(3.0, 5.0));
        assert_eq!(aggro.target(), Some(aggressor));

        assert!(aggro.expire(6.0, 5.0));
        assert!(!aggro.has_been_attacked());
        assert_eq!(aggro.target(), None);

        // Повторный expire: уже нечего сбрасывать
        assert!(!aggro.expire(7.0, 5.0));
    }

    #[test]
    fn test_new_damage_restarts_window() {
        let first = Entity::from_raw(1);
        let second = Entity::from_raw(2);
        let mut aggro = AggroMemory::default();

        aggro.record_damage(first, 0.0);
        aggro.record_damage(second, 4.0);

        assert!(aggro.is_active(8.0, 5.0));
        assert_eq!(aggro.target(), Some(second));
    }

    #[test]
    fn test_forget_only_matching_target() {
        let aggressor = Entity::from_raw(5);
        let mut aggro = AggroMemory::default();
        aggro.record_damage(aggressor, 0.0);

        aggro.forget(Entity::from_raw(6));
        assert!(aggro.has_been_attacked());

        aggro.forget(aggressor);
        assert!(!aggro.has_been_attacked());
        assert_eq!(aggro.target(), None);
    }
}
