//! Actuation layer: MotionIntent → Transform
//!
//! Контроллеры (wandering, combat, ally) только вычисляют намерение движения
//! и пишут MotionIntent. Единственная система apply_motion_intents применяет
//! его к Transform/Velocity: ядро никогда не читает позицию, изменённую
//! посреди вычислений.

use bevy::prelude::*;

use crate::combat::Dead;
use crate::components::{flatten, heading_rotation, GroundHeight, MovementSpeed, Velocity};

/// Как агент должен поворачиваться в этом тике
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum RotationIntent {
    /// Не трогать rotation
    #[default]
    Keep,
    /// Поворот к горизонтальному направлению со скоростью rate (рад/сек)
    Toward { direction: Vec3, rate: f32 },
    /// Выставить rotation напрямую (slerp в Turning, pinned pose)
    Set(Quat),
}

/// Намерение движения на текущий тик (пишут контроллеры, читает actuator)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MotionIntent {
    pub rotation: RotationIntent,
    /// Горизонтальное направление движения (ZERO: стоим)
    pub direction: Vec3,
    /// Доля от MovementSpeed.max_speed (catch-up может быть > 1.0)
    pub speed_fraction: f32,
    /// Прямое перемещение (safety net snap, pinned pose)
    pub snap_to: Option<Vec3>,
    /// Поза зафиксирована: движение и внешние толчки подавляются
    pub pinned: bool,
}

impl Default for MotionIntent {
    fn default() -> Self {
        Self::stop()
    }
}

impl MotionIntent {
    pub fn stop() -> Self {
        Self {
            rotation: RotationIntent::Keep,
            direction: Vec3::ZERO,
            speed_fraction: 0.0,
            snap_to: None,
            pinned: false,
        }
    }

    /// Двигаться и поворачиваться в сторону direction
    pub fn travel(direction: Vec3, speed_fraction: f32, turn_rate: f32) -> Self {
        let direction = flatten(direction).normalize_or_zero();
        Self {
            rotation: RotationIntent::Toward { direction, rate: turn_rate },
            direction,
            speed_fraction: speed_fraction.max(0.0),
            ..Self::stop()
        }
    }

    /// Стоять, но поворачиваться к direction
    pub fn face(direction: Vec3, turn_rate: f32) -> Self {
        Self {
            rotation: RotationIntent::Toward { direction: flatten(direction).normalize_or_zero(), rate: turn_rate },
            ..Self::stop()
        }
    }

    /// Стоять с заданной rotation
    pub fn oriented(rotation: Quat) -> Self {
        Self {
            rotation: RotationIntent::Set(rotation),
            ..Self::stop()
        }
    }

    /// Зафиксировать позу целиком (kill freeze)
    pub fn pinned_at(position: Vec3, rotation: Quat) -> Self {
        Self {
            rotation: RotationIntent::Set(rotation),
            snap_to: Some(position),
            pinned: true,
            ..Self::stop()
        }
    }

    pub fn with_snap(mut self, position: Vec3) -> Self {
        self.snap_to = Some(position);
        self
    }

    pub fn is_moving(&self) -> bool {
        !self.pinned && self.speed_fraction > 0.0 && self.direction.length_squared() > 1e-6
    }
}

/// Сигналы для анимационного слоя (внешний AnimationSink)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationCueKind {
    Walking(bool),
    Idle,
}

/// Событие: сменилось анимационное состояние агента
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AnimationCue {
    pub entity: Entity,
    pub kind: AnimationCueKind,
}

/// Последнее отправленное анимационное состояние (для дедупликации)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct AnimationState {
    pub walking: bool,
}

/// Поворот from → to не более чем на max_angle
pub fn rotate_toward(from: Quat, to: Quat, max_angle: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_angle || angle <= f32::EPSILON {
        return to;
    }
    from.slerp(to, (max_angle / angle).clamp(0.0, 1.0))
}

/// Система: применение MotionIntent (единственная точка записи Transform контроллерами)
///
/// Порядок: snap → rotation → translation → клампинг высоты → velocity → animation cue.
pub fn apply_motion_intents(
    mut agents: Query<
        (
            Entity,
            &MotionIntent,
            &MovementSpeed,
            Option<&GroundHeight>,
            &mut Transform,
            &mut Velocity,
            &mut AnimationState,
        ),
        Without<Dead>,
    >,
    mut cues: EventWriter<AnimationCue>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, intent, speed, ground, mut transform, mut velocity, mut animation) in agents.iter_mut() {
        if let Some(position) = intent.snap_to {
            transform.translation = position;
        }

        match intent.rotation {
            RotationIntent::Keep => {}
            RotationIntent::Toward { direction, rate } => {
                if direction.length_squared() > 1e-6 {
                    let target = heading_rotation(direction);
                    transform.rotation = rotate_toward(transform.rotation, target, rate * delta);
                }
            }
            RotationIntent::Set(rotation) => {
                transform.rotation = rotation;
            }
        }

        let step = if intent.is_moving() && delta > 0.0 {
            intent.direction.normalize_or_zero() * speed.max_speed * intent.speed_fraction * delta
        } else {
            Vec3::ZERO
        };
        transform.translation += step;

        if let Some(ground) = ground {
            transform.translation.y = ground.0;
        }

        velocity.0 = if delta > 0.0 { step / delta } else { Vec3::ZERO };

        let walking = velocity.0.length_squared() > 1e-6;
        if walking != animation.walking {
            animation.walking = walking;
            let kind = if walking {
                AnimationCueKind::Walking(true)
            } else if intent.pinned {
                AnimationCueKind::Walking(false)
            } else {
                AnimationCueKind::Idle
            };
            cues.write(AnimationCue { entity, kind });
        }
    }
}
