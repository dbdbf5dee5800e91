//! Common gameplay components shared by the simulation types.

/// Health pool for damageable actors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Subtract `amount`, clamping at zero.
    pub fn take_damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    /// Refill to maximum.
    pub fn restore(&mut self) {
        self.current = self.max;
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// AI state for enemies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AIState {
    #[default]
    Idle,
    Attacking,
    Dead,
}

/// Component storing AI behavior state.
#[derive(Debug, Clone, Copy, Default)]
pub struct AIComponent {
    pub state: AIState,
    pub attack_range: f32,
    pub attack_cooldown: f32,
    pub current_cooldown: f32,
}

impl AIComponent {
    pub fn new(attack_range: f32, attack_cooldown: f32) -> Self {
        Self {
            state: AIState::Idle,
            attack_range,
            attack_cooldown,
            current_cooldown: attack_cooldown,
        }
    }

    pub fn can_attack(&self) -> bool {
        self.state != AIState::Dead && self.current_cooldown <= 0.0
    }

    pub fn trigger_attack(&mut self) {
        self.current_cooldown = self.attack_cooldown;
    }

    pub fn update_cooldown(&mut self, dt: f32) {
        self.current_cooldown = (self.current_cooldown - dt).max(0.0);
    }
}
