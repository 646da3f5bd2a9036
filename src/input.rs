use glam::Vec3;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Actions a key can be bound to. Modifier keys (shift/ctrl/alt) are not
/// bindable; they arrive with each tick and feed the edge triggers instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    InsertKeyframe,
    HoldAim,
}

impl InputAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "move_forward" => Some(Self::MoveForward),
            "move_backward" => Some(Self::MoveBackward),
            "move_left" => Some(Self::MoveLeft),
            "move_right" => Some(Self::MoveRight),
            "move_up" => Some(Self::MoveUp),
            "move_down" => Some(Self::MoveDown),
            "insert_keyframe" => Some(Self::InsertKeyframe),
            "hold_aim" => Some(Self::HoldAim),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputBindings {
    key_to_actions: HashMap<String, Vec<InputAction>>,
}

impl InputBindings {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<InputConfigFile>(&contents) {
                Ok(config) => Self::with_overrides(config.into_overrides(&path.display().to_string())),
                Err(err) => {
                    tracing::warn!(
                        "Failed to parse {}: {err}. Falling back to default bindings.",
                        path.display()
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "Failed to read {}: {err}. Falling back to default bindings.",
                    path.display()
                );
                Self::default()
            }
        }
    }

    fn with_overrides(overrides: HashMap<InputAction, Vec<String>>) -> Self {
        let mut action_map = Self::default_action_map();
        for (action, keys) in overrides {
            if keys.is_empty() {
                continue;
            }
            action_map.insert(action, keys);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<InputAction, Vec<String>> {
        use InputAction::*;
        let mut map = HashMap::new();
        map.insert(MoveForward, vec!["w".to_string()]);
        map.insert(MoveBackward, vec!["s".to_string()]);
        map.insert(MoveLeft, vec!["a".to_string()]);
        map.insert(MoveRight, vec!["d".to_string()]);
        map.insert(MoveUp, vec!["e".to_string()]);
        map.insert(MoveDown, vec!["q".to_string()]);
        map.insert(InsertKeyframe, vec!["i".to_string()]);
        map.insert(HoldAim, vec!["y".to_string(), "c".to_string()]);
        map
    }

    fn from_action_map(action_map: HashMap<InputAction, Vec<String>>) -> Self {
        let mut key_to_actions: HashMap<String, Vec<InputAction>> = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_actions.entry(key.to_lowercase()).or_default().push(action);
            }
        }
        Self { key_to_actions }
    }

    fn actions_for_key(&self, key: &str) -> impl Iterator<Item = InputAction> + '_ {
        self.key_to_actions.get(key).into_iter().flatten().copied()
    }
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Deserialize)]
struct InputConfigFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl InputConfigFile {
    fn into_overrides(self, origin: &str) -> HashMap<InputAction, Vec<String>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let Some(action) = InputAction::from_str(action_name.trim().to_lowercase().as_str()) else {
                tracing::warn!("{origin}: unknown action '{action_name}', ignoring.");
                continue;
            };
            let parsed: Vec<String> = keys
                .into_iter()
                .filter_map(|key| {
                    let normalized = key.trim().to_lowercase();
                    if normalized.is_empty() {
                        tracing::warn!("{origin}: empty key for action '{action_name}', ignoring.");
                        None
                    } else {
                        Some(normalized)
                    }
                })
                .collect();
            if parsed.is_empty() {
                tracing::warn!("{origin}: action '{action_name}' has no valid keys, keeping defaults.");
                continue;
            }
            overrides.insert(action, parsed);
        }
        overrides
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TriggerState {
    #[default]
    Idle,
    Held,
}

/// Rising-edge one-shot for a modifier key: fires once when the modifier goes
/// down and re-arms only after a tick where it is observed released.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeTrigger {
    state: TriggerState,
}

impl EdgeTrigger {
    pub fn observe(&mut self, active: bool) -> bool {
        match (self.state, active) {
            (TriggerState::Idle, true) => {
                self.state = TriggerState::Held;
                true
            }
            (TriggerState::Held, true) => false,
            (_, false) => {
                self.state = TriggerState::Idle;
                false
            }
        }
    }
}

/// One-shot outcomes of observing the modifier keys on a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModifierTriggers {
    pub speed_multiplier: Option<f32>,
    pub mode_toggled: bool,
}

/// Per-session accumulated input: which movement keys are down, modifier
/// debounce state, and the last observed mouse position.
#[derive(Debug)]
pub struct InputState {
    bindings: InputBindings,
    forward_held: bool,
    backward_held: bool,
    left_held: bool,
    right_held: bool,
    up_held: bool,
    down_held: bool,
    hold_aim_held: bool,
    keyframe_pressed: bool,
    speed_trigger: EdgeTrigger,
    mode_trigger: EdgeTrigger,
    last_mouse: Option<(f32, f32)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::with_bindings(InputBindings::default())
    }

    pub fn with_bindings(bindings: InputBindings) -> Self {
        Self {
            bindings,
            forward_held: false,
            backward_held: false,
            left_held: false,
            right_held: false,
            up_held: false,
            down_held: false,
            hold_aim_held: false,
            keyframe_pressed: false,
            speed_trigger: EdgeTrigger::default(),
            mode_trigger: EdgeTrigger::default(),
            last_mouse: None,
        }
    }

    pub fn on_key(&mut self, code: &str, pressed: bool) {
        let code = code.to_lowercase();
        let actions: Vec<_> = self.bindings.actions_for_key(&code).collect();
        for action in actions {
            match action {
                InputAction::MoveForward => self.forward_held = pressed,
                InputAction::MoveBackward => self.backward_held = pressed,
                InputAction::MoveLeft => self.left_held = pressed,
                InputAction::MoveRight => self.right_held = pressed,
                InputAction::MoveUp => self.up_held = pressed,
                InputAction::MoveDown => self.down_held = pressed,
                InputAction::HoldAim => self.hold_aim_held = pressed,
                InputAction::InsertKeyframe => {
                    if pressed {
                        self.keyframe_pressed = true;
                    }
                }
            }
        }
    }

    /// Sum of the held movement axes in the moving bone's local frame:
    /// forward +Y, back −Y, right +X, left −X, up +Z, down −Z. Unnormalized;
    /// opposing keys cancel to zero.
    pub fn held_direction(&self) -> Vec3 {
        let mut direction = Vec3::ZERO;
        if self.forward_held {
            direction += Vec3::Y;
        }
        if self.backward_held {
            direction -= Vec3::Y;
        }
        if self.right_held {
            direction += Vec3::X;
        }
        if self.left_held {
            direction -= Vec3::X;
        }
        if self.up_held {
            direction += Vec3::Z;
        }
        if self.down_held {
            direction -= Vec3::Z;
        }
        direction
    }

    pub fn hold_aim_held(&self) -> bool {
        self.hold_aim_held
    }

    pub fn take_keyframe_request(&mut self) -> bool {
        let pressed = self.keyframe_pressed;
        self.keyframe_pressed = false;
        pressed
    }

    /// Observes the modifier keys for one tick. Shift doubles and ctrl halves
    /// the move speed (shift wins when both are down); the two share a single
    /// trigger, so neither fires again until both are released. Alt toggles
    /// the rotation mode through its own trigger.
    pub fn on_modifier_tick(&mut self, shift: bool, ctrl: bool, alt: bool) -> ModifierTriggers {
        let speed_fired = self.speed_trigger.observe(shift || ctrl);
        let speed_multiplier = if speed_fired {
            Some(if shift { 2.0 } else { 0.5 })
        } else {
            None
        };
        let mode_toggled = self.mode_trigger.observe(alt);
        ModifierTriggers { speed_multiplier, mode_toggled }
    }

    /// Tracks the cursor and returns the delta since the previous observation.
    /// The first observation after session start yields `(0.0, 0.0)`.
    pub fn observe_mouse(&mut self, x: f32, y: f32) -> (f32, f32) {
        let delta = match self.last_mouse {
            Some((last_x, last_y)) => (x - last_x, y - last_y),
            None => (0.0, 0.0),
        };
        self.last_mouse = Some((x, y));
        delta
    }

    /// Drops all held keys, pending one-shots, and mouse history. Called when
    /// the session reaches a terminal state.
    pub fn clear(&mut self) {
        let bindings = self.bindings.clone();
        *self = Self::with_bindings(bindings);
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_direction_sums_axes() {
        let mut input = InputState::new();
        input.on_key("w", true);
        input.on_key("d", true);
        assert_eq!(input.held_direction(), Vec3::new(1.0, 1.0, 0.0));
        input.on_key("w", false);
        assert_eq!(input.held_direction(), Vec3::X);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut input = InputState::new();
        input.on_key("w", true);
        input.on_key("s", true);
        input.on_key("e", true);
        input.on_key("q", true);
        assert_eq!(input.held_direction(), Vec3::ZERO);
    }

    #[test]
    fn speed_trigger_fires_once_per_hold() {
        let mut input = InputState::new();
        for tick in 0..4 {
            let triggers = input.on_modifier_tick(true, false, false);
            if tick == 0 {
                assert_eq!(triggers.speed_multiplier, Some(2.0));
            } else {
                assert_eq!(triggers.speed_multiplier, None, "tick {tick} re-fired");
            }
        }
        assert_eq!(input.on_modifier_tick(false, false, false).speed_multiplier, None);
        assert_eq!(input.on_modifier_tick(false, true, false).speed_multiplier, Some(0.5));
    }

    #[test]
    fn ctrl_cannot_fire_while_shift_still_held() {
        let mut input = InputState::new();
        assert_eq!(input.on_modifier_tick(true, false, false).speed_multiplier, Some(2.0));
        // Swapping to ctrl without an observed release keeps the trigger armed off.
        assert_eq!(input.on_modifier_tick(false, true, false).speed_multiplier, None);
    }

    #[test]
    fn mode_toggle_is_edge_triggered() {
        let mut input = InputState::new();
        assert!(input.on_modifier_tick(false, false, true).mode_toggled);
        assert!(!input.on_modifier_tick(false, false, true).mode_toggled);
        assert!(!input.on_modifier_tick(false, false, false).mode_toggled);
        assert!(input.on_modifier_tick(false, false, true).mode_toggled);
    }

    #[test]
    fn first_mouse_observation_yields_zero_delta() {
        let mut input = InputState::new();
        assert_eq!(input.observe_mouse(120.0, 40.0), (0.0, 0.0));
        assert_eq!(input.observe_mouse(150.0, 30.0), (30.0, -10.0));
    }

    #[test]
    fn keyframe_request_is_one_shot() {
        let mut input = InputState::new();
        input.on_key("I", true);
        assert!(input.take_keyframe_request());
        assert!(!input.take_keyframe_request());
        input.on_key("i", false);
        assert!(!input.take_keyframe_request());
    }
}
