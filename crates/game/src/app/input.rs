use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    DarkenAmbient,
    BrightenAmbient,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn with_down(mut self, action: InputAction) -> Self {
        self.set(action, true);
        self
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::DarkenAmbient => 4,
            InputAction::BrightenAmbient => 5,
        }
    }
}

/// Edge-triggered toggles collected between frames.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    pub(crate) quit_requested: bool,
    actions: ActionStates,
    lighting_toggle_is_down: bool,
    lighting_toggle_pressed_edge: bool,
}

impl InputCollector {
    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        match key_event.physical_key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.actions.set(InputAction::MoveUp, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.actions.set(InputAction::MoveDown, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.actions.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.actions.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::BracketLeft) => {
                self.actions.set(InputAction::BrightenAmbient, is_pressed);
            }
            PhysicalKey::Code(KeyCode::BracketRight) => {
                self.actions.set(InputAction::DarkenAmbient, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyL) => match key_event.state {
                ElementState::Pressed => {
                    if !self.lighting_toggle_is_down {
                        self.lighting_toggle_pressed_edge = true;
                    }
                    self.lighting_toggle_is_down = true;
                }
                ElementState::Released => self.lighting_toggle_is_down = false,
            },
            PhysicalKey::Code(KeyCode::Escape) if is_pressed => {
                self.quit_requested = true;
            }
            _ => {}
        }
    }

    pub(crate) fn actions(&self) -> ActionStates {
        self.actions
    }

    pub(crate) fn take_lighting_toggle_pressed(&mut self) -> bool {
        let was_pressed = self.lighting_toggle_pressed_edge;
        self.lighting_toggle_pressed_edge = false;
        was_pressed
    }
}
