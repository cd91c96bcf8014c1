//! Front-panel input adapters.
//!
//! Both adapters are polled: the caller samples the pin levels once per control
//! loop iteration and passes them in together with a monotonic millisecond
//! clock. Events are latched until read and cleared by the read, so a single
//! physical edge is reported exactly once.

pub const DEFAULT_BUTTON_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_ENCODER_DEBOUNCE_MS: u64 = 5;

/// Logic level on an input pin. Inputs are pulled up, so idle is `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Direction reported by a [`RotaryEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    CounterClockwise = -1,
    Idle = 0,
    Clockwise = 1,
}

impl Rotation {
    /// -1, 0 or +1.
    pub fn step(self) -> i32 {
        self as i32
    }
}

/// Debounced active-low push button.
#[derive(Debug, Clone)]
pub struct ButtonDebounce {
    debounce_ms: u64,
    last_transition_ms: u64,
    last_level: Level,
    pressed: bool,
}

impl ButtonDebounce {
    /// `initial` is the level sampled when the pin is configured.
    pub fn new(initial: Level, debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            last_transition_ms: 0,
            last_level: initial,
            pressed: false,
        }
    }

    /// Samples the pin.
    ///
    /// A level change counts only if more than the debounce window has passed
    /// since the last accepted one. An accepted falling edge latches a press; an
    /// accepted rising edge drops a press nobody has read yet.
    pub fn update(&mut self, level: Level, now_ms: u64) {
        if level != self.last_level
            && now_ms.saturating_sub(self.last_transition_ms) > self.debounce_ms
        {
            self.last_transition_ms = now_ms;
            self.pressed = level == Level::Low;
        }
        self.last_level = level;
    }

    /// Returns `true` once per accepted press.
    pub fn is_pressed(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }
}

/// Quadrature rotary encoder with an integrated push switch.
#[derive(Debug, Clone)]
pub struct RotaryEncoder {
    debounce_ms: u64,
    last_transition_a_ms: u64,
    last_a: Level,
    rotation: Rotation,
    button: ButtonDebounce,
}

impl RotaryEncoder {
    /// The push switch shares the encoder's debounce window.
    pub fn new(a: Level, button: Level, debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            last_transition_a_ms: 0,
            last_a: a,
            rotation: Rotation::Idle,
            button: ButtonDebounce::new(button, debounce_ms),
        }
    }

    /// Samples channel A, channel B and the push switch.
    ///
    /// On an accepted falling edge of A the rotation is clockwise if B is high
    /// and counter-clockwise otherwise.
    pub fn update(&mut self, a: Level, b: Level, button: Level, now_ms: u64) {
        self.button.update(button, now_ms);

        if a != self.last_a && now_ms.saturating_sub(self.last_transition_a_ms) > self.debounce_ms {
            self.last_transition_a_ms = now_ms;
            if a == Level::Low {
                self.rotation = match b {
                    Level::High => Rotation::Clockwise,
                    Level::Low => Rotation::CounterClockwise,
                };
            }
        }
        self.last_a = a;
    }

    /// Returns the latched rotation and resets it to [`Rotation::Idle`].
    pub fn direction(&mut self) -> Rotation {
        std::mem::replace(&mut self.rotation, Rotation::Idle)
    }

    pub fn is_button_pressed(&mut self) -> bool {
        self.button.is_pressed()
    }
}
