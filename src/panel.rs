//! Simulated front panel.
//!
//! Owns the volume knob (a rotary encoder with push-to-mute) and the power button,
//! turns queued user gestures into pin transitions, and translates the debounced events
//! into the command tokens the amplifier understands.

use crate::config::PanelConfig;
use crate::input::{ButtonDebounce, Level, RotaryEncoder, Rotation};
use std::collections::VecDeque;

/// A discrete action on the front panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    TurnClockwise,
    TurnCounterClockwise,
    PushKnob,
    PressPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pin {
    EncoderA,
    EncoderB,
    Knob,
    Power,
}

#[derive(Debug, Clone, Copy)]
struct PinLevels {
    encoder_a: Level,
    encoder_b: Level,
    knob: Level,
    power: Level,
}

impl PinLevels {
    fn idle() -> Self {
        Self {
            encoder_a: Level::High,
            encoder_b: Level::High,
            knob: Level::High,
            power: Level::High,
        }
    }

    fn set(&mut self, pin: Pin, level: Level) {
        match pin {
            Pin::EncoderA => self.encoder_a = level,
            Pin::EncoderB => self.encoder_b = level,
            Pin::Knob => self.knob = level,
            Pin::Power => self.power = level,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrontPanel {
    encoder: RotaryEncoder,
    power_button: ButtonDebounce,
    levels: PinLevels,
    // Gestures waiting for the previous one to finish.
    queue: VecDeque<Gesture>,
    // Pins held low by the gesture in progress.
    held: Vec<Pin>,
    release_ms: Option<u64>,
    // Released pins have not been sampled yet.
    settling: bool,
    // Earliest time the next gesture may start.
    ready_ms: u64,
    hold_ms: u64,
}

impl FrontPanel {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            encoder: RotaryEncoder::new(Level::High, Level::High, config.encoder_debounce_ms),
            power_button: ButtonDebounce::new(Level::High, config.button_debounce_ms),
            levels: PinLevels::idle(),
            queue: VecDeque::new(),
            held: Vec::new(),
            release_ms: None,
            settling: false,
            ready_ms: 0,
            hold_ms: config.hold_ms,
        }
    }

    /// Queues a gesture.
    ///
    /// Gestures run one at a time: the pins go low for the hold time, the release is
    /// sampled, and the pins then stay idle for another hold time so every edge
    /// clears the debounce windows.
    pub fn gesture(&mut self, gesture: Gesture) {
        self.queue.push_back(gesture);
    }

    /// Gestures not yet started.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn start(&mut self, gesture: Gesture, now_ms: u64) {
        match gesture {
            Gesture::TurnClockwise => {
                self.levels.set(Pin::EncoderB, Level::High);
                self.hold(Pin::EncoderA);
            }
            Gesture::TurnCounterClockwise => {
                self.hold(Pin::EncoderB);
                self.hold(Pin::EncoderA);
            }
            Gesture::PushKnob => self.hold(Pin::Knob),
            Gesture::PressPower => self.hold(Pin::Power),
        }
        self.release_ms = Some(now_ms + self.hold_ms);
    }

    fn hold(&mut self, pin: Pin) {
        self.levels.set(pin, Level::Low);
        self.held.push(pin);
    }

    /// Runs one control-loop iteration and returns the commands it produced.
    ///
    /// A queued gesture starts before the adapters sample, so its press is seen in
    /// the same iteration. Due releases are applied after sampling and are seen on
    /// the next iteration.
    pub fn poll(&mut self, now_ms: u64) -> Vec<&'static str> {
        if self.release_ms.is_none() && !self.settling && now_ms >= self.ready_ms {
            if let Some(gesture) = self.queue.pop_front() {
                self.start(gesture, now_ms);
            }
        }

        let levels = self.levels;
        self.encoder
            .update(levels.encoder_a, levels.encoder_b, levels.knob, now_ms);
        self.power_button.update(levels.power, now_ms);

        let mut commands = Vec::new();
        match self.encoder.direction() {
            Rotation::Clockwise => commands.push("vol_up"),
            Rotation::CounterClockwise => commands.push("vol_dwn"),
            Rotation::Idle => {}
        }
        if self.encoder.is_button_pressed() {
            commands.push("mute");
        }
        if self.power_button.is_pressed() {
            commands.push("power_toggle");
        }

        if self.settling {
            self.settling = false;
            self.ready_ms = now_ms + self.hold_ms;
        }
        if matches!(self.release_ms, Some(due_ms) if due_ms <= now_ms) {
            for pin in self.held.drain(..) {
                self.levels.set(pin, Level::High);
            }
            self.release_ms = None;
            self.settling = true;
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Simulator, UpdateMode};

    fn panel() -> FrontPanel {
        FrontPanel::new(&PanelConfig::default())
    }

    // Polls every 10 ms over [from, to) and collects all commands.
    fn run(panel: &mut FrontPanel, from: u64, to: u64) -> Vec<&'static str> {
        (from..to).step_by(10).flat_map(|now| panel.poll(now)).collect()
    }

    #[test]
    fn idle_panel_is_silent() {
        let mut panel = panel();
        assert!(run(&mut panel, 0, 500).is_empty());
    }

    #[test]
    fn knob_turns_map_to_volume_steps() {
        let mut panel = panel();
        panel.gesture(Gesture::TurnClockwise);
        assert_eq!(run(&mut panel, 1000, 1200), ["vol_up"]);

        panel.gesture(Gesture::TurnCounterClockwise);
        assert_eq!(run(&mut panel, 1200, 1400), ["vol_dwn"]);
    }

    #[test]
    fn buttons_map_to_mute_and_power() {
        let mut panel = panel();
        panel.gesture(Gesture::PushKnob);
        assert_eq!(run(&mut panel, 1000, 1200), ["mute"]);

        panel.gesture(Gesture::PressPower);
        assert_eq!(run(&mut panel, 1200, 1400), ["power_toggle"]);
    }

    #[test]
    fn each_gesture_is_reported_once() {
        let mut panel = panel();
        for (i, start) in (1000..2000).step_by(200).enumerate() {
            panel.gesture(Gesture::PressPower);
            assert_eq!(run(&mut panel, start, start + 200), ["power_toggle"], "press {i}");
        }
    }

    #[test]
    fn turns_closer_than_hold_time_are_all_reported() {
        let mut panel = panel();
        panel.gesture(Gesture::TurnClockwise);
        let mut commands = run(&mut panel, 1000, 1030);
        panel.gesture(Gesture::TurnClockwise);
        commands.extend(run(&mut panel, 1030, 1400));
        assert_eq!(commands, ["vol_up", "vol_up"]);
    }

    #[test]
    fn rapid_power_presses_are_queued() {
        let mut panel = panel();
        let mut commands = Vec::new();
        for i in 0..6 {
            let start = 1000 + 66 * i;
            panel.gesture(Gesture::PressPower);
            commands.extend(run(&mut panel, start, start + 66));
        }
        commands.extend(run(&mut panel, 1396, 2400));
        assert_eq!(commands, ["power_toggle"; 6]);
        assert_eq!(panel.pending(), 0);
    }

    #[test]
    fn mixed_gestures_keep_their_order() {
        let mut panel = panel();
        panel.gesture(Gesture::TurnCounterClockwise);
        panel.gesture(Gesture::PushKnob);
        panel.gesture(Gesture::TurnClockwise);
        assert_eq!(run(&mut panel, 1000, 1600), ["vol_dwn", "mute", "vol_up"]);
    }

    #[test]
    fn panel_drives_the_simulator() {
        let mut panel = panel();
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);

        panel.gesture(Gesture::TurnClockwise);
        let responses: Vec<String> = run(&mut panel, 1000, 1200)
            .into_iter()
            .filter_map(|command| sim.process_command(command))
            .collect();

        assert_eq!(responses, ["volume=46$"]);
        assert_eq!(sim.state().volume(), 46);
    }
}
