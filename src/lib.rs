//! # Integrated Amplifier Simulator Library
//!
//! This library contains the core logic for simulating the RS-232 control surface
//! of an integrated stereo amplifier. It holds the bounded device state, matches
//! incoming ASCII command tokens against an ordered rule table, and answers with
//! feedback tokens in the same `key=value$` grammar the real unit uses.

pub mod config;
pub mod format;
pub mod framing;
pub mod input;
pub mod panel;

use serde::Deserialize;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::debug;

/// Accepted volume steps.
pub const VOLUME_RANGE: RangeInclusive<i32> = 0..=96;
/// Accepted bass and treble steps.
pub const TONE_RANGE: RangeInclusive<i32> = -10..=10;
/// Accepted balance steps; negative leans left, positive leans right.
pub const BALANCE_RANGE: RangeInclusive<i32> = -15..=15;
/// Accepted indices into the sample-rate label table.
pub const FREQUENCY_RANGE: RangeInclusive<i32> = 0..=7;

/// Terminator appended by hosts to every command.
pub const COMMAND_TERMINATOR: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Standby,
    On,
}

/// Whether state changes are reported spontaneously over the serial line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    Auto,
    #[default]
    Manual,
}

/// The twelve selectable inputs on the rear panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cd,
    Coax1,
    Coax2,
    Opt1,
    Opt2,
    Aux1,
    Aux2,
    Tuner,
    Phono,
    Usb,
    Bluetooth,
    PcUsb,
}

impl Source {
    pub const ALL: [Source; 12] = [
        Source::Cd,
        Source::Coax1,
        Source::Coax2,
        Source::Opt1,
        Source::Opt2,
        Source::Aux1,
        Source::Aux2,
        Source::Tuner,
        Source::Phono,
        Source::Usb,
        Source::Bluetooth,
        Source::PcUsb,
    ];
}

/// Identifies one reportable device attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Power,
    Volume,
    Mute,
    Source,
    Bypass,
    Bass,
    Treble,
    Balance,
    UpdateMode,
    Frequency,
}

/// The amplifier's attributes.
///
/// Numeric setters return `false` and leave the attribute untouched when the
/// value lies outside its range. Setters never produce output; reporting is the
/// job of [`Simulator`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    power: PowerState,
    volume: u8,
    mute: bool,
    source: Source,
    bypass: bool,
    bass: i8,
    treble: i8,
    balance: i8,
    update_mode: UpdateMode,
    frequency: u8,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            power: PowerState::On,
            volume: 45,
            mute: false,
            source: Source::PcUsb,
            bypass: true,
            bass: 0,
            treble: 0,
            balance: 0,
            update_mode: UpdateMode::Manual,
            frequency: 0,
        }
    }
}

impl DeviceState {
    pub fn power(&self) -> PowerState {
        self.power
    }

    pub fn volume(&self) -> i32 {
        self.volume as i32
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn bypass(&self) -> bool {
        self.bypass
    }

    pub fn bass(&self) -> i32 {
        self.bass as i32
    }

    pub fn treble(&self) -> i32 {
        self.treble as i32
    }

    pub fn balance(&self) -> i32 {
        self.balance as i32
    }

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// Index into [`format::FREQUENCY_LABELS`].
    pub fn frequency(&self) -> i32 {
        self.frequency as i32
    }

    pub fn set_power(&mut self, power: PowerState) -> bool {
        self.power = power;
        true
    }

    pub fn set_volume(&mut self, volume: i32) -> bool {
        if !VOLUME_RANGE.contains(&volume) {
            return false;
        }
        self.volume = volume as u8;
        true
    }

    pub fn set_mute(&mut self, mute: bool) -> bool {
        self.mute = mute;
        true
    }

    pub fn set_source(&mut self, source: Source) -> bool {
        self.source = source;
        true
    }

    pub fn set_bypass(&mut self, bypass: bool) -> bool {
        self.bypass = bypass;
        true
    }

    pub fn set_bass(&mut self, bass: i32) -> bool {
        if !TONE_RANGE.contains(&bass) {
            return false;
        }
        self.bass = bass as i8;
        true
    }

    pub fn set_treble(&mut self, treble: i32) -> bool {
        if !TONE_RANGE.contains(&treble) {
            return false;
        }
        self.treble = treble as i8;
        true
    }

    pub fn set_balance(&mut self, balance: i32) -> bool {
        if !BALANCE_RANGE.contains(&balance) {
            return false;
        }
        self.balance = balance as i8;
        true
    }

    pub fn set_update_mode(&mut self, mode: UpdateMode) -> bool {
        self.update_mode = mode;
        true
    }

    pub fn set_frequency(&mut self, index: i32) -> bool {
        if !FREQUENCY_RANGE.contains(&index) {
            return false;
        }
        self.frequency = index as u8;
        true
    }
}

/// Why a command produced no state change.
///
/// Only [`CommandError::UnknownCommand`] is visible on the wire; everything
/// else is answered with silence.
#[derive(Debug, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("malformed payload '{payload}' after '{prefix}'")]
    MalformedPayload { prefix: &'static str, payload: String },
    #[error("{attribute:?} value {value} is out of range")]
    OutOfRange { attribute: Attribute, value: i32 },
}

/// What a successfully executed command asks the simulator to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// An attribute was assigned; reported only in auto-update mode.
    Changed(Attribute),
    /// The feedback switch itself was toggled; always acknowledged.
    Acknowledged(Attribute),
    /// A `?` query; always answered.
    Report(Attribute),
}

// How a rule recognizes its command.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Exact(&'static str),
    Prefix(&'static str),
    // Prefix plus a fixed total command length.
    Sized(&'static str, usize),
}

impl Pattern {
    /// Returns the payload following the pattern, or `None` if it does not match.
    fn payload<'a>(&self, command: &'a str) -> Option<&'a str> {
        match *self {
            Pattern::Exact(literal) => (command == literal).then_some(""),
            Pattern::Prefix(prefix) => command.strip_prefix(prefix),
            Pattern::Sized(prefix, len) if command.len() == len => command.strip_prefix(prefix),
            Pattern::Sized(..) => None,
        }
    }

    fn prefix(&self) -> &'static str {
        match *self {
            Pattern::Exact(literal) => literal,
            Pattern::Prefix(prefix) | Pattern::Sized(prefix, _) => prefix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Bass,
    Treble,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    PowerOn,
    PowerOff,
    PowerToggle,
    FeedbackOn,
    FeedbackOff,
    VolumeUp,
    VolumeDown,
    MuteToggle,
    MuteOn,
    MuteOff,
    Select(Source),
    BypassOn,
    BypassOff,
    Query(Attribute),
    SetVolume,
    SetTone(Tone),
    SetBalance,
}

// Evaluated top to bottom; the first matching pattern wins. Literals come before
// the prefix rules so `vol_up` is never read as `vol_` with payload `up`.
const RULES: &[(Pattern, Action)] = &[
    (Pattern::Exact("power_on"), Action::PowerOn),
    (Pattern::Exact("power_off"), Action::PowerOff),
    (Pattern::Exact("power_toggle"), Action::PowerToggle),
    (Pattern::Exact("rs232_update_on"), Action::FeedbackOn),
    (Pattern::Exact("rs232_update_off"), Action::FeedbackOff),
    (Pattern::Exact("vol_up"), Action::VolumeUp),
    (Pattern::Exact("vol_dwn"), Action::VolumeDown),
    (Pattern::Exact("mute"), Action::MuteToggle),
    (Pattern::Exact("mute_on"), Action::MuteOn),
    (Pattern::Exact("mute_off"), Action::MuteOff),
    (Pattern::Exact("cd"), Action::Select(Source::Cd)),
    (Pattern::Exact("coax1"), Action::Select(Source::Coax1)),
    (Pattern::Exact("coax2"), Action::Select(Source::Coax2)),
    (Pattern::Exact("opt1"), Action::Select(Source::Opt1)),
    (Pattern::Exact("opt2"), Action::Select(Source::Opt2)),
    (Pattern::Exact("aux1"), Action::Select(Source::Aux1)),
    (Pattern::Exact("aux2"), Action::Select(Source::Aux2)),
    (Pattern::Exact("tuner"), Action::Select(Source::Tuner)),
    (Pattern::Exact("phono"), Action::Select(Source::Phono)),
    (Pattern::Exact("usb"), Action::Select(Source::Usb)),
    (Pattern::Exact("bluetooth"), Action::Select(Source::Bluetooth)),
    (Pattern::Exact("pcusb"), Action::Select(Source::PcUsb)),
    (Pattern::Exact("bypass_on"), Action::BypassOn),
    (Pattern::Exact("bypass_off"), Action::BypassOff),
    (Pattern::Exact("power?"), Action::Query(Attribute::Power)),
    (Pattern::Exact("source?"), Action::Query(Attribute::Source)),
    (Pattern::Exact("volume?"), Action::Query(Attribute::Volume)),
    (Pattern::Exact("mute?"), Action::Query(Attribute::Mute)),
    (Pattern::Exact("bypass?"), Action::Query(Attribute::Bypass)),
    (Pattern::Exact("bass?"), Action::Query(Attribute::Bass)),
    (Pattern::Exact("treble?"), Action::Query(Attribute::Treble)),
    (Pattern::Exact("balance?"), Action::Query(Attribute::Balance)),
    (Pattern::Exact("freq?"), Action::Query(Attribute::Frequency)),
    (Pattern::Sized("vol_", 6), Action::SetVolume),
    (Pattern::Prefix("bass_"), Action::SetTone(Tone::Bass)),
    (Pattern::Prefix("treble_"), Action::SetTone(Tone::Treble)),
    (Pattern::Prefix("balance_"), Action::SetBalance),
];

// Payload of a bass or treble command.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ToneStep {
    Set(i32),
    Up,
    Down,
}

/// Parses exactly two ASCII digits.
fn parse_two_digits(digits: &str) -> Option<i32> {
    match digits.as_bytes() {
        [tens, units] if tens.is_ascii_digit() && units.is_ascii_digit() => {
            Some(((tens - b'0') * 10 + (units - b'0')) as i32)
        }
        _ => None,
    }
}

fn parse_tone_step(payload: &str) -> Option<ToneStep> {
    match payload {
        "up" => Some(ToneStep::Up),
        "down" => Some(ToneStep::Down),
        "000" => Some(ToneStep::Set(0)),
        _ => {
            if let Some(digits) = payload.strip_prefix('+') {
                parse_two_digits(digits).map(ToneStep::Set)
            } else if let Some(digits) = payload.strip_prefix('-') {
                parse_two_digits(digits).map(|magnitude| ToneStep::Set(-magnitude))
            } else {
                None
            }
        }
    }
}

/// Parses `R07` / `l12` style balance payloads into a signed step.
fn parse_balance(payload: &str) -> Option<i32> {
    let payload = payload.to_ascii_uppercase();
    if let Some(digits) = payload.strip_prefix('R') {
        parse_two_digits(digits)
    } else if let Some(digits) = payload.strip_prefix('L') {
        parse_two_digits(digits).map(|magnitude| -magnitude)
    } else {
        None
    }
}

// Maps a setter outcome onto a reply.
fn changed(applied: bool, attribute: Attribute, value: i32) -> Result<Reply, CommandError> {
    if applied {
        Ok(Reply::Changed(attribute))
    } else {
        Err(CommandError::OutOfRange { attribute, value })
    }
}

/// The simulated amplifier: device state plus the command interpreter.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    state: DeviceState,
}

impl Simulator {
    /// Creates a simulator with factory defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulator that starts in the given update mode.
    pub fn with_update_mode(mode: UpdateMode) -> Self {
        let mut simulator = Self::default();
        simulator.state.set_update_mode(mode);
        simulator
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Processes one command and returns the text to send back, if any.
    ///
    /// Unrecognized commands answer with the generic error token. Recognized
    /// commands whose payload is malformed or out of range are ignored silently.
    pub fn process_command(&mut self, command: &str) -> Option<String> {
        match self.dispatch(command) {
            Ok(reply) => self.respond(reply),
            Err(CommandError::UnknownCommand) => {
                debug!(command, "unknown command");
                Some(format::UNKNOWN_COMMAND.to_string())
            }
            Err(e) => {
                debug!(command, error = %e, "command ignored");
                None
            }
        }
    }

    /// Matches a command against the rule table and executes the first hit.
    pub fn dispatch(&mut self, command: &str) -> Result<Reply, CommandError> {
        let command = command.trim();
        let command = command.strip_suffix(COMMAND_TERMINATOR).unwrap_or(command);

        let (pattern, action, payload) = RULES
            .iter()
            .find_map(|(pattern, action)| {
                pattern.payload(command).map(|payload| (pattern, *action, payload))
            })
            .ok_or(CommandError::UnknownCommand)?;

        self.execute(action, pattern.prefix(), payload)
    }

    /// Reports a changed attribute if the device is in auto-update mode.
    pub fn feedback(&self, attribute: Attribute) -> Option<String> {
        match self.state.update_mode() {
            UpdateMode::Auto => Some(format::render(&self.state, attribute)),
            UpdateMode::Manual => None,
        }
    }

    /// Records the sample rate detected on the active digital input.
    ///
    /// There is no wire command for this; the host drives it directly. Returns the
    /// feedback token in auto-update mode.
    pub fn set_frequency(&mut self, index: i32) -> Option<String> {
        if self.state.set_frequency(index) {
            self.feedback(Attribute::Frequency)
        } else {
            debug!(index, "sample rate index rejected");
            None
        }
    }

    fn respond(&self, reply: Reply) -> Option<String> {
        match reply {
            Reply::Changed(attribute) => self.feedback(attribute),
            Reply::Acknowledged(attribute) | Reply::Report(attribute) => {
                Some(format::render(&self.state, attribute))
            }
        }
    }

    fn execute(
        &mut self,
        action: Action,
        prefix: &'static str,
        payload: &str,
    ) -> Result<Reply, CommandError> {
        let state = &mut self.state;
        let malformed = || CommandError::MalformedPayload {
            prefix,
            payload: payload.to_string(),
        };

        match action {
            Action::PowerOn => changed(state.set_power(PowerState::On), Attribute::Power, 1),
            Action::PowerOff => changed(state.set_power(PowerState::Standby), Attribute::Power, 0),
            Action::PowerToggle => {
                let next = match state.power() {
                    PowerState::On => PowerState::Standby,
                    PowerState::Standby => PowerState::On,
                };
                changed(state.set_power(next), Attribute::Power, next as i32)
            }
            Action::FeedbackOn => {
                state.set_update_mode(UpdateMode::Auto);
                Ok(Reply::Acknowledged(Attribute::UpdateMode))
            }
            Action::FeedbackOff => {
                state.set_update_mode(UpdateMode::Manual);
                Ok(Reply::Acknowledged(Attribute::UpdateMode))
            }
            Action::VolumeUp => {
                let volume = state.volume() + 1;
                changed(state.set_volume(volume), Attribute::Volume, volume)
            }
            Action::VolumeDown => {
                let volume = state.volume() - 1;
                changed(state.set_volume(volume), Attribute::Volume, volume)
            }
            Action::MuteToggle => {
                let mute = !state.mute();
                changed(state.set_mute(mute), Attribute::Mute, mute as i32)
            }
            Action::MuteOn => changed(state.set_mute(true), Attribute::Mute, 1),
            Action::MuteOff => changed(state.set_mute(false), Attribute::Mute, 0),
            Action::Select(source) => {
                changed(state.set_source(source), Attribute::Source, source as i32)
            }
            Action::BypassOn => changed(state.set_bypass(true), Attribute::Bypass, 1),
            Action::BypassOff => changed(state.set_bypass(false), Attribute::Bypass, 0),
            Action::Query(attribute) => Ok(Reply::Report(attribute)),
            Action::SetVolume => {
                let volume = parse_two_digits(payload).ok_or_else(malformed)?;
                changed(state.set_volume(volume), Attribute::Volume, volume)
            }
            Action::SetTone(tone) => {
                let (current, attribute) = match tone {
                    Tone::Bass => (state.bass(), Attribute::Bass),
                    Tone::Treble => (state.treble(), Attribute::Treble),
                };
                let level = match parse_tone_step(payload).ok_or_else(malformed)? {
                    ToneStep::Set(level) => level,
                    ToneStep::Up => current + 1,
                    ToneStep::Down => current - 1,
                };
                let applied = match tone {
                    Tone::Bass => state.set_bass(level),
                    Tone::Treble => state.set_treble(level),
                };
                changed(applied, attribute, level)
            }
            Action::SetBalance => {
                let balance = parse_balance(payload).ok_or_else(malformed)?;
                changed(state.set_balance(balance), Attribute::Balance, balance)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Runs a command and returns its response, or an empty string for silence.
    fn send(sim: &mut Simulator, command: &str) -> String {
        sim.process_command(command).unwrap_or_default()
    }

    #[test]
    fn factory_defaults() {
        let state = DeviceState::default();
        assert_eq!(state.power(), PowerState::On);
        assert_eq!(state.volume(), 45);
        assert!(!state.mute());
        assert_eq!(state.source(), Source::PcUsb);
        assert!(state.bypass());
        assert_eq!((state.bass(), state.treble(), state.balance()), (0, 0, 0));
        assert_eq!(state.update_mode(), UpdateMode::Manual);
        assert_eq!(state.frequency(), 0);
    }

    #[test]
    fn numeric_setters_reject_out_of_range_values() {
        let mut state = DeviceState::default();
        assert!(!state.set_volume(97));
        assert!(!state.set_volume(-1));
        assert!(!state.set_bass(11));
        assert!(!state.set_treble(-11));
        assert!(!state.set_balance(16));
        assert!(!state.set_balance(-16));
        assert_eq!(state, DeviceState::default());

        assert!(state.set_volume(96));
        assert!(state.set_bass(-10));
        assert!(state.set_balance(-15));
        assert_eq!(state.volume(), 96);
        assert_eq!(state.bass(), -10);
        assert_eq!(state.balance(), -15);
    }

    #[test]
    fn volume_set_and_query() {
        let mut sim = Simulator::new();
        assert_eq!(send(&mut sim, "vol_45!"), "");
        assert_eq!(send(&mut sim, "volume?"), "volume=45$");
        assert_eq!(send(&mut sim, "vol_07!"), "");
        assert_eq!(send(&mut sim, "volume?!"), "volume=07$");
    }

    #[test]
    fn volume_out_of_range_is_silent() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        assert_eq!(send(&mut sim, "vol_97!"), "");
        assert_eq!(sim.state().volume(), 45);
        assert_eq!(
            sim.dispatch("vol_97!"),
            Err(CommandError::OutOfRange {
                attribute: Attribute::Volume,
                value: 97
            })
        );
    }

    #[test]
    fn malformed_prefixed_payloads_are_silent() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        for command in [
            "vol_xy!", "bass_+99!", "bass_x!", "treble_5!", "balance_X07!", "balance_R7!",
            "balance_R16!",
        ] {
            assert_eq!(send(&mut sim, command), "", "{command}");
        }
        assert_eq!(sim.state(), Simulator::with_update_mode(UpdateMode::Auto).state());
    }

    #[test]
    fn volume_prefix_requires_two_digit_payload() {
        let mut sim = Simulator::new();
        assert_eq!(send(&mut sim, "vol_7!"), format::UNKNOWN_COMMAND);
        assert_eq!(send(&mut sim, "vol_100!"), format::UNKNOWN_COMMAND);
        assert_eq!(sim.state().volume(), 45);
    }

    #[test]
    fn volume_step_literals_win_over_numeric_prefix() {
        let mut sim = Simulator::new();
        assert_eq!(sim.dispatch("vol_up!"), Ok(Reply::Changed(Attribute::Volume)));
        assert_eq!(sim.state().volume(), 46);
        send(&mut sim, "vol_dwn!");
        send(&mut sim, "vol_dwn!");
        assert_eq!(sim.state().volume(), 44);
    }

    #[test]
    fn volume_steps_stop_at_the_limits() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        send(&mut sim, "vol_96!");
        assert_eq!(send(&mut sim, "vol_up!"), "");
        assert_eq!(sim.state().volume(), 96);
        send(&mut sim, "vol_00!");
        assert_eq!(send(&mut sim, "vol_dwn!"), "");
        assert_eq!(sim.state().volume(), 0);
    }

    #[test]
    fn balance_direction_round_trip() {
        let mut sim = Simulator::new();
        send(&mut sim, "balance_R07!");
        assert_eq!(sim.state().balance(), 7);
        assert_eq!(send(&mut sim, "balance?!"), "balance=R07$");

        send(&mut sim, "balance_L12!");
        assert_eq!(sim.state().balance(), -12);
        assert_eq!(send(&mut sim, "balance?!"), "balance=L12$");

        send(&mut sim, "balance_r03!");
        assert_eq!(sim.state().balance(), 3);
        send(&mut sim, "balance_L00!");
        assert_eq!(send(&mut sim, "balance?!"), "balance=000$");
    }

    #[test]
    fn bass_steps_up_from_zero() {
        let mut sim = Simulator::new();
        for _ in 0..3 {
            send(&mut sim, "bass_up!");
        }
        assert_eq!(sim.state().bass(), 3);
        assert_eq!(send(&mut sim, "bass?!"), "bass=+03$");
    }

    #[test]
    fn tone_steps_do_not_pass_the_limits() {
        let mut sim = Simulator::new();
        send(&mut sim, "treble_-10!");
        assert_eq!(send(&mut sim, "treble_down!"), "");
        assert_eq!(sim.state().treble(), -10);
        assert_eq!(send(&mut sim, "treble?"), "treble=-10$");

        send(&mut sim, "bass_+10!");
        send(&mut sim, "bass_up!");
        assert_eq!(sim.state().bass(), 10);
        send(&mut sim, "bass_000!");
        assert_eq!(send(&mut sim, "bass?"), "bass=000$");
    }

    #[test]
    fn update_mode_gates_feedback() {
        let mut sim = Simulator::new();
        assert_eq!(send(&mut sim, "vol_10!"), "");
        assert_eq!(send(&mut sim, "rs232_update_on!"), "update_mode=auto$");
        assert_eq!(send(&mut sim, "vol_10!"), "volume=10$");
        assert_eq!(send(&mut sim, "rs232_update_off!"), "update_mode=manual$");
        assert_eq!(send(&mut sim, "mute_on!"), "");
        assert!(sim.state().mute());
    }

    #[test]
    fn auto_mode_echoes_every_assignment() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        assert_eq!(send(&mut sim, "power_off!"), "power=standby$");
        assert_eq!(send(&mut sim, "power_off!"), "power=standby$");
        assert_eq!(send(&mut sim, "power_toggle!"), "power=on$");
        assert_eq!(send(&mut sim, "mute!"), "mute=on$");
        assert_eq!(send(&mut sim, "mute!"), "mute=off$");
        assert_eq!(send(&mut sim, "bypass_off!"), "bypass=off$");
        assert_eq!(send(&mut sim, "bluetooth!"), "source=bluetooth$");
        assert_eq!(send(&mut sim, "pcusb!"), "source=pc_usb$");
        assert_eq!(send(&mut sim, "balance_l05!"), "balance=L05$");
        assert_eq!(send(&mut sim, "treble_+04!"), "treble=+04$");
    }

    #[test]
    fn every_source_token_selects_its_input() {
        let cases = [
            ("cd", Source::Cd, "cd"),
            ("coax1", Source::Coax1, "coax1"),
            ("coax2", Source::Coax2, "coax2"),
            ("opt1", Source::Opt1, "opt1"),
            ("opt2", Source::Opt2, "opt2"),
            ("aux1", Source::Aux1, "aux1"),
            ("aux2", Source::Aux2, "aux2"),
            ("tuner", Source::Tuner, "tuner"),
            ("phono", Source::Phono, "phono"),
            ("usb", Source::Usb, "usb"),
            ("bluetooth", Source::Bluetooth, "bluetooth"),
            ("pcusb", Source::PcUsb, "pc_usb"),
        ];

        let mut auto = Simulator::with_update_mode(UpdateMode::Auto);
        let mut manual = Simulator::new();
        for (token, source, label) in cases {
            let command = format!("{token}!");
            let expected = format!("source={label}$");

            assert_eq!(send(&mut auto, &command), expected, "{token}");
            assert_eq!(auto.state().source(), source, "{token}");

            assert_eq!(send(&mut manual, &command), "", "{token}");
            assert_eq!(manual.state().source(), source, "{token}");
            assert_eq!(send(&mut manual, "source?!"), expected, "{token}");
        }
    }

    #[test]
    fn treble_steps_and_zero() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        assert_eq!(send(&mut sim, "treble_up!"), "treble=+01$");
        assert_eq!(send(&mut sim, "treble_up!"), "treble=+02$");
        assert_eq!(send(&mut sim, "treble_000!"), "treble=000$");
        assert_eq!(send(&mut sim, "treble_down!"), "treble=-01$");
        assert_eq!(sim.state().treble(), -1);
        assert_eq!(sim.state().bass(), 0);

        send(&mut sim, "treble_+10!");
        assert_eq!(send(&mut sim, "treble_up!"), "");
        assert_eq!(sim.state().treble(), 10);
    }

    #[test]
    fn bass_steps_down_and_stops_at_minimum() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        assert_eq!(send(&mut sim, "bass_down!"), "bass=-01$");
        send(&mut sim, "bass_-10!");
        assert_eq!(send(&mut sim, "bass_down!"), "");
        assert_eq!(sim.state().bass(), -10);
        assert_eq!(sim.state().treble(), 0);
    }

    #[test]
    fn queries_answer_in_manual_mode_and_repeat_identically() {
        let mut sim = Simulator::new();
        let first = send(&mut sim, "source?!");
        assert_eq!(first, "source=pc_usb$");
        assert_eq!(send(&mut sim, "source?!"), first);
        assert_eq!(send(&mut sim, "power?"), "power=on$");
        assert_eq!(send(&mut sim, "mute?"), "mute=off$");
        assert_eq!(send(&mut sim, "bypass?"), "bypass=on$");
        assert_eq!(send(&mut sim, "freq?"), "freq=off$");
    }

    #[test]
    fn unknown_command_reports_error_without_state_change() {
        let mut sim = Simulator::new();
        assert_eq!(send(&mut sim, "frobnicate!"), "Error: Unknown command$");
        assert_eq!(send(&mut sim, "POWER_ON!"), "Error: Unknown command$");
        assert_eq!(send(&mut sim, ""), "Error: Unknown command$");
        assert_eq!(sim.state(), &DeviceState::default());
    }

    #[test]
    fn commands_are_trimmed_and_terminator_is_optional() {
        let mut sim = Simulator::new();
        assert_eq!(send(&mut sim, "  volume?!\r\n"), "volume=45$");
        assert_eq!(send(&mut sim, "volume?"), "volume=45$");
    }

    #[test]
    fn frequency_accepts_only_table_indices() {
        let mut sim = Simulator::with_update_mode(UpdateMode::Auto);
        assert_eq!(sim.set_frequency(7), Some(String::from("freq=192$")));
        assert_eq!(sim.set_frequency(8), None);
        assert_eq!(sim.set_frequency(-1), None);
        assert_eq!(sim.state().frequency(), 7);
        assert_eq!(sim.set_frequency(0), Some(String::from("freq=off$")));
        assert_eq!(send(&mut sim, "freq?"), "freq=off$");
    }
}
