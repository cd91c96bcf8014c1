//! Renders device attributes into the `key=value$` feedback grammar.

use crate::{Attribute, DeviceState, PowerState, Source, UpdateMode};

/// Sent back for any command that matches no rule.
pub const UNKNOWN_COMMAND: &str = "Error: Unknown command$";

/// Closes every feedback token.
pub const TOKEN_TERMINATOR: char = '$';

/// Sample-rate labels in kHz, indexed by [`DeviceState::frequency`].
pub const FREQUENCY_LABELS: [&str; 8] = ["off", "32", "44.1", "48", "88.2", "96", "176.4", "192"];

const SOURCE_LABELS: [(Source, &str); 12] = [
    (Source::Cd, "cd"),
    (Source::Coax1, "coax1"),
    (Source::Coax2, "coax2"),
    (Source::Opt1, "opt1"),
    (Source::Opt2, "opt2"),
    (Source::Aux1, "aux1"),
    (Source::Aux2, "aux2"),
    (Source::Tuner, "tuner"),
    (Source::Phono, "phono"),
    (Source::Usb, "usb"),
    (Source::Bluetooth, "bluetooth"),
    (Source::PcUsb, "pc_usb"),
];

// Label used for any source missing from the table.
const DEFAULT_SOURCE_LABEL: &str = "pc_usb";

pub fn source_label(source: Source) -> &'static str {
    SOURCE_LABELS
        .iter()
        .find(|(candidate, _)| *candidate == source)
        .map_or(DEFAULT_SOURCE_LABEL, |(_, label)| *label)
}

pub fn frequency_label(index: i32) -> &'static str {
    usize::try_from(index)
        .ok()
        .and_then(|i| FREQUENCY_LABELS.get(i))
        .copied()
        .unwrap_or(FREQUENCY_LABELS[0])
}

/// Sign followed by a two-digit magnitude; zero is `000`.
pub fn signed(value: i32) -> String {
    if value == 0 {
        String::from("000")
    } else if value > 0 {
        format!("+{:02}", value)
    } else {
        format!("-{:02}", value.unsigned_abs())
    }
}

/// Like [`signed`], with `R` for right and `L` for left.
pub fn balance(value: i32) -> String {
    signed(value).replace('+', "R").replace('-', "L")
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// The wire key for an attribute.
pub fn key(attribute: Attribute) -> &'static str {
    match attribute {
        Attribute::Power => "power",
        Attribute::Volume => "volume",
        Attribute::Mute => "mute",
        Attribute::Source => "source",
        Attribute::Bypass => "bypass",
        Attribute::Bass => "bass",
        Attribute::Treble => "treble",
        Attribute::Balance => "balance",
        Attribute::UpdateMode => "update_mode",
        Attribute::Frequency => "freq",
    }
}

/// The wire value of an attribute, without key or terminator.
pub fn value(state: &DeviceState, attribute: Attribute) -> String {
    match attribute {
        Attribute::Power => match state.power() {
            PowerState::On => String::from("on"),
            PowerState::Standby => String::from("standby"),
        },
        Attribute::Volume => format!("{:02}", state.volume()),
        Attribute::Mute => on_off(state.mute()).to_string(),
        Attribute::Source => source_label(state.source()).to_string(),
        Attribute::Bypass => on_off(state.bypass()).to_string(),
        Attribute::Bass => signed(state.bass()),
        Attribute::Treble => signed(state.treble()),
        Attribute::Balance => balance(state.balance()),
        Attribute::UpdateMode => match state.update_mode() {
            UpdateMode::Auto => String::from("auto"),
            UpdateMode::Manual => String::from("manual"),
        },
        Attribute::Frequency => frequency_label(state.frequency()).to_string(),
    }
}

/// Renders one complete feedback token.
pub fn render(state: &DeviceState, attribute: Attribute) -> String {
    format!("{}={}{}", key(attribute), value(state, attribute), TOKEN_TERMINATOR)
}
