use dolly_fly::input::{InputBindings, InputState};
use glam::Vec3;
use std::io::Write;
use tempfile::NamedTempFile;

fn bindings_from(json: &str) -> InputBindings {
    let mut file = NamedTempFile::new().expect("temp bindings file");
    write!(file, "{json}").expect("write bindings");
    InputBindings::load_or_default(file.path())
}

#[test]
fn override_replaces_default_keys_for_an_action() {
    let bindings = bindings_from(r#"{"bindings": {"move_forward": ["k"]}}"#);
    let mut input = InputState::with_bindings(bindings);

    input.on_key("k", true);
    assert_eq!(input.held_direction(), Vec3::Y);
    input.on_key("k", false);

    // The default key no longer maps to anything.
    input.on_key("w", true);
    assert_eq!(input.held_direction(), Vec3::ZERO);
}

#[test]
fn unknown_actions_are_ignored_and_defaults_kept() {
    let bindings = bindings_from(r#"{"bindings": {"warp_drive": ["x"], "move_up": ["r"]}}"#);
    let mut input = InputState::with_bindings(bindings);

    input.on_key("x", true);
    assert_eq!(input.held_direction(), Vec3::ZERO);

    input.on_key("r", true);
    assert_eq!(input.held_direction(), Vec3::Z);

    // Untouched actions keep their default keys.
    input.on_key("s", true);
    assert_eq!(input.held_direction(), Vec3::new(0.0, -1.0, 1.0));
}

#[test]
fn keys_are_matched_case_insensitively() {
    let bindings = bindings_from(r#"{"bindings": {"move_right": ["D", " j "]}}"#);
    let mut input = InputState::with_bindings(bindings);

    input.on_key("d", true);
    input.on_key("J", true);
    assert_eq!(input.held_direction(), Vec3::X);
}

#[test]
fn unreadable_file_falls_back_to_defaults() {
    let bindings = InputBindings::load_or_default("/nonexistent/bindings.json");
    let mut input = InputState::with_bindings(bindings);
    input.on_key("w", true);
    assert_eq!(input.held_direction(), Vec3::Y);
}

#[test]
fn malformed_json_falls_back_to_defaults() {
    let bindings = bindings_from("{not valid json");
    let mut input = InputState::with_bindings(bindings);
    input.on_key("q", true);
    assert_eq!(input.held_direction(), -Vec3::Z);
}
