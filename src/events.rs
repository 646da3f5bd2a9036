use std::fmt;

/// One normalized host input event. The host's main loop delivers these
/// serially; the core never reorders or batches them.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightEvent {
    /// Periodic timer tick carrying the current modifier-key state.
    Tick { shift: bool, ctrl: bool, alt: bool },
    /// Absolute cursor position; deltas are derived by the input accumulator.
    MouseMove { x: f32, y: f32 },
    Key { code: String, pressed: bool },
    Wheel { up: bool },
    Accept,
    Cancel,
}

impl FlightEvent {
    pub fn tick() -> Self {
        FlightEvent::Tick { shift: false, ctrl: false, alt: false }
    }

    pub fn key(code: &str, pressed: bool) -> Self {
        FlightEvent::Key { code: code.to_string(), pressed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A human-readable message surfaced to the user, mirroring the error
/// taxonomy: errors for failures, warnings for recoverable oddities, info for
/// ordinary lifecycle transitions.
#[derive(Debug, Clone)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Collects reports for the host UI to drain; every push is also mirrored
/// into `tracing` at the matching level.
#[derive(Debug, Default)]
pub struct ReportLog {
    reports: Vec<Report>,
}

impl ReportLog {
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
        self.reports.push(Report { severity, message });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn drain(&mut self) -> Vec<Report> {
        self.reports.drain(..).collect()
    }
}

#[cfg(feature = "winit")]
mod winit_support {
    use super::FlightEvent;
    use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
    use winit::keyboard::{Key, ModifiersState, NamedKey};

    impl FlightEvent {
        /// Builds a tick event from the host window's current modifier state.
        pub fn tick_with_modifiers(modifiers: ModifiersState) -> Self {
            FlightEvent::Tick {
                shift: modifiers.shift_key(),
                ctrl: modifiers.control_key(),
                alt: modifiers.alt_key(),
            }
        }

        /// Translates a winit window event into a flight event, if it maps to
        /// one. Left click accepts, right click and escape cancel, space
        /// accepts, character keys feed the bindings table.
        pub fn from_window_event(event: &WindowEvent) -> Option<Self> {
            match event {
                WindowEvent::CursorMoved { position, .. } => Some(FlightEvent::MouseMove {
                    x: position.x as f32,
                    y: position.y as f32,
                }),
                WindowEvent::MouseWheel { delta, .. } => {
                    let amount = match delta {
                        MouseScrollDelta::LineDelta(_, y) => *y,
                        MouseScrollDelta::PixelDelta(p) => p.y as f32,
                    };
                    if amount == 0.0 {
                        None
                    } else {
                        Some(FlightEvent::Wheel { up: amount > 0.0 })
                    }
                }
                WindowEvent::MouseInput { state: ElementState::Pressed, button, .. } => match button {
                    MouseButton::Left => Some(FlightEvent::Accept),
                    MouseButton::Right => Some(FlightEvent::Cancel),
                    _ => None,
                },
                WindowEvent::KeyboardInput { event, .. } => {
                    let pressed = event.state == ElementState::Pressed;
                    match &event.logical_key {
                        Key::Character(text) if !text.is_empty() => {
                            Some(FlightEvent::Key { code: text.to_lowercase(), pressed })
                        }
                        Key::Named(NamedKey::Space) if pressed => Some(FlightEvent::Accept),
                        Key::Named(NamedKey::Escape) if pressed => Some(FlightEvent::Cancel),
                        _ => None,
                    }
                }
                _ => None,
            }
        }
    }
}
