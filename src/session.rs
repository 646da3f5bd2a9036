use crate::controller::{FlightController, FlightVariant};
use crate::events::{FlightEvent, ReportLog};
use crate::input::InputState;
use crate::rig::{BoneId, RigError, RigHandle, TransformSnapshot};
use crate::scene::{ObjectId, Scene};
use crate::settings::FlySettings;
use bitflags::bitflags;
use std::fmt;
use std::time::Duration;

/// Tick cadence the session requests from the host timer.
pub const TICK_INTERVAL: Duration = Duration::from_millis(20);

bitflags! {
    /// Which animation channels a keyframe insertion covers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChannelSet: u8 {
        const LOCATION = 1;
        const ROTATION = 1 << 1;
        const SCALE = 1 << 2;
    }
}

impl ChannelSet {
    pub fn describe(self) -> String {
        let mut parts = Vec::new();
        if self.contains(ChannelSet::LOCATION) {
            parts.push("location");
        }
        if self.contains(ChannelSet::ROTATION) {
            parts.push("rotation");
        }
        if self.contains(ChannelSet::SCALE) {
            parts.push("scale");
        }
        match parts.len() {
            0 => String::from("nothing"),
            1 => parts[0].to_string(),
            n => format!("{} & {}", parts[..n - 1].join(", "), parts[n - 1]),
        }
    }
}

/// Host hook for recording animation keys. The session never touches action
/// curves itself.
pub trait KeyframeRecorder {
    fn insert_keyframe(&mut self, bone: BoneId, channels: ChannelSet, frame: i32);
}

/// Opaque token for a registered periodic timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickHandle(pub u64);

#[derive(Debug, Clone)]
pub struct TickSourceError(pub String);

impl fmt::Display for TickSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer registration failed: {}", self.0)
    }
}

impl std::error::Error for TickSourceError {}

/// Host hook for the periodic tick timer. Registration may fail (the host may
/// be out of timer slots), in which case the session refuses to start.
pub trait TickSource {
    fn register(&mut self, interval: Duration) -> Result<TickHandle, TickSourceError>;
    fn release(&mut self, handle: TickHandle);
}

/// Trivial tick source for hosts that deliver ticks themselves.
#[derive(Debug, Default)]
pub struct ManualTickSource {
    next: u64,
}

impl TickSource for ManualTickSource {
    fn register(&mut self, _interval: Duration) -> Result<TickHandle, TickSourceError> {
        let handle = TickHandle(self.next);
        self.next += 1;
        Ok(handle)
    }

    fn release(&mut self, _handle: TickHandle) {}
}

#[derive(Debug)]
pub enum SessionError {
    Rig(RigError),
    TickSource(TickSourceError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Rig(err) => write!(f, "cannot start flight: {err}"),
            SessionError::TickSource(err) => write!(f, "cannot start flight: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<RigError> for SessionError {
    fn from(err: RigError) -> Self {
        SessionError::Rig(err)
    }
}

impl From<TickSourceError> for SessionError {
    fn from(err: TickSourceError) -> Self {
        SessionError::TickSource(err)
    }
}

#[derive(Debug)]
pub enum FlightError {
    Rig(RigError),
    /// An event arrived after the session already accepted or cancelled.
    SessionOver,
    /// The rig vanished mid-session and could not be re-resolved.
    LostReference,
}

impl fmt::Display for FlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightError::Rig(err) => err.fmt(f),
            FlightError::SessionOver => write!(f, "flight session has already ended"),
            FlightError::LostReference => write!(f, "camera rig reference was lost"),
        }
    }
}

impl std::error::Error for FlightError {}

impl From<RigError> for FlightError {
    fn from(err: RigError) -> Self {
        FlightError::Rig(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Accepted,
    Cancelled,
}

/// Everything the session borrows from the host for the duration of one call.
pub struct HostContext<'a> {
    pub scene: &'a mut Scene,
    pub settings: &'a mut FlySettings,
    pub recorder: &'a mut dyn KeyframeRecorder,
    pub ticks: &'a mut dyn TickSource,
    pub reports: &'a mut ReportLog,
}

/// One interactive flight over a dolly rig, from begin to accept or cancel.
///
/// All calls happen on the host's event thread; events are handled strictly in
/// arrival order and the session holds no references into the scene between
/// calls.
pub struct FlightSession {
    handle: RigHandle,
    snapshot: TransformSnapshot,
    input: InputState,
    controller: FlightController,
    state: SessionState,
    timer: Option<TickHandle>,
}

impl FlightSession {
    /// Starts a session over the rig above `camera` using default bindings.
    pub fn begin(
        host: &mut HostContext<'_>,
        camera: ObjectId,
        variant: FlightVariant,
    ) -> Result<Self, SessionError> {
        Self::begin_with_input(host, camera, variant, InputState::new())
    }

    /// Starts a session with a pre-built input state, for hosts that load
    /// their own binding overrides.
    pub fn begin_with_input(
        host: &mut HostContext<'_>,
        camera: ObjectId,
        variant: FlightVariant,
        input: InputState,
    ) -> Result<Self, SessionError> {
        let handle = RigHandle::resolve(host.scene, camera)?;
        let snapshot = handle.snapshot(host.scene)?;
        let timer = host.ticks.register(TICK_INTERVAL)?;
        if let Some(camera) = host.scene.object(handle.camera_object()) {
            host.settings.active_camera = Some(camera.name.clone());
        }
        host.reports.info("Camera flight started");
        Ok(Self {
            handle,
            snapshot,
            input,
            controller: FlightController::new(variant),
            state: SessionState::Active,
            timer: Some(timer),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rig(&self) -> &RigHandle {
        &self.handle
    }

    /// Feeds one host event through the session. Accept and cancel are always
    /// valid; any other event after the session ended is an error.
    pub fn handle_event(
        &mut self,
        host: &mut HostContext<'_>,
        event: FlightEvent,
    ) -> Result<SessionState, FlightError> {
        match event {
            FlightEvent::Accept => {
                self.accept(host);
                return Ok(self.state);
            }
            FlightEvent::Cancel => {
                self.cancel(host);
                return Ok(self.state);
            }
            _ => {}
        }
        if self.state != SessionState::Active {
            host.reports.warning("Flight session is over; event ignored");
            return Err(FlightError::SessionOver);
        }
        self.ensure_rig(host)?;
        match event {
            FlightEvent::Tick { shift, ctrl, alt } => {
                self.controller.tick(
                    host.scene,
                    &self.handle,
                    host.settings,
                    &mut self.input,
                    shift,
                    ctrl,
                    alt,
                )?;
            }
            FlightEvent::MouseMove { x, y } => {
                let (dx, dy) = self.input.observe_mouse(x, y);
                self.controller.apply_mouse(host.scene, &self.handle, host.settings, dx, dy)?;
            }
            FlightEvent::Key { code, pressed } => {
                self.input.on_key(&code, pressed);
                if self.input.take_keyframe_request() {
                    self.request_keyframe(host);
                }
            }
            FlightEvent::Wheel { up } => {
                self.controller.step_aim(host.scene, &self.handle, host.settings, up)?;
                let direction = if up { "forward" } else { "backward" };
                host.reports.info(format!(
                    "Moved aim target {direction} by {:.2} units",
                    host.settings.aim_distance_step
                ));
            }
            FlightEvent::Accept | FlightEvent::Cancel => unreachable!(),
        }
        Ok(self.state)
    }

    /// Keeps the edits made so far and ends the session. Idempotent.
    pub fn accept(&mut self, host: &mut HostContext<'_>) {
        if self.state != SessionState::Active {
            return;
        }
        self.state = SessionState::Accepted;
        self.teardown(host);
        host.reports.info("Accepted camera flight changes");
    }

    /// Restores the starting snapshot and ends the session. Idempotent.
    pub fn cancel(&mut self, host: &mut HostContext<'_>) {
        if self.state != SessionState::Active {
            return;
        }
        self.state = SessionState::Cancelled;
        self.restore_snapshot(host);
        self.teardown(host);
        host.reports.info("Reverted camera flight changes");
    }

    /// Records a keyframe on the flight bones at the scene's current frame.
    /// Returns false (with a warning report) when no rig is bound.
    pub fn request_keyframe(&mut self, host: &mut HostContext<'_>) -> bool {
        if self.state != SessionState::Active {
            host.reports.warning("Flight session is over; keyframe request ignored");
            return false;
        }
        if !self.handle.is_valid(host.scene) {
            host.reports.warning("No rig bound; keyframe request ignored");
            return false;
        }
        let frame = host.scene.frame_current;
        let channels = ChannelSet::all();
        for bone in self.controller.keyframe_bones() {
            host.recorder.insert_keyframe(bone, channels, frame);
        }
        host.reports
            .info(format!("Inserted keyframe: {} at frame {frame}", channels.describe()));
        true
    }

    /// Revalidates the rig handle, re-resolving once through the remembered
    /// camera name before giving up and cancelling the session.
    fn ensure_rig(&mut self, host: &mut HostContext<'_>) -> Result<(), FlightError> {
        if self.handle.is_valid(host.scene) {
            return Ok(());
        }
        let recovered = host
            .settings
            .active_camera
            .as_deref()
            .and_then(|name| host.scene.find_object(name))
            .and_then(|camera| RigHandle::resolve(host.scene, camera).ok());
        if let Some(handle) = recovered {
            host.reports.warning("Camera rig changed; re-resolved from active camera");
            // The starting snapshot is kept as-is: it is keyed by bone, so a
            // later cancel still restores the pre-session pose through the
            // recovered handle.
            self.handle = handle;
            return Ok(());
        }
        host.reports.error("Camera rig reference lost; cancelling flight");
        self.state = SessionState::Cancelled;
        self.restore_snapshot(host);
        self.teardown(host);
        Err(FlightError::LostReference)
    }

    /// Writes the starting snapshot back. Restore goes by bone index, so it
    /// still works when the handle fails validation only on a name check.
    fn restore_snapshot(&self, host: &mut HostContext<'_>) {
        if let Err(err) = self.handle.restore(host.scene, &self.snapshot) {
            host.reports.warning(format!("Could not restore rig pose: {err}"));
        }
    }

    fn teardown(&mut self, host: &mut HostContext<'_>) {
        if let Some(timer) = self.timer.take() {
            host.ticks.release(timer);
        }
        self.input.clear();
    }
}
