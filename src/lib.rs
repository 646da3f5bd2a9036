pub mod controller;
pub mod events;
pub mod input;
pub mod math;
pub mod rig;
pub mod scene;
pub mod session;
pub mod settings;

pub use controller::{FlightController, FlightVariant};
pub use events::{FlightEvent, Report, ReportLog, Severity};
pub use input::{InputBindings, InputState};
pub use rig::{BoneId, RigError, RigHandle, TransformSnapshot};
pub use scene::{ObjectId, Scene};
pub use session::{
    ChannelSet, FlightError, FlightSession, HostContext, KeyframeRecorder, ManualTickSource,
    SessionError, SessionState, TickHandle, TickSource, TickSourceError, TICK_INTERVAL,
};
pub use settings::{FlySettings, RotationMode};
