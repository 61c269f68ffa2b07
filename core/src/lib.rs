pub mod audio;
pub mod clock;
pub mod core;
pub mod driver;
pub mod error;
pub mod handoff;
pub mod input;
pub mod pacer;
pub mod run_state;

pub mod prelude {
    pub use crate::audio::{AudioBridge, AudioOutput, AudioSpec, AudioStream};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::core::machine::{InputButton, Machine, SampleSource};
    pub use crate::driver::{Driver, DriverConfig, DriverHooks, DriverParts};
    pub use crate::error::{AudioError, DriverError, HandoffError};
    pub use crate::handoff::FrameHandoff;
    pub use crate::input::{InputTranslator, KeyBindings, KeyCommand, KeyEvent, Modifiers};
    pub use crate::pacer::{FpsSample, FramePacer};
    pub use crate::run_state::{RunState, SharedRunState};
}
