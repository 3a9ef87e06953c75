// Engine module - owns the current snapshot and drives refresh cycles

mod service;

pub use service::{Engine, EngineHandle, Frame, FrameRow, OperatorIntent};
