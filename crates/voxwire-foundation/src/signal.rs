pub const SIGNAL_START: &str = "system/start";
pub const SIGNAL_STOP: &str = "system/stop";

/// Lifecycle control signal for a capture processor. The tag table is
/// closed: anything that is not start or stop routes to the generic
/// cleanup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Start,
    Stop,
    Other,
}

impl ControlSignal {
    pub fn from_type_tag(tag: &str) -> Self {
        match tag {
            SIGNAL_START => ControlSignal::Start,
            SIGNAL_STOP => ControlSignal::Stop,
            _ => ControlSignal::Other,
        }
    }
}
