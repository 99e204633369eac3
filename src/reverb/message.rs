#[cfg(feature = "rtrb")]
use rtrb::Consumer;

/// Runtime control of a running reverb, e.g. decoded from OSC.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    /// New room and wall properties. Forces the T60 to be re-derived from
    /// the room.
    DimDampAbsorption {
        x: f32,
        y: f32,
        z: f32,
        damping: f32,
        absorption: f32,
    },
    FixCirculantMatrix(bool),
    LogDelays(bool),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        self.pop_front()
    }
}
