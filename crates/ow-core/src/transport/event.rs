/// Asynchronous control-channel event, decoded once at the channel boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    BootstrapProgress {
        progress: u8,
        tag: Option<String>,
        summary: Option<String>,
    },
    CircuitEstablished,
    CircuitNotEstablished {
        reason: Option<String>,
    },
    /// The control connection went away (proxy exited or socket closed).
    ChannelClosed,
}

impl ControlEvent {
    pub fn bootstrap(progress: u8) -> Self {
        ControlEvent::BootstrapProgress {
            progress,
            tag: None,
            summary: None,
        }
    }
}
