use std::fmt;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle ──start──→ recording ──pause──→ paused
///  ↑                 ↑  ←──resume──────┘  │
///  └────stop/clear───┴────stop/clear──────┘
/// ```
///
/// `clear` is accepted from every state, including idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    /// Recording or paused: a take is in progress and can be exported.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
