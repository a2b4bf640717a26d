//! Musical direction markers
//!
//! Scores encode stage directions as marker meta-events with fixed text.
//! Classification is a pure string-equality test against these literals.

/// Start of an introduction segment
pub const INTRO_BEGIN: &str = "[";

/// End of an introduction segment; triggers the jump to the next segment
pub const INTRO_END: &str = "]";

/// Start of the written-in slow-down
pub const RITARDANDO_INDICATOR: &str = "\\";

/// Return to the beginning and play until the Fine marker
pub const DA_CAPO_AL_FINE: &str = "D.C. al Fine";

/// End point when taking the Fine ending
pub const FINE_INDICATOR: &str = "Fine";

/// Classification of marker text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    IntroductionBegin,
    IntroductionEnd,
    RitardandoIndicator,
    DaCapoAlFine,
    FineIndicator,
    None,
}

/// Classify marker text. Anything unrecognized is `MarkerKind::None`.
pub fn classify(text: &str) -> MarkerKind {
    match text {
        INTRO_BEGIN => MarkerKind::IntroductionBegin,
        INTRO_END => MarkerKind::IntroductionEnd,
        RITARDANDO_INDICATOR => MarkerKind::RitardandoIndicator,
        DA_CAPO_AL_FINE => MarkerKind::DaCapoAlFine,
        FINE_INDICATOR => MarkerKind::FineIndicator,
        _ => MarkerKind::None,
    }
}
