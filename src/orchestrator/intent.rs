// src/orchestrator/intent.rs
// Stage 2 of the orchestrator graph: picks one of six intents from an
// explicit mode or, failing that, a fixed keyword table (§4.10 step 2).

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Coding,
    Debug,
    Workflow,
    Explain,
    Chat,
    Plan,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Coding => "coding",
            Intent::Debug => "debug",
            Intent::Workflow => "workflow",
            Intent::Explain => "explain",
            Intent::Chat => "chat",
            Intent::Plan => "plan",
        }
    }

    fn from_mode(mode: &str) -> Option<Self> {
        match mode.to_lowercase().as_str() {
            "coding" | "code" => Some(Intent::Coding),
            "debug" | "debugging" => Some(Intent::Debug),
            "workflow" => Some(Intent::Workflow),
            "explain" | "explanation" => Some(Intent::Explain),
            "chat" => Some(Intent::Chat),
            "plan" | "planning" => Some(Intent::Plan),
            _ => None,
        }
    }
}

/// Multi-word phrases checked before single words, in table order; the
/// first match wins (§4.10 step 2).
const KEYWORD_TABLE: &[(&str, Intent)] = &[
    ("fix this bug", Intent::Debug),
    ("fix the bug", Intent::Debug),
    ("what does", Intent::Explain),
    ("how does", Intent::Explain),
    ("tell me about", Intent::Explain),
    ("walk me through", Intent::Workflow),
    ("step by step", Intent::Workflow),
    ("make a plan", Intent::Plan),
    ("plan out", Intent::Plan),
    ("write a", Intent::Coding),
    ("implement", Intent::Coding),
    ("refactor", Intent::Coding),
    ("error", Intent::Debug),
    ("exception", Intent::Debug),
    ("traceback", Intent::Debug),
    ("crash", Intent::Debug),
    ("bug", Intent::Debug),
    ("workflow", Intent::Workflow),
    ("explain", Intent::Explain),
    ("describe", Intent::Explain),
    ("plan", Intent::Plan),
    ("code", Intent::Coding),
    ("function", Intent::Coding),
    ("class", Intent::Coding),
];

/// An explicit `mode` always wins over keyword detection; failing that,
/// the keyword table is scanned in order and the first hit decides.
/// Anything unmatched defaults to `chat`.
pub fn detect_intent(mode: Option<&str>, text: &str) -> Intent {
    if let Some(mode) = mode
        && let Some(intent) = Intent::from_mode(mode)
    {
        return intent;
    }

    let lower = text.to_lowercase();
    for (phrase, intent) in KEYWORD_TABLE {
        if lower.contains(phrase) {
            return *intent;
        }
    }
    Intent::Chat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_mode_wins_over_keywords() {
        let intent = detect_intent(Some("explain"), "fix this bug please");
        assert_eq!(intent, Intent::Explain);
    }

    #[test]
    fn multiword_phrase_checked_before_single_word() {
        let intent = detect_intent(None, "can you fix this bug in the parser");
        assert_eq!(intent, Intent::Debug);
    }

    #[test]
    fn unmatched_text_defaults_to_chat() {
        let intent = detect_intent(None, "good morning");
        assert_eq!(intent, Intent::Chat);
    }

    #[test]
    fn unknown_mode_falls_back_to_keyword_detection() {
        let intent = detect_intent(Some("not-a-real-mode"), "explain the orchestrator");
        assert_eq!(intent, Intent::Explain);
    }
}
