/// Response classifier.
///
/// The generation model is prompted for free text, not structured output.
/// This module reverse-engineers presentation intent from surface patterns so
/// the frontend can render richer widgets without changing the prompt
/// contract. Rules run as an ordered decision list — the patterns are not
/// mutually exclusive (a checklist can mention a scenario name), so checklist
/// detection takes priority over scenario detection, which takes priority
/// over the generic fallback. Classification never fails: the last rule
/// always matches.
use std::sync::LazyLock;

use regex::Regex;

use crate::api::{StructuredResponse, CORPUS_SOURCE};

const DEFAULT_CHECKLIST_TITLE: &str = "Care Checklist";
const SCENARIO_TITLE: &str = "Caregiving Scenario";

/// Illustrative caregiver names used in WHO iSupport worked examples. Their
/// presence is a heuristic signal that the text is a scenario narrative.
/// Treated as data: extend the list here, not the matching logic.
const SCENARIO_NAMES: &[&str] = &["Shang", "Meena", "Juan", "Bikram", "Ali", "Olivia", "Jacob"];

static NUMBERED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*)$").expect("valid regex"));
static BOLD_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\s*(.*?)\s*\*\*").expect("valid regex"));
static SENTENCE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z].+\.$").expect("valid regex"));
static SCENARIO_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b({})\b", SCENARIO_NAMES.join("|"))).expect("valid regex")
});
static QUIZ_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(a\)|\(b\)|\(c\)|\(d\)").expect("valid regex"));

type Rule = fn(&str) -> Option<StructuredResponse>;

/// The decision list. Order is load-bearing; first matching rule wins.
const RULES: &[Rule] = &[
    numbered_checklist,
    keyword_checklist,
    named_scenario,
    advisory_tip,
    multiple_choice_quiz,
];

/// Classify raw generated English text into exactly one structured response.
pub fn classify(raw_text: &str) -> StructuredResponse {
    RULES
        .iter()
        .find_map(|rule| rule(raw_text))
        .unwrap_or_else(|| StructuredResponse::text(raw_text))
}

/// Rule 1: one or more `"<newline><integer>. <content>"` items.
///
/// An item runs until the next numbered line or end of text; embedded
/// newlines are flattened to spaces. The title comes from the first
/// `**bolded**` span, if any. A numbered line at the very start of the text
/// does not count — the pattern requires a preceding newline.
fn numbered_checklist(raw_text: &str) -> Option<StructuredResponse> {
    let mut items: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for (i, line) in raw_text.lines().enumerate() {
        if i > 0 {
            if let Some(caps) = NUMBERED_LINE_RE.captures(line) {
                if let Some(prev) = current.take() {
                    items.push(prev.trim().to_string());
                }
                current = Some(caps[1].to_string());
                continue;
            }
        }
        if let Some(item) = current.as_mut() {
            item.push(' ');
            item.push_str(line);
        }
    }
    if let Some(last) = current.take() {
        items.push(last.trim().to_string());
    }

    if items.is_empty() {
        return None;
    }

    let title = BOLD_TITLE_RE
        .captures(raw_text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| DEFAULT_CHECKLIST_TITLE.to_string());

    Some(StructuredResponse::Checklist {
        title,
        items,
        source: CORPUS_SOURCE.to_string(),
    })
}

/// Rule 2: the text announces a checklist without numbering. Collect bullet
/// lines and capitalized full sentences, keeping only lines longer than 10
/// characters.
fn keyword_checklist(raw_text: &str) -> Option<StructuredResponse> {
    if !raw_text.contains("Checklist") {
        return None;
    }

    let items: Vec<String> = raw_text
        .lines()
        .map(str::trim)
        .filter(|line| {
            (line.starts_with('-') || line.starts_with('\u{2022}') || SENTENCE_LINE_RE.is_match(line))
                && line.chars().count() > 10
        })
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return None;
    }

    Some(StructuredResponse::Checklist {
        title: DEFAULT_CHECKLIST_TITLE.to_string(),
        items,
        source: CORPUS_SOURCE.to_string(),
    })
}

/// Rule 3: a known illustrative caregiver name signals a worked-example
/// scenario.
fn named_scenario(raw_text: &str) -> Option<StructuredResponse> {
    if !SCENARIO_NAME_RE.is_match(raw_text) {
        return None;
    }
    Some(StructuredResponse::Case {
        title: SCENARIO_TITLE.to_string(),
        content: raw_text.to_string(),
        source: CORPUS_SOURCE.to_string(),
    })
}

/// Rule 4: advisory phrasing.
fn advisory_tip(raw_text: &str) -> Option<StructuredResponse> {
    let lowered = raw_text.to_lowercase();
    if !lowered.starts_with("keep in mind") && !lowered.contains("tip:") {
        return None;
    }
    Some(StructuredResponse::Tip {
        content: raw_text.to_string(),
        source: CORPUS_SOURCE.to_string(),
    })
}

/// Rule 5: multiple-choice markers.
fn multiple_choice_quiz(raw_text: &str) -> Option<StructuredResponse> {
    if !QUIZ_MARKER_RE.is_match(raw_text) {
        return None;
    }
    Some(StructuredResponse::Quiz {
        content: raw_text.to_string(),
        source: CORPUS_SOURCE.to_string(),
    })
}
