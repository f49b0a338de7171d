//! Finalization prompts and the marker-delimited JSON parser.
//!
//! Generated answers come back as prose with a structured block after a fixed
//! marker line, e.g.
//!
//! ```text
//! [SUMMARY]
//! ...
//! [OFFER_JSON]
//! { "offerName": "..." }
//! ```
//!
//! `extract_marked_json` never fails: a missing marker or unparsable block
//! yields an empty payload and the whole text as prose.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::memory::Profile;

pub const BOTTLENECK_MARKER: &str = "[BOTTLENECK_MAP_JSON]";
pub const OFFER_MARKER: &str = "[OFFER_JSON]";

pub const DIAGNOSIS_MAX_TOKENS: u32 = 1200;
pub const ROADMAP_MAX_TOKENS: u32 = 1600;
pub const OFFER_MAX_TOKENS: u32 = 1600;

pub const DIAGNOSIS_SYSTEM: &str =
    "You are diagnosing an agency/coaching business and summarizing their situation.";
pub const ROADMAP_SYSTEM: &str = "You are building a JSON roadmap only.";
pub const OFFER_SYSTEM: &str =
    "You are building a powerful offer for an agency/coaching business.";

fn answers_json(answers: &BTreeMap<String, String>) -> String {
    serde_json::to_string_pretty(answers).unwrap_or_else(|_| "{}".to_string())
}

pub fn intake_diagnosis_prompt(answers: &BTreeMap<String, String>) -> String {
    format!(
        "You are diagnosing an agency/coaching business.

Here are onboarding answers as key -> value JSON:

{answers}

1) Write a concise diagnosis summary (business, bottlenecks, opportunities).
2) Produce a bottleneck map JSON with keys: marketing, offer, sales, fulfillment, retention, mindset, hiring. Values: \"none\" | \"mild\" | \"moderate\" | \"severe\".
3) Recommend a starting path in 3-5 bullet points.

Return your answer as:

[SUMMARY]
...

{BOTTLENECK_MARKER}
{{ ... }}

[STARTING_PATH]
- ...",
        answers = answers_json(answers),
    )
}

pub fn roadmap_prompt(
    profile: &Profile,
    bottleneck_map: &Map<String, Value>,
    goal_timeline: &str,
) -> String {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_else(|_| "{}".to_string());
    let bottlenecks =
        serde_json::to_string_pretty(bottleneck_map).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are building a stage-based roadmap from 0 to $100k/month for this business.

User profile:
{profile_json}

Bottlenecks:
{bottlenecks}

Goal timeline: {goal_timeline}

Create 5 stages:
1) Validate offer & messaging
2) Consistent lead flow
3) Sales system
4) Delivery + retention
5) Team + hiring

For each stage, provide:
- id (e.g., \"stage-1\")
- name
- description
- objectives (3-6)
- tasks (5-10 actionable items)
- habits (3-5 habits)
- kpis (3-5 metrics)

Return ONLY valid JSON:

{{
  \"currentStageId\": \"stage-1\",
  \"stages\": [ ... ]
}}"
    )
}

pub fn offer_builder_prompt(answers: &BTreeMap<String, String>) -> String {
    format!(
        "You are designing a compelling, differentiated offer for an agency or coach.

Answers:
{answers}

Create:
- Offer name
- Core promise (one sentence)
- Unique mechanism
- Program structure (modules, calls, community, support)
- Guarantees (if appropriate)
- Backend systems required (CRM automations, onboarding, etc.)

Return as:

[SUMMARY]
...

{OFFER_MARKER}
{{
  \"offerName\": \"...\",
  \"avatar\": \"...\",
  \"problem\": \"...\",
  \"promise\": \"...\",
  \"pricePoint\": \"...\",
  \"uniqueMechanism\": \"...\",
  \"programStructure\": \"...\",
  \"guarantees\": \"...\",
  \"backendSystems\": \"...\"
}}",
        answers = answers_json(answers),
    )
}

/// Parsed generation output.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedJson {
    /// Everything except the marker and its JSON block, trimmed.
    pub prose: String,
    /// The JSON object after the marker, or empty.
    pub payload: Map<String, Value>,
    pub marker_found: bool,
    /// A JSON object was found after the marker and parsed.
    pub parsed: bool,
}

/// Byte range of the first balanced `{...}` in `text`. Braces inside JSON
/// strings are ignored.
pub fn first_json_object(text: &str) -> Option<(usize, usize)> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Drop a code fence opener left dangling before a JSON block.
fn strip_trailing_fence(text: &str) -> &str {
    let trimmed = text.trim_end();
    trimmed
        .strip_suffix("```json")
        .or_else(|| trimmed.strip_suffix("```"))
        .unwrap_or(trimmed)
}

fn strip_leading_fence(text: &str) -> &str {
    let trimmed = text.trim_start();
    trimmed.strip_prefix("```").unwrap_or(trimmed)
}

fn join_prose(before: &str, after: &str) -> String {
    let before = before.trim();
    let after = after.trim();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{before}\n\n{after}"),
    }
}

/// Split `text` at `marker` into prose and the JSON object that follows.
pub fn extract_marked_json(text: &str, marker: &str) -> MarkedJson {
    let Some(pos) = text.find(marker) else {
        return MarkedJson {
            prose: text.trim().to_string(),
            payload: Map::new(),
            marker_found: false,
            parsed: false,
        };
    };

    let before = &text[..pos];
    let after = &text[pos + marker.len()..];

    let parsed_block = first_json_object(after).and_then(|(start, end)| {
        match serde_json::from_str::<Value>(&after[start..end]) {
            Ok(Value::Object(map)) => Some((map, start, end)),
            _ => None,
        }
    });

    match parsed_block {
        Some((payload, start, end)) => {
            let lead = strip_trailing_fence(&after[..start]);
            let tail = strip_leading_fence(&after[end..]);
            MarkedJson {
                prose: join_prose(&join_prose(before, lead), tail),
                payload,
                marker_found: true,
                parsed: true,
            }
        }
        None => MarkedJson {
            prose: join_prose(before, after),
            payload: Map::new(),
            marker_found: true,
            parsed: false,
        },
    }
}

/// Coerce a payload field to text. Arrays are joined with ", ".
pub fn field_str(payload: &Map<String, Value>, key: &str) -> String {
    payload.get(key).map(value_text).unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => String::new(),
    }
}

/// Flatten a payload into `area -> severity` text pairs.
pub fn string_map(payload: &Map<String, Value>) -> BTreeMap<String, String> {
    payload
        .iter()
        .map(|(k, v)| (k.clone(), value_text(v)))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_with_json_and_trailing_prose() {
        let text = "[SUMMARY]\nStrong niche.\n\n[BOTTLENECK_MAP_JSON]\n{\"sales\": \"severe\", \"offer\": \"mild\"}\n\n[STARTING_PATH]\n- Fix sales";
        let parsed = extract_marked_json(text, BOTTLENECK_MARKER);
        assert!(parsed.marker_found && parsed.parsed);
        assert_eq!(parsed.payload["sales"], "severe");
        assert_eq!(
            parsed.prose,
            "[SUMMARY]\nStrong niche.\n\n[STARTING_PATH]\n- Fix sales"
        );
    }

    #[test]
    fn missing_marker_keeps_everything_as_prose() {
        let parsed = extract_marked_json("  Just a summary.  ", OFFER_MARKER);
        assert!(!parsed.marker_found);
        assert!(parsed.payload.is_empty());
        assert_eq!(parsed.prose, "Just a summary.");
    }

    #[test]
    fn malformed_json_degrades_to_empty() {
        let text = "Intro\n[OFFER_JSON]\n{\"offerName\": \"Scale\",, }";
        let parsed = extract_marked_json(text, OFFER_MARKER);
        assert!(parsed.marker_found);
        assert!(!parsed.parsed);
        assert!(parsed.payload.is_empty());
        assert!(parsed.prose.starts_with("Intro"));
    }

    #[test]
    fn fenced_block_is_unwrapped() {
        let text = "Summary here\n[OFFER_JSON]\n```json\n{\"offerName\": \"Clinic Engine\"}\n```\n";
        let parsed = extract_marked_json(text, OFFER_MARKER);
        assert!(parsed.parsed);
        assert_eq!(parsed.payload["offerName"], "Clinic Engine");
        assert_eq!(parsed.prose, "Summary here");
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_block() {
        let text = "[OFFER_JSON] {\"promise\": \"close {more} deals\", \"n\": {\"x\": 1}} done";
        let parsed = extract_marked_json(text, OFFER_MARKER);
        assert!(parsed.parsed);
        assert_eq!(parsed.payload["promise"], "close {more} deals");
        assert_eq!(parsed.prose, "done");
    }

    #[test]
    fn non_object_json_is_not_a_payload() {
        let parsed = extract_marked_json("[OFFER_JSON] [1, 2]", OFFER_MARKER);
        assert!(!parsed.parsed);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn first_json_object_finds_balanced_range() {
        let text = "noise {\"a\": {\"b\": \"}\"}} tail";
        let (start, end) = first_json_object(text).unwrap();
        assert_eq!(&text[start..end], "{\"a\": {\"b\": \"}\"}}");
        assert!(first_json_object("{ unterminated").is_none());
    }

    #[test]
    fn field_str_coerces_values() {
        let payload: Map<String, Value> = serde_json::from_str(
            r#"{"s": " x ", "n": 1997, "a": ["one", "two"], "o": {"k": 1}, "z": null}"#,
        )
        .unwrap();
        assert_eq!(field_str(&payload, "s"), "x");
        assert_eq!(field_str(&payload, "n"), "1997");
        assert_eq!(field_str(&payload, "a"), "one, two");
        assert_eq!(field_str(&payload, "o"), "");
        assert_eq!(field_str(&payload, "z"), "");
        assert_eq!(field_str(&payload, "missing"), "");
    }

    #[test]
    fn prompts_embed_answers_and_markers() {
        let mut answers = BTreeMap::new();
        answers.insert("niche".to_string(), "chiropractors".to_string());
        let intake = intake_diagnosis_prompt(&answers);
        assert!(intake.contains("\"niche\": \"chiropractors\""));
        assert!(intake.contains(BOTTLENECK_MARKER));

        let offer = offer_builder_prompt(&answers);
        assert!(offer.contains(OFFER_MARKER));
        assert!(offer.contains("\"uniqueMechanism\""));

        let roadmap = roadmap_prompt(&Profile::default(), &Map::new(), "100k by June");
        assert!(roadmap.contains("Goal timeline: 100k by June"));
        assert!(roadmap.contains("\"currentStageId\": \"stage-1\""));
    }
}
