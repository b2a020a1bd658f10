//! `matching_v1.audio_to_text`: match each audio clip to a written option.
//!
//! Scoring: fraction of clips matched to their expected option. Each clip is
//! attributed to its own `conceptId`, or to the item's first concept.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{fraction_correct, rollup_by_concept, Mark};
use crate::model::{ConceptId, EvaluationResult, ExerciseType, RawCandidate, Submission};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioClip {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<ConceptId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMatchingPayload {
    pub audio_url: String,
    pub clips: Vec<AudioClip>,
    pub options: Vec<TextOption>,
    /// Clip id → option id.
    pub correct_matches: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AudioMatchingSubmission {
    matches: HashMap<String, String>,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::MATCHING_AUDIO_TO_TEXT, raw)?;

    let audio_url = fields.non_empty_string("audioUrl")?;
    let clips: Vec<AudioClip> = fields.non_empty_vec("clips")?;
    let options: Vec<TextOption> = fields.non_empty_vec("options")?;
    let correct_matches: BTreeMap<String, String> = fields.required("correctMatches")?;

    let option_ids: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
    let mut clip_ids = HashSet::new();
    for clip in &clips {
        if !clip_ids.insert(clip.id.as_str()) {
            return Err(fields.malformed("clips", format!("duplicate id \"{}\"", clip.id)));
        }
        match correct_matches.get(&clip.id) {
            None => {
                return Err(fields.malformed(
                    "correctMatches",
                    format!("no option given for clip \"{}\"", clip.id),
                ))
            }
            Some(target) if !option_ids.contains(target.as_str()) => {
                return Err(fields.malformed(
                    "correctMatches",
                    format!("clip \"{}\" maps to unknown option \"{target}\"", clip.id),
                ))
            }
            Some(_) => {}
        }
    }

    Ok(PracticeItem::new(
        base,
        ItemPayload::AudioMatching(AudioMatchingPayload {
            audio_url,
            clips,
            options,
            correct_matches,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::AudioMatching(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::MATCHING_AUDIO_TO_TEXT));
    };
    let submission: AudioMatchingSubmission = parse_submission(item, submission)?;

    let marks: Vec<Mark> = payload
        .clips
        .iter()
        .map(|clip| {
            let expected = payload.correct_matches.get(&clip.id);
            let actual = submission.matches.get(&clip.id);
            Mark {
                concept_id: clip.concept_id.unwrap_or_else(|| item.primary_concept()),
                correct: expected.is_some() && actual == expected,
                evidence: json!({
                    "clipId": clip.id,
                    "expected": expected,
                    "actual": actual,
                }),
            }
        })
        .collect();

    let score = fraction_correct(&marks);
    let is_correct = score == 1.0;

    Ok(item.evaluation(
        score,
        is_correct,
        rollup_by_concept(marks),
        if is_correct {
            "All matches correct."
        } else {
            "Some matches incorrect."
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw() -> Value {
        json!({
            "type": "matching_v1.audio_to_text",
            "mode": "reception",
            "skills": ["listening"],
            "conceptIds": [5],
            "audioUrl": "https://cdn.example.org/a1/station.mp3",
            "clips": [
                {"id": "c1", "label": "Clip 1", "conceptId": 51},
                {"id": "c2"},
                {"id": "c3", "conceptId": 51}
            ],
            "options": [
                {"id": "o1", "text": "вокзал"},
                {"id": "o2", "text": "билет"},
                {"id": "o3", "text": "поезд"}
            ],
            "correctMatches": {"c1": "o1", "c2": "o2", "c3": "o3"}
        })
    }

    #[test]
    fn rolls_clips_up_by_concept() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(
            &item,
            &json!({"matches": {"c1": "o1", "c2": "o2", "c3": "o1"}}),
        )
        .unwrap();
        assert!((result.score - 2.0 / 3.0).abs() < 1e-9);
        assert!(!result.is_correct);
        assert_eq!(result.feedback, "Some matches incorrect.");

        assert_eq!(result.concept_results.len(), 2);
        assert_eq!(result.concept_results[0].concept_id, 51);
        assert_eq!(result.concept_results[0].score, 1.0);
        assert_eq!(result.concept_results[0].max_score, 2.0);
        assert_eq!(result.concept_results[1].concept_id, 5);
        assert!(result.concept_results[1].is_correct);
    }

    #[test]
    fn unanswered_clip_is_wrong() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"matches": {"c1": "o1", "c2": "o2"}})).unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.concept_results[0].evidence[1]["actual"], Value::Null);
    }

    #[test]
    fn every_clip_needs_a_known_option() {
        let mut raw1 = raw();
        raw1["correctMatches"] = json!({"c1": "o1", "c2": "o2"});
        assert_eq!(construct(&raw1).unwrap_err().field(), Some("correctMatches"));

        let mut raw2 = raw();
        raw2["correctMatches"]["c3"] = json!("o9");
        assert_eq!(construct(&raw2).unwrap_err().field(), Some("correctMatches"));

        let mut raw3 = raw();
        raw3["audioUrl"] = json!("  ");
        assert_eq!(construct(&raw3).unwrap_err().field(), Some("audioUrl"));
    }

    #[test]
    fn matches_must_be_a_map() {
        let item = construct(&raw()).unwrap();
        assert!(evaluate(&item, &json!({"matches": ["o1", "o2"]})).is_err());
    }
}
