//! Interaction turns: the learner replies to a written or spoken prompt.
//!
//! - `interaction_v1.free_reply_turn` takes a typed reply (`{"text"}`).
//! - `interaction_v1.respond_to_prompt` plays audio and takes a transcript
//!   of the spoken reply (`{"transcript"}`).
//!
//! Both score the reply the same way:
//! - empty reply → 0.0
//! - no target keywords → 0.7 for having replied
//! - otherwise `0.4 + 0.6 · hits / keywords`, one concept result per keyword
//!
//! A reply is correct only with full marks, so it needs target keywords and
//! must hit all of them.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{hits, normalize_answer, presence_results, word_count};
use crate::model::{
    ConceptId, ConceptResult, EvaluationResult, ExerciseType, RawCandidate, Submission,
};

const REPLY_CREDIT: f64 = 0.7;
const KEYWORD_BASE: f64 = 0.4;
const KEYWORD_WEIGHT: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetKeyword {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<ConceptId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeReplyPayload {
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_keywords: Vec<TargetKeyword>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondToPromptPayload {
    pub audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target_keywords: Vec<TargetKeyword>,
}

#[derive(Debug, Deserialize)]
struct TextReply {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct SpokenReply {
    #[serde(default)]
    transcript: String,
}

fn target_keywords(fields: &Fields<'_>) -> Result<Vec<TargetKeyword>> {
    let keywords: Vec<TargetKeyword> = fields.optional("targetKeywords")?.unwrap_or_default();
    if keywords.iter().any(|k| k.keyword.trim().is_empty()) {
        return Err(fields.malformed("targetKeywords", "keywords must not be empty"));
    }
    Ok(keywords)
}

pub fn construct_free_reply(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::INTERACTION_FREE_REPLY_TURN, raw)?;

    let prompt = fields.non_empty_string("prompt")?;
    let target_keywords = target_keywords(&fields)?;

    Ok(PracticeItem::new(
        base,
        ItemPayload::FreeReply(FreeReplyPayload {
            prompt,
            target_keywords,
        }),
    ))
}

pub fn construct_respond_to_prompt(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::INTERACTION_RESPOND_TO_PROMPT, raw)?;

    let audio_url = fields.non_empty_string("audioUrl")?;
    let prompt_text: Option<String> = fields.optional("promptText")?;
    let target_keywords = target_keywords(&fields)?;

    Ok(PracticeItem::new(
        base,
        ItemPayload::RespondToPrompt(RespondToPromptPayload {
            audio_url,
            prompt_text,
            target_keywords,
        }),
    ))
}

pub fn evaluate_free_reply(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::FreeReply(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::INTERACTION_FREE_REPLY_TURN));
    };
    let reply: TextReply = parse_submission(item, submission)?;
    Ok(score_reply(item, &payload.target_keywords, &reply.text))
}

pub fn evaluate_respond_to_prompt(
    item: &PracticeItem,
    submission: &Submission,
) -> Result<EvaluationResult> {
    let ItemPayload::RespondToPrompt(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::INTERACTION_RESPOND_TO_PROMPT));
    };
    let reply: SpokenReply = parse_submission(item, submission)?;
    Ok(score_reply(item, &payload.target_keywords, &reply.transcript))
}

fn score_reply(item: &PracticeItem, keywords: &[TargetKeyword], reply: &str) -> EvaluationResult {
    let response = normalize_answer(reply);

    let (score, concept_results): (f64, Vec<ConceptResult>) = if keywords.is_empty() {
        let score = if response.is_empty() { 0.0 } else { REPLY_CREDIT };
        let evidence = json!({ "responseLength": response.chars().count() });
        (score, item.uniform_concept_results(score, false, evidence))
    } else {
        let results = presence_results(
            item,
            keywords.iter().map(|k| (k.keyword.as_str(), k.concept_id)),
            &response,
            "keyword",
        );
        let score = if response.is_empty() {
            0.0
        } else {
            KEYWORD_BASE + KEYWORD_WEIGHT * hits(&results) as f64 / keywords.len() as f64
        };
        (score.min(1.0), results)
    };

    let is_correct = score >= 1.0;
    let feedback = if response.is_empty() {
        "No reply given.".to_string()
    } else if keywords.is_empty() {
        format!("Reply received ({} words).", word_count(&response))
    } else {
        format!(
            "Used {} of {} target keyword(s).",
            hits(&concept_results),
            keywords.len()
        )
    };

    item.evaluation(score, is_correct, concept_results, feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn free_reply() -> Value {
        json!({
            "type": "interaction_v1.free_reply_turn",
            "mode": "interaction",
            "skills": ["writing"],
            "conceptIds": [20],
            "prompt": "Где ты живёшь?",
            "targetKeywords": [
                {"keyword": "живу", "conceptId": 21},
                {"keyword": "городе"}
            ]
        })
    }

    fn respond_to_prompt() -> Value {
        json!({
            "type": "interaction_v1.respond_to_prompt",
            "mode": "interaction",
            "skills": ["listening", "speaking"],
            "conceptIds": [30, 31],
            "audioUrl": "https://cdn.example.org/a1/question.mp3",
            "promptText": "Как тебя зовут?"
        })
    }

    #[test]
    fn all_keywords_make_a_correct_reply() {
        let item = construct_free_reply(&free_reply()).unwrap();
        let result =
            evaluate_free_reply(&item, &json!({"text": "Я живу в большом городе"})).unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.is_correct);
        let ids: Vec<_> = result.concept_results.iter().map(|c| c.concept_id).collect();
        assert_eq!(ids, vec![21, 20]);
        assert_eq!(result.concept_results[0].evidence["keyword"], "живу");
    }

    #[test]
    fn partial_keywords_score_between_base_and_full() {
        let item = construct_free_reply(&free_reply()).unwrap();
        let result = evaluate_free_reply(&item, &json!({"text": "Я живу там"})).unwrap();
        assert!((result.score - 0.7).abs() < 1e-9);
        assert!(!result.is_correct);
        assert!(result.concept_results[0].is_correct);
        assert!(!result.concept_results[1].is_correct);
        assert_eq!(result.feedback, "Used 1 of 2 target keyword(s).");
    }

    #[test]
    fn empty_reply_scores_zero() {
        let item = construct_free_reply(&free_reply()).unwrap();
        let result = evaluate_free_reply(&item, &json!({"text": "   "})).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.concept_results.len(), 2);
        assert!(result.concept_results.iter().all(|c| c.score == 0.0));
    }

    #[test]
    fn reply_without_keywords_gets_flat_credit() {
        let item = construct_respond_to_prompt(&respond_to_prompt()).unwrap();
        let result =
            evaluate_respond_to_prompt(&item, &json!({"transcript": "Меня зовут Анна"})).unwrap();
        assert_eq!(result.score, REPLY_CREDIT);
        assert!(!result.is_correct);
        assert_eq!(result.concept_results.len(), 2);
        assert_eq!(result.concept_results[1].evidence["responseLength"], 15);
        assert_eq!(result.feedback, "Reply received (3 words).");
    }

    #[test]
    fn missing_reply_field_is_an_empty_reply() {
        let item = construct_respond_to_prompt(&respond_to_prompt()).unwrap();
        let result = evaluate_respond_to_prompt(&item, &json!({})).unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.feedback, "No reply given.");
    }

    #[test]
    fn rejects_blank_keywords_and_audio() {
        let mut raw = free_reply();
        raw["targetKeywords"][1]["keyword"] = json!(" ");
        assert_eq!(
            construct_free_reply(&raw).unwrap_err().field(),
            Some("targetKeywords")
        );

        let mut raw = respond_to_prompt();
        raw.as_object_mut().unwrap().remove("audioUrl");
        assert_eq!(
            construct_respond_to_prompt(&raw).unwrap_err().field(),
            Some("audioUrl")
        );
    }

    #[test]
    fn evaluators_reject_each_others_items() {
        let free = construct_free_reply(&free_reply()).unwrap();
        let spoken = construct_respond_to_prompt(&respond_to_prompt()).unwrap();
        assert!(evaluate_respond_to_prompt(&free, &json!({"transcript": "x"})).is_err());
        assert!(evaluate_free_reply(&spoken, &json!({"text": "x"})).is_err());
    }
}
