//! `mediation_v1.translate_sentence`: translate one sentence.
//!
//! Scoring (heuristic):
//! - empty translation → 0.0
//! - normalised match with an accepted translation → 1.0, correct
//! - otherwise with required tokens → fraction present, capped at 0.95
//! - otherwise → 0.6 attempt credit
//!
//! Required tokens each yield their own concept result; without them every
//! concept receives the overall score.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Result;
use crate::item::{parse_submission, Fields, ItemBase, ItemPayload, PracticeItem};
use crate::items::{hits, normalize_answer, presence_results};
use crate::model::{ConceptId, EvaluationResult, ExerciseType, RawCandidate, Submission};

const TOKEN_SCORE_CAP: f64 = 0.95;
const ATTEMPT_CREDIT: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredToken {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<ConceptId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatePayload {
    pub source_sentence: String,
    pub accepted_translations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_tokens: Vec<RequiredToken>,
}

#[derive(Debug, Deserialize)]
struct TranslationSubmission {
    #[serde(default)]
    text: String,
}

pub fn construct(raw: &RawCandidate) -> Result<PracticeItem> {
    let base = ItemBase::parse(raw)?;
    let fields = Fields::of(ExerciseType::MEDIATION_TRANSLATE_SENTENCE, raw)?;

    let source_sentence = fields.non_empty_string("sourceSentence")?;
    let accepted_translations: Vec<String> = fields.non_empty_vec("acceptedTranslations")?;
    if accepted_translations.iter().all(|t| t.trim().is_empty()) {
        return Err(fields.malformed("acceptedTranslations", "needs a non-empty translation"));
    }
    let required_tokens: Vec<RequiredToken> =
        fields.optional("requiredTokens")?.unwrap_or_default();
    if required_tokens.iter().any(|t| t.token.trim().is_empty()) {
        return Err(fields.malformed("requiredTokens", "tokens must not be empty"));
    }

    Ok(PracticeItem::new(
        base,
        ItemPayload::Translate(TranslatePayload {
            source_sentence,
            accepted_translations,
            required_tokens,
        }),
    ))
}

pub fn evaluate(item: &PracticeItem, submission: &Submission) -> Result<EvaluationResult> {
    let ItemPayload::Translate(payload) = item.payload() else {
        return Err(item.payload_mismatch(ExerciseType::MEDIATION_TRANSLATE_SENTENCE));
    };
    let submission: TranslationSubmission = parse_submission(item, submission)?;
    let response = normalize_answer(&submission.text);

    let token_results = presence_results(
        item,
        payload
            .required_tokens
            .iter()
            .map(|t| (t.token.as_str(), t.concept_id)),
        &response,
        "token",
    );

    let accepted = !response.is_empty()
        && payload
            .accepted_translations
            .iter()
            .any(|t| normalize_answer(t) == response);
    let score = if response.is_empty() {
        0.0
    } else if accepted {
        1.0
    } else if !token_results.is_empty() {
        (hits(&token_results) as f64 / token_results.len() as f64).min(TOKEN_SCORE_CAP)
    } else {
        ATTEMPT_CREDIT
    };

    let concept_results = if token_results.is_empty() {
        item.uniform_concept_results(score, accepted, json!({ "response": response }))
    } else {
        token_results
    };

    let feedback = if accepted {
        "Accepted translation."
    } else if response.is_empty() {
        "No translation given."
    } else {
        "Translation differs from the accepted ones."
    };

    Ok(item.evaluation(score, accepted, concept_results, feedback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw() -> Value {
        json!({
            "type": "mediation_v1.translate_sentence",
            "mode": "mediation",
            "skills": ["reading", "writing"],
            "conceptIds": [60],
            "sourceSentence": "Я иду в магазин.",
            "acceptedTranslations": ["I am going to the shop", "I'm going to the store"],
            "requiredTokens": [
                {"token": "going", "conceptId": 61},
                {"token": "shop"}
            ]
        })
    }

    #[test]
    fn accepted_translation_is_correct() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"text": "I'm going to the STORE "})).unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.is_correct);
        assert_eq!(result.feedback, "Accepted translation.");
        // "shop" is absent from the accepted variant used
        assert!(result.concept_results[0].is_correct);
        assert!(!result.concept_results[1].is_correct);
    }

    #[test]
    fn tokens_give_capped_partial_credit() {
        let item = construct(&raw()).unwrap();
        let result = evaluate(&item, &json!({"text": "I go to the shop"})).unwrap();
        assert_eq!(result.score, 0.5);
        assert!(!result.is_correct);
        let ids: Vec<_> = result.concept_results.iter().map(|c| c.concept_id).collect();
        assert_eq!(ids, vec![61, 60]);
        assert_eq!(result.concept_results[1].evidence["token"], "shop");

        let both = evaluate(&item, &json!({"text": "going to shop"})).unwrap();
        assert_eq!(both.score, TOKEN_SCORE_CAP);
        assert!(!both.is_correct);
    }

    #[test]
    fn attempt_credit_without_tokens() {
        let mut raw = raw();
        raw.as_object_mut().unwrap().remove("requiredTokens");
        let item = construct(&raw).unwrap();
        let result = evaluate(&item, &json!({"text": "I walk to a market"})).unwrap();
        assert_eq!(result.score, ATTEMPT_CREDIT);
        assert_eq!(result.concept_results.len(), 1);
        assert_eq!(
            result.concept_results[0].evidence["response"],
            "i walk to a market"
        );

        let empty = evaluate(&item, &json!({"text": ""})).unwrap();
        assert_eq!(empty.score, 0.0);
        assert_eq!(empty.feedback, "No translation given.");
    }

    #[test]
    fn needs_accepted_translations() {
        let mut raw1 = raw();
        raw1["acceptedTranslations"] = json!([]);
        assert_eq!(
            construct(&raw1).unwrap_err().field(),
            Some("acceptedTranslations")
        );

        let mut raw2 = raw();
        raw2["requiredTokens"][0]["token"] = json!("");
        assert_eq!(construct(&raw2).unwrap_err().field(), Some("requiredTokens"));
    }
}
