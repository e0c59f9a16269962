use crate::services::exam_attempts::AnswerMap;

/// Collects `answers[<question id>]` fields. The first value for an id wins.
pub(crate) fn answers_from_pairs(pairs: &[(String, String)]) -> AnswerMap {
    let mut answers = AnswerMap::new();
    for (name, value) in pairs {
        let Some(question_id) = answer_field_id(name) else {
            continue;
        };
        answers.entry(question_id.to_string()).or_insert_with(|| value.clone());
    }
    answers
}

fn answer_field_id(name: &str) -> Option<&str> {
    let id = name.strip_prefix("answers[")?.strip_suffix(']')?.trim();
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn picks_answer_fields_only() {
        let answers = answers_from_pairs(&pairs(&[
            ("answers[q1]", "Paris"),
            ("answers[q2]", ""),
            ("answers[]", "ignored"),
            ("answers", "ignored"),
            ("csrf", "x"),
        ]));

        assert_eq!(answers.len(), 2);
        assert_eq!(answers["q1"], "Paris");
        assert_eq!(answers["q2"], "");
    }

    #[test]
    fn first_value_wins_for_repeated_ids() {
        let answers =
            answers_from_pairs(&pairs(&[("answers[q1]", "first"), ("answers[q1]", "second")]));
        assert_eq!(answers["q1"], "first");
    }
}
