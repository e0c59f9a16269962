use std::collections::HashSet;
use std::path::Path;

use validator::Validate;

use crate::schemas::first_validation_message;
use crate::services::exam_authoring::{ExamEdit, QuestionEdit};

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Validate)]
pub(crate) struct ExamDetailsInput {
    #[validate(length(min = 1, max = 255, message = "Room name must be between 1 and 255 characters"))]
    pub(crate) room_name: String,
    #[validate(range(min = 2000, max = 2100, message = "Year must be between 2000 and 2100"))]
    pub(crate) year: i32,
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1 and 600 minutes"))]
    pub(crate) duration_minutes: i32,
}

impl ExamDetailsInput {
    pub(crate) fn parse(room_name: &str, year: &str, duration: &str) -> Result<Self, String> {
        let details = Self {
            room_name: room_name.trim().to_string(),
            year: parse_number("Year", year)?,
            duration_minutes: parse_number("Duration", duration)?,
        };
        details.validate().map_err(|errors| first_validation_message(&errors))?;
        Ok(details)
    }
}

/// Text fields of the exam upload form.
#[derive(Debug, Default)]
pub(crate) struct ExamUploadFields {
    pub(crate) room_name: String,
    pub(crate) year: String,
    pub(crate) duration: String,
    pub(crate) quantity: String,
}

impl ExamUploadFields {
    pub(crate) fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "room_name" => &mut self.room_name,
            "year" => &mut self.year,
            "duration" => &mut self.duration,
            "quantity" => &mut self.quantity,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub(crate) fn validate(&self, max_questions: u32) -> Result<(ExamDetailsInput, u32), String> {
        let details = ExamDetailsInput::parse(&self.room_name, &self.year, &self.duration)?;
        let quantity: u32 = parse_number("Number of questions", &self.quantity)?;
        if quantity == 0 || quantity > max_questions {
            return Err(format!("Number of questions must be between 1 and {max_questions}"));
        }
        Ok((details, quantity))
    }
}

/// Parses the edit form: exam details plus `qa_ids` with matching
/// `question_<id>` and `answer_<id>` fields.
pub(crate) fn parse_exam_edit(pairs: &[(String, String)]) -> Result<ExamEdit, String> {
    let field = |name: &str| {
        pairs.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str()).unwrap_or("")
    };

    let details = ExamDetailsInput::parse(field("room_name"), field("year"), field("duration"))?;

    let mut seen = HashSet::new();
    let mut questions = Vec::new();
    for (_, id) in pairs.iter().filter(|(key, _)| key == "qa_ids") {
        let id = id.trim();
        if id.is_empty() || !seen.insert(id.to_string()) {
            continue;
        }

        let question = field(&format!("question_{id}")).trim();
        let correct_answer = field(&format!("answer_{id}")).trim();
        if question.is_empty() || correct_answer.is_empty() {
            return Err("Questions and answers cannot be empty".to_string());
        }

        questions.push(QuestionEdit {
            id: id.to_string(),
            question: question.to_string(),
            correct_answer: correct_answer.to_string(),
        });
    }

    Ok(ExamEdit {
        room_name: details.room_name,
        year: details.year,
        duration_minutes: details.duration_minutes,
        questions,
    })
}

/// Accepts a non-empty upload that starts like a PDF and is named or typed as one.
pub(crate) fn validate_pdf_upload(
    filename: Option<&str>,
    content_type: Option<&str>,
    data: &[u8],
) -> Result<(), String> {
    if data.is_empty() {
        return Err("Please choose a PDF file".to_string());
    }

    let has_pdf_extension = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let has_pdf_type = content_type
        .map(|mime| mime.trim().to_ascii_lowercase())
        .is_some_and(|mime| mime == "application/pdf");

    if !(has_pdf_extension || has_pdf_type) {
        return Err("Only PDF files are accepted".to_string());
    }

    if !data.starts_with(PDF_MAGIC) {
        return Err("The uploaded file is not a valid PDF".to_string());
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(label: &str, raw: &str) -> Result<T, String> {
    raw.trim().parse().map_err(|_| format!("{label} must be a whole number"))
}
