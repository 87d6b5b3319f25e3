use crate::error::ValidationError;
use crate::task::{CreateTaskRequest, Task, UpdateTaskRequest};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

// Lengths count Unicode scalar values, not bytes.
fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn is_valid_title(title: &str) -> bool {
    validate_title(title).is_ok()
}

pub fn is_valid_description(description: &str) -> bool {
    validate_description(description).is_ok()
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    if char_len(title) > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if char_len(description) > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong {
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Create/edit form state with live per-field feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub title_error: Option<ValidationError>,
    pub description_error: Option<ValidationError>,
}

impl TaskForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_task(task: &Task) -> Self {
        let mut form = Self {
            title: task.title.clone(),
            description: task.description.clone(),
            ..Self::default()
        };
        form.revalidate();
        form
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.title_error = validate_title(&self.title).err();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.description_error = validate_description(&self.description).err();
    }

    pub fn revalidate(&mut self) {
        self.title_error = validate_title(&self.title).err();
        self.description_error = validate_description(&self.description).err();
    }

    pub fn is_valid(&self) -> bool {
        validate_title(&self.title).is_ok() && validate_description(&self.description).is_ok()
    }

    pub fn to_create_request(&self) -> Result<CreateTaskRequest, ValidationError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        let description = self.description.trim();
        Ok(CreateTaskRequest {
            title: self.title.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        })
    }

    /// Builds a partial update carrying only the fields that differ from `original`.
    pub fn to_update_request(&self, original: &Task) -> Result<UpdateTaskRequest, ValidationError> {
        validate_title(&self.title)?;
        validate_description(&self.description)?;
        let title = self.title.trim();
        let description = self.description.trim();
        Ok(UpdateTaskRequest {
            title: (title != original.title).then(|| title.to_string()),
            description: (description != original.description).then(|| description.to_string()),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_rules() {
        assert!(is_valid_title("Buy milk"));
        assert!(!is_valid_title(""));
        assert!(!is_valid_title("   \t"));
        assert!(is_valid_title(&"a".repeat(200)));
        assert!(!is_valid_title(&"a".repeat(201)));
        // Surrounding whitespace still counts toward the limit.
        assert!(!is_valid_title(&format!(" {}", "a".repeat(200))));
    }

    #[test]
    fn title_length_counts_characters() {
        assert!(is_valid_title(&"é".repeat(200)));
        assert!(!is_valid_title(&"é".repeat(201)));
    }

    #[test]
    fn description_rules() {
        assert!(is_valid_description(""));
        assert!(is_valid_description(&"x".repeat(1000)));
        assert!(!is_valid_description(&"x".repeat(1001)));
    }

    #[test]
    fn validators_agree_with_predicate_definition() {
        let samples = ["", " ", "a", " a ", "\n", "hello world"];
        for s in samples {
            let expected = !s.trim().is_empty() && s.chars().count() <= 200;
            assert_eq!(is_valid_title(s), expected, "{s:?}");
            assert_eq!(is_valid_description(s), s.chars().count() <= 1000);
        }
    }

    #[test]
    fn form_revalidates_on_each_keystroke() {
        let mut form = TaskForm::new();
        form.set_title("");
        assert_eq!(form.title_error, Some(ValidationError::TitleRequired));
        form.set_title("B");
        assert_eq!(form.title_error, None);
        form.set_description("d".repeat(1001));
        assert_eq!(
            form.description_error,
            Some(ValidationError::DescriptionTooLong { max: 1000 })
        );
        assert!(!form.is_valid());
    }

    #[test]
    fn create_request_omits_empty_description() {
        let mut form = TaskForm::new();
        form.set_title("  Buy milk ");
        let req = form.to_create_request().unwrap();
        assert_eq!(req.title, "Buy milk");
        assert_eq!(req.description, None);
    }

    #[test]
    fn create_request_rejects_blank_title() {
        let form = TaskForm::new();
        assert_eq!(form.to_create_request(), Err(ValidationError::TitleRequired));
    }
}
