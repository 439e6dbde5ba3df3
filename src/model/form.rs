use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

/// Field-level validation messages, rendered next to the offending input.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormErrors {
    pub errors: Vec<ValidationFieldError>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationFieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// First message for `field`, or an empty string.
    pub fn get(&self, field: &str) -> &str {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, current: &str) -> Self {
        let value = value.into();
        let selected = value == current;
        Self { value, label: label.into(), selected }
    }
}

/// Reads a string with surrounding whitespace removed and bounds its length.
pub fn required_text(errors: &mut FormErrors, field: &str, value: &str, max_chars: Option<usize>) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else if let Some(max) = max_chars {
        if value.chars().count() > max {
            errors.add(field, &format!("Ensure this value has at most {max} characters."));
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_return_first_message() {
        let mut errors = FormErrors::default();
        errors.add("title", "This field is required.");
        errors.add("title", "second");
        assert!(errors.has("title"));
        assert!(!errors.has("description"));
        assert_eq!(errors.get("title"), "This field is required.");
        assert_eq!(errors.get("description"), "");
    }

    #[test]
    fn required_text_checks_blank_and_length() {
        let mut errors = FormErrors::default();
        assert_eq!(required_text(&mut errors, "a", "  hi ", Some(5)), "hi");
        assert!(errors.is_empty());

        required_text(&mut errors, "b", "   ", None);
        required_text(&mut errors, "c", "toolong", Some(3));
        assert!(errors.has("b"));
        assert_eq!(errors.get("c"), "Ensure this value has at most 3 characters.");
    }
}
