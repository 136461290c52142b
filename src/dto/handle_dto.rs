use serde::Deserialize;
use validator::Validate;

/// Text field of the `handle_input_modal`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HandleSubmission {
    #[validate(length(min = 3, max = 50))]
    pub handle: String,
}

impl HandleSubmission {
    pub fn new(raw: &str) -> Self {
        Self {
            handle: raw.trim().to_string(),
        }
    }
}
