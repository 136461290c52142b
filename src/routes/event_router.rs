/// Custom ids carried by buttons and modals.
pub const START_RECRUITMENT_PREFIX: &str = "start_recruitment_";
pub const VALIDATE_RECRUIT_PREFIX: &str = "validate_recruit_";
pub const OPEN_HANDLE_MODAL: &str = "open_handle_modal";
pub const HANDLE_INPUT_MODAL: &str = "handle_input_modal";
pub const HANDLE_INPUT_FIELD: &str = "handle_input";

pub const RECRUIT_COMMAND: &str = "recruit";

/// What an inbound custom id asks the bot to do. Application ids stay opaque
/// strings here; resolving them is the store's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    StartRecruitment(String),
    ValidateRecruit(String),
    OpenHandleModal,
    HandleInputModal,
}

impl Action {
    pub fn parse(custom_id: &str) -> Option<Action> {
        if let Some(id) = custom_id.strip_prefix(START_RECRUITMENT_PREFIX) {
            return Some(Action::StartRecruitment(id.to_string()));
        }
        if let Some(id) = custom_id.strip_prefix(VALIDATE_RECRUIT_PREFIX) {
            return Some(Action::ValidateRecruit(id.to_string()));
        }
        match custom_id {
            OPEN_HANDLE_MODAL => Some(Action::OpenHandleModal),
            HANDLE_INPUT_MODAL => Some(Action::HandleInputModal),
            _ => None,
        }
    }

    pub fn custom_id(&self) -> String {
        match self {
            Action::StartRecruitment(id) => format!("{}{}", START_RECRUITMENT_PREFIX, id),
            Action::ValidateRecruit(id) => format!("{}{}", VALIDATE_RECRUIT_PREFIX, id),
            Action::OpenHandleModal => OPEN_HANDLE_MODAL.to_string(),
            Action::HandleInputModal => HANDLE_INPUT_MODAL.to_string(),
        }
    }
}
