use crate::coordinator::CommandResponse;

// Exit codes for CLI automation
pub const SUCCESS: i32 = 0;
pub const ERROR: i32 = 1;
pub const NOT_FOUND: i32 = 2;
pub const INVALID_INPUT: i32 = 3;

/// Exit code for a failed command response
pub fn for_response(response: &CommandResponse) -> i32 {
    if response.is_success() {
        return SUCCESS;
    }
    let message = response.error_message();
    if message.contains("No active profile") || message.contains("does not exist") {
        NOT_FOUND
    } else if message.starts_with("Invalid command") || message == "Unknown action" {
        INVALID_INPUT
    } else {
        ERROR
    }
}
