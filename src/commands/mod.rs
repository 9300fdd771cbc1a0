pub mod apps;
pub mod folders;
pub mod sync;

pub use apps::*;
pub use folders::*;
pub use sync::*;

use crate::error::FolderError;
use crate::models::ApiResult;

/// Converts a failed operation into a result the user can be shown.
///
/// Structural outcomes pass their message through; infrastructure failures
/// are logged and reported generically with the cause appended.
pub(crate) fn failure(action: &str, error: FolderError) -> ApiResult {
    if error.is_expected() {
        return ApiResult::error(error.to_string());
    }
    log::error!("Failed to {}: {}", action, error);
    ApiResult::error(format!("Failed to {}: {}", action, error))
}
