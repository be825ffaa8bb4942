use crate::application::dtos::{PreferencesDto, UpdatePreferencesInput};
use crate::presentation::error::{respond, ApiResponse};
use crate::presentation::state::AppState;
use classledger_domain::shared::{Actor, ErrorCode, StudentId};

pub async fn get_preferences(student_id: String, state: &AppState) -> ApiResponse<PreferencesDto> {
    let student_id = StudentId::from_string(&student_id);
    let result = state.services.preference.get(&student_id).await;
    respond(
        result.map(|prefs| PreferencesDto::from(&prefs)),
        ErrorCode::FetchError,
    )
}

/// Replace a student's scheduling preferences
pub async fn update_preferences(
    student_id: String,
    input: UpdatePreferencesInput,
    actor: Option<&Actor>,
    state: &AppState,
) -> ApiResponse<PreferencesDto> {
    let result = async move {
        let preferences = input.into_preferences(StudentId::from_string(&student_id))?;
        state.services.preference.update(preferences, actor).await
    }
    .await;
    respond(
        result.map(|prefs| PreferencesDto::from(&prefs)),
        ErrorCode::UpdateError,
    )
}
