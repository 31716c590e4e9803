use crate::client::navigation::{NavigationState, ERROR_KEY};
use crate::error::ApiError;

/// The server-error page: whatever error the navigation carried, plus a details toggle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerErrorView {
    error: Option<ApiError>,
    show_details: bool,
}

/// What the page shows for the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedError<'a> {
    pub status_code: u16,
    pub message: &'a str,
    pub details: Option<&'a str>,
    pub details_toggle: bool,
}

impl ServerErrorView {
    /// Read the error from navigation state. No state, or no `error` entry, means no error.
    pub fn from_navigation(state: Option<&NavigationState>) -> Self {
        Self {
            error: state.and_then(|s| s.get_as::<ApiError>(ERROR_KEY)),
            show_details: false,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn show_details(&self) -> bool {
        self.show_details
    }

    pub fn toggle_details(&mut self) {
        self.show_details = !self.show_details;
    }

    pub fn render(&self) -> Option<RenderedError<'_>> {
        let error = self.error.as_ref()?;
        Some(RenderedError {
            status_code: error.status_code,
            message: &error.message,
            details: error.details.as_deref().filter(|_| self.show_details),
            details_toggle: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn no_state_means_no_error() {
        let view = ServerErrorView::from_navigation(None);
        assert_eq!(view.error(), None);
        assert_eq!(view.render(), None);

        let view = ServerErrorView::from_navigation(Some(&NavigationState::new()));
        assert_eq!(view.render(), None);
    }

    #[test]
    fn malformed_error_entry_is_treated_as_absent() {
        let mut state = NavigationState::new();
        state.insert(ERROR_KEY, &json!({"unexpected": true}));
        assert_eq!(ServerErrorView::from_navigation(Some(&state)).render(), None);

        let mut state = NavigationState::new();
        state.insert(ERROR_KEY, &json!({"statusCode": 0, "message": ""}));
        assert_eq!(ServerErrorView::from_navigation(Some(&state)).render(), None);
    }

    #[test]
    fn blank_message_renders_the_reason_phrase() {
        let mut state = NavigationState::new();
        state.insert(ERROR_KEY, &json!({"statusCode": 500, "message": ""}));
        let view = ServerErrorView::from_navigation(Some(&state));
        assert_eq!(view.render().unwrap().message, "Internal Server Error");
    }

    #[test]
    fn toggling_without_details_is_a_no_op() {
        let state: NavigationState = json!({"error": {"statusCode": 404, "message": "Not Found"}})
            .as_object()
            .cloned()
            .unwrap()
            .into();
        let mut view = ServerErrorView::from_navigation(Some(&state));

        let before = view.render().unwrap();
        assert_eq!(before.message, "Not Found");
        assert_eq!(before.details, None);

        view.toggle_details();
        assert!(view.show_details());
        let after = view.render().unwrap();
        assert_eq!(after.message, "Not Found");
        assert_eq!(after.details, None);
    }

    #[test]
    fn details_show_only_when_toggled_on() {
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Object reference not set",
            Some("at MembersController.Get()".to_string()),
        );
        let mut view = ServerErrorView::from_navigation(Some(&NavigationState::with_error(&error)));

        assert_eq!(view.render().unwrap().details, None);
        view.toggle_details();
        assert_eq!(
            view.render().unwrap().details,
            Some("at MembersController.Get()")
        );
        view.toggle_details();
        assert_eq!(view.render().unwrap().details, None);
        assert!(view.render().unwrap().details_toggle);
    }
}
