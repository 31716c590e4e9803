use crate::client::navigation::NavigationState;
use crate::error::ApiError;

pub const NOT_FOUND_PATH: &str = "/not-found";
pub const SERVER_ERROR_PATH: &str = "/server-error";

/// Where a failed call sends the user
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorRoute {
    /// Stay on the page and show a transient message
    Toast { message: String },
    Navigate {
        path: &'static str,
        state: Option<NavigationState>,
    },
}

/// Route a failed call by its status code. Server faults carry the error to the
/// server-error page in navigation state.
pub fn route_error(error: &ApiError) -> ErrorRoute {
    match error.status_code {
        400 | 401 | 403 => ErrorRoute::Toast {
            message: error.message.clone(),
        },
        404 => ErrorRoute::Navigate {
            path: NOT_FOUND_PATH,
            state: None,
        },
        _ => ErrorRoute::Navigate {
            path: SERVER_ERROR_PATH,
            state: Some(NavigationState::with_error(error)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::server_error::ServerErrorView;
    use axum::http::StatusCode;

    #[test]
    fn client_errors_become_toasts() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let route = route_error(&ApiError::from_status(status));
            assert!(matches!(route, ErrorRoute::Toast { .. }), "{status}");
        }
    }

    #[test]
    fn not_found_navigates_without_state() {
        let route = route_error(&ApiError::from_status(StatusCode::NOT_FOUND));
        assert_eq!(
            route,
            ErrorRoute::Navigate {
                path: NOT_FOUND_PATH,
                state: None
            }
        );
    }

    #[test]
    fn server_errors_reach_the_error_view() {
        let error = ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
            Some("trace".to_string()),
        );
        let ErrorRoute::Navigate { path, state } = route_error(&error) else {
            panic!("expected navigation");
        };
        assert_eq!(path, SERVER_ERROR_PATH);

        let view = ServerErrorView::from_navigation(state.as_ref());
        assert_eq!(view.error(), Some(&error));
    }
}
