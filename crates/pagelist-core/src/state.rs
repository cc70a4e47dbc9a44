use std::fmt;

use crate::error::ControllerError;

/// Lifecycle of a controller, or of a single page inside a paged controller.
///
/// Equality compares the kind only: two `Error` states are equal whatever
/// their causes are.
#[derive(Debug, Clone, Default)]
pub enum ControllerState {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Error(ControllerError),
}

impl ControllerState {
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, ControllerState::NotLoaded)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ControllerState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ControllerState::Loaded)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ControllerState::Error(_))
    }

    /// The cause carried by an `Error` state.
    pub fn error(&self) -> Option<&ControllerError> {
        match self {
            ControllerState::Error(error) => Some(error),
            _ => None,
        }
    }
}

impl PartialEq for ControllerState {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Eq for ControllerState {}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::NotLoaded => f.write_str("not loaded"),
            ControllerState::Loading => f.write_str("loading"),
            ControllerState::Loaded => f.write_str("loaded"),
            ControllerState::Error(error) => write!(f, "error: {error}"),
        }
    }
}

impl From<ControllerError> for ControllerState {
    fn from(error: ControllerError) -> Self {
        ControllerState::Error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    #[test]
    fn errors_compare_equal_regardless_of_cause() {
        let timeout = ControllerState::Error(ControllerError::FetchFailed {
            page: 0,
            cause: FetchError::msg("timeout"),
        });
        let gone = ControllerState::Error(ControllerError::ObjectUnavailable("a".into()));

        assert_eq!(timeout, gone);
        assert_ne!(timeout, ControllerState::Loaded);
    }

    #[test]
    fn kinds_are_distinct() {
        let all = [
            ControllerState::NotLoaded,
            ControllerState::Loading,
            ControllerState::Loaded,
            ControllerState::Error(ControllerError::Superseded { page: 1 }),
        ];
        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                assert_eq!(i == j, a == b, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn error_accessor_exposes_cause() {
        let state: ControllerState = ControllerError::Superseded { page: 3 }.into();
        assert!(state.is_error());
        assert!(matches!(
            state.error(),
            Some(ControllerError::Superseded { page: 3 })
        ));
        assert!(ControllerState::Loaded.error().is_none());
        assert_eq!(ControllerState::default(), ControllerState::NotLoaded);
    }
}
