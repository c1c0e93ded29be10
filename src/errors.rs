//! Failure classes the engine reports. Structural differences never land here.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcilerError {
    #[error("Malformed render state for context '{context}': {details}")]
    MalformedContext { context: String, details: String },

    #[error("Identity {identity} appears more than once in the new tree")]
    DuplicateIdentity { identity: String },

    #[error("Node of type '{widget_type}' has neither an explicit key nor an implicit token")]
    MissingIdentity { widget_type: String },

    #[error("Surface id allocator exhausted after issuing {issued} ids")]
    IdExhausted { issued: u64 },

    #[error("Markup generation failed for widget '{widget_type}': {details}")]
    Render { widget_type: String, details: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[cfg(feature = "python")]
    #[error("Python call failed: {0}")]
    Python(String),
}

#[cfg(feature = "python")]
impl From<ReconcilerError> for pyo3::PyErr {
    fn from(err: ReconcilerError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for ReconcilerError {
    fn from(err: pyo3::PyErr) -> Self {
        ReconcilerError::Python(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_item() {
        let err = ReconcilerError::MalformedContext {
            context: "dialog".into(),
            details: "record 'fw_id_0_3' has unknown parent 'ghost'".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed render state for context 'dialog': record 'fw_id_0_3' has unknown parent 'ghost'"
        );

        let err = ReconcilerError::IdExhausted { issued: 2 };
        assert!(err.to_string().contains("after issuing 2 ids"));
    }

    #[test]
    fn config_errors_convert_from_serde() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: ReconcilerError = parse.unwrap_err().into();
        assert!(matches!(err, ReconcilerError::Config(_)));
    }
}
