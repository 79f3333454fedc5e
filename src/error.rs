//! Error taxonomy for the weaving engine.

use thiserror::Error;

use crate::method::MethodKey;
use crate::table::SlotId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Everything that can go wrong while weaving a class.
///
/// Only two variants are fatal for a whole pass: [`WeaveError::Emit`] and
/// [`WeaveError::SlotReference`]. A [`WeaveError::MethodNotFound`] is the
/// expected outcome of probing a driver version that lacks an overload and is
/// recovered per method; a [`WeaveError::FieldCollision`] aborts one field
/// injection and nothing else.
#[derive(Debug, Error)]
pub enum WeaveError {
    /// The rewrite backend has never seen a class with this name.
    #[error("class `{class}` is not known to the rewrite backend")]
    ClassNotFound { class: String },

    /// A described method is absent on the installed version of the class.
    #[error("method `{key}` not found on `{class}`")]
    MethodNotFound { class: String, key: MethodKey },

    /// A synthetic field's accessor name collides with an existing member.
    #[error("member `{member}` already exists on `{class}`")]
    FieldCollision { class: String, member: String },

    /// Two different interceptor instances were bound to one method key.
    #[error("`{key}` is already bound to an interceptor on `{class}`")]
    DuplicateBinding { class: String, key: MethodKey },

    /// A reuse binding referenced a slot no `bind` call ever produced.
    /// Always a configuration bug, never a runtime condition.
    #[error("reuse binding references unknown interceptor slot {slot}")]
    SlotReference { slot: SlotId },

    /// The backend rejected the final modified-class description.
    #[error("backend failed to emit `{class}`: {message}")]
    Emit { class: String, message: String },
}

impl WeaveError {
    /// Whether this error is a per-method resolution miss that the caller is
    /// expected to record and skip rather than propagate.
    pub fn is_resolution_miss(&self) -> bool {
        matches!(self, WeaveError::MethodNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodKey;

    #[test]
    fn test_miss_classification() {
        let miss = WeaveError::MethodNotFound {
            class: "X".to_string(),
            key: MethodKey::new("setLong", ["int", "long"]),
        };
        assert!(miss.is_resolution_miss());

        let fatal = WeaveError::SlotReference { slot: SlotId(7) };
        assert!(!fatal.is_resolution_miss());
    }

    #[test]
    fn test_display_includes_context() {
        let err = WeaveError::FieldCollision {
            class: "oracle.jdbc.driver.OraclePreparedStatementWrapper".to_string(),
            member: "__getSql".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("__getSql"));
        assert!(text.contains("OraclePreparedStatementWrapper"));
    }
}
