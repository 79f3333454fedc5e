//! Configuration for weaving behavior.

/// Options controlling what the shipped statement modifier captures.
///
/// # Example
///
/// ```rust
/// use trace_weave::WeaveConfig;
///
/// let config = WeaveConfig::default()
///     .with_statement_capture(true)
///     .with_max_bind_values(128);
/// ```
#[derive(Debug, Clone)]
pub struct WeaveConfig {
    /// Whether to inject the SQL-text field and capture statements.
    /// Default: `true`
    pub capture_statements: bool,

    /// Whether to inject the bind-value map and intercept the bind-variable
    /// setter family.
    /// Default: `true` (bind values may contain sensitive data; disable in
    /// hardened deployments)
    pub capture_bind_values: bool,

    /// Cap on bind values accumulated per instance, enforced by the
    /// bind-value map the statement modifier seeds into each instance;
    /// statements with thousands of placeholders should not balloon trace
    /// payloads.
    /// Default: 1024
    pub max_bind_values: usize,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            capture_statements: true,
            capture_bind_values: true,
            max_bind_values: 1024,
        }
    }
}

impl WeaveConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable SQL-text capture.
    pub fn with_statement_capture(mut self, enabled: bool) -> Self {
        self.capture_statements = enabled;
        self
    }

    /// Enable or disable bind-value capture.
    ///
    /// **Security Warning**: Bind values are user input and often contain
    /// sensitive data. Disable this in environments where traces leave your
    /// control.
    pub fn with_bind_value_capture(mut self, enabled: bool) -> Self {
        self.capture_bind_values = enabled;
        self
    }

    /// Set the per-instance bind-value cap.
    pub fn with_max_bind_values(mut self, max: usize) -> Self {
        self.max_bind_values = max;
        self
    }

    /// Capture everything with a generous bind-value cap.
    ///
    /// **Warning**: Do not use in production; captured bind values will
    /// include whatever the application binds.
    pub fn development() -> Self {
        Self {
            capture_statements: true,
            capture_bind_values: true,
            max_bind_values: 4096,
        }
    }

    /// Capture statement shape only; no bind values.
    pub fn production() -> Self {
        Self {
            capture_statements: true,
            capture_bind_values: false,
            max_bind_values: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = WeaveConfig::default()
            .with_bind_value_capture(false)
            .with_max_bind_values(16);

        assert!(config.capture_statements);
        assert!(!config.capture_bind_values);
        assert_eq!(config.max_bind_values, 16);
    }

    #[test]
    fn test_development_config() {
        let config = WeaveConfig::development();
        assert!(config.capture_statements);
        assert!(config.capture_bind_values);
    }

    #[test]
    fn test_production_config() {
        let config = WeaveConfig::production();
        assert!(!config.capture_bind_values);
    }
}
