//! Method descriptors and overload resolution.
//!
//! A target class is never compiled against; it is described by the reflected
//! [`MethodSignature`]s the backend reports for it. Operations to instrument
//! are declared as [`OperationSpec`]s and resolved to canonical [`MethodKey`]s
//! against that reflected list.

use std::fmt;

use regex::Regex;

/// Canonical identity of one concrete method: name plus the ordered list of
/// semantic parameter type names. Equality is structural, so
/// `setInt(int, int)` and `setInt(int, long)` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    name: String,
    params: Vec<String>,
}

impl MethodKey {
    /// Build a key from a name and ordered parameter type names.
    pub fn new<N, P, S>(name: N, params: P) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// A key for a method taking no parameters.
    pub fn nullary(name: impl Into<String>) -> Self {
        Self::new(name, Vec::<String>::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// One reflected method on a target class: its key plus return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub key: MethodKey,
    pub return_type: String,
}

impl MethodSignature {
    pub fn new<N, P, S>(name: N, params: P, return_type: impl Into<String>) -> Self
    where
        N: Into<String>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: MethodKey::new(name, params),
            return_type: return_type.into(),
        }
    }
}

/// Declares which methods of a class implement one logical operation.
///
/// Resolution is deterministic: matches are returned in the order the
/// reflected method list presents them, so "first match gets the fresh slot,
/// later matches reuse it" is reproducible across passes.
#[derive(Debug, Clone)]
pub enum OperationSpec {
    /// Every overload with this exact name.
    Named { name: String },
    /// Exactly one signature.
    Exact { key: MethodKey },
    /// A discovery rule: name matches the pattern, and the return type (when
    /// given) matches exactly. This is the reflective
    /// "find all bind-variable setters" case.
    Matching {
        pattern: Regex,
        return_type: Option<String>,
    },
}

impl OperationSpec {
    pub fn named(name: impl Into<String>) -> Self {
        OperationSpec::Named { name: name.into() }
    }

    pub fn exact(key: MethodKey) -> Self {
        OperationSpec::Exact { key }
    }

    pub fn matching(pattern: Regex, return_type: Option<&str>) -> Self {
        OperationSpec::Matching {
            pattern,
            return_type: return_type.map(str::to_string),
        }
    }

    fn accepts(&self, sig: &MethodSignature) -> bool {
        match self {
            OperationSpec::Named { name } => sig.key.name() == name,
            OperationSpec::Exact { key } => sig.key == *key,
            OperationSpec::Matching {
                pattern,
                return_type,
            } => {
                pattern.is_match(sig.key.name())
                    && return_type
                        .as_ref()
                        .map(|rt| sig.return_type == *rt)
                        .unwrap_or(true)
            }
        }
    }

    /// Resolve this spec against a reflected method list, preserving its
    /// order. Zero matches is not an error: older driver releases simply
    /// lack some overloads, and the caller records the miss and moves on.
    pub fn resolve(&self, methods: &[MethodSignature]) -> Vec<MethodKey> {
        let matches: Vec<MethodKey> = methods
            .iter()
            .filter(|sig| self.accepts(sig))
            .map(|sig| sig.key.clone())
            .collect();

        if matches.is_empty() {
            tracing::trace!(spec = ?self, "operation resolved to no methods");
        }

        matches
    }
}
