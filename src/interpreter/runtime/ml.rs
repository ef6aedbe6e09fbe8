//! The boundary to an optional machine-learning backend.
//!
//! The `appeler_python_ml` builtin forwards to whatever backend the
//! embedding program registered. The default backend refuses every
//! call, matching a run with no backend installed.

use super::value::Value;
use super::{FeatureErr, RtResult};

/// A backend that `appeler_python_ml` can dispatch into.
pub trait MlBackend {
    /// Invoke a named backend function with the given arguments.
    fn invoke(&self, name: &str, args: &[Value]) -> RtResult<Value>;
}

/// The backend used when none is registered.
pub struct NoBackend;

impl MlBackend for NoBackend {
    fn invoke(&self, name: &str, _args: &[Value]) -> RtResult<Value> {
        Err(FeatureErr::MlUnavailable(name.to_string()))?
    }
}
