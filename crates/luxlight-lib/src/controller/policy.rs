//! Productivity-mode policies.
//!
//! While productivity mode is on, every color request goes through the
//! active policy, which may pass it on, replace it, or drop it.

use crate::led::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Apply(Color),
    Suppress,
}

pub trait ProductivityPolicy: Send + Sync {
    fn resolve(&self, requested: Color) -> PolicyDecision;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Requests go through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ProductivityPolicy for PassThrough {
    fn resolve(&self, requested: Color) -> PolicyDecision {
        PolicyDecision::Apply(requested)
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Every request turns into one fixed color.
#[derive(Debug, Clone, Copy)]
pub struct ForceColor(pub Color);

impl ProductivityPolicy for ForceColor {
    fn resolve(&self, _requested: Color) -> PolicyDecision {
        PolicyDecision::Apply(self.0)
    }

    fn name(&self) -> &str {
        "force"
    }
}

/// Color changes are dropped; the light keeps its current color.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppressChanges;

impl ProductivityPolicy for SuppressChanges {
    fn resolve(&self, _requested: Color) -> PolicyDecision {
        PolicyDecision::Suppress
    }

    fn name(&self) -> &str {
        "suppress"
    }
}

impl<F> ProductivityPolicy for F
where
    F: Fn(Color) -> PolicyDecision + Send + Sync,
{
    fn resolve(&self, requested: Color) -> PolicyDecision {
        self(requested)
    }
}
