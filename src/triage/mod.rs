//! AI symptom triage: model gateway, reply classification and the
//! emergency escalation that follows an alarming reply.

pub mod classify;
pub mod escalation;
pub mod gateway;

pub use classify::{classify, Triage};
pub use escalation::{EmergencyEvent, Escalation};
pub use gateway::{build_window, LanguageModel};
