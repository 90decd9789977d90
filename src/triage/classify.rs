const EMERGENCY_TOKEN: &str = "emergency";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage {
    Normal,
    Emergency,
}

/// A reply is an emergency when, once trimmed, it starts with "emergency"
/// in any letter case. The preamble asks the model to answer that way.
pub fn classify(reply: &str) -> Triage {
    let reply = reply.trim_start().as_bytes();
    match reply.get(..EMERGENCY_TOKEN.len()) {
        Some(head) if head.eq_ignore_ascii_case(EMERGENCY_TOKEN.as_bytes()) => Triage::Emergency,
        _ => Triage::Normal,
    }
}
