// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod decision_log;
pub mod guard;

pub use decision_log::{DecisionLog, REDACTION_MARKER};
pub use guard::{
    always_blocked_patterns, validation_only_patterns, PolicyGuard, PolicyViolation, DEFAULT_DECISION_LOG,
};
