// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod loader;
pub mod selector;

pub use loader::{
    map_evidence_type, EvidenceObject, FindingTemplate, Playbook, PlaybookLoader, PlaybookStep, PlaybookSummary,
    PlaybookType,
};
pub use selector::{DataRequirement, PlaybookSelector, RuleCondition, RuleTrace, SelectionTrace, SelectorRule, SelectorRules};
