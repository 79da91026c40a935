//! Canned grounded questions
//!
//! Each preset bundles a retrieval query, the source categories it may
//! draw from and the task handed to the debaters.

use amicus_core::RunMode;

/// Snippets retrieved for a preset
pub const PRESET_TOP_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub mode: RunMode,
    pub query: &'static str,
    pub categories: &'static [&'static str],
    pub task: &'static str,
}

impl Preset {
    pub fn categories(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.to_string()).collect()
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "requirements",
        mode: RunMode::Requirements,
        query: "EB-1A extraordinary ability requirements, two-step analysis, criteria list, final merits determination",
        categories: &["policy_manual", "cfr", "uscis_overview"],
        task: "Provide the CURRENT EB-1A (Extraordinary Ability) requirements and the two-step analysis. \
               Use ONLY the provided RAG snippets for factual/legal statements. \
               If a detail is not supported by snippets, explicitly say it is not confirmed.",
    },
    Preset {
        name: "fees",
        mode: RunMode::Fees,
        query: "USCIS fees for I-140 and premium processing I-907 and how to calculate or verify current fees",
        categories: &["fees", "form_i140", "form_i907"],
        task: "Explain how to find and verify CURRENT USCIS filing fees relevant to I-140 and premium processing (I-907). \
               Do not guess numbers if not present. Prefer directing to Fee Calculator / official fee pages in the snippets. \
               Include any 'effective date' style guidance if present in snippets.",
    },
    Preset {
        name: "filing",
        mode: RunMode::Filing,
        query: "How to file Form I-140, where to file, online filing, direct filing addresses, EB-1A",
        categories: &["form_i140", "filing"],
        task: "Describe CURRENT filing options for I-140 (where/how to file, addresses/online notes) \
               based ONLY on the provided snippets. If addresses are not in snippets, say so and \
               instruct how to locate them from USCIS pages referenced.",
    },
    Preset {
        name: "premium",
        mode: RunMode::Premium,
        query: "How to request premium processing for I-140 using Form I-907, filing method, rules",
        categories: &["form_i907", "form_i140"],
        task: "Explain CURRENT premium processing request mechanics relevant to I-140 using I-907. \
               Use only provided snippets; do not guess. Provide a short checklist.",
    },
];

/// Task for reviewing a case document
pub const REVIEW_TASK: &str = "Review the provided document for EB-1A strength and weaknesses. \
     Find missing evidence links to exhibits, overbroad claims, inconsistencies, and suggest edits.";

pub fn preset(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

pub fn preset_names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(preset("fees").map(|p| p.mode), Some(RunMode::Fees));
        assert_eq!(preset(" Premium ").map(|p| p.mode), Some(RunMode::Premium));
        assert!(preset("appeal").is_none());
        assert_eq!(preset_names(), vec!["requirements", "fees", "filing", "premium"]);
    }

    #[test]
    fn test_continuation_lines_keep_single_spaces() {
        for preset in PRESETS {
            assert!(!preset.task.contains("  "), "{}", preset.name);
        }
        assert!(REVIEW_TASK.contains("weaknesses. Find missing"));
    }

    #[test]
    fn test_categories_exist_in_registry() {
        let known = amicus_rag::sources::categories();
        for preset in PRESETS {
            for category in preset.categories {
                assert!(known.contains(category), "{category}");
            }
        }
    }
}
