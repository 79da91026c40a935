//! Registry of official sources used for grounding

use amicus_core::Hash;

/// An official page and the category it is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficialSource {
    pub category: &'static str,
    pub title: &'static str,
    pub url: &'static str,
}

impl OfficialSource {
    /// Stable chunk id prefix for this source
    pub fn chunk_prefix(&self) -> String {
        chunk_prefix(self.category, self.url)
    }
}

pub const OFFICIAL_SOURCES: &[OfficialSource] = &[
    OfficialSource {
        category: "policy_manual",
        title: "USCIS Policy Manual: Extraordinary Ability (EB-1A)",
        url: "https://www.uscis.gov/policy-manual/volume-6-part-f-chapter-2",
    },
    OfficialSource {
        category: "uscis_overview",
        title: "USCIS EB-1: Priority Workers",
        url: "https://www.uscis.gov/working-in-the-united-states/permanent-workers/employment-based-immigration-first-preference-eb-1",
    },
    OfficialSource {
        category: "form_i140",
        title: "Form I-140 (Immigrant Petition for Alien Worker)",
        url: "https://www.uscis.gov/i-140",
    },
    OfficialSource {
        category: "form_i907",
        title: "Form I-907 (Request for Premium Processing Service)",
        url: "https://www.uscis.gov/i-907",
    },
    OfficialSource {
        category: "fees",
        title: "USCIS Fee Calculator",
        url: "https://www.uscis.gov/feecalculator",
    },
    OfficialSource {
        category: "fees",
        title: "USCIS Filing Fees",
        url: "https://www.uscis.gov/forms/filing-fees",
    },
    OfficialSource {
        category: "filing",
        title: "USCIS Direct Filing Addresses (Forms)",
        url: "https://www.uscis.gov/forms/direct-filing-addresses",
    },
    OfficialSource {
        category: "cfr",
        title: "eCFR 8 CFR 204.5 (Immigrant petitions)",
        url: "https://www.ecfr.gov/current/title-8/chapter-I/subchapter-B/part-204/section-204.5",
    },
];

/// `{first two chars of category}-{first 8 hex chars of sha256(url)}`
pub fn chunk_prefix(category: &str, url: &str) -> String {
    let short: String = category.chars().take(2).collect();
    format!("{}-{}", short, Hash::of_text(url).short(8))
}

/// Chunk id for the `index`-th chunk of a source
pub fn chunk_id(prefix: &str, index: usize) -> String {
    format!("{prefix}-{index:04}")
}

/// Sources in the given categories; an empty filter selects all
pub fn sources_in(categories: &[String]) -> Vec<&'static OfficialSource> {
    OFFICIAL_SOURCES
        .iter()
        .filter(|s| categories.is_empty() || categories.iter().any(|c| c == s.category))
        .collect()
}

/// Distinct categories in registry order
pub fn categories() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for source in OFFICIAL_SOURCES {
        if !out.contains(&source.category) {
            out.push(source.category);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_shape() {
        assert_eq!(OFFICIAL_SOURCES.len(), 8);
        assert_eq!(
            categories(),
            vec![
                "policy_manual",
                "uscis_overview",
                "form_i140",
                "form_i907",
                "fees",
                "filing",
                "cfr"
            ]
        );
    }

    #[test]
    fn test_chunk_prefix_is_stable_and_distinct() {
        let a = chunk_prefix("fees", "https://www.uscis.gov/feecalculator");
        let b = chunk_prefix("fees", "https://www.uscis.gov/forms/filing-fees");
        assert!(a.starts_with("fe-"));
        assert_eq!(a.len(), "fe-".len() + 8);
        assert_eq!(a, chunk_prefix("fees", "https://www.uscis.gov/feecalculator"));
        assert_ne!(a, b);
        assert_eq!(chunk_id(&a, 7), format!("{a}-0007"));
    }

    #[test]
    fn test_sources_in() {
        assert_eq!(sources_in(&["fees".to_string()]).len(), 2);
        assert_eq!(sources_in(&[]).len(), OFFICIAL_SOURCES.len());
        assert!(sources_in(&["unknown".to_string()]).is_empty());
    }
}
