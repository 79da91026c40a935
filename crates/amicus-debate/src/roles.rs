//! Fixed system roles and per-stage sampling parameters

/// The persona a provider plays in a debate stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Stage 1: answer the task from the case materials
    Analyst,
    /// Stage 2: critique the other provider's answer
    Critic,
    /// Stage 3: synthesize everything into a verdict
    Judge,
}

const ANALYST_SYSTEM: &str = "You are an EB-1A legal analyst.
Work strictly within the provided Case Memo and Evidence Registry.
Apply the two-step USCIS analysis:
1) Initial evidence criteria
2) Final merits determination

Rules:
- Do NOT invent facts, documents, or sources.
- Do NOT change the Field of Endeavor or case goal unless explicitly instructed via a command.
- If information is missing, say so and ask for the minimal missing piece.
Output must be structured and concise.
";

const CRITIC_SYSTEM: &str = "You are an EB-1A RFE-style reviewer (strict).
Your job is to find weaknesses, inconsistencies, and RFE risks.

Rules:
- Assume the officer is skeptical.
- Flag overbroad claims, missing proof, and replaceability arguments.
- Suggest evidence/edits that reduce risk.
- Do NOT invent facts or sources.
Output must be: Issues / Fixes / Questions / Confidence(0-100).
";

const JUDGE_SYSTEM: &str = "You are a neutral EB-1A adjudication summarizer.
Combine the best parts of both sides and produce:
1) Verdict: PASS / NEEDS WORK
2) Strengths (bullets)
3) Risks (bullets)
4) Next steps (max 10 bullets)
Rules:
- Do NOT invent facts or sources.
- Keep it short and actionable.
";

impl Role {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Self::Analyst => ANALYST_SYSTEM,
            Self::Critic => CRITIC_SYSTEM,
            Self::Judge => JUDGE_SYSTEM,
        }
    }
}

/// Sampling parameters for one stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Critiques run cooler and shorter than initial answers
pub const CRITIQUE_PARAMS: StageParams = StageParams {
    temperature: 0.1,
    max_output_tokens: 900,
};

pub const JUDGE_PARAMS: StageParams = StageParams {
    temperature: 0.2,
    max_output_tokens: 900,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_role_bounds_next_steps() {
        let prompt = Role::Judge.system_prompt();
        assert!(prompt.contains("Verdict: PASS / NEEDS WORK"));
        assert!(prompt.contains("max 10 bullets"));
    }

    #[test]
    fn test_critic_output_shape() {
        assert!(Role::Critic
            .system_prompt()
            .contains("Issues / Fixes / Questions / Confidence(0-100)"));
    }
}
