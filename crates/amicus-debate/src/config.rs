//! Debate settings from the environment

use std::env;
use std::str::FromStr;
use std::time::Duration;

use amicus_llm::{ConfigError, LlmConfig, ProviderKind};

use crate::orchestrator::{DebateConfig, DebateParticipants};

/// Which providers debate, and with which stage-1 parameters
#[derive(Debug, Clone)]
pub struct DebateSettings {
    /// env: AMICUS_PROVIDER_A
    pub provider_a: ProviderKind,
    /// env: AMICUS_PROVIDER_B
    pub provider_b: ProviderKind,
    /// env: AMICUS_JUDGE; debater A judges when unset
    pub judge: Option<ProviderKind>,
    /// env: AMICUS_TEMPERATURE, AMICUS_MAX_OUTPUT_TOKENS, AMICUS_TIMEOUT_SECS
    pub debate: DebateConfig,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            provider_a: ProviderKind::OpenAI,
            provider_b: ProviderKind::Gemini,
            judge: None,
            debate: DebateConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name).ok().filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{name} has invalid value {raw:?}"))),
        None => Ok(None),
    }
}

impl DebateSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let temperature = parse_var::<f32>("AMICUS_TEMPERATURE")?
            .unwrap_or(defaults.debate.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid(format!(
                "AMICUS_TEMPERATURE must be within 0.0..=2.0, got {temperature}"
            )));
        }

        let max_output_tokens = parse_var::<u32>("AMICUS_MAX_OUTPUT_TOKENS")?
            .unwrap_or(defaults.debate.max_output_tokens);
        if max_output_tokens == 0 {
            return Err(ConfigError::Invalid(
                "AMICUS_MAX_OUTPUT_TOKENS must be positive".into(),
            ));
        }

        let timeout = match parse_var::<u64>("AMICUS_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::Invalid("AMICUS_TIMEOUT_SECS must be positive".into()))
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.debate.timeout,
        };

        Ok(Self {
            provider_a: parse_var("AMICUS_PROVIDER_A")?.unwrap_or(defaults.provider_a),
            provider_b: parse_var("AMICUS_PROVIDER_B")?.unwrap_or(defaults.provider_b),
            judge: parse_var("AMICUS_JUDGE")?,
            debate: DebateConfig {
                temperature,
                max_output_tokens,
                timeout,
                judge_fallback: defaults.debate.judge_fallback,
            },
        })
    }

    /// Build the configured providers
    pub fn participants(&self, llm: &LlmConfig) -> Result<DebateParticipants, ConfigError> {
        let participants = DebateParticipants::new(
            llm.build_provider(self.provider_a)?,
            llm.build_provider(self.provider_b)?,
        );
        Ok(match self.judge {
            Some(kind) => participants.with_judge(llm.build_provider(kind)?),
            None => participants,
        })
    }
}
