use std::env;

#[cfg(test)]
use mockall::automock;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Access to the ambient environment, behind a trait so tests can
/// substitute their own.
#[cfg_attr(test, automock)]
pub trait Environment: Send + Sync {
    fn get_var(&self, key: &str) -> Result<String, env::VarError>;
}

pub struct RealEnvironment;

impl Environment for RealEnvironment {
    fn get_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

/// One optional credential per backend, read once at startup. Missing or
/// empty keys leave that backend unavailable; all three missing is a
/// valid (degraded) state.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub google: Option<String>,
}

impl Credentials {
    pub fn load(env: &impl Environment) -> Self {
        Self {
            openai: lookup(env, OPENAI_API_KEY),
            anthropic: lookup(env, ANTHROPIC_API_KEY),
            google: lookup(env, GOOGLE_API_KEY),
        }
    }

    pub fn any_present(&self) -> bool {
        self.openai.is_some() || self.anthropic.is_some() || self.google.is_some()
    }
}

fn lookup(env: &impl Environment, key: &str) -> Option<String> {
    match env.get_var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
