//! Execution context -- storage handle plus the confirmation mechanism,
//! passed explicitly to every pipeline.

use crate::storage::Pool;
use anyhow::Result;

/// A confirmation *request*: the pipelines decide what needs confirming and
/// build one of these; the front end decides how to resolve it. Keeps the
/// pipelines testable without a terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub prompt: String,
}

impl Confirmation {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

pub trait Confirm {
    fn resolve(&self, request: &Confirmation) -> Result<bool>;
}

/// Resolves every confirmation to yes; the global `--yes` flag.
pub struct AutoYes;

impl Confirm for AutoYes {
    fn resolve(&self, _request: &Confirmation) -> Result<bool> {
        Ok(true)
    }
}

/// Blocking terminal prompt. Destructive actions default to "no".
pub struct Interactive;

impl Confirm for Interactive {
    fn resolve(&self, request: &Confirmation) -> Result<bool> {
        let answer = dialoguer::Confirm::new()
            .with_prompt(&request.prompt)
            .default(false)
            .interact()?;
        Ok(answer)
    }
}

/// Everything a pipeline call needs from the outside world, minus the
/// gateways it takes as explicit trait parameters. No hidden globals.
pub struct Ctx {
    pub pool: Pool,
    confirm: Box<dyn Confirm>,
}

impl Ctx {
    pub fn new(pool: Pool, confirm: Box<dyn Confirm>) -> Self {
        Self { pool, confirm }
    }

    pub fn confirm(&self, request: &Confirmation) -> Result<bool> {
        self.confirm.resolve(request)
    }
}
