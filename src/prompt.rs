//! Operator confirmation prompts.

/// Errors raised while asking the operator a question.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[cfg(feature = "interactive")]
    #[error("Dialoguer error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    #[error("Prompt unavailable: {0}")]
    Unavailable(String),
}

/// A yes/no question put to the operator.
pub trait Confirm: Send + Sync {
    /// Ask `message`. `Ok(false)` means the operator declined.
    fn confirm(&self, message: &str) -> Result<bool, PromptError>;
}

/// Approves every prompt without asking. Used for `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        tracing::debug!(prompt = %message, "Auto-approved");
        Ok(true)
    }
}

/// Asks on the terminal; anything but an explicit yes declines.
#[cfg(feature = "interactive")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

#[cfg(feature = "interactive")]
impl Confirm for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<bool, PromptError> {
        use dialoguer::theme::ColorfulTheme;

        if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
            return Err(PromptError::Unavailable(
                "stdin is not a terminal; pass --yes to run unattended".into(),
            ));
        }

        let answer = dialoguer::Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact()?;
        Ok(answer)
    }
}
