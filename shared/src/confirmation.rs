use crate::types::Result;
use dialoguer::Confirm;

/// Standardized confirmation prompt used by destructive commands.
///
/// `assume_yes` short-circuits the prompt, for `--yes` style flags.
pub fn ask_confirmation(prompt: &str, default_yes: bool, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let choice = Confirm::new()
        .with_prompt(prompt)
        .default(default_yes)
        .show_default(true)
        .interact()?;
    Ok(choice)
}
