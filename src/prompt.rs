//! Interactive prompts backing `{ prompt = ".." }` settings.

use dialoguer::{Input, Password};
use std::io::IsTerminal;

/// Ask the user for a value. Fails instead of hanging when stdin is not a terminal.
pub fn ask(prompt: &str, secret: bool) -> chefkit::Result<String> {
    if !std::io::stdin().is_terminal() {
        return Err(chefkit::Error::Deferred {
            name: prompt.to_string(),
            message: "stdin is not a terminal; set the value in roundsman.toml or with -s"
                .to_string(),
        });
    }

    let answer = if secret {
        Password::new().with_prompt(prompt.trim_end_matches([' ', ':'])).interact()
    } else {
        Input::<String>::new()
            .with_prompt(prompt.trim_end_matches([' ', ':']))
            .interact_text()
    };

    answer.map_err(|e| chefkit::Error::Deferred {
        name: prompt.to_string(),
        message: e.to_string(),
    })
}
