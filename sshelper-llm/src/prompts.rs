//! Fixed prompts sent to the model

/// System prompt for free-form assistance
pub const HELPFUL_ASSISTANT: &str = "You are a helpful assistant.";

/// System prompt for describing command output
pub const ANALYZE_OUTPUT: &str = "Analyze and describe the following output.";

/// Which scripts the model may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptDialect {
    /// A bash script with fully qualified paths
    #[default]
    Bash,
    /// bash or python3, always with a shebang
    BashOrPython,
}

impl ScriptDialect {
    /// System prompt asking for a runnable script in a fenced block
    pub fn translate_prompt(&self, cwd: &str) -> String {
        match self {
            ScriptDialect::Bash => format!(
                "Translate the following prompt into an executable bash script enclosed within \
                 triple backticks. Ensure the script requires no editing or parameters and \
                 includes fully qualified paths. The current working directory is {}.",
                cwd
            ),
            ScriptDialect::BashOrPython => format!(
                "Translate prompts into an executable script enclosed within triple backticks at \
                 beginning of a line, followed by language name, like github markdown. Python3 \
                 and bash are acceptable choices. Ensure that the script requires no editing \
                 before being run. In particular, made-up paths like /path/to cannot work, and \
                 should default to current directory in such cases. Scripts always need a \
                 shebang at the top. The current working directory is {}.",
                cwd
            ),
        }
    }
}

/// Prompt asking what to do after a command ran
pub fn next_steps_prompt(command: &str, stdout: &str) -> String {
    format!(
        "I ran the following command: {}\nHere is the output: {}\nPlease assist me with the next steps.",
        command, stdout
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_steps_prompt() {
        let prompt = next_steps_prompt("df -h", "/dev/sda1 91%");
        assert_eq!(
            prompt,
            "I ran the following command: df -h\nHere is the output: /dev/sda1 91%\nPlease assist me with the next steps."
        );
    }

    #[test]
    fn test_translate_prompt_mentions_cwd() {
        for dialect in [ScriptDialect::Bash, ScriptDialect::BashOrPython] {
            let prompt = dialect.translate_prompt("/home/ubuntu");
            assert!(prompt.ends_with("The current working directory is /home/ubuntu."));
            assert!(prompt.contains("triple backticks"));
        }
        assert!(ScriptDialect::BashOrPython.translate_prompt("/").contains("shebang"));
    }
}
