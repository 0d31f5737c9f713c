//! Input line classification

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `exit`, in any case
    Exit,
    /// Blank line
    Empty,
    /// `edit <path>`: replace a remote file with typed content
    Edit(String),
    /// `read <path>`: print a remote file
    Read(String),
    /// `!<text>`: talk to the model without running anything
    Chat(String),
    /// Anything else: a shell command (assist) or a task to script (translate)
    Request(String),
}

impl Command {
    /// Parse a line typed in assist mode
    pub fn assist(line: &str) -> Self {
        let line = line.trim();
        if let Some(common) = Self::common(line) {
            return common;
        }
        if let Some(path) = argument(line, "edit") {
            return Command::Edit(path.to_string());
        }
        if let Some(path) = argument(line, "read") {
            return Command::Read(path.to_string());
        }
        Command::Request(line.to_string())
    }

    /// Parse a line typed in translate mode
    pub fn translate(line: &str) -> Self {
        let line = line.trim();
        if let Some(common) = Self::common(line) {
            return common;
        }
        match line.strip_prefix('!') {
            Some(text) => Command::Chat(text.trim().to_string()),
            None => Command::Request(line.to_string()),
        }
    }

    fn common(line: &str) -> Option<Self> {
        if line.is_empty() {
            Some(Command::Empty)
        } else if line.eq_ignore_ascii_case("exit") {
            Some(Command::Exit)
        } else {
            None
        }
    }
}

/// The rest of `line` after `keyword` and whitespace, if there is any
fn argument<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_and_empty() {
        for line in ["exit", "EXIT", "  Exit  "] {
            assert_eq!(Command::assist(line), Command::Exit);
            assert_eq!(Command::translate(line), Command::Exit);
        }
        assert_eq!(Command::assist(""), Command::Empty);
        assert_eq!(Command::translate("   "), Command::Empty);
        assert_eq!(Command::assist("exit now"), Command::Request("exit now".into()));
    }

    #[test]
    fn test_assist_commands() {
        assert_eq!(
            Command::assist("edit /etc/motd"),
            Command::Edit("/etc/motd".into())
        );
        assert_eq!(
            Command::assist("read   /var/log/syslog "),
            Command::Read("/var/log/syslog".into())
        );
        assert_eq!(Command::assist("df -h"), Command::Request("df -h".into()));
        // No path, or a longer word, is a plain command
        assert_eq!(Command::assist("edit"), Command::Request("edit".into()));
        assert_eq!(Command::assist("readlink -f ."), Command::Request("readlink -f .".into()));
        // `!` means nothing special here
        assert_eq!(Command::assist("!ls"), Command::Request("!ls".into()));
    }

    #[test]
    fn test_translate_commands() {
        assert_eq!(
            Command::translate("!what does this server run?"),
            Command::Chat("what does this server run?".into())
        );
        assert_eq!(
            Command::translate("list the five largest files"),
            Command::Request("list the five largest files".into())
        );
        // edit/read are only understood in assist mode
        assert_eq!(
            Command::translate("read /etc/hosts"),
            Command::Request("read /etc/hosts".into())
        );
    }
}
