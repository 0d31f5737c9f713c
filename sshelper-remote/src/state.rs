//! Remote shell state carried between generated scripts
//!
//! Each script runs in a fresh remote shell, so `cd` and `export` would be
//! lost. The state remembers them and replays them in front of the next
//! script.

use crate::script::{shell_quote, Interpreter};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    home: String,
    cwd: String,
    env: BTreeMap<String, String>,
}

impl ShellState {
    /// Start in `home` with no exports
    pub fn new(home: impl Into<String>) -> Self {
        let home = home.into();
        Self {
            cwd: home.clone(),
            home,
            env: BTreeMap::new(),
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Full script text: shebang, then (for shell scripts) the exports and
    /// the `cd`, then the body.
    pub fn render(&self, lines: &[String]) -> String {
        let interpreter = Interpreter::detect(lines);
        let (shebang, body) = match lines.split_first() {
            Some((first, rest)) if first.trim_start().starts_with("#!") => (Some(first), rest),
            _ => (None, lines),
        };

        let mut script = String::new();
        if let Some(shebang) = shebang {
            script.push_str(shebang.trim());
            script.push('\n');
        }
        if interpreter.is_shell() {
            script.push_str(&self.prelude());
        }
        for line in body {
            script.push_str(line);
            script.push('\n');
        }
        script
    }

    /// `export` lines for every tracked variable followed by `cd <cwd>`
    pub fn prelude(&self) -> String {
        let mut prelude = String::new();
        for (key, value) in &self.env {
            prelude.push_str(&format!("export {}=\"{}\"\n", key, escape_double_quoted(value)));
        }
        prelude.push_str(&format!("cd {}\n", shell_quote(&self.cwd)));
        prelude
    }

    /// `KEY="value" ...` assignments for non-shell launches, quoted the same
    /// way as the prelude's exports
    pub fn env_assignments(&self) -> String {
        self.env
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, escape_double_quoted(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Record the `cd` and `export` lines of a script that just ran
    pub fn apply(&mut self, lines: &[String]) {
        for line in lines {
            let line = first_command(line.trim());
            if let Some(dir) = line.strip_prefix("cd ") {
                self.change_dir(unquote(dir.trim()));
            } else if line == "cd" {
                self.cwd = self.home.clone();
            } else if let Some(assignment) = line.strip_prefix("export ") {
                if let Some((key, value)) = assignment.trim().split_once('=') {
                    let key = key.trim();
                    if !key.is_empty() && !key.contains(char::is_whitespace) {
                        self.env.insert(key.to_string(), unquote(value.trim()).to_string());
                    }
                }
            }
        }
    }

    fn change_dir(&mut self, dir: &str) {
        let joined = if dir.is_empty() || dir == "~" {
            self.home.clone()
        } else if let Some(rest) = dir.strip_prefix("~/") {
            format!("{}/{}", self.home, rest)
        } else if dir.starts_with('/') {
            dir.to_string()
        } else {
            format!("{}/{}", self.cwd, dir)
        };
        self.cwd = normalize(&joined);
    }
}

/// The part of a line before the first `&&`, `||` or `;` outside quotes
fn first_command(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(b'"') if b == b'\\' => i += 1,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'\\' => i += 1,
                b';' => return line[..i].trim_end(),
                b'&' | b'|' if bytes.get(i + 1) == Some(&b) => return line[..i].trim_end(),
                _ => {}
            },
        }
        i += 1;
    }
    line.trim_end()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn escape_double_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Lexically resolve `.` and `..` in an absolute path
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(String::from).collect()
    }

    #[test]
    fn test_initial_state() {
        let state = ShellState::new("/home/ubuntu");
        assert_eq!(state.cwd(), "/home/ubuntu");
        assert!(state.env().is_empty());
        assert_eq!(state.prelude(), "cd '/home/ubuntu'\n");
    }

    #[test]
    fn test_apply_cd() {
        let mut state = ShellState::new("/home/ubuntu");

        state.apply(&lines("cd projects/app"));
        assert_eq!(state.cwd(), "/home/ubuntu/projects/app");

        state.apply(&lines("  cd ../lib && make"));
        assert_eq!(state.cwd(), "/home/ubuntu/projects/lib");

        state.apply(&lines("cd /var/log/./nginx/"));
        assert_eq!(state.cwd(), "/var/log/nginx");

        state.apply(&lines("cd ~/notes"));
        assert_eq!(state.cwd(), "/home/ubuntu/notes");

        state.apply(&lines("cd \"/srv/my data\""));
        assert_eq!(state.cwd(), "/srv/my data");

        state.apply(&lines("cd"));
        assert_eq!(state.cwd(), "/home/ubuntu");

        state.apply(&lines("cd ../../../.."));
        assert_eq!(state.cwd(), "/");
    }

    #[test]
    fn test_apply_export() {
        let mut state = ShellState::new("/home/ubuntu");
        state.apply(&lines("export APP_ENV=\"staging\"\nexport PORT=8080\nexport BROKEN\necho cd /tmp"));

        assert_eq!(state.env().get("APP_ENV").map(String::as_str), Some("staging"));
        assert_eq!(state.env().get("PORT").map(String::as_str), Some("8080"));
        assert_eq!(state.env().len(), 2);
        assert_eq!(state.cwd(), "/home/ubuntu");

        state.apply(&lines("export URL=\"http://db/?a=1;b=2\"; echo set"));
        assert_eq!(state.env().get("URL").map(String::as_str), Some("http://db/?a=1;b=2"));

        state.apply(&lines("export MSG='a && b' || true"));
        assert_eq!(state.env().get("MSG").map(String::as_str), Some("a && b"));
    }

    #[test]
    fn test_first_command_ignores_quoted_separators() {
        assert_eq!(first_command("cd /srv && make"), "cd /srv");
        assert_eq!(first_command("cd /srv; ls"), "cd /srv");
        assert_eq!(first_command("export A=\"x;y\" ; ls"), "export A=\"x;y\"");
        assert_eq!(first_command("export A='p||q'"), "export A='p||q'");
        assert_eq!(first_command("export A=\"say \\\";\\\"\" && ls"), "export A=\"say \\\";\\\"\"");
        assert_eq!(first_command("echo a\\;b"), "echo a\\;b");
        assert_eq!(first_command("echo a | grep b"), "echo a | grep b");
    }

    #[test]
    fn test_exports_expand_the_same_for_every_launch() {
        let mut state = ShellState::new("/home/ubuntu");
        state.apply(&lines("export DATA=$HOME/data\nexport PATH=$PATH:/opt/bin"));

        let prelude = state.prelude();
        assert!(prelude.contains("export DATA=\"$HOME/data\"\n"));
        assert!(prelude.contains("export PATH=\"$PATH:/opt/bin\"\n"));
        assert_eq!(state.env_assignments(), "DATA=\"$HOME/data\" PATH=\"$PATH:/opt/bin\"");
    }

    #[test]
    fn test_render_shell_script() {
        let mut state = ShellState::new("/home/ubuntu");
        state.apply(&lines("cd /opt\nexport MOTTO='say \"hi\"'"));

        let script = state.render(&lines("#!/bin/bash\necho $MOTTO"));
        assert_eq!(
            script,
            "#!/bin/bash\nexport MOTTO=\"say \\\"hi\\\"\"\ncd '/opt'\necho $MOTTO\n"
        );
    }

    #[test]
    fn test_render_without_shebang() {
        let state = ShellState::new("/home/ubuntu");
        let script = state.render(&lines("ls -la"));
        assert_eq!(script, "cd '/home/ubuntu'\nls -la\n");
    }

    #[test]
    fn test_render_python_has_no_shell_prelude() {
        let mut state = ShellState::new("/home/ubuntu");
        state.apply(&lines("export DEBUG=1"));

        let script = state.render(&lines("#!/usr/bin/env python3\nimport os\nprint(os.getcwd())"));
        assert_eq!(script, "#!/usr/bin/env python3\nimport os\nprint(os.getcwd())\n");
        assert_eq!(state.env_assignments(), "DEBUG=\"1\"");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/b/../c/./d"), "/a/c/d");
        assert_eq!(normalize("/.."), "/");
        assert_eq!(normalize("//x//y/"), "/x/y");
    }
}
