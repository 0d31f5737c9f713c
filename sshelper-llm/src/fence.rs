//! Fenced code block extraction
//!
//! Models answer in markdown. Anything the user should run sits between
//! triple-backtick fence lines; everything else is prose.

/// The fence marker that opens and closes a block
pub const FENCE: &str = "```";

/// One fenced block from a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Info string after the opening fence (`bash`, `python`, ...)
    pub language: Option<String>,
    pub lines: Vec<String>,
}

/// Split a reply into its fenced blocks, in order.
///
/// A line whose trimmed form starts with the fence toggles between prose and
/// code. Captured lines keep their indentation but lose trailing whitespace.
/// A block left open runs to the end of the text.
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(info) = trimmed.strip_prefix(FENCE) {
            match current.take() {
                Some(block) => blocks.push(block),
                None => {
                    let info = info.trim().trim_start_matches('`').trim();
                    current = Some(CodeBlock {
                        language: (!info.is_empty()).then(|| info.to_string()),
                        lines: Vec::new(),
                    });
                }
            }
            continue;
        }

        if let Some(block) = current.as_mut() {
            block.lines.push(line.trim_end().to_string());
        }
    }

    if let Some(block) = current {
        blocks.push(block);
    }

    blocks
}

/// All lines inside fenced blocks, concatenated in order.
///
/// Empty when the reply contains no fence.
pub fn extract_script_content(text: &str) -> Vec<String> {
    code_blocks(text)
        .into_iter()
        .flat_map(|block| block.lines)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fence_yields_nothing() {
        assert!(extract_script_content("Just run ls, it lists files.").is_empty());
        assert!(extract_script_content("").is_empty());
    }

    #[test]
    fn test_single_block_with_prose() {
        let reply = "Sure! Here is the script:\n\n```bash\n#!/bin/bash\nls -la /var/log\n```\n\nThis lists the logs.";
        assert_eq!(
            extract_script_content(reply),
            vec!["#!/bin/bash".to_string(), "ls -la /var/log".to_string()]
        );
    }

    #[test]
    fn test_first_block_is_prefix() {
        let reply = "```\nfirst\n```\nmiddle prose\n```sh\nsecond\n```";
        let lines = extract_script_content(reply);
        assert_eq!(lines, vec!["first", "second"]);

        let blocks = code_blocks(reply);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, None);
        assert_eq!(blocks[1].language.as_deref(), Some("sh"));
    }

    #[test]
    fn test_indentation_kept() {
        let reply = "```python\n#!/usr/bin/env python3\nfor i in range(3):\n    print(i)   \n```";
        let lines = extract_script_content(reply);
        assert_eq!(lines[2], "    print(i)");
    }

    #[test]
    fn test_indented_fence_still_toggles() {
        let reply = "1. Run this:\n   ```bash\n   df -h\n   ```";
        let blocks = code_blocks(reply);
        assert_eq!(blocks[0].language.as_deref(), Some("bash"));
        assert_eq!(blocks[0].lines, vec!["   df -h"]);
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        let reply = "```bash\nuptime\nfree -m";
        assert_eq!(extract_script_content(reply), vec!["uptime", "free -m"]);
    }

    #[test]
    fn test_crlf_reply() {
        let reply = "```bash\r\nwhoami\r\n```\r\n";
        assert_eq!(extract_script_content(reply), vec!["whoami"]);
    }
}
