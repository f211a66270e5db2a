//! Prompt construction from typed change descriptors.
//!
//! Pure functions only; nothing here touches the network.

use git_context_engine::Change;

/// Instruction placed before a single file's change.
pub const FILE_INSTRUCTION: &str =
    "Check if the following code changes have issues. DON'T say anything if there's no change:";

/// Instruction placed before all changes of a merge request.
pub const MERGE_REQUEST_INSTRUCTION: &str = "Review the following merge request changes and point out any issues. DON'T say anything if there's no change:";

/// A prompt plus the number of changes it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPrompt {
    pub text: String,
    pub changes: usize,
}

/// Path notice for `change`, keeping "renamed" distinct from "same path".
pub fn path_notice(change: &Change) -> String {
    if change.is_renamed() {
        format!(
            "File renamed from '{}' to '{}'\n\n",
            change.old_path, change.new_path
        )
    } else {
        format!("The file path is '{}' \n\n", change.new_path)
    }
}

/// Notice followed by the raw diff text.
pub fn describe_change(change: &Change) -> String {
    let mut out = path_notice(change);
    out.push_str(&change.diff);
    out
}

/// One prompt for one changed file.
pub fn build_file_prompt(change: &Change) -> ReviewPrompt {
    ReviewPrompt {
        text: format!("{FILE_INSTRUCTION}\n\n{}", describe_change(change)),
        changes: 1,
    }
}

/// One prompt covering every change, in the given order.
///
/// With no changes the result is the bare instruction.
pub fn build_merge_request_prompt(changes: &[Change]) -> ReviewPrompt {
    let mut text = String::from(MERGE_REQUEST_INSTRUCTION);
    for change in changes {
        text.push_str("\n\n");
        text.push_str(&describe_change(change));
    }
    ReviewPrompt {
        text,
        changes: changes.len(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn change(old: &str, new: &str, diff: &str) -> Change {
        Change {
            old_path: old.into(),
            new_path: new.into(),
            diff: diff.into(),
        }
    }

    #[test]
    fn rename_notice_names_both_paths() {
        let text = describe_change(&change("old.go", "new.go", "+x"));
        assert_eq!(text, "File renamed from 'old.go' to 'new.go'\n\n+x");
    }

    #[test]
    fn unchanged_path_has_no_rename_notice() {
        let text = describe_change(&change("a.go", "a.go", "+foo()"));
        assert_eq!(text, "The file path is 'a.go' \n\n+foo()");
        assert!(!text.contains("renamed"));
    }

    #[test]
    fn file_prompt_starts_with_instruction() {
        let p = build_file_prompt(&change("a.go", "a.go", "+foo()"));
        assert_eq!(
            p.text,
            "Check if the following code changes have issues. DON'T say anything if there's no change:\n\n\
             The file path is 'a.go' \n\n+foo()"
        );
        assert_eq!(p.changes, 1);
    }

    #[test]
    fn merge_request_prompt_keeps_change_order() {
        let p = build_merge_request_prompt(&[
            change("b.rs", "b.rs", "+b"),
            change("a.rs", "c.rs", "-a\n+c"),
        ]);

        let b = p.text.find("'b.rs'").expect("b described");
        let c = p.text.find("'c.rs'").expect("c described");
        assert!(b < c);
        assert!(p.text.starts_with(MERGE_REQUEST_INSTRUCTION));
        assert!(p.text.contains("File renamed from 'a.rs' to 'c.rs'\n\n-a\n+c"));
        assert_eq!(p.changes, 2);
    }

    #[test]
    fn empty_merge_request_gives_instruction_only() {
        let p = build_merge_request_prompt(&[]);
        assert_eq!(p.text, MERGE_REQUEST_INSTRUCTION);
        assert_eq!(p.changes, 0);
    }

    #[test]
    fn empty_diff_still_describes_path() {
        let p = build_file_prompt(&change("logo.png", "logo.png", ""));
        assert!(p.text.ends_with("The file path is 'logo.png' \n\n"));
    }
}
