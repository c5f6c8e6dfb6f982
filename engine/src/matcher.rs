//! Name comparison policy used to pair targets with replacements.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

use crate::model::{FileDescriptor, PlannedReplacement};

/// How file names are compared. One policy applies to the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// Names must be identical, extension included
    #[default]
    Exact,
    /// Only the part before the final `.` is compared
    IgnoreExtension,
}

impl MatchPolicy {
    /// Map the `--ext` flag: `true` keeps the extension in the comparison.
    pub fn from_extension_sensitive(extension_sensitive: bool) -> Self {
        if extension_sensitive {
            MatchPolicy::Exact
        } else {
            MatchPolicy::IgnoreExtension
        }
    }

    /// Decide whether two base names refer to the same file.
    ///
    /// Comparison is case-sensitive in both modes. In `IgnoreExtension` mode a
    /// name without a dot, or with only a leading dot (`.bashrc`), is compared
    /// whole.
    pub fn names_match(&self, target: &OsStr, replacement: &OsStr) -> bool {
        match self {
            MatchPolicy::Exact => target == replacement,
            MatchPolicy::IgnoreExtension => stem(target) == stem(replacement),
        }
    }

    pub fn matches(&self, target: &FileDescriptor, replacement: &FileDescriptor) -> bool {
        self.names_match(&target.name, &replacement.name)
    }
}

impl fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPolicy::Exact => write!(f, "exact"),
            MatchPolicy::IgnoreExtension => write!(f, "ignore-extension"),
        }
    }
}

fn stem(name: &OsStr) -> &OsStr {
    Path::new(name).file_stem().unwrap_or(name)
}

/// Pair every target with every matching replacement.
///
/// Targets are visited in index order and, for each, replacements are scanned
/// from last to first. Every match produces a pair, so a target matched by
/// several replacements is overwritten several times and the first-indexed
/// replacement is the one whose content survives.
pub fn pair_files(
    targets: &[FileDescriptor],
    replacements: &[FileDescriptor],
    policy: MatchPolicy,
) -> Vec<PlannedReplacement> {
    let mut pairs = Vec::new();
    for (target_index, target) in targets.iter().enumerate() {
        for (replacement_index, replacement) in replacements.iter().enumerate().rev() {
            if !policy.matches(target, replacement) {
                continue;
            }
            if target.is_same_file(replacement) {
                tracing::debug!(
                    path = %target.absolute_path.display(),
                    "skipping self-replacement"
                );
                continue;
            }
            pairs.push(PlannedReplacement {
                target_index,
                replacement_index,
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileId;
    use std::ffi::OsString;
    use std::path::PathBuf;

    fn descriptor(path: &str) -> FileDescriptor {
        let absolute_path = PathBuf::from(path);
        FileDescriptor {
            name: absolute_path.file_name().map(OsString::from).unwrap_or_default(),
            id: FileId::Canonical(absolute_path.clone()),
            absolute_path,
            backup_root: None,
            size: 0,
        }
    }

    fn names(a: &str, b: &str, policy: MatchPolicy) -> bool {
        policy.names_match(OsStr::new(a), OsStr::new(b))
    }

    #[test]
    fn test_exact_requires_full_name() {
        assert!(names("blah.txt", "blah.txt", MatchPolicy::Exact));
        assert!(!names("blah.txt", "blah.md", MatchPolicy::Exact));
        assert!(!names("blah.txt", "blah", MatchPolicy::Exact));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!names("Blah.txt", "blah.txt", MatchPolicy::Exact));
        assert!(!names("Blah.txt", "blah.md", MatchPolicy::IgnoreExtension));
    }

    #[test]
    fn test_ignore_extension_compares_stems() {
        assert!(names("blah.txt", "blah.md", MatchPolicy::IgnoreExtension));
        assert!(names("blah.txt", "blah", MatchPolicy::IgnoreExtension));
        assert!(!names("blah.txt", "blah2.txt", MatchPolicy::IgnoreExtension));
    }

    #[test]
    fn test_ignore_extension_strips_only_final_segment() {
        assert!(names("a.tar.gz", "a.tar.xz", MatchPolicy::IgnoreExtension));
        assert!(!names("a.tar.gz", "a.gz", MatchPolicy::IgnoreExtension));
    }

    #[test]
    fn test_leading_dot_names_compare_whole() {
        assert!(!names(".bashrc", ".zshrc", MatchPolicy::IgnoreExtension));
        assert!(names(".bashrc", ".bashrc", MatchPolicy::IgnoreExtension));
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(MatchPolicy::from_extension_sensitive(true), MatchPolicy::Exact);
        assert_eq!(
            MatchPolicy::from_extension_sensitive(false),
            MatchPolicy::IgnoreExtension
        );
        assert_eq!(MatchPolicy::default(), MatchPolicy::Exact);
    }

    #[test]
    fn test_pair_files_scans_replacements_in_reverse() {
        let targets = vec![descriptor("/t/a.txt"), descriptor("/t/b.txt")];
        let replacements = vec![
            descriptor("/r/one/a.txt"),
            descriptor("/r/b.txt"),
            descriptor("/r/two/a.txt"),
        ];

        let pairs = pair_files(&targets, &replacements, MatchPolicy::Exact);

        assert_eq!(
            pairs,
            vec![
                PlannedReplacement {
                    target_index: 0,
                    replacement_index: 2,
                },
                PlannedReplacement {
                    target_index: 0,
                    replacement_index: 0,
                },
                PlannedReplacement {
                    target_index: 1,
                    replacement_index: 1,
                },
            ]
        );
    }

    #[test]
    fn test_pair_files_skips_same_path() {
        let targets = vec![descriptor("/shared/a.txt")];
        let replacements = vec![descriptor("/shared/a.txt")];
        assert!(pair_files(&targets, &replacements, MatchPolicy::Exact).is_empty());
    }

    #[test]
    fn test_pair_files_skips_same_file_under_other_path() {
        let targets = vec![descriptor("/t/a.txt")];
        let mut through_link = descriptor("/r/a.txt");
        through_link.id = targets[0].id.clone();

        let pairs = pair_files(&targets, &[through_link], MatchPolicy::Exact);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_pair_files_without_matches() {
        let targets = vec![descriptor("/t/a.txt")];
        let replacements = vec![descriptor("/r/a.md")];
        assert!(pair_files(&targets, &replacements, MatchPolicy::Exact).is_empty());
        assert_eq!(
            pair_files(&targets, &replacements, MatchPolicy::IgnoreExtension).len(),
            1
        );
    }
}
