//! Gitignore-syntax ignore filter.

use canopy_store::FileType;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;

use crate::context::{IgnoreDecision, IgnoreFilter};
use crate::error::{DiffError, DiffResult};

/// [`IgnoreFilter`] backed by gitignore patterns.
///
/// Paths are matched relative to the diff root. A matching directory is
/// excluded along with its whole subtree; a matching file only hides itself.
/// Negated patterns (`!keep.log`) re-include a path.
#[derive(Clone, Debug)]
pub struct GitignoreFilter {
    matcher: Gitignore,
}

impl GitignoreFilter {
    /// Build a filter from gitignore lines. Blank lines and `#` comments are
    /// skipped the same way git skips them.
    pub fn from_lines<I, S>(lines: I) -> DiffResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(".");
        for line in lines {
            builder
                .add_line(None, line.as_ref())
                .map_err(|e| DiffError::IgnorePattern(e.to_string()))?;
        }
        let matcher = builder
            .build()
            .map_err(|e| DiffError::IgnorePattern(e.to_string()))?;
        Ok(Self { matcher })
    }

    /// Number of ignore (non-negated) patterns.
    pub fn num_ignores(&self) -> u64 {
        self.matcher.num_ignores()
    }
}

impl IgnoreFilter for GitignoreFilter {
    fn decide(&self, path: &str, kind: FileType) -> IgnoreDecision {
        let is_dir = kind.is_tree();
        match self.matcher.matched(path, is_dir) {
            Match::Ignore(_) if is_dir => IgnoreDecision::ExcludeDirectory,
            Match::Ignore(_) => IgnoreDecision::ExcludeFile,
            Match::None | Match::Whitelist(_) => IgnoreDecision::Include,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_pattern_excludes_directories_only() {
        let filter = GitignoreFilter::from_lines(["build/"]).unwrap();
        assert_eq!(
            filter.decide("build", FileType::Directory),
            IgnoreDecision::ExcludeDirectory
        );
        assert_eq!(
            filter.decide("nested/build", FileType::Directory),
            IgnoreDecision::ExcludeDirectory
        );
        assert_eq!(
            filter.decide("build", FileType::Regular),
            IgnoreDecision::Include
        );
    }

    #[test]
    fn glob_pattern_excludes_files() {
        let filter = GitignoreFilter::from_lines(["*.log", "", "# comment"]).unwrap();
        assert_eq!(filter.num_ignores(), 1);
        assert_eq!(
            filter.decide("logs/run.log", FileType::Regular),
            IgnoreDecision::ExcludeFile
        );
        assert_eq!(
            filter.decide("src/main.rs", FileType::Regular),
            IgnoreDecision::Include
        );
    }

    #[test]
    fn negation_reincludes() {
        let filter = GitignoreFilter::from_lines(["*.log", "!keep.log"]).unwrap();
        assert_eq!(
            filter.decide("keep.log", FileType::Regular),
            IgnoreDecision::Include
        );
        assert_eq!(
            filter.decide("drop.log", FileType::Regular),
            IgnoreDecision::ExcludeFile
        );
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = GitignoreFilter::from_lines(["*.log", "[z-a]"]).unwrap_err();
        assert!(matches!(err, DiffError::IgnorePattern(msg) if msg.contains("[z-a]")));
    }
}
