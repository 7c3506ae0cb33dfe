//! robots.txt policy for one origin.
//!
//! Parsing and matching are delegated to `texting_robots`, which follows
//! RFC 9309 (group merging, longest match, `*` and `$` patterns). A missing,
//! unreadable, or unparseable robots.txt allows everything.

use std::fmt;
use texting_robots::Robot;
use tracing::warn;

/// What robots.txt permits for our agent on one origin.
#[derive(Default)]
pub struct RobotsPolicy {
    robot: Option<Robot>,
}

impl fmt::Debug for RobotsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotsPolicy")
            .field("parsed", &self.robot.is_some())
            .finish()
    }
}

impl RobotsPolicy {
    /// A policy that allows every path.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse `text` for `agent`; malformed input allows everything.
    pub fn parse(text: &str, agent: &str) -> Self {
        match Robot::new(agent, text.as_bytes()) {
            Ok(robot) => Self { robot: Some(robot) },
            Err(e) => {
                warn!(error = %e, "Unparseable robots.txt; allowing");
                Self::allow_all()
            }
        }
    }

    /// True when `target` (a path with optional query, or a full URL) may be fetched.
    pub fn is_allowed(&self, target: &str) -> bool {
        self.robot.as_ref().is_none_or(|robot| robot.allowed(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
User-agent: *
Disallow: /account/
Disallow: /search
Allow: /search/help

User-agent: BadBot
Disallow: /
";

    #[test]
    fn test_wildcard_group_applies() {
        let policy = RobotsPolicy::parse(ROBOTS, "MusicNewsWeekly");
        assert!(policy.is_allowed("/news/read/x"));
        assert!(!policy.is_allowed("/account/settings"));
        assert!(!policy.is_allowed("/search?q=x"));
        assert!(policy.is_allowed("/search/help"));
    }

    #[test]
    fn test_specific_group_wins() {
        let policy = RobotsPolicy::parse(ROBOTS, "BadBot");
        assert!(!policy.is_allowed("/news"));
    }

    #[test]
    fn test_groups_for_same_agent_are_merged() {
        let policy = RobotsPolicy::parse(
            "User-agent: *\nDisallow: /a\n\nUser-agent: *\nDisallow: /private\n",
            "MusicNewsWeekly",
        );
        assert!(!policy.is_allowed("/a/x"));
        assert!(!policy.is_allowed("/private/x"));
        assert!(policy.is_allowed("/news/read/x"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow:\n", "MusicNewsWeekly");
        assert!(policy.is_allowed("/anything"));
        assert!(RobotsPolicy::allow_all().is_allowed("/"));
    }

    #[test]
    fn test_wildcards_and_anchors() {
        let policy = RobotsPolicy::parse(
            "User-agent: *\nDisallow: /*.pdf$\nDisallow: /tmp*/x\n",
            "MusicNewsWeekly",
        );
        assert!(!policy.is_allowed("/files/report.pdf"));
        assert!(policy.is_allowed("/files/report.pdfx"));
        assert!(!policy.is_allowed("/tmp123/x"));
    }
}
