//! Wildcard rules deciding which upstream projects are exposed.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::ProjectGroup;

/// Matches `name` against an ignore pattern.
///
/// Supported forms: exact name, `*` (everything), `text*` (prefix),
/// `*text` (suffix) and `*text*` (contains). A wildcard anywhere else, or
/// `**`, matches nothing.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    if name == pattern || pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return false;
    }
    let leading = pattern.starts_with('*');
    let trailing = pattern.ends_with('*');
    match (leading, trailing) {
        (true, true) => {
            let needle = pattern.trim_matches('*');
            !needle.is_empty() && name.contains(needle)
        }
        (false, true) => name.starts_with(&pattern[..pattern.len() - 1]),
        (true, false) => name.ends_with(&pattern[1..]),
        (false, false) => false,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGroupsResponse {
    pub groups: Vec<ProjectGroup>,
    pub ungrouped_projects: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProjectFilter {
    ignored: Vec<String>,
    groups: Vec<ProjectGroup>,
}

impl ProjectFilter {
    pub fn new(ignored: Vec<String>, groups: Vec<ProjectGroup>) -> Self {
        Self { ignored, groups }
    }

    pub fn groups(&self) -> &[ProjectGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&ProjectGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn is_ignored(&self, project: &str) -> bool {
        self.ignored.iter().any(|p| matches_pattern(project, p))
    }

    fn is_grouped(&self, project: &str) -> bool {
        self.groups
            .iter()
            .any(|g| g.projects.iter().any(|p| p == project))
    }

    /// Grouped projects are always exposed, even when an ignore pattern matches.
    pub fn should_filter(&self, project: &str) -> bool {
        !self.is_grouped(project) && self.is_ignored(project)
    }

    pub fn filter_names<S: AsRef<str>>(&self, projects: &[S]) -> Vec<String> {
        projects
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !self.is_ignored(p))
            .map(str::to_string)
            .collect()
    }

    /// Configured groups plus every project that is neither grouped nor ignored.
    pub fn project_groups<S: AsRef<str>>(&self, all_projects: &[S]) -> ProjectGroupsResponse {
        let grouped: HashSet<&str> = self
            .groups
            .iter()
            .flat_map(|g| g.projects.iter().map(String::as_str))
            .collect();
        let ungrouped_projects = all_projects
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !grouped.contains(p) && !self.is_ignored(p))
            .map(str::to_string)
            .collect();
        ProjectGroupsResponse {
            groups: self.groups.clone(),
            ungrouped_projects,
        }
    }
}
