//! Pure helpers for deriving filter vocabularies and parsing list params.

use std::collections::BTreeSet;

use crate::models::Project;

/// Unique skill tags across all projects, sorted ascending. Case-sensitive.
pub fn unique_skills(projects: &[Project]) -> Vec<String> {
    collect_tags(projects.iter().flat_map(|p| p.skills.iter()))
}

/// Unique sector tags across all projects, sorted ascending. Case-sensitive.
pub fn unique_sectors(projects: &[Project]) -> Vec<String> {
    collect_tags(projects.iter().flat_map(|p| p.sectors.iter()))
}

fn collect_tags<'a>(tags: impl Iterator<Item = &'a String>) -> Vec<String> {
    let set: BTreeSet<&String> = tags.collect();
    set.into_iter().cloned().collect()
}

/// Split a comma-separated query parameter into trimmed, non-empty tokens.
pub fn comma_list(param: Option<&str>) -> Vec<String> {
    match param {
        None => Vec::new(),
        Some(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}
