//! Preparation stage: normalize an extracted profile for admin review.
//!
//! No persistence happens here — the prepared profile, the moderation
//! report, and the normalization changes all go back to the admin UI for
//! manual confirmation before anything is written to the content store.

use serde::Serialize;

use crate::models::{ExtractedPerson, PreparedPerson};

/// Skills longer than this are dropped as noise.
const MAX_SKILL_CHARS: usize = 64;

/// Skill list cap, matching the extraction stage.
const MAX_SKILLS: usize = 12;

/// Canonical spellings for common shorthand. Compared case-insensitively.
const SKILL_ALIASES: &[(&str, &str)] = &[
    ("js", "JavaScript"),
    ("ts", "TypeScript"),
    ("reactjs", "React"),
    ("nodejs", "Node.js"),
    ("node", "Node.js"),
    ("postgres", "PostgreSQL"),
    ("k8s", "Kubernetes"),
    ("ml", "Machine Learning"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillRename {
    pub from: String,
    pub to: String,
}

/// What normalization did to the skill list, surfaced to the admin.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkillChanges {
    pub renamed: Vec<SkillRename>,
    pub dropped: Vec<String>,
}

/// Trim and collapse internal whitespace; empty becomes `None`.
pub fn collapse_ws(value: &str) -> Option<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Normalize a raw skill list: collapse whitespace, drop empties and
/// over-long tokens, canonicalize known aliases, dedupe case-insensitively
/// keeping the first spelling, cap the list. Every rename and drop is
/// recorded.
pub fn normalize_skills(raw: &[String]) -> (Vec<String>, SkillChanges) {
    let mut skills: Vec<String> = Vec::new();
    let mut changes = SkillChanges::default();

    for original in raw {
        let Some(collapsed) = collapse_ws(original) else {
            changes.dropped.push(original.clone());
            continue;
        };

        if collapsed.chars().count() > MAX_SKILL_CHARS {
            changes.dropped.push(original.clone());
            continue;
        }

        let canonical = SKILL_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(&collapsed))
            .map(|(_, full)| full.to_string())
            .unwrap_or(collapsed);

        if skills
            .iter()
            .any(|kept| kept.eq_ignore_ascii_case(&canonical))
        {
            changes.dropped.push(original.clone());
            continue;
        }

        if skills.len() >= MAX_SKILLS {
            changes.dropped.push(original.clone());
            continue;
        }

        if canonical != *original {
            changes.renamed.push(SkillRename {
                from: original.clone(),
                to: canonical.clone(),
            });
        }
        skills.push(canonical);
    }

    (skills, changes)
}

/// Normalize an extracted profile. Unknown open-to-work defaults to false.
pub fn prepare_person(extracted: &ExtractedPerson) -> (PreparedPerson, SkillChanges) {
    let (skills, changes) = normalize_skills(&extracted.skills);

    let prepared = PreparedPerson {
        name: extracted.name.as_deref().and_then(collapse_ws),
        title: extracted.title.as_deref().and_then(collapse_ws),
        skills,
        open_to_work: extracted.open_to_work.unwrap_or(false),
    };

    (prepared, changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted(name: Option<&str>, title: Option<&str>, skills: &[&str]) -> ExtractedPerson {
        ExtractedPerson {
            name: name.map(str::to_string),
            title: title.map(str::to_string),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            open_to_work: None,
        }
    }

    #[test]
    fn whitespace_is_collapsed_and_empty_becomes_none() {
        let (prepared, _) = prepare_person(&extracted(
            Some("  Ada   Lovelace "),
            Some("   "),
            &[],
        ));
        assert_eq!(prepared.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(prepared.title, None);
    }

    #[test]
    fn unknown_open_to_work_defaults_to_false() {
        let (prepared, _) = prepare_person(&extracted(Some("Ada"), None, &[]));
        assert!(!prepared.open_to_work);

        let mut e = extracted(Some("Ada"), None, &[]);
        e.open_to_work = Some(true);
        let (prepared, _) = prepare_person(&e);
        assert!(prepared.open_to_work);
    }

    #[test]
    fn aliases_are_canonicalized_and_recorded() {
        let (skills, changes) = normalize_skills(&["js".to_string(), "Rust".to_string()]);
        assert_eq!(skills, vec!["JavaScript", "Rust"]);
        assert_eq!(
            changes.renamed,
            vec![SkillRename {
                from: "js".to_string(),
                to: "JavaScript".to_string()
            }]
        );
        assert!(changes.dropped.is_empty());
    }

    #[test]
    fn dedupe_is_case_insensitive_first_spelling_wins() {
        let (skills, changes) = normalize_skills(&[
            "React".to_string(),
            "react".to_string(),
            "reactjs".to_string(),
        ]);
        assert_eq!(skills, vec!["React"]);
        // "react" collides directly; "reactjs" canonicalizes to React and collides too.
        assert_eq!(changes.dropped, vec!["react", "reactjs"]);
    }

    #[test]
    fn empty_and_overlong_skills_are_dropped() {
        let long = "x".repeat(100);
        let (skills, changes) =
            normalize_skills(&["  ".to_string(), long.clone(), "Go".to_string()]);
        assert_eq!(skills, vec!["Go"]);
        assert_eq!(changes.dropped, vec!["  ".to_string(), long]);
    }

    #[test]
    fn list_is_capped_with_overflow_recorded() {
        let raw: Vec<String> = (0..15).map(|i| format!("skill-{}", i)).collect();
        let (skills, changes) = normalize_skills(&raw);
        assert_eq!(skills.len(), 12);
        assert_eq!(changes.dropped.len(), 3);
        assert_eq!(changes.dropped[0], "skill-12");
    }

    #[test]
    fn whitespace_rename_is_recorded() {
        let (skills, changes) = normalize_skills(&["  Machine   Learning ".to_string()]);
        assert_eq!(skills, vec!["Machine Learning"]);
        assert_eq!(changes.renamed.len(), 1);
        assert_eq!(changes.renamed[0].to, "Machine Learning");
    }
}
