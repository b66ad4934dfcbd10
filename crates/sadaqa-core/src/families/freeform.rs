//! Family extraction from unstructured text.
//!
//! Three patterns, tried most specific first: an explicit "Famille X - district
//! - N membres" phrase, a capitalised name followed by district and count, and
//! finally bare capitalised name lines. Needs and priority are read from a
//! window of text around each match.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::tabular::parse_members;
use crate::keywords::{
    contains_any, CONTEXT_HIGH_PRIORITY, CONTEXT_LOW_PRIORITY, CONTEXT_NEGATED_URGENCY,
    NEED_LABELS,
};
use crate::models::{FamilyRecord, Priority, INFORMATION_TO_COMPLETE, UNSPECIFIED_DISTRICT};

/// Characters of context read before a match.
const CONTEXT_BEFORE: usize = 100;
/// Characters of context read after a match.
const CONTEXT_AFTER: usize = 300;

static LABELLED_FAMILY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:famille|family|أسرة)\s+([^\n-]+?)(?:\s*-\s*|\s+)([^\n-]+?)(?:\s*-\s*|\s+)([0-9]+)\s*(?:membres|members|أفراد)",
    )
    .unwrap()
});

static NAME_DISTRICT_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+)*)[ \t]*(?:-[ \t]*|,)[ \t]*([^,\n]+?)(?:,[ \t]*|[ \t]+)([0-9]+)[ \t]*(?i:membres|members|personnes|أفراد)",
    )
    .unwrap()
});

static NAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+)+").unwrap());

/// "Famille Benali - Derb Sultan - 6 membres".
pub fn labelled_family(text: &str) -> Vec<FamilyRecord> {
    captured_families(text, &LABELLED_FAMILY)
}

/// "Benali, Hay Mohammadi, 5 personnes" at the start of a line.
pub fn name_district_count(text: &str) -> Vec<FamilyRecord> {
    captured_families(text, &NAME_DISTRICT_COUNT)
}

/// Lines that begin with a multi-word capitalised name. District and size
/// are unknown, so the record is flagged for completion.
pub fn name_lines(text: &str) -> Vec<FamilyRecord> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|line| (6..=100).contains(&line.chars().count()))
        .filter_map(|line| NAME_LINE.find(line))
        .filter_map(|m| {
            FamilyRecord::new(
                m.as_str(),
                UNSPECIFIED_DISTRICT,
                0,
                vec![INFORMATION_TO_COMPLETE.to_string()],
                Priority::Medium,
            )
        })
        .filter(|f| seen.insert(f.name.clone()))
        .collect()
}

/// Run a name/district/members pattern over `text`, reading needs and
/// priority from the surrounding context of each match.
fn captured_families(text: &str, pattern: &Regex) -> Vec<FamilyRecord> {
    let mut seen = HashSet::new();
    let mut families = Vec::new();

    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(name), Some(district), Some(members)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        let context = context_window(text, whole.start(), whole.end());
        let Some(family) = FamilyRecord::new(
            name.as_str(),
            district.as_str(),
            parse_members(members.as_str()),
            needs_in(&context),
            priority_in(&context),
        ) else {
            continue;
        };

        if seen.insert(family.name.clone()) {
            families.push(family);
        }
    }

    families
}

/// Lower-cased text from `CONTEXT_BEFORE` characters before `start` to
/// `CONTEXT_AFTER` characters after `end`, clamped to the text.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(CONTEXT_BEFORE)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_AFTER)
        .map_or(text.len(), |(i, _)| end + i);
    text[from..to].to_lowercase()
}

/// Need labels whose keyword appears in `context`, first occurrence order, no repeats.
fn needs_in(context: &str) -> Vec<String> {
    let mut needs: Vec<String> = Vec::new();
    for (keyword, label) in NEED_LABELS {
        if context.contains(keyword) && !needs.iter().any(|n| n == label) {
            needs.push(label.to_string());
        }
    }
    needs
}

fn priority_in(context: &str) -> Priority {
    if contains_any(context, CONTEXT_NEGATED_URGENCY) {
        Priority::Low
    } else if contains_any(context, CONTEXT_HIGH_PRIORITY) {
        Priority::High
    } else if contains_any(context, CONTEXT_LOW_PRIORITY) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_family_with_urgent_need() {
        let text = "Famille Benali - Derb Sultan - 6 membres, besoin urgent de nourriture";
        let families = labelled_family(text);
        assert_eq!(families.len(), 1);
        let f = &families[0];
        assert_eq!(f.name, "Benali");
        assert_eq!(f.district, "Derb Sultan");
        assert_eq!(f.members, 6);
        assert_eq!(f.priority, Priority::High);
        assert!(f.needs.contains(&"Nourriture".to_string()));
    }

    #[test]
    fn labelled_family_english() {
        let text = "Family Haddad - Anfa - 3 members\nneeds clothing";
        let families = labelled_family(text);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].district, "Anfa");
        assert_eq!(families[0].needs, vec!["Vêtements"]);
        assert_eq!(families[0].priority, Priority::Medium);
    }

    #[test]
    fn negated_urgency_is_low() {
        let text = "Famille Tazi - Maarif - 2 membres, non urgent";
        assert_eq!(labelled_family(text)[0].priority, Priority::Low);
    }

    #[test]
    fn duplicates_collapse() {
        let text = "Famille Tazi - Maarif - 2 membres\nFamille Tazi - Maarif - 2 membres";
        assert_eq!(labelled_family(text).len(), 1);
    }

    #[test]
    fn name_district_count_line() {
        let text = "Liste du quartier\nBenali, Hay Mohammadi, 5 personnes\n";
        let families = name_district_count(text);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Benali");
        assert_eq!(families[0].district, "Hay Mohammadi");
        assert_eq!(families[0].members, 5);
        assert_eq!(families[0].needs, vec!["General aid"]);
    }

    #[test]
    fn name_lines_flag_missing_information() {
        let text = "Karim Alaoui\nx\nResponsable: voir plus bas\nSaid Idrissi Benjelloun\nKarim Alaoui";
        let families = name_lines(text);
        let names: Vec<&str> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Karim Alaoui", "Said Idrissi Benjelloun"]);
        assert_eq!(families[0].district, UNSPECIFIED_DISTRICT);
        assert_eq!(families[0].members, 0);
        assert_eq!(families[0].needs, vec![INFORMATION_TO_COMPLETE]);
    }

    #[test]
    fn context_window_respects_char_boundaries() {
        let text = format!("{}Famille Amrani - Sbata - 4 membres{}", "é".repeat(150), "ü".repeat(400));
        let start = text.find("Famille").unwrap();
        let end = text.find("membres").unwrap() + "membres".len();
        let ctx = context_window(&text, start, end);
        assert!(ctx.starts_with('é'));
        assert_eq!(ctx.chars().filter(|c| *c == 'é').count(), 100);
        assert_eq!(ctx.chars().filter(|c| *c == 'ü').count(), 300);
    }

    #[test]
    fn needs_deduplicate_labels() {
        let needs = needs_in("médicaments et medicine, santé");
        assert_eq!(needs, vec!["Médicaments", "Soins de santé"]);
    }
}
