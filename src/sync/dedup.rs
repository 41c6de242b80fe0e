use std::collections::HashSet;

use crate::models::Race;

/// One link write: a race name and a language name it references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRef<'a> {
    pub race: &'a str,
    pub language: &'a str,
}

/// Languages to create and links to write for one batch.
///
/// `distinct` holds each language name once, in order of first appearance.
/// `links` holds one entry per language reference in the input, so a race
/// that lists a language twice produces two links.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LanguagePlan<'a> {
    pub distinct: Vec<&'a str>,
    pub links: Vec<LinkRef<'a>>,
}

impl<'a> LanguagePlan<'a> {
    pub fn from_batch(races: &'a [Race]) -> Self {
        let mut seen = HashSet::new();
        let mut plan = LanguagePlan::default();

        for race in races {
            for language in &race.languages {
                if seen.insert(language.as_str()) {
                    plan.distinct.push(language.as_str());
                }
                plan.links.push(LinkRef {
                    race: &race.name,
                    language,
                });
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link<'a>(race: &'a str, language: &'a str) -> LinkRef<'a> {
        LinkRef { race, language }
    }

    #[test]
    fn test_shared_language_is_created_once() {
        let races = vec![
            Race::new("A").with_languages(["x", "y"]),
            Race::new("B").with_languages(["y", "z"]),
        ];
        let plan = LanguagePlan::from_batch(&races);

        assert_eq!(plan.distinct, vec!["x", "y", "z"]);
        assert_eq!(
            plan.links,
            vec![link("A", "x"), link("A", "y"), link("B", "y"), link("B", "z")]
        );
    }

    #[test]
    fn test_duplicate_within_race_links_twice() {
        let races = vec![Race::new("A").with_languages(["x", "x"])];
        let plan = LanguagePlan::from_batch(&races);

        assert_eq!(plan.distinct, vec!["x"]);
        assert_eq!(plan.links, vec![link("A", "x"), link("A", "x")]);
    }

    #[test]
    fn test_races_without_languages() {
        let races = vec![Race::new("A"), Race::new("B")];
        assert_eq!(LanguagePlan::from_batch(&races), LanguagePlan::default());
    }
}
