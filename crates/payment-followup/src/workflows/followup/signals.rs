use serde::{Deserialize, Serialize};

use super::policy::KeywordFamilies;

/// Keywords matched in an invoice's notes, grouped by family in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesSignals {
    pub high: Vec<String>,
    pub low: Vec<String>,
    pub soften: Vec<String>,
    pub no_followup: Vec<String>,
}

impl NotesSignals {
    /// Scan lower-cased notes for every configured keyword family.
    pub fn extract(notes: &str, families: &KeywordFamilies) -> Self {
        let text = notes.to_lowercase();
        Self {
            high: find_keywords(&text, &families.high),
            low: find_keywords(&text, &families.low),
            soften: find_keywords(&text, &families.soften),
            no_followup: find_keywords(&text, &families.no_followup),
        }
    }

    /// `label:keyword` flags; no-followup flags are appended last when requested.
    pub fn flags(&self, include_no_followup: bool) -> Vec<String> {
        let mut families = vec![
            ("high", &self.high),
            ("low", &self.low),
            ("soften", &self.soften),
        ];
        if include_no_followup {
            families.push(("no_followup", &self.no_followup));
        }

        families
            .into_iter()
            .flat_map(|(label, items)| items.iter().map(move |item| format!("{label}:{item}")))
            .collect()
    }
}

fn find_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_notes_yield_no_signals() {
        let signals = NotesSignals::extract("", &KeywordFamilies::default());
        assert_eq!(signals, NotesSignals::default());
        assert!(signals.flags(true).is_empty());
    }

    #[test]
    fn matches_follow_configuration_order_not_text_order() {
        let signals = NotesSignals::extract(
            "Client IGNORED two emails after a Late Payment last quarter",
            &KeywordFamilies::default(),
        );
        assert_eq!(signals.high, vec!["late payment", "ignored"]);
        assert!(signals.low.is_empty());
    }

    #[test]
    fn flags_exclude_no_followup_on_request() {
        let signals = NotesSignals::extract(
            "Dispute resolved, apologized for the billing issue",
            &KeywordFamilies::default(),
        );
        assert_eq!(
            signals.flags(false),
            vec!["low:apologized", "soften:dispute", "soften:billing issue"]
        );
        assert_eq!(
            signals.flags(true).last().map(String::as_str),
            Some("no_followup:resolved")
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let families = KeywordFamilies::default();
        let notes = "Broken promise on the incorrect invoice; long-term client.";
        assert_eq!(
            NotesSignals::extract(notes, &families),
            NotesSignals::extract(notes, &families)
        );
    }
}
