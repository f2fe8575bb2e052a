//! Keyword filtering over record text: case-insensitive any-substring match.

/// The configured keyword list, lowercased once at construction and immutable
/// for the run.
#[derive(Clone, Debug)]
pub struct KeywordSet {
    words: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when title+body contains at least one keyword. An empty set
    /// matches nothing, so misconfiguration never turns the filter off.
    pub fn matches(&self, title: Option<&str>, body: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        let mut hay = String::with_capacity(body.len() + title.map_or(0, |t| t.len() + 1));
        if let Some(t) = title {
            hay.push_str(&t.to_lowercase());
            hay.push(' ');
        }
        hay.push_str(&body.to_lowercase());
        self.words.iter().any(|w| hay.contains(w.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_insensitive() {
        let kw = KeywordSet::new(["Python", "rust"]);
        assert!(kw.matches(Some("PYTHON tips"), "nothing else"));
        assert!(kw.matches(None, "I like RuSt a lot"));
        assert!(!kw.matches(Some("golang"), "java kotlin"));
    }

    #[test]
    fn title_alone_is_enough() {
        let kw = KeywordSet::new(["python"]);
        assert!(kw.matches(Some("python 3.13 released"), ""));
    }

    #[test]
    fn blank_entries_are_dropped_and_empty_set_matches_nothing() {
        let kw = KeywordSet::new(["", "  ", "\t"]);
        assert!(kw.is_empty());
        assert!(!kw.matches(Some("anything"), "at all"));
    }

    #[test]
    fn substring_match_crosses_word_boundaries() {
        let kw = KeywordSet::new(["script"]);
        assert!(kw.matches(None, "I write javascript daily"));
    }
}
