/// Curated video topics and the keyword matcher that routes questions to them.
///
/// Certain caregiver intents have a pre-authored training video that is a
/// better answer than anything the generation chain would produce. Matching is
/// a cheap case-insensitive substring test run before generation; a hit
/// short-circuits the whole chain.
/// A curated catalog entry pointing at a training video.
#[derive(Debug, Clone)]
pub struct Topic {
    /// Stable key, also used as the retrieval query for the video summary.
    pub key: &'static str,
    pub title: &'static str,
    pub url: &'static str,
    pub keywords: &'static [&'static str],
}

/// Ordered topic catalog. Iteration order is significant: when a question
/// matches several topics, the first one in the catalog wins.
pub struct TopicCatalog {
    topics: Vec<Topic>,
}

impl Default for TopicCatalog {
    fn default() -> Self {
        Self {
            topics: vec![
                Topic {
                    key: "wandering",
                    title: "Preventing Wandering",
                    url: "https://www.youtube.com/embed/Sw0yEB508mI",
                    keywords: &[
                        "wandering",
                        "goes out",
                        "go out",
                        "leaves home",
                        "roaming",
                        "walks away",
                        "disappears",
                    ],
                },
                Topic {
                    key: "aggression",
                    title: "Handling Aggression in Dementia",
                    url: "https://www.youtube.com/embed/hahvUXwTXE4",
                    keywords: &["aggression", "angry", "hits", "shouting", "violence", "outbursts"],
                },
                Topic {
                    key: "communication",
                    title: "Effective Communication Techniques",
                    url: "https://www.youtube.com/embed/tAKwDFdy8WQ",
                    keywords: &[
                        "communication",
                        "talking",
                        "conversation",
                        "express",
                        "language",
                        "understand",
                    ],
                },
            ],
        }
    }
}

impl TopicCatalog {
    /// Match a question (already normalized to English) against the catalog.
    ///
    /// Returns the first topic with any keyword appearing as a case-insensitive
    /// substring of the question, or `None`.
    pub fn match_question(&self, question_en: &str) -> Option<&Topic> {
        let lowered = question_en.to_lowercase();
        self.topics
            .iter()
            .find(|topic| topic.keywords.iter().any(|kw| lowered.contains(kw)))
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive() {
        let catalog = TopicCatalog::default();
        let topic = catalog
            .match_question("My father keeps WANDERING at night")
            .expect("should match");
        assert_eq!(topic.key, "wandering");
    }

    #[test]
    fn multi_word_keyword_matches_substring() {
        let catalog = TopicCatalog::default();
        let topic = catalog
            .match_question("she leaves home without telling anyone")
            .expect("should match");
        assert_eq!(topic.key, "wandering");
    }

    #[test]
    fn first_topic_in_catalog_order_wins() {
        let catalog = TopicCatalog::default();
        // Matches both "wandering" (goes out) and "communication" (talking);
        // catalog order decides.
        let topic = catalog
            .match_question("he goes out when we are talking")
            .expect("should match");
        assert_eq!(topic.key, "wandering");
    }

    #[test]
    fn unrelated_question_does_not_match() {
        let catalog = TopicCatalog::default();
        assert!(catalog.match_question("what is dementia").is_none());
    }

    #[test]
    fn catalog_keys_are_unique() {
        let catalog = TopicCatalog::default();
        let mut keys: Vec<&str> = catalog.topics.iter().map(|t| t.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), catalog.topics.len());
    }

    #[test]
    fn aggression_and_communication_topics_resolve() {
        let catalog = TopicCatalog::default();
        assert_eq!(
            catalog.match_question("he gets angry and starts shouting").unwrap().key,
            "aggression"
        );
        assert_eq!(
            catalog.match_question("how do I improve our conversation").unwrap().key,
            "communication"
        );
    }
}
