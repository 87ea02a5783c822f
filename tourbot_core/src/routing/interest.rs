//! Derives the user's topic of interest from the recent user turns.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use super::gazetteer::Gazetteer;
use crate::catalog::CatalogEntry;
use crate::window::ConversationWindow;

/// Place, attraction or travel project the user keeps coming back to.
///
/// `places` holds the region first, followed by the more specific places
/// mentioned under it, in order of first mention.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterestTopic {
    places: Vec<String>,
}

impl InterestTopic {
    #[must_use]
    pub const fn none() -> Self {
        Self { places: Vec::new() }
    }

    #[must_use]
    pub fn from_places(places: Vec<String>) -> Self {
        Self { places }
    }

    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.places.is_empty()
    }

    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.places.first().map(String::as_str)
    }

    #[must_use]
    pub fn places(&self) -> &[String] {
        &self.places
    }

    /// `北京/故宫`, or empty when nothing was identified.
    #[must_use]
    pub fn label(&self) -> String {
        self.places.join("/")
    }

    /// Whether `entry` is about this topic: it names one of the topic's
    /// places (or an alias), or a place inside the topic's region.
    #[must_use]
    pub fn corresponds_to(&self, entry: &CatalogEntry, gazetteer: &Gazetteer) -> bool {
        let Some(region) = self.region() else {
            return false;
        };
        let subject = entry.subject_text();
        let named = self
            .places
            .iter()
            .flat_map(|p| gazetteer.surfaces(p))
            .any(|surface| subject.contains(surface));
        named
            || gazetteer
                .mentions(&subject)
                .iter()
                .any(|m| m.root == region)
    }
}

impl fmt::Display for InterestTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.places.is_empty() {
            f.write_str("none identified")
        } else {
            f.write_str(&self.label())
        }
    }
}

#[derive(Debug, Default)]
struct RegionHits {
    /// Inputs (by index) the region was mentioned in.
    inputs: Vec<usize>,
    /// (input index, byte offset) of the latest mention.
    latest: (usize, usize),
    /// Places under the region in order of first mention.
    places: Vec<String>,
}

/// Finds the region that recurs across the last `lookback` user turns and
/// the current utterance.
#[derive(Debug, Clone, Copy)]
pub struct InterestExtractor<'a> {
    gazetteer: &'a Gazetteer,
    lookback: usize,
}

impl<'a> InterestExtractor<'a> {
    pub const DEFAULT_LOOKBACK: usize = 2;

    #[must_use]
    pub const fn new(gazetteer: &'a Gazetteer) -> Self {
        Self {
            gazetteer,
            lookback: Self::DEFAULT_LOOKBACK,
        }
    }

    #[must_use]
    pub const fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    /// A region counts when the utterance mentions it and at least one of
    /// the earlier user turns does too. With several recurring regions the
    /// most recently mentioned wins. Fewer than two inputs yields no topic.
    #[must_use]
    pub fn extract(&self, window: &ConversationWindow, utterance: &str) -> InterestTopic {
        let mut inputs = window.recent_user_contents(self.lookback);
        inputs.push(utterance);

        if inputs.len() < 2 {
            debug!("Not enough user turns to find a recurring interest");
            return InterestTopic::none();
        }

        let mut regions: BTreeMap<String, RegionHits> = BTreeMap::new();
        for (index, text) in inputs.iter().enumerate() {
            for mention in self.gazetteer.mentions(text) {
                let hits = regions.entry(mention.root.clone()).or_default();
                if !hits.inputs.contains(&index) {
                    hits.inputs.push(index);
                }
                hits.latest = hits.latest.max((index, mention.last_position));
                if !hits.places.contains(&mention.place) {
                    hits.places.push(mention.place);
                }
            }
        }

        let current = inputs.len() - 1;
        let chosen = regions
            .into_iter()
            .filter(|(_, hits)| hits.inputs.contains(&current) && hits.inputs.len() >= 2)
            .max_by_key(|(_, hits)| hits.latest);

        let Some((region, hits)) = chosen else {
            debug!("No place recurs across {} inputs", inputs.len());
            return InterestTopic::none();
        };

        let mut places = vec![region.clone()];
        places.extend(hits.places.into_iter().filter(|p| *p != region));
        let topic = InterestTopic::from_places(places);
        debug!("Interest topic: {topic}");
        topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatMessage;
    use crate::policy::Place;

    fn gazetteer() -> Gazetteer {
        Gazetteer::new(vec![
            Place::new("北京"),
            Place::new("故宫").with_parent("北京"),
            Place::new("颐和园").with_parent("北京"),
            Place::new("云南"),
            Place::new("丽江").with_parent("云南"),
            Place::new("杭州"),
        ])
    }

    fn window(turns: &[ChatMessage]) -> ConversationWindow {
        ConversationWindow::from_transcript(turns, 4)
    }

    #[test]
    fn region_and_attraction_recur_as_one_topic() {
        let g = gazetteer();
        let w = window(&[
            ChatMessage::user("北京有哪些好玩的地方？"),
            ChatMessage::assistant("北京有很多著名景点，比如故宫、天安门广场、颐和园等。"),
        ]);
        let topic = InterestExtractor::new(&g).extract(&w, "故宫门票多少钱？");
        assert_eq!(topic.label(), "北京/故宫");
    }

    #[test]
    fn assistant_mentions_do_not_count() {
        let g = gazetteer();
        let w = window(&[
            ChatMessage::user("有什么推荐的地方吗？"),
            ChatMessage::assistant("北京、杭州都不错。"),
        ]);
        let topic = InterestExtractor::new(&g).extract(&w, "杭州怎么样？");
        assert!(!topic.is_identified());
    }

    #[test]
    fn single_mention_is_not_recurring() {
        let g = gazetteer();
        let w = window(&[ChatMessage::user("你好")]);
        let topic = InterestExtractor::new(&g).extract(&w, "云南好玩吗？");
        assert!(!topic.is_identified());
        assert_eq!(topic.to_string(), "none identified");
    }

    #[test]
    fn most_recent_recurring_region_wins() {
        let g = gazetteer();
        let w = window(&[
            ChatMessage::user("北京和杭州哪个好？"),
            ChatMessage::assistant("各有特色。"),
            ChatMessage::user("北京的颐和园和杭州的西湖呢？"),
        ]);
        let topic = InterestExtractor::new(&g).extract(&w, "那杭州住哪里方便？");
        assert_eq!(topic.region(), Some("杭州"));
    }

    #[test]
    fn empty_and_tiny_windows_yield_no_topic() {
        let g = gazetteer();
        let extractor = InterestExtractor::new(&g);
        let empty = ConversationWindow::new(4);
        assert!(!extractor.extract(&empty, "北京好玩吗").is_identified());
        let welcome_only = window(&[ChatMessage::assistant("欢迎！想去北京吗？")]);
        assert!(!extractor.extract(&welcome_only, "北京好玩吗").is_identified());
    }

    #[test]
    fn lookback_limits_user_turns() {
        let g = gazetteer();
        let w = window(&[
            ChatMessage::user("丽江怎么样？"),
            ChatMessage::user("随便聊聊"),
            ChatMessage::user("再聊聊"),
        ]);
        let topic = InterestExtractor::new(&g).extract(&w, "云南有什么好吃的？");
        assert!(!topic.is_identified());
        let wider = InterestExtractor::new(&g).with_lookback(3);
        assert_eq!(wider.extract(&w, "云南有什么好吃的？").label(), "云南/丽江");
    }

    #[test]
    fn utterance_must_carry_the_topic() {
        let g = gazetteer();
        let w = window(&[
            ChatMessage::user("北京有哪些好玩的地方？"),
            ChatMessage::assistant("故宫、颐和园都值得一去。"),
            ChatMessage::user("北京住哪里方便？"),
            ChatMessage::assistant("王府井一带交通方便。"),
        ]);
        let topic = InterestExtractor::new(&g).extract(&w, "今天天气怎么样？");
        assert!(!topic.is_identified());
    }

    #[test]
    fn itinerary_stopover_does_not_correspond() {
        let g = gazetteer();
        let topic = InterestTopic::from_places(vec!["北京".to_string(), "故宫".to_string()]);
        let xian = CatalogEntry::new(
            "西安兵马俑古城文化两日游",
            "759元",
            "北京西站乘高铁出发，抵达西安后参观兵马俑",
        )
        .with_destinations(["西安", "兵马俑"]);
        assert!(!topic.corresponds_to(&xian, &g));
    }

    #[test]
    fn correspondence_uses_region_membership() {
        let g = gazetteer();
        let topic = InterestTopic::from_places(vec!["云南".to_string()]);
        let lijiang = CatalogEntry::new("丽江古城五日游", "3999", "古城漫步");
        let beijing = CatalogEntry::new("故宫一日游", "399", "午门入");
        assert!(topic.corresponds_to(&lijiang, &g));
        assert!(!topic.corresponds_to(&beijing, &g));
        assert!(!InterestTopic::none().corresponds_to(&lijiang, &g));
    }
}
