//! Content-scope gate for the general responder.

use crate::policy::Policy;
use crate::routing::Gazetteer;
use crate::window::ConversationWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeVerdict {
    /// Travel or geography question; may be answered.
    InScope,
    /// "Who are you?"; answered with the fixed identity message.
    Identity,
    /// Must be declined with the fixed refusal message.
    OutOfScope,
}

/// Decides from policy data alone, before any generation call, whether a
/// question may be answered.
#[derive(Debug, Clone, Copy)]
pub struct ScopeGuard<'a> {
    policy: &'a Policy,
    gazetteer: &'a Gazetteer,
}

impl<'a> ScopeGuard<'a> {
    #[must_use]
    pub const fn new(policy: &'a Policy, gazetteer: &'a Gazetteer) -> Self {
        Self { policy, gazetteer }
    }

    /// An utterance is in scope when it names a place or a travel keyword.
    /// Off-topic terms without a place are refused whatever the window
    /// holds. Otherwise earlier user turns that were in scope carry a
    /// follow-up question.
    #[must_use]
    pub fn check(&self, window: &ConversationWindow, utterance: &str) -> ScopeVerdict {
        if contains_any(utterance, &self.policy.identity_terms) {
            return ScopeVerdict::Identity;
        }

        let names_place = self.gazetteer.mentions_any(utterance);
        if contains_any(utterance, &self.policy.off_topic_terms) && !names_place {
            return ScopeVerdict::OutOfScope;
        }

        if names_place || self.is_travel_text(utterance) {
            return ScopeVerdict::InScope;
        }

        let window_in_scope = window
            .recent_user_contents(window.len())
            .into_iter()
            .any(|text| self.gazetteer.mentions_any(text) || self.is_travel_text(text));
        if window_in_scope {
            ScopeVerdict::InScope
        } else {
            ScopeVerdict::OutOfScope
        }
    }

    fn is_travel_text(&self, text: &str) -> bool {
        contains_any(text, &self.policy.keywords)
    }
}

fn contains_any(text: &str, terms: &[String]) -> bool {
    let lowered = text.to_lowercase();
    terms
        .iter()
        .filter(|t| !t.is_empty())
        .any(|t| lowered.contains(&t.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatMessage;

    fn fixtures() -> (Policy, Gazetteer) {
        let Ok(policy) = Policy::builtin() else {
            panic!("built-in policy must parse");
        };
        let gazetteer = Gazetteer::from_policy(&policy);
        (policy, gazetteer)
    }

    #[test]
    fn weather_is_refused_regardless_of_window() {
        let (policy, gazetteer) = fixtures();
        let guard = ScopeGuard::new(&policy, &gazetteer);
        let mut window = ConversationWindow::new(4);
        window.push(ChatMessage::user("北京有哪些好玩的地方？"));
        window.push(ChatMessage::assistant("故宫、颐和园都很有名。"));
        assert_eq!(guard.check(&window, "今天天气怎么样？"), ScopeVerdict::OutOfScope);
        assert_eq!(
            guard.check(&ConversationWindow::new(4), "今天天气怎么样？"),
            ScopeVerdict::OutOfScope
        );
    }

    #[test]
    fn stock_market_is_refused() {
        let (policy, gazetteer) = fixtures();
        let guard = ScopeGuard::new(&policy, &gazetteer);
        assert_eq!(
            guard.check(&ConversationWindow::new(4), "今天股市表现如何？"),
            ScopeVerdict::OutOfScope
        );
    }

    #[test]
    fn places_and_keywords_are_in_scope() {
        let (policy, gazetteer) = fixtures();
        let guard = ScopeGuard::new(&policy, &gazetteer);
        let empty = ConversationWindow::new(4);
        assert_eq!(guard.check(&empty, "云南有什么特色？"), ScopeVerdict::InScope);
        assert_eq!(guard.check(&empty, "哪里的美食最多？"), ScopeVerdict::InScope);
        assert_eq!(guard.check(&empty, "北京明天天气如何？"), ScopeVerdict::InScope);
    }

    #[test]
    fn identity_question_has_its_own_verdict() {
        let (policy, gazetteer) = fixtures();
        let guard = ScopeGuard::new(&policy, &gazetteer);
        assert_eq!(
            guard.check(&ConversationWindow::new(4), "你是谁？"),
            ScopeVerdict::Identity
        );
    }

    #[test]
    fn follow_up_inherits_scope_from_user_turns_only() {
        let (policy, gazetteer) = fixtures();
        let guard = ScopeGuard::new(&policy, &gazetteer);

        let mut welcome_only = ConversationWindow::new(4);
        welcome_only.push(ChatMessage::assistant("我们聊点旅游相关的话题吧"));
        assert_eq!(guard.check(&welcome_only, "那要怎么去呢？"), ScopeVerdict::OutOfScope);

        let mut window = ConversationWindow::new(4);
        window.push(ChatMessage::user("杭州西湖值得去吗？"));
        assert_eq!(guard.check(&window, "那要怎么去呢？"), ScopeVerdict::InScope);
    }
}
