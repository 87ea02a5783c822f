//! Per-turn routing between the general and sales responders.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::decision::{DecisionReport, MatchDecision, MatchSignal};
use super::gazetteer::Gazetteer;
use super::interest::{InterestExtractor, InterestTopic};
use crate::window::ConversationWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingDecision {
    General,
    Sales,
}

impl From<&MatchSignal> for RoutingDecision {
    /// Anything but a confirmed match goes to the general responder.
    fn from(signal: &MatchSignal) -> Self {
        match signal {
            MatchSignal::Match => Self::Sales,
            MatchSignal::NoMatch | MatchSignal::Malformed(_) => Self::General,
        }
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("general"),
            Self::Sales => f.write_str("sales"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    AwaitingInput,
    Extracting,
    Deciding,
    Dispatched(RoutingDecision),
}

impl RouterState {
    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::AwaitingInput, Self::Extracting)
                | (Self::Extracting, Self::Deciding)
                | (Self::Deciding, Self::Dispatched(_) | Self::AwaitingInput)
                | (Self::Dispatched(_), Self::AwaitingInput)
        )
    }
}

#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub decision: RoutingDecision,
    pub topic: InterestTopic,
    pub report: DecisionReport,
    /// States visited while routing, starting and ending at `AwaitingInput`.
    pub trace: Vec<RouterState>,
}

pub struct Router {
    gazetteer: Arc<Gazetteer>,
    decision: MatchDecision,
    lookback: usize,
}

impl Router {
    pub fn new(gazetteer: Arc<Gazetteer>, decision: MatchDecision) -> Self {
        Self {
            gazetteer,
            decision,
            lookback: InterestExtractor::DEFAULT_LOOKBACK,
        }
    }

    #[must_use]
    pub const fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    #[must_use]
    pub fn extractor(&self) -> InterestExtractor<'_> {
        InterestExtractor::new(&self.gazetteer).with_lookback(self.lookback)
    }

    /// Route one turn. Errors only when the decision's generation call fails;
    /// every other outcome is a decision.
    pub async fn route(
        &self,
        window: &ConversationWindow,
        utterance: &str,
    ) -> anyhow::Result<RouteOutcome> {
        let mut trace = vec![RouterState::AwaitingInput];

        advance(&mut trace, RouterState::Extracting);
        let topic = self.extractor().extract(window, utterance);

        advance(&mut trace, RouterState::Deciding);
        let report = match self.decision.decide(window, utterance, &topic).await {
            Ok(report) => report,
            Err(e) => {
                advance(&mut trace, RouterState::AwaitingInput);
                return Err(e);
            }
        };

        let decision = RoutingDecision::from(&report.signal);
        advance(&mut trace, RouterState::Dispatched(decision));
        info!(
            "Routed turn: topic={topic}, reason={:?}, decision={decision}",
            report.reason
        );
        advance(&mut trace, RouterState::AwaitingInput);

        Ok(RouteOutcome {
            decision,
            topic,
            report,
            trace,
        })
    }
}

fn advance(trace: &mut Vec<RouterState>, next: RouterState) {
    if let Some(&current) = trace.last() {
        debug_assert!(
            current.can_transition_to(next),
            "illegal router transition {current:?} -> {next:?}"
        );
        debug!("Router {current:?} -> {next:?}");
    }
    trace.push(next);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_and_no_match_go_general() {
        assert_eq!(
            RoutingDecision::from(&MatchSignal::Malformed("3".to_string())),
            RoutingDecision::General
        );
        assert_eq!(
            RoutingDecision::from(&MatchSignal::NoMatch),
            RoutingDecision::General
        );
        assert_eq!(
            RoutingDecision::from(&MatchSignal::Match),
            RoutingDecision::Sales
        );
    }

    #[test]
    fn state_transitions() {
        use RouterState::{AwaitingInput, Deciding, Dispatched, Extracting};
        assert!(AwaitingInput.can_transition_to(Extracting));
        assert!(Extracting.can_transition_to(Deciding));
        assert!(Deciding.can_transition_to(Dispatched(RoutingDecision::Sales)));
        assert!(Dispatched(RoutingDecision::General).can_transition_to(AwaitingInput));
        assert!(!AwaitingInput.can_transition_to(Deciding));
        assert!(!Extracting.can_transition_to(Dispatched(RoutingDecision::General)));
    }
}
