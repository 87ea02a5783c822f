//! Interest extraction, product-match decision and routing.

mod decision;
mod gazetteer;
mod interest;
mod router;

pub use decision::{
    DecisionReason, DecisionReport, MATCH_TOKEN, MatchDecision, MatchSignal, NO_MATCH_TOKEN,
    corresponding_entries, parse_decision,
};
pub use gazetteer::{Gazetteer, PlaceMention};
pub use interest::{InterestExtractor, InterestTopic};
pub use router::{RouteOutcome, Router, RouterState, RoutingDecision};
