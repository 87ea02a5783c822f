//! Shared collaborators every session dispatches to.

use std::sync::Arc;

use tourbot_core::{
    Gazetteer, GeneralResponder, GenerationSettings, InterestExtractor, KnowledgeLookup,
    LLMProvider, MatchDecision, Policy, Responder, Router, RoutingDecision, SalesResponder,
    ToolRegistry, WelcomeGenerator,
};

/// Sampling settings per generation call, plus the interest lookback.
#[derive(Debug, Clone)]
pub struct AssistantSettings {
    pub route: GenerationSettings,
    pub chat: GenerationSettings,
    pub sales: GenerationSettings,
    pub welcome: GenerationSettings,
    pub lookback: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            route: GenerationSettings::default(),
            chat: GenerationSettings::default(),
            sales: GenerationSettings {
                temperature: 0.3,
                ..GenerationSettings::default()
            },
            welcome: GenerationSettings::default(),
            lookback: InterestExtractor::DEFAULT_LOOKBACK,
        }
    }
}

/// Router, responders and welcome generator. Immutable once built, so one
/// instance can serve any number of sessions.
pub struct Assistants {
    pub router: Router,
    pub general: GeneralResponder,
    pub sales: SalesResponder,
    pub welcome: WelcomeGenerator,
    pub policy: Arc<Policy>,
}

impl Assistants {
    pub fn builder(
        provider: Arc<dyn LLMProvider>,
        knowledge: Arc<dyn KnowledgeLookup>,
        policy: Arc<Policy>,
        gazetteer: Arc<Gazetteer>,
    ) -> AssistantsBuilder {
        AssistantsBuilder {
            provider,
            knowledge,
            policy,
            gazetteer,
            route_tools: ToolRegistry::new(),
            chat_tools: ToolRegistry::new(),
            settings: AssistantSettings::default(),
        }
    }

    #[must_use]
    pub fn responder(&self, decision: RoutingDecision) -> &dyn Responder {
        match decision {
            RoutingDecision::General => &self.general,
            RoutingDecision::Sales => &self.sales,
        }
    }
}

pub struct AssistantsBuilder {
    provider: Arc<dyn LLMProvider>,
    knowledge: Arc<dyn KnowledgeLookup>,
    policy: Arc<Policy>,
    gazetteer: Arc<Gazetteer>,
    route_tools: ToolRegistry,
    chat_tools: ToolRegistry,
    settings: AssistantSettings,
}

impl AssistantsBuilder {
    /// Tools the match decision may call, typically the product search.
    #[must_use]
    pub fn route_tools(mut self, tools: ToolRegistry) -> Self {
        self.route_tools = tools;
        self
    }

    /// Tools the general responder may call, typically the web search.
    #[must_use]
    pub fn chat_tools(mut self, tools: ToolRegistry) -> Self {
        self.chat_tools = tools;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: AssistantSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn build(self) -> Assistants {
        let Self {
            provider,
            knowledge,
            policy,
            gazetteer,
            route_tools,
            chat_tools,
            settings,
        } = self;

        let decision = MatchDecision::new(
            provider.clone(),
            knowledge.clone(),
            gazetteer.clone(),
            policy.clone(),
            settings.route,
        )
        .with_tools(route_tools);
        let router = Router::new(gazetteer.clone(), decision).with_lookback(settings.lookback);

        let general = GeneralResponder::new(
            provider.clone(),
            policy.clone(),
            gazetteer.clone(),
            settings.chat,
        )
        .with_tools(chat_tools);

        let sales = SalesResponder::new(
            provider.clone(),
            knowledge,
            gazetteer,
            policy.clone(),
            settings.sales,
        )
        .with_lookback(settings.lookback);

        let welcome = WelcomeGenerator::new(provider, policy.clone(), settings.welcome);

        Assistants {
            router,
            general,
            sales,
            welcome,
            policy,
        }
    }
}
