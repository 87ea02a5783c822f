use std::sync::Arc;

use async_trait::async_trait;
use tourbot_core::routing::{DecisionReason, RouterState};
use tourbot_core::testing::{ScriptedProvider, StaticCatalog};
use tourbot_core::{
    CatalogEntry, Gazetteer, GenerationRequest, GenerationSettings, KnowledgeLookup, LLMProvider,
    LLMResponse, MatchSignal, Policy, Role, RoutingDecision, Tool, ToolRegistry, ToolResult,
};
use tourbot_conversation::{
    AssistantSettings, Assistants, ConversationConfig, ConversationManager, ConversationSession,
    TurnContext,
};

const FORBIDDEN_CITY: &str = "北京故宫深度一日游";

fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new(FORBIDDEN_CITY, "399元", "午门入宫，参观三大殿，神武门出")
            .with_destinations(["北京", "故宫"]),
        CatalogEntry::new("杭州西湖休闲三日游", "1299元", "苏堤、断桥、灵隐寺")
            .with_destinations(["杭州", "西湖"]),
    ]
}

struct FakeWebSearch;

#[async_trait]
impl Tool for FakeWebSearch {
    fn name(&self) -> &str {
        "WebSearch"
    }

    fn description(&self) -> &str {
        "搜索互联网"
    }

    async fn execute(&self, _input: serde_json::Value) -> ToolResult {
        ToolResult::success("云南冬季温暖")
    }
}

fn assistants_with(
    provider: Arc<dyn LLMProvider>,
    knowledge: Arc<dyn KnowledgeLookup>,
    settings: AssistantSettings,
) -> Arc<Assistants> {
    let policy = Policy::builtin().unwrap();
    let mut gazetteer = Gazetteer::from_policy(&policy);
    gazetteer.extend_with_catalog(&catalog());
    let chat_tools = ToolRegistry::new().with_tool(Arc::new(FakeWebSearch));

    Arc::new(
        Assistants::builder(provider, knowledge, Arc::new(policy), Arc::new(gazetteer))
            .chat_tools(chat_tools)
            .settings(settings)
            .build(),
    )
}

fn assistants(provider: Arc<ScriptedProvider>) -> Arc<Assistants> {
    assistants_with(
        provider,
        Arc::new(StaticCatalog::new(catalog())),
        AssistantSettings::default(),
    )
}

/// Welcome, then alternating user/assistant turns.
fn session(turns: &[(&str, &str)]) -> ConversationSession {
    let mut session = ConversationSession::new();
    session.add_message(Role::Assistant, "你好呀，我们聊点旅游相关的话题吧！".to_string());
    for (user, assistant) in turns {
        session.add_message(Role::User, (*user).to_string());
        session.add_message(Role::Assistant, (*assistant).to_string());
    }
    session
}

fn manager(assistants: Arc<Assistants>, session: ConversationSession) -> ConversationManager {
    ConversationManager::new(assistants, ConversationConfig::default()).with_session(session)
}

fn beijing_history() -> ConversationSession {
    session(&[(
        "北京有哪些好玩的地方？",
        "北京有很多著名景点，比如故宫、天安门广场、颐和园等。",
    )])
}

#[tokio::test]
async fn forbidden_city_question_routes_to_sales() {
    let provider = Arc::new(ScriptedProvider::new([
        "2",
        "尊敬的用户，根据和您的聊天，我们向您推荐一款产品：北京故宫深度一日游，产品价格399元，午门入宫，神武门出。",
    ]));
    let mut manager = manager(assistants(provider.clone()), beijing_history());

    let result = manager
        .process_turn(TurnContext::new("故宫门票多少钱？".to_string()))
        .await
        .unwrap();

    assert_eq!(result.route.topic.label(), "北京/故宫");
    assert_eq!(result.route.decision, RoutingDecision::Sales);
    assert!(result.response.contains(FORBIDDEN_CITY));
    assert!(result.response.contains("399元"));
    assert_eq!(
        result.route.trace,
        vec![
            RouterState::AwaitingInput,
            RouterState::Extracting,
            RouterState::Deciding,
            RouterState::Dispatched(RoutingDecision::Sales),
            RouterState::AwaitingInput,
        ]
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let decision_prompt = &requests[0].messages[0].content;
    assert!(decision_prompt.contains("用户: 北京有哪些好玩的地方？"));
    assert!(decision_prompt.contains("用户: 故宫门票多少钱？"));
    assert!(decision_prompt.contains(FORBIDDEN_CITY));
    assert!((requests[1].settings.temperature - 0.3).abs() < f32::EPSILON);
}

#[tokio::test]
async fn weather_question_is_refused_without_generation() {
    let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
    let assistants = assistants(provider.clone());
    let refusal = assistants.policy.messages.refusal.clone();
    let mut manager = manager(assistants, beijing_history());

    let result = manager
        .process_turn(TurnContext::new("今天天气怎么样？".to_string()))
        .await
        .unwrap();

    assert_eq!(result.route.decision, RoutingDecision::General);
    assert_eq!(result.response, refusal);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn weather_question_after_beijing_turns_is_still_refused() {
    let provider = Arc::new(ScriptedProvider::new([
        "2",
        "尊敬的用户，根据和您的聊天，我们向您推荐一款产品：北京故宫深度一日游，399元。",
    ]));
    let assistants = assistants(provider.clone());
    let refusal = assistants.policy.messages.refusal.clone();
    let history = session(&[
        ("北京有哪些好玩的地方？", "北京有故宫、颐和园等景点。"),
        ("北京住哪里方便？", "王府井一带交通方便。"),
    ]);
    let mut manager = manager(assistants, history);

    let result = manager
        .process_turn(TurnContext::new("今天天气怎么样？".to_string()))
        .await
        .unwrap();

    assert!(!result.route.topic.is_identified());
    assert_eq!(result.route.report.reason, DecisionReason::NoTopic);
    assert_eq!(result.route.decision, RoutingDecision::General);
    assert_eq!(result.response, refusal);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn uncatalogued_region_goes_general_with_web_search() {
    let provider = Arc::new(ScriptedProvider::new([
        "云南冬天气候温暖，很适合去丽江和大理。",
    ]));
    let mut manager = manager(
        assistants(provider.clone()),
        session(&[("云南有什么好玩的？", "云南有丽江、大理、西双版纳等地。")]),
    );

    let result = manager
        .process_turn(TurnContext::new("云南冬天去合适吗？".to_string()))
        .await
        .unwrap();

    assert_eq!(result.route.topic.label(), "云南");
    assert_eq!(result.route.report.signal, MatchSignal::NoMatch);
    assert_eq!(result.route.report.reason, DecisionReason::NoEntries);
    assert_eq!(result.route.decision, RoutingDecision::General);
    assert_eq!(result.response, "云南冬天气候温暖，很适合去丽江和大理。");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tool_names, vec!["WebSearch".to_string()]);
}

#[tokio::test]
async fn malformed_decision_falls_back_to_general() {
    let provider = Arc::new(ScriptedProvider::new([
        "3",
        "故宫门票旺季60元，淡季40元。",
    ]));
    let mut manager = manager(assistants(provider.clone()), beijing_history());

    let result = manager
        .process_turn(TurnContext::new("故宫门票多少钱？".to_string()))
        .await
        .unwrap();

    assert!(matches!(result.route.report.signal, MatchSignal::Malformed(_)));
    assert_eq!(result.route.decision, RoutingDecision::General);
    assert_eq!(result.response, "故宫门票旺季60元，淡季40元。");
}

#[tokio::test]
async fn any_unexpected_decision_output_routes_general() {
    for raw in ["", "  ", "3", "12", "是的，2", "MATCH", "2。", "NO"] {
        let provider = Arc::new(ScriptedProvider::new([raw]));
        let manager = manager(assistants(provider), beijing_history());

        let outcome = manager.preview_route("故宫门票多少钱？").await.unwrap();
        assert_eq!(outcome.decision, RoutingDecision::General, "{raw:?}");
    }
}

#[tokio::test]
async fn decision_is_idempotent_for_static_catalog() {
    let provider = Arc::new(ScriptedProvider::new(["2", "2"]));
    let manager = manager(assistants(provider), beijing_history());

    let first = manager.preview_route("故宫门票多少钱？").await.unwrap();
    let second = manager.preview_route("故宫门票多少钱？").await.unwrap();

    assert_eq!(first.topic, second.topic);
    assert_eq!(first.report.signal, second.report.signal);
    assert_eq!(first.decision, second.decision);
}

#[tokio::test]
async fn sales_mentions_entry_even_when_generation_drifts() {
    let provider = Arc::new(ScriptedProvider::new(["2", "推荐您去看看长城！"]));
    let mut manager = manager(assistants(provider), beijing_history());

    let response = manager.respond("故宫门票多少钱？").await;

    assert!(response.starts_with("尊敬的用户，根据和您的聊天，我们向您推荐一款产品"));
    assert!(response.contains(FORBIDDEN_CITY));
    assert!(response.contains("399元"));
}

#[tokio::test]
async fn no_recurring_place_routes_general() {
    let provider = Arc::new(ScriptedProvider::new(["杭州西湖很美。"]));
    let mut manager = manager(
        assistants(provider.clone()),
        session(&[("有什么推荐的旅游地方吗？", "北京、杭州都不错。")]),
    );

    let result = manager
        .process_turn(TurnContext::new("杭州好玩吗？".to_string()))
        .await
        .unwrap();

    assert!(!result.route.topic.is_identified());
    assert_eq!(result.route.report.reason, DecisionReason::NoTopic);
    assert_eq!(result.route.decision, RoutingDecision::General);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn lookup_failure_degrades_to_general() {
    let provider = Arc::new(ScriptedProvider::new(["故宫门票60元。"]));
    let assistants = assistants_with(
        provider,
        Arc::new(StaticCatalog::failing()),
        AssistantSettings::default(),
    );
    let manager = manager(assistants, beijing_history());

    let outcome = manager.preview_route("故宫门票多少钱？").await.unwrap();
    assert_eq!(outcome.report.reason, DecisionReason::LookupFailed);
    assert_eq!(outcome.decision, RoutingDecision::General);
}

#[tokio::test]
async fn generation_failure_shows_failure_message() {
    let provider = Arc::new(ScriptedProvider::failing("quota exceeded"));
    let assistants = assistants(provider);
    let failure = assistants.policy.messages.failure.clone();
    let mut manager = manager(assistants, beijing_history());
    let before = manager.session().message_count();

    let response = manager.respond("故宫门票多少钱？").await;

    assert_eq!(response, failure);
    let messages = manager.session().messages();
    assert_eq!(messages.len(), before + 1);
    assert_eq!(messages[before].role, Role::User);
}

#[tokio::test]
async fn empty_window_does_not_crash() {
    let provider = Arc::new(ScriptedProvider::new(["北京是中国的首都。"]));
    let mut manager = ConversationManager::new(
        assistants(provider),
        ConversationConfig::default().with_window_size(0),
    );

    let result = manager
        .process_turn(TurnContext::new("北京好玩吗？".to_string()))
        .await
        .unwrap();

    assert!(!result.route.topic.is_identified());
    assert_eq!(result.route.decision, RoutingDecision::General);
    assert_eq!(result.turn_number, 1);
}

#[tokio::test]
async fn caller_turn_number_is_reported() {
    let provider = Arc::new(ScriptedProvider::new(["北京是中国的首都。"]));
    let mut manager = ConversationManager::new(
        assistants(provider),
        ConversationConfig::default().with_window_size(0),
    );

    let result = manager
        .process_turn(TurnContext::new("北京好玩吗？".to_string()).with_turn_number(7))
        .await
        .unwrap();

    assert_eq!(result.turn_number, 7);
}

#[tokio::test]
async fn welcome_is_recorded_as_first_turn() {
    let provider = Arc::new(ScriptedProvider::new(["“欢迎来到旅游问答！”"]));
    let mut manager = ConversationManager::new(assistants(provider), ConversationConfig::default());

    let welcome = manager.start().await;

    assert_eq!(welcome.as_deref(), Some("欢迎来到旅游问答！"));
    assert_eq!(manager.session().messages()[0].role, Role::Assistant);
    assert!(manager.start().await.is_none());
    assert_eq!(manager.session().message_count(), 1);
}

#[tokio::test]
async fn welcome_failure_uses_fallback_greeting() {
    let provider = Arc::new(ScriptedProvider::failing("network down"));
    let assistants = assistants(provider);
    let fallback = assistants.policy.messages.welcome_fallback.clone();
    let mut manager = ConversationManager::new(assistants, ConversationConfig::default());

    assert_eq!(manager.start().await, Some(fallback));
}

/// Answers by model name so concurrent sessions get deterministic replies.
struct ByModel;

#[async_trait]
impl LLMProvider for ByModel {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<LLMResponse> {
        let content = if request.settings.model == "route" {
            "1".to_string()
        } else {
            let last = request.messages.last().map_or("", |m| m.content.as_str());
            format!("关于“{last}”的回答")
        };
        Ok(LLMResponse {
            content,
            usage: None,
        })
    }

    fn get_default_model(&self) -> &'static str {
        "by-model"
    }
}

#[tokio::test]
async fn concurrent_sessions_do_not_share_transcripts() {
    let named = |model: &str| GenerationSettings {
        model: model.to_string(),
        ..GenerationSettings::default()
    };
    let settings = AssistantSettings {
        route: named("route"),
        chat: named("chat"),
        sales: named("sales"),
        welcome: named("welcome"),
        lookback: 2,
    };
    let shared = assistants_with(
        Arc::new(ByModel),
        Arc::new(StaticCatalog::new(Vec::new())),
        settings,
    );

    let mut hangzhou = ConversationManager::new(shared.clone(), ConversationConfig::default());
    let mut beijing = ConversationManager::new(shared, ConversationConfig::default());

    let (a, b) = tokio::join!(
        async {
            hangzhou.respond("杭州有什么好玩的？").await;
            hangzhou.respond("西湖门票贵吗？").await
        },
        async { beijing.respond("故宫几点开门？").await },
    );

    assert_eq!(a, "关于“西湖门票贵吗？”的回答");
    assert_eq!(b, "关于“故宫几点开门？”的回答");
    assert_eq!(hangzhou.session().message_count(), 4);
    assert_eq!(beijing.session().message_count(), 2);
    assert_ne!(hangzhou.session().id, beijing.session().id);
}
