// Command handler and daily delivery tests with a recording chat transport.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use farewatch_backend::module::airport::AirportDirectory;
use farewatch_backend::module::fare::{
    FareApiClient, FareApiSettings, FareSearchService, Pacing, SearchConfig,
};
use farewatch_backend::module::handler::MessageHandler;
use farewatch_backend::module::renderer::{NO_FARES_MESSAGE, ReportRenderer};
use farewatch_backend::module::scheduled::ScheduledTaskManager;
use farewatch_backend::module::transport::{ChatTransport, IncomingMessage};

// ── Helpers ─────────────────────────────────────────────────────────

const CHAT: i64 = 100;

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(i64, String)>>,
    silent: Mutex<Vec<i64>>,
}

impl RecordingTransport {
    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }

    fn targets(&self) -> Vec<i64> {
        self.sent.lock().unwrap().iter().map(|(target, _)| *target).collect()
    }

    fn silent_targets(&self) -> Vec<i64> {
        self.silent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, target: i64, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((target, text.to_string()));
        Ok(())
    }

    async fn send_silent(&self, target: i64, text: &str) -> anyhow::Result<()> {
        self.silent.lock().unwrap().push(target);
        self.send_message(target, text).await
    }
}

struct Fixture {
    server: MockServer,
    service: Arc<FareSearchService>,
    transport: Arc<RecordingTransport>,
    handler: MessageHandler,
}

async fn setup() -> Fixture {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/prices"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [], "success": true })),
        )
        .mount(&server)
        .await;

    let directory = Arc::new(AirportDirectory::builtin());
    let client =
        FareApiClient::new(FareApiSettings::new(format!("{}/prices", server.uri()), "t")).unwrap();
    let config = SearchConfig::new(["OVB", "BAX"], "DPS", 2, 35000).unwrap();
    let service = FareSearchService::new(client, ReportRenderer::new(directory.clone()), config)
        .with_pacing(Pacing::none())
        .into_shared();

    let transport = Arc::new(RecordingTransport::default());
    let handler = MessageHandler::new(service.clone(), directory, transport.clone());

    Fixture {
        server,
        service,
        transport,
        handler,
    }
}

fn message(text: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id: CHAT,
        user_id: 7,
        text: text.to_string(),
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// ── /search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_changes_destination_then_runs() {
    let f = setup().await;

    f.handler.handle_message(&message("/search бангкок")).await.unwrap();

    assert_eq!(f.service.config().await.destination(), "BKK");

    let texts = f.transport.texts();
    assert_eq!(texts.len(), 3);
    assert!(texts[0].starts_with("✅ <b>Направление изменено:</b>"));
    assert!(texts[0].contains("OVB/BAX → Денпасар (Бали)"));
    assert!(texts[0].contains("OVB/BAX → Бангкок"));
    assert!(texts[1].starts_with("🔍 <b>Начинаю поиск билетов...</b>"));
    assert_eq!(texts[2], NO_FARES_MESSAGE);
    assert_eq!(f.transport.targets(), vec![CHAT, CHAT, CHAT]);

    // 2 origins x 2 months
    assert_eq!(request_count(&f.server).await, 4);
}

#[tokio::test]
async fn test_search_unknown_city_leaves_config() {
    let f = setup().await;

    f.handler.handle_message(&message("/search токио")).await.unwrap();

    let texts = f.transport.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Город 'токио' не найден."));
    assert!(texts[0].contains("/cities"));

    assert_eq!(f.service.config().await.destination(), "DPS");
    assert_eq!(request_count(&f.server).await, 0);
}

#[tokio::test]
async fn test_search_code_and_months() {
    let f = setup().await;

    f.handler.handle_message(&message("/search bkk 3")).await.unwrap();

    let config = f.service.config().await;
    assert_eq!(config.destination(), "BKK");
    assert_eq!(config.months_ahead(), 3);
    assert!(f.transport.texts()[0].contains("Глубина поиска: 2 мес. → 3 мес."));
    assert_eq!(request_count(&f.server).await, 6);
}

#[tokio::test]
async fn test_search_multi_airport_city() {
    let f = setup().await;

    f.handler.handle_message(&message("/find той")).await.unwrap();

    assert_eq!(f.service.config().await.destination(), "NRT");
    assert!(f.transport.texts()[0].contains("🏢 Доступные аэропорты: NRT, HND"));
}

#[tokio::test]
async fn test_search_months_out_of_range() {
    let f = setup().await;

    f.handler.handle_message(&message("/поиск 20")).await.unwrap();

    let texts = f.transport.texts();
    assert_eq!(texts.len(), 1);
    assert_eq!(texts[0], "❌ Глубина поиска должна быть от 1 до 12 мес., получено: 20");
    assert_eq!(f.service.config().await.months_ahead(), 2);
    assert_eq!(request_count(&f.server).await, 0);
}

#[tokio::test]
async fn test_search_without_arguments_keeps_config() {
    let f = setup().await;

    f.handler.handle_message(&message("/search@farewatch_bot")).await.unwrap();

    let texts = f.transport.texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[1], NO_FARES_MESSAGE);
    assert_eq!(f.service.config().await.destination(), "DPS");
}

#[tokio::test]
async fn test_search_every_listed_code() {
    let f = setup().await;
    let directory = AirportDirectory::builtin();

    for line in directory.city_list() {
        let (code, _) = line.split_once(" - ").unwrap();
        f.handler
            .handle_message(&message(&format!("/search {}", code)))
            .await
            .unwrap();
        assert_eq!(f.service.config().await.destination(), code, "/search {}", code);
    }
}

#[tokio::test]
async fn test_search_dad_by_code() {
    let f = setup().await;

    f.handler.handle_message(&message("/search DAD")).await.unwrap();

    assert_eq!(f.service.config().await.destination(), "DAD");
    assert!(f.transport.texts()[0].contains("OVB/BAX → Дананг"));
}

// ── Other commands ──────────────────────────────────────────────────

#[tokio::test]
async fn test_origin_set() {
    let f = setup().await;

    f.handler.handle_message(&message("/origin set москва")).await.unwrap();

    assert_eq!(f.service.config().await.origins(), ["SVO"]);
    let text = &f.transport.texts()[0];
    assert!(text.starts_with("✅ <b>Город вылета изменен:</b>"));
    assert!(text.contains("OVB/BAX → Денпасар (Бали)"));
    assert!(text.contains("SVO, DME, VKO"));
}

#[tokio::test]
async fn test_origin_requires_exact_city() {
    let f = setup().await;

    // substring matching only applies to destinations
    f.handler.handle_message(&message("/origin новосиб")).await.unwrap();

    assert!(f.transport.texts()[0].contains("Город вылета 'новосиб' не найден."));
    assert_eq!(f.service.config().await.origins(), ["OVB", "BAX"]);
}

#[tokio::test]
async fn test_status_and_cities() {
    let f = setup().await;
    let handler = MessageHandler::new(
        f.service.clone(),
        Arc::new(AirportDirectory::builtin()),
        f.transport.clone(),
    )
    .with_daily_search(chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap());

    handler.handle_message(&message("/status")).await.unwrap();
    handler.handle_message(&message("/cities")).await.unwrap();

    let texts = f.transport.texts();
    assert!(texts[0].contains("• OVB/BAX → DPS"));
    assert!(texts[0].contains("Макс. цена: 35000 руб."));
    assert!(texts[0].contains("Авто-поиск: каждый день в 10:00"));
    assert!(texts[1].contains("BKK - Бангкок"));
    assert!(texts[1].contains("DPS - Денпасар (Бали)"));
}

#[tokio::test]
async fn test_unknown_command_and_plain_text() {
    let f = setup().await;

    f.handler.handle_message(&message("/weather")).await.unwrap();
    f.handler.handle_message(&message("привет")).await.unwrap();

    let texts = f.transport.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts.iter().all(|t| t.starts_with("❓ Неизвестная команда")));
}

// ── Daily delivery ──────────────────────────────────────────────────

#[tokio::test]
async fn test_daily_search_delivers_to_each_target() {
    let f = setup().await;

    let delivered =
        ScheduledTaskManager::run_daily_search(&f.service, f.transport.as_ref(), &[CHAT, 7, 8])
            .await
            .unwrap();

    assert_eq!(delivered, 3);
    assert_eq!(f.transport.targets(), vec![CHAT, 7, 8]);
    assert!(f.transport.texts().iter().all(|t| t == NO_FARES_MESSAGE));
    assert_eq!(f.transport.silent_targets(), vec![CHAT, 7, 8]);
}

#[tokio::test]
async fn test_command_replies_are_not_silent() {
    let f = setup().await;

    f.handler.handle_message(&message("/search")).await.unwrap();

    assert_eq!(f.transport.texts().len(), 2);
    assert!(f.transport.silent_targets().is_empty());
}
