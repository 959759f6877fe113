//! Proxy list view-model
//!
//! Holds the displayed proxy collection and the busy flag, and turns fetch
//! results into state changes. Every request is stamped with a ticket; only
//! the most recently issued ticket may change the collection, so a slow
//! response that arrives after a newer request was started is dropped.

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::api::{FetchAction, FetchError, ProxySource};
use crate::models::{ProxyMap, ProxyRecord};

/// Column headers of the proxy table, in display order
pub const COLUMNS: [&str; 5] = ["Link", "IP", "Port", "Country", "Ping"];

/// Identifies one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub token: u64,
    pub action: FetchAction,
}

/// What happened when a request result was handed to the view
#[derive(Debug)]
pub enum Settlement {
    /// Collection replaced with this many records
    Applied(usize),
    /// Request failed, collection untouched
    Failed(FetchError),
    /// A newer request was issued after this one; result dropped
    Stale,
}

impl Settlement {
    pub fn is_applied(&self) -> bool {
        matches!(self, Settlement::Applied(_))
    }
}

/// One projected table row
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Stable identity used to keep the selection across reloads
    pub key: String,
    pub cells: [String; 5],
}

/// Output of the pure render step
#[derive(Debug, Clone, PartialEq)]
pub enum RenderModel {
    Loading,
    Table(Vec<TableRow>),
}

#[derive(Debug, Default)]
pub struct ProxyListView {
    proxies: Vec<ProxyRecord>,
    busy: bool,
    latest_token: u64,
    last_error: Option<String>,
    last_updated: Option<DateTime<Local>>,
}

impl ProxyListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxies(&self) -> &[ProxyRecord] {
        &self.proxies
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Local>> {
        self.last_updated
    }

    /// Mark a request as started and hand out its ticket
    pub fn begin(&mut self, action: FetchAction) -> RequestTicket {
        self.latest_token += 1;
        self.busy = true;
        debug!("{} issued with token {}", action.as_str(), self.latest_token);
        RequestTicket {
            token: self.latest_token,
            action,
        }
    }

    /// Apply the result of a request if it belongs to the latest ticket
    pub fn settle(
        &mut self,
        ticket: RequestTicket,
        result: Result<ProxyMap, FetchError>,
    ) -> Settlement {
        if ticket.token != self.latest_token {
            debug!(
                "Dropping stale {} result (token {}, latest {})",
                ticket.action.as_str(),
                ticket.token,
                self.latest_token
            );
            return Settlement::Stale;
        }

        let settlement = match result {
            Ok(map) => {
                self.proxies = map.into_records();
                self.last_error = None;
                self.last_updated = Some(Local::now());
                info!("{} returned {} proxies", ticket.action.as_str(), self.proxies.len());
                Settlement::Applied(self.proxies.len())
            }
            Err(e) => {
                error!("Error fetching proxies ({}): {}", ticket.action.as_str(), e);
                self.last_error = Some(e.to_string());
                Settlement::Failed(e)
            }
        };

        self.busy = false;
        settlement
    }

    /// Run a list action to completion against `source`
    pub async fn run(&mut self, source: &dyn ProxySource, action: FetchAction) -> Settlement {
        let ticket = self.begin(action);
        let result = source.fetch(action).await;
        self.settle(ticket, result)
    }

    /// `GET /proxies` and replace the collection
    pub async fn load(&mut self, source: &dyn ProxySource) -> Settlement {
        self.run(source, FetchAction::Load).await
    }

    /// `POST /update-proxies` and replace the collection with the regenerated list
    pub async fn refresh(&mut self, source: &dyn ProxySource) -> Settlement {
        self.run(source, FetchAction::Refresh).await
    }

    /// Project the state into what should be drawn
    pub fn render(&self) -> RenderModel {
        if self.busy {
            RenderModel::Loading
        } else {
            RenderModel::Table(self.rows())
        }
    }

    /// Table rows in collection order
    pub fn rows(&self) -> Vec<TableRow> {
        self.proxies
            .iter()
            .enumerate()
            .map(|(index, proxy)| TableRow {
                key: row_key(index, proxy),
                cells: [
                    proxy.link.clone(),
                    proxy.ip.clone(),
                    proxy.port_str(),
                    proxy.country_str().to_string(),
                    proxy.ping_str().to_string(),
                ],
            })
            .collect()
    }
}

/// Records are keyed by link; records without one fall back to position
fn row_key(index: usize, proxy: &ProxyRecord) -> String {
    if proxy.link.is_empty() {
        format!("#{}", index)
    } else {
        proxy.link.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{FakeSource, Reply};
    use crate::api::ProxyApi;
    use crate::config::Config;

    const ONE_PROXY: &str = r#"{"a": {"link":"l1","IP":"1.2.3.4","Port":8080}}"#;
    const TWO_PROXIES: &str = r#"{
        "1": {"link":"tg://proxy?server=a","IP":"10.0.0.1","Port":"443","Country":"Germany","Ping":"12.5ms"},
        "2": {"link":"tg://proxy?server=b","IP":"10.0.0.2","Port":8443}
    }"#;

    fn map(body: &str) -> ProxyMap {
        serde_json::from_str(body).unwrap()
    }

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn test_initial_state() {
        let view = ProxyListView::new();
        assert!(view.proxies().is_empty());
        assert!(!view.is_busy());
        assert!(view.last_error().is_none());
        assert_eq!(view.render(), RenderModel::Table(vec![]));
    }

    #[test]
    fn test_busy_only_while_pending() {
        let mut view = ProxyListView::new();
        assert!(!view.is_busy());

        let ticket = view.begin(FetchAction::Load);
        assert!(view.is_busy());
        assert_eq!(view.render(), RenderModel::Loading);

        view.settle(ticket, Ok(map(ONE_PROXY)));
        assert!(!view.is_busy());
    }

    #[test]
    fn test_busy_cleared_after_failure() {
        let mut view = ProxyListView::new();
        let ticket = view.begin(FetchAction::Refresh);
        let settlement = view.settle(
            ticket,
            Err(FetchError::Status {
                status_code: 502,
                message: "bad gateway".to_string(),
            }),
        );
        assert!(matches!(settlement, Settlement::Failed(_)));
        assert!(!view.is_busy());
        assert!(view.last_error().unwrap().contains("502"));
    }

    #[test]
    fn test_success_replaces_instead_of_merging() {
        let mut view = ProxyListView::new();
        let first = view.begin(FetchAction::Load);
        view.settle(first, Ok(map(TWO_PROXIES)));
        assert_eq!(view.proxies().len(), 2);

        let second = view.begin(FetchAction::Load);
        view.settle(second, Ok(map(ONE_PROXY)));
        assert_eq!(view.proxies().len(), 1);
        assert_eq!(view.proxies()[0].link, "l1");
        assert!(view.last_updated().is_some());
    }

    #[test]
    fn test_failure_keeps_previous_collection() {
        let mut view = ProxyListView::new();
        let first = view.begin(FetchAction::Load);
        view.settle(first, Ok(map(TWO_PROXIES)));
        let before = view.proxies().to_vec();

        let second = view.begin(FetchAction::Load);
        view.settle(
            second,
            Err(FetchError::InvalidUrl("nowhere".to_string())),
        );
        assert_eq!(view.proxies(), before.as_slice());
    }

    #[test]
    fn test_success_clears_last_error() {
        let mut view = ProxyListView::new();
        let failed = view.begin(FetchAction::Load);
        view.settle(failed, Err(FetchError::InvalidUrl("x".to_string())));
        assert!(view.last_error().is_some());

        let ok = view.begin(FetchAction::Load);
        view.settle(ok, Ok(map("{}")));
        assert!(view.last_error().is_none());
    }

    #[test]
    fn test_last_issued_wins() {
        let mut view = ProxyListView::new();
        let older = view.begin(FetchAction::Load);
        let newer = view.begin(FetchAction::Refresh);

        // newer settles first, older arrives late
        assert!(view.settle(newer, Ok(map(ONE_PROXY))).is_applied());
        assert!(!view.is_busy());
        assert!(matches!(view.settle(older, Ok(map(TWO_PROXIES))), Settlement::Stale));

        assert_eq!(view.proxies().len(), 1);
        assert_eq!(view.proxies()[0].link, "l1");
        assert!(!view.is_busy());
    }

    #[test]
    fn test_stale_result_keeps_busy_until_latest_settles() {
        let mut view = ProxyListView::new();
        let older = view.begin(FetchAction::Load);
        let newer = view.begin(FetchAction::Load);

        assert!(matches!(view.settle(older, Ok(map(TWO_PROXIES))), Settlement::Stale));
        assert!(view.is_busy());
        assert!(view.proxies().is_empty());

        view.settle(newer, Ok(map(ONE_PROXY)));
        assert!(!view.is_busy());
    }

    #[test]
    fn test_stale_failure_is_not_recorded() {
        let mut view = ProxyListView::new();
        let older = view.begin(FetchAction::Load);
        let newer = view.begin(FetchAction::Load);
        view.settle(newer, Ok(map(ONE_PROXY)));
        view.settle(older, Err(FetchError::InvalidUrl("x".to_string())));
        assert!(view.last_error().is_none());
    }

    #[test]
    fn test_rows_follow_collection_order() {
        let mut view = ProxyListView::new();
        let ticket = view.begin(FetchAction::Load);
        view.settle(ticket, Ok(map(TWO_PROXIES)));

        let rows = view.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "tg://proxy?server=a");
        assert_eq!(
            rows[0].cells,
            [
                "tg://proxy?server=a".to_string(),
                "10.0.0.1".to_string(),
                "443".to_string(),
                "Germany".to_string(),
                "12.5ms".to_string(),
            ]
        );
        assert_eq!(rows[1].cells[2], "8443");
        assert_eq!(rows[1].cells[3], "");
    }

    #[test]
    fn test_row_key_falls_back_to_position() {
        let mut view = ProxyListView::new();
        let ticket = view.begin(FetchAction::Load);
        view.settle(ticket, Ok(map(r#"{"a":{"IP":"1.1.1.1"},"b":{"link":"x"}}"#)));
        let keys: Vec<String> = view.rows().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["#0".to_string(), "x".to_string()]);
    }

    #[tokio::test]
    async fn test_load_scenario_single_record() {
        let source = FakeSource::with_body(ONE_PROXY);
        let mut view = ProxyListView::new();

        let settlement = view.load(&source).await;
        assert!(matches!(settlement, Settlement::Applied(1)));
        assert_eq!(
            view.proxies(),
            &[ProxyRecord::new("l1", "1.2.3.4", 8080u16.into())]
        );
        match view.render() {
            RenderModel::Table(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(&rows[0].cells[..3], &["l1", "1.2.3.4", "8080"]);
            }
            RenderModel::Loading => panic!("view should not be busy after settling"),
        }
    }

    #[tokio::test]
    async fn test_refresh_scenario_empty_mapping() {
        let source = FakeSource::new(
            Reply::Body(TWO_PROXIES.to_string()),
            Reply::Body("{}".to_string()),
        );
        let mut view = ProxyListView::new();
        view.load(&source).await;
        assert_eq!(view.proxies().len(), 2);

        let settlement = view.refresh(&source).await;
        assert!(matches!(settlement, Settlement::Applied(0)));
        assert!(view.proxies().is_empty());
        assert_eq!(view.render(), RenderModel::Table(vec![]));
    }

    #[tokio::test]
    async fn test_load_is_idempotent_for_unchanged_backend() {
        let source = FakeSource::with_body(TWO_PROXIES);
        let mut view = ProxyListView::new();

        view.load(&source).await;
        let first = view.proxies().to_vec();
        view.load(&source).await;
        assert_eq!(view.proxies(), first.as_slice());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_prior_value() {
        let source = FakeSource::with_body(ONE_PROXY);
        let mut view = ProxyListView::new();
        view.load(&source).await;

        source.set_load(Reply::Status(500));
        let settlement = view.load(&source).await;
        assert!(matches!(settlement, Settlement::Failed(FetchError::Status { status_code: 500, .. })));
        assert_eq!(view.proxies().len(), 1);
        assert!(!view.is_busy());
    }

    #[tokio::test]
    async fn test_network_error_scenario() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = Config::default().with_base_url(Some(format!("http://{}", addr)));
        let api = ProxyApi::new(&config).unwrap();
        let mut view = ProxyListView::new();

        let settlement = view.load(&api).await;
        assert!(matches!(settlement, Settlement::Failed(FetchError::Transport(_))));
        assert!(view.proxies().is_empty());
        assert!(!view.is_busy());
        assert!(view.last_error().is_some());
    }

    #[tokio::test]
    async fn test_failed_load_is_logged_as_error() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = FakeSource::new(Reply::Status(503), Reply::Body("{}".to_string()));
        let mut view = ProxyListView::new();
        view.load(&source).await;

        let output = logs.contents();
        assert!(output.contains("ERROR"), "no error line in: {}", output);
        assert!(output.contains("Error fetching proxies (Load)"));
        assert!(output.contains("status 503"));
    }
}
