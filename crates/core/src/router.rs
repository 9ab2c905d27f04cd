//! The integration router.
//!
//! Translates caller operations into an ordered sequence of client calls:
//!
//! ```text
//! checkin(cin):
//!   LocalLookup ──found──▶ Done(Found, local)
//!        │ miss / unavailable
//!        ▼
//!   CentralLookup ──miss──▶ Done(NotFound)
//!        │ found         └─unavailable──▶ Done(CentralUnavailable)
//!        ▼
//!   WriteBack ──ok──▶ Done(Found, central-synced)
//!             └─err─▶ Done(Found, central-unsynced)
//! ```
//!
//! The hops of one request run strictly in sequence, and the answer is only produced once the
//! write-back has completed. The router keeps no state between requests; concurrent check-ins
//! for the same CIN rely on the local site's upsert-by-CIN write-back.

use crate::clients::{
    self, endpoint, CentralRegistry, CentralRegistryClient, ForwardRequest, Forwarder,
    HttpForwarder, LocalSiteClient, Lookup, NameQuery, PatientReader, PatientWriter, Payload,
    PeerRouterClient, UpstreamResponse,
};
use crate::config::RouterConfig;
use crate::constants::{BILLING_GENERATE_PATH, CONSULTATION_PATH};
use crate::error::{ClientError, ClientResult, RouterError, RouterResult};
use api_shared::{messages, PatientRecord};
use novacare_types::{Cin, NonEmptyText};
use reqwest::{Method, Url};
use std::sync::Arc;

// ============================================================================
// Outcomes
// ============================================================================

/// Where a check-in record came from, as reported to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOrigin {
    /// Already held by the local site.
    Local,
    /// Fetched from the central tier and written back locally.
    CentralSynced,
    /// Fetched from the central tier; the write-back failed.
    CentralUnsynced,
}

impl RecordOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordOrigin::Local => "local",
            RecordOrigin::CentralSynced => "central-synced",
            RecordOrigin::CentralUnsynced => "central-unsynced",
        }
    }
}

/// Terminal `Found` states of a check-in.
#[derive(Debug)]
pub enum CheckinOutcome {
    Local(PatientRecord),
    Synced(PatientRecord),
    /// The central read succeeded but the local copy could not be written.
    Unsynced {
        record: PatientRecord,
        error: ClientError,
    },
}

impl CheckinOutcome {
    pub fn origin(&self) -> RecordOrigin {
        match self {
            CheckinOutcome::Local(_) => RecordOrigin::Local,
            CheckinOutcome::Synced(_) => RecordOrigin::CentralSynced,
            CheckinOutcome::Unsynced { .. } => RecordOrigin::CentralUnsynced,
        }
    }

    pub fn record(&self) -> &PatientRecord {
        match self {
            CheckinOutcome::Local(record)
            | CheckinOutcome::Synced(record)
            | CheckinOutcome::Unsynced { record, .. } => record,
        }
    }

    pub fn into_record(self) -> PatientRecord {
        match self {
            CheckinOutcome::Local(record)
            | CheckinOutcome::Synced(record)
            | CheckinOutcome::Unsynced { record, .. } => record,
        }
    }
}

/// A validated search: by CIN, or by both names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatientQuery {
    ByCin(Cin),
    ByName(NameQuery),
}

impl PatientQuery {
    /// Validates raw search parameters.
    ///
    /// A CIN wins when present. Otherwise both names are required; a single name, or no
    /// parameter at all, is an invalid request. No client is called for an invalid query.
    pub fn from_params(
        cin: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> RouterResult<Self> {
        if let Some(cin) = cin.and_then(|c| Cin::parse(c).ok()) {
            return Ok(PatientQuery::ByCin(cin));
        }

        let first = first_name.and_then(|f| NonEmptyText::new(f).ok());
        let last = last_name.and_then(|l| NonEmptyText::new(l).ok());
        match (first, last) {
            (Some(first_name), Some(last_name)) => Ok(PatientQuery::ByName(NameQuery {
                first_name,
                last_name,
            })),
            (None, None) => Err(RouterError::InvalidRequest(messages::CIN_REQUIRED)),
            _ => Err(RouterError::InvalidRequest(messages::NAME_PAIR_REQUIRED)),
        }
    }
}

/// Parses a required CIN parameter.
pub fn require_cin(cin: Option<&str>) -> RouterResult<Cin> {
    cin.and_then(|c| Cin::parse(c).ok())
        .ok_or(RouterError::InvalidRequest(messages::CIN_REQUIRED))
}

// ============================================================================
// Router
// ============================================================================

/// Pass-through targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Downstream {
    pub billing_base_url: Url,
    pub consultation_base_url: Url,
}

/// Single entry point for the caller-facing operations.
///
/// Cheap to clone; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct IntegrationRouter {
    central: Arc<dyn CentralRegistry>,
    checkin_source: Arc<dyn PatientReader>,
    local_reader: Arc<dyn PatientReader>,
    local_writer: Arc<dyn PatientWriter>,
    forwarder: Arc<dyn Forwarder>,
    downstream: Arc<Downstream>,
}

impl IntegrationRouter {
    /// Assembles a router from explicit collaborators.
    ///
    /// The check-in central hop reads from `central` unless
    /// [`with_checkin_source`](Self::with_checkin_source) replaces it.
    pub fn new<C, L, F>(
        central: Arc<C>,
        local: Arc<L>,
        forwarder: Arc<F>,
        downstream: Downstream,
    ) -> Self
    where
        C: CentralRegistry + 'static,
        L: PatientReader + PatientWriter + 'static,
        F: Forwarder + 'static,
    {
        Self {
            central: central.clone(),
            checkin_source: central,
            local_reader: local.clone(),
            local_writer: local,
            forwarder,
            downstream: Arc::new(downstream),
        }
    }

    /// Reads check-in misses from another source, e.g. a peer router.
    pub fn with_checkin_source(mut self, source: Arc<dyn PatientReader>) -> Self {
        self.checkin_source = source;
        self
    }

    /// Builds the HTTP-backed router described by `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn from_config(cfg: &RouterConfig) -> ClientResult<Self> {
        let http = clients::http_client(cfg.hop_timeout())?;

        let central = Arc::new(CentralRegistryClient::new(
            http.clone(),
            cfg.central_base_url().clone(),
        ));
        let local = Arc::new(LocalSiteClient::new(
            http.clone(),
            cfg.local_base_url().clone(),
        ));
        let forwarder = Arc::new(HttpForwarder::new(http.clone()));
        let downstream = Downstream {
            billing_base_url: cfg.billing_base_url().clone(),
            consultation_base_url: cfg.consultation_base_url().clone(),
        };

        let router = Self::new(central, local, forwarder, downstream);
        Ok(match cfg.peer_router_base_url() {
            Some(peer) => router.with_checkin_source(Arc::new(PeerRouterClient::new(
                http,
                peer.clone(),
            ))),
            None => router,
        })
    }

    /// Looks a patient up in the central registry by CIN.
    pub async fn search(&self, cin: &Cin) -> RouterResult<PatientRecord> {
        tracing::info!(%cin, "search: central lookup");
        match self.central.get_by_cin(cin).await {
            Lookup::Found(record) => Ok(record),
            Lookup::Miss => {
                tracing::info!(%cin, "search: not found centrally");
                Err(RouterError::NotFound)
            }
            Lookup::Unavailable(err) => {
                tracing::error!(%cin, error = %err, "search: central registry unavailable");
                Err(RouterError::CentralUnavailable(err))
            }
        }
    }

    /// Looks a patient up in the central registry by first and last name.
    pub async fn search_by_name(&self, query: &NameQuery) -> RouterResult<PatientRecord> {
        tracing::info!(
            first_name = %query.first_name,
            last_name = %query.last_name,
            "search: central lookup by name"
        );
        match self.central.get_by_name(query).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(RouterError::NotFound),
            Err(err) if err.status() == Some(400) => {
                Err(RouterError::InvalidRequest(messages::NAME_PAIR_REQUIRED))
            }
            Err(err) => {
                tracing::error!(error = %err, "search: central registry unavailable");
                Err(RouterError::CentralUnavailable(err))
            }
        }
    }

    /// Runs a validated query against the central registry.
    pub async fn lookup(&self, query: &PatientQuery) -> RouterResult<PatientRecord> {
        match query {
            PatientQuery::ByCin(cin) => self.search(cin).await,
            PatientQuery::ByName(names) => self.search_by_name(names).await,
        }
    }

    /// Forwards a create request to the central registry verbatim.
    pub async fn create(&self, payload: Payload) -> RouterResult<UpstreamResponse> {
        tracing::info!(bytes = payload.body.len(), "create: forwarding to central registry");
        let response = self.central.create(payload).await.map_err(|err| {
            tracing::error!(error = %err, "create: central registry unreachable");
            RouterError::Downstream(err)
        })?;
        tracing::info!(status = response.status, "create: central registry answered");
        Ok(response)
    }

    /// Makes the patient's record available locally, fetching it centrally on a local miss.
    pub async fn checkin(&self, cin: &Cin) -> RouterResult<CheckinOutcome> {
        tracing::info!(%cin, "check-in: local lookup");
        match self.local_reader.get_by_cin(cin).await {
            Lookup::Found(record) if record.cin == cin.as_str() => {
                tracing::info!(%cin, "check-in: found locally");
                return Ok(CheckinOutcome::Local(record));
            }
            Lookup::Found(record) => {
                tracing::warn!(%cin, returned = %record.cin, "check-in: local site returned another patient, asking central tier");
            }
            Lookup::Miss => {
                tracing::info!(%cin, "check-in: not held locally, asking central tier");
            }
            Lookup::Unavailable(err) => {
                tracing::warn!(%cin, error = %err, "check-in: local site unavailable, asking central tier");
            }
        }

        let record = match self.checkin_source.get_by_cin(cin).await {
            Lookup::Found(record) => record,
            Lookup::Miss => {
                tracing::info!(%cin, "check-in: not found on either tier");
                return Err(RouterError::NotFound);
            }
            Lookup::Unavailable(err) => {
                tracing::error!(%cin, error = %err, "check-in: central tier unavailable");
                return Err(RouterError::CentralUnavailable(err));
            }
        };

        if record.cin != cin.as_str() {
            tracing::error!(%cin, returned = %record.cin, "check-in: central tier returned another patient");
            return Err(RouterError::CentralUnavailable(ClientError::Decode {
                url: "central tier".into(),
                reason: format!("asked for CIN {cin}, received {}", record.cin),
            }));
        }

        tracing::info!(%cin, "check-in: found centrally, writing back");
        match self.local_writer.create(&record).await {
            Ok(()) => {
                tracing::info!(%cin, "check-in: synchronised to local site");
                Ok(CheckinOutcome::Synced(record))
            }
            Err(error) => {
                tracing::warn!(%cin, error = %error, "check-in: write-back failed, returning central record unsynced");
                Ok(CheckinOutcome::Unsynced { record, error })
            }
        }
    }

    /// Relays the consultation list for a local patient id.
    pub async fn consultations(&self, patient_id: &str) -> RouterResult<UpstreamResponse> {
        let patient_id = NonEmptyText::new(patient_id)
            .map_err(|_| RouterError::InvalidRequest("patientId is required"))?;
        let mut segments: Vec<&str> = CONSULTATION_PATH.to_vec();
        segments.push(patient_id.as_str());
        let url = endpoint(&self.downstream.consultation_base_url, &segments)
            .map_err(RouterError::Downstream)?;

        tracing::info!(%patient_id, "consultations: pass-through");
        self.pass_through(ForwardRequest {
            method: Method::GET,
            url,
            payload: None,
        })
        .await
    }

    /// Relays a billing generation request verbatim.
    pub async fn billing_generate(&self, payload: Payload) -> RouterResult<UpstreamResponse> {
        let url = endpoint(&self.downstream.billing_base_url, &BILLING_GENERATE_PATH)
            .map_err(RouterError::Downstream)?;

        tracing::info!("billing: pass-through");
        self.pass_through(ForwardRequest {
            method: Method::POST,
            url,
            payload: Some(payload),
        })
        .await
    }

    async fn pass_through(&self, request: ForwardRequest) -> RouterResult<UpstreamResponse> {
        let url = request.url.clone();
        self.forwarder.forward(request).await.map_err(|err| {
            tracing::error!(%url, error = %err, "pass-through target unreachable");
            RouterError::Downstream(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ------------------------------------------------------------------
    // In-memory collaborators
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct FakeCentral {
        records: HashMap<String, PatientRecord>,
        unavailable: bool,
        reads: AtomicUsize,
        name_reads: AtomicUsize,
        creates: Mutex<Vec<Payload>>,
    }

    impl FakeCentral {
        fn with(records: Vec<PatientRecord>) -> Self {
            Self {
                records: records.into_iter().map(|r| (r.cin.clone(), r)).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl PatientReader for FakeCentral {
        async fn get_by_cin(&self, cin: &Cin) -> Lookup {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Lookup::Unavailable(ClientError::Timeout {
                    url: "http://central/api/patients".into(),
                });
            }
            match self.records.get(cin.as_str()) {
                Some(record) => Lookup::Found(record.clone()),
                None => Lookup::Miss,
            }
        }
    }

    #[async_trait]
    impl CentralRegistry for FakeCentral {
        async fn get_by_name(&self, query: &NameQuery) -> ClientResult<Option<PatientRecord>> {
            self.name_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .values()
                .find(|r| {
                    r.first_name == query.first_name.as_str()
                        && r.last_name == query.last_name.as_str()
                })
                .cloned())
        }

        async fn create(&self, payload: Payload) -> ClientResult<UpstreamResponse> {
            self.creates.lock().unwrap().push(payload.clone());
            Ok(UpstreamResponse {
                status: 201,
                content_type: payload.content_type,
                body: payload.body,
            })
        }
    }

    /// Local site with upsert-by-CIN write-back.
    #[derive(Default)]
    struct FakeLocal {
        records: Mutex<HashMap<String, PatientRecord>>,
        unavailable: bool,
        reject_writes: bool,
        writes: Mutex<Vec<PatientRecord>>,
    }

    impl FakeLocal {
        fn with(records: Vec<PatientRecord>) -> Self {
            Self {
                records: Mutex::new(records.into_iter().map(|r| (r.cin.clone(), r)).collect()),
                ..Default::default()
            }
        }

        fn count_for(&self, cin: &str) -> usize {
            self.records
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.cin == cin)
                .count()
        }
    }

    #[async_trait]
    impl PatientReader for FakeLocal {
        async fn get_by_cin(&self, cin: &Cin) -> Lookup {
            if self.unavailable {
                return Lookup::Unavailable(ClientError::UnexpectedStatus {
                    url: "http://local/api/local_patient".into(),
                    status: 503,
                });
            }
            match self.records.lock().unwrap().get(cin.as_str()) {
                Some(record) => Lookup::Found(record.clone()),
                None => Lookup::Miss,
            }
        }
    }

    #[async_trait]
    impl PatientWriter for FakeLocal {
        async fn create(&self, record: &PatientRecord) -> ClientResult<()> {
            self.writes.lock().unwrap().push(record.clone());
            if self.reject_writes {
                return Err(ClientError::UnexpectedStatus {
                    url: "http://local/api/local_patient".into(),
                    status: 500,
                });
            }
            self.records
                .lock()
                .unwrap()
                .insert(record.cin.clone(), record.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeForwarder {
        seen: Mutex<Vec<ForwardRequest>>,
        unreachable: bool,
    }

    #[async_trait]
    impl Forwarder for FakeForwarder {
        async fn forward(&self, request: ForwardRequest) -> ClientResult<UpstreamResponse> {
            let url = request.url.to_string();
            self.seen.lock().unwrap().push(request);
            if self.unreachable {
                return Err(ClientError::Timeout { url });
            }
            Ok(UpstreamResponse {
                status: 200,
                content_type: Some("application/json".into()),
                body: Bytes::from_static(b"[]"),
            })
        }
    }

    fn patient(cin: &str, id: i64) -> PatientRecord {
        PatientRecord {
            id: Some(serde_json::json!(id)),
            cin: cin.into(),
            first_name: "Ahmed".into(),
            last_name: "Benali".into(),
            allergies: vec!["Pénicilline".into()],
            ..Default::default()
        }
    }

    fn downstream() -> Downstream {
        Downstream {
            billing_base_url: Url::parse("http://billing:3000").unwrap(),
            consultation_base_url: Url::parse("http://cardio:5000").unwrap(),
        }
    }

    fn router(
        central: &Arc<FakeCentral>,
        local: &Arc<FakeLocal>,
        forwarder: &Arc<FakeForwarder>,
    ) -> IntegrationRouter {
        IntegrationRouter::new(central.clone(), local.clone(), forwarder.clone(), downstream())
    }

    fn cin(value: &str) -> Cin {
        Cin::parse(value).unwrap()
    }

    // ------------------------------------------------------------------
    // Check-in
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn local_hit_short_circuits_central() {
        let local_record = patient("X1", 99);
        let central = Arc::new(FakeCentral::with(vec![patient("X1", 1)]));
        let local = Arc::new(FakeLocal::with(vec![local_record.clone()]));
        let router = router(&central, &local, &Arc::default());

        let outcome = router.checkin(&cin("X1")).await.expect("found");

        assert_eq!(outcome.origin(), RecordOrigin::Local);
        assert_eq!(outcome.record(), &local_record);
        assert_eq!(central.reads.load(Ordering::SeqCst), 0);
        assert!(local.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_miss_falls_back_and_syncs() {
        let central_record = patient("Y1", 7);
        let central = Arc::new(FakeCentral::with(vec![central_record.clone()]));
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let outcome = router.checkin(&cin("Y1")).await.expect("found");

        assert_eq!(outcome.origin(), RecordOrigin::CentralSynced);
        assert!(outcome.record().same_business_fields(&central_record));
        let writes = local.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].cin, "Y1");
    }

    #[tokio::test]
    async fn local_unavailability_is_treated_as_miss() {
        let central = Arc::new(FakeCentral::with(vec![patient("Y2", 7)]));
        let local = Arc::new(FakeLocal {
            unavailable: true,
            ..Default::default()
        });
        let router = router(&central, &local, &Arc::default());

        let outcome = router.checkin(&cin("Y2")).await.expect("found centrally");

        assert_eq!(outcome.origin(), RecordOrigin::CentralSynced);
        assert_eq!(central.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn full_miss_is_not_found_without_write_back() {
        let central = Arc::new(FakeCentral::default());
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let err = router.checkin(&cin("Z1")).await.expect_err("nowhere");

        assert!(matches!(err, RouterError::NotFound));
        assert!(local.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_checkin_keeps_one_local_record() {
        let central = Arc::new(FakeCentral::with(vec![patient("Y3", 7)]));
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let first = router.checkin(&cin("Y3")).await.expect("first");
        let second = router.checkin(&cin("Y3")).await.expect("second");

        assert_eq!(first.origin(), RecordOrigin::CentralSynced);
        assert_eq!(second.origin(), RecordOrigin::Local);
        assert_eq!(local.count_for("Y3"), 1);
        assert_eq!(central.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_checkins_converge_on_one_local_record() {
        let central = Arc::new(FakeCentral::with(vec![patient("W1", 3)]));
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let (w1, w2) = (cin("W1"), cin("W1"));
        let (a, b) = tokio::join!(router.checkin(&w1), router.checkin(&w2));

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(local.count_for("W1"), 1);
        let after = router.checkin(&cin("W1")).await.expect("read back");
        assert_eq!(after.origin(), RecordOrigin::Local);
        assert!(after.record().same_business_fields(&patient("W1", 3)));
    }

    #[tokio::test]
    async fn write_back_failure_returns_record_marked_unsynced() {
        let central = Arc::new(FakeCentral::with(vec![patient("S1", 5)]));
        let local = Arc::new(FakeLocal {
            reject_writes: true,
            ..Default::default()
        });
        let router = router(&central, &local, &Arc::default());

        let outcome = router.checkin(&cin("S1")).await.expect("still found");

        assert_eq!(outcome.origin(), RecordOrigin::CentralUnsynced);
        assert_eq!(outcome.record().cin, "S1");
        assert_eq!(local.count_for("S1"), 0);
    }

    #[tokio::test]
    async fn central_unavailability_is_not_folded_into_not_found() {
        let central = Arc::new(FakeCentral {
            unavailable: true,
            ..Default::default()
        });
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let err = router.checkin(&cin("U1")).await.expect_err("unavailable");

        assert!(matches!(err, RouterError::CentralUnavailable(ClientError::Timeout { .. })));
        assert!(local.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn central_record_without_cin_is_rejected_without_write_back() {
        let central = Arc::new(FakeCentral {
            records: HashMap::from([("B1".to_string(), PatientRecord::default())]),
            ..Default::default()
        });
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let err = router.checkin(&cin("B1")).await.expect_err("blank record");

        assert!(matches!(err, RouterError::CentralUnavailable(ClientError::Decode { .. })));
        assert!(local.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn local_record_for_another_cin_is_treated_as_miss() {
        let central = Arc::new(FakeCentral::with(vec![patient("L1", 6)]));
        let local = Arc::new(FakeLocal {
            records: Mutex::new(HashMap::from([("L1".to_string(), patient("STALE", 2))])),
            ..Default::default()
        });
        let router = router(&central, &local, &Arc::default());

        let outcome = router.checkin(&cin("L1")).await.expect("found centrally");

        assert_eq!(outcome.origin(), RecordOrigin::CentralSynced);
        assert_eq!(outcome.record().cin, "L1");
        assert_eq!(central.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn central_record_for_another_cin_is_rejected() {
        let central = Arc::new(FakeCentral {
            records: HashMap::from([("M1".to_string(), patient("OTHER", 8))]),
            ..Default::default()
        });
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default());

        let err = router.checkin(&cin("M1")).await.expect_err("mismatch");

        assert!(matches!(err, RouterError::CentralUnavailable(ClientError::Decode { .. })));
        assert!(local.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkin_source_can_be_a_peer_router() {
        let central = Arc::new(FakeCentral::default());
        let peer = Arc::new(FakeCentral::with(vec![patient("P1", 4)]));
        let local = Arc::new(FakeLocal::default());
        let router = router(&central, &local, &Arc::default()).with_checkin_source(peer.clone());

        let outcome = router.checkin(&cin("P1")).await.expect("found via peer");

        assert_eq!(outcome.origin(), RecordOrigin::CentralSynced);
        assert_eq!(peer.reads.load(Ordering::SeqCst), 1);
        assert_eq!(central.reads.load(Ordering::SeqCst), 0);
    }

    // ------------------------------------------------------------------
    // Search and validation
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn search_miss_is_not_found() {
        let central = Arc::new(FakeCentral::default());
        let router = router(&central, &Arc::default(), &Arc::default());

        let err = router.search(&cin("nobody")).await.expect_err("miss");
        assert!(matches!(err, RouterError::NotFound));
    }

    #[tokio::test]
    async fn search_by_name_finds_central_record() {
        let central = Arc::new(FakeCentral::with(vec![patient("N1", 2)]));
        let router = router(&central, &Arc::default(), &Arc::default());

        let query = PatientQuery::from_params(None, Some("Ahmed"), Some("Benali")).unwrap();
        let record = router.lookup(&query).await.expect("found");
        assert_eq!(record.cin, "N1");
    }

    #[test]
    fn first_name_alone_is_invalid() {
        let err = PatientQuery::from_params(None, Some("Ahmed"), None).expect_err("invalid");
        assert!(matches!(
            err,
            RouterError::InvalidRequest(messages::NAME_PAIR_REQUIRED)
        ));
    }

    #[test]
    fn no_parameters_require_a_cin() {
        let err = PatientQuery::from_params(Some("  "), None, None).expect_err("invalid");
        assert!(matches!(err, RouterError::InvalidRequest(messages::CIN_REQUIRED)));
        assert!(require_cin(None).is_err());
    }

    #[test]
    fn cin_takes_precedence_over_names() {
        let query = PatientQuery::from_params(Some("AB1"), Some("Ahmed"), None).unwrap();
        assert_eq!(query, PatientQuery::ByCin(cin("AB1")));
    }

    // ------------------------------------------------------------------
    // Pass-through
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn create_forwards_payload_verbatim() {
        let central = Arc::new(FakeCentral::default());
        let router = router(&central, &Arc::default(), &Arc::default());
        let payload = Payload::json(r#"{"cin":"C1","firstName":"Sara"}"#);

        let response = router.create(payload.clone()).await.expect("created");

        assert_eq!(response.status, 201);
        assert_eq!(central.creates.lock().unwrap().as_slice(), &[payload]);
    }

    #[tokio::test]
    async fn consultations_target_local_patient_id() {
        let forwarder = Arc::new(FakeForwarder::default());
        let router = router(&Arc::default(), &Arc::default(), &forwarder);

        router.consultations("42").await.expect("relayed");

        let seen = forwarder.seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(
            seen[0].url.as_str(),
            "http://cardio:5000/api/consultation/patient/42"
        );
    }

    #[tokio::test]
    async fn billing_forwards_body_to_billing_service() {
        let forwarder = Arc::new(FakeForwarder::default());
        let router = router(&Arc::default(), &Arc::default(), &forwarder);

        router
            .billing_generate(Payload::json(r#"{"patientId":"42"}"#))
            .await
            .expect("relayed");

        let seen = forwarder.seen.lock().unwrap();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].url.as_str(), "http://billing:3000/api/billing/generate");
        assert!(seen[0].payload.is_some());
    }

    #[tokio::test]
    async fn unreachable_pass_through_is_downstream_error() {
        let forwarder = Arc::new(FakeForwarder {
            unreachable: true,
            ..Default::default()
        });
        let router = router(&Arc::default(), &Arc::default(), &forwarder);

        let err = router.consultations("42").await.expect_err("unreachable");
        assert!(matches!(err, RouterError::Downstream(_)));
    }
}
