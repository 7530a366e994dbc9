use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use client::{
    ApiInfo, ApiRef, ClientError, CmsClient, QueryOptions, SearchPage, StaticManifestSource,
};
use engine::{
    BootstrapState, ClientFactory, ErrorKind, PreviewEngine, PreviewError, ResolverParams,
};
use identity::NodeIdentity;
use model::{CustomTypeModel, LinkTarget, NormalizedField, RawDocument};
use normalize::Capabilities;
use serde_json::{json, Value};
use store::{BootstrapStatus, DocumentStore, RepositoryConfig, RepositoryOptions, RepositoryRegistry};
use tokio_util::sync::CancellationToken;
use typepath::TypePathManifest;

const PREVIEW: &str = "https://blog.prismic.io/previews/Yk3";
const MASTER: &str = "master";

/// In-memory CMS: documents per ref, filtered by the id and type predicates
/// the engine sends.
#[derive(Default)]
struct FakeCms {
    refs: HashMap<String, Vec<RawDocument>>,
    published: HashSet<String>,
    unauthorized: bool,
    pages_served: Mutex<u32>,
}

impl FakeCms {
    fn with_docs(mut self, reference: &str, docs: Vec<RawDocument>) -> Self {
        self.refs.insert(reference.to_owned(), docs);
        self
    }

    fn pages_served(&self) -> u32 {
        *self.pages_served.lock().unwrap()
    }
}

fn predicate_arg<'a>(predicate: &'a str, prefix: &str) -> Option<&'a str> {
    predicate.strip_prefix(prefix)?.strip_suffix(')')
}

fn matches(doc: &RawDocument, predicates: &[String]) -> bool {
    predicates.iter().all(|predicate| {
        if let Some(list) = predicate_arg(predicate, "in(document.id,") {
            let ids: Vec<String> = serde_json::from_str(list).unwrap();
            ids.contains(&doc.id)
        } else if let Some(id) = predicate_arg(predicate, "at(document.id,") {
            serde_json::from_str::<String>(id).unwrap() == doc.id
        } else if let Some(ty) = predicate_arg(predicate, "at(document.type,") {
            serde_json::from_str::<String>(ty).unwrap() == doc.doc_type
        } else {
            true
        }
    })
}

#[async_trait]
impl CmsClient for FakeCms {
    async fn fetch_api(&self, _cancel: &CancellationToken) -> Result<ApiInfo, ClientError> {
        Ok(ApiInfo {
            refs: vec![ApiRef {
                id: "master".into(),
                reference: MASTER.into(),
                label: Some("Master".into()),
                is_master_ref: true,
            }],
        })
    }

    async fn fetch_page(
        &self,
        query: &QueryOptions,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Aborted);
        }
        if self.unauthorized {
            return Err(ClientError::from_status(401, "invalid access token"));
        }
        *self.pages_served.lock().unwrap() += 1;
        let reference = query.reference.as_deref().unwrap_or(MASTER);
        let all: Vec<&RawDocument> = self
            .refs
            .get(reference)
            .map(|docs| docs.iter().filter(|doc| matches(doc, &query.predicates)).collect())
            .unwrap_or_default();
        let page_size = query.page_size.unwrap_or(20).max(1) as usize;
        let total_pages = all.len().div_ceil(page_size).max(1) as u32;
        let results = all
            .into_iter()
            .skip((page as usize - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();
        Ok(SearchPage {
            page,
            results_per_page: page_size as u32,
            total_results_size: 0,
            total_pages,
            next_page: None,
            results,
        })
    }

    async fn fetch_published_ids(
        &self,
        _cancel: &CancellationToken,
    ) -> Result<HashSet<String>, ClientError> {
        Ok(self.published.clone())
    }
}

struct FakeFactory {
    cms: Arc<FakeCms>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ClientFactory for FakeFactory {
    fn client(
        &self,
        _options: &RepositoryOptions,
        access_token: Option<&str>,
    ) -> Result<Arc<dyn CmsClient>, ClientError> {
        self.tokens
            .lock()
            .unwrap()
            .push(access_token.map(str::to_owned));
        Ok(Arc::clone(&self.cms) as Arc<dyn CmsClient>)
    }
}

fn custom_type(id: &str) -> CustomTypeModel {
    serde_json::from_value(json!({
        "id": id,
        "json": {"Main": {"title": {"type": "Text"}, "link": {"type": "Link"}}}
    }))
    .unwrap()
}

fn doc(id: &str, doc_type: &str, title: &str, links_to: Option<&str>) -> RawDocument {
    let mut data = json!({"title": title});
    if let Some(target) = links_to {
        data["link"] = json!({"link_type": "Document", "id": target, "type": "page", "lang": "en-us"});
    }
    serde_json::from_value(json!({
        "id": id,
        "type": doc_type,
        "lang": "en-us",
        "data": data,
    }))
    .unwrap()
}

fn route(target: &LinkTarget) -> Option<String> {
    Some(format!("/{}", target.id))
}

struct Harness {
    engine: PreviewEngine,
    cms: Arc<FakeCms>,
    factory: Arc<FakeFactory>,
}

fn harness(cms: FakeCms, config: RepositoryConfig, caps: Capabilities) -> Harness {
    let cms = Arc::new(cms);
    let factory = Arc::new(FakeFactory {
        cms: Arc::clone(&cms),
        tokens: Mutex::new(Vec::new()),
    });
    let manifests = StaticManifestSource::new();
    manifests.insert(
        TypePathManifest::build("blog", vec![custom_type("home"), custom_type("page")], vec![])
            .unwrap(),
    );
    let registry =
        RepositoryRegistry::new([RepositoryOptions::new(config, caps).unwrap()]).unwrap();
    let engine = PreviewEngine::new(
        Arc::new(registry),
        Arc::new(DocumentStore::new()),
        Arc::clone(&factory) as Arc<dyn ClientFactory>,
        Arc::new(manifests),
    );
    Harness {
        engine,
        cms,
        factory,
    }
}

fn cookie(preview: &str) -> String {
    json!({"blog.prismic.io": {"preview": preview}}).to_string()
}

fn stored_ids(store: &DocumentStore) -> HashSet<String> {
    store
        .documents(Some("blog"))
        .iter()
        .map(|doc| doc.prismic_id.clone())
        .collect()
}

fn linked_prismic_id(store: &DocumentStore, prismic_id: &str) -> Option<String> {
    let doc = store.get_by_prismic_id("blog", prismic_id)?;
    let value = doc
        .field("link")
        .and_then(NormalizedField::as_link)
        .and_then(|link| link.document.as_ref())
        .and_then(|reference| reference.resolve(store))?;
    Some(value.prismic_id.clone())
}

#[tokio::test]
async fn paginated_bootstrap_stores_every_document_by_derived_id() {
    let docs: Vec<RawDocument> = (0..5)
        .map(|n| doc(&format!("P{n}"), "page", &format!("page {n}"), None))
        .collect();
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, docs),
        RepositoryConfig::new("blog").with_page_size(2),
        Capabilities::new(route),
    );

    let state = h
        .engine
        .bootstrap(Some(&cookie(PREVIEW)), &CancellationToken::new())
        .await;
    let summary = state.summary().expect("bootstrapped");
    assert_eq!(summary.documents, 5);
    assert_eq!(summary.fetched, 5);
    assert_eq!(h.cms.pages_served(), 3);

    let identity = NodeIdentity::for_repository("blog", None).unwrap();
    let store = h.engine.store();
    assert_eq!(store.len(), 5);
    for n in 0..5 {
        let prismic_id = format!("P{n}");
        let node_id = identity.document_id(&prismic_id).unwrap();
        assert_eq!(store.get(&node_id).unwrap().prismic_id, prismic_id);
    }
    assert!(matches!(
        h.engine.bootstrap_status("blog"),
        BootstrapStatus::Bootstrapped { documents: 5, .. }
    ));
}

#[tokio::test]
async fn second_bootstrap_for_the_same_ref_is_refused_without_writes() {
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, vec![doc("P0", "page", "zero", None)]),
        RepositoryConfig::new("blog"),
        Capabilities::new(route),
    );
    let cancel = CancellationToken::new();
    let first = h.engine.bootstrap(Some(&cookie(PREVIEW)), &cancel).await;
    assert_eq!(first.name(), "BOOTSTRAPPED");
    let revision = h.engine.store().revision();
    let pages = h.cms.pages_served();

    let second = h.engine.bootstrap(Some(&cookie(PREVIEW)), &cancel).await;
    assert!(matches!(
        second.error(),
        Some(PreviewError::AlreadyBootstrapped { .. })
    ));
    assert_eq!(second.error().map(PreviewError::kind), Some(ErrorKind::Guard));
    assert_eq!(h.engine.store().revision(), revision);
    assert_eq!(h.cms.pages_served(), pages);
    assert!(matches!(
        h.engine.bootstrap_status("blog"),
        BootstrapStatus::Bootstrapped { .. }
    ));
}

#[tokio::test]
async fn link_closure_stops_at_the_depth_cap() {
    let docs = vec![
        doc("H", "home", "home", Some("P1")),
        doc("P1", "page", "one", Some("P2")),
        doc("P2", "page", "two", Some("P3")),
        doc("P3", "page", "three", Some("P4")),
        doc("P4", "page", "four", None),
    ];
    let mut config = RepositoryConfig::new("blog").with_max_link_depth(2);
    config.predicates = vec![r#"at(document.type,"home")"#.into()];
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, docs),
        config,
        Capabilities::new(route),
    );

    let state = h
        .engine
        .bootstrap(Some(&cookie(PREVIEW)), &CancellationToken::new())
        .await;
    let summary = state.summary().expect("bootstrapped");
    assert_eq!(summary.documents, 1);
    assert_eq!(summary.closure.depth, 2);
    assert_eq!(summary.closure.fetched, 2);
    assert!(summary.closure.truncated);
    assert_eq!(summary.closure.unresolved, 1);

    let store = h.engine.store();
    let expected: HashSet<String> = ["H", "P1", "P2"].iter().map(|s| s.to_string()).collect();
    assert_eq!(stored_ids(store), expected);
    assert_eq!(linked_prismic_id(store, "P1").as_deref(), Some("P2"));
    assert_eq!(linked_prismic_id(store, "P2"), None);
}

#[tokio::test]
async fn cyclic_links_terminate() {
    let docs = vec![
        doc("H", "home", "home", Some("P1")),
        doc("P1", "page", "one", Some("P2")),
        doc("P2", "page", "two", Some("P1")),
    ];
    let mut config = RepositoryConfig::new("blog").with_max_link_depth(10);
    config.predicates = vec![r#"at(document.type,"home")"#.into()];
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, docs),
        config,
        Capabilities::new(route),
    );

    let state = h
        .engine
        .bootstrap(Some(&cookie(PREVIEW)), &CancellationToken::new())
        .await;
    let summary = state.summary().expect("bootstrapped");
    assert_eq!(summary.closure.depth, 2);
    assert!(!summary.closure.truncated);
    let store = h.engine.store();
    assert_eq!(store.len(), 3);
    assert_eq!(linked_prismic_id(store, "P2").as_deref(), Some("P1"));
    assert_eq!(linked_prismic_id(store, "P1").as_deref(), Some("P2"));
}

#[tokio::test]
async fn release_preview_keeps_only_changed_and_unpublished_documents() {
    let release = "https://blog.prismic.io/previews/Yk3:REL1";
    let mut cms = FakeCms::default()
        .with_docs(
            MASTER,
            vec![doc("A", "page", "same", None), doc("B", "page", "old", None)],
        )
        .with_docs(
            release,
            vec![
                doc("A", "page", "same", None),
                doc("B", "page", "new", None),
                doc("C", "page", "draft", None),
            ],
        );
    cms.published = ["A", "B"].iter().map(|s| s.to_string()).collect();
    let h = harness(cms, RepositoryConfig::new("blog"), Capabilities::new(route));

    let state = h
        .engine
        .bootstrap(Some(&cookie(release)), &CancellationToken::new())
        .await;
    let summary = state.summary().expect("bootstrapped");
    assert_eq!(summary.release_id.as_deref(), Some("REL1"));
    assert_eq!(summary.fetched, 3);
    assert_eq!(summary.documents, 2);
    let expected: HashSet<String> = ["B", "C"].iter().map(|s| s.to_string()).collect();
    assert_eq!(stored_ids(h.engine.store()), expected);
}

#[tokio::test]
async fn unauthorized_repository_fails_with_auth() {
    let cms = FakeCms {
        unauthorized: true,
        ..FakeCms::default()
    };
    let h = harness(cms, RepositoryConfig::new("blog"), Capabilities::new(route));

    let state = h
        .engine
        .bootstrap(Some(&cookie(PREVIEW)), &CancellationToken::new())
        .await;
    assert_eq!(state.error().map(PreviewError::kind), Some(ErrorKind::Auth));
    assert!(h.engine.prompts_for_access_token("blog"));
    match h.engine.bootstrap_status("blog") {
        BootstrapStatus::Failed { cause, .. } => assert_eq!(cause.kind, "auth"),
        other => panic!("unexpected status {other:?}"),
    }
    assert!(h.engine.store().is_empty());
}

#[tokio::test]
async fn access_token_set_for_the_session_reaches_the_client() {
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, vec![doc("P0", "page", "zero", None)]),
        RepositoryConfig::new("blog").with_access_token("configured"),
        Capabilities::new(route),
    );
    h.engine.set_access_token("blog", "session-token").unwrap();
    h.engine
        .bootstrap(Some(&cookie(PREVIEW)), &CancellationToken::new())
        .await;
    assert_eq!(
        h.factory.tokens.lock().unwrap().last().cloned().flatten().as_deref(),
        Some("session-token")
    );

    assert_eq!(
        h.engine.clear_access_token("blog").unwrap().as_deref(),
        Some("session-token")
    );
    assert_eq!(h.engine.access_token("blog").as_deref(), Some("configured"));
    assert!(h.engine.set_access_token("blog", "  ").is_err());
    assert!(matches!(
        h.engine.set_access_token("shop", "x"),
        Err(PreviewError::UnknownRepository(_))
    ));
}

#[tokio::test]
async fn missing_or_foreign_sessions() {
    let h = harness(FakeCms::default(), RepositoryConfig::new("blog"), Capabilities::new(route));
    let cancel = CancellationToken::new();

    let absent = h.engine.bootstrap(None, &cancel).await;
    assert_eq!(absent.error(), Some(&PreviewError::SessionAbsent));
    let empty = h.engine.bootstrap(Some(""), &cancel).await;
    assert_eq!(empty.error(), Some(&PreviewError::SessionAbsent));

    let foreign = h
        .engine
        .bootstrap(
            Some(&json!({"shop.prismic.io": {"preview": "https://shop.prismic.io/previews/X"}}).to_string()),
            &cancel,
        )
        .await;
    assert_eq!(
        foreign.error(),
        Some(&PreviewError::UnknownRepository("shop".into()))
    );
    assert_eq!(h.engine.bootstrap_status("blog"), BootstrapStatus::Init);
}

#[tokio::test]
async fn cancelled_bootstrap_is_aborted() {
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, vec![doc("P0", "page", "zero", None)]),
        RepositoryConfig::new("blog"),
        Capabilities::new(route),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();
    let state = h.engine.bootstrap(Some(&cookie(PREVIEW)), &cancel).await;
    assert_eq!(state.error().map(PreviewError::kind), Some(ErrorKind::Aborted));
    assert!(h.engine.store().is_empty());
}

#[tokio::test]
async fn resolver_yields_the_document_path() {
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, vec![doc("P1", "page", "one", None)]),
        RepositoryConfig::new("blog"),
        Capabilities::new(route),
    );
    let cancel = CancellationToken::new();
    let params = ResolverParams::new("P1", PREVIEW);

    let state = h.engine.resolve(Some(&params), Some("blog"), &cancel).await;
    let resolution = state.resolution().expect("resolved");
    assert_eq!(resolution.path, "/P1");
    assert!(h.engine.store().contains(&resolution.node_id));

    let missing = h
        .engine
        .resolve(Some(&ResolverParams::new("nope", PREVIEW)), None, &cancel)
        .await;
    assert_eq!(
        missing.error(),
        Some(&PreviewError::DocumentNotFound("nope".into()))
    );

    let mismatch = h.engine.resolve(Some(&params), Some("shop"), &cancel).await;
    assert!(matches!(
        mismatch.error(),
        Some(PreviewError::RepositoryMismatch { .. })
    ));

    let absent = h.engine.resolve(None, None, &cancel).await;
    assert_eq!(absent.error(), Some(&PreviewError::SessionAbsent));
}

#[tokio::test]
async fn resolver_falls_back_to_root_without_a_route() {
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, vec![doc("P1", "page", "one", None)]),
        RepositoryConfig::new("blog"),
        Capabilities::default(),
    );
    let state = h
        .engine
        .resolve(
            Some(&ResolverParams::new("P1", PREVIEW)),
            None,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(state.resolution().map(|r| r.path.as_str()), Some("/"));
}

#[tokio::test]
async fn render_merges_stored_documents_into_static_data() {
    let h = harness(
        FakeCms::default().with_docs(PREVIEW, vec![doc("P1", "page", "fresh", None)]),
        RepositoryConfig::new("blog"),
        Capabilities::new(route),
    );
    h.engine
        .bootstrap(Some(&cookie(PREVIEW)), &CancellationToken::new())
        .await;
    let node_id = h.engine.store().get_by_prismic_id("blog", "P1").unwrap().id.clone();

    let static_data = json!({"page": {"_previewable": node_id, "data": {"title": "stale"}}});
    let outcome = h
        .engine
        .render(
            &static_data,
            &reconcile::MergeStrategy::TraverseAndReplace,
            &store::SnapshotOptions::default(),
        )
        .unwrap();
    let title: &Value = &outcome.data["page"]["data"]["title"];
    assert_eq!(title, "fresh");

    let state = BootstrapState::default();
    assert_eq!(state.name(), "INIT");
}
