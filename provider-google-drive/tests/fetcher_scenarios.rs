//! Listing scenarios wired through a real `TokenBroker` and a fake Drive backend.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::time::{Clock, SystemClock};
use chrono::{Duration as ChronoDuration, Utc};
use core_auth::{Credential, InMemoryCredentialStore, RefreshGate, TokenBroker, TokenEndpoint};
use core_runtime::config::AccessConfig;
use provider_google_drive::{DriveFetcher, ListingSource};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FIVE_IMAGES: &str = r#"{"files":[
    {"id":"p5","name":"IMG_0010.jpg","mimeType":"image/jpeg","size":"5000"},
    {"id":"p1","name":"IMG_0001.jpg","mimeType":"image/jpeg","size":"1000"},
    {"id":"p3","name":"img_0003.png","mimeType":"image/png"},
    {"id":"p2","name":"IMG_0002.heic","mimeType":"image/heic"},
    {"id":"doc","name":"README","mimeType":"text/plain"},
    {"id":"p4","name":"IMG_0004.jpg","mimeType":"image/jpeg"}
]}"#;

const PRIVATE_IMAGES: &str = r#"{"files":[
    {"id":"s2","name":"secret 2.jpg","mimeType":"image/jpeg"},
    {"id":"s1","name":"secret 1.jpg","mimeType":"image/jpeg"}
]}"#;

/// Drive and token endpoint in one fake, routed on method and query.
#[derive(Default)]
struct FakeDrive {
    public: HashMap<&'static str, &'static str>,
    private: HashMap<&'static str, &'static str>,
    forbidden: Vec<&'static str>,
    token_calls: AtomicUsize,
    bearers: Mutex<Vec<String>>,
}

impl FakeDrive {
    fn folder_of(&self, url: &str) -> Option<&'static str> {
        self.public
            .keys()
            .chain(self.private.keys())
            .chain(self.forbidden.iter())
            .copied()
            .find(|folder| url.contains(&format!("%27{}%27", folder)))
    }

    fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for FakeDrive {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if request.method == HttpMethod::Post {
            let call = self.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            return Ok(HttpResponse::new(
                200,
                format!(r#"{{"access_token":"ya29.fresh-{}","expires_in":3600}}"#, call),
            ));
        }

        let folder = self.folder_of(&request.url);

        if request.url.contains("&key=") {
            return Ok(match folder.and_then(|f| self.public.get(f)) {
                Some(body) => HttpResponse::new(200, *body),
                None => HttpResponse::new(404, "File not found"),
            });
        }

        if let Some(bearer) = request.headers.get("Authorization") {
            self.bearers.lock().unwrap().push(bearer.clone());
        }
        Ok(match folder {
            Some(f) if self.forbidden.contains(&f) => HttpResponse::new(403, "insufficientFilePermissions"),
            Some(f) => HttpResponse::new(200, self.private.get(f).copied().unwrap_or(r#"{"files":[]}"#)),
            None => HttpResponse::new(200, r#"{"files":[]}"#),
        })
    }
}

struct Harness {
    drive: Arc<FakeDrive>,
    store: Arc<InMemoryCredentialStore>,
    fetcher: Arc<DriveFetcher>,
}

fn harness(drive: FakeDrive) -> Harness {
    let config = AccessConfig::builder()
        .api_key("public-key")
        .oauth_client("client-id", "client-secret")
        .build()
        .unwrap();
    let drive = Arc::new(drive);
    let store = Arc::new(InMemoryCredentialStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http: Arc<dyn HttpClient> = drive.clone();

    let broker = TokenBroker::new(
        store.clone(),
        RefreshGate::new(&config.refresh),
        &config.refresh,
        Arc::clone(&clock),
    )
    .with_endpoint(TokenEndpoint::new(
        Arc::clone(&http),
        config.oauth.clone().unwrap(),
        clock,
    ));
    let fetcher = DriveFetcher::new(http, &config, Arc::new(broker));

    Harness {
        drive,
        store,
        fetcher: Arc::new(fetcher),
    }
}

fn drive_with(
    public: &[(&'static str, &'static str)],
    private: &[(&'static str, &'static str)],
    forbidden: &[&'static str],
) -> FakeDrive {
    FakeDrive {
        public: public.iter().copied().collect(),
        private: private.iter().copied().collect(),
        forbidden: forbidden.to_vec(),
        ..FakeDrive::default()
    }
}

#[tokio::test]
async fn public_folder_lists_without_token() {
    let h = harness(drive_with(&[("shared", FIVE_IMAGES)], &[], &[]));
    h.store.insert("owner-1", Credential::default()).await;

    let listing = h
        .fetcher
        .list_detailed("shared", Some(&"owner-1".into()))
        .await
        .unwrap();

    assert_eq!(listing.source, ListingSource::Public);
    let ids: Vec<_> = listing.photos.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2", "p3", "p4", "p5"]);
    assert_eq!(h.drive.token_calls(), 0);
    assert!(h.drive.bearers.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_public_listing_falls_back_to_owner_token() {
    let h = harness(drive_with(&[], &[("private", PRIVATE_IMAGES)], &[]));
    h.store
        .insert(
            "owner-1",
            Credential::with_refresh_token("1//rt")
                .with_access_token("ya29.cached", Utc::now() + ChronoDuration::minutes(30)),
        )
        .await;

    let listing = h
        .fetcher
        .list_detailed("private", Some(&"owner-1".into()))
        .await
        .unwrap();

    assert_eq!(listing.source, ListingSource::Authenticated);
    let names: Vec<_> = listing.photos.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["secret 1.jpg", "secret 2.jpg"]);
    assert_eq!(h.drive.token_calls(), 0);
    assert_eq!(*h.drive.bearers.lock().unwrap(), ["Bearer ya29.cached"]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_listings_share_one_refresh() {
    let h = harness(drive_with(&[], &[("private", PRIVATE_IMAGES)], &[]));
    h.store
        .insert(
            "owner-1",
            Credential::with_refresh_token("1//rt")
                .with_access_token("ya29.stale", Utc::now() - ChronoDuration::minutes(10)),
        )
        .await;

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let fetcher = Arc::clone(&h.fetcher);
            tokio::spawn(async move { fetcher.list("private", Some(&"owner-1".into())).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }

    assert_eq!(h.drive.token_calls(), 1);
    let bearers = h.drive.bearers.lock().unwrap();
    assert_eq!(bearers.len(), 12);
    assert!(bearers.iter().all(|b| b == "Bearer ya29.fresh-1"));
}

#[tokio::test]
async fn repeated_listing_keeps_order() {
    let h = harness(drive_with(&[("shared", FIVE_IMAGES)], &[], &[]));

    let first = h.fetcher.list("shared", None).await.unwrap();
    let second = h.fetcher.list("shared", None).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn empty_and_forbidden_folders_differ_with_a_token() {
    let h = harness(drive_with(&[], &[("empty", r#"{"files":[]}"#)], &["locked"]));
    h.store
        .insert(
            "owner-1",
            Credential::with_refresh_token("1//rt")
                .with_access_token("ya29.cached", Utc::now() + ChronoDuration::minutes(30)),
        )
        .await;

    let empty = h
        .fetcher
        .list_detailed("empty", Some(&"owner-1".into()))
        .await
        .unwrap();
    assert_eq!(empty.source, ListingSource::Authenticated);
    assert!(empty.photos.is_empty());

    let locked = h
        .fetcher
        .list_detailed("locked", Some(&"owner-1".into()))
        .await
        .unwrap_err();
    assert!(locked.is_permission_denied());
}

#[tokio::test]
async fn unknown_owner_is_no_access() {
    let h = harness(drive_with(&[], &[("private", PRIVATE_IMAGES)], &[]));

    let listing = h
        .fetcher
        .list_detailed("private", Some(&"nobody".into()))
        .await
        .unwrap();

    assert_eq!(listing.source, ListingSource::NoAccess);
    assert!(listing.photos.is_empty());
    assert_eq!(h.drive.token_calls(), 0);
}
