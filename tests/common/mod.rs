#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use actix_web::{body::MessageBody, dev::ServiceResponse, test};
use folioo::auth::{create_jwt, Role};
use folioo::models::{Id, NewAccount};
use folioo::notify::{BookingNotice, Notifier, NotifyError};
use folioo::rate_limit::RateLimiterFacade;
use folioo::repo::inmem::InMemRepo;
use folioo::repo::AccountRepo;
use folioo::storage::FsMediaStore;
use folioo::AppState;

/// Service over the harness state with the production routes and headers.
#[allow(unused_macros)]
macro_rules! test_app {
    ($h:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(folioo::SecurityHeaders::default())
                .app_data(actix_web::web::Data::new($h.state()))
                .configure(folioo::config),
        )
        .await
    };
}

pub const SECRET: &str = "test-secret-must-be-32-bytes-long!!";

pub fn set_secret() {
    std::env::set_var("JWT_SECRET", SECRET);
}

/// Records every notice instead of sending email.
#[derive(Default)]
pub struct CapturingNotifier {
    pub sent: Mutex<Vec<BookingNotice>>,
}

#[async_trait::async_trait]
impl Notifier for CapturingNotifier {
    async fn booking_created(&self, notice: &BookingNotice) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Fresh in-memory backend rooted in a temp dir. Keep `dir` alive for the test.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub repo: InMemRepo,
    pub notifier: Arc<CapturingNotifier>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

impl Harness {
    pub fn new() -> Self {
        set_secret();
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemRepo::with_data_dir(dir.path());
        Self { dir, repo, notifier: Arc::new(CapturingNotifier::default()), rate_limiter: None }
    }

    pub fn with_rate_limiter(mut self, rl: RateLimiterFacade) -> Self {
        self.rate_limiter = Some(rl);
        self
    }

    pub fn state(&self) -> AppState {
        AppState {
            repo: Arc::new(self.repo.clone()),
            media_store: Arc::new(FsMediaStore::with_root(self.dir.path().join("media"))),
            notifier: self.notifier.clone(),
            rate_limiter: self.rate_limiter.clone(),
        }
    }

    /// Account + profile straight through the repository, with a bearer token.
    pub async fn user(&self, email: &str, admin: bool) -> (Id, String) {
        let (account, profile) = self
            .repo
            .create_account(NewAccount { email: email.into(), password_hash: "x".into() }, admin)
            .await
            .unwrap();
        let token = create_jwt(account.id, Role::for_profile(&profile)).unwrap();
        (account.id, token)
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

pub async fn json_body<B: MessageBody>(resp: ServiceResponse<B>) -> serde_json::Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap()
}
