//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the hosted-backend seams as trait objects; in production all three
//! point at one `BackendClient`. No per-user state lives here: sessions are
//! carried by each request.

use std::sync::Arc;

use crate::backend::{PackageStore, ProfileLookup, SessionProvider};

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
    pub profiles: Arc<dyn ProfileLookup>,
    pub packages: Arc<dyn PackageStore>,
    /// Whether session cookies carry the `Secure` flag.
    pub cookie_secure: bool,
}

impl AppState {
    /// Build state from one backend implementing every seam.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>, cookie_secure: bool) -> Self
    where
        B: SessionProvider + ProfileLookup + PackageStore + 'static,
    {
        Self { sessions: backend.clone(), profiles: backend.clone(), packages: backend, cookie_secure }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Method, Request, StatusCode, header};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::backend::{
        AuthSession, AuthUser, BackendError, NewPackage, NewProfile, Package, PackageFilter, PackageStatus, Profile,
        Role, SessionContext, SignUpOutcome,
    };

    pub const TEST_PASSWORD: &str = "secret";

    struct Account {
        password: String,
        user_id: Uuid,
    }

    #[derive(Default)]
    struct FakeData {
        accounts: HashMap<String, Account>,
        tokens: HashMap<String, Uuid>,
        profiles: HashMap<Uuid, Profile>,
        raw_roles: HashMap<Uuid, String>,
        packages: Vec<Package>,
        clock: u32,
        auth_down: bool,
        profiles_down: bool,
        packages_down: bool,
        require_confirmation: bool,
    }

    impl FakeData {
        fn tick(&mut self) -> String {
            self.clock += 1;
            format!("2025-01-01T00:{:02}:{:02}Z", self.clock / 60, self.clock % 60)
        }

        fn issue_token(&mut self, user_id: Uuid) -> String {
            let token = format!("token-{}", Uuid::new_v4());
            self.tokens.insert(token.clone(), user_id);
            token
        }

        fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
            if self.profiles_down {
                return Err(BackendError::Transport("profiles unreachable".into()));
            }
            if let Some(raw) = self.raw_roles.get(&user_id) {
                Role::parse(raw)?;
            }
            Ok(self.profiles.get(&user_id).cloned())
        }

        fn packages_up(&self) -> Result<(), BackendError> {
            if self.packages_down {
                Err(BackendError::Transport("packages unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    fn matches(pkg: &Package, filter: PackageFilter) -> bool {
        filter.user_id.is_none_or(|id| pkg.user_id == id) && filter.status.is_none_or(|s| pkg.status == s)
    }

    /// In-memory stand-in for the hosted backend.
    #[derive(Default)]
    pub struct FakeBackend {
        data: Mutex<FakeData>,
    }

    impl FakeBackend {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn data(&self) -> MutexGuard<'_, FakeData> {
            self.data.lock().expect("fake backend mutex should lock")
        }

        /// Register a confirmed account with a profile and a live token.
        /// Password is [`TEST_PASSWORD`].
        pub fn add_user(&self, email: &str, role: Role) -> (String, Uuid) {
            let user_id = Uuid::new_v4();
            let mut data = self.data();
            data.accounts
                .insert(email.to_string(), Account { password: TEST_PASSWORD.into(), user_id });
            let name = email.split('@').next().unwrap_or(email).to_string();
            data.profiles.insert(
                user_id,
                Profile {
                    id: user_id,
                    role,
                    name: Some(name),
                    email: Some(email.to_string()),
                    avatar_url: None,
                    phone: None,
                    id_number: None,
                    birthdate: None,
                    branch: None,
                    locker_address: None,
                },
            );
            let token = data.issue_token(user_id);
            (token, user_id)
        }

        pub fn add_package(&self, user_id: Uuid, tracking_number: &str, status: PackageStatus) -> Uuid {
            let mut data = self.data();
            let id = Uuid::new_v4();
            let created_at = data.tick();
            data.packages.push(Package {
                id,
                user_id,
                tracking_number: tracking_number.to_string(),
                weight: Some(1.5),
                price: Some(10.0),
                status,
                created_at: Some(created_at),
                received_at_miami: None,
                received_at_branch: None,
            });
            id
        }

        pub fn set_auth_down(&self, down: bool) {
            self.data().auth_down = down;
        }

        pub fn set_profiles_down(&self, down: bool) {
            self.data().profiles_down = down;
        }

        pub fn set_packages_down(&self, down: bool) {
            self.data().packages_down = down;
        }

        pub fn set_require_confirmation(&self, require: bool) {
            self.data().require_confirmation = require;
        }

        pub fn remove_profile(&self, user_id: Uuid) {
            self.data().profiles.remove(&user_id);
        }

        pub fn set_role(&self, user_id: Uuid, role: Role) {
            if let Some(profile) = self.data().profiles.get_mut(&user_id) {
                profile.role = role;
            }
        }

        /// Store a role value the service does not understand.
        pub fn set_unknown_role(&self, user_id: Uuid, raw: &str) {
            self.data().raw_roles.insert(user_id, raw.to_string());
        }

        #[must_use]
        pub fn profile(&self, user_id: Uuid) -> Option<Profile> {
            self.data().profiles.get(&user_id).cloned()
        }

        #[must_use]
        pub fn package(&self, id: Uuid) -> Option<Package> {
            self.data().packages.iter().find(|p| p.id == id).cloned()
        }

        #[must_use]
        pub fn package_count(&self) -> usize {
            self.data().packages.len()
        }

        #[must_use]
        pub fn token_is_live(&self, token: &str) -> bool {
            self.data().tokens.contains_key(token)
        }
    }

    #[async_trait::async_trait]
    impl SessionProvider for FakeBackend {
        async fn current_user(&self, session: &SessionContext) -> Result<Option<AuthUser>, BackendError> {
            let data = self.data();
            if data.auth_down {
                return Err(BackendError::Transport("auth unreachable".into()));
            }
            let Some(token) = session.access_token() else {
                return Ok(None);
            };
            Ok(data.tokens.get(token).map(|id| {
                let email = data
                    .accounts
                    .iter()
                    .find(|(_, a)| a.user_id == *id)
                    .map(|(email, _)| email.clone());
                AuthUser { id: *id, email }
            }))
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
            let mut data = self.data();
            if data.auth_down {
                return Err(BackendError::Transport("auth unreachable".into()));
            }
            let user_id = match data.accounts.get(email) {
                Some(account) if account.password == password => account.user_id,
                _ => {
                    return Err(BackendError::Status { status: 400, message: "Invalid login credentials".into() });
                }
            };
            let access_token = data.issue_token(user_id);
            Ok(AuthSession {
                access_token,
                refresh_token: None,
                expires_in: Some(3600),
                user: AuthUser { id: user_id, email: Some(email.to_string()) },
            })
        }

        async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, BackendError> {
            let mut data = self.data();
            if data.auth_down {
                return Err(BackendError::Transport("auth unreachable".into()));
            }
            if data.accounts.contains_key(email) {
                return Err(BackendError::Status { status: 422, message: "User already registered".into() });
            }
            let user_id = Uuid::new_v4();
            data.accounts
                .insert(email.to_string(), Account { password: password.to_string(), user_id });
            let user = AuthUser { id: user_id, email: Some(email.to_string()) };
            if data.require_confirmation {
                return Ok(SignUpOutcome::PendingConfirmation(user));
            }
            let access_token = data.issue_token(user_id);
            Ok(SignUpOutcome::Session(AuthSession { access_token, refresh_token: None, expires_in: Some(3600), user }))
        }

        async fn sign_out(&self, session: &SessionContext) -> Result<(), BackendError> {
            let mut data = self.data();
            if data.auth_down {
                return Err(BackendError::Transport("auth unreachable".into()));
            }
            if let Some(token) = session.access_token() {
                data.tokens.remove(token);
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ProfileLookup for FakeBackend {
        async fn get_role(&self, _session: &SessionContext, user_id: Uuid) -> Result<Option<Role>, BackendError> {
            Ok(self.data().profile(user_id)?.map(|p| p.role))
        }

        async fn get_profile(&self, _session: &SessionContext, user_id: Uuid) -> Result<Option<Profile>, BackendError> {
            self.data().profile(user_id)
        }

        async fn list_profiles(&self, _session: &SessionContext) -> Result<Vec<Profile>, BackendError> {
            let data = self.data();
            if data.profiles_down {
                return Err(BackendError::Transport("profiles unreachable".into()));
            }
            let mut profiles: Vec<Profile> = data.profiles.values().cloned().collect();
            profiles.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(profiles)
        }

        async fn insert_profile(&self, _session: &SessionContext, profile: &NewProfile) -> Result<(), BackendError> {
            let mut data = self.data();
            if data.profiles_down {
                return Err(BackendError::Transport("profiles unreachable".into()));
            }
            if data.profiles.contains_key(&profile.id) {
                return Err(BackendError::Status { status: 409, message: "duplicate key value".into() });
            }
            data.profiles.insert(
                profile.id,
                Profile {
                    id: profile.id,
                    role: profile.role,
                    name: Some(profile.name.clone()),
                    email: Some(profile.email.clone()),
                    avatar_url: None,
                    phone: profile.phone.clone(),
                    id_number: profile.id_number.clone(),
                    birthdate: profile.birthdate.clone(),
                    branch: profile.branch.clone(),
                    locker_address: None,
                },
            );
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl PackageStore for FakeBackend {
        async fn list_packages(
            &self,
            _session: &SessionContext,
            filter: PackageFilter,
        ) -> Result<Vec<Package>, BackendError> {
            let data = self.data();
            data.packages_up()?;
            let mut rows: Vec<Package> = data
                .packages
                .iter()
                .filter(|p| matches(p, filter))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(rows)
        }

        async fn count_packages(&self, _session: &SessionContext, filter: PackageFilter) -> Result<u64, BackendError> {
            let data = self.data();
            data.packages_up()?;
            Ok(data.packages.iter().filter(|p| matches(p, filter)).count() as u64)
        }

        async fn insert_package(&self, _session: &SessionContext, package: &NewPackage) -> Result<Package, BackendError> {
            let mut data = self.data();
            data.packages_up()?;
            let created_at = data.tick();
            let row = Package {
                id: Uuid::new_v4(),
                user_id: package.user_id,
                tracking_number: package.tracking_number.clone(),
                weight: Some(package.weight),
                price: Some(package.price),
                status: package.status,
                created_at: Some(created_at),
                received_at_miami: package.received_at_miami.clone(),
                received_at_branch: package.received_at_branch.clone(),
            };
            data.packages.push(row.clone());
            Ok(row)
        }

        async fn update_status(
            &self,
            _session: &SessionContext,
            package_id: Uuid,
            status: PackageStatus,
        ) -> Result<bool, BackendError> {
            let mut data = self.data();
            data.packages_up()?;
            Ok(data
                .packages
                .iter_mut()
                .find(|p| p.id == package_id)
                .map(|p| p.status = status)
                .is_some())
        }

        async fn delete_package(&self, _session: &SessionContext, package_id: Uuid) -> Result<bool, BackendError> {
            let mut data = self.data();
            data.packages_up()?;
            let before = data.packages.len();
            data.packages.retain(|p| p.id != package_id);
            Ok(data.packages.len() != before)
        }
    }

    /// `AppState` backed by the given fake.
    #[must_use]
    pub fn test_app_state(backend: Arc<FakeBackend>) -> AppState {
        AppState::from_backend(backend, false)
    }

    // =========================================================================
    // ROUTER CALLS
    // =========================================================================

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Vec<u8>,
    }

    impl TestResponse {
        #[must_use]
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).expect("response body should be JSON")
        }

        #[must_use]
        pub fn location(&self) -> Option<&str> {
            self.headers
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
        }

        /// Every `Set-Cookie` header value.
        #[must_use]
        pub fn set_cookies(&self) -> Vec<String> {
            self.headers
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok().map(str::to_owned))
                .collect()
        }
    }

    pub fn request(method: Method, path: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("access_token={token}"));
        }
        let built = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        };
        built.expect("test request should build")
    }

    pub async fn call(router: Router, req: Request<Body>) -> TestResponse {
        let resp = router.oneshot(req).await.expect("router is infallible");
        let (parts, body) = resp.into_parts();
        let body = to_bytes(body, usize::MAX).await.expect("body should read").to_vec();
        TestResponse { status: parts.status, headers: parts.headers, body }
    }
}
