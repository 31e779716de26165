#[cfg(test)]
pub mod test_utils {
    use crate::auth::Password;
    use crate::config::{Settings, build_app_state};
    use crate::flash::{self, FLASH_COOKIE, FlashMessage};
    use crate::handlers::admin::insert_user;
    use crate::router::create_router;
    use crate::schemas::AppState;
    use axum::Router;
    use axum_test::{TestResponse, TestServer};
    use migration::{Migrator, MigratorTrait};
    use model::entities::user::Role;
    use reports::PdfFonts;
    use sea_orm::{Database, DatabaseConnection};
    use serde::Serialize;
    use std::sync::OnceLock;
    use std::time::Duration;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    /// Password of every seeded account.
    pub const TEST_PASSWORD: &str = "secret123";

    /// Accounts created by `setup_test_app_state`, one per role.
    pub const TEST_USERS: [(&str, Role); 4] = [
        ("admin", Role::Admin),
        ("operator", Role::Operator),
        ("editor", Role::Editor),
        ("viewer", Role::Viewer),
    ];

    /// Argon2 is slow on purpose; hash the shared password once per test binary.
    fn test_password() -> Password {
        static HASH: OnceLock<String> = OnceLock::new();
        let hash = HASH.get_or_init(|| {
            Password::hash(TEST_PASSWORD)
                .expect("Failed to hash test password")
                .into_string()
        });
        Password::from_hash(hash.clone())
    }

    /// Create an in-memory SQLite database for testing
    pub async fn setup_test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to connect to in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        db
    }

    pub fn test_settings() -> Settings {
        Settings {
            secret_key: "test-secret-key-with-enough-entropy-for-signing".to_string(),
            database_url: "sqlite::memory:".to_string(),
            production: false,
            session_lifetime: Duration::from_secs(600),
            pdf_fonts: PdfFonts::default(),
        }
    }

    /// Create AppState for testing, with one user per role
    pub async fn setup_test_app_state() -> AppState {
        let db = setup_test_db().await;
        let password = test_password();
        for (username, role) in TEST_USERS {
            insert_user(&db, username, &password, role)
                .await
                .expect("Failed to create test user");
        }
        build_app_state(db, test_settings())
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is read from RUST_LOG, defaulting to WARN.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Create axum app for testing
    pub async fn setup_test_app() -> Router {
        create_router(setup_test_app_state().await)
    }

    /// Test server that keeps cookies between requests, so sessions and
    /// flash messages behave like in a browser.
    pub fn test_server(app: Router) -> TestServer {
        let mut server = TestServer::new(app).expect("Failed to start test server");
        server.do_save_cookies();
        server
    }

    #[derive(Serialize)]
    struct Credentials<'a> {
        username: &'a str,
        password: &'a str,
    }

    /// Signs `username` in with the shared test password.
    pub async fn login(server: &TestServer, username: &str) -> TestResponse {
        server
            .post("/login")
            .form(&Credentials {
                username,
                password: TEST_PASSWORD,
            })
            .await
    }

    /// Fresh app with `username` already signed in.
    pub async fn server_as(username: &str) -> (TestServer, AppState) {
        let state = setup_test_app_state().await;
        let server = test_server(create_router(state.clone()));
        login(&server, username).await;
        (server, state)
    }

    /// Newest flash message set by a response. Earlier unread messages
    /// stay queued in front of it.
    pub fn last_flash(response: &TestResponse) -> FlashMessage {
        response
            .maybe_cookie(FLASH_COOKIE)
            .and_then(|cookie| flash::decode(cookie.value()).pop())
            .expect("Response did not set a flash message")
    }

    pub fn location(response: &TestResponse) -> String {
        response
            .header("location")
            .to_str()
            .expect("Location header is not ASCII")
            .to_string()
    }
}
