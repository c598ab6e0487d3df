/**
 * Storefront Session Entry Point
 *
 * Restores the persisted session, signs in from the environment when there is
 * none, and prints the signed-in user's profile.
 *
 * Environment:
 * - `STOREFRONT_MOBILE`, `STOREFRONT_PASSWORD` - credentials for a fresh login
 * - `STOREFRONT_OTP_CODE` - OTP to confirm when the login asks for one
 * - `STOREFRONT_*` configuration variables, see `AppConfig::apply_env`
 */

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;
    use storefront::client::{AuthApi, Config, LoginOutcome, SessionAuthenticator, SqliteStorage, TokenStore};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::from_env()?;
    let db_path = config.session_db_path();
    tracing::info!(origin = %config.api_origin(), db = %db_path.display(), "Starting session client");

    let storage = SqliteStorage::open(&db_path).await?;
    let store = TokenStore::restore(Arc::new(storage)).await;
    let auth = SessionAuthenticator::builder(config, store)
        .on_session_cleared(|| tracing::warn!("Session ended, sign in again"))
        .build()?;
    let api = AuthApi::new(auth);

    if !api.store().get().await.is_authenticated() && !api.refresh_session().await {
        let mobile = std::env::var("STOREFRONT_MOBILE")
            .map_err(|_| "No stored session; set STOREFRONT_MOBILE and STOREFRONT_PASSWORD")?;
        let password = std::env::var("STOREFRONT_PASSWORD").map_err(|_| "STOREFRONT_PASSWORD is not set")?;

        match api.login(&mobile, &password).await? {
            LoginOutcome::Authenticated(user) => {
                tracing::info!(user_id = %user.id, "Signed in");
            }
            LoginOutcome::NeedsOtp { user, expires_at } => {
                let code = std::env::var("STOREFRONT_OTP_CODE").map_err(|_| {
                    match expires_at {
                        Some(at) => format!("OTP sent to {}, set STOREFRONT_OTP_CODE before {}", mobile, at),
                        None => format!("OTP sent to {}, set STOREFRONT_OTP_CODE", mobile),
                    }
                })?;
                let confirmed = api.confirm_otp(&mobile, &code).await?;
                tracing::info!(user_id = %user.id, confirmed = confirmed.mobile_confirmed, "Mobile number confirmed");
            }
        }
    }

    let profile = api.fetch_profile().await?;
    println!("id:        {}", profile.id);
    println!("name:      {}", profile.display_name.as_deref().unwrap_or("-"));
    println!("mobile:    {}", profile.mobile_number.as_deref().unwrap_or("-"));
    println!(
        "roles:     {}",
        profile.roles.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    println!("confirmed: {}", profile.mobile_confirmed);

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("The session client requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --bin storefront-session --features cli");
    std::process::exit(1);
}
