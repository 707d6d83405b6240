// akeno-admin/src/config.rs
use log::warn;
use std::env;
use std::time::Duration;

pub const DEFAULT_ADMIN_EMAILS: [&str; 4] = [
    "ask@akenotech.com",
    "uahmad@akenotech.com",
    "asad.aslam@akenotech.com",
    "awaispasha@akenotech.com",
];

// Runtime settings, sourced from the environment (and .env when present)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    // Fixed origin the /api passthrough forwards to
    pub proxy_origin: String,
    pub consultation_api: String,
    pub admin_api: String,
    pub identity_url: String,
    pub identity_anon_key: String,
    pub admin_emails: Vec<String>,
    pub session_file: String,
    pub poll_interval: Duration,
    pub session_check_interval: Duration,
    pub request_timeout: Duration,
    pub refresh_window_secs: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9090".to_string(),
            proxy_origin: "https://web-production-ae7a.up.railway.app".to_string(),
            consultation_api: "https://web-production-ae7a.up.railway.app".to_string(),
            admin_api: "https://web-production-608ab4.up.railway.app".to_string(),
            identity_url: "https://cgwikuodyiiwsjlgyuea.supabase.co".to_string(),
            identity_anon_key: String::new(),
            admin_emails: DEFAULT_ADMIN_EMAILS.iter().map(|e| e.to_string()).collect(),
            session_file: "./storage/session.json".to_string(),
            poll_interval: Duration::from_secs(10),
            session_check_interval: Duration::from_secs(5 * 60),
            request_timeout: Duration::from_secs(30),
            refresh_window_secs: 300,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = AppConfig::default();

        Self {
            bind_address: env::var("AKENO_BIND_ADDRESS").unwrap_or(defaults.bind_address),
            proxy_origin: base_url("AKENO_PROXY_ORIGIN", defaults.proxy_origin),
            consultation_api: base_url("AKENO_CONSULTATION_API", defaults.consultation_api),
            admin_api: base_url("AKENO_ADMIN_API", defaults.admin_api),
            identity_url: base_url("AKENO_IDENTITY_URL", defaults.identity_url),
            identity_anon_key: env::var("AKENO_IDENTITY_ANON_KEY")
                .unwrap_or(defaults.identity_anon_key),
            admin_emails: env::var("AKENO_ADMIN_EMAILS")
                .map(|raw| parse_email_list(&raw))
                .unwrap_or(defaults.admin_emails),
            session_file: env::var("AKENO_SESSION_FILE").unwrap_or(defaults.session_file),
            poll_interval: seconds("AKENO_POLL_INTERVAL_SECS", defaults.poll_interval),
            session_check_interval: seconds(
                "AKENO_SESSION_CHECK_SECS",
                defaults.session_check_interval,
            ),
            request_timeout: seconds("AKENO_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
            refresh_window_secs: seconds(
                "AKENO_REFRESH_WINDOW_SECS",
                Duration::from_secs(defaults.refresh_window_secs as u64),
            )
            .as_secs() as i64,
        }
    }
}

fn base_url(key: &str, default: String) -> String {
    env::var(key)
        .unwrap_or(default)
        .trim()
        .trim_end_matches('/')
        .to_string()
}

fn seconds(key: &str, default: Duration) -> Duration {
    parse_seconds(key, env::var(key).ok().as_deref(), default)
}

// Zero is refused as well: timers cannot tick at a zero period
fn parse_seconds(key: &str, raw: Option<&str>, default: Duration) -> Duration {
    match raw {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!("⚠️ Ignoring invalid {}={:?}, using {}s", key, raw, default.as_secs());
                default
            }
        },
        None => default,
    }
}

pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .collect()
}
