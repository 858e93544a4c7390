use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    pub finish_redirect_url: String,
    pub usd_idr_rate: i64,
    pub midtrans: MidtransConfig,
    pub dev_mode: bool,
}

/// Credentials and endpoints for the Midtrans gateway. Sandbox and
/// production use different hosts; MIDTRANS_PRODUCTION picks the pair.
#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub server_key: String,
    pub client_key: String,
    pub merchant_id: String,
    pub production: bool,
    /// Core API host (charges, status lookups).
    pub api_base_url: String,
    /// Snap host (hosted checkout pages).
    pub app_base_url: String,
}

impl MidtransConfig {
    pub fn from_env() -> Self {
        let production = env::var("MIDTRANS_PRODUCTION")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        let (api_base_url, app_base_url) = if production {
            (
                "https://api.midtrans.com".to_string(),
                "https://app.midtrans.com".to_string(),
            )
        } else {
            (
                "https://api.sandbox.midtrans.com".to_string(),
                "https://app.sandbox.midtrans.com".to_string(),
            )
        };

        Self {
            server_key: env::var("MIDTRANS_SERVER_KEY").unwrap_or_default(),
            client_key: env::var("MIDTRANS_CLIENT_KEY").unwrap_or_default(),
            merchant_id: env::var("MIDTRANS_MERCHANT_ID").unwrap_or_default(),
            production,
            api_base_url,
            app_base_url,
        }
    }

    /// Checkout refuses to run without a server key; everything else has a
    /// workable default.
    pub fn is_configured(&self) -> bool {
        !self.server_key.is_empty()
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYRAIL_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let finish_redirect_url = env::var("FINISH_REDIRECT_URL")
            .unwrap_or_else(|_| format!("{}/success", base_url));

        let usd_idr_rate: i64 = env::var("USD_IDR_RATE")
            .ok()
            .and_then(|r| r.parse().ok())
            .unwrap_or(16_000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "payrail.db".to_string()),
            base_url,
            finish_redirect_url,
            usd_idr_rate,
            midtrans: MidtransConfig::from_env(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
