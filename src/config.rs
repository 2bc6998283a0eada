use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub users: String,
    pub forms: String,
    pub payments: String,
    pub documents: String,
    pub global: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_days: i64,
    pub reset_expires_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub relay_url: String,
    pub api_token: String,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub aws: AwsConfig,
    pub tables: TableConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub gateway: GatewayConfig,
    pub client_url: String,
    pub otp_expiry_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let aws = AwsConfig {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "ap-south-1".into()),
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            s3_bucket: std::env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "jlpt-documents".into()),
            s3_endpoint: std::env::var("S3_ENDPOINT").ok(),
        };
        let tables = TableConfig {
            users: std::env::var("USERS_TABLE_NAME").unwrap_or_else(|_| "Users".into()),
            forms: std::env::var("FORMS_TABLE_NAME").unwrap_or_else(|_| "JLPTForms".into()),
            payments: std::env::var("PAYMENTS_TABLE_NAME").unwrap_or_else(|_| "Payments".into()),
            documents: std::env::var("DOCUMENTS_TABLE_NAME").unwrap_or_else(|_| "Documents".into()),
            global: std::env::var("GLOBAL_TABLE_NAME").unwrap_or_else(|_| "GlobalData".into()),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            expires_days: std::env::var("JWT_EXPIRES_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
            reset_expires_secs: std::env::var("PASSWORD_RESET_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(3600),
        };
        let email = EmailConfig {
            relay_url: std::env::var("MAIL_RELAY_URL")
                .unwrap_or_else(|_| "http://localhost:8025".into()),
            api_token: std::env::var("MAIL_API_TOKEN").unwrap_or_default(),
            sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "no-reply@jlptreg.local".into()),
        };
        let gateway = GatewayConfig {
            key_id: std::env::var("RZP_ID").unwrap_or_default(),
            key_secret: std::env::var("RZP_SECRET").unwrap_or_default(),
            base_url: std::env::var("RZP_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".into()),
        };
        Ok(Self {
            env,
            aws,
            tables,
            jwt,
            email,
            gateway,
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            otp_expiry_minutes: std::env::var("OTP_EXPIRY_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(10),
        })
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }
}
