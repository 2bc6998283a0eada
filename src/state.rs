use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Db;
use crate::email::{HttpMailer, Mailer};
use crate::payments::gateway::{PaymentGateway, RazorpayGateway};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = Db::connect(&config).await?;
        let storage = Arc::new(Storage::new(&config.aws).await?) as Arc<dyn StorageClient>;
        let mailer = Arc::new(HttpMailer::new(&config.email)) as Arc<dyn Mailer>;
        let gateway = Arc::new(RazorpayGateway::new(&config.gateway)) as Arc<dyn PaymentGateway>;
        Ok(Self {
            db,
            config,
            storage,
            mailer,
            gateway,
        })
    }

    pub fn from_parts(
        db: Db,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            config,
            storage,
            mailer,
            gateway,
        }
    }

    /// State with in-process fakes; nothing here touches the network.
    pub fn fake() -> Self {
        use axum::async_trait;
        use bytes::Bytes;
        use serde_json::json;

        #[derive(Clone)]
        struct FakeStorage;
        #[async_trait]
        impl StorageClient for FakeStorage {
            async fn put_object(&self, _k: &str, _b: Bytes, _ct: &str) -> anyhow::Result<()> {
                Ok(())
            }
            async fn delete_object(&self, _k: &str) -> anyhow::Result<()> {
                Ok(())
            }
            async fn presign_get(&self, k: &str, _s: u64) -> anyhow::Result<String> {
                Ok(format!("https://fake.local/get/{}", k))
            }
            async fn presign_put(&self, k: &str, _ct: &str, _s: u64) -> anyhow::Result<String> {
                Ok(format!("https://fake.local/put/{}", k))
            }
        }

        #[derive(Clone)]
        struct FakeMailer;
        #[async_trait]
        impl Mailer for FakeMailer {
            async fn send(&self, _to: &str, _subject: &str, _html: &str) -> anyhow::Result<()> {
                Ok(())
            }
        }

        #[derive(Clone)]
        struct FakeGateway;
        #[async_trait]
        impl PaymentGateway for FakeGateway {
            async fn create_order(
                &self,
                amount: i64,
                currency: &str,
                receipt: &str,
            ) -> anyhow::Result<serde_json::Value> {
                Ok(json!({
                    "id": "order_fake001",
                    "amount": amount,
                    "currency": currency,
                    "receipt": receipt,
                    "status": "created",
                }))
            }
            async fn fetch_payment(&self, payment_id: &str) -> anyhow::Result<serde_json::Value> {
                Ok(json!({ "id": payment_id, "status": "captured" }))
            }
        }

        let config = Arc::new(AppConfig {
            env: "test".into(),
            aws: crate::config::AwsConfig {
                region: "us-east-1".into(),
                access_key_id: Some("test".into()),
                secret_access_key: Some("test".into()),
                s3_bucket: "fake".into(),
                s3_endpoint: None,
            },
            tables: crate::config::TableConfig {
                users: "Users".into(),
                forms: "JLPTForms".into(),
                payments: "Payments".into(),
                documents: "Documents".into(),
                global: "GlobalData".into(),
            },
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                expires_days: 30,
                reset_expires_secs: 3600,
            },
            email: crate::config::EmailConfig {
                relay_url: "http://fake.relay".into(),
                api_token: "test".into(),
                sender: "test@jlptreg.local".into(),
            },
            gateway: crate::config::GatewayConfig {
                key_id: "rzp_test_key".into(),
                key_secret: "rzp_test_secret".into(),
                base_url: "http://fake.gateway".into(),
            },
            client_url: "http://localhost:3000".into(),
            otp_expiry_minutes: 10,
        });

        Self {
            db: Db::fake(),
            config,
            storage: Arc::new(FakeStorage) as Arc<dyn StorageClient>,
            mailer: Arc::new(FakeMailer) as Arc<dyn Mailer>,
            gateway: Arc::new(FakeGateway) as Arc<dyn PaymentGateway>,
        }
    }
}
