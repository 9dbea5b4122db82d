//! Admin user and default site seeding for the back tier
//!
//! Rows are inserted directly into the application's MySQL database inside
//! one transaction: the operator account, its admin role link and the
//! default site tenant.

use crate::credentials::{DatabaseCredentials, LOCAL_SOCKET_PATH};
use crate::error::{InstallerError, Result};
use async_trait::async_trait;
use bcrypt::{Version, DEFAULT_COST};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use std::sync::Mutex;

/// Length of the generated admin password
pub const PASSWORD_LENGTH: usize = 8;

/// Role id of the administrator role created by the users module
pub const ADMIN_ROLE_ID: u64 = 1;

const COUNTRY_ID: u32 = 239;
const VAT_RATE: f64 = 20.0;

/// Seeded operator account; `password` is the plain text shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Default site tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    pub name: String,
    pub email: String,
    pub front_end_url: String,
    pub front_end_folder: String,
}

/// Everything inserted for one back tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRequest {
    pub admin: AdminUser,
    pub site: SiteRecord,
}

/// Writes the seed rows for a freshly provisioned back tier
#[async_trait]
pub trait Seeder: Send + Sync {
    async fn seed(&self, db: &DatabaseCredentials, request: &SeedRequest) -> Result<()>;
}

/// Random alphanumeric password for the admin account
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Upper-case the first letter of every space-separated word
pub fn title_case(raw: &str) -> String {
    raw.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `$2y$` bcrypt hash, the format PHP's hasher verifies against
pub fn hash_password(password: &str) -> Result<String> {
    let hashed = bcrypt::hash_with_result(password, DEFAULT_COST)
        .map_err(|e| InstallerError::Database(sqlx::Error::Encode(Box::new(e))))?;
    Ok(hashed.format_for_version(Version::TwoY))
}

/// Connection options for the captured credentials
pub fn connect_options(db: &DatabaseCredentials) -> MySqlConnectOptions {
    let options = MySqlConnectOptions::new()
        .username(&db.user)
        .password(&db.password)
        .database(&db.name)
        .charset("utf8");

    if db.using_local_socket {
        options.socket(LOCAL_SOCKET_PATH)
    } else {
        options.host(&db.host).port(db.port)
    }
}

/// Seeder backed by a live MySQL connection
#[derive(Debug, Clone, Default)]
pub struct MySqlSeeder;

impl MySqlSeeder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Seeder for MySqlSeeder {
    async fn seed(&self, db: &DatabaseCredentials, request: &SeedRequest) -> Result<()> {
        let hashed = hash_password(&request.admin.password)?;

        tracing::info!(host = %db.host, database = %db.name, "connecting to application database");
        let mut conn = MySqlConnection::connect_with(&connect_options(db)).await?;
        let mut tx = conn.begin().await?;

        let user = sqlx::query(
            "INSERT INTO users (email, password, name, active, media_id, created_at, updated_at) \
             VALUES (?, ?, ?, 1, 0, NOW(), NOW())",
        )
        .bind(&request.admin.email)
        .bind(&hashed)
        .bind(&request.admin.name)
        .execute(&mut *tx)
        .await?;
        let user_id = user.last_insert_id();
        tracing::debug!(user_id, "admin user created");

        sqlx::query(
            "INSERT INTO role_user (role_id, user_id, created_at, updated_at) \
             VALUES (?, ?, NOW(), NOW())",
        )
        .bind(ADMIN_ROLE_ID)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let site = &request.site;
        sqlx::query(
            "INSERT INTO sites (name, `default`, meta_title, meta_description, country_id, email, \
             order_notifcation_email, emails_from, emails_from_name, vat_rate, price_storage_type, \
             display_prices_for, terms_conditions_version, front_end_url, front_end_folder, \
             created_at, updated_at) \
             VALUES (?, 1, ?, ?, ?, ?, ?, ?, ?, ?, 1, 1, 1.0, ?, ?, NOW(), NOW())",
        )
        .bind(&site.name)
        .bind(&site.name)
        .bind(&site.name)
        .bind(COUNTRY_ID)
        .bind(&site.email)
        .bind(&site.email)
        .bind(&site.email)
        .bind(&site.name)
        .bind(VAT_RATE)
        .bind(&site.front_end_url)
        .bind(&site.front_end_folder)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(site = %site.name, "default site created");
        Ok(())
    }
}

/// Seeder that keeps requests in memory instead of touching a database
#[derive(Debug, Default)]
pub struct RecordingSeeder {
    requests: Mutex<Vec<SeedRequest>>,
}

impl RecordingSeeder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<SeedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Seeder for RecordingSeeder {
    async fn seed(&self, _db: &DatabaseCredentials, request: &SeedRequest) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("acme shop"), "Acme Shop");
        assert_eq!(title_case("Acme  shop"), "Acme  Shop");
        assert_eq!(title_case("mcDonald"), "McDonald");
    }

    #[test]
    fn test_generated_password() {
        let password = generate_password();
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_hash_uses_php_prefix() {
        let hashed = hash_password("s3cret").unwrap();
        assert!(hashed.starts_with("$2y$"));
        assert!(bcrypt::verify("s3cret", &hashed).unwrap());
    }

    #[tokio::test]
    async fn test_recording_seeder() {
        let seeder = RecordingSeeder::new();
        let db = DatabaseCredentials {
            host: "127.0.0.1".to_string(),
            port: 3306,
            name: "acme".to_string(),
            user: "root".to_string(),
            password: "secret".to_string(),
            using_local_socket: false,
        };
        let request = SeedRequest {
            admin: AdminUser {
                name: "Purpose Media".to_string(),
                email: "ops@acme.test".to_string(),
                password: generate_password(),
            },
            site: SiteRecord {
                name: "Acme Shop".to_string(),
                email: "ops@acme.test".to_string(),
                front_end_url: "http://front.acme-shop.localhost".to_string(),
                front_end_folder: "acme-shop-front".to_string(),
            },
        };

        seeder.seed(&db, &request).await.unwrap();
        assert_eq!(seeder.requests(), vec![request]);
    }
}
