use std::env;

use anyhow::{anyhow, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use drawing_register::config::AppConfig;
use drawing_register::db::{self, PgPool};
use drawing_register::models::NewProject;
use drawing_register::routes;
use drawing_register::state::AppState;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const ACTOR: &str = "drafter-01";
const FORWARDED_FOR: &str = "10.1.2.3";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// Builds the app against `TEST_DATABASE_URL`, or returns `None` when
    /// no test database is configured.
    pub async fn new() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database flow test");
            return Ok(None);
        };

        let config = AppConfig {
            database_url,
            database_max_pool_size: 8,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origin: None,
            access_log_limit: 5,
            run_migrations: true,
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let state = AppState::new(pool, config);
        let router = routes::create_router(state.clone());

        Ok(Some(Self { state, router }))
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(|conn| truncate_all(conn)).await
    }

    pub async fn insert_project(&self, code: &str) -> Result<Uuid> {
        let code = code.to_string();
        self.with_conn(move |conn| {
            let project = NewProject {
                id: Uuid::new_v4(),
                name: format!("Project {code}"),
                code,
            };
            diesel::insert_into(drawing_register::schema::projects::table)
                .values(&project)
                .execute(conn)
                .context("failed to insert project")?;
            Ok(project.id)
        })
        .await
    }

    pub async fn count_rows(&self, table: &'static str) -> Result<i64> {
        #[derive(QueryableByName)]
        struct Count {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            count: i64,
        }
        self.with_conn(move |conn| {
            let row: Count = diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {table}"))
                .get_result(conn)
                .with_context(|| format!("failed to count {table}"))?;
            Ok(row.count)
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        actor: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::POST, path, Body::from(body), actor).await
    }

    #[allow(dead_code)]
    pub async fn post_json_forwarded_for<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        actor: &str,
        forwarded_for: &str,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send_from(Method::POST, path, Body::from(body), Some(actor), forwarded_for)
            .await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        actor: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        self.send(Method::PATCH, path, Body::from(body), actor).await
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str, actor: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::POST, path, Body::empty(), actor).await
    }

    pub async fn get(&self, path: &str, actor: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::GET, path, Body::empty(), actor).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, actor: Option<&str>) -> Result<hyper::Response<Body>> {
        self.send(Method::DELETE, path, Body::empty(), actor).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Body,
        actor: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_from(method, path, body, actor, FORWARDED_FOR).await
    }

    async fn send_from(
        &self,
        method: Method,
        path: &str,
        body: Body,
        actor: Option<&str>,
        forwarded_for: &str,
    ) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .header("user-agent", "register-tests/1.0")
            .header("x-forwarded-for", forwarded_for);
        if let Some(actor) = actor {
            builder = builder.header("x-actor-id", actor);
        }
        let request = builder.body(body)?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Reads a JSON response body, panicking with the raw body when it does not
/// parse so failing assertions show what the server returned.
pub async fn read_json<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let status = response.status();
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).with_context(|| {
        format!(
            "unexpected body for status {status}: {}",
            String::from_utf8_lossy(&body)
        )
    })
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        db::run_migrations(&pool)?;
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE drawing_access_log, drawing_comments, transmittal_items, transmittals, \
         drawing_revisions, drawings, number_sequences, projects RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
