use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationFilter, ApplicationRow, ApplicationUpdate, NewApplication,
};

/// Persistence for application records. Each workflow transition touches a
/// single row; concurrent writers are last-writer-wins.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn create(&self, new: NewApplication) -> Result<Application>;

    async fn find(&self, filter: &ApplicationFilter) -> Result<Option<Application>>;

    /// Fails with `NotFound` when no row has `id`.
    async fn update(&self, id: Uuid, update: ApplicationUpdate) -> Result<()>;
}

#[derive(Clone)]
pub struct PgApplicationStore {
    pool: PgPool,
}

impl PgApplicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for PgApplicationStore {
    async fn create(&self, new: NewApplication) -> Result<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications (id, recruit_id, recruiter_id, handle, validation_code, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.recruit_id)
        .bind(&new.recruiter_id)
        .bind(&new.handle)
        .bind(&new.validation_code)
        .bind(new.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find(&self, filter: &ApplicationFilter) -> Result<Option<Application>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM applications WHERE id = ");
        qb.push_bind(filter.id);
        if let Some(recruit_id) = &filter.recruit_id {
            qb.push(" AND recruit_id = ").push_bind(recruit_id.clone());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" LIMIT 1");

        let row = qb
            .build_query_as::<ApplicationRow>()
            .fetch_optional(&self.pool)
            .await?;

        row.map(Application::try_from).transpose()
    }

    async fn update(&self, id: Uuid, update: ApplicationUpdate) -> Result<()> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE applications SET updated_at = NOW()");
        if let Some(status) = update.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        if let Some(recruiter_id) = update.recruiter_id {
            qb.push(", recruiter_id = ").push_bind(recruiter_id);
        }
        if let Some(profile) = update.profile {
            qb.push(", real_name = ").push_bind(profile.real_name);
            qb.push(", title = ").push_bind(profile.title);
            qb.push(", org_name = ").push_bind(profile.org_name);
            qb.push(", org_sid = ").push_bind(profile.org_sid);
            qb.push(", org_rank = ").push_bind(profile.org_rank);
            qb.push(", enlisted_date = ").push_bind(profile.enlisted_date);
            qb.push(", location = ").push_bind(profile.location);
            qb.push(", fluency = ").push_bind(profile.fluency);
            qb.push(", profile_image_url = ").push_bind(profile.profile_image_url);
            qb.push(", org_logo_url = ").push_bind(profile.org_logo_url);
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("application {}", id)));
        }
        Ok(())
    }
}

/// Process-local store; state is lost on restart.
#[derive(Default)]
pub struct InMemoryApplicationStore {
    applications: RwLock<HashMap<Uuid, Application>>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<Application> {
        self.applications.read().await.get(&id).cloned()
    }

    pub async fn is_empty(&self) -> bool {
        self.applications.read().await.is_empty()
    }
}

#[async_trait]
impl ApplicationStore for InMemoryApplicationStore {
    async fn create(&self, new: NewApplication) -> Result<Application> {
        let now = chrono::Utc::now();
        let application = Application {
            id: Uuid::new_v4(),
            recruit_id: Some(new.recruit_id),
            recruiter_id: new.recruiter_id,
            handle: new.handle,
            validation_code: new.validation_code,
            status: new.status,
            profile: Default::default(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.applications
            .write()
            .await
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn find(&self, filter: &ApplicationFilter) -> Result<Option<Application>> {
        let applications = self.applications.read().await;
        Ok(applications
            .get(&filter.id)
            .filter(|app| filter.matches(app))
            .cloned())
    }

    async fn update(&self, id: Uuid, update: ApplicationUpdate) -> Result<()> {
        let mut applications = self.applications.write().await;
        let application = applications
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("application {}", id)))?;
        update.apply_to(application);
        application.updated_at = Some(chrono::Utc::now());
        Ok(())
    }
}
