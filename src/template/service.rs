//! Template administration on top of a [`TemplateStore`].

use std::sync::Arc;

use crate::clock::Clock;
use crate::notification::EngineResult;
use crate::store::{StoreError, TemplateStore};

use super::types::{
    CreateTemplateRequest, Template, TemplateError, TemplateListResponse, UpdateTemplateRequest,
};

pub struct TemplateService {
    store: Arc<dyn TemplateStore>,
    clock: Arc<dyn Clock>,
}

/// Duplicate names surface as `AlreadyExists`
fn name_conflict(err: StoreError, name: &str) -> crate::notification::EngineError {
    match err {
        StoreError::Conflict(_) => TemplateError::AlreadyExists(name.to_string()).into(),
        other => other.into(),
    }
}

impl TemplateService {
    pub fn new(store: Arc<dyn TemplateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[tracing::instrument(name = "templates.create", skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateTemplateRequest) -> EngineResult<Template> {
        let template = request.into_template(self.clock.now());
        template.validate()?;

        let name = template.name.clone();
        let created = self
            .store
            .create(template)
            .await
            .map_err(|e| name_conflict(e, &name))?;

        tracing::info!(template_id = created.id, "Template created");
        Ok(created)
    }

    pub async fn list(&self) -> EngineResult<TemplateListResponse> {
        let templates = self.store.list().await?;
        let total = templates.len();
        Ok(TemplateListResponse { templates, total })
    }

    pub async fn get(&self, id: i64) -> EngineResult<Template> {
        Ok(self
            .store
            .get(id)
            .await?
            .ok_or(TemplateError::NotFound(id))?)
    }

    #[tracing::instrument(name = "templates.update", skip(self, request))]
    pub async fn update(&self, id: i64, request: UpdateTemplateRequest) -> EngineResult<Template> {
        let mut template = self.get(id).await?;
        request.apply(&mut template, self.clock.now())?;

        let name = template.name.clone();
        Ok(self
            .store
            .update(template)
            .await
            .map_err(|e| name_conflict(e, &name))?
            .ok_or(TemplateError::NotFound(id))?)
    }

    #[tracing::instrument(name = "templates.delete", skip(self))]
    pub async fn delete(&self, id: i64) -> EngineResult<()> {
        if self.store.soft_delete(id, self.clock.now()).await? {
            tracing::info!(template_id = id, "Template deleted");
            Ok(())
        } else {
            Err(TemplateError::NotFound(id).into())
        }
    }
}
