use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use schemars::{schema_for, Schema};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::api::collection::{CreateCollectionRequest, GetCollectionResponse, UpdateCollectionRequest};
use crate::api::Payload;
use crate::error::Result;
use crate::provider::context::Context;
use crate::provider::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportStateRequest, ImportStateResponse,
    ReadRequest, ReadResponse, State, UpdateRequest, UpdateResponse,
};
use crate::provider::traits::{import_state_passthrough_id, Resource, ResourceWithImportState};
use crate::reconcile::ids::ResourceIds;
use crate::resources::scope::scopes_path;
use crate::resources::utils::{configured, delete, get, remove_if_not_found, send};
use crate::schema::collection::{Collection, COLLECTION_NAME};
use crate::schema::scope::SCOPE_NAME;

#[derive(Default)]
pub struct CollectionResource {
    ctx: Option<Arc<Context>>,
}

fn collections_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!("{}/{}/collections", scopes_path(ids)?, ids.value(SCOPE_NAME)?))
}

fn collection_path(ids: &ResourceIds) -> Result<String> {
    Ok(format!("{}/{}", collections_path(ids)?, ids.value(COLLECTION_NAME)?))
}

async fn refresh(ctx: &Context, cancel: &CancellationToken, ids: &ResourceIds) -> Result<Collection> {
    let collection: GetCollectionResponse = get(ctx, cancel, &collection_path(ids)?).await?.json()?;
    Collection::from_response(collection, ids)
}

#[async_trait]
impl Resource for CollectionResource {
    fn type_suffix(&self) -> &'static str {
        "collection"
    }

    fn schema(&self) -> Schema {
        schema_for!(Collection)
    }

    fn configure(&mut self, ctx: Arc<Context>) {
        self.ctx = Some(ctx);
    }

    async fn create(&self, req: &CreateRequest, resp: &mut CreateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Collection = req.plan.get()?;
        let ids = plan.ids()?;

        let body = CreateCollectionRequest {
            name: ids.value(COLLECTION_NAME)?.to_string(),
            max_ttl: plan.max_ttl,
        };
        send(
            ctx,
            &req.cancel,
            Method::POST,
            &collections_path(&ids)?,
            StatusCode::CREATED,
            Payload::json(&body)?,
            &[],
        )
        .await?;

        let collection = refresh(ctx, &req.cancel, &ids).await?;
        resp.state.set(&collection)
    }

    async fn read(&self, req: &ReadRequest, resp: &mut ReadResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Collection = req.state.get()?;
        let ids = state.ids()?;

        if let Some(collection) = remove_if_not_found(refresh(ctx, &req.cancel, &ids).await, resp)? {
            resp.state.set(&collection)?;
        }
        Ok(())
    }

    async fn update(&self, req: &UpdateRequest, resp: &mut UpdateResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let plan: Collection = req.plan.get()?;
        let state: Collection = req.state.get()?;
        let ids = state.ids()?;

        // Only the TTL is mutable, every other attribute forces replacement.
        let body = UpdateCollectionRequest { max_ttl: plan.max_ttl.unwrap_or_default() };
        send(
            ctx,
            &req.cancel,
            Method::PUT,
            &collection_path(&ids)?,
            StatusCode::NO_CONTENT,
            Payload::json(&body)?,
            &[],
        )
        .await?;

        let collection = refresh(ctx, &req.cancel, &ids).await?;
        resp.state.set(&collection)
    }

    async fn delete(&self, req: &DeleteRequest, _resp: &mut DeleteResponse) -> Result<()> {
        let ctx = configured(&self.ctx)?;
        let state: Collection = req.state.get()?;
        let ids = state.ids()?;

        delete(ctx, &req.cancel, &collection_path(&ids)?, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for CollectionResource {
    async fn import_state(&self, req: &ImportStateRequest, resp: &mut ImportStateResponse) -> Result<()> {
        import_state_passthrough_id(COLLECTION_NAME, req, resp)
    }

    fn identifiers(&self, state: &State) -> Result<ResourceIds> {
        state.get::<Collection>()?.ids()
    }
}
