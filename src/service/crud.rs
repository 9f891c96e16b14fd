//! Generic CRUD execution against MongoDB: one repository binds one entity
//! definition to one collection. Request bodies are validated against the
//! definition before any operation reaches the store.

use crate::error::{AppError, FieldViolation};
use crate::filter::Filter;
use crate::model::EntityDef;
use crate::service::RequestValidator;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use serde_json::{Map, Value};

/// Collection holding one id-sequence document per entity collection.
const COUNTERS_COLLECTION: &str = "_counters";

pub struct CrudRepository {
    entity: &'static EntityDef,
    collection: Collection<Document>,
    counters: Collection<Document>,
}

impl CrudRepository {
    pub fn new(db: &Database, entity: &'static EntityDef) -> Self {
        CrudRepository {
            entity,
            collection: db.collection(entity.collection),
            counters: db.collection(COUNTERS_COLLECTION),
        }
    }

    /// Persist a new record and return it including the assigned id.
    pub async fn create(&self, body: Map<String, Value>) -> Result<Value, AppError> {
        RequestValidator::validate_full(self.entity, &body)?;
        let mut record = to_document(&body)?;
        let id = self.next_id().await?;
        record.insert("_id", id);
        tracing::debug!(collection = %self.entity.collection, id, "insert");
        self.collection.insert_one(&record).await?;
        doc_to_json(self.entity, record)
    }

    /// All records matching the filter, in provider-native order unless the
    /// filter specifies one.
    pub async fn find(&self, filter: &Filter) -> Result<Vec<Value>, AppError> {
        let query = filter.query(self.entity)?;
        tracing::debug!(collection = %self.entity.collection, query = ?query, "find");
        let mut action = self.collection.find(query);
        if let Some(sort) = filter.sort(self.entity)? {
            action = action.sort(sort);
        }
        if let Some(projection) = filter.projection(self.entity) {
            action = action.projection(projection);
        }
        if let Some(limit) = filter.limit {
            action = action.limit(limit);
        }
        if let Some(skip) = filter.skip() {
            action = action.skip(skip);
        }
        let records: Vec<Document> = action.await?.try_collect().await?;
        records
            .into_iter()
            .map(|r| doc_to_json(self.entity, r))
            .collect()
    }

    /// One record by id. The filter's field selection applies; its
    /// where-clause does not (callers strip it).
    pub async fn find_by_id(&self, id: i64, filter: &Filter) -> Result<Value, AppError> {
        tracing::debug!(collection = %self.entity.collection, id, "find_one");
        let mut action = self.collection.find_one(doc! { "_id": id });
        if let Some(projection) = filter.projection(self.entity) {
            action = action.projection(projection);
        }
        let record = action.await?.ok_or_else(|| self.not_found(id))?;
        doc_to_json(self.entity, record)
    }

    /// Cardinality of the matching set.
    pub async fn count(&self, query: Document) -> Result<u64, AppError> {
        tracing::debug!(collection = %self.entity.collection, query = ?query, "count");
        Ok(self.collection.count_documents(query).await?)
    }

    /// Apply a partial update to every record matching the query (all records
    /// when the query is empty). Returns the number of records matched.
    /// An empty body mutates nothing and returns the matched count.
    pub async fn update_all(
        &self,
        body: Map<String, Value>,
        query: Document,
    ) -> Result<u64, AppError> {
        RequestValidator::validate_partial(self.entity, &body)?;
        if body.is_empty() {
            return self.count(query).await;
        }
        let set = to_document(&body)?;
        tracing::debug!(collection = %self.entity.collection, query = ?query, "update_many");
        let result = self
            .collection
            .update_many(query, doc! { "$set": set })
            .await?;
        Ok(result.matched_count)
    }

    /// Apply a partial update to one record by id.
    pub async fn update_by_id(&self, id: i64, body: Map<String, Value>) -> Result<(), AppError> {
        RequestValidator::validate_partial(self.entity, &body)?;
        if body.is_empty() {
            // Still a NotFoundError when the id is absent.
            return match self.collection.find_one(doc! { "_id": id }).await? {
                Some(_) => Ok(()),
                None => Err(self.not_found(id)),
            };
        }
        let set = to_document(&body)?;
        tracing::debug!(collection = %self.entity.collection, id, "update_one");
        let result = self
            .collection
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .await?;
        if result.matched_count == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    /// Replace one record by id. The body must carry every required field;
    /// an id in the body must equal the path id. The stored id is preserved.
    pub async fn replace_by_id(
        &self,
        id: i64,
        mut body: Map<String, Value>,
    ) -> Result<(), AppError> {
        if let Some(body_id) = body.get(self.entity.id_field) {
            if body_id.as_i64() == Some(id) {
                body.remove(self.entity.id_field);
            } else {
                return Err(AppError::validation(vec![FieldViolation {
                    field: self.entity.id_field.to_string(),
                    message: "does not match the path id".into(),
                }]));
            }
        }
        RequestValidator::validate_full(self.entity, &body)?;
        let replacement = to_document(&body)?;
        tracing::debug!(collection = %self.entity.collection, id, "replace_one");
        let result = self
            .collection
            .replace_one(doc! { "_id": id }, replacement)
            .await?;
        if result.matched_count == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    /// Delete one record by id.
    pub async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        tracing::debug!(collection = %self.entity.collection, id, "delete_one");
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    /// Atomically allocate the next id for this collection from its counter
    /// document. Ids start at 1 and are never reused.
    async fn next_id(&self) -> Result<i64, AppError> {
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": self.entity.collection },
                doc! { "$inc": { "seq": 1i64 } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| {
                AppError::Db(mongodb::error::Error::custom(format!(
                    "counter upsert for {} returned no document",
                    self.entity.collection
                )))
            })?;
        match counter.get("seq") {
            Some(Bson::Int64(n)) => Ok(*n),
            Some(Bson::Int32(n)) => Ok(i64::from(*n)),
            other => Err(AppError::Db(mongodb::error::Error::custom(format!(
                "counter for {} holds a non-integer seq: {:?}",
                self.entity.collection, other
            )))),
        }
    }

    fn not_found(&self, id: i64) -> AppError {
        AppError::NotFound(format!("{} with id {}", self.entity.name, id))
    }
}

/// Validated body map -> BSON document.
fn to_document(body: &Map<String, Value>) -> Result<Document, AppError> {
    let mut out = Document::new();
    for (name, value) in body {
        let bson = mongodb::bson::to_bson(value)
            .map_err(|e| AppError::BadRequest(format!("{}: unsupported value: {}", name, e)))?;
        out.insert(name.clone(), bson);
    }
    Ok(out)
}

/// Stored document -> API JSON, with `_id` surfaced under the entity's id
/// field name.
fn doc_to_json(entity: &EntityDef, mut record: Document) -> Result<Value, AppError> {
    let mut out = Map::new();
    if let Some(id) = record.remove("_id") {
        out.insert(entity.id_field.to_string(), bson_to_json(entity, id)?);
    }
    for (name, value) in record {
        let json = bson_to_json(entity, value)?;
        out.insert(name, json);
    }
    Ok(Value::Object(out))
}

fn bson_to_json(entity: &EntityDef, value: Bson) -> Result<Value, AppError> {
    serde_json::to_value(&value).map_err(|e| {
        AppError::Db(mongodb::error::Error::custom(format!(
            "{}: stored value is not representable as JSON: {}",
            entity.name, e
        )))
    })
}
