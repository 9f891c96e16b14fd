//! Structured query filter accepted on read operations: where-clause, field
//! selection, ordering, limit, skip. Parsed from a JSON query parameter and
//! translated to MongoDB query/sort/projection documents. Identifiers come
//! from the entity definition only; the id field is mapped to `_id`.

use crate::error::AppError;
use crate::model::EntityDef;
use mongodb::bson::{self, doc, Bson, Document};
use serde::Deserialize;
use serde_json::Value;

/// Filter accepted by `find` (and, without its where-clause, by `find_by_id`).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Filter {
    #[serde(default, rename = "where")]
    pub where_: Option<Value>,
    #[serde(default)]
    pub fields: Option<Fields>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub skip: Option<u64>,
    /// Alias for `skip`; `skip` wins when both are present.
    #[serde(default)]
    pub offset: Option<u64>,
}

/// Field selection: either a name -> bool map or a list of names to include.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Fields {
    Map(serde_json::Map<String, Value>),
    List(Vec<String>),
}

/// Ordering: a single "field ASC|DESC" clause or a list of them.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Order {
    One(String),
    Many(Vec<String>),
}

impl Filter {
    /// Parse the `filter` query parameter. Absent means no constraints.
    pub fn from_query(raw: Option<&str>) -> Result<Filter, AppError> {
        match raw {
            None => Ok(Filter::default()),
            Some(s) => serde_json::from_str(s)
                .map_err(|e| AppError::BadRequest(format!("invalid filter: {}", e))),
        }
    }

    /// MongoDB query document from the where-clause. Empty when absent.
    pub fn query(&self, entity: &EntityDef) -> Result<Document, AppError> {
        match &self.where_ {
            None => Ok(Document::new()),
            Some(w) => where_to_document(entity, w),
        }
    }

    /// MongoDB sort document from the order clause.
    pub fn sort(&self, entity: &EntityDef) -> Result<Option<Document>, AppError> {
        let clauses: Vec<&str> = match &self.order {
            None => return Ok(None),
            Some(Order::One(s)) => vec![s.as_str()],
            Some(Order::Many(v)) => v.iter().map(String::as_str).collect(),
        };
        let mut sort = Document::new();
        for clause in clauses {
            let mut parts = clause.split_whitespace();
            let field = parts
                .next()
                .ok_or_else(|| AppError::BadRequest("empty order clause".into()))?;
            let direction = match parts.next() {
                None => 1,
                Some(d) if d.eq_ignore_ascii_case("asc") => 1,
                Some(d) if d.eq_ignore_ascii_case("desc") => -1,
                Some(d) => {
                    return Err(AppError::BadRequest(format!(
                        "invalid order direction: {}",
                        d
                    )))
                }
            };
            sort.insert(stored_field(entity, field), direction);
        }
        Ok(Some(sort))
    }

    /// MongoDB projection document from the field selection.
    /// An inclusion list that leaves out the id suppresses `_id` explicitly,
    /// since MongoDB would otherwise always return it.
    pub fn projection(&self, entity: &EntityDef) -> Option<Document> {
        let fields = self.fields.as_ref()?;
        let mut included: Vec<String> = Vec::new();
        let mut excluded: Vec<String> = Vec::new();
        match fields {
            Fields::List(names) => {
                included = names.iter().map(|n| stored_field(entity, n)).collect();
            }
            Fields::Map(map) => {
                for (name, v) in map {
                    match v.as_bool() {
                        Some(true) => included.push(stored_field(entity, name)),
                        Some(false) => excluded.push(stored_field(entity, name)),
                        None => {}
                    }
                }
            }
        }
        let mut projection = Document::new();
        if !included.is_empty() {
            let has_id = included.iter().any(|f| f == "_id");
            for f in included {
                projection.insert(f, 1);
            }
            if !has_id {
                projection.insert("_id", 0);
            }
        } else {
            for f in excluded {
                projection.insert(f, 0);
            }
        }
        if projection.is_empty() {
            None
        } else {
            Some(projection)
        }
    }

    pub fn skip(&self) -> Option<u64> {
        self.skip.or(self.offset)
    }
}

/// Parse the standalone `where` query parameter (count, bulk update).
pub fn parse_where(
    entity: &EntityDef,
    raw: Option<&str>,
) -> Result<Document, AppError> {
    match raw {
        None => Ok(Document::new()),
        Some(s) => {
            let value: Value = serde_json::from_str(s)
                .map_err(|e| AppError::BadRequest(format!("invalid where: {}", e)))?;
            where_to_document(entity, &value)
        }
    }
}

/// Translate a where-clause into a MongoDB query document.
///
/// Supported condition operators: eq, neq, gt, gte, lt, lte, inq, nin,
/// between, like, nlike, exists. `and`/`or` take an array of clauses and
/// recurse. Anything else is passed through as a literal equality match.
pub fn where_to_document(entity: &EntityDef, where_: &Value) -> Result<Document, AppError> {
    let obj = where_
        .as_object()
        .ok_or_else(|| AppError::BadRequest("where must be a JSON object".into()))?;
    let mut query = Document::new();
    for (key, value) in obj {
        match key.as_str() {
            "and" | "or" => {
                let clauses = value
                    .as_array()
                    .ok_or_else(|| AppError::BadRequest(format!("{} must be an array", key)))?;
                let mut translated = Vec::with_capacity(clauses.len());
                for clause in clauses {
                    translated.push(Bson::Document(where_to_document(entity, clause)?));
                }
                query.insert(format!("${}", key), translated);
            }
            field => {
                let stored = stored_field(entity, field);
                query.insert(stored, condition_to_bson(field, value)?);
            }
        }
    }
    Ok(query)
}

/// Translate one field condition. A bare value is an equality match; an
/// object whose keys are all operators becomes the corresponding MongoDB
/// operator document.
fn condition_to_bson(field: &str, value: &Value) -> Result<Bson, AppError> {
    let obj = match value.as_object() {
        Some(obj) if !obj.is_empty() && obj.keys().all(|k| is_operator(k)) => obj,
        _ => return to_bson(field, value),
    };
    if let (1, Some(operand)) = (obj.len(), obj.get("eq")) {
        return to_bson(field, operand);
    }
    let mut cond = Document::new();
    for (op, operand) in obj {
        match op.as_str() {
            "eq" => cond.insert("$eq", to_bson(field, operand)?),
            "neq" => cond.insert("$ne", to_bson(field, operand)?),
            "gt" => cond.insert("$gt", to_bson(field, operand)?),
            "gte" => cond.insert("$gte", to_bson(field, operand)?),
            "lt" => cond.insert("$lt", to_bson(field, operand)?),
            "lte" => cond.insert("$lte", to_bson(field, operand)?),
            "inq" => cond.insert("$in", operand_array(field, op, operand)?),
            "nin" => cond.insert("$nin", operand_array(field, op, operand)?),
            "between" => {
                let bounds = operand_array(field, op, operand)?;
                if bounds.len() != 2 {
                    return Err(AppError::BadRequest(format!(
                        "{}: between requires exactly two bounds",
                        field
                    )));
                }
                cond.insert("$gte", bounds[0].clone());
                cond.insert("$lte", bounds[1].clone())
            }
            "like" => cond.insert("$regex", operand_string(field, op, operand)?),
            "nlike" => cond.insert(
                "$not",
                doc! { "$regex": operand_string(field, op, operand)? },
            ),
            "exists" => {
                let flag = operand.as_bool().ok_or_else(|| {
                    AppError::BadRequest(format!("{}: exists requires a boolean", field))
                })?;
                cond.insert("$exists", flag)
            }
            _ => unreachable!("checked by is_operator"),
        };
    }
    Ok(Bson::Document(cond))
}

fn is_operator(key: &str) -> bool {
    matches!(
        key,
        "eq" | "neq"
            | "gt"
            | "gte"
            | "lt"
            | "lte"
            | "inq"
            | "nin"
            | "between"
            | "like"
            | "nlike"
            | "exists"
    )
}

fn operand_array(field: &str, op: &str, value: &Value) -> Result<Vec<Bson>, AppError> {
    let arr = value
        .as_array()
        .ok_or_else(|| AppError::BadRequest(format!("{}: {} requires an array", field, op)))?;
    arr.iter().map(|v| to_bson(field, v)).collect()
}

fn operand_string(field: &str, op: &str, value: &Value) -> Result<String, AppError> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| AppError::BadRequest(format!("{}: {} requires a string", field, op)))
}

fn to_bson(field: &str, value: &Value) -> Result<Bson, AppError> {
    bson::to_bson(value)
        .map_err(|e| AppError::BadRequest(format!("{}: unsupported value: {}", field, e)))
}

/// API field name -> stored field name. The identity field lives in `_id`.
pub fn stored_field(entity: &EntityDef, field: &str) -> String {
    if field == entity.id_field {
        "_id".to_string()
    } else {
        field.to_string()
    }
}
