use crate::constants::api::{DEFAULT_USER_COLLECTION, GLOBALS_SEGMENT};
use crate::errors::PayloadError;
use crate::schema::Where;
use crate::services::credentials::CredentialBundle;
use crate::services::transport::HttpRequest;
use crate::services::validation::Validation;
use crate::utils::suggest::unknown_name_error;
use reqwest::Method;
use serde_json::{Map, Value};
use std::str::FromStr;

macro_rules! named_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = PayloadError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let raw = raw.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == raw)
                    .ok_or_else(|| {
                        let known: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        unknown_name_error($kind, raw, &known)
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum!(Resource, "resource", {
    Collection => "collection",
    Global => "global",
    Auth => "auth",
});

named_enum!(CollectionOperation, "collection operation", {
    Find => "find",
    FindById => "findById",
    Create => "create",
    Update => "update",
    UpdateById => "updateById",
    Delete => "delete",
    DeleteById => "deleteById",
    Count => "count",
});

named_enum!(GlobalOperation, "global operation", {
    Get => "get",
    Update => "update",
});

named_enum!(AuthOperation, "auth operation", {
    Login => "login",
    Logout => "logout",
    Me => "me",
    Refresh => "refresh",
    ForgotPassword => "forgotPassword",
    ResetPassword => "resetPassword",
    Verify => "verify",
    Unlock => "unlock",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Collection(CollectionOperation),
    Global(GlobalOperation),
    Auth(AuthOperation),
}

impl Operation {
    /// Parses `raw` within `resource`; a missing operation takes the resource default.
    pub fn parse(resource: Resource, raw: Option<&str>) -> Result<Self, PayloadError> {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty());
        Ok(match resource {
            Resource::Collection => Operation::Collection(
                raw.map(str::parse::<CollectionOperation>)
                    .transpose()?
                    .unwrap_or(CollectionOperation::Find),
            ),
            Resource::Global => Operation::Global(
                raw.map(str::parse::<GlobalOperation>)
                    .transpose()?
                    .unwrap_or(GlobalOperation::Get),
            ),
            Resource::Auth => Operation::Auth(
                raw.map(str::parse::<AuthOperation>)
                    .transpose()?
                    .unwrap_or(AuthOperation::Login),
            ),
        })
    }

    pub fn resource(self) -> Resource {
        match self {
            Operation::Collection(_) => Resource::Collection,
            Operation::Global(_) => Resource::Global,
            Operation::Auth(_) => Resource::Auth,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Collection(op) => op.as_str(),
            Operation::Global(op) => op.as_str(),
            Operation::Auth(op) => op.as_str(),
        }
    }

    pub fn is_bulk_delete(self) -> bool {
        self == Operation::Collection(CollectionOperation::Delete)
    }
}

/// `additionalOptions`: all optional, only set keys reach the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub depth: Option<i64>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub sort: Option<String>,
    pub where_clause: Option<Where>,
    pub select: Option<String>,
    pub locale: Option<String>,
}

impl QueryOptions {
    pub fn from_value(value: Option<&Value>) -> Result<Self, PayloadError> {
        let validation = Validation::new();
        let obj = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Object(obj)) => obj,
            Some(_) => {
                return Err(PayloadError::invalid_params(
                    "additionalOptions must be an object",
                ))
            }
        };
        Ok(Self {
            depth: validation.ensure_optional_int(obj.get("depth"), "depth")?,
            limit: validation.ensure_optional_int(obj.get("limit"), "limit")?,
            page: validation.ensure_optional_int(obj.get("page"), "page")?,
            sort: validation.ensure_optional_string(obj.get("sort"), "sort")?,
            where_clause: match obj.get("where") {
                Some(raw) => Where::from_input(raw)?,
                None => None,
            },
            select: select_list(obj.get("select"))?,
            locale: validation.ensure_optional_string(obj.get("locale"), "locale")?,
        })
    }

    /// Query pairs in a fixed order; `include_where` is false when the filter travels
    /// in the body instead.
    pub fn query_pairs(&self, include_where: bool) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: String| pairs.push((key.to_string(), value));
        if let Some(depth) = self.depth {
            push("depth", depth.to_string());
        }
        if let Some(limit) = self.limit {
            push("limit", limit.to_string());
        }
        if let Some(page) = self.page {
            push("page", page.to_string());
        }
        if let Some(sort) = &self.sort {
            push("sort", sort.clone());
        }
        if include_where {
            if let Some(clause) = &self.where_clause {
                push("where", clause.to_json_string());
            }
        }
        if let Some(select) = &self.select {
            push("select", select.clone());
        }
        if let Some(locale) = &self.locale {
            push("locale", locale.clone());
        }
        pairs
    }
}

fn select_list(value: Option<&Value>) -> Result<Option<String>, PayloadError> {
    let names: Vec<String> = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| PayloadError::invalid_params("select entries must be strings"))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect(),
        Some(_) => {
            return Err(PayloadError::invalid_params(
                "select must be a comma-separated string or an array of field names",
            ))
        }
    };
    Ok(if names.is_empty() {
        None
    } else {
        Some(names.join(","))
    })
}

/// Parameters of one work item, as named by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemParams {
    pub operation: Operation,
    pub collection: Option<String>,
    pub global: Option<String>,
    pub auth_collection: Option<String>,
    pub document_id: Option<String>,
    pub data: Option<Value>,
    pub options: QueryOptions,
    pub email: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub new_password: Option<String>,
}

impl ItemParams {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            collection: None,
            global: None,
            auth_collection: None,
            document_id: None,
            data: None,
            options: QueryOptions::default(),
            email: None,
            password: None,
            token: None,
            new_password: None,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let validation = Validation::new();
        let empty = Map::new();
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Null => &empty,
            _ => return Err(PayloadError::invalid_params("item parameters must be an object")),
        };
        let text = |key: &str| validation.ensure_optional_string(obj.get(key), key);

        let resource = match text("resource")? {
            Some(raw) => raw.parse::<Resource>()?,
            None => Resource::Collection,
        };
        let operation = Operation::parse(resource, text("operation")?.as_deref())?;

        Ok(Self {
            operation,
            collection: text("collection")?,
            global: text("global")?,
            auth_collection: text("authCollection")?,
            document_id: text("documentId")?,
            data: match obj.get("data") {
                None | Some(Value::Null) => None,
                Some(Value::String(text)) if text.trim().is_empty() => None,
                Some(raw) => Some(validation.ensure_json(raw, "data")?),
            },
            options: QueryOptions::from_value(obj.get("additionalOptions"))?,
            email: text("email")?,
            password: text("password")?,
            token: text("token")?,
            new_password: text("newPassword")?,
        })
    }

    pub fn with_collection(mut self, slug: &str) -> Self {
        self.collection = Some(slug.to_string());
        self
    }

    pub fn with_global(mut self, slug: &str) -> Self {
        self.global = Some(slug.to_string());
        self
    }

    pub fn with_document_id(mut self, id: &str) -> Self {
        self.document_id = Some(id.to_string());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }
}

/// Maps an item onto a method, path, query and body. No I/O; the caller attaches
/// credentials and dispatches.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    validation: Validation,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &self,
        bundle: &CredentialBundle,
        params: &ItemParams,
    ) -> Result<HttpRequest, PayloadError> {
        let mut body = None;
        let mut where_in_query = true;

        let (method, path) = match params.operation {
            Operation::Collection(op) => {
                let collection = self.required_slug(params.collection.as_deref(), "collection")?;
                let c = collection.as_str();
                match op {
                    CollectionOperation::Find => (Method::GET, bundle.api_path(&[c])),
                    CollectionOperation::FindById => {
                        let id = self.document_id(params)?;
                        (Method::GET, bundle.api_path(&[c, id.as_str()]))
                    }
                    CollectionOperation::Create => {
                        body = Some(self.required_data(params)?);
                        (Method::POST, bundle.api_path(&[c]))
                    }
                    CollectionOperation::Update => {
                        body = Some(self.required_data(params)?);
                        (Method::PATCH, bundle.api_path(&[c]))
                    }
                    CollectionOperation::UpdateById => {
                        let id = self.document_id(params)?;
                        body = Some(self.required_data(params)?);
                        (Method::PATCH, bundle.api_path(&[c, id.as_str()]))
                    }
                    CollectionOperation::Delete => {
                        where_in_query = false;
                        body = params
                            .options
                            .where_clause
                            .as_ref()
                            .map(|clause| serde_json::json!({ "where": clause.to_value() }));
                        (Method::DELETE, bundle.api_path(&[c]))
                    }
                    CollectionOperation::DeleteById => {
                        let id = self.document_id(params)?;
                        (Method::DELETE, bundle.api_path(&[c, id.as_str()]))
                    }
                    CollectionOperation::Count => (Method::GET, bundle.api_path(&[c, "count"])),
                }
            }
            Operation::Global(op) => {
                let global = self.required_slug(params.global.as_deref(), "global")?;
                let path = bundle.api_path(&[GLOBALS_SEGMENT, global.as_str()]);
                match op {
                    GlobalOperation::Get => (Method::GET, path),
                    GlobalOperation::Update => {
                        body = Some(self.required_data(params)?);
                        (Method::POST, path)
                    }
                }
            }
            Operation::Auth(op) => {
                let collection = self.required_slug(
                    Some(
                        params
                            .auth_collection
                            .as_deref()
                            .unwrap_or(DEFAULT_USER_COLLECTION),
                    ),
                    "authCollection",
                )?;
                let c = collection.as_str();
                match op {
                    AuthOperation::Login => {
                        body = Some(serde_json::json!({
                            "email": required(params.email.as_deref(), "email")?,
                            "password": required(params.password.as_deref(), "password")?,
                        }));
                        (Method::POST, bundle.api_path(&[c, "login"]))
                    }
                    AuthOperation::Logout => (Method::POST, bundle.api_path(&[c, "logout"])),
                    AuthOperation::Me => (Method::GET, bundle.api_path(&[c, "me"])),
                    AuthOperation::Refresh => {
                        (Method::POST, bundle.api_path(&[c, "refresh-token"]))
                    }
                    AuthOperation::ForgotPassword => {
                        body = Some(serde_json::json!({
                            "email": required(params.email.as_deref(), "email")?,
                        }));
                        (Method::POST, bundle.api_path(&[c, "forgot-password"]))
                    }
                    AuthOperation::ResetPassword => {
                        body = Some(serde_json::json!({
                            "token": required(params.token.as_deref(), "token")?,
                            "password": required(params.new_password.as_deref(), "newPassword")?,
                        }));
                        (Method::POST, bundle.api_path(&[c, "reset-password"]))
                    }
                    AuthOperation::Verify => {
                        let token = required(params.token.as_deref(), "token")?;
                        (Method::POST, bundle.api_path(&[c, "verify", token]))
                    }
                    AuthOperation::Unlock => {
                        body = Some(serde_json::json!({
                            "email": required(params.email.as_deref(), "email")?,
                        }));
                        (Method::POST, bundle.api_path(&[c, "unlock"]))
                    }
                }
            }
        };

        let mut request = HttpRequest::new(method, bundle.base_url(), &path);
        request.query = params.options.query_pairs(where_in_query);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        Ok(request)
    }

    fn required_slug(&self, value: Option<&str>, label: &str) -> Result<String, PayloadError> {
        let raw = required(value, label)?;
        self.validation.ensure_slug(raw, label)
    }

    fn document_id(&self, params: &ItemParams) -> Result<String, PayloadError> {
        required(params.document_id.as_deref(), "documentId").map(|id| id.trim().to_string())
    }

    fn required_data(&self, params: &ItemParams) -> Result<Value, PayloadError> {
        let data = params.data.as_ref().ok_or_else(|| {
            PayloadError::invalid_params(format!(
                "data is required for {} {}",
                params.operation.resource(),
                params.operation.as_str()
            ))
        })?;
        self.validation.ensure_json(data, "data")
    }
}

fn required<'a>(value: Option<&'a str>, label: &str) -> Result<&'a str, PayloadError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PayloadError::invalid_params(format!("{} is required", label)))
}
