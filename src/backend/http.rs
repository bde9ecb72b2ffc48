use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::dto::orders::{NewOrder, OrderFilters};
use crate::error::{AppError, AppResult};
use crate::models::{CartLine, CartOwner, Order, Product, Session, User};
use crate::session::SessionHandle;

use super::Backend;

/// Client for a Supabase-style hosted backend: PostgREST rows under
/// `/rest/v1`, GoTrue auth under `/auth/v1`. Table requests carry the
/// session's access token when one exists, the anon key otherwise.
pub struct HttpBackend {
    http: Client,
    base_url: String,
    anon_key: String,
    session: SessionHandle,
}

impl HttpBackend {
    pub fn new(base_url: &str, anon_key: &str, session: SessionHandle) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session,
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn send(&self, builder: RequestBuilder) -> AppResult<Response> {
        let bearer = self
            .session
            .access_token()
            .await
            .unwrap_or_else(|| self.anon_key.clone());
        self.send_as(builder, &bearer).await
    }

    async fn send_as(&self, builder: RequestBuilder, bearer: &str) -> AppResult<Response> {
        let response = builder
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .send()
            .await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = error_message(response).await;
    Err(match status.as_u16() {
        400 | 422 => AppError::Validation(message),
        401 => AppError::Unauthorized,
        403 => AppError::Forbidden,
        404 | 406 => AppError::NotFound,
        _ => AppError::Internal(anyhow!("backend returned {status}: {message}")),
    })
}

/// The hosted services spell their error text differently; take whichever
/// field is present.
async fn error_message(response: Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        msg: Option<String>,
        error_description: Option<String>,
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => body
            .message
            .or(body.msg)
            .or(body.error_description)
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

#[derive(Deserialize)]
struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    #[serde(default)]
    products: Option<Product>,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            id: row.id,
            owner: CartOwner::User(row.user_id),
            product_id: row.product_id,
            product: row.products,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct AuthUserPayload {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: serde_json::Value,
}

impl From<AuthUserPayload> for User {
    fn from(payload: AuthUserPayload) -> Self {
        let name = payload
            .user_metadata
            .get("name")
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();
        User {
            id: payload.id,
            email: payload.email.unwrap_or_default(),
            name,
            created_at: payload.created_at,
            updated_at: payload.updated_at,
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_products(&self) -> AppResult<Vec<Product>> {
        let response = self
            .send(
                self.http
                    .get(self.rest_url("products"))
                    .query(&[("select", "*"), ("order", "created_at.desc")]),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let filter = format!("eq.{id}");
        let response = self
            .send(
                self.http
                    .get(self.rest_url("products"))
                    .query(&[("select", "*"), ("id", filter.as_str()), ("limit", "1")]),
            )
            .await?;
        let mut rows: Vec<Product> = response.json().await?;
        Ok(rows.pop())
    }

    async fn search_products(&self, query: &str) -> AppResult<Vec<Product>> {
        let pattern = format!("ilike.*{query}*");
        let response = self
            .send(self.http.get(self.rest_url("products")).query(&[
                ("select", "*"),
                ("name", pattern.as_str()),
                ("order", "created_at.desc"),
            ]))
            .await?;
        Ok(response.json().await?)
    }

    async fn products_by_category(&self, category: &str) -> AppResult<Vec<Product>> {
        let filter = format!("eq.{category}");
        let response = self
            .send(self.http.get(self.rest_url("products")).query(&[
                ("select", "*"),
                ("category", filter.as_str()),
                ("order", "created_at.desc"),
            ]))
            .await?;
        Ok(response.json().await?)
    }

    async fn product_categories(&self) -> AppResult<Vec<String>> {
        #[derive(Deserialize)]
        struct CategoryRow {
            category: String,
        }
        let response = self
            .send(
                self.http
                    .get(self.rest_url("products"))
                    .query(&[("select", "category"), ("order", "category.asc")]),
            )
            .await?;
        let rows: Vec<CategoryRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| row.category).collect())
    }

    async fn cart_lines(&self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        let filter = format!("eq.{user_id}");
        let response = self
            .send(
                self.http
                    .get(self.rest_url("cart_items"))
                    .query(&[("select", "*,products(*)"), ("user_id", filter.as_str())]),
            )
            .await?;
        let rows: Vec<CartLineRow> = response.json().await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn find_cart_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<Option<CartLine>> {
        let user_filter = format!("eq.{user_id}");
        let product_filter = format!("eq.{product_id}");
        let response = self
            .send(self.http.get(self.rest_url("cart_items")).query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("product_id", product_filter.as_str()),
                ("limit", "1"),
            ]))
            .await?;
        let mut rows: Vec<CartLineRow> = response.json().await?;
        Ok(rows.pop().map(CartLine::from))
    }

    async fn insert_cart_line(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<()> {
        self.send(
            self.http
                .post(self.rest_url("cart_items"))
                .header("Prefer", "return=minimal")
                .json(&json!({
                    "user_id": user_id,
                    "product_id": product_id,
                    "quantity": quantity,
                })),
        )
        .await?;
        Ok(())
    }

    async fn set_line_quantity(&self, line_id: Uuid, quantity: i32) -> AppResult<()> {
        let filter = format!("eq.{line_id}");
        self.send(
            self.http
                .patch(self.rest_url("cart_items"))
                .query(&[("id", filter.as_str())])
                .header("Prefer", "return=minimal")
                .json(&json!({
                    "quantity": quantity,
                    "updated_at": Utc::now(),
                })),
        )
        .await?;
        Ok(())
    }

    async fn delete_cart_line(&self, line_id: Uuid) -> AppResult<()> {
        let filter = format!("eq.{line_id}");
        self.send(
            self.http
                .delete(self.rest_url("cart_items"))
                .query(&[("id", filter.as_str())]),
        )
        .await?;
        Ok(())
    }

    async fn clear_cart_lines(&self, user_id: Uuid) -> AppResult<()> {
        let filter = format!("eq.{user_id}");
        self.send(
            self.http
                .delete(self.rest_url("cart_items"))
                .query(&[("user_id", filter.as_str())]),
        )
        .await?;
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> AppResult<Order> {
        let response = self
            .send(
                self.http
                    .post(self.rest_url("orders"))
                    .header("Prefer", "return=representation")
                    .header("Accept", "application/vnd.pgrst.object+json")
                    .json(&order),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn orders(&self, user_id: Uuid, filters: &OrderFilters) -> AppResult<Vec<Order>> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "*".to_string()),
            ("user_id", format!("eq.{user_id}")),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(start) = filters.start_date {
            query.push(("created_at", format!("gte.{}", start.to_rfc3339())));
        }
        if let Some(end) = filters.end_date {
            query.push(("created_at", format!("lte.{}", end.to_rfc3339())));
        }
        if let Some(limit) = filters.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = filters.offset {
            query.push(("offset", offset.to_string()));
        }
        let response = self
            .send(self.http.get(self.rest_url("orders")).query(&query))
            .await?;
        Ok(response.json().await?)
    }

    async fn order_by_id(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        let filter = format!("eq.{order_id}");
        let response = self
            .send(
                self.http
                    .get(self.rest_url("orders"))
                    .query(&[("select", "*"), ("id", filter.as_str()), ("limit", "1")]),
            )
            .await?;
        let mut rows: Vec<Order> = response.json().await?;
        Ok(rows.pop())
    }

    async fn order_totals(&self, user_id: Uuid) -> AppResult<Vec<i64>> {
        #[derive(Deserialize)]
        struct TotalRow {
            total: i64,
        }
        let filter = format!("eq.{user_id}");
        let response = self
            .send(
                self.http
                    .get(self.rest_url("orders"))
                    .query(&[("select", "total"), ("user_id", filter.as_str())]),
            )
            .await?;
        let rows: Vec<TotalRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| row.total).collect())
    }

    async fn sign_up(&self, email: &str, password: &str, name: &str) -> AppResult<()> {
        let builder = self.http.post(self.auth_url("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": { "name": name },
        }));
        let response = self.send_as(builder, &self.anon_key).await?;
        // The signup endpoint answers 200 for an already-registered email,
        // with an empty identities list as the only tell.
        #[derive(Deserialize)]
        struct SignUpBody {
            #[serde(default)]
            identities: Option<Vec<serde_json::Value>>,
        }
        let body: SignUpBody = response.json().await?;
        if body.identities.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Err(AppError::Validation(
                "email is already registered".to_string(),
            ));
        }
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            user: AuthUserPayload,
        }
        let builder = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let response = self.send_as(builder, &self.anon_key).await?;
        let token: TokenResponse = response.json().await?;
        Ok(Session {
            access_token: token.access_token,
            user: token.user.into(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let builder = self.http.post(self.auth_url("logout"));
        self.send_as(builder, access_token).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AppResult<Option<User>> {
        let builder = self.http.get(self.auth_url("user"));
        match self.send_as(builder, access_token).await {
            Ok(response) => {
                let payload: AuthUserPayload = response.json().await?;
                Ok(Some(payload.into()))
            }
            Err(AppError::Unauthorized | AppError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
