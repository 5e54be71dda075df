use crate::{
    errors::ServiceError,
    services::pricing::{coerce_quantity, format_money, parse_price, parse_price_str},
    session::Session,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Session key holding the cart lines.
pub const CART_SESSION_KEY: &str = "cart";

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// One product's snapshot inside the session cart.
///
/// Title, SKU and price come from the storefront page that added the item;
/// they are not looked up in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub title: String,
    #[serde(default)]
    pub sku: String,
    /// Two-decimal price string
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub quantity: i64,
}

/// Product identifier as echoed to the storefront: numeric when the key is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ProductRef {
    Id(i64),
    Key(String),
}

impl ProductRef {
    fn from_key(key: &str) -> Self {
        key.parse::<i64>()
            .map(ProductRef::Id)
            .unwrap_or_else(|_| ProductRef::Key(key.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartSummaryItem {
    pub product_id: ProductRef,
    pub title: String,
    pub sku: String,
    #[schema(example = "1234.50")]
    pub price: String,
    pub quantity: i64,
    #[schema(example = "3703.50")]
    pub subtotal: String,
}

/// Cart state returned by every cart endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartSummary {
    pub items: Vec<CartSummaryItem>,
    pub total_quantity: i64,
    #[schema(example = "3703.50")]
    pub total_amount: String,
}

impl CartSummary {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Loosely-typed add/update request as submitted by storefront scripts.
///
/// Values stay as raw JSON because form posts deliver everything as text
/// and scripts send numbers, strings or nothing for the same field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CartItemInput {
    #[schema(value_type = Object, example = 7)]
    pub product_id: Option<Value>,
    #[schema(value_type = Object, example = 1)]
    pub quantity: Option<Value>,
    #[schema(value_type = Object, example = "Wire A")]
    pub title: Option<Value>,
    #[schema(value_type = Object, example = "W7")]
    pub sku: Option<Value>,
    #[schema(value_type = Object, example = "1 234,50")]
    pub price: Option<Value>,
    #[schema(value_type = Object, example = false)]
    pub replace: Option<Value>,
}

impl CartItemInput {
    /// Builds the input from a decoded JSON or form payload.
    pub fn from_payload(payload: &Map<String, Value>) -> Self {
        Self {
            product_id: payload.get("product_id").cloned(),
            quantity: payload.get("quantity").cloned(),
            title: payload.get("title").cloned(),
            sku: payload.get("sku").cloned(),
            price: payload.get("price").cloned(),
            replace: payload.get("replace").cloned(),
        }
    }
}

/// Renders an identifier-like field (`product_id`, `title`, ...) as trimmed text.
pub fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Interprets checkbox-like flags. Form posts send text, so common "off"
/// spellings count as false.
pub fn flag_field(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => {
            let s = s.trim().to_ascii_lowercase();
            !(s.is_empty() || s == "0" || s == "false" || s == "off" || s == "no")
        }
        _ => false,
    }
}

/// Session-scoped shopping cart.
///
/// The `CartService` keeps the cart entirely inside the caller's [`Session`]:
/// - lines keep insertion order and are keyed by product id
/// - every price is re-parsed when a summary is built, so the totals never
///   depend on what the client originally sent
/// - every mutation marks the session modified; persisting it is the
///   caller's job (see [`crate::session::SessionManager::persist`])
#[derive(Debug, Clone, Default)]
pub struct CartService;

impl CartService {
    pub fn new() -> Self {
        Self
    }

    fn lines(session: &Session) -> Vec<CartLine> {
        session
            .get::<Vec<CartLine>>(CART_SESSION_KEY)
            .unwrap_or_default()
    }

    fn save_lines(session: &mut Session, lines: &[CartLine]) -> Result<(), ServiceError> {
        session.insert(CART_SESSION_KEY, &lines)?;
        Ok(())
    }

    /// Builds the priced view of the cart held in `session`.
    ///
    /// Lines whose quantity is not positive are skipped and do not count
    /// toward the totals.
    pub fn summary(&self, session: &Session) -> CartSummary {
        summarize(&Self::lines(session))
    }

    /// Adds a product to the cart or updates its line.
    ///
    /// # Behavior
    ///
    /// - `quantity` defaults to 1 when missing or unreadable
    /// - a quantity of zero or less removes the line
    /// - without `replace`, the quantity is added to the existing one;
    ///   with `replace`, it overwrites it
    /// - the result is clamped to `1..=999`
    /// - title, SKU and price always take the latest submitted values
    ///
    /// # Errors
    ///
    /// * `ServiceError::ValidationError` - product id or title missing
    #[instrument(skip(self, session, input), fields(session_id = %session.id()))]
    pub fn upsert_item(
        &self,
        session: &mut Session,
        input: CartItemInput,
    ) -> Result<CartSummary, ServiceError> {
        let product_id = text_field(input.product_id.as_ref());
        let title = text_field(input.title.as_ref());
        if product_id.is_empty() || title.is_empty() {
            return Err(ServiceError::validation("Product is not specified"));
        }

        let quantity = input
            .quantity
            .as_ref()
            .and_then(coerce_quantity)
            .unwrap_or(1);
        let replace = flag_field(input.replace.as_ref());
        let price = parse_price(input.price.as_ref().unwrap_or(&Value::Null));

        let mut lines = Self::lines(session);
        let position = lines.iter().position(|line| line.product_id == product_id);

        if quantity <= 0 {
            if let Some(index) = position {
                lines.remove(index);
                debug!(product_id = %product_id, "Removed cart line via non-positive quantity");
            }
            Self::save_lines(session, &lines)?;
            return Ok(summarize(&lines));
        }

        let existing = position.map(|index| lines[index].quantity).unwrap_or(0);
        let requested = if replace {
            quantity
        } else {
            existing.max(0).saturating_add(quantity)
        };
        let new_quantity = requested.clamp(1, MAX_LINE_QUANTITY);

        let line = CartLine {
            product_id: product_id.clone(),
            title,
            sku: text_field(input.sku.as_ref()),
            price: format_money(price),
            quantity: new_quantity,
        };
        match position {
            Some(index) => lines[index] = line,
            None => lines.push(line),
        }

        Self::save_lines(session, &lines)?;
        info!(product_id = %product_id, quantity = new_quantity, "Cart line updated");
        Ok(summarize(&lines))
    }

    /// Removes a product's line. Removing an absent product is not an error.
    ///
    /// # Errors
    ///
    /// * `ServiceError::ValidationError` - product id missing
    #[instrument(skip(self, session, product_id), fields(session_id = %session.id()))]
    pub fn remove_item(
        &self,
        session: &mut Session,
        product_id: Option<&Value>,
    ) -> Result<CartSummary, ServiceError> {
        let product_id = text_field(product_id);
        if product_id.is_empty() {
            return Err(ServiceError::validation("Product is not specified"));
        }

        let mut lines = Self::lines(session);
        lines.retain(|line| line.product_id != product_id);
        Self::save_lines(session, &lines)?;
        Ok(summarize(&lines))
    }

    /// Empties the cart.
    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    pub fn clear(&self, session: &mut Session) -> Result<CartSummary, ServiceError> {
        Self::save_lines(session, &[])?;
        Ok(summarize(&[]))
    }
}

fn summarize(lines: &[CartLine]) -> CartSummary {
    let mut items = Vec::with_capacity(lines.len());
    let mut total_quantity = 0i64;
    let mut total_amount = Decimal::ZERO;

    for line in lines {
        let quantity = line.quantity.max(0);
        if quantity == 0 {
            continue;
        }
        let price = parse_price_str(&line.price);
        let subtotal = price * Decimal::from(quantity);
        total_quantity += quantity;
        total_amount += subtotal;

        items.push(CartSummaryItem {
            product_id: ProductRef::from_key(&line.product_id),
            title: line.title.clone(),
            sku: line.sku.clone(),
            price: format_money(price),
            quantity,
            subtotal: format_money(subtotal),
        });
    }

    CartSummary {
        items,
        total_quantity,
        total_amount: format_money(total_amount),
    }
}
