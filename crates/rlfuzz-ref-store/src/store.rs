//! In-process CRUD store for items, prices, discounts and points.
//!
//! Mirrors the HTTP surface of the reference shop service, including the
//! defects it ships with:
//!
//! - creating an item with a negative or missing quantity → 500
//! - deleting an existing item → 500 (the item is never removed)
//! - PATCH fields of the wrong JSON type → 500
//! - deleting a point whose discount carries no price, or a negative one → 500
//!
//! Bodies are read the way a lenient JSON binder would: scalars coerce to
//! strings, numeric strings coerce to numbers, and anything that cannot bind
//! is a 400. PATCH bodies are not bound at all, which is where the type
//! defects come from.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use rlfuzz_contracts::{
    dial::HttpMethod,
    error::EnvironmentError,
    execution::{ApiRequest, ApiResponse},
};
use rlfuzz_core::traits::ServiceUnderTest;

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
}

/// A price as embedded in a discount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRef {
    pub id: Option<i64>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub id: i64,
    pub item: Option<ItemRef>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRef {
    pub id: Option<i64>,
}

/// A discount as embedded in a point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountRef {
    pub id: Option<i64>,
    pub price: Option<PriceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discount {
    pub id: i64,
    pub price: Option<PriceRef>,
    pub discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: i64,
    pub discount: Option<DiscountRef>,
    pub points: i32,
}

// ── Binding errors ────────────────────────────────────────────────────────────

/// Why a request could not be served normally.
enum Fault {
    /// Body did not bind.
    BadRequest,
    NotFound,
    /// Unchecked cast or null dereference in the handler.
    ServerError,
}

impl Fault {
    fn response(self) -> ApiResponse {
        match self {
            Fault::BadRequest => ApiResponse::new(400, r#"{"error":"Bad Request"}"#),
            Fault::NotFound => ApiResponse::new(404, ""),
            Fault::ServerError => ApiResponse::new(500, r#"{"error":"Internal Server Error"}"#),
        }
    }
}

type Handled = Result<ApiResponse, Fault>;

fn json<T: Serialize>(status: u16, value: &T) -> ApiResponse {
    ApiResponse::new(status, serde_json::to_string(value).unwrap_or_default())
}

fn parse_object(body: Option<&str>) -> Result<Map<String, Value>, Fault> {
    match serde_json::from_str::<Value>(body.unwrap_or("")) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Fault::BadRequest),
    }
}

fn bind_string(value: Option<&Value>) -> Result<Option<String>, Fault> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(Fault::BadRequest),
    }
}

fn bind_i32(value: Option<&Value>) -> Result<Option<i32>, Fault> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map(Some).map_err(|_| Fault::BadRequest)
            } else {
                let f = n.as_f64().ok_or(Fault::BadRequest)?;
                if f.trunc() >= f64::from(i32::MIN) && f.trunc() <= f64::from(i32::MAX) {
                    Ok(Some(f.trunc() as i32))
                } else {
                    Err(Fault::BadRequest)
                }
            }
        }
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| Fault::BadRequest),
        Some(_) => Err(Fault::BadRequest),
    }
}

fn bind_i64(value: Option<&Value>) -> Result<Option<i64>, Fault> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Some)
            .ok_or(Fault::BadRequest),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| Fault::BadRequest),
        Some(_) => Err(Fault::BadRequest),
    }
}

/// A primitive double: null and absent bind to 0.
fn bind_f64(value: Option<&Value>) -> Result<f64, Fault> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or(Fault::BadRequest),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| Fault::BadRequest),
        Some(_) => Err(Fault::BadRequest),
    }
}

/// Nested object reference: `None` for null/absent, otherwise its fields.
fn bind_object(value: Option<&Value>) -> Result<Option<&Map<String, Value>>, Fault> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(Fault::BadRequest),
    }
}

fn bind_price_ref(value: Option<&Value>) -> Result<Option<PriceRef>, Fault> {
    bind_object(value)?
        .map(|m| -> Result<PriceRef, Fault> {
            Ok(PriceRef {
                id: bind_i64(m.get("id"))?,
                price: bind_f64(m.get("price"))?,
            })
        })
        .transpose()
}

fn bind_discount_ref(value: Option<&Value>) -> Result<Option<DiscountRef>, Fault> {
    bind_object(value)?
        .map(|m| -> Result<DiscountRef, Fault> {
            Ok(DiscountRef {
                id: bind_i64(m.get("id"))?,
                price: bind_price_ref(m.get("price"))?,
            })
        })
        .transpose()
}

/// PATCH values are cast, not bound: a non-number is a server error, and so
/// is an explicit null.
fn cast_number(value: &Value) -> Result<f64, Fault> {
    value.as_f64().ok_or(Fault::ServerError)
}

fn cast_i64(value: &Value) -> Result<i64, Fault> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or(Fault::ServerError),
        _ => Err(Fault::ServerError),
    }
}

// ── Store state ───────────────────────────────────────────────────────────────

struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Default)]
struct StoreState {
    items: Table<Item>,
    prices: Table<Price>,
    discounts: Table<Discount>,
    points: Table<Point>,
}

/// The reference service under test. Clones share the same tables.
#[derive(Clone, Default)]
pub struct ReferenceStore {
    state: Arc<Mutex<StoreState>>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve one request.
    pub fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let response = route(&mut state, request).unwrap_or_else(Fault::response);
        trace!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "reference store served request"
        );
        response
    }

    pub fn item_count(&self) -> usize {
        self.lock().items.rows.len()
    }

    pub fn point_count(&self) -> usize {
        self.lock().points.rows.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ServiceUnderTest for ReferenceStore {
    fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse, EnvironmentError> {
        Ok(self.handle(request))
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

fn route(state: &mut StoreState, request: &ApiRequest) -> Handled {
    let mut segments = request.path.trim_matches('/').split('/');
    let collection = segments.next().unwrap_or("");
    let id = match segments.next() {
        None => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| Fault::BadRequest)?),
    };
    if segments.next().is_some() {
        return Err(Fault::NotFound);
    }
    let body = request.body.as_deref();

    match (collection, request.method, id) {
        ("items", method, id) => items(state, method, id, body),
        ("prices", method, id) => prices(state, method, id, body),
        ("discounts", method, id) => discounts(state, method, id, body),
        ("points", method, id) => points(state, method, id, body),
        _ => Err(Fault::NotFound),
    }
}

fn list<T: Serialize>(table: &Table<T>) -> ApiResponse {
    let rows: Vec<&T> = table.rows.values().collect();
    json(200, &rows)
}

fn get<T: Serialize>(table: &Table<T>, id: i64) -> Handled {
    table.rows.get(&id).map(|row| json(200, row)).ok_or(Fault::NotFound)
}

fn delete_all<T>(table: &mut Table<T>) -> Handled {
    table.rows.clear();
    Ok(ApiResponse::new(204, ""))
}

// ── Items ─────────────────────────────────────────────────────────────────────

fn bind_item(id: i64, body: Option<&str>) -> Result<Item, Fault> {
    let map = parse_object(body)?;
    Ok(Item {
        id,
        name: bind_string(map.get("name"))?,
        description: bind_string(map.get("description"))?,
        quantity: bind_i32(map.get("quantity"))?,
    })
}

fn items(state: &mut StoreState, method: HttpMethod, id: Option<i64>, body: Option<&str>) -> Handled {
    let table = &mut state.items;
    match (method, id) {
        (HttpMethod::Get, None) => Ok(list(table)),
        (HttpMethod::Get, Some(id)) => get(table, id),
        (HttpMethod::Post, None) => {
            let mut item = bind_item(0, body)?;
            // Unboxing a null quantity for the sign check fails too.
            match item.quantity {
                None => return Err(Fault::ServerError),
                Some(q) if q < 0 => return Err(Fault::ServerError),
                Some(_) => {}
            }
            item.id = table.allocate();
            let response = json(201, &item);
            table.rows.insert(item.id, item);
            Ok(response)
        }
        (HttpMethod::Put, Some(id)) => {
            if !table.rows.contains_key(&id) {
                return Err(Fault::NotFound);
            }
            let item = bind_item(id, body)?;
            let response = json(200, &item);
            table.rows.insert(id, item);
            Ok(response)
        }
        (HttpMethod::Patch, Some(id)) => {
            let updates = parse_object(body)?;
            let item = table.rows.get_mut(&id).ok_or(Fault::NotFound)?;
            if let Some(v) = updates.get("name") {
                item.name = match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    _ => return Err(Fault::ServerError),
                };
            }
            if let Some(v) = updates.get("description") {
                item.description = match v {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    _ => return Err(Fault::ServerError),
                };
            }
            if let Some(v) = updates.get("quantity") {
                item.quantity = match v {
                    Value::Null => None,
                    Value::Number(n) => Some(
                        n.as_i64()
                            .and_then(|i| i32::try_from(i).ok())
                            .ok_or(Fault::ServerError)?,
                    ),
                    _ => return Err(Fault::ServerError),
                };
            }
            Ok(json(200, &*item))
        }
        (HttpMethod::Delete, Some(id)) => {
            if table.rows.contains_key(&id) {
                Err(Fault::ServerError)
            } else {
                Err(Fault::NotFound)
            }
        }
        (HttpMethod::Delete, None) => delete_all(table),
        _ => Err(Fault::NotFound),
    }
}

// ── Prices ────────────────────────────────────────────────────────────────────

fn bind_price(id: i64, body: Option<&str>) -> Result<Price, Fault> {
    let map = parse_object(body)?;
    let item = bind_object(map.get("item"))?
        .map(|m| -> Result<ItemRef, Fault> { Ok(ItemRef { id: bind_i64(m.get("id"))? }) })
        .transpose()?;
    Ok(Price {
        id,
        item,
        price: bind_f64(map.get("price"))?,
    })
}

fn prices(state: &mut StoreState, method: HttpMethod, id: Option<i64>, body: Option<&str>) -> Handled {
    match (method, id) {
        (HttpMethod::Get, None) => Ok(list(&state.prices)),
        (HttpMethod::Get, Some(id)) => get(&state.prices, id),
        (HttpMethod::Post, None) => {
            let mut price = bind_price(0, body)?;
            let parent = price.item.as_ref().and_then(|i| i.id).ok_or(Fault::NotFound)?;
            if !state.items.rows.contains_key(&parent) {
                return Err(Fault::NotFound);
            }
            price.id = state.prices.allocate();
            let response = json(201, &price);
            state.prices.rows.insert(price.id, price);
            Ok(response)
        }
        (HttpMethod::Put, Some(id)) => {
            if !state.prices.rows.contains_key(&id) {
                return Err(Fault::NotFound);
            }
            let price = bind_price(id, body)?;
            if let Some(parent) = price.item.as_ref().and_then(|i| i.id) {
                if !state.items.rows.contains_key(&parent) {
                    return Err(Fault::NotFound);
                }
            }
            let response = json(200, &price);
            state.prices.rows.insert(id, price);
            Ok(response)
        }
        (HttpMethod::Patch, Some(id)) => {
            let updates = parse_object(body)?;
            let items = &state.items;
            let price = state.prices.rows.get_mut(&id).ok_or(Fault::NotFound)?;
            if let Some(v) = updates.get("price") {
                price.price = cast_number(v)?;
            }
            if let Some(v) = updates.get("itemId") {
                let item_id = cast_i64(v)?;
                if !items.rows.contains_key(&item_id) {
                    return Err(Fault::NotFound);
                }
                price.item = Some(ItemRef { id: Some(item_id) });
            }
            Ok(json(200, &*price))
        }
        (HttpMethod::Delete, Some(id)) => {
            state.prices.rows.remove(&id).ok_or(Fault::NotFound)?;
            Ok(ApiResponse::new(204, ""))
        }
        (HttpMethod::Delete, None) => delete_all(&mut state.prices),
        _ => Err(Fault::NotFound),
    }
}

// ── Discounts ─────────────────────────────────────────────────────────────────

fn bind_discount(id: i64, body: Option<&str>) -> Result<Discount, Fault> {
    let map = parse_object(body)?;
    Ok(Discount {
        id,
        price: bind_price_ref(map.get("price"))?,
        discount: bind_f64(map.get("discount"))?,
    })
}

fn discounts(
    state: &mut StoreState,
    method: HttpMethod,
    id: Option<i64>,
    body: Option<&str>,
) -> Handled {
    match (method, id) {
        (HttpMethod::Get, None) => Ok(list(&state.discounts)),
        (HttpMethod::Get, Some(id)) => get(&state.discounts, id),
        (HttpMethod::Post, None) => {
            let mut discount = bind_discount(0, body)?;
            let parent = discount.price.as_ref().and_then(|p| p.id).ok_or(Fault::NotFound)?;
            if !state.prices.rows.contains_key(&parent) {
                return Err(Fault::NotFound);
            }
            discount.id = state.discounts.allocate();
            let response = json(201, &discount);
            state.discounts.rows.insert(discount.id, discount);
            Ok(response)
        }
        (HttpMethod::Put, Some(id)) => {
            if !state.discounts.rows.contains_key(&id) {
                return Err(Fault::NotFound);
            }
            let discount = bind_discount(id, body)?;
            if let Some(parent) = discount.price.as_ref().and_then(|p| p.id) {
                if !state.prices.rows.contains_key(&parent) {
                    return Err(Fault::NotFound);
                }
            }
            let response = json(200, &discount);
            state.discounts.rows.insert(id, discount);
            Ok(response)
        }
        (HttpMethod::Patch, Some(id)) => {
            let updates = parse_object(body)?;
            let prices = &state.prices;
            let discount = state.discounts.rows.get_mut(&id).ok_or(Fault::NotFound)?;
            if let Some(v) = updates.get("discount") {
                discount.discount = cast_number(v)?;
            }
            // The parent price is addressed as "itemId" on this endpoint.
            if let Some(v) = updates.get("itemId") {
                let price_id = cast_i64(v)?;
                let price = prices.rows.get(&price_id).ok_or(Fault::NotFound)?;
                discount.price = Some(PriceRef {
                    id: Some(price.id),
                    price: price.price,
                });
            }
            Ok(json(200, &*discount))
        }
        (HttpMethod::Delete, Some(id)) => {
            state.discounts.rows.remove(&id).ok_or(Fault::NotFound)?;
            Ok(ApiResponse::new(204, ""))
        }
        (HttpMethod::Delete, None) => delete_all(&mut state.discounts),
        _ => Err(Fault::NotFound),
    }
}

// ── Points ────────────────────────────────────────────────────────────────────

fn bind_point(id: i64, body: Option<&str>) -> Result<Point, Fault> {
    let map = parse_object(body)?;
    Ok(Point {
        id,
        discount: bind_discount_ref(map.get("discount"))?,
        points: bind_i32(map.get("points"))?.unwrap_or(0),
    })
}

fn points(state: &mut StoreState, method: HttpMethod, id: Option<i64>, body: Option<&str>) -> Handled {
    match (method, id) {
        (HttpMethod::Get, None) => Ok(list(&state.points)),
        (HttpMethod::Get, Some(id)) => get(&state.points, id),
        (HttpMethod::Post, None) => {
            let mut point = bind_point(0, body)?;
            let parent = point.discount.as_ref().and_then(|d| d.id).ok_or(Fault::NotFound)?;
            if !state.discounts.rows.contains_key(&parent) {
                return Err(Fault::NotFound);
            }
            point.id = state.points.allocate();
            let response = json(201, &point);
            state.points.rows.insert(point.id, point);
            Ok(response)
        }
        (HttpMethod::Put, Some(id)) => {
            if !state.points.rows.contains_key(&id) {
                return Err(Fault::NotFound);
            }
            let point = bind_point(id, body)?;
            if let Some(parent) = point.discount.as_ref().and_then(|d| d.id) {
                if !state.discounts.rows.contains_key(&parent) {
                    return Err(Fault::NotFound);
                }
            }
            let response = json(200, &point);
            state.points.rows.insert(id, point);
            Ok(response)
        }
        (HttpMethod::Patch, Some(id)) => {
            let updates = parse_object(body)?;
            let discounts = &state.discounts;
            let point = state.points.rows.get_mut(&id).ok_or(Fault::NotFound)?;
            if let Some(v) = updates.get("point") {
                point.points = cast_number(v)? as i32;
            }
            if let Some(v) = updates.get("discountId") {
                let discount_id = cast_i64(v)?;
                let discount = discounts.rows.get(&discount_id).ok_or(Fault::NotFound)?;
                point.discount = Some(DiscountRef {
                    id: Some(discount.id),
                    price: discount.price.clone(),
                });
            }
            Ok(json(200, &*point))
        }
        (HttpMethod::Delete, Some(id)) => {
            let point = state.points.rows.get(&id).ok_or(Fault::NotFound)?;
            // Dereferences discount → price → amount without null checks.
            let amount = point
                .discount
                .as_ref()
                .and_then(|d| d.price.as_ref())
                .map(|p| p.price)
                .ok_or(Fault::ServerError)?;
            if amount < 0.0 {
                return Err(Fault::ServerError);
            }
            state.points.rows.remove(&id);
            Ok(ApiResponse::new(204, ""))
        }
        (HttpMethod::Delete, None) => delete_all(&mut state.points),
        _ => Err(Fault::NotFound),
    }
}
