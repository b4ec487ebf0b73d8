//! The discrete "dials" a pending request is built from.
//!
//! Every enumeration reserves index 0 for `Unset` and maps variants to
//! indices with explicit match arms. Those indices feed both the state
//! encoder and the action table, so reordering a declaration must never
//! change what an index means. Any change here is a schema change: bump
//! `ACTION_SCHEMA_VERSION` / `FEATURE_SCHEMA_VERSION` alongside it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── HttpVerb ─────────────────────────────────────────────────────────────────

/// The request verb selected for the pending request.
///
/// `List` is a bodyless `GET` against the collection; `Get` targets a single
/// record and therefore needs an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpVerb {
    #[default]
    Unset,
    Get,
    List,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    /// Number of variants, `Unset` included.
    pub const COUNT: usize = 7;

    /// Every selectable verb, in action-table order.
    pub const SELECTABLE: [HttpVerb; 6] = [
        HttpVerb::Get,
        HttpVerb::List,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Delete,
    ];

    pub fn index(self) -> usize {
        match self {
            HttpVerb::Unset => 0,
            HttpVerb::Get => 1,
            HttpVerb::List => 2,
            HttpVerb::Post => 3,
            HttpVerb::Put => 4,
            HttpVerb::Patch => 5,
            HttpVerb::Delete => 6,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(HttpVerb::Unset),
            1 => Some(HttpVerb::Get),
            2 => Some(HttpVerb::List),
            3 => Some(HttpVerb::Post),
            4 => Some(HttpVerb::Put),
            5 => Some(HttpVerb::Patch),
            6 => Some(HttpVerb::Delete),
            _ => None,
        }
    }

    /// Coarse bucket used for the "last observed verb" feature.
    ///
    /// 0 = nothing executed yet, 1 = GET (single or list), 2 = POST,
    /// 3 = PUT, 4 = PATCH, 5 = DELETE.
    pub fn bucket(self) -> usize {
        match self {
            HttpVerb::Unset => 0,
            HttpVerb::Get | HttpVerb::List => 1,
            HttpVerb::Post => 2,
            HttpVerb::Put => 3,
            HttpVerb::Patch => 4,
            HttpVerb::Delete => 5,
        }
    }

    /// Number of distinct `bucket()` values.
    pub const BUCKETS: usize = 6;

    /// True when the verb addresses a single record by identifier.
    pub fn needs_identifier(self) -> bool {
        matches!(
            self,
            HttpVerb::Get | HttpVerb::Put | HttpVerb::Patch | HttpVerb::Delete
        )
    }

    /// True when the verb carries a request body.
    pub fn carries_body(self) -> bool {
        matches!(self, HttpVerb::Post | HttpVerb::Put | HttpVerb::Patch)
    }

    /// The wire method, or `None` for `Unset`.
    pub fn method(self) -> Option<HttpMethod> {
        match self {
            HttpVerb::Unset => None,
            HttpVerb::Get | HttpVerb::List => Some(HttpMethod::Get),
            HttpVerb::Post => Some(HttpMethod::Post),
            HttpVerb::Put => Some(HttpMethod::Put),
            HttpVerb::Patch => Some(HttpMethod::Patch),
            HttpVerb::Delete => Some(HttpMethod::Delete),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpVerb::Unset => "UNSET",
            HttpVerb::Get => "GET",
            HttpVerb::List => "LIST",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// The method actually sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Resource ─────────────────────────────────────────────────────────────────

/// The record type a request targets.
///
/// Items are the primary resource. Each other resource references exactly
/// one parent: a price points at an item, a discount at a price, a point
/// entry at a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    #[default]
    Unset,
    Items,
    Prices,
    Discounts,
    Points,
}

impl Resource {
    pub const COUNT: usize = 5;

    /// Number of resources that carry identifiers (everything but `Unset`).
    pub const TRACKED: usize = 4;

    /// Every concrete resource, in action-table order.
    pub const SELECTABLE: [Resource; 4] = [
        Resource::Items,
        Resource::Prices,
        Resource::Discounts,
        Resource::Points,
    ];

    /// The resource requests fall back to when none is selected.
    pub const PRIMARY: Resource = Resource::Items;

    pub fn index(self) -> usize {
        match self {
            Resource::Unset => 0,
            Resource::Items => 1,
            Resource::Prices => 2,
            Resource::Discounts => 3,
            Resource::Points => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Resource::Unset),
            1 => Some(Resource::Items),
            2 => Some(Resource::Prices),
            3 => Some(Resource::Discounts),
            4 => Some(Resource::Points),
            _ => None,
        }
    }

    /// `Unset` resolves to the primary resource.
    pub fn effective(self) -> Resource {
        match self {
            Resource::Unset => Resource::PRIMARY,
            other => other,
        }
    }

    /// Slot in per-resource tables such as identifier books and readiness
    /// flags. `Unset` shares the primary resource's slot.
    pub fn slot(self) -> usize {
        match self.effective() {
            Resource::Prices => 1,
            Resource::Discounts => 2,
            Resource::Points => 3,
            Resource::Items | Resource::Unset => 0,
        }
    }

    /// The resource whose identifier this resource embeds, if any.
    pub fn parent(self) -> Option<Resource> {
        match self.effective() {
            Resource::Prices => Some(Resource::Items),
            Resource::Discounts => Some(Resource::Prices),
            Resource::Points => Some(Resource::Discounts),
            Resource::Items | Resource::Unset => None,
        }
    }

    /// Collection path segment, e.g. `items`.
    pub fn path_segment(self) -> &'static str {
        match self.effective() {
            Resource::Prices => "prices",
            Resource::Discounts => "discounts",
            Resource::Points => "points",
            Resource::Items | Resource::Unset => "items",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Unset => f.write_str("unset"),
            other => f.write_str(other.path_segment()),
        }
    }
}

// ── FieldFocus ───────────────────────────────────────────────────────────────

/// Which field of the body a mutation concentrates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFocus {
    #[default]
    Unset,
    Name,
    Quantity,
    Description,
    Price,
    ItemRef,
    Discount,
    PriceRef,
    Points,
    DiscountRef,
    All,
    Unknown,
}

impl FieldFocus {
    pub const COUNT: usize = 12;

    pub const SELECTABLE: [FieldFocus; 11] = [
        FieldFocus::Name,
        FieldFocus::Quantity,
        FieldFocus::Description,
        FieldFocus::Price,
        FieldFocus::ItemRef,
        FieldFocus::Discount,
        FieldFocus::PriceRef,
        FieldFocus::Points,
        FieldFocus::DiscountRef,
        FieldFocus::All,
        FieldFocus::Unknown,
    ];

    pub fn index(self) -> usize {
        match self {
            FieldFocus::Unset => 0,
            FieldFocus::Name => 1,
            FieldFocus::Quantity => 2,
            FieldFocus::Description => 3,
            FieldFocus::Price => 4,
            FieldFocus::ItemRef => 5,
            FieldFocus::Discount => 6,
            FieldFocus::PriceRef => 7,
            FieldFocus::Points => 8,
            FieldFocus::DiscountRef => 9,
            FieldFocus::All => 10,
            FieldFocus::Unknown => 11,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(FieldFocus::Unset),
            1 => Some(FieldFocus::Name),
            2 => Some(FieldFocus::Quantity),
            3 => Some(FieldFocus::Description),
            4 => Some(FieldFocus::Price),
            5 => Some(FieldFocus::ItemRef),
            6 => Some(FieldFocus::Discount),
            7 => Some(FieldFocus::PriceRef),
            8 => Some(FieldFocus::Points),
            9 => Some(FieldFocus::DiscountRef),
            10 => Some(FieldFocus::All),
            11 => Some(FieldFocus::Unknown),
            _ => None,
        }
    }

    /// `Unset` means "all fields".
    pub fn effective(self) -> FieldFocus {
        match self {
            FieldFocus::Unset => FieldFocus::All,
            other => other,
        }
    }
}

impl fmt::Display for FieldFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldFocus::Unset => "unset",
            FieldFocus::Name => "name",
            FieldFocus::Quantity => "quantity",
            FieldFocus::Description => "description",
            FieldFocus::Price => "price",
            FieldFocus::ItemRef => "item_ref",
            FieldFocus::Discount => "discount",
            FieldFocus::PriceRef => "price_ref",
            FieldFocus::Points => "points",
            FieldFocus::DiscountRef => "discount_ref",
            FieldFocus::All => "all",
            FieldFocus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// ── MutationStrategy ─────────────────────────────────────────────────────────

/// How the payload generator should corrupt (or not) the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStrategy {
    #[default]
    Unset,
    Valid,
    NullInject,
    Negative,
    Boundary,
    Structure,
    Injection,
    TypeConfuse,
    Encoding,
}

impl MutationStrategy {
    pub const COUNT: usize = 9;

    pub const SELECTABLE: [MutationStrategy; 8] = [
        MutationStrategy::Valid,
        MutationStrategy::NullInject,
        MutationStrategy::Negative,
        MutationStrategy::Boundary,
        MutationStrategy::Structure,
        MutationStrategy::Injection,
        MutationStrategy::TypeConfuse,
        MutationStrategy::Encoding,
    ];

    pub fn index(self) -> usize {
        match self {
            MutationStrategy::Unset => 0,
            MutationStrategy::Valid => 1,
            MutationStrategy::NullInject => 2,
            MutationStrategy::Negative => 3,
            MutationStrategy::Boundary => 4,
            MutationStrategy::Structure => 5,
            MutationStrategy::Injection => 6,
            MutationStrategy::TypeConfuse => 7,
            MutationStrategy::Encoding => 8,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(MutationStrategy::Unset),
            1 => Some(MutationStrategy::Valid),
            2 => Some(MutationStrategy::NullInject),
            3 => Some(MutationStrategy::Negative),
            4 => Some(MutationStrategy::Boundary),
            5 => Some(MutationStrategy::Structure),
            6 => Some(MutationStrategy::Injection),
            7 => Some(MutationStrategy::TypeConfuse),
            8 => Some(MutationStrategy::Encoding),
            _ => None,
        }
    }

    /// `Unset` means "send a valid body".
    pub fn effective(self) -> MutationStrategy {
        match self {
            MutationStrategy::Unset => MutationStrategy::Valid,
            other => other,
        }
    }
}

impl fmt::Display for MutationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MutationStrategy::Unset => "unset",
            MutationStrategy::Valid => "valid",
            MutationStrategy::NullInject => "null_inject",
            MutationStrategy::Negative => "negative",
            MutationStrategy::Boundary => "boundary",
            MutationStrategy::Structure => "structure",
            MutationStrategy::Injection => "injection",
            MutationStrategy::TypeConfuse => "type_confuse",
            MutationStrategy::Encoding => "encoding",
        };
        f.write_str(s)
    }
}

// ── Intensity ────────────────────────────────────────────────────────────────

/// How far from a valid body a mutation strays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    #[default]
    Unset,
    Mild,
    Moderate,
    Aggressive,
}

impl Intensity {
    pub const COUNT: usize = 4;

    pub const SELECTABLE: [Intensity; 3] =
        [Intensity::Mild, Intensity::Moderate, Intensity::Aggressive];

    pub fn index(self) -> usize {
        match self {
            Intensity::Unset => 0,
            Intensity::Mild => 1,
            Intensity::Moderate => 2,
            Intensity::Aggressive => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Intensity::Unset),
            1 => Some(Intensity::Mild),
            2 => Some(Intensity::Moderate),
            3 => Some(Intensity::Aggressive),
            _ => None,
        }
    }

    /// `Unset` means mild.
    pub fn effective(self) -> Intensity {
        match self {
            Intensity::Unset => Intensity::Mild,
            other => other,
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intensity::Unset => "unset",
            Intensity::Mild => "mild",
            Intensity::Moderate => "moderate",
            Intensity::Aggressive => "aggressive",
        };
        f.write_str(s)
    }
}
