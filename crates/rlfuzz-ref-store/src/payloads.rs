//! Template-driven request bodies for the shop resources.
//!
//! Every resource is described as a short list of fields, each with a kind.
//! A strategy rewrites the fields the focus selects; a focus that names no
//! field of the resource selects all of them. Randomness (lengths, magnitudes,
//! stand-in parent ids) comes from one seeded ChaCha8 stream, so a run is
//! reproducible from its payload seed.

use rand::{distributions::Alphanumeric, seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Map, Value};

use rlfuzz_contracts::{
    dial::{FieldFocus, Intensity, MutationStrategy, Resource},
    execution::BodyRequest,
};
use rlfuzz_core::traits::PayloadGenerator;

/// Classic injection strings, one picked per body.
pub const INJECTIONS: [&str; 6] = [
    "'; DROP TABLE items; --",
    "1' OR '1'='1",
    "<script>alert('xss')</script>",
    "../../../etc/passwd",
    "${7*7}",
    "{{constructor.constructor('return this')()}}",
];

const UNICODE_ALPHABET: &[char] = &[
    'a', 'b', 'c', 'x', 'y', 'z', 'A', 'B', 'C', 'X', 'Y', 'Z', 'ä', 'ö', 'ü', '中', '文',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Count,
    Amount,
    /// Nested `{"id": …}` pointing at the parent resource.
    Reference,
}

struct Field {
    key: &'static str,
    kind: Kind,
    focus: FieldFocus,
}

const fn field(key: &'static str, kind: Kind, focus: FieldFocus) -> Field {
    Field { key, kind, focus }
}

const ITEM_FIELDS: &[Field] = &[
    field("name", Kind::Text, FieldFocus::Name),
    field("quantity", Kind::Count, FieldFocus::Quantity),
    field("description", Kind::Text, FieldFocus::Description),
];
const PRICE_FIELDS: &[Field] = &[
    field("item", Kind::Reference, FieldFocus::ItemRef),
    field("price", Kind::Amount, FieldFocus::Price),
];
const DISCOUNT_FIELDS: &[Field] = &[
    field("price", Kind::Reference, FieldFocus::PriceRef),
    field("discount", Kind::Amount, FieldFocus::Discount),
];
const POINT_FIELDS: &[Field] = &[
    field("discount", Kind::Reference, FieldFocus::DiscountRef),
    field("points", Kind::Count, FieldFocus::Points),
];

fn schema(resource: Resource) -> &'static [Field] {
    match resource.effective() {
        Resource::Prices => PRICE_FIELDS,
        Resource::Discounts => DISCOUNT_FIELDS,
        Resource::Points => POINT_FIELDS,
        Resource::Items | Resource::Unset => ITEM_FIELDS,
    }
}

/// Seeded `PayloadGenerator` for items, prices, discounts and points.
pub struct TemplatePayloadGenerator {
    rng: ChaCha8Rng,
}

impl TemplatePayloadGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Build the body as a JSON value.
    pub fn generate_value(&mut self, request: &BodyRequest) -> Value {
        let fields = schema(request.resource);
        let intensity = request.intensity.effective();
        let focus = request.field.effective();
        let parent = request
            .parent_id
            .unwrap_or_else(|| self.rng.gen_range(1..=1000));

        let mut body = Map::new();
        for f in fields {
            let value = self.valid_value(f.kind, intensity, parent);
            body.insert(f.key.to_string(), value);
        }

        let targets: Vec<&Field> = {
            let named: Vec<&Field> = fields.iter().filter(|f| f.focus == focus).collect();
            if named.is_empty() {
                fields.iter().collect()
            } else {
                named
            }
        };

        match request.strategy.effective() {
            MutationStrategy::Valid | MutationStrategy::Unset => {}
            MutationStrategy::NullInject => {
                for f in &targets {
                    body.insert(f.key.to_string(), Value::Null);
                }
            }
            MutationStrategy::Negative => {
                let numeric: Vec<&Field> = targets
                    .iter()
                    .copied()
                    .filter(|f| f.kind != Kind::Text)
                    .collect();
                let numeric = if numeric.is_empty() {
                    fields.iter().filter(|f| f.kind != Kind::Text).collect()
                } else {
                    numeric
                };
                for f in numeric {
                    let value = self.negative_value(f.kind, intensity);
                    body.insert(f.key.to_string(), value);
                }
            }
            MutationStrategy::Boundary => {
                for f in &targets {
                    let value = self.boundary_value(f.kind, intensity);
                    body.insert(f.key.to_string(), value);
                }
            }
            MutationStrategy::Structure => match focus {
                FieldFocus::Unknown => {
                    body.insert("unknown".to_string(), json!("field"));
                    body.insert("hack".to_string(), json!(true));
                }
                FieldFocus::All => body.clear(),
                _ => {
                    for f in &targets {
                        body.remove(f.key);
                    }
                }
            },
            MutationStrategy::Injection => {
                let injected = INJECTIONS.choose(&mut self.rng).copied().unwrap_or(INJECTIONS[0]);
                for f in &targets {
                    let value = match f.kind {
                        Kind::Reference => json!({ "id": injected }),
                        _ => json!(injected),
                    };
                    body.insert(f.key.to_string(), value);
                }
            }
            MutationStrategy::TypeConfuse => {
                for f in &targets {
                    let value = self.confused_value(f.kind);
                    body.insert(f.key.to_string(), value);
                }
            }
            MutationStrategy::Encoding => {
                let texts: Vec<&Field> = targets
                    .iter()
                    .copied()
                    .filter(|f| f.kind == Kind::Text)
                    .collect();
                if texts.is_empty() {
                    // Numbers travel as their decimal strings instead.
                    for f in &targets {
                        if let Some(v) = body.get_mut(f.key) {
                            encode_numbers(v);
                        }
                    }
                } else {
                    for f in texts {
                        let value = json!(self.unicode_string(intensity));
                        body.insert(f.key.to_string(), value);
                    }
                }
            }
        }

        Value::Object(body)
    }

    // ── Value builders ────────────────────────────────────────────────────────

    fn valid_value(&mut self, kind: Kind, intensity: Intensity, parent: i64) -> Value {
        match kind {
            Kind::Text => json!(self.ascii_string(intensity)),
            Kind::Count => json!(self.magnitude(intensity)),
            Kind::Amount => json!(self.amount(intensity)),
            Kind::Reference => json!({ "id": parent }),
        }
    }

    fn negative_value(&mut self, kind: Kind, intensity: Intensity) -> Value {
        match kind {
            Kind::Count => json!(-self.magnitude(intensity)),
            Kind::Amount => json!(-self.amount(intensity)),
            Kind::Reference => json!({ "id": -1 }),
            Kind::Text => json!(self.ascii_string(intensity)),
        }
    }

    fn boundary_value(&mut self, kind: Kind, intensity: Intensity) -> Value {
        match kind {
            Kind::Text => {
                if self.rng.gen_bool(0.5) {
                    json!("")
                } else {
                    json!("A".repeat(huge_length(intensity)))
                }
            }
            Kind::Count => {
                let picks = [0_i64, i64::from(i32::MAX / 2), i64::from(i32::MAX)];
                json!(picks[self.rng.gen_range(0..picks.len())])
            }
            Kind::Amount => {
                let picks = [0.0, f64::MAX / 2.0, f64::MAX];
                json!(picks[self.rng.gen_range(0..picks.len())])
            }
            Kind::Reference => {
                let picks = [0_i64, i64::from(i32::MAX), i64::MAX];
                json!({ "id": picks[self.rng.gen_range(0..picks.len())] })
            }
        }
    }

    fn confused_value(&mut self, kind: Kind) -> Value {
        match kind {
            Kind::Text => {
                if self.rng.gen_bool(0.5) {
                    json!(12345)
                } else {
                    json!(["item1", "item2"])
                }
            }
            Kind::Count | Kind::Amount => json!("not a number"),
            Kind::Reference => {
                if self.rng.gen_bool(0.5) {
                    json!("not an object")
                } else {
                    json!([1, 2, 3])
                }
            }
        }
    }

    fn ascii_string(&mut self, intensity: Intensity) -> String {
        let len = self.string_length(intensity);
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect()
    }

    fn unicode_string(&mut self, intensity: Intensity) -> String {
        let len = self.string_length(intensity);
        (0..len)
            .map(|_| UNICODE_ALPHABET[self.rng.gen_range(0..UNICODE_ALPHABET.len())])
            .collect()
    }

    fn string_length(&mut self, intensity: Intensity) -> usize {
        match intensity.effective() {
            Intensity::Moderate => self.rng.gen_range(10..60),
            Intensity::Aggressive => self.rng.gen_range(100..1100),
            Intensity::Mild | Intensity::Unset => self.rng.gen_range(3..13),
        }
    }

    fn magnitude(&mut self, intensity: Intensity) -> i64 {
        match intensity.effective() {
            Intensity::Moderate => self.rng.gen_range(1..=10_000),
            Intensity::Aggressive => self.rng.gen_range(1..=i64::from(i32::MAX / 2)),
            Intensity::Mild | Intensity::Unset => self.rng.gen_range(1..=100),
        }
    }

    /// A positive amount with two decimals.
    fn amount(&mut self, intensity: Intensity) -> f64 {
        let cents = self.magnitude(intensity) * 100 + self.rng.gen_range(0..100);
        cents as f64 / 100.0
    }
}

fn huge_length(intensity: Intensity) -> usize {
    match intensity.effective() {
        Intensity::Moderate => 4_096,
        Intensity::Aggressive => 65_536,
        Intensity::Mild | Intensity::Unset => 256,
    }
}

fn encode_numbers(value: &mut Value) {
    if let Value::Object(map) = value {
        map.values_mut().for_each(encode_numbers);
    } else if value.is_number() {
        let text = value.to_string();
        *value = Value::String(text);
    }
}

impl PayloadGenerator for TemplatePayloadGenerator {
    fn generate_body(&mut self, request: &BodyRequest) -> String {
        self.generate_value(request).to_string()
    }
}
