// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::{Map, Value};
use shopdesk_app::{
    EntityKind, ID_FIELD, LineItem, Operation, Record, RecordId, RemoteCause, RemoteError,
    RemoteResource, Resources,
};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const CATEGORIES: [&str; 6] = ["Apparel", "Kitchen", "Outdoor", "Stationery", "Toys", "Decor"];

const TITLES: [&str; 14] = [
    "Canvas Tote",
    "Ceramic Mug",
    "Wool Beanie",
    "Trail Bottle",
    "Linen Apron",
    "Desk Planner",
    "Cotton Tee",
    "Camp Lantern",
    "Pour-Over Kettle",
    "Hardcover Notebook",
    "Plush Fox",
    "Throw Pillow",
    "Rain Shell",
    "Bamboo Board",
];

const ADJECTIVES: [&str; 10] = [
    "sturdy",
    "handmade",
    "lightweight",
    "recycled",
    "classic",
    "washable",
    "compact",
    "soft",
    "durable",
    "everyday",
];

const SIZES: [&str; 5] = ["XS", "S", "M", "L", "XL"];
const COLORS: [&str; 8] = [
    "Black", "White", "Navy", "Olive", "Rust", "Sand", "Slate", "Plum",
];

const STATUSES: [&str; 5] = ["pending", "paid", "shipped", "delivered", "cancelled"];
const PAYMENT_METHODS: [&str; 4] = ["cod", "card", "paypal", "bank transfer"];

const CITIES: [(&str, &str, &str); 8] = [
    ("Austin", "TX", "USA"),
    ("Portland", "OR", "USA"),
    ("Toronto", "ON", "Canada"),
    ("Leeds", "West Yorkshire", "UK"),
    ("Lyon", "Auvergne-Rhone-Alpes", "France"),
    ("Osaka", "Osaka", "Japan"),
    ("Perth", "WA", "Australia"),
    ("Denver", "CO", "USA"),
];

const STREETS: [&str; 8] = [
    "Maple", "Harbor", "Cedar", "Mill", "Station", "Orchard", "Bridge", "Hill",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Deterministic orders and products for demos and tests.
#[derive(Debug, Clone)]
pub struct ShopFaker {
    rng: DeterministicRng,
    ids: u64,
}

impl ShopFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            ids: normalized << 32,
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + self.rng.next_u64() % (max - min + 1)
    }

    fn next_id(&mut self) -> RecordId {
        self.ids += 1;
        object_id(self.ids)
    }

    pub fn product(&mut self) -> Record {
        let title = self.pick(&TITLES);
        let adjective = self.pick(&ADJECTIVES);
        let cents = self.int_range(500, 15_000);
        let slug = title.to_ascii_lowercase().replace(' ', "-");
        Record::new(self.next_id())
            .with_field("category", self.pick(&CATEGORIES))
            .with_field("title", title)
            .with_field(
                "description",
                format!("A {adjective} {} for every day.", title.to_ascii_lowercase()),
            )
            .with_field("price", price_text(cents))
            .with_field("size", self.pick(&SIZES))
            .with_field("color", self.pick(&COLORS))
            .with_field("quantity", self.int_range(0, 250))
            .with_field("media", format!("https://images.example.com/{slug}.jpg"))
    }

    /// An order whose line items point at `products`.
    pub fn order(&mut self, products: &[Record]) -> Record {
        let (city, state, country) = CITIES[self.rng.int_n(CITIES.len())];
        let mut total_cents = 0;
        let mut line_items = Vec::new();
        for _ in 0..self.int_range(1, 3) {
            let Some(product) = products.get(self.rng.int_n(products.len())) else {
                break;
            };
            let quantity = self.int_range(1, 4);
            let unit_cents = self.int_range(500, 15_000);
            total_cents += quantity * unit_cents;
            line_items.push(LineItem::new(
                product.id.to_string(),
                quantity.to_string(),
                price_text(unit_cents),
            ));
        }

        let mut order = Record::new(self.next_id())
            .with_field("customer_id", format!("C{:04}", self.int_range(1, 9_999)))
            .with_field("total_price", price_text(total_cents))
            .with_field("status", self.pick(&STATUSES))
            .with_field("payment_method", self.pick(&PAYMENT_METHODS))
            .with_field(
                "address_line",
                format!("{} {} St", self.int_range(1, 999), self.pick(&STREETS)),
            )
            .with_field("city", city)
            .with_field("state", state)
            .with_field("country", country)
            .with_field("postal_code", format!("{:05}", self.int_range(10_000, 99_999)))
            .with_field(
                "phone",
                format!("+1 555 {:03} {:04}", self.int_range(100, 999), self.int_range(0, 9_999)),
            );
        order.line_items = line_items;
        order
    }
}

fn price_text(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Mongo-style 24 hex digit identity.
pub fn object_id(n: u64) -> RecordId {
    RecordId::new(format!("{n:024x}"))
}

/// In-process stand-in for the REST backend. Every call is counted and the
/// whole resource can be switched into a failing state.
#[derive(Debug)]
pub struct MemoryResource {
    entity: EntityKind,
    records: Mutex<Vec<Record>>,
    failure: Mutex<Option<RemoteCause>>,
    next_id: AtomicU64,
    lists: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryResource {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            records: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            next_id: AtomicU64::new(0),
            lists: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn with_records(self, records: Vec<Record>) -> Self {
        *lock(&self.records) = records;
        self
    }

    /// Every following call fails with `cause` until [`Self::recover`].
    pub fn fail_with(&self, cause: RemoteCause) {
        *lock(&self.failure) = Some(cause);
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self, operation: Operation) -> usize {
        match operation {
            Operation::List => self.lists.load(Ordering::SeqCst),
            Operation::Create => self.creates.load(Ordering::SeqCst),
            Operation::Update => self.updates.load(Ordering::SeqCst),
            Operation::Delete => self.deletes.load(Ordering::SeqCst),
            Operation::Upload => 0,
        }
    }

    pub fn total_calls(&self) -> usize {
        [
            Operation::List,
            Operation::Create,
            Operation::Update,
            Operation::Delete,
        ]
        .into_iter()
        .map(|operation| self.calls(operation))
        .sum()
    }

    pub fn snapshot(&self) -> Vec<Record> {
        lock(&self.records).clone()
    }

    fn begin(&self, operation: Operation) -> Result<(), RemoteError> {
        let counter = match operation {
            Operation::List => Some(&self.lists),
            Operation::Create => Some(&self.creates),
            Operation::Update => Some(&self.updates),
            Operation::Delete => Some(&self.deletes),
            // Uploads go to the media host, never to a resource.
            Operation::Upload => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        debug!(entity = %self.entity, %operation, "memory backend call");
        match lock(&self.failure).clone() {
            Some(cause) => Err(self.error(operation, cause)),
            None => Ok(()),
        }
    }

    fn error(&self, operation: Operation, cause: RemoteCause) -> RemoteError {
        RemoteError::new(operation, self.entity, cause)
    }

    fn not_found(&self, operation: Operation, id: &RecordId) -> RemoteError {
        self.error(
            operation,
            RemoteCause::Status {
                status: 404,
                message: format!("{} {id} not found", self.entity.singular()),
            },
        )
    }

    fn decode(&self, operation: Operation, body: Map<String, Value>) -> Result<Record, RemoteError> {
        Record::from_json(Value::Object(body))
            .map_err(|error| self.error(operation, RemoteCause::Decode(error.to_string())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RemoteResource for MemoryResource {
    fn entity(&self) -> EntityKind {
        self.entity
    }

    fn list(&self) -> Result<Vec<Record>, RemoteError> {
        self.begin(Operation::List)?;
        Ok(self.snapshot())
    }

    fn create(&self, fields: &Map<String, Value>) -> Result<Record, RemoteError> {
        self.begin(Operation::Create)?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut body = fields.clone();
        body.insert(ID_FIELD.to_owned(), Value::String(object_id(n).to_string()));
        let record = self.decode(Operation::Create, body)?;
        lock(&self.records).push(record.clone());
        Ok(record)
    }

    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<Record, RemoteError> {
        self.begin(Operation::Update)?;
        let mut records = lock(&self.records);
        let stored = records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| self.not_found(Operation::Update, id))?;

        let mut body = fields.clone();
        body.insert(ID_FIELD.to_owned(), Value::String(id.to_string()));
        let patch = self.decode(Operation::Update, body)?;
        stored.fields.extend(patch.fields);
        if fields.contains_key(shopdesk_app::LINE_ITEMS_FIELD) {
            stored.line_items = patch.line_items;
        }
        Ok(stored.clone())
    }

    fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
        self.begin(Operation::Delete)?;
        let mut records = lock(&self.records);
        let index = records
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| self.not_found(Operation::Delete, id))?;
        records.remove(index);
        Ok(())
    }
}

/// Both in-memory backends, kept concrete so tests can inspect them.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    pub orders: Arc<MemoryResource>,
    pub products: Arc<MemoryResource>,
}

impl MemoryBackend {
    pub fn empty() -> Self {
        Self {
            orders: Arc::new(MemoryResource::new(EntityKind::Orders)),
            products: Arc::new(MemoryResource::new(EntityKind::Products)),
        }
    }

    /// Seeded catalog: `product_count` products and `order_count` orders
    /// referencing them.
    pub fn seeded(seed: u64, product_count: usize, order_count: usize) -> Self {
        let mut faker = ShopFaker::new(seed);
        let products = (0..product_count)
            .map(|_| faker.product())
            .collect::<Vec<_>>();
        let orders = (0..order_count)
            .map(|_| faker.order(&products))
            .collect::<Vec<_>>();
        Self {
            orders: Arc::new(MemoryResource::new(EntityKind::Orders).with_records(orders)),
            products: Arc::new(MemoryResource::new(EntityKind::Products).with_records(products)),
        }
    }

    pub fn get(&self, entity: EntityKind) -> &Arc<MemoryResource> {
        match entity {
            EntityKind::Orders => &self.orders,
            EntityKind::Products => &self.products,
        }
    }

    pub fn resources(&self) -> Resources {
        Resources::new(self.orders.clone(), self.products.clone())
    }
}

/// Field values for a complete, valid order draft.
pub fn valid_order_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("customer_id", "C1"),
        ("total_price", "100"),
        ("status", "pending"),
        ("payment_method", "cod"),
        ("address_line", "1 Rd"),
        ("city", "X"),
        ("state", "Y"),
        ("country", "Z"),
        ("postal_code", "00000"),
        ("phone", "000"),
    ]
}

/// Field values for a complete, valid product draft.
pub fn valid_product_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("category", "Kitchen"),
        ("title", "Ceramic Mug"),
        ("description", "Holds coffee"),
        ("price", "12.50"),
        ("size", "M"),
        ("color", "Sand"),
        ("quantity", "40"),
        ("media", "https://images.example.com/ceramic-mug.jpg"),
    ]
}
