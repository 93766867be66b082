//! Common test utilities for the stock ledger integration tests.
//!
//! Provides an in-memory [`StockStore`] with the same scoping rules as the
//! PostgreSQL store, a fixed clock and helpers for seeding ledger rows.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::NaiveDate;
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use shared::{
    Actor, BranchTransfer, ClosingStock, ClosingStockUpsert, DayActivity, Item, OpeningStock,
    OpeningStockUpsert, Restocking, Role, Sale, Scope, StockKey, WasteSpoilage,
};
use stock_ledger_backend::config::{
    Config, DatabaseConfig, JwtConfig, ReconciliationConfig, ServerConfig,
};
use stock_ledger_backend::error::{AppError, AppResult};
use stock_ledger_backend::middleware::Claims;
use stock_ledger_backend::services::{
    CascadeService, FixedClock, IdentityProvider, ItemService, OrganizationLocks, ReportService,
    StockService, StockStore,
};
use stock_ledger_backend::AppState;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,stock_ledger_backend=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
struct Tables {
    items: Vec<Item>,
    opening: HashMap<StockKey, OpeningStock>,
    closing: HashMap<StockKey, ClosingStock>,
    sales: Vec<Sale>,
    restockings: Vec<Restocking>,
    waste: Vec<WasteSpoilage>,
    transfers: Vec<BranchTransfer>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    /// Closing stock upserts for this date fail
    fail_closing_on: Mutex<Option<NaiveDate>>,
    writes: Mutex<usize>,
}

fn in_scope(scope: &Scope, organization_id: Uuid, branch_id: Option<Uuid>) -> bool {
    organization_id == scope.organization_id && scope.includes_branch(branch_id)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_closing_upserts_on(&self, date: NaiveDate) {
        *self.fail_closing_on.lock().unwrap() = Some(date);
    }

    /// Number of upsert and delete calls that reached the tables
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn insert_item(&self, item: Item) {
        self.tables.lock().unwrap().items.push(item);
    }

    pub fn update_item_prices(&self, item_id: Uuid, cost_price: Decimal, selling_price: Decimal) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(item) = tables.items.iter_mut().find(|i| i.id == item_id) {
            item.cost_price = cost_price;
            item.selling_price = selling_price;
        }
    }

    pub fn insert_sale(&self, sale: Sale) {
        self.tables.lock().unwrap().sales.push(sale);
    }

    pub fn insert_restocking(&self, restocking: Restocking) {
        self.tables.lock().unwrap().restockings.push(restocking);
    }

    pub fn insert_waste(&self, waste: WasteSpoilage) {
        self.tables.lock().unwrap().waste.push(waste);
    }

    pub fn insert_transfer(&self, transfer: BranchTransfer) {
        self.tables.lock().unwrap().transfers.push(transfer);
    }

    pub fn insert_opening(&self, row: OpeningStock) {
        self.tables.lock().unwrap().opening.insert(row.key(), row);
    }

    pub fn insert_closing(&self, row: ClosingStock) {
        self.tables.lock().unwrap().closing.insert(row.key(), row);
    }

    pub fn opening(&self, key: StockKey) -> Option<OpeningStock> {
        self.tables.lock().unwrap().opening.get(&key).cloned()
    }

    pub fn closing(&self, key: StockKey) -> Option<ClosingStock> {
        self.tables.lock().unwrap().closing.get(&key).cloned()
    }

    pub fn opening_count(&self) -> usize {
        self.tables.lock().unwrap().opening.len()
    }

    pub fn closing_count(&self) -> usize {
        self.tables.lock().unwrap().closing.len()
    }

    fn record_write(&self) {
        *self.writes.lock().unwrap() += 1;
    }
}

#[async_trait]
impl StockStore for InMemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn list_items(&self, scope: &Scope) -> AppResult<Vec<Item>> {
        let tables = self.tables.lock().unwrap();
        let mut items: Vec<Item> = tables
            .items
            .iter()
            .filter(|i| i.organization_id == scope.organization_id)
            .filter(|i| i.visible_in_branch(scope.branch_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn find_item(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<Option<Item>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .items
            .iter()
            .find(|i| i.id == item_id && i.organization_id == organization_id)
            .cloned())
    }

    async fn opening_stock(&self, scope: &Scope, date: NaiveDate) -> AppResult<Vec<OpeningStock>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .opening
            .values()
            .filter(|o| o.date == date && in_scope(scope, o.organization_id, o.branch_id))
            .cloned()
            .collect())
    }

    async fn closing_stock(&self, scope: &Scope, date: NaiveDate) -> AppResult<Vec<ClosingStock>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .closing
            .values()
            .filter(|c| c.date == date && in_scope(scope, c.organization_id, c.branch_id))
            .cloned()
            .collect())
    }

    async fn day_activity(&self, scope: &Scope, date: NaiveDate) -> AppResult<DayActivity> {
        let tables = self.tables.lock().unwrap();
        Ok(DayActivity {
            sales: tables
                .sales
                .iter()
                .filter(|s| s.date == date && in_scope(scope, s.organization_id, s.branch_id))
                .cloned()
                .collect(),
            restockings: tables
                .restockings
                .iter()
                .filter(|r| r.date == date && in_scope(scope, r.organization_id, r.branch_id))
                .cloned()
                .collect(),
            waste: tables
                .waste
                .iter()
                .filter(|w| w.date == date && in_scope(scope, w.organization_id, w.branch_id))
                .cloned()
                .collect(),
            transfers: tables
                .transfers
                .iter()
                .filter(|t| t.date == date && t.organization_id == scope.organization_id)
                .filter(|t| {
                    scope.branch_id.map_or(true, |b| {
                        t.from_branch_id == b || t.to_branch_id == b
                    })
                })
                .cloned()
                .collect(),
        })
    }

    async fn upsert_opening_stock(&self, rows: &[OpeningStockUpsert]) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        for row in rows {
            let id = tables
                .opening
                .get(&row.key())
                .map(|existing| existing.id)
                .unwrap_or_else(Uuid::new_v4);
            tables.opening.insert(
                row.key(),
                OpeningStock {
                    id,
                    item_id: row.item_id,
                    organization_id: row.organization_id,
                    branch_id: row.branch_id,
                    date: row.date,
                    quantity: row.quantity,
                    cost_price: row.cost_price,
                    selling_price: row.selling_price,
                    is_manual: row.is_manual,
                    notes: row.notes.clone(),
                },
            );
        }
        drop(tables);
        self.record_write();
        Ok(())
    }

    async fn upsert_closing_stock(&self, rows: &[ClosingStockUpsert]) -> AppResult<()> {
        let fail_on = *self.fail_closing_on.lock().unwrap();
        if let Some(date) = fail_on {
            if rows.iter().any(|r| r.date == date) {
                return Err(AppError::Internal(format!(
                    "simulated write failure on {}",
                    date
                )));
            }
        }

        let mut tables = self.tables.lock().unwrap();
        for row in rows {
            let id = tables
                .closing
                .get(&row.key())
                .map(|existing| existing.id)
                .unwrap_or_else(Uuid::new_v4);
            tables.closing.insert(
                row.key(),
                ClosingStock {
                    id,
                    item_id: row.item_id,
                    organization_id: row.organization_id,
                    branch_id: row.branch_id,
                    date: row.date,
                    quantity: row.quantity,
                    notes: row.notes.clone(),
                },
            );
        }
        drop(tables);
        self.record_write();
        Ok(())
    }

    async fn item_has_history(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let tables = self.tables.lock().unwrap();
        let matches = |item: Uuid, org: Uuid| item == item_id && org == organization_id;
        Ok(tables.sales.iter().any(|s| matches(s.item_id, s.organization_id))
            || tables
                .opening
                .values()
                .any(|o| matches(o.item_id, o.organization_id))
            || tables
                .closing
                .values()
                .any(|c| matches(c.item_id, c.organization_id)))
    }

    async fn delete_item(&self, organization_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.items.len();
        tables
            .items
            .retain(|i| !(i.id == item_id && i.organization_id == organization_id));
        let deleted = tables.items.len() < before;
        drop(tables);
        self.record_write();
        Ok(deleted)
    }
}

// ============================================================================
// Identity
// ============================================================================

#[derive(Default)]
pub struct InMemoryIdentity {
    actors: Mutex<HashMap<Uuid, Actor>>,
}

impl InMemoryIdentity {
    pub fn register(&self, actor: Actor) {
        self.actors.lock().unwrap().insert(actor.user_id, actor);
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn resolve(&self, user_id: Uuid) -> AppResult<Actor> {
        self.actors
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("No profile found for this account".to_string()))
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// One organization with two branches, an admin, a manager and a staff
/// member pinned to branch A
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub identity: Arc<InMemoryIdentity>,
    pub today: NaiveDate,
    pub organization_id: Uuid,
    pub branch_a: Uuid,
    pub branch_b: Uuid,
    pub admin: Actor,
    pub manager: Actor,
    pub staff: Actor,
    pub max_cascade_days: u32,
}

impl Fixture {
    pub fn new(today: NaiveDate) -> Self {
        init_tracing();

        let organization_id = Uuid::new_v4();
        let branch_a = Uuid::new_v4();
        let branch_b = Uuid::new_v4();
        let actor = |role: Role, branch_id: Option<Uuid>| Actor {
            user_id: Uuid::new_v4(),
            organization_id,
            branch_id,
            role,
        };

        let admin = actor(Role::Admin, None);
        let manager = actor(Role::BranchManager, Some(branch_a));
        let staff = actor(Role::Staff, Some(branch_a));

        let identity = Arc::new(InMemoryIdentity::default());
        identity.register(admin.clone());
        identity.register(manager.clone());
        identity.register(staff.clone());

        Self {
            store: Arc::new(InMemoryStore::new()),
            identity,
            today,
            organization_id,
            branch_a,
            branch_b,
            admin,
            manager,
            staff,
            max_cascade_days: 366,
        }
    }

    pub fn branch_scope(&self, branch_id: Uuid) -> Scope {
        Scope::for_branch(self.organization_id, branch_id)
    }

    pub fn org_scope(&self) -> Scope {
        Scope::organization_wide(self.organization_id)
    }

    fn clock(&self) -> Arc<FixedClock> {
        Arc::new(FixedClock(self.today))
    }

    pub fn report_service(&self) -> ReportService {
        ReportService::new(self.store.clone(), self.clock())
    }

    pub fn cascade_service(&self) -> CascadeService {
        CascadeService::new(
            self.store.clone(),
            self.clock(),
            OrganizationLocks::new(),
            self.max_cascade_days,
        )
    }

    pub fn stock_service(&self) -> StockService {
        StockService::new(
            self.store.clone(),
            self.clock(),
            OrganizationLocks::new(),
            self.max_cascade_days,
        )
    }

    pub fn item_service(&self) -> ItemService {
        ItemService::new(self.store.clone())
    }

    pub fn app_state(&self) -> AppState {
        let config = Config {
            environment: "test".to_string(),
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 1,
                min_connections: 1,
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
            },
            reconciliation: ReconciliationConfig {
                max_cascade_days: self.max_cascade_days,
            },
        };
        AppState::new(config, self.store.clone(), self.identity.clone(), self.clock())
    }

    pub fn token_for(&self, actor: &Actor) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: actor.user_id.to_string(),
            exp: now + 3600,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .unwrap()
    }

    // ------------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------------

    pub fn item(&self, name: &str, branch_id: Option<Uuid>) -> Item {
        let item = Item {
            id: Uuid::new_v4(),
            organization_id: self.organization_id,
            branch_id,
            name: name.to_string(),
            unit: "kg".to_string(),
            low_stock_threshold: dec("5"),
            cost_price: dec("2.00"),
            selling_price: dec("3.50"),
        };
        self.store.insert_item(item.clone());
        item
    }

    pub fn key(&self, item: &Item, branch_id: Option<Uuid>, date: NaiveDate) -> StockKey {
        StockKey {
            item_id: item.id,
            date,
            organization_id: self.organization_id,
            branch_id,
        }
    }

    pub fn sale(&self, item: &Item, branch_id: Option<Uuid>, date: NaiveDate, qty: &str) {
        self.store.insert_sale(Sale {
            id: Uuid::new_v4(),
            item_id: item.id,
            organization_id: self.organization_id,
            branch_id,
            date,
            quantity: dec(qty),
            price_per_unit: item.selling_price,
            total_price: item.selling_price * dec(qty),
        });
    }

    pub fn restock(&self, item: &Item, branch_id: Option<Uuid>, date: NaiveDate, qty: &str) {
        self.store.insert_restocking(Restocking {
            id: Uuid::new_v4(),
            item_id: item.id,
            organization_id: self.organization_id,
            branch_id,
            date,
            quantity: dec(qty),
            cost_price: Some(item.cost_price),
            selling_price: Some(item.selling_price),
        });
    }

    pub fn waste(&self, item: &Item, branch_id: Option<Uuid>, date: NaiveDate, qty: &str) {
        self.store.insert_waste(WasteSpoilage {
            id: Uuid::new_v4(),
            item_id: item.id,
            organization_id: self.organization_id,
            branch_id,
            date,
            quantity: dec(qty),
            reason: Some("spoiled".to_string()),
        });
    }

    pub fn transfer(&self, item: &Item, from: Uuid, to: Uuid, date: NaiveDate, qty: &str) {
        self.store.insert_transfer(BranchTransfer {
            id: Uuid::new_v4(),
            item_id: item.id,
            organization_id: self.organization_id,
            from_branch_id: from,
            to_branch_id: to,
            date,
            quantity: dec(qty),
        });
    }

    pub fn closing(&self, item: &Item, branch_id: Option<Uuid>, date: NaiveDate, qty: &str) {
        self.store.insert_closing(ClosingStock {
            id: Uuid::new_v4(),
            item_id: item.id,
            organization_id: self.organization_id,
            branch_id,
            date,
            quantity: dec(qty),
            notes: None,
        });
    }

    /// Opening stock entered by hand
    pub fn opening(
        &self,
        item: &Item,
        branch_id: Option<Uuid>,
        date: NaiveDate,
        qty: &str,
        prices: Option<(&str, &str)>,
    ) {
        self.opening_row(item, branch_id, date, qty, prices, true);
    }

    /// Opening stock written by a carry-forward or an earlier cascade
    pub fn carried_opening(
        &self,
        item: &Item,
        branch_id: Option<Uuid>,
        date: NaiveDate,
        qty: &str,
        prices: Option<(&str, &str)>,
    ) {
        self.opening_row(item, branch_id, date, qty, prices, false);
    }

    fn opening_row(
        &self,
        item: &Item,
        branch_id: Option<Uuid>,
        date: NaiveDate,
        qty: &str,
        prices: Option<(&str, &str)>,
        is_manual: bool,
    ) {
        self.store.insert_opening(OpeningStock {
            id: Uuid::new_v4(),
            item_id: item.id,
            organization_id: self.organization_id,
            branch_id,
            date,
            quantity: dec(qty),
            cost_price: prices.map(|(cost, _)| dec(cost)),
            selling_price: prices.map(|(_, selling)| dec(selling)),
            is_manual,
            notes: None,
        });
    }
}
