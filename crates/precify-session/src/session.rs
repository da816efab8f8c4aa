//! # Session: Explicit Command Handlers
//!
//! One `Session` per open document. It owns the catalog, the field registry
//! and the store handle, and replaces implicit rerun-the-world control flow
//! with explicit commands.
//!
//! ## Command Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Command Lifecycle                          │
//! │                                                                         │
//! │  Caller ──► command (add_item / edit_item / reconcile_grid / ...)      │
//! │                │                                                        │
//! │                ▼                                                        │
//! │        1. Apply to catalog  ──── rejected? ──► Err, nothing changed    │
//! │                │                                                        │
//! │                ▼                                                        │
//! │        2. persist_if_changed()                                         │
//! │           fingerprint == last persisted?  → skip upload                │
//! │           differs?                        → encode + upload            │
//! │              ├─ success   → new revision + fingerprint baseline        │
//! │              ├─ conflict  → re-fetch token ONCE, retry upload          │
//! │              └─ failure   → warn!, keep old baseline so the NEXT       │
//! │                             mutation retries; memory stays truth       │
//! │                │                                                        │
//! │                ▼                                                        │
//! │        3. CommandOutcome { persisted, warning } ──► caller redraws     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence is an idempotent side effect of state convergence: callers
//! never ask for a save, they issue commands.

use precify_core::catalog::Catalog;
use precify_core::error::CoreError;
use precify_core::fields::{self, EntityKind, FieldDef, FieldRegistry, FieldValue};
use precify_core::fingerprint::{fingerprint_supplies, Fingerprint};
use precify_core::types::{ItemDraft, ItemPatch, MarginPolicy, Supply};
use precify_core::validation::validate_item_name;
use precify_core::DEFAULT_FIXED_MARGIN_PCT;
use precify_store::codec;
use precify_store::error::{StoreError, StoreResult};
use precify_store::store::ItemStore;
use tracing::{debug, info, warn};

use crate::error::SessionResult;

// =============================================================================
// Command Outcome
// =============================================================================

/// What a command did beyond its in-memory effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Whether a write-through happened.
    pub persisted: bool,
    /// Set when persistence was due but failed; the in-memory state is still
    /// valid and the next mutation will retry.
    pub warning: Option<String>,
}

impl CommandOutcome {
    fn unchanged() -> Self {
        CommandOutcome {
            persisted: false,
            warning: None,
        }
    }

    fn persisted() -> Self {
        CommandOutcome {
            persisted: true,
            warning: None,
        }
    }

    fn warned(message: String) -> Self {
        CommandOutcome {
            persisted: false,
            warning: Some(message),
        }
    }

    /// Combines the outcomes of the item and supply write-throughs.
    fn merged(self, other: CommandOutcome) -> CommandOutcome {
        CommandOutcome {
            persisted: self.persisted || other.persisted,
            warning: self.warning.or(other.warning),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A live editing session over one remote document, optionally paired with
/// a second document for the supply collection.
pub struct Session<S: ItemStore> {
    store: S,
    document_path: String,
    catalog: Catalog,
    registry: FieldRegistry,
    /// Raw materials for composed products. In-memory only unless a supply
    /// document path is configured.
    supplies: Vec<Supply>,
    /// Fingerprint of the last successfully persisted state. `None` until
    /// the first load or write.
    last_fingerprint: Option<Fingerprint>,
    /// Revision token to echo with the next upload.
    revision: Option<String>,
    supplies_path: Option<String>,
    last_supplies_fingerprint: Option<Fingerprint>,
    supplies_revision: Option<String>,
}

impl<S: ItemStore> Session<S> {
    /// Opens a session against `document_path` with the default fixed margin.
    pub fn new(store: S, document_path: impl Into<String>) -> Self {
        Session {
            store,
            document_path: document_path.into(),
            catalog: Catalog::new(MarginPolicy::Fixed {
                pct: DEFAULT_FIXED_MARGIN_PCT,
            }),
            registry: FieldRegistry::new(),
            supplies: Vec::new(),
            last_fingerprint: None,
            revision: None,
            supplies_path: None,
            last_supplies_fingerprint: None,
            supplies_revision: None,
        }
    }

    /// Pairs the session with a supply document at `path`. The supply
    /// collection then loads and persists alongside the item document,
    /// with its own fingerprint baseline and revision token.
    pub fn with_supplies_document(mut self, path: impl Into<String>) -> Self {
        self.supplies_path = Some(path.into());
        self
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn supplies(&self) -> &[Supply] {
        &self.supplies
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Fetches the document and seeds the catalog from it.
    ///
    /// Sets the fingerprint baseline WITHOUT writing: rendering what was
    /// loaded must never cause an upload.
    pub async fn load(&mut self) -> SessionResult<()> {
        let document = self.store.fetch(&self.document_path).await?;
        let drafts = codec::decode(&document.content)?;

        info!(
            path = %self.document_path,
            items = drafts.len(),
            exists = document.exists(),
            "loading session"
        );

        self.catalog.bulk_replace(drafts);
        self.revision = document.revision;
        self.last_fingerprint = Some(self.catalog.fingerprint().clone());

        if let Some(path) = &self.supplies_path {
            let document = self.store.fetch(path).await?;
            self.supplies = codec::decode_supplies(&document.content)?;
            self.supplies_revision = document.revision;
            self.last_supplies_fingerprint = Some(fingerprint_supplies(&self.supplies));
        }
        Ok(())
    }

    // =========================================================================
    // Item Commands
    // =========================================================================

    pub async fn add_item(&mut self, mut draft: ItemDraft) -> SessionResult<CommandOutcome> {
        // Every record carries every declared field from birth.
        for def in self.registry.fields_for(EntityKind::Items) {
            draft
                .extras
                .entry(def.name.clone())
                .or_insert(FieldValue::Empty);
        }

        info!(item = %draft.name, "add item");
        self.catalog.add(draft)?;
        Ok(self.persist_if_changed().await)
    }

    pub async fn edit_item(
        &mut self,
        name: &str,
        patch: ItemPatch,
    ) -> SessionResult<CommandOutcome> {
        info!(item = %name, "edit item");
        let changed = self.catalog.edit(name, patch)?;
        if !changed {
            return Ok(CommandOutcome::unchanged());
        }
        Ok(self.persist_if_changed().await)
    }

    pub async fn delete_item(&mut self, name: &str) -> SessionResult<CommandOutcome> {
        let removed = self.catalog.delete(name)?;
        info!(item = %name, removed, "delete item");
        Ok(self.persist_if_changed().await)
    }

    pub async fn bulk_replace(&mut self, rows: Vec<ItemDraft>) -> SessionResult<CommandOutcome> {
        info!(rows = rows.len(), "bulk replace");
        self.catalog.bulk_replace(rows);
        Ok(self.persist_if_changed().await)
    }

    pub async fn reconcile_grid(&mut self, rows: Vec<ItemDraft>) -> SessionResult<CommandOutcome> {
        self.catalog.reconcile_grid(rows)?;
        Ok(self.persist_if_changed().await)
    }

    // =========================================================================
    // Pool & Policy Commands
    // =========================================================================

    pub async fn set_pool(
        &mut self,
        freight_total: f64,
        misc_costs_total: f64,
    ) -> SessionResult<CommandOutcome> {
        info!(freight_total, misc_costs_total, "set cost pool");
        self.catalog.set_pool(freight_total, misc_costs_total);
        Ok(self.persist_if_changed().await)
    }

    pub async fn set_policy(&mut self, policy: MarginPolicy) -> SessionResult<CommandOutcome> {
        self.catalog.set_policy(policy);
        Ok(self.persist_if_changed().await)
    }

    // =========================================================================
    // Supply Commands
    // =========================================================================

    pub async fn add_supply(&mut self, mut supply: Supply) -> SessionResult<CommandOutcome> {
        validate_item_name(&supply.name).map_err(CoreError::from)?;
        supply.name = supply.name.trim().to_string();
        for def in self.registry.fields_for(EntityKind::Supplies) {
            supply
                .extras
                .entry(def.name.clone())
                .or_insert(FieldValue::Empty);
        }

        info!(supply = %supply.name, "add supply");
        self.supplies.push(supply);
        Ok(self.persist_supplies_if_changed().await)
    }

    /// Removes every supply with the given name (duplicates are legal, same
    /// as items).
    pub async fn delete_supply(&mut self, name: &str) -> SessionResult<CommandOutcome> {
        let before = self.supplies.len();
        self.supplies.retain(|s| s.name != name);
        let removed = before - self.supplies.len();
        if removed == 0 {
            return Err(CoreError::SupplyNotFound(name.to_string()).into());
        }

        info!(supply = %name, removed, "delete supply");
        Ok(self.persist_supplies_if_changed().await)
    }

    // =========================================================================
    // Field-Schema Commands
    // =========================================================================

    pub async fn add_field(&mut self, mut def: FieldDef) -> SessionResult<CommandOutcome> {
        // The registry stores the trimmed name; canonicalize here so the
        // collection back-fills use the exact same key.
        def.name = def.name.trim().to_string();
        let name = def.name.clone();
        let scope = def.scope;

        info!(field = %name, scope = %scope.label(), "add field");
        self.registry.add(def)?;
        if scope.covers(EntityKind::Items) {
            self.catalog.field_added(&name);
        }
        if scope.covers(EntityKind::Supplies) {
            fields::backfill_field(&mut self.supplies, &name);
        }

        let outcome = self.persist_if_changed().await;
        Ok(outcome.merged(self.persist_supplies_if_changed().await))
    }

    pub async fn rename_field(
        &mut self,
        old_name: &str,
        new_name: &str,
    ) -> SessionResult<CommandOutcome> {
        let new_name = new_name.trim();
        info!(from = %old_name, to = %new_name, "rename field");
        let scope = self.registry.rename(old_name, new_name)?;
        if scope.covers(EntityKind::Items) {
            self.catalog.field_renamed(old_name, new_name);
        }
        if scope.covers(EntityKind::Supplies) {
            fields::rename_field_values(&mut self.supplies, old_name, new_name);
        }

        let outcome = self.persist_if_changed().await;
        Ok(outcome.merged(self.persist_supplies_if_changed().await))
    }

    pub async fn delete_field(&mut self, name: &str) -> SessionResult<CommandOutcome> {
        info!(field = %name, "delete field");
        let scope = self.registry.remove(name)?;
        if scope.covers(EntityKind::Items) {
            self.catalog.field_removed(name);
        }
        if scope.covers(EntityKind::Supplies) {
            fields::strip_field(&mut self.supplies, name);
        }

        let outcome = self.persist_if_changed().await;
        Ok(outcome.merged(self.persist_supplies_if_changed().await))
    }

    // =========================================================================
    // Write-Through
    // =========================================================================

    /// Uploads when (and only when) the fingerprint moved off the baseline.
    async fn persist_if_changed(&mut self) -> CommandOutcome {
        let current = self.catalog.fingerprint().clone();
        if self.last_fingerprint.as_ref() == Some(&current) {
            debug!("fingerprint unchanged, skipping write-through");
            return CommandOutcome::unchanged();
        }

        let columns = self.dynamic_columns();
        let content = match codec::encode(self.catalog.priced(), &columns) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "could not encode document; keeping in-memory state");
                return CommandOutcome::warned(err.to_string());
            }
        };

        let uploaded = upload_with_conflict_retry(
            &self.store,
            &self.document_path,
            &content,
            &mut self.revision,
        )
        .await;

        match uploaded {
            Ok(revision) => {
                debug!(path = %self.document_path, revision = %revision, "persisted");
                self.revision = Some(revision);
                self.last_fingerprint = Some(current);
                CommandOutcome::persisted()
            }
            Err(err) => {
                // Baseline stays put so the next mutation retries the write.
                warn!(
                    path = %self.document_path,
                    error = %err,
                    "write-through failed; in-memory state preserved"
                );
                CommandOutcome::warned(err.to_string())
            }
        }
    }

    /// Same write-through discipline for the supply document, when one is
    /// configured. Without a configured path the supply collection lives in
    /// memory only.
    async fn persist_supplies_if_changed(&mut self) -> CommandOutcome {
        let Some(path) = self.supplies_path.clone() else {
            return CommandOutcome::unchanged();
        };

        let current = fingerprint_supplies(&self.supplies);
        if self.last_supplies_fingerprint.as_ref() == Some(&current) {
            debug!("supply fingerprint unchanged, skipping write-through");
            return CommandOutcome::unchanged();
        }

        let columns = self.supply_columns();
        let content = match codec::encode_supplies(&self.supplies, &columns) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "could not encode supply document; keeping in-memory state");
                return CommandOutcome::warned(err.to_string());
            }
        };

        let uploaded = upload_with_conflict_retry(
            &self.store,
            &path,
            &content,
            &mut self.supplies_revision,
        )
        .await;

        match uploaded {
            Ok(revision) => {
                debug!(path = %path, revision = %revision, "persisted supplies");
                self.supplies_revision = Some(revision);
                self.last_supplies_fingerprint = Some(current);
                CommandOutcome::persisted()
            }
            Err(err) => {
                warn!(
                    path = %path,
                    error = %err,
                    "supply write-through failed; in-memory state preserved"
                );
                CommandOutcome::warned(err.to_string())
            }
        }
    }

    /// Column order for the document: declared item fields first (registry
    /// order), then any undeclared extras items still carry, so nothing a
    /// human typed into the document gets dropped on the way back out.
    fn dynamic_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .registry
            .fields_for(EntityKind::Items)
            .iter()
            .map(|d| d.name.clone())
            .collect();

        for item in self.catalog.items() {
            for key in item.extras.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        columns
    }

    /// Same ordering rule for the supply document.
    fn supply_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .registry
            .fields_for(EntityKind::Supplies)
            .iter()
            .map(|d| d.name.clone())
            .collect();

        for supply in &self.supplies {
            for key in supply.extras.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        columns
    }
}

/// One upload, plus at most one retry after refreshing a stale token.
async fn upload_with_conflict_retry<S: ItemStore>(
    store: &S,
    path: &str,
    content: &str,
    revision: &mut Option<String>,
) -> StoreResult<String> {
    let first = store.upload(path, content, revision.as_deref()).await;

    match first {
        Err(StoreError::RevisionConflict { .. }) => {
            warn!(path = %path, "revision conflict, refreshing token");
            let document = store.fetch(path).await?;
            *revision = document.revision.clone();
            store
                .upload(path, content, document.revision.as_deref())
                .await
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
