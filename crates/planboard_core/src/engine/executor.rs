//! Move executor: validated, optimistic, persisted ordering changes.
//!
//! # Responsibility
//! - Own the in-memory item table and the container registry.
//! - Validate move intents (existence, capacity), compute slot rewrites via
//!   the allocator, apply them optimistically, and persist them.
//! - Reconcile memory with the store when a write fails.
//!
//! # Invariants
//! - Rejected operations (`ItemNotFound`, `ContainerNotFound`,
//!   `CapacityExceeded`, ...) never touch the table.
//! - A failed write is always rolled back: touched containers are re-fetched
//!   from the store, or restored from the pre-stage snapshot when the fetch
//!   also fails.
//! - Staged tickets are written and confirmed FIFO per container.

use crate::clock::Clock;
use crate::engine::allocator::{compute_append, compute_insertion, compute_removal, Allocation};
use crate::engine::drag::MoveIntent;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::ContainerRegistry;
use crate::engine::table::ItemTable;
use crate::engine::view::{BoardView, ViewOptions};
use crate::model::container::{Container, ContainerKey};
use crate::model::item::{Item, ItemId, PositionUpdate};
use crate::repo::position_repo::PositionStore;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Result of one applied item operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub item_id: ItemId,
    /// Slot rewrites that were persisted; empty for no-op moves.
    pub changed: Vec<PositionUpdate>,
}

/// Validated, not yet applied ordering change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    item_id: ItemId,
    updates: Vec<PositionUpdate>,
    deleted: bool,
    touched: Vec<ContainerKey>,
}

impl MovePlan {
    fn new(item_id: ItemId, updates: Vec<PositionUpdate>, touched: Vec<ContainerKey>) -> Self {
        let touched: BTreeSet<ContainerKey> = touched.into_iter().collect();
        Self {
            item_id,
            updates,
            deleted: false,
            touched: touched.into_iter().collect(),
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn updates(&self) -> &[PositionUpdate] {
        &self.updates
    }

    /// Containers whose order this plan rewrites.
    pub fn touched(&self) -> &[ContainerKey] {
        &self.touched
    }

    pub fn is_delete(&self) -> bool {
        self.deleted
    }

    pub fn is_noop(&self) -> bool {
        !self.deleted && self.updates.is_empty()
    }
}

/// Handle for a staged (tentatively applied) plan awaiting persistence.
#[derive(Debug, PartialEq, Eq)]
pub struct MoveTicket {
    id: u64,
    plan: MovePlan,
}

impl MoveTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn plan(&self) -> &MovePlan {
        &self.plan
    }
}

/// Per-item result of a roll-forward batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollForwardReport {
    /// Items now on the destination day, in their new order.
    pub moved: Vec<ItemId>,
    /// Items left on the source day because their write failed.
    pub failed: Vec<ItemId>,
}

impl RollForwardReport {
    fn absorb(&mut self, other: RollForwardReport) {
        self.moved.extend(other.moved);
        self.failed.extend(other.failed);
    }
}

#[derive(Debug)]
struct PendingEntry {
    touched: Vec<ContainerKey>,
    snapshot: Vec<Item>,
    persisted: bool,
}

/// FIFO queues of staged tickets, one per touched container.
#[derive(Debug, Default)]
struct PendingLedger {
    entries: BTreeMap<u64, PendingEntry>,
    queues: BTreeMap<ContainerKey, VecDeque<u64>>,
}

impl PendingLedger {
    fn enqueue(&mut self, id: u64, entry: PendingEntry) {
        for key in &entry.touched {
            self.queues.entry(key.clone()).or_default().push_back(id);
        }
        self.entries.insert(id, entry);
    }

    fn is_head(&self, id: u64) -> bool {
        match self.entries.get(&id) {
            Some(entry) => entry
                .touched
                .iter()
                .all(|key| self.queues.get(key).and_then(|q| q.front()) == Some(&id)),
            None => false,
        }
    }

    /// A ticket may be written once every older ticket sharing one of its
    /// containers has been written.
    fn is_writable(&self, id: u64) -> bool {
        let Some(entry) = self.entries.get(&id) else {
            return false;
        };
        entry.touched.iter().all(|key| {
            self.queues.get(key).is_some_and(|queue| {
                queue
                    .iter()
                    .take_while(|queued| **queued != id)
                    .all(|older| self.entries.get(older).is_some_and(|e| e.persisted))
            })
        })
    }

    fn mark_persisted(&mut self, id: u64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.persisted = true;
        }
    }

    fn is_persisted(&self, id: u64) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.persisted)
    }

    fn remove(&mut self, id: u64) -> Option<PendingEntry> {
        let entry = self.entries.remove(&id)?;
        for key in &entry.touched {
            if let Some(queue) = self.queues.get_mut(key) {
                queue.retain(|queued| *queued != id);
                if queue.is_empty() {
                    self.queues.remove(key);
                }
            }
        }
        Some(entry)
    }

    /// Removes `id` and every ticket queued behind it on any shared
    /// container, transitively. Returned newest first.
    fn remove_with_followers(&mut self, id: u64) -> Vec<(u64, PendingEntry)> {
        let mut doomed = BTreeSet::from([id]);
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            let Some(entry) = self.entries.get(&current) else {
                continue;
            };
            for key in &entry.touched {
                if let Some(queue) = self.queues.get(key) {
                    for queued in queue.iter().filter(|queued| **queued > current) {
                        if doomed.insert(*queued) {
                            frontier.push(*queued);
                        }
                    }
                }
            }
        }

        doomed
            .into_iter()
            .rev()
            .filter_map(|doomed_id| self.remove(doomed_id).map(|entry| (doomed_id, entry)))
            .collect()
    }

    fn busy_container(&self, keys: &[ContainerKey]) -> Option<ContainerKey> {
        keys.iter().find(|key| self.queues.contains_key(*key)).cloned()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies move intents to the owned item table and persists them.
pub struct MoveExecutor<S: PositionStore> {
    store: S,
    items: ItemTable,
    containers: ContainerRegistry,
    pending: PendingLedger,
    next_ticket: u64,
    view_options: ViewOptions,
}

impl<S: PositionStore> MoveExecutor<S> {
    /// Loads every container and item from `store`.
    pub fn load(store: S) -> EngineResult<Self> {
        let containers = ContainerRegistry::from_containers(store.load_containers()?);
        let items = ItemTable::from_items(store.load_all_items()?);
        info!(
            "event=engine_load module=engine status=ok containers={} items={}",
            containers.len(),
            items.len()
        );
        Ok(Self {
            store,
            items,
            containers,
            pending: PendingLedger::default(),
            next_ticket: 1,
            view_options: ViewOptions::default(),
        })
    }

    pub fn with_view_options(mut self, options: ViewOptions) -> Self {
        self.view_options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn items(&self) -> &ItemTable {
        &self.items
    }

    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    /// Returns whether any staged ticket is still awaiting confirm/rollback.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Derives the grouped, sorted rendering view.
    pub fn view(&self) -> BoardView {
        BoardView::derive(&self.items, &self.containers, self.view_options)
    }

    /// Registers (or updates) a long-lived container, appended to the end
    /// of the container order when new.
    pub fn register_container(&mut self, mut container: Container) -> EngineResult<Container> {
        if let ContainerKey::Day { .. } = container.key {
            return Err(EngineError::ContainerNotFound(container.key));
        }
        container.position = match self.containers.get(&container.key) {
            Some(existing) => existing.position,
            None => self.containers.next_position(),
        };
        self.store.save_container(&container)?;
        self.containers.register(container.clone());
        Ok(container)
    }

    /// Creates an item at the end of `container`.
    pub fn create_item(
        &mut self,
        container: ContainerKey,
        title: impl Into<String>,
    ) -> EngineResult<Item> {
        let title = normalize_title(title.into())?;
        let target = self.resolve(&container)?;
        self.ensure_capacity(&target, None)?;

        let mut item = Item::new(container, title);
        item.position = self.items.ordered_in(&item.container).len() as i64;
        self.store.insert_item(&item)?;
        self.items.insert(item.clone());
        info!(
            "event=item_create module=engine status=ok item={} container={} position={}",
            item.id, item.container, item.position
        );
        Ok(item)
    }

    /// Renames one item. Ordering is untouched.
    pub fn rename_item(&mut self, item_id: ItemId, title: impl Into<String>) -> EngineResult<Item> {
        let title = normalize_title(title.into())?;
        let mut item = self.item(item_id)?.clone();
        item.title = title;
        self.store.update_item(&item)?;
        self.items.insert(item.clone());
        Ok(item)
    }

    /// Marks one item completed or active again.
    ///
    /// Re-activating is capacity checked against the item's own container.
    pub fn set_completed(&mut self, item_id: ItemId, completed: bool) -> EngineResult<Item> {
        let mut item = self.item(item_id)?.clone();
        if item.completed == completed {
            return Ok(item);
        }
        if !completed {
            let container = self.resolve(&item.container)?;
            self.ensure_capacity(&container, Some(item_id))?;
        }
        item.completed = completed;
        self.store.update_item(&item)?;
        self.items.insert(item.clone());
        Ok(item)
    }

    /// Moves an item to `new_index` within its current container.
    pub fn reorder_within_container(
        &mut self,
        item_id: ItemId,
        new_index: usize,
    ) -> EngineResult<MoveOutcome> {
        let plan = self.plan_reorder(item_id, new_index)?;
        self.commit("item_reorder", plan)
    }

    /// Moves an item into `target` at `target_index`, all-or-nothing.
    pub fn move_to_container(
        &mut self,
        item_id: ItemId,
        target: ContainerKey,
        target_index: usize,
    ) -> EngineResult<MoveOutcome> {
        let plan = self.plan_move(item_id, target, target_index)?;
        self.commit("item_move", plan)
    }

    /// Moves a day-scheduled item to the same lane on `new_date`, appended.
    pub fn move_to_day(&mut self, item_id: ItemId, new_date: NaiveDate) -> EngineResult<MoveOutcome> {
        let plan = self.plan_move_to_day(item_id, new_date)?;
        self.commit("item_move_day", plan)
    }

    /// Deletes an item and closes the gap it leaves.
    pub fn delete_item(&mut self, item_id: ItemId) -> EngineResult<MoveOutcome> {
        let plan = self.plan_delete(item_id)?;
        self.commit("item_delete", plan)
    }

    /// Applies a drag-session intent.
    ///
    /// Stale references trigger a full resync before the error is returned.
    pub fn apply_intent(&mut self, intent: MoveIntent) -> EngineResult<Option<MoveOutcome>> {
        let result = match intent {
            MoveIntent::MoveItem {
                item_id,
                target,
                index,
            } => self.move_to_container(item_id, target, index).map(Some),
            MoveIntent::ReorderContainer { key, index } => {
                self.reorder_container(&key, index).map(|_| None)
            }
        };

        if let Err(err) = &result {
            if err.is_stale_reference() {
                warn!("event=intent_stale module=engine status=rejected error={err}");
                if let Err(resync_err) = self.resync_all() {
                    warn!("event=resync module=engine status=error error={resync_err}");
                }
            }
        }
        result
    }

    /// Moves a registered container to `new_index` among its siblings.
    pub fn reorder_container(
        &mut self,
        key: &ContainerKey,
        new_index: usize,
    ) -> EngineResult<Vec<Container>> {
        let container = self
            .containers
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::ContainerNotFound(key.clone()))?;
        let allocation = compute_insertion(&self.containers.ordered(), container, new_index);
        if allocation.is_noop() {
            return Ok(Vec::new());
        }

        let snapshot = self.containers.clone();
        self.containers.apply_positions(&allocation.changed);
        if let Err(err) = self.store.save_container_positions(&allocation.changed) {
            warn!("event=container_reorder module=engine status=error container={key} error={err}");
            self.containers = match self.store.load_containers() {
                Ok(fresh) => ContainerRegistry::from_containers(fresh),
                Err(_) => snapshot,
            };
            return Err(EngineError::PersistenceFailure(err));
        }
        info!(
            "event=container_reorder module=engine status=ok container={key} changed={}",
            allocation.changed.len()
        );
        Ok(allocation.changed)
    }

    /// Moves every incomplete item on `from` to the matching lanes on `to`,
    /// appended in their current relative order.
    ///
    /// Atomic stores get one all-or-nothing batch. Stores without atomic
    /// batches get one best-effort pass; failures are listed in the report
    /// and their containers are resynced.
    pub fn bulk_roll_forward(
        &mut self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<RollForwardReport> {
        if from == to {
            return Ok(RollForwardReport::default());
        }
        let sources = self.day_keys_on(from);
        let targets: Vec<ContainerKey> = sources.iter().filter_map(|key| key.on_day(to)).collect();
        if let Some(busy) = self
            .pending
            .busy_container(&sources)
            .or_else(|| self.pending.busy_container(&targets))
        {
            return Err(EngineError::ContainerBusy(busy));
        }
        if self.store.supports_atomic_batches() {
            self.roll_forward_atomic(&sources, to)
        } else {
            Ok(self.roll_forward_per_row(&sources, to))
        }
    }

    /// Rolls every day before `clock.today()` onto today, oldest day first.
    ///
    /// Each day is its own batch. A day whose batch fails keeps its items,
    /// which are listed in `failed`; later days are still attempted.
    pub fn roll_forward_overdue(&mut self, clock: &impl Clock) -> RollForwardReport {
        let today = clock.today();
        let overdue: BTreeSet<NaiveDate> = self
            .items
            .iter()
            .filter(|item| item.is_active())
            .filter_map(|item| item.container.date())
            .filter(|date| *date < today)
            .collect();

        let mut report = RollForwardReport::default();
        for date in overdue {
            let leaving: Vec<ItemId> = self
                .items
                .iter()
                .filter(|item| item.is_active() && item.container.date() == Some(date))
                .map(|item| item.id)
                .collect();
            match self.bulk_roll_forward(date, today) {
                Ok(day_report) => report.absorb(day_report),
                Err(err) => {
                    warn!(
                        "event=roll_forward module=engine status=error date={date} items={} error={err}",
                        leaving.len()
                    );
                    report.failed.extend(leaving);
                }
            }
        }
        report
    }

    /// Replaces the in-memory rows of `keys` with a fresh store fetch.
    pub fn resync(&mut self, keys: &[ContainerKey]) -> EngineResult<()> {
        let mut fresh = Vec::new();
        for key in keys {
            fresh.extend(self.store.load_container(key)?);
        }
        self.items.replace_containers(keys, fresh);
        info!("event=resync module=engine status=ok containers={}", keys.len());
        Ok(())
    }

    /// Reloads every container and item from the store.
    pub fn resync_all(&mut self) -> EngineResult<()> {
        let containers = self.store.load_containers()?;
        let items = self.store.load_all_items()?;
        self.containers = ContainerRegistry::from_containers(containers);
        self.items = ItemTable::from_items(items);
        info!(
            "event=resync module=engine status=ok containers=all items={}",
            self.items.len()
        );
        Ok(())
    }

    /// Plans a same-container reorder without applying it.
    pub fn plan_reorder(&self, item_id: ItemId, new_index: usize) -> EngineResult<MovePlan> {
        let item = self.item(item_id)?.clone();
        let key = item.container.clone();
        let allocation = compute_insertion(&self.items.ordered_in(&key), item, new_index);
        Ok(MovePlan::new(item_id, to_updates(&allocation), vec![key]))
    }

    /// Plans a move into `target`; delegates to a reorder when `target` is
    /// the item's current container.
    pub fn plan_move(
        &self,
        item_id: ItemId,
        target: ContainerKey,
        target_index: usize,
    ) -> EngineResult<MovePlan> {
        self.plan_relocation(item_id, target, target_index, true)
    }

    /// Plans a day move, appending to the destination lane.
    ///
    /// Rescheduling is never capacity checked, even into a limited lane.
    pub fn plan_move_to_day(&self, item_id: ItemId, new_date: NaiveDate) -> EngineResult<MovePlan> {
        let item = self.item(item_id)?;
        let target = item
            .container
            .on_day(new_date)
            .ok_or(EngineError::NotDayBucket(item_id))?;
        if target == item.container {
            return Ok(MovePlan::new(item_id, Vec::new(), vec![target]));
        }
        self.plan_relocation(item_id, target, usize::MAX, false)
    }

    /// Plans a delete plus renumbering of the followers.
    pub fn plan_delete(&self, item_id: ItemId) -> EngineResult<MovePlan> {
        let key = self.item(item_id)?.container.clone();
        let removal = compute_removal(&self.items.ordered_in(&key), &item_id);
        let mut plan = MovePlan::new(item_id, to_updates(&removal), vec![key]);
        plan.deleted = true;
        Ok(plan)
    }

    /// Tentatively applies `plan` to memory and queues it for persistence.
    pub fn stage(&mut self, plan: MovePlan) -> MoveTicket {
        let id = self.next_ticket;
        self.next_ticket += 1;

        let snapshot = self.items.snapshot_of(&plan.touched);
        self.items.apply_updates(&plan.updates);
        if plan.deleted {
            self.items.remove(plan.item_id);
        }
        self.pending.enqueue(
            id,
            PendingEntry {
                touched: plan.touched.clone(),
                snapshot,
                persisted: false,
            },
        );
        MoveTicket { id, plan }
    }

    /// Writes a staged ticket to the store.
    ///
    /// Every older ticket on the same containers must already be written;
    /// otherwise `StaleTicket` is returned and the store is not touched.
    pub fn persist(&mut self, ticket: &MoveTicket) -> EngineResult<()> {
        if !self.pending.is_writable(ticket.id) {
            return Err(EngineError::StaleTicket(ticket.id));
        }
        let plan = &ticket.plan;
        let result = if plan.deleted {
            self.store.delete_item(plan.item_id, &plan.updates)
        } else {
            self.store.save_item_positions(&plan.updates)
        };
        result.map_err(EngineError::PersistenceFailure)?;
        self.pending.mark_persisted(ticket.id);
        Ok(())
    }

    /// Accepts a persisted ticket. Must be the oldest pending ticket on every
    /// container it touches.
    pub fn confirm(&mut self, ticket: &MoveTicket) -> EngineResult<()> {
        if !self.pending.is_head(ticket.id) || !self.pending.is_persisted(ticket.id) {
            return Err(EngineError::StaleTicket(ticket.id));
        }
        self.pending.remove(ticket.id);
        Ok(())
    }

    /// Reverts a ticket whose write failed, plus every later ticket queued on
    /// the same containers.
    pub fn rollback(&mut self, ticket: &MoveTicket) {
        let reverted = self.pending.remove_with_followers(ticket.id);
        if reverted.is_empty() {
            return;
        }

        let mut keys = BTreeSet::new();
        for (reverted_id, entry) in &reverted {
            warn!(
                "event=move_rollback module=engine status=ok ticket={reverted_id} containers={}",
                entry.touched.len()
            );
            keys.extend(entry.touched.iter().cloned());
        }
        let keys: Vec<ContainerKey> = keys.into_iter().collect();

        if let Err(err) = self.resync(&keys) {
            // Newest first, so each container ends at its oldest snapshot.
            warn!("event=resync module=engine status=error error={err} fallback=snapshot");
            for (_, entry) in reverted {
                self.items.replace_containers(&entry.touched, entry.snapshot);
            }
        }
    }

    fn commit(&mut self, event: &'static str, plan: MovePlan) -> EngineResult<MoveOutcome> {
        let item_id = plan.item_id;
        if plan.is_noop() {
            return Ok(MoveOutcome {
                item_id,
                changed: Vec::new(),
            });
        }
        if let Some(busy) = self.pending.busy_container(&plan.touched) {
            return Err(EngineError::ContainerBusy(busy));
        }

        let ticket = self.stage(plan);
        match self.persist(&ticket) {
            Ok(()) => {
                self.confirm(&ticket)?;
                info!(
                    "event={event} module=engine status=ok item={item_id} changed={}",
                    ticket.plan.updates.len()
                );
                Ok(MoveOutcome {
                    item_id,
                    changed: ticket.plan.updates,
                })
            }
            Err(err) => {
                warn!("event={event} module=engine status=error item={item_id} error={err}");
                self.rollback(&ticket);
                Err(err)
            }
        }
    }

    fn plan_relocation(
        &self,
        item_id: ItemId,
        target: ContainerKey,
        target_index: usize,
        check_capacity: bool,
    ) -> EngineResult<MovePlan> {
        let item = self.item(item_id)?.clone();
        if item.container == target {
            return self.plan_reorder(item_id, target_index);
        }

        let container = self.resolve(&target)?;
        if check_capacity && item.is_active() {
            self.ensure_capacity(&container, None)?;
        }

        let source = item.container.clone();
        let removal = compute_removal(&self.items.ordered_in(&source), &item_id);
        let mut moving = item;
        moving.container = target.clone();
        let insertion = compute_insertion(&self.items.ordered_in(&target), moving, target_index);

        let mut updates = to_updates(&removal);
        updates.extend(to_updates(&insertion));
        Ok(MovePlan::new(item_id, updates, vec![source, target]))
    }

    fn roll_forward_atomic(
        &mut self,
        sources: &[ContainerKey],
        to: NaiveDate,
    ) -> EngineResult<RollForwardReport> {
        let mut updates = Vec::new();
        let mut touched = Vec::new();
        let mut moved = Vec::new();

        for source in sources {
            let Some(target) = source.on_day(to) else {
                continue;
            };
            let order = self.items.ordered_in(source);
            let (leaving, staying): (Vec<Item>, Vec<Item>) =
                order.into_iter().partition(|item| item.is_active());
            if leaving.is_empty() {
                continue;
            }

            let mut target_order = self.items.ordered_in(&target);
            for mut item in leaving {
                moved.push(item.id);
                item.container = target.clone();
                let allocation = compute_append(&target_order, item);
                updates.extend(to_updates(&allocation));
                target_order = allocation.order;
            }
            let compacted = compute_removal(&staying, &ItemId::nil());
            updates.extend(to_updates(&compacted));
            touched.push(source.clone());
            touched.push(target);
        }

        let Some(first) = moved.first().copied() else {
            return Ok(RollForwardReport::default());
        };
        self.commit("roll_forward", MovePlan::new(first, updates, touched))?;
        Ok(RollForwardReport {
            moved,
            failed: Vec::new(),
        })
    }

    fn roll_forward_per_row(&mut self, sources: &[ContainerKey], to: NaiveDate) -> RollForwardReport {
        let mut report = RollForwardReport::default();
        let mut dirty = BTreeSet::new();

        for source in sources {
            let Some(target) = source.on_day(to) else {
                continue;
            };
            let leaving: Vec<ItemId> = self
                .items
                .ordered_in(source)
                .into_iter()
                .filter(|item| item.is_active())
                .map(|item| item.id)
                .collect();

            for item_id in leaving {
                let update = PositionUpdate {
                    id: item_id,
                    container: target.clone(),
                    position: self.items.ordered_in(&target).len() as i64,
                };
                match self.store.save_item_positions(std::slice::from_ref(&update)) {
                    Ok(()) => {
                        self.items.apply_updates(&[update]);
                        report.moved.push(item_id);
                    }
                    Err(err) => {
                        warn!(
                            "event=roll_forward module=engine status=error item={item_id} error={err}"
                        );
                        report.failed.push(item_id);
                        dirty.insert(source.clone());
                        dirty.insert(target.clone());
                    }
                }
            }

            // Close the gaps left on the source day, one row at a time.
            let compacted = compute_removal(&self.items.ordered_in(source), &ItemId::nil());
            for update in to_updates(&compacted) {
                match self.store.save_item_positions(std::slice::from_ref(&update)) {
                    Ok(()) => self.items.apply_updates(&[update]),
                    Err(_) => {
                        dirty.insert(source.clone());
                    }
                }
            }
        }

        if !dirty.is_empty() {
            let keys: Vec<ContainerKey> = dirty.into_iter().collect();
            if let Err(err) = self.resync(&keys) {
                warn!("event=resync module=engine status=error error={err}");
            }
        }
        info!(
            "event=roll_forward module=engine status=ok mode=per_row moved={} failed={}",
            report.moved.len(),
            report.failed.len()
        );
        report
    }

    fn day_keys_on(&self, date: NaiveDate) -> Vec<ContainerKey> {
        self.items
            .container_keys()
            .into_iter()
            .filter(|key| key.date() == Some(date))
            .collect()
    }

    fn item(&self, item_id: ItemId) -> EngineResult<&Item> {
        self.items
            .get(item_id)
            .ok_or(EngineError::ItemNotFound(item_id))
    }

    fn resolve(&self, key: &ContainerKey) -> EngineResult<Container> {
        self.containers
            .resolve(key)
            .ok_or_else(|| EngineError::ContainerNotFound(key.clone()))
    }

    /// Fails when one more active item would exceed `container` capacity.
    /// `excluding` is left out of the count (an item re-activating in place).
    fn ensure_capacity(&self, container: &Container, excluding: Option<ItemId>) -> EngineResult<()> {
        let Some(capacity) = container.capacity else {
            return Ok(());
        };
        let active = self
            .items
            .iter()
            .filter(|item| item.container == container.key && item.is_active())
            .filter(|item| Some(item.id) != excluding)
            .count();
        if container.is_full(active) {
            info!(
                "event=capacity_check module=engine status=rejected container={} capacity={capacity}",
                container.key
            );
            return Err(EngineError::CapacityExceeded {
                container: container.key.clone(),
                capacity,
            });
        }
        Ok(())
    }
}

fn to_updates(allocation: &Allocation<Item>) -> Vec<PositionUpdate> {
    allocation.changed.iter().map(Item::slot).collect()
}

fn normalize_title(value: String) -> EngineResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidTitle);
    }
    Ok(trimmed.to_string())
}
