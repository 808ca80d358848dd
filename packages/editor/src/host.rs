//! # Designer Host
//!
//! Owns component lifetime, transactions and the background serialization
//! that keeps the design surface fresh.
//!
//! ## Design
//!
//! - The thread that loads a document becomes its owner thread: it is the
//!   only one that edits the text. Serialization workers marshal their edits
//!   onto the owner's queue, so the owner must keep pumping while they run
//!   ([`DesignerHost::pump`], [`DesignerHost::settle`])
//! - A worker may hold the surface lock while it waits on the owner. Every
//!   host operation therefore settles outstanding workers before touching
//!   components
//! - Committing the outermost transaction while activated re-renders the
//!   surface on a worker; undo and redo also re-validate every component
//!   against the markup first
//!
//! ```text
//!   Idle ──load──▶ Loading ──scan──▶ Loaded ──activate──▶ Activated
//!    ▲                                  ▲                    │
//!    │                                  └────deactivate──────┘
//!    └──────────────────── reset ◀──────────────────────────────
//! ```

use crate::component::{ComponentKind, ControlRegistry, Value};
use crate::controls::{page_descriptor, standard_registry};
use crate::design_html::DesignTimeHtml;
use crate::designer::{ControlDesigner, DesignerRegistry};
use crate::document::{new_document_markup, ComponentRef, Document, ScanReport};
use crate::errors::{EditorError, EditorResult};
use crate::events::HostEvent;
use crate::messages::{parse_message, DesignerMessage};
use crate::options::DesignerOptions;
use crate::selection::SelectionService;
use crate::tag_serializer;
use crate::text_buffer::{lock, OwnerQueue, TextBuffer, TextBufferAdapter};
use crate::transaction::{DesignerTransaction, TransactionStack};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Idle,
    Loading,
    Loaded,
    Activated,
    Deactivated,
}

pub struct DesignerHost {
    registry: Arc<ControlRegistry>,
    designers: Arc<DesignerRegistry>,
    options: DesignerOptions,
    selection: SelectionService,
    phase: HostPhase,
    document: Option<Arc<Document>>,
    queue: Option<OwnerQueue>,
    transactions: Arc<Mutex<TransactionStack>>,
    events: broadcast::Sender<HostEvent>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
}

impl std::fmt::Debug for DesignerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignerHost")
            .field("phase", &self.phase)
            .field("document", &self.document)
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl Default for DesignerHost {
    fn default() -> Self {
        Self::new(
            standard_registry(),
            DesignerRegistry::standard(),
            DesignerOptions::default(),
        )
    }
}

impl DesignerHost {
    pub fn new(registry: ControlRegistry, designers: DesignerRegistry, options: DesignerOptions) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            registry: Arc::new(registry),
            designers: Arc::new(designers),
            options,
            selection: SelectionService::new(),
            phase: HostPhase::Idle,
            document: None,
            queue: None,
            transactions: Arc::new(Mutex::new(TransactionStack::default())),
            events,
            workers: Vec::new(),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_options(options: DesignerOptions) -> Self {
        Self::new(standard_registry(), DesignerRegistry::standard(), options)
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn registry(&self) -> &Arc<ControlRegistry> {
        &self.registry
    }

    pub fn selection(&self) -> &SelectionService {
        &self.selection
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    pub fn document(&self) -> Option<&Arc<Document>> {
        self.document.as_ref()
    }

    fn loaded(&self) -> EditorResult<Arc<Document>> {
        self.document.clone().ok_or(EditorError::NotLoaded)
    }

    fn emit(&self, event: HostEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    // -----------------------------------------------------------------------
    // Lifecycle

    /// Load markup into an in-memory buffer. The calling thread becomes the
    /// owner thread of the document.
    pub fn load_text(&mut self, markup: &str) -> EditorResult<ScanReport> {
        let (buffer, queue) = TextBufferAdapter::from_text(markup);
        self.load_buffer(buffer, queue)
    }

    /// Load from any text buffer implementation
    pub fn load_document(&mut self, buffer: impl TextBuffer + 'static) -> EditorResult<ScanReport> {
        let (buffer, queue) = TextBufferAdapter::new(buffer);
        self.load_buffer(buffer, queue)
    }

    pub fn load_file(&mut self, path: &Path) -> EditorResult<ScanReport> {
        let markup = std::fs::read_to_string(path)?;
        tracing::info!("loading {}", path.display());
        self.load_text(&markup)
    }

    /// Load the standard empty page
    pub fn new_file(&mut self, title: &str) -> EditorResult<ScanReport> {
        self.load_text(&new_document_markup(title))
    }

    fn load_buffer(&mut self, buffer: TextBufferAdapter, queue: OwnerQueue) -> EditorResult<ScanReport> {
        if self.phase != HostPhase::Idle || self.document.is_some() {
            return Err(EditorError::HostNotReset);
        }
        self.phase = HostPhase::Loading;

        let document = Arc::new(Document::new(
            buffer,
            self.registry.clone(),
            self.designers.clone(),
            self.selection.clone(),
            self.options.clone(),
        ));
        let page = self
            .registry
            .by_type_name("Page")
            .unwrap_or_else(|| Arc::new(page_descriptor()));
        let root = document.create_root(&page)?;
        self.document = Some(document.clone());
        self.queue = Some(queue);
        self.emit(HostEvent::ComponentAdded {
            name: root,
            type_name: page.type_name,
        });

        let report = match document.init_controls_and_directives() {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("initial control scan failed: {}", e);
                self.reset();
                return Err(e);
            }
        };
        for (name, type_name) in &report.created {
            self.emit(HostEvent::ComponentAdded {
                name: name.clone(),
                type_name,
            });
        }
        for issue in &report.issues {
            tracing::warn!("{}", issue);
        }

        self.phase = HostPhase::Loaded;
        tracing::info!(
            "loaded document: {} component(s), {} issue(s)",
            report.created.len() + 1,
            report.issues.len()
        );
        self.emit(HostEvent::LoadComplete {
            components: report.created.len() + 1,
            issues: report.issues.len(),
        });
        Ok(report)
    }

    /// Select the root and start rendering the surface
    pub fn activate(&mut self) -> EditorResult<()> {
        if self.phase == HostPhase::Activated {
            return Err(EditorError::AlreadyActivated);
        }
        let document = self.loaded()?;
        let root = document.root_name().ok_or(EditorError::NotLoaded)?;

        self.selection.set_selected_components(&[root]);
        self.phase = HostPhase::Activated;
        self.emit(HostEvent::Activated);
        self.spawn_serialization(false);
        Ok(())
    }

    pub fn deactivate(&mut self) {
        if self.phase != HostPhase::Activated {
            return;
        }
        self.settle();
        self.phase = HostPhase::Deactivated;
        self.emit(HostEvent::Deactivated);
    }

    /// Destroy every component and drop the document
    pub fn reset(&mut self) {
        self.settle();
        if let Some(document) = self.document.take() {
            let removed = document.lock_surface().clear(&self.selection);
            for name in removed {
                self.emit(HostEvent::ComponentRemoved { name });
            }
        }
        self.queue = None;
        self.selection.clear();
        self.phase = HostPhase::Idle;
        tracing::debug!("designer host reset");
    }

    // -----------------------------------------------------------------------
    // Background work

    /// Run text edits queued by workers without blocking
    pub fn pump(&mut self) -> usize {
        self.queue.as_mut().map(OwnerQueue::pump).unwrap_or(0)
    }

    /// Service the owner queue until every worker has finished, then join them
    pub fn settle(&mut self) {
        if let Some(queue) = self.queue.as_mut() {
            let pending = self.pending.clone();
            queue.run_until(|| pending.load(Ordering::SeqCst) == 0);
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("serialization worker panicked");
            }
        }
    }

    /// Re-render the surface on a worker. A hard refresh first reconciles
    /// every component with the markup.
    pub fn refresh(&mut self, hard: bool) {
        self.spawn_serialization(hard);
    }

    fn spawn_serialization(&mut self, hard: bool) {
        let Some(document) = self.document.clone() else {
            return;
        };
        let events = self.events.clone();
        let pending = self.pending.clone();
        pending.fetch_add(1, Ordering::SeqCst);

        let worker_pending = pending.clone();
        let spawned = thread::Builder::new()
            .name("formsmith-serialize".to_string())
            .spawn(move || {
                if hard {
                    match document.persist_controls() {
                        Ok(report) => {
                            for name in report.removed {
                                let _ = events.send(HostEvent::ComponentRemoved { name });
                            }
                            for (name, type_name) in report.created {
                                let _ = events.send(HostEvent::ComponentAdded { name, type_name });
                            }
                        }
                        Err(e) => tracing::error!("control reconciliation failed: {}", e),
                    }
                }
                let html = document.to_design_time_html();
                let _ = events.send(HostEvent::DocumentChanged {
                    html: Arc::new(html),
                });
                worker_pending.fetch_sub(1, Ordering::SeqCst);
                document.buffer().wake_owner();
            });

        match spawned {
            Ok(worker) => self.workers.push(worker),
            Err(e) => {
                pending.fetch_sub(1, Ordering::SeqCst);
                tracing::error!("could not start serialization worker: {}", e);
            }
        }
    }

    /// Render the surface on the calling thread
    pub fn serialize_document(&mut self) -> EditorResult<Arc<DesignTimeHtml>> {
        self.settle();
        let document = self.loaded()?;
        let html = Arc::new(document.to_design_time_html());
        self.emit(HostEvent::DocumentChanged { html: html.clone() });
        Ok(html)
    }

    // -----------------------------------------------------------------------
    // Transactions

    pub fn create_transaction(&self, description: &str) -> DesignerTransaction {
        DesignerTransaction::open(&self.transactions, &self.events, description)
    }

    pub fn in_transaction(&self) -> bool {
        lock(&self.transactions).depth() > 0
    }

    pub fn transaction_description(&self) -> Option<String> {
        lock(&self.transactions).current().map(str::to_string)
    }

    /// Commit; the outermost commit while activated refreshes the surface
    pub fn commit(&mut self, transaction: &mut DesignerTransaction) -> EditorResult<()> {
        transaction.commit()?;
        if self.phase == HostPhase::Activated && !self.in_transaction() {
            self.spawn_serialization(false);
        }
        Ok(())
    }

    pub fn rollback(&mut self, transaction: &mut DesignerTransaction) -> EditorResult<()> {
        transaction.cancel()
    }

    /// Run `work` in a transaction, committing on success
    pub fn with_transaction<R>(
        &mut self,
        description: &str,
        work: impl FnOnce(&mut Self) -> EditorResult<R>,
    ) -> EditorResult<R> {
        let mut transaction = self.create_transaction(description);
        match work(self) {
            Ok(result) => {
                self.commit(&mut transaction)?;
                Ok(result)
            }
            Err(e) => {
                self.rollback(&mut transaction)?;
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Components

    pub fn root_name(&mut self) -> Option<String> {
        self.settle();
        self.document.as_ref()?.root_name()
    }

    pub fn component_names(&mut self) -> Vec<String> {
        self.settle();
        self.document
            .as_ref()
            .map(|document| document.component_names())
            .unwrap_or_default()
    }

    pub fn get_component(&mut self, name: &str) -> Option<ComponentRef<'_>> {
        self.settle();
        self.document.as_ref()?.component(name)
    }

    pub fn get_designer(&mut self, name: &str) -> EditorResult<Arc<dyn ControlDesigner>> {
        let type_name = self
            .get_component(name)
            .map(|component| component.type_name())
            .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?;
        Ok(self.designers.designer_for(type_name))
    }

    /// Add a control from the design surface: site it, write its tag into
    /// the markup and select it. Returns the site name.
    pub fn create_component(&mut self, type_name: &str, name: Option<&str>) -> EditorResult<String> {
        self.settle();
        let document = self.loaded()?;
        let descriptor = self
            .registry
            .by_type_name(type_name)
            .ok_or_else(|| EditorError::UnknownType(type_name.to_string()))?;
        if descriptor.kind == ComponentKind::Page {
            return Err(EditorError::PageNotAllowed(descriptor.type_name.to_string()));
        }

        self.with_transaction(&format!("Create {}", descriptor.type_name), |host| {
            let (site_name, markup) = {
                let mut surface = document.lock_surface();
                let site_name = surface.site_control(name, descriptor.instantiate())?;
                let component = surface
                    .get_mut(&site_name)
                    .ok_or_else(|| EditorError::ComponentNotFound(site_name.clone()))?;
                if let Some(hook) = component.as_initializable() {
                    hook.initialize(&site_name);
                }
                let markup = tag_serializer::control_tag(&descriptor, &site_name, component.properties());
                (site_name, markup)
            };

            if let Err(e) = tag_serializer::insert_control_tag(&document, &markup) {
                document.lock_surface().destroy(&site_name, &host.selection);
                return Err(e);
            }
            tracing::debug!("created {} '{}'", descriptor.type_name, site_name);
            host.emit(HostEvent::ComponentAdded {
                name: site_name.clone(),
                type_name: descriptor.type_name,
            });
            host.select(&[site_name.clone()], 0);
            Ok(site_name)
        })
    }

    /// Remove a component and its tag. The root page has no tag of its own.
    pub fn destroy_component(&mut self, name: &str) -> EditorResult<()> {
        self.settle();
        let document = self.loaded()?;
        let (canonical, is_root) = {
            let surface = document.lock_surface();
            let canonical = surface
                .container()
                .canonical_name(name)
                .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?
                .to_string();
            let is_root = surface.is_root(&canonical);
            (canonical, is_root)
        };

        if !is_root {
            match tag_serializer::remove_control_tag(&document, &canonical) {
                Ok(()) => {}
                Err(EditorError::TagNotFound(_)) => {
                    tracing::debug!("'{}' has no tag left to remove", canonical);
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(removed) = document.lock_surface().destroy(&canonical, &self.selection) {
            self.emit(HostEvent::ComponentRemoved { name: removed });
        }
        Ok(())
    }

    /// Destroy one control inside its own transaction
    pub fn remove_control(&mut self, name: &str) -> EditorResult<()> {
        self.with_transaction(&format!("Remove {}", name), |host| host.destroy_component(name))
    }

    /// Remove every selected control except the root, in one transaction
    pub fn remove_selected_controls(&mut self) -> EditorResult<Vec<String>> {
        self.settle();
        let document = self.loaded()?;
        let mut selected = self.selection.get_selected_components();
        selected.reverse();

        self.with_transaction("Remove selected controls", |host| {
            let mut removed = Vec::new();
            for name in selected {
                let skip = {
                    let surface = document.lock_surface();
                    surface.is_root(&name) || !surface.container().contains(&name)
                };
                if skip {
                    continue;
                }
                host.destroy_component(&name)?;
                removed.push(name);
            }
            Ok(removed)
        })
    }

    /// Change a property and write it to the component's tag
    pub fn set_component_property(&mut self, name: &str, property: &str, value: Value) -> EditorResult<()> {
        self.settle();
        let document = self.loaded()?;
        self.with_transaction(&format!("Change {}.{}", name, property), |host| {
            let (canonical, descriptor, property, old) = {
                let mut surface = document.lock_surface();
                let canonical = surface
                    .container()
                    .canonical_name(name)
                    .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?
                    .to_string();
                let component = surface
                    .get_mut(&canonical)
                    .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?;
                let descriptor = component.descriptor().clone();
                let property = descriptor
                    .property(property)
                    .map(|p| p.name)
                    .ok_or_else(|| EditorError::PropertyNotFound {
                        component: canonical.clone(),
                        property: property.to_string(),
                    })?;
                let old = component.set_property(property, value.clone())?;
                (canonical, descriptor, property, old)
            };

            if let Err(e) = tag_serializer::update_tag(&document, &descriptor, &canonical, property, &value) {
                // keep component and markup in agreement
                let mut surface = document.lock_surface();
                if let Some(component) = surface.get_mut(&canonical) {
                    let restored = match &old {
                        Some(old) => component.set_property(property, old.clone()),
                        None => component.properties_mut().reset(property),
                    };
                    if let Err(restore) = restored {
                        tracing::warn!("could not restore {}.{}: {}", canonical, property, restore);
                    }
                }
                return Err(e);
            }

            host.emit(HostEvent::ComponentChanged {
                name: canonical,
                property: property.to_string(),
                old,
                new: value,
            });
            Ok(())
        })
    }

    /// Set a property from its markup spelling
    pub fn set_component_property_text(&mut self, name: &str, property: &str, text: &str) -> EditorResult<()> {
        let value = {
            let component = self
                .get_component(name)
                .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?;
            let descriptor = component.descriptor();
            let property = descriptor
                .property(property)
                .ok_or_else(|| EditorError::PropertyNotFound {
                    component: name.to_string(),
                    property: property.to_string(),
                })?;
            property.convert_from(text)?
        };
        self.set_component_property(name, property, value)
    }

    /// Put a property back to its declared default
    pub fn reset_component_property(&mut self, name: &str, property: &str) -> EditorResult<()> {
        let default = {
            let component = self
                .get_component(name)
                .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?;
            component
                .descriptor()
                .property(property)
                .and_then(|p| p.default.clone())
                .ok_or_else(|| EditorError::PropertyNotFound {
                    component: name.to_string(),
                    property: property.to_string(),
                })?
        };
        self.set_component_property(name, property, default)
    }

    /// Bind or clear an event handler, mirrored as an `On<Event>` attribute
    pub fn set_event_handler(&mut self, name: &str, event: &str, handler: Option<&str>) -> EditorResult<()> {
        self.settle();
        let document = self.loaded()?;
        self.with_transaction(&format!("Bind {}.{}", name, event), |_| {
            let (canonical, event) = {
                let mut surface = document.lock_surface();
                let canonical = surface
                    .container()
                    .canonical_name(name)
                    .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?
                    .to_string();
                let component = surface
                    .get_mut(&canonical)
                    .ok_or_else(|| EditorError::ComponentNotFound(name.to_string()))?;
                let event = component
                    .descriptor()
                    .event(event)
                    .map(|e| e.name)
                    .ok_or_else(|| EditorError::PropertyNotFound {
                        component: canonical.clone(),
                        property: format!("On{}", event),
                    })?;
                match handler {
                    Some(handler) if !handler.is_empty() => {
                        component.properties_mut().bind_event(event, handler)?
                    }
                    _ => component.properties_mut().unbind_event(event),
                }
                (canonical, event)
            };
            tag_serializer::update_event(&document, &canonical, event, handler)?;
            Ok(())
        })
    }

    /// Re-key a component and rewrite its `id` in the markup
    pub fn rename_component(&mut self, old_name: &str, new_name: &str) -> EditorResult<()> {
        self.settle();
        let document = self.loaded()?;
        self.with_transaction(&format!("Rename {}", old_name), |host| {
            let previous = document.lock_surface().rename(old_name, new_name)?;
            if let Err(e) = tag_serializer::rename_tag_id(&document, &previous, new_name) {
                if let Err(undo) = document.lock_surface().rename(new_name, &previous) {
                    tracing::warn!("could not restore name '{}': {}", previous, undo);
                }
                return Err(e);
            }
            host.selection.rename(&previous, new_name);
            host.emit(HostEvent::ComponentRenamed {
                old_name: previous,
                new_name: new_name.to_string(),
            });
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Undo / redo

    pub fn can_undo(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|document| document.buffer().can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.document
            .as_ref()
            .is_some_and(|document| document.buffer().can_redo())
    }

    /// Undo the last text edit and re-validate every component against the
    /// markup on a worker
    pub fn undo(&mut self) -> EditorResult<bool> {
        self.settle();
        let document = self.loaded()?;
        if !document.buffer().undo()? {
            return Ok(false);
        }
        document.buffer().mark_dirty();
        self.spawn_serialization(true);
        Ok(true)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        self.settle();
        let document = self.loaded()?;
        if !document.buffer().redo()? {
            return Ok(false);
        }
        document.buffer().mark_dirty();
        self.spawn_serialization(true);
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Selection and surface messages

    /// Replace the selection with the names that exist, in their stored
    /// spelling
    pub fn select(&mut self, names: &[String], primary: usize) {
        let known: Vec<String> = match self.document.as_ref() {
            Some(document) => {
                let surface = document.lock_surface();
                names
                    .iter()
                    .filter_map(|name| surface.container().canonical_name(name))
                    .map(str::to_string)
                    .collect()
            }
            None => Vec::new(),
        };
        self.selection.set_selected_with_primary(&known, primary);
        self.emit(HostEvent::SelectionChanged {
            selected: self.selection.get_selected_components(),
            primary: self.selection.primary_selection(),
        });
    }

    /// Handle a raw message from the design surface. Unknown or malformed
    /// messages are ignored.
    pub fn handle_designer_message(&mut self, raw: &str) -> Option<DesignerMessage> {
        let message = parse_message(raw)?;
        self.settle();
        match &message {
            DesignerMessage::SelectionChanged(args) => {
                self.select(&args.selected_ids, args.primary_selection);
            }
            DesignerMessage::ContextMenuRequest(args) => {
                let component = args.component_id.as_ref().and_then(|id| {
                    let document = self.document.as_ref()?;
                    let surface = document.lock_surface();
                    surface.container().canonical_name(id).map(str::to_string)
                });
                self.emit(HostEvent::ContextMenuRequested {
                    x: args.x,
                    y: args.y,
                    component,
                });
            }
        }
        Some(message)
    }
}

impl Drop for DesignerHost {
    fn drop(&mut self) {
        self.settle();
    }
}
