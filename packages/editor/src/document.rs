//! # Document
//!
//! Keeps the live components of a design surface in step with the markup
//! text.
//!
//! ## Design
//!
//! - The parsed tree is cached and only rebuilt when the buffer is dirty.
//!   Parsing waits on the mutation gate, so it never sees a half-applied edit
//! - Components, directives and the root page live in a [`DesignSurface`]
//!   behind one lock, shared by the owner thread and serialization workers.
//!   The lock is never held across a text edit, since a worker's edit waits
//!   for the owner thread
//! - Control scans are a fixed-point loop: any edit made during a pass (an
//!   inserted `id`) invalidates every region, so the pass restarts from a
//!   fresh parse. The loop is bounded by
//!   [`DesignerOptions::max_scan_passes`]
//! - Per-tag failures (unknown control type, unconvertible attribute) are
//!   logged and collected in a [`ScanReport`]; they never abort a scan
//!
//! ```text
//!  text edit ──▶ dirty ──▶ parse() ──▶ scan pass ──┬──▶ settled
//!                  ▲                               │
//!                  └──────── id inserted ◀─────────┘
//! ```

use crate::component::{Component, ControlRegistry, TypeDescriptor};
use crate::container::{is_valid_name, DesignContainer};
use crate::design_html::{DesignHtmlWriter, DesignTimeHtml};
use crate::designer::DesignerRegistry;
use crate::directives::{DirectiveRecord, DirectiveTable};
use crate::errors::{EditorError, EditorResult};
use crate::options::DesignerOptions;
use crate::selection::SelectionService;
use crate::tag_serializer;
use crate::text_buffer::{lock, TextBufferAdapter};
use formsmith_parser::{parse, Element, MarkupDocument, Region, TextLocation};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

/// Markup of a fresh page
pub fn new_document_markup(title: &str) -> String {
    format!(
        "<html>\n<head>\n\t<title>{}</title>\n</head>\n<body>\n<form runat=\"server\">\n\n</form></body>\n</html>",
        title
    )
}

/// Something in the markup that could not be mapped onto a component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIssue {
    pub tag: String,
    pub id: Option<String>,
    pub location: TextLocation,
    pub message: String,
}

impl ScanIssue {
    fn for_tag(tag: &Element, message: impl Into<String>) -> Self {
        Self {
            tag: tag.name.full_name(),
            id: tag.id().map(str::to_string),
            location: tag.region.begin,
            message: message.into(),
        }
    }
}

impl fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "<{} id=\"{}\"> at {}: {}", self.tag, id, self.location, self.message),
            None => write!(f, "<{}> at {}: {}", self.tag, self.location, self.message),
        }
    }
}

/// Outcome of a control scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Parse passes it took to settle
    pub passes: usize,
    /// `(site name, type name)` of components created
    pub created: Vec<(String, &'static str)>,
    /// Components destroyed because their tag is gone
    pub removed: Vec<String>,
    /// Ids written into tags that had none (or a clashing one)
    pub ids_inserted: Vec<String>,
    pub directives: usize,
    pub issues: Vec<ScanIssue>,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    /// First scan after loading: create components, leave existing ones be
    Initial,
    /// Re-validate every component against its tag and drop orphans
    Persist,
}

enum PassOutcome {
    Settled(HashSet<String>),
    /// A tag needs this id written before the scan can go on
    WriteId(Element, String),
}

/// Sited components, the root page and the directive table
#[derive(Debug, Default)]
pub struct DesignSurface {
    pub(crate) container: DesignContainer,
    pub(crate) directives: DirectiveTable,
    root: Option<String>,
}

impl DesignSurface {
    pub fn container(&self) -> &DesignContainer {
        &self.container
    }

    pub fn directives(&self) -> &DirectiveTable {
        &self.directives
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn is_root(&self, name: &str) -> bool {
        self.root
            .as_deref()
            .is_some_and(|root| root.eq_ignore_ascii_case(name))
    }

    pub(crate) fn site_root(&mut self, page: Box<dyn Component>) -> EditorResult<String> {
        let name = self.container.add(None, page)?;
        self.root = Some(name.clone());
        Ok(name)
    }

    /// Site a control and add it to the root page's children
    pub(crate) fn site_control(
        &mut self,
        name: Option<&str>,
        component: Box<dyn Component>,
    ) -> EditorResult<String> {
        let name = self.container.add(name, component)?;
        if let Some(children) = self.root_children() {
            children.push(name.clone());
        }
        Ok(name)
    }

    /// Deselect, detach, unsite and dispose a component. Returns the stored
    /// name when it existed.
    pub(crate) fn destroy(&mut self, name: &str, selection: &SelectionService) -> Option<String> {
        let canonical = self.container.canonical_name(name)?.to_string();

        // check first, then replace the selection with a copy
        if selection.is_selected(&canonical) {
            let remaining: Vec<String> = selection
                .get_selected_components()
                .into_iter()
                .filter(|selected| !selected.eq_ignore_ascii_case(&canonical))
                .collect();
            selection.set_selected_components(&remaining);
        }

        if self.is_root(&canonical) {
            self.root = None;
        } else if let Some(children) = self.root_children() {
            children.retain(|child| !child.eq_ignore_ascii_case(&canonical));
        }

        let mut component = self.container.remove(&canonical)?;
        component.dispose();
        tracing::debug!("destroyed component '{}'", canonical);
        Some(canonical)
    }

    /// Re-key a component; returns the previous stored name
    pub(crate) fn rename(&mut self, old_name: &str, new_name: &str) -> EditorResult<String> {
        if self.is_root(old_name) {
            return Err(EditorError::InvalidName(old_name.to_string()));
        }
        let previous = self.container.rename(old_name, new_name)?;
        if let Some(children) = self.root_children() {
            for child in children.iter_mut() {
                if child.eq_ignore_ascii_case(&previous) {
                    *child = new_name.to_string();
                }
            }
        }
        Ok(previous)
    }

    /// Destroy every component, children before the root
    pub(crate) fn clear(&mut self, selection: &SelectionService) -> Vec<String> {
        let mut names = self.container.names();
        names.reverse();
        if let Some(root) = self.root.clone() {
            names.retain(|name| !name.eq_ignore_ascii_case(&root));
            names.push(root);
        }
        names
            .iter()
            .filter_map(|name| self.destroy(name, selection))
            .collect()
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Component>> {
        self.container.get_mut(name)
    }

    fn root_children(&mut self) -> Option<&mut Vec<String>> {
        let root = self.root.clone()?;
        self.container.get_mut(&root)?.child_controls_mut()
    }
}

/// Read access to one sited component. Holds the surface lock while alive.
pub struct ComponentRef<'a> {
    surface: MutexGuard<'a, DesignSurface>,
    index: usize,
    name: String,
}

impl ComponentRef<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Deref for ComponentRef<'_> {
    type Target = dyn Component;

    fn deref(&self) -> &Self::Target {
        self.surface.container.at(self.index)
    }
}

impl fmt::Debug for ComponentRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("name", &self.name)
            .field("type", &self.deref().type_name())
            .finish()
    }
}

/// One open markup document and the components sited from it
#[derive(Debug)]
pub struct Document {
    buffer: TextBufferAdapter,
    registry: Arc<ControlRegistry>,
    designers: Arc<DesignerRegistry>,
    selection: SelectionService,
    options: DesignerOptions,
    cache: Mutex<Option<Arc<MarkupDocument>>>,
    surface: Mutex<DesignSurface>,
}

impl Document {
    pub fn new(
        buffer: TextBufferAdapter,
        registry: Arc<ControlRegistry>,
        designers: Arc<DesignerRegistry>,
        selection: SelectionService,
        options: DesignerOptions,
    ) -> Self {
        Self {
            buffer,
            registry,
            designers,
            selection,
            options,
            cache: Mutex::new(None),
            surface: Mutex::new(DesignSurface::default()),
        }
    }

    pub fn buffer(&self) -> &TextBufferAdapter {
        &self.buffer
    }

    pub fn registry(&self) -> &Arc<ControlRegistry> {
        &self.registry
    }

    pub fn designers(&self) -> &Arc<DesignerRegistry> {
        &self.designers
    }

    pub fn selection(&self) -> &SelectionService {
        &self.selection
    }

    pub fn options(&self) -> &DesignerOptions {
        &self.options
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    /// Parsed tree of the current text. Re-parses only when the buffer
    /// changed since the last parse; waits for in-flight mutations either way.
    pub fn parse(&self) -> Arc<MarkupDocument> {
        let mut cache = lock(&self.cache);
        self.buffer.wait_for_mutations();
        if !self.buffer.is_dirty() {
            if let Some(cached) = cache.as_ref() {
                return cached.clone();
            }
        }

        let (text, generation) = self.buffer.read_snapshot();
        let parsed = Arc::new(parse(&text));
        if !self.buffer.mark_clean(generation) {
            tracing::debug!("buffer changed while parsing; staying dirty");
        }
        for diagnostic in &parsed.diagnostics {
            tracing::debug!("markup diagnostic: {}", diagnostic.error);
        }
        *cache = Some(parsed.clone());
        parsed
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn get_text_from_editor(&self, begin: TextLocation, end: TextLocation) -> String {
        self.buffer.text_between(begin, end)
    }

    pub fn region_text(&self, region: Region) -> String {
        self.buffer.text_between(region.begin, region.end)
    }

    pub fn insert_text(&self, at: TextLocation, text: &str) -> EditorResult<()> {
        self.buffer.insert(at, text)
    }

    pub fn replace_text(&self, region: Region, text: &str) -> EditorResult<()> {
        self.buffer.replace(region, text)
    }

    pub fn remove_text(&self, region: Region) -> EditorResult<()> {
        self.buffer.remove(region)
    }

    pub(crate) fn lock_surface(&self) -> MutexGuard<'_, DesignSurface> {
        lock(&self.surface)
    }

    pub fn component(&self, name: &str) -> Option<ComponentRef<'_>> {
        let surface = self.lock_surface();
        let index = surface.container.index_of(name)?;
        let name = surface.container.canonical_name(name)?.to_string();
        Some(ComponentRef {
            surface,
            index,
            name,
        })
    }

    pub fn component_names(&self) -> Vec<String> {
        self.lock_surface().container.names()
    }

    pub fn root_name(&self) -> Option<String> {
        self.lock_surface().root.clone()
    }

    /// Site the root page component
    pub(crate) fn create_root(&self, page: &Arc<TypeDescriptor>) -> EditorResult<String> {
        let mut surface = self.lock_surface();
        if let Some(root) = surface.root.clone() {
            return Ok(root);
        }
        surface.site_root(page.instantiate())
    }

    // -----------------------------------------------------------------------
    // Directives

    /// Register a directive; returns its placeholder markup
    pub fn add_directive(&self, name: &str, properties: Vec<(String, String)>) -> EditorResult<String> {
        self.lock_surface().directives.add(name, properties)
    }

    /// Remove a directive by placeholder key; returns its markup
    pub fn remove_directive(&self, key: usize) -> EditorResult<String> {
        self.lock_surface().directives.remove(key)
    }

    pub fn get_directives(&self, name: &str) -> Vec<DirectiveRecord> {
        self.lock_surface()
            .directives
            .all(name)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_first_directive(&self, name: &str, create: bool) -> EditorResult<Option<DirectiveRecord>> {
        let mut surface = self.lock_surface();
        if create {
            return surface.directives.first_or_create(name).map(|record| Some(record.clone()));
        }
        Ok(surface.directives.first(name).cloned())
    }

    // -----------------------------------------------------------------------
    // Control scans

    /// First scan after loading. Registers directives, then creates a
    /// component for every server-control tag, writing an `id` into tags
    /// that lack a usable one.
    pub fn init_controls_and_directives(&self) -> EditorResult<ScanReport> {
        self.scan(ScanMode::Initial)
    }

    /// Reconcile components with the markup: create missing ones, re-apply
    /// every tag's attributes (resetting properties the tag no longer sets)
    /// and destroy components whose tag is gone.
    pub fn persist_controls(&self) -> EditorResult<ScanReport> {
        self.scan(ScanMode::Persist)
    }

    /// Apply a tag's attributes to a component. With `check_defaults`, any
    /// property or event binding the tag does not carry is reset.
    pub fn process_control_properties(
        tag: &Element,
        component: &mut dyn Component,
        check_defaults: bool,
    ) -> Vec<ScanIssue> {
        let descriptor = component.descriptor().clone();
        let mut issues = Vec::new();
        let mut explicit: Vec<&'static str> = Vec::new();
        let mut bound: Vec<&'static str> = Vec::new();

        for attr in &tag.attributes {
            let name = attr.name.full_name();
            if name.eq_ignore_ascii_case("id") || name.eq_ignore_ascii_case("runat") {
                continue;
            }

            if let Some(property) = descriptor.property(&name) {
                explicit.push(property.name);
                let value = match property.convert_from(&attr.value) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!("<{}> {}: {}", tag.name, property.name, e);
                        issues.push(ScanIssue::for_tag(tag, format!("{}: {}", property.name, e)));
                        continue;
                    }
                };
                if component.get_property(property.name).as_ref() != Some(&value) {
                    if let Err(e) = component.set_property(property.name, value) {
                        issues.push(ScanIssue::for_tag(tag, format!("{}: {}", property.name, e)));
                    }
                }
                continue;
            }

            let event = name
                .get(..2)
                .filter(|prefix| prefix.eq_ignore_ascii_case("on"))
                .and_then(|_| name.get(2..))
                .and_then(|event| descriptor.event(event));
            if let Some(event) = event {
                bound.push(event.name);
                if let Err(e) = component.properties_mut().bind_event(event.name, &attr.value) {
                    issues.push(ScanIssue::for_tag(tag, e.to_string()));
                }
                continue;
            }

            tracing::trace!("<{}> attribute '{}' has no property", tag.name, name);
        }

        if check_defaults {
            let properties = component.properties_mut();
            for property in &descriptor.properties {
                if !explicit.contains(&property.name) && !properties.is_default(property.name) {
                    if let Err(e) = properties.reset(property.name) {
                        tracing::warn!("<{}> resetting {}: {}", tag.name, property.name, e);
                        issues.push(ScanIssue::for_tag(tag, format!("{}: {}", property.name, e)));
                    }
                }
            }
            for event in &descriptor.events {
                if !bound.contains(&event.name) {
                    properties.unbind_event(event.name);
                }
            }
        }

        component.bind_element(tag);
        issues
    }

    fn scan(&self, mode: ScanMode) -> EditorResult<ScanReport> {
        // one change notification for every id written during the scan
        let _quiet = self.buffer.suppress_notifications();
        let mut report = ScanReport::default();

        if mode == ScanMode::Initial {
            let parsed = self.parse();
            let mut surface = self.lock_surface();
            surface.directives.clear();
            for directive in parsed.directives() {
                match surface.directives.add_parsed(directive) {
                    Ok(_) => report.directives += 1,
                    Err(e) => {
                        tracing::warn!("skipping directive at {}: {}", directive.region.begin, e);
                        report.issues.push(ScanIssue {
                            tag: format!("%@ {}", directive.name),
                            id: None,
                            location: directive.region.begin,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        loop {
            if report.passes == self.options.max_scan_passes {
                tracing::error!("control scan still editing after {} passes", report.passes);
                return Err(EditorError::ScanDidNotConverge(report.passes));
            }
            report.passes += 1;

            let parsed = self.parse();
            let mut surface = self.lock_surface();
            match self.scan_pass(&mut surface, &parsed, mode, &mut report)? {
                PassOutcome::WriteId(element, name) => {
                    // a worker's write waits for the owner, who may need the surface
                    drop(surface);
                    if self.buffer.is_dirty() {
                        tracing::debug!("text changed during the pass; scanning again");
                        continue;
                    }
                    tag_serializer::set_attribute(self, &element, "id", &name)?;
                    report.ids_inserted.push(name);
                }
                PassOutcome::Settled(claimed) => {
                    if mode == ScanMode::Persist {
                        self.remove_orphans(&mut surface, &claimed, &mut report);
                    }
                    break;
                }
            }
        }

        tracing::debug!(
            "{:?} scan settled after {} pass(es): {} created, {} removed, {} id(s) inserted",
            mode,
            report.passes,
            report.created.len(),
            report.removed.len(),
            report.ids_inserted.len()
        );
        Ok(report)
    }

    fn scan_pass(
        &self,
        surface: &mut DesignSurface,
        parsed: &MarkupDocument,
        mode: ScanMode,
        report: &mut ScanReport,
    ) -> EditorResult<PassOutcome> {
        let taken: HashSet<String> = parsed
            .elements()
            .filter_map(|element| element.id())
            .map(str::to_ascii_lowercase)
            .collect();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut issues = Vec::new();

        for element in parsed.server_controls() {
            let Some(descriptor) = self.registry.resolve(element) else {
                tracing::warn!("no control type for <{}> at {}", element.name, element.region.begin);
                issues.push(ScanIssue::for_tag(element, "no control type registered for this tag"));
                continue;
            };

            let usable_id = element.id().filter(|id| {
                is_valid_name(id) && !claimed.contains(&id.to_ascii_lowercase()) && !surface.is_root(id)
            });
            let Some(id) = usable_id else {
                let name = unused_name(&surface.container, &taken, descriptor.type_name);
                tracing::info!(
                    "writing id \"{}\" into <{}> at {}",
                    name,
                    element.name,
                    element.region.begin
                );
                // the restarted pass reports this pass's issues again
                return Ok(PassOutcome::WriteId(element.clone(), name));
            };
            claimed.insert(id.to_ascii_lowercase());

            let existing_type = surface.container.get(id).map(|component| component.type_name());
            match existing_type {
                Some(type_name) if type_name == descriptor.type_name => {
                    if mode == ScanMode::Persist {
                        if let Some(component) = surface.get_mut(id) {
                            issues.extend(Self::process_control_properties(
                                element,
                                component.as_mut(),
                                true,
                            ));
                        }
                    }
                }
                existing => {
                    if existing.is_some() {
                        tracing::info!("tag type of '{}' changed to {}", id, descriptor.type_name);
                        if let Some(name) = surface.destroy(id, &self.selection) {
                            report.removed.push(name);
                        }
                    }
                    let mut component = descriptor.instantiate();
                    issues.extend(Self::process_control_properties(element, component.as_mut(), false));
                    let name = surface.site_control(Some(id), component)?;
                    report.created.push((name, descriptor.type_name));
                }
            }
        }

        report.issues.extend(issues);
        Ok(PassOutcome::Settled(claimed))
    }

    fn remove_orphans(&self, surface: &mut DesignSurface, claimed: &HashSet<String>, report: &mut ScanReport) {
        let orphans: Vec<String> = surface
            .container
            .names()
            .into_iter()
            .filter(|name| !surface.is_root(name) && !claimed.contains(&name.to_ascii_lowercase()))
            .collect();
        for orphan in orphans {
            tracing::debug!("tag for '{}' is gone", orphan);
            if let Some(name) = surface.destroy(&orphan, &self.selection) {
                report.removed.push(name);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Design-time HTML

    /// Render the current markup for the design surface
    pub fn to_design_time_html(&self) -> DesignTimeHtml {
        let parsed = self.parse();
        let selected = self.selection.get_selected_components();
        let mut surface = self.lock_surface();
        DesignHtmlWriter::new(
            &parsed,
            &mut surface,
            &self.designers,
            &self.options.designer_context,
            &selected,
        )
        .write()
    }
}

/// `<TypeName><n>` unused by both the container and the markup
fn unused_name(container: &DesignContainer, taken: &HashSet<String>, type_name: &str) -> String {
    (1..)
        .map(|n| format!("{}{}", type_name, n))
        .find(|candidate| {
            !container.contains(candidate) && !taken.contains(&candidate.to_ascii_lowercase())
        })
        .unwrap_or_else(|| type_name.to_string())
}
