//! store::memory
//!
//! In-memory content repository for deterministic testing.
//!
//! # Design
//!
//! `MemoryStore` keeps two node trees: the persisted tree, which is what
//! every other session would see, and the session's working tree. Direct
//! node writes touch only the working tree; [`save`](ContentStore::save)
//! copies it over the persisted tree and
//! [`refresh(false)`](ContentStore::refresh) throws it away.
//!
//! Workflow actions are staged on a copy of the working tree and, when they
//! succeed, persisted together with the rest of the session. A failed action
//! leaves both trees untouched.
//!
//! The store also exposes hooks for tests:
//! - [`deny`](MemoryStore::deny) forces a hint to `false` on one path
//! - [`fail_on`](MemoryStore::fail_on) injects a failure
//! - [`mutations`](MemoryStore::mutations) records every mutating call
//!
//! # Example
//!
//! ```
//! use content_lifecycle::store::memory::MemoryStore;
//! use content_lifecycle::store::ContentStore;
//!
//! let mut store = MemoryStore::new();
//! store.seed_folder("/content/documents", Some("en")).unwrap();
//!
//! let folder = store.node(&"/content/documents".parse().unwrap()).unwrap();
//! let mut workflow = store.folder_workflow("threepane", &folder).unwrap();
//! assert!(workflow.hints().unwrap().is_true("add"));
//!
//! let handle = workflow.add("new-document", "myapp:article", "news").unwrap();
//! assert_eq!(handle.as_str(), "/content/documents/news");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::Utc;
use tracing::trace;
use uuid::Uuid;

use super::workflow::{
    hint_keys, DefaultWorkflow, DocumentWorkflow, FolderWorkflow, HintValue, Hints,
    TranslationWorkflow,
};
use super::{ContentStore, Document, StoreError};
use crate::core::config::WorkflowConfig;
use crate::core::document::{DocumentState, DraftState, VariantMap};
use crate::core::node::{availability, mixins, node_types, props, Node};
use crate::core::types::{Location, NodeId, VariantState};
use crate::core::value::{PropertyValue, Value};

/// Properties owned by a variant itself rather than by its content.
const VARIANT_OWNED: [&str; 3] = [props::STATE, props::HOLDER, props::AVAILABILITY];

/// Which call should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOn {
    /// `save()`.
    Save,
    /// `refresh()`.
    Refresh,
    /// The workflow action with this hint key (e.g. `"publish"`).
    Action(String),
    /// `set_property()` for this property name.
    SetProperty(String),
}

/// A recorded mutating call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddNode { path: String },
    RemoveNode { path: String },
    AddMixin { path: String, mixin: String },
    SetProperty { path: String, name: String },
    Save,
    Refresh { keep_changes: bool },
    Workflow { action: String, path: String },
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    parent: Option<NodeId>,
    primary_type: String,
    mixins: BTreeSet<String>,
    properties: BTreeMap<String, PropertyValue>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(name: &str, parent: Option<NodeId>, primary_type: &str) -> Self {
        Self {
            name: name.to_string(),
            parent,
            primary_type: primary_type.to_string(),
            mixins: BTreeSet::new(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Tree {
    root: NodeId,
    nodes: HashMap<NodeId, NodeData>,
}

impl Tree {
    fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeData::new("", None, node_types::ROOT));
        Self { root, nodes }
    }

    fn get(&self, id: &NodeId) -> Result<&NodeData, StoreError> {
        self.nodes.get(id).ok_or(StoreError::UnknownId(*id))
    }

    fn get_mut(&mut self, id: &NodeId) -> Result<&mut NodeData, StoreError> {
        self.nodes.get_mut(id).ok_or(StoreError::UnknownId(*id))
    }

    fn location(&self, id: &NodeId) -> Result<Location, StoreError> {
        let mut segments = Vec::new();
        let mut current = *id;
        loop {
            let data = self.get(&current)?;
            match data.parent {
                Some(parent) => {
                    segments.push(data.name.clone());
                    current = parent;
                }
                None => break,
            }
        }
        segments.reverse();
        let path = format!("/{}", segments.join("/"));
        Location::new(path.clone()).map_err(|e| StoreError::InvalidOperation {
            path,
            reason: e.to_string(),
        })
    }

    fn snapshot(&self, id: &NodeId) -> Result<Node, StoreError> {
        let data = self.get(id)?;
        Ok(Node {
            id: *id,
            name: data.name.clone(),
            location: self.location(id)?,
            primary_type: data.primary_type.clone(),
            mixins: data.mixins.clone(),
            properties: data.properties.clone(),
        })
    }

    fn child_named(&self, parent: &NodeId, name: &str) -> Option<NodeId> {
        let data = self.nodes.get(parent)?;
        data.children
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).map(|d| d.name == name).unwrap_or(false))
    }

    fn lookup(&self, location: &Location) -> Option<NodeId> {
        let mut current = self.root;
        for segment in location.segments() {
            current = self.child_named(&current, segment)?;
        }
        Some(current)
    }

    fn insert(
        &mut self,
        parent: &NodeId,
        name: &str,
        primary_type: &str,
    ) -> Result<NodeId, StoreError> {
        if !Location::is_valid_name(name) {
            return Err(StoreError::InvalidOperation {
                path: self.location(parent)?.to_string(),
                reason: format!("invalid node name '{name}'"),
            });
        }
        let id = NodeId::new();
        self.get_mut(parent)?.children.push(id);
        self.nodes
            .insert(id, NodeData::new(name, Some(*parent), primary_type));
        Ok(id)
    }

    fn remove(&mut self, id: &NodeId) -> Result<(), StoreError> {
        let parent = self
            .get(id)?
            .parent
            .ok_or_else(|| StoreError::InvalidOperation {
                path: "/".to_string(),
                reason: "the root node cannot be removed".to_string(),
            })?;
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|c| c != id);
        }
        let mut stack = vec![*id];
        while let Some(next) = stack.pop() {
            if let Some(data) = self.nodes.remove(&next) {
                stack.extend(data.children);
            }
        }
        Ok(())
    }

    fn set(&mut self, id: &NodeId, name: &str, value: PropertyValue) -> Result<(), StoreError> {
        self.get_mut(id)?.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn unset(&mut self, id: &NodeId, name: &str) -> Result<(), StoreError> {
        self.get_mut(id)?.properties.remove(name);
        Ok(())
    }

    fn add_mixin(&mut self, id: &NodeId, mixin: &str) -> Result<(), StoreError> {
        self.get_mut(id)?.mixins.insert(mixin.to_string());
        Ok(())
    }

    /// Deep copy `source` under `new_parent` as `name`, with fresh ids.
    fn copy_subtree(
        &mut self,
        source: &NodeId,
        new_parent: &NodeId,
        name: &str,
    ) -> Result<NodeId, StoreError> {
        let data = self.get(source)?.clone();
        let id = self.insert(new_parent, name, &data.primary_type)?;
        {
            let copy = self.get_mut(&id)?;
            copy.mixins = data.mixins;
            copy.properties = data.properties;
        }
        for child in &data.children {
            let child_name = self.get(child)?.name.clone();
            self.copy_subtree(child, &id, &child_name)?;
        }
        Ok(id)
    }

    /// Replace the content of variant `to` with the content of `from`,
    /// keeping `to`'s own state, holder and availability.
    fn replace_content(&mut self, from: &NodeId, to: &NodeId) -> Result<(), StoreError> {
        let source = self.get(from)?.clone();
        for child in self.get(to)?.children.clone() {
            self.remove(&child)?;
        }
        {
            let target = self.get_mut(to)?;
            let kept: Vec<(String, PropertyValue)> = target
                .properties
                .iter()
                .filter(|(name, _)| VARIANT_OWNED.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect();
            target.properties = source
                .properties
                .into_iter()
                .filter(|(name, _)| !VARIANT_OWNED.contains(&name.as_str()))
                .collect();
            target.properties.extend(kept);
            target.mixins.extend(source.mixins);
        }
        for child in &source.children {
            let child_name = self.get(child)?.name.clone();
            self.copy_subtree(child, to, &child_name)?;
        }
        Ok(())
    }

    fn variant_ids(&self, handle: &NodeId) -> Result<BTreeMap<VariantState, NodeId>, StoreError> {
        let data = self.get(handle)?;
        let mut ids = BTreeMap::new();
        for child in &data.children {
            let variant = self.get(child)?;
            if variant.name != data.name {
                continue;
            }
            let state = variant
                .properties
                .get(props::STATE)
                .and_then(PropertyValue::as_str)
                .and_then(|s| s.parse::<VariantState>().ok());
            if let Some(state) = state {
                ids.entry(state).or_insert(*child);
            }
        }
        Ok(ids)
    }

    fn variant_map(&self, handle: &NodeId) -> Result<VariantMap, StoreError> {
        self.variant_ids(handle)?
            .into_iter()
            .map(|(state, id)| Ok((state, self.snapshot(&id)?)))
            .collect()
    }

    /// The node translating `translation_id` into `locale`.
    fn find_translation(&self, translation_id: &str, locale: &str) -> Option<NodeId> {
        self.nodes.iter().find_map(|(id, data)| {
            let same_id = data
                .properties
                .get(props::TRANSLATION_ID)
                .and_then(PropertyValue::as_str)
                == Some(translation_id);
            let same_locale = data
                .properties
                .get(props::TRANSLATION_LOCALE)
                .and_then(PropertyValue::as_str)
                == Some(locale);
            (same_id && same_locale).then_some(*id)
        })
    }

    fn mark_translated(
        &mut self,
        id: &NodeId,
        locale: &str,
        translation_id: &str,
    ) -> Result<(), StoreError> {
        self.add_mixin(id, mixins::TRANSLATED)?;
        self.set(id, props::TRANSLATION_LOCALE, PropertyValue::string(locale))?;
        self.set(id, props::TRANSLATION_ID, PropertyValue::string(translation_id))
    }

    /// Turn a copied variant into a fresh unpublished variant.
    fn reset_to_unpublished(&mut self, id: &NodeId) -> Result<(), StoreError> {
        self.set(
            id,
            props::STATE,
            PropertyValue::string(VariantState::Unpublished.as_str()),
        )?;
        self.set(
            id,
            props::AVAILABILITY,
            PropertyValue::strings([availability::PREVIEW]),
        )?;
        self.unset(id, props::HOLDER)
    }

    fn ensure_free(&self, parent: &NodeId, name: &str) -> Result<(), StoreError> {
        if self.child_named(parent, name).is_some() {
            return Err(StoreError::ItemExists {
                parent: self.location(parent)?.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

fn now() -> PropertyValue {
    PropertyValue::Single(Value::Date(Utc::now()))
}

fn fresh_translation_id() -> String {
    Uuid::new_v4().to_string()
}

/// In-memory content repository session.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    user: String,
    categories: WorkflowConfig,
    persisted: Tree,
    working: Tree,
    dirty: bool,
    denied: HashSet<(String, String)>,
    fail_on: Option<FailOn>,
    mutations: Vec<Mutation>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty repository with a session for `admin`, using the
    /// default workflow category names.
    pub fn new() -> Self {
        Self::with_categories(WorkflowConfig::default())
    }

    /// Create an empty repository whose workflows are registered under the
    /// category names in `categories`.
    pub fn with_categories(categories: WorkflowConfig) -> Self {
        let tree = Tree::new();
        Self {
            user: "admin".to_string(),
            categories,
            persisted: tree.clone(),
            working: tree,
            dirty: false,
            denied: HashSet::new(),
            fail_on: None,
            mutations: Vec::new(),
        }
    }

    /// Set the session user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Switch the session to act as another user.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    /// Create `path` and any missing ancestors as plain folders. When
    /// `locale` is given, the last folder is marked as translated into it
    /// with a fresh translation id. Seeding persists the session.
    pub fn seed_folder(&mut self, path: &str, locale: Option<&str>) -> Result<Node, StoreError> {
        let location = parse_location(path)?;
        let mut current = self.working.root;
        for segment in location.segments() {
            current = match self.working.child_named(&current, segment) {
                Some(existing) => existing,
                None => {
                    let id = self.working.insert(&current, segment, node_types::FOLDER)?;
                    self.working.add_mixin(&id, mixins::REFERENCEABLE)?;
                    id
                }
            };
        }
        if let Some(locale) = locale {
            self.working
                .mark_translated(&current, locale, &fresh_translation_id())?;
        }
        self.persist_session();
        self.working.snapshot(&current)
    }

    /// Mark the node at `path` as the `locale` translation of
    /// `translation_id`. Seeding persists the session.
    pub fn seed_translation(
        &mut self,
        path: &str,
        locale: &str,
        translation_id: &str,
    ) -> Result<(), StoreError> {
        let id = self.lookup_id(&parse_location(path)?)?;
        self.working.mark_translated(&id, locale, translation_id)?;
        self.persist_session();
        Ok(())
    }

    /// Force `hint` to `false` on the node at `path`.
    pub fn deny(&mut self, path: &str, hint: &str) {
        self.denied.insert((path.to_string(), hint.to_string()));
    }

    /// Remove a forced denial.
    pub fn allow(&mut self, path: &str, hint: &str) {
        self.denied.remove(&(path.to_string(), hint.to_string()));
    }

    /// Make a call fail with `StoreError::Injected`.
    pub fn fail_on(&mut self, fail_on: FailOn) {
        self.fail_on = Some(fail_on);
    }

    /// Clear any injected failure.
    pub fn clear_failure(&mut self) {
        self.fail_on = None;
    }

    /// Every mutating call made so far, in order.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Forget recorded mutations.
    pub fn clear_mutations(&mut self) {
        self.mutations.clear();
    }

    /// Whether a node exists at `location` in the persisted tree.
    pub fn persisted_exists(&self, location: &Location) -> bool {
        self.persisted.lookup(location).is_some()
    }

    /// Snapshot of the node at `location` as other sessions see it.
    pub fn persisted_node(&self, location: &Location) -> Result<Node, StoreError> {
        let id = self
            .persisted
            .lookup(location)
            .ok_or_else(|| StoreError::NotFound(location.to_string()))?;
        self.persisted.snapshot(&id)
    }

    /// Snapshot of the node with the given id as other sessions see it.
    pub fn persisted_node_by_id(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.persisted.snapshot(id)
    }

    /// The persisted variants of the handle at `location`, by state.
    ///
    /// Variants share their handle's name, so they are read by id rather
    /// than by location.
    pub fn persisted_variants(&self, location: &Location) -> Result<VariantMap, StoreError> {
        let id = self
            .persisted
            .lookup(location)
            .ok_or_else(|| StoreError::NotFound(location.to_string()))?;
        self.persisted.variant_map(&id)
    }

    fn lookup_id(&self, location: &Location) -> Result<NodeId, StoreError> {
        self.working
            .lookup(location)
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    fn persist_session(&mut self) {
        self.persisted = self.working.clone();
        self.dirty = false;
    }

    fn check_injected(&self, target: FailOn, context: &str) -> Result<(), StoreError> {
        if self.fail_on.as_ref() == Some(&target) {
            return Err(StoreError::Injected(context.to_string()));
        }
        Ok(())
    }

    fn apply_denials(&self, location: &Location, hints: &mut Hints) {
        for (path, hint) in &self.denied {
            if path == location.as_str() {
                hints.insert(hint, HintValue::Flag(false));
            }
        }
    }

    fn require_workflow(
        &self,
        category: &str,
        expected: &str,
        node: &Node,
        applies: bool,
    ) -> Result<(), StoreError> {
        if category == expected && applies && self.working.nodes.contains_key(&node.id) {
            Ok(())
        } else {
            Err(StoreError::WorkflowUnavailable {
                category: category.to_string(),
                path: node.location.to_string(),
            })
        }
    }

    fn require_hint(&self, hints: &Hints, key: &str, target: &NodeId) -> Result<(), StoreError> {
        if hints.is_true(key) {
            return Ok(());
        }
        Err(StoreError::WorkflowRejected {
            action: key.to_string(),
            path: self.working.location(target)?.to_string(),
            reason: "action not available".to_string(),
        })
    }

    /// Run a workflow action on a staged copy of the session; on success the
    /// session, including earlier pending changes, is persisted.
    fn run_action<T>(
        &mut self,
        action: &str,
        target: &NodeId,
        apply: impl FnOnce(&mut Tree, &str) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let path = self.working.location(target)?;
        self.check_injected(
            FailOn::Action(action.to_string()),
            &format!("{action} on '{path}'"),
        )?;

        let mut staged = self.working.clone();
        let result = apply(&mut staged, &self.user)?;
        self.working = staged;
        self.persist_session();

        trace!(action, path = %path, user = %self.user, "workflow action applied");
        self.mutations.push(Mutation::Workflow {
            action: action.to_string(),
            path: path.to_string(),
        });
        Ok(result)
    }

    fn folder_hints(&self, folder: &NodeId) -> Result<Hints, StoreError> {
        let mut hints = Hints::new().with_flag(hint_keys::ADD, true);
        self.apply_denials(&self.working.location(folder)?, &mut hints);
        Ok(hints)
    }

    fn default_hints(&self, node: &NodeId) -> Result<Hints, StoreError> {
        let mut hints = Hints::new().with_flag(hint_keys::LOCALIZE_NAME, true);
        self.apply_denials(&self.working.location(node)?, &mut hints);
        Ok(hints)
    }

    fn document_hints(&self, handle: &NodeId) -> Result<Hints, StoreError> {
        let state = DocumentState::from_variants(&self.working.variant_map(handle)?);
        let mut hints = Hints::new()
            .with_flag(hint_keys::OBTAIN_EDITABLE_INSTANCE, state.can_obtain())
            .with_flag(hint_keys::DISPOSE_EDITABLE_INSTANCE, state.can_release(&self.user))
            .with_flag(hint_keys::COMMIT_EDITABLE_INSTANCE, state.can_release(&self.user))
            .with_flag(hint_keys::PUBLISH, state.can_publish())
            .with_flag(hint_keys::DEPUBLISH, state.can_depublish())
            .with_flag(hint_keys::DELETE, state.can_delete())
            .with_flag(hint_keys::COPY, state.has_content())
            .with_flag(hint_keys::IS_LIVE, state.live);
        if let Some(holder) = state.draft.holder() {
            hints.insert(hint_keys::IN_USE_BY, HintValue::Text(holder.to_string()));
        }
        self.apply_denials(&self.working.location(handle)?, &mut hints);
        Ok(hints)
    }

    fn translation_hints(&self, node: &NodeId) -> Result<Hints, StoreError> {
        let snapshot = self.working.snapshot(node)?;
        let parent_folder = self.translation_parent(node)?;
        let parent_translated = match parent_folder {
            Some(parent) => self.working.snapshot(&parent)?.translation_id().is_some(),
            None => false,
        };
        let translatable = snapshot.translation_id().is_some()
            && snapshot.locale().is_some()
            && parent_translated;
        let mut hints = Hints::new().with_flag(hint_keys::ADD_TRANSLATION, translatable);
        self.apply_denials(&snapshot.location, &mut hints);
        Ok(hints)
    }

    /// The folder whose translation will hold the translation of `node`: the
    /// parent of a folder, the folder containing a variant's handle.
    fn translation_parent(&self, node: &NodeId) -> Result<Option<NodeId>, StoreError> {
        let data = self.working.get(node)?;
        let Some(parent) = data.parent else {
            return Ok(None);
        };
        if self.working.get(&parent)?.primary_type == node_types::HANDLE {
            Ok(self.working.get(&parent)?.parent)
        } else {
            Ok(Some(parent))
        }
    }
}

fn parse_location(path: &str) -> Result<Location, StoreError> {
    Location::new(path).map_err(|e| StoreError::InvalidOperation {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn rejected(action: &str, path: &Location, reason: impl ToString) -> StoreError {
    StoreError::WorkflowRejected {
        action: action.to_string(),
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl ContentStore for MemoryStore {
    fn user_id(&self) -> &str {
        &self.user
    }

    fn node_exists(&self, location: &Location) -> Result<bool, StoreError> {
        Ok(self.working.lookup(location).is_some())
    }

    fn node(&self, location: &Location) -> Result<Node, StoreError> {
        self.working.snapshot(&self.lookup_id(location)?)
    }

    fn node_by_id(&self, id: &NodeId) -> Result<Node, StoreError> {
        self.working.snapshot(id)
    }

    fn parent(&self, node: &Node) -> Result<Option<Node>, StoreError> {
        match self.working.get(&node.id)?.parent {
            Some(parent) => Ok(Some(self.working.snapshot(&parent)?)),
            None => Ok(None),
        }
    }

    fn children(&self, node: &Node) -> Result<Vec<Node>, StoreError> {
        self.working
            .get(&node.id)?
            .children
            .iter()
            .map(|child| self.working.snapshot(child))
            .collect()
    }

    fn add_node(
        &mut self,
        parent: &NodeId,
        name: &str,
        primary_type: &str,
    ) -> Result<Node, StoreError> {
        let id = self.working.insert(parent, name, primary_type)?;
        let node = self.working.snapshot(&id)?;
        self.dirty = true;
        self.mutations.push(Mutation::AddNode {
            path: node.location.to_string(),
        });
        Ok(node)
    }

    fn remove_node(&mut self, id: &NodeId) -> Result<(), StoreError> {
        let path = self.working.location(id)?;
        self.working.remove(id)?;
        self.dirty = true;
        self.mutations.push(Mutation::RemoveNode {
            path: path.to_string(),
        });
        Ok(())
    }

    fn add_mixin(&mut self, id: &NodeId, mixin: &str) -> Result<(), StoreError> {
        let path = self.working.location(id)?;
        self.working.add_mixin(id, mixin)?;
        self.dirty = true;
        self.mutations.push(Mutation::AddMixin {
            path: path.to_string(),
            mixin: mixin.to_string(),
        });
        Ok(())
    }

    fn set_property(
        &mut self,
        id: &NodeId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), StoreError> {
        let path = self.working.location(id)?;
        self.check_injected(
            FailOn::SetProperty(name.to_string()),
            &format!("set '{name}' on '{path}'"),
        )?;
        self.working.set(id, name, value)?;
        self.dirty = true;
        self.mutations.push(Mutation::SetProperty {
            path: path.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.check_injected(FailOn::Save, "save")?;
        self.persist_session();
        self.mutations.push(Mutation::Save);
        Ok(())
    }

    fn refresh(&mut self, keep_changes: bool) -> Result<(), StoreError> {
        self.check_injected(FailOn::Refresh, "refresh")?;
        if !keep_changes {
            self.working = self.persisted.clone();
            self.dirty = false;
        }
        self.mutations.push(Mutation::Refresh { keep_changes });
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        self.dirty
    }

    fn folder_workflow(
        &mut self,
        category: &str,
        folder: &Node,
    ) -> Result<Box<dyn FolderWorkflow + '_>, StoreError> {
        self.require_workflow(category, &self.categories.folder, folder, folder.is_folder())?;
        Ok(Box::new(MemoryFolderWorkflow {
            store: self,
            folder: folder.id,
        }))
    }

    fn default_workflow(
        &mut self,
        category: &str,
        node: &Node,
    ) -> Result<Box<dyn DefaultWorkflow + '_>, StoreError> {
        let applies = node.is_handle() || node.is_folder();
        self.require_workflow(category, &self.categories.default, node, applies)?;
        Ok(Box::new(MemoryDefaultWorkflow {
            store: self,
            node: node.id,
        }))
    }

    fn document_workflow(
        &mut self,
        category: &str,
        handle: &Node,
    ) -> Result<Box<dyn DocumentWorkflow + '_>, StoreError> {
        self.require_workflow(category, &self.categories.document, handle, handle.is_handle())?;
        Ok(Box::new(MemoryDocumentWorkflow {
            store: self,
            handle: handle.id,
        }))
    }

    fn translation_workflow(
        &mut self,
        category: &str,
        node: &Node,
    ) -> Result<Box<dyn TranslationWorkflow + '_>, StoreError> {
        let expected = if node.is_folder() {
            &self.categories.folder_translation
        } else {
            &self.categories.document_translation
        };
        let applies = node.is_folder() || node.state().is_some();
        self.require_workflow(category, expected, node, applies)?;
        Ok(Box::new(MemoryTranslationWorkflow {
            store: self,
            node: node.id,
        }))
    }
}

struct MemoryFolderWorkflow<'a> {
    store: &'a mut MemoryStore,
    folder: NodeId,
}

impl FolderWorkflow for MemoryFolderWorkflow<'_> {
    fn hints(&self) -> Result<Hints, StoreError> {
        self.store.folder_hints(&self.folder)
    }

    fn add(
        &mut self,
        category: &str,
        primary_type: &str,
        name: &str,
    ) -> Result<Location, StoreError> {
        let hints = self.hints()?;
        self.store.require_hint(&hints, hint_keys::ADD, &self.folder)?;

        let folder = self.folder;
        let creates_document = category == self.store.categories.new_document_category;
        if !creates_document && !(category.starts_with("new-") && category.ends_with("folder")) {
            let path = self.store.working.location(&folder)?;
            return Err(rejected(
                hint_keys::ADD,
                &path,
                format!("unknown add category '{category}'"),
            ));
        }

        self.store.run_action(hint_keys::ADD, &folder, |tree, user| {
            tree.ensure_free(&folder, name)?;
            let parent = tree.snapshot(&folder)?;
            let translation = parent.locale().map(str::to_string);

            let created = if creates_document {
                let handle = tree.insert(&folder, name, node_types::HANDLE)?;
                tree.add_mixin(&handle, mixins::REFERENCEABLE)?;

                let variant = tree.insert(&handle, name, primary_type)?;
                tree.add_mixin(&variant, mixins::REFERENCEABLE)?;
                tree.reset_to_unpublished(&variant)?;
                tree.set(&variant, props::CREATED_BY, PropertyValue::string(user))?;
                tree.set(&variant, props::CREATION_DATE, now())?;
                tree.set(&variant, props::LAST_MODIFIED_BY, PropertyValue::string(user))?;
                tree.set(&variant, props::LAST_MODIFICATION_DATE, now())?;
                if let Some(locale) = &translation {
                    tree.mark_translated(&variant, locale, &fresh_translation_id())?;
                }
                handle
            } else {
                let sub = tree.insert(&folder, name, primary_type)?;
                tree.add_mixin(&sub, mixins::REFERENCEABLE)?;
                if let Some(locale) = &translation {
                    tree.mark_translated(&sub, locale, &fresh_translation_id())?;
                }
                sub
            };
            tree.location(&created)
        })
    }
}

struct MemoryDefaultWorkflow<'a> {
    store: &'a mut MemoryStore,
    node: NodeId,
}

impl DefaultWorkflow for MemoryDefaultWorkflow<'_> {
    fn hints(&self) -> Result<Hints, StoreError> {
        self.store.default_hints(&self.node)
    }

    fn localize_name(&mut self, locale: &str, name: &str) -> Result<(), StoreError> {
        let hints = self.hints()?;
        self.store
            .require_hint(&hints, hint_keys::LOCALIZE_NAME, &self.node)?;

        let node = self.node;
        self.store
            .run_action(hint_keys::LOCALIZE_NAME, &node, |tree, _| {
                tree.set(&node, props::DISPLAY_NAME, PropertyValue::string(name))?;
                let locale = locale.trim();
                if locale.is_empty() || tree.get(&node)?.primary_type != node_types::HANDLE {
                    return Ok(());
                }
                let variants: Vec<NodeId> = tree.variant_ids(&node)?.into_values().collect();
                let translation_id = variants
                    .iter()
                    .find_map(|v| {
                        tree.nodes
                            .get(v)
                            .and_then(|d| d.properties.get(props::TRANSLATION_ID))
                            .and_then(PropertyValue::as_str)
                            .map(str::to_string)
                    })
                    .unwrap_or_else(fresh_translation_id);
                for variant in &variants {
                    tree.mark_translated(variant, locale, &translation_id)?;
                }
                Ok(())
            })
    }
}

struct MemoryDocumentWorkflow<'a> {
    store: &'a mut MemoryStore,
    handle: NodeId,
}

impl MemoryDocumentWorkflow<'_> {
    fn guard(&self, key: &str) -> Result<(), StoreError> {
        let hints = self.hints()?;
        self.store.require_hint(&hints, key, &self.handle)
    }
}

impl DocumentWorkflow for MemoryDocumentWorkflow<'_> {
    fn hints(&self) -> Result<Hints, StoreError> {
        self.store.document_hints(&self.handle)
    }

    fn obtain_editable_instance(&mut self) -> Result<Document, StoreError> {
        const ACTION: &str = hint_keys::OBTAIN_EDITABLE_INSTANCE;
        self.guard(ACTION)?;
        let handle = self.handle;
        self.store.run_action(ACTION, &handle, |tree, user| {
            let path = tree.location(&handle)?;
            let variants = tree.variant_map(&handle)?;
            DraftState::from_variants(&variants)
                .obtain(user)
                .map_err(|e| rejected(ACTION, &path, e))?;

            let ids = tree.variant_ids(&handle)?;
            // A draft left behind without a holder is stale.
            if let Some(stale) = ids.get(&VariantState::Draft) {
                tree.remove(stale)?;
            }
            let source = ids
                .get(&VariantState::Unpublished)
                .or_else(|| ids.get(&VariantState::Published))
                .copied()
                .ok_or_else(|| rejected(ACTION, &path, "document has no content"))?;

            let name = tree.get(&handle)?.name.clone();
            let draft = tree.copy_subtree(&source, &handle, &name)?;
            tree.set(
                &draft,
                props::STATE,
                PropertyValue::string(VariantState::Draft.as_str()),
            )?;
            tree.set(&draft, props::HOLDER, PropertyValue::string(user))?;
            tree.set(&draft, props::AVAILABILITY, PropertyValue::Multiple(Vec::new()))?;
            Ok(Document::new(draft))
        })
    }

    fn dispose_editable_instance(&mut self) -> Result<Document, StoreError> {
        const ACTION: &str = hint_keys::DISPOSE_EDITABLE_INSTANCE;
        self.guard(ACTION)?;
        let handle = self.handle;
        self.store.run_action(ACTION, &handle, |tree, user| {
            let path = tree.location(&handle)?;
            DraftState::from_variants(&tree.variant_map(&handle)?)
                .dispose(user)
                .map_err(|e| rejected(ACTION, &path, e))?;

            let ids = tree.variant_ids(&handle)?;
            if let Some(draft) = ids.get(&VariantState::Draft) {
                tree.remove(draft)?;
            }
            ids.get(&VariantState::Unpublished)
                .or_else(|| ids.get(&VariantState::Published))
                .map(|id| Document::new(*id))
                .ok_or_else(|| rejected(ACTION, &path, "document has no content"))
        })
    }

    fn commit_editable_instance(&mut self) -> Result<Document, StoreError> {
        const ACTION: &str = hint_keys::COMMIT_EDITABLE_INSTANCE;
        self.guard(ACTION)?;
        let handle = self.handle;
        self.store.run_action(ACTION, &handle, |tree, user| {
            let path = tree.location(&handle)?;
            DraftState::from_variants(&tree.variant_map(&handle)?)
                .commit(user)
                .map_err(|e| rejected(ACTION, &path, e))?;

            let ids = tree.variant_ids(&handle)?;
            let draft = ids
                .get(&VariantState::Draft)
                .copied()
                .ok_or_else(|| rejected(ACTION, &path, "no draft to commit"))?;

            let unpublished = match ids.get(&VariantState::Unpublished) {
                Some(existing) => {
                    tree.replace_content(&draft, existing)?;
                    *existing
                }
                None => {
                    let name = tree.get(&handle)?.name.clone();
                    let created = tree.copy_subtree(&draft, &handle, &name)?;
                    tree.reset_to_unpublished(&created)?;
                    created
                }
            };
            tree.set(&unpublished, props::LAST_MODIFIED_BY, PropertyValue::string(user))?;
            tree.set(&unpublished, props::LAST_MODIFICATION_DATE, now())?;
            tree.remove(&draft)?;
            Ok(Document::new(unpublished))
        })
    }

    fn publish(&mut self) -> Result<(), StoreError> {
        const ACTION: &str = hint_keys::PUBLISH;
        self.guard(ACTION)?;
        let handle = self.handle;
        self.store.run_action(ACTION, &handle, |tree, _| {
            let path = tree.location(&handle)?;
            let ids = tree.variant_ids(&handle)?;
            let unpublished = ids
                .get(&VariantState::Unpublished)
                .copied()
                .ok_or_else(|| rejected(ACTION, &path, "nothing to publish"))?;
            if let Some(previous) = ids.get(&VariantState::Published) {
                tree.remove(previous)?;
            }

            let name = tree.get(&handle)?.name.clone();
            let published = tree.copy_subtree(&unpublished, &handle, &name)?;
            tree.set(
                &published,
                props::STATE,
                PropertyValue::string(VariantState::Published.as_str()),
            )?;
            tree.set(
                &published,
                props::AVAILABILITY,
                PropertyValue::strings([availability::LIVE]),
            )?;
            tree.set(&published, props::PUBLICATION_DATE, now())?;
            tree.set(
                &unpublished,
                props::AVAILABILITY,
                PropertyValue::strings([availability::PREVIEW]),
            )
        })
    }

    fn depublish(&mut self) -> Result<(), StoreError> {
        const ACTION: &str = hint_keys::DEPUBLISH;
        self.guard(ACTION)?;
        let handle = self.handle;
        self.store.run_action(ACTION, &handle, |tree, _| {
            let path = tree.location(&handle)?;
            let ids = tree.variant_ids(&handle)?;
            let published = ids
                .get(&VariantState::Published)
                .copied()
                .ok_or_else(|| rejected(ACTION, &path, "document is not published"))?;
            tree.set(&published, props::AVAILABILITY, PropertyValue::Multiple(Vec::new()))?;

            if !ids.contains_key(&VariantState::Unpublished) {
                let name = tree.get(&handle)?.name.clone();
                let unpublished = tree.copy_subtree(&published, &handle, &name)?;
                tree.reset_to_unpublished(&unpublished)?;
            }
            Ok(())
        })
    }

    fn delete(&mut self) -> Result<(), StoreError> {
        const ACTION: &str = hint_keys::DELETE;
        self.guard(ACTION)?;
        let handle = self.handle;
        self.store
            .run_action(ACTION, &handle, |tree, _| tree.remove(&handle))
    }

    fn copy(&mut self, target_folder: &Document, name: &str) -> Result<(), StoreError> {
        const ACTION: &str = hint_keys::COPY;
        self.guard(ACTION)?;
        let handle = self.handle;
        let target = *target_folder.id();
        self.store.run_action(ACTION, &handle, |tree, _| {
            let path = tree.location(&handle)?;
            let folder = tree.snapshot(&target)?;
            if !folder.is_folder() {
                return Err(rejected(
                    ACTION,
                    &path,
                    format!("copy target '{}' is not a folder", folder.location),
                ));
            }
            tree.ensure_free(&target, name)?;

            let ids = tree.variant_ids(&handle)?;
            let source = ids
                .get(&VariantState::Unpublished)
                .or_else(|| ids.get(&VariantState::Published))
                .copied()
                .ok_or_else(|| rejected(ACTION, &path, "document has no content"))?;

            let copy = tree.insert(&target, name, node_types::HANDLE)?;
            tree.add_mixin(&copy, mixins::REFERENCEABLE)?;
            let variant = tree.copy_subtree(&source, &copy, name)?;
            tree.reset_to_unpublished(&variant)?;
            if let Some(locale) = folder.locale() {
                tree.mark_translated(&variant, locale, &fresh_translation_id())?;
            }
            Ok(())
        })
    }
}

struct MemoryTranslationWorkflow<'a> {
    store: &'a mut MemoryStore,
    node: NodeId,
}

impl TranslationWorkflow for MemoryTranslationWorkflow<'_> {
    fn hints(&self) -> Result<Hints, StoreError> {
        self.store.translation_hints(&self.node)
    }

    fn add_translation(&mut self, language: &str, name: &str) -> Result<Document, StoreError> {
        const ACTION: &str = hint_keys::ADD_TRANSLATION;
        let hints = self.hints()?;
        self.store.require_hint(&hints, ACTION, &self.node)?;

        let node = self.node;
        let parent = self.store.translation_parent(&node)?;
        self.store.run_action(ACTION, &node, |tree, _| {
            let source = tree.snapshot(&node)?;
            let path = source.location.clone();
            let language = language.trim();
            if language.is_empty() {
                return Err(rejected(ACTION, &path, "target language is blank"));
            }
            let translation_id = source
                .translation_id()
                .ok_or_else(|| rejected(ACTION, &path, "node is not translatable"))?
                .to_string();
            if tree.find_translation(&translation_id, language).is_some() {
                return Err(rejected(
                    ACTION,
                    &path,
                    format!("a '{language}' translation already exists"),
                ));
            }

            let parent_id = parent
                .and_then(|p| tree.nodes.get(&p))
                .and_then(|d| d.properties.get(props::TRANSLATION_ID))
                .and_then(PropertyValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| rejected(ACTION, &path, "parent folder is not translated"))?;
            let target_parent = tree.find_translation(&parent_id, language).ok_or_else(|| {
                rejected(
                    ACTION,
                    &path,
                    format!("parent folder has no '{language}' translation"),
                )
            })?;
            tree.ensure_free(&target_parent, name)?;

            let created = if source.is_folder() {
                let folder = tree.insert(&target_parent, name, &source.primary_type)?;
                tree.add_mixin(&folder, mixins::REFERENCEABLE)?;
                if let Some(folder_type) = source.property(props::FOLDER_TYPE) {
                    tree.set(&folder, props::FOLDER_TYPE, folder_type.clone())?;
                }
                folder
            } else {
                let handle = tree.insert(&target_parent, name, node_types::HANDLE)?;
                tree.add_mixin(&handle, mixins::REFERENCEABLE)?;
                let variant = tree.copy_subtree(&node, &handle, name)?;
                tree.reset_to_unpublished(&variant)?;
                variant
            };
            tree.mark_translated(&created, language, &translation_id)?;
            Ok(Document::new(created))
        })
    }
}
