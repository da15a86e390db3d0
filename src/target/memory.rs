// src/target/memory.rs

//! In-memory target
//!
//! Keeps the whole tree in a `BTreeMap` keyed by normalized path, so
//! descendants of a directory are a contiguous key range. Parent
//! directories are created implicitly by writes, renames and copies, the
//! same way `LocalTarget` behaves.
//!
//! Failures can be injected per path with [`MemoryTarget::fail_on`] (any
//! operation touching that path or anything under it fails with a backend
//! error) or [`MemoryTarget::fail_writes_on`] (reads still succeed).

use super::{
    target_path, Target, TargetError, TargetResult, Visibility, VisibilityModel,
};
use crate::path::{is_within, parent};
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    All,
    Writes,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    visibility: Visibility,
    mode: Option<u32>,
}

impl Node {
    fn file(content: Vec<u8>) -> Self {
        Self {
            kind: NodeKind::File(content),
            visibility: Visibility::Public,
            mode: None,
        }
    }

    fn dir() -> Self {
        Self {
            kind: NodeKind::Dir,
            visibility: Visibility::Public,
            mode: None,
        }
    }

    fn is_dir(&self) -> bool {
        self.kind == NodeKind::Dir
    }
}

/// Target backed by an in-memory tree
#[derive(Debug)]
pub struct MemoryTarget {
    nodes: Mutex<BTreeMap<String, Node>>,
    failures: Mutex<BTreeMap<String, Failure>>,
    model: VisibilityModel,
    public_mode: AtomicU32,
    private_mode: u32,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTarget {
    /// Create an empty target with the binary visibility model
    pub fn new() -> Self {
        Self {
            nodes: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(BTreeMap::new()),
            model: VisibilityModel::Binary,
            public_mode: AtomicU32::new(0),
            private_mode: 0,
        }
    }

    /// Create an empty target with the numeric visibility model
    pub fn with_modes(public_mode: u32, private_mode: u32) -> Self {
        Self {
            model: VisibilityModel::Numeric,
            public_mode: AtomicU32::new(public_mode),
            private_mode,
            ..Self::new()
        }
    }

    /// Seed a file (builder style, for test setup)
    pub fn with_file(self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        if let Ok(path) = target_path(path) {
            let mut nodes = self.lock_nodes();
            ensure_parents(&mut nodes, &path);
            nodes.insert(path, Node::file(contents.as_ref().to_vec()));
        }
        self
    }

    /// Seed a directory (builder style, for test setup)
    pub fn with_dir(self, path: &str) -> Self {
        if let Ok(path) = target_path(path) {
            let mut nodes = self.lock_nodes();
            ensure_parents(&mut nodes, &path);
            nodes.insert(path, Node::dir());
        }
        self
    }

    /// Make every operation touching `path` fail with a backend error
    pub fn fail_on(&self, path: &str) {
        if let Ok(path) = target_path(path) {
            self.lock_failures().insert(path, Failure::All);
        }
    }

    /// Make every mutation touching `path` fail; reads keep working
    pub fn fail_writes_on(&self, path: &str) {
        if let Ok(path) = target_path(path) {
            self.lock_failures().insert(path, Failure::Writes);
        }
    }

    /// Stop injecting failures for `path`
    pub fn clear_failure(&self, path: &str) {
        if let Ok(path) = target_path(path) {
            self.lock_failures().remove(&path);
        }
    }

    /// Raw content of a file, `None` if missing or a directory
    pub fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        let path = target_path(path).ok()?;
        match &self.lock_nodes().get(&path)?.kind {
            NodeKind::File(content) => Some(content.clone()),
            NodeKind::Dir => None,
        }
    }

    /// Numeric mode last applied to an entry
    pub fn mode(&self, path: &str) -> Option<u32> {
        let path = target_path(path).ok()?;
        self.lock_nodes().get(&path)?.mode
    }

    pub fn is_dir(&self, path: &str) -> bool {
        target_path(path)
            .ok()
            .and_then(|path| self.lock_nodes().get(&path).map(Node::is_dir))
            .unwrap_or(false)
    }

    /// All entry paths, sorted
    pub fn paths(&self) -> Vec<String> {
        self.lock_nodes().keys().cloned().collect()
    }

    fn lock_nodes(&self) -> MutexGuard<'_, BTreeMap<String, Node>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failures(&self) -> MutexGuard<'_, BTreeMap<String, Failure>> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Normalize a path for a read and check it against injected failures
    fn checked(&self, path: &str) -> TargetResult<String> {
        self.check(path, false)
    }

    /// Normalize a path for a mutation and check it against injected failures
    fn checked_mut(&self, path: &str) -> TargetResult<String> {
        self.check(path, true)
    }

    fn check(&self, path: &str, mutation: bool) -> TargetResult<String> {
        let path = target_path(path)?;
        let failures = self.lock_failures();
        let failing = failures.iter().any(|(failing, failure)| {
            is_within(&path, failing) && (mutation || *failure == Failure::All)
        });
        if failing {
            return Err(TargetError::Backend(format!("injected failure: {}", path)));
        }
        Ok(path)
    }

    fn mode_for(&self, visibility: Visibility) -> Option<u32> {
        match (self.model, visibility) {
            (VisibilityModel::Binary, _) => None,
            (VisibilityModel::Numeric, Visibility::Public) => {
                Some(self.public_mode.load(Ordering::SeqCst))
            }
            (VisibilityModel::Numeric, Visibility::Private) => Some(self.private_mode),
        }
    }
}

/// Insert directory nodes for every missing ancestor of `path`
fn ensure_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut current = parent(path);
    while let Some(dir) = current {
        nodes.entry(dir.to_string()).or_insert_with(Node::dir);
        current = parent(dir);
    }
}

/// Keys of `path` and everything below it
fn subtree(nodes: &BTreeMap<String, Node>, path: &str) -> Vec<String> {
    nodes
        .range(path.to_string()..)
        .map(|(key, _)| key)
        .take_while(|key| key.starts_with(path))
        .filter(|key| is_within(key, path))
        .cloned()
        .collect()
}

/// Destination key for `key` when `from` is relocated to `to`
fn relocate(key: &str, from: &str, to: &str) -> String {
    format!("{}{}", to, &key[from.len()..])
}

impl Target for MemoryTarget {
    fn visibility_model(&self) -> VisibilityModel {
        self.model
    }

    fn has(&self, path: &str) -> TargetResult<bool> {
        let path = self.checked(path)?;
        Ok(self.lock_nodes().contains_key(&path))
    }

    fn is_directory(&self, path: &str) -> TargetResult<bool> {
        let path = self.checked(path)?;
        match self.lock_nodes().get(&path) {
            Some(node) => Ok(node.is_dir()),
            None => Err(TargetError::NotFound(path)),
        }
    }

    fn read(&self, path: &str) -> TargetResult<String> {
        let path = self.checked(path)?;
        match self.lock_nodes().get(&path).map(|node| &node.kind) {
            Some(NodeKind::File(content)) => Ok(String::from_utf8_lossy(content).into_owned()),
            Some(NodeKind::Dir) => Err(TargetError::Backend(format!("{} is a directory", path))),
            None => Err(TargetError::NotFound(path)),
        }
    }

    fn write(&self, path: &str, contents: &str) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mut nodes = self.lock_nodes();
        if nodes.contains_key(&path) {
            return Err(TargetError::AlreadyExists(path));
        }
        ensure_parents(&mut nodes, &path);
        nodes.insert(path, Node::file(contents.as_bytes().to_vec()));
        Ok(())
    }

    fn update(&self, path: &str, contents: &str) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mut nodes = self.lock_nodes();
        match nodes.get_mut(&path) {
            Some(node) if !node.is_dir() => {
                node.kind = NodeKind::File(contents.as_bytes().to_vec());
                Ok(())
            }
            Some(_) => Err(TargetError::Backend(format!("{} is a directory", path))),
            None => Err(TargetError::NotFound(path)),
        }
    }

    fn write_stream(&self, path: &str, reader: &mut dyn Read) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| TargetError::Backend(format!("reading stream for {}: {}", path, e)))?;

        let mut nodes = self.lock_nodes();
        if nodes.get(&path).is_some_and(Node::is_dir) {
            return Err(TargetError::Backend(format!("{} is a directory", path)));
        }
        ensure_parents(&mut nodes, &path);
        nodes.insert(path, Node::file(content));
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> TargetResult<()> {
        let from = self.checked_mut(from)?;
        let to = self.checked_mut(to)?;
        let mut nodes = self.lock_nodes();

        if !nodes.contains_key(&from) {
            return Err(TargetError::NotFound(from));
        }
        if nodes.contains_key(&to) {
            return Err(TargetError::AlreadyExists(to));
        }
        if is_within(&to, &from) {
            return Err(TargetError::Backend(format!(
                "cannot move {} into itself ({})",
                from, to
            )));
        }

        ensure_parents(&mut nodes, &to);
        for key in subtree(&nodes, &from) {
            if let Some(node) = nodes.remove(&key) {
                nodes.insert(relocate(&key, &from, &to), node);
            }
        }
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> TargetResult<()> {
        let from = self.checked(from)?;
        let to = self.checked_mut(to)?;
        let mut nodes = self.lock_nodes();

        if !nodes.contains_key(&from) {
            return Err(TargetError::NotFound(from));
        }
        if nodes.contains_key(&to) {
            return Err(TargetError::AlreadyExists(to));
        }

        ensure_parents(&mut nodes, &to);
        let copies: Vec<(String, Node)> = subtree(&nodes, &from)
            .into_iter()
            .filter_map(|key| {
                let node = nodes.get(&key)?.clone();
                Some((relocate(&key, &from, &to), node))
            })
            .collect();
        nodes.extend(copies);
        Ok(())
    }

    fn delete(&self, path: &str) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mut nodes = self.lock_nodes();
        match nodes.get(&path).map(Node::is_dir) {
            Some(true) => Err(TargetError::Backend(format!("{} is a directory", path))),
            Some(false) => {
                nodes.remove(&path);
                Ok(())
            }
            None => Err(TargetError::NotFound(path)),
        }
    }

    fn delete_dir(&self, path: &str) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mut nodes = self.lock_nodes();
        match nodes.get(&path).map(Node::is_dir) {
            Some(true) => {
                for key in subtree(&nodes, &path) {
                    nodes.remove(&key);
                }
                Ok(())
            }
            Some(false) => Err(TargetError::Backend(format!("{} is not a directory", path))),
            None => Err(TargetError::NotFound(path)),
        }
    }

    fn create_dir(&self, path: &str) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mut nodes = self.lock_nodes();
        if nodes.contains_key(&path) {
            return Err(TargetError::AlreadyExists(path));
        }
        ensure_parents(&mut nodes, &path);
        nodes.insert(path, Node::dir());
        Ok(())
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> TargetResult<()> {
        let path = self.checked_mut(path)?;
        let mode = self.mode_for(visibility);
        let mut nodes = self.lock_nodes();
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| TargetError::NotFound(path.clone()))?;
        node.visibility = visibility;
        node.mode = mode;
        Ok(())
    }

    fn visibility(&self, path: &str) -> TargetResult<Visibility> {
        let path = self.checked(path)?;
        self.lock_nodes()
            .get(&path)
            .map(|node| node.visibility)
            .ok_or(TargetError::NotFound(path))
    }

    fn public_mode(&self) -> Option<u32> {
        match self.model {
            VisibilityModel::Numeric => Some(self.public_mode.load(Ordering::SeqCst)),
            VisibilityModel::Binary => None,
        }
    }

    fn set_public_mode(&self, mode: u32) -> TargetResult<()> {
        match self.model {
            VisibilityModel::Numeric => {
                self.public_mode.store(mode, Ordering::SeqCst);
                Ok(())
            }
            VisibilityModel::Binary => Err(TargetError::Unsupported(
                "public mode override".to_string(),
            )),
        }
    }
}
