//! In-process registry backend.
//!
//! Reproduces the contracts of the native registry calls on every platform:
//! case-insensitive names, create dispositions, short-buffer reporting, key
//! statistics and last-write timestamps. Subkeys enumerate in name order,
//! values in insertion order.

use crate::access::AccessRights;
use crate::backend::RegistryBackend;
use crate::error::{
    RegistryError, Result, ERROR_ACCESS_DENIED, ERROR_BAD_NETPATH, ERROR_INVALID_HANDLE,
};
use crate::handle::{RawKey, RootKey};
use crate::key::{filetime_now, KeyStatistics};
use crate::utils::{read_utf16_string, utf16_len};
use crate::value_type::ValueType;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::debug;

/// Win32 status: the parameter is incorrect.
const ERROR_INVALID_PARAMETER: u32 = 87;

/// Win32 status: the data is invalid.
const ERROR_INVALID_DATA: u32 = 13;

/// Win32 status: illegal operation on a key marked for deletion.
const ERROR_KEY_DELETED: u32 = 1018;

/// First identifier handed out for opened keys.
const FIRST_HANDLE: usize = 0x1000;

type NodeId = u64;

#[derive(Debug)]
struct StoredValue {
    name: String,
    value_type: ValueType,
    data: Vec<u8>,
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    /// Lower-cased name -> child.
    children: BTreeMap<String, NodeId>,
    values: Vec<StoredValue>,
    last_write: u64,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: BTreeMap::new(),
            values: Vec::new(),
            last_write: filetime_now(),
        }
    }

    fn value_index(&self, name: &str) -> Option<usize> {
        let wanted = fold(name);
        self.values.iter().position(|value| fold(&value.name) == wanted)
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenKey {
    node: NodeId,
    access: AccessRights,
}

#[derive(Debug)]
struct State {
    nodes: HashMap<NodeId, Node>,
    roots: HashMap<RawKey, NodeId>,
    handles: HashMap<RawKey, OpenKey>,
    next_node: NodeId,
    next_handle: usize,
}

impl State {
    fn insert_node(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id, Node::new(name, parent));
        id
    }

    fn insert_handle(&mut self, node: NodeId, access: AccessRights) -> RawKey {
        let raw = RawKey(self.next_handle);
        self.next_handle += 4;
        self.handles.insert(raw, OpenKey { node, access });
        raw
    }

    /// Resolves an identifier to the key it names and the access it holds.
    fn resolve(&self, key: RawKey) -> Result<OpenKey> {
        if let Some(&node) = self.roots.get(&key) {
            return Ok(OpenKey {
                node,
                access: AccessRights::ALL_ACCESS,
            });
        }

        let open = self
            .handles
            .get(&key)
            .copied()
            .ok_or(RegistryError::Os {
                code: ERROR_INVALID_HANDLE,
            })?;

        if !self.nodes.contains_key(&open.node) {
            return Err(RegistryError::Os {
                code: ERROR_KEY_DELETED,
            });
        }
        Ok(open)
    }

    /// Resolves an identifier and checks it was opened with `required`.
    fn resolve_with(&self, key: RawKey, required: AccessRights) -> Result<NodeId> {
        let open = self.resolve(key)?;
        if !open.access.contains(required) {
            return Err(RegistryError::Os {
                code: ERROR_ACCESS_DENIED,
            });
        }
        Ok(open.node)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(RegistryError::Os {
            code: ERROR_KEY_DELETED,
        })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(RegistryError::Os {
            code: ERROR_KEY_DELETED,
        })
    }

    fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .get(&id)
            .and_then(|node| node.children.get(&fold(name)).copied())
    }

    /// Walks `path` below `start`.
    fn lookup(&self, start: NodeId, path: &str) -> Result<NodeId> {
        let mut current = start;
        for component in components(path) {
            current = self.child(current, component).ok_or(RegistryError::NotExist)?;
        }
        Ok(current)
    }
}

/// Registry tree held in process memory.
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    /// Creates a registry with the predefined roots and a `Software` key under
    /// `HKEY_CURRENT_USER` and `HKEY_LOCAL_MACHINE`.
    pub fn new() -> Self {
        let mut state = State {
            nodes: HashMap::new(),
            roots: HashMap::new(),
            handles: HashMap::new(),
            next_node: 1,
            next_handle: FIRST_HANDLE,
        };

        for root in RootKey::ALL {
            let id = state.insert_node(root.name(), None);
            state.roots.insert(root.raw(), id);
        }

        for root in [RootKey::CURRENT_USER, RootKey::LOCAL_MACHINE] {
            let root_id = state.roots[&root.raw()];
            let software = state.insert_node("Software", Some(root_id));
            if let Some(node) = state.nodes.get_mut(&root_id) {
                node.children.insert(fold("Software"), software);
            }
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Returns the access mask an identifier was opened with.
    ///
    /// Predefined roots report [`AccessRights::ALL_ACCESS`].
    pub fn access_of(&self, key: RawKey) -> Option<AccessRights> {
        self.read().resolve(key).ok().map(|open| open.access)
    }

    /// Number of identifiers currently open (predefined roots excluded).
    pub fn open_handle_count(&self) -> usize {
        self.read().handles.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().expect("memory registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().expect("memory registry lock poisoned")
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBackend for MemoryBackend {
    fn open_key(&self, parent: RawKey, path: &str, access: AccessRights) -> Result<RawKey> {
        let mut state = self.write();
        let start = state.resolve(parent)?.node;
        let node = state.lookup(start, path)?;
        let raw = state.insert_handle(node, access);
        debug!(?raw, path, "Opened in-memory key");
        Ok(raw)
    }

    fn create_key(
        &self,
        parent: RawKey,
        path: &str,
        access: AccessRights,
    ) -> Result<(RawKey, bool)> {
        let mut state = self.write();
        let mut current = state.resolve(parent)?.node;
        let mut existed = true;

        for component in components(path) {
            current = match state.child(current, component) {
                Some(child) => child,
                None => {
                    existed = false;
                    let child = state.insert_node(component, Some(current));
                    let node = state.node_mut(current)?;
                    node.children.insert(fold(component), child);
                    node.last_write = filetime_now();
                    child
                }
            };
        }

        let raw = state.insert_handle(current, access);
        debug!(?raw, path, existed, "Created in-memory key");
        Ok((raw, existed))
    }

    fn delete_key(&self, parent: RawKey, path: &str) -> Result<()> {
        let mut state = self.write();
        if components(path).next().is_none() {
            return Err(RegistryError::Os {
                code: ERROR_INVALID_PARAMETER,
            });
        }

        let start = state.resolve(parent)?.node;
        let target = state.lookup(start, path)?;
        let node = state.node(target)?;
        if !node.children.is_empty() {
            return Err(RegistryError::Os {
                code: ERROR_ACCESS_DENIED,
            });
        }

        let folded = fold(&node.name);
        let owner = node.parent;
        state.nodes.remove(&target);
        if let Some(owner) = owner {
            let owner = state.node_mut(owner)?;
            owner.children.remove(&folded);
            owner.last_write = filetime_now();
        }
        debug!(path, "Deleted in-memory key");
        Ok(())
    }

    fn close_key(&self, key: RawKey) -> Result<()> {
        if key.is_predefined() {
            return Ok(());
        }
        match self.write().handles.remove(&key) {
            Some(_) => Ok(()),
            None => Err(RegistryError::Os {
                code: ERROR_INVALID_HANDLE,
            }),
        }
    }

    fn connect_remote(&self, host: &str, root: RawKey) -> Result<RawKey> {
        let host = host.trim_start_matches('\\');
        if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
            return Err(RegistryError::Os {
                code: ERROR_BAD_NETPATH,
            });
        }

        let mut state = self.write();
        let node = state.roots.get(&root).copied().ok_or(RegistryError::Os {
            code: ERROR_INVALID_HANDLE,
        })?;
        Ok(state.insert_handle(node, AccessRights::ALL_ACCESS))
    }

    fn query_value(
        &self,
        key: RawKey,
        name: &str,
        buf: Option<&mut [u8]>,
    ) -> Result<(usize, ValueType)> {
        let state = self.read();
        let node = state.node(state.resolve_with(key, AccessRights::QUERY_VALUE)?)?;
        let index = node.value_index(name).ok_or(RegistryError::NotExist)?;
        let value = &node.values[index];
        let required = value.data.len();

        match buf {
            None => Ok((required, value.value_type)),
            Some(buf) if buf.len() < required => Err(RegistryError::ShortBuffer {
                required,
                value_type: value.value_type,
            }),
            Some(buf) => {
                buf[..required].copy_from_slice(&value.data);
                Ok((required, value.value_type))
            }
        }
    }

    fn set_value(&self, key: RawKey, name: &str, value_type: ValueType, data: &[u8]) -> Result<()> {
        let mut state = self.write();
        let id = state.resolve_with(key, AccessRights::SET_VALUE)?;
        let node = state.node_mut(id)?;

        match node.value_index(name) {
            Some(index) => {
                let value = &mut node.values[index];
                value.value_type = value_type;
                value.data = data.to_vec();
            }
            None => node.values.push(StoredValue {
                name: name.to_string(),
                value_type,
                data: data.to_vec(),
            }),
        }
        node.last_write = filetime_now();
        Ok(())
    }

    fn delete_value(&self, key: RawKey, name: &str) -> Result<()> {
        let mut state = self.write();
        let id = state.resolve_with(key, AccessRights::SET_VALUE)?;
        let node = state.node_mut(id)?;
        let index = node.value_index(name).ok_or(RegistryError::NotExist)?;
        node.values.remove(index);
        node.last_write = filetime_now();
        Ok(())
    }

    fn enum_key(&self, key: RawKey, index: u32) -> Result<Option<String>> {
        let state = self.read();
        let node = state.node(state.resolve_with(key, AccessRights::ENUMERATE_SUB_KEYS)?)?;
        Ok(node
            .children
            .values()
            .nth(index as usize)
            .and_then(|child| state.nodes.get(child))
            .map(|child| child.name.clone()))
    }

    fn enum_value(&self, key: RawKey, index: u32) -> Result<Option<String>> {
        let state = self.read();
        let node = state.node(state.resolve_with(key, AccessRights::QUERY_VALUE)?)?;
        Ok(node.values.get(index as usize).map(|value| value.name.clone()))
    }

    fn query_info(&self, key: RawKey) -> Result<KeyStatistics> {
        let state = self.read();
        let node = state.node(state.resolve_with(key, AccessRights::QUERY_VALUE)?)?;

        let max_subkey_len = node
            .children
            .values()
            .filter_map(|child| state.nodes.get(child))
            .map(|child| utf16_len(&child.name))
            .max()
            .unwrap_or(0);

        Ok(KeyStatistics {
            subkey_count: node.children.len() as u32,
            max_subkey_len,
            value_count: node.values.len() as u32,
            max_value_name_len: node.values.iter().map(|v| utf16_len(&v.name)).max().unwrap_or(0),
            max_value_len: node.values.iter().map(|v| v.data.len() as u32).max().unwrap_or(0),
            last_write: node.last_write,
        })
    }

    fn load_mui_string(&self, key: RawKey, name: &str) -> Result<String> {
        let state = self.read();
        let node = state.node(state.resolve_with(key, AccessRights::QUERY_VALUE)?)?;
        let index = node.value_index(name).ok_or(RegistryError::NotExist)?;
        let value = &node.values[index];

        if !value.value_type.is_string() {
            return Err(RegistryError::Os {
                code: ERROR_INVALID_DATA,
            });
        }

        let text = read_utf16_string(&value.data);
        // Indirect "@resource,-id" strings need a resource module to resolve
        if text.starts_with('@') {
            return Err(RegistryError::NotExist);
        }
        Ok(text)
    }
}

/// Splits a registry path into its non-empty components.
fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|component| !component.is_empty())
}

/// Case-folds a key or value name for comparison.
fn fold(name: &str) -> String {
    name.to_lowercase()
}
