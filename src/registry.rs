/// Symbol registry.
///
/// Flat tables of classes, interfaces and free functions keyed by
/// fully-qualified name (case-insensitively, as the language treats these
/// names), plus a two-way index recording which file contributed which
/// symbol.  The index makes [`SymbolTables::invalidate_file`] touch only
/// the symbols of the file being cleared.
///
/// [`SymbolRegistry`] wraps the tables in a single read/write lock: queries
/// share a read guard, document lifecycle events take the write guard.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::ast::{Span, Program};
use crate::declarations;
use crate::error::{RegistryError, SymbolKind};
use crate::types::{ClassDef, FunctionDef, InterfaceDef, short_name};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolKey {
    pub kind: SymbolKind,
    /// Lower-cased fully-qualified name.
    pub name: String,
}

impl SymbolKey {
    fn new(kind: SymbolKind, name: &str) -> Self {
        Self {
            kind,
            name: normalize(name),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim_start_matches('\\').to_ascii_lowercase()
}

/// Comparable view of the registry contents: every symbol with its owning
/// file and declaration span.
pub type RegistrySnapshot = BTreeMap<SymbolKey, (String, Option<Span>)>;

#[derive(Debug, Default, Clone)]
pub struct SymbolTables {
    classes: HashMap<String, ClassDef>,
    interfaces: HashMap<String, InterfaceDef>,
    functions: HashMap<String, FunctionDef>,
    file_to_symbols: HashMap<String, BTreeSet<SymbolKey>>,
    symbol_to_file: HashMap<SymbolKey, String>,
}

impl SymbolTables {
    // ─── Registration ───────────────────────────────────────────────────

    /// Claim `key` for `file`, or report who owns it already.
    ///
    /// Classes and interfaces share one name space: an interface cannot
    /// take the name of another file's class, nor the other way round.
    fn claim(
        &mut self,
        key: SymbolKey,
        display_name: &str,
        file: &str,
        from: Option<&Span>,
    ) -> Result<(), RegistryError> {
        let rival = match key.kind {
            SymbolKind::Class => Some(SymbolKind::Interface),
            SymbolKind::Interface => Some(SymbolKind::Class),
            SymbolKind::Function => None,
        }
        .map(|kind| SymbolKey {
            kind,
            name: key.name.clone(),
        });
        let owner = std::iter::once(&key)
            .chain(rival.as_ref())
            .find_map(|k| self.symbol_to_file.get(k).filter(|owner| *owner != file));
        if let Some(owner) = owner {
            return Err(RegistryError::NamingConflict {
                kind: key.kind,
                name: display_name.to_string(),
                existing: owner.clone(),
                incoming: file.to_string(),
                from: from.cloned(),
            });
        }
        self.file_to_symbols
            .entry(file.to_string())
            .or_default()
            .insert(key.clone());
        self.symbol_to_file.insert(key, file.to_string());
        Ok(())
    }

    pub fn add_class(&mut self, class: ClassDef, file: &str) -> Result<(), RegistryError> {
        let key = SymbolKey::new(SymbolKind::Class, &class.name);
        self.claim(key.clone(), &class.name, file, class.from.as_ref())?;
        self.classes.insert(key.name, class);
        Ok(())
    }

    pub fn add_interface(
        &mut self,
        interface: InterfaceDef,
        file: &str,
    ) -> Result<(), RegistryError> {
        let key = SymbolKey::new(SymbolKind::Interface, &interface.name);
        self.claim(key.clone(), &interface.name, file, interface.from.as_ref())?;
        self.interfaces.insert(key.name, interface);
        Ok(())
    }

    pub fn add_function(&mut self, function: FunctionDef, file: &str) -> Result<(), RegistryError> {
        let key = SymbolKey::new(SymbolKind::Function, &function.name);
        self.claim(key.clone(), &function.name, file, function.from.as_ref())?;
        self.functions.insert(key.name, function);
        Ok(())
    }

    /// Remove every symbol contributed by `file`.
    pub fn invalidate_file(&mut self, file: &str) {
        let Some(keys) = self.file_to_symbols.remove(file) else {
            return;
        };
        for key in keys {
            self.symbol_to_file.remove(&key);
            match key.kind {
                SymbolKind::Class => self.classes.remove(&key.name).map(|_| ()),
                SymbolKind::Interface => self.interfaces.remove(&key.name).map(|_| ()),
                SymbolKind::Function => self.functions.remove(&key.name).map(|_| ()),
            };
        }
    }

    /// Replace everything `file` contributed with the declarations of
    /// `program`.
    ///
    /// Declarations that clash with another file's symbols are skipped and
    /// returned; the rest are registered.
    pub fn index_file(&mut self, file: &str, program: &Program) -> Vec<RegistryError> {
        self.invalidate_file(file);
        let decls = declarations::collect(program);
        let mut conflicts = Vec::new();

        for class in decls.classes {
            if let Err(e) = self.add_class(class, file) {
                conflicts.push(e);
            }
        }
        for interface in decls.interfaces {
            if let Err(e) = self.add_interface(interface, file) {
                conflicts.push(e);
            }
        }
        for function in decls.functions {
            if let Err(e) = self.add_function(function, file) {
                conflicts.push(e);
            }
        }
        conflicts
    }

    // ─── Lookup ─────────────────────────────────────────────────────────

    pub fn get_class(&self, name: &str) -> Option<&ClassDef> {
        lookup(&self.classes, name)
    }

    pub fn get_interface(&self, name: &str) -> Option<&InterfaceDef> {
        lookup(&self.interfaces, name)
    }

    pub fn get_func(&self, name: &str) -> Option<&FunctionDef> {
        lookup(&self.functions, name)
    }

    /// A class, or failing that an interface, called `name`.
    pub fn class_like(&self, name: &str) -> Option<&ClassDef> {
        self.get_class(name).or_else(|| self.get_interface(name))
    }

    /// All classes, sorted by name.
    pub fn classes(&self) -> Vec<&ClassDef> {
        let mut all: Vec<&ClassDef> = self.classes.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// All classes and interfaces, sorted by name.
    pub fn class_likes(&self) -> Vec<&ClassDef> {
        let mut all: Vec<&ClassDef> = self
            .classes
            .values()
            .chain(self.interfaces.values())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// All functions, sorted by name.
    pub fn functions(&self) -> Vec<&FunctionDef> {
        let mut all: Vec<&FunctionDef> = self.functions.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// File that contributed the symbol.
    pub fn file_of(&self, kind: SymbolKind, name: &str) -> Option<&str> {
        self.symbol_to_file
            .get(&SymbolKey::new(kind, name))
            .map(String::as_str)
    }

    pub fn symbols_in_file(&self, file: &str) -> Vec<SymbolKey> {
        self.file_to_symbols
            .get(file)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.symbol_to_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_to_file.is_empty()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.symbol_to_file
            .iter()
            .map(|(key, file)| {
                let from = match key.kind {
                    SymbolKind::Class => self.classes.get(&key.name).and_then(|c| c.from.clone()),
                    SymbolKind::Interface => {
                        self.interfaces.get(&key.name).and_then(|c| c.from.clone())
                    }
                    SymbolKind::Function => {
                        self.functions.get(&key.name).and_then(|f| f.from.clone())
                    }
                };
                (key.clone(), (file.clone(), from))
            })
            .collect()
    }
}

/// Exact (case-insensitive) match first.  An unqualified name that misses
/// falls back to the alphabetically first symbol with that short name; a
/// name written with any namespace separator never does.
fn lookup<'a, T>(table: &'a HashMap<String, T>, name: &str) -> Option<&'a T> {
    let key = normalize(name);
    if key.is_empty() {
        return None;
    }
    if let Some(found) = table.get(&key) {
        return Some(found);
    }
    if name.contains('\\') {
        return None;
    }
    table
        .iter()
        .filter(|(k, _)| short_name(k) == key)
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, v)| v)
}

/// Process-wide symbol registry guarded by one read/write lock.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    inner: RwLock<SymbolTables>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared access for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, SymbolTables> {
        self.inner.read()
    }

    pub fn add_class(&self, class: ClassDef, file: &str) -> Result<(), RegistryError> {
        self.inner.write().add_class(class, file)
    }

    pub fn add_interface(&self, interface: InterfaceDef, file: &str) -> Result<(), RegistryError> {
        self.inner.write().add_interface(interface, file)
    }

    pub fn add_function(&self, function: FunctionDef, file: &str) -> Result<(), RegistryError> {
        self.inner.write().add_function(function, file)
    }

    pub fn get_class(&self, name: &str) -> Option<ClassDef> {
        self.inner.read().get_class(name).cloned()
    }

    pub fn get_interface(&self, name: &str) -> Option<InterfaceDef> {
        self.inner.read().get_interface(name).cloned()
    }

    pub fn get_func(&self, name: &str) -> Option<FunctionDef> {
        self.inner.read().get_func(name).cloned()
    }

    pub fn index_file(&self, file: &str, program: &Program) -> Vec<RegistryError> {
        let conflicts = self.inner.write().index_file(file, program);
        for conflict in &conflicts {
            warn!("{conflict}");
        }
        debug!(file, conflicts = conflicts.len(), "indexed file");
        conflicts
    }

    /// [`SymbolRegistry::index_file`], unless `skip(file)` holds once the
    /// write guard is taken.  Returns `None` when the file was skipped.
    pub fn index_file_unless(
        &self,
        file: &str,
        program: &Program,
        skip: impl FnOnce(&str) -> bool,
    ) -> Option<Vec<RegistryError>> {
        let mut tables = self.inner.write();
        if skip(file) {
            debug!(file, "skipped indexing");
            return None;
        }
        let conflicts = tables.index_file(file, program);
        drop(tables);
        for conflict in &conflicts {
            warn!("{conflict}");
        }
        debug!(file, conflicts = conflicts.len(), "indexed file");
        Some(conflicts)
    }

    pub fn invalidate_file(&self, file: &str) {
        self.inner.write().invalidate_file(file);
        debug!(file, "invalidated file");
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.read().snapshot()
    }
}
