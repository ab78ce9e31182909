/// Class inheritance resolution.
///
/// Merges members from traits and the parent chain into a single view of
/// a class, respecting precedence:
///
///   class own > traits > parent chain
///
/// A member found in several places is reported once, from the most
/// derived place.  Private members of ancestors are not inherited; private
/// trait members are, because traits are copied into the using class.
use crate::registry::SymbolTables;
use crate::types::{ClassDef, ConstantDef, MethodDef, PropertyDef, Visibility};

/// Depth limit for `extends` chains and nested trait use.
const MAX_DEPTH: u32 = 20;

/// A member together with the class it is visible through.
///
/// `owner` is the class that declared the member, or the class that uses
/// the trait that declared it.  `declared_in` is always the class-like
/// whose source contains the declaration.
#[derive(Debug)]
pub struct Inherited<'a, T> {
    pub owner: &'a ClassDef,
    pub declared_in: &'a ClassDef,
    pub item: &'a T,
}

impl<T> Clone for Inherited<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Inherited<'_, T> {}

/// A class with every member it exposes.
#[derive(Debug, Clone)]
pub struct MergedClass<'a> {
    pub class: &'a ClassDef,
    pub methods: Vec<Inherited<'a, MethodDef>>,
    pub properties: Vec<Inherited<'a, PropertyDef>>,
    pub constants: Vec<Inherited<'a, ConstantDef>>,
}

impl<'a> MergedClass<'a> {
    fn push_class(&mut self, owner: &'a ClassDef, source: &'a ClassDef, inherited: bool) {
        for method in &source.methods {
            if inherited && method.visibility == Visibility::Private {
                continue;
            }
            if self.methods.iter().any(|m| m.item.name.eq_ignore_ascii_case(&method.name)) {
                continue;
            }
            self.methods.push(Inherited {
                owner,
                declared_in: source,
                item: method,
            });
        }
        for property in &source.properties {
            if inherited && property.visibility == Visibility::Private {
                continue;
            }
            if self.properties.iter().any(|p| p.item.name == property.name) {
                continue;
            }
            self.properties.push(Inherited {
                owner,
                declared_in: source,
                item: property,
            });
        }
        for constant in &source.constants {
            if inherited && constant.visibility == Visibility::Private {
                continue;
            }
            if self.constants.iter().any(|c| c.item.name == constant.name) {
                continue;
            }
            self.constants.push(Inherited {
                owner,
                declared_in: source,
                item: constant,
            });
        }
    }

    fn push_traits(
        &mut self,
        symbols: &'a SymbolTables,
        owner: &'a ClassDef,
        traits: &[String],
        inherited: bool,
        depth: u32,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        for name in traits {
            let Some(trait_def) = symbols.get_class(name) else {
                continue;
            };
            self.push_class(owner, trait_def, inherited);
            if !trait_def.traits.is_empty() {
                self.push_traits(symbols, owner, &trait_def.traits, inherited, depth + 1);
            }
        }
    }
}

/// Resolve `class` together with its trait and inherited members.
pub fn resolve_class_with_inheritance<'a>(
    symbols: &'a SymbolTables,
    class: &'a ClassDef,
) -> MergedClass<'a> {
    let mut merged = MergedClass {
        class,
        methods: Vec::new(),
        properties: Vec::new(),
        constants: Vec::new(),
    };
    merged.push_class(class, class, false);
    merged.push_traits(symbols, class, &class.traits, false, 0);

    for parent in ancestors(symbols, class) {
        merged.push_class(parent, parent, true);
        merged.push_traits(symbols, parent, &parent.traits, true, 0);
    }

    // Interfaces contribute abstract signatures and constants.
    let mut seen = vec![class.name.to_ascii_lowercase()];
    let mut queue: Vec<String> = class.interfaces.clone();
    while let Some(name) = queue.pop() {
        if seen.len() > MAX_DEPTH as usize {
            break;
        }
        let Some(iface) = symbols.get_interface(&name) else {
            continue;
        };
        let key = iface.name.to_ascii_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push_class(iface, iface, true);
        queue.extend(iface.interfaces.iter().cloned());
    }
    merged
}

/// The `extends` chain of `class`, nearest parent first.
///
/// Stops at a missing parent, at a cycle, or after [`MAX_DEPTH`] steps.
pub fn ancestors<'a>(symbols: &'a SymbolTables, class: &'a ClassDef) -> Vec<&'a ClassDef> {
    let mut chain: Vec<&'a ClassDef> = Vec::new();
    let mut current = class;
    while let Some(parent_name) = &current.parent {
        if chain.len() as u32 >= MAX_DEPTH {
            break;
        }
        let Some(parent) = symbols.class_like(parent_name) else {
            break;
        };
        if std::ptr::eq(parent, class) || chain.iter().any(|c| std::ptr::eq(*c, parent)) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Every class-like `class` is searched through for a member: itself, its
/// traits, then each ancestor with that ancestor's traits.
fn search_order<'a>(
    symbols: &'a SymbolTables,
    class: &'a ClassDef,
) -> Vec<(&'a ClassDef, &'a ClassDef)> {
    let mut order = vec![(class, class)];
    push_trait_sources(symbols, class, &class.traits, &mut order, 0);
    for parent in ancestors(symbols, class) {
        order.push((parent, parent));
        push_trait_sources(symbols, parent, &parent.traits, &mut order, 0);
    }
    order
}

fn push_trait_sources<'a>(
    symbols: &'a SymbolTables,
    owner: &'a ClassDef,
    traits: &[String],
    out: &mut Vec<(&'a ClassDef, &'a ClassDef)>,
    depth: u32,
) {
    if depth > MAX_DEPTH {
        return;
    }
    for name in traits {
        if let Some(trait_def) = symbols.get_class(name) {
            out.push((owner, trait_def));
            push_trait_sources(symbols, owner, &trait_def.traits, out, depth + 1);
        }
    }
}

/// Look a method up on `class_name` and its parents, any visibility.
pub fn find_method<'a>(
    symbols: &'a SymbolTables,
    class_name: &str,
    method: &str,
) -> Option<Inherited<'a, MethodDef>> {
    find_method_at(symbols, class_name, method, 0)
}

fn find_method_at<'a>(
    symbols: &'a SymbolTables,
    class_name: &str,
    method: &str,
    depth: u32,
) -> Option<Inherited<'a, MethodDef>> {
    if depth > MAX_DEPTH {
        return None;
    }
    let class = symbols.class_like(class_name)?;
    search_order(symbols, class)
        .into_iter()
        .find_map(|(owner, source)| {
            source.method(method).map(|item| Inherited {
                owner,
                declared_in: source,
                item,
            })
        })
        .or_else(|| {
            // Abstract signatures declared on implemented interfaces.
            class
                .interfaces
                .iter()
                .find_map(|iface| find_method_at(symbols, iface, method, depth + 1))
        })
}

pub fn find_property<'a>(
    symbols: &'a SymbolTables,
    class_name: &str,
    property: &str,
) -> Option<Inherited<'a, PropertyDef>> {
    let class = symbols.class_like(class_name)?;
    let property = property.trim_start_matches('$');
    search_order(symbols, class)
        .into_iter()
        .find_map(|(owner, source)| {
            source.property(property).map(|item| Inherited {
                owner,
                declared_in: source,
                item,
            })
        })
}

pub fn find_constant<'a>(
    symbols: &'a SymbolTables,
    class_name: &str,
    constant: &str,
) -> Option<Inherited<'a, ConstantDef>> {
    find_constant_at(symbols, class_name, constant, 0)
}

fn find_constant_at<'a>(
    symbols: &'a SymbolTables,
    class_name: &str,
    constant: &str,
    depth: u32,
) -> Option<Inherited<'a, ConstantDef>> {
    if depth > MAX_DEPTH {
        return None;
    }
    let class = symbols.class_like(class_name)?;
    search_order(symbols, class)
        .into_iter()
        .find_map(|(owner, source)| {
            source.constant(constant).map(|item| Inherited {
                owner,
                declared_in: source,
                item,
            })
        })
        .or_else(|| {
            class
                .interfaces
                .iter()
                .find_map(|iface| find_constant_at(symbols, iface, constant, depth + 1))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn tables(src: &str) -> SymbolTables {
        let parsed = parse_program("file:///inherit.zy", src);
        let mut tables = SymbolTables::default();
        assert!(tables.index_file("file:///inherit.zy", &parsed.program).is_empty());
        tables
    }

    #[test]
    fn child_members_override_parent() {
        let t = tables(
            "<?php\nclass Base { public function run(): int {} private function secret() {} protected $p; }\nclass Child extends Base { public function run(): string {} }\n",
        );
        let child = t.get_class("Child").expect("Child");
        let merged = resolve_class_with_inheritance(&t, child);
        let names: Vec<_> = merged.methods.iter().map(|m| m.item.name.as_str()).collect();
        assert_eq!(names, vec!["run"]);
        assert_eq!(merged.methods[0].owner.name, "Child");
        assert_eq!(merged.properties.len(), 1);
        assert_eq!(merged.properties[0].owner.name, "Base");
    }

    #[test]
    fn trait_members_sit_between_own_and_parent() {
        let t = tables(
            "<?php\ntrait Greets { public function hello() {} public function run() {} }\nclass Base { public function run() {} public function base() {} }\nclass User extends Base { use Greets; }\n",
        );
        let user = t.get_class("User").expect("User");
        let merged = resolve_class_with_inheritance(&t, user);
        let run = merged
            .methods
            .iter()
            .find(|m| m.item.name == "run")
            .expect("run");
        assert_eq!(run.declared_in.name, "Greets");
        assert_eq!(run.owner.name, "User");
        assert!(merged.methods.iter().any(|m| m.item.name == "base"));
    }

    #[test]
    fn finds_private_parent_method_for_navigation() {
        let t = tables(
            "<?php\nclass A { private function hidden() {} }\nclass B extends A {}\n",
        );
        let found = find_method(&t, "B", "HIDDEN").expect("case-insensitive lookup");
        assert_eq!(found.declared_in.name, "A");
    }

    #[test]
    fn circular_extends_terminates() {
        let t = tables("<?php\nclass A extends B {}\nclass B extends A {}\n");
        let a = t.get_class("A").expect("A");
        assert_eq!(ancestors(&t, a).len(), 1);
        assert!(find_method(&t, "A", "missing").is_none());
    }
}
