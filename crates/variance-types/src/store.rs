use std::collections::{HashMap, HashSet};

use crate::{
    ClassDef, ClassId, ClassKind, ClassType, MemberDef, Type, TypeEnv, TypeError, TypeParamDef,
    TypeVarId, WildcardBound, DEFAULT_MAX_RELATION_DEPTH,
};

/// Owned registry of class signatures and declared type parameters.
///
/// The store is built once by the host and then shared read-only by every check. Cyclic bounds
/// are rejected here, at construction, so the relation never has to detect them.
#[derive(Debug, Clone)]
pub struct TypeStore {
    classes: Vec<Option<ClassDef>>,
    class_names: Vec<String>,
    by_name: HashMap<String, ClassId>,
    type_params: Vec<TypeParamDef>,
    max_relation_depth: usize,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            class_names: Vec::new(),
            by_name: HashMap::new(),
            type_params: Vec::new(),
            max_relation_depth: DEFAULT_MAX_RELATION_DEPTH,
        }
    }
}

impl TypeStore {
    /// A store seeded with a small core library:
    ///
    /// - `java.lang.Number`, `Integer`, `Double`, `String`
    /// - `java.lang.Comparable<T>`
    /// - `java.util.Collection<E>` (`add`, and `addAll` consuming `Collection<? extends E>`)
    /// - `java.util.List<E> extends Collection<E>` (`get`, `set`)
    /// - `java.util.ArrayList<E> implements List<E>`
    /// - `java.util.Set<E> extends Collection<E>`
    pub fn with_prelude() -> Self {
        let mut store = Self::default();

        let number = store.add_class(ClassDef::new("java.lang.Number", vec![]));
        let number_ty = Type::class(number, vec![]);

        let comparable_t = store.add_type_param("T", Type::Top);
        let comparable = store.add_class(ClassDef {
            kind: ClassKind::Interface,
            members: vec![MemberDef::consumer(
                "compareTo",
                Type::TypeVar(comparable_t),
            )],
            ..ClassDef::new("java.lang.Comparable", vec![comparable_t])
        });

        for name in ["java.lang.Integer", "java.lang.Double"] {
            let id = store.intern_class_id(name);
            store.define_class(
                id,
                ClassDef {
                    super_class: Some(number_ty.clone()),
                    interfaces: vec![Type::class(comparable, vec![Type::class(id, vec![])])],
                    ..ClassDef::new(name, vec![])
                },
            );
        }

        let string = store.intern_class_id("java.lang.String");
        store.define_class(
            string,
            ClassDef {
                interfaces: vec![Type::class(comparable, vec![Type::class(string, vec![])])],
                ..ClassDef::new("java.lang.String", vec![])
            },
        );

        let collection_e = store.add_type_param("E", Type::Top);
        let collection = store.intern_class_id("java.util.Collection");
        store.define_class(
            collection,
            ClassDef {
                kind: ClassKind::Interface,
                members: vec![
                    MemberDef::consumer("add", Type::TypeVar(collection_e)),
                    MemberDef::consumer(
                        "addAll",
                        Type::class(collection, vec![Type::extends(Type::TypeVar(collection_e))]),
                    ),
                ],
                ..ClassDef::new("java.util.Collection", vec![collection_e])
            },
        );

        let list_e = store.add_type_param("E", Type::Top);
        let list = store.add_class(ClassDef {
            kind: ClassKind::Interface,
            interfaces: vec![Type::class(collection, vec![Type::TypeVar(list_e)])],
            members: vec![
                MemberDef::producer("get", Type::TypeVar(list_e)),
                MemberDef::invariant("set", Type::TypeVar(list_e)),
            ],
            ..ClassDef::new("java.util.List", vec![list_e])
        });

        let array_list_e = store.add_type_param("E", Type::Top);
        store.add_class(ClassDef {
            interfaces: vec![Type::class(list, vec![Type::TypeVar(array_list_e)])],
            ..ClassDef::new("java.util.ArrayList", vec![array_list_e])
        });

        let set_e = store.add_type_param("E", Type::Top);
        store.add_class(ClassDef {
            kind: ClassKind::Interface,
            interfaces: vec![Type::class(collection, vec![Type::TypeVar(set_e)])],
            ..ClassDef::new("java.util.Set", vec![set_e])
        });

        store
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Reserve an id for `name` without defining it, so self-referential signatures can be built.
    pub fn intern_class_id(&mut self, name: impl Into<String>) -> ClassId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = ClassId::from_index(self.classes.len());
        self.classes.push(None);
        self.class_names.push(name.clone());
        self.by_name.insert(name, id);
        id
    }

    pub fn define_class(&mut self, id: ClassId, def: ClassDef) {
        if let Some(slot) = self.classes.get_mut(id.index()) {
            *slot = Some(def);
        }
    }

    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        let id = self.intern_class_id(def.name.clone());
        self.define_class(id, def);
        id
    }

    /// Add a type parameter with the given upper bound.
    ///
    /// A fresh parameter cannot be part of a cycle; use [`TypeStore::define_type_param`] to
    /// redefine a reserved parameter whose bound refers back to other parameters.
    pub fn add_type_param(&mut self, name: impl Into<String>, upper_bound: Type) -> TypeVarId {
        let id = TypeVarId::from_index(self.type_params.len());
        self.type_params.push(TypeParamDef::new(name, upper_bound));
        id
    }

    /// Replace the definition of an existing type parameter.
    ///
    /// Fails with [`TypeError::CyclicBound`] when the new bounds make the parameter reachable
    /// from itself through a chain of bare type variables (`T extends T`, `T extends U extends
    /// T`). Bounds through a class (`E extends Enum<E>`) are fine.
    pub fn define_type_param(&mut self, id: TypeVarId, def: TypeParamDef) -> Result<(), TypeError> {
        if id.is_capture() || id.index() >= self.type_params.len() {
            return Err(TypeError::UnknownTypeParam(id));
        }

        let cyclic = self.bound_chain_reaches(&def.upper_bound, id, false)
            || self.bound_chain_reaches(&def.lower_bound, id, true);
        if cyclic {
            tracing::debug!(
                target: crate::TRACE_TARGET,
                param = %def.name,
                "rejected cyclic type parameter bound"
            );
            return Err(TypeError::CyclicBound { param: def.name });
        }

        self.type_params[id.index()] = def;
        Ok(())
    }

    fn bound_chain_reaches(&self, start: &Type, target: TypeVarId, lower: bool) -> bool {
        let mut seen = HashSet::new();
        let mut current = start;
        while let Type::TypeVar(next) = current {
            if *next == target {
                return true;
            }
            if !seen.insert(*next) {
                return false;
            }
            let Some(def) = self.type_param(*next) else {
                return false;
            };
            current = if lower {
                &def.lower_bound
            } else {
                &def.upper_bound
            };
        }
        false
    }

    pub fn set_max_relation_depth(&mut self, depth: usize) {
        self.max_relation_depth = depth.max(1);
    }

    pub fn class_name(&self, id: ClassId) -> Option<&str> {
        self.class_names.get(id.index()).map(String::as_str)
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.index()).and_then(Option::as_ref)
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        if id.is_capture() {
            return None;
        }
        self.type_params.get(id.index())
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_id(name)
    }

    fn max_relation_depth(&self) -> usize {
        self.max_relation_depth
    }
}

/// Validate the shape of a type tree before it is checked.
///
/// Rejects wildcards outside argument position, unknown classes and type parameters, and
/// argument lists whose length does not match the class's declared parameters. A generic class
/// used without arguments must be spelled [`Type::Raw`].
pub fn check_well_formed(env: &dyn TypeEnv, ty: &Type) -> Result<(), TypeError> {
    fn check(env: &dyn TypeEnv, ty: &Type, as_argument: bool) -> Result<(), TypeError> {
        match ty {
            Type::Top | Type::Null | Type::Void | Type::Primitive(_) => Ok(()),
            Type::TypeVar(id) => env
                .type_param(*id)
                .map(|_| ())
                .ok_or(TypeError::UnknownTypeParam(*id)),
            Type::Raw(def) => env
                .class(*def)
                .map(|_| ())
                .ok_or(TypeError::UnknownClass(*def)),
            Type::Wildcard(bound) => {
                if !as_argument {
                    return Err(TypeError::MisplacedWildcard);
                }
                match bound {
                    WildcardBound::Unbounded => Ok(()),
                    WildcardBound::Extends(inner) | WildcardBound::Super(inner) => {
                        check(env, inner, false)
                    }
                }
            }
            Type::Array(elem) => check(env, elem, false),
            Type::Class(ClassType { def, args }) => {
                let class_def = env.class(*def).ok_or(TypeError::UnknownClass(*def))?;
                if class_def.type_params.len() != args.len() {
                    return Err(TypeError::ArityMismatch {
                        class: class_def.name.clone(),
                        expected: class_def.type_params.len(),
                        found: args.len(),
                    });
                }
                for arg in args {
                    check(env, arg, true)?;
                }
                Ok(())
            }
        }
    }

    check(env, ty, false)
}
