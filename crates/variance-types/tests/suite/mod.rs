mod access;
mod capture;

use variance_types::{ClassDef, ClassId, MemberDef, Type, TypeStore};

/// The prelude plus a small user hierarchy:
///
/// ```text
/// class Top
/// class Middle extends Top
/// class Bottom extends Middle
/// class OtherBottom extends Middle
/// class SomeThingInsideMe<T> { T value; }
/// class SomeContainingClass<T> extends SomeThingInsideMe<T> { T give(); void take(T); }
/// ```
pub struct Fixture {
    pub env: TypeStore,
    pub number: Type,
    pub integer: Type,
    pub double: Type,
    pub string: Type,
    pub top: Type,
    pub middle: Type,
    pub bottom: Type,
    pub other_bottom: Type,
    pub collection: ClassId,
    pub list: ClassId,
    pub array_list: ClassId,
    pub set: ClassId,
    pub inside: ClassId,
    pub containing: ClassId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut env = TypeStore::with_prelude();

        let top_id = env.add_class(ClassDef::new("org.example.Top", vec![]));
        let top = Type::class(top_id, vec![]);
        let middle_id = env.add_class(ClassDef {
            super_class: Some(top.clone()),
            ..ClassDef::new("org.example.Middle", vec![])
        });
        let middle = Type::class(middle_id, vec![]);
        let bottom_id = env.add_class(ClassDef {
            super_class: Some(middle.clone()),
            ..ClassDef::new("org.example.Bottom", vec![])
        });
        let other_bottom_id = env.add_class(ClassDef {
            super_class: Some(middle.clone()),
            ..ClassDef::new("org.example.OtherBottom", vec![])
        });

        let inside_t = env.add_type_param("T", Type::Top);
        let inside = env.add_class(ClassDef {
            members: vec![MemberDef::invariant("value", Type::TypeVar(inside_t))],
            ..ClassDef::new("org.example.SomeThingInsideMe", vec![inside_t])
        });

        let containing_t = env.add_type_param("T", Type::Top);
        let containing = env.add_class(ClassDef {
            super_class: Some(Type::class(inside, vec![Type::TypeVar(containing_t)])),
            members: vec![
                MemberDef::producer("give", Type::TypeVar(containing_t)),
                MemberDef::consumer("take", Type::TypeVar(containing_t)),
            ],
            ..ClassDef::new("org.example.SomeContainingClass", vec![containing_t])
        });

        let class = |env: &TypeStore, name: &str| {
            Type::class(
                env.class_id(name)
                    .unwrap_or_else(|| panic!("{name} must exist in the prelude")),
                vec![],
            )
        };

        Self {
            number: class(&env, "java.lang.Number"),
            integer: class(&env, "java.lang.Integer"),
            double: class(&env, "java.lang.Double"),
            string: class(&env, "java.lang.String"),
            collection: env.class_id("java.util.Collection").unwrap(),
            list: env.class_id("java.util.List").unwrap(),
            array_list: env.class_id("java.util.ArrayList").unwrap(),
            set: env.class_id("java.util.Set").unwrap(),
            top,
            middle,
            bottom: Type::class(bottom_id, vec![]),
            other_bottom: Type::class(other_bottom_id, vec![]),
            inside,
            containing,
            env,
        }
    }

    pub fn list_of(&self, arg: Type) -> Type {
        Type::class(self.list, vec![arg])
    }

    pub fn array_list_of(&self, arg: Type) -> Type {
        Type::class(self.array_list, vec![arg])
    }

    pub fn containing_of(&self, arg: Type) -> Type {
        Type::class(self.containing, vec![arg])
    }

    pub fn inside_of(&self, arg: Type) -> Type {
        Type::class(self.inside, vec![arg])
    }
}
