use crate::{ClassId, ClassType, Type, TypeEnv, WildcardBound};

/// Render a type the way it would be spelled in source, using simple class names.
///
/// `Top` renders as `Object`, capture variables as `CAP#n`. The output is stable and intended for
/// diagnostics, not for round-tripping.
pub fn format_type(env: &dyn TypeEnv, ty: &Type) -> String {
    let mut out = String::new();
    write_type(env, ty, &mut out);
    out
}

fn write_type(env: &dyn TypeEnv, ty: &Type, out: &mut String) {
    match ty {
        Type::Top => out.push_str("Object"),
        Type::Null => out.push_str("null"),
        Type::Void => out.push_str("void"),
        Type::Primitive(p) => out.push_str(p.name()),
        Type::Raw(def) => out.push_str(&class_name(env, *def)),
        Type::TypeVar(id) => match env.type_param(*id) {
            Some(def) => out.push_str(&def.name),
            None => out.push_str(&format!("{id:?}")),
        },
        Type::Class(ClassType { def, args }) => {
            out.push_str(&class_name(env, *def));
            if !args.is_empty() {
                out.push('<');
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    write_type(env, arg, out);
                }
                out.push('>');
            }
        }
        Type::Wildcard(WildcardBound::Unbounded) => out.push('?'),
        Type::Wildcard(WildcardBound::Extends(bound)) => {
            out.push_str("? extends ");
            write_type(env, bound, out);
        }
        Type::Wildcard(WildcardBound::Super(bound)) => {
            out.push_str("? super ");
            write_type(env, bound, out);
        }
        Type::Array(elem) => {
            write_type(env, elem, out);
            out.push_str("[]");
        }
    }
}

fn class_name(env: &dyn TypeEnv, def: ClassId) -> String {
    match env.class(def) {
        Some(class_def) => class_def
            .name
            .rsplit('.')
            .next()
            .unwrap_or(&class_def.name)
            .to_string(),
        None => format!("{def:?}"),
    }
}
