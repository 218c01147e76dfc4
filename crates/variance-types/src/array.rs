use crate::{
    erase, format_type, is_subtype, relate, ClassType, Diagnostic, ReasonCode, Type, TypeEnv,
    Verdict, WildcardBound,
};

/// A created array: the element type it was reified with, and its length.
///
/// The element type is fixed at creation. Assigning the array to a covariant view such as
/// `Number[]` does not change it, which is what makes [`store_check`] necessary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInstance {
    element: Type,
    len: usize,
}

impl ArrayInstance {
    pub fn element(&self) -> &Type {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Runtime class of the array, e.g. `Integer[]`.
    pub fn runtime_type(&self) -> Type {
        Type::array(self.element.clone())
    }

    /// Runtime check of a cast of this array to `target`.
    ///
    /// Only the erasure of `target` is checked. An array built through the raw path has element
    /// `Object`, so casting it to `Integer[]` fails here even though the static cast that
    /// produced it was accepted with a warning.
    pub fn cast_check(&self, env: &dyn TypeEnv, target: &Type) -> Verdict {
        let runtime = self.runtime_type();
        if is_subtype(env, &runtime, &erase(env, target)) {
            return Verdict::accept(target.clone());
        }
        Verdict::reject(
            ReasonCode::ClassCastFault,
            format!(
                "`{}` cannot be cast to `{}`",
                format_type(env, &runtime),
                format_type(env, target)
            ),
        )
    }
}

/// Whether `ty` is fully available at run time.
///
/// Primitives, non-generic classes, raw types and classes whose arguments are all `?` are
/// reifiable, as are arrays of reifiable elements. Type variables and other parameterized
/// classes are not.
pub fn is_reifiable(env: &dyn TypeEnv, ty: &Type) -> bool {
    match ty {
        Type::Top | Type::Primitive(_) | Type::Raw(_) => true,
        Type::Class(ClassType { args, .. }) => args
            .iter()
            .all(|arg| matches!(arg, Type::Wildcard(WildcardBound::Unbounded))),
        Type::Array(elem) => is_reifiable(env, elem),
        Type::Null | Type::Void | Type::TypeVar(_) | Type::Wildcard(_) => false,
    }
}

/// `new element[len]`.
///
/// Rejected with [`ReasonCode::GenericArrayCreation`] when `element` is not reifiable, e.g.
/// `new List<Integer>[n]` or `new T[n]`; `new List[n]` and `new List<?>[n]` are fine.
pub fn create_array(env: &dyn TypeEnv, element: &Type, len: usize) -> Result<ArrayInstance, Diagnostic> {
    if matches!(element, Type::Null | Type::Void | Type::Wildcard(_)) {
        return Err(Diagnostic::error(
            ReasonCode::IllFormedType,
            format!("`{}` is not an array element type", format_type(env, element)),
        ));
    }
    if !is_reifiable(env, element) {
        return Err(Diagnostic::error(
            ReasonCode::GenericArrayCreation,
            format!(
                "cannot create a generic array of `{}`",
                format_type(env, element)
            ),
        ));
    }
    Ok(ArrayInstance {
        element: element.clone(),
        len,
    })
}

/// Create a `T[]` where `T` is a type variable (or any other non-reifiable element).
///
/// With a `witness` (the runtime component class handed in by the caller) the array is created
/// with that element, which must be reifiable and within the erasure of `element`. Without one
/// the array is created through the raw path with element `Object` and the result carries a
/// [`ReasonCode::RawUncheckedMatch`] warning; a later [`ArrayInstance::cast_check`] to a
/// concrete array type then fails.
pub fn create_generic_array(
    env: &dyn TypeEnv,
    element: &Type,
    witness: Option<&Type>,
    len: usize,
) -> Result<(ArrayInstance, Vec<Diagnostic>), Diagnostic> {
    let Some(witness) = witness else {
        tracing::debug!(
            target: crate::TRACE_TARGET,
            element = %format_type(env, element),
            "generic array created without a component witness"
        );
        let warning = Diagnostic::warning(
            ReasonCode::RawUncheckedMatch,
            format!(
                "unchecked cast from `Object[]` to `{}`",
                format_type(env, &Type::array(element.clone()))
            ),
        );
        let array = ArrayInstance {
            element: Type::Top,
            len,
        };
        return Ok((array, vec![warning]));
    };

    let array = create_array(env, witness, len)?;
    if !relate(env, witness, &erase(env, element)).holds() {
        return Err(Diagnostic::error(
            ReasonCode::NoRelation,
            format!(
                "component witness `{}` is not within `{}`",
                format_type(env, witness),
                format_type(env, element)
            ),
        ));
    }
    Ok((array, Vec::new()))
}

/// Runtime store check of `array[i] = value`, where `value` is the dynamic type of the stored
/// value.
///
/// The value is compared against the element type the array was created with, not against the
/// static type of the reference the store goes through.
pub fn store_check(env: &dyn TypeEnv, array: &ArrayInstance, value: &Type) -> Verdict {
    if *value == Type::Null {
        if array.element.is_primitive() {
            return Verdict::reject(
                ReasonCode::NoRelation,
                format!(
                    "null cannot be stored into `{}`",
                    format_type(env, &array.runtime_type())
                ),
            );
        }
        return Verdict::accept(Type::Void);
    }

    let runtime = erase(env, value);
    if is_subtype(env, &runtime, &array.element) {
        return Verdict::accept(Type::Void);
    }

    tracing::debug!(
        target: crate::TRACE_TARGET,
        value = %format_type(env, &runtime),
        element = %format_type(env, &array.element),
        "array store check failed"
    );
    Verdict::reject(
        ReasonCode::ArrayStoreViolation,
        format!(
            "cannot store `{}` into an array created as `{}`",
            format_type(env, &runtime),
            format_type(env, &array.runtime_type())
        ),
    )
}
