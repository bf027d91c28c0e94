use crate::{OtError, TextOperation};

/// Data carried alongside an operation, e.g. the selection around an edit.
///
/// Every method has a default, so a type only overrides what it cares about:
/// - `compose` keeps the later metadata.
/// - `invert` and `transform` leave the metadata unchanged.
pub trait Meta: Clone {
    fn compose(&self, other: &Self) -> Self {
        other.clone()
    }

    /// `document` is the document the inverted operation was originally applied to.
    fn invert(&self, _document: &str) -> Self {
        self.clone()
    }

    fn transform(&self, _operation: &TextOperation) -> Self {
        self.clone()
    }
}

impl Meta for () {}

/// A `TextOperation` with optional metadata. The operation algebra delegates to the wrapped
/// operation and keeps the metadata in step with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrappedOperation<M> {
    pub wrapped: TextOperation,
    pub meta: Option<M>,
}

impl<M: Meta> WrappedOperation<M> {
    pub fn new(wrapped: TextOperation, meta: Option<M>) -> Self {
        Self { wrapped, meta }
    }

    pub fn apply(&self, document: &str) -> Result<String, OtError> {
        crate::apply(document, &self.wrapped)
    }

    pub fn invert(&self, document: &str) -> Result<Self, OtError> {
        Ok(Self {
            wrapped: crate::invert(document, &self.wrapped)?,
            meta: self.meta.as_ref().map(|meta| meta.invert(document)),
        })
    }

    /// When only one side has metadata, that side's metadata is kept.
    pub fn compose(&self, other: &Self) -> Result<Self, OtError> {
        let meta = match (&self.meta, &other.meta) {
            (Some(a), Some(b)) => Some(a.compose(b)),
            (Some(a), None) => Some(a.clone()),
            (None, b) => b.clone(),
        };
        Ok(Self {
            wrapped: crate::compose(&self.wrapped, &other.wrapped)?,
            meta,
        })
    }

    /// Transforms the operations like `ot::transform`. Each side's metadata is transformed by the
    /// other side's operation.
    pub fn transform(a: &Self, b: &Self) -> Result<(Self, Self), OtError> {
        let (a_prime, b_prime) = crate::transform(&a.wrapped, &b.wrapped)?;
        Ok((
            Self {
                wrapped: a_prime,
                meta: a.meta.as_ref().map(|meta| meta.transform(&b.wrapped)),
            },
            Self {
                wrapped: b_prime,
                meta: b.meta.as_ref().map(|meta| meta.transform(&a.wrapped)),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{random_operation, random_string};
    use crate::Selection;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Clone, Debug, PartialEq)]
    struct Payload(u32);

    impl Meta for Payload {}

    #[derive(Clone, Debug, PartialEq)]
    struct TimesComposed(u32);

    impl Meta for TimesComposed {
        fn compose(&self, other: &Self) -> Self {
            TimesComposed(self.0 + other.0 + 1)
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    struct InvertedWith(String);

    impl Meta for InvertedWith {
        fn invert(&self, document: &str) -> Self {
            InvertedWith(document.to_string())
        }
    }

    #[test]
    fn test_apply_and_invert() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let document = random_string(&mut rng, 50);
            let operation = random_operation(&mut rng, &document);
            let wrapped = WrappedOperation::new(operation.clone(), Some(Payload(42)));
            let changed = wrapped.apply(&document).unwrap();
            assert_eq!(changed, crate::apply(&document, &operation).unwrap());

            let inverted = wrapped.invert(&document).unwrap();
            assert_eq!(inverted.meta, Some(Payload(42)));
            assert_eq!(inverted.apply(&changed).unwrap(), document);
        }
    }

    #[test]
    fn test_invert_meta_receives_document() {
        let mut operation = TextOperation::new();
        operation.retain(2).delete(1);
        let wrapped = WrappedOperation::new(operation, Some(InvertedWith(String::new())));
        let inverted = wrapped.invert("abc").unwrap();
        assert_eq!(inverted.meta, Some(InvertedWith("abc".to_string())));
    }

    #[test]
    fn test_compose() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..20 {
            let document = random_string(&mut rng, 50);
            let a = WrappedOperation::new(random_operation(&mut rng, &document), Some(Payload(1)));
            let after_a = a.apply(&document).unwrap();
            let b = WrappedOperation::new(random_operation(&mut rng, &after_a), Some(Payload(3)));
            let ab = a.compose(&b).unwrap();
            assert_eq!(ab.meta, Some(Payload(3)));
            assert_eq!(ab.apply(&document).unwrap(), b.apply(&after_a).unwrap());
        }
    }

    #[test]
    fn test_compose_meta() {
        let mut a_op = TextOperation::new();
        a_op.insert("a");
        let mut b_op = TextOperation::new();
        b_op.retain(1).insert("b");

        let a = WrappedOperation::new(a_op.clone(), Some(TimesComposed(0)));
        let b = WrappedOperation::new(b_op.clone(), Some(TimesComposed(0)));
        assert_eq!(a.compose(&b).unwrap().meta, Some(TimesComposed(1)));

        let without_meta = WrappedOperation::new(b_op, None);
        assert_eq!(a.compose(&without_meta).unwrap().meta, Some(TimesComposed(0)));

        let a = WrappedOperation::<TimesComposed>::new(a_op, None);
        assert_eq!(a.compose(&b).unwrap().meta, Some(TimesComposed(0)));
    }

    #[test]
    fn test_transform_random() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let document = random_string(&mut rng, 50);
            let a = WrappedOperation::new(random_operation(&mut rng, &document), Some(Payload(1)));
            let b = WrappedOperation::new(random_operation(&mut rng, &document), Some(Payload(2)));
            let (a_prime, b_prime) = WrappedOperation::transform(&a, &b).unwrap();
            assert_eq!(a_prime.meta, Some(Payload(1)));
            assert_eq!(b_prime.meta, Some(Payload(2)));
            assert_eq!(
                a_prime.apply(&b.apply(&document).unwrap()).unwrap(),
                b_prime.apply(&a.apply(&document).unwrap()).unwrap()
            );
        }
    }

    #[test]
    fn test_transform_selection_meta() {
        let document = "Loorem ipsum";
        let mut a_op = TextOperation::new();
        a_op.retain(1).delete(1).retain(10);
        let a = WrappedOperation::new(a_op, Some(Selection::create_cursor(Some(1))));
        let mut b_op = TextOperation::new();
        b_op.retain(7).delete(1).insert("I").retain(4);
        let b = WrappedOperation::new(b_op, Some(Selection::create_cursor(Some(8))));

        let (a_prime, b_prime) = WrappedOperation::transform(&a, &b).unwrap();
        assert_eq!(
            b_prime.apply(&a.apply(document).unwrap()).unwrap(),
            "Lorem Ipsum"
        );
        assert_eq!(a_prime.meta, Some(Selection::create_cursor(Some(1))));
        assert_eq!(b_prime.meta, Some(Selection::create_cursor(Some(7))));
    }
}
