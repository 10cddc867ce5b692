//! Macros for declaring record types.
//!
//! [`record_type!`](crate::record_type) turns a list of field declarations
//! into a zero-sized type implementing [`RecordType`](crate::RecordType). The
//! schema is built on first use and shared for the rest of the process.

/// Declare a record type with an ordered list of fields.
///
/// The type name doubles as the discriminator stored with every document.
/// An invalid declaration (reserved or duplicate names, bad subfield keys)
/// is a programmer error and panics when the schema is first built. Call
/// `T::schema()` for each declared type during startup so such a panic
/// happens there rather than on the first record operation.
///
/// # Example
///
/// ```
/// use isisdm::{record_type, FieldDescriptor, Record, RecordType};
///
/// record_type! {
///     /// A monograph.
///     pub struct Book {
///         FieldDescriptor::text("title").required(),
///         FieldDescriptor::multi_text("authors"),
///         FieldDescriptor::text("pages"),
///     }
/// }
///
/// let book = Record::of::<Book>([("title", "Godel, Escher, Bach")]).unwrap();
/// assert_eq!(book.record_type(), "Book");
/// assert_eq!(Book::schema().len(), 3);
/// ```
#[macro_export]
macro_rules! record_type {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:expr),* $(,)?
        }
        $(hidden [$($hidden:expr),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::schema::RecordType for $name {
            fn schema() -> ::std::sync::Arc<$crate::schema::RecordSchema> {
                $crate::__lazy_static! {
                    static ref SCHEMA: ::std::sync::Arc<$crate::schema::RecordSchema> =
                        ::std::sync::Arc::new(
                            $crate::schema::RecordSchema::builder(stringify!($name))
                                $(.field($field))*
                                $($(.hidden($hidden))*)?
                                .build()
                                .unwrap_or_else(|e| {
                                    panic!("cannot register record type {}: {}", stringify!($name), e)
                                }),
                        );
                }
                ::std::sync::Arc::clone(&SCHEMA)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::field::FieldDescriptor;
    use crate::schema::{is_field, schema_of, RecordType};

    record_type! {
        struct Magazine {
            FieldDescriptor::text("title").required(),
            FieldDescriptor::multi_composite_text("authors").subkeys("fl"),
            FieldDescriptor::text("pages"),
            FieldDescriptor::text("editor_note"),
        }
        hidden ["editor_note"]
    }

    record_type! {
        struct Broken {
            FieldDescriptor::text("TYPE"),
        }
    }

    #[test]
    fn test_record_type_macro() {
        let schema = Magazine::schema();
        assert_eq!(schema.type_name(), "Magazine");
        assert_eq!(schema.len(), 4);
        assert!(is_field::<Magazine>("authors"));
        assert_eq!(schema_of::<Magazine>(false).len(), 3);
        assert_eq!(schema_of::<Magazine>(true).len(), 4);
    }

    #[test]
    fn test_schema_is_shared() {
        assert!(std::sync::Arc::ptr_eq(&Magazine::schema(), &Magazine::schema()));
    }

    #[test]
    #[should_panic(expected = "cannot register record type Broken")]
    fn test_reserved_field_panics_at_registration() {
        let _ = Broken::schema();
    }
}
